//! Log line formatting

use std::str::FromStr;

/// How log lines should be formatted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured JSON, one object per line
    /// Example: {"timestamp":"2024-01-15T10:30:00.000Z","level":"INFO","target":"schemasync_core::queue","message":"Queued push"}
    Json,

    /// Human-readable format (default)
    /// Example: 2024-01-15 10:30:00.000 INFO  [schemasync_core::queue] Queued push
    Human,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "human" | "text" => Ok(LogFormat::Human),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

impl LogFormat {
    /// Render one record
    pub fn format_line(
        &self,
        timestamp: chrono::DateTime<chrono::Utc>,
        level: log::Level,
        target: &str,
        message: &str,
    ) -> String {
        match self {
            LogFormat::Json => format_json(timestamp, level, target, message),
            LogFormat::Human => format_human(timestamp, level, target, message),
        }
    }
}

fn format_json(
    timestamp: chrono::DateTime<chrono::Utc>,
    level: log::Level,
    target: &str,
    message: &str,
) -> String {
    let mut json = serde_json::Map::new();
    json.insert(
        "timestamp".to_string(),
        serde_json::Value::String(timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
    );
    json.insert("level".to_string(), serde_json::Value::String(level.to_string()));
    json.insert("target".to_string(), serde_json::Value::String(target.to_string()));
    json.insert("message".to_string(), serde_json::Value::String(message.to_string()));

    serde_json::to_string(&json).unwrap_or_else(|_| "Failed to serialize log entry".to_string())
}

fn format_human(
    timestamp: chrono::DateTime<chrono::Utc>,
    level: log::Level,
    target: &str,
    message: &str,
) -> String {
    format!(
        "{} {:5} [{}] {}",
        timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
        level.to_string(),
        target,
        message
    )
}
