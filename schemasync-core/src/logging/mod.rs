//! Logging setup
//!
//! The crate logs through the standard `log` facade (`log::info!`,
//! `log::warn!`, ...). Binaries call [`init_logging`] once at startup to route
//! records through `env_logger` with the configured level and line format.
//! `RUST_LOG` still wins over the configured level when set.

pub mod formatter;

pub use formatter::LogFormat;

use crate::config::LoggingConfig;
use std::io::Write;

/// Initialize the global logger
///
/// Safe to call more than once: later calls are ignored.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let level: log::LevelFilter = config
        .level
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid log level: {}", config.level))?;
    let format: LogFormat = config.format.parse().map_err(anyhow::Error::msg)?;

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    builder.format(move |buf, record| {
        let line = format.format_line(
            chrono::Utc::now(),
            record.level(),
            record.target(),
            &record.args().to_string(),
        );
        writeln!(buf, "{}", line)
    });

    // Use try_init to avoid panic if already initialized
    let _ = builder.try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_rejects_bad_level() {
        let config = LoggingConfig { level: "chatty".to_string(), format: "human".to_string() };
        assert!(init_logging(&config).is_err());
    }

    #[test]
    fn test_init_is_idempotent() {
        let config = LoggingConfig::default();
        assert!(init_logging(&config).is_ok());
        assert!(init_logging(&config).is_ok());
    }
}
