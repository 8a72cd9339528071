//! Offline queue management

use anyhow::Result;
use schemasync_core::config::SyncConfig;
use schemasync_core::queue::{OfflineQueue, OperationType, QueueOperation, QueueStats};
use schemasync_core::sync::SchemaSync;
use std::fmt::Write as _;

pub fn list(config: &SyncConfig) -> Result<()> {
    print!("{}", render_operations(&OfflineQueue::from_config(config).list()));
    Ok(())
}

pub fn stats(config: &SyncConfig) -> Result<()> {
    let queue = OfflineQueue::from_config(config);
    print!("{}", render_stats(&queue.stats(), queue.max_size()));
    Ok(())
}

pub fn consolidate(config: &SyncConfig) -> Result<()> {
    let report = OfflineQueue::from_config(config).consolidate()?;
    println!(
        "Removed {} duplicate operation(s), {} remaining",
        report.removed_count, report.remaining
    );
    Ok(())
}

pub fn evict(config: &SyncConfig) -> Result<()> {
    let evicted = OfflineQueue::from_config(config).evict_exhausted()?;
    println!("Evicted {} operation(s)", evicted.len());
    for op in &evicted {
        println!("  {} {}", op.id, op.last_error.as_deref().unwrap_or(""));
    }
    Ok(())
}

pub fn clear(config: &SyncConfig) -> Result<()> {
    let removed = OfflineQueue::from_config(config).clear()?;
    println!("Cleared {} operation(s)", removed);
    Ok(())
}

pub async fn flush(config: &SyncConfig) -> Result<()> {
    let service = SchemaSync::from_config(config)?;
    if service.queue().is_empty() {
        println!("Queue is empty");
        return Ok(());
    }

    let report = service.flush_queue().await?;
    println!(
        "Replayed {} operation(s), {} failed, {} evicted",
        report.succeeded.len(),
        report.failed.len(),
        report.evicted.len()
    );
    for (id, error) in &report.failed {
        println!("  failed {}: {}", id, error);
    }
    Ok(())
}

fn format_ms(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}

pub fn render_operations(operations: &[QueueOperation]) -> String {
    if operations.is_empty() {
        return "Queue is empty\n".to_string();
    }

    let mut out = String::new();
    for op in operations {
        let _ = write!(
            out,
            "{}  {:<4}  {}  {}  retries={}",
            op.id,
            op.op_type(),
            op.intent.service_id(),
            format_ms(op.timestamp),
            op.retry_count
        );
        if let Some(error) = &op.last_error {
            let _ = write!(out, "  last error: {}", error);
        }
        out.push('\n');
    }
    out
}

pub fn render_stats(stats: &QueueStats, capacity: usize) -> String {
    let count = |t: OperationType| stats.by_type.get(&t).copied().unwrap_or(0);
    let mut out = String::new();
    let _ = writeln!(out, "Total:  {} / {}", stats.total, capacity);
    let _ = writeln!(
        out,
        "Types:  push={} sync={}",
        count(OperationType::Push),
        count(OperationType::Sync)
    );
    if let (Some(oldest), Some(newest)) = (stats.oldest, stats.newest) {
        let _ = writeln!(out, "Oldest: {}", format_ms(oldest));
        let _ = writeln!(out, "Newest: {}", format_ms(newest));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemasync_core::queue::{PushPayload, QueuedIntent};

    fn config_in(dir: &std::path::Path) -> SyncConfig {
        let mut config = SyncConfig::default();
        config.project.state_dir = dir.to_path_buf();
        config
    }

    fn push_intent() -> QueuedIntent {
        QueuedIntent::Push(PushPayload {
            service_id: "svc_9".into(),
            schema_path: "schema.json".into(),
            force: false,
        })
    }

    #[test]
    fn renders_queue_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let queue = OfflineQueue::from_config(&config_in(tmp.path()));
        assert_eq!(render_operations(&queue.list()), "Queue is empty\n");

        let op = queue.enqueue(push_intent()).unwrap();
        queue.mark_failed(&op.id, "503").unwrap();

        let text = render_operations(&queue.list());
        assert!(text.starts_with(&op.id));
        assert!(text.contains("push"));
        assert!(text.contains("svc_9"));
        assert!(text.contains("retries=1"));
        assert!(text.contains("last error: 503"));
    }

    #[test]
    fn stats_show_capacity_and_types() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_in(tmp.path());
        let queue = OfflineQueue::from_config(&config);
        queue.enqueue(push_intent()).unwrap();

        let text = render_stats(&queue.stats(), queue.max_size());
        assert!(text.contains("Total:  1 / 50"));
        assert!(text.contains("push=1 sync=0"));
        assert!(text.contains("Oldest:"));
    }

    #[test]
    fn clear_and_consolidate_commands() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_in(tmp.path());
        let queue = OfflineQueue::from_config(&config);
        queue.enqueue(push_intent()).unwrap();
        queue.enqueue(push_intent()).unwrap();

        consolidate(&config).unwrap();
        assert_eq!(queue.len(), 1);
        clear(&config).unwrap();
        assert!(queue.is_empty());
    }

    #[test]
    fn timestamps_render_in_utc() {
        assert_eq!(format_ms(0), "1970-01-01 00:00:00");
    }
}
