//! Durable offline operation queue
//!
//! Intended remote writes that could not be performed while offline are
//! appended to a single JSON document and replayed in enqueue order once
//! connectivity returns. Every mutation rewrites the whole document.
//!
//! ```text
//! {
//!   "version": 1,
//!   "createdAt": 1700000000000,
//!   "lastUpdated": 1700000005000,
//!   "operations": [
//!     { "id": "1700000005000-k3j9x0a", "type": "push", "timestamp": 1700000005000,
//!       "payload": { "serviceId": "svc", "schemaPath": "schema.json", "force": false },
//!       "retryCount": 0 }
//!   ]
//! }
//! ```
//!
//! The file is advisory recovery state: a missing or corrupt file reads as an
//! empty queue.

use crate::config::{QueueConfig, SyncConfig};
use crate::conflict::ResolutionStrategy;
use crate::persist::{read_json_lenient, write_json_atomic};
use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// On-disk format tag
pub const QUEUE_FORMAT_VERSION: u32 = 1;

const ID_SUFFIX_LEN: usize = 7;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Offline queue is full ({max} operations); flush or clear it before queueing more")]
    CapacityExceeded { max: usize },

    #[error("Queue file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Push,
    Sync,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationType::Push => f.pad("push"),
            OperationType::Sync => f.pad("sync"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPayload {
    pub service_id: String,
    pub schema_path: String,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPayload {
    pub service_id: String,
    pub schema_path: String,
    pub strategy: ResolutionStrategy,
}

/// What a queued operation intends to do once online
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueuedIntent {
    Push(PushPayload),
    Sync(SyncPayload),
}

impl QueuedIntent {
    pub fn op_type(&self) -> OperationType {
        match self {
            QueuedIntent::Push(_) => OperationType::Push,
            QueuedIntent::Sync(_) => OperationType::Sync,
        }
    }

    pub fn service_id(&self) -> &str {
        match self {
            QueuedIntent::Push(p) => &p.service_id,
            QueuedIntent::Sync(p) => &p.service_id,
        }
    }
}

/// A queued operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawOperation", into = "RawOperation")]
pub struct QueueOperation {
    pub id: String,
    pub intent: QueuedIntent,
    /// Enqueue time, epoch milliseconds
    pub timestamp: i64,
    pub retry_count: u32,
    pub last_error: Option<String>,
}

impl QueueOperation {
    pub fn op_type(&self) -> OperationType {
        self.intent.op_type()
    }
}

/// Wire shape: `type` tag plus untyped `payload`
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOperation {
    id: String,
    #[serde(rename = "type")]
    op_type: OperationType,
    timestamp: i64,
    payload: serde_json::Value,
    #[serde(default)]
    retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_error: Option<String>,
}

impl TryFrom<RawOperation> for QueueOperation {
    type Error = serde_json::Error;

    fn try_from(raw: RawOperation) -> Result<Self, Self::Error> {
        let intent = match raw.op_type {
            OperationType::Push => QueuedIntent::Push(serde_json::from_value(raw.payload)?),
            OperationType::Sync => QueuedIntent::Sync(serde_json::from_value(raw.payload)?),
        };
        Ok(Self {
            id: raw.id,
            intent,
            timestamp: raw.timestamp,
            retry_count: raw.retry_count,
            last_error: raw.last_error,
        })
    }
}

impl From<QueueOperation> for RawOperation {
    fn from(op: QueueOperation) -> Self {
        let op_type = op.intent.op_type();
        let payload = match &op.intent {
            QueuedIntent::Push(p) => serde_json::to_value(p),
            QueuedIntent::Sync(p) => serde_json::to_value(p),
        }
        .unwrap_or_default();
        Self {
            id: op.id,
            op_type,
            timestamp: op.timestamp,
            payload,
            retry_count: op.retry_count,
            last_error: op.last_error,
        }
    }
}

/// The whole backing document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueFile {
    pub version: u32,
    pub created_at: i64,
    pub last_updated: i64,
    pub operations: Vec<QueueOperation>,
}

impl QueueFile {
    fn empty() -> Self {
        let now = now_ms();
        Self { version: QUEUE_FORMAT_VERSION, created_at: now, last_updated: now, operations: Vec::new() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub total: usize,
    pub by_type: HashMap<OperationType, usize>,
    /// Oldest enqueue timestamp (epoch ms)
    pub oldest: Option<i64>,
    pub newest: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidateReport {
    pub removed_count: usize,
    pub remaining: usize,
}

/// Outcome of one replay pass
#[derive(Debug, Clone, Default)]
pub struct ReplayReport {
    pub succeeded: Vec<String>,
    /// (operation id, error message)
    pub failed: Vec<(String, String)>,
    pub evicted: Vec<QueueOperation>,
}

/// Performs a queued operation against the remote
#[async_trait]
pub trait QueueReplayer: Send + Sync {
    async fn replay(&self, op: &QueueOperation) -> anyhow::Result<()>;
}

/// File-backed queue of pending remote operations
#[derive(Debug, Clone)]
pub struct OfflineQueue {
    path: PathBuf,
    max_size: usize,
    max_retries: u32,
}

impl OfflineQueue {
    pub fn new(path: impl Into<PathBuf>, config: &QueueConfig) -> Self {
        Self { path: path.into(), max_size: config.max_size, max_retries: config.max_retries }
    }

    /// Queue file under the project state directory
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.project.queue_path(&config.queue.file_name), &config.queue)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Append an intent, rejecting it when the queue is full
    pub fn enqueue(&self, intent: QueuedIntent) -> Result<QueueOperation, QueueError> {
        let mut file = self.load();
        if file.operations.len() >= self.max_size {
            return Err(QueueError::CapacityExceeded { max: self.max_size });
        }

        let timestamp = now_ms();
        let op = QueueOperation {
            id: generate_id(timestamp),
            intent,
            timestamp,
            retry_count: 0,
            last_error: None,
        };
        file.operations.push(op.clone());
        self.store(&mut file)?;

        log::info!("Queued {} operation {} ({} pending)", op.op_type(), op.id, file.operations.len());
        Ok(op)
    }

    /// Remove and return an operation by id
    pub fn dequeue(&self, id: &str) -> Result<Option<QueueOperation>, QueueError> {
        let mut file = self.load();
        let Some(pos) = file.operations.iter().position(|op| op.id == id) else {
            return Ok(None);
        };
        let op = file.operations.remove(pos);
        self.store(&mut file)?;
        Ok(Some(op))
    }

    /// All operations in enqueue order
    pub fn list(&self) -> Vec<QueueOperation> {
        self.load().operations
    }

    pub fn len(&self) -> usize {
        self.load().operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> QueueStats {
        let operations = self.load().operations;
        let mut by_type = HashMap::new();
        for op in &operations {
            *by_type.entry(op.op_type()).or_insert(0) += 1;
        }
        QueueStats {
            total: operations.len(),
            by_type,
            oldest: operations.iter().map(|op| op.timestamp).min(),
            newest: operations.iter().map(|op| op.timestamp).max(),
        }
    }

    /// Record a failed replay; returns false when the id is unknown
    pub fn mark_failed(&self, id: &str, error: &str) -> Result<bool, QueueError> {
        let mut file = self.load();
        let Some(op) = file.operations.iter_mut().find(|op| op.id == id) else {
            return Ok(false);
        };
        op.retry_count += 1;
        op.last_error = Some(error.to_string());
        log::debug!("Operation {} failed (attempt {}): {}", id, op.retry_count, error);
        self.store(&mut file)?;
        Ok(true)
    }

    /// Remove and return operations that reached the retry ceiling
    pub fn evict_exhausted(&self) -> Result<Vec<QueueOperation>, QueueError> {
        let mut file = self.load();
        let (evicted, kept): (Vec<_>, Vec<_>) = file
            .operations
            .drain(..)
            .partition(|op| op.retry_count >= self.max_retries);
        file.operations = kept;

        if !evicted.is_empty() {
            self.store(&mut file)?;
            log::warn!("Evicted {} operation(s) after {} failed attempts", evicted.len(), self.max_retries);
        }
        Ok(evicted)
    }

    /// Keep only the newest operation of each (type, payload) group
    pub fn consolidate(&self) -> Result<ConsolidateReport, QueueError> {
        let mut file = self.load();
        let operations = std::mem::take(&mut file.operations);

        let keep: HashSet<usize> = {
            let mut newest: HashMap<&QueuedIntent, usize> = HashMap::new();
            for (i, op) in operations.iter().enumerate() {
                match newest.get(&op.intent) {
                    Some(&j) if operations[j].timestamp > op.timestamp => {}
                    _ => {
                        newest.insert(&op.intent, i);
                    }
                }
            }
            newest.into_values().collect()
        };

        let before = operations.len();
        file.operations = operations
            .into_iter()
            .enumerate()
            .filter(|(i, _)| keep.contains(i))
            .map(|(_, op)| op)
            .collect();

        let removed_count = before - file.operations.len();
        if removed_count > 0 {
            self.store(&mut file)?;
            log::info!("Consolidated queue: removed {} duplicate(s)", removed_count);
        }
        Ok(ConsolidateReport { removed_count, remaining: file.operations.len() })
    }

    /// Drop every operation; returns how many were removed
    pub fn clear(&self) -> Result<usize, QueueError> {
        let mut file = self.load();
        let removed = file.operations.len();
        file.operations.clear();
        self.store(&mut file)?;
        Ok(removed)
    }

    /// Replay every operation in enqueue order, one at a time
    ///
    /// Successes are dequeued, failures marked and kept; exhausted operations
    /// are evicted at the end of the pass.
    pub async fn replay(&self, replayer: &dyn QueueReplayer) -> Result<ReplayReport, QueueError> {
        let mut report = ReplayReport::default();

        for op in self.list() {
            match replayer.replay(&op).await {
                Ok(()) => {
                    self.dequeue(&op.id)?;
                    log::info!("Replayed {} operation {}", op.op_type(), op.id);
                    report.succeeded.push(op.id);
                }
                Err(e) => {
                    let message = format!("{:#}", e);
                    self.mark_failed(&op.id, &message)?;
                    log::warn!("Replay of {} failed: {}", op.id, message);
                    report.failed.push((op.id, message));
                }
            }
        }

        report.evicted = self.evict_exhausted()?;
        Ok(report)
    }

    fn load(&self) -> QueueFile {
        read_json_lenient(&self.path).unwrap_or_else(QueueFile::empty)
    }

    fn store(&self, file: &mut QueueFile) -> Result<(), QueueError> {
        file.last_updated = now_ms();
        write_json_atomic(&self.path, file)?;
        Ok(())
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// `<epoch-ms>-<7 lowercase alphanumerics>`
fn generate_id(timestamp: i64) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{}-{}", timestamp, suffix)
}
