//! Sync service
//!
//! [`SchemaSync`] wires the detector, resolver, offline queue, network monitor
//! and remote store together for one project. Every collaborator is built up
//! front from [`SyncConfig`]; tests swap the monitor probe and the remote.
//!
//! Write operations (`push`, strategy `sync`) consult the monitor first and
//! queue their intent when offline. Queued intents are replayed by
//! [`SchemaSync::flush_queue`] with the service itself as the replayer.

pub mod metadata;
pub mod remote;

pub use metadata::{SyncDirection, SyncMetadata};
pub use remote::{HttpSchemaRemote, PushReceipt, SchemaRemote};

use crate::config::SyncConfig;
use crate::conflict::{
    ConflictDetector, ConflictInfo, ConflictResolver, DecisionProvider, EntityConflict,
    EntityResolution, ResolutionStrategy, ResolveError, StrategyDecider, SyncState,
};
use crate::network::{NetworkError, NetworkMonitor, NetworkStatus, ProbeOptions};
use crate::queue::{
    OfflineQueue, PushPayload, QueueError, QueueOperation, QueueReplayer, QueuedIntent,
    ReplayReport, SyncPayload,
};
use crate::schema::{Schema, SchemaError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("No service id configured (set project.service_id or SS_SERVICE_ID)")]
    MissingServiceId,

    #[error("Local schema not found at {}", .0.display())]
    MissingLocalSchema(PathBuf),

    #[error("Remote has no schema for service {0}")]
    NoRemoteSchema(String),

    #[error("Changes on both sides need resolution: {0}")]
    NeedsResolution(ConflictInfo),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Remote request failed: {0:#}")]
    Remote(anyhow::Error),

    #[error("Failed to write sync metadata: {0}")]
    Metadata(std::io::Error),
}

/// What a sync command ended up doing
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Both sides already match
    UpToDate,
    Pushed(PushReceipt),
    Pulled { hash: String },
    Synced {
        hash: String,
        /// Set when the merged schema was sent to the remote
        receipt: Option<PushReceipt>,
        resolutions: Vec<EntityResolution>,
    },
    /// Offline: the intent was stored for later replay
    Queued { id: String },
}

pub struct SchemaSync {
    schema_path: PathBuf,
    metadata_path: PathBuf,
    service_id: Option<String>,
    queue: OfflineQueue,
    monitor: NetworkMonitor,
    remote: Box<dyn SchemaRemote>,
}

impl SchemaSync {
    /// Production wiring: HTTP probe and HTTP remote
    pub fn from_config(config: &SyncConfig) -> anyhow::Result<Self> {
        let remote = HttpSchemaRemote::new(&config.remote)?;
        Ok(Self::with_parts(config, NetworkMonitor::new(&config.network), Box::new(remote)))
    }

    pub fn with_parts(
        config: &SyncConfig,
        monitor: NetworkMonitor,
        remote: Box<dyn SchemaRemote>,
    ) -> Self {
        Self {
            schema_path: config.project.schema_path.clone(),
            metadata_path: config.project.metadata_path(),
            service_id: config.project.service_id.clone(),
            queue: OfflineQueue::from_config(config),
            monitor,
            remote,
        }
    }

    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    pub fn monitor(&self) -> &NetworkMonitor {
        &self.monitor
    }

    pub fn schema_path(&self) -> &Path {
        &self.schema_path
    }

    pub fn metadata(&self) -> Option<SyncMetadata> {
        SyncMetadata::load_lenient(&self.metadata_path)
    }

    /// Probe the endpoint, bypassing the cache
    pub async fn check_network(&self) -> NetworkStatus {
        if self.monitor.is_online(ProbeOptions::fresh()).await {
            NetworkStatus::Online
        } else {
            NetworkStatus::Offline
        }
    }

    /// Classify local and remote changes since the last sync
    pub async fn status(&self) -> Result<ConflictInfo, SyncError> {
        let service_id = self.service_id()?;
        self.monitor.ensure_online().await?;

        let local = Schema::load_lenient(&self.schema_path);
        let remote = self.fetch_remote(service_id).await?;
        Ok(self.classify(local.as_ref(), remote.as_ref()))
    }

    /// Entity and field level differences between local and remote
    pub async fn diff(&self) -> Result<Vec<EntityConflict>, SyncError> {
        let service_id = self.service_id()?;
        self.monitor.ensure_online().await?;

        let local = load_local(&self.schema_path)?;
        let remote = self
            .fetch_remote(service_id)
            .await?
            .ok_or_else(|| SyncError::NoRemoteSchema(service_id.to_string()))?;
        Ok(ConflictResolver::detect_all_conflicts(&local, &remote))
    }

    /// Send the local schema, or queue the push when offline
    pub async fn push(&self, force: bool) -> Result<SyncOutcome, SyncError> {
        let service_id = self.service_id()?;
        // Fail early on a missing or malformed file instead of queueing it
        load_local(&self.schema_path)?;

        if !self.monitor.is_online(ProbeOptions::default()).await {
            let op = self.queue.enqueue(QueuedIntent::Push(PushPayload {
                service_id: service_id.to_string(),
                schema_path: self.schema_path.display().to_string(),
                force,
            }))?;
            return Ok(SyncOutcome::Queued { id: op.id });
        }

        self.push_online(service_id, &self.schema_path, force).await
    }

    /// Replace the local schema with the remote one
    pub async fn pull(&self, force: bool) -> Result<SyncOutcome, SyncError> {
        let service_id = self.service_id()?;
        self.monitor.ensure_online().await?;

        let remote = self
            .fetch_remote(service_id)
            .await?
            .ok_or_else(|| SyncError::NoRemoteSchema(service_id.to_string()))?;
        remote.validate()?;
        let remote_hash = remote.fingerprint();
        let local = Schema::load_lenient(&self.schema_path);

        if local.as_ref().map(Schema::fingerprint).as_deref() == Some(remote_hash.as_str()) {
            self.record(SyncDirection::Pull, &remote_hash, &remote_hash)?;
            return Ok(SyncOutcome::UpToDate);
        }

        if !force {
            let info = self.classify(local.as_ref(), Some(&remote));
            if matches!(info.state, SyncState::Diverged | SyncState::LocalChanged) {
                return Err(SyncError::NeedsResolution(info));
            }
        }

        remote.save(&self.schema_path)?;
        self.record(SyncDirection::Pull, &remote_hash, &remote_hash)?;
        log::info!("Pulled schema {} for {}", remote_hash, service_id);
        Ok(SyncOutcome::Pulled { hash: remote_hash })
    }

    /// Two-way sync with a fixed strategy; queued when offline
    pub async fn sync(&self, strategy: ResolutionStrategy) -> Result<SyncOutcome, SyncError> {
        let service_id = self.service_id()?;
        load_local(&self.schema_path)?;

        if !self.monitor.is_online(ProbeOptions::default()).await {
            let op = self.queue.enqueue(QueuedIntent::Sync(SyncPayload {
                service_id: service_id.to_string(),
                schema_path: self.schema_path.display().to_string(),
                strategy,
            }))?;
            return Ok(SyncOutcome::Queued { id: op.id });
        }

        let mut decider = StrategyDecider::new(strategy);
        self.sync_online(service_id, &self.schema_path, &mut decider).await
    }

    /// Two-way sync driven by a caller-supplied decider; requires connectivity
    pub async fn sync_with(
        &self,
        decider: &mut dyn DecisionProvider,
    ) -> Result<SyncOutcome, SyncError> {
        let service_id = self.service_id()?;
        self.monitor.ensure_online().await?;
        self.sync_online(service_id, &self.schema_path, decider).await
    }

    /// Replay queued operations once the endpoint is reachable
    pub async fn flush_queue(&self) -> Result<ReplayReport, SyncError> {
        self.monitor.ensure_online().await?;
        let report = self.queue.replay(self).await?;
        log::info!(
            "Queue flush: {} succeeded, {} failed, {} evicted",
            report.succeeded.len(),
            report.failed.len(),
            report.evicted.len()
        );
        Ok(report)
    }

    fn service_id(&self) -> Result<&str, SyncError> {
        self.service_id.as_deref().ok_or(SyncError::MissingServiceId)
    }

    async fn fetch_remote(&self, service_id: &str) -> Result<Option<Schema>, SyncError> {
        self.remote.get_latest_schema(service_id).await.map_err(SyncError::Remote)
    }

    /// Detector input: a side counts as changed when its hash moved since the
    /// last recorded sync (always, without history)
    fn classify(&self, local: Option<&Schema>, remote: Option<&Schema>) -> ConflictInfo {
        let meta = self.metadata();
        let local_hash = local.map(Schema::fingerprint).filter(|h| {
            meta.as_ref().map_or(true, |m| &m.local_schema_hash != h)
        });
        let remote_hash = remote.map(Schema::fingerprint).filter(|h| {
            meta.as_ref().map_or(true, |m| &m.remote_schema_hash != h)
        });
        ConflictDetector::detect(local_hash.as_deref(), remote_hash.as_deref(), local, remote)
    }

    fn record(&self, direction: SyncDirection, local: &str, remote: &str) -> Result<(), SyncError> {
        SyncMetadata::record(direction, local, remote)
            .save(&self.metadata_path)
            .map_err(SyncError::Metadata)
    }

    async fn push_online(
        &self,
        service_id: &str,
        schema_path: &Path,
        force: bool,
    ) -> Result<SyncOutcome, SyncError> {
        let local = load_local(schema_path)?;
        let local_hash = local.fingerprint();
        let remote = self.fetch_remote(service_id).await?;

        if remote.as_ref().map(Schema::fingerprint).as_deref() == Some(local_hash.as_str()) {
            self.record(SyncDirection::Push, &local_hash, &local_hash)?;
            return Ok(SyncOutcome::UpToDate);
        }

        if !force {
            let info = self.classify(Some(&local), remote.as_ref());
            if matches!(info.state, SyncState::Diverged | SyncState::RemoteChanged) {
                return Err(SyncError::NeedsResolution(info));
            }
        }

        let receipt =
            self.remote.push_schema(service_id, &local).await.map_err(SyncError::Remote)?;
        self.record(SyncDirection::Push, &local_hash, &local_hash)?;
        log::info!("Pushed schema {} for {} (version {})", local_hash, service_id, receipt.version);
        Ok(SyncOutcome::Pushed(receipt))
    }

    async fn sync_online(
        &self,
        service_id: &str,
        schema_path: &Path,
        decider: &mut dyn DecisionProvider,
    ) -> Result<SyncOutcome, SyncError> {
        let local = load_local(schema_path)?;
        let local_hash = local.fingerprint();

        let Some(remote) = self.fetch_remote(service_id).await? else {
            let receipt =
                self.remote.push_schema(service_id, &local).await.map_err(SyncError::Remote)?;
            self.record(SyncDirection::Sync, &local_hash, &local_hash)?;
            return Ok(SyncOutcome::Synced {
                hash: local_hash,
                receipt: Some(receipt),
                resolutions: Vec::new(),
            });
        };
        remote.validate()?;
        let remote_hash = remote.fingerprint();

        if local_hash == remote_hash {
            self.record(SyncDirection::Sync, &local_hash, &remote_hash)?;
            return Ok(SyncOutcome::UpToDate);
        }

        let info = self.classify(Some(&local), Some(&remote));
        let (merged, resolutions) = match info.state {
            SyncState::LocalChanged => (local, Vec::new()),
            SyncState::RemoteChanged => (remote, Vec::new()),
            _ => {
                let result = ConflictResolver::resolve(&local, &remote, decider)?;
                (result.schema, result.resolutions)
            }
        };

        merged.validate()?;
        let merged_hash = merged.fingerprint();
        if merged_hash != local_hash {
            merged.save(schema_path)?;
        }
        let receipt = if merged_hash != remote_hash {
            Some(self.remote.push_schema(service_id, &merged).await.map_err(SyncError::Remote)?)
        } else {
            None
        };

        self.record(SyncDirection::Sync, &merged_hash, &merged_hash)?;
        log::info!("Synced schema {} for {} ({})", merged_hash, service_id, info.state);
        Ok(SyncOutcome::Synced { hash: merged_hash, receipt, resolutions })
    }
}

#[async_trait]
impl QueueReplayer for SchemaSync {
    async fn replay(&self, op: &QueueOperation) -> anyhow::Result<()> {
        match &op.intent {
            QueuedIntent::Push(payload) => {
                self.push_online(&payload.service_id, Path::new(&payload.schema_path), payload.force)
                    .await?;
            }
            QueuedIntent::Sync(payload) => {
                let mut decider = StrategyDecider::new(payload.strategy);
                self.sync_online(&payload.service_id, Path::new(&payload.schema_path), &mut decider)
                    .await?;
            }
        }
        Ok(())
    }
}

/// Read and validate the local document; malformed input is reported, never repaired
fn load_local(path: &Path) -> Result<Schema, SyncError> {
    match Schema::load(path) {
        Ok(schema) => {
            schema.validate()?;
            Ok(schema)
        }
        Err(SchemaError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SyncError::MissingLocalSchema(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}
