//! Schemasync - Core
//!
//! Keeps a local declarative schema document and its remote counterpart
//! consistent across disconnected edits.
//!
//! # Overview
//!
//! - Content fingerprints decide whether the two sides diverged
//! - A structural diff at entity and field granularity explains how
//! - A strategy-based or interactive merge produces one resolved schema
//! - Remote writes attempted while offline are queued durably and replayed
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use schemasync_core::config::SyncConfig;
//! use schemasync_core::conflict::ResolutionStrategy;
//! use schemasync_core::sync::{SchemaSync, SyncOutcome};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SyncConfig::load()?;
//!     let service = SchemaSync::from_config(&config)?;
//!     match service.sync(ResolutionStrategy::Merge).await? {
//!         SyncOutcome::Queued { id } => println!("offline, queued {}", id),
//!         outcome => println!("{:?}", outcome),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`schema`] - Schema document model, validation and fingerprinting
//! - [`network`] - Cached reachability checks
//! - [`queue`] - Durable offline operation queue
//! - [`conflict`] - Sync state detection and conflict resolution
//! - [`sync`] - Service composing the above against a remote store
//! - [`config`] - TOML + environment configuration
//! - [`logging`] - `env_logger` setup

pub mod config;
pub mod conflict;
pub mod logging;
pub mod network;
pub mod persist;
pub mod queue;
pub mod schema;
pub mod sync;

pub use config::SyncConfig;
pub use conflict::{
    ConflictDetector, ConflictInfo, ConflictResolver, DecisionProvider, PromptDecider,
    ResolutionStrategy, StrategyDecider, SyncState,
};
pub use network::{NetworkMonitor, NetworkStatus};
pub use queue::{OfflineQueue, QueueOperation, QueuedIntent};
pub use schema::{Entity, Field, FieldType, Schema, SchemaError};
pub use sync::{SchemaSync, SyncError, SyncOutcome};
