//! Network status monitoring
//!
//! [`NetworkMonitor`] answers "is the remote reachable right now?" with a
//! lightweight probe and caches the verdict for a TTL window. Connectivity
//! problems never surface as errors here: a failed probe simply means offline.
//! Callers that need a hard guarantee use [`NetworkMonitor::ensure_online`].
//!
//! The cache is owned by the monitor instance, so independent monitors (one per
//! test, one per command) never observe each other's state.

pub mod probe;

pub use probe::{ConnectivityProbe, HttpProbe};

use crate::config::NetworkConfig;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Reachability as last observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    Online,
    Offline,
    /// No probe yet, or the cached verdict has expired
    Unknown,
}

/// Network error type
#[derive(thiserror::Error, Debug)]
pub enum NetworkError {
    #[error("Remote endpoint {endpoint} is unreachable")]
    Offline { endpoint: String },
}

/// Options for a single [`NetworkMonitor::is_online`] call
#[derive(Debug, Clone, Copy, Default)]
pub struct ProbeOptions {
    /// Ignore any cached verdict and probe now
    pub skip_cache: bool,
}

impl ProbeOptions {
    pub fn fresh() -> Self {
        Self { skip_cache: true }
    }
}

/// A cached probe verdict
#[derive(Debug, Clone, Copy)]
pub struct StatusCache {
    pub online: bool,
    pub checked_at: Instant,
}

impl StatusCache {
    pub fn new(online: bool) -> Self {
        Self { online, checked_at: Instant::now() }
    }

    /// Check if this verdict is older than `ttl`
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.checked_at.elapsed() >= ttl
    }
}

/// Probes and caches remote reachability
pub struct NetworkMonitor {
    endpoint: String,
    timeout: Duration,
    ttl: Duration,
    probe: Box<dyn ConnectivityProbe>,
    cache: Mutex<Option<StatusCache>>,
}

impl NetworkMonitor {
    /// Create a monitor that probes over HTTP
    pub fn new(config: &NetworkConfig) -> Self {
        Self::with_probe(config, Box::new(HttpProbe::new()))
    }

    /// Create a monitor with a custom probe
    pub fn with_probe(config: &NetworkConfig, probe: Box<dyn ConnectivityProbe>) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
            ttl: Duration::from_secs(config.cache_ttl_secs),
            probe,
            cache: Mutex::new(None),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether the remote endpoint is reachable
    ///
    /// Returns the cached verdict while it is fresh unless `opts.skip_cache`.
    pub async fn is_online(&self, opts: ProbeOptions) -> bool {
        if !opts.skip_cache {
            if let Some(cached) = self.fresh_cache() {
                log::debug!("Network status (cached): online={}", cached.online);
                return cached.online;
            }
        }

        let online = self.probe.probe(&self.endpoint, self.timeout).await;
        log::debug!("Probed {}: online={}", self.endpoint, online);

        if let Ok(mut cache) = self.cache.lock() {
            *cache = Some(StatusCache::new(online));
        }
        online
    }

    /// Cached status only; never performs I/O
    pub fn status(&self) -> NetworkStatus {
        match self.fresh_cache() {
            Some(StatusCache { online: true, .. }) => NetworkStatus::Online,
            Some(StatusCache { online: false, .. }) => NetworkStatus::Offline,
            None => NetworkStatus::Unknown,
        }
    }

    /// Forget the cached verdict
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            *cache = None;
        }
    }

    /// Fail with [`NetworkError::Offline`] when the remote is unreachable
    pub async fn ensure_online(&self) -> Result<(), NetworkError> {
        if self.is_online(ProbeOptions::default()).await {
            Ok(())
        } else {
            Err(NetworkError::Offline { endpoint: self.endpoint.clone() })
        }
    }

    fn fresh_cache(&self) -> Option<StatusCache> {
        let cached = *self.cache.lock().ok()?;
        cached.filter(|c| !c.is_expired(self.ttl))
    }
}
