//! Commands talking to the remote through the sync service

use anyhow::{bail, Result};
use schemasync_core::config::SyncConfig;
use schemasync_core::conflict::{ConflictInfo, PromptDecider, ResolutionStrategy};
use schemasync_core::network::NetworkStatus;
use schemasync_core::sync::{SchemaSync, SyncError, SyncOutcome};
use std::fmt::Write as _;
use std::io::{self, BufReader};

pub async fn status(config: &SyncConfig) -> Result<()> {
    let service = SchemaSync::from_config(config)?;
    let info = service.status().await?;
    print!("{}", render_status(&info));
    Ok(())
}

pub async fn push(config: &SyncConfig, force: bool) -> Result<()> {
    let service = SchemaSync::from_config(config)?;
    let outcome = with_hint(service.push(force).await)?;
    println!("{}", render_outcome(&outcome));
    Ok(())
}

pub async fn pull(config: &SyncConfig, force: bool) -> Result<()> {
    let service = SchemaSync::from_config(config)?;
    let outcome = with_hint(service.pull(force).await)?;
    println!("{}", render_outcome(&outcome));
    Ok(())
}

/// `None` resolves interactively on the terminal
pub async fn sync(config: &SyncConfig, strategy: Option<ResolutionStrategy>) -> Result<()> {
    let service = SchemaSync::from_config(config)?;
    let outcome = match strategy {
        Some(strategy) => service.sync(strategy).await?,
        None => {
            let mut decider = PromptDecider::new(BufReader::new(io::stdin()), io::stderr());
            service.sync_with(&mut decider).await?
        }
    };
    println!("{}", render_outcome(&outcome));
    Ok(())
}

pub async fn check_network(config: &SyncConfig) -> Result<()> {
    let service = SchemaSync::from_config(config)?;
    let endpoint = service.monitor().endpoint().to_string();
    match service.check_network().await {
        NetworkStatus::Online => println!("Online ({})", endpoint),
        _ => println!("Offline ({}); writes will be queued", endpoint),
    }
    Ok(())
}

fn with_hint(result: Result<SyncOutcome, SyncError>) -> Result<SyncOutcome> {
    match result {
        Ok(outcome) => Ok(outcome),
        Err(SyncError::NeedsResolution(info)) => bail!(
            "{}\nRun `schemasync sync` to merge, or pass --force to overwrite",
            render_status(&info).trim_end()
        ),
        Err(e) => Err(e.into()),
    }
}

pub fn render_status(info: &ConflictInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "State:    {} ({})", info.state, info.severity);
    let _ = writeln!(out, "Message:  {}", info.message);
    let _ = writeln!(out, "Local:    {}", info.local_hash.as_deref().unwrap_or("unchanged"));
    let _ = writeln!(out, "Remote:   {}", info.remote_hash.as_deref().unwrap_or("unchanged"));
    if let Some(entities) = &info.affected_entities {
        if !entities.is_empty() {
            let _ = writeln!(out, "Entities: {}", entities.join(", "));
        }
    }
    out
}

pub fn render_outcome(outcome: &SyncOutcome) -> String {
    match outcome {
        SyncOutcome::UpToDate => "Already up to date".to_string(),
        SyncOutcome::Pushed(receipt) => {
            format!("Pushed schema (id {}, version {})", receipt.id, receipt.version)
        }
        SyncOutcome::Pulled { hash } => format!("Pulled remote schema {}", hash),
        SyncOutcome::Synced { hash, receipt, resolutions } => {
            let mut line = format!("Synced to {}", hash);
            if !resolutions.is_empty() {
                let _ = write!(line, ", resolved {} conflict(s)", resolutions.len());
            }
            if let Some(receipt) = receipt {
                let _ = write!(line, ", pushed version {}", receipt.version);
            }
            line
        }
        SyncOutcome::Queued { id } => {
            format!("Offline: queued operation {} (run `schemasync queue flush` when online)", id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemasync_core::conflict::ConflictDetector;
    use schemasync_core::sync::PushReceipt;

    #[test]
    fn status_lists_hashes_and_entities() {
        let info = ConflictDetector::detect(None, Some("sha256:0123456789abcdef"), None, None);
        let text = render_status(&info);
        assert!(text.contains("REMOTE_CHANGED (medium)"));
        assert!(text.contains("Local:    unchanged"));
        assert!(text.contains("Remote:   sha256:0123456789abcdef"));
        assert!(!text.contains("Entities"));
    }

    #[test]
    fn outcome_lines() {
        assert_eq!(render_outcome(&SyncOutcome::UpToDate), "Already up to date");
        let synced = SyncOutcome::Synced {
            hash: "sha256:aa".into(),
            receipt: Some(PushReceipt { id: "x".into(), version: "4".into() }),
            resolutions: vec![],
        };
        assert_eq!(render_outcome(&synced), "Synced to sha256:aa, pushed version 4");
        assert!(render_outcome(&SyncOutcome::Queued { id: "1-abc".into() }).contains("1-abc"));
    }

    #[test]
    fn resolution_error_carries_hint() {
        let info = ConflictDetector::detect(Some("a"), Some("b"), None, None);
        let err = with_hint(Err(SyncError::NeedsResolution(info))).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("DIVERGED"));
        assert!(text.contains("--force"));
    }
}
