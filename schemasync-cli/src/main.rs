//! Schemasync CLI: keep a local schema and its remote counterpart in sync.
//!
//! ```bash
//! schemasync status
//! schemasync sync --strategy merge
//! schemasync queue flush
//! ```
//!
//! Settings come from `schemasync.toml` and `SS_*` environment variables.
//! See `schemasync --help` for all commands.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use schemasync_core::config::{SyncConfig, CONFIG_FILE};
use schemasync_core::conflict::ResolutionStrategy;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "schemasync",
    about = "Schema sync, conflict resolution and offline queue",
    version
)]
struct Cli {
    /// Config file
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the fingerprint of a schema file
    Hash { file: PathBuf },

    /// List entity and field differences between two schema files
    Diff { local: PathBuf, remote: PathBuf },

    /// Merge two schema files
    Resolve {
        local: PathBuf,
        remote: PathBuf,

        #[arg(long, value_enum, default_value_t = StrategyArg::Interactive)]
        strategy: StrategyArg,

        /// Write the merged schema here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Compare the local schema with the remote since the last sync
    Status,

    /// Send the local schema to the remote (queued when offline)
    Push {
        /// Overwrite remote changes
        #[arg(long)]
        force: bool,
    },

    /// Replace the local schema with the remote one
    Pull {
        /// Overwrite local changes
        #[arg(long)]
        force: bool,
    },

    /// Two-way sync, merging when both sides changed
    Sync {
        #[arg(long, value_enum, default_value_t = StrategyArg::Merge)]
        strategy: StrategyArg,
    },

    /// Probe the configured endpoint
    CheckNetwork,

    /// Inspect and manage the offline queue
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },
}

#[derive(Subcommand)]
enum QueueAction {
    /// List pending operations
    List,
    /// Counts by type and age range
    Stats,
    /// Drop duplicate intents, keeping the newest
    Consolidate,
    /// Drop operations that reached the retry ceiling
    Evict,
    /// Drop every pending operation
    Clear,
    /// Replay pending operations against the remote
    Flush,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    Local,
    Remote,
    Merge,
    Interactive,
}

impl StrategyArg {
    /// `None` means ask on the terminal
    fn strategy(self) -> Option<ResolutionStrategy> {
        match self {
            StrategyArg::Local => Some(ResolutionStrategy::LocalWins),
            StrategyArg::Remote => Some(ResolutionStrategy::RemoteWins),
            StrategyArg::Merge => Some(ResolutionStrategy::Merge),
            StrategyArg::Interactive => None,
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<SyncConfig> {
    let mut config = SyncConfig::load_from(&cli.config)?;
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    config.validate()?;
    schemasync_core::logging::init_logging(&config.logging)?;
    Ok(config)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Hash { file } => commands::schema::hash(&file),
        Commands::Diff { local, remote } => commands::schema::diff(&local, &remote),
        Commands::Resolve { local, remote, strategy, output } => {
            commands::schema::resolve(&local, &remote, strategy.strategy(), output.as_deref())
        }
        Commands::Status => commands::sync::status(&config).await,
        Commands::Push { force } => commands::sync::push(&config, force).await,
        Commands::Pull { force } => commands::sync::pull(&config, force).await,
        Commands::Sync { strategy } => commands::sync::sync(&config, strategy.strategy()).await,
        Commands::CheckNetwork => commands::sync::check_network(&config).await,
        Commands::Queue { action } => match action {
            QueueAction::List => commands::queue::list(&config),
            QueueAction::Stats => commands::queue::stats(&config),
            QueueAction::Consolidate => commands::queue::consolidate(&config),
            QueueAction::Evict => commands::queue::evict(&config),
            QueueAction::Clear => commands::queue::clear(&config),
            QueueAction::Flush => commands::queue::flush(&config).await,
        },
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_resolve_with_strategy() {
        let cli = Cli::parse_from([
            "schemasync",
            "resolve",
            "a.json",
            "b.json",
            "--strategy",
            "remote",
            "--output",
            "out.json",
        ]);
        match cli.command {
            Commands::Resolve { strategy, output, .. } => {
                assert_eq!(strategy.strategy(), Some(ResolutionStrategy::RemoteWins));
                assert_eq!(output, Some(PathBuf::from("out.json")));
            }
            _ => panic!("expected resolve"),
        }
    }

    #[test]
    fn sync_defaults_to_merge() {
        let cli = Cli::parse_from(["schemasync", "sync"]);
        match cli.command {
            Commands::Sync { strategy } => assert_eq!(strategy, StrategyArg::Merge),
            _ => panic!("expected sync"),
        }
        assert_eq!(cli.config, PathBuf::from(CONFIG_FILE));
    }
}
