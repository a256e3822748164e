//! autozoomd: the AutoZoom daemon.
//!
//! Runs the zoom decision controller against recorded host events and
//! administers the persistent override store.
//!
//! # Usage
//!
//! ```text
//! autozoomd replay --trace session.jsonl --data-dir /var/lib/autozoom
//! autozoomd overrides list
//! autozoomd overrides clear https://example.com
//! autozoomd options show
//! ```

mod replay;
mod trace;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use autozoom_core::{DaemonConfig, Origin};
use autozoom_state::{KeyValueStore, OptionsStore, OverrideTracker, StateStore};
use clap::{Parser, Subcommand};
use tracing::info;

const DB_FILE: &str = "autozoom.redb";

#[derive(Parser)]
#[command(name = "autozoomd", about = "AutoZoom daemon")]
struct Cli {
    /// Path to autozoomd.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory for persistent state. Overrides the config file.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a recorded event trace through the controller.
    Replay {
        /// JSON Lines trace file.
        #[arg(long)]
        trace: PathBuf,

        /// Forget all overrides before replaying.
        #[arg(long)]
        fresh_start: bool,
    },
    /// Inspect or reset overridden origins.
    Overrides {
        #[command(subcommand)]
        action: OverridesAction,
    },
    /// Inspect stored options.
    Options {
        #[command(subcommand)]
        action: OptionsAction,
    },
}

#[derive(Subcommand)]
enum OverridesAction {
    /// List overridden origins.
    List,
    /// Clear the override of one origin (given any URL on it), or all.
    Clear { url: Option<String> },
}

#[derive(Subcommand)]
enum OptionsAction {
    /// Print the effective options as JSON.
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,autozoomd=debug,autozoom=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.data_dir)?;
    let store = open_store(&config)?;

    match cli.command {
        Command::Replay { trace, fresh_start } => {
            run_replay(store, &config, &trace, fresh_start).await
        }
        Command::Overrides { action } => run_overrides(store, action).await,
        Command::Options {
            action: OptionsAction::Show,
        } => {
            let options = OptionsStore::new(store).load().await?;
            println!("{}", serde_json::to_string_pretty(&options)?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>, data_dir: Option<PathBuf>) -> anyhow::Result<DaemonConfig> {
    let mut config = match path {
        Some(path) => DaemonConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => DaemonConfig::default(),
    };
    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir;
    }
    Ok(config)
}

fn open_store(config: &DaemonConfig) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("failed to create {}", config.data_dir.display()))?;
    let db_path = config.data_dir.join(DB_FILE);
    let store = StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");
    Ok(Arc::new(store))
}

async fn run_replay(
    store: Arc<dyn KeyValueStore>,
    config: &DaemonConfig,
    trace: &Path,
    fresh_start: bool,
) -> anyhow::Result<()> {
    let options_store = OptionsStore::new(store.clone());
    if let Some(options) = &config.options {
        options_store.save(options).await?;
        info!("options from config file stored");
    }
    let options = options_store.load().await?;

    let tracker = Arc::new(OverrideTracker::new(store));
    if fresh_start {
        let removed = tracker.clear_all_overrides().await?;
        info!(removed, "fresh start, overrides cleared");
    }

    let events = trace::load_trace(trace)?;
    info!(events = events.len(), trace = %trace.display(), "replaying trace");

    let replayer = replay::Replayer::new(tracker, options);
    let report = replayer.run(&events).await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run_overrides(
    store: Arc<dyn KeyValueStore>,
    action: OverridesAction,
) -> anyhow::Result<()> {
    let tracker = OverrideTracker::new(store);
    match action {
        OverridesAction::List => {
            for origin in tracker.overridden_origins().await? {
                println!("{origin}");
            }
        }
        OverridesAction::Clear { url: Some(url) } => {
            let origin = Origin::from_url(&url)?;
            if tracker.clear_override(&origin).await? {
                println!("cleared {origin}");
            } else {
                println!("{origin} was not overridden");
            }
        }
        OverridesAction::Clear { url: None } => {
            let removed = tracker.clear_all_overrides().await?;
            println!("cleared {removed} overrides");
        }
    }
    Ok(())
}
