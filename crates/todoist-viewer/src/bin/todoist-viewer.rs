//! Todoist viewer binary.
//!
//! Polls the configured Todoist projects and prints the sensor view as one JSON
//! line per published snapshot.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use todoist_viewer::{
    ConfigFile, ConfigStore, CoordinatorRegistry, EntryConfig, FileConfigStore,
    MemoryConfigStore, Snapshot, SnapshotListener, TaskSensor,
};

#[derive(Debug, Parser)]
#[command(name = "todoist-viewer", version, about = "Poll Todoist projects and print task snapshots")]
struct Cli {
    /// TOML file with one [[entries]] table per project. Without it, a single
    /// entry is read from TODOIST_* environment variables.
    #[arg(short, long, env = "TODOIST_VIEWER_CONFIG")]
    config: Option<PathBuf>,

    /// Override the update interval (seconds) of every entry.
    #[arg(short, long)]
    interval: Option<u64>,

    /// Refresh once, print the result and exit.
    #[arg(long)]
    once: bool,

    /// Emit logs as JSON.
    #[arg(long)]
    json: bool,
}

/// Prints the sensor view of its entry after every publish.
struct PrintListener {
    sensor: TaskSensor,
}

#[async_trait]
impl SnapshotListener for PrintListener {
    async fn snapshot_published(&self, _snapshot: &Arc<Snapshot>) {
        print_state(&self.sensor).await;
    }
}

async fn print_state(sensor: &TaskSensor) {
    match serde_json::to_string(&sensor.state().await) {
        Ok(line) => println!("{line}"),
        Err(e) => error!(error = %e, "Failed to serialize sensor state"),
    }
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive("todoist_viewer=info".parse()?);

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
    Ok(())
}

fn load_entries(cli: &Cli) -> Result<(Vec<EntryConfig>, Arc<dyn ConfigStore>)> {
    let (mut entries, store): (Vec<EntryConfig>, Arc<dyn ConfigStore>) = match &cli.config {
        Some(path) => {
            let file = ConfigFile::load(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            info!(path = %path.display(), entries = file.entries.len(), "Loaded config file");
            (file.entries, Arc::new(FileConfigStore::new(path)))
        }
        None => (
            vec![EntryConfig::from_env()],
            Arc::new(MemoryConfigStore::new()),
        ),
    };

    if let Some(secs) = cli.interval {
        for entry in &mut entries {
            entry.update_interval_secs = secs;
        }
    }

    if entries.is_empty() {
        bail!("No entries configured");
    }
    Ok((entries, store))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json)?;

    info!("Starting Todoist viewer...");

    let (entries, store) = load_entries(&cli)?;
    let registry = CoordinatorRegistry::new(store);

    let mut sensors = Vec::new();
    for entry in &entries {
        match registry.setup_entry(entry).await {
            Ok(coordinator) => {
                let sensor = TaskSensor::new(coordinator.clone());
                if !cli.once {
                    print_state(&sensor).await;
                    coordinator
                        .subscribe(Arc::new(PrintListener {
                            sensor: sensor.clone(),
                        }))
                        .await;
                }
                sensors.push(sensor);
            }
            Err(e) => {
                error!(entry_id = %entry.entry_id, error = %e, "Failed to set up entry");
            }
        }
    }

    if sensors.is_empty() {
        bail!("No entry could be set up");
    }
    if sensors.len() < entries.len() {
        warn!(
            running = sensors.len(),
            configured = entries.len(),
            "Some entries failed to set up"
        );
    }

    if cli.once {
        for sensor in &sensors {
            print_state(sensor).await;
        }
    } else {
        info!(entries = ?registry.entry_ids().await, "Polling Todoist, press Ctrl-C to stop");
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for shutdown signal")?;
        info!("Shutdown signal received");
    }

    registry.shutdown().await;
    Ok(())
}
