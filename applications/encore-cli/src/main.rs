/// Encore - headless driver for the playback hub
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use encore_catalog::{ArchiveCatalog, ShowCatalog, StaticCatalog};
use encore_core::{NetworkState, ShowId, SourceId};
use encore_playback::{HubBuilder, HubCommand, HubEvent, NetworkMonitor};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod report;
mod simulated;

use config::AppConfig;
use simulated::{SimulatedBackend, SimulatedPlayer};

const BUNDLED_JERRY_LISTING: &str = include_str!("../data/jerry_shows.json");

#[derive(Parser)]
#[command(name = "encore")]
#[command(about = "Resolve and play concert recordings without a UI", long_about = None)]
struct Cli {
    /// Configuration file path (default: ./encore.toml if present)
    #[arg(short, long, global = true, env = "ENCORE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a show and print its playlist
    Resolve {
        /// Show identifier
        show: String,

        /// Catalog to look the show up in
        #[arg(short, long, default_value = "dead", value_parser = parse_catalog)]
        source: SourceId,
    },
    /// Play a show on the simulated player until it completes
    Play {
        /// Show identifier
        show: String,

        #[arg(short, long, default_value = "dead", value_parser = parse_catalog)]
        source: SourceId,

        /// Track to start from (1-based)
        #[arg(long, default_value_t = 1)]
        start: usize,

        /// Show seconds per real second
        #[arg(long, default_value_t = 60.0)]
        time_scale: f64,
    },
}

fn parse_catalog(raw: &str) -> std::result::Result<SourceId, String> {
    SourceId::from_str(&raw.to_ascii_lowercase())
        .filter(SourceId::is_catalog)
        .ok_or_else(|| format!("unknown catalog '{raw}', expected 'dead' or 'jerry'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Resolve { show, source } => resolve(&config, source, ShowId::new(show)).await,
        Commands::Play {
            show,
            source,
            start,
            time_scale,
        } => play(&config, source, ShowId::new(show), start, time_scale).await,
    }
}

fn build_catalog(config: &AppConfig, source: SourceId) -> Result<Arc<dyn ShowCatalog>> {
    let catalog: Arc<dyn ShowCatalog> = match source {
        SourceId::Dead => Arc::new(
            ArchiveCatalog::new(config.catalogs.dead.clone())
                .context("Failed to create archive catalog")?,
        ),
        SourceId::Jerry => {
            let listing = match &config.catalogs.jerry_listing {
                Some(path) => std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read listing {}", path.display()))?,
                None => BUNDLED_JERRY_LISTING.to_string(),
            };
            Arc::new(
                StaticCatalog::from_json(config.catalogs.jerry.clone(), &listing)
                    .context("Failed to load static listing")?,
            )
        }
        SourceId::Youtube => bail!("{source} has no catalog"),
    };
    Ok(catalog)
}

async fn resolve(config: &AppConfig, source: SourceId, show: ShowId) -> Result<()> {
    let catalog = build_catalog(config, source)?;
    let playlist = catalog
        .resolve(&show, 0)
        .await
        .with_context(|| format!("Failed to resolve {show}"))?;

    for line in report::playlist_lines(&playlist) {
        println!("{line}");
    }
    if playlist.invalid_count() > 0 {
        warn!(show = %show, invalid = playlist.invalid_count(), "Some tracks cannot be played");
    }
    Ok(())
}

async fn play(
    config: &AppConfig,
    source: SourceId,
    show: ShowId,
    start: usize,
    time_scale: f64,
) -> Result<()> {
    let Some(start_index) = start.checked_sub(1) else {
        bail!("--start counts from 1");
    };
    if !(time_scale.is_finite() && time_scale > 0.0) {
        bail!("--time-scale must be a positive number");
    }

    let catalog = build_catalog(config, source)?;
    let playlist = catalog
        .resolve(&show, start_index)
        .await
        .with_context(|| format!("Failed to resolve {show}"))?;
    for line in report::playlist_lines(&playlist) {
        println!("{line}");
    }
    let last_index = playlist.last_index();

    let network = NetworkMonitor::with_state(NetworkState::wifi());
    let backend = Arc::new(SimulatedBackend::new(&playlist));
    let builder: HubBuilder<SimulatedBackend, SimulatedPlayer> =
        HubBuilder::new(config.playback.clone());
    let player = SimulatedPlayer::new(builder.player_events(source), time_scale);
    let (hub, handle) = builder
        .engine(source, backend, player)
        .catalog(source, catalog)
        .network(network.subscribe())
        .build()
        .context("Failed to build playback hub")?;

    let mut events = handle.subscribe();
    let hub_task = hub.spawn();
    info!(show = %show, source = %source, start, time_scale, "Starting playback");

    handle
        .send(HubCommand::LoadPlaylist {
            source,
            playlist,
            start_index,
            autoplay: true,
        })
        .await?;

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                info!("Interrupted");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => {
                    if let Some(line) = report::describe(&event) {
                        println!("{line}");
                    }
                    match event {
                        HubEvent::ShowCompleted { .. } => break,
                        HubEvent::TrackFailed { index, terminal: true, .. } => {
                            if Some(index) == last_index {
                                break;
                            }
                            // Nobody is there to press retry; move on
                            handle.send(HubCommand::Next(source)).await?;
                        }
                        _ => {}
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event output fell behind"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    let now = handle.now_playing();
    if let Some(title) = now.title {
        info!(title = %title, elapsed = %report::clock(now.elapsed), "Stopped");
    }

    handle.shutdown().await?;
    hub_task.await.context("Playback hub task failed")?;
    Ok(())
}
