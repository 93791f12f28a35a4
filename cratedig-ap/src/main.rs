//! Audition Player (cratedig-ap) - Main entry point
//!
//! Small CLI front end for the streaming playback engine: audition one track
//! from the catalog (or a raw URL), printing statuses and playback position
//! until the track ends or ctrl-c.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cratedig_ap::{Engine, PlaybackRequest};
use cratedig_common::catalog;
use cratedig_common::config::DataPaths;
use cratedig_common::events::EngineStatus;

/// Command-line arguments for cratedig-ap
#[derive(Parser, Debug)]
#[command(name = "cratedig-ap")]
#[command(about = "Audition player for the cratedig dataset tools")]
#[command(version)]
struct Args {
    /// Audio file URL to play directly
    #[arg(long, conflicts_with = "upload")]
    url: Option<String>,

    /// Catalog upload id to play (first MP3 file unless --file-index)
    #[arg(long)]
    upload: Option<u64>,

    /// File index within the upload
    #[arg(long)]
    file_index: Option<usize>,

    /// Start offset in seconds
    #[arg(long, default_value_t = 0.0, value_parser = parse_offset)]
    offset: f64,

    /// Data folder containing the catalog
    #[arg(short, long, env = "CRATEDIG_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cratedig_ap=debug,cratedig_common=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let (url, label) = resolve_track(&args)?;

    info!("Auditioning {}", label);

    let engine = Engine::new().context("Failed to initialize playback engine")?;
    let mut status_rx = engine.subscribe();

    engine
        .play(PlaybackRequest {
            url,
            start_offset: args.offset,
            label,
        })
        .await;

    let mut tick = tokio::time::interval(Duration::from_millis(500));
    let mut started = false;

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
            status = status_rx.recv() => {
                match status {
                    Ok(status) => {
                        info!("{}", status);
                        match status {
                            EngineStatus::Playing { .. } => started = true,
                            EngineStatus::Failed { .. } | EngineStatus::Stopped => break,
                            _ => {}
                        }
                    }
                    Err(_) => break,
                }
            }
            _ = tick.tick() => {
                if started {
                    if engine.is_playing().await {
                        let (pos, dur) = engine.elapsed().await;
                        info!("[{}/{}]", format_time(pos), format_time(dur));
                    } else {
                        info!("Track finished");
                        break;
                    }
                }
            }
        }
    }

    engine.shutdown().await;
    Ok(())
}

/// Resolve the URL and display label from the CLI arguments
fn resolve_track(args: &Args) -> Result<(String, String)> {
    if let Some(url) = &args.url {
        let label = url.rsplit('/').next().unwrap_or(url).to_string();
        return Ok((url.clone(), label));
    }

    let Some(upload_id) = args.upload else {
        bail!("either --url or --upload is required");
    };

    let paths = DataPaths::resolve(args.data_dir.as_deref())?;
    let uploads = catalog::load_catalog(&paths.catalog_file())
        .with_context(|| format!("Failed to load catalog {}", paths.catalog_file().display()))?;

    let upload = catalog::find_upload(&uploads, upload_id)
        .with_context(|| format!("Upload {} not in catalog", upload_id))?;

    let entry = match args.file_index {
        Some(index) => upload
            .files
            .get(index)
            .with_context(|| format!("Upload {} has no file index {}", upload_id, index))?,
        None => {
            let (_, entry) = upload
                .first_mp3()
                .with_context(|| format!("Upload {} has no MP3 file", upload_id))?;
            entry
        }
    };

    let url = entry
        .download_url
        .clone()
        .with_context(|| format!("No download URL for {}", entry.file_name))?;

    Ok((url, entry.file_name.clone()))
}

/// Offsets must be finite and non-negative; `inf`/`nan` parse as f64 but are
/// rejected here
fn parse_offset(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if !value.is_finite() || value < 0.0 {
        return Err("offset must be a finite number of seconds >= 0".to_string());
    }
    Ok(value)
}

/// mm:ss rendering for the position display
fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}
