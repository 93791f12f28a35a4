//! Bulk Downloader (cratedig-dl) - Main entry point
//!
//! Downloads every selected upload's first MP3 into the music folder,
//! skipping files that already exist. Failures on individual uploads are
//! logged and counted; the run continues.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cratedig_common::catalog::{self, Upload};
use cratedig_common::config::DataPaths;
use cratedig_common::selection::SelectionStore;

/// Command-line arguments for cratedig-dl
#[derive(Parser, Debug)]
#[command(name = "cratedig-dl")]
#[command(about = "Bulk downloader for the cratedig dataset tools")]
#[command(version)]
struct Args {
    /// Data folder containing the catalog and selection file
    #[arg(short, long, env = "CRATEDIG_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Re-download files that already exist
    #[arg(long)]
    force: bool,
}

/// Per-run tally printed at the end
#[derive(Debug, Default)]
struct Summary {
    processed: usize,
    downloaded: usize,
    skipped: usize,
    errors: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cratedig_dl=info,cratedig_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let paths = DataPaths::resolve(args.data_dir.as_deref())?;

    let uploads = catalog::load_catalog(&paths.catalog_file())
        .with_context(|| format!("Failed to load catalog {}", paths.catalog_file().display()))?;
    let selection = SelectionStore::load(paths.selection_file())?;

    if selection.is_empty() {
        info!("No uploads selected, nothing to do");
        return Ok(());
    }

    let music_dir = paths.music_dir();
    std::fs::create_dir_all(&music_dir)
        .with_context(|| format!("Failed to create {}", music_dir.display()))?;

    let client = cratedig_common::http::build_client().context("Failed to build HTTP client")?;

    info!(
        "Downloading {} selected uploads to {}",
        selection.len(),
        music_dir.display()
    );

    let mut summary = Summary::default();
    for upload_id in selection.iter() {
        summary.processed += 1;

        let Some(upload) = catalog::find_upload(&uploads, upload_id) else {
            warn!("Upload {} not in catalog, skipping", upload_id);
            summary.errors += 1;
            continue;
        };

        match download_upload(&client, upload, &music_dir, args.force).await {
            Ok(true) => summary.downloaded += 1,
            Ok(false) => summary.skipped += 1,
            Err(e) => {
                warn!("Upload {}: {:#}", upload_id, e);
                summary.errors += 1;
            }
        }
    }

    info!(
        "Done: {} processed, {} downloaded, {} skipped, {} errors",
        summary.processed, summary.downloaded, summary.skipped, summary.errors
    );
    Ok(())
}

/// Download one upload's first MP3; returns false when the file already exists
async fn download_upload(
    client: &reqwest::Client,
    upload: &Upload,
    music_dir: &std::path::Path,
    force: bool,
) -> Result<bool> {
    let (file_index, entry) = upload
        .first_mp3()
        .with_context(|| format!("No MP3 file in \"{}\"", upload.upload_name))?;

    let url = entry
        .download_url
        .as_deref()
        .with_context(|| format!("No download URL for {}", entry.file_name))?;

    let dest = music_dir.join(format!("{}_{}.mp3", upload.upload_id, file_index));
    if !force && dest.exists() {
        info!("{} already present, skipping", dest.display());
        return Ok(false);
    }

    info!(
        "Downloading \"{}\" by {} -> {}",
        upload.upload_name,
        upload.user_real_name.as_deref().unwrap_or("unknown artist"),
        dest.display()
    );

    // A batch download is never cancelled mid-file
    let cancel = AtomicBool::new(false);
    let mut last_reported = 0u8;
    cratedig_ap::fetch::fetch(client, url, &dest, &cancel, |percent| {
        // Log at decile boundaries to keep the output readable
        if percent >= last_reported.saturating_add(10) || (percent == 100 && last_reported < 100) {
            info!("  {}%", percent);
            last_reported = percent;
        }
    })
    .await
    .with_context(|| format!("Download failed for {}", url))?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cratedig_common::catalog::{FileEntry, FileFormatInfo, Upload};

    fn upload_with_mp3() -> Upload {
        Upload {
            upload_id: 42,
            upload_name: "Night Drive".to_string(),
            user_real_name: None,
            upload_extra: Default::default(),
            files: vec![FileEntry {
                file_name: "track.mp3".to_string(),
                file_filesize: None,
                file_format_info: Some(FileFormatInfo {
                    default_ext: Some("mp3".to_string()),
                }),
                download_url: Some("https://example.test/track.mp3".to_string()),
            }],
        }
    }

    #[tokio::test]
    async fn test_existing_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("42_0.mp3"), b"data").unwrap();
        let client = cratedig_common::http::build_client().unwrap();

        // Skip decision happens before any network use
        let downloaded = download_upload(&client, &upload_with_mp3(), dir.path(), false)
            .await
            .unwrap();
        assert!(!downloaded);
    }

    #[tokio::test]
    async fn test_upload_without_mp3_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let client = cratedig_common::http::build_client().unwrap();

        let mut upload = upload_with_mp3();
        upload.files.clear();

        assert!(download_upload(&client, &upload, dir.path(), false)
            .await
            .is_err());
    }
}
