//! Fetch worker: chunked streaming download of one audio file
//!
//! Runs inside a spawned task so the caller never blocks on network I/O. The
//! body is streamed to the scratch file chunk by chunk rather than buffered
//! whole; the cancellation flag is checked before and after every chunk write
//! so a stop or supersede is observed promptly. Cancellation is cooperative
//! and there is no transfer deadline: a genuinely stalled connection never
//! aborts, it only stops mattering once superseded.

use crate::error::{FetchError, PlayerError};
use futures::StreamExt;
use reqwest::Client;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Shared cancellation flag, set by the transport controller and polled here
pub type CancelFlag = Arc<AtomicBool>;

fn network_err(e: reqwest::Error) -> PlayerError {
    PlayerError::Network(e.to_string())
}

/// Best-effort removal of a partial download
async fn remove_partial(dest: &Path) {
    if let Err(e) = tokio::fs::remove_file(dest).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove partial file {}: {}", dest.display(), e);
        }
    }
}

/// Download `url` to `dest`, reporting progress after every chunk
///
/// Progress percent is derived from `Content-Length` when the header is
/// present and stays 0 for the whole transfer otherwise. On cancellation the
/// partial file is deleted and the outcome is `FetchError::Cancelled`, which
/// callers must not surface as a failure. A clean transfer that leaves a
/// zero-byte or missing file fails with `EmptyOrMissingFile`.
pub async fn fetch(
    client: &Client,
    url: &str,
    dest: &Path,
    cancel: &AtomicBool,
    mut on_progress: impl FnMut(u8),
) -> std::result::Result<(), FetchError> {
    if cancel.load(Ordering::SeqCst) {
        return Err(FetchError::Cancelled);
    }

    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(network_err)?;

    let total_bytes = response.content_length();
    debug!(
        "Fetching {} ({} bytes declared)",
        url,
        total_bytes.map_or_else(|| "unknown".to_string(), |n| n.to_string())
    );

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(PlayerError::from)?;
    let mut stream = response.bytes_stream();
    let mut received: u64 = 0;

    while let Some(chunk) = stream.next().await {
        if cancel.load(Ordering::SeqCst) {
            drop(file);
            remove_partial(dest).await;
            return Err(FetchError::Cancelled);
        }

        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                drop(file);
                remove_partial(dest).await;
                return Err(network_err(e).into());
            }
        };

        if let Err(e) = file.write_all(&chunk).await {
            drop(file);
            remove_partial(dest).await;
            return Err(PlayerError::from(e).into());
        }
        received += chunk.len() as u64;

        let percent = match total_bytes {
            Some(total) if total > 0 => ((received * 100) / total).min(100) as u8,
            _ => 0,
        };
        on_progress(percent);

        if cancel.load(Ordering::SeqCst) {
            drop(file);
            remove_partial(dest).await;
            return Err(FetchError::Cancelled);
        }
    }

    if let Err(e) = file.flush().await {
        drop(file);
        remove_partial(dest).await;
        return Err(PlayerError::from(e).into());
    }
    drop(file);

    let size = tokio::fs::metadata(dest).await.map(|m| m.len()).unwrap_or(0);
    if size == 0 {
        remove_partial(dest).await;
        return Err(PlayerError::EmptyOrMissingFile.into());
    }

    debug!("Fetched {} bytes to {}", size, dest.display());
    Ok(())
}
