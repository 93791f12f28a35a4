//! Engine integration tests
//!
//! Exercise the transport controller against a local HTTP fixture server and
//! a stub audio output: supersede correctness, cancellation, progress
//! reporting with and without Content-Length, and failure statuses.

mod helpers;

use std::time::Duration;

use cratedig_ap::{Engine, PlaybackRequest};
use cratedig_common::events::EngineStatus;
use helpers::{spawn_fixture_server, url, StubOutput};
use tokio::sync::broadcast;
use tokio::time::timeout;

/// Receive the next status or panic after five seconds
async fn next_status(rx: &mut broadcast::Receiver<EngineStatus>) -> EngineStatus {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for status")
        .expect("status bus closed")
}

/// Drain statuses until the first non-Downloading one, returning it along
/// with the observed progress percents
async fn drain_download(rx: &mut broadcast::Receiver<EngineStatus>) -> (EngineStatus, Vec<u8>) {
    let mut percents = Vec::new();
    loop {
        match next_status(rx).await {
            EngineStatus::Downloading { percent } => percents.push(percent),
            terminal => return (terminal, percents),
        }
    }
}

#[tokio::test]
async fn test_download_completes_and_plays() {
    let addr = spawn_fixture_server().await;
    let output = StubOutput::new();
    let engine = Engine::with_output(Some(output.clone())).unwrap();
    let mut rx = engine.subscribe();

    engine
        .play(PlaybackRequest::new(url(addr, "/track.mp3"), "track.mp3"))
        .await;

    let (terminal, percents) = drain_download(&mut rx).await;
    assert_eq!(
        terminal,
        EngineStatus::Playing {
            track: "track.mp3".to_string()
        }
    );

    // Content-Length known: progress is non-decreasing and reaches 100
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(percents.last().copied(), Some(100));

    assert_eq!(output.start_count(), 1);
    assert!(engine.is_playing().await);

    engine.shutdown().await;
}

#[tokio::test]
async fn test_missing_content_length_still_completes() {
    let addr = spawn_fixture_server().await;
    let output = StubOutput::new();
    let engine = Engine::with_output(Some(output.clone())).unwrap();
    let mut rx = engine.subscribe();

    engine
        .play(PlaybackRequest::new(url(addr, "/nolen.mp3"), "nolen.mp3"))
        .await;

    let (terminal, percents) = drain_download(&mut rx).await;
    assert!(matches!(terminal, EngineStatus::Playing { .. }));

    // No Content-Length: progress reported as 0 throughout
    assert!(!percents.is_empty());
    assert!(percents.iter().all(|&p| p == 0));

    engine.shutdown().await;
}

#[tokio::test]
async fn test_cancel_mid_download_is_stopped_not_failed() {
    let addr = spawn_fixture_server().await;
    let output = StubOutput::new();
    let engine = Engine::with_output(Some(output.clone())).unwrap();
    let mut rx = engine.subscribe();

    engine
        .play(PlaybackRequest::new(url(addr, "/slow.mp3"), "slow.mp3"))
        .await;

    // Let the transfer get going, then stop mid-download
    tokio::time::sleep(Duration::from_millis(150)).await;
    engine.stop().await;

    let (terminal, _) = drain_download(&mut rx).await;
    assert_eq!(terminal, EngineStatus::Stopped);

    // A deliberate stop is never reported as a failure
    match timeout(Duration::from_millis(300), rx.recv()).await {
        Err(_) => {}
        Ok(status) => panic!("unexpected status after stop: {:?}", status),
    }
    assert_eq!(output.start_count(), 0);
    assert!(!engine.is_playing().await);
}

#[tokio::test]
async fn test_supersede_drops_first_request_silently() {
    let addr = spawn_fixture_server().await;
    let output = StubOutput::new();
    let engine = Engine::with_output(Some(output.clone())).unwrap();
    let mut rx = engine.subscribe();

    // Request A stalls forever after its first chunk
    engine
        .play(PlaybackRequest::new(url(addr, "/stall.mp3"), "stall.mp3"))
        .await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Request B supersedes it
    engine
        .play(PlaybackRequest::new(url(addr, "/track.mp3"), "track.mp3"))
        .await;

    let (terminal, _) = drain_download(&mut rx).await;
    assert_eq!(
        terminal,
        EngineStatus::Playing {
            track: "track.mp3".to_string()
        }
    );

    // Exactly one session start (B's); no late statuses from A
    assert_eq!(output.start_count(), 1);
    match timeout(Duration::from_millis(300), rx.recv()).await {
        Err(_) => {}
        Ok(status) => panic!("stale status after supersede: {:?}", status),
    }

    engine.shutdown().await;
}

#[tokio::test]
async fn test_non_finite_offset_reports_failure() {
    let addr = spawn_fixture_server().await;
    let output = StubOutput::new();
    let engine = Engine::with_output(Some(output.clone())).unwrap();
    let mut rx = engine.subscribe();

    let mut request = PlaybackRequest::new(url(addr, "/track.mp3"), "track.mp3");
    request.start_offset = f64::INFINITY;
    engine.play(request).await;

    // The request still terminates with a status instead of a dead task
    let (terminal, _) = drain_download(&mut rx).await;
    assert!(matches!(terminal, EngineStatus::Failed { .. }));
    assert_eq!(output.start_count(), 0);
    assert!(!engine.is_playing().await);
}

#[tokio::test]
async fn test_empty_file_reports_failure() {
    let addr = spawn_fixture_server().await;
    let output = StubOutput::new();
    let engine = Engine::with_output(Some(output.clone())).unwrap();
    let mut rx = engine.subscribe();

    engine
        .play(PlaybackRequest::new(url(addr, "/empty.mp3"), "empty.mp3"))
        .await;

    let (terminal, _) = drain_download(&mut rx).await;
    assert_eq!(
        terminal,
        EngineStatus::Failed {
            reason: "empty or missing file".to_string()
        }
    );
    assert_eq!(output.start_count(), 0);
}

#[tokio::test]
async fn test_failure_leaves_engine_ready_for_next_request() {
    let addr = spawn_fixture_server().await;
    let output = StubOutput::new();
    let engine = Engine::with_output(Some(output.clone())).unwrap();
    let mut rx = engine.subscribe();

    engine
        .play(PlaybackRequest::new(url(addr, "/empty.mp3"), "empty.mp3"))
        .await;
    let (terminal, _) = drain_download(&mut rx).await;
    assert!(matches!(terminal, EngineStatus::Failed { .. }));

    // A fresh request right after a failure plays normally
    engine
        .play(PlaybackRequest::new(url(addr, "/track.mp3"), "track.mp3"))
        .await;
    let (terminal, _) = drain_download(&mut rx).await;
    assert!(matches!(terminal, EngineStatus::Playing { .. }));
    assert_eq!(output.start_count(), 1);

    engine.shutdown().await;
}

#[tokio::test]
async fn test_failed_fetch_removes_partial_file() {
    use std::sync::atomic::AtomicBool;

    let addr = spawn_fixture_server().await;
    let client = cratedig_common::http::build_client().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("current.mp3");
    let cancel = AtomicBool::new(false);

    let result = cratedig_ap::fetch::fetch(
        &client,
        &url(addr, "/break.mp3"),
        &dest,
        &cancel,
        |_| {},
    )
    .await;

    assert!(matches!(result, Err(cratedig_ap::FetchError::Failed(_))));
    assert!(!dest.exists(), "partial file left behind after failure");
}

#[tokio::test]
async fn test_cancelled_fetch_removes_partial_file() {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    let addr = spawn_fixture_server().await;
    let client = cratedig_common::http::build_client().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("current.mp3");

    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_flip = Arc::clone(&cancel);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(120)).await;
        cancel_flip.store(true, Ordering::SeqCst);
    });

    let result = cratedig_ap::fetch::fetch(
        &client,
        &url(addr, "/slow.mp3"),
        &dest,
        &cancel,
        |_| {},
    )
    .await;

    assert!(matches!(result, Err(cratedig_ap::FetchError::Cancelled)));
    assert!(!dest.exists(), "partial file left behind after cancel");
}
