//! Test fixtures for engine integration tests
//!
//! A local axum server stands in for the content origin, with routes shaped
//! to exercise the fetch worker: a normal transfer, a chunked response
//! without Content-Length, a slow transfer (cancellation window), a stalled
//! transfer (headers then nothing), and a zero-byte file.

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use cratedig_ap::output::AudioOutput;
use cratedig_ap::PlayerError;

/// Bytes served for the normal track route
pub const TRACK_BYTES: usize = 64 * 1024;

/// Spawn the fixture server, returning its address
pub async fn spawn_fixture_server() -> SocketAddr {
    let app = Router::new()
        .route("/track.mp3", get(track))
        .route("/nolen.mp3", get(no_length))
        .route("/slow.mp3", get(slow))
        .route("/stall.mp3", get(stall))
        .route("/break.mp3", get(broken))
        .route("/empty.mp3", get(empty));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Fixture URL for `route` on the server at `addr`
pub fn url(addr: SocketAddr, route: &str) -> String {
    format!("http://{}{}", addr, route)
}

/// Fixed-size body; axum sets Content-Length for us
async fn track() -> impl IntoResponse {
    vec![0u8; TRACK_BYTES]
}

/// Chunked body, no Content-Length header
async fn no_length() -> Response {
    let stream = async_stream::stream! {
        for _ in 0..8 {
            yield Ok::<Vec<u8>, std::io::Error>(vec![0u8; 4096]);
        }
    };
    Response::new(Body::from_stream(stream))
}

/// Slow transfer: enough chunks and delay to cancel mid-download
async fn slow() -> Response {
    let stream = async_stream::stream! {
        for _ in 0..40 {
            yield Ok::<Vec<u8>, std::io::Error>(vec![0u8; 4096]);
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    };
    Response::new(Body::from_stream(stream))
}

/// One chunk, then the connection stalls forever
async fn stall() -> Response {
    let stream = async_stream::stream! {
        yield Ok::<Vec<u8>, std::io::Error>(vec![0u8; 1024]);
        futures::future::pending::<()>().await;
    };
    Response::new(Body::from_stream(stream))
}

/// One chunk, then the body stream errors out mid-transfer
async fn broken() -> Response {
    let stream = async_stream::stream! {
        yield Ok::<Vec<u8>, std::io::Error>(vec![0u8; 1024]);
        yield Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset",
        ));
    };
    Response::new(Body::from_stream(stream))
}

/// Clean transfer of a zero-byte file
async fn empty() -> impl IntoResponse {
    Vec::<u8>::new()
}

/// Output stub recording start calls; never touches a device
pub struct StubOutput {
    busy: AtomicBool,
    starts: Mutex<Vec<(PathBuf, Duration)>>,
}

impl StubOutput {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            busy: AtomicBool::new(false),
            starts: Mutex::new(Vec::new()),
        })
    }

    pub fn start_count(&self) -> usize {
        self.starts.lock().unwrap().len()
    }
}

impl AudioOutput for StubOutput {
    fn start(&self, path: &Path, offset: Duration) -> Result<(), PlayerError> {
        self.starts.lock().unwrap().push((path.to_path_buf(), offset));
        self.busy.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.busy.store(false, Ordering::SeqCst);
    }

    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}
