//! Transport controller: the public-facing playback state machine
//!
//! Accepts play/stop/seek requests from the UI layer, supersedes in-flight
//! fetches when a new request arrives, and pushes statuses on the bus. The
//! controller never blocks on network I/O: each fetch runs in its own spawned
//! task, fire-and-forget, and a new request only signals the old task's
//! cancellation flag, never joining it. The old task self-cleans (removes
//! its partial file).
//!
//! Status ordering per request is `Downloading(non-decreasing)* -> Playing |
//! Failed`, or nothing at all after cancellation. Staleness is decided by a
//! generation counter: `play` and `stop` bump it inside their critical
//! section, and every emission on behalf of request *n* first checks that the
//! generation still equals *n* under the same lock. A superseded worker's
//! late callbacks are therefore suppressed, never displayed.

use crate::error::{FetchError, PlayerError, Result};
use crate::fetch::{self, CancelFlag};
use crate::output::{AudioOutput, RodioOutput};
use crate::scratch::ScratchDir;
use crate::session::PlaybackSession;
use cratedig_common::events::{EngineStatus, StatusBus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Status bus capacity; a slow UI drops old statuses, never blocks the engine
const STATUS_CAPACITY: usize = 256;

/// One play (or seek-restart) request from the UI
///
/// Immutable once submitted. A later request supersedes it; nothing mutates
/// it in flight.
#[derive(Debug, Clone)]
pub struct PlaybackRequest {
    /// Remote audio file URL
    pub url: String,

    /// Start offset in seconds (>= 0)
    pub start_offset: f64,

    /// Display label for the Playing status (usually the file name)
    pub label: String,
}

impl PlaybackRequest {
    /// Request playing `url` from the beginning
    pub fn new(url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            start_offset: 0.0,
            label: label.into(),
        }
    }
}

struct Core {
    client: reqwest::Client,
    scratch: ScratchDir,
    session: tokio::sync::Mutex<PlaybackSession>,

    /// Generation of the latest request; guards every status emission
    current_gen: std::sync::Mutex<u64>,

    /// Cancellation flag of the in-flight fetch, if any
    in_flight: std::sync::Mutex<Option<CancelFlag>>,
}

struct EngineInner {
    status: StatusBus,

    /// `None` when the output capability probe failed at construction;
    /// the engine then degrades to reporting failure for every request
    core: Option<Core>,
}

/// The playback engine handle exposed to the UI layer
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    /// Create the engine, probing the audio output capability once
    pub fn new() -> Result<Self> {
        Self::with_output(RodioOutput::detect())
    }

    /// Create the engine with an explicit output capability
    ///
    /// `None` yields the degraded engine that fails every playback request;
    /// tests pass a stub output.
    pub fn with_output(output: Option<Arc<dyn AudioOutput>>) -> Result<Self> {
        let status = StatusBus::new(STATUS_CAPACITY);

        let core = match output {
            Some(output) => Some(Core {
                client: cratedig_common::http::build_client()
                    .map_err(|e| PlayerError::Internal(e.to_string()))?,
                scratch: ScratchDir::new()?,
                session: tokio::sync::Mutex::new(PlaybackSession::new(output)),
                current_gen: std::sync::Mutex::new(0),
                in_flight: std::sync::Mutex::new(None),
            }),
            None => None,
        };

        Ok(Self {
            inner: Arc::new(EngineInner { status, core }),
        })
    }

    /// Subscribe to engine statuses
    pub fn subscribe(&self) -> broadcast::Receiver<EngineStatus> {
        self.inner.status.subscribe()
    }

    /// Request playback of a remote file
    ///
    /// Cancels any in-flight fetch and clears any playing track first, so at
    /// most one fetch and one scratch file are ever live. Returns once the
    /// fetch task is spawned; completion is reported on the status bus.
    pub async fn play(&self, request: PlaybackRequest) {
        let Some(core) = &self.inner.core else {
            self.inner.status.emit_lossy(EngineStatus::Failed {
                reason: PlayerError::CapabilityUnavailable.to_string(),
            });
            return;
        };

        let cancel: CancelFlag = Arc::new(AtomicBool::new(false));
        let generation = {
            let mut session = core.session.lock().await;

            let generation = {
                let mut gen = core.current_gen.lock().unwrap();
                *gen += 1;
                *gen
            };

            // Supersede: signal the old worker, do not wait for it
            if let Some(old) = core.in_flight.lock().unwrap().replace(Arc::clone(&cancel)) {
                old.store(true, Ordering::SeqCst);
            }

            // Clear residue from the prior track unconditionally
            session.stop();
            generation
        };

        let request_id = Uuid::new_v4();
        info!(%request_id, url = %request.url, "Play request");
        self.inner
            .emit_if_current(core, generation, EngineStatus::Downloading { percent: 0 });

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.run_fetch(generation, request_id, request, cancel).await;
        });
    }

    /// Stop playback and cancel any in-flight fetch
    ///
    /// Safe to call when idle: the status still becomes `Stopped`, nothing
    /// errors.
    pub async fn stop(&self) {
        if let Some(core) = &self.inner.core {
            let mut session = core.session.lock().await;

            // Invalidate any pending emissions, then cancel the worker
            *core.current_gen.lock().unwrap() += 1;
            if let Some(cancel) = core.in_flight.lock().unwrap().take() {
                cancel.store(true, Ordering::SeqCst);
            }

            session.stop();
        }

        self.inner.status.emit_lossy(EngineStatus::Stopped);
    }

    /// Seek forward by `secs`; no-op unless something is playing
    pub async fn seek_forward(&self, secs: f64) {
        self.seek(secs).await;
    }

    /// Seek backward by `secs`; no-op unless something is playing
    pub async fn seek_backward(&self, secs: f64) {
        self.seek(-secs).await;
    }

    async fn seek(&self, delta: f64) {
        let Some(core) = &self.inner.core else {
            return;
        };

        let mut session = core.session.lock().await;
        if !session.is_active() {
            debug!("Seek ignored: nothing playing");
            return;
        }

        if let Err(e) = session.seek(delta) {
            warn!("Seek failed: {}", e);
            self.inner.status.emit_lossy(EngineStatus::Failed {
                reason: e.to_string(),
            });
        }
    }

    /// True while a track is playing and the sink is still busy
    pub async fn is_playing(&self) -> bool {
        match &self.inner.core {
            Some(core) => core.session.lock().await.is_active(),
            None => false,
        }
    }

    /// Current `(position, duration)` in seconds for the display timer
    pub async fn elapsed(&self) -> (f64, f64) {
        match &self.inner.core {
            Some(core) => core.session.lock().await.elapsed(),
            None => (0.0, 0.0),
        }
    }

    /// Full cleanup on shutdown: stop playback and clear the scratch folder
    ///
    /// The scratch directory itself is removed when the last engine handle is
    /// dropped.
    pub async fn shutdown(&self) {
        self.stop().await;
        if let Some(core) = &self.inner.core {
            core.scratch.clear();
        }
    }
}

impl EngineInner {
    /// Emit a status on behalf of request `generation`, unless superseded
    fn emit_if_current(&self, core: &Core, generation: u64, status: EngineStatus) {
        let gen = core.current_gen.lock().unwrap();
        if *gen == generation {
            self.status.emit_lossy(status);
        }
    }

    /// Fetch worker wrapper: download, then hand the file to the session
    async fn run_fetch(
        self: Arc<Self>,
        generation: u64,
        request_id: Uuid,
        request: PlaybackRequest,
        cancel: CancelFlag,
    ) {
        // Invariant: run_fetch is only spawned with a live core
        let Some(core) = &self.core else {
            return;
        };

        // Generation-numbered file: a superseded worker never touches ours
        let dest = core.scratch.file_for(generation);
        let on_progress = |percent: u8| {
            self.emit_if_current(core, generation, EngineStatus::Downloading { percent });
        };

        match fetch::fetch(&core.client, &request.url, &dest, &cancel, on_progress).await {
            Ok(()) => {
                let mut session = core.session.lock().await;

                // The generation cannot change while we hold the session
                // lock, so one check covers the start and the emission.
                if *core.current_gen.lock().unwrap() != generation {
                    debug!(%request_id, "Superseded after download, discarding");
                    drop(session);
                    core.scratch.remove(&dest);
                    return;
                }

                match session.start(&dest, request.start_offset) {
                    Ok(duration) => {
                        info!(%request_id, duration, "Playback started");
                        self.status.emit_lossy(EngineStatus::Playing {
                            track: request.label.clone(),
                        });
                    }
                    Err(e) => {
                        warn!(%request_id, "Playback start failed: {}", e);
                        core.scratch.remove(&dest);
                        self.status.emit_lossy(EngineStatus::Failed {
                            reason: e.to_string(),
                        });
                    }
                }
            }
            Err(FetchError::Cancelled) => {
                // Deliberate stop or supersede: silent, partial file removed
                debug!(%request_id, "Fetch cancelled");
            }
            Err(FetchError::Failed(e)) => {
                warn!(%request_id, "Fetch failed: {}", e);
                self.emit_if_current(
                    core,
                    generation,
                    EngineStatus::Failed {
                        reason: e.to_string(),
                    },
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_play_without_capability_fails() {
        let engine = Engine::with_output(None).unwrap();
        let mut rx = engine.subscribe();

        engine
            .play(PlaybackRequest::new("https://example.test/x.mp3", "x.mp3"))
            .await;

        let status = rx.recv().await.unwrap();
        assert_eq!(
            status,
            EngineStatus::Failed {
                reason: "output capability unavailable".to_string()
            }
        );
        assert!(!engine.is_playing().await);
        assert_eq!(engine.elapsed().await, (0.0, 0.0));
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_noop() {
        let engine = Engine::with_output(None).unwrap();
        let mut rx = engine.subscribe();

        engine.stop().await;
        assert_eq!(rx.recv().await.unwrap(), EngineStatus::Stopped);
    }

    #[tokio::test]
    async fn test_seek_without_capability_is_silent() {
        let engine = Engine::with_output(None).unwrap();
        let mut rx = engine.subscribe();

        engine.seek_forward(5.0).await;
        engine.seek_backward(5.0).await;

        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
