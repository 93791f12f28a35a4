//! Audio output capability
//!
//! Decode and playout are delegated to rodio. The rodio output handle is not
//! `Send`, so a dedicated thread owns it for the process lifetime and accepts
//! commands over a channel; the receive timeout doubles as the refresh tick
//! for the shared sink-busy flag that `is_busy` reads.
//!
//! `RodioOutput::detect` is the capability probe: it is called once at engine
//! construction and a failed probe permanently degrades the engine to
//! reporting `output capability unavailable`.

use crate::error::{PlayerError, Result};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Output device abstraction
///
/// The playback session exclusively owns the implementation handle; nothing
/// else touches the device. Tests substitute a stub.
pub trait AudioOutput: Send + Sync {
    /// Start output of `path` at `offset` from the beginning of the track
    ///
    /// Any previous output is stopped first. Decode and device errors are
    /// returned, never panicked.
    fn start(&self, path: &Path, offset: Duration) -> Result<()>;

    /// Halt output if active; no-op otherwise
    fn stop(&self);

    /// True while the sink is still producing audio
    ///
    /// Goes false on its own when a track finishes naturally.
    fn is_busy(&self) -> bool;
}

enum OutputCommand {
    Start {
        path: PathBuf,
        offset: Duration,
        reply: mpsc::Sender<std::result::Result<(), String>>,
    },
    Stop,
    Shutdown,
}

/// rodio-backed output on a dedicated audio thread
pub struct RodioOutput {
    cmd_tx: mpsc::Sender<OutputCommand>,
    busy: Arc<AtomicBool>,
}

impl RodioOutput {
    /// Probe the default output device once
    ///
    /// Spawns the audio thread and waits for device initialization. Returns
    /// `None` when no output device can be opened; callers cache the result
    /// for the process lifetime.
    pub fn detect() -> Option<Arc<dyn AudioOutput>> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<OutputCommand>();
        let (init_tx, init_rx) = mpsc::channel::<std::result::Result<(), String>>();
        let busy = Arc::new(AtomicBool::new(false));
        let busy_thread = Arc::clone(&busy);

        let spawned = std::thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || audio_thread(cmd_rx, init_tx, busy_thread));

        if let Err(e) = spawned {
            warn!("Could not spawn audio thread: {}", e);
            return None;
        }

        match init_rx.recv() {
            Ok(Ok(())) => {
                info!("Audio output device available");
                Some(Arc::new(Self { cmd_tx, busy }))
            }
            Ok(Err(e)) => {
                warn!("No audio output device: {}", e);
                None
            }
            Err(_) => {
                warn!("Audio thread exited during initialization");
                None
            }
        }
    }
}

impl AudioOutput for RodioOutput {
    fn start(&self, path: &Path, offset: Duration) -> Result<()> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.cmd_tx
            .send(OutputCommand::Start {
                path: path.to_path_buf(),
                offset,
                reply: reply_tx,
            })
            .map_err(|_| PlayerError::Output("audio thread gone".to_string()))?;

        reply_rx
            .recv()
            .map_err(|_| PlayerError::Output("audio thread gone".to_string()))?
            .map_err(PlayerError::Output)
    }

    fn stop(&self) {
        let _ = self.cmd_tx.send(OutputCommand::Stop);
    }

    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

impl Drop for RodioOutput {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(OutputCommand::Shutdown);
    }
}

/// Audio thread: owns the rodio output stream and at most one sink
fn audio_thread(
    cmd_rx: mpsc::Receiver<OutputCommand>,
    init_tx: mpsc::Sender<std::result::Result<(), String>>,
    busy: Arc<AtomicBool>,
) {
    let (_stream, handle) = match rodio::OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            let _ = init_tx.send(Err(e.to_string()));
            return;
        }
    };
    let _ = init_tx.send(Ok(()));

    let mut sink: Option<rodio::Sink> = None;

    loop {
        match cmd_rx.recv_timeout(Duration::from_millis(50)) {
            Ok(OutputCommand::Start {
                path,
                offset,
                reply,
            }) => {
                if let Some(old) = sink.take() {
                    old.stop();
                }
                let result = start_sink(&handle, &path, offset);
                match result {
                    Ok(new_sink) => {
                        sink = Some(new_sink);
                        busy.store(true, Ordering::SeqCst);
                        let _ = reply.send(Ok(()));
                    }
                    Err(e) => {
                        busy.store(false, Ordering::SeqCst);
                        let _ = reply.send(Err(e));
                    }
                }
            }
            Ok(OutputCommand::Stop) => {
                if let Some(old) = sink.take() {
                    old.stop();
                }
                busy.store(false, Ordering::SeqCst);
            }
            Ok(OutputCommand::Shutdown) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                debug!("Audio thread shutting down");
                break;
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
        }

        // Refresh the busy flag so natural end-of-track is observable
        let still_busy = sink.as_ref().map_or(false, |s| !s.empty());
        busy.store(still_busy, Ordering::SeqCst);
    }
}

/// Build a sink playing `path` from `offset`
///
/// rodio has no seek primitive for arbitrary sources; `skip_duration` decodes
/// and discards up to the offset, which is how seek-by-restart lands on the
/// requested position.
fn start_sink(
    handle: &rodio::OutputStreamHandle,
    path: &Path,
    offset: Duration,
) -> std::result::Result<rodio::Sink, String> {
    use rodio::Source;

    let file = std::fs::File::open(path).map_err(|e| e.to_string())?;
    let decoder = rodio::Decoder::new(BufReader::new(file)).map_err(|e| e.to_string())?;
    let sink = rodio::Sink::try_new(handle).map_err(|e| e.to_string())?;

    if offset.is_zero() {
        sink.append(decoder);
    } else {
        sink.append(decoder.skip_duration(offset));
    }
    sink.play();
    Ok(sink)
}
