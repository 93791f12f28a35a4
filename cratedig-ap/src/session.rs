//! Playback session: the single live track and its timing baseline
//!
//! Owns at most one local audio file at a time. Elapsed time is pure
//! wall-clock bookkeeping: `anchor = start instant - offset` is recorded when
//! output (re)starts and position is derived as `now - anchor`; there is no
//! authoritative position counter and the output device is never asked where
//! it is. The model drifts across device underruns or process suspension;
//! accepted for an audition tool.
//!
//! Seeking has no native primitive either: it stops output and restarts from
//! the target offset, re-basing the anchor so the elapsed math stays correct.

use crate::error::{PlayerError, Result};
use crate::output::AudioOutput;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Clamp a seek target to `[0, duration]`
///
/// With an unknown duration (0.0) every target collapses to 0, matching the
/// pre-existing behavior of the tool this replaces.
pub fn clamp_offset(target: f64, duration: f64) -> f64 {
    target.max(0.0).min(duration.max(0.0))
}

struct CurrentTrack {
    path: PathBuf,
    duration: f64,
    /// Wall-clock baseline: start instant minus the start offset
    anchor: Instant,
}

/// The component owning the single active output stream
pub struct PlaybackSession {
    output: Arc<dyn AudioOutput>,
    current: Option<CurrentTrack>,
}

impl PlaybackSession {
    pub fn new(output: Arc<dyn AudioOutput>) -> Self {
        Self {
            output,
            current: None,
        }
    }

    /// Start output of `path` at `offset` seconds
    ///
    /// A non-finite or oversized offset is rejected with `InvalidOffset`
    /// rather than reaching the duration conversion, which panics on such
    /// values. Duration is read from file metadata; on inspection failure it
    /// becomes 0.0 and playback still proceeds; only the elapsed-time display
    /// degrades. Returns the probed duration.
    pub fn start(&mut self, path: &Path, offset: f64) -> Result<f64> {
        let offset_secs = offset;
        let offset = Duration::try_from_secs_f64(offset.max(0.0))
            .map_err(|_| PlayerError::InvalidOffset(offset_secs))?;
        let duration = probe_duration(path);

        self.output.start(path, offset)?;
        self.current = Some(CurrentTrack {
            path: path.to_path_buf(),
            duration,
            anchor: anchor_for(offset),
        });

        debug!(
            "Session started: {} at {:.1}s (duration {:.1}s)",
            path.display(),
            offset.as_secs_f64(),
            duration
        );
        Ok(duration)
    }

    /// Halt output and delete the backing scratch file
    ///
    /// The file is single-use scratch, not a cache. Idempotent: stopping an
    /// idle session is a no-op.
    pub fn stop(&mut self) {
        if let Some(track) = self.current.take() {
            self.output.stop();
            match std::fs::remove_file(&track.path) {
                Ok(()) => debug!("Removed track file {}", track.path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Could not remove {}: {}", track.path.display(), e),
            }
        }
    }

    /// Current `(position, duration)` in seconds; `(0.0, 0.0)` when idle
    ///
    /// Pure read, safe to call from a display refresh timer.
    pub fn elapsed(&self) -> (f64, f64) {
        match &self.current {
            Some(track) => (track.anchor.elapsed().as_secs_f64(), track.duration),
            None => (0.0, 0.0),
        }
    }

    /// True only while a track is loaded AND the output sink is still busy
    ///
    /// Covers a track finishing naturally without an explicit stop.
    pub fn is_active(&self) -> bool {
        self.current.is_some() && self.output.is_busy()
    }

    /// Seek by `delta` seconds (negative = backward), clamped to the track
    ///
    /// Restarts output from the clamped target and re-bases the anchor.
    /// Returns the effective offset, or `None` when nothing is playing.
    pub fn seek(&mut self, delta: f64) -> Result<Option<f64>> {
        let Some(track) = self.current.as_mut() else {
            return Ok(None);
        };

        let position = track.anchor.elapsed().as_secs_f64();
        let target = clamp_offset(position + delta, track.duration);

        // The clamp keeps the target finite inside [0, duration]
        let target_offset = Duration::from_secs_f64(target);
        self.output.start(&track.path, target_offset)?;
        track.anchor = anchor_for(target_offset);

        debug!("Seek {:+.1}s -> {:.1}s", delta, target);
        Ok(Some(target))
    }
}

/// Wall-clock anchor for a track playing at `offset`
fn anchor_for(offset: Duration) -> Instant {
    let now = Instant::now();
    now.checked_sub(offset).unwrap_or(now)
}

/// Audio duration from file metadata, 0.0 when inspection fails
fn probe_duration(path: &Path) -> f64 {
    use lofty::prelude::AudioFile;

    match lofty::probe::Probe::open(path).and_then(|p| p.read()) {
        Ok(tagged) => tagged.properties().duration().as_secs_f64(),
        Err(e) => {
            warn!("Duration inspection failed for {}: {}", path.display(), e);
            0.0
        }
    }
}
