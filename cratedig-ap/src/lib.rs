//! # cratedig Audition Player (cratedig-ap)
//!
//! Streaming playback engine for auditioning remote audio files: fetch in the
//! background, cancel mid-fetch, track elapsed position from wall-clock
//! bookkeeping, and seek by restarting output from an offset.
//!
//! **Architecture:** transport controller (state machine) -> fetch worker
//! (spawned task, cooperative cancellation) -> playback session (single live
//! track, rodio output on a dedicated thread) -> scratch storage (one
//! temporary file). Statuses flow to the UI over a broadcast bus; the UI
//! polls `is_playing`/`elapsed` for display refresh only.

pub mod engine;
pub mod error;
pub mod fetch;
pub mod output;
pub mod scratch;
pub mod session;

pub use engine::{Engine, PlaybackRequest};
pub use error::{FetchError, PlayerError, Result};
