//! Error types for cratedig-ap
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. All failures inside the fetch worker and playback session are
//! converted to status values at the component boundary; none unwind into the
//! transport controller.

use thiserror::Error;

/// Main error type for the audition player
#[derive(Error, Debug)]
pub enum PlayerError {
    /// No audio output capability; reported for every playback request
    #[error("output capability unavailable")]
    CapabilityUnavailable,

    /// Transport-level network fault (DNS, reset, TLS, HTTP error status)
    #[error("network error: {0}")]
    Network(String),

    /// Clean transfer produced a zero-byte or missing file
    #[error("empty or missing file")]
    EmptyOrMissingFile,

    /// Start offset that cannot be expressed as a duration (non-finite or
    /// absurdly large)
    #[error("invalid start offset: {0}")]
    InvalidOffset(f64),

    /// Audio output device or decode errors
    #[error("audio output error: {0}")]
    Output(String),

    /// File I/O errors
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using PlayerError
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Fetch outcome distinguishing deliberate cancellation from failure
///
/// Callers must distinguish the two: a cancelled fetch is silent, never
/// surfaced as `Failed`.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Cancellation flag observed; partial file already removed
    #[error("cancelled")]
    Cancelled,

    /// Transfer failed
    #[error(transparent)]
    Failed(#[from] PlayerError),
}
