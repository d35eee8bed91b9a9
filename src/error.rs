//! Error kinds shared across the analyser, chart cache, and runtime.

use std::path::PathBuf;

/// Errors surfaced by chart generation, chart loading, and the runtime.
///
/// Generation errors (`NotFound`, `DecodeFailed`, `AnalyserUnavailable`) are
/// meant to propagate to the caller. `CacheCorrupt`, `TimingDegraded`, and
/// `Insufficient` are advisory/recoverable: callers that receive them from
/// the hot path should log and continue rather than abort.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The audio file does not exist at the given path.
    #[error("audio file not found: {0}")]
    NotFound(PathBuf),

    /// The audio file exists but could not be decoded.
    #[error("failed to decode audio file {path}: {reason}")]
    DecodeFailed { path: PathBuf, reason: String },

    /// The analyser could not be constructed (e.g. no worker thread capacity).
    #[error("audio analyser unavailable: {0}")]
    AnalyserUnavailable(String),

    /// A cached chart file exists but is unreadable or malformed; the caller
    /// should regenerate it.
    #[error("chart cache at {0:?} is corrupt, regenerating")]
    CacheCorrupt(PathBuf),

    /// The audio output device could not be claimed for playback.
    #[error("audio device busy: {0}")]
    AudioDeviceBusy(String),

    /// The clock/sync service has been drifting by more than 100 ms for
    /// over a second. Advisory only; playback continues.
    #[error("timing degraded: drift exceeded 100ms for over 1s")]
    TimingDegraded,

    /// Calibration did not collect enough taps (fewer than 3) to produce a
    /// reliable offset.
    #[error("insufficient calibration samples")]
    Insufficient,
}

pub type Result<T> = std::result::Result<T, CoreError>;
