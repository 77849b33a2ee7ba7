//! Error types for cadence-ap
//!
//! Two layers:
//! - [`Error`]: plumbing failures (config files, scenario scripts) returned as `Result`
//! - [`EngineError`]: user-visible playback conditions, published on the engine's
//!   status channel and never returned from input setters

use cadence_common::events::TrackKind;
use thiserror::Error;

/// Main error type for cadence-ap plumbing
#[derive(Error, Debug)]
pub enum Error {
    /// Errors from the shared crate (I/O, TOML, config files)
    #[error(transparent)]
    Common(#[from] cadence_common::Error),

    /// Invalid scenario script
    #[error("Scenario error: {0}")]
    Scenario(String),
}

/// Convenience Result type using cadence-ap Error
pub type Result<T> = std::result::Result<T, Error>;

/// Playback conditions surfaced through `EngineStatus::error`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The audio graph could not be built; audio is disabled for the session
    #[error("Advanced audio features not supported: {0}")]
    GraphUnavailable(String),

    /// One track failed to load; the other track is unaffected
    #[error("Failed to load {}", .track.label())]
    TrackLoadFailed { track: TrackKind },

    /// Playback needs a user gesture (see `SessionAudio::play`)
    #[error("Audio playback blocked - click to enable audio")]
    AutoplayBlocked,
}
