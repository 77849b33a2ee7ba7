//! Engine status snapshot
//!
//! The engine publishes an [`EngineStatus`] on a `watch` channel after every
//! message it processes. Observers read the latest snapshot; intermediate
//! states may be skipped.

use crate::error::EngineError;
use cadence_common::events::{DuckingState, PlaybackState};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Host foreground/background signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Visible,
    Hidden,
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "visible" => Ok(Visibility::Visible),
            "hidden" => Ok(Visibility::Hidden),
            other => Err(format!("unknown visibility '{}'", other)),
        }
    }
}

/// Snapshot of the engine's observable outputs
#[derive(Debug, Clone, PartialEq)]
pub struct EngineStatus {
    /// Music can play through (false while loading, failed or unset)
    pub music_ready: bool,

    /// Voiceover can play through, is unset, or failed (nothing to wait for)
    pub voiceover_ready: bool,

    /// Both tracks ready
    pub is_ready: bool,

    /// Either track is audibly playing
    pub is_playing: bool,

    /// Music volume the gain is at or ramping toward
    ///
    /// Set to the ramp target when a ramp is scheduled; the audible gain
    /// reaches it `fade_time_secs` later.
    pub current_volume: f32,

    pub ducking: DuckingState,

    /// Current user-visible error, cleared with `SessionAudio::clear_error`
    pub error: Option<EngineError>,
}

impl EngineStatus {
    /// Status of an engine that has not processed anything yet
    pub fn initial(music_volume: f32) -> Self {
        Self {
            music_ready: false,
            voiceover_ready: true,
            is_ready: false,
            is_playing: false,
            current_volume: music_volume,
            ducking: DuckingState::Normal,
            error: None,
        }
    }

    pub fn playback_state(&self) -> PlaybackState {
        if self.is_playing {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        }
    }

    /// Error text for display, if any
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_common::events::TrackKind;

    #[test]
    fn test_initial_status() {
        let status = EngineStatus::initial(0.8);
        assert!(!status.is_ready);
        assert!(status.voiceover_ready);
        assert_eq!(status.current_volume, 0.8);
        assert_eq!(status.playback_state(), PlaybackState::Paused);
        assert!(status.error_message().is_none());
    }

    #[test]
    fn test_visibility_from_str() {
        assert_eq!("Hidden".parse::<Visibility>(), Ok(Visibility::Hidden));
        assert!("asleep".parse::<Visibility>().is_err());
    }

    #[test]
    fn test_error_message() {
        let status = EngineStatus {
            error: Some(EngineError::TrackLoadFailed {
                track: TrackKind::Voiceover,
            }),
            ..EngineStatus::initial(1.0)
        };
        assert_eq!(
            status.error_message().as_deref(),
            Some("Failed to load voiceover audio")
        );
    }
}
