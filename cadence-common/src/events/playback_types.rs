//! Playback-related type definitions
//!
//! Supporting types for playback state, track identity and ducking state.

use serde::{Deserialize, Serialize};

/// Playback state enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// The two logical tracks of a session
///
/// Exactly two are modeled: background music and section narration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// Background music, routed through the music gain (ducked by narration)
    Music,
    /// Section narration, routed through the voiceover gain
    Voiceover,
}

impl TrackKind {
    /// Human-readable name used in log lines and error messages
    pub fn label(&self) -> &'static str {
        match self {
            TrackKind::Music => "background music",
            TrackKind::Voiceover => "voiceover audio",
        }
    }
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Music => write!(f, "music"),
            TrackKind::Voiceover => write!(f, "voiceover"),
        }
    }
}

/// Music gain ducking state
///
/// - `Normal`: music at full configured volume
/// - `Ducked`: music reduced while narration plays
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DuckingState {
    #[default]
    Normal,
    Ducked,
}

impl std::fmt::Display for DuckingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuckingState::Normal => write!(f, "normal"),
            DuckingState::Ducked => write!(f, "ducked"),
        }
    }
}
