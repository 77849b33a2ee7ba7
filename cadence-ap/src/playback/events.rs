//! Internal engine messages
//!
//! Everything that reaches the engine actor travels over one channel as an
//! [`EngineMsg`]: inputs from the public handle, media notices from the host,
//! and completions of work the actor spawned. Processing them one at a time is
//! what makes the engine single-threaded.
//!
//! These are internal-only. Observers see `cadence_common::events::SessionEvent`.

use crate::host::{HostError, MediaNotice, PlayError};
use crate::playback::generation::Generation;
use crate::state::Visibility;
use cadence_common::events::TrackKind;
use tokio::sync::oneshot;

/// What to do once the audio context is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterResume {
    /// Unpause: start every ready track
    StartTracks,
    /// Manual play from a user gesture
    ManualPlay,
    /// Returned to foreground
    Wake,
    /// Music finished loading
    Music,
    /// Debounced voiceover attempt is due
    Voiceover,
}

/// Messages processed by the engine actor
#[derive(Debug)]
pub enum EngineMsg {
    // Inputs
    SetMusicUrl(Option<String>),
    SetVoiceoverUrl(Option<String>),
    SetPaused(bool),
    SetVisibility(Visibility),
    SetMusicVolume(f32),
    ManualPlay,
    ClearError,
    Shutdown(oneshot::Sender<()>),

    /// Lifecycle event from a media source
    Media(MediaNotice),

    /// A context resume issued under `generation` completed
    ContextResumed {
        generation: Generation,
        next: AfterResume,
        result: Result<(), HostError>,
    },

    /// A `play()` issued on `track` instance `instance` resolved
    PlayResolved {
        track: TrackKind,
        instance: u64,
        generation: Generation,
        result: Result<(), PlayError>,
    },

    /// Voiceover debounce issued under `generation` elapsed
    DebounceElapsed { generation: Generation },
}

impl EngineMsg {
    /// Short name for trace output
    pub fn name(&self) -> &'static str {
        match self {
            EngineMsg::SetMusicUrl(_) => "SetMusicUrl",
            EngineMsg::SetVoiceoverUrl(_) => "SetVoiceoverUrl",
            EngineMsg::SetPaused(_) => "SetPaused",
            EngineMsg::SetVisibility(_) => "SetVisibility",
            EngineMsg::SetMusicVolume(_) => "SetMusicVolume",
            EngineMsg::ManualPlay => "ManualPlay",
            EngineMsg::ClearError => "ClearError",
            EngineMsg::Shutdown(_) => "Shutdown",
            EngineMsg::Media(_) => "Media",
            EngineMsg::ContextResumed { .. } => "ContextResumed",
            EngineMsg::PlayResolved { .. } => "PlayResolved",
            EngineMsg::DebounceElapsed { .. } => "DebounceElapsed",
        }
    }
}
