//! Public session handle
//!
//! [`SessionAudio`] is the only way to talk to the engine. It is cheap to
//! clone; every clone drives the same actor. Input setters never fail: if the
//! engine already stopped, the input is logged and dropped.
//!
//! # Example
//!
//! ```no_run
//! use cadence_ap::sim::SimulatedHost;
//! use cadence_ap::SessionAudio;
//! use std::sync::Arc;
//!
//! # async fn demo() {
//! let audio = SessionAudio::builder(Arc::new(SimulatedHost::default()))
//!     .on_music_ended(|url| println!("finished {url}"))
//!     .build();
//!
//! audio.set_music_url("music/warmup.mp3".to_string());
//! audio.set_voiceover_url("vo/section-1.mp3".to_string());
//! audio.set_paused(false);
//!
//! audio.shutdown().await;
//! # }
//! ```

use super::core::EngineActor;
use crate::config::EngineConfig;
use crate::host::AudioHost;
use crate::playback::events::EngineMsg;
use crate::playback::graph::AudioGraph;
use crate::state::{EngineStatus, Visibility};
use cadence_common::events::{EventBus, SessionEvent};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

/// Called with the URL of a music track that played to its end
pub type MusicEndedCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Configures and starts a session audio engine
pub struct SessionAudioBuilder {
    host: Arc<dyn AudioHost>,
    config: EngineConfig,
    paused: bool,
    session_id: Option<Uuid>,
    on_music_ended: Option<MusicEndedCallback>,
}

impl SessionAudioBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Initial value of the paused input (default: paused)
    pub fn paused(mut self, paused: bool) -> Self {
        self.paused = paused;
        self
    }

    pub fn session_id(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Register the "music ended" notification
    ///
    /// Runs on the engine task; keep it short and non-blocking.
    pub fn on_music_ended(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_music_ended = Some(Arc::new(callback));
        self
    }

    /// Spawn the engine actor and return its handle
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(self) -> SessionAudio {
        let config = self.config.validate();
        let session_id = self.session_id.unwrap_or_else(Uuid::new_v4);

        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(EngineStatus::initial(config.music_volume));
        let events = EventBus::new(config.event_capacity);

        let actor = EngineActor::new(
            session_id,
            config,
            AudioGraph::new(self.host),
            self.paused,
            tx.downgrade(),
            status_tx,
            events.clone(),
            self.on_music_ended,
        );

        let span = info_span!("session_audio", session_id = %session_id);
        tokio::spawn(actor.run(rx).instrument(span));

        SessionAudio {
            session_id,
            tx,
            status_rx,
            events,
        }
    }
}

/// Handle to one session's audio engine
///
/// Dropping every clone stops the engine and tears its graph down.
#[derive(Clone)]
pub struct SessionAudio {
    session_id: Uuid,
    tx: mpsc::UnboundedSender<EngineMsg>,
    status_rx: watch::Receiver<EngineStatus>,
    events: EventBus,
}

impl SessionAudio {
    pub fn builder(host: Arc<dyn AudioHost>) -> SessionAudioBuilder {
        SessionAudioBuilder {
            host,
            config: EngineConfig::default(),
            paused: true,
            session_id: None,
            on_music_ended: None,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Set the background music URL; `None` or `""` unloads the music
    pub fn set_music_url(&self, url: impl Into<Option<String>>) {
        self.send(EngineMsg::SetMusicUrl(normalize_url(url.into())));
    }

    /// Set the current section's narration URL; `None` or `""` means none
    pub fn set_voiceover_url(&self, url: impl Into<Option<String>>) {
        self.send(EngineMsg::SetVoiceoverUrl(normalize_url(url.into())));
    }

    pub fn set_paused(&self, paused: bool) {
        self.send(EngineMsg::SetPaused(paused));
    }

    pub fn set_visibility(&self, visibility: Visibility) {
        self.send(EngineMsg::SetVisibility(visibility));
    }

    /// Manual music volume override, clamped to `[0.01, 1.0]`
    pub fn set_music_volume(&self, volume: f32) {
        self.send(EngineMsg::SetMusicVolume(volume));
    }

    /// Manual play; call from a user-gesture handler to unlock autoplay
    pub fn play(&self) {
        self.send(EngineMsg::ManualPlay);
    }

    pub fn clear_error(&self) {
        self.send(EngineMsg::ClearError);
    }

    /// Latest published status
    pub fn status(&self) -> EngineStatus {
        self.status_rx.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<EngineStatus> {
        self.status_rx.clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Tear the graph down and stop the engine
    ///
    /// Idempotent: later calls (from any clone) return immediately.
    pub async fn shutdown(&self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(EngineMsg::Shutdown(reply_tx)).is_err() {
            debug!("Session audio already stopped");
            return;
        }
        // A dropped reply means another shutdown got there first
        let _ = reply_rx.await;
    }

    fn send(&self, msg: EngineMsg) {
        if let Err(e) = self.tx.send(msg) {
            debug!("Session audio stopped, dropping {}", e.0.name());
        }
    }
}

fn normalize_url(url: Option<String>) -> Option<String> {
    url.filter(|u| !u.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_url_means_none() {
        assert_eq!(normalize_url(Some(String::new())), None);
        assert_eq!(normalize_url(Some("  ".into())), None);
        assert_eq!(normalize_url(None), None);
        assert_eq!(normalize_url(Some("a.mp3".into())).as_deref(), Some("a.mp3"));
    }
}
