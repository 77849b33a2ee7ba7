//! Core engine actor - state, message loop and lifecycle
//!
//! **Responsibilities:**
//! - EngineActor struct definition and startup (graph initialization)
//! - Message dispatch, one message at a time
//! - Status snapshot publishing and session event emission
//! - Media lifecycle notices (ready, playing, paused, ended, error)
//! - Error channel (raise / clear)
//! - Teardown on shutdown or when every handle is dropped

use super::handle::MusicEndedCallback;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::host::{MediaEvent, MediaEventSink, MediaNotice};
use crate::playback::ducking::DuckingController;
use crate::playback::events::EngineMsg;
use crate::playback::generation::{Generation, GenerationCounter};
use crate::playback::graph::AudioGraph;
use crate::playback::track::Track;
use crate::state::{EngineStatus, Visibility};
use cadence_common::events::{EventBus, PlaybackState, SessionEvent, TrackKind};
use std::future::Future;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, trace, warn, Instrument};
use uuid::Uuid;

/// Session audio engine actor
///
/// Runs as a single task. Every field is touched only from that task.
pub(super) struct EngineActor {
    pub(super) session_id: Uuid,
    pub(super) config: EngineConfig,

    /// Session audio graph (context + two gains)
    pub(super) graph: AudioGraph,

    pub(super) music: Track,
    pub(super) voiceover: Track,
    pub(super) ducking: DuckingController,

    /// External paused input
    pub(super) paused: bool,
    pub(super) visibility: Visibility,

    /// Voiceover URL already played in the current section
    pub(super) played_marker: Option<String>,

    /// Invalidated by pause, unpause, manual play and wake-up
    pub(super) playback_gen: GenerationCounter,

    /// Invalidated by every voiceover URL change, pause and unpause
    pub(super) voiceover_gen: GenerationCounter,

    /// Debounced voiceover attempt waiting for `CanPlayThrough`
    pub(super) awaiting_voiceover: Option<Generation>,

    pub(super) error: Option<EngineError>,

    /// Weak so that dropping every handle closes the channel
    pub(super) tx: mpsc::WeakUnboundedSender<EngineMsg>,
    pub(super) status_tx: watch::Sender<EngineStatus>,
    pub(super) events: EventBus,
    pub(super) on_music_ended: Option<MusicEndedCallback>,

    /// Last published playback state (for PlaybackStateChanged)
    last_playing: bool,
    shut_down: bool,
}

impl EngineActor {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        session_id: Uuid,
        config: EngineConfig,
        graph: AudioGraph,
        paused: bool,
        tx: mpsc::WeakUnboundedSender<EngineMsg>,
        status_tx: watch::Sender<EngineStatus>,
        events: EventBus,
        on_music_ended: Option<MusicEndedCallback>,
    ) -> Self {
        Self {
            session_id,
            ducking: DuckingController::new(&config),
            config,
            graph,
            music: Track::new(TrackKind::Music),
            voiceover: Track::new(TrackKind::Voiceover),
            paused,
            visibility: Visibility::Visible,
            played_marker: None,
            playback_gen: GenerationCounter::new(),
            voiceover_gen: GenerationCounter::new(),
            awaiting_voiceover: None,
            error: None,
            tx,
            status_tx,
            events,
            on_music_ended,
            last_playing: false,
            shut_down: false,
        }
    }

    /// Actor main loop
    ///
    /// Exits on `Shutdown` or when every handle has been dropped; both paths
    /// tear the graph down.
    pub(super) async fn run(mut self, mut rx: mpsc::UnboundedReceiver<EngineMsg>) {
        self.start();
        self.publish_status();

        while let Some(msg) = rx.recv().await {
            trace!("Engine message: {}", msg.name());
            match msg {
                EngineMsg::Shutdown(reply) => {
                    self.teardown().await;
                    self.publish_status();
                    let _ = reply.send(());
                    return;
                }
                msg => self.handle(msg),
            }
            self.publish_status();
        }

        debug!("All session handles dropped");
        self.teardown().await;
        self.publish_status();
    }

    /// Build the audio graph
    ///
    /// On failure the engine keeps running with no graph: every input is
    /// accepted and nothing sounds.
    fn start(&mut self) {
        info!("Session audio engine starting (paused: {})", self.paused);

        if let Err(e) = self.graph.initialize(self.config.music_volume) {
            error!("Audio graph unavailable: {}", e);
            let message = e.to_string();
            self.error = Some(EngineError::GraphUnavailable(message.clone()));
            self.emit(SessionEvent::GraphUnavailable {
                session_id: self.session_id,
                message,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    fn handle(&mut self, msg: EngineMsg) {
        match msg {
            EngineMsg::SetMusicUrl(url) => self.set_music_url(url),
            EngineMsg::SetVoiceoverUrl(url) => self.set_voiceover_url(url),
            EngineMsg::SetPaused(paused) => self.set_paused(paused),
            EngineMsg::SetVisibility(visibility) => self.set_visibility(visibility),
            EngineMsg::SetMusicVolume(volume) => self.set_music_volume(volume),
            EngineMsg::ManualPlay => self.manual_play(),
            EngineMsg::ClearError => {
                if let Some(e) = self.error.take() {
                    debug!("Error cleared: {}", e);
                }
            }
            EngineMsg::Media(notice) => self.on_media(notice),
            EngineMsg::ContextResumed {
                generation,
                next,
                result,
            } => self.on_context_resumed(generation, next, result),
            EngineMsg::PlayResolved {
                track,
                instance,
                generation,
                result,
            } => self.on_play_resolved(track, instance, generation, result),
            EngineMsg::DebounceElapsed { generation } => self.on_debounce_elapsed(generation),
            // Intercepted by the run loop
            EngineMsg::Shutdown(_) => {}
        }
    }

    /// Release both tracks and close the graph
    ///
    /// Idempotent.
    async fn teardown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        // Outstanding continuations become stale
        self.playback_gen.advance();
        self.voiceover_gen.advance();
        self.awaiting_voiceover = None;

        self.music.clear();
        self.voiceover.clear();
        self.graph.teardown().await;

        info!("Session audio engine stopped");
    }

    // ========================================
    // Outputs
    // ========================================

    pub(super) fn snapshot(&self) -> EngineStatus {
        let music_ready = self.music.is_ready();
        let voiceover_ready = self.voiceover.url().is_none()
            || self.voiceover.is_ready()
            || self.voiceover.has_failed();

        EngineStatus {
            music_ready,
            voiceover_ready,
            is_ready: music_ready && voiceover_ready,
            is_playing: self.music.is_playing() || self.voiceover.is_playing(),
            current_volume: self.ducking.current_volume(),
            ducking: self.ducking.state(),
            error: self.error.clone(),
        }
    }

    fn publish_status(&mut self) {
        let status = self.snapshot();

        if status.is_playing != self.last_playing {
            let new_state = status.playback_state();
            let old_state = match new_state {
                PlaybackState::Playing => PlaybackState::Paused,
                PlaybackState::Paused => PlaybackState::Playing,
            };
            debug!("Playback state {} -> {}", old_state, new_state);
            self.last_playing = status.is_playing;
            self.emit(SessionEvent::PlaybackStateChanged {
                session_id: self.session_id,
                old_state,
                new_state,
                timestamp: chrono::Utc::now(),
            });
        }

        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }

    pub(super) fn emit(&self, event: SessionEvent) {
        self.events.emit_lossy(event);
    }

    /// Emit a per-track event built from the track's current URL
    pub(super) fn emit_track_event(
        &self,
        kind: TrackKind,
        build: impl FnOnce(Uuid, TrackKind, String) -> SessionEvent,
    ) {
        let url = self.track(kind).url().unwrap_or_default().to_string();
        self.emit(build(self.session_id, kind, url));
    }

    /// Surface a user-visible error
    ///
    /// A `GraphUnavailable` error stays until explicitly cleared.
    pub(super) fn raise(&mut self, err: EngineError) {
        if let Some(EngineError::GraphUnavailable(_)) = &self.error {
            debug!("Not replacing graph error with: {}", err);
            return;
        }

        if err == EngineError::AutoplayBlocked {
            if self.error.as_ref() != Some(&EngineError::AutoplayBlocked) {
                warn!("{}", err);
                self.emit(SessionEvent::AutoplayBlocked {
                    session_id: self.session_id,
                    timestamp: chrono::Utc::now(),
                });
            }
        } else {
            warn!("{}", err);
        }
        self.error = Some(err);
    }

    /// Clear an autoplay error once audio is allowed
    pub(super) fn clear_autoplay_blocked(&mut self) {
        if self.error == Some(EngineError::AutoplayBlocked) {
            info!("Audio playback unlocked");
            self.error = None;
        }
    }

    // ========================================
    // Helpers
    // ========================================

    pub(super) fn track(&self, kind: TrackKind) -> &Track {
        match kind {
            TrackKind::Music => &self.music,
            TrackKind::Voiceover => &self.voiceover,
        }
    }

    pub(super) fn track_mut(&mut self, kind: TrackKind) -> &mut Track {
        match kind {
            TrackKind::Music => &mut self.music,
            TrackKind::Voiceover => &mut self.voiceover,
        }
    }

    /// Run `work` on its own task and feed its result back into the actor
    ///
    /// The result is dropped if the engine has stopped in the meantime.
    pub(super) fn spawn_reply<F>(&self, work: F)
    where
        F: Future<Output = EngineMsg> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(
            async move {
                let msg = work.await;
                match tx.upgrade() {
                    Some(tx) => {
                        let _ = tx.send(msg);
                    }
                    None => trace!("Engine gone, dropping {}", msg.name()),
                }
            }
            .in_current_span(),
        );
    }

    /// Replace the media of `kind` with a fresh one loading `url`
    ///
    /// Does nothing without a graph.
    pub(super) fn load_track(&mut self, kind: TrackKind, url: &str) {
        let (Some(context), Some(gain)) = (
            self.graph.context().cloned(),
            self.graph.gain(kind).cloned(),
        ) else {
            debug!("No audio graph, ignoring {} URL {}", kind, url);
            return;
        };

        let sink_tx = self.tx.clone();
        let result = self.track_mut(kind).load(&context, &gain, url, move |kind, instance| {
            MediaEventSink::new(kind, instance, move |notice| {
                if let Some(tx) = sink_tx.upgrade() {
                    let _ = tx.send(EngineMsg::Media(notice));
                }
            })
        });

        match result {
            Ok(()) => {
                info!("Loading {}: {}", kind, url);
                if self.track(kind).is_ready() {
                    self.emit_track_event(kind, |session_id, track, url| SessionEvent::TrackReady {
                        session_id,
                        track,
                        url,
                        timestamp: chrono::Utc::now(),
                    });
                }
            }
            Err(e) => self.on_track_failed(kind, e.to_string()),
        }
    }

    // ========================================
    // Media notices
    // ========================================

    fn on_media(&mut self, notice: MediaNotice) {
        let MediaNotice {
            track,
            instance,
            event,
        } = notice;

        if !self.track(track).is_current(instance) {
            debug!(
                "Discarding stale {:?} from {} instance {}",
                event, track, instance
            );
            return;
        }

        match event {
            MediaEvent::CanPlayThrough => self.on_can_play_through(track),
            MediaEvent::Playing => self.on_playing(track),
            MediaEvent::Paused => self.on_paused(track),
            MediaEvent::Ended => self.on_ended(track),
            MediaEvent::Error(message) => self.on_track_failed(track, message),
        }
    }

    fn on_can_play_through(&mut self, kind: TrackKind) {
        let track = self.track_mut(kind);
        if !track.is_ready() {
            track.set_ready();
            debug!("{} ready", kind);
            self.emit_track_event(kind, |session_id, track, url| SessionEvent::TrackReady {
                session_id,
                track,
                url,
                timestamp: chrono::Utc::now(),
            });
        }

        match kind {
            TrackKind::Music => self.request_music_start(),
            TrackKind::Voiceover => self.on_voiceover_buffered(),
        }
    }

    fn on_playing(&mut self, kind: TrackKind) {
        if self.paused {
            debug!("{} started while paused, pausing again", kind);
            self.track_mut(kind).pause();
            return;
        }

        let track = self.track_mut(kind);
        if track.is_playing() {
            return;
        }
        track.set_playing(true);
        info!("{} playing: {}", kind, track.url().unwrap_or_default());
        self.emit_track_event(kind, |session_id, track, url| SessionEvent::TrackStarted {
            session_id,
            track,
            url,
            timestamp: chrono::Utc::now(),
        });

        if kind == TrackKind::Voiceover {
            self.duck_for_voiceover();
        }
    }

    fn on_paused(&mut self, kind: TrackKind) {
        let track = self.track_mut(kind);
        if !track.is_playing() {
            return;
        }
        track.set_playing(false);
        debug!("{} paused by host", kind);
        self.emit_track_event(kind, |session_id, track, url| SessionEvent::TrackPaused {
            session_id,
            track,
            url,
            timestamp: chrono::Utc::now(),
        });
    }

    fn on_ended(&mut self, kind: TrackKind) {
        self.track_mut(kind).set_ended();
        let url = self.track(kind).url().unwrap_or_default().to_string();
        info!("{} ended: {}", kind, url);

        match kind {
            TrackKind::Music => {
                self.emit(SessionEvent::MusicEnded {
                    session_id: self.session_id,
                    url: url.clone(),
                    timestamp: chrono::Utc::now(),
                });
                if let Some(callback) = &self.on_music_ended {
                    callback(&url);
                }
            }
            TrackKind::Voiceover => {
                self.emit(SessionEvent::VoiceoverEnded {
                    session_id: self.session_id,
                    url,
                    timestamp: chrono::Utc::now(),
                });
                self.restore_after_voiceover();
            }
        }
    }

    /// Load or playback failure of one track; the other track is unaffected
    pub(super) fn on_track_failed(&mut self, kind: TrackKind, message: String) {
        let url = self.track(kind).url().unwrap_or_default().to_string();
        warn!("{} failed ({}): {}", kind, url, message);

        self.track_mut(kind).mark_failed();
        if kind == TrackKind::Voiceover {
            self.awaiting_voiceover = None;
            self.restore_after_voiceover();
        }

        self.raise(EngineError::TrackLoadFailed { track: kind });
        self.emit(SessionEvent::TrackFailed {
            session_id: self.session_id,
            track: kind,
            url,
            message,
            timestamp: chrono::Utc::now(),
        });
    }

    // ========================================
    // Ducking
    // ========================================

    pub(super) fn duck_for_voiceover(&mut self) {
        let gain = self.graph.gain(TrackKind::Music).cloned();
        let now = self.graph.now();
        if let Some(ramp) = self.ducking.engage(gain.as_deref(), now) {
            self.emit_ducking_changed(ramp.target);
        }
    }

    /// Return music to full volume if narration ducked it
    pub(super) fn restore_after_voiceover(&mut self) {
        let gain = self.graph.gain(TrackKind::Music).cloned();
        let now = self.graph.now();
        if let Some(ramp) = self.ducking.release(gain.as_deref(), now) {
            self.emit_ducking_changed(ramp.target);
        }
    }

    fn emit_ducking_changed(&self, target_volume: f32) {
        let state = self.ducking.state();
        debug!("Ducking {:?} -> {:.2}", state, target_volume);
        self.emit(SessionEvent::DuckingChanged {
            session_id: self.session_id,
            state,
            target_volume,
            timestamp: chrono::Utc::now(),
        });
    }

    pub(super) fn set_music_volume(&mut self, volume: f32) {
        let gain = self.graph.gain(TrackKind::Music).cloned();
        let now = self.graph.now();
        match self.ducking.set_music_volume(gain.as_deref(), now, volume) {
            Some(ramp) => info!("Music volume -> {:.2}", ramp.target),
            None => info!(
                "Music volume -> {:.2} after narration",
                self.ducking.music_volume()
            ),
        }
    }
}
