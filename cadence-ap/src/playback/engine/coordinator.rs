//! Playback coordinator - pause/unpause, context resume, music, manual play
//!
//! **Responsibilities:**
//! - Translate the `paused` input into start/stop of both tracks
//! - Resume a suspended context before any play is issued
//! - Issue `play()` requests and act on their (possibly stale) results
//! - Manual play: the user-gesture entry point that unlocks autoplay
//!
//! **Ordering:** a play that depends on the context running is only issued
//! from the `ContextResumed` continuation, never alongside the resume.

use super::core::EngineActor;
use crate::error::EngineError;
use crate::host::{Activation, ContextState, HostError, PlayError};
use crate::playback::events::{AfterResume, EngineMsg};
use crate::playback::generation::Generation;
use cadence_common::events::{SessionEvent, TrackKind};
use tracing::{debug, info, warn};

impl EngineActor {
    pub(super) fn set_music_url(&mut self, url: Option<String>) {
        if url.as_deref() == self.music.url() && !self.music.has_failed() {
            debug!("Music URL unchanged");
            return;
        }

        match url {
            None => {
                self.music.clear();
                info!("Music cleared");
            }
            Some(url) => {
                self.load_track(TrackKind::Music, &url);
                if self.music.is_ready() {
                    self.request_music_start();
                }
            }
        }
    }

    pub(super) fn set_paused(&mut self, paused: bool) {
        if self.paused == paused {
            debug!("Paused flag unchanged ({})", paused);
            return;
        }
        self.paused = paused;

        // Both directions invalidate in-flight work
        let generation = self.playback_gen.advance();
        self.voiceover_gen.advance();

        if paused {
            self.awaiting_voiceover = None;
            self.pause_track(TrackKind::Music);
            self.pause_track(TrackKind::Voiceover);
            info!("Playback paused");
        } else {
            info!("Playback resumed");
            self.ensure_running(generation, AfterResume::StartTracks, Activation::Programmatic);
        }
    }

    /// Pause a track immediately (no fade)
    fn pause_track(&mut self, kind: TrackKind) {
        let was_playing = self.track(kind).is_playing();
        self.track_mut(kind).pause();
        if was_playing {
            self.emit_track_event(kind, |session_id, track, url| SessionEvent::TrackPaused {
                session_id,
                track,
                url,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    /// User-gesture entry point
    ///
    /// Clears an autoplay error, resumes the context with the gesture and
    /// starts both tracks. While paused it only unlocks the context.
    pub(super) fn manual_play(&mut self) {
        self.clear_autoplay_blocked();
        let generation = self.playback_gen.advance();
        info!("Manual play requested (paused: {})", self.paused);
        self.ensure_running(generation, AfterResume::ManualPlay, Activation::UserGesture);
    }

    /// Continue with `next` once the context is running
    ///
    /// A running context continues immediately. A suspended one is resumed on
    /// a separate task; the continuation arrives as `ContextResumed` and is
    /// dropped if `generation` went stale in the meantime.
    pub(super) fn ensure_running(
        &mut self,
        generation: Generation,
        next: AfterResume,
        activation: Activation,
    ) {
        match self.graph.state() {
            None => debug!("No audio graph, skipping {:?}", next),
            Some(ContextState::Running) => self.after_resume(generation, next),
            Some(ContextState::Suspended) => {
                let Some(context) = self.graph.context().cloned() else {
                    return;
                };
                debug!("Resuming suspended context for {:?} ({})", next, generation);
                self.spawn_reply(async move {
                    let result = context.resume(activation).await;
                    EngineMsg::ContextResumed {
                        generation,
                        next,
                        result,
                    }
                });
            }
            Some(ContextState::Closed) => warn!("Audio context closed, skipping {:?}", next),
        }
    }

    pub(super) fn on_context_resumed(
        &mut self,
        generation: Generation,
        next: AfterResume,
        result: Result<(), HostError>,
    ) {
        let current = match next {
            AfterResume::Voiceover => self.voiceover_gen.is_current(generation),
            _ => self.playback_gen.is_current(generation),
        };
        if !current {
            debug!("Discarding stale context resume for {:?} ({})", next, generation);
            return;
        }

        match result {
            Ok(()) => {
                debug!("Context running");
                self.after_resume(generation, next);
            }
            Err(HostError::NotAllowed) => self.raise(EngineError::AutoplayBlocked),
            Err(e) => warn!("Context resume failed: {}", e),
        }
    }

    fn after_resume(&mut self, generation: Generation, next: AfterResume) {
        match next {
            AfterResume::StartTracks | AfterResume::Wake => {
                if self.paused {
                    debug!("Paused, not starting tracks");
                    return;
                }
                self.start_music(Activation::Programmatic);
                self.resume_or_attempt_voiceover(Activation::Programmatic);
            }
            AfterResume::ManualPlay => {
                if self.paused {
                    info!("Audio unlocked, staying paused");
                    return;
                }
                self.start_music(Activation::UserGesture);
                self.resume_or_attempt_voiceover(Activation::UserGesture);
            }
            AfterResume::Music => self.start_music(Activation::Programmatic),
            AfterResume::Voiceover => self.play_voiceover_when_ready(generation),
        }
    }

    /// Start music once it is loaded, if nothing forbids it
    pub(super) fn request_music_start(&mut self) {
        if self.paused {
            return;
        }
        let generation = self.playback_gen.current();
        self.ensure_running(generation, AfterResume::Music, Activation::Programmatic);
    }

    fn start_music(&mut self, activation: Activation) {
        if self.paused {
            return;
        }
        let music = &self.music;
        if music.media().is_none() || !music.is_ready() || music.is_playing() || music.has_ended() {
            return;
        }
        if music.play_in_flight().is_some() {
            debug!("Music play already in flight");
            return;
        }

        let generation = self.playback_gen.current();
        self.issue_play(TrackKind::Music, activation, generation);
    }

    /// Spawn `play()` on the current media of `kind`
    ///
    /// The result comes back as `PlayResolved` tagged with the media instance
    /// and `generation`.
    pub(super) fn issue_play(&mut self, kind: TrackKind, activation: Activation, generation: Generation) {
        let track = self.track_mut(kind);
        let Some(media) = track.media().cloned() else {
            return;
        };
        let instance = track.instance();
        track.set_play_in_flight(Some(generation));
        debug!(
            "play() {} instance {} ({}, {:?})",
            kind, instance, generation, activation
        );

        self.spawn_reply(async move {
            let result = media.play(activation).await;
            EngineMsg::PlayResolved {
                track: kind,
                instance,
                generation,
                result,
            }
        });
    }

    pub(super) fn on_play_resolved(
        &mut self,
        kind: TrackKind,
        instance: u64,
        generation: Generation,
        result: Result<(), PlayError>,
    ) {
        let current = match kind {
            TrackKind::Music => self.playback_gen.is_current(generation),
            TrackKind::Voiceover => self.voiceover_gen.is_current(generation),
        };
        let paused = self.paused;

        let track = self.track_mut(kind);
        if !track.is_current(instance) {
            debug!("Discarding stale play result from replaced {} instance {}", kind, instance);
            return;
        }
        if track.play_in_flight() == Some(generation) {
            track.set_play_in_flight(None);
        }

        if !current {
            debug!("Discarding stale play result for {} ({})", kind, generation);
            if result.is_ok() {
                if paused {
                    // Cannot cancel a play; undo it instead
                    track.pause();
                } else if kind == TrackKind::Voiceover {
                    // The current narration is audible after all
                    self.mark_voiceover_played();
                }
            }
            return;
        }

        match result {
            Ok(()) => {
                if kind == TrackKind::Voiceover {
                    self.mark_voiceover_played();
                }
                self.clear_autoplay_blocked();
            }
            Err(PlayError::NotAllowed) => self.raise(EngineError::AutoplayBlocked),
            Err(PlayError::Aborted) => debug!("{} play aborted", kind),
            Err(PlayError::Failed(message)) => self.on_track_failed(kind, message),
        }
    }

    /// Record the current narration as played for this section
    ///
    /// A `play()` that resolves while the context is suspended produced no
    /// sound; the narration stays due and is attempted again on wake-up.
    fn mark_voiceover_played(&mut self) {
        if self.graph.state() != Some(ContextState::Running) {
            debug!("Voiceover play resolved on a suspended context, still due");
            return;
        }
        self.played_marker = self.voiceover.url().map(str::to_string);
    }
}
