//! Section-transition voiceover player
//!
//! Plays the current section's narration exactly once.
//!
//! **Per-URL state machine:**
//! 1. No URL: ready immediately, played marker reset
//! 2. URL present while paused: deferred until unpause
//! 3. URL equal to the played marker: skipped
//! 4. New URL: after a debounce, resume the context if needed, then play at
//!    once if buffered; otherwise wait for `CanPlayThrough` and resume the
//!    context again before playing
//!
//! The marker is recorded only when `play()` resolves successfully. Every URL
//! change, pause and unpause advances the voiceover generation, which is
//! checked when the debounce elapses, after the context resume, and again
//! when the buffered notice arrives.

use super::core::EngineActor;
use crate::host::Activation;
use crate::playback::events::{AfterResume, EngineMsg};
use crate::playback::generation::Generation;
use cadence_common::events::TrackKind;
use tracing::{debug, info};

impl EngineActor {
    pub(super) fn set_voiceover_url(&mut self, url: Option<String>) {
        if url.as_deref() == self.voiceover.url() && !self.voiceover.has_failed() {
            debug!("Voiceover URL unchanged");
            return;
        }

        // Cancel any attempt for the previous URL
        self.voiceover_gen.advance();
        self.awaiting_voiceover = None;

        if url.is_none() || url.as_deref() != self.played_marker.as_deref() {
            self.played_marker = None;
        }

        match url {
            None => {
                self.voiceover.clear();
                info!("Voiceover cleared");
            }
            Some(url) => self.load_track(TrackKind::Voiceover, &url),
        }

        // Narration that was ducking the music no longer exists
        self.restore_after_voiceover();
        self.attempt_voiceover();
    }

    /// Schedule a debounced play of the current voiceover, if one is due
    pub(super) fn attempt_voiceover(&mut self) {
        let Some(url) = self.voiceover.url() else {
            self.played_marker = None;
            return;
        };
        if self.voiceover.has_failed() {
            debug!("Voiceover {} failed, nothing to play", url);
            return;
        }
        if self.paused {
            debug!("Deferring voiceover {} while paused", url);
            return;
        }
        if self.played_marker.as_deref() == Some(url) {
            debug!("Voiceover {} already played this section", url);
            return;
        }

        let generation = self.voiceover_gen.advance();
        self.awaiting_voiceover = None;
        let delay = self.config.voiceover_debounce();
        debug!("Voiceover {} due in {:?} ({})", url, delay, generation);

        self.spawn_reply(async move {
            tokio::time::sleep(delay).await;
            EngineMsg::DebounceElapsed { generation }
        });
    }

    pub(super) fn on_debounce_elapsed(&mut self, generation: Generation) {
        if !self.voiceover_gen.is_current(generation) || self.paused {
            debug!("Discarding stale voiceover attempt ({})", generation);
            return;
        }
        self.ensure_running(generation, AfterResume::Voiceover, Activation::Programmatic);
    }

    /// Context is running: play now if buffered, otherwise wait for it
    pub(super) fn play_voiceover_when_ready(&mut self, generation: Generation) {
        if !self.voiceover_gen.is_current(generation) || self.paused {
            debug!("Discarding stale voiceover attempt ({})", generation);
            return;
        }
        if self.voiceover.has_failed() {
            debug!("Voiceover failed during debounce");
            return;
        }

        if self.voiceover.is_ready() {
            self.start_voiceover(generation, Activation::Programmatic);
        } else {
            debug!("Voiceover not buffered yet, waiting ({})", generation);
            self.awaiting_voiceover = Some(generation);
        }
    }

    /// `CanPlayThrough` on the current voiceover media
    ///
    /// The host may have suspended the context while the narration was
    /// buffering, so the play goes through the resume path again.
    pub(super) fn on_voiceover_buffered(&mut self) {
        let Some(generation) = self.awaiting_voiceover.take() else {
            return;
        };
        if !self.voiceover_gen.is_current(generation) || self.paused {
            debug!("Discarding stale voiceover attempt ({})", generation);
            return;
        }
        self.ensure_running(generation, AfterResume::Voiceover, Activation::Programmatic);
    }

    fn start_voiceover(&mut self, generation: Generation, activation: Activation) {
        let voiceover = &self.voiceover;
        if voiceover.media().is_none() || voiceover.is_playing() || voiceover.has_ended() {
            return;
        }
        if voiceover.play_in_flight().is_some() {
            debug!("Voiceover play already in flight");
            return;
        }
        self.issue_play(TrackKind::Voiceover, activation, generation);
    }

    /// Unpause or wake-up path for narration
    ///
    /// Narration that already started resumes where it stopped; narration
    /// that ended is never replayed; narration that never started is
    /// attempted from scratch.
    pub(super) fn resume_or_attempt_voiceover(&mut self, activation: Activation) {
        let Some(url) = self.voiceover.url() else {
            return;
        };
        if self.voiceover.has_failed() {
            return;
        }

        if self.played_marker.as_deref() == Some(url) {
            if !self.voiceover.has_ended() && !self.voiceover.is_playing() {
                debug!("Resuming voiceover {}", url);
                let generation = self.voiceover_gen.current();
                self.start_voiceover(generation, activation);
            }
        } else {
            self.attempt_voiceover();
        }
    }
}
