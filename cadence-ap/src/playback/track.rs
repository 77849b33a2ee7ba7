//! Track loader
//!
//! A [`Track`] is one of the two logical slots (music, voiceover). It owns at
//! most one media source at a time, bound to its gain node.
//!
//! **Replacement rule:** a source node cannot be rebound, so loading a new URL
//! first pauses, disconnects and releases the old media, then creates a fresh
//! one. Each created media gets a new instance number; events and play results
//! carrying any other instance number are stale.

use crate::host::{AudioContext, GainNode, HostError, MediaEventSink, MediaSource};
use crate::playback::generation::Generation;
use cadence_common::events::TrackKind;
use std::sync::Arc;
use tracing::debug;

/// One logical track slot
pub struct Track {
    kind: TrackKind,
    url: Option<String>,
    media: Option<Arc<dyn MediaSource>>,
    instance: u64,
    ready: bool,
    playing: bool,
    ended: bool,
    failed: bool,
    /// Generation of the `play()` currently awaiting resolution
    play_in_flight: Option<Generation>,
}

impl Track {
    pub fn new(kind: TrackKind) -> Self {
        Self {
            kind,
            url: None,
            media: None,
            instance: 0,
            ready: false,
            playing: false,
            ended: false,
            failed: false,
            play_in_flight: None,
        }
    }

    /// Replace the current media with a fresh one loading `url`
    ///
    /// `make_sink` receives the new instance number. On error the slot keeps
    /// the URL, holds no media and is marked failed.
    pub fn load<F>(
        &mut self,
        context: &Arc<dyn AudioContext>,
        gain: &Arc<dyn GainNode>,
        url: &str,
        make_sink: F,
    ) -> Result<(), HostError>
    where
        F: FnOnce(TrackKind, u64) -> MediaEventSink,
    {
        self.release();
        self.url = Some(url.to_string());
        self.instance += 1;

        let media = match context.create_media(url, make_sink(self.kind, self.instance)) {
            Ok(media) => media,
            Err(e) => {
                self.failed = true;
                return Err(e);
            }
        };

        media.set_looping(false);
        if let Err(e) = media.connect(gain) {
            media.release();
            self.failed = true;
            return Err(e);
        }

        self.ready = media.ready_state().can_play_through();
        debug!(
            "Loaded {} instance {} from {} (ready: {})",
            self.kind, self.instance, url, self.ready
        );
        self.media = Some(media);
        Ok(())
    }

    /// Stop and release the current media, keeping the URL
    ///
    /// Safe to call when nothing is loaded.
    pub fn release(&mut self) {
        if let Some(media) = self.media.take() {
            media.pause();
            media.disconnect();
            media.release();
            debug!("Released {} instance {} ({})", self.kind, self.instance, media.url());
        }
        self.ready = false;
        self.playing = false;
        self.ended = false;
        self.failed = false;
        self.play_in_flight = None;
    }

    /// Release the media and forget the URL
    pub fn clear(&mut self) {
        self.release();
        self.url = None;
    }

    /// Record a load or playback failure and drop the media
    pub fn mark_failed(&mut self) {
        self.release();
        self.failed = true;
    }

    /// Pause the media immediately (no fade)
    pub fn pause(&mut self) {
        if let Some(media) = &self.media {
            media.pause();
        }
        self.playing = false;
        self.play_in_flight = None;
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn media(&self) -> Option<&Arc<dyn MediaSource>> {
        self.media.as_ref()
    }

    pub fn instance(&self) -> u64 {
        self.instance
    }

    /// Whether `instance` names the media currently held by this slot
    pub fn is_current(&self, instance: u64) -> bool {
        self.media.is_some() && self.instance == instance
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn set_ready(&mut self) {
        self.ready = true;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
        if playing {
            self.ended = false;
        }
    }

    pub fn has_ended(&self) -> bool {
        self.ended
    }

    pub fn set_ended(&mut self) {
        self.ended = true;
        self.playing = false;
    }

    pub fn has_failed(&self) -> bool {
        self.failed
    }

    pub fn play_in_flight(&self) -> Option<Generation> {
        self.play_in_flight
    }

    pub fn set_play_in_flight(&mut self, generation: Option<Generation>) {
        self.play_in_flight = generation;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{AudioHost, MediaNotice};
    use crate::sim::{SimConfig, SimulatedHost};

    fn sink(kind: TrackKind, instance: u64) -> MediaEventSink {
        MediaEventSink::new(kind, instance, |_notice: MediaNotice| {})
    }

    fn setup() -> (SimulatedHost, Arc<dyn AudioContext>, Arc<dyn GainNode>) {
        let host = SimulatedHost::new(SimConfig::default());
        let context = host.create_context().unwrap();
        let gain = context.create_gain().unwrap();
        (host, context, gain)
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_configures_media() {
        let (host, context, gain) = setup();
        let mut track = Track::new(TrackKind::Music);

        track.load(&context, &gain, "music/a.mp3", sink).unwrap();

        assert_eq!(track.url(), Some("music/a.mp3"));
        assert_eq!(track.instance(), 1);
        assert!(track.is_current(1));
        assert!(!track.is_ready());
        assert_eq!(host.media_looping("music/a.mp3"), Some(false));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_releases_previous_media_first() {
        let (host, context, gain) = setup();
        let mut track = Track::new(TrackKind::Music);

        track.load(&context, &gain, "music/a.mp3", sink).unwrap();
        track.load(&context, &gain, "music/b.mp3", sink).unwrap();

        assert_eq!(host.released_count("music/a.mp3"), 1);
        assert_eq!(host.disconnect_count("music/a.mp3"), 1);
        assert!(!track.is_current(1));
        assert!(track.is_current(2));

        let log = host.log();
        let released_a = log.iter().position(|e| e.is_release_of("music/a.mp3")).unwrap();
        let created_b = log.iter().position(|e| e.is_creation_of("music/b.mp3")).unwrap();
        assert!(released_a < created_b);
    }

    #[tokio::test(start_paused = true)]
    async fn test_preloaded_media_is_ready_immediately() {
        let (host, context, gain) = setup();
        host.preload("vo/cached.mp3");
        let mut track = Track::new(TrackKind::Voiceover);

        track.load(&context, &gain, "vo/cached.mp3", sink).unwrap();
        assert!(track.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_forgets_url() {
        let (host, context, gain) = setup();
        let mut track = Track::new(TrackKind::Voiceover);

        track.load(&context, &gain, "vo/a.mp3", sink).unwrap();
        track.clear();

        assert!(track.url().is_none());
        assert!(track.media().is_none());
        assert_eq!(host.released_count("vo/a.mp3"), 1);

        // Releasing an empty slot does nothing
        track.release();
        assert_eq!(host.released_count("vo/a.mp3"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mark_failed_keeps_url() {
        let (_host, context, gain) = setup();
        let mut track = Track::new(TrackKind::Music);

        track.load(&context, &gain, "music/broken.mp3", sink).unwrap();
        track.mark_failed();

        assert!(track.has_failed());
        assert_eq!(track.url(), Some("music/broken.mp3"));
        assert!(!track.is_current(1));
    }
}
