//! Simulated host audio platform
//!
//! A deterministic, in-process implementation of the [`crate::host`] traits.
//! Used by the integration tests and by the scenario runner binary.
//!
//! **Behavior modeled:**
//! - Context clock driven by `tokio::time` (works with a paused test clock)
//! - Autoplay policy: when `autoplay_blocked`, contexts start suspended and
//!   programmatic `play()`/`resume()` fail with "not allowed" until the first
//!   user gesture (activation is sticky, as on real platforms)
//! - `play()` against a suspended context resolves `Ok` but produces no sound
//!   (counted as a silent play)
//! - `hide()` suspends the context and pauses playing media, like a screen lock
//! - Loading completes only when the driver calls [`SimulatedHost::finish_loading`]
//!   (or immediately for URLs registered with [`SimulatedHost::preload`])
//!
//! **Spying:** every create/connect/disconnect/release/play is counted and
//! appended to a chronological [`SimLogEntry`] log.

mod nodes;

use crate::host::{AudioContext, AudioHost, ContextState, HostError, MediaEvent, MediaEventSink, ReadyState};
use cadence_common::gain_ramp::ExponentialRamp;
use nodes::{SimContext, SimGain, SimMedia};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::Instant;

/// Simulated platform capabilities
#[derive(Debug, Clone, Default)]
pub struct SimConfig {
    /// Require a user gesture before audio may start
    pub autoplay_blocked: bool,
    /// Fail context creation, as on a platform without audio processing
    pub unsupported: bool,
}

/// One entry of the chronological spy log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimLogEntry {
    ContextCreated,
    ContextResumed,
    ContextSuspended,
    ContextClosed,
    MediaCreated(String),
    MediaConnected(String),
    PlayRequested(String),
    PlayRejected(String),
    SilentPlay(String),
    Started(String),
    /// Playback continued on media that had already started
    Resumed(String),
    Paused(String),
    Ended(String),
    Disconnected(String),
    Released(String),
}

impl SimLogEntry {
    pub fn is_creation_of(&self, url: &str) -> bool {
        matches!(self, SimLogEntry::MediaCreated(u) if u == url)
    }

    pub fn is_release_of(&self, url: &str) -> bool {
        matches!(self, SimLogEntry::Released(u) if u == url)
    }

    pub fn is_start_of(&self, url: &str) -> bool {
        matches!(self, SimLogEntry::Started(u) if u == url)
    }

    pub fn is_resume_of(&self, url: &str) -> bool {
        matches!(self, SimLogEntry::Resumed(u) if u == url)
    }
}

pub(crate) struct ContextRecord {
    pub(crate) state: ContextState,
}

pub(crate) struct GainRecord {
    pub(crate) anchor_value: f32,
    pub(crate) anchor_time: f64,
    pub(crate) ramp: Option<ExponentialRamp>,
    pub(crate) history: Vec<ExponentialRamp>,
    pub(crate) connected: bool,
}

impl GainRecord {
    pub(crate) fn value_at(&self, t: f64) -> f32 {
        match &self.ramp {
            Some(ramp) if t >= ramp.start_time => ramp.value_at(t),
            _ => self.anchor_value,
        }
    }
}

pub(crate) struct MediaRecord {
    pub(crate) url: String,
    pub(crate) context: usize,
    pub(crate) sink: MediaEventSink,
    pub(crate) ready: ReadyState,
    pub(crate) looping: bool,
    pub(crate) playing: bool,
    /// Sounded at least once
    pub(crate) started: bool,
    pub(crate) ended: bool,
    pub(crate) failed: Option<String>,
    pub(crate) connected: bool,
    pub(crate) disconnects: usize,
    pub(crate) released: bool,
    pub(crate) play_calls: usize,
}

impl MediaRecord {
    fn is_live(&self) -> bool {
        !self.released
    }
}

pub(crate) struct SimInner {
    pub(crate) unlocked: bool,
    pub(crate) contexts: Vec<ContextRecord>,
    pub(crate) gains: Vec<GainRecord>,
    pub(crate) media: Vec<MediaRecord>,
    pub(crate) preloaded: HashSet<String>,
    pub(crate) log: Vec<SimLogEntry>,
    /// Set of playing URLs captured each time a media starts
    pub(crate) playing_snapshots: Vec<Vec<String>>,
    pub(crate) resumes: usize,
}

impl SimInner {
    pub(crate) fn autoplay_locked(&self, config: &SimConfig) -> bool {
        config.autoplay_blocked && !self.unlocked
    }

    pub(crate) fn playing_urls(&self) -> Vec<String> {
        self.media
            .iter()
            .filter(|m| m.is_live() && m.playing)
            .map(|m| m.url.clone())
            .collect()
    }
}

pub(crate) struct SimState {
    pub(crate) config: SimConfig,
    epoch: Instant,
    inner: Mutex<SimInner>,
}

impl SimState {
    pub(crate) fn lock(&self) -> MutexGuard<'_, SimInner> {
        // A poisoned lock only means a test already panicked
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

/// Deterministic host platform for tests and scenario runs
#[derive(Clone)]
pub struct SimulatedHost {
    state: Arc<SimState>,
}

impl SimulatedHost {
    pub fn new(config: SimConfig) -> Self {
        Self {
            state: Arc::new(SimState {
                config,
                epoch: Instant::now(),
                inner: Mutex::new(SimInner {
                    unlocked: false,
                    contexts: Vec::new(),
                    gains: Vec::new(),
                    media: Vec::new(),
                    preloaded: HashSet::new(),
                    log: Vec::new(),
                    playing_snapshots: Vec::new(),
                    resumes: 0,
                }),
            }),
        }
    }

    // ---------------------------------------------------------------
    // Driver controls
    // ---------------------------------------------------------------

    /// Media created for `url` from now on is buffered immediately
    pub fn preload(&self, url: &str) {
        self.state.lock().preloaded.insert(url.to_string());
    }

    /// Live media for `url` finished buffering
    pub fn finish_loading(&self, url: &str) {
        let sinks = {
            let mut inner = self.state.lock();
            inner
                .media
                .iter_mut()
                .filter(|m| m.is_live() && m.url == url && !m.ready.can_play_through())
                .map(|m| {
                    m.ready = ReadyState::HaveEnoughData;
                    m.sink.clone()
                })
                .collect::<Vec<_>>()
        };
        for sink in sinks {
            sink.emit(MediaEvent::CanPlayThrough);
        }
    }

    /// Live media for `url` failed to load
    pub fn fail_loading(&self, url: &str, message: &str) {
        let sinks = {
            let mut inner = self.state.lock();
            inner
                .media
                .iter_mut()
                .filter(|m| m.is_live() && m.url == url)
                .map(|m| {
                    m.failed = Some(message.to_string());
                    m.playing = false;
                    m.sink.clone()
                })
                .collect::<Vec<_>>()
        };
        for sink in sinks {
            sink.emit(MediaEvent::Error(message.to_string()));
        }
    }

    /// Live, playing media for `url` reached its end
    pub fn finish_playback(&self, url: &str) {
        let sinks = {
            let mut inner = self.state.lock();
            let mut sinks = Vec::new();
            for media in inner.media.iter_mut() {
                if media.is_live() && media.url == url && media.playing {
                    media.playing = false;
                    media.ended = true;
                    sinks.push(media.sink.clone());
                }
            }
            if !sinks.is_empty() {
                inner.log.push(SimLogEntry::Ended(url.to_string()));
            }
            sinks
        };
        for sink in sinks {
            sink.emit(MediaEvent::Ended);
        }
    }

    /// Deliver a raw event to the latest media created for `url`
    ///
    /// Lets tests replay events from media the engine already released.
    pub fn emit_raw(&self, url: &str, event: MediaEvent) {
        let sink = {
            let inner = self.state.lock();
            inner.media.iter().rev().find(|m| m.url == url).map(|m| m.sink.clone())
        };
        if let Some(sink) = sink {
            sink.emit(event);
        }
    }

    /// Emit `event` from a specific (possibly released) media instance
    pub fn emit_from_instance(&self, url: &str, instance: u64, event: MediaEvent) {
        let sink = {
            let inner = self.state.lock();
            inner
                .media
                .iter()
                .find(|m| m.url == url && m.sink.instance() == instance)
                .map(|m| m.sink.clone())
        };
        if let Some(sink) = sink {
            sink.emit(event);
        }
    }

    /// Screen lock / app backgrounded: suspend contexts and pause playing media
    pub fn hide(&self) {
        let sinks = {
            let mut inner = self.state.lock();
            let mut suspended = false;
            for context in inner.contexts.iter_mut() {
                if context.state == ContextState::Running {
                    context.state = ContextState::Suspended;
                    suspended = true;
                }
            }
            if suspended {
                inner.log.push(SimLogEntry::ContextSuspended);
            }

            let mut sinks = Vec::new();
            let mut paused = Vec::new();
            for media in inner.media.iter_mut() {
                if media.is_live() && media.playing {
                    media.playing = false;
                    paused.push(media.url.clone());
                    sinks.push(media.sink.clone());
                }
            }
            inner.log.extend(paused.into_iter().map(SimLogEntry::Paused));
            sinks
        };
        for sink in sinks {
            sink.emit(MediaEvent::Paused);
        }
    }

    /// Suspend contexts without touching media
    pub fn suspend_context(&self) {
        let mut inner = self.state.lock();
        for context in inner.contexts.iter_mut() {
            if context.state == ContextState::Running {
                context.state = ContextState::Suspended;
            }
        }
        inner.log.push(SimLogEntry::ContextSuspended);
    }

    // ---------------------------------------------------------------
    // Spy accessors
    // ---------------------------------------------------------------

    pub fn contexts_created(&self) -> usize {
        self.state.lock().contexts.len()
    }

    pub fn contexts_closed(&self) -> usize {
        self.state
            .lock()
            .contexts
            .iter()
            .filter(|c| c.state == ContextState::Closed)
            .count()
    }

    /// State of the most recently created context
    pub fn context_state(&self) -> Option<ContextState> {
        self.state.lock().contexts.last().map(|c| c.state)
    }

    pub fn resume_count(&self) -> usize {
        self.state.lock().resumes
    }

    pub fn is_unlocked(&self) -> bool {
        self.state.lock().unlocked
    }

    pub fn gain_count(&self) -> usize {
        self.state.lock().gains.len()
    }

    /// Current value of the `index`-th created gain (0 = music in an engine graph)
    pub fn gain_value(&self, index: usize) -> Option<f32> {
        let now = self.state.now();
        self.state.lock().gains.get(index).map(|g| g.value_at(now))
    }

    /// Every exponential ramp scheduled on the `index`-th gain
    pub fn gain_ramps(&self, index: usize) -> Vec<ExponentialRamp> {
        self.state
            .lock()
            .gains
            .get(index)
            .map(|g| g.history.clone())
            .unwrap_or_default()
    }

    pub fn gain_connected(&self, index: usize) -> bool {
        self.state.lock().gains.get(index).map(|g| g.connected).unwrap_or(false)
    }

    pub fn media_created(&self, url: &str) -> usize {
        self.state.lock().media.iter().filter(|m| m.url == url).count()
    }

    pub fn released_count(&self, url: &str) -> usize {
        self.state
            .lock()
            .media
            .iter()
            .filter(|m| m.url == url && m.released)
            .count()
    }

    pub fn disconnect_count(&self, url: &str) -> usize {
        self.state
            .lock()
            .media
            .iter()
            .filter(|m| m.url == url)
            .map(|m| m.disconnects)
            .sum()
    }

    /// Media handles created for `url` that were never released
    pub fn live_media(&self, url: &str) -> usize {
        self.state
            .lock()
            .media
            .iter()
            .filter(|m| m.url == url && m.is_live())
            .count()
    }

    /// Total `play()` calls across every media created for `url`
    pub fn play_calls(&self, url: &str) -> usize {
        self.state
            .lock()
            .media
            .iter()
            .filter(|m| m.url == url)
            .map(|m| m.play_calls)
            .sum()
    }

    /// Number of times media for `url` started sounding from the beginning
    pub fn start_count(&self, url: &str) -> usize {
        self.state.lock().log.iter().filter(|e| e.is_start_of(url)).count()
    }

    /// Number of times media for `url` continued after an interruption
    pub fn media_resumes(&self, url: &str) -> usize {
        self.state.lock().log.iter().filter(|e| e.is_resume_of(url)).count()
    }

    pub fn silent_plays(&self) -> usize {
        self.state
            .lock()
            .log
            .iter()
            .filter(|e| matches!(e, SimLogEntry::SilentPlay(_)))
            .count()
    }

    pub fn is_playing(&self, url: &str) -> bool {
        self.state
            .lock()
            .media
            .iter()
            .any(|m| m.is_live() && m.url == url && m.playing)
    }

    pub fn media_looping(&self, url: &str) -> Option<bool> {
        self.state
            .lock()
            .media
            .iter()
            .rev()
            .find(|m| m.url == url)
            .map(|m| m.looping)
    }

    /// URLs playing at the moment each media started
    pub fn playing_snapshots(&self) -> Vec<Vec<String>> {
        self.state.lock().playing_snapshots.clone()
    }

    pub fn log(&self) -> Vec<SimLogEntry> {
        self.state.lock().log.clone()
    }
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl AudioHost for SimulatedHost {
    fn create_context(&self) -> Result<Arc<dyn AudioContext>, HostError> {
        if self.state.config.unsupported {
            return Err(HostError::Unsupported(
                "simulated platform has no audio processing".to_string(),
            ));
        }

        let mut inner = self.state.lock();
        let initial = if inner.autoplay_locked(&self.state.config) {
            ContextState::Suspended
        } else {
            ContextState::Running
        };
        inner.contexts.push(ContextRecord { state: initial });
        inner.log.push(SimLogEntry::ContextCreated);
        let id = inner.contexts.len() - 1;

        Ok(Arc::new(SimContext::new(Arc::clone(&self.state), id)))
    }
}

pub(crate) fn new_gain(state: &Arc<SimState>) -> SimGain {
    let mut inner = state.lock();
    inner.gains.push(GainRecord {
        anchor_value: 1.0,
        anchor_time: 0.0,
        ramp: None,
        history: Vec::new(),
        connected: false,
    });
    SimGain::new(Arc::clone(state), inner.gains.len() - 1)
}

pub(crate) fn new_media(
    state: &Arc<SimState>,
    context: usize,
    url: &str,
    sink: MediaEventSink,
) -> SimMedia {
    let (media, preloaded_sink) = {
        let mut inner = state.lock();
        let preloaded = inner.preloaded.contains(url);
        inner.media.push(MediaRecord {
            url: url.to_string(),
            context,
            sink: sink.clone(),
            ready: if preloaded {
                ReadyState::HaveEnoughData
            } else {
                ReadyState::HaveNothing
            },
            looping: false,
            playing: false,
            started: false,
            ended: false,
            failed: None,
            connected: false,
            disconnects: 0,
            released: false,
            play_calls: 0,
        });
        inner.log.push(SimLogEntry::MediaCreated(url.to_string()));
        let media = SimMedia::new(Arc::clone(state), inner.media.len() - 1, url);
        (media, preloaded.then_some(sink))
    };

    if let Some(sink) = preloaded_sink {
        sink.emit(MediaEvent::CanPlayThrough);
    }
    media
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Activation, PlayError};
    use cadence_common::events::TrackKind;

    fn sink() -> MediaEventSink {
        MediaEventSink::new(TrackKind::Music, 1, |_| {})
    }

    #[tokio::test(start_paused = true)]
    async fn test_autoplay_policy_is_sticky() {
        let host = SimulatedHost::new(SimConfig {
            autoplay_blocked: true,
            ..SimConfig::default()
        });
        let context = host.create_context().unwrap();
        assert_eq!(context.state(), ContextState::Suspended);

        assert_eq!(
            context.resume(Activation::Programmatic).await,
            Err(HostError::NotAllowed)
        );

        let media = context.create_media("a.mp3", sink()).unwrap();
        assert_eq!(media.play(Activation::Programmatic).await, Err(PlayError::NotAllowed));

        context.resume(Activation::UserGesture).await.unwrap();
        assert!(host.is_unlocked());
        assert_eq!(context.state(), ContextState::Running);
        assert_eq!(media.play(Activation::Programmatic).await, Ok(()));
        assert!(host.is_playing("a.mp3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_on_suspended_context_is_silent() {
        let host = SimulatedHost::default();
        let context = host.create_context().unwrap();
        let media = context.create_media("a.mp3", sink()).unwrap();
        host.suspend_context();

        assert_eq!(media.play(Activation::Programmatic).await, Ok(()));
        assert!(!host.is_playing("a.mp3"));
        assert_eq!(host.silent_plays(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hide_suspends_and_pauses() {
        let host = SimulatedHost::default();
        let context = host.create_context().unwrap();
        let media = context.create_media("a.mp3", sink()).unwrap();
        media.play(Activation::Programmatic).await.unwrap();

        host.hide();
        assert_eq!(context.state(), ContextState::Suspended);
        assert!(!host.is_playing("a.mp3"));
        assert!(media.is_paused());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_is_not_a_fresh_start() {
        let host = SimulatedHost::default();
        let context = host.create_context().unwrap();
        let media = context.create_media("vo.mp3", sink()).unwrap();

        media.play(Activation::Programmatic).await.unwrap();
        media.pause();
        media.play(Activation::Programmatic).await.unwrap();
        assert_eq!(host.start_count("vo.mp3"), 1);
        assert_eq!(host.media_resumes("vo.mp3"), 1);

        // Playing again after the end is a replay
        host.finish_playback("vo.mp3");
        media.play(Activation::Programmatic).await.unwrap();
        assert_eq!(host.start_count("vo.mp3"), 2);
        assert_eq!(host.play_calls("vo.mp3"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ramp_target_rejected() {
        let host = SimulatedHost::default();
        let context = host.create_context().unwrap();
        let gain = context.create_gain().unwrap();
        assert_eq!(
            gain.exponential_ramp_to_value_at_time(0.0, 1.0),
            Err(HostError::InvalidRampTarget(0.0))
        );
        assert!(host.gain_ramps(0).is_empty());
    }
}
