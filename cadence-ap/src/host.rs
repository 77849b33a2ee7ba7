//! Host audio platform boundary
//!
//! The engine never talks to a concrete audio API. It drives these traits,
//! which a platform binding implements (a web audio bridge, a native mixer,
//! or [`crate::sim::SimulatedHost`] in tests and the scenario runner).
//!
//! **Model:**
//! - One [`AudioContext`] per session, created through [`AudioHost`]
//! - Two [`GainNode`]s (music, voiceover) connected to the context output
//! - One [`MediaSource`] per loaded URL, connected to exactly one gain node
//! - Media lifecycle notifications flow back through a [`MediaEventSink`]
//!
//! Asynchronous operations (`play`, `resume`, `close`) are suspension points:
//! other inputs may be processed by the engine before they complete.

use async_trait::async_trait;
use cadence_common::events::TrackKind;
use std::sync::Arc;
use thiserror::Error;

/// Errors reported by the host platform
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    /// The platform has no usable audio processing support
    #[error("audio processing unavailable: {0}")]
    Unsupported(String),

    /// The operation requires a user gesture the platform has not seen
    #[error("operation not allowed without a user gesture")]
    NotAllowed,

    /// The context was already closed
    #[error("audio context is closed")]
    ContextClosed,

    /// A ramp endpoint the platform rejects (exponential ramps cannot reach zero)
    #[error("invalid ramp target: {0}")]
    InvalidRampTarget(f32),

    /// Media creation or wiring failed
    #[error("media error: {0}")]
    Media(String),
}

/// Why a `play()` request was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlayError {
    /// Autoplay policy: no user gesture preceded the request
    #[error("play() not allowed without a user gesture")]
    NotAllowed,

    /// Interrupted by a pause or a source change before playback began
    #[error("play() aborted")]
    Aborted,

    /// The media cannot be played (network or format failure)
    #[error("play() failed: {0}")]
    Failed(String),
}

/// Whether an operation is issued from inside a genuine user gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Issued by the engine on its own (subject to autoplay policy)
    Programmatic,
    /// Issued while handling a user-initiated event
    UserGesture,
}

/// Audio context processing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Running,
    /// Suspended by the platform (sleep, screen lock, autoplay policy)
    Suspended,
    Closed,
}

/// Media buffering level, ordered from least to most data
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

impl ReadyState {
    /// Enough data buffered to play through without stalling
    pub fn can_play_through(self) -> bool {
        self >= ReadyState::HaveEnoughData
    }
}

/// Lifecycle notifications raised by a [`MediaSource`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    /// Buffered enough to play through
    CanPlayThrough,
    /// Playback actually started
    Playing,
    /// Playback paused (by the engine or the platform)
    Paused,
    /// Playback reached the end of the media
    Ended,
    /// Load or decode failed
    Error(String),
}

/// A media event tagged with the track slot and instance that raised it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaNotice {
    pub track: TrackKind,
    /// Instance number of the media within its track slot
    pub instance: u64,
    pub event: MediaEvent,
}

type Deliver = Arc<dyn Fn(MediaNotice) + Send + Sync>;

/// Where a media source reports its lifecycle events
///
/// Each sink is bound to one track slot and one media instance, so events
/// from a replaced media are recognisable as stale.
#[derive(Clone)]
pub struct MediaEventSink {
    track: TrackKind,
    instance: u64,
    deliver: Deliver,
}

impl MediaEventSink {
    /// Create a sink that hands tagged notices to `deliver`
    pub fn new(
        track: TrackKind,
        instance: u64,
        deliver: impl Fn(MediaNotice) + Send + Sync + 'static,
    ) -> Self {
        Self {
            track,
            instance,
            deliver: Arc::new(deliver),
        }
    }

    /// Report an event
    pub fn emit(&self, event: MediaEvent) {
        (self.deliver)(MediaNotice {
            track: self.track,
            instance: self.instance,
            event,
        });
    }

    pub fn track(&self) -> TrackKind {
        self.track
    }

    pub fn instance(&self) -> u64 {
        self.instance
    }
}

impl std::fmt::Debug for MediaEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaEventSink")
            .field("track", &self.track)
            .field("instance", &self.instance)
            .finish()
    }
}

/// Volume control point in the audio graph
///
/// Times are seconds on the owning context's clock.
pub trait GainNode: Send + Sync {
    /// Current computed gain value
    fn value(&self) -> f32;

    /// Set the value at `time`, replacing any automation after it
    fn set_value_at_time(&self, value: f32, time: f64);

    /// Drop all automation scheduled at or after `time`
    fn cancel_scheduled_values(&self, time: f64);

    /// Schedule an exponential ramp ending at `value` at `time`
    ///
    /// Platforms reject a non-positive `value`.
    fn exponential_ramp_to_value_at_time(&self, value: f32, time: f64) -> Result<(), HostError>;

    /// Route this node to the context output
    fn connect_to_output(&self) -> Result<(), HostError>;

    fn disconnect(&self);
}

/// A playable media handle wired into the graph through its source node
///
/// A source node cannot be rebound: a new URL needs a new `MediaSource`.
#[async_trait]
pub trait MediaSource: Send + Sync {
    fn url(&self) -> &str;

    fn ready_state(&self) -> ReadyState;

    fn set_looping(&self, looping: bool);

    /// Bind this media's source node to `gain`
    fn connect(&self, gain: &Arc<dyn GainNode>) -> Result<(), HostError>;

    /// Start or resume playback
    ///
    /// May be rejected by autoplay policy. A play that resolves after the
    /// caller stopped caring cannot be cancelled, only ignored.
    async fn play(&self, activation: Activation) -> Result<(), PlayError>;

    fn pause(&self);

    fn is_paused(&self) -> bool;

    /// Detach the source node from the graph
    fn disconnect(&self);

    /// Release the underlying media resource; the handle is unusable afterwards
    fn release(&self);
}

/// Session-wide audio processing context
#[async_trait]
pub trait AudioContext: Send + Sync {
    fn state(&self) -> ContextState;

    /// Context clock in seconds
    fn current_time(&self) -> f64;

    fn create_gain(&self) -> Result<Arc<dyn GainNode>, HostError>;

    /// Start loading `url`; lifecycle events are reported to `sink`
    fn create_media(
        &self,
        url: &str,
        sink: MediaEventSink,
    ) -> Result<Arc<dyn MediaSource>, HostError>;

    /// Resume a suspended context
    async fn resume(&self, activation: Activation) -> Result<(), HostError>;

    /// Close the context and release all native resources
    async fn close(&self) -> Result<(), HostError>;
}

/// Entry point to the platform's audio API
pub trait AudioHost: Send + Sync {
    fn create_context(&self) -> Result<Arc<dyn AudioContext>, HostError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_ready_state_ordering() {
        assert!(ReadyState::HaveEnoughData.can_play_through());
        assert!(!ReadyState::HaveFutureData.can_play_through());
        assert!(ReadyState::HaveMetadata < ReadyState::HaveCurrentData);
    }

    #[test]
    fn test_sink_tags_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let sink = MediaEventSink::new(TrackKind::Voiceover, 7, move |notice| {
            seen_clone.lock().unwrap().push(notice);
        });

        sink.emit(MediaEvent::CanPlayThrough);
        sink.emit(MediaEvent::Ended);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].track, TrackKind::Voiceover);
        assert_eq!(seen[0].instance, 7);
        assert_eq!(seen[1].event, MediaEvent::Ended);
    }
}
