//! Event types for the Cadence event system
//!
//! Provides the session event definitions and the EventBus used to publish
//! them from the audio engine to any number of observers (UI, timeline, logs).

mod playback_types;

pub use playback_types::{DuckingState, PlaybackState, TrackKind};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Session audio event types
///
/// Events are broadcast via EventBus and can be serialized for transmission to
/// a UI layer. Every event carries the id of the session that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// Playback state changed (Playing ↔ Paused)
    ///
    /// Derived from whether either track is audibly playing, not from the
    /// requested `paused` input.
    PlaybackStateChanged {
        session_id: Uuid,
        /// Playback state before change
        old_state: PlaybackState,
        /// Playback state after change
        new_state: PlaybackState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track can play through without further buffering
    TrackReady {
        session_id: Uuid,
        track: TrackKind,
        url: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track failed to load or play
    ///
    /// The other track is unaffected.
    TrackFailed {
        session_id: Uuid,
        track: TrackKind,
        url: String,
        /// Host-provided failure detail
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track started playing
    TrackStarted {
        session_id: Uuid,
        track: TrackKind,
        url: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track was paused (by the engine or by the host platform)
    TrackPaused {
        session_id: Uuid,
        track: TrackKind,
        url: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The current music track finished
    ///
    /// Triggers:
    /// - Timeline: advance to the next music track
    MusicEnded {
        session_id: Uuid,
        url: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The current section narration finished
    VoiceoverEnded {
        session_id: Uuid,
        url: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Music gain began ramping to a new ducking state
    DuckingChanged {
        session_id: Uuid,
        state: DuckingState,
        /// Gain value the ramp is heading to
        target_volume: f32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The host refused to start audio without a user gesture
    ///
    /// Triggers:
    /// - UI: show a "tap to enable sound" affordance
    AutoplayBlocked {
        session_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The audio graph could not be created; audio is disabled for the session
    GraphUnavailable {
        session_id: Uuid,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl SessionEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            SessionEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            SessionEvent::TrackReady { .. } => "TrackReady",
            SessionEvent::TrackFailed { .. } => "TrackFailed",
            SessionEvent::TrackStarted { .. } => "TrackStarted",
            SessionEvent::TrackPaused { .. } => "TrackPaused",
            SessionEvent::MusicEnded { .. } => "MusicEnded",
            SessionEvent::VoiceoverEnded { .. } => "VoiceoverEnded",
            SessionEvent::DuckingChanged { .. } => "DuckingChanged",
            SessionEvent::AutoplayBlocked { .. } => "AutoplayBlocked",
            SessionEvent::GraphUnavailable { .. } => "GraphUnavailable",
        }
    }

    /// Session that emitted this event
    pub fn session_id(&self) -> Uuid {
        match self {
            SessionEvent::PlaybackStateChanged { session_id, .. }
            | SessionEvent::TrackReady { session_id, .. }
            | SessionEvent::TrackFailed { session_id, .. }
            | SessionEvent::TrackStarted { session_id, .. }
            | SessionEvent::TrackPaused { session_id, .. }
            | SessionEvent::MusicEnded { session_id, .. }
            | SessionEvent::VoiceoverEnded { session_id, .. }
            | SessionEvent::DuckingChanged { session_id, .. }
            | SessionEvent::AutoplayBlocked { session_id, .. }
            | SessionEvent::GraphUnavailable { session_id, .. } => *session_id,
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus for session events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block the engine)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use cadence_common::events::{EventBus, SessionEvent};
/// use uuid::Uuid;
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(SessionEvent::AutoplayBlocked {
///     session_id: Uuid::new_v4(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert_eq!(rx.try_recv().unwrap().event_type(), "AutoplayBlocked");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: SessionEvent,
    ) -> Result<usize, broadcast::error::SendError<SessionEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(track: TrackKind) -> SessionEvent {
        SessionEvent::TrackStarted {
            session_id: Uuid::new_v4(),
            track,
            url: "https://cdn.example/vo/plank.mp3".to_string(),
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_eventbus_new() {
        let bus = EventBus::new(100);
        assert_eq!(bus.capacity(), 100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_eventbus_emit_without_subscribers_is_err() {
        let bus = EventBus::new(10);
        assert!(bus.emit(started(TrackKind::Music)).is_err());
        // Lossy variant swallows the same failure
        bus.emit_lossy(started(TrackKind::Music));
    }

    #[test]
    fn test_eventbus_multiple_subscribers() {
        let bus = EventBus::new(10);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        assert_eq!(bus.emit(started(TrackKind::Voiceover)).unwrap(), 2);

        assert_eq!(rx1.try_recv().unwrap().event_type(), "TrackStarted");
        assert_eq!(rx2.try_recv().unwrap().event_type(), "TrackStarted");
    }

    #[test]
    fn test_eventbus_emit_lossy_on_full_channel() {
        let bus = EventBus::new(2);
        let _rx = bus.subscribe();
        for _ in 0..10 {
            bus.emit_lossy(started(TrackKind::Music));
        }
        assert_eq!(bus.capacity(), 2);
    }

    #[test]
    fn test_serialization_is_tagged() {
        let session_id = Uuid::new_v4();
        let event = SessionEvent::DuckingChanged {
            session_id,
            state: DuckingState::Ducked,
            target_volume: 0.35,
            timestamp: chrono::Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "DuckingChanged");
        assert_eq!(json["state"], "ducked");

        let back: SessionEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.session_id(), session_id);
    }

    #[test]
    fn test_track_kind_labels() {
        assert_eq!(TrackKind::Music.label(), "background music");
        assert_eq!(TrackKind::Voiceover.label(), "voiceover audio");
        assert_eq!(TrackKind::Voiceover.to_string(), "voiceover");
        assert_eq!(DuckingState::default(), DuckingState::Normal);
    }
}
