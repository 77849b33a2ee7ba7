//! Test helpers for cadence-ap integration tests
//!
//! Provides a [`TestSession`]: a running engine wired to a [`SimulatedHost`],
//! with its event stream and music-ended notifications captured.
//!
//! All tests run on a paused Tokio clock (`start_paused = true`). Sleeping
//! lets every spawned task run to quiescence before the clock moves, so
//! [`settle`] is a deterministic "let the engine catch up".

#![allow(dead_code)]

use cadence_ap::config::EngineConfig;
use cadence_ap::sim::{SimConfig, SimulatedHost};
use cadence_ap::{EngineStatus, SessionAudio};
use cadence_common::events::SessionEvent;
use cadence_common::gain_ramp::ExponentialRamp;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::TryRecvError};

pub const MUSIC_A: &str = "https://cdn.example/music/warmup.mp3";
pub const MUSIC_B: &str = "https://cdn.example/music/flow.mp3";
pub const VO_1: &str = "https://cdn.example/vo/section-1.mp3";
pub const VO_2: &str = "https://cdn.example/vo/section-2.mp3";

/// Longer than the default voiceover debounce (50 ms)
pub const AFTER_DEBOUNCE: Duration = Duration::from_millis(60);

/// Longer than the default fade (0.5 s)
pub const AFTER_FADE: Duration = Duration::from_millis(600);

/// Let every queued message and spawned task run, advancing the clock 1 ms
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

pub async fn wait(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// A running engine on a simulated host
pub struct TestSession {
    pub host: SimulatedHost,
    pub audio: SessionAudio,
    pub events: broadcast::Receiver<SessionEvent>,
    music_ended: Arc<Mutex<Vec<String>>>,
}

impl TestSession {
    /// Default host, default config, initially paused
    pub async fn start() -> Self {
        Self::with(SimConfig::default(), EngineConfig::default()).await
    }

    pub async fn with_host(sim: SimConfig) -> Self {
        Self::with(sim, EngineConfig::default()).await
    }

    pub async fn with(sim: SimConfig, config: EngineConfig) -> Self {
        let host = SimulatedHost::new(sim);
        let music_ended = Arc::new(Mutex::new(Vec::new()));
        let ended = Arc::clone(&music_ended);

        let audio = SessionAudio::builder(Arc::new(host.clone()))
            .config(config)
            .on_music_ended(move |url| ended.lock().unwrap().push(url.to_string()))
            .build();
        let events = audio.subscribe_events();

        settle().await;
        Self {
            host,
            audio,
            events,
            music_ended,
        }
    }

    /// Session with music A loaded, buffered and playing
    pub async fn playing_music() -> Self {
        let session = Self::start().await;
        session.host.preload(MUSIC_A);
        session.audio.set_music_url(MUSIC_A.to_string());
        session.audio.set_paused(false);
        settle().await;
        assert!(session.host.is_playing(MUSIC_A), "music should be playing");
        session
    }

    /// Music playing with `VO_1` narrating over it (music ducked)
    pub async fn narrating() -> Self {
        let session = Self::playing_music().await;
        session.host.preload(VO_1);
        session.audio.set_voiceover_url(VO_1.to_string());
        wait(AFTER_DEBOUNCE).await;
        assert!(session.host.is_playing(VO_1), "voiceover should be playing");
        session
    }

    pub fn status(&self) -> EngineStatus {
        self.audio.status()
    }

    pub fn music_ended(&self) -> Vec<String> {
        self.music_ended.lock().unwrap().clone()
    }

    /// Every event received since the last call
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        events
    }

    /// Event type names received since the last drain
    pub fn drain_event_types(&mut self) -> Vec<String> {
        self.drain_events()
            .iter()
            .map(|e| e.event_type().to_string())
            .collect()
    }
}

/// Panics unless the ramp moves monotonically toward its target and never
/// targets zero
pub fn assert_ramp_monotonic(ramp: &ExponentialRamp) {
    assert!(ramp.target >= 0.01, "ramp targets {}", ramp.target);
    assert!(ramp.start_value >= 0.01, "ramp starts at {}", ramp.start_value);

    let rising = ramp.target >= ramp.start_value;
    let mut previous = ramp.value_at(ramp.start_time);
    for i in 1..=20 {
        let t = ramp.start_time + ramp.duration() * f64::from(i) / 20.0;
        let value = ramp.value_at(t);
        if rising {
            assert!(value >= previous - 1e-6, "ramp not rising at {}", t);
        } else {
            assert!(value <= previous + 1e-6, "ramp not falling at {}", t);
        }
        previous = value;
    }
    assert!((previous - ramp.target).abs() < 1e-5);
}
