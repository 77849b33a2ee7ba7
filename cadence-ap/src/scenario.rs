//! Scripted sessions against the simulated host
//!
//! A scenario file describes the simulated platform and a list of timed steps:
//!
//! ```toml
//! [host]
//! autoplay_blocked = true
//! preload = ["music/warmup.mp3"]
//!
//! [[step]]
//! at_ms = 0
//! action = "set_music_url"
//! url = "music/warmup.mp3"
//!
//! [[step]]
//! at_ms = 100
//! action = "set_paused"
//! paused = false
//!
//! [[step]]
//! at_ms = 500
//! action = "play"
//! ```
//!
//! Steps run in order at their offset from the start of the run. Actions
//! either drive the engine's inputs or play the part of the platform
//! (finishing loads, ending tracks, hiding the app).

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::sim::{SimConfig, SimulatedHost};
use crate::state::{EngineStatus, Visibility};
use crate::SessionAudio;
use cadence_common::events::SessionEvent;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Simulated platform settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HostSection {
    pub autoplay_blocked: bool,
    pub unsupported: bool,
    /// URLs that are buffered as soon as they are created
    pub preload: Vec<String>,
}

/// One scripted action
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    SetMusicUrl {
        #[serde(default)]
        url: Option<String>,
    },
    SetVoiceoverUrl {
        #[serde(default)]
        url: Option<String>,
    },
    SetPaused {
        paused: bool,
    },
    SetMusicVolume {
        volume: f32,
    },
    /// User gesture (manual play)
    Play,
    ClearError,
    /// Platform: media for `url` finished buffering
    FinishLoading {
        url: String,
    },
    /// Platform: media for `url` failed to load
    FailLoading {
        url: String,
        #[serde(default = "default_failure")]
        message: String,
    },
    /// Platform: media for `url` reached its end
    FinishPlayback {
        url: String,
    },
    /// App backgrounded: the platform suspends audio
    Hide,
    /// App foregrounded
    Show,
}

fn default_failure() -> String {
    "network error".to_string()
}

/// An action at an offset from the start of the run
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: Action,
}

/// A complete scripted session
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub host: HostSection,

    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,

    /// How long to keep running after the last step
    #[serde(default = "default_tail_ms")]
    pub tail_ms: u64,
}

fn default_tail_ms() -> u64 {
    1000
}

/// Outcome of a scenario run
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    /// Status just before shutdown
    pub final_status: EngineStatus,
    /// Every session event observed, in order
    pub events: Vec<SessionEvent>,
    /// Music URLs reported as ended
    pub music_ended: Vec<String>,
}

impl Scenario {
    /// Parse and validate a scenario from TOML text
    pub fn parse(text: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(text)
            .map_err(|e| Error::Scenario(format!("Invalid scenario: {}", e)))?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Scenario(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&text)
    }

    fn validate(&self) -> Result<()> {
        if let Some(pair) = self.steps.windows(2).find(|w| w[1].at_ms < w[0].at_ms) {
            return Err(Error::Scenario(format!(
                "Steps out of order: {}ms after {}ms",
                pair[1].at_ms, pair[0].at_ms
            )));
        }
        Ok(())
    }

    /// Run the scenario on a fresh simulated host
    pub async fn run(&self, config: EngineConfig) -> ScenarioReport {
        let host = SimulatedHost::new(SimConfig {
            autoplay_blocked: self.host.autoplay_blocked,
            unsupported: self.host.unsupported,
        });
        for url in &self.host.preload {
            host.preload(url);
        }

        let ended = Arc::new(std::sync::Mutex::new(Vec::new()));
        let ended_sink = Arc::clone(&ended);
        let audio = SessionAudio::builder(Arc::new(host.clone()))
            .config(config)
            .on_music_ended(move |url| {
                if let Ok(mut ended) = ended_sink.lock() {
                    ended.push(url.to_string());
                }
            })
            .build();

        let mut events_rx = audio.subscribe_events();
        let mut status_rx = audio.subscribe_status();
        let mut events = Vec::new();
        let start = tokio::time::Instant::now();

        for step in &self.steps {
            tokio::time::sleep_until(start + Duration::from_millis(step.at_ms)).await;
            info!("[{:>6}ms] {:?}", step.at_ms, step.action);
            apply(&audio, &host, &step.action);
            drain(&mut events_rx, &mut events);
            log_status(&mut status_rx);
        }

        tokio::time::sleep(Duration::from_millis(self.tail_ms)).await;
        drain(&mut events_rx, &mut events);
        log_status(&mut status_rx);

        let final_status = audio.status();
        audio.shutdown().await;
        drain(&mut events_rx, &mut events);

        let music_ended = ended.lock().map(|e| e.clone()).unwrap_or_default();
        ScenarioReport {
            final_status,
            events,
            music_ended,
        }
    }
}

fn apply(audio: &SessionAudio, host: &SimulatedHost, action: &Action) {
    match action {
        Action::SetMusicUrl { url } => audio.set_music_url(url.clone()),
        Action::SetVoiceoverUrl { url } => audio.set_voiceover_url(url.clone()),
        Action::SetPaused { paused } => audio.set_paused(*paused),
        Action::SetMusicVolume { volume } => audio.set_music_volume(*volume),
        Action::Play => audio.play(),
        Action::ClearError => audio.clear_error(),
        Action::FinishLoading { url } => host.finish_loading(url),
        Action::FailLoading { url, message } => host.fail_loading(url, message),
        Action::FinishPlayback { url } => host.finish_playback(url),
        Action::Hide => {
            audio.set_visibility(Visibility::Hidden);
            host.hide();
        }
        Action::Show => audio.set_visibility(Visibility::Visible),
    }
}

fn log_status(rx: &mut watch::Receiver<EngineStatus>) {
    if !rx.has_changed().unwrap_or(false) {
        return;
    }
    let status = rx.borrow_and_update().clone();
    info!(
        "Status: playing={} ready={} volume={:.2} ducking={} error={}",
        status.is_playing,
        status.is_ready,
        status.current_volume,
        status.ducking,
        status.error_message().unwrap_or_default()
    );
}

fn drain(rx: &mut broadcast::Receiver<SessionEvent>, events: &mut Vec<SessionEvent>) {
    loop {
        match rx.try_recv() {
            Ok(event) => {
                debug!("Event: {}", event.event_type());
                events.push(event);
            }
            Err(TryRecvError::Lagged(missed)) => warn!("Missed {} session events", missed),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
}
