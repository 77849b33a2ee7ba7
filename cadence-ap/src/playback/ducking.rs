//! Ducking controller
//!
//! Moves the music gain between full volume (`Normal`) and a reduced volume
//! (`Ducked`) with exponential ramps. It is the only writer of the music gain
//! after initialization.
//!
//! # Ramp scheduling
//!
//! Every request:
//! 1. cancels automation still scheduled on the gain,
//! 2. anchors the gain at its actual current value,
//! 3. ramps exponentially to `max(target, 0.01)` over `fade_time`.
//!
//! A new request therefore always wins and starts from where the gain really
//! is, never from a stale target.

use crate::config::EngineConfig;
use crate::host::GainNode;
use cadence_common::events::DuckingState;
use cadence_common::gain_ramp::{ramp_target, ExponentialRamp};
use tracing::{debug, warn};

/// Music gain ducking state machine
pub struct DuckingController {
    music_volume: f32,
    ducked_volume: f32,
    fade_time: f64,
    state: DuckingState,
    /// Target of the most recent ramp
    current_volume: f32,
}

impl DuckingController {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            music_volume: config.music_volume,
            ducked_volume: config.ducked_volume,
            fade_time: config.fade_time_secs,
            state: DuckingState::Normal,
            current_volume: config.music_volume,
        }
    }

    /// Ramp the gain to `target` (floored at 0.01), replacing pending automation
    ///
    /// `gain` is `None` when the graph is unavailable; the target is still
    /// recorded so status reporting stays consistent.
    pub fn duck(&mut self, gain: Option<&dyn GainNode>, now: f64, target: f32) -> ExponentialRamp {
        let target = ramp_target(target);
        let start = gain.map(|g| g.value()).unwrap_or(self.current_volume);
        let ramp = ExponentialRamp::new(start, target, now, now + self.fade_time);

        if let Some(gain) = gain {
            gain.cancel_scheduled_values(now);
            gain.set_value_at_time(ramp.start_value, now);
            if let Err(e) = gain.exponential_ramp_to_value_at_time(ramp.target, ramp.end_time) {
                warn!("Music gain rejected ramp to {:.2}: {}", ramp.target, e);
            }
        }

        debug!(
            "Music gain ramp {:.3} -> {:.3} over {:.2}s",
            ramp.start_value, ramp.target, self.fade_time
        );
        self.current_volume = target;
        ramp
    }

    /// Narration started: `Normal → Ducked`
    ///
    /// Returns the scheduled ramp, or `None` when already ducked.
    pub fn engage(&mut self, gain: Option<&dyn GainNode>, now: f64) -> Option<ExponentialRamp> {
        if self.state == DuckingState::Ducked {
            return None;
        }
        self.state = DuckingState::Ducked;
        Some(self.duck(gain, now, self.ducked_volume))
    }

    /// Narration ended: `Ducked → Normal`
    ///
    /// Returns the scheduled ramp, or `None` when not ducked.
    pub fn release(&mut self, gain: Option<&dyn GainNode>, now: f64) -> Option<ExponentialRamp> {
        if self.state == DuckingState::Normal {
            return None;
        }
        self.state = DuckingState::Normal;
        Some(self.duck(gain, now, self.music_volume))
    }

    /// Manual music volume override
    ///
    /// The new volume becomes the restore target. The gain only moves now if
    /// no narration is ducking it.
    pub fn set_music_volume(
        &mut self,
        gain: Option<&dyn GainNode>,
        now: f64,
        volume: f32,
    ) -> Option<ExponentialRamp> {
        self.music_volume = ramp_target(volume).min(1.0);
        match self.state {
            DuckingState::Normal => Some(self.duck(gain, now, self.music_volume)),
            DuckingState::Ducked => None,
        }
    }

    pub fn state(&self) -> DuckingState {
        self.state
    }

    pub fn current_volume(&self) -> f32 {
        self.current_volume
    }

    pub fn music_volume(&self) -> f32 {
        self.music_volume
    }
}
