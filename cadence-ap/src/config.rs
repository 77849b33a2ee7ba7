//! Configuration for cadence-ap
//!
//! Loaded from TOML (see `cadence_common::config` for file resolution):
//!
//! ```toml
//! [engine]
//! music_volume = 1.0
//! ducked_volume = 0.35
//! fade_time_secs = 0.5
//! voiceover_debounce_ms = 50
//! event_capacity = 100
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Every key is optional; missing keys take built-in defaults.

use crate::error::Result;
use cadence_common::config::{load_toml_or_default, resolve_config_path};
use cadence_common::MIN_RAMP_TARGET;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "CADENCE_CONFIG";

/// Config file name under the platform config directory
pub const CONFIG_FILE_NAME: &str = "engine.toml";

/// Shortest fade accepted; a zero-length ramp is an audible step
const MIN_FADE_TIME_SECS: f64 = 0.01;

/// Engine tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Music gain while no narration plays, (0, 1]
    pub music_volume: f32,

    /// Music gain while narration plays, [0, 1)
    pub ducked_volume: f32,

    /// Duration of every ducking ramp in seconds
    pub fade_time_secs: f64,

    /// Delay before a new voiceover is started, absorbing rapid section changes
    pub voiceover_debounce_ms: u64,

    /// Session event bus capacity
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            music_volume: 1.0,
            ducked_volume: 0.35,
            fade_time_secs: 0.5,
            voiceover_debounce_ms: 50,
            event_capacity: 100,
        }
    }
}

impl EngineConfig {
    /// Clamp every tunable into its legal range, logging each correction
    pub fn validate(mut self) -> Self {
        if !(self.music_volume > 0.0 && self.music_volume <= 1.0) {
            let fixed = if self.music_volume.is_nan() {
                1.0
            } else {
                self.music_volume.clamp(MIN_RAMP_TARGET, 1.0)
            };
            warn!("music_volume {} out of range (0, 1], using {}", self.music_volume, fixed);
            self.music_volume = fixed;
        }

        if !(self.ducked_volume >= 0.0 && self.ducked_volume < 1.0) {
            let fixed = Self::default().ducked_volume;
            warn!("ducked_volume {} out of range [0, 1), using {}", self.ducked_volume, fixed);
            self.ducked_volume = fixed;
        }

        if !(self.fade_time_secs >= MIN_FADE_TIME_SECS) {
            warn!(
                "fade_time_secs {} below minimum, using {}",
                self.fade_time_secs, MIN_FADE_TIME_SECS
            );
            self.fade_time_secs = MIN_FADE_TIME_SECS;
        }

        if self.event_capacity == 0 {
            warn!("event_capacity must be positive, using 1");
            self.event_capacity = 1;
        }

        self
    }

    pub fn voiceover_debounce(&self) -> Duration {
        Duration::from_millis(self.voiceover_debounce_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Complete config file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Resolve and load the config file, falling back to defaults when none exists
    ///
    /// Priority: `cli_path`, then `CADENCE_CONFIG`, then the platform config dir.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let path = resolve_config_path(cli_path, CONFIG_ENV_VAR, CONFIG_FILE_NAME);
        let config: AppConfig = load_toml_or_default(path.as_deref())?;
        Ok(Self {
            engine: config.engine.validate(),
            logging: config.logging,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.music_volume, 1.0);
        assert_eq!(config.ducked_volume, 0.35);
        assert_eq!(config.fade_time_secs, 0.5);
        assert_eq!(config.voiceover_debounce(), Duration::from_millis(50));
        assert_eq!(config.clone().validate(), config);
    }

    #[test]
    fn test_validate_clamps() {
        let config = EngineConfig {
            music_volume: 0.0,
            ducked_volume: 1.5,
            fade_time_secs: 0.0,
            voiceover_debounce_ms: 0,
            event_capacity: 0,
        }
        .validate();

        assert_eq!(config.music_volume, MIN_RAMP_TARGET);
        assert_eq!(config.ducked_volume, 0.35);
        assert_eq!(config.fade_time_secs, MIN_FADE_TIME_SECS);
        assert_eq!(config.voiceover_debounce_ms, 0);
        assert_eq!(config.event_capacity, 1);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine]\nducked_volume = 0.2\n\n[logging]\nlevel = \"debug\"").unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.engine.ducked_volume, 0.2);
        assert_eq!(config.engine.music_volume, 1.0);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_values_are_corrected_on_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine]\nmusic_volume = 3.0").unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.engine.music_volume, 1.0);
    }
}
