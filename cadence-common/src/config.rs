//! Configuration file resolution and TOML loading
//!
//! Config file resolution follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Platform config directory (`<config_dir>/cadence/<file_name>`, only if present)
//! 4. None: the caller falls back to built-in defaults

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Application directory name under the platform config directory
pub const APP_DIR: &str = "cadence";

/// Resolve which config file to load, if any
///
/// # Arguments
/// * `cli_arg` - Path given on the command line
/// * `env_var_name` - Environment variable consulted when no CLI path is given
/// * `file_name` - File name looked up under the platform config directory
///
/// # Returns
/// `None` when no source names a file, meaning built-in defaults apply.
pub fn resolve_config_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    file_name: &str,
) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    let platform_path = default_config_dir().map(|dir| dir.join(file_name));
    match platform_path {
        Some(path) if path.exists() => Some(path),
        _ => {
            debug!("No config file found for {}, using built-in defaults", file_name);
            None
        }
    }
}

/// Platform config directory for Cadence
///
/// - Linux: `~/.config/cadence`
/// - macOS: `~/Library/Application Support/cadence`
/// - Windows: `%APPDATA%\cadence`
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR))
}

/// Load a TOML file into `T`, or `T::default()` when `path` is `None`
///
/// A path that was resolved but cannot be read or parsed is an error.
pub fn load_toml_or_default<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        return Ok(T::default());
    };

    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let value = toml::from_str(&content)?;
    info!("Loaded configuration from {}", path.display());
    Ok(value)
}
