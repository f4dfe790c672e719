//! Configuration loading and discovery for `pxf.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::PxfConfig;
use crate::models::Background;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file.
pub const CONFIG_FILE: &str = "pxf.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse pxf.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override session directory
    pub session_dir: Option<PathBuf>,
    /// Override canvas width
    pub width: Option<u32>,
    /// Override canvas height
    pub height: Option<u32>,
    /// Override background
    pub background: Option<Background>,
    /// Override default frame duration
    pub default_duration: Option<u32>,
}

/// Find pxf.toml by walking up from the current working directory, then in
/// `$XDG_CONFIG_HOME/pixelframe/` (or `~/.config/pixelframe/`).
pub fn find_config() -> Option<PathBuf> {
    if let Ok(cwd) = env::current_dir() {
        if let Some(path) = find_config_from(cwd) {
            return Some(path);
        }
    }

    find_xdg_config()
}

/// Find pxf.toml in the XDG config directory.
pub fn find_xdg_config() -> Option<PathBuf> {
    let xdg_config = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok()?;

    let config_path = xdg_config.join("pixelframe").join(CONFIG_FILE);
    if config_path.exists() {
        Some(config_path)
    } else {
        None
    }
}

/// Find pxf.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration.
///
/// Uses `path` if given, otherwise [`find_config`]. With no config file the
/// defaults are returned. A relative `storage.dir` is resolved against the
/// directory holding the config file.
pub fn load_config(path: Option<&Path>) -> Result<PxfConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(PxfConfig::default()),
    }
}

fn load_config_file(path: &Path) -> Result<PxfConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let mut config: PxfConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(
            errors.into_iter().map(|e| e.to_string()).collect(),
        ));
    }

    if let Some(root) = path.parent() {
        config.storage.dir = resolve_path(root, &config.storage.dir);
    }
    tracing::debug!(path = %path.display(), "loaded config");

    Ok(config)
}

/// Merge CLI overrides into a configuration. CLI values win.
pub fn merge_cli_overrides(config: &mut PxfConfig, overrides: &CliOverrides) {
    if let Some(ref dir) = overrides.session_dir {
        config.storage.dir = dir.clone();
    }
    if let Some(width) = overrides.width {
        config.canvas.width = width;
    }
    if let Some(height) = overrides.height {
        config.canvas.height = height;
    }
    if let Some(background) = overrides.background {
        config.canvas.background = background;
    }
    if let Some(ms) = overrides.default_duration {
        config.timeline.default_duration = ms;
    }
}

/// Resolve a path relative to a root; absolute paths are returned unchanged.
pub fn resolve_path(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
