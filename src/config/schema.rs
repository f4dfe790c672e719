//! Configuration schema types for `pxf.toml`
//!
//! ```toml
//! [canvas]
//! width = 32
//! height = 32
//! background = "white"
//!
//! [timeline]
//! default_duration = 120
//!
//! [storage]
//! dir = ".pxf"
//!
//! [history]
//! limit = 50
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::{Background, CanvasConfig, DEFAULT_FRAME_DURATION};
use crate::persist::{ARTWORK_KEY, HISTORY_KEY};
use crate::session::SessionSettings;

/// Canvas used when a new artwork is started
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasDefaults {
    #[serde(default = "default_canvas_size")]
    pub width: u32,
    #[serde(default = "default_canvas_size")]
    pub height: u32,
    #[serde(default)]
    pub background: Background,
}

fn default_canvas_size() -> u32 {
    16
}

impl Default for CanvasDefaults {
    fn default() -> Self {
        Self {
            width: default_canvas_size(),
            height: default_canvas_size(),
            background: Background::Transparent,
        }
    }
}

/// Frame timeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// Duration (ms) for frames added with no previous frame to copy
    #[serde(default = "default_duration")]
    pub default_duration: u32,
}

fn default_duration() -> u32 {
    DEFAULT_FRAME_DURATION
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            default_duration: default_duration(),
        }
    }
}

/// Where session documents live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Session directory, relative to the config file
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_artwork_key")]
    pub artwork_key: String,
    #[serde(default = "default_history_key")]
    pub history_key: String,
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from(".pxf")
}

fn default_artwork_key() -> String {
    ARTWORK_KEY.to_string()
}

fn default_history_key() -> String {
    HISTORY_KEY.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
            artwork_key: default_artwork_key(),
            history_key: default_history_key(),
        }
    }
}

/// Undo history settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HistoryConfig {
    /// Maximum snapshots kept (unbounded if absent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// Complete pxf.toml configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PxfConfig {
    #[serde(default)]
    pub canvas: CanvasDefaults,
    #[serde(default)]
    pub timeline: TimelineConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "canvas.width")
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pxf.toml: '{}' {}", self.field, self.message)
    }
}

impl PxfConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.canvas.width == 0 {
            errors.push(ConfigValidationError {
                field: "canvas.width".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }
        if self.canvas.height == 0 {
            errors.push(ConfigValidationError {
                field: "canvas.height".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }
        if self.timeline.default_duration == 0 {
            errors.push(ConfigValidationError {
                field: "timeline.default_duration".to_string(),
                message: "must be a positive number of milliseconds".to_string(),
            });
        }
        for (field, key) in [
            ("storage.artwork_key", &self.storage.artwork_key),
            ("storage.history_key", &self.storage.history_key),
        ] {
            if key.is_empty() {
                errors.push(ConfigValidationError {
                    field: field.to_string(),
                    message: "must be a non-empty string".to_string(),
                });
            }
        }
        if self.history.limit == Some(0) {
            errors.push(ConfigValidationError {
                field: "history.limit".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Canvas for a new artwork.
    pub fn canvas_config(&self) -> CanvasConfig {
        CanvasConfig {
            width: self.canvas.width,
            height: self.canvas.height,
            background: self.canvas.background,
            session_key: None,
        }
    }

    /// Session keys and defaults.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            artwork_key: self.storage.artwork_key.clone(),
            history_key: self.storage.history_key.clone(),
            default_duration: self.timeline.default_duration,
            history_limit: self.history.limit,
        }
    }
}
