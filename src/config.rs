//! Configuration management
//!
//! Runtime options for media constraints, encoding, and the toast region,
//! loaded from and saved to TOML. A missing file is not an error; defaults
//! apply.

use crate::errors::RecorderError;
use crate::types::{MediaConstraints, MediaMime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    pub media: MediaConfig,
    pub encode: EncodeConfig,
    pub toast: ToastConfig,
}

/// What to capture and from where
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Request microphone access
    pub audio: bool,
    /// Request camera access
    pub video: bool,
    /// Camera device id; None picks the default device
    pub device_id: Option<String>,
    /// Fallback resolution when the device does not report one
    pub width: u32,
    pub height: u32,
    /// Fallback frame rate
    pub fps: f64,
}

/// Encoding parameters for recordings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeConfig {
    /// Container MIME type (e.g. "video/mp4")
    pub container: String,
    /// Target bitrate in bits per second
    pub bitrate: u32,
}

/// Toast notification region
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToastConfig {
    /// Placement hint for the frontend
    pub position: String,
    /// Auto-dismiss window in milliseconds
    pub auto_dismiss_ms: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            media: MediaConfig {
                audio: true,
                video: true,
                device_id: None,
                width: 1280,
                height: 720,
                fps: 30.0,
            },
            encode: EncodeConfig {
                container: "video/mp4".to_string(),
                bitrate: 5_000_000,
            },
            toast: ToastConfig {
                position: "top-center".to_string(),
                auto_dismiss_ms: 3000,
            },
        }
    }
}

impl RecorderConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, RecorderError> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| RecorderError::Io(format!("failed to read config file: {}", e)))?;
        let config: RecorderConfig = toml::from_str(&contents)
            .map_err(|e| RecorderError::Io(format!("failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), RecorderError> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| RecorderError::Io(format!("failed to serialize config: {}", e)))?;
        fs::write(path, contents)
            .map_err(|e| RecorderError::Io(format!("failed to write config file: {}", e)))
    }

    pub fn validate(&self) -> Result<(), RecorderError> {
        if self.media.fps <= 0.0 {
            return Err(RecorderError::Io(format!(
                "invalid fps: {}",
                self.media.fps
            )));
        }
        if self.encode.bitrate == 0 {
            return Err(RecorderError::Io("bitrate must be non-zero".to_string()));
        }
        if self.container().is_none() {
            return Err(RecorderError::Io(format!(
                "unknown container '{}'",
                self.encode.container
            )));
        }
        Ok(())
    }

    pub fn constraints(&self) -> MediaConstraints {
        MediaConstraints {
            audio: self.media.audio,
            video: self.media.video,
        }
    }

    pub fn container(&self) -> Option<MediaMime> {
        MediaMime::parse(&self.encode.container)
    }
}
