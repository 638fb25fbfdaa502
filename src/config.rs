//! Application configuration (JSON), with defaults for everything.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::session::SessionOptions;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub camera: CameraConfig,
    pub overlay: OverlayConfig,
    pub capture: CaptureConfig,
    pub logging: LoggingConfig,
}

/// Requested camera stream. The shell falls back if the device can't do it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Zero-based device index.
    pub index: u32,
    pub resolution: ResolutionPreset,
    pub fps: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionPreset {
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "1080p")]
    Hd1080,
    #[serde(rename = "4k")]
    Uhd4k,
}

impl ResolutionPreset {
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            ResolutionPreset::Hd720 => (1280, 720),
            ResolutionPreset::Hd1080 => (1920, 1080),
            ResolutionPreset::Uhd4k => (3840, 2160),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "720p" => Some(ResolutionPreset::Hd720),
            "1080p" => Some(ResolutionPreset::Hd1080),
            "4k" => Some(ResolutionPreset::Uhd4k),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Photo to load at startup.
    pub path: Option<PathBuf>,
    /// Starting opacity, 0..=100.
    pub opacity_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub output_dir: PathBuf,
    /// JPEG quality 0..=1.
    pub quality: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "historic_overlay=debug,warn".
    pub level: String,
    pub json: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self { index: 0, resolution: ResolutionPreset::Hd1080, fps: 30 }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self { path: None, opacity_percent: 50.0 }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self { output_dir: PathBuf::from("."), quality: crate::capture::DEFAULT_QUALITY }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

impl AppConfig {
    /// Read `path` if it exists; defaults otherwise or when it can't be parsed.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("Failed to parse config at {:?}: {}", path, e),
            },
            Err(e) => tracing::warn!("Failed to read config at {:?}: {}", path, e),
        }
        Self::default()
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.overlay.opacity_percent) {
            return Err(Error::Config(format!(
                "overlay.opacity_percent must be 0..=100, got {}",
                self.overlay.opacity_percent
            )));
        }
        if !(self.capture.quality > 0.0 && self.capture.quality <= 1.0) {
            return Err(Error::Config(format!(
                "capture.quality must be in (0, 1], got {}",
                self.capture.quality
            )));
        }
        if self.camera.fps == 0 {
            return Err(Error::Config("camera.fps must be positive".into()));
        }
        Ok(())
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            opacity_percent: self.overlay.opacity_percent,
            jpeg_quality: self.capture.quality,
        }
    }
}
