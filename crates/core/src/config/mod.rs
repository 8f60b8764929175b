use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{BarTakeError, CaptureConstraints, RecordingSettings, Result};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub session: SessionConfig,
    pub capture: CaptureConstraints,
    pub recording: RecordingSettings,
}

impl AppConfig {
    /// Parses a JSON document. Missing sections and fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.session.segment_count == 0 {
            return Err(BarTakeError::InvalidArgument(
                "segment count must be at least one",
            ));
        }
        if self.session.waveform_width == 0 {
            return Err(BarTakeError::InvalidArgument(
                "waveform width must be at least one column",
            ));
        }
        if !(self.session.waveform_height.is_finite() && self.session.waveform_height > 0.0) {
            return Err(BarTakeError::InvalidArgument(
                "waveform height must be positive",
            ));
        }
        if self.audio.sample_rate == 0 {
            return Err(BarTakeError::InvalidArgument("sample rate must be positive"));
        }
        if self.recording.fps == 0 {
            return Err(BarTakeError::InvalidArgument(
                "recording frame rate must be positive",
            ));
        }
        Ok(())
    }
}

/// Configuration specific to the audio subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Rate of generated click tracks.
    pub sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
        }
    }
}

/// How a loaded track is divided and summarised.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub segment_count: usize,
    pub waveform_width: usize,
    /// Height of the surface the waveform stroke is mapped onto.
    pub waveform_height: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            segment_count: 8,
            waveform_width: 800,
            waveform_height: 80.0,
        }
    }
}
