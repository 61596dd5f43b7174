//! Audio analysis configuration and constants.

use std::time::Duration;

use serde::Deserialize;

use crate::audio::Mode;
use crate::error::SessionError;

/// How spectra produced on the audio thread reach the exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LiveSmoothing {
    /// Freshly analyzed magnitudes are published verbatim
    #[default]
    PassThrough,

    /// Same peak-decay rule as playback, applied on the audio thread
    PeakDecay,
}

impl std::str::FromStr for LiveSmoothing {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pass-through" | "passthrough" | "off" => Ok(Self::PassThrough),
            "peak-decay" | "decay" | "on" => Ok(Self::PeakDecay),
            other => Err(SessionError::InvalidConfig(format!(
                "unknown live smoothing policy '{}'",
                other
            ))),
        }
    }
}

/// Session-wide analysis configuration.
///
/// Frame size and sample rate are fixed for the lifetime of a session;
/// changing them requires tearing the session down.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Input sample rate (Hz)
    pub sample_rate_hz: u32,

    /// Samples per analysis frame (power of 2)
    pub frame_size: usize,

    /// Frames of buffering between the device and the analyzer
    pub buffer_count: usize,

    /// Per-tick release factor of the peak-decay filter
    pub decay: f32,

    /// Smoothing applied to microphone and synthetic spectra
    pub live_smoothing: LiveSmoothing,

    /// Mode active when the session starts
    pub initial_mode: Mode,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44100,
            frame_size: 512,
            buffer_count: 4,
            decay: 0.95,
            live_smoothing: LiveSmoothing::PassThrough,
            initial_mode: Mode::Playback,
        }
    }
}

impl AnalysisConfig {
    /// Number of magnitude bins produced per frame
    pub fn bin_count(&self) -> usize {
        self.frame_size / 2
    }

    /// Wall-clock length of one frame (= callback cadence)
    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(self.frame_size as f64 / self.sample_rate_hz as f64)
    }

    /// Worst-case buffering latency between capture and analysis
    pub fn latency(&self) -> Duration {
        self.frame_duration() * self.buffer_count as u32
    }

    /// Centre frequency of a bin (Hz)
    pub fn bin_to_hz(&self, bin: usize) -> f32 {
        bin as f32 * self.sample_rate_hz as f32 / self.frame_size as f32
    }

    /// Validate configuration (frame size must be power of 2, etc.)
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.frame_size < 2 || !self.frame_size.is_power_of_two() {
            return Err(SessionError::InvalidConfig(format!(
                "frame size must be a power of 2 >= 2, got {}",
                self.frame_size
            )));
        }
        if self.sample_rate_hz == 0 {
            return Err(SessionError::InvalidConfig(
                "sample rate must be > 0".to_string(),
            ));
        }
        if self.buffer_count == 0 {
            return Err(SessionError::InvalidConfig(
                "buffer count must be > 0".to_string(),
            ));
        }
        if !(self.decay > 0.0 && self.decay < 1.0) {
            return Err(SessionError::InvalidConfig(format!(
                "decay must be in (0, 1), got {}",
                self.decay
            )));
        }
        Ok(())
    }
}
