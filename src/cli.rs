//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::audio::Mode;
use crate::params::{AppConfig, LiveSmoothing};

/// Command line arguments
///
/// Every flag is optional and overrides the matching value from the
/// configuration file.
#[derive(Parser, Debug)]
#[command(name = "soundshader")]
#[command(about = "Live audio spectrum feeding a fragment shader", long_about = None)]
pub struct Args {
    /// Configuration file (defaults to ./soundshader.toml when present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Initial mode: playback, microphone, sine, noise
    #[arg(long, value_name = "MODE")]
    pub mode: Option<String>,

    /// Samples per analysis frame (power of two)
    #[arg(long, value_name = "SAMPLES")]
    pub frame_size: Option<usize>,

    /// Session sample rate
    #[arg(long, value_name = "HZ")]
    pub sample_rate: Option<u32>,

    /// Playback peak-decay factor per render tick
    #[arg(long, value_name = "FACTOR")]
    pub decay: Option<f32>,

    /// Smoothing of live spectra: pass-through or peak-decay
    #[arg(long, value_name = "POLICY")]
    pub live_smoothing: Option<String>,

    /// WGSL effect shader to load instead of the built-in one
    #[arg(long, value_name = "FILE")]
    pub shader: Option<PathBuf>,

    /// Still image (repeat to build the picture list)
    #[arg(long = "picture", value_name = "FILE")]
    pub pictures: Vec<PathBuf>,

    /// Directory holding the playback assets
    #[arg(long, value_name = "DIR")]
    pub asset_dir: Option<PathBuf>,
}

impl Args {
    /// Layer the flags that were given on top of `config`
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(mode) = &self.mode {
            match mode.parse::<Mode>() {
                Ok(mode) => config.audio.initial_mode = mode,
                Err(e) => log::warn!("{}, keeping {}", e, config.audio.initial_mode),
            }
        }

        if let Some(policy) = &self.live_smoothing {
            match policy.parse::<LiveSmoothing>() {
                Ok(policy) => config.audio.live_smoothing = policy,
                Err(e) => log::warn!("{}, keeping {:?}", e, config.audio.live_smoothing),
            }
        }

        if let Some(frame_size) = self.frame_size {
            config.audio.frame_size = frame_size;
        }
        if let Some(rate) = self.sample_rate {
            config.audio.sample_rate_hz = rate;
        }
        if let Some(decay) = self.decay {
            config.audio.decay = decay;
        }
        if let Some(shader) = &self.shader {
            config.render.shader_path = Some(shader.clone());
        }
        if !self.pictures.is_empty() {
            config.render.pictures = self.pictures.clone();
        }
        if let Some(dir) = &self.asset_dir {
            config.playback.asset_dir = dir.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_flags_keep_config() {
        let args = Args::try_parse_from(["soundshader"]).unwrap();
        let mut config = AppConfig::default();
        args.apply(&mut config);

        assert_eq!(config.audio.frame_size, 512);
        assert_eq!(config.audio.initial_mode, Mode::Playback);
        assert!(config.render.pictures.is_empty());
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::try_parse_from([
            "soundshader",
            "--mode",
            "noise",
            "--frame-size",
            "1024",
            "--decay",
            "0.9",
            "--live-smoothing",
            "peak-decay",
            "--picture",
            "a.png",
            "--picture",
            "b.png",
            "--asset-dir",
            "sounds",
        ])
        .unwrap();
        let mut config = AppConfig::default();
        args.apply(&mut config);

        assert_eq!(config.audio.initial_mode, Mode::SyntheticNoise);
        assert_eq!(config.audio.frame_size, 1024);
        assert!((config.audio.decay - 0.9).abs() < 1e-6);
        assert_eq!(config.audio.live_smoothing, LiveSmoothing::PeakDecay);
        assert_eq!(
            config.render.pictures,
            vec![PathBuf::from("a.png"), PathBuf::from("b.png")]
        );
        assert_eq!(config.playback.asset_dir, PathBuf::from("sounds"));
    }

    #[test]
    fn test_unknown_mode_is_ignored() {
        let args = Args::try_parse_from(["soundshader", "--mode", "radio"]).unwrap();
        let mut config = AppConfig::default();
        config.audio.initial_mode = Mode::Microphone;
        args.apply(&mut config);

        assert_eq!(config.audio.initial_mode, Mode::Microphone);
    }
}
