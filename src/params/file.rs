//! TOML configuration file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{AnalysisConfig, PlaybackConfig, RenderConfig};
use crate::error::SessionError;

/// File looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "soundshader.toml";

/// Complete application configuration; every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AnalysisConfig,
    pub render: RenderConfig,
    pub playback: PlaybackConfig,
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, SessionError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let content = std::fs::read_to_string(path).map_err(|source| SessionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Explicit path, or the default file if it exists in the working directory
    pub fn discover(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        local.exists().then_some(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Mode;
    use crate::params::LiveSmoothing;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.audio.frame_size, 512);
        assert_eq!(config.render.window_width, 1024);
        assert_eq!(config.playback.assets.len(), 6);
    }

    #[test]
    fn test_partial_sections() {
        let config = AppConfig::from_toml_str(
            r#"
            [audio]
            frame_size = 1024
            initial_mode = "synthetic-noise"
            live_smoothing = "peak-decay"

            [playback]
            asset_dir = "clips"
            assets = ["a.wav", "b.wav"]
            "#,
        )
        .unwrap();

        assert_eq!(config.audio.frame_size, 1024);
        assert_eq!(config.audio.sample_rate_hz, 44100);
        assert_eq!(config.audio.initial_mode, Mode::SyntheticNoise);
        assert_eq!(config.audio.live_smoothing, LiveSmoothing::PeakDecay);
        assert_eq!(config.playback.asset_dir, PathBuf::from("clips"));
        assert_eq!(config.playback.assets, vec!["a.wav", "b.wav"]);
    }

    #[test]
    fn test_mode_aliases() {
        let config = AppConfig::from_toml_str("[audio]\ninitial_mode = \"mic\"").unwrap();
        assert_eq!(config.audio.initial_mode, Mode::Microphone);
    }

    #[test]
    fn test_malformed_file_is_rejected() {
        let result = AppConfig::from_toml_str("[audio]\nframe_size = \"big\"");
        assert!(matches!(result, Err(SessionError::ConfigParse(_))));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let path = Path::new("/nonexistent/soundshader.toml");
        match AppConfig::load(path) {
            Err(SessionError::Io { path: p, .. }) => assert_eq!(p, path),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_discover_prefers_explicit_path() {
        let explicit = Path::new("custom.toml");
        assert_eq!(
            AppConfig::discover(Some(explicit)),
            Some(PathBuf::from("custom.toml"))
        );
    }
}
