//! Playback asset list.

use std::path::PathBuf;

use serde::Deserialize;

/// Ordered list of named audio assets, resolved against `asset_dir`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub asset_dir: PathBuf,
    pub assets: Vec<String>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            asset_dir: PathBuf::from("media/audio"),
            assets: [
                "deer clearing pre-dawn.wav",
                "deer clearing pre-dawn distant bird.wav",
                "deer clearing pre-dawn early bird.wav",
                "deer clearing first light 1.wav",
                "deer clearing first light 2.wav",
                "deer clearing first light decline.wav",
            ]
            .iter()
            .map(|name| name.to_string())
            .collect(),
        }
    }
}

impl PlaybackConfig {
    /// Path of the asset at `index`, wrapping modulo the list length
    pub fn asset_path(&self, index: usize) -> Option<PathBuf> {
        if self.assets.is_empty() {
            return None;
        }
        Some(self.asset_dir.join(&self.assets[index % self.assets.len()]))
    }

    /// Index following `index`, wrapping modulo the list length
    pub fn next_index(&self, index: usize) -> usize {
        if self.assets.is_empty() {
            0
        } else {
            (index + 1) % self.assets.len()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_selection_wraps() {
        let config = PlaybackConfig::default();
        let count = config.assets.len();

        assert_eq!(config.next_index(count - 1), 0);
        assert_eq!(config.asset_path(count), config.asset_path(0));
        assert_eq!(
            config.asset_path(0).unwrap(),
            PathBuf::from("media/audio/deer clearing pre-dawn.wav")
        );
    }

    #[test]
    fn test_empty_asset_list() {
        let config = PlaybackConfig {
            asset_dir: PathBuf::from("."),
            assets: Vec::new(),
        };
        assert_eq!(config.asset_path(3), None);
        assert_eq!(config.next_index(3), 0);
    }
}
