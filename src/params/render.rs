//! Rendering configuration.

use std::path::PathBuf;

use serde::Deserialize;

/// Rendering configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Window width (pixels)
    /// Also the normalization width of the synthetic sine source
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,

    /// WGSL effect shader; the built-in effect is used when unset
    pub shader_path: Option<PathBuf>,

    /// Still images cycled with the picture command
    pub pictures: Vec<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1024,
            window_height: 768,
            shader_path: None,
            pictures: Vec::new(),
        }
    }
}
