//! Parameter definitions with physical units and documented semantics.
//!
//! Defaults live here; a TOML file and command-line flags layer on top.

mod audio;
mod file;
mod playback;
mod render;

// Re-export all types
pub use audio::{AnalysisConfig, LiveSmoothing};
pub use file::{AppConfig, DEFAULT_CONFIG_FILE};
pub use playback::PlaybackConfig;
pub use render::RenderConfig;
