//! Session error type shared by the audio core and its collaborators.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while setting up or running a session.
///
/// Nothing in here crosses the audio callback: the callback logs and raises
/// the session fault flag instead.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid analysis config: {0}")]
    InvalidConfig(String),

    /// Buffers are sized once per session; anything else is fatal.
    #[error("frame size mismatch: expected {expected} samples, got {actual}")]
    FrameSizeMismatch { expected: usize, actual: usize },

    #[error("unknown audio mode '{0}'")]
    UnknownMode(String),

    #[error("no audio {0} device found")]
    NoDevice(&'static str),

    #[error("failed to query audio device config: {0}")]
    DeviceConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("failed to decode audio asset {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("audio asset {0} contains no samples")]
    EmptyAsset(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to load image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("failed to request device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("shader rejected: {0}")]
    Shader(String),
}
