//! Audio sources, spectral analysis, smoothing and the producer/consumer
//! exchange feeding the renderer.
//!
//! The audio callback runs [`AudioPipeline`] once per frame and writes into
//! the [`Exchange`]; the render loop decays playback spectra into it and
//! samples it through [`ParameterFeed`].

mod assembler;
mod exchange;
mod feed;
mod fft;
mod mode;
mod pipeline;
mod playback;
mod session;
mod smoother;
mod source;
mod system;

// Re-export public types
pub use assembler::FrameAssembler;
pub use exchange::{Exchange, Snapshot};
pub use feed::{FeedFrame, FeedUniforms, ParameterFeed};
pub use fft::{hamming_window, SpectralAnalyzer};
pub use mode::{Mode, SharedMode};
pub use pipeline::AudioPipeline;
pub use playback::{PlaybackDeck, Track};
pub use session::Session;
pub use smoother::{peak_decay, SmoothingPolicy, TemporalSmoother};
pub use source::{fill_noise, fill_sine, normalize_peak, FrameSource, SharedControl};
pub use system::AudioSystem;
