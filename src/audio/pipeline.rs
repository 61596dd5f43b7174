//! Producer-side processing step run once per audio frame.

use super::fft::SpectralAnalyzer;
use super::smoother::TemporalSmoother;
use super::source::FrameSource;
use super::Session;
use crate::error::SessionError;
use crate::params::AnalysisConfig;

/// Frame generation → analysis → smoothing → exchange write.
///
/// All buffers are allocated up front; `process` is allocation-free and
/// holds the exchange lock only for the final copy and smoothing pass.
pub struct AudioPipeline {
    session: Session,
    source: FrameSource,
    analyzer: SpectralAnalyzer,
    smoother: TemporalSmoother,
    frame: Vec<f32>,
    spectrum: Vec<f32>,
}

impl AudioPipeline {
    pub fn new(config: &AnalysisConfig, session: Session, source: FrameSource) -> Self {
        Self {
            session,
            source,
            analyzer: SpectralAnalyzer::new(config.frame_size),
            smoother: TemporalSmoother::new(config.decay, config.live_smoothing),
            frame: vec![0.0; config.frame_size],
            spectrum: vec![0.0; config.bin_count()],
        }
    }

    /// Process one input frame. Returns `false` when the active mode does not
    /// produce frames on this thread (playback).
    pub fn process(&mut self, input: &[f32]) -> Result<bool, SessionError> {
        let mode = self.session.mode.get();
        let control = self.session.control.get();

        if !self.source.produce(mode, input, control, &mut self.frame)? {
            return Ok(false);
        }

        self.analyzer.analyze(&self.frame, &mut self.spectrum)?;

        self.session.exchange.write_smoothed(
            &self.frame,
            &self.spectrum,
            self.smoother.policy(mode),
        )?;
        Ok(true)
    }
}
