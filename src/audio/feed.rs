//! Read-only view of the exchange handed to the renderer each frame.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use super::exchange::{Exchange, Snapshot};
use crate::error::SessionError;

/// Everything the shader needs for one rendered frame
#[derive(Debug, Clone)]
pub struct FeedFrame {
    /// Elapsed session time (seconds)
    pub time_s: f32,
    /// Viewport size (pixels)
    pub resolution: Vec2,
    /// Pointer position (pixels)
    pub mouse: Vec2,
    pub buffers: Snapshot,
}

impl FeedFrame {
    pub fn spectrum(&self) -> &[f32] {
        &self.buffers.spectrum
    }

    pub fn waveform(&self) -> &[f32] {
        &self.buffers.waveform
    }

    pub fn uniforms(&self) -> FeedUniforms {
        FeedUniforms {
            time: self.time_s,
            bin_count: self.buffers.spectrum.len() as u32,
            resolution: self.resolution.to_array(),
            mouse: self.mouse.to_array(),
            _padding: [0.0; 2],
        }
    }
}

/// Uniform block matching `struct Feed` in `shaders/effect.wgsl`
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct FeedUniforms {
    pub time: f32,
    pub bin_count: u32,
    pub resolution: [f32; 2],
    pub mouse: [f32; 2],
    pub _padding: [f32; 2], // Uniform structs are 16-byte aligned
}

/// Samples the exchange once per render tick
pub struct ParameterFeed {
    exchange: Arc<Exchange>,
    start: Instant,
    frame: FeedFrame,
}

impl ParameterFeed {
    pub fn new(exchange: Arc<Exchange>) -> Self {
        let frame = FeedFrame {
            time_s: 0.0,
            resolution: Vec2::ZERO,
            mouse: Vec2::ZERO,
            buffers: Snapshot::zeroed(exchange.frame_size()),
        };
        Self {
            exchange,
            start: Instant::now(),
            frame,
        }
    }

    /// Latest exchange contents plus time and pointer pass-through
    pub fn sample(&mut self, resolution: Vec2, mouse: Vec2) -> Result<&FeedFrame, SessionError> {
        self.sample_at(self.start.elapsed(), resolution, mouse)
    }

    pub fn sample_at(
        &mut self,
        elapsed: Duration,
        resolution: Vec2,
        mouse: Vec2,
    ) -> Result<&FeedFrame, SessionError> {
        self.exchange.read_into(&mut self.frame.buffers)?;
        self.frame.time_s = elapsed.as_secs_f32();
        self.frame.resolution = resolution;
        self.frame.mouse = mouse;
        Ok(&self.frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_layout_matches_wgsl() {
        // f32 + u32 + vec2 + vec2, padded to 16 bytes
        assert_eq!(std::mem::size_of::<FeedUniforms>(), 32);
    }

    #[test]
    fn test_sample_passes_through_inputs() {
        let exchange = Arc::new(Exchange::new(8));
        exchange.write(&[0.5; 8], &[0.25; 4]).unwrap();

        let mut feed = ParameterFeed::new(Arc::clone(&exchange));
        let frame = feed
            .sample_at(
                Duration::from_millis(1500),
                Vec2::new(1024.0, 768.0),
                Vec2::new(10.0, 20.0),
            )
            .unwrap();

        assert_eq!(frame.time_s, 1.5);
        assert_eq!(frame.spectrum(), &[0.25; 4]);
        assert_eq!(frame.waveform(), &[0.5; 8]);

        let uniforms = frame.uniforms();
        assert_eq!(uniforms.bin_count, 4);
        assert_eq!(uniforms.resolution, [1024.0, 768.0]);
        assert_eq!(uniforms.mouse, [10.0, 20.0]);
    }

    #[test]
    fn test_sample_tracks_latest_write() {
        let exchange = Arc::new(Exchange::new(4));
        let mut feed = ParameterFeed::new(Arc::clone(&exchange));

        assert_eq!(feed.sample(Vec2::ONE, Vec2::ZERO).unwrap().spectrum(), &[0.0; 2]);

        exchange.write(&[0.0; 4], &[3.0, 4.0]).unwrap();
        assert_eq!(
            feed.sample(Vec2::ONE, Vec2::ZERO).unwrap().spectrum(),
            &[3.0, 4.0]
        );
    }
}
