//! Re-blocks device callbacks of any length into fixed-size frames.

use ringbuf::traits::{Consumer, Observer, Producer};
use ringbuf::HeapRb;

/// Sample ring holding `buffer_count` frames; storage is allocated once.
pub struct FrameAssembler {
    ring: HeapRb<f32>,
    frame: Vec<f32>,
}

impl FrameAssembler {
    pub fn new(frame_size: usize, buffer_count: usize) -> Self {
        Self {
            ring: HeapRb::new(frame_size * buffer_count.max(1)),
            frame: vec![0.0; frame_size],
        }
    }

    /// Feed `input`, calling `on_frame` for every completed frame.
    /// Leftover samples wait for the next call. Returns the number of frames.
    pub fn push(&mut self, mut input: &[f32], mut on_frame: impl FnMut(&[f32])) -> usize {
        let mut frames = 0;
        while !input.is_empty() {
            let pushed = self.ring.push_slice(input);
            input = &input[pushed..];

            while self.ring.occupied_len() >= self.frame.len() {
                self.ring.pop_slice(&mut self.frame);
                on_frame(&self.frame);
                frames += 1;
            }
        }
        frames
    }
}
