//! Frame generation for each audio mode.

use std::f32::consts::PI;
use std::sync::atomic::{AtomicU32, Ordering};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::Mode;
use crate::error::SessionError;

/// Live control value driving the sine source (pointer x, in pixels).
///
/// Stored as raw `f32` bits so both threads can touch it without a lock.
#[derive(Debug, Default)]
pub struct SharedControl(AtomicU32);

impl SharedControl {
    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Per-mode frame generator.
///
/// Holds the state every variant needs (noise generator, sine width) so that
/// switching mode never allocates on the audio thread.
pub struct FrameSource {
    rng: SmallRng,
    /// Fixed normalization width of the sine source
    sine_width: f32,
}

impl FrameSource {
    pub fn new(sine_width: f32) -> Self {
        Self {
            rng: SmallRng::from_os_rng(),
            sine_width,
        }
    }

    /// Deterministic noise, for tests
    pub fn with_seed(sine_width: f32, seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            sine_width,
        }
    }

    /// Fill `frame` for `mode`.
    ///
    /// Returns `false` in playback mode: the decoder owns that signal and the
    /// frame is left untouched.
    pub fn produce(
        &mut self,
        mode: Mode,
        input: &[f32],
        control: f32,
        frame: &mut [f32],
    ) -> Result<bool, SessionError> {
        match mode {
            Mode::Playback => return Ok(false),
            Mode::Microphone => {
                if input.len() != frame.len() {
                    return Err(SessionError::FrameSizeMismatch {
                        expected: frame.len(),
                        actual: input.len(),
                    });
                }
                normalize_peak(input, frame);
            }
            Mode::SyntheticSine => fill_sine(frame, control, self.sine_width),
            Mode::SyntheticNoise => fill_noise(frame, &mut self.rng),
        }
        Ok(true)
    }
}

/// Copy `input` into `frame` scaled so the loudest sample has magnitude 1.
///
/// Non-finite samples are zeroed. A silent input stays all-zero instead of
/// dividing by zero.
pub fn normalize_peak(input: &[f32], frame: &mut [f32]) {
    for (sample, &raw) in frame.iter_mut().zip(input) {
        *sample = if raw.is_finite() { raw } else { 0.0 };
    }

    let peak = frame.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
    if peak > 0.0 {
        for sample in frame.iter_mut() {
            *sample /= peak;
        }
    }
}

/// `sin(π · i · control / width)` for every sample index `i`
pub fn fill_sine(frame: &mut [f32], control: f32, width: f32) {
    let step = if width > 0.0 { PI * control / width } else { 0.0 };
    for (i, sample) in frame.iter_mut().enumerate() {
        *sample = (step * i as f32).sin();
    }
}

/// Independent uniform samples in [-1, 1]
pub fn fill_noise(frame: &mut [f32], rng: &mut impl Rng) {
    for sample in frame.iter_mut() {
        *sample = rng.random_range(-1.0..=1.0);
    }
}
