//! Temporal smoothing of spectra before they reach the renderer.

use super::Mode;
use crate::params::LiveSmoothing;

/// What happens to a spectrum between analysis and the exchange
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SmoothingPolicy {
    /// Fresh magnitudes replace the previous ones verbatim
    PassThrough,

    /// `smoothed = max(smoothed * decay, fresh)`: instant attack, exponential release
    PeakDecay { decay: f32 },
}

impl SmoothingPolicy {
    /// Update `smoothed` in place from `fresh`
    pub fn apply(self, smoothed: &mut [f32], fresh: &[f32]) {
        match self {
            Self::PassThrough => smoothed.copy_from_slice(fresh),
            Self::PeakDecay { decay } => peak_decay(smoothed, fresh, decay),
        }
    }
}

/// Per-mode smoothing rule.
///
/// Playback spectra are always peak-decayed on the render thread. Spectra
/// analyzed on the audio thread follow `live` (pass-through unless opted in).
#[derive(Debug, Clone, Copy)]
pub struct TemporalSmoother {
    decay: f32,
    live: LiveSmoothing,
}

impl TemporalSmoother {
    pub fn new(decay: f32, live: LiveSmoothing) -> Self {
        Self { decay, live }
    }

    pub fn policy(&self, mode: Mode) -> SmoothingPolicy {
        match (mode, self.live) {
            (Mode::Playback, _) | (_, LiveSmoothing::PeakDecay) => SmoothingPolicy::PeakDecay {
                decay: self.decay,
            },
            (_, LiveSmoothing::PassThrough) => SmoothingPolicy::PassThrough,
        }
    }
}

/// Decay-only peak filter
pub fn peak_decay(smoothed: &mut [f32], external: &[f32], decay: f32) {
    for (value, &incoming) in smoothed.iter_mut().zip(external) {
        *value = (*value * decay).max(incoming);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attack_is_immediate() {
        let mut smoothed = vec![0.1, 0.5, 0.0];
        let external = [0.8, 0.9, 0.3];

        peak_decay(&mut smoothed, &external, 0.95);

        assert_eq!(smoothed, vec![0.8, 0.9, 0.3]);
    }

    #[test]
    fn test_release_converges_from_above() {
        let external = [0.2; 4];
        let mut smoothed = vec![1.0; 4];
        let mut previous = smoothed.clone();

        for _ in 0..200 {
            peak_decay(&mut smoothed, &external, 0.95);
            for (now, before) in smoothed.iter().zip(&previous) {
                assert!(now <= before, "smoothed value rose without new input");
                assert!(*now >= 0.2, "smoothed value undershot the input");
            }
            previous = smoothed.clone();
        }

        // 0.95^200 ≈ 3.5e-5, so the floor has been reached
        assert!(smoothed.iter().all(|v| (*v - 0.2).abs() < 1e-6));
    }

    #[test]
    fn test_single_tick_release_rate() {
        let mut smoothed = vec![1.0];
        peak_decay(&mut smoothed, &[0.0], 0.95);
        assert!((smoothed[0] - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_playback_always_decays() {
        let smoother = TemporalSmoother::new(0.9, LiveSmoothing::PassThrough);
        assert_eq!(
            smoother.policy(Mode::Playback),
            SmoothingPolicy::PeakDecay { decay: 0.9 }
        );
    }

    #[test]
    fn test_live_modes_pass_through_by_default() {
        let smoother = TemporalSmoother::new(0.95, LiveSmoothing::default());
        for mode in [Mode::Microphone, Mode::SyntheticSine, Mode::SyntheticNoise] {
            assert_eq!(smoother.policy(mode), SmoothingPolicy::PassThrough);
        }
    }

    #[test]
    fn test_live_peak_decay_opt_in() {
        let smoother = TemporalSmoother::new(0.95, LiveSmoothing::PeakDecay);
        assert_eq!(
            smoother.policy(Mode::Microphone),
            SmoothingPolicy::PeakDecay { decay: 0.95 }
        );
    }

    #[test]
    fn test_pass_through_forgets_history() {
        let mut smoothed = vec![5.0, 5.0];
        SmoothingPolicy::PassThrough.apply(&mut smoothed, &[0.1, 0.2]);
        assert_eq!(smoothed, vec![0.1, 0.2]);
    }
}
