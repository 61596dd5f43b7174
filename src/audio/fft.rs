//! Windowed FFT magnitude analysis.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

use crate::error::SessionError;

/// Hamming window + forward FFT of one fixed frame size.
///
/// Window, plan and scratch space are built once, so `analyze` does not
/// allocate and is safe to call from the audio callback.
pub struct SpectralAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    /// 2/N so a full-scale sinusoid reads near the window's coherent gain
    scale: f32,
}

impl SpectralAnalyzer {
    /// `frame_size` must already be validated (power of 2, >= 2)
    pub fn new(frame_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(frame_size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Self {
            fft,
            window: (0..frame_size)
                .map(|i| hamming_window(i, frame_size))
                .collect(),
            buffer: vec![Complex::new(0.0, 0.0); frame_size],
            scratch,
            scale: 2.0 / frame_size as f32,
        }
    }

    pub fn frame_size(&self) -> usize {
        self.window.len()
    }

    pub fn bin_count(&self) -> usize {
        self.window.len() / 2
    }

    /// Write the magnitude of the first N/2 bins of `frame` into `magnitudes`
    pub fn analyze(&mut self, frame: &[f32], magnitudes: &mut [f32]) -> Result<(), SessionError> {
        if frame.len() != self.frame_size() {
            return Err(SessionError::FrameSizeMismatch {
                expected: self.frame_size(),
                actual: frame.len(),
            });
        }
        if magnitudes.len() != self.bin_count() {
            return Err(SessionError::FrameSizeMismatch {
                expected: self.bin_count(),
                actual: magnitudes.len(),
            });
        }

        for ((slot, &sample), &w) in self.buffer.iter_mut().zip(frame).zip(&self.window) {
            *slot = Complex::new(sample * w, 0.0);
        }

        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        for (magnitude, bin) in magnitudes.iter_mut().zip(&self.buffer) {
            *magnitude = bin.norm() * self.scale;
        }
        Ok(())
    }
}

/// Hamming window function for FFT analysis
pub fn hamming_window(index: usize, size: usize) -> f32 {
    0.54 - 0.46 * ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(frame_size: usize, bin: usize) -> Vec<f32> {
        (0..frame_size)
            .map(|i| (2.0 * PI * bin as f32 * i as f32 / frame_size as f32).sin())
            .collect()
    }

    #[test]
    fn test_hamming_window() {
        let size = 512;

        // Hamming window is 0.08 at the edges, 1 at the center
        assert!((hamming_window(0, size) - 0.08).abs() < 0.001);
        assert!((hamming_window(size - 1, size) - 0.08).abs() < 0.001);
        assert!((hamming_window(size / 2, size) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_bin_count_is_half_frame_size() {
        for frame_size in [2, 64, 256, 512, 1024, 4096] {
            let analyzer = SpectralAnalyzer::new(frame_size);
            assert_eq!(analyzer.bin_count(), frame_size / 2);
        }
    }

    #[test]
    fn test_tone_peaks_at_its_bin() {
        let mut analyzer = SpectralAnalyzer::new(512);
        let mut magnitudes = vec![0.0; 256];

        analyzer.analyze(&tone(512, 32), &mut magnitudes).unwrap();

        let loudest = magnitudes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(loudest, 32);

        // Unit sine → Hamming coherent gain (0.54)
        assert!((magnitudes[32] - 0.54).abs() < 0.01);
    }

    #[test]
    fn test_silence_has_no_energy() {
        let mut analyzer = SpectralAnalyzer::new(512);
        let mut magnitudes = vec![1.0; 256];

        analyzer.analyze(&[0.0; 512], &mut magnitudes).unwrap();

        assert!(magnitudes.iter().all(|m| *m == 0.0));
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let mut analyzer = SpectralAnalyzer::new(256);
        let frame = tone(256, 10);
        let mut first = vec![0.0; 128];
        let mut second = vec![0.0; 128];

        analyzer.analyze(&frame, &mut first).unwrap();
        analyzer.analyze(&[0.3; 256], &mut second).unwrap();
        analyzer.analyze(&frame, &mut second).unwrap();

        assert_eq!(first, second);
        assert!(first.iter().all(|m| *m >= 0.0));
    }

    #[test]
    fn test_rejects_wrong_sizes() {
        let mut analyzer = SpectralAnalyzer::new(512);

        let mut magnitudes = vec![0.0; 256];
        assert!(matches!(
            analyzer.analyze(&[0.0; 1024], &mut magnitudes),
            Err(SessionError::FrameSizeMismatch {
                expected: 512,
                actual: 1024
            })
        ));

        let mut short = vec![0.0; 100];
        assert!(analyzer.analyze(&[0.0; 512], &mut short).is_err());
    }
}
