//! Waveform/spectrum hand-off between the audio callback and the render loop.

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::smoother::{peak_decay, SmoothingPolicy};
use crate::error::SessionError;

/// Latest waveform and smoothed spectrum
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub waveform: Vec<f32>,
    pub spectrum: Vec<f32>,
}

impl Snapshot {
    pub fn zeroed(frame_size: usize) -> Self {
        Self {
            waveform: vec![0.0; frame_size],
            spectrum: vec![0.0; frame_size / 2],
        }
    }
}

/// Mutex-guarded buffer pair shared by producer and consumer.
///
/// Buffers are sized once and zero-filled; every write replaces both buffers
/// completely under the lock, so readers only ever see whole frames. The
/// critical section is a memory copy, never analysis or I/O.
#[derive(Debug)]
pub struct Exchange {
    frame_size: usize,
    buffers: Mutex<Snapshot>,
}

impl Exchange {
    pub fn new(frame_size: usize) -> Self {
        Self {
            frame_size,
            buffers: Mutex::new(Snapshot::zeroed(frame_size)),
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn bin_count(&self) -> usize {
        self.frame_size / 2
    }

    // Buffers are only ever whole-replaced, so a poisoned lock still guards
    // consistent data.
    fn lock(&self) -> MutexGuard<'_, Snapshot> {
        self.buffers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, expected: usize, actual: usize) -> Result<(), SessionError> {
        if expected == actual {
            Ok(())
        } else {
            Err(SessionError::FrameSizeMismatch { expected, actual })
        }
    }

    /// Producer side: replace both buffers
    pub fn write(&self, waveform: &[f32], spectrum: &[f32]) -> Result<(), SessionError> {
        self.write_smoothed(waveform, spectrum, SmoothingPolicy::PassThrough)
    }

    /// Producer side: replace the waveform and fold `spectrum` into the
    /// shared spectrum under `policy`.
    ///
    /// Smoothing starts from whatever the exchange currently holds, including
    /// spectra published by the playback path.
    pub fn write_smoothed(
        &self,
        waveform: &[f32],
        spectrum: &[f32],
        policy: SmoothingPolicy,
    ) -> Result<(), SessionError> {
        self.check(self.frame_size, waveform.len())?;
        self.check(self.bin_count(), spectrum.len())?;

        let mut buffers = self.lock();
        buffers.waveform.copy_from_slice(waveform);
        policy.apply(&mut buffers.spectrum, spectrum);
        Ok(())
    }

    /// Consumer side: consistent copy of both buffers
    pub fn read(&self) -> Snapshot {
        self.lock().clone()
    }

    /// Consumer side without allocating; `snapshot` must come from
    /// [`Snapshot::zeroed`] with this exchange's frame size
    pub fn read_into(&self, snapshot: &mut Snapshot) -> Result<(), SessionError> {
        self.check(self.frame_size, snapshot.waveform.len())?;
        self.check(self.bin_count(), snapshot.spectrum.len())?;

        let buffers = self.lock();
        snapshot.waveform.copy_from_slice(&buffers.waveform);
        snapshot.spectrum.copy_from_slice(&buffers.spectrum);
        Ok(())
    }

    /// Peak-decay the shared spectrum toward an externally computed one
    pub fn decay_toward(&self, external: &[f32], decay: f32) -> Result<(), SessionError> {
        self.check(self.bin_count(), external.len())?;

        peak_decay(&mut self.lock().spectrum, external, decay);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_starts_zeroed() {
        let exchange = Exchange::new(512);
        let snapshot = exchange.read();

        assert_eq!(snapshot.waveform, vec![0.0; 512]);
        assert_eq!(snapshot.spectrum, vec![0.0; 256]);
    }

    #[test]
    fn test_read_returns_latest_write() {
        let exchange = Exchange::new(8);

        exchange.write(&[0.1; 8], &[1.0; 4]).unwrap();
        exchange.write(&[0.2; 8], &[2.0; 4]).unwrap();

        let snapshot = exchange.read();
        assert_eq!(snapshot.waveform, vec![0.2; 8]);
        assert_eq!(snapshot.spectrum, vec![2.0; 4]);
    }

    #[test]
    fn test_mismatched_write_is_rejected_and_keeps_state() {
        let exchange = Exchange::new(8);
        exchange.write(&[0.5; 8], &[0.5; 4]).unwrap();

        assert!(matches!(
            exchange.write(&[0.0; 16], &[0.0; 8]),
            Err(SessionError::FrameSizeMismatch {
                expected: 8,
                actual: 16
            })
        ));
        assert!(exchange.write(&[0.0; 8], &[0.0; 3]).is_err());

        let snapshot = exchange.read();
        assert_eq!(snapshot.waveform, vec![0.5; 8]);
        assert_eq!(snapshot.spectrum, vec![0.5; 4]);
    }

    #[test]
    fn test_read_into_reuses_buffers() {
        let exchange = Exchange::new(8);
        exchange.write(&[0.3; 8], &[0.7; 4]).unwrap();

        let mut snapshot = Snapshot::zeroed(8);
        exchange.read_into(&mut snapshot).unwrap();
        assert_eq!(snapshot, exchange.read());

        let mut wrong = Snapshot::zeroed(16);
        assert!(exchange.read_into(&mut wrong).is_err());
    }

    #[test]
    fn test_decay_toward_external_spectrum() {
        let exchange = Exchange::new(4);
        exchange.write(&[0.0; 4], &[1.0, 0.0]).unwrap();

        exchange.decay_toward(&[0.5, 0.25], 0.5).unwrap();
        assert_eq!(exchange.read().spectrum, vec![0.5, 0.25]);

        exchange.decay_toward(&[0.0, 0.0], 0.5).unwrap();
        assert_eq!(exchange.read().spectrum, vec![0.25, 0.125]);

        assert!(exchange.decay_toward(&[0.0; 3], 0.5).is_err());
    }

    #[test]
    fn test_write_smoothed_decays_shared_spectrum() {
        let exchange = Exchange::new(4);
        exchange.write(&[0.0; 4], &[1.0, 0.2]).unwrap();

        exchange
            .write_smoothed(&[0.5; 4], &[0.1, 0.4], SmoothingPolicy::PeakDecay { decay: 0.5 })
            .unwrap();

        let snapshot = exchange.read();
        assert_eq!(snapshot.waveform, vec![0.5; 4]);
        assert_eq!(snapshot.spectrum, vec![0.5, 0.4]);
    }

    #[test]
    fn test_concurrent_writes_never_tear() {
        const FRAME: usize = 512;
        const WRITES: usize = 2000;

        let exchange = Arc::new(Exchange::new(FRAME));

        let writer = {
            let exchange = Arc::clone(&exchange);
            thread::spawn(move || {
                let mut waveform = vec![0.0; FRAME];
                let mut spectrum = vec![0.0; FRAME / 2];
                for k in 1..=WRITES {
                    waveform.fill(k as f32);
                    spectrum.fill(k as f32);
                    exchange.write(&waveform, &spectrum).unwrap();
                }
            })
        };

        let readers: Vec<_> = (0..3)
            .map(|_| {
                let exchange = Arc::clone(&exchange);
                thread::spawn(move || {
                    let mut snapshot = Snapshot::zeroed(FRAME);
                    let mut last = 0.0;
                    for _ in 0..WRITES {
                        exchange.read_into(&mut snapshot).unwrap();
                        assert_eq!(snapshot.spectrum.len(), FRAME / 2);

                        // Every sample of both buffers must come from one write
                        let tag = snapshot.waveform[0];
                        assert!(snapshot.waveform.iter().all(|s| *s == tag));
                        assert!(snapshot.spectrum.iter().all(|s| *s == tag));

                        // Writes are observed in order
                        assert!(tag >= last);
                        last = tag;
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }

        assert_eq!(exchange.read().spectrum, vec![WRITES as f32; FRAME / 2]);
    }
}
