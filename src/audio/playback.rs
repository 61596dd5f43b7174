//! Playback deck: decoded assets, looping output, and their live spectrum.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::fft::SpectralAnalyzer;
use crate::error::SessionError;
use crate::params::PlaybackConfig;

/// Decoded mono audio asset
#[derive(Debug, Clone)]
pub struct Track {
    pub name: String,
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Track {
    pub fn from_samples(name: impl Into<String>, samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            name: name.into(),
            samples,
            sample_rate,
        }
    }

    /// Decode a WAV file, downmixing to mono
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let decode_err = |source| SessionError::Decode {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = hound::WavReader::open(path).map_err(decode_err)?;
        let spec = reader.spec();

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(decode_err)?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<Result<_, _>>()
                    .map_err(decode_err)?
            }
        };

        let channels = spec.channels.max(1) as usize;
        let samples: Vec<f32> = if channels == 1 {
            interleaved
        } else {
            interleaved
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect()
        };

        if samples.is_empty() {
            return Err(SessionError::EmptyAsset(path.to_path_buf()));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let track = Self::from_samples(name, samples, spec.sample_rate);
        log::info!(
            "Decoded {}: {} samples, {}Hz, {:.1}s",
            track.name,
            track.samples.len(),
            track.sample_rate,
            track.duration().as_secs_f32()
        );
        Ok(track)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// Play state shared with the output callback
#[derive(Debug, Default)]
struct Transport {
    track: Option<Track>,
    /// Read position in track samples (fractional when resampling)
    cursor: f64,
    playing: bool,
}

impl Transport {
    fn audible(&self) -> Option<&Track> {
        self.track
            .as_ref()
            .filter(|track| self.playing && !track.samples.is_empty())
    }

    fn advance(&mut self, samples: f64) {
        if let Some(track) = &self.track {
            let len = track.samples.len() as f64;
            self.cursor = (self.cursor + samples).rem_euclid(len);
        }
    }

    /// Fill an interleaved output buffer, looping at the end of the track
    fn render(&mut self, out: &mut [f32], channels: usize, output_rate: u32) {
        let Some(track) = self.audible() else {
            out.fill(0.0);
            return;
        };

        let step = track.sample_rate as f64 / output_rate as f64;
        let len = track.samples.len() as f64;
        let mut cursor = self.cursor;

        for frame in out.chunks_mut(channels.max(1)) {
            frame.fill(track.samples[cursor as usize]);
            // A step can span the whole track several times over
            cursor = (cursor + step).rem_euclid(len);
        }
        self.cursor = cursor;
    }

    /// Copy the samples leading up to the play position into `out`
    fn window(&self, out: &mut [f32]) -> bool {
        let Some(track) = self.audible() else {
            return false;
        };

        let len = track.samples.len() as isize;
        let start = (self.cursor as isize - out.len() as isize).rem_euclid(len);
        for (i, sample) in out.iter_mut().enumerate() {
            *sample = track.samples[(start + i as isize).rem_euclid(len) as usize];
        }
        true
    }
}

/// Ordered asset list with one loaded, looping track.
///
/// The spectrum of the playing window is computed on the render thread and
/// is the external spectrum the playback smoothing decays toward.
pub struct PlaybackDeck {
    config: PlaybackConfig,
    index: usize,
    transport: Arc<Mutex<Transport>>,
    analyzer: SpectralAnalyzer,
    window: Vec<f32>,
    output: Option<cpal::Stream>,
}

impl PlaybackDeck {
    pub fn new(config: PlaybackConfig, frame_size: usize) -> Self {
        Self {
            config,
            index: 0,
            transport: Arc::new(Mutex::new(Transport::default())),
            analyzer: SpectralAnalyzer::new(frame_size),
            window: vec![0.0; frame_size],
            output: None,
        }
    }

    fn transport(&self) -> std::sync::MutexGuard<'_, Transport> {
        self.transport.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start the looping output stream on the default output device
    pub fn open_output(&mut self) -> Result<(), SessionError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(SessionError::NoDevice("output"))?;

        let config: cpal::StreamConfig = device.default_output_config()?.into();
        let channels = config.channels as usize;
        let rate = config.sample_rate.0;

        log::info!(
            "Playback output: {} @ {}Hz, {} channels",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            rate,
            channels
        );

        let transport = Arc::clone(&self.transport);
        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                // Never wait on the render thread; a contended buffer plays silence
                match transport.try_lock() {
                    Ok(mut transport) => transport.render(data, channels, rate),
                    Err(_) => data.fill(0.0),
                }
            },
            |err| log::error!("Playback stream error: {}", err),
            None,
        )?;
        stream.play()?;

        self.output = Some(stream);
        Ok(())
    }

    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current_name(&self) -> Option<String> {
        self.transport().track.as_ref().map(|t| t.name.clone())
    }

    /// Decode the selected asset, replacing the loaded track (stopped, rewound).
    ///
    /// On failure the deck is left without a track, so no external spectrum
    /// is produced until a later load succeeds.
    pub fn load_current(&mut self) -> Result<(), SessionError> {
        let Some(path) = self.config.asset_path(self.index) else {
            self.load_track(None);
            return Err(SessionError::InvalidConfig(
                "playback asset list is empty".to_string(),
            ));
        };

        log::info!("Loading audio {}", path.display());
        match Track::load(&path) {
            Ok(track) => {
                self.load_track(Some(track));
                Ok(())
            }
            Err(e) => {
                self.load_track(None);
                Err(e)
            }
        }
    }

    /// Select the following asset (wrapping) and load it
    pub fn next_asset(&mut self) -> Result<(), SessionError> {
        self.index = self.config.next_index(self.index);
        self.load_current()
    }

    pub fn load_track(&mut self, track: Option<Track>) {
        let previous = {
            let mut transport = self.transport();
            transport.cursor = 0.0;
            transport.playing = false;
            std::mem::replace(&mut transport.track, track)
        };
        // Free the old samples outside the lock
        drop(previous);
    }

    pub fn play(&self) {
        self.transport().playing = true;
    }

    pub fn stop(&self) {
        self.transport().playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.transport().playing
    }

    /// Move the play position by wall-clock time; used when no output
    /// stream is driving it
    pub fn advance(&self, elapsed: Duration) {
        let mut transport = self.transport();
        if !transport.playing {
            return;
        }
        let rate = match &transport.track {
            Some(track) => track.sample_rate,
            None => return,
        };
        transport.advance(elapsed.as_secs_f64() * rate as f64);
    }

    /// Magnitude spectrum of the window ending at the play position.
    ///
    /// Returns `Ok(false)` and leaves `out` untouched when nothing is playing.
    pub fn spectrum(&mut self, out: &mut [f32]) -> Result<bool, SessionError> {
        // Copy under the lock, analyze outside it
        let copied = self
            .transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .window(&mut self.window);
        if !copied {
            return Ok(false);
        }
        self.analyzer.analyze(&self.window, out)?;
        Ok(true)
    }
}
