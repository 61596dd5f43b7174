//! Audio system driving the analysis pipeline from the input device.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use super::assembler::FrameAssembler;
use super::pipeline::AudioPipeline;
use super::source::FrameSource;
use super::Session;
use crate::error::SessionError;
use crate::params::AnalysisConfig;

/// Owns whatever is invoking the pipeline at audio cadence
pub struct AudioSystem {
    /// Audio input stream (kept alive)
    _stream: Option<cpal::Stream>,

    /// Fallback clock when no input device is available
    clock: Option<thread::JoinHandle<()>>,
    clock_running: Arc<AtomicBool>,
}

impl AudioSystem {
    /// Create and start audio system with specified configuration
    pub fn new(
        config: &AnalysisConfig,
        session: &Session,
        sine_width: f32,
    ) -> Result<Self, SessionError> {
        config.validate()?;

        log::info!(
            "Analysis: {} samples @ {}Hz, {} bins of {:.1}Hz up to {:.0}Hz, {:.1}ms buffering",
            config.frame_size,
            config.sample_rate_hz,
            config.bin_count(),
            config.bin_to_hz(1),
            config.bin_to_hz(config.bin_count() - 1),
            config.latency().as_secs_f64() * 1000.0
        );

        let pipeline = AudioPipeline::new(config, session.clone(), FrameSource::new(sine_width));
        let clock_running = Arc::new(AtomicBool::new(false));

        let host = cpal::default_host();
        let input = match host.default_input_device() {
            Some(device) => select_input_config(device.supported_input_configs(), config)
                .map(|c| (device, c)),
            None => None,
        };

        let Some((device, stream_config)) = input else {
            log::warn!("No usable audio input device; synthetic modes only, microphone is silent");
            let clock = spawn_clock_thread(
                config.clone(),
                pipeline,
                session.clone(),
                Arc::clone(&clock_running),
            );
            return Ok(Self {
                _stream: None,
                clock: Some(clock),
                clock_running,
            });
        };

        log::info!(
            "Audio input: {} @ {}Hz, {} channel(s)",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            stream_config.sample_rate.0,
            stream_config.channels
        );

        let stream = build_input_stream(&device, &stream_config, config, pipeline, session)?;
        stream.play()?;

        Ok(Self {
            _stream: Some(stream),
            clock: None,
            clock_running,
        })
    }
}

impl Drop for AudioSystem {
    fn drop(&mut self) {
        self.clock_running.store(false, Ordering::Relaxed);
        if let Some(clock) = self.clock.take() {
            let _ = clock.join();
        }
    }
}

/// Pick an f32 input config at the session sample rate, preferring mono.
///
/// Returns `None` when the device cannot run at the session rate or its
/// configs cannot be listed; the rate is never renegotiated.
fn select_input_config<I>(
    supported: Result<I, cpal::SupportedStreamConfigsError>,
    config: &AnalysisConfig,
) -> Option<cpal::StreamConfig>
where
    I: Iterator<Item = cpal::SupportedStreamConfigRange>,
{
    let supported = match supported {
        Ok(supported) => supported,
        Err(e) => {
            log::warn!("Failed to list audio input configs: {}", e);
            return None;
        }
    };

    let rate = cpal::SampleRate(config.sample_rate_hz);
    let range = supported
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .filter(|c| c.min_sample_rate() <= rate && rate <= c.max_sample_rate())
        .min_by_key(|c| c.channels())?;

    let buffer_size = match range.buffer_size() {
        cpal::SupportedBufferSize::Range { min, max }
            if (*min..=*max).contains(&(config.frame_size as u32)) =>
        {
            cpal::BufferSize::Fixed(config.frame_size as u32)
        }
        _ => cpal::BufferSize::Default,
    };
    Some(cpal::StreamConfig {
        channels: range.channels(),
        sample_rate: rate,
        buffer_size,
    })
}

/// Build the input stream; the callback re-blocks device buffers into frames
/// and runs the pipeline on each
fn build_input_stream(
    device: &cpal::Device,
    stream_config: &cpal::StreamConfig,
    config: &AnalysisConfig,
    mut pipeline: AudioPipeline,
    session: &Session,
) -> Result<cpal::Stream, SessionError> {
    let channels = stream_config.channels.max(1) as usize;
    let mut assembler = FrameAssembler::new(config.frame_size, config.buffer_count);
    let mut mono: Vec<f32> = Vec::with_capacity(config.frame_size * config.buffer_count);
    let session = session.clone();

    let stream = device.build_input_stream(
        stream_config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            if session.is_faulted() {
                return;
            }

            // Analysis is mono: keep the first channel only
            let samples = if channels == 1 {
                data
            } else {
                mono.clear();
                mono.extend(data.iter().step_by(channels).copied());
                &mono[..]
            };

            assembler.push(samples, |frame| {
                if let Err(e) = pipeline.process(frame) {
                    log::error!("Audio pipeline fault: {}", e);
                    session.raise_fault();
                }
            });
        },
        |err| log::error!("Audio input stream error: {}", err),
        None,
    )?;

    Ok(stream)
}

/// Spawn a thread invoking the pipeline with silence at frame cadence
fn spawn_clock_thread(
    config: AnalysisConfig,
    mut pipeline: AudioPipeline,
    session: Session,
    running: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    running.store(true, Ordering::Relaxed);

    thread::spawn(move || {
        let silence = vec![0.0; config.frame_size];
        let interval = config.frame_duration();

        while running.load(Ordering::Relaxed) && !session.is_faulted() {
            thread::sleep(interval);

            if let Err(e) = pipeline.process(&silence) {
                log::error!("Audio pipeline fault: {}", e);
                session.raise_fault();
            }
        }
    })
}
