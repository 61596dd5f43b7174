//! Soundshader - live audio spectrum feeding a fragment shader
//!
//! Audio frames are analyzed on the audio thread, published through a
//! shared exchange and sampled once per redraw by the renderer.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use glam::Vec2;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::PhysicalKey,
    window::{Window, WindowId},
};

use soundshader::audio::{
    AudioSystem, Mode, ParameterFeed, PlaybackDeck, Session, SmoothingPolicy, TemporalSmoother,
};
use soundshader::cli::Args;
use soundshader::controls::{self, Command};
use soundshader::params::AppConfig;
use soundshader::rendering::RenderSystem;

/// Main application state
struct App {
    config: AppConfig,

    // Shared with the audio thread
    session: Session,

    // Render-thread side of the feed
    smoother: TemporalSmoother,
    deck: PlaybackDeck,
    feed: ParameterFeed,
    external: Vec<f32>,

    // Window and rendering
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,
    // Input stream or clock thread, kept alive for the session
    _audio: Option<AudioSystem>,

    // Input and time tracking
    mouse: Vec2,
    last_tick: Instant,
}

impl App {
    fn new(config: AppConfig) -> Self {
        let audio_config = &config.audio;
        let session = Session::new(audio_config.frame_size, audio_config.initial_mode);
        let smoother = TemporalSmoother::new(audio_config.decay, audio_config.live_smoothing);
        let feed = ParameterFeed::new(Arc::clone(&session.exchange));

        let mut deck = PlaybackDeck::new(config.playback.clone(), audio_config.frame_size);
        if let Err(e) = deck.open_output() {
            log::warn!("Playback output unavailable ({}); advancing on the render clock", e);
        }
        if let Err(e) = deck.load_current() {
            log::warn!("{}", e);
        }
        if audio_config.initial_mode.is_playback() {
            deck.play();
        }

        Self {
            external: vec![0.0; audio_config.bin_count()],
            config,
            session,
            smoother,
            deck,
            feed,
            window: None,
            render_system: None,
            _audio: None,
            mouse: Vec2::ZERO,
            last_tick: Instant::now(),
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let render_config = &self.config.render;
        let window_attributes = Window::default_attributes()
            .with_title("Soundshader")
            .with_inner_size(winit::dpi::LogicalSize::new(
                render_config.window_width,
                render_config.window_height,
            ));
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("failed to create window")?,
        );

        let render_system = pollster::block_on(RenderSystem::new(
            Arc::clone(&window),
            render_config,
            self.config.audio.bin_count(),
        ))
        .context("failed to initialize renderer")?;

        let audio = AudioSystem::new(
            &self.config.audio,
            &self.session,
            render_config.window_width as f32,
        )
        .context("failed to start audio")?;

        log::info!("Mode: {}", self.session.mode.get());
        log::info!("Keys: L reload, T effect, P picture, M mode, A asset, Esc quit");

        self.window = Some(window);
        self.render_system = Some(render_system);
        self._audio = Some(audio);
        Ok(())
    }

    fn handle_command(&mut self, command: Command, event_loop: &ActiveEventLoop) {
        match command {
            Command::Quit => event_loop.exit(),
            Command::ReloadShader => {
                if let Some(render_system) = &mut self.render_system {
                    if let Err(e) = render_system.reload_shader() {
                        log::warn!("Shader reload failed: {}", e);
                    }
                }
            }
            Command::ToggleEffect => {
                if let Some(render_system) = &mut self.render_system {
                    let enabled = render_system.toggle_effect();
                    log::info!("Effect {}", if enabled { "on" } else { "off" });
                }
            }
            Command::NextPicture => {
                if let Some(render_system) = &mut self.render_system {
                    render_system.next_picture();
                }
            }
            Command::NextMode => {
                let mode = self.session.mode.advance();
                if mode.is_playback() {
                    self.deck.play();
                } else {
                    self.deck.stop();
                }
                log::info!("Mode: {}", mode);
            }
            Command::NextTrack => {
                match self.deck.next_asset() {
                    Ok(()) => {
                        if let Some(name) = self.deck.current_name() {
                            log::info!("Track {}: {}", self.deck.index(), name);
                        }
                    }
                    Err(e) => log::warn!("{}", e),
                }
                if self.session.mode.get().is_playback() {
                    self.deck.play();
                }
            }
        }
    }

    /// Render a single frame
    fn render_frame(&mut self) {
        let now = Instant::now();
        let elapsed = now - self.last_tick;
        self.last_tick = now;

        if !self.deck.has_output() {
            self.deck.advance(elapsed);
        }

        // Playback spectra are smoothed here, once per render tick
        if self.session.mode.get().is_playback() {
            match self.deck.spectrum(&mut self.external) {
                Ok(true) => {
                    if let SmoothingPolicy::PeakDecay { decay } =
                        self.smoother.policy(Mode::Playback)
                    {
                        if let Err(e) = self.session.exchange.decay_toward(&self.external, decay) {
                            log::error!("Playback smoothing fault: {}", e);
                            self.session.raise_fault();
                            return;
                        }
                    }
                }
                Ok(false) => {}
                Err(e) => {
                    log::error!("Playback analysis fault: {}", e);
                    self.session.raise_fault();
                    return;
                }
            }
        }

        let Some(render_system) = &mut self.render_system else {
            return;
        };
        let Some(window) = &self.window else {
            return;
        };

        let size = window.inner_size();
        let resolution = Vec2::new(size.width as f32, size.height as f32);
        let frame = match self.feed.sample(resolution, self.mouse) {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("Feed fault: {}", e);
                self.session.raise_fault();
                return;
            }
        };
        render_system.update(frame);

        match render_system.render() {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                render_system.reconfigure();
            }
            Err(e) => log::error!("Render error: {:?}", e),
        }
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.session.is_faulted() {
            event_loop.exit();
            return;
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        if let Err(e) = self.init(event_loop) {
            log::error!("{:#}", e);
            self.session.raise_fault();
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if let Some(command) = Command::from_key(code) {
                    self.handle_command(command, event_loop);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.mouse = Vec2::new(position.x as f32, position.y as f32);
                let scale_factor = self.window.as_ref().map_or(1.0, |w| w.scale_factor());
                self.session
                    .control
                    .set(controls::sine_control(position.x, scale_factor));
            }
            WindowEvent::Resized(size) => {
                if let Some(render_system) = &mut self.render_system {
                    render_system.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                self.render_frame();
            }
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();

    let mut config = match AppConfig::discover(args.config.as_deref()) {
        Some(path) => {
            log::info!("Config: {}", path.display());
            AppConfig::load(&path)
                .with_context(|| format!("failed to load config {}", path.display()))?
        }
        None => AppConfig::default(),
    };
    args.apply(&mut config);
    config.audio.validate().context("invalid audio configuration")?;

    let mut app = App::new(config);
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.run_app(&mut app)?;

    if app.session.is_faulted() {
        bail!("session ended on a fault");
    }
    Ok(())
}
