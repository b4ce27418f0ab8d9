//! Cosmos - audio-reactive node field visualizer
//!
//! Frequency spectra become a drifting constellation: each frame the
//! loudest bands spawn glowing nodes that fade, chain together and follow
//! the music through classic, beat-locked and journey layouts.

use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use log::{debug, error, info};
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use cosmos::audio::{sources::SourceKind, AudioSystem};
use cosmos::camera::CameraSystem;
use cosmos::cli::Args;
use cosmos::params::{AnalyzerConfig, RenderConfig, SpawnConfig};
use cosmos::rendering::RenderSystem;
use cosmos::visualizer::Visualizer;

/// Main application state
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,

    // Audio and simulation
    audio: Option<AudioSystem>,
    visualizer: Visualizer,
    camera: CameraSystem,

    // Configuration
    source: SourceKind,
    analyzer_config: AnalyzerConfig,
    render_config: RenderConfig,

    // Time tracking
    start_time: Instant,
    frame_count: u64,
}

impl App {
    fn new(args: &Args) -> Self {
        Self {
            window: None,
            render_system: None,
            audio: None,
            visualizer: Visualizer::new(args.settings()),
            camera: CameraSystem::new(),
            source: args.source(),
            analyzer_config: AnalyzerConfig::default(),
            render_config: RenderConfig::default(),
            start_time: Instant::now(),
            frame_count: 0,
        }
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &winit::event_loop::ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        let window_attributes = Window::default_attributes()
            .with_title("Cosmos - Audio Visualizer")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.render_config.window_width,
                self.render_config.window_height,
            ));

        let window = Arc::new(event_loop.create_window(window_attributes).unwrap());

        let max_nodes = SpawnConfig::default().max_nodes;
        let render_system =
            pollster::block_on(RenderSystem::new(Arc::clone(&window), max_nodes)).unwrap();

        let audio = AudioSystem::new(self.source.clone(), self.analyzer_config.clone()).unwrap();

        info!("Cosmos is running (Esc quit, Space pause, S stop, M mode)");

        self.window = Some(window);
        self.render_system = Some(render_system);
        self.audio = Some(audio);
        self.start_time = Instant::now();
    }

    fn window_event(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(render_system) = &mut self.render_system {
                    render_system.resize(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        ..
                    },
                ..
            } => self.handle_key(event_loop, code),
            WindowEvent::RedrawRequested => {
                self.render_frame();
            }
            _ => {}
        }
    }
}

impl App {
    fn handle_key(&mut self, event_loop: &winit::event_loop::ActiveEventLoop, code: KeyCode) {
        match code {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::Space => {
                if let Some(audio) = &self.audio {
                    let paused = audio.toggle_pause();
                    info!("{}", if paused { "Paused" } else { "Playing" });
                }
            }
            KeyCode::KeyS => {
                if let Some(audio) = &self.audio {
                    audio.stop();
                }
                self.visualizer.reset();
                self.camera.reset();
                info!("Stopped");
            }
            KeyCode::KeyM => {
                let next = self.visualizer.settings.mode.next();
                self.visualizer.set_mode(next);
            }
            KeyCode::ArrowUp | KeyCode::ArrowDown => {
                let step = if code == KeyCode::ArrowUp { 0.25 } else { -0.25 };
                let lifetime = self.visualizer.settings.lifetime_s + step;
                self.visualizer.settings.set_lifetime(lifetime);
                info!("Lifetime: {:.2}s", self.visualizer.settings.lifetime_s);
            }
            KeyCode::ArrowRight | KeyCode::ArrowLeft => {
                let step = if code == KeyCode::ArrowRight { 0.1 } else { -0.1 };
                let rate = (self.visualizer.settings.spawn_rate + step).max(0.0);
                self.visualizer.settings.spawn_rate = rate;
                info!("Spawn rate: {:.1}", rate);
            }
            _ => {}
        }
    }

    /// Advance the visualizer by one frame and render it
    fn render_frame(&mut self) {
        let Some(ref mut render_system) = self.render_system else {
            return;
        };
        let Some(ref audio) = self.audio else {
            return;
        };

        let now_ms = self.start_time.elapsed().as_millis() as u64;
        let snapshot = audio.snapshot();
        let active = audio.is_active();

        let result = self.visualizer.tick(now_ms, &snapshot, active);

        let frame = self.camera.frame(
            &self.visualizer.settings,
            self.visualizer.journey.position(),
            &self.render_config,
        );

        render_system.update_scene(&self.visualizer.field, &frame);
        if let Err(e) = render_system.render() {
            error!("Render error: {:?}", e);
        }

        self.frame_count += 1;
        if self.frame_count % 60 == 0 {
            match result.dominant_hz {
                Some(hz) => debug!(
                    "nodes {} | bpm {} | amp {:.3} | dominant {:.0}Hz",
                    result.node_count, result.bpm, result.avg_amplitude, hz
                ),
                None => debug!(
                    "nodes {} | bpm {} | amp {:.3}",
                    result.node_count, result.bpm, result.avg_amplitude
                ),
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    info!("Cosmos audio visualizer starting");

    let mut app = App::new(&args);
    let event_loop = EventLoop::new()?;
    event_loop.run_app(&mut app)?;

    Ok(())
}
