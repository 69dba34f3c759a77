//! Ringpulse - an audio-reactive ring visualizer
//!
//! Three rings of cloned model instances and a torus spin slowly while their
//! height and the bloom glow pulse to the spectrum of the playing track.

mod audio;
mod camera;
mod cli;
mod model;
mod params;
mod rendering;
mod scene;
mod visualizer;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use audio::AudioSystem;
use camera::OrbitCamera;
use cli::Args;
use glam::Vec3;
use params::*;
use rendering::RenderSystem;
use scene::SceneSystem;
use visualizer::{compute_visual_frame, progress_percent};

/// Main application state
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,

    // Scene and camera
    scene: SceneSystem,
    camera: OrbitCamera,

    // Audio (None until a track is loaded)
    audio: Option<AudioSystem>,
    track_loaded: bool,

    // Configuration
    render_config: RenderConfig,
    analyzer_config: AnalyzerConfig,
    mapping: VisualMapping,
    bloom: BloomSettings,
    model_path: PathBuf,
    startup_audio: Option<PathBuf>,
    volume: f32,

    // Mouse state for the orbit controls
    mouse_pressed: bool,
    last_cursor: Option<(f64, f64)>,
}

impl App {
    fn new(args: Args) -> Self {
        let render_config = RenderConfig::default();
        let camera = OrbitCamera::from_eye(
            Vec3::from_array(render_config.initial_eye),
            OrbitConstraints::default(),
        );

        Self {
            window: None,
            render_system: None,
            scene: SceneSystem::new(),
            camera,
            audio: None,
            track_loaded: false,
            render_config,
            analyzer_config: AnalyzerConfig::default(),
            mapping: VisualMapping::default(),
            bloom: BloomSettings::default(),
            volume: args.clamped_volume(),
            model_path: args.model,
            startup_audio: args.audio,
            mouse_pressed: false,
            last_cursor: None,
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

        // Create window
        let window_attributes = Window::default_attributes()
            .with_title("Ringpulse")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.render_config.window_width,
                self.render_config.window_height,
            ));

        let window = Arc::new(event_loop.create_window(window_attributes).unwrap());

        // Load the prototype and build the scene: three rings plus the torus
        let prototype = match model::load_prototype(&self.model_path) {
            Ok(prototype) => prototype,
            Err(e) => {
                log::error!("{}", e);
                event_loop.exit();
                return;
            }
        };

        for spec in default_rings() {
            self.scene.spawn_ring(&spec, prototype.base_color);
        }
        let torus_spec = TorusSpec::default();
        self.scene.spawn_torus(&torus_spec);

        // Initialize rendering system
        let render_system = match pollster::block_on(RenderSystem::new(
            Arc::clone(&window),
            &prototype.mesh,
            &scene::torus_mesh(&torus_spec),
            &self.scene.instance_data(),
            self.scene.prototype_instance_count(),
            self.bloom,
        )) {
            Ok(render_system) => render_system,
            Err(e) => {
                log::error!("Failed to initialize rendering: {}", e);
                event_loop.exit();
                return;
            }
        };

        log::info!(
            "Scene ready: {} ring instances, drop an audio file to start",
            self.scene.entries.len()
        );

        self.window = Some(window);
        self.render_system = Some(render_system);

        if let Some(path) = self.startup_audio.take() {
            self.load_track(&path);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::Resized(size) => {
                self.render_config.window_width = size.width;
                self.render_config.window_height = size.height;
                if let Some(render_system) = &mut self.render_system {
                    render_system.resize(size.width, size.height);
                }
            }
            WindowEvent::DroppedFile(path) => {
                self.load_track(&path);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.mouse_pressed = state == ElementState::Pressed;
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some((last_x, last_y)) = self.last_cursor {
                    if self.mouse_pressed {
                        self.camera.rotate(
                            (position.x - last_x) as f32,
                            (position.y - last_y) as f32,
                        );
                    }
                }
                self.last_cursor = Some((position.x, position.y));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 50.0,
                };
                self.camera.zoom(lines);
            }
            WindowEvent::RedrawRequested => {
                self.render_frame();
            }
            _ => {}
        }
    }
}

impl App {
    /// Load a track, tearing down any previous playback and analysis first.
    fn load_track(&mut self, path: &Path) {
        // Explicit teardown before the new pipeline starts: stops playback
        // and joins the previous analysis thread
        if let Some(previous) = self.audio.take() {
            drop(previous);
        }

        match AudioSystem::load(path, &self.analyzer_config, self.volume) {
            Ok(system) => {
                self.audio = Some(system);

                if !self.track_loaded {
                    self.track_loaded = true;
                    log::info!("First track loaded, visualization active");
                }
                if let Some(window) = &self.window {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string());
                    window.set_title(&format!("Ringpulse - {}", name));
                }
            }
            Err(e) => log::error!("Failed to load audio {}: {:#}", path.display(), e),
        }
    }

    /// Render a single frame
    fn render_frame(&mut self) {
        if self.render_system.is_none() {
            return;
        }

        // Audio-reactive update; the scene stays at rest until a track loads
        let mut bloom_update = None;
        let mut progress = -1.0;
        if let Some(audio) = &self.audio {
            let magnitudes = audio.magnitudes();
            let frame = compute_visual_frame(
                &self.scene.base_scales(),
                &magnitudes,
                self.scene.yaw,
                &self.mapping,
            );

            self.scene.apply_scales(&frame.scales);
            self.scene.yaw = frame.yaw;
            bloom_update = Some((frame.bloom_strength, frame.bloom_radius));
            progress = progress_percent(audio.position_s(), audio.duration_s());
        }

        let (view_proj, eye) = self.camera.view_proj(&self.render_config);
        let instances = self.scene.instance_data();

        let Some(render_system) = &mut self.render_system else {
            return;
        };

        if let Some((strength, radius)) = bloom_update {
            render_system.set_bloom(strength, radius);
            render_system.set_progress(progress);
        }
        render_system.update_scene_uniforms(view_proj, eye);
        render_system.update_instances(&instances);

        match render_system.render() {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let (width, height) = (
                    self.render_config.window_width,
                    self.render_config.window_height,
                );
                render_system.resize(width, height);
            }
            Err(e) => log::error!("Render error: {:?}", e),
        }
    }
}

fn main() {
    env_logger::init();

    let args = Args::parse();
    log::info!("Ringpulse - audio-reactive ring visualizer");

    let mut app = App::new(args);
    let event_loop = EventLoop::new().unwrap();
    let _ = event_loop.run_app(&mut app);
}
