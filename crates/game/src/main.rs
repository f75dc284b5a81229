//! Airship Illusion: pseudo-3D airship flight over a wraparound world.

mod config;
mod content;
mod events;
mod save;
mod scene;

use anyhow::Result;
use config::AirshipConfig;
use engine_core::FrameClock;
use input::InputState;
use renderer::Renderer;
use save::SaveData;
use scene::{Arrival, FlightScene, SceneSignal};
use std::path::PathBuf;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};
use world::WeatherKind;

const TITLE: &str = "Airship Illusion";

/// Window, renderer and the running flight scene.
pub struct GameState {
    renderer: Renderer,
    input: InputState,
    clock: FrameClock,
    scene: FlightScene,
    interior_map_id: u32,
    save_path: PathBuf,
    running: bool,
    /// Saved and disposed.
    finished: bool,
    /// Last message shown in the title.
    message: Option<String>,
    /// Weather the sky is heading toward.
    weather: WeatherKind,
}

impl GameState {
    async fn new(window: Arc<Window>, config: AirshipConfig) -> Result<Self> {
        let program = renderer::compile(&config.render)?;
        let renderer = Renderer::new(window, &program, config.render.effects.clone()).await?;

        let save_path = PathBuf::from(&config.save_path);
        let field = content::load_map(&config);
        let save = SaveData::load(&save_path);
        let scene = FlightScene::new(&config, field, save, Arrival::TakeOff);

        let mut clock = FrameClock::new();
        clock.set_tick_rate(config.tick_rate);

        let mut state = Self {
            renderer,
            input: InputState::new(),
            clock,
            scene,
            interior_map_id: config.transfer.interior_map_id,
            save_path,
            running: true,
            finished: false,
            message: None,
            weather: WeatherKind::Clear,
        };
        state.refresh_title();
        Ok(state)
    }

    /// Run every tick owed since the last frame.
    fn update(&mut self) {
        self.clock.advance();
        while self.clock.should_tick() {
            self.scene.tick(&self.input);
            self.input.begin_frame();
            self.handle_signals();
        }
    }

    fn handle_signals(&mut self) {
        let signals: Vec<SceneSignal> = self.scene.signals().drain().collect();
        if signals.is_empty() {
            return;
        }
        for signal in signals {
            match signal {
                SceneSignal::Transfer(request) => {
                    log::info!(
                        "Transfer to map {} at ({}, {}) facing {}",
                        request.map_id,
                        request.tile.x,
                        request.tile.y,
                        request.direction
                    );
                    self.save();
                    // no tile-map scene to hand over to: board again straight away
                    let arrival = if request.map_id == self.interior_map_id {
                        Arrival::FromInterior
                    } else {
                        Arrival::TakeOff
                    };
                    self.scene.reenter(arrival);
                }
                SceneSignal::Message(text) => {
                    log::info!("{}", text);
                    self.message = Some(text);
                }
                SceneSignal::LandmarkName(name) => {
                    if let Some(name) = name {
                        log::info!("Approaching {}", name);
                    }
                    self.message = None;
                }
                SceneSignal::WeatherChanged { from, to } => {
                    log::debug!("Sky {} -> {}", from, to);
                    self.weather = to;
                }
                SceneSignal::ViewModeChanged(_) => log::debug!("Projection now {:?}", self.scene.view_mode()),
                SceneSignal::LaunchReady => {}
            }
        }
        self.refresh_title();
    }

    fn refresh_title(&self) {
        let mut title = TITLE.to_string();
        if !self.scene.is_launch_ready() {
            title.push_str(" | Taking off");
        }
        if let Some(name) = self.scene.landmark_name() {
            title.push_str(&format!(" | {}", name));
        }
        if self.weather != WeatherKind::Clear {
            title.push_str(&format!(" | {}", self.weather));
        }
        if let Some(message) = &self.message {
            title.push_str(&format!(" | {}", message));
        }
        self.renderer.window.set_title(&title);
    }

    fn render(&mut self) -> Result<()> {
        let atlas = self.scene.atlas();
        self.renderer
            .sync_textures(self.scene.assets(), atlas.atlas(), atlas.revision());
        self.renderer
            .render_frame(&self.scene.frame_inputs(), self.scene.field_textures())
    }

    fn save(&self) {
        if let Err(e) = self.scene.save_data().save(&self.save_path) {
            log::warn!("Could not save flight: {:#}", e);
        }
    }

    /// Persist and tear down the scene. Safe to call more than once.
    fn shutdown(&mut self) {
        if self.finished {
            return;
        }
        self.save();
        let state = self.scene.controller().state();
        log::info!(
            "Leaving flight at ({:.0}, {:.0}) under {} skies",
            state.position.x,
            state.position.y,
            self.scene.weather_kind()
        );
        self.scene.dispose();
        self.running = false;
        self.finished = true;
    }
}

struct App {
    state: Option<GameState>,
}

impl App {
    fn new() -> Self {
        Self { state: None }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_none() {
            let config = AirshipConfig::load();
            let window_attrs = Window::default_attributes()
                .with_title(TITLE)
                .with_inner_size(winit::dpi::LogicalSize::new(config.window_width, config.window_height));

            let window = match event_loop.create_window(window_attrs) {
                Ok(w) => Arc::new(w),
                Err(e) => {
                    log::error!("Failed to create window: {}", e);
                    event_loop.exit();
                    return;
                }
            };

            let state = pollster::block_on(GameState::new(window.clone(), config));
            match state {
                Ok(s) => {
                    self.state = Some(s);
                    window.request_redraw();
                }
                Err(e) => {
                    log::error!("Failed to initialize flight scene: {:#}", e);
                    event_loop.exit();
                }
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Some(state) = &mut self.state {
            if state.handle_window_event(event) || !state.running {
                state.shutdown();
                event_loop.exit();
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &mut self.state {
            state.shutdown();
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("Airship Illusion");
    println!("  Arrows       - Fly / turn       Shift     - Boost");
    println!("  PageUp/Down  - Pitch            U         - Toggle top-down view");
    println!("  V            - Land             C         - Enter the interior");
    println!("  P            - Autopilot to the next landmark (Escape cancels)");

    log::info!("Starting Airship Illusion");

    let event_loop = EventLoop::new()?;
    // Poll so the fixed-step ticks keep running between input events.
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    event_loop.run_app(&mut app)?;
    Ok(())
}
