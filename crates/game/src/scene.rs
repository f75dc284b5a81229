//! The flight scene: ticks the controller and overlays in order and turns their events into
//! signals for the host.

use crate::config::{AirshipConfig, LaunchConfig};
use crate::content::{request_assets, seed_assets, FieldMap};
use crate::save::SaveData;
use engine_core::{heading_from_facing, EventQueue, FrameContext, LaunchSequence, SceneModule, UVec2, WorldGeometry};
use flight::{FlightController, FlightEvent, LandingOutcome, TransferGate, TransferRequest};
use input::InputState;
use renderer::{AssetKey, AssetLoader, AtlasBuilder, FieldTextures, FrameInputs, SceneAssets, ViewMode, ViewModeBlend};
use world::{collect, LandmarkEvent, LandmarkOverlay, MapData, VisitedLookup, VisitedPlaces, WeatherEvent, WeatherKind, WeatherOverlay};

/// What the host should react to after a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneSignal {
    /// Leave the flight scene for a tile map.
    Transfer(TransferRequest),
    /// Text to show the player.
    Message(String),
    LandmarkName(Option<String>),
    WeatherChanged { from: WeatherKind, to: WeatherKind },
    ViewModeChanged(ViewMode),
    LaunchReady,
}

/// How the airship enters the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    /// Full take-off sequence.
    TakeOff,
    /// Back from the interior: no take-off.
    FromInterior,
}

pub struct FlightScene {
    map: MapData,
    geometry: WorldGeometry,
    launch_config: LaunchConfig,
    controller: FlightController,
    landmarks: LandmarkOverlay,
    weather: WeatherOverlay,
    gate: TransferGate,
    launch: LaunchSequence,
    view: ViewModeBlend,
    assets: SceneAssets,
    loader: AssetLoader,
    atlas: AtlasBuilder,
    /// Sheets the atlas draws from.
    atlas_sheets: Vec<AssetKey>,
    visited: VisitedPlaces,
    tick: u64,
    /// Next landmark the autopilot key flies to.
    autopilot_cursor: usize,
    disposed: bool,
    signals: EventQueue<SceneSignal>,
}

impl FlightScene {
    pub fn new(config: &AirshipConfig, field: FieldMap, save: Option<SaveData>, arrival: Arrival) -> Self {
        let assets = seed_assets(config, &field);
        let FieldMap { map, .. } = field;
        let geometry = map.geometry(&config.world);

        let (controller, view, visited) = match save {
            Some(save) => (
                FlightController::resume(config.flight.clone(), geometry, save.flight),
                save.view,
                save.visited,
            ),
            None => (
                Self::departure(config, geometry),
                config.start_view,
                VisitedPlaces::new(),
            ),
        };

        // without any record every landmark counts as visited
        let lookup: Option<Box<dyn VisitedLookup>> = if visited.is_empty() {
            None
        } else {
            Some(Box::new(visited.clone()))
        };
        let landmarks = LandmarkOverlay::new(
            collect(&map, &geometry, &config.landmarks),
            config.landmarks.clone(),
            geometry,
            lookup,
        );
        let weather = WeatherOverlay::new(map.region_grid(), &config.weather, geometry);
        let atlas = AtlasBuilder::new(landmarks.landmarks(), map.tileset_names.clone());

        let mut loader = AssetLoader::spawn();
        let sheets = atlas.required_sheets();
        request_assets(&mut loader, config, &assets, &sheets);
        let atlas_sheets = sheets.into_iter().map(AssetKey::Sheet).collect();

        let launch = match arrival {
            Arrival::TakeOff => config.launch.sequence(),
            Arrival::FromInterior => LaunchSequence::ready(),
        };

        let mut scene = Self {
            map,
            geometry,
            launch_config: config.launch.clone(),
            controller,
            landmarks,
            weather,
            gate: TransferGate::new(config.transfer.clone(), config.return_map_id, config.return_direction),
            launch,
            view: ViewModeBlend::new(view),
            assets,
            loader,
            atlas,
            atlas_sheets,
            visited,
            tick: 0,
            autopilot_cursor: 0,
            disposed: false,
            signals: EventQueue::new(),
        };
        scene.activate();
        scene
    }

    /// Fresh controller seeded from the configured departure tile and facing.
    fn departure(config: &AirshipConfig, geometry: WorldGeometry) -> FlightController {
        let mut controller = FlightController::new(config.flight.clone(), geometry);
        if let Some([x, y]) = config.start_tile {
            controller.set_position(geometry.tile_to_world(UVec2::new(x, y)));
        }
        controller.set_heading(heading_from_facing(config.start_facing));
        controller
    }

        fn activate(&mut self) {
        let ctx = FrameContext {
            tick: self.tick,
            transform: self.controller.state(),
        };
        self.controller.activate();
        self.landmarks.activate(&ctx);
        self.weather.activate(&ctx);
        log::info!(
            "Flight scene ready: {}x{} tiles, {} landmarks",
            self.geometry.map_width,
            self.geometry.map_height,
            self.landmarks.landmarks().len()
        );
    }

    /// One frame: launch phase, controller, overlays, view blend, then asset work.
    pub fn tick(&mut self, input: &InputState) {
        if self.disposed {
            return;
        }
        self.tick += 1;

        if self.launch.advance() {
            log::info!("Launch complete");
            self.signals.push(SceneSignal::LaunchReady);
        }

        let mut intent = input.control_intent();
        if !self.launch.is_ready() {
            intent.landing_requested = false;
            intent.enter_interior_requested = false;
        }
        if input.is_autopilot_pressed() && self.launch.is_ready() {
            self.autopilot_to_next_landmark();
        }

        let transform = self.controller.tick(&intent);
        let ctx = FrameContext {
            tick: self.tick,
            transform,
        };
        self.landmarks.tick(&ctx);
        self.weather.tick(&ctx);

        if input.is_view_toggle_pressed() {
            let mode = self.view.toggle();
            log::info!("View mode -> {:?}", mode);
            self.signals.push(SceneSignal::ViewModeChanged(mode));
        }
        self.view.tick();

        self.handle_flight_events();
        self.forward_overlay_events();
        self.update_assets();
    }

    fn handle_flight_events(&mut self) {
        let events: Vec<FlightEvent> = self.controller.events().drain().collect();
        for event in events {
            match event {
                FlightEvent::LandingRequested { position } => {
                    let tile = self.geometry.world_to_tile(position);
                    let land_ok = self.map.is_airship_land_ok(tile.x as i64, tile.y as i64);
                    let outcome = self.gate.request_landing(tile, land_ok);
                    self.push_outcome(outcome);
                }
                FlightEvent::InteriorRequested { .. } => {
                    let outcome = self.gate.request_interior();
                    self.push_outcome(outcome);
                }
                FlightEvent::AutopilotCompleted { target, .. } => {
                    log::info!("Arrived at ({:.0}, {:.0})", target.x, target.y);
                }
                FlightEvent::MovementStateChanged { from, to } => {
                    log::debug!("Movement {:?} -> {:?}", from, to);
                }
                _ => {}
            }
        }
    }

    fn push_outcome(&mut self, outcome: LandingOutcome) {
        match outcome {
            LandingOutcome::Transfer(request) => self.signals.push(SceneSignal::Transfer(request)),
            LandingOutcome::Refused(message) => self.signals.push(SceneSignal::Message(message)),
            LandingOutcome::Ignored => log::debug!("Transfer already in flight"),
        }
    }

    fn forward_overlay_events(&mut self) {
        for LandmarkEvent::NameChanged(name) in self.landmarks.events().drain() {
            self.signals.push(SceneSignal::LandmarkName(name));
        }
        for WeatherEvent::Changed { from, to, .. } in self.weather.events().drain() {
            self.signals.push(SceneSignal::WeatherChanged { from, to });
        }
    }

    /// Resolve finished loads, then draw the next atlas batch once every sheet it reads has arrived.
    fn update_assets(&mut self) {
        let results = self.loader.poll();
        if !results.is_empty() {
            self.assets.resolve(results);
        }
        let sheets_ready = self.atlas_sheets.iter().all(|key| self.loader.is_ready(key));
        if sheets_ready && !self.atlas.is_complete() {
            self.atlas.step(&self.assets);
            let (done, total) = self.atlas.progress();
            log::debug!("Landmark atlas {}/{}", done, total);
        }
    }

    fn autopilot_to_next_landmark(&mut self) {
        let landmarks = self.landmarks.landmarks();
        if landmarks.is_empty() {
            return;
        }
        let landmark = &landmarks[self.autopilot_cursor % landmarks.len()];
        log::info!("Autopilot to {}", landmark.display_name);
        let tile = landmark.tile;
        self.autopilot_cursor += 1;
        self.start_autopilot(tile);
    }

    /// Fly to a map tile.
    pub fn start_autopilot(&mut self, tile: UVec2) {
        self.controller.start_autopilot_to_tile(tile);
    }

    /// Re-enter after a transfer. Clears the transfer guards and restarts or skips the launch.
    pub fn reenter(&mut self, arrival: Arrival) {
        self.gate.reset();
        self.controller.cancel_autopilot();
        self.launch = match arrival {
            Arrival::TakeOff => self.launch_config.sequence(),
            Arrival::FromInterior => LaunchSequence::ready(),
        };
        log::info!("Re-entered flight scene ({:?})", arrival);
    }

    /// Idempotent teardown.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.controller.cancel_autopilot();
        self.gate.reset();
        self.landmarks.dispose();
        self.weather.dispose();
        self.disposed = true;
    }

    pub fn signals(&mut self) -> &mut EventQueue<SceneSignal> {
        &mut self.signals
    }

    pub fn controller(&self) -> &FlightController {
        &self.controller
    }

    pub fn is_launch_ready(&self) -> bool {
        self.launch.is_ready()
    }

    pub fn weather_kind(&self) -> WeatherKind {
        self.weather.current_kind()
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view.target()
    }

    pub fn landmark_name(&self) -> Option<&str> {
        self.landmarks.current_name()
    }

    pub fn assets(&self) -> &SceneAssets {
        &self.assets
    }

    pub fn atlas(&self) -> &AtlasBuilder {
        &self.atlas
    }

    pub fn save_data(&self) -> SaveData {
        SaveData {
            flight: self.controller.snapshot(),
            view: self.view.target(),
            visited: self.visited.clone(),
        }
    }

    /// Renderer inputs for the current tick.
    pub fn frame_inputs(&self) -> FrameInputs<'_> {
        let weather = self.weather.state();
        let effect_kind = weather.effect_kind();
        let effect = (effect_kind != WeatherKind::Clear).then(|| (effect_kind, weather.intensity()));
        FrameInputs {
            transform: self.controller.state(),
            time: self.tick as f32,
            world_size: self.geometry.world_size(),
            map_size: self.geometry.map_size().as_vec2(),
            view_blend: self.view.factor(),
            sky_weather: weather.target(),
            effect,
            tint: self.launch.screen_tint(),
            landmarks: &self.landmarks.last_placement().visible,
        }
    }

    pub fn field_textures(&self) -> FieldTextures<'_> {
        FieldTextures {
            world: self.assets.world(),
            water: self.assets.water(),
            height: self.assets.height(),
            atlas: self.atlas.atlas(),
        }
    }
}

impl Drop for FlightScene {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use input::{ElementState, KeyCode};
    use world::{EventImage, EventPage, MapEvent, LAYER_COUNT, REGION_LAYER};

    const SIZE: u32 = 20;

    /// 20x20 map of tile 1 with one landmark next to the start position.
    fn test_map(tile_flag: u32, region: u32) -> FieldMap {
        let layer = (SIZE * SIZE) as usize;
        let mut data = vec![0u32; layer * LAYER_COUNT];
        data[..layer].fill(1);
        data[REGION_LAYER * layer..].fill(region);
        let map = MapData {
            width: SIZE,
            height: SIZE,
            data,
            events: vec![
                None,
                Some(MapEvent {
                    id: 1,
                    name: "EV001".to_string(),
                    note: "<airshipVisible: true>\n<landmarkName: Watchtower>".to_string(),
                    x: 10,
                    y: 10,
                    pages: vec![EventPage {
                        image: Some(EventImage::default()),
                    }],
                }),
            ],
            tileset_flags: vec![0, tile_flag],
            tileset_names: Vec::new(),
        };
        FieldMap { map, generated: false }
    }

    fn test_config() -> AirshipConfig {
        let mut config = AirshipConfig::default();
        config.worldgen.image_size = 8;
        config.launch.duration = 2;
        config
    }

    fn scene(tile_flag: u32, region: u32) -> FlightScene {
        FlightScene::new(&test_config(), test_map(tile_flag, region), None, Arrival::TakeOff)
    }

    fn press(scene: &mut FlightScene, key: KeyCode) -> Vec<SceneSignal> {
        let mut input = InputState::new();
        input.process_keyboard(key, ElementState::Pressed);
        scene.tick(&input);
        scene.signals().drain().collect()
    }

    fn idle(scene: &mut FlightScene, ticks: usize) -> Vec<SceneSignal> {
        let input = InputState::new();
        for _ in 0..ticks {
            scene.tick(&input);
        }
        scene.signals().drain().collect()
    }

    fn transfers(signals: &[SceneSignal]) -> Vec<TransferRequest> {
        signals
            .iter()
            .filter_map(|s| match s {
                SceneSignal::Transfer(t) => Some(*t),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn landing_waits_for_launch() {
        let mut scene = scene(0, 0);
        assert!(transfers(&press(&mut scene, KeyCode::KeyV)).is_empty(), "still launching");

        let signals = idle(&mut scene, 3);
        assert!(signals.contains(&SceneSignal::LaunchReady));
        assert!(scene.is_launch_ready());

        let landed = transfers(&press(&mut scene, KeyCode::KeyV));
        assert_eq!(landed.len(), 1);
        assert_eq!(landed[0].map_id, 2);
        assert_eq!(landed[0].tile, UVec2::new(10, 10));
    }

    #[test]
    fn white_launch_tints_until_ready() {
        let mut config = test_config();
        config.launch.effect = engine_core::LaunchEffect::White;
        config.launch.duration = 4;
        let mut scene = FlightScene::new(&config, test_map(0, 0), None, Arrival::TakeOff);
        idle(&mut scene, 1);
        assert_eq!(scene.frame_inputs().tint, [1.0, 1.0, 1.0, 1.0]);
        idle(&mut scene, 2);
        assert!((scene.frame_inputs().tint[3] - 0.5).abs() < 1e-6);
        idle(&mut scene, 3);
        assert!(scene.is_launch_ready());
        assert_eq!(scene.frame_inputs().tint[3], 0.0);

        scene.reenter(Arrival::FromInterior);
        assert_eq!(scene.frame_inputs().tint[3], 0.0);
    }

    #[test]
    fn refused_landing_shows_message() {
        let mut scene = scene(0x800, 0);
        idle(&mut scene, 4);
        for _ in 0..2 {
            let signals = press(&mut scene, KeyCode::KeyV);
            assert!(signals.contains(&SceneSignal::Message("Cannot land here!".to_string())));
            assert!(transfers(&signals).is_empty());
        }
    }

    #[test]
    fn interior_transfer_is_guarded_until_reentry() {
        let mut scene = scene(0, 0);
        idle(&mut scene, 4);
        let first = transfers(&press(&mut scene, KeyCode::KeyC));
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].map_id, 1);
        assert_eq!(first[0].tile, UVec2::new(10, 10));
        assert_eq!(first[0].direction, 2);
        assert!(transfers(&press(&mut scene, KeyCode::KeyC)).is_empty(), "duplicate request");

        scene.reenter(Arrival::FromInterior);
        assert!(scene.is_launch_ready(), "no take-off after the interior");
        assert_eq!(transfers(&press(&mut scene, KeyCode::KeyC)).len(), 1);
    }

    #[test]
    fn view_toggle_blends_to_top_down() {
        let mut scene = scene(0, 0);
        let signals = press(&mut scene, KeyCode::KeyU);
        assert!(signals.contains(&SceneSignal::ViewModeChanged(ViewMode::TopDown)));
        let mid = scene.frame_inputs().view_blend;
        assert!(mid > 0.0 && mid < 1.0, "blend {mid}");
        idle(&mut scene, 12);
        assert_eq!(scene.frame_inputs().view_blend, 1.0);
        assert_eq!(scene.view_mode(), ViewMode::TopDown);
    }

    #[test]
    fn region_weather_ramps_in() {
        // region 2 is rain
        let mut scene = scene(0, 2);
        let signals = idle(&mut scene, 1);
        assert!(signals.contains(&SceneSignal::WeatherChanged {
            from: WeatherKind::Clear,
            to: WeatherKind::Rain
        }));
        let frame = scene.frame_inputs();
        assert_eq!(frame.sky_weather, WeatherKind::Rain);
        let (kind, intensity) = frame.effect.expect("rain effect");
        assert_eq!(kind, WeatherKind::Rain);
        assert!(intensity > 0.0 && intensity < 1.0);

        idle(&mut scene, 29);
        assert_eq!(scene.weather_kind(), WeatherKind::Rain);
        assert_eq!(scene.frame_inputs().effect, Some((WeatherKind::Rain, 1.0)));
    }

    #[test]
    fn nearby_landmark_name_is_disclosed() {
        let mut scene = scene(0, 0);
        let signals = idle(&mut scene, 1);
        assert!(signals.contains(&SceneSignal::LandmarkName(Some("Watchtower".to_string()))));
        assert_eq!(scene.landmark_name(), Some("Watchtower"));
        assert_eq!(scene.frame_inputs().landmarks.len(), 1);
    }

    #[test]
    fn autopilot_key_flies_to_landmark() {
        let mut scene = scene(0, 0);
        press(&mut scene, KeyCode::KeyP);
        assert!(!scene.controller().is_autopiloting(), "ignored while launching");
        idle(&mut scene, 4);
        press(&mut scene, KeyCode::KeyP);
        assert!(scene.controller().is_autopiloting());
        press(&mut scene, KeyCode::Escape);
        assert!(!scene.controller().is_autopiloting());
    }

    #[test]
    fn dispose_is_idempotent_and_stops_ticking() {
        let mut scene = scene(0, 0);
        scene.dispose();
        scene.dispose();
        let before = scene.controller().state();
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::ArrowUp, ElementState::Pressed);
        scene.tick(&input);
        assert_eq!(scene.controller().state(), before);
    }

    #[test]
    fn atlas_does_not_wait_on_unrelated_images() {
        let mut config = test_config();
        config.render.world_map_image = Some("/no/such/world.png".to_string());
        let mut scene = FlightScene::new(&config, test_map(0, 0), None, Arrival::TakeOff);
        idle(&mut scene, 1);
        assert_eq!(scene.atlas().progress(), (1, 1));
    }

    #[test]
    fn fresh_flight_departs_with_party_facing() {
        let mut config = test_config();
        config.start_facing = 4;
        config.start_tile = Some([4, 6]);
        let scene = FlightScene::new(&config, test_map(0, 0), None, Arrival::TakeOff);
        let state = scene.controller().state();
        assert!((state.heading - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert!(state.position.abs_diff_eq(engine_core::Vec2::new(2250.0, 3250.0), 1e-2));

        let saved = scene.save_data();
        config.start_facing = 8;
        let resumed = FlightScene::new(&config, test_map(0, 0), Some(saved), Arrival::TakeOff);
        assert_eq!(resumed.controller().state().heading, state.heading, "saved heading wins");
    }

    #[test]
    fn save_data_round_trips_through_resume() {
        let mut scene = scene(0, 0);
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::ArrowUp, ElementState::Pressed);
        for _ in 0..10 {
            scene.tick(&input);
        }
        let save = scene.save_data();
        let resumed = FlightScene::new(&test_config(), test_map(0, 0), Some(save.clone()), Arrival::TakeOff);
        assert_eq!(resumed.controller().snapshot(), save.flight);
    }
}
