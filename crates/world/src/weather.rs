//! Region-driven weather.
//!
//! The weather under the airship comes from the region layer of the tile map. A change ramps the
//! effect intensity from 0 to 1 over a fixed number of ticks; new changes are debounced while a
//! ramp is running.

use crate::map::RegionGrid;
use engine_core::{EventQueue, FrameContext, Lifecycle, SceneModule, WorldGeometry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherKind {
    #[default]
    Clear,
    Cloudy,
    Rain,
    Snow,
    Storm,
    Sandstorm,
    Fog,
}

impl WeatherKind {
    pub const ALL: [WeatherKind; 7] = [
        WeatherKind::Clear,
        WeatherKind::Cloudy,
        WeatherKind::Rain,
        WeatherKind::Snow,
        WeatherKind::Storm,
        WeatherKind::Sandstorm,
        WeatherKind::Fog,
    ];

    /// Weather index understood by the field shader.
    pub fn shader_index(self) -> u32 {
        match self {
            WeatherKind::Clear => 0,
            WeatherKind::Rain => 1,
            WeatherKind::Snow => 2,
            WeatherKind::Storm => 3,
            WeatherKind::Sandstorm => 4,
            WeatherKind::Fog => 5,
            WeatherKind::Cloudy => 6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            WeatherKind::Clear => "clear",
            WeatherKind::Cloudy => "cloudy",
            WeatherKind::Rain => "rain",
            WeatherKind::Snow => "snow",
            WeatherKind::Storm => "storm",
            WeatherKind::Sandstorm => "sandstorm",
            WeatherKind::Fog => "fog",
        }
    }
}

impl fmt::Display for WeatherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Region ids bound to each weather kind, plus the ramp length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherRegions {
    #[serde(default = "default_cloudy")]
    pub cloudy: u32,
    #[serde(default = "default_rain")]
    pub rain: u32,
    #[serde(default = "default_snow")]
    pub snow: u32,
    #[serde(default = "default_storm")]
    pub storm: u32,
    #[serde(default = "default_sandstorm")]
    pub sandstorm: u32,
    #[serde(default = "default_fog")]
    pub fog: u32,
    /// Ticks a weather change takes to reach full intensity.
    #[serde(default = "default_transition_frames")]
    pub transition_frames: u32,
}

fn default_cloudy() -> u32 {
    1
}
fn default_rain() -> u32 {
    2
}
fn default_snow() -> u32 {
    3
}
fn default_storm() -> u32 {
    4
}
fn default_sandstorm() -> u32 {
    5
}
fn default_fog() -> u32 {
    6
}
fn default_transition_frames() -> u32 {
    30
}

impl Default for WeatherRegions {
    fn default() -> Self {
        Self {
            cloudy: default_cloudy(),
            rain: default_rain(),
            snow: default_snow(),
            storm: default_storm(),
            sandstorm: default_sandstorm(),
            fog: default_fog(),
            transition_frames: default_transition_frames(),
        }
    }
}

/// Static `regionId → WeatherKind` mapping. Unlisted regions are clear.
#[derive(Debug, Clone, Default)]
pub struct RegionLookupTable {
    entries: HashMap<u32, WeatherKind>,
}

impl RegionLookupTable {
    pub fn new(entries: impl IntoIterator<Item = (u32, WeatherKind)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn lookup(&self, region_id: u32) -> WeatherKind {
        self.entries.get(&region_id).copied().unwrap_or_default()
    }
}

impl From<&WeatherRegions> for RegionLookupTable {
    fn from(regions: &WeatherRegions) -> Self {
        // later entries win when two kinds share a region id
        Self::new([
            (regions.cloudy, WeatherKind::Cloudy),
            (regions.rain, WeatherKind::Rain),
            (regions.snow, WeatherKind::Snow),
            (regions.storm, WeatherKind::Storm),
            (regions.sandstorm, WeatherKind::Sandstorm),
            (regions.fog, WeatherKind::Fog),
        ])
    }
}

/// `{current, target, progress}` with the tick-driven ramp.
#[derive(Debug, Clone)]
pub struct WeatherState {
    current: WeatherKind,
    target: WeatherKind,
    timer: u32,
    duration: u32,
    intensity: f32,
}

impl WeatherState {
    pub fn new(initial: WeatherKind, duration: u32) -> Self {
        Self {
            current: initial,
            target: initial,
            timer: 0,
            duration: duration.max(1),
            intensity: 1.0,
        }
    }

    pub fn current(&self) -> WeatherKind {
        self.current
    }

    pub fn target(&self) -> WeatherKind {
        self.target
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn is_transitioning(&self) -> bool {
        self.current != self.target
    }

    /// 0..1 ramp position; 1 when settled.
    pub fn progress(&self) -> f32 {
        if self.is_transitioning() {
            self.timer as f32 / self.duration as f32
        } else {
            1.0
        }
    }

    /// A ramp is mid-flight and must not be interrupted.
    pub fn is_debouncing(&self) -> bool {
        self.timer > 0 && self.timer < self.duration
    }

    /// Effect program to run: the target once a transition is under way.
    pub fn effect_kind(&self) -> WeatherKind {
        if self.is_transitioning() && self.timer > 0 {
            self.target
        } else {
            self.current
        }
    }

    /// Start a transition toward `kind`. Returns false when debounced or already heading there.
    pub fn request(&mut self, kind: WeatherKind) -> bool {
        if self.is_debouncing() || kind == self.current || kind == self.target {
            return false;
        }
        self.target = kind;
        self.timer = 0;
        true
    }

    /// Override regardless of the debounce.
    pub fn force(&mut self, kind: WeatherKind) -> bool {
        if kind == self.target && !self.is_transitioning() {
            return false;
        }
        self.target = kind;
        self.timer = 0;
        if kind == self.current {
            self.intensity = 1.0;
        }
        true
    }

    /// Advance the ramp by one tick.
    pub fn advance(&mut self) {
        if !self.is_transitioning() {
            return;
        }
        self.timer += 1;
        if self.timer >= self.duration {
            self.current = self.target;
            self.timer = 0;
            self.intensity = 1.0;
        } else {
            self.intensity = self.timer as f32 / self.duration as f32;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherEvent {
    /// `region_id` is `None` for manual overrides.
    Changed {
        from: WeatherKind,
        to: WeatherKind,
        region_id: Option<u32>,
    },
}

pub struct WeatherOverlay {
    lifecycle: Lifecycle,
    state: WeatherState,
    table: RegionLookupTable,
    regions: RegionGrid,
    geometry: WorldGeometry,
    events: EventQueue<WeatherEvent>,
}

impl WeatherOverlay {
    /// `geometry` must already carry the map's tile dimensions.
    pub fn new(regions: RegionGrid, config: &WeatherRegions, geometry: WorldGeometry) -> Self {
        Self {
            lifecycle: Lifecycle::new(),
            state: WeatherState::new(WeatherKind::Clear, config.transition_frames),
            table: RegionLookupTable::from(config),
            regions,
            geometry,
            events: EventQueue::new(),
        }
    }

    pub fn state(&self) -> &WeatherState {
        &self.state
    }

    pub fn current_kind(&self) -> WeatherKind {
        self.state.current()
    }

    pub fn events(&mut self) -> &mut EventQueue<WeatherEvent> {
        &mut self.events
    }

    /// Manual override; starts a transition like a region change would.
    pub fn force_weather(&mut self, kind: WeatherKind) {
        let from = self.state.current();
        if self.state.force(kind) {
            log::info!("Weather forced: {} -> {}", from, kind);
            self.events.push(WeatherEvent::Changed {
                from,
                to: kind,
                region_id: None,
            });
        }
    }

    fn check_region(&mut self, ctx: &FrameContext) {
        if self.state.is_debouncing() {
            return;
        }
        let tile = self.geometry.world_to_tile(ctx.transform.position);
        let region_id = self.regions.region_at(tile);
        let kind = self.table.lookup(region_id);
        let from = self.state.current();
        if self.state.request(kind) {
            log::info!("Weather changing: {} -> {} (region {})", from, kind, region_id);
            self.events.push(WeatherEvent::Changed {
                from,
                to: kind,
                region_id: Some(region_id),
            });
        }
    }
}

impl SceneModule for WeatherOverlay {
    fn name(&self) -> &'static str {
        "weather"
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    fn on_activate(&mut self, ctx: &FrameContext) {
        self.check_region(ctx);
    }

    fn on_tick(&mut self, ctx: &FrameContext) {
        self.check_region(ctx);
        self.state.advance();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::{TransformState, UVec2, Vec2};

    /// 10x10 map: left half clear, right half rain (region 2).
    fn overlay() -> WeatherOverlay {
        let regions = (0..100).map(|i| if i % 10 >= 5 { 2 } else { 0 }).collect();
        let grid = RegionGrid::new(10, 10, regions);
        let geo = WorldGeometry::default().with_map_size(10, 10);
        WeatherOverlay::new(grid, &WeatherRegions::default(), geo)
    }

    fn ctx_at(x: f32) -> FrameContext {
        FrameContext {
            tick: 0,
            transform: TransformState {
                position: Vec2::new(x, 5000.0),
                ..Default::default()
            },
        }
    }

    #[test]
    fn clear_to_rain_takes_exactly_transition_frames() {
        let mut w = overlay();
        w.activate(&ctx_at(1000.0));
        let mut last = 0.0;
        for tick in 1..=30 {
            w.tick(&ctx_at(8000.0));
            let i = w.state().intensity();
            assert!(i >= last, "intensity must be monotone");
            last = i;
            if tick < 30 {
                assert_eq!(w.current_kind(), WeatherKind::Clear, "switched early at {}", tick);
                assert_eq!(w.state().effect_kind(), WeatherKind::Rain);
            }
        }
        assert_eq!(w.current_kind(), WeatherKind::Rain);
        assert_eq!(w.state().intensity(), 1.0);
        let changes: Vec<_> = w.events().drain().collect();
        assert_eq!(
            changes,
            vec![WeatherEvent::Changed {
                from: WeatherKind::Clear,
                to: WeatherKind::Rain,
                region_id: Some(2)
            }]
        );
    }

    #[test]
    fn changes_are_debounced_mid_ramp() {
        let mut w = overlay();
        w.activate(&ctx_at(8000.0));
        w.tick(&ctx_at(8000.0));
        assert!(w.state().is_debouncing());
        // back over clear land while ramping: ignored
        for _ in 0..5 {
            w.tick(&ctx_at(1000.0));
        }
        assert_eq!(w.state().target(), WeatherKind::Rain);
        assert_eq!(w.events().len(), 1);
    }

    #[test]
    fn force_weather_starts_a_transition() {
        let mut w = overlay();
        w.activate(&ctx_at(1000.0));
        w.force_weather(WeatherKind::Fog);
        assert_eq!(w.state().target(), WeatherKind::Fog);
        assert_eq!(
            w.events().drain().next(),
            Some(WeatherEvent::Changed {
                from: WeatherKind::Clear,
                to: WeatherKind::Fog,
                region_id: None
            })
        );
    }

    #[test]
    fn lookup_defaults_to_clear_and_maps_indices() {
        let table = RegionLookupTable::from(&WeatherRegions::default());
        assert_eq!(table.lookup(0), WeatherKind::Clear);
        assert_eq!(table.lookup(4), WeatherKind::Storm);
        assert_eq!(table.lookup(99), WeatherKind::Clear);
        assert_eq!(WeatherKind::Cloudy.shader_index(), 6);
        assert_eq!(RegionGrid::new(1, 1, vec![3]).region_at(UVec2::ZERO), 3);
    }
}
