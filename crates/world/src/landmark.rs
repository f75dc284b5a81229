//! Landmarks: world-anchored points of interest billboarded from an atlas.
//!
//! Collected once per map load from tagged events, packed into a fixed grid atlas, and queried
//! every tick for name disclosure and footprint placement.

use crate::map::MapData;
use crate::visited::VisitedLookup;
use engine_core::{
    wrapped_distance, EventQueue, FrameContext, Lifecycle, SceneModule, UVec2, Vec2, WorldGeometry,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Atlas side length in pixels.
pub const ATLAS_SIZE: u32 = 512;
/// One landmark cell in pixels.
pub const ATLAS_CELL: u32 = 48;
pub const ATLAS_CELLS_PER_ROW: u32 = ATLAS_SIZE / ATLAS_CELL;
pub const ATLAS_CAPACITY: usize = (ATLAS_CELLS_PER_ROW * ATLAS_CELLS_PER_ROW) as usize;
/// Cells drawn per atlas build step.
pub const ATLAS_BATCH: usize = 5;
const IMPORTANT_SCALE: f32 = 1.5;
/// Footprints below this scale are not drawn.
pub const MIN_VISIBLE_SCALE: f32 = 0.01;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandmarkParams {
    #[serde(default = "default_max_count")]
    pub max_count: usize,
    /// Base footprint in tiles.
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default = "default_name_radius")]
    pub name_display_radius: f32,
    #[serde(default = "default_true")]
    pub enable_visited_tracking: bool,
    #[serde(default = "default_unvisited_name")]
    pub unvisited_name: String,
}

fn default_max_count() -> usize {
    50
}
fn default_scale() -> f32 {
    1.0
}
fn default_name_radius() -> f32 {
    500.0
}
fn default_true() -> bool {
    true
}
fn default_unvisited_name() -> String {
    "???".to_string()
}

impl Default for LandmarkParams {
    fn default() -> Self {
        Self {
            max_count: default_max_count(),
            scale: default_scale(),
            name_display_radius: default_name_radius(),
            enable_visited_tracking: default_true(),
            unvisited_name: default_unvisited_name(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LandmarkCategory {
    Town,
    Castle,
    Dungeon,
    Shrine,
    Port,
    Tower,
    Cave,
    Forest,
    #[default]
    Default,
}

impl LandmarkCategory {
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "town" => Self::Town,
            "castle" => Self::Castle,
            "dungeon" => Self::Dungeon,
            "shrine" => Self::Shrine,
            "port" => Self::Port,
            "tower" => Self::Tower,
            "cave" => Self::Cave,
            "forest" => Self::Forest,
            _ => Self::Default,
        }
    }

    /// Minimap icon index.
    pub fn icon_index(self) -> u32 {
        match self {
            Self::Town | Self::Default => 176,
            Self::Castle => 177,
            Self::Dungeon => 178,
            Self::Shrine => 179,
            Self::Port => 180,
            Self::Tower => 181,
            Self::Cave => 182,
            Self::Forest => 183,
        }
    }
}

/// Where a landmark's atlas cell is drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpriteSource {
    Tile { tile_id: u32 },
    Character { sheet: String, index: u32 },
    /// Left transparent.
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Landmark {
    pub event_id: u32,
    pub tile: UVec2,
    pub world_pos: Vec2,
    pub display_name: String,
    pub category: LandmarkCategory,
    pub important: bool,
    /// Footprint radius in tiles.
    pub scale: f32,
    pub sprite: SpriteSource,
    /// `[u0, v0, u1, v1]` once packed.
    pub atlas_uv: Option<[f32; 4]>,
}

impl Landmark {
    pub fn icon_index(&self) -> u32 {
        self.category.icon_index()
    }

    /// Atlas UV bounds, falling back to the whole atlas when unpacked.
    pub fn uv_bounds(&self) -> [f32; 4] {
        self.atlas_uv.unwrap_or([0.0, 0.0, 1.0, 1.0])
    }
}

/// Parse every `<key: value>` tag in an event note. Tags may share a line; the first of a key wins.
pub fn parse_note_tags(note: &str) -> HashMap<String, String> {
    let mut tags = HashMap::new();
    let mut rest = note;
    while let Some(open) = rest.find('<') {
        rest = &rest[open + 1..];
        let Some(close) = rest.find(['<', '>']) else {
            break;
        };
        if rest[close..].starts_with('>') {
            if let Some((key, value)) = rest[..close].split_once(':') {
                let key = key.trim();
                if !key.is_empty() {
                    tags.entry(key.to_string()).or_insert_with(|| value.trim().to_string());
                }
            }
        }
        rest = &rest[close..];
    }
    tags
}

/// Build landmarks from every event tagged `<airshipVisible: true>`.
pub fn collect(map: &MapData, geometry: &WorldGeometry, params: &LandmarkParams) -> Vec<Landmark> {
    let geometry = map.geometry(geometry);
    let landmarks: Vec<Landmark> = map
        .events()
        .filter_map(|event| {
            let image = event.pages.first().and_then(|page| page.image.clone()).unwrap_or_default();
            let tags = parse_note_tags(&event.note);
            if tags.get("airshipVisible").map(String::as_str) != Some("true") {
                return None;
            }
            let important = tags.get("important").map(String::as_str) == Some("true");
            let tile = UVec2::new(event.x, event.y);
            let sprite = if image.tile_id > 0 {
                SpriteSource::Tile {
                    tile_id: image.tile_id,
                }
            } else if !image.character_name.is_empty() {
                SpriteSource::Character {
                    sheet: image.character_name.clone(),
                    index: image.character_index,
                }
            } else {
                SpriteSource::None
            };
            Some(Landmark {
                event_id: event.id,
                tile,
                world_pos: geometry.tile_to_world(tile),
                display_name: tags
                    .get("landmarkName")
                    .filter(|n| !n.is_empty())
                    .cloned()
                    .unwrap_or_else(|| event.name.clone()),
                category: tags
                    .get("landmarkType")
                    .map(|t| LandmarkCategory::from_tag(t))
                    .unwrap_or_default(),
                important,
                scale: if important { IMPORTANT_SCALE } else { 1.0 } * params.scale,
                sprite,
                atlas_uv: None,
            })
        })
        .collect();
    log::info!("Collected {} landmarks", landmarks.len());
    landmarks
}

/// Pixel origin of atlas cell `index` (row-major).
pub fn atlas_cell_origin(index: usize) -> UVec2 {
    let index = index as u32;
    UVec2::new(
        (index % ATLAS_CELLS_PER_ROW) * ATLAS_CELL,
        (index / ATLAS_CELLS_PER_ROW) * ATLAS_CELL,
    )
}

/// Assign atlas cells to the first `max_count` landmarks, never more than the atlas holds. Returns how many were packed.
pub fn pack_atlas(landmarks: &mut [Landmark], max_count: usize) -> usize {
    let size = ATLAS_SIZE as f32;
    let capacity = max_count.min(ATLAS_CAPACITY);
    if max_count > ATLAS_CAPACITY {
        log::warn!("Landmark cap {} exceeds the {} atlas cells", max_count, ATLAS_CAPACITY);
    }
    let packed = landmarks.len().min(capacity);
    for (index, landmark) in landmarks.iter_mut().enumerate() {
        landmark.atlas_uv = (index < packed).then(|| {
            let origin = atlas_cell_origin(index);
            let (x, y) = (origin.x as f32, origin.y as f32);
            let cell = ATLAS_CELL as f32;
            [x / size, y / size, (x + cell) / size, (y + cell) / size]
        });
    }
    if landmarks.len() > packed {
        log::info!("{} landmarks over the atlas cap were left unpacked", landmarks.len() - packed);
    }
    packed
}

/// Source rectangle `(sheet_index, x, y)` of a 48 px object tile in its tileset sheet.
pub fn tile_sprite_source(tile_id: u32) -> (usize, u32, u32) {
    let sheet = 5 + (tile_id / 256) as usize;
    let sx = ((tile_id / 128) % 2 * 8 + tile_id % 8) * ATLAS_CELL;
    let sy = ((tile_id % 256) / 8 % 16) * ATLAS_CELL;
    (sheet, sx, sy)
}

/// Standing frame `(x, y, w, h)` of a character in its sheet. Big sheets (`$` prefix) hold one character.
pub fn character_sprite_source(sheet: &str, index: u32, sheet_width: u32, sheet_height: u32) -> (u32, u32, u32, u32) {
    let big = is_big_character(sheet);
    let pw = sheet_width / if big { 3 } else { 12 };
    let ph = sheet_height / if big { 4 } else { 8 };
    let n = if big { 0 } else { index };
    ((n % 4 * 3 + 1) * pw, (n / 4) * 4 * ph, pw, ph)
}

pub fn is_big_character(sheet: &str) -> bool {
    sheet.trim_start_matches('!').starts_with('$')
}

/// One landmark as the renderer needs it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandmarkInstance {
    pub world_pos: Vec2,
    /// Footprint radius in world units.
    pub size: f32,
    pub uv: [f32; 4],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandmarkPlacement {
    /// Index and distance of the closest named landmark within the name radius.
    pub nearest: Option<(usize, f32)>,
    pub visible: Vec<LandmarkInstance>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LandmarkEvent {
    /// `None` once the airship leaves every landmark's radius.
    NameChanged(Option<String>),
}

pub struct LandmarkOverlay {
    lifecycle: Lifecycle,
    params: LandmarkParams,
    geometry: WorldGeometry,
    landmarks: Vec<Landmark>,
    visited: Option<Box<dyn VisitedLookup>>,
    current_name: Option<String>,
    placement: LandmarkPlacement,
    events: EventQueue<LandmarkEvent>,
}

impl LandmarkOverlay {
    /// `geometry` must already carry the map's tile dimensions.
    /// Without a visited lookup every landmark counts as visited.
    pub fn new(
        mut landmarks: Vec<Landmark>,
        params: LandmarkParams,
        geometry: WorldGeometry,
        visited: Option<Box<dyn VisitedLookup>>,
    ) -> Self {
        pack_atlas(&mut landmarks, params.max_count);
        Self {
            lifecycle: Lifecycle::new(),
            params,
            geometry,
            landmarks,
            visited,
            current_name: None,
            placement: LandmarkPlacement::default(),
            events: EventQueue::new(),
        }
    }

    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    pub fn current_name(&self) -> Option<&str> {
        self.current_name.as_deref()
    }

    /// Placement computed on the last tick.
    pub fn last_placement(&self) -> &LandmarkPlacement {
        &self.placement
    }

    pub fn events(&mut self) -> &mut EventQueue<LandmarkEvent> {
        &mut self.events
    }

    /// Nearest named landmark within range plus every packed landmark's footprint.
    pub fn placement(&self, camera: Vec2) -> LandmarkPlacement {
        let world = self.geometry.world_size();
        let tile = self.geometry.tile_size().x;
        let mut nearest: Option<(usize, f32)> = None;
        for (index, landmark) in self.landmarks.iter().enumerate() {
            if landmark.display_name.is_empty() {
                continue;
            }
            let distance = wrapped_distance(camera, landmark.world_pos, world);
            if distance < self.params.name_display_radius && nearest.map_or(true, |(_, d)| distance < d) {
                nearest = Some((index, distance));
            }
        }

        let visible = self
            .landmarks
            .iter()
            .take(self.params.max_count)
            .filter(|l| l.scale >= MIN_VISIBLE_SCALE)
            .map(|l| LandmarkInstance {
                world_pos: l.world_pos,
                size: tile * l.scale,
                uv: l.uv_bounds(),
            })
            .collect();

        LandmarkPlacement { nearest, visible }
    }

    fn disclosed_name(&self, landmark: &Landmark) -> String {
        let visited = match (&self.visited, self.params.enable_visited_tracking) {
            (Some(lookup), true) => lookup.is_visited(landmark.world_pos, landmark.tile),
            _ => true,
        };
        if visited {
            landmark.display_name.clone()
        } else {
            self.params.unvisited_name.clone()
        }
    }
}

impl SceneModule for LandmarkOverlay {
    fn name(&self) -> &'static str {
        "landmarks"
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    fn on_tick(&mut self, ctx: &FrameContext) {
        let placement = self.placement(ctx.transform.position);
        match placement.nearest {
            Some((index, _)) => {
                let name = self.disclosed_name(&self.landmarks[index]);
                if self.current_name.as_deref() != Some(name.as_str()) {
                    self.current_name = Some(name.clone());
                    self.events.push(LandmarkEvent::NameChanged(Some(name)));
                }
            }
            None => {
                if self.current_name.take().is_some() {
                    self.events.push(LandmarkEvent::NameChanged(None));
                }
            }
        }
        self.placement = placement;
    }

    fn on_dispose(&mut self) {
        self.events.clear();
        self.current_name = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{EventImage, EventPage, MapEvent};
    use crate::visited::{VisitedPlace, VisitedPlaces};
    use engine_core::TransformState;

    fn event(id: u32, name: &str, note: &str, x: u32, y: u32, tile_id: u32) -> Option<MapEvent> {
        Some(MapEvent {
            id,
            name: name.to_string(),
            note: note.to_string(),
            x,
            y,
            pages: vec![EventPage {
                image: Some(EventImage {
                    tile_id,
                    ..Default::default()
                }),
            }],
        })
    }

    fn map(events: Vec<Option<MapEvent>>) -> MapData {
        MapData {
            width: 100,
            height: 100,
            data: vec![0; 100 * 100 * 6],
            events,
            tileset_flags: Vec::new(),
            tileset_names: Vec::new(),
        }
    }

    fn ctx_at(position: Vec2) -> FrameContext {
        FrameContext {
            tick: 0,
            transform: TransformState {
                position,
                ..Default::default()
            },
        }
    }

    #[test]
    fn note_tags_parse_per_line() {
        let tags = parse_note_tags("<airshipVisible: true>\n<landmarkName:  Port Aldra >\r\nplain text\n<bad>");
        assert_eq!(tags.get("airshipVisible").map(String::as_str), Some("true"));
        assert_eq!(tags.get("landmarkName").map(String::as_str), Some("Port Aldra"));
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn note_tags_share_a_line() {
        let tags = parse_note_tags("<airshipVisible: true><landmarkName: Aldra> <important:false>");
        assert_eq!(tags.get("airshipVisible").map(String::as_str), Some("true"));
        assert_eq!(tags.get("landmarkName").map(String::as_str), Some("Aldra"));
        assert_eq!(tags.get("important").map(String::as_str), Some("false"));
    }

    #[test]
    fn note_tags_keep_first_and_skip_broken() {
        let tags = parse_note_tags("<landmarkName: One <landmarkName: Two>\n<landmarkName: Three>");
        assert_eq!(tags.get("landmarkName").map(String::as_str), Some("Two"));
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn events_without_images_still_collect() {
        let mut bare = event(1, "Cairn", "<airshipVisible: true>", 3, 4, 0).unwrap();
        bare.pages = vec![EventPage { image: None }];
        let mut pageless = event(2, "Shrine", "<airshipVisible: true>", 5, 6, 0).unwrap();
        pageless.pages.clear();
        let lm = collect(&map(vec![Some(bare), Some(pageless)]), &WorldGeometry::default(), &LandmarkParams::default());
        assert_eq!(lm.len(), 2);
        assert_eq!(lm[0].sprite, SpriteSource::None);
        assert_eq!(lm[1].display_name, "Shrine");
    }

    #[test]
    fn collect_reads_tags_and_scales() {
        let m = map(vec![
            None,
            event(1, "EV001", "<airshipVisible: true>\n<landmarkName: Aldra>\n<landmarkType: castle>\n<important: true>", 10, 20, 5),
            event(2, "Hut", "<airshipVisible: true>", 0, 0, 0),
            event(3, "Hidden", "<landmarkName: Nope>", 5, 5, 5),
        ]);
        let lm = collect(&m, &WorldGeometry::default(), &LandmarkParams::default());
        assert_eq!(lm.len(), 2);
        assert_eq!(lm[0].display_name, "Aldra");
        assert_eq!(lm[0].category, LandmarkCategory::Castle);
        assert_eq!(lm[0].icon_index(), 177);
        assert_eq!(lm[0].scale, 1.5);
        assert!(lm[0].world_pos.abs_diff_eq(Vec2::new(1050.0, 2050.0), 1e-2));
        assert_eq!(lm[1].display_name, "Hut");
        assert_eq!(lm[1].sprite, SpriteSource::None);
        assert_eq!(lm[1].icon_index(), 176);
    }

    #[test]
    fn atlas_packing_stops_at_atlas_capacity() {
        let m = map((0..150).map(|i| event(i, "L", "<airshipVisible: true>", i % 100, i / 100, 1)).collect());
        let mut lm = collect(&m, &WorldGeometry::default(), &LandmarkParams::default());
        assert_eq!(pack_atlas(&mut lm, 200), ATLAS_CAPACITY);
        assert!(lm.iter().flat_map(|l| l.atlas_uv).all(|uv| uv.iter().all(|c| *c <= 1.0)));
        assert!(lm[ATLAS_CAPACITY].atlas_uv.is_none());
    }

    #[test]
    fn atlas_packing_is_row_major_and_capped() {
        let m = map((0..60).map(|i| event(i, "L", "<airshipVisible: true>", i % 100, 0, 1)).collect());
        let mut lm = collect(&m, &WorldGeometry::default(), &LandmarkParams::default());
        assert_eq!(pack_atlas(&mut lm, 50), 50);
        assert_eq!(lm[0].atlas_uv, Some([0.0, 0.0, 48.0 / 512.0, 48.0 / 512.0]));
        assert_eq!(lm[10].atlas_uv, Some([0.0, 48.0 / 512.0, 48.0 / 512.0, 96.0 / 512.0]));
        assert_eq!(lm[49].atlas_uv.map(|uv| uv[0]), Some(9.0 * 48.0 / 512.0));
        assert!(lm[50].atlas_uv.is_none());
    }

    #[test]
    fn sprite_sources_follow_sheet_layout() {
        assert_eq!(tile_sprite_source(0), (5, 0, 0));
        assert_eq!(tile_sprite_source(9), (5, 48, 48));
        assert_eq!(tile_sprite_source(130), (5, 10 * 48, 0));
        assert_eq!(tile_sprite_source(256), (6, 0, 0));
        assert_eq!(character_sprite_source("Actor1", 5, 576, 384), (4 * 48, 4 * 48, 48, 48));
        assert_eq!(character_sprite_source("$BigMonster", 3, 144, 192), (48, 0, 48, 48));
    }

    #[test]
    fn name_is_announced_once_on_enter_and_cleared_on_leave() {
        let m = map(vec![None, event(1, "Aldra", "<airshipVisible: true>", 50, 50, 1)]);
        let geo = WorldGeometry::default();
        let lm = collect(&m, &geo, &LandmarkParams::default());
        let mut overlay = LandmarkOverlay::new(lm, LandmarkParams::default(), geo, None);
        overlay.activate(&ctx_at(Vec2::ZERO));

        let mut names = Vec::new();
        for step in 0..40 {
            // fly along y = 5050 from x = 4000 to x = 6000
            let pos = Vec2::new(4000.0 + step as f32 * 50.0, 5050.0);
            overlay.tick(&ctx_at(pos));
            names.extend(overlay.events().drain());
        }
        assert_eq!(
            names,
            vec![
                LandmarkEvent::NameChanged(Some("Aldra".into())),
                LandmarkEvent::NameChanged(None)
            ]
        );
    }

    #[test]
    fn unvisited_landmark_name_is_masked() {
        let m = map(vec![None, event(1, "Aldra", "<airshipVisible: true>", 50, 50, 1)]);
        let geo = WorldGeometry::default();
        let lm = collect(&m, &geo, &LandmarkParams::default());
        let mut visited = VisitedPlaces::new();
        visited.add(VisitedPlace::new(9, 1, "Elsewhere", "town").with_field(UVec2::new(10, 10)));
        let mut overlay = LandmarkOverlay::new(lm, LandmarkParams::default(), geo, Some(Box::new(visited)));
        overlay.activate(&ctx_at(Vec2::ZERO));
        overlay.tick(&ctx_at(Vec2::new(5050.0, 5050.0)));
        assert_eq!(overlay.current_name(), Some("???"));
    }

    #[test]
    fn disclosure_uses_wrapped_distance() {
        let m = map(vec![None, event(1, "Edge", "<airshipVisible: true>", 0, 0, 1)]);
        let geo = WorldGeometry::default();
        let lm = collect(&m, &geo, &LandmarkParams::default());
        let overlay = LandmarkOverlay::new(lm, LandmarkParams::default(), geo, None);
        let placement = overlay.placement(Vec2::new(9900.0, 9900.0));
        assert_eq!(placement.nearest.map(|(i, _)| i), Some(0));
        assert_eq!(placement.visible.len(), 1);
        assert!((placement.visible[0].size - 100.0).abs() < 1e-3);
    }
}
