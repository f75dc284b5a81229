//! Demo field map built from the same elevation field as the generated images.
//!
//! Used when no map file is configured: tiles, passage flags, weather regions and a handful of
//! tagged landmark events, plus the character sheet their markers are drawn from.

use crate::textures::{Pixel, TextureData};
use crate::world_gen::{deterministic_noise_seed, Terrain, WorldGenerator};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use world::{EventImage, EventPage, MapData, MapEvent, LAYER_COUNT, REGION_LAYER};

/// Character sheet the demo landmarks point at.
pub const MARKER_SHEET: &str = "!Landmarks";
/// Landmark kinds in character-index order.
pub const MARKER_KINDS: [&str; 8] = ["town", "castle", "dungeon", "shrine", "port", "tower", "cave", "forest"];
const MARKER_FRAME: u32 = 48;

const SYLLABLES: [&str; 16] = [
    "al", "dra", "ven", "mor", "is", "tal", "ka", "ren", "su", "bel", "or", "wyn", "ith", "gar", "lo", "een",
];

#[derive(Debug, Clone)]
pub struct DemoMapConfig {
    pub width: u32,
    pub height: u32,
    pub landmark_count: usize,
    /// Side of the square cells that share one weather region.
    pub region_cell: u32,
}

impl Default for DemoMapConfig {
    fn default() -> Self {
        Self {
            width: 100,
            height: 100,
            landmark_count: 24,
            region_cell: 20,
        }
    }
}

/// Tile id used for each terrain class on layer 0.
pub fn terrain_tile(terrain: Terrain) -> u32 {
    match terrain {
        Terrain::DeepWater | Terrain::Water => 1,
        Terrain::Beach => 2,
        Terrain::Grass => 3,
        Terrain::Forest => 4,
        Terrain::Hills => 5,
        Terrain::Mountain => 6,
        Terrain::Snow => 7,
    }
}

/// Passage flags indexed by tile id: water, mountains and snow block; forests forbid landing.
pub fn demo_tileset_flags() -> Vec<u32> {
    vec![0x10, 0x0f, 0x00, 0x00, 0x800, 0x00, 0x0f, 0x0f]
}

pub fn build_demo_map(generator: &WorldGenerator, config: &DemoMapConfig) -> MapData {
    let (w, h) = (config.width.max(1), config.height.max(1));
    let layer = (w * h) as usize;
    let mut data = vec![0u32; layer * LAYER_COUNT];
    let mut rng = StdRng::seed_from_u64(deterministic_noise_seed(generator.config().seed, 3) as u64);

    let mut land = Vec::new();
    for y in 0..h {
        for x in 0..w {
            let terrain = generator.terrain_at((x as f64 + 0.5) / w as f64, (y as f64 + 0.5) / h as f64);
            data[(y * w + x) as usize] = terrain_tile(terrain);
            if matches!(terrain, Terrain::Grass | Terrain::Beach | Terrain::Hills) {
                land.push((x, y));
            }
        }
    }

    // one region per coarse cell; region 0 is clear sky
    let cell = config.region_cell.max(1);
    let (cols, rows) = (w.div_ceil(cell), h.div_ceil(cell));
    let cell_regions: Vec<u32> = (0..cols * rows).map(|_| rng.gen_range(0..=6)).collect();
    for y in 0..h {
        for x in 0..w {
            let region = cell_regions[((y / cell) * cols + x / cell) as usize];
            data[REGION_LAYER * layer + (y * w + x) as usize] = region;
        }
    }

    let mut events = vec![None];
    for id in 1..=config.landmark_count.min(land.len()) {
        let pick = rng.gen_range(0..land.len());
        let (x, y) = land.swap_remove(pick);
        let kind = rng.gen_range(0..MARKER_KINDS.len());
        let important = rng.gen_bool(0.2);
        let name = place_name(&mut rng);
        let mut note = format!(
            "<airshipVisible: true>\n<landmarkName: {}>\n<landmarkType: {}>",
            name, MARKER_KINDS[kind]
        );
        if important {
            note.push_str("\n<important: true>");
        }
        events.push(Some(MapEvent {
            id: id as u32,
            name: format!("EV{:03}", id),
            note,
            x,
            y,
            pages: vec![EventPage {
                image: Some(EventImage {
                    tile_id: 0,
                    character_name: MARKER_SHEET.to_string(),
                    character_index: kind as u32,
                }),
            }],
        }));
    }

    log::info!("Built {}x{} demo map with {} landmarks", w, h, events.len() - 1);
    MapData {
        width: w,
        height: h,
        data,
        events,
        tileset_flags: demo_tileset_flags(),
        tileset_names: Vec::new(),
    }
}

fn place_name(rng: &mut StdRng) -> String {
    let parts = rng.gen_range(2..=3);
    let mut name: String = (0..parts)
        .map(|_| SYLLABLES[rng.gen_range(0..SYLLABLES.len())])
        .collect();
    if let Some(first) = name.get(..1).map(str::to_ascii_uppercase) {
        name.replace_range(..1, &first);
    }
    name
}

/// Standard 12x8-frame character sheet with one marker per kind at its standing frame.
pub fn marker_sheet() -> TextureData {
    let mut sheet = TextureData::filled(MARKER_FRAME * 12, MARKER_FRAME * 8, Pixel::TRANSPARENT);
    for (index, _) in MARKER_KINDS.iter().enumerate() {
        let n = index as u32;
        let ox = (n % 4 * 3 + 1) * MARKER_FRAME;
        let oy = (n / 4) * 4 * MARKER_FRAME;
        draw_marker(&mut sheet, ox, oy, marker_color(index));
    }
    sheet
}

fn marker_color(index: usize) -> Pixel {
    const COLORS: [[u8; 3]; 8] = [
        [214, 168, 86],
        [180, 180, 196],
        [120, 72, 140],
        [236, 236, 210],
        [80, 150, 200],
        [150, 110, 90],
        [90, 90, 90],
        [60, 130, 70],
    ];
    let [r, g, b] = COLORS[index % COLORS.len()];
    Pixel::new(r, g, b, 255)
}

/// Filled diamond with a dark outline.
fn draw_marker(sheet: &mut TextureData, ox: u32, oy: u32, fill: Pixel) {
    let outline = Pixel::new(30, 24, 20, 255);
    let c = MARKER_FRAME as i32 / 2;
    let r = c - 6;
    for y in 0..MARKER_FRAME as i32 {
        for x in 0..MARKER_FRAME as i32 {
            let d = (x - c).abs() + (y - c).abs();
            if d <= r {
                let color = if d >= r - 2 { outline } else { fill };
                sheet.set_pixel(ox + x as u32, oy + y as u32, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world_gen::WorldGenConfig;
    use world::{collect, LandmarkParams, SpriteSource};
    use engine_core::{UVec2, WorldGeometry};

    fn generator() -> WorldGenerator {
        WorldGenerator::new(WorldGenConfig {
            image_size: 16,
            ..WorldGenConfig::default()
        })
    }

    #[test]
    fn demo_map_has_valid_layers_and_regions() {
        let map = build_demo_map(&generator(), &DemoMapConfig::default());
        assert_eq!(map.data.len(), 100 * 100 * LAYER_COUNT);
        for y in 0..100 {
            for x in 0..100 {
                assert!(map.region_id(UVec2::new(x, y)) <= 6);
            }
        }
    }

    #[test]
    fn landmarks_sit_on_landable_tiles() {
        let map = build_demo_map(&generator(), &DemoMapConfig::default());
        let landmarks = collect(&map, &WorldGeometry::default(), &LandmarkParams::default());
        assert!(!landmarks.is_empty());
        for lm in &landmarks {
            assert!(map.is_airship_land_ok(lm.tile.x as i64, lm.tile.y as i64));
            assert!(matches!(lm.sprite, SpriteSource::Character { .. }));
            assert!(!lm.display_name.is_empty());
        }
    }

    #[test]
    fn marker_frames_are_opaque_at_centre() {
        let sheet = marker_sheet();
        assert_eq!(sheet.width, 576);
        // kind 5 (tower): column 1*3+1, row band 4
        let (x, y) = (4 * 48 + 24, 4 * 48 + 24);
        assert_eq!(sheet.get_pixel(x, y).a, 255);
        assert_eq!(sheet.get_pixel(0, 0).a, 0);
    }
}
