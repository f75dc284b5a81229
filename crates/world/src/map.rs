//! Tile map data in the tile-editor JSON layout.
//!
//! `data` holds six `width × height` layers: four tile layers (z = 0..3), a shadow layer and the
//! region layer (z = 5). The tileset flag table is indexed by tile id.

use engine_core::{UVec2, WorldGeometry};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Number of layers stored per map.
pub const LAYER_COUNT: usize = 6;
/// Layer holding region ids.
pub const REGION_LAYER: usize = 5;
/// Airship may land on this tile when the bit is clear.
pub const AIRSHIP_LAND_BIT: u32 = 0x800;
/// All four directional passage bits.
pub const PASSAGE_BITS: u32 = 0x0f;
/// Star tiles are drawn above the player and never decide passage.
pub const STAR_BIT: u32 = 0x10;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("failed to read map file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse map data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("map is {width}x{height} but has {actual} tile entries (expected {expected})")]
    DimensionMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventImage {
    #[serde(default)]
    pub tile_id: u32,
    #[serde(default)]
    pub character_name: String,
    #[serde(default)]
    pub character_index: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventPage {
    #[serde(default)]
    pub image: Option<EventImage>,
}

/// A placed map event. Landmarks are events tagged in their note.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapEvent {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub note: String,
    pub x: u32,
    pub y: u32,
    #[serde(default)]
    pub pages: Vec<EventPage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapData {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u32>,
    /// Index 0 is conventionally `null`.
    #[serde(default)]
    pub events: Vec<Option<MapEvent>>,
    /// Passage flags indexed by tile id.
    #[serde(default)]
    pub tileset_flags: Vec<u32>,
    /// Tileset sheet names; sheets 5.. hold the B–E object tiles.
    #[serde(default)]
    pub tileset_names: Vec<String>,
}

impl MapData {
    pub fn from_json_str(source: &str) -> Result<Self, MapError> {
        let map: MapData = serde_json::from_str(source)?;
        map.validate()?;
        Ok(map)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| MapError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let map = Self::from_json_str(&source)?;
        log::info!(
            "Loaded map {} ({}x{}, {} events)",
            path.display(),
            map.width,
            map.height,
            map.events.iter().flatten().count()
        );
        Ok(map)
    }

    fn validate(&self) -> Result<(), MapError> {
        let expected = self.width as usize * self.height as usize * LAYER_COUNT;
        if self.width == 0 || self.height == 0 || self.data.len() != expected {
            return Err(MapError::DimensionMismatch {
                width: self.width,
                height: self.height,
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    pub fn size(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    /// The configured world with this map's tile dimensions.
    pub fn geometry(&self, world: &WorldGeometry) -> WorldGeometry {
        world.with_map_size(self.width, self.height)
    }

    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }

    /// Tile id on layer `z`, or 0 when out of range.
    pub fn tile_id(&self, x: i64, y: i64, z: usize) -> u32 {
        if !self.in_bounds(x, y) || z >= LAYER_COUNT {
            return 0;
        }
        let index = (z * self.height as usize + y as usize) * self.width as usize + x as usize;
        self.data.get(index).copied().unwrap_or(0)
    }

    pub fn region_id(&self, tile: UVec2) -> u32 {
        self.tile_id(tile.x as i64, tile.y as i64, REGION_LAYER)
    }

    /// Walks the tile layers top-down; the first tile with a known, non-star flag decides.
    pub fn check_passage(&self, x: i64, y: i64, bit: u32) -> bool {
        for z in (0..4).rev() {
            let tile = self.tile_id(x, y, z);
            if tile == 0 {
                continue;
            }
            let Some(&flag) = self.tileset_flags.get(tile as usize) else {
                continue;
            };
            if flag & STAR_BIT != 0 {
                continue;
            }
            return flag & bit == 0;
        }
        false
    }

    /// Land-ok oracle: the tile must allow airship landing and be walkable.
    pub fn is_airship_land_ok(&self, x: i64, y: i64) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        self.check_passage(x, y, AIRSHIP_LAND_BIT) && self.check_passage(x, y, PASSAGE_BITS)
    }

    pub fn events(&self) -> impl Iterator<Item = &MapEvent> {
        self.events.iter().flatten()
    }

    /// Copy of the region layer for weather lookups.
    pub fn region_grid(&self) -> RegionGrid {
        let layer = self.width as usize * self.height as usize;
        let start = REGION_LAYER * layer;
        RegionGrid {
            width: self.width,
            height: self.height,
            regions: self.data.get(start..start + layer).map(<[u32]>::to_vec).unwrap_or_default(),
        }
    }
}

/// Region ids per tile, detached from the rest of the map.
#[derive(Debug, Clone, Default)]
pub struct RegionGrid {
    width: u32,
    height: u32,
    regions: Vec<u32>,
}

impl RegionGrid {
    pub fn new(width: u32, height: u32, regions: Vec<u32>) -> Self {
        Self {
            width,
            height,
            regions,
        }
    }

    /// Region id of a tile, 0 when outside the map.
    pub fn region_at(&self, tile: UVec2) -> u32 {
        if tile.x >= self.width || tile.y >= self.height {
            return 0;
        }
        let index = tile.y as usize * self.width as usize + tile.x as usize;
        self.regions.get(index).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2x2 map with one tile id per layer cell.
    fn map_with(layers: [[u32; 4]; 6], flags: Vec<u32>) -> MapData {
        MapData {
            width: 2,
            height: 2,
            data: layers.iter().flatten().copied().collect(),
            events: vec![None],
            tileset_flags: flags,
            tileset_names: Vec::new(),
        }
    }

    fn flags() -> Vec<u32> {
        let mut f = vec![0u32; 8];
        f[1] = 0x000; // grass: landable, walkable
        f[2] = 0x800; // forest: walkable, no landing
        f[3] = 0x00f; // mountain: blocked
        f[4] = 0x010; // star tile (never decides)
        f
    }

    #[test]
    fn top_layer_decides_first() {
        // tile (0,0): grass on z=0, mountain on z=1
        let map = map_with([[1, 1, 1, 1], [3, 0, 0, 0], [0; 4], [0; 4], [0; 4], [0; 4]], flags());
        assert!(!map.is_airship_land_ok(0, 0), "mountain on the upper layer wins");
        assert!(map.is_airship_land_ok(1, 0));
    }

    #[test]
    fn star_tiles_are_skipped() {
        let map = map_with([[1, 2, 0, 0], [0; 4], [0; 4], [4, 4, 4, 0], [0; 4], [0; 4]], flags());
        assert!(map.is_airship_land_ok(0, 0), "star over grass is landable");
        assert!(!map.is_airship_land_ok(1, 0), "forest forbids landing");
        assert!(!map.is_airship_land_ok(0, 1), "only a star tile means no decision");
        assert!(!map.is_airship_land_ok(1, 1), "no tile at all");
    }

    #[test]
    fn out_of_range_reads_are_zero() {
        let map = map_with([[1; 4], [0; 4], [0; 4], [0; 4], [0; 4], [7, 0, 0, 9]], flags());
        assert!(!map.is_airship_land_ok(-1, 0));
        assert!(!map.is_airship_land_ok(2, 0));
        assert_eq!(map.tile_id(5, 5, 0), 0);
        assert_eq!(map.region_id(UVec2::new(0, 0)), 7);
        assert_eq!(map.region_id(UVec2::new(1, 1)), 9);
        let grid = map.region_grid();
        assert_eq!(grid.region_at(UVec2::new(1, 1)), 9);
        assert_eq!(grid.region_at(UVec2::new(3, 1)), 0);
    }

    #[test]
    fn parses_editor_json_and_checks_dimensions() {
        let json = r#"{
            "width": 1, "height": 1,
            "data": [1, 0, 0, 0, 0, 3],
            "events": [null, {"id": 1, "name": "Town", "note": "<airshipVisible: true>", "x": 0, "y": 0,
                       "pages": [{"image": {"tileId": 0, "characterName": "Actor1", "characterIndex": 2}}]}],
            "tilesetFlags": [0, 0]
        }"#;
        let map = MapData::from_json_str(json).expect("valid map");
        assert_eq!(map.events().count(), 1);
        assert_eq!(map.region_id(UVec2::ZERO), 3);
        assert!(map.is_airship_land_ok(0, 0));

        let bad = r#"{"width": 2, "height": 2, "data": [0, 0, 0]}"#;
        assert!(matches!(MapData::from_json_str(bad), Err(MapError::DimensionMismatch { .. })));
    }
}
