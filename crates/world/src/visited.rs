//! Places the player has visited on foot, used to gate landmark names.

use engine_core::{UVec2, Vec2};
use serde::{Deserialize, Serialize};

/// World-unit tolerance (per axis) when matching a place to a landmark.
pub const WORLD_MATCH_RANGE: f32 = 200.0;
/// Tile tolerance (per axis) when matching by field coordinates.
pub const FIELD_MATCH_RANGE: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitedPlace {
    pub map_id: u32,
    pub event_id: u32,
    pub name: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub icon: u32,
    #[serde(default)]
    pub description: String,
    /// Tile on the field map where the place sits.
    #[serde(default)]
    pub field: Option<[u32; 2]>,
    /// Position in flight-world units.
    #[serde(default)]
    pub world: Option<[f32; 2]>,
}

impl VisitedPlace {
    pub fn new(map_id: u32, event_id: u32, name: impl Into<String>, kind: impl Into<String>) -> Self {
        let kind = kind.into();
        Self {
            map_id,
            event_id,
            name: name.into(),
            icon: icon_for_kind(&kind),
            kind,
            description: String::new(),
            field: None,
            world: None,
        }
    }

    pub fn with_field(mut self, tile: UVec2) -> Self {
        self.field = Some(tile.to_array());
        self
    }

    pub fn with_world(mut self, position: Vec2) -> Self {
        self.world = Some(position.to_array());
        self
    }

    /// World coordinates take precedence; field tiles are only consulted without them.
    pub fn matches(&self, landmark_world: Vec2, landmark_tile: UVec2) -> bool {
        if let Some([x, y]) = self.world {
            return (x - landmark_world.x).abs() <= WORLD_MATCH_RANGE
                && (y - landmark_world.y).abs() <= WORLD_MATCH_RANGE;
        }
        if let Some([x, y]) = self.field {
            return x.abs_diff(landmark_tile.x) <= FIELD_MATCH_RANGE
                && y.abs_diff(landmark_tile.y) <= FIELD_MATCH_RANGE;
        }
        false
    }
}

/// Icon index for a place kind.
pub fn icon_for_kind(kind: &str) -> u32 {
    match kind {
        "town" => 176,
        "castle" => 177,
        "dungeon" => 191,
        "forest" => 192,
        _ => 190,
    }
}

/// Answers "has the player been here?" for name disclosure.
pub trait VisitedLookup {
    fn is_visited(&self, landmark_world: Vec2, landmark_tile: UVec2) -> bool;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisitedPlaces {
    places: Vec<VisitedPlace>,
}

impl VisitedPlaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// One entry per map: adding a place for a known map replaces it.
    pub fn add(&mut self, place: VisitedPlace) {
        if let Some(existing) = self.places.iter_mut().find(|p| p.map_id == place.map_id) {
            *existing = place;
        } else {
            log::debug!("Visited {} (map {})", place.name, place.map_id);
            self.places.push(place);
        }
    }

    pub fn is_place_visited(&self, map_id: u32, event_id: u32) -> bool {
        self.places
            .iter()
            .any(|p| p.map_id == map_id && p.event_id == event_id)
    }

    pub fn places(&self) -> &[VisitedPlace] {
        &self.places
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    pub fn clear(&mut self) {
        self.places.clear();
    }
}

impl VisitedLookup for VisitedPlaces {
    fn is_visited(&self, landmark_world: Vec2, landmark_tile: UVec2) -> bool {
        self.places
            .iter()
            .any(|p| p.matches(landmark_world, landmark_tile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_dedupes_by_map() {
        let mut visited = VisitedPlaces::new();
        visited.add(VisitedPlace::new(2, 5, "Aldra", "town"));
        visited.add(VisitedPlace::new(2, 6, "Aldra Keep", "castle"));
        visited.add(VisitedPlace::new(3, 1, "Mire", "dungeon"));
        assert_eq!(visited.len(), 2);
        assert!(visited.is_place_visited(2, 6));
        assert!(!visited.is_place_visited(2, 5), "re-adding a map replaces the entry");
        assert_eq!(visited.places()[1].icon, 191);
        visited.clear();
        assert!(visited.is_empty());
    }

    #[test]
    fn matches_by_world_then_field() {
        let mut visited = VisitedPlaces::new();
        visited.add(VisitedPlace::new(2, 1, "A", "town").with_world(Vec2::new(1000.0, 1000.0)));
        visited.add(VisitedPlace::new(3, 1, "B", "town").with_field(UVec2::new(40, 40)));
        assert!(visited.is_visited(Vec2::new(1190.0, 810.0), UVec2::new(0, 0)));
        assert!(!visited.is_visited(Vec2::new(1201.0, 1000.0), UVec2::new(0, 0)));
        assert!(visited.is_visited(Vec2::new(0.0, 0.0), UVec2::new(43, 37)));
        assert!(!visited.is_visited(Vec2::new(0.0, 0.0), UVec2::new(44, 40)));
    }

    #[test]
    fn world_coordinates_shadow_field_match() {
        let place = VisitedPlace::new(1, 1, "C", "town")
            .with_world(Vec2::new(5000.0, 5000.0))
            .with_field(UVec2::new(10, 10));
        assert!(!place.matches(Vec2::new(0.0, 0.0), UVec2::new(10, 10)));
    }
}
