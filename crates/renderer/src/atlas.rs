//! Time-sliced drawing of landmark sprites into the shared atlas.

use crate::assets::SceneAssets;
use procgen::{Pixel, TextureData};
use world::{
    atlas_cell_origin, character_sprite_source, tile_sprite_source, Landmark, SpriteSource, ATLAS_BATCH, ATLAS_CELL,
    ATLAS_SIZE,
};

struct AtlasJob {
    cell: usize,
    sprite: SpriteSource,
}

/// Draws [`ATLAS_BATCH`] cells per [`step`](AtlasBuilder::step) so atlas work never stalls a frame.
pub struct AtlasBuilder {
    atlas: TextureData,
    jobs: Vec<AtlasJob>,
    next: usize,
    tileset_names: Vec<String>,
    revision: u64,
}

impl AtlasBuilder {
    /// Jobs for every packed landmark; cell index follows the landmark's position in the slice.
    pub fn new(landmarks: &[Landmark], tileset_names: Vec<String>) -> Self {
        let jobs = landmarks
            .iter()
            .enumerate()
            .filter(|(_, lm)| lm.atlas_uv.is_some())
            .map(|(cell, lm)| AtlasJob {
                cell,
                sprite: lm.sprite.clone(),
            })
            .collect();
        Self {
            atlas: TextureData::filled(ATLAS_SIZE, ATLAS_SIZE, Pixel::TRANSPARENT),
            jobs,
            next: 0,
            tileset_names,
            revision: 0,
        }
    }

    /// Sheet names the jobs will read from.
    pub fn required_sheets(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .jobs
            .iter()
            .filter_map(|job| match &job.sprite {
                SpriteSource::Tile { tile_id } => self.tileset_names.get(tile_sprite_source(*tile_id).0).cloned(),
                SpriteSource::Character { sheet, .. } => Some(sheet.clone()),
                SpriteSource::None => None,
            })
            .filter(|name| !name.is_empty())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Draw the next batch. Returns true once every cell is drawn.
    pub fn step(&mut self, sheets: &SceneAssets) -> bool {
        let end = (self.next + ATLAS_BATCH).min(self.jobs.len());
        for index in self.next..end {
            let job = &self.jobs[index];
            let origin = atlas_cell_origin(job.cell);
            let to = [origin.x, origin.y, ATLAS_CELL, ATLAS_CELL];
            match &job.sprite {
                SpriteSource::Tile { tile_id } => {
                    let (sheet_index, sx, sy) = tile_sprite_source(*tile_id);
                    let sheet = self
                        .tileset_names
                        .get(sheet_index)
                        .and_then(|name| sheets.sheet(name));
                    match sheet {
                        Some(sheet) => self.atlas.blit_scaled(sheet, [sx, sy, ATLAS_CELL, ATLAS_CELL], to),
                        None => log::debug!("No tileset sheet {} for tile {}", sheet_index, tile_id),
                    }
                }
                SpriteSource::Character { sheet: name, index } => match sheets.sheet(name) {
                    Some(sheet) => {
                        let (x, y, w, h) = character_sprite_source(name, *index, sheet.width, sheet.height);
                        self.atlas.blit_scaled(sheet, [x, y, w, h], to);
                    }
                    None => log::debug!("No character sheet {:?}", name),
                },
                SpriteSource::None => {}
            }
        }
        if end > self.next {
            self.revision += 1;
        }
        self.next = end;
        if self.is_complete() && end > 0 {
            log::debug!("Landmark atlas complete ({} cells)", self.jobs.len());
        }
        self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        self.next >= self.jobs.len()
    }

    /// `(cells drawn, cells total)`
    pub fn progress(&self) -> (usize, usize) {
        (self.next, self.jobs.len())
    }

    pub fn atlas(&self) -> &TextureData {
        &self.atlas
    }

    /// Bumped whenever a batch is drawn.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}
