//! Flight save/resume: the four transform scalars plus the places visited on foot.

use anyhow::{Context, Result};
use engine_core::SavedFlight;
use renderer::ViewMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use world::VisitedPlaces;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveData {
    pub flight: SavedFlight,
    #[serde(default)]
    pub view: ViewMode,
    #[serde(default)]
    pub visited: VisitedPlaces,
}

impl SaveData {
    /// Read a save. A missing file is a fresh start; an unreadable one is logged and ignored.
    pub fn load(path: &Path) -> Option<Self> {
        let data = std::fs::read_to_string(path).ok()?;
        match ron::from_str(&data) {
            Ok(save) => {
                log::info!("Resuming flight from {:?}", path);
                Some(save)
            }
            Err(e) => {
                log::warn!("Invalid save at {:?}: {}, starting fresh", path, e);
                None
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let s = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .context("serializing flight save")?;
        std::fs::write(path, s).with_context(|| format!("writing {:?}", path))?;
        log::debug!("Saved flight to {:?}", path);
        Ok(())
    }
}
