//! Map and image sources for the scene: files from the config, generated placeholders otherwise.

use crate::config::AirshipConfig;
use procgen::{build_demo_map, marker_sheet, DemoMapConfig, WorldGenerator, MARKER_SHEET};
use renderer::{AssetKey, AssetLoader, SceneAssets};
use std::path::Path;
use world::MapData;

/// The field map the scene flies over.
pub struct FieldMap {
    pub map: MapData,
    /// Built from the generator rather than read from disk.
    pub generated: bool,
}

/// Load the configured map, falling back to the generated demo map.
pub fn load_map(config: &AirshipConfig) -> FieldMap {
    if let Some(path) = &config.map_path {
        match MapData::load(path) {
            Ok(map) => return FieldMap { map, generated: false },
            Err(e) => log::warn!("{}, using the generated map", e),
        }
    }
    let generator = WorldGenerator::new(config.worldgen.clone());
    let demo = DemoMapConfig {
        width: config.world.map_width,
        height: config.world.map_height,
        landmark_count: config.demo_landmarks,
        ..DemoMapConfig::default()
    };
    FieldMap {
        map: build_demo_map(&generator, &demo),
        generated: true,
    }
}

/// Images available before any file loads: generated stand-ins for unset paths and the marker sheet.
pub fn seed_assets(config: &AirshipConfig, map: &FieldMap) -> SceneAssets {
    let mut assets = SceneAssets::new();
    let render = &config.render;
    let missing = [
        render.world_map_image.is_none(),
        render.water_mask_image.is_none(),
        render.height_map_image.is_none(),
    ];
    if missing.iter().any(|m| *m) {
        let generated = WorldGenerator::new(config.worldgen.clone()).generate();
        let images = [
            (AssetKey::WorldMap, generated.color),
            (AssetKey::WaterMask, generated.water_mask),
            (AssetKey::HeightMap, generated.height_map),
        ];
        for ((key, image), missing) in images.into_iter().zip(missing) {
            if missing {
                assets.insert(key, image);
            }
        }
    }
    if map.generated {
        assets.insert(AssetKey::Sheet(MARKER_SHEET.to_string()), marker_sheet());
    }
    assets
}

/// Queue every configured image file and every sprite sheet not already present.
pub fn request_assets(loader: &mut AssetLoader, config: &AirshipConfig, assets: &SceneAssets, sheets: &[String]) {
    let render = &config.render;
    let mut requests = Vec::new();
    for (key, path) in [
        (AssetKey::WorldMap, &render.world_map_image),
        (AssetKey::WaterMask, &render.water_mask_image),
        (AssetKey::HeightMap, &render.height_map_image),
    ] {
        if let Some(path) = path {
            requests.push((key, Path::new(path).to_path_buf()));
        }
    }
    for name in sheets.iter().filter(|name| assets.sheet(name).is_none()) {
        let path = Path::new(&render.sprite_dir).join(format!("{}.png", name));
        requests.push((AssetKey::Sheet(name.clone()), path));
    }
    for (key, path) in requests {
        if let Err(e) = loader.request(key, path) {
            log::warn!("Could not queue asset load: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> AirshipConfig {
        let mut config = AirshipConfig::default();
        config.worldgen.image_size = 16;
        config.world.map_width = 24;
        config.world.map_height = 24;
        config.demo_landmarks = 4;
        config
    }

    #[test]
    fn missing_map_file_falls_back_to_demo() {
        let mut config = small_config();
        config.map_path = Some("does/not/exist.json".to_string());
        let field = load_map(&config);
        assert!(field.generated);
        assert_eq!(field.map.size().x, 24);
    }

    #[test]
    fn generated_images_fill_unset_paths() {
        let config = small_config();
        let field = load_map(&config);
        let assets = seed_assets(&config, &field);
        assert_eq!(assets.world().width, 16);
        assert_eq!(assets.height().width, 16);
        assert!(assets.sheet(MARKER_SHEET).is_some());
    }

    #[test]
    fn configured_image_paths_keep_fallbacks() {
        let mut config = small_config();
        config.render.world_map_image = Some("world.png".to_string());
        let field = load_map(&config);
        let assets = seed_assets(&config, &field);
        assert_eq!(assets.world().width, 1, "world image waits for the loader");
        assert_eq!(assets.water().width, 16);
    }
}
