//! Non-blocking image loading and the scene's texture set.
//!
//! Decoding happens on a loader thread. Results come back over a channel and are polled once per
//! frame; until an image arrives (or if it fails) the scene renders with a fallback.

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use procgen::{Pixel, TextureData};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::thread;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("asset loader thread has stopped")]
    Disconnected,
}

/// What a loaded image is used for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetKey {
    WorldMap,
    WaterMask,
    HeightMap,
    /// Tileset or character sheet, by name.
    Sheet(String),
}

struct LoadRequest {
    key: AssetKey,
    path: PathBuf,
}

/// A finished load, handed back to the frame loop.
pub struct LoadResult {
    pub key: AssetKey,
    pub result: Result<TextureData, AssetError>,
}

/// Read and decode an image file into RGBA8.
pub fn decode_image(path: &Path) -> Result<TextureData, AssetError> {
    let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let image = image::load_from_memory(&bytes)
        .map_err(|source| AssetError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();
    let (width, height) = image.dimensions();
    let data = TextureData::from_rgba8(width, height, image.as_raw());
    // to_rgba8 always yields width * height * 4 bytes
    Ok(data.unwrap_or_else(|| TextureData::new(width, height)))
}

/// Background decoder. Each request resolves exactly once through [`AssetLoader::poll`].
pub struct AssetLoader {
    requests: Option<Sender<LoadRequest>>,
    results: Receiver<LoadResult>,
    pending: HashSet<AssetKey>,
    worker: Option<thread::JoinHandle<()>>,
}

impl AssetLoader {
    pub fn spawn() -> Self {
        let (request_tx, request_rx) = unbounded::<LoadRequest>();
        let (result_tx, result_rx) = unbounded();
        let worker = thread::Builder::new()
            .name("asset-loader".into())
            .spawn(move || {
                for request in request_rx {
                    log::debug!("Decoding {}", request.path.display());
                    let result = decode_image(&request.path);
                    if result_tx
                        .send(LoadResult {
                            key: request.key,
                            result,
                        })
                        .is_err()
                    {
                        break;
                    }
                }
            });
        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("Failed to start asset loader thread: {}", e);
                None
            }
        };
        Self {
            requests: worker.as_ref().map(|_| request_tx),
            results: result_rx,
            pending: HashSet::new(),
            worker,
        }
    }

    /// Queue a load. A key that is already pending is not requested twice.
    pub fn request(&mut self, key: AssetKey, path: impl Into<PathBuf>) -> Result<(), AssetError> {
        if self.pending.contains(&key) {
            return Ok(());
        }
        let sender = self.requests.as_ref().ok_or(AssetError::Disconnected)?;
        sender
            .send(LoadRequest {
                key: key.clone(),
                path: path.into(),
            })
            .map_err(|_| AssetError::Disconnected)?;
        self.pending.insert(key);
        Ok(())
    }

    /// True once `key` is no longer waiting on the loader (loaded, failed or never requested).
    pub fn is_ready(&self, key: &AssetKey) -> bool {
        !self.pending.contains(key)
    }

    /// Drain finished loads without blocking.
    pub fn poll(&mut self) -> Vec<LoadResult> {
        let mut done = Vec::new();
        loop {
            match self.results.try_recv() {
                Ok(result) => {
                    if self.pending.remove(&result.key) {
                        done.push(result);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    for key in self.pending.drain() {
                        done.push(LoadResult {
                            key,
                            result: Err(AssetError::Disconnected),
                        });
                    }
                    break;
                }
            }
        }
        done
    }
}

impl Drop for AssetLoader {
    fn drop(&mut self) {
        self.requests = None;
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Flat land colour shown until the world image arrives.
pub const FALLBACK_WORLD: Pixel = Pixel::new(86, 128, 72, 255);

/// Textures the field pass samples, with fallbacks for anything missing.
pub struct SceneAssets {
    world: TextureData,
    water: TextureData,
    height: TextureData,
    sheets: HashMap<String, TextureData>,
    revision: u64,
}

impl Default for SceneAssets {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneAssets {
    pub fn new() -> Self {
        Self {
            world: TextureData::filled(1, 1, FALLBACK_WORLD),
            // no water
            water: TextureData::filled(1, 1, Pixel::grey(0.0)),
            height: TextureData::filled(1, 1, Pixel::grey(0.5)),
            sheets: HashMap::new(),
            revision: 0,
        }
    }

    pub fn insert(&mut self, key: AssetKey, data: TextureData) {
        match key {
            AssetKey::WorldMap => self.world = data,
            AssetKey::WaterMask => self.water = data,
            AssetKey::HeightMap => self.height = data,
            AssetKey::Sheet(name) => {
                self.sheets.insert(name, data);
            }
        }
        self.revision += 1;
    }

    /// Store finished loads. Failures keep the fallback.
    pub fn resolve(&mut self, results: Vec<LoadResult>) {
        for LoadResult { key, result } in results {
            match result {
                Ok(data) => {
                    log::info!("Loaded {:?} ({}x{})", key, data.width, data.height);
                    self.insert(key, data);
                }
                Err(e) => log::warn!("Using fallback for {:?}: {}", key, e),
            }
        }
    }

    pub fn world(&self) -> &TextureData {
        &self.world
    }

    pub fn water(&self) -> &TextureData {
        &self.water
    }

    pub fn height(&self) -> &TextureData {
        &self.height
    }

    pub fn sheet(&self, name: &str) -> Option<&TextureData> {
        self.sheets.get(name)
    }

    /// Bumped on every insert, so GPU copies can tell when to re-upload.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}
