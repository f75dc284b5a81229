//! Landing and interior transfers out of the flight scene.

use engine_core::{InFlightGuard, UVec2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Map holding the airship interior.
    #[serde(default = "default_interior_map_id")]
    pub interior_map_id: u32,
    #[serde(default = "default_interior_tile")]
    pub interior_tile: [u32; 2],
    /// Facing on arrival (2 = down, 4 = left, 6 = right, 8 = up).
    #[serde(default = "default_direction")]
    pub interior_direction: u8,
    #[serde(default = "default_land_refused_message")]
    pub land_refused_message: String,
}

fn default_interior_map_id() -> u32 {
    1
}
fn default_interior_tile() -> [u32; 2] {
    [10, 10]
}
fn default_direction() -> u8 {
    2
}
fn default_land_refused_message() -> String {
    "Cannot land here!".to_string()
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            interior_map_id: default_interior_map_id(),
            interior_tile: default_interior_tile(),
            interior_direction: default_direction(),
            land_refused_message: default_land_refused_message(),
        }
    }
}

/// Request for the host to move the player onto a tile map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    pub map_id: u32,
    pub tile: UVec2,
    pub direction: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LandingOutcome {
    Transfer(TransferRequest),
    /// Landing was refused; the message is shown to the player.
    Refused(String),
    /// A transfer is already in flight.
    Ignored,
}

/// Turns landing/interior requests into transfer requests, at most one per scene.
#[derive(Debug)]
pub struct TransferGate {
    config: TransferConfig,
    return_map_id: u32,
    return_direction: u8,
    landing: InFlightGuard,
    interior: InFlightGuard,
}

impl TransferGate {
    /// `return_map_id` is the field map the flight took off from.
    pub fn new(config: TransferConfig, return_map_id: u32, return_direction: u8) -> Self {
        Self {
            config,
            return_map_id,
            return_direction,
            landing: InFlightGuard::new(),
            interior: InFlightGuard::new(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.landing.is_active() || self.interior.is_active()
    }

    /// Land on `tile` if the land-ok oracle allows it.
    pub fn request_landing(&mut self, tile: UVec2, land_ok: bool) -> LandingOutcome {
        if self.is_busy() {
            return LandingOutcome::Ignored;
        }
        if !land_ok {
            log::info!("Landing refused at tile ({}, {})", tile.x, tile.y);
            return LandingOutcome::Refused(self.config.land_refused_message.clone());
        }
        self.landing.try_begin();
        log::info!("Landing on map {} at ({}, {})", self.return_map_id, tile.x, tile.y);
        LandingOutcome::Transfer(TransferRequest {
            map_id: self.return_map_id,
            tile,
            direction: self.return_direction,
        })
    }

    pub fn request_interior(&mut self) -> LandingOutcome {
        if self.is_busy() || !self.interior.try_begin() {
            return LandingOutcome::Ignored;
        }
        let [x, y] = self.config.interior_tile;
        log::info!("Entering airship interior (map {})", self.config.interior_map_id);
        LandingOutcome::Transfer(TransferRequest {
            map_id: self.config.interior_map_id,
            tile: UVec2::new(x, y),
            direction: self.config.interior_direction,
        })
    }

    /// Clear both guards. Called on scene teardown.
    pub fn reset(&mut self) {
        self.landing.reset();
        self.interior.reset();
    }
}
