//! World data for the flight scene.
//!
//! - Tile map loading, tile/world conversions and the land-ok oracle
//! - Landmark collection, atlas layout and name disclosure
//! - Region-driven weather state
//! - Visited-place tracking

pub mod landmark;
pub mod map;
pub mod visited;
pub mod weather;

pub use landmark::*;
pub use map::*;
pub use visited::*;
pub use weather::*;
