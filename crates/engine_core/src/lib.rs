//! Shared building blocks for the airship flight scene.
//!
//! - Torus math and the canonical [`TransformState`]
//! - Frame clock for the fixed-step loop
//! - Per-module event queues and the scene module lifecycle
//! - Launch phase machine and transition guards

pub mod events;
pub mod lifecycle;
pub mod phase;
pub mod time;
pub mod transform;

pub use events::*;
pub use lifecycle::*;
pub use phase::*;
pub use time::*;
pub use transform::*;

pub use glam::{UVec2, Vec2};
