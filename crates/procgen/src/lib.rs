//! Procedural placeholder content: seamless world images, a demo field map and landmark markers.

pub mod demo;
pub mod textures;
pub mod world_gen;

pub use demo::*;
pub use textures::*;
pub use world_gen::*;
