//! Rendering for the airship flight scene: the projected field, weather post effects and the
//! assets they sample. A wgpu backend and a CPU rasteriser share the same shading math.

pub mod assets;
pub mod atlas;
pub mod config;
pub mod pipeline;
pub mod program;
pub mod projection;
pub mod renderer;
pub mod shading;
pub mod software;
pub mod texture;
pub mod uniforms;
pub mod weather_fx;

pub use assets::*;
pub use atlas::*;
pub use config::*;
pub use program::*;
pub use projection::*;
pub use renderer::*;
pub use shading::FieldTextures;
pub use software::*;
pub use uniforms::*;
