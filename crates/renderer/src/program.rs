//! Selects and validates the shading program for a backend.

use crate::config::{Backend, RenderConfig};
use crate::weather_fx::entry_point;
use thiserror::Error;
use world::WeatherKind;

pub const FIELD_WGSL: &str = include_str!("shaders/field.wgsl");
pub const WEATHER_WGSL: &str = include_str!("shaders/weather.wgsl");

pub const FIELD_VERTEX_ENTRY: &str = "vs_main";
pub const FIELD_FRAGMENT_ENTRY: &str = "fs_main";
/// Weather-pass entry that copies the field image unchanged.
pub const PASSTHROUGH_ENTRY: &str = "fs_passthrough";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgramError {
    #[error("{shader} is missing entry point `{entry}`")]
    MissingEntryPoint { shader: &'static str, entry: &'static str },
    #[error("software downscale must be at least 1")]
    InvalidDownscale,
}

/// WGSL sources for the field pass and the weather post pass.
#[derive(Debug, Clone)]
pub struct GpuProgram {
    pub field_source: &'static str,
    pub weather_source: &'static str,
}

impl GpuProgram {
    /// Weather fragment entry for `kind`.
    pub fn weather_entry(&self, kind: WeatherKind) -> &'static str {
        entry_point(kind).unwrap_or(PASSTHROUGH_ENTRY)
    }

    /// Every weather fragment entry, passthrough included.
    pub fn weather_entries(&self) -> Vec<&'static str> {
        let mut entries: Vec<&'static str> = WeatherKind::ALL.iter().filter_map(|k| entry_point(*k)).collect();
        entries.push(PASSTHROUGH_ENTRY);
        entries
    }
}

#[derive(Debug, Clone)]
pub enum CompiledProgram {
    Gpu(GpuProgram),
    /// Frames are shaded on the CPU at `1/downscale` of the window size.
    Software { downscale: u32 },
}

impl CompiledProgram {
    pub fn backend(&self) -> Backend {
        match self {
            CompiledProgram::Gpu(_) => Backend::Gpu,
            CompiledProgram::Software { .. } => Backend::Software,
        }
    }
}

fn has_entry(source: &str, entry: &str) -> bool {
    source.contains(&format!("fn {}(", entry))
}

fn require(shader: &'static str, source: &str, entry: &'static str) -> Result<(), ProgramError> {
    if has_entry(source, entry) {
        Ok(())
    } else {
        Err(ProgramError::MissingEntryPoint { shader, entry })
    }
}

/// Build the program for the configured backend.
pub fn compile(config: &RenderConfig) -> Result<CompiledProgram, ProgramError> {
    compile_sources(config, FIELD_WGSL, WEATHER_WGSL)
}

fn compile_sources(
    config: &RenderConfig,
    field_source: &'static str,
    weather_source: &'static str,
) -> Result<CompiledProgram, ProgramError> {
    match config.backend {
        Backend::Gpu => {
            require("field.wgsl", field_source, FIELD_VERTEX_ENTRY)?;
            require("field.wgsl", field_source, FIELD_FRAGMENT_ENTRY)?;
            let program = GpuProgram {
                field_source,
                weather_source,
            };
            require("weather.wgsl", weather_source, FIELD_VERTEX_ENTRY)?;
            for entry in program.weather_entries() {
                require("weather.wgsl", weather_source, entry)?;
            }
            log::info!("Compiled GPU program ({} weather entries)", program.weather_entries().len());
            Ok(CompiledProgram::Gpu(program))
        }
        Backend::Software => {
            if config.software_downscale == 0 {
                return Err(ProgramError::InvalidDownscale);
            }
            log::info!("Using software renderer at 1/{} resolution", config.software_downscale);
            Ok(CompiledProgram::Software {
                downscale: config.software_downscale,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_shaders_have_every_entry_point() {
        let program = compile(&RenderConfig::default()).unwrap();
        let CompiledProgram::Gpu(gpu) = program else {
            panic!("default backend is the GPU");
        };
        assert_eq!(gpu.weather_entries().len(), 7);
        assert_eq!(gpu.weather_entry(WeatherKind::Clear), PASSTHROUGH_ENTRY);
        assert_eq!(gpu.weather_entry(WeatherKind::Snow), "fs_snow");
    }

    #[test]
    fn missing_entry_is_reported() {
        let err = compile_sources(&RenderConfig::default(), FIELD_WGSL, "fn vs_main() {}").unwrap_err();
        assert!(matches!(err, ProgramError::MissingEntryPoint { shader: "weather.wgsl", .. }));
    }

    #[test]
    fn software_backend_validates_downscale() {
        let mut config = RenderConfig {
            backend: Backend::Software,
            ..RenderConfig::default()
        };
        assert!(matches!(compile(&config), Ok(CompiledProgram::Software { downscale: 4 })));
        config.software_downscale = 0;
        assert_eq!(compile(&config).unwrap_err(), ProgramError::InvalidDownscale);
    }
}
