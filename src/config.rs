use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use voxmap_geom::Vec3;
use voxmap_runtime::GenerationParams;

use crate::shapes::{Aabb, Ellipsoid, Solid, Sphere};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config toml: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Generation run description:
///
/// ```toml
/// [generation]
/// voxel_size = 0.5
/// voxel_id = 1
///
/// [solid]
/// kind = "sphere"
/// center = [0.0, 0.0, 0.0]
/// radius = 8.0
/// ```
#[derive(Clone, Debug, Deserialize)]
pub struct GenerateConfig {
    #[serde(default)]
    pub generation: Generation,
    pub solid: SolidConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Generation {
    #[serde(default = "default_voxel_size")]
    pub voxel_size: f32,
    #[serde(default = "default_voxel_id")]
    pub voxel_id: i32,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_yield_ms")]
    pub yield_ms: u64,
}
fn default_voxel_size() -> f32 { 1.0 }
fn default_voxel_id() -> i32 { 1 }
fn default_workers() -> usize { 5 }
fn default_queue_capacity() -> usize { 4096 }
fn default_yield_ms() -> u64 { 100 }

impl Default for Generation {
    fn default() -> Self {
        Self {
            voxel_size: default_voxel_size(),
            voxel_id: default_voxel_id(),
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            yield_ms: default_yield_ms(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SolidConfig {
    Sphere { center: [f32; 3], radius: f32 },
    Box { min: [f32; 3], max: [f32; 3] },
    Ellipsoid { center: [f32; 3], radii: [f32; 3] },
}

fn v3(a: [f32; 3]) -> Vec3 {
    Vec3::new(a[0], a[1], a[2])
}

impl SolidConfig {
    pub fn build(&self) -> Box<dyn Solid> {
        match *self {
            SolidConfig::Sphere { center, radius } => Box::new(Sphere {
                center: v3(center),
                radius,
            }),
            SolidConfig::Box { min, max } => Box::new(Aabb {
                min: v3(min),
                max: v3(max),
            }),
            SolidConfig::Ellipsoid { center, radii } => Box::new(Ellipsoid {
                center: v3(center),
                radii: v3(radii),
            }),
        }
    }
}

impl GenerateConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&s)
    }

    /// Parameters covering the solid's bounding box.
    pub fn params(&self, solid: &dyn Solid) -> GenerationParams {
        let (min, max) = solid.bounds();
        let g = &self.generation;
        GenerationParams {
            min,
            max,
            voxel_size: g.voxel_size,
            voxel_id: g.voxel_id,
            workers: g.workers,
            queue_capacity: g.queue_capacity,
            yield_interval: Duration::from_millis(g.yield_ms),
        }
    }
}
