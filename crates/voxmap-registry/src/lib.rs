//! Voxel definitions: id -> material and reference mesh.
#![forbid(unsafe_code)]

pub mod config;
pub mod registry;

pub use config::{RegistryConfig, VoxelDef};
pub use registry::{MaterialId, MissingDefinitionError, RegistryError, VoxelDefinition, VoxelRegistry};
