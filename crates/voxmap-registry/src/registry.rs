use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use voxmap_grid::{EMPTY, VoxelId};

use crate::config::{RegistryConfig, VoxelDef};

/// Dense index of a distinct material key, assigned in sorted key order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u16);

#[derive(Clone, Debug, PartialEq)]
pub struct VoxelDefinition {
    pub id: VoxelId,
    pub name: String,
    pub material: String,
    pub material_id: MaterialId,
    pub reference_mesh: Option<String>,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read registry {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid registry toml: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("voxel id {0} is defined more than once")]
    DuplicateId(VoxelId),
    #[error("voxel id {0} is reserved; ids must be positive")]
    ReservedId(VoxelId),
    #[error("too many distinct materials ({0})")]
    TooManyMaterials(usize),
}

#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
#[error("no voxel definition registered for id {voxel_id}")]
pub struct MissingDefinitionError {
    pub voxel_id: VoxelId,
}

/// Read-only id -> definition lookup handed to the mesh builder.
#[derive(Default, Clone, Debug)]
pub struct VoxelRegistry {
    by_id: HashMap<VoxelId, VoxelDefinition>,
    materials: Vec<String>,
}

impl VoxelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self, RegistryError> {
        let cfg: RegistryConfig = toml::from_str(toml_str)?;
        Self::from_config(cfg)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let s = fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let reg = Self::from_toml_str(&s)?;
        log::info!("loaded {} voxel definition(s) from {}", reg.len(), path.display());
        Ok(reg)
    }

    pub fn from_config(cfg: RegistryConfig) -> Result<Self, RegistryError> {
        Self::from_defs(cfg.voxels)
    }

    pub fn from_defs(defs: impl IntoIterator<Item = VoxelDef>) -> Result<Self, RegistryError> {
        let defs: Vec<VoxelDef> = defs.into_iter().collect();
        // Sort keys so MaterialId assignment does not depend on file order.
        let mut keys: Vec<&str> = defs.iter().map(|d| d.material.as_str()).collect();
        keys.sort_unstable();
        keys.dedup();
        if keys.len() > u16::MAX as usize {
            return Err(RegistryError::TooManyMaterials(keys.len()));
        }
        let materials: Vec<String> = keys.into_iter().map(str::to_owned).collect();

        let mut by_id = HashMap::with_capacity(defs.len());
        for def in defs {
            if def.id <= EMPTY {
                return Err(RegistryError::ReservedId(def.id));
            }
            if by_id.contains_key(&def.id) {
                return Err(RegistryError::DuplicateId(def.id));
            }
            let ix = materials
                .binary_search(&def.material)
                .unwrap_or_default();
            let name = def.name.unwrap_or_else(|| format!("voxel_{}", def.id));
            log::debug!("registered voxel {} '{}' -> {}", def.id, name, def.material);
            by_id.insert(
                def.id,
                VoxelDefinition {
                    id: def.id,
                    name,
                    material: def.material,
                    material_id: MaterialId(ix as u16),
                    reference_mesh: def.mesh,
                },
            );
        }
        Ok(Self { by_id, materials })
    }

    #[inline]
    pub fn get(&self, id: VoxelId) -> Option<&VoxelDefinition> {
        self.by_id.get(&id)
    }

    pub fn definition(&self, id: VoxelId) -> Result<&VoxelDefinition, MissingDefinitionError> {
        self.get(id).ok_or(MissingDefinitionError { voxel_id: id })
    }

    pub fn material_key(&self, id: MaterialId) -> Option<&str> {
        self.materials.get(id.0 as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> Vec<VoxelId> {
        let mut ids: Vec<VoxelId> = self.by_id.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
