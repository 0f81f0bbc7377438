use serde::Deserialize;
use voxmap_grid::VoxelId;

/// On-disk registry layout:
///
/// ```toml
/// [[voxels]]
/// id = 1
/// name = "hull"
/// material = "materials/hull.mat"
/// mesh = "meshes/cube.obj"
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub voxels: Vec<VoxelDef>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct VoxelDef {
    pub id: VoxelId,
    #[serde(default)]
    pub name: Option<String>,
    pub material: String,
    #[serde(default)]
    pub mesh: Option<String>,
}
