use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;
use voxmap_geom::IVec3;
use voxmap_grid::VoxelGrid;
use voxmap_mesh_cpu::{VoxelFace, VoxelMesh};
use voxmap_registry::{VoxelDef, VoxelRegistry};

fn registry() -> Arc<VoxelRegistry> {
    let defs = (1..=3).map(|id| VoxelDef {
        id,
        name: None,
        material: "stone".into(),
        mesh: None,
    });
    Arc::new(VoxelRegistry::from_defs(defs).unwrap())
}

fn surface(mesh: &VoxelMesh) -> BTreeMap<VoxelFace, i32> {
    mesh.faces()
        .map(|vf| (vf, mesh.face_voxel(&vf).unwrap()))
        .collect()
}

fn cell() -> impl Strategy<Value = (i32, i32, i32)> {
    (0..5i32, 0..5i32, 0..5i32)
}

proptest! {
    #[test]
    fn incremental_edits_match_full_rebuild(
        initial in prop::collection::vec((cell(), 1..=3i32), 0..40),
        edits in prop::collection::vec((cell(), 0..=3i32), 1..40),
    ) {
        let reg = registry();
        let mut grid = VoxelGrid::new();
        for ((x, y, z), v) in initial {
            grid.set(x, y, z, v).unwrap();
        }
        let mut mesh = VoxelMesh::new(reg.clone());
        mesh.rebuild(&grid);
        for ((x, y, z), v) in edits {
            let pos = IVec3::new(x, y, z);
            if v == 0 {
                mesh.remove_voxel(&mut grid, pos).unwrap();
            } else {
                mesh.add_voxel(&mut grid, pos, v).unwrap();
            }
        }
        mesh.update();

        let mut fresh = VoxelMesh::new(reg);
        fresh.rebuild(&grid);
        prop_assert_eq!(surface(&mesh), surface(&fresh));
        prop_assert_eq!(mesh.stats().vertices, fresh.stats().vertices);
    }
}
