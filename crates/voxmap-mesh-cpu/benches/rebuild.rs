use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use voxmap_geom::IVec3;
use voxmap_grid::VoxelGrid;
use voxmap_mesh_cpu::VoxelMesh;
use voxmap_registry::{VoxelDef, VoxelRegistry};

fn sphere(radius: i32) -> VoxelGrid {
    let mut grid = VoxelGrid::new();
    let d = radius * 2;
    for z in 0..=d {
        for y in 0..=d {
            for x in 0..=d {
                let p = IVec3::new(x - radius, y - radius, z - radius);
                if p.length_squared() <= (radius as i64).pow(2) {
                    grid.set(x, y, z, 1 + (y % 2)).unwrap();
                }
            }
        }
    }
    grid
}

fn registry() -> Arc<VoxelRegistry> {
    let defs = [1, 2].map(|id| VoxelDef {
        id,
        name: None,
        material: format!("mat{id}"),
        mesh: None,
    });
    Arc::new(VoxelRegistry::from_defs(defs).unwrap())
}

fn bench_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("voxel_mesh");
    let reg = registry();
    let grid = sphere(24);
    group.bench_function("rebuild_sphere_r24", |b| {
        b.iter(|| {
            let mut mesh = VoxelMesh::new(reg.clone());
            mesh.rebuild(black_box(&grid));
            black_box(mesh.face_count())
        })
    });
    group.bench_function("carve_and_restore_center", |b| {
        let mut grid = grid.clone();
        let mut mesh = VoxelMesh::new(reg.clone());
        mesh.rebuild(&grid);
        let center = IVec3::new(24, 24, 24);
        b.iter(|| {
            let id = mesh.remove_voxel(&mut grid, center).unwrap().unwrap_or(1);
            mesh.add_voxel(&mut grid, center, id).unwrap();
            mesh.update();
        })
    });
    group.finish();
}

criterion_group!(benches, bench_rebuild);
criterion_main!(benches);
