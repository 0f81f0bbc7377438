//! Nearest occupied voxel lookup by expanding integer shells.
//!
//! Shell `r` holds every cell whose distance from the (rounded) centre cell rounds
//! to `r`, i.e. `(2r-1)^2 <= 4*d^2 < (2r+1)^2`. Shells partition the lattice, so
//! walking them in order never skips a cell.

use voxmap_geom::{IVec3, Vec3};

use crate::VoxelGrid;

/// Finds the occupied cell closest to `point`, given in grid-local voxel units.
///
/// Returns `None` for a grid without occupied cells.
pub fn find_nearest_voxel(grid: &VoxelGrid, point: Vec3) -> Option<IVec3> {
    if grid.is_empty() {
        return None;
    }
    let (columns, rows, pages) = grid.dimensions();
    let clamped = Vec3::new(
        point.x.clamp(0.0, (columns - 1) as f32),
        point.y.clamp(0.0, (rows - 1) as f32),
        point.z.clamp(0.0, (pages - 1) as f32),
    );
    let center = IVec3::from_rounded(clamped);
    if grid.is_occupied(center) {
        return Some(center);
    }

    let max_radius = shell_limit(center, columns, rows, pages);
    for r in 1..=max_radius {
        let mut best: Option<(f32, IVec3)> = None;
        walk_shell(grid, center, r, |cell| {
            if !grid.is_occupied(cell) {
                return;
            }
            let dist = cell.to_vec3().distance(point);
            if best.is_none_or(|(d, _)| dist < d) {
                best = Some((dist, cell));
            }
        });
        if let Some((dist, cell)) = best {
            log::trace!("nearest voxel to {point:?} is {cell} (shell {r}, distance {dist:.3})");
            return Some(cell);
        }
    }
    None
}

/// Same as [`find_nearest_voxel`] for a point in world space.
pub fn find_nearest_voxel_world(grid: &VoxelGrid, world: Vec3) -> Option<IVec3> {
    find_nearest_voxel(grid, grid.world_to_local(world))
}

/// Radius of the shell holding the grid cell farthest from `center`.
fn shell_limit(center: IVec3, columns: usize, rows: usize, pages: usize) -> i32 {
    let far = |c: i32, n: usize| -> i64 {
        let c = c as i64;
        c.max(n as i64 - 1 - c)
    };
    let dx = far(center.x, columns);
    let dy = far(center.y, rows);
    let dz = far(center.z, pages);
    ((dx * dx + dy * dy + dz * dz) as f64).sqrt().ceil() as i32
}

/// Visits the in-bounds cells of shell `r`, slice by slice along z and row by row
/// along y. Each row contributes the mirrored x span `lo..=hi` on both sides.
fn walk_shell(grid: &VoxelGrid, center: IVec3, r: i32, mut visit: impl FnMut(IVec3)) {
    let r64 = r as i64;
    let inner = (2 * r64 - 1) * (2 * r64 - 1);
    let outer = (2 * r64 + 1) * (2 * r64 + 1);
    let (columns, rows, pages) = grid.dimensions();

    for dz in -r..=r {
        let z = center.z + dz;
        if z < 0 || z as usize >= pages {
            continue;
        }
        for dy in -r..=r {
            let y = center.y + dy;
            if y < 0 || y as usize >= rows {
                continue;
            }
            let base = 4 * ((dy as i64) * (dy as i64) + (dz as i64) * (dz as i64));
            if base >= outer {
                continue;
            }
            let hi = max_span(outer - base);
            let lo = if base >= inner { 0 } else { min_span(inner - base) };
            for k in lo..=hi {
                let k = k as i32;
                for x in [center.x + k, center.x - k] {
                    if x >= 0 && (x as usize) < columns {
                        visit(IVec3::new(x, y, z));
                    }
                    if k == 0 {
                        break;
                    }
                }
            }
        }
    }
}

/// Largest `k >= 0` with `4k^2 < limit`. Requires `limit > 0`.
fn max_span(limit: i64) -> i64 {
    let mut k = ((limit as f64) / 4.0).sqrt() as i64;
    while k > 0 && 4 * k * k >= limit {
        k -= 1;
    }
    while 4 * (k + 1) * (k + 1) < limit {
        k += 1;
    }
    k
}

/// Smallest `k >= 0` with `4k^2 >= need`.
fn min_span(need: i64) -> i64 {
    let mut k = ((need as f64) / 4.0).sqrt() as i64;
    while k > 0 && 4 * (k - 1) * (k - 1) >= need {
        k -= 1;
    }
    while 4 * k * k < need {
        k += 1;
    }
    k
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn shells_partition_the_lattice() {
        let grid = VoxelGrid::with_dimensions(9, 9, 9);
        let center = IVec3::new(4, 4, 4);
        let mut seen = HashSet::new();
        seen.insert(center);
        for r in 1..=shell_limit(center, 9, 9, 9) {
            walk_shell(&grid, center, r, |cell| {
                assert!(seen.insert(cell), "cell {cell} visited twice");
            });
        }
        assert_eq!(seen.len(), 9 * 9 * 9);
    }

    #[test]
    fn shell_members_round_to_radius() {
        let grid = VoxelGrid::with_dimensions(11, 11, 11);
        let center = IVec3::new(5, 5, 5);
        for r in 1..=4 {
            walk_shell(&grid, center, r, |cell| {
                let d = ((cell - center).length_squared() as f64).sqrt();
                assert_eq!(d.round() as i32, r, "cell {cell} in shell {r}");
            });
        }
    }

    #[test]
    fn span_helpers_agree_with_brute_force() {
        for limit in 1..200i64 {
            let want = (0..).take_while(|k| 4 * k * k < limit).last().unwrap_or(0);
            assert_eq!(max_span(limit), want);
        }
        for need in 0..200i64 {
            let want = (0..).find(|k| 4 * k * k >= need).unwrap();
            assert_eq!(min_span(need), want);
        }
    }
}
