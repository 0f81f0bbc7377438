//! Dense voxel grid storage.
#![forbid(unsafe_code)]

mod nearest;

use std::sync::OnceLock;

use thiserror::Error;
use voxmap_geom::{IVec3, Vec3};

pub use nearest::{find_nearest_voxel, find_nearest_voxel_world};

/// Identifier stored in each cell. `EMPTY` marks an unoccupied cell.
pub type VoxelId = i32;

pub const EMPTY: VoxelId = 0;

const HASH_SEED: i64 = 37;

#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("voxel coordinate {pos} has a negative component")]
    Negative { pos: IVec3 },
    #[error("voxel coordinate {pos} is outside the {columns}x{rows}x{pages} grid")]
    OutOfBounds {
        pos: IVec3,
        columns: usize,
        rows: usize,
        pages: usize,
    },
}

/// Flat `z`-major grid of voxel ids that grows on out-of-range writes.
///
/// Cell `(x, y, z)` lives at `z * columns * rows + y * columns + x`.
#[derive(Clone, Debug)]
pub struct VoxelGrid {
    columns: usize,
    rows: usize,
    pages: usize,
    cells: Vec<VoxelId>,
    count: usize,
    scale: f32,
    offset: IVec3,
    revision: u64,
    hash: OnceLock<i64>,
}

impl Default for VoxelGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl VoxelGrid {
    /// An empty, zero-sized grid with unit scale.
    pub fn new() -> Self {
        Self {
            columns: 0,
            rows: 0,
            pages: 0,
            cells: Vec::new(),
            count: 0,
            scale: 1.0,
            offset: IVec3::ZERO,
            revision: 0,
            hash: OnceLock::new(),
        }
    }

    pub fn with_dimensions(columns: usize, rows: usize, pages: usize) -> Self {
        let mut grid = Self::new();
        grid.columns = columns;
        grid.rows = rows;
        grid.pages = pages;
        grid.cells = vec![EMPTY; columns * rows * pages];
        grid
    }

    /// Rebuilds a grid from raw cell values. Returns `None` when the length does not
    /// match the dimensions or a cell holds a negative id.
    pub fn from_cells(
        columns: usize,
        rows: usize,
        pages: usize,
        cells: Vec<VoxelId>,
    ) -> Option<Self> {
        if columns.checked_mul(rows)?.checked_mul(pages)? != cells.len() {
            return None;
        }
        if cells.iter().any(|&v| v < 0) {
            return None;
        }
        let count = cells.iter().filter(|&&v| v != EMPTY).count();
        let mut grid = Self::new();
        grid.columns = columns;
        grid.rows = rows;
        grid.pages = pages;
        grid.cells = cells;
        grid.count = count;
        Some(grid)
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn pages(&self) -> usize {
        self.pages
    }

    #[inline]
    pub fn dimensions(&self) -> (usize, usize, usize) {
        (self.columns, self.rows, self.pages)
    }

    /// Total number of cells, occupied or not.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Number of non-empty cells.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f32) {
        if self.scale != scale {
            self.scale = scale;
            self.mark_dirty();
        }
    }

    #[inline]
    pub fn offset(&self) -> IVec3 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: IVec3) {
        if self.offset != offset {
            self.offset = offset;
            self.mark_dirty();
        }
    }

    /// Bumped on every mutation that changes cell values, layout, scale or offset.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[inline]
    fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.rows + y) * self.columns + x
    }

    /// True when `(x, y, z)` addresses an existing cell.
    #[inline]
    pub fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        x >= 0
            && y >= 0
            && z >= 0
            && (x as usize) < self.columns
            && (y as usize) < self.rows
            && (z as usize) < self.pages
    }

    pub fn get(&self, x: i32, y: i32, z: i32) -> Result<VoxelId, IndexError> {
        let pos = IVec3::new(x, y, z);
        if x < 0 || y < 0 || z < 0 {
            return Err(IndexError::Negative { pos });
        }
        if !self.contains(x, y, z) {
            return Err(IndexError::OutOfBounds {
                pos,
                columns: self.columns,
                rows: self.rows,
                pages: self.pages,
            });
        }
        Ok(self.cells[self.idx(x as usize, y as usize, z as usize)])
    }

    #[inline]
    pub fn get_at(&self, pos: IVec3) -> Result<VoxelId, IndexError> {
        self.get(pos.x, pos.y, pos.z)
    }

    /// Reads a cell, treating anything outside the grid as empty.
    #[inline]
    pub fn get_or_empty(&self, pos: IVec3) -> VoxelId {
        if self.contains(pos.x, pos.y, pos.z) {
            self.cells[self.idx(pos.x as usize, pos.y as usize, pos.z as usize)]
        } else {
            EMPTY
        }
    }

    #[inline]
    pub fn is_occupied(&self, pos: IVec3) -> bool {
        self.get_or_empty(pos) != EMPTY
    }

    /// Writes a cell, growing the grid when the coordinate is beyond the current
    /// capacity. Negative ids are stored as `EMPTY`.
    pub fn set(&mut self, x: i32, y: i32, z: i32, value: VoxelId) -> Result<(), IndexError> {
        if x < 0 || y < 0 || z < 0 {
            return Err(IndexError::Negative {
                pos: IVec3::new(x, y, z),
            });
        }
        let (ux, uy, uz) = (x as usize, y as usize, z as usize);
        if ux >= self.columns || uy >= self.rows || uz >= self.pages {
            self.expand(ux, uy, uz);
        }
        let value = value.max(EMPTY);
        let i = self.idx(ux, uy, uz);
        let old = self.cells[i];
        if old == value {
            return Ok(());
        }
        self.cells[i] = value;
        if old == EMPTY {
            self.count += 1;
        } else if value == EMPTY {
            self.count -= 1;
        }
        self.mark_dirty();
        Ok(())
    }

    #[inline]
    pub fn set_at(&mut self, pos: IVec3, value: VoxelId) -> Result<(), IndexError> {
        self.set(pos.x, pos.y, pos.z, value)
    }

    /// Grows each axis independently so that `(x, y, z)` becomes addressable.
    /// Never shrinks.
    pub fn expand(&mut self, x: usize, y: usize, z: usize) {
        let columns = self.columns.max(x + 1);
        let rows = self.rows.max(y + 1);
        let pages = self.pages.max(z + 1);
        if (columns, rows, pages) == self.dimensions() {
            return;
        }
        log::trace!(
            "expanding grid {}x{}x{} -> {}x{}x{}",
            self.columns,
            self.rows,
            self.pages,
            columns,
            rows,
            pages
        );
        self.relayout(columns, rows, pages);
    }

    /// Shrinks the grid to the tightest box anchored at the origin that still holds
    /// every occupied cell. An empty grid becomes zero-sized.
    pub fn compress(&mut self) {
        let mut extent: Option<(usize, usize, usize)> = None;
        for z in 0..self.pages {
            for y in 0..self.rows {
                for x in 0..self.columns {
                    if self.cells[self.idx(x, y, z)] != EMPTY {
                        let (mx, my, mz) = extent.unwrap_or((0, 0, 0));
                        extent = Some((mx.max(x), my.max(y), mz.max(z)));
                    }
                }
            }
        }
        let (columns, rows, pages) = match extent {
            Some((mx, my, mz)) => (mx + 1, my + 1, mz + 1),
            None => (0, 0, 0),
        };
        if (columns, rows, pages) == self.dimensions() {
            return;
        }
        log::debug!(
            "compressing grid {}x{}x{} -> {}x{}x{}",
            self.columns,
            self.rows,
            self.pages,
            columns,
            rows,
            pages
        );
        self.relayout(columns, rows, pages);
    }

    /// Reallocates to the new dimensions, copying the overlapping region row by row.
    fn relayout(&mut self, columns: usize, rows: usize, pages: usize) {
        let mut cells = vec![EMPTY; columns * rows * pages];
        let copy_cols = self.columns.min(columns);
        let copy_rows = self.rows.min(rows);
        let copy_pages = self.pages.min(pages);
        if copy_cols > 0 {
            for z in 0..copy_pages {
                for y in 0..copy_rows {
                    let src = self.idx(0, y, z);
                    let dst = (z * rows + y) * columns;
                    cells[dst..dst + copy_cols].copy_from_slice(&self.cells[src..src + copy_cols]);
                }
            }
        }
        self.columns = columns;
        self.rows = rows;
        self.pages = pages;
        self.cells = cells;
        self.mark_dirty();
    }

    fn mark_dirty(&mut self) {
        self.revision = self.revision.wrapping_add(1);
        self.hash = OnceLock::new();
    }

    /// Position-weighted checksum used to detect changes since the last mesh build.
    /// Cached until the next mutation.
    pub fn hash_code(&self) -> i64 {
        *self.hash.get_or_init(|| {
            self.cells
                .iter()
                .enumerate()
                .fold(HASH_SEED, |acc, (i, &v)| {
                    acc.wrapping_add((i as i64).wrapping_mul(v as i64))
                })
        })
    }

    /// All cells in `z`-major, `y`-mid, `x`-minor order, empty ones included.
    pub fn iter(&self) -> Cells<'_> {
        Cells {
            grid: self,
            next: 0,
        }
    }

    /// Only the non-empty cells, in the same order as [`VoxelGrid::iter`].
    pub fn occupied(&self) -> impl Iterator<Item = (IVec3, VoxelId)> + '_ {
        self.iter().filter(|&(_, v)| v != EMPTY)
    }

    /// Grid-local position of a world-space point, in voxel units.
    #[inline]
    pub fn world_to_local(&self, p: Vec3) -> Vec3 {
        p / self.scale - self.offset.to_vec3()
    }

    /// World-space centre of a grid-local position.
    #[inline]
    pub fn local_to_world(&self, p: Vec3) -> Vec3 {
        (p + self.offset.to_vec3()) * self.scale
    }

    /// Nearest occupied cell to a grid-local point.
    pub fn find_nearest_voxel(&self, point: Vec3) -> Option<IVec3> {
        find_nearest_voxel(self, point)
    }
}

/// Cell enumeration produced by [`VoxelGrid::iter`].
pub struct Cells<'a> {
    grid: &'a VoxelGrid,
    next: usize,
}

impl Iterator for Cells<'_> {
    type Item = (IVec3, VoxelId);

    fn next(&mut self) -> Option<Self::Item> {
        let i = self.next;
        let value = *self.grid.cells.get(i)?;
        self.next += 1;
        let plane = self.grid.columns * self.grid.rows;
        let z = i / plane;
        let rem = i % plane;
        let y = rem / self.grid.columns;
        let x = rem % self.grid.columns;
        Some((IVec3::new(x as i32, y as i32, z as i32), value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.grid.cells.len() - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Cells<'_> {}

impl<'a> IntoIterator for &'a VoxelGrid {
    type Item = (IVec3, VoxelId);
    type IntoIter = Cells<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
