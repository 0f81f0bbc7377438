//! CPU face culling and batched mesh building for voxel grids.
#![forbid(unsafe_code)]

pub mod constants;
pub mod face;
pub mod mesh_build;

pub use constants::{MAX_BATCH_FACES, MAX_BATCH_VERTICES};
pub use face::{Face, VoxelFace};
pub use mesh_build::MeshBatch;

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use voxmap_geom::IVec3;
use voxmap_grid::{EMPTY, IndexError, VoxelGrid, VoxelId};
use voxmap_registry::{MaterialId, VoxelRegistry};

/// Faces of a single voxel id sharing one material and one draw batch.
#[derive(Clone, Debug)]
pub struct FaceBatch {
    voxel_id: VoxelId,
    material: MaterialId,
    faces: Vec<VoxelFace>,
    geometry: MeshBatch,
    dirty: bool,
}

impl FaceBatch {
    fn new(voxel_id: VoxelId, material: MaterialId) -> Self {
        Self {
            voxel_id,
            material,
            faces: Vec::new(),
            geometry: MeshBatch::default(),
            dirty: true,
        }
    }

    #[inline]
    pub fn voxel_id(&self) -> VoxelId {
        self.voxel_id
    }

    #[inline]
    pub fn material(&self) -> MaterialId {
        self.material
    }

    #[inline]
    pub fn faces(&self) -> &[VoxelFace] {
        &self.faces
    }

    /// Geometry as of the last [`VoxelMesh::update`].
    #[inline]
    pub fn geometry(&self) -> &MeshBatch {
        &self.geometry
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    fn has_room(&self) -> bool {
        self.faces.len() < MAX_BATCH_FACES
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshStats {
    pub batches: usize,
    pub faces: usize,
    pub vertices: usize,
    pub triangles: usize,
    /// Distinct voxel ids seen without a registry definition.
    pub missing_ids: usize,
}

/// What the current batches were built against.
#[derive(Clone, Copy, Debug, PartialEq)]
struct BuiltFrom {
    revision: u64,
    hash: i64,
    scale: f32,
    offset: IVec3,
}

/// Culled surface of a voxel grid, grouped into material batches and kept in sync
/// with single-voxel edits without a full rebuild.
pub struct VoxelMesh {
    registry: Arc<VoxelRegistry>,
    batches: Vec<FaceBatch>,
    index: HashMap<VoxelFace, (usize, usize)>,
    // batch with spare room per voxel id
    open: HashMap<VoxelId, usize>,
    missing: HashSet<VoxelId>,
    built: Option<BuiltFrom>,
    scale: f32,
    offset: IVec3,
}

impl VoxelMesh {
    pub fn new(registry: Arc<VoxelRegistry>) -> Self {
        Self {
            registry,
            batches: Vec::new(),
            index: HashMap::new(),
            open: HashMap::new(),
            missing: HashSet::new(),
            built: None,
            scale: 1.0,
            offset: IVec3::ZERO,
        }
    }

    pub fn registry(&self) -> &Arc<VoxelRegistry> {
        &self.registry
    }

    /// Drops every face and re-culls the whole grid.
    pub fn rebuild(&mut self, grid: &VoxelGrid) {
        self.batches.clear();
        self.index.clear();
        self.open.clear();
        self.missing.clear();
        self.track(grid);
        for (pos, id) in grid.occupied() {
            for face in Face::ALL {
                if !grid.is_occupied(pos + face.delta()) {
                    self.insert_face(VoxelFace::new(pos, face), id);
                }
            }
        }
        self.update();
        let s = self.stats();
        log::debug!(
            "rebuilt voxel mesh: {} faces in {} batches ({} vertices)",
            s.faces,
            s.batches,
            s.vertices
        );
    }

    /// Rebuilds only when the grid changed behind this mesh's back. Returns whether
    /// a rebuild happened.
    pub fn refresh(&mut self, grid: &VoxelGrid) -> bool {
        if self.built == Some(Self::snapshot(grid)) {
            return false;
        }
        self.rebuild(grid);
        true
    }

    /// Writes `id` at `pos` and patches the surface around it. Writing the id a
    /// cell already holds does nothing; a different id replaces it; a
    /// non-positive id clears the cell.
    pub fn add_voxel(
        &mut self,
        grid: &mut VoxelGrid,
        pos: IVec3,
        id: VoxelId,
    ) -> Result<(), IndexError> {
        if id <= EMPTY {
            return self.remove_voxel(grid, pos).map(|_| ());
        }
        let previous = grid.get_or_empty(pos);
        if previous == id {
            return Ok(());
        }
        grid.set_at(pos, id)?;
        self.sync_placement(grid);
        for face in Face::ALL {
            let vf = VoxelFace::new(pos, face);
            if previous != EMPTY {
                self.remove_face(vf);
            }
            if grid.is_occupied(vf.neighbor()) {
                self.remove_face(vf.mirrored());
            } else {
                self.insert_face(vf, id);
            }
        }
        self.built = Some(Self::snapshot(grid));
        Ok(())
    }

    /// Clears the voxel at `pos` and exposes the neighbours' faces toward it.
    /// Returns the removed id, or `None` if the cell was empty or outside the
    /// grid. Negative coordinates are an error.
    pub fn remove_voxel(
        &mut self,
        grid: &mut VoxelGrid,
        pos: IVec3,
    ) -> Result<Option<VoxelId>, IndexError> {
        let id = match grid.get_at(pos) {
            Ok(id) if id != EMPTY => id,
            Ok(_) | Err(IndexError::OutOfBounds { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        grid.set_at(pos, EMPTY)?;
        self.sync_placement(grid);
        for face in Face::ALL {
            let vf = VoxelFace::new(pos, face);
            self.remove_face(vf);
            let nb = vf.neighbor();
            let nb_id = grid.get_or_empty(nb);
            if nb_id != EMPTY && !self.index.contains_key(&vf.mirrored()) {
                self.insert_face(vf.mirrored(), nb_id);
            }
        }
        self.built = Some(Self::snapshot(grid));
        Ok(Some(id))
    }

    /// Regenerates geometry for every batch touched since the last call.
    pub fn update(&mut self) {
        let (scale, offset) = (self.scale, self.offset);
        let mut regenerated = 0usize;
        for batch in self.batches.iter_mut().filter(|b| b.dirty) {
            batch.geometry.clear_keep_capacity();
            batch.geometry.reserve_faces(batch.faces.len());
            for &vf in &batch.faces {
                batch.geometry.push_face(vf, scale, offset);
            }
            batch.dirty = false;
            regenerated += 1;
        }
        if regenerated > 0 {
            log::trace!("regenerated {regenerated} mesh batches");
        }
    }

    pub fn faces(&self) -> impl Iterator<Item = VoxelFace> + '_ {
        self.batches.iter().flat_map(|b| b.faces.iter().copied())
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn contains_face(&self, vf: &VoxelFace) -> bool {
        self.index.contains_key(vf)
    }

    /// Voxel id of the batch holding `vf`.
    pub fn face_voxel(&self, vf: &VoxelFace) -> Option<VoxelId> {
        self.index.get(vf).map(|&(b, _)| self.batches[b].voxel_id)
    }

    #[inline]
    pub fn batches(&self) -> &[FaceBatch] {
        &self.batches
    }

    pub fn stats(&self) -> MeshStats {
        let mut s = MeshStats {
            faces: self.index.len(),
            missing_ids: self.missing.len(),
            ..MeshStats::default()
        };
        for b in self.batches.iter().filter(|b| !b.faces.is_empty()) {
            s.batches += 1;
            s.vertices += b.geometry.vertex_count();
            s.triangles += b.geometry.triangle_count();
        }
        s
    }

    fn snapshot(grid: &VoxelGrid) -> BuiltFrom {
        BuiltFrom {
            revision: grid.revision(),
            hash: grid.hash_code(),
            scale: grid.scale(),
            offset: grid.offset(),
        }
    }

    fn track(&mut self, grid: &VoxelGrid) {
        self.scale = grid.scale();
        self.offset = grid.offset();
        self.built = Some(Self::snapshot(grid));
    }

    // Incremental edits only patch faces; placement changes force full regeneration.
    fn sync_placement(&mut self, grid: &VoxelGrid) {
        if self.scale != grid.scale() || self.offset != grid.offset() {
            self.scale = grid.scale();
            self.offset = grid.offset();
            for b in &mut self.batches {
                b.dirty = true;
            }
        }
    }

    fn insert_face(&mut self, vf: VoxelFace, id: VoxelId) -> bool {
        let material = match self.registry.definition(id) {
            Ok(def) => def.material_id,
            Err(e) => {
                if self.missing.insert(id) {
                    log::warn!("{e}; skipping its faces");
                }
                return false;
            }
        };
        let open = self
            .open
            .get(&id)
            .copied()
            .filter(|&b| self.batches[b].has_room());
        let slot_batch = match open {
            Some(b) => b,
            None => {
                let found = self
                    .batches
                    .iter()
                    .position(|b| b.voxel_id == id && b.has_room());
                let b = match found {
                    Some(b) => b,
                    None => {
                        self.batches.push(FaceBatch::new(id, material));
                        self.batches.len() - 1
                    }
                };
                self.open.insert(id, b);
                b
            }
        };
        let batch = &mut self.batches[slot_batch];
        batch.faces.push(vf);
        batch.dirty = true;
        self.index.insert(vf, (slot_batch, batch.faces.len() - 1));
        true
    }

    fn remove_face(&mut self, vf: VoxelFace) -> bool {
        let Some((b, slot)) = self.index.remove(&vf) else {
            return false;
        };
        let batch = &mut self.batches[b];
        batch.faces.swap_remove(slot);
        if let Some(&moved) = batch.faces.get(slot) {
            self.index.insert(moved, (b, slot));
        }
        batch.dirty = true;
        true
    }
}

impl std::fmt::Debug for VoxelMesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoxelMesh")
            .field("batches", &self.batches.len())
            .field("faces", &self.index.len())
            .field("missing", &self.missing)
            .finish()
    }
}
