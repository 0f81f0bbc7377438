use voxmap_geom::{IVec3, Vec3};

use crate::constants::{ATLAS_CELLS, INDICES_PER_FACE, OPAQUE_ALPHA, VERTS_PER_FACE};
use crate::face::VoxelFace;

/// Flat vertex streams for one draw batch.
#[derive(Default, Clone, Debug)]
pub struct MeshBatch {
    pub pos: Vec<f32>,
    pub norm: Vec<f32>,
    pub uv: Vec<f32>,
    pub idx: Vec<u16>,
    pub col: Vec<u8>,
}

impl MeshBatch {
    /// Clears all arrays but retains capacity for reuse.
    #[inline]
    pub fn clear_keep_capacity(&mut self) {
        self.pos.clear();
        self.norm.clear();
        self.uv.clear();
        self.idx.clear();
        self.col.clear();
    }

    #[inline]
    pub fn reserve_faces(&mut self, n_faces: usize) {
        let verts = n_faces * VERTS_PER_FACE;
        self.pos.reserve(verts * 3);
        self.norm.reserve(verts * 3);
        self.uv.reserve(verts * 2);
        self.col.reserve(verts * 4);
        self.idx.reserve(n_faces * INDICES_PER_FACE);
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.pos.len() / 3
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.idx.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.idx.is_empty()
    }

    /// Appends a quad as triangles `(a,b,c)` and `(a,c,d)`.
    pub fn add_quad_uv(
        &mut self,
        corners: [Vec3; 4],
        n: Vec3,
        uvs: [(f32, f32); 4],
        rgba: [u8; 4],
    ) {
        let base = self.vertex_count() as u16;
        for (p, (u, v)) in corners.iter().zip(uvs) {
            self.pos.extend_from_slice(&[p.x, p.y, p.z]);
            self.norm.extend_from_slice(&[n.x, n.y, n.z]);
            self.uv.extend_from_slice(&[u, v]);
            self.col.extend_from_slice(&rgba);
        }
        self.idx
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    /// Emits the quad for `vf` on a voxel of edge `scale` placed at
    /// `(pos + offset) * scale`.
    pub fn push_face(&mut self, vf: VoxelFace, scale: f32, offset: IVec3) {
        let center = (vf.pos + offset).to_vec3() * scale;
        let corners = vf.face.corners(center, scale * 0.5);
        let (col, row) = vf.face.atlas_cell();
        let cell = |cu: f32, cv: f32| ((col + cu) / ATLAS_CELLS, (row + cv) / ATLAS_CELLS);
        let uvs = [cell(0.0, 0.0), cell(0.0, 1.0), cell(1.0, 1.0), cell(1.0, 0.0)];
        let [r, g, b] = vf.face.debug_color();
        self.add_quad_uv(corners, vf.face.normal(), uvs, [r, g, b, OPAQUE_ALPHA]);
    }
}
