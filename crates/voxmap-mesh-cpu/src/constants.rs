//! Shared constants for voxmap-mesh-cpu.

/// Vertex ceiling per batch so `u16` indices never overflow.
pub const MAX_BATCH_VERTICES: usize = 65534;
pub const VERTS_PER_FACE: usize = 4;
pub const INDICES_PER_FACE: usize = 6;
/// A face never spans two batches.
pub const MAX_BATCH_FACES: usize = MAX_BATCH_VERTICES / VERTS_PER_FACE;

// Texture atlas: 3x3 cells
pub(crate) const ATLAS_CELLS: f32 = 3.0;

pub(crate) const OPAQUE_ALPHA: u8 = 255;
