use std::fmt::Write as _;
use std::io::{Read, Write};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use thiserror::Error;
use voxmap_geom::IVec3;
use voxmap_grid::{VoxelGrid, VoxelId};

use crate::record::SerializedGrid;

const CELL_BYTES: usize = std::mem::size_of::<i32>();

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("payload truncated: expected {expected} bytes, found {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("payload has {0} trailing bytes")]
    TrailingBytes(usize),
    #[error("payload declares negative length {0}")]
    NegativeLength(i32),
    #[error("payload holds {len} cells but dimensions are {columns}x{rows}x{pages}")]
    LengthMismatch {
        len: usize,
        columns: usize,
        rows: usize,
        pages: usize,
    },
    #[error("payload holds negative voxel id {0}")]
    NegativeVoxel(VoxelId),
    #[error("invalid scale {0}")]
    InvalidScale(f32),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Packs grid cells into a compressed, base64 text payload and back.
#[derive(Clone, Debug)]
pub struct GridCodec {
    level: Compression,
    debug_string: bool,
}

impl Default for GridCodec {
    fn default() -> Self {
        Self {
            level: Compression::best(),
            debug_string: false,
        }
    }
}

impl GridCodec {
    pub fn new(level: Compression) -> Self {
        Self {
            level,
            debug_string: false,
        }
    }

    /// Also emit the comma-separated text mirror of the cells.
    pub fn with_debug_string(mut self, enabled: bool) -> Self {
        self.debug_string = enabled;
        self
    }

    /// Encodes cell values as-is, without compacting the grid first.
    pub fn encode_payload(&self, grid: &VoxelGrid) -> Result<String, CodecError> {
        let mut raw = Vec::with_capacity((grid.len() + 1) * CELL_BYTES);
        raw.extend_from_slice(&(grid.len() as i32).to_le_bytes());
        for (_, v) in grid.iter() {
            raw.extend_from_slice(&v.to_le_bytes());
        }
        let mut enc = DeflateEncoder::new(Vec::new(), self.level);
        enc.write_all(&raw)?;
        let compressed = enc.finish()?;
        log::debug!(
            "encoded {} cells: {} raw bytes -> {} compressed",
            grid.len(),
            raw.len(),
            compressed.len()
        );
        Ok(STANDARD.encode(compressed))
    }

    /// Decodes a payload into its cell values.
    pub fn decode_payload(&self, data: &str) -> Result<Vec<VoxelId>, CodecError> {
        let compressed = STANDARD.decode(data.trim())?;
        let mut raw = Vec::new();
        DeflateDecoder::new(compressed.as_slice()).read_to_end(&mut raw)?;
        if raw.len() < CELL_BYTES {
            return Err(CodecError::Truncated {
                expected: CELL_BYTES,
                actual: raw.len(),
            });
        }
        let (head, body) = raw.split_at(CELL_BYTES);
        let declared = read_i32(head);
        if declared < 0 {
            return Err(CodecError::NegativeLength(declared));
        }
        let expected = declared as usize * CELL_BYTES;
        if body.len() < expected {
            return Err(CodecError::Truncated {
                expected: expected + CELL_BYTES,
                actual: raw.len(),
            });
        }
        if body.len() > expected {
            return Err(CodecError::TrailingBytes(body.len() - expected));
        }
        Ok(body.chunks_exact(CELL_BYTES).map(read_i32).collect())
    }

    /// Compacts the grid, then packs it with its dimensions, scale and offset.
    /// A scale that `deserialize` would refuse is rejected before anything is
    /// written.
    pub fn serialize(&self, grid: &mut VoxelGrid) -> Result<SerializedGrid, CodecError> {
        check_scale(grid.scale())?;
        grid.compress();
        log::info!(
            "serializing {}x{}x{} voxel grid ({} occupied)",
            grid.columns(),
            grid.rows(),
            grid.pages(),
            grid.count()
        );
        let data = self.encode_payload(grid)?;
        let data_string = self.debug_string.then(|| debug_string(grid));
        let offset = grid.offset();
        Ok(SerializedGrid {
            columns: grid.columns(),
            rows: grid.rows(),
            pages: grid.pages(),
            scale: grid.scale(),
            offset: [offset.x, offset.y, offset.z],
            data,
            data_string,
        })
    }

    /// Restores a grid from its record. Nothing is returned unless the whole
    /// payload decodes and agrees with the dimensions.
    pub fn deserialize(&self, record: &SerializedGrid) -> Result<VoxelGrid, CodecError> {
        log::info!(
            "restoring {}x{}x{} voxel grid",
            record.columns,
            record.rows,
            record.pages
        );
        check_scale(record.scale)?;
        let cells = self.decode_payload(&record.data)?;
        let expect = record
            .columns
            .checked_mul(record.rows)
            .and_then(|n| n.checked_mul(record.pages));
        if expect != Some(cells.len()) {
            return Err(CodecError::LengthMismatch {
                len: cells.len(),
                columns: record.columns,
                rows: record.rows,
                pages: record.pages,
            });
        }
        if let Some(&bad) = cells.iter().find(|&&v| v < 0) {
            return Err(CodecError::NegativeVoxel(bad));
        }
        let Some(mut grid) = VoxelGrid::from_cells(record.columns, record.rows, record.pages, cells)
        else {
            return Err(CodecError::LengthMismatch {
                len: expect.unwrap_or_default(),
                columns: record.columns,
                rows: record.rows,
                pages: record.pages,
            });
        };
        grid.set_scale(record.scale);
        grid.set_offset(IVec3::from(record.offset));
        Ok(grid)
    }
}

#[inline]
fn check_scale(scale: f32) -> Result<(), CodecError> {
    if scale.is_finite() && scale > 0.0 {
        Ok(())
    } else {
        Err(CodecError::InvalidScale(scale))
    }
}

fn read_i32(bytes: &[u8]) -> i32 {
    let mut b = [0u8; CELL_BYTES];
    b.copy_from_slice(bytes);
    i32::from_le_bytes(b)
}

fn debug_string(grid: &VoxelGrid) -> String {
    let mut out = String::with_capacity(grid.len() * 2 + 48);
    let _ = write!(
        out,
        "{{columns:{},rows:{},pages:{},array:[",
        grid.columns(),
        grid.rows(),
        grid.pages()
    );
    for (i, (_, v)) in grid.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{v}");
    }
    out.push_str("]}");
    out
}

/// Keeps the last encoded record and hands it back while the grid is unchanged.
/// Revisions are per grid, so use one cache per grid.
#[derive(Default, Debug)]
pub struct EncodeCache {
    cached: Option<(u64, SerializedGrid)>,
}

impl EncodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_encode(
        &mut self,
        codec: &GridCodec,
        grid: &mut VoxelGrid,
    ) -> Result<&SerializedGrid, CodecError> {
        grid.compress();
        let rev = grid.revision();
        let record = match self.cached.take() {
            Some((r, record)) if r == rev => {
                log::trace!("reusing encoded grid at revision {rev}");
                record
            }
            _ => codec.serialize(grid)?,
        };
        Ok(&self.cached.insert((rev, record)).1)
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}
