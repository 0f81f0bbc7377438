//! Persistence for voxel grids: compressed payload codec and the JSON file record.
#![forbid(unsafe_code)]

mod codec;
mod record;

pub use codec::{CodecError, EncodeCache, GridCodec};
pub use record::SerializedGrid;
