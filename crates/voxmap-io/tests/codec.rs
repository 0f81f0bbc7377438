use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::io::Write;
use voxmap_geom::IVec3;
use voxmap_grid::VoxelGrid;
use voxmap_io::{CodecError, EncodeCache, GridCodec, SerializedGrid};

fn deflate_b64(raw: &[u8]) -> String {
    let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
    enc.write_all(raw).unwrap();
    STANDARD.encode(enc.finish().unwrap())
}

fn words(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn record(columns: usize, rows: usize, pages: usize, data: String) -> SerializedGrid {
    SerializedGrid {
        columns,
        rows,
        pages,
        scale: 1.0,
        offset: [0, 0, 0],
        data,
        data_string: None,
    }
}

#[test]
fn five_cell_round_trip() {
    let mut grid = VoxelGrid::new();
    grid.set(0, 0, 0, 1).unwrap();
    grid.set(1, 0, 0, 1).unwrap();
    grid.set(0, 1, 0, 2).unwrap();
    grid.set(0, 0, 1, 3).unwrap();
    grid.set(2, 2, 2, 4).unwrap();
    grid.set_scale(0.25);
    grid.set_offset(IVec3::new(-3, 1, 7));

    let codec = GridCodec::default();
    let rec = codec.serialize(&mut grid).unwrap();
    assert_eq!((rec.columns, rec.rows, rec.pages), (3, 3, 3));
    let back = codec.deserialize(&rec).unwrap();

    assert_eq!(back.dimensions(), grid.dimensions());
    assert_eq!(back.count(), 5);
    assert_eq!(back.scale(), 0.25);
    assert_eq!(back.offset(), IVec3::new(-3, 1, 7));
    assert_eq!(back.hash_code(), grid.hash_code());
    for (pos, v) in grid.iter() {
        assert_eq!(back.get_at(pos).unwrap(), v, "cell {pos}");
    }
}

#[test]
fn two_corner_example() {
    let mut grid = VoxelGrid::with_dimensions(2, 2, 2);
    grid.set(0, 0, 0, 1).unwrap();
    grid.set(1, 1, 1, 2).unwrap();
    let codec = GridCodec::default();
    let rec = codec.serialize(&mut grid).unwrap();
    assert_eq!(grid.dimensions(), (2, 2, 2));
    let back = codec.deserialize(&rec).unwrap();
    assert_eq!(back.get(0, 0, 0).unwrap(), 1);
    assert_eq!(back.get(1, 1, 1).unwrap(), 2);
    assert_eq!(back.count(), 2);
}

#[test]
fn serialize_compresses_first() {
    let mut grid = VoxelGrid::with_dimensions(10, 10, 10);
    grid.set(1, 2, 0, 5).unwrap();
    let rec = GridCodec::default().serialize(&mut grid).unwrap();
    assert_eq!((rec.columns, rec.rows, rec.pages), (2, 3, 1));
    assert_eq!(grid.dimensions(), (2, 3, 1));
}

#[test]
fn empty_grid_round_trips() {
    let mut grid = VoxelGrid::with_dimensions(4, 4, 4);
    let codec = GridCodec::default();
    let rec = codec.serialize(&mut grid).unwrap();
    assert_eq!((rec.columns, rec.rows, rec.pages), (0, 0, 0));
    let back = codec.deserialize(&rec).unwrap();
    assert_eq!(back.len(), 0);
    assert_eq!(back.count(), 0);
}

#[test]
fn serializing_twice_is_byte_identical() {
    let mut grid = VoxelGrid::new();
    for i in 0..20 {
        grid.set(i % 4, i / 4, i % 3, i + 1).unwrap();
    }
    let codec = GridCodec::default().with_debug_string(true);
    let a = codec.serialize(&mut grid).unwrap();
    let b = codec.serialize(&mut grid).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
}

#[test]
fn debug_string_mirrors_cells() {
    let mut grid = VoxelGrid::new();
    grid.set(0, 0, 0, 1).unwrap();
    grid.set(1, 0, 0, 2).unwrap();
    let rec = GridCodec::default()
        .with_debug_string(true)
        .serialize(&mut grid)
        .unwrap();
    assert_eq!(
        rec.data_string.as_deref(),
        Some("{columns:2,rows:1,pages:1,array:[1,2]}")
    );
    let plain = GridCodec::default().serialize(&mut grid).unwrap();
    assert_eq!(plain.data_string, None);
}

#[test]
fn payload_layout_is_length_then_cells() {
    let mut grid = VoxelGrid::new();
    grid.set(0, 0, 0, 7).unwrap();
    grid.set(2, 0, 0, 9).unwrap();
    let codec = GridCodec::default();
    let data = codec.encode_payload(&grid).unwrap();
    assert_eq!(codec.decode_payload(&data).unwrap(), vec![7, 0, 9]);

    let hand_made = deflate_b64(&words(&[3, 7, 0, 9]));
    assert_eq!(codec.decode_payload(&hand_made).unwrap(), vec![7, 0, 9]);
}

#[test]
fn bad_base64_is_rejected() {
    let err = GridCodec::default().decode_payload("not base64 !!!").unwrap_err();
    assert!(matches!(err, CodecError::Base64(_)));
}

#[test]
fn garbage_deflate_is_rejected() {
    let data = STANDARD.encode([0xffu8, 0xff, 0xff, 0xff, 0x00, 0x13]);
    let err = GridCodec::default().decode_payload(&data).unwrap_err();
    assert!(matches!(err, CodecError::Io(_)), "{err:?}");
}

#[test]
fn truncated_payload_is_rejected() {
    let codec = GridCodec::default();
    let short_header = deflate_b64(&[1, 0]);
    assert!(matches!(
        codec.decode_payload(&short_header).unwrap_err(),
        CodecError::Truncated { .. }
    ));
    let short_body = deflate_b64(&words(&[4, 1, 2]));
    assert!(matches!(
        codec.decode_payload(&short_body).unwrap_err(),
        CodecError::Truncated { .. }
    ));
}

#[test]
fn trailing_and_negative_length_are_rejected() {
    let codec = GridCodec::default();
    assert!(matches!(
        codec.decode_payload(&deflate_b64(&words(&[1, 5, 6]))).unwrap_err(),
        CodecError::TrailingBytes(4)
    ));
    assert!(matches!(
        codec.decode_payload(&deflate_b64(&words(&[-2]))).unwrap_err(),
        CodecError::NegativeLength(-2)
    ));
}

#[test]
fn dimension_mismatch_is_rejected() {
    let rec = record(2, 2, 1, deflate_b64(&words(&[3, 1, 1, 1])));
    let err = GridCodec::default().deserialize(&rec).unwrap_err();
    assert!(matches!(err, CodecError::LengthMismatch { len: 3, .. }));
}

#[test]
fn negative_cells_and_bad_scale_are_rejected() {
    let codec = GridCodec::default();
    let rec = record(2, 1, 1, deflate_b64(&words(&[2, 1, -4])));
    assert!(matches!(
        codec.deserialize(&rec).unwrap_err(),
        CodecError::NegativeVoxel(-4)
    ));

    let mut rec = record(1, 1, 1, deflate_b64(&words(&[1, 1])));
    rec.scale = 0.0;
    assert!(matches!(
        codec.deserialize(&rec).unwrap_err(),
        CodecError::InvalidScale(_)
    ));
}

#[test]
fn serialize_refuses_scale_that_cannot_load() {
    let codec = GridCodec::default();
    for scale in [0.0, -1.5, f32::NAN, f32::INFINITY] {
        let mut grid = VoxelGrid::new();
        grid.set(1, 0, 0, 3).unwrap();
        grid.set_scale(scale);
        assert!(matches!(
            codec.serialize(&mut grid).unwrap_err(),
            CodecError::InvalidScale(_)
        ));
    }

    let mut grid = VoxelGrid::new();
    grid.set(1, 0, 0, 3).unwrap();
    grid.set_scale(0.25);
    let back = codec.deserialize(&codec.serialize(&mut grid).unwrap()).unwrap();
    assert_eq!(back.scale(), 0.25);
    assert_eq!(back.get(1, 0, 0), Ok(3));
}

#[test]
fn encode_cache_reuses_until_mutation() {
    let codec = GridCodec::default();
    let mut cache = EncodeCache::new();
    let mut grid = VoxelGrid::new();
    grid.set(1, 1, 1, 2).unwrap();

    let first = cache.get_or_encode(&codec, &mut grid).unwrap().clone();
    let again = cache.get_or_encode(&codec, &mut grid).unwrap().clone();
    assert_eq!(first, again);

    grid.set(3, 0, 0, 4).unwrap();
    let changed = cache.get_or_encode(&codec, &mut grid).unwrap().clone();
    assert_ne!(first.data, changed.data);
    assert_eq!(changed.columns, 4);

    grid.set_scale(2.0);
    let rescaled = cache.get_or_encode(&codec, &mut grid).unwrap();
    assert_eq!(rescaled.scale, 2.0);
}
