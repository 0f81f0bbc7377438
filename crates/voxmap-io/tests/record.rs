use voxmap_geom::IVec3;
use voxmap_grid::VoxelGrid;
use voxmap_io::{CodecError, GridCodec, SerializedGrid};

#[test]
fn json_uses_record_field_names() {
    let mut grid = VoxelGrid::new();
    grid.set(0, 0, 0, 1).unwrap();
    grid.set_offset(IVec3::new(1, 2, 3));
    let rec = GridCodec::default().serialize(&mut grid).unwrap();
    let json = rec.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["Columns"], 1);
    assert_eq!(value["Rows"], 1);
    assert_eq!(value["Pages"], 1);
    assert_eq!(value["Scale"], 1.0);
    assert_eq!(value["Offset"], serde_json::json!([1, 2, 3]));
    assert!(value["Data"].is_string());
    assert!(value.get("DataString").is_none());
}

#[test]
fn missing_data_string_defaults_to_none() {
    let json = r#"{"Columns":0,"Rows":0,"Pages":0,"Scale":1.0,"Offset":[0,0,0],"Data":""}"#;
    let rec = SerializedGrid::from_json(json).unwrap();
    assert_eq!(rec.data_string, None);
}

#[test]
fn malformed_json_is_rejected() {
    let err = SerializedGrid::from_json("{\"Columns\": 1").unwrap_err();
    assert!(matches!(err, CodecError::Json(_)));
}

#[test]
fn save_and_load_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("map.json");
    let mut grid = VoxelGrid::new();
    grid.set(2, 1, 0, 6).unwrap();
    grid.set_scale(0.5);

    let codec = GridCodec::default().with_debug_string(true);
    let rec = codec.serialize(&mut grid).unwrap();
    rec.save(&path).unwrap();
    let loaded = SerializedGrid::load(&path).unwrap();
    assert_eq!(loaded, rec);

    let back = codec.deserialize(&loaded).unwrap();
    assert_eq!(back.get(2, 1, 0).unwrap(), 6);
    assert_eq!(back.scale(), 0.5);
}

#[test]
fn load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SerializedGrid::load(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, CodecError::Io(_)));
}
