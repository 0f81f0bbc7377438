use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::codec::CodecError;

/// File/wire form of a grid. Dimensions, scale and offset travel beside the
/// payload; `data` holds the cell values only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerializedGrid {
    #[serde(rename = "Columns")]
    pub columns: usize,
    #[serde(rename = "Rows")]
    pub rows: usize,
    #[serde(rename = "Pages")]
    pub pages: usize,
    #[serde(rename = "Scale")]
    pub scale: f32,
    #[serde(rename = "Offset")]
    pub offset: [i32; 3],
    /// base64 of raw-deflated `i32` length followed by that many `i32` cells, all
    /// little-endian.
    #[serde(rename = "Data")]
    pub data: String,
    /// Human-readable mirror of the payload. Never parsed back.
    #[serde(rename = "DataString", default, skip_serializing_if = "Option::is_none")]
    pub data_string: Option<String>,
}

impl SerializedGrid {
    pub fn to_json(&self) -> Result<String, CodecError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, CodecError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CodecError> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)?;
        log::info!(
            "saved {}x{}x{} grid to {}",
            self.columns,
            self.rows,
            self.pages,
            path.display()
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CodecError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let record = Self::from_json(&json)?;
        log::info!(
            "loaded {}x{}x{} grid from {}",
            record.columns,
            record.rows,
            record.pages,
            path.display()
        );
        Ok(record)
    }
}
