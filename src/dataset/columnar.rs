// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Parquet episode files.
//!
//! Each row is one frame. Numeric columns are turned into JSON values so
//! they share the value handling of line-delimited data files; image
//! columns stored inline (a `{bytes, path}` struct or a bare binary column)
//! keep their encoded bytes.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::Path;

use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::{Field, Row};

use super::local::FrameRow;
use crate::core::{ConvertError, Result};

/// Read every row of an episode's parquet file.
///
/// Columns named in `visual` are read as inline image bytes.
pub(super) fn read_rows(path: &Path, index: u64, visual: &BTreeSet<&str>) -> Result<Vec<FrameRow>> {
    let file = File::open(path).map_err(|e| {
        ConvertError::source(Some(index), None, format!("{}: {e}", path.display()))
    })?;
    let context = || path.display().to_string();
    let reader =
        SerializedFileReader::new(file).map_err(|e| ConvertError::parse(context(), e.to_string()))?;
    let num_rows = reader.metadata().file_metadata().num_rows();

    let mut rows = Vec::with_capacity(usize::try_from(num_rows).unwrap_or(0));
    let iter = reader
        .get_row_iter(None)
        .map_err(|e| ConvertError::parse(context(), e.to_string()))?;
    for (row_no, row) in iter.enumerate() {
        let row = row.map_err(|e| ConvertError::parse(context(), e.to_string()))?;
        let frame = frame_row(&row, visual)
            .map_err(|message| ConvertError::parse(format!("{} row {row_no}", context()), message))?;
        rows.push(frame);
    }
    Ok(rows)
}

fn frame_row(row: &Row, visual: &BTreeSet<&str>) -> std::result::Result<FrameRow, String> {
    let mut timestamp = None;
    let mut frame_index = None;
    let mut values = BTreeMap::new();
    let mut images = BTreeMap::new();

    for (name, field) in row.get_column_iter() {
        match name.as_str() {
            "timestamp" => timestamp = seconds(field),
            "frame_index" => frame_index = unsigned(field),
            key if visual.contains(key) => {
                if let Some(bytes) = inline_image(field) {
                    images.insert(name.clone(), bytes);
                }
            }
            _ => {
                values.insert(name.clone(), field.to_json_value());
            }
        }
    }

    Ok(FrameRow {
        timestamp: timestamp.ok_or("missing or non-numeric timestamp")?,
        frame_index: frame_index.ok_or("missing or negative frame_index")?,
        values,
        images,
    })
}

/// Timestamp column in seconds.
///
/// `float32` values are widened through their shortest decimal form so
/// that `0.1f32` reads as `0.1`, not `0.10000000149`.
fn seconds(field: &Field) -> Option<f64> {
    match field {
        Field::Float(v) => v.to_string().parse().ok(),
        Field::Double(v) => Some(*v),
        other => unsigned(other).map(|v| v as f64),
    }
}

fn unsigned(field: &Field) -> Option<u64> {
    match field {
        Field::Byte(v) => u64::try_from(*v).ok(),
        Field::Short(v) => u64::try_from(*v).ok(),
        Field::Int(v) => u64::try_from(*v).ok(),
        Field::Long(v) => u64::try_from(*v).ok(),
        Field::UByte(v) => Some(u64::from(*v)),
        Field::UShort(v) => Some(u64::from(*v)),
        Field::UInt(v) => Some(u64::from(*v)),
        Field::ULong(v) => Some(*v),
        _ => None,
    }
}

fn inline_image(field: &Field) -> Option<Vec<u8>> {
    match field {
        Field::Bytes(bytes) => Some(bytes.data().to_vec()),
        Field::Group(group) => group.get_column_iter().find_map(|(name, value)| match value {
            Field::Bytes(bytes) if name == "bytes" => Some(bytes.data().to_vec()),
            _ => None,
        }),
        _ => None,
    }
}
