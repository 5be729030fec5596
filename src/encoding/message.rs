// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Message schemas and payload encoding.
//!
//! Every stream gets a `ros2msg` schema derived only from its key and shape,
//! and every payload is written as little-endian CDR so that generic MCAP
//! viewers can decode it.
//!
//! Numeric vectors become one field per element. Image frames become:
//!
//! ```text
//! uint32 width
//! uint32 height
//! uint8  pixel_format   (+3 bytes padding)
//! uint8[] data          (uint32 length, then bytes)
//! ```

use std::collections::HashSet;

use super::cdr::{CdrCursor, CdrEncoder, CDR_HEADER_SIZE};
use crate::core::{ConvertError, Payload, PixelFormat, Result, ScalarType, StreamShape};
use crate::types::Record;

/// Message encoding written on every channel.
pub const MESSAGE_ENCODING: &str = "cdr";

/// Schema encoding written on every schema.
pub const SCHEMA_ENCODING: &str = "ros2msg";

/// Package that generated schema names live in.
pub const SCHEMA_PACKAGE: &str = "lerobot_msgs";

/// Encoded size of an image message before the frame bytes.
pub const IMAGE_HEADER_SIZE: usize = CDR_HEADER_SIZE + 16;

/// Name, encoding and text of a generated schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDescriptor {
    /// Fully qualified name, e.g. `lerobot_msgs/msg/ObservationState`
    pub name: String,
    /// Schema encoding
    pub encoding: &'static str,
    /// Schema text
    pub data: Vec<u8>,
}

/// Turn a stream key into a message type name.
///
/// `observation.images.top` becomes `ObservationImagesTop`.
pub fn type_name(stream_key: &str) -> String {
    let mut name: String = stream_key
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();

    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        name.insert_str(0, "Stream");
    }
    name
}

/// Turn element names into valid, unique `ros2msg` field names.
///
/// Names are lowercased, runs of other characters collapse into `_`, a
/// leading digit gets a `v_` prefix and duplicates get a numeric suffix.
pub fn field_names(names: &[String]) -> Vec<String> {
    let mut used = HashSet::new();
    let mut out = Vec::with_capacity(names.len());

    for (i, raw) in names.iter().enumerate() {
        let mut field = String::with_capacity(raw.len());
        for c in raw.chars() {
            if c.is_ascii_alphanumeric() {
                field.push(c.to_ascii_lowercase());
            } else if !field.is_empty() && !field.ends_with('_') {
                field.push('_');
            }
        }
        while field.ends_with('_') {
            field.pop();
        }
        if field.is_empty() {
            field = format!("v{i}");
        } else if field.starts_with(|c: char| c.is_ascii_digit()) {
            field.insert_str(0, "v_");
        }

        let mut candidate = field.clone();
        let mut suffix = 1;
        while !used.insert(candidate.clone()) {
            candidate = format!("{field}_{suffix}");
            suffix += 1;
        }
        out.push(candidate);
    }

    out
}

/// Build the schema for a stream.
///
/// The result depends only on `stream_key` and `shape`.
pub fn schema_for(stream_key: &str, shape: &StreamShape) -> SchemaDescriptor {
    let mut text = format!("# stream: {stream_key} ({shape})\n");

    match shape {
        StreamShape::Vector { dtype, names } => {
            for field in field_names(names) {
                text.push_str(&format!("{} {}\n", dtype.msg_name(), field));
            }
        }
        StreamShape::Image { .. } => {
            for format in PixelFormat::ALL {
                text.push_str(&format!(
                    "uint8 PIXEL_FORMAT_{}={}\n",
                    format.as_str().to_ascii_uppercase(),
                    format.code()
                ));
            }
            text.push_str("uint32 width\nuint32 height\nuint8 pixel_format\nuint8[] data\n");
        }
    }

    SchemaDescriptor {
        name: format!("{SCHEMA_PACKAGE}/msg/{}", type_name(stream_key)),
        encoding: SCHEMA_ENCODING,
        data: text.into_bytes(),
    }
}

/// Encode a record's payload against its registered shape.
///
/// Pure and deterministic. Numeric values are cast to the declared element
/// type; float-to-integer casts saturate.
pub fn encode(record: &Record, shape: &StreamShape) -> Result<Vec<u8>> {
    encode_payload(&record.stream_key, shape, &record.payload)
}

/// Encode a payload for `stream_key` against `shape`.
pub fn encode_payload(stream_key: &str, shape: &StreamShape, payload: &Payload) -> Result<Vec<u8>> {
    match (shape, payload) {
        (StreamShape::Vector { dtype, names }, Payload::Numeric(values)) => {
            if values.len() != names.len() {
                return Err(ConvertError::payload_mismatch(
                    stream_key,
                    format!("expected {} values, got {}", names.len(), values.len()),
                ));
            }
            let mut encoder = CdrEncoder::with_capacity(values.len() * dtype.size() + 8);
            for &value in values {
                write_scalar(&mut encoder, *dtype, value);
            }
            Ok(encoder.finish())
        }
        (
            StreamShape::Image {
                width,
                height,
                pixel_format,
                ..
            },
            Payload::Image {
                width: w,
                height: h,
                pixel_format: f,
                data,
            },
        ) => {
            if (w, h) != (width, height) {
                return Err(ConvertError::payload_mismatch(
                    stream_key,
                    format!("expected {width}x{height} frame, got {w}x{h}"),
                ));
            }
            if f != pixel_format {
                return Err(ConvertError::payload_mismatch(
                    stream_key,
                    format!("expected {pixel_format} frame, got {f}"),
                ));
            }
            if let Some(bpp) = pixel_format.bytes_per_pixel() {
                let expected = *width as usize * *height as usize * bpp;
                if data.len() != expected {
                    return Err(ConvertError::payload_mismatch(
                        stream_key,
                        format!("expected {expected} frame bytes, got {}", data.len()),
                    ));
                }
            }
            if u32::try_from(data.len()).is_err() {
                return Err(ConvertError::payload_mismatch(
                    stream_key,
                    format!("frame of {} bytes exceeds u32 length", data.len()),
                ));
            }

            let mut encoder = CdrEncoder::with_capacity(IMAGE_HEADER_SIZE + data.len());
            encoder
                .uint32(*width)
                .uint32(*height)
                .uint8(pixel_format.code())
                .uint8_sequence(data);
            Ok(encoder.finish())
        }
        (shape, payload) => Err(ConvertError::payload_mismatch(
            stream_key,
            format!(
                "{:?} payload does not fit shape {shape}",
                payload.kind()
            ),
        )),
    }
}

fn write_scalar(encoder: &mut CdrEncoder, dtype: ScalarType, value: f64) {
    match dtype {
        ScalarType::Bool => encoder.boolean(value != 0.0),
        ScalarType::Int8 => encoder.int8(value as i8),
        ScalarType::Int16 => encoder.int16(value as i16),
        ScalarType::Int32 => encoder.int32(value as i32),
        ScalarType::Int64 => encoder.int64(value as i64),
        ScalarType::UInt8 => encoder.uint8(value as u8),
        ScalarType::UInt16 => encoder.uint16(value as u16),
        ScalarType::UInt32 => encoder.uint32(value as u32),
        ScalarType::UInt64 => encoder.uint64(value as u64),
        ScalarType::Float32 => encoder.float32(value as f32),
        ScalarType::Float64 => encoder.float64(value),
    };
}

fn read_scalar(cursor: &mut CdrCursor<'_>, dtype: ScalarType) -> Result<f64> {
    Ok(match dtype {
        ScalarType::Bool => f64::from(u8::from(cursor.read_u8()? != 0)),
        ScalarType::Int8 => f64::from(cursor.read_i8()?),
        ScalarType::Int16 => f64::from(cursor.read_i16()?),
        ScalarType::Int32 => f64::from(cursor.read_i32()?),
        ScalarType::Int64 => cursor.read_i64()? as f64,
        ScalarType::UInt8 => f64::from(cursor.read_u8()?),
        ScalarType::UInt16 => f64::from(cursor.read_u16()?),
        ScalarType::UInt32 => f64::from(cursor.read_u32()?),
        ScalarType::UInt64 => cursor.read_u64()? as f64,
        ScalarType::Float32 => f64::from(cursor.read_f32()?),
        ScalarType::Float64 => cursor.read_f64()?,
    })
}

/// Decode message bytes written by [`encode_payload`].
pub fn decode_payload(shape: &StreamShape, data: &[u8]) -> Result<Payload> {
    let mut cursor = CdrCursor::new(data)?;
    match shape {
        StreamShape::Vector { dtype, names } => {
            let values = names
                .iter()
                .map(|_| read_scalar(&mut cursor, *dtype))
                .collect::<Result<Vec<_>>>()?;
            Ok(Payload::Numeric(values))
        }
        StreamShape::Image { .. } => {
            let width = cursor.read_u32()?;
            let height = cursor.read_u32()?;
            let code = cursor.read_u8()?;
            let pixel_format = PixelFormat::from_code(code).ok_or_else(|| {
                ConvertError::parse("image message", format!("unknown pixel format code {code}"))
            })?;
            let len = cursor.read_u32()? as usize;
            let data = cursor.read_bytes(len)?.to_vec();
            Ok(Payload::Image {
                width,
                height,
                pixel_format,
                data,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_type_name() {
        assert_eq!(type_name("observation.state"), "ObservationState");
        assert_eq!(type_name("observation.images.top"), "ObservationImagesTop");
        assert_eq!(type_name("3d_points"), "Stream3dPoints");
        assert_eq!(type_name(""), "Stream");
    }

    #[test]
    fn test_field_names_sanitized_and_unique() {
        let fields = field_names(&names(&[
            "Shoulder Pan",
            "elbow-flex",
            "elbow_flex",
            "0gripper",
            "??",
        ]));
        assert_eq!(
            fields,
            vec!["shoulder_pan", "elbow_flex", "elbow_flex_1", "v_0gripper", "v4"]
        );
    }

    #[test]
    fn test_schema_for_vector() {
        let shape = StreamShape::named_vector(ScalarType::Float32, names(&["x", "y"]));
        let schema = schema_for("action", &shape);
        assert_eq!(schema.name, "lerobot_msgs/msg/Action");
        assert_eq!(schema.encoding, "ros2msg");
        let text = String::from_utf8(schema.data).unwrap();
        assert!(text.contains("float32 x\n"));
        assert!(text.contains("float32 y\n"));
    }

    #[test]
    fn test_schema_for_image_lists_formats() {
        let shape = StreamShape::image(4, 2, 3, PixelFormat::Rgb8);
        let text = String::from_utf8(schema_for("cam", &shape).data).unwrap();
        assert!(text.contains("uint8 PIXEL_FORMAT_PNG=6\n"));
        assert!(text.ends_with("uint8[] data\n"));
    }

    #[test]
    fn test_encode_numeric_layout() {
        let shape = StreamShape::vector(ScalarType::Float32, 2);
        let bytes = encode_payload("s", &shape, &Payload::Numeric(vec![1.0, 2.5])).unwrap();
        let mut expected = vec![0x00, 0x01, 0x00, 0x00];
        expected.extend_from_slice(&1.0f32.to_le_bytes());
        expected.extend_from_slice(&2.5f32.to_le_bytes());
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_encode_image_header_size() {
        let shape = StreamShape::image(2, 1, 3, PixelFormat::Rgb8);
        let frame = vec![1, 2, 3, 4, 5, 6];
        let bytes = encode_payload(
            "cam",
            &shape,
            &Payload::Image {
                width: 2,
                height: 1,
                pixel_format: PixelFormat::Rgb8,
                data: frame.clone(),
            },
        )
        .unwrap();
        assert_eq!(bytes.len(), IMAGE_HEADER_SIZE + frame.len());
        assert_eq!(&bytes[IMAGE_HEADER_SIZE..], frame.as_slice());
        assert_eq!(bytes[12], PixelFormat::Rgb8.code());
    }

    #[test]
    fn test_encoded_frames_skip_size_check() {
        let shape = StreamShape::image(640, 480, 3, PixelFormat::Jpeg);
        let payload = Payload::Image {
            width: 640,
            height: 480,
            pixel_format: PixelFormat::Jpeg,
            data: vec![0xFF, 0xD8, 0xFF, 0xD9],
        };
        let bytes = encode_payload("cam", &shape, &payload).unwrap();
        assert_eq!(decode_payload(&shape, &bytes).unwrap(), payload);
    }

    #[test]
    fn test_vector_length_mismatch() {
        let shape = StreamShape::vector(ScalarType::Float64, 3);
        let err = encode_payload("state", &shape, &Payload::Numeric(vec![1.0])).unwrap_err();
        assert!(matches!(err, ConvertError::PayloadMismatch { .. }));
    }

    #[test]
    fn test_image_dimension_mismatch() {
        let shape = StreamShape::image(2, 2, 1, PixelFormat::Mono8);
        let payload = Payload::Image {
            width: 3,
            height: 2,
            pixel_format: PixelFormat::Mono8,
            data: vec![0; 6],
        };
        assert!(matches!(
            encode_payload("cam", &shape, &payload),
            Err(ConvertError::PayloadMismatch { .. })
        ));
    }

    #[test]
    fn test_kind_mismatch() {
        let shape = StreamShape::image(2, 2, 1, PixelFormat::Mono8);
        assert!(matches!(
            encode_payload("cam", &shape, &Payload::Numeric(vec![0.0])),
            Err(ConvertError::PayloadMismatch { .. })
        ));
    }

    #[test]
    fn test_integer_casts_decode() {
        let shape = StreamShape::vector(ScalarType::Int16, 3);
        let bytes =
            encode_payload("s", &shape, &Payload::Numeric(vec![-3.0, 40000.0, 7.9])).unwrap();
        assert_eq!(
            decode_payload(&shape, &bytes).unwrap(),
            Payload::Numeric(vec![-3.0, 32767.0, 7.0])
        );
    }
}
