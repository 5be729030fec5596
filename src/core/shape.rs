// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Stream shapes and payload values.
//!
//! A [`StreamShape`] is the declared decoding shape of one stream and stays
//! constant for the whole conversion run. A [`Payload`] is one sample of that
//! stream as delivered by the dataset source.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ConvertError;

/// Element type of a numeric vector stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    /// Boolean
    Bool,
    /// 8-bit signed integer
    Int8,
    /// 16-bit signed integer
    Int16,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 8-bit unsigned integer
    UInt8,
    /// 16-bit unsigned integer
    UInt16,
    /// 32-bit unsigned integer
    UInt32,
    /// 64-bit unsigned integer
    UInt64,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
}

impl ScalarType {
    /// Get the alignment requirement for this type in bytes.
    pub const fn alignment(self) -> usize {
        self.size()
    }

    /// Get the encoded size in bytes.
    pub const fn size(self) -> usize {
        match self {
            ScalarType::Bool | ScalarType::Int8 | ScalarType::UInt8 => 1,
            ScalarType::Int16 | ScalarType::UInt16 => 2,
            ScalarType::Int32 | ScalarType::UInt32 | ScalarType::Float32 => 4,
            ScalarType::Int64 | ScalarType::UInt64 | ScalarType::Float64 => 8,
        }
    }

    /// Parse a dataset dtype string.
    ///
    /// Accepts both the numpy spellings used by dataset metadata
    /// (`float32`, `int64`, `uint8`) and ROS spellings (`float`, `double`).
    pub fn try_from_str(s: &str) -> Option<Self> {
        match s {
            "bool" | "boolean" => Some(ScalarType::Bool),
            "int8" => Some(ScalarType::Int8),
            "int16" => Some(ScalarType::Int16),
            "int32" => Some(ScalarType::Int32),
            "int64" => Some(ScalarType::Int64),
            "uint8" => Some(ScalarType::UInt8),
            "uint16" => Some(ScalarType::UInt16),
            "uint32" => Some(ScalarType::UInt32),
            "uint64" => Some(ScalarType::UInt64),
            "float32" | "float" => Some(ScalarType::Float32),
            "float64" | "double" => Some(ScalarType::Float64),
            _ => None,
        }
    }

    /// Type name as written in a `ros2msg` schema.
    pub const fn msg_name(self) -> &'static str {
        match self {
            ScalarType::Bool => "bool",
            ScalarType::Int8 => "int8",
            ScalarType::Int16 => "int16",
            ScalarType::Int32 => "int32",
            ScalarType::Int64 => "int64",
            ScalarType::UInt8 => "uint8",
            ScalarType::UInt16 => "uint16",
            ScalarType::UInt32 => "uint32",
            ScalarType::UInt64 => "uint64",
            ScalarType::Float32 => "float32",
            ScalarType::Float64 => "float64",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.msg_name())
    }
}

/// Pixel layout of an image stream.
///
/// Raw layouts carry decoded pixels; `Jpeg` and `Png` carry an encoded frame
/// that is passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// 8-bit RGB, 3 channels
    Rgb8,
    /// 8-bit BGR, 3 channels
    Bgr8,
    /// 8-bit RGBA, 4 channels
    Rgba8,
    /// 8-bit grayscale
    Mono8,
    /// 16-bit grayscale
    Mono16,
    /// JPEG-encoded frame
    Jpeg,
    /// PNG-encoded frame
    Png,
}

impl PixelFormat {
    /// Wire code stored in the image header.
    pub const fn code(self) -> u8 {
        match self {
            PixelFormat::Rgb8 => 0,
            PixelFormat::Bgr8 => 1,
            PixelFormat::Rgba8 => 2,
            PixelFormat::Mono8 => 3,
            PixelFormat::Mono16 => 4,
            PixelFormat::Jpeg => 5,
            PixelFormat::Png => 6,
        }
    }

    /// Reverse of [`PixelFormat::code`].
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(PixelFormat::Rgb8),
            1 => Some(PixelFormat::Bgr8),
            2 => Some(PixelFormat::Rgba8),
            3 => Some(PixelFormat::Mono8),
            4 => Some(PixelFormat::Mono16),
            5 => Some(PixelFormat::Jpeg),
            6 => Some(PixelFormat::Png),
            _ => None,
        }
    }

    /// All formats, in code order.
    pub const ALL: [PixelFormat; 7] = [
        PixelFormat::Rgb8,
        PixelFormat::Bgr8,
        PixelFormat::Rgba8,
        PixelFormat::Mono8,
        PixelFormat::Mono16,
        PixelFormat::Jpeg,
        PixelFormat::Png,
    ];

    /// Lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            PixelFormat::Rgb8 => "rgb8",
            PixelFormat::Bgr8 => "bgr8",
            PixelFormat::Rgba8 => "rgba8",
            PixelFormat::Mono8 => "mono8",
            PixelFormat::Mono16 => "mono16",
            PixelFormat::Jpeg => "jpeg",
            PixelFormat::Png => "png",
        }
    }

    /// Whether frames are an opaque encoded blob rather than raw pixels.
    pub const fn is_encoded(self) -> bool {
        matches!(self, PixelFormat::Jpeg | PixelFormat::Png)
    }

    /// Bytes per pixel for raw layouts.
    pub const fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            PixelFormat::Rgb8 | PixelFormat::Bgr8 => Some(3),
            PixelFormat::Rgba8 => Some(4),
            PixelFormat::Mono8 => Some(1),
            PixelFormat::Mono16 => Some(2),
            PixelFormat::Jpeg | PixelFormat::Png => None,
        }
    }

    /// Guess a format from a frame file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(PixelFormat::Jpeg),
            "png" => Some(PixelFormat::Png),
            _ => None,
        }
    }

    /// Recognize an encoded image by its leading signature bytes.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(b"\x89PNG") {
            Some(PixelFormat::Png)
        } else if data.starts_with(&[0xFF, 0xD8]) {
            Some(PixelFormat::Jpeg)
        } else {
            None
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PixelFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rgb8" | "rgb" => Ok(PixelFormat::Rgb8),
            "bgr8" | "bgr" => Ok(PixelFormat::Bgr8),
            "rgba8" | "rgba" => Ok(PixelFormat::Rgba8),
            "mono8" | "gray" | "grey" => Ok(PixelFormat::Mono8),
            "mono16" => Ok(PixelFormat::Mono16),
            "jpeg" | "jpg" => Ok(PixelFormat::Jpeg),
            "png" => Ok(PixelFormat::Png),
            other => Err(ConvertError::parse(
                "PixelFormat",
                format!("unknown pixel format '{other}'"),
            )),
        }
    }
}

/// Declared shape of a stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StreamShape {
    /// Fixed-length numeric vector with one named field per element
    Vector {
        /// Element type
        dtype: ScalarType,
        /// Element names, one per element
        names: Vec<String>,
    },
    /// Camera frame
    Image {
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
        /// Channel count
        channels: u32,
        /// Pixel layout of the delivered frames
        pixel_format: PixelFormat,
    },
}

impl StreamShape {
    /// Vector shape with generated element names `v0..vN`.
    pub fn vector(dtype: ScalarType, len: usize) -> Self {
        StreamShape::Vector {
            dtype,
            names: (0..len).map(|i| format!("v{i}")).collect(),
        }
    }

    /// Vector shape with explicit element names.
    pub fn named_vector(dtype: ScalarType, names: Vec<String>) -> Self {
        StreamShape::Vector { dtype, names }
    }

    /// Image shape.
    pub fn image(width: u32, height: u32, channels: u32, pixel_format: PixelFormat) -> Self {
        StreamShape::Image {
            width,
            height,
            channels,
            pixel_format,
        }
    }

    /// Payload kind carried by this shape.
    pub fn kind(&self) -> PayloadKind {
        match self {
            StreamShape::Vector { .. } => PayloadKind::Numeric,
            StreamShape::Image { .. } => PayloadKind::Image,
        }
    }

    /// Number of elements of a vector shape (0 for images).
    pub fn len(&self) -> usize {
        match self {
            StreamShape::Vector { names, .. } => names.len(),
            StreamShape::Image { .. } => 0,
        }
    }

    /// Whether this is an empty vector shape.
    pub fn is_empty(&self) -> bool {
        matches!(self, StreamShape::Vector { names, .. } if names.is_empty())
    }
}

impl fmt::Display for StreamShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamShape::Vector { dtype, names } => write!(f, "{dtype}[{}]", names.len()),
            StreamShape::Image {
                width,
                height,
                channels,
                pixel_format,
            } => write!(f, "image {width}x{height}x{channels} {pixel_format}"),
        }
    }
}

/// Kind of payload a record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    /// Numeric vector
    Numeric,
    /// Image frame
    Image,
}

/// One sample value as produced by the dataset source.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Numeric vector. Values are cast to the stream's element type on encode.
    Numeric(Vec<f64>),
    /// Image frame, raw pixels or an opaque encoded blob
    Image {
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
        /// Pixel layout
        pixel_format: PixelFormat,
        /// Frame bytes
        data: Vec<u8>,
    },
}

impl Payload {
    /// Payload kind.
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Numeric(_) => PayloadKind::Numeric,
            Payload::Image { .. } => PayloadKind::Image,
        }
    }
}
