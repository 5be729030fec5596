// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core types used throughout lerobot2mcap.
//!
//! This module provides the foundational types for the library:
//! - [`ConvertError`] - Error taxonomy of a conversion run
//! - [`StreamShape`] / [`Payload`] - Stream shapes and sample values
//! - [`RunContext`] - Run-scoped schema and channel registries

pub mod error;
pub mod registry;
pub mod shape;

pub use error::{ConvertError, Result};
pub use registry::{
    ChannelEntry, ChannelRegistry, RunContext, SchemaEntry, SchemaRegistry, StreamBinding,
    FIRST_CHANNEL_ID, FIRST_SCHEMA_ID,
};
pub use shape::{Payload, PayloadKind, PixelFormat, ScalarType, StreamShape};
