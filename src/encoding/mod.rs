// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Message encoding.
//!
//! - [`cdr`] - Little-endian CDR writer and cursor
//! - [`message`] - Schema generation and payload encoding per stream shape

pub mod cdr;
pub mod message;

pub use cdr::{CdrCursor, CdrEncoder};
pub use message::{
    decode_payload, encode, encode_payload, schema_for, SchemaDescriptor, MESSAGE_ENCODING,
    SCHEMA_ENCODING,
};
