// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! CDR (Common Data Representation) module.
//!
//! Little-endian CDR writing for message payloads, plus a cursor for
//! reading them back.

pub mod cursor;
pub mod encoder;

/// Size of the CDR encapsulation header (4 bytes).
pub const CDR_HEADER_SIZE: usize = 4;

pub use cursor::CdrCursor;
pub use encoder::CdrEncoder;
