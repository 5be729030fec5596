// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Episode timeline construction.

pub mod merger;

pub use merger::TimelineMerger;
