// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printdesk — Core types and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod patch;
pub mod responses;
pub mod types;

pub use config::{AppConfig, AutoReviewConfig, TrustThresholds};
pub use error::PrintdeskError;
pub use patch::{JobPatch, PrinterPatch, UserPatch};
pub use types::*;
