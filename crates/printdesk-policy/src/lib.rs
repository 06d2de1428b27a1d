// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printdesk-policy — pure decision functions.  Nothing in this crate touches
// storage or the environment; thresholds arrive as explicit arguments.

pub mod autoreview;
pub mod trust;

pub use autoreview::{HoldReason, ReviewDecision, decide};
pub use trust::{TrustLevel, adjust_score, level_for};
