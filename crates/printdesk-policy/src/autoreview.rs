// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Auto-review decision engine.
//
// Decides whether a submitted job may go straight to the queue or must be
// held for a human reviewer, based on the reviewing rep's track record and
// the job's estimated print time.  Gates are evaluated in order and the
// first one that trips wins:
//
//   1. novice rep: too few checked jobs to be trusted
//   2. failure rate: too many of the rep's checked jobs failed or were rejected
//   3. long print: long prints always get human eyes

use printdesk_core::config::AutoReviewConfig;
use printdesk_core::types::{JobStatus, User};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Why a job was held for review.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum HoldReason {
    NoviceRep { review_volume: u32, required: u32 },
    FailureRate { rate: f64, threshold: f64 },
    LongPrint { print_time: i64, threshold: i64 },
}

/// Result of the auto-review decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ReviewDecision {
    /// Job may be queued without a human check.
    Queue,
    /// Job must wait in `under_review`.
    Hold(HoldReason),
}

impl ReviewDecision {
    /// Initial job status this decision produces.
    pub fn status(&self) -> JobStatus {
        match self {
            Self::Queue => JobStatus::Queued,
            Self::Hold(_) => JobStatus::UnderReview,
        }
    }
}

/// Decide the initial status for a job checked by `rep`.
///
/// `config.start_threshold` must be greater than zero (enforced by
/// [`AutoReviewConfig::validate`]); that keeps the failure-rate division
/// well-defined once the novice gate has passed.
pub fn decide(rep: &User, requested_print_time: i64, config: &AutoReviewConfig) -> ReviewDecision {
    let volume = rep.review_volume();
    if volume < config.start_threshold || volume == 0 {
        debug!(rep = %rep.id, volume, "rep below auto-review start threshold");
        return ReviewDecision::Hold(HoldReason::NoviceRep {
            review_volume: volume,
            required: config.start_threshold,
        });
    }

    let rate = f64::from(rep.review_failures()) / f64::from(volume);
    if rate >= config.fail_threshold {
        debug!(rep = %rep.id, rate, "rep failure rate too high for auto-review");
        return ReviewDecision::Hold(HoldReason::FailureRate {
            rate,
            threshold: config.fail_threshold,
        });
    }

    if requested_print_time >= config.time_threshold_secs {
        return ReviewDecision::Hold(HoldReason::LongPrint {
            print_time: requested_print_time,
            threshold: config.time_threshold_secs,
        });
    }

    ReviewDecision::Queue
}
