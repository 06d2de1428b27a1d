// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Trust score model: maps a user's score to a discrete level and applies
// outcome adjustments.

use std::fmt;

use printdesk_core::config::TrustThresholds;
use printdesk_core::types::{MIN_TRUST_SCORE, Outcome};
use serde::{Deserialize, Serialize};

/// Discrete trust tier, ordered from least to most trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    Beginner,
    Advanced,
    Expert,
    Insane,
}

impl TrustLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Advanced => "advanced",
            Self::Expert => "expert",
            Self::Insane => "insane",
        }
    }

    /// Submitters at this level skip auto-review and go to approval instead.
    pub fn is_fast_tracked(&self) -> bool {
        *self >= Self::Advanced
    }
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Highest level whose boundary is at or below `score`.
///
/// Boundaries are inclusive: a score equal to `thresholds.advanced` is
/// `Advanced`.
pub fn level_for(score: i64, thresholds: &TrustThresholds) -> TrustLevel {
    let boundaries = [
        (thresholds.advanced, TrustLevel::Advanced),
        (thresholds.expert, TrustLevel::Expert),
        (thresholds.insane, TrustLevel::Insane),
    ];

    let mut level = TrustLevel::Beginner;
    for (boundary, candidate) in boundaries {
        if score >= boundary {
            level = candidate;
        }
    }
    level
}

/// Score after an outcome: +1 for a completed print, -1 otherwise, never
/// below [`MIN_TRUST_SCORE`].
pub fn adjust_score(score: i64, outcome: Outcome) -> i64 {
    let delta = match outcome {
        Outcome::Completed => 1,
        Outcome::Failed | Outcome::Rejected => -1,
    };
    score.saturating_add(delta).max(MIN_TRUST_SCORE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn thresholds() -> TrustThresholds {
        TrustThresholds::default()
    }

    #[test]
    fn below_advanced_is_beginner() {
        assert_eq!(level_for(1, &thresholds()), TrustLevel::Beginner);
        assert_eq!(level_for(4, &thresholds()), TrustLevel::Beginner);
    }

    #[test]
    fn boundaries_are_inclusive() {
        let t = thresholds();
        assert_eq!(level_for(t.advanced, &t), TrustLevel::Advanced);
        assert_eq!(level_for(t.expert, &t), TrustLevel::Expert);
        assert_eq!(level_for(t.insane, &t), TrustLevel::Insane);
        assert_eq!(level_for(t.expert - 1, &t), TrustLevel::Advanced);
    }

    #[test]
    fn very_high_scores_stay_insane() {
        assert_eq!(level_for(i64::MAX, &thresholds()), TrustLevel::Insane);
    }

    #[test]
    fn fast_track_starts_at_advanced() {
        assert!(!TrustLevel::Beginner.is_fast_tracked());
        assert!(TrustLevel::Advanced.is_fast_tracked());
        assert!(TrustLevel::Insane.is_fast_tracked());
    }

    #[test]
    fn score_adjustments_respect_floor() {
        assert_eq!(adjust_score(1, Outcome::Completed), 2);
        assert_eq!(adjust_score(1, Outcome::Failed), 1);
        assert_eq!(adjust_score(1, Outcome::Rejected), 1);
        assert_eq!(adjust_score(7, Outcome::Rejected), 6);
    }

    proptest! {
        #[test]
        fn level_is_monotonic_in_score(a in 0i64..1_000, b in 0i64..1_000) {
            let t = thresholds();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(level_for(lo, &t) <= level_for(hi, &t));
        }

        #[test]
        fn adjusted_score_never_drops_below_floor(score in 1i64..10_000, fail in any::<bool>()) {
            let outcome = if fail { Outcome::Failed } else { Outcome::Completed };
            prop_assert!(adjust_score(score, outcome) >= MIN_TRUST_SCORE);
        }
    }
}
