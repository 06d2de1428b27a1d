// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job status transition table.
//
//   approval ──approve──────────▶ queued
//   approval ──reject_approval──▶ rejected
//   queued   ──start────────────▶ running
//   running  ──complete─────────▶ completed
//   running  ──fail─────────────▶ failed
//   running  ──requeue──────────▶ queued
//   queued / under_review ──reject──▶ rejected
//   under_review ──queue────────▶ queued
//   queued   ──review───────────▶ under_review
//
// Creation chooses the entry state and deletion is allowed from anywhere, so
// neither appears here.

use std::fmt;

use printdesk_core::error::{PrintdeskError, Result};
use printdesk_core::types::{JobId, JobStatus};
use serde::{Deserialize, Serialize};

/// An event that moves an existing job between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobEvent {
    Approve,
    RejectApproval,
    Start,
    Complete,
    Fail,
    Requeue,
    Reject,
    Queue,
    Review,
}

impl JobEvent {
    pub const ALL: [JobEvent; 9] = [
        Self::Approve,
        Self::RejectApproval,
        Self::Start,
        Self::Complete,
        Self::Fail,
        Self::Requeue,
        Self::Reject,
        Self::Queue,
        Self::Review,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::RejectApproval => "reject_approval",
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Fail => "fail",
            Self::Requeue => "requeue",
            Self::Reject => "reject",
            Self::Queue => "queue",
            Self::Review => "review",
        }
    }
}

impl fmt::Display for JobEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status reached by applying `event` in `current`, or `None` if illegal.
pub fn next_status(current: JobStatus, event: JobEvent) -> Option<JobStatus> {
    use JobEvent as E;
    use JobStatus as S;

    match (current, event) {
        (S::Approval, E::Approve) => Some(S::Queued),
        (S::Approval, E::RejectApproval) => Some(S::Rejected),
        (S::Queued, E::Start) => Some(S::Running),
        (S::Running, E::Complete) => Some(S::Completed),
        (S::Running, E::Fail) => Some(S::Failed),
        (S::Running, E::Requeue) => Some(S::Queued),
        (S::Queued | S::UnderReview, E::Reject) => Some(S::Rejected),
        (S::UnderReview, E::Queue) => Some(S::Queued),
        (S::Queued, E::Review) => Some(S::UnderReview),
        _ => None,
    }
}

/// Like [`next_status`] but an illegal event is `InvalidState`.
pub fn ensure_transition(job: &JobId, current: JobStatus, event: JobEvent) -> Result<JobStatus> {
    next_status(current, event).ok_or_else(|| PrintdeskError::InvalidState {
        job: job.to_string(),
        status: current,
        event: event.as_str(),
    })
}

/// Events accepted from `status`, in declaration order.
pub fn allowed_events(status: JobStatus) -> Vec<JobEvent> {
    JobEvent::ALL
        .into_iter()
        .filter(|event| next_status(status, *event).is_some())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_accept_nothing() {
        for status in JobStatus::ALL {
            if status.is_terminal() {
                assert!(allowed_events(status).is_empty(), "{status} accepted an event");
            }
        }
    }

    #[test]
    fn allowed_events_per_state() {
        assert_eq!(
            allowed_events(JobStatus::Approval),
            vec![JobEvent::Approve, JobEvent::RejectApproval]
        );
        assert_eq!(
            allowed_events(JobStatus::Queued),
            vec![JobEvent::Start, JobEvent::Reject, JobEvent::Review]
        );
        assert_eq!(
            allowed_events(JobStatus::Running),
            vec![JobEvent::Complete, JobEvent::Fail, JobEvent::Requeue]
        );
        assert_eq!(
            allowed_events(JobStatus::UnderReview),
            vec![JobEvent::Reject, JobEvent::Queue]
        );
    }

    #[test]
    fn every_unlisted_pair_is_invalid_state() {
        let job = JobId::new();
        for status in JobStatus::ALL {
            let allowed = allowed_events(status);
            for event in JobEvent::ALL {
                let result = ensure_transition(&job, status, event);
                if allowed.contains(&event) {
                    assert!(result.is_ok());
                } else {
                    assert!(matches!(
                        result,
                        Err(PrintdeskError::InvalidState { status: s, .. }) if s == status
                    ));
                }
            }
        }
    }

    #[test]
    fn requeue_returns_to_queued() {
        assert_eq!(next_status(JobStatus::Running, JobEvent::Requeue), Some(JobStatus::Queued));
    }

    #[test]
    fn approval_cannot_start_directly() {
        assert_eq!(next_status(JobStatus::Approval, JobEvent::Start), None);
    }
}
