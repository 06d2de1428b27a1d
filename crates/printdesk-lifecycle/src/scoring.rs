// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Outcome scoring for finished jobs.

use printdesk_core::config::TrustThresholds;
use printdesk_core::error::Result;
use printdesk_core::types::{Outcome, PrintJob, User};
use printdesk_policy::{adjust_score, level_for};
use printdesk_store::{Connection, users};
use tracing::{debug, info};

/// Apply `outcome` to the job's submitter and reviewing rep.
///
/// The submitter's outcome counter and trust score change, then the rep's
/// review counter.  When the submitter reviewed their own job both updates
/// land on the same user.  Run inside the transaction that changes the job
/// status.  Returns the submitter as stored afterwards.
pub fn record_outcome(
    conn: &Connection,
    job: &PrintJob,
    outcome: Outcome,
    thresholds: &TrustThresholds,
) -> Result<User> {
    let mut submitter = users::require_user(conn, &job.user_id)?;
    let before = level_for(submitter.trust_score, thresholds);
    submitter.count_submission(outcome);
    submitter.trust_score = adjust_score(submitter.trust_score, outcome);
    users::save_user(conn, &submitter)?;

    let after = level_for(submitter.trust_score, thresholds);
    if before != after {
        info!(user = %submitter.id, from = %before, to = %after, "trust level changed");
    }

    let mut rep = users::require_user(conn, &job.rep_check)?;
    rep.count_review(outcome);
    users::save_user(conn, &rep)?;
    debug!(
        job_id = %job.id,
        submitter = %submitter.id,
        rep = %rep.id,
        %outcome,
        score = submitter.trust_score,
        "outcome scored"
    );

    if rep.id == submitter.id {
        submitter = rep;
    }
    Ok(submitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{add_user, make_db};
    use printdesk_core::error::PrintdeskError;
    use printdesk_core::types::{JobStatus, NewPrintJob, PrinterType, ProjectType, UserId};

    fn job_for(submitter: UserId, rep: UserId) -> PrintJob {
        PrintJob::new(
            NewPrintJob {
                user_id: submitter,
                rep_check: Some(rep),
                print_name: "bracket".into(),
                gcode_slug: "gcode/bracket".into(),
                stl_slug: None,
                printer_type: PrinterType::Prusa,
                print_time: Some(600),
                filament_usage: Some(4),
                project: ProjectType::Personal,
                project_string: None,
                upload_notes: None,
            },
            rep,
            JobStatus::Running,
        )
        .unwrap()
    }

    #[test]
    fn completion_credits_submitter_and_rep() {
        let db = make_db();
        let submitter = add_user(&db, "sc01", false, 3);
        let rep = add_user(&db, "sc02", true, 1);
        let job = job_for(submitter.id, rep.id);

        let updated = db
            .write(|tx| record_outcome(tx, &job, Outcome::Completed, &TrustThresholds::default()))
            .unwrap();
        assert_eq!(updated.trust_score, 4);
        assert_eq!(updated.completed_count, 1);
        assert_eq!(updated.slice_completed_count, 0);

        let rep = db.read(|conn| users::require_user(conn, &rep.id)).unwrap();
        assert_eq!(rep.slice_completed_count, 1);
        assert_eq!(rep.completed_count, 0);
        assert_eq!(rep.trust_score, 1);
    }

    #[test]
    fn failure_respects_score_floor() {
        let db = make_db();
        let submitter = add_user(&db, "sc03", false, 1);
        let rep = add_user(&db, "sc04", true, 1);
        let job = job_for(submitter.id, rep.id);

        let updated = db
            .write(|tx| record_outcome(tx, &job, Outcome::Failed, &TrustThresholds::default()))
            .unwrap();
        assert_eq!(updated.trust_score, 1);
        assert_eq!(updated.failed_count, 1);
    }

    #[test]
    fn self_review_updates_both_counter_sets() {
        let db = make_db();
        let user = add_user(&db, "sc05", true, 2);
        let job = job_for(user.id, user.id);

        let updated = db
            .write(|tx| record_outcome(tx, &job, Outcome::Rejected, &TrustThresholds::default()))
            .unwrap();
        assert_eq!(updated.rejected_count, 1);
        assert_eq!(updated.slice_rejected_count, 1);
        assert_eq!(updated.trust_score, 1);

        let stored = db.read(|conn| users::require_user(conn, &user.id)).unwrap();
        assert_eq!(stored, updated);
    }

    #[test]
    fn missing_rep_rolls_back_submitter_update() {
        let db = make_db();
        let submitter = add_user(&db, "sc06", false, 3);
        let job = job_for(submitter.id, UserId::new());

        let err = db
            .write(|tx| record_outcome(tx, &job, Outcome::Completed, &TrustThresholds::default()))
            .unwrap_err();
        assert!(matches!(err, PrintdeskError::NotFound { .. }));

        let stored = db.read(|conn| users::require_user(conn, &submitter.id)).unwrap();
        assert_eq!(stored.trust_score, 3);
        assert_eq!(stored.completed_count, 0);
    }
}
