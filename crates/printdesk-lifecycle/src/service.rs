// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print job service: one operation per lifecycle event.
//
// Every transition runs inside a single immediate transaction: the job row,
// the transition history, printer telemetry and both users' trust counters
// commit together or not at all.  The not-found and state checks run first,
// before anything is written.  Notifications are handed to the notifier only
// after the commit, and a failed hand-off comes back as a warning on an
// otherwise successful `Transition`.

use std::sync::Arc;

use chrono::Utc;
use printdesk_core::config::{AppConfig, AutoReviewConfig, TrustThresholds};
use printdesk_core::error::{PrintdeskError, Result};
use printdesk_core::patch::JobPatch;
use printdesk_core::types::{
    JobId, JobStatus, NewPrintJob, Outcome, PrintJob, PrinterId, TelemetryDelta, User, UserId,
};
use printdesk_policy::{ReviewDecision, decide, level_for};
use printdesk_store::{
    Connection, SharedDatabase, TransitionRecord, history, jobs, printers, telemetry, users,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::machine::{JobEvent, ensure_transition};
use crate::notify::{Notice, Notifier};
use crate::requeue::append_marker;
use crate::scoring::record_outcome;

/// History tag for the creating entry.
const CREATE_EVENT: &str = "create";

/// Something that went wrong after a transition had already committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum TransitionWarning {
    NotificationFailed {
        user: UserId,
        outcome: Outcome,
        reason: String,
    },
}

/// A committed transition and any best-effort follow-ups that failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub job: PrintJob,
    pub warnings: Vec<TransitionWarning>,
}

impl Transition {
    fn clean(job: PrintJob) -> Self {
        Self {
            job,
            warnings: Vec::new(),
        }
    }

    /// True when every follow-up succeeded.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Lifecycle operations over a shared database.
///
/// Cheap to clone; clones share the database and notifier.
#[derive(Clone)]
pub struct PrintJobService {
    db: SharedDatabase,
    thresholds: TrustThresholds,
    review: AutoReviewConfig,
    notifier: Arc<dyn Notifier>,
}

impl PrintJobService {
    pub fn new(
        db: SharedDatabase,
        thresholds: TrustThresholds,
        review: AutoReviewConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            db,
            thresholds,
            review,
            notifier,
        }
    }

    pub fn from_config(db: SharedDatabase, config: &AppConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self::new(db, config.trust, config.review, notifier)
    }

    // -- Creation ------------------------------------------------------------

    /// Create a job from a submission.
    ///
    /// Fast-tracked submitters (advanced and above) must attach a model file
    /// and land in `approval`.  Everyone else needs a reviewing rep with the
    /// reviewer flag, and the auto-review engine picks `queued` or
    /// `under_review` from that rep's record.
    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub fn create(&self, request: NewPrintJob) -> Result<PrintJob> {
        let job = self.db.write(|tx| {
            let submitter = users::require_user(tx, &request.user_id)?;
            let level = level_for(submitter.trust_score, &self.thresholds);
            let rep = resolve_reviewer(tx, &submitter, request.rep_check)?;

            let status = if level.is_fast_tracked() {
                let has_model = request
                    .stl_slug
                    .as_deref()
                    .is_some_and(|slug| !slug.trim().is_empty());
                if !has_model {
                    warn!(%level, "fast-tracked submission without a model file");
                    return Err(PrintdeskError::PreconditionFailed(format!(
                        "submitter level is {level}; a model file (stl_slug) is required for approval"
                    )));
                }
                JobStatus::Approval
            } else {
                if !rep.is_rep {
                    warn!(rep = %rep.id, "rep_check names a user who is not a reviewer");
                    return Err(PrintdeskError::PreconditionFailed(format!(
                        "user `{}` is not permitted to check prints",
                        rep.uid
                    )));
                }
                let decision = decide(&rep, request.print_time.unwrap_or(0), &self.review);
                if let ReviewDecision::Hold(reason) = decision {
                    debug!(?reason, "job held for manual review");
                }
                decision.status()
            };

            let job = PrintJob::new(request, rep.id, status)?;
            jobs::insert_job(tx, &job)?;
            history::record(tx, &job.id, CREATE_EVENT, None, status)?;
            Ok(job)
        })?;
        info!(job_id = %job.id, status = %job.status, "job created");
        Ok(job)
    }

    // -- Transitions ---------------------------------------------------------

    /// approval → queued
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub fn approve(&self, job_id: &JobId) -> Result<PrintJob> {
        self.advance(job_id, JobEvent::Approve)
    }

    /// approval → rejected, scored and notified.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub fn reject_approval(&self, job_id: &JobId) -> Result<Transition> {
        self.finish(job_id, JobEvent::RejectApproval, Outcome::Rejected)
    }

    /// queued → running on `printer_id`.
    ///
    /// The printer must exist, match the job's printer type and not be
    /// running anything else.
    #[instrument(skip(self, colour), fields(job_id = %job_id, printer_id = %printer_id))]
    pub fn start(&self, job_id: &JobId, printer_id: &PrinterId, colour: Option<String>) -> Result<PrintJob> {
        let job = self.db.write(|tx| {
            let (mut job, next) = load_for(tx, job_id, JobEvent::Start)?;
            let printer = printers::require_printer(tx, printer_id)?;
            if printer.printer_type != job.printer_type {
                warn!(printer = %printer.name, "printer type mismatch");
                return Err(PrintdeskError::PreconditionFailed(format!(
                    "printer `{}` is {} but the job needs {}",
                    printer.name, printer.printer_type, job.printer_type
                )));
            }
            if let Some(other) = jobs::running_job_on_printer(tx, printer_id)? {
                warn!(printer = %printer.name, %other, "printer already in use");
                return Err(PrintdeskError::PreconditionFailed(format!(
                    "printer `{}` is in use by job {other}",
                    printer.name
                )));
            }

            job.printer = Some(printer.id);
            job.date_started = Some(Utc::now());
            if let Some(colour) = colour.filter(|c| !c.trim().is_empty()) {
                job.colour = Some(colour);
            }
            commit_status(tx, &mut job, JobEvent::Start, next)?;
            Ok(job)
        })?;
        info!(job_id = %job.id, "job started");
        Ok(job)
    }

    /// running → completed: telemetry, scoring, notification.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub fn complete(&self, job_id: &JobId) -> Result<Transition> {
        self.finish(job_id, JobEvent::Complete, Outcome::Completed)
    }

    /// running → failed, or back to queued when `requeue` is set.
    ///
    /// Both paths count a failed print on the printer.  A requeue appends the
    /// next "Requeue #N" marker, releases the printer and skips scoring and
    /// notification.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub fn fail(&self, job_id: &JobId, requeue: bool) -> Result<Transition> {
        if !requeue {
            return self.finish(job_id, JobEvent::Fail, Outcome::Failed);
        }

        let job = self.db.write(|tx| {
            let (mut job, next) = load_for(tx, job_id, JobEvent::Requeue)?;
            count_on_printer(tx, &job, Outcome::Failed)?;
            job.queue_notes = append_marker(&job.queue_notes);
            job.printer = None;
            job.date_started = None;
            commit_status(tx, &mut job, JobEvent::Requeue, next)?;
            Ok(job)
        })?;
        info!(job_id = %job.id, "job requeued after failure");
        Ok(Transition::clean(job))
    }

    /// queued / under_review → rejected, scored and notified.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub fn reject(&self, job_id: &JobId) -> Result<Transition> {
        self.finish(job_id, JobEvent::Reject, Outcome::Rejected)
    }

    /// under_review → queued
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub fn queue(&self, job_id: &JobId) -> Result<PrintJob> {
        self.advance(job_id, JobEvent::Queue)
    }

    /// queued → under_review
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub fn review(&self, job_id: &JobId) -> Result<PrintJob> {
        self.advance(job_id, JobEvent::Review)
    }

    /// Remove a job and its history, whatever its state.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub fn delete(&self, job_id: &JobId) -> Result<()> {
        let removed = self.db.write(|tx| jobs::delete_job(tx, job_id))?;
        if !removed {
            return Err(PrintdeskError::not_found("print job", job_id));
        }
        info!("job deleted");
        Ok(())
    }

    // -- Queries and edits ---------------------------------------------------

    pub fn job(&self, job_id: &JobId) -> Result<PrintJob> {
        self.db.read(|conn| jobs::require_job(conn, job_id))
    }

    /// Every job, newest first.
    pub fn jobs(&self) -> Result<Vec<PrintJob>> {
        self.db.read(jobs::all_jobs)
    }

    /// Jobs in the status named by `tag`, oldest first.
    pub fn jobs_with_status(&self, tag: &str) -> Result<Vec<PrintJob>> {
        let status: JobStatus = tag.parse()?;
        self.db.read(|conn| jobs::jobs_with_status(conn, status))
    }

    pub fn jobs_for_user(&self, user_id: &UserId) -> Result<Vec<PrintJob>> {
        self.db.read(|conn| {
            users::require_user(conn, user_id)?;
            jobs::jobs_for_user(conn, user_id)
        })
    }

    /// Transition history for one job, oldest first.
    pub fn history(&self, job_id: &JobId) -> Result<Vec<TransitionRecord>> {
        self.db.read(|conn| {
            jobs::require_job(conn, job_id)?;
            history::for_job(conn, job_id)
        })
    }

    /// The `limit` most recent transitions across every job, newest first.
    pub fn recent_transitions(&self, limit: usize) -> Result<Vec<TransitionRecord>> {
        self.db.read(|conn| history::recent(conn, limit))
    }

    /// Apply a validated edit to a job's free-text fields.
    #[instrument(skip(self, patch), fields(job_id = %job_id))]
    pub fn update_job(&self, job_id: &JobId, patch: &JobPatch) -> Result<PrintJob> {
        self.db.write(|tx| {
            let mut job = jobs::require_job(tx, job_id)?;
            patch.apply_to(&mut job)?;
            jobs::save_job(tx, &job)?;
            Ok(job)
        })
    }

    // -- Internals -----------------------------------------------------------

    /// Status-only transition with no side effects.
    fn advance(&self, job_id: &JobId, event: JobEvent) -> Result<PrintJob> {
        let job = self.db.write(|tx| {
            let (mut job, next) = load_for(tx, job_id, event)?;
            commit_status(tx, &mut job, event, next)?;
            Ok(job)
        })?;
        info!(job_id = %job.id, %event, status = %job.status, "transition committed");
        Ok(job)
    }

    /// Transition into a terminal state that is scored and notified.
    fn finish(&self, job_id: &JobId, event: JobEvent, outcome: Outcome) -> Result<Transition> {
        let (job, notice) = self.db.write(|tx| {
            let (mut job, next) = load_for(tx, job_id, event)?;
            count_on_printer(tx, &job, outcome)?;
            let submitter = record_outcome(tx, &job, outcome, &self.thresholds)?;
            job.date_ended = Some(Utc::now());
            commit_status(tx, &mut job, event, next)?;
            let notice = Notice::new(&submitter, &job, outcome);
            Ok((job, notice))
        })?;
        info!(job_id = %job.id, %event, status = %job.status, "transition committed");
        Ok(self.dispatch(job, notice))
    }

    fn dispatch(&self, job: PrintJob, notice: Notice) -> Transition {
        let user = notice.user_id;
        let outcome = notice.outcome;
        match self.notifier.notify(notice) {
            Ok(()) => Transition::clean(job),
            Err(e) => {
                warn!(job_id = %job.id, %user, "notification failed: {e}");
                Transition {
                    job,
                    warnings: vec![TransitionWarning::NotificationFailed {
                        user,
                        outcome,
                        reason: e.to_string(),
                    }],
                }
            }
        }
    }
}

/// Normalise the reviewing rep: the named `rep_check`, or the submitter
/// when none is given.  A named rep that does not exist is `NotFound`.
fn resolve_reviewer(conn: &Connection, submitter: &User, rep_check: Option<UserId>) -> Result<User> {
    match rep_check {
        None => Ok(submitter.clone()),
        Some(id) if id == submitter.id => Ok(submitter.clone()),
        Some(id) => users::require_user(conn, &id),
    }
}

/// Fetch a job and check that `event` is legal from its current status.
fn load_for(conn: &Connection, job_id: &JobId, event: JobEvent) -> Result<(PrintJob, JobStatus)> {
    let job = jobs::require_job(conn, job_id)?;
    let next = ensure_transition(job_id, job.status, event)?;
    Ok((job, next))
}

/// Persist the new status and append it to the job's history.
fn commit_status(conn: &Connection, job: &mut PrintJob, event: JobEvent, next: JobStatus) -> Result<()> {
    let from = job.status;
    job.status = next;
    jobs::save_job(conn, job)?;
    history::record(conn, &job.id, event.as_str(), Some(from), next)
}

/// Add a finished print to its printer's telemetry.  Outcomes that never
/// reached a printer (rejections) leave telemetry alone.
fn count_on_printer(conn: &Connection, job: &PrintJob, outcome: Outcome) -> Result<()> {
    let delta = match outcome {
        Outcome::Completed => TelemetryDelta::completed(job.print_time, job.filament_usage),
        Outcome::Failed => TelemetryDelta::failed(job.print_time, job.filament_usage),
        Outcome::Rejected => return Ok(()),
    };
    let printer_id = job.printer.ok_or_else(|| {
        PrintdeskError::DependencyFailure(format!("running job {} has no printer assigned", job.id))
    })?;
    telemetry::increment(conn, &printer_id, &delta)
        .map(|_| ())
        .map_err(|e| match e {
            PrintdeskError::NotFound { .. } => PrintdeskError::DependencyFailure(format!(
                "telemetry for printer {printer_id} could not be recorded: {e}"
            )),
            other => other,
        })
}
