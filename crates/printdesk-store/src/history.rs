// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job transition history: append-only log of every status change.
//
// Schema:
//   job_transitions(
//     id          INTEGER PRIMARY KEY AUTOINCREMENT,
//     job_id      TEXT NOT NULL,   -- cascades with the job
//     event       TEXT NOT NULL,   -- e.g. "create", "start", "complete"
//     from_status TEXT,            -- NULL for the creating entry
//     to_status   TEXT NOT NULL,
//     at          TEXT NOT NULL    -- RFC 3339
//   )

use chrono::{DateTime, Utc};
use printdesk_core::error::Result;
use printdesk_core::types::{JobId, JobStatus};
use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::database::db_err;
use crate::row::{parse_opt_text, parse_text, parse_ts, ts};

/// A single recorded status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub id: i64,
    pub job_id: JobId,
    pub event: String,
    pub from_status: Option<JobStatus>,
    pub to_status: JobStatus,
    pub at: DateTime<Utc>,
}

/// Append a transition.  Call inside the transaction that changes the job so
/// the log never disagrees with the stored status.
#[instrument(skip_all, fields(job_id = %job_id, event = %event, to = %to))]
pub fn record(
    conn: &Connection,
    job_id: &JobId,
    event: &str,
    from: Option<JobStatus>,
    to: JobStatus,
) -> Result<()> {
    conn.execute(
        "INSERT INTO job_transitions (job_id, event, from_status, to_status, at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            job_id.to_string(),
            event,
            from.map(|s| s.as_str()),
            to.as_str(),
            ts(&Utc::now()),
        ],
    )
    .map_err(db_err)?;
    debug!("transition recorded");
    Ok(())
}

/// Every transition for one job, oldest first.
pub fn for_job(conn: &Connection, job_id: &JobId) -> Result<Vec<TransitionRecord>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, job_id, event, from_status, to_status, at FROM job_transitions \
             WHERE job_id = ?1 ORDER BY id ASC",
        )
        .map_err(db_err)?;
    let rows = stmt
        .query_map(params![job_id.to_string()], row_to_record)
        .map_err(db_err)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
}

/// The `limit` most recent transitions across all jobs, newest first.
pub fn recent(conn: &Connection, limit: usize) -> Result<Vec<TransitionRecord>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let mut stmt = conn
        .prepare(
            "SELECT id, job_id, event, from_status, to_status, at FROM job_transitions \
             ORDER BY id DESC LIMIT ?1",
        )
        .map_err(db_err)?;
    let rows = stmt.query_map(params![limit], row_to_record).map_err(db_err)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
}

pub fn count(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM job_transitions", [], |row| row.get(0))
        .map_err(db_err)
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<TransitionRecord> {
    let job_id: String = row.get(1)?;
    let to_status: String = row.get(4)?;
    let at: String = row.get(5)?;
    Ok(TransitionRecord {
        id: row.get(0)?,
        job_id: parse_text(1, &job_id)?,
        event: row.get(2)?,
        from_status: parse_opt_text(3, row.get(3)?)?,
        to_status: parse_text(4, &to_status)?,
        at: parse_ts(5, &at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::{fixtures, jobs, users};
    use printdesk_core::types::PrintJob;

    fn setup() -> (Database, PrintJob) {
        let db = Database::open_in_memory().expect("open in-memory db");
        let user = fixtures::user("hist01");
        users::insert_user(db.conn(), &user).unwrap();
        let job = fixtures::job(&user, JobStatus::Queued);
        jobs::insert_job(db.conn(), &job).unwrap();
        (db, job)
    }

    #[test]
    fn records_are_returned_in_order() {
        let (db, job) = setup();
        record(db.conn(), &job.id, "create", None, JobStatus::Queued).unwrap();
        record(db.conn(), &job.id, "start", Some(JobStatus::Queued), JobStatus::Running).unwrap();

        let log = for_job(db.conn(), &job.id).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].event, "create");
        assert_eq!(log[0].from_status, None);
        assert_eq!(log[1].from_status, Some(JobStatus::Queued));
        assert_eq!(log[1].to_status, JobStatus::Running);
    }

    #[test]
    fn recent_is_newest_first_and_limited() {
        let (db, job) = setup();
        record(db.conn(), &job.id, "create", None, JobStatus::Queued).unwrap();
        record(db.conn(), &job.id, "review", Some(JobStatus::Queued), JobStatus::UnderReview).unwrap();
        record(db.conn(), &job.id, "queue", Some(JobStatus::UnderReview), JobStatus::Queued).unwrap();

        let latest = recent(db.conn(), 2).unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].event, "queue");
        assert_eq!(count(db.conn()).unwrap(), 3);
    }

    #[test]
    fn deleting_job_drops_its_history() {
        let (db, job) = setup();
        record(db.conn(), &job.id, "create", None, JobStatus::Queued).unwrap();
        jobs::delete_job(db.conn(), &job.id).unwrap();
        assert!(for_job(db.conn(), &job.id).unwrap().is_empty());
        assert_eq!(count(db.conn()).unwrap(), 0);
    }
}
