// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print job repository.
//
// Status and enum columns are stored as their canonical tags.  Queries by
// status return the oldest submission first so the queue reads in FIFO
// order; the unfiltered listing is newest first.

use printdesk_core::error::{PrintdeskError, Result};
use printdesk_core::types::{JobId, JobStatus, PrintJob, PrinterId, UserId};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, instrument};

use crate::database::{Constraint, constraint_violation, db_err};
use crate::row::{opt_ts, parse_opt_text, parse_opt_ts, parse_text, parse_ts, ts};

const JOB_COLUMNS: &str = "id, user_id, rep_check, print_name, gcode_slug, stl_slug, \
     printer_type, print_time, filament_usage, project, project_string, colour, printer_id, \
     status, upload_notes, queue_notes, date_added, date_started, date_ended";

fn map_write_err(e: rusqlite::Error, job: &PrintJob) -> PrintdeskError {
    match constraint_violation(&e) {
        Some(Constraint::Unique) => match job.printer {
            Some(printer) => PrintdeskError::PreconditionFailed(format!(
                "printer {printer} is already running another job"
            )),
            None => PrintdeskError::PreconditionFailed(format!("job {} already exists", job.id)),
        },
        Some(Constraint::ForeignKey) => PrintdeskError::PreconditionFailed(format!(
            "job {} references a user or printer that does not exist",
            job.id
        )),
        _ => db_err(e),
    }
}

#[instrument(skip(conn, job), fields(job_id = %job.id, status = %job.status))]
pub fn insert_job(conn: &Connection, job: &PrintJob) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO print_jobs ({JOB_COLUMNS}) VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)"
        ),
        params![
            job.id.to_string(),
            job.user_id.to_string(),
            job.rep_check.to_string(),
            job.print_name,
            job.gcode_slug,
            job.stl_slug,
            job.printer_type.as_str(),
            job.print_time,
            job.filament_usage,
            job.project.as_str(),
            job.project_string,
            job.colour,
            job.printer.map(|p| p.to_string()),
            job.status.as_str(),
            job.upload_notes,
            job.queue_notes,
            ts(&job.date_added),
            opt_ts(&job.date_started),
            opt_ts(&job.date_ended),
        ],
    )
    .map_err(|e| map_write_err(e, job))?;
    debug!("job inserted");
    Ok(())
}

pub fn get_job(conn: &Connection, id: &JobId) -> Result<Option<PrintJob>> {
    conn.query_row(
        &format!("SELECT {JOB_COLUMNS} FROM print_jobs WHERE id = ?1"),
        params![id.to_string()],
        row_to_job,
    )
    .optional()
    .map_err(db_err)
}

pub fn require_job(conn: &Connection, id: &JobId) -> Result<PrintJob> {
    get_job(conn, id)?.ok_or_else(|| PrintdeskError::not_found("print job", id))
}

/// Every job, newest submission first.
pub fn all_jobs(conn: &Connection) -> Result<Vec<PrintJob>> {
    query_jobs(
        conn,
        &format!("SELECT {JOB_COLUMNS} FROM print_jobs ORDER BY date_added DESC, rowid DESC"),
        params![],
    )
}

/// Jobs currently in `status`, oldest submission first.
pub fn jobs_with_status(conn: &Connection, status: JobStatus) -> Result<Vec<PrintJob>> {
    query_jobs(
        conn,
        &format!(
            "SELECT {JOB_COLUMNS} FROM print_jobs WHERE status = ?1 \
             ORDER BY date_added ASC, rowid ASC"
        ),
        params![status.as_str()],
    )
}

/// Jobs submitted by `user`, newest first.
pub fn jobs_for_user(conn: &Connection, user: &UserId) -> Result<Vec<PrintJob>> {
    query_jobs(
        conn,
        &format!(
            "SELECT {JOB_COLUMNS} FROM print_jobs WHERE user_id = ?1 \
             ORDER BY date_added DESC, rowid DESC"
        ),
        params![user.to_string()],
    )
}

/// The job currently running on `printer`, if any.
pub fn running_job_on_printer(conn: &Connection, printer: &PrinterId) -> Result<Option<JobId>> {
    let id: Option<String> = conn
        .query_row(
            "SELECT id FROM print_jobs WHERE printer_id = ?1 AND status = 'running'",
            params![printer.to_string()],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_err)?;
    id.map(|id| {
        id.parse()
            .map_err(|e| PrintdeskError::Database(format!("corrupt job id `{id}`: {e}")))
    })
    .transpose()
}

/// Overwrite every mutable column of an existing job.
#[instrument(skip(conn, job), fields(job_id = %job.id, status = %job.status))]
pub fn save_job(conn: &Connection, job: &PrintJob) -> Result<()> {
    let changed = conn
        .execute(
            "UPDATE print_jobs SET rep_check = ?2, print_name = ?3, stl_slug = ?4, \
             colour = ?5, printer_id = ?6, status = ?7, upload_notes = ?8, queue_notes = ?9, \
             date_started = ?10, date_ended = ?11 WHERE id = ?1",
            params![
                job.id.to_string(),
                job.rep_check.to_string(),
                job.print_name,
                job.stl_slug,
                job.colour,
                job.printer.map(|p| p.to_string()),
                job.status.as_str(),
                job.upload_notes,
                job.queue_notes,
                opt_ts(&job.date_started),
                opt_ts(&job.date_ended),
            ],
        )
        .map_err(|e| map_write_err(e, job))?;
    if changed == 0 {
        return Err(PrintdeskError::not_found("print job", job.id));
    }
    Ok(())
}

/// Remove a job and its transition history.  Returns `false` if no such job.
#[instrument(skip(conn), fields(job_id = %id))]
pub fn delete_job(conn: &Connection, id: &JobId) -> Result<bool> {
    let changed = conn
        .execute("DELETE FROM print_jobs WHERE id = ?1", params![id.to_string()])
        .map_err(db_err)?;
    Ok(changed > 0)
}

fn query_jobs(conn: &Connection, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<PrintJob>> {
    let mut stmt = conn.prepare(sql).map_err(db_err)?;
    let rows = stmt.query_map(args, row_to_job).map_err(db_err)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
}

fn row_to_job(row: &Row<'_>) -> rusqlite::Result<PrintJob> {
    let id: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let rep_check: String = row.get(2)?;
    let printer_type: String = row.get(6)?;
    let project: String = row.get(9)?;
    let status: String = row.get(13)?;
    let date_added: String = row.get(16)?;

    Ok(PrintJob {
        id: parse_text(0, &id)?,
        user_id: parse_text(1, &user_id)?,
        rep_check: parse_text(2, &rep_check)?,
        print_name: row.get(3)?,
        gcode_slug: row.get(4)?,
        stl_slug: row.get(5)?,
        printer_type: parse_text(6, &printer_type)?,
        print_time: row.get(7)?,
        filament_usage: row.get(8)?,
        project: parse_text(9, &project)?,
        project_string: row.get(10)?,
        colour: row.get(11)?,
        printer: parse_opt_text(12, row.get(12)?)?,
        status: parse_text(13, &status)?,
        upload_notes: row.get(14)?,
        queue_notes: row.get(15)?,
        date_added: parse_ts(16, &date_added)?,
        date_started: parse_opt_ts(17, row.get(17)?)?,
        date_ended: parse_opt_ts(18, row.get(18)?)?,
    })
}
