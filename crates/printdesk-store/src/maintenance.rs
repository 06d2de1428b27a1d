// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer maintenance log.  Entries are removed with their printer.

use chrono::Utc;
use printdesk_core::error::{PrintdeskError, Result};
use printdesk_core::types::{MaintenanceLog, PrinterId};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{info, instrument};

use crate::database::db_err;
use crate::printers::require_printer;
use crate::row::{parse_text, parse_ts, ts};

/// Record a maintenance action against a printer, dated now.
#[instrument(skip_all, fields(printer_id = %printer_id, done_by = %done_by))]
pub fn add_log(
    conn: &Connection,
    printer_id: &PrinterId,
    maintenance_info: &str,
    done_by: &str,
) -> Result<MaintenanceLog> {
    if maintenance_info.trim().is_empty() {
        return Err(PrintdeskError::Validation("maintenance_info must not be empty".into()));
    }
    if done_by.trim().is_empty() {
        return Err(PrintdeskError::Validation("done_by must not be empty".into()));
    }
    require_printer(conn, printer_id)?;

    let maintenance_date = Utc::now();
    conn.execute(
        "INSERT INTO maintenance_logs (printer_id, maintenance_date, maintenance_info, done_by) \
         VALUES (?1, ?2, ?3, ?4)",
        params![printer_id.to_string(), ts(&maintenance_date), maintenance_info, done_by],
    )
    .map_err(db_err)?;

    let log = MaintenanceLog {
        id: conn.last_insert_rowid(),
        printer_id: *printer_id,
        maintenance_date,
        maintenance_info: maintenance_info.to_owned(),
        done_by: done_by.to_owned(),
    };
    info!(log_id = log.id, "maintenance logged");
    Ok(log)
}

pub fn get_log(conn: &Connection, id: i64) -> Result<Option<MaintenanceLog>> {
    conn.query_row(
        "SELECT id, printer_id, maintenance_date, maintenance_info, done_by \
         FROM maintenance_logs WHERE id = ?1",
        params![id],
        row_to_log,
    )
    .optional()
    .map_err(db_err)
}

/// Like `get_log`, but a missing entry is `NotFound`.
pub fn require_log(conn: &Connection, id: i64) -> Result<MaintenanceLog> {
    get_log(conn, id)?.ok_or_else(|| PrintdeskError::not_found("maintenance log", id))
}

/// Replace an entry's description.  The entry is re-dated to now; printer
/// and author stay as recorded.
#[instrument(skip(conn, maintenance_info))]
pub fn update_log(conn: &Connection, id: i64, maintenance_info: &str) -> Result<MaintenanceLog> {
    if maintenance_info.trim().is_empty() {
        return Err(PrintdeskError::Validation("maintenance_info must not be empty".into()));
    }
    let mut log = require_log(conn, id)?;
    log.maintenance_info = maintenance_info.to_owned();
    log.maintenance_date = Utc::now();
    conn.execute(
        "UPDATE maintenance_logs SET maintenance_info = ?1, maintenance_date = ?2 WHERE id = ?3",
        params![log.maintenance_info, ts(&log.maintenance_date), id],
    )
    .map_err(db_err)?;
    info!(log_id = id, "maintenance log updated");
    Ok(log)
}

/// Maintenance history for one printer, most recent first.
pub fn logs_for_printer(conn: &Connection, printer_id: &PrinterId) -> Result<Vec<MaintenanceLog>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, printer_id, maintenance_date, maintenance_info, done_by \
             FROM maintenance_logs WHERE printer_id = ?1 ORDER BY id DESC",
        )
        .map_err(db_err)?;
    let rows = stmt
        .query_map(params![printer_id.to_string()], row_to_log)
        .map_err(db_err)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
}

pub fn delete_log(conn: &Connection, id: i64) -> Result<bool> {
    let changed = conn
        .execute("DELETE FROM maintenance_logs WHERE id = ?1", params![id])
        .map_err(db_err)?;
    Ok(changed > 0)
}

fn row_to_log(row: &Row<'_>) -> rusqlite::Result<MaintenanceLog> {
    let printer_id: String = row.get(1)?;
    let maintenance_date: String = row.get(2)?;
    Ok(MaintenanceLog {
        id: row.get(0)?,
        printer_id: parse_text(1, &printer_id)?,
        maintenance_date: parse_ts(2, &maintenance_date)?,
        maintenance_info: row.get(3)?,
        done_by: row.get(4)?,
    })
}
