// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer repository.

use printdesk_core::error::{PrintdeskError, Result};
use printdesk_core::types::{Printer, PrinterId, PrinterTelemetry};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, instrument};

use crate::database::{Constraint, constraint_violation, db_err};
use crate::row::parse_text;

const PRINTER_COLUMNS: &str = "id, name, printer_type, location, ip, api_key, \
     total_time_printed, completed_prints, failed_prints, total_filament_used, days_on_time";

fn map_write_err(e: rusqlite::Error, printer: &Printer) -> PrintdeskError {
    match constraint_violation(&e) {
        Some(Constraint::Unique) => PrintdeskError::PreconditionFailed(format!(
            "a printer named `{}` already exists",
            printer.name
        )),
        _ => db_err(e),
    }
}

#[instrument(skip(conn, printer), fields(printer_id = %printer.id, name = %printer.name))]
pub fn insert_printer(conn: &Connection, printer: &Printer) -> Result<()> {
    let t = &printer.telemetry;
    conn.execute(
        "INSERT INTO printers (id, name, printer_type, location, ip, api_key, \
         total_time_printed, completed_prints, failed_prints, total_filament_used, days_on_time) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            printer.id.to_string(),
            printer.name,
            printer.printer_type.as_str(),
            printer.location.as_str(),
            printer.ip,
            printer.api_key,
            t.total_time_printed,
            t.completed_prints,
            t.failed_prints,
            t.total_filament_used,
            t.days_on_time,
        ],
    )
    .map_err(|e| map_write_err(e, printer))?;
    debug!("printer inserted");
    Ok(())
}

pub fn get_printer(conn: &Connection, id: &PrinterId) -> Result<Option<Printer>> {
    conn.query_row(
        &format!("SELECT {PRINTER_COLUMNS} FROM printers WHERE id = ?1"),
        params![id.to_string()],
        row_to_printer,
    )
    .optional()
    .map_err(db_err)
}

pub fn require_printer(conn: &Connection, id: &PrinterId) -> Result<Printer> {
    get_printer(conn, id)?.ok_or_else(|| PrintdeskError::not_found("printer", id))
}

pub fn get_printer_by_name(conn: &Connection, name: &str) -> Result<Option<Printer>> {
    conn.query_row(
        &format!("SELECT {PRINTER_COLUMNS} FROM printers WHERE name = ?1"),
        params![name],
        row_to_printer,
    )
    .optional()
    .map_err(db_err)
}

pub fn all_printers(conn: &Connection) -> Result<Vec<Printer>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {PRINTER_COLUMNS} FROM printers ORDER BY name ASC"))
        .map_err(db_err)?;
    let rows = stmt.query_map([], row_to_printer).map_err(db_err)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
}

/// Overwrite the descriptive columns and the telemetry counters.
#[instrument(skip(conn, printer), fields(printer_id = %printer.id))]
pub fn save_printer(conn: &Connection, printer: &Printer) -> Result<()> {
    let t = &printer.telemetry;
    let changed = conn
        .execute(
            "UPDATE printers SET name = ?2, printer_type = ?3, location = ?4, ip = ?5, \
             api_key = ?6, total_time_printed = ?7, completed_prints = ?8, failed_prints = ?9, \
             total_filament_used = ?10, days_on_time = ?11 WHERE id = ?1",
            params![
                printer.id.to_string(),
                printer.name,
                printer.printer_type.as_str(),
                printer.location.as_str(),
                printer.ip,
                printer.api_key,
                t.total_time_printed,
                t.completed_prints,
                t.failed_prints,
                t.total_filament_used,
                t.days_on_time,
            ],
        )
        .map_err(|e| map_write_err(e, printer))?;
    if changed == 0 {
        return Err(PrintdeskError::not_found("printer", printer.id));
    }
    Ok(())
}

/// Delete a printer and its maintenance log.  Refused while any job still
/// references the printer.
#[instrument(skip(conn), fields(printer_id = %id))]
pub fn delete_printer(conn: &Connection, id: &PrinterId) -> Result<()> {
    let changed = conn
        .execute("DELETE FROM printers WHERE id = ?1", params![id.to_string()])
        .map_err(|e| match constraint_violation(&e) {
            Some(Constraint::ForeignKey) => PrintdeskError::PreconditionFailed(format!(
                "printer {id} is referenced by print jobs"
            )),
            _ => db_err(e),
        })?;
    if changed == 0 {
        return Err(PrintdeskError::not_found("printer", id));
    }
    debug!("printer deleted");
    Ok(())
}

fn row_to_printer(row: &Row<'_>) -> rusqlite::Result<Printer> {
    let id: String = row.get(0)?;
    let printer_type: String = row.get(2)?;
    let location: String = row.get(3)?;
    Ok(Printer {
        id: parse_text(0, &id)?,
        name: row.get(1)?,
        printer_type: parse_text(2, &printer_type)?,
        location: parse_text(3, &location)?,
        ip: row.get(4)?,
        api_key: row.get(5)?,
        telemetry: PrinterTelemetry {
            total_time_printed: row.get(6)?,
            completed_prints: row.get(7)?,
            failed_prints: row.get(8)?,
            total_filament_used: row.get(9)?,
            days_on_time: row.get(10)?,
        },
    })
}
