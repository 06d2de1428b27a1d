// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer telemetry aggregation.
//
// Counters are updated read-modify-write on the caller's connection.  Run
// inside `Database::write` so concurrent increments serialise on the write
// lock and none are lost.

use printdesk_core::error::Result;
use printdesk_core::types::{Printer, PrinterId, PrinterTelemetry, TelemetryDelta};
use rusqlite::Connection;
use tracing::{debug, info, instrument};

use crate::printers::{require_printer, save_printer};

/// Add `delta` to the printer's counters and return the updated printer.
///
/// Unset counters are treated as zero.  A negative component is rejected
/// before anything is written.
#[instrument(skip(conn, delta), fields(printer_id = %printer_id))]
pub fn increment(conn: &Connection, printer_id: &PrinterId, delta: &TelemetryDelta) -> Result<Printer> {
    delta.validate()?;
    let mut printer = require_printer(conn, printer_id)?;
    printer.telemetry.apply(delta)?;
    save_printer(conn, &printer)?;
    debug!(telemetry = ?printer.telemetry, "telemetry incremented");
    Ok(printer)
}

/// Clear every counter back to unset.
#[instrument(skip(conn), fields(printer_id = %printer_id))]
pub fn reset(conn: &Connection, printer_id: &PrinterId) -> Result<Printer> {
    let mut printer = require_printer(conn, printer_id)?;
    printer.telemetry = PrinterTelemetry::default();
    save_printer(conn, &printer)?;
    info!("telemetry reset");
    Ok(printer)
}
