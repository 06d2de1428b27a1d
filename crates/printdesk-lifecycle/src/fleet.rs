// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer fleet: registration, edits, telemetry and maintenance logs.

use printdesk_core::error::{PrintdeskError, Result};
use printdesk_core::patch::PrinterPatch;
use printdesk_core::types::{MaintenanceLog, NewPrinter, Printer, PrinterId, TelemetryDelta};
use printdesk_store::{SharedDatabase, jobs, maintenance, printers, telemetry};
use tracing::{info, instrument, warn};

#[derive(Clone)]
pub struct Fleet {
    db: SharedDatabase,
}

impl Fleet {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    // -- Printers ------------------------------------------------------------

    #[instrument(skip(self, new), fields(name = %new.name))]
    pub fn register_printer(&self, new: NewPrinter) -> Result<Printer> {
        let printer = Printer::new(new)?;
        self.db.write(|tx| printers::insert_printer(tx, &printer))?;
        info!(printer_id = %printer.id, "printer registered");
        Ok(printer)
    }

    pub fn printer(&self, id: &PrinterId) -> Result<Printer> {
        self.db.read(|conn| printers::require_printer(conn, id))
    }

    pub fn printer_by_name(&self, name: &str) -> Result<Printer> {
        self.db
            .read(|conn| printers::get_printer_by_name(conn, name))?
            .ok_or_else(|| PrintdeskError::not_found("printer", name))
    }

    pub fn printers(&self) -> Result<Vec<Printer>> {
        self.db.read(printers::all_printers)
    }

    /// Apply a validated edit.  The printer type is fixed while a job is
    /// running on it.
    #[instrument(skip(self, patch), fields(printer_id = %id))]
    pub fn update_printer(&self, id: &PrinterId, patch: &PrinterPatch) -> Result<Printer> {
        self.db.write(|tx| {
            let mut printer = printers::require_printer(tx, id)?;
            let retyped = patch
                .printer_type
                .is_some_and(|printer_type| printer_type != printer.printer_type);
            if retyped {
                if let Some(job) = jobs::running_job_on_printer(tx, id)? {
                    warn!(%job, "printer type change refused while printing");
                    return Err(PrintdeskError::PreconditionFailed(format!(
                        "printer `{}` is running job {job}; its type cannot change until the job ends",
                        printer.name
                    )));
                }
            }
            patch.apply_to(&mut printer)?;
            printers::save_printer(tx, &printer)?;
            Ok(printer)
        })
    }

    /// Remove a printer and its maintenance log.  Refused while any job
    /// references it.
    #[instrument(skip(self), fields(printer_id = %id))]
    pub fn delete_printer(&self, id: &PrinterId) -> Result<()> {
        self.db.write(|tx| printers::delete_printer(tx, id))
    }

    // -- Telemetry -----------------------------------------------------------

    /// Manual telemetry adjustment (e.g. days on time).
    pub fn increment_telemetry(&self, id: &PrinterId, delta: &TelemetryDelta) -> Result<Printer> {
        self.db.write(|tx| telemetry::increment(tx, id, delta))
    }

    /// Administrative reset of every counter.
    pub fn reset_telemetry(&self, id: &PrinterId) -> Result<Printer> {
        self.db.write(|tx| telemetry::reset(tx, id))
    }

    // -- Maintenance ---------------------------------------------------------

    pub fn add_maintenance(&self, id: &PrinterId, info: &str, done_by: &str) -> Result<MaintenanceLog> {
        self.db.write(|tx| maintenance::add_log(tx, id, info, done_by))
    }

    /// Newest entry first.
    pub fn maintenance_logs(&self, id: &PrinterId) -> Result<Vec<MaintenanceLog>> {
        self.db.read(|conn| {
            printers::require_printer(conn, id)?;
            maintenance::logs_for_printer(conn, id)
        })
    }

    /// Newest entry first, for the printer called `name`.
    pub fn maintenance_logs_by_printer_name(&self, name: &str) -> Result<Vec<MaintenanceLog>> {
        self.db.read(|conn| {
            let printer = printers::get_printer_by_name(conn, name)?
                .ok_or_else(|| PrintdeskError::not_found("printer", name))?;
            maintenance::logs_for_printer(conn, &printer.id)
        })
    }

    pub fn maintenance_log(&self, log_id: i64) -> Result<MaintenanceLog> {
        self.db.read(|conn| maintenance::require_log(conn, log_id))
    }

    /// Only the description of an entry may change.
    pub fn update_maintenance(&self, log_id: i64, maintenance_info: &str) -> Result<MaintenanceLog> {
        self.db.write(|tx| maintenance::update_log(tx, log_id, maintenance_info))
    }

    pub fn delete_maintenance(&self, log_id: i64) -> Result<()> {
        if self.db.write(|tx| maintenance::delete_log(tx, log_id))? {
            Ok(())
        } else {
            Err(PrintdeskError::not_found("maintenance log", log_id))
        }
    }
}
