// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printdesk-store — SQLite persistence for users, printers, print jobs,
// maintenance logs and transition history, plus the printer telemetry
// aggregator.
//
// Repository functions take a `&Connection` so they run unchanged inside a
// `Transaction` (which derefs to `Connection`).  Callers that need several
// writes to land together use `Database::write`.

pub mod database;
pub mod history;
pub mod jobs;
pub mod maintenance;
pub mod printers;
pub mod telemetry;
pub mod users;

mod row;

pub use database::{Database, SharedDatabase};
pub use history::TransitionRecord;
pub use rusqlite::{Connection, Transaction};

#[cfg(test)]
pub(crate) mod fixtures {
    use printdesk_core::types::{
        JobStatus, NewPrintJob, NewPrinter, NewUser, PrintJob, Printer, PrinterLocation,
        PrinterType, ProjectType, User,
    };

    pub fn user(uid: &str) -> User {
        User::new(NewUser {
            uid: uid.into(),
            name: format!("User {uid}"),
            email: format!("{uid}@example.ac.uk"),
            short_name: None,
            is_rep: false,
        })
        .expect("valid fixture user")
    }

    pub fn printer(name: &str, printer_type: PrinterType) -> Printer {
        Printer::new(NewPrinter {
            name: name.into(),
            printer_type,
            location: PrinterLocation::Heartspace,
            ip: None,
            api_key: None,
        })
        .expect("valid fixture printer")
    }

    pub fn job(user: &User, status: JobStatus) -> PrintJob {
        PrintJob::new(
            NewPrintJob {
                user_id: user.id,
                rep_check: None,
                print_name: "calibration cube".into(),
                gcode_slug: "gcode/cube".into(),
                stl_slug: None,
                printer_type: PrinterType::Prusa,
                print_time: Some(1800),
                filament_usage: Some(9),
                project: ProjectType::Personal,
                project_string: None,
                upload_notes: None,
            },
            user.id,
            status,
        )
        .expect("valid fixture job")
    }
}
