// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printdesk-lifecycle — the print job state machine and the services the
// enclosing API layer calls: job transitions, account provisioning and the
// printer fleet.

pub mod accounts;
pub mod fleet;
pub mod machine;
pub mod notify;
pub mod requeue;
pub mod scoring;
pub mod service;

pub use accounts::{Accounts, Identity, IdentityProvider};
pub use fleet::Fleet;
pub use machine::{JobEvent, allowed_events, ensure_transition, next_status};
pub use notify::{LogSink, Notice, NoticeSink, Notifier, QueueNotifier, notification_queue, run_dispatcher};
pub use service::{PrintJobService, Transition, TransitionWarning};

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use printdesk_core::error::{PrintdeskError, Result};
    use printdesk_core::types::{NewPrinter, NewUser, Printer, PrinterLocation, PrinterType, User};
    use printdesk_store::{Database, SharedDatabase, printers, users};

    use crate::notify::{Notice, Notifier};

    /// Notifier that keeps every notice it is handed.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<Notice>>,
    }

    impl RecordingNotifier {
        pub fn sent(&self) -> Vec<Notice> {
            self.sent.lock().expect("notifier lock").clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notice: Notice) -> Result<()> {
            self.sent.lock().expect("notifier lock").push(notice);
            Ok(())
        }
    }

    /// Notifier whose delivery always fails.
    pub struct FailingNotifier;

    impl Notifier for FailingNotifier {
        fn notify(&self, _notice: Notice) -> Result<()> {
            Err(PrintdeskError::DependencyFailure("mail relay unreachable".into()))
        }
    }

    pub fn make_db() -> SharedDatabase {
        SharedDatabase::new(Database::open_in_memory().expect("open in-memory db"))
    }

    pub fn add_user(db: &SharedDatabase, uid: &str, is_rep: bool, trust_score: i64) -> User {
        let mut user = User::new(NewUser {
            uid: uid.into(),
            name: format!("User {uid}"),
            email: format!("{uid}@example.ac.uk"),
            short_name: None,
            is_rep,
        })
        .expect("valid test user");
        user.trust_score = trust_score;
        db.write(|tx| users::insert_user(tx, &user)).expect("insert user");
        user
    }

    pub fn add_printer(db: &SharedDatabase, name: &str, printer_type: PrinterType) -> Printer {
        let printer = Printer::new(NewPrinter {
            name: name.into(),
            printer_type,
            location: PrinterLocation::Heartspace,
            ip: None,
            api_key: None,
        })
        .expect("valid test printer");
        db.write(|tx| printers::insert_printer(tx, &printer))
            .expect("insert printer");
        printer
    }
}
