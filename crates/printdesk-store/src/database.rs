// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Database handle, schema and transaction helpers.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use printdesk_core::error::{PrintdeskError, Result};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, info, instrument};

/// Schema for every table.  Foreign keys keep jobs pointing at real users and
/// printers; the partial unique index allows at most one running job per
/// printer even if two writers race past the application-level check.
const SCHEMA_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id                    TEXT PRIMARY KEY,
        uid                   TEXT NOT NULL UNIQUE,
        name                  TEXT NOT NULL,
        email                 TEXT NOT NULL,
        short_name            TEXT,
        trust_score           INTEGER NOT NULL DEFAULT 1 CHECK (trust_score >= 1),
        is_rep                INTEGER NOT NULL DEFAULT 0,
        score_editable        INTEGER NOT NULL DEFAULT 1,
        completed_count       INTEGER NOT NULL DEFAULT 0,
        failed_count          INTEGER NOT NULL DEFAULT 0,
        rejected_count        INTEGER NOT NULL DEFAULT 0,
        slice_completed_count INTEGER NOT NULL DEFAULT 0,
        slice_failed_count    INTEGER NOT NULL DEFAULT 0,
        slice_rejected_count  INTEGER NOT NULL DEFAULT 0,
        date_added            TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS printers (
        id                  TEXT PRIMARY KEY,
        name                TEXT NOT NULL UNIQUE,
        printer_type        TEXT NOT NULL,
        location            TEXT NOT NULL,
        ip                  TEXT,
        api_key             TEXT,
        total_time_printed  INTEGER,
        completed_prints    INTEGER,
        failed_prints       INTEGER,
        total_filament_used INTEGER,
        days_on_time        INTEGER
    );

    CREATE TABLE IF NOT EXISTS print_jobs (
        id             TEXT PRIMARY KEY,
        user_id        TEXT NOT NULL REFERENCES users(id),
        rep_check      TEXT NOT NULL REFERENCES users(id),
        print_name     TEXT NOT NULL,
        gcode_slug     TEXT NOT NULL,
        stl_slug       TEXT,
        printer_type   TEXT NOT NULL,
        print_time     INTEGER NOT NULL DEFAULT 0,
        filament_usage INTEGER NOT NULL DEFAULT 0,
        project        TEXT NOT NULL,
        project_string TEXT,
        colour         TEXT,
        printer_id     TEXT REFERENCES printers(id),
        status         TEXT NOT NULL,
        upload_notes   TEXT,
        queue_notes    TEXT NOT NULL DEFAULT '',
        date_added     TEXT NOT NULL,
        date_started   TEXT,
        date_ended     TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_print_jobs_status ON print_jobs(status);

    CREATE UNIQUE INDEX IF NOT EXISTS idx_one_running_job_per_printer
        ON print_jobs(printer_id) WHERE status = 'running';

    CREATE TABLE IF NOT EXISTS maintenance_logs (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        printer_id       TEXT NOT NULL REFERENCES printers(id) ON DELETE CASCADE,
        maintenance_date TEXT NOT NULL,
        maintenance_info TEXT NOT NULL,
        done_by          TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS job_transitions (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        job_id      TEXT NOT NULL REFERENCES print_jobs(id) ON DELETE CASCADE,
        event       TEXT NOT NULL,
        from_status TEXT,
        to_status   TEXT NOT NULL,
        at          TEXT NOT NULL
    );
"#;

/// Convert a `rusqlite::Error` into a `PrintdeskError::Database`.
pub(crate) fn db_err(e: rusqlite::Error) -> PrintdeskError {
    PrintdeskError::Database(e.to_string())
}

/// Which SQLite constraint a failed statement tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Constraint {
    Unique,
    ForeignKey,
    Other,
}

pub(crate) fn constraint_violation(e: &rusqlite::Error) -> Option<Constraint> {
    match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Some(match err.extended_code {
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => Constraint::Unique,
                rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Constraint::ForeignKey,
                _ => Constraint::Other,
            })
        }
        _ => None,
    }
}

/// An open printdesk database.
///
/// All methods are synchronous because `rusqlite` does not support async
/// natively.  In an async context, wrap calls in `tokio::task::spawn_blocking`.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at the given path.
    ///
    /// WAL mode lets readers proceed while a transition holds the write lock;
    /// the busy timeout makes a second process wait for that lock instead of
    /// failing immediately.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| PrintdeskError::Database(format!("open: {e}")))?;

        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(|e| PrintdeskError::Database(format!("WAL pragma: {e}")))?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| PrintdeskError::Database(format!("busy timeout: {e}")))?;

        let db = Self::init(conn)?;
        info!("database opened");
        Ok(db)
    }

    /// Open an in-memory database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| PrintdeskError::Database(format!("open in-memory: {e}")))?;
        let db = Self::init(conn)?;
        debug!("in-memory database opened");
        Ok(db)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| PrintdeskError::Database(format!("foreign keys pragma: {e}")))?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| PrintdeskError::Database(format!("create schema: {e}")))?;
        Ok(Self { conn })
    }

    /// Connection for reads outside a transaction.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside an immediate (write-locking) transaction.
    ///
    /// The transaction commits only if `f` returns `Ok`; any error rolls back
    /// every statement `f` executed.
    pub fn write<T>(&mut self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;
        let value = f(&tx)?;
        tx.commit().map_err(db_err)?;
        Ok(value)
    }
}

/// A database shared between request handlers.
///
/// The mutex serialises writers within the process so that a precondition
/// check and the mutation it guards are never interleaved with another
/// transition; the immediate transaction does the same across processes.
#[derive(Clone)]
pub struct SharedDatabase {
    inner: Arc<Mutex<Database>>,
}

impl SharedDatabase {
    pub fn new(db: Database) -> Self {
        Self {
            inner: Arc::new(Mutex::new(db)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Database>> {
        self.inner
            .lock()
            .map_err(|_| PrintdeskError::Database("database lock poisoned".into()))
    }

    /// See [`Database::write`].
    pub fn write<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut db = self.lock()?;
        db.write(f)
    }

    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let db = self.lock()?;
        f(db.conn())
    }
}
