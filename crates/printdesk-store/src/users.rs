// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// User repository.

use printdesk_core::error::{PrintdeskError, Result};
use printdesk_core::types::{User, UserId};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, instrument};

use crate::database::{Constraint, constraint_violation, db_err};
use crate::row::{parse_text, parse_ts, ts};

const USER_COLUMNS: &str = "id, uid, name, email, short_name, trust_score, is_rep, \
     score_editable, completed_count, failed_count, rejected_count, \
     slice_completed_count, slice_failed_count, slice_rejected_count, date_added";

#[instrument(skip(conn, user), fields(user_id = %user.id, uid = %user.uid))]
pub fn insert_user(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, uid, name, email, short_name, trust_score, is_rep, \
         score_editable, completed_count, failed_count, rejected_count, \
         slice_completed_count, slice_failed_count, slice_rejected_count, date_added) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            user.id.to_string(),
            user.uid,
            user.name,
            user.email,
            user.short_name,
            user.trust_score,
            user.is_rep,
            user.score_editable,
            user.completed_count,
            user.failed_count,
            user.rejected_count,
            user.slice_completed_count,
            user.slice_failed_count,
            user.slice_rejected_count,
            ts(&user.date_added),
        ],
    )
    .map_err(|e| match constraint_violation(&e) {
        Some(Constraint::Unique) => {
            PrintdeskError::PreconditionFailed(format!("user `{}` already exists", user.uid))
        }
        _ => db_err(e),
    })?;
    debug!("user inserted");
    Ok(())
}

pub fn get_user(conn: &Connection, id: &UserId) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id.to_string()],
        row_to_user,
    )
    .optional()
    .map_err(db_err)
}

/// Like [`get_user`] but a missing row is `NotFound`.
pub fn require_user(conn: &Connection, id: &UserId) -> Result<User> {
    get_user(conn, id)?.ok_or_else(|| PrintdeskError::not_found("user", id))
}

/// Look a user up by their identity-provider uid.
pub fn get_user_by_uid(conn: &Connection, uid: &str) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE uid = ?1"),
        params![uid],
        row_to_user,
    )
    .optional()
    .map_err(db_err)
}

/// Emails are stored lowercased, so the lookup lowercases too.
pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
        params![email.trim().to_lowercase()],
        row_to_user,
    )
    .optional()
    .map_err(db_err)
}

/// All users, alphabetically by name.
pub fn all_users(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY name ASC, uid ASC"))
        .map_err(db_err)?;
    let rows = stmt.query_map([], row_to_user).map_err(db_err)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
}

/// Overwrite every mutable column of an existing user.
#[instrument(skip(conn, user), fields(user_id = %user.id))]
pub fn save_user(conn: &Connection, user: &User) -> Result<()> {
    let changed = conn
        .execute(
            "UPDATE users SET name = ?2, email = ?3, short_name = ?4, trust_score = ?5, \
             is_rep = ?6, score_editable = ?7, completed_count = ?8, failed_count = ?9, \
             rejected_count = ?10, slice_completed_count = ?11, slice_failed_count = ?12, \
             slice_rejected_count = ?13 WHERE id = ?1",
            params![
                user.id.to_string(),
                user.name,
                user.email,
                user.short_name,
                user.trust_score,
                user.is_rep,
                user.score_editable,
                user.completed_count,
                user.failed_count,
                user.rejected_count,
                user.slice_completed_count,
                user.slice_failed_count,
                user.slice_rejected_count,
            ],
        )
        .map_err(|e| match constraint_violation(&e) {
            Some(Constraint::Other) => {
                PrintdeskError::Validation(format!("trust score {} is below the floor", user.trust_score))
            }
            _ => db_err(e),
        })?;
    if changed == 0 {
        return Err(PrintdeskError::not_found("user", user.id));
    }
    Ok(())
}

/// Delete a user.  Fails while any print job still references them.
#[instrument(skip(conn), fields(user_id = %id))]
pub fn delete_user(conn: &Connection, id: &UserId) -> Result<()> {
    let changed = conn
        .execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])
        .map_err(|e| match constraint_violation(&e) {
            Some(Constraint::ForeignKey) => PrintdeskError::PreconditionFailed(format!(
                "user {id} still has print jobs on record"
            )),
            _ => db_err(e),
        })?;
    if changed == 0 {
        return Err(PrintdeskError::not_found("user", id));
    }
    debug!("user deleted");
    Ok(())
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let id: String = row.get(0)?;
    let date_added: String = row.get(14)?;
    Ok(User {
        id: parse_text(0, &id)?,
        uid: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        short_name: row.get(4)?,
        trust_score: row.get(5)?,
        is_rep: row.get(6)?,
        score_editable: row.get(7)?,
        completed_count: row.get(8)?,
        failed_count: row.get(9)?,
        rejected_count: row.get(10)?,
        slice_completed_count: row.get(11)?,
        slice_failed_count: row.get(12)?,
        slice_rejected_count: row.get(13)?,
        date_added: parse_ts(14, &date_added)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::{fixtures, jobs};
    use printdesk_core::types::JobStatus;

    fn make_db() -> Database {
        Database::open_in_memory().expect("open in-memory db")
    }

    #[test]
    fn insert_and_fetch_round_trips_every_field() {
        let db = make_db();
        let mut user = fixtures::user("ada01");
        user.short_name = Some("Ada".into());
        user.is_rep = true;
        user.slice_failed_count = 3;
        insert_user(db.conn(), &user).unwrap();

        let loaded = require_user(db.conn(), &user.id).unwrap();
        assert_eq!(loaded, user);
    }

    #[test]
    fn missing_user_is_not_found() {
        let db = make_db();
        let err = require_user(db.conn(), &UserId::new()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn duplicate_uid_is_rejected() {
        let db = make_db();
        insert_user(db.conn(), &fixtures::user("dup01")).unwrap();
        let err = insert_user(db.conn(), &fixtures::user("dup01")).unwrap_err();
        assert!(matches!(err, PrintdeskError::PreconditionFailed(_)));
    }

    #[test]
    fn lookup_by_uid_and_email() {
        let db = make_db();
        let user = fixtures::user("look01");
        insert_user(db.conn(), &user).unwrap();

        assert_eq!(get_user_by_uid(db.conn(), "look01").unwrap().unwrap().id, user.id);
        assert_eq!(
            get_user_by_email(db.conn(), "LOOK01@example.ac.uk").unwrap().unwrap().id,
            user.id
        );
        assert!(get_user_by_uid(db.conn(), "nobody").unwrap().is_none());
    }

    #[test]
    fn save_persists_counters() {
        let db = make_db();
        let mut user = fixtures::user("save01");
        insert_user(db.conn(), &user).unwrap();

        user.trust_score = 6;
        user.completed_count = 5;
        save_user(db.conn(), &user).unwrap();

        let loaded = require_user(db.conn(), &user.id).unwrap();
        assert_eq!(loaded.trust_score, 6);
        assert_eq!(loaded.completed_count, 5);
    }

    #[test]
    fn save_unknown_user_is_not_found() {
        let db = make_db();
        let err = save_user(db.conn(), &fixtures::user("ghost")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn all_users_sorted_by_name() {
        let db = make_db();
        let mut zed = fixtures::user("z01");
        zed.name = "Zed".into();
        let mut amy = fixtures::user("a01");
        amy.name = "Amy".into();
        insert_user(db.conn(), &zed).unwrap();
        insert_user(db.conn(), &amy).unwrap();

        let names: Vec<_> = all_users(db.conn()).unwrap().into_iter().map(|u| u.name).collect();
        assert_eq!(names, vec!["Amy", "Zed"]);
    }

    #[test]
    fn delete_with_jobs_is_refused() {
        let db = make_db();
        let user = fixtures::user("del01");
        insert_user(db.conn(), &user).unwrap();
        jobs::insert_job(db.conn(), &fixtures::job(&user, JobStatus::Queued)).unwrap();

        let err = delete_user(db.conn(), &user.id).unwrap_err();
        assert!(matches!(err, PrintdeskError::PreconditionFailed(_)));
    }

    #[test]
    fn delete_without_jobs_succeeds() {
        let db = make_db();
        let user = fixtures::user("del02");
        insert_user(db.conn(), &user).unwrap();
        delete_user(db.conn(), &user.id).unwrap();
        assert!(get_user(db.conn(), &user.id).unwrap().is_none());
        assert!(delete_user(db.conn(), &user.id).unwrap_err().is_not_found());
    }
}
