// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// User accounts: first-login provisioning from an identity directory, plus
// the validated edits the API layer may make to a user.

use printdesk_core::config::TrustThresholds;
use printdesk_core::error::{PrintdeskError, Result};
use printdesk_core::patch::UserPatch;
use printdesk_core::types::{NewUser, User, UserId};
use printdesk_policy::{TrustLevel, level_for};
use printdesk_store::{SharedDatabase, users};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// A person as the identity directory describes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub given_name: String,
    pub surname: String,
    pub email: String,
}

/// Directory lookup used on first login (LDAP or similar).
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` when the directory has no such uid.
    fn lookup(&self, uid: &str) -> Result<Option<Identity>>;
}

#[derive(Clone)]
pub struct Accounts {
    db: SharedDatabase,
    thresholds: TrustThresholds,
}

impl Accounts {
    pub fn new(db: SharedDatabase, thresholds: TrustThresholds) -> Self {
        Self { db, thresholds }
    }

    /// Return the user for `uid`, creating them from the directory on their
    /// first login.
    #[instrument(skip(self, provider))]
    pub fn login(&self, provider: &dyn IdentityProvider, uid: &str) -> Result<User> {
        if let Some(user) = self.db.read(|conn| users::get_user_by_uid(conn, uid))? {
            return Ok(user);
        }

        let identity = provider
            .lookup(uid)?
            .ok_or_else(|| PrintdeskError::not_found("directory entry", uid))?;
        let candidate = User::new(NewUser {
            uid: uid.to_owned(),
            name: format!("{} {}", identity.given_name.trim(), identity.surname.trim()),
            email: identity.email,
            short_name: None,
            is_rep: false,
        })?;

        // A concurrent login may have created the user since the read above.
        let (user, created) = self.db.write(|tx| match users::get_user_by_uid(tx, uid)? {
            Some(existing) => Ok((existing, false)),
            None => {
                users::insert_user(tx, &candidate)?;
                Ok((candidate, true))
            }
        })?;
        if created {
            info!(user_id = %user.id, "user provisioned on first login");
        }
        Ok(user)
    }

    /// Explicit creation by staff.
    #[instrument(skip(self, new), fields(uid = %new.uid))]
    pub fn create_user(&self, new: NewUser) -> Result<User> {
        let user = User::new(new)?;
        self.db.write(|tx| users::insert_user(tx, &user))?;
        info!(user_id = %user.id, "user created");
        Ok(user)
    }

    pub fn user(&self, id: &UserId) -> Result<User> {
        self.db.read(|conn| users::require_user(conn, id))
    }

    pub fn user_by_uid(&self, uid: &str) -> Result<User> {
        self.db
            .read(|conn| users::get_user_by_uid(conn, uid))?
            .ok_or_else(|| PrintdeskError::not_found("user", uid))
    }

    pub fn user_by_email(&self, email: &str) -> Result<User> {
        self.db
            .read(|conn| users::get_user_by_email(conn, email))?
            .ok_or_else(|| PrintdeskError::not_found("user", email))
    }

    pub fn users(&self) -> Result<Vec<User>> {
        self.db.read(users::all_users)
    }

    /// Current trust level of `user` under the configured thresholds.
    pub fn level_of(&self, user: &User) -> TrustLevel {
        level_for(user.trust_score, &self.thresholds)
    }

    /// Apply a validated edit.  An empty patch writes nothing.
    #[instrument(skip(self, patch), fields(user_id = %id))]
    pub fn update_user(&self, id: &UserId, patch: &UserPatch) -> Result<User> {
        if patch.is_empty() {
            return self.user(id);
        }
        let user = self.db.write(|tx| {
            let mut user = users::require_user(tx, id)?;
            patch.apply_to(&mut user)?;
            users::save_user(tx, &user)?;
            Ok(user)
        })?;
        info!("user updated");
        Ok(user)
    }

    /// Delete a user with no print jobs on record.
    #[instrument(skip(self), fields(user_id = %id))]
    pub fn delete_user(&self, id: &UserId) -> Result<()> {
        self.db.write(|tx| users::delete_user(tx, id))
    }
}
