// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Validated partial updates for users, printers and print jobs.
//
// Each patch lists exactly the fields an external caller may change.  Trust
// counters, job status and timestamps are absent on purpose: only the
// lifecycle state machine moves those.

use serde::{Deserialize, Serialize};

use crate::error::{PrintdeskError, Result};
use crate::types::{
    MIN_TRUST_SCORE, PrintJob, Printer, PrinterLocation, PrinterType, User, validate_email,
    validate_name,
};

/// Editable user profile fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    /// `Some(None)` clears the short name.
    #[serde(default, with = "double_option")]
    pub short_name: Option<Option<String>>,
    pub trust_score: Option<i64>,
    pub is_rep: Option<bool>,
    pub score_editable: Option<bool>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.short_name.is_none()
            && self.trust_score.is_none()
            && self.is_rep.is_none()
            && self.score_editable.is_none()
    }

    /// Validate every field, then apply all of them or none.
    pub fn apply_to(&self, user: &mut User) -> Result<()> {
        if let Some(name) = &self.name {
            validate_name("name", name)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(score) = self.trust_score {
            if score < MIN_TRUST_SCORE {
                return Err(PrintdeskError::Validation(format!(
                    "trust_score must be at least {MIN_TRUST_SCORE}"
                )));
            }
            // The lock is read before any unlock in the same patch takes effect.
            if !user.score_editable {
                return Err(PrintdeskError::PreconditionFailed(format!(
                    "trust score of user {} is locked",
                    user.id
                )));
            }
        }

        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.to_lowercase();
        }
        if let Some(short_name) = &self.short_name {
            user.short_name = short_name.clone().filter(|s| !s.trim().is_empty());
        }
        if let Some(score) = self.trust_score {
            user.trust_score = score;
        }
        if let Some(is_rep) = self.is_rep {
            user.is_rep = is_rep;
        }
        if let Some(editable) = self.score_editable {
            user.score_editable = editable;
        }
        Ok(())
    }
}

/// Editable printer fields. Telemetry is changed through the aggregator only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrinterPatch {
    pub name: Option<String>,
    pub printer_type: Option<PrinterType>,
    pub location: Option<PrinterLocation>,
    #[serde(default, with = "double_option")]
    pub ip: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    pub api_key: Option<Option<String>>,
}

impl PrinterPatch {
    pub fn apply_to(&self, printer: &mut Printer) -> Result<()> {
        if let Some(name) = &self.name {
            validate_name("printer name", name)?;
            printer.name = name.clone();
        }
        if let Some(printer_type) = self.printer_type {
            printer.printer_type = printer_type;
        }
        if let Some(location) = self.location {
            printer.location = location;
        }
        if let Some(ip) = &self.ip {
            printer.ip = ip.clone().filter(|s| !s.is_empty());
        }
        if let Some(api_key) = &self.api_key {
            printer.api_key = api_key.clone().filter(|s| !s.is_empty());
        }
        Ok(())
    }
}

/// Free-text fields of a job that staff may edit at any point.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobPatch {
    pub print_name: Option<String>,
    #[serde(default, with = "double_option")]
    pub upload_notes: Option<Option<String>>,
    pub queue_notes: Option<String>,
    #[serde(default, with = "double_option")]
    pub colour: Option<Option<String>>,
}

impl JobPatch {
    pub fn apply_to(&self, job: &mut PrintJob) -> Result<()> {
        if let Some(name) = &self.print_name {
            validate_name("print name", name)?;
            job.print_name = name.clone();
        }
        if let Some(notes) = &self.upload_notes {
            job.upload_notes = notes.clone();
        }
        if let Some(notes) = &self.queue_notes {
            job.queue_notes = notes.clone();
        }
        if let Some(colour) = &self.colour {
            job.colour = colour.clone();
        }
        Ok(())
    }
}

/// Distinguishes an absent field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, T>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NewUser;

    fn user() -> User {
        User::new(NewUser {
            uid: "cd456".into(),
            name: "Charles Babbage".into(),
            email: "cb@example.ac.uk".into(),
            short_name: None,
            is_rep: false,
        })
        .unwrap()
    }

    #[test]
    fn patch_updates_only_present_fields() {
        let mut u = user();
        let patch = UserPatch {
            short_name: Some(Some("Charlie".into())),
            is_rep: Some(true),
            ..Default::default()
        };
        patch.apply_to(&mut u).unwrap();
        assert_eq!(u.short_name.as_deref(), Some("Charlie"));
        assert!(u.is_rep);
        assert_eq!(u.name, "Charles Babbage");
    }

    #[test]
    fn locked_score_cannot_be_patched() {
        let mut u = user();
        u.score_editable = false;
        let patch = UserPatch {
            trust_score: Some(9),
            name: Some("Renamed".into()),
            ..Default::default()
        };
        let err = patch.apply_to(&mut u).unwrap_err();
        assert!(matches!(err, PrintdeskError::PreconditionFailed(_)));
        // Nothing applied.
        assert_eq!(u.name, "Charles Babbage");
        assert_eq!(u.trust_score, MIN_TRUST_SCORE);
    }

    #[test]
    fn score_below_floor_is_invalid() {
        let mut u = user();
        let patch = UserPatch {
            trust_score: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            patch.apply_to(&mut u),
            Err(PrintdeskError::Validation(_))
        ));
    }

    #[test]
    fn unknown_fields_are_rejected_at_the_boundary() {
        let result: std::result::Result<UserPatch, _> =
            serde_json::from_str(r#"{"slice_completed_count": 40}"#);
        assert!(result.is_err());
    }

    #[test]
    fn explicit_null_clears_optional_field() {
        let patch: UserPatch = serde_json::from_str(r#"{"short_name": null}"#).unwrap();
        assert_eq!(patch.short_name, Some(None));
        let patch: UserPatch = serde_json::from_str("{}").unwrap();
        assert!(patch.is_empty());
    }
}
