// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Error envelopes for the API layer that sits in front of the lifecycle
// services.
//
// Every `PrintdeskError` falls into one of the domain classes below, which in
// turn picks the status code and whether a caller may safely retry.

use serde::{Deserialize, Serialize};

use crate::error::PrintdeskError;

/// Domain error class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A job, user or printer reference does not resolve.
    NotFound,
    /// The event is not legal from the job's current status.
    InvalidState,
    /// Bad input or a violated business rule; fix the request and resend.
    PreconditionFailed,
    /// A collaborator (telemetry, notification queue) could not complete.
    DependencyFailure,
    /// Storage or configuration trouble on our side.
    Internal,
}

/// Classify an error for the API layer.
pub fn classify(err: &PrintdeskError) -> ErrorKind {
    match err {
        PrintdeskError::NotFound { .. } => ErrorKind::NotFound,
        PrintdeskError::InvalidState { .. } => ErrorKind::InvalidState,
        PrintdeskError::PreconditionFailed(_)
        | PrintdeskError::Validation(_)
        | PrintdeskError::UnknownTag { .. }
        | PrintdeskError::Serialization(_) => ErrorKind::PreconditionFailed,
        PrintdeskError::DependencyFailure(_) => ErrorKind::DependencyFailure,
        PrintdeskError::Config(_) | PrintdeskError::Database(_) | PrintdeskError::Io(_) => {
            ErrorKind::Internal
        }
    }
}

/// Response body for a failed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub status_code: u16,
    pub kind: ErrorKind,
    pub details: String,
    /// Whether resending the same request may succeed.
    pub retriable: bool,
}

impl From<&PrintdeskError> for ApiError {
    fn from(err: &PrintdeskError) -> Self {
        let kind = classify(err);
        let (status_code, retriable) = match kind {
            ErrorKind::NotFound => (404, false),
            ErrorKind::InvalidState => (409, false),
            ErrorKind::PreconditionFailed => (400, false),
            ErrorKind::DependencyFailure => (502, true),
            ErrorKind::Internal => (500, true),
        };
        Self {
            status_code,
            kind,
            details: err.to_string(),
            retriable,
        }
    }
}

impl From<PrintdeskError> for ApiError {
    fn from(err: PrintdeskError) -> Self {
        Self::from(&err)
    }
}
