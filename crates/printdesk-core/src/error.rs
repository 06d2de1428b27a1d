// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for printdesk.

use thiserror::Error;

use crate::types::JobStatus;

/// Top-level error type for all printdesk operations.
#[derive(Debug, Error)]
pub enum PrintdeskError {
    // -- Domain errors --
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("job {job} is {status}; `{event}` is not allowed from this state")]
    InvalidState {
        job: String,
        status: JobStatus,
        event: &'static str,
    },

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("dependency failure: {0}")]
    DependencyFailure(String),

    // -- Input validation --
    #[error("invalid value: {0}")]
    Validation(String),

    #[error("unknown {kind} `{value}`")]
    UnknownTag { kind: &'static str, value: String },

    // -- Storage / configuration --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PrintdeskError {
    /// Shorthand for a `NotFound` on the given entity kind.
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PrintdeskError>;
