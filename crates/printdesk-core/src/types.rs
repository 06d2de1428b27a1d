// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the printdesk job queue: users, printers, print jobs.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PrintdeskError, Result};

/// Lowest value a trust score may take.
pub const MIN_TRUST_SCORE: i64 = 1;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Unique identifier for a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

/// Unique identifier for a printer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrinterId(pub Uuid);

/// Unique identifier for a print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

macro_rules! uuid_id {
    ($($name:ident),+) => {
        $(
            impl $name {
                pub fn new() -> Self {
                    Self(Uuid::new_v4())
                }
            }

            impl Default for $name {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl FromStr for $name {
                type Err = uuid::Error;

                fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                    Uuid::parse_str(s).map(Self)
                }
            }
        )+
    };
}

uuid_id!(UserId, PrinterId, JobId);

// ---------------------------------------------------------------------------
// Closed enumerations
// ---------------------------------------------------------------------------

/// Lifecycle states of a print job.
///
/// `Approval` and `UnderReview`/`Queued` are chosen at creation; `Completed`,
/// `Failed` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Fast-tracked submission waiting for a lightweight human approval.
    Approval,
    /// Held for a reviewer to check the sliced file.
    UnderReview,
    /// Ready to be started on a printer.
    Queued,
    /// Assigned to a printer and printing.
    Running,
    Completed,
    Failed,
    Rejected,
}

impl JobStatus {
    pub const ALL: [JobStatus; 7] = [
        Self::Approval,
        Self::UnderReview,
        Self::Queued,
        Self::Running,
        Self::Completed,
        Self::Failed,
        Self::Rejected,
    ];

    /// Wire / storage tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approval => "approval",
            Self::UnderReview => "under_review",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Rejected => "rejected",
        }
    }

    /// No further transitions are accepted from a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Rejected)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = PrintdeskError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| PrintdeskError::UnknownTag {
                kind: "job status",
                value: s.to_owned(),
            })
    }
}

/// Scored result of a finished job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    Failed,
    Rejected,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Printer models in the makerspace fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrinterType {
    Ultimaker,
    Prusa,
}

impl PrinterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ultimaker => "ultimaker",
            Self::Prusa => "prusa",
        }
    }
}

impl FromStr for PrinterType {
    type Err = PrintdeskError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ultimaker" => Ok(Self::Ultimaker),
            "prusa" => Ok(Self::Prusa),
            _ => Err(PrintdeskError::UnknownTag {
                kind: "printer type",
                value: s.to_owned(),
            }),
        }
    }
}

impl fmt::Display for PrinterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Room a printer lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrinterLocation {
    Heartspace,
    Diamond,
}

impl PrinterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Heartspace => "heartspace",
            Self::Diamond => "diamond",
        }
    }
}

impl FromStr for PrinterLocation {
    type Err = PrintdeskError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "heartspace" => Ok(Self::Heartspace),
            "diamond" => Ok(Self::Diamond),
            _ => Err(PrintdeskError::UnknownTag {
                kind: "printer location",
                value: s.to_owned(),
            }),
        }
    }
}

/// What a print is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    Personal,
    UniModule,
    CoCurricular,
    Society,
    Other,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::UniModule => "uni_module",
            Self::CoCurricular => "co_curricular",
            Self::Society => "society",
            Self::Other => "other",
        }
    }
}

impl FromStr for ProjectType {
    type Err = PrintdeskError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "personal" => Ok(Self::Personal),
            "uni_module" => Ok(Self::UniModule),
            "co_curricular" => Ok(Self::CoCurricular),
            "society" => Ok(Self::Society),
            "other" => Ok(Self::Other),
            _ => Err(PrintdeskError::UnknownTag {
                kind: "project type",
                value: s.to_owned(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Fields supplied when a user record is first created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    /// Opaque identity from the university directory.
    pub uid: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub is_rep: bool,
}

/// A makerspace user: submitter of jobs and, when `is_rep`, a reviewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub uid: String,
    pub name: String,
    pub email: String,
    pub short_name: Option<String>,
    pub trust_score: i64,
    pub is_rep: bool,
    /// Whether administrators may set `trust_score` directly.
    pub score_editable: bool,
    pub completed_count: u32,
    pub failed_count: u32,
    pub rejected_count: u32,
    pub slice_completed_count: u32,
    pub slice_failed_count: u32,
    pub slice_rejected_count: u32,
    pub date_added: DateTime<Utc>,
}

impl User {
    pub fn new(new: NewUser) -> Result<Self> {
        validate_name("name", &new.name)?;
        validate_email(&new.email)?;
        Ok(Self {
            id: UserId::new(),
            uid: new.uid,
            name: new.name,
            email: new.email.to_lowercase(),
            short_name: new.short_name.filter(|s| !s.trim().is_empty()),
            trust_score: MIN_TRUST_SCORE,
            is_rep: new.is_rep,
            score_editable: true,
            completed_count: 0,
            failed_count: 0,
            rejected_count: 0,
            slice_completed_count: 0,
            slice_failed_count: 0,
            slice_rejected_count: 0,
            date_added: Utc::now(),
        })
    }

    /// Name used when addressing the user.
    pub fn display_name(&self) -> &str {
        self.short_name.as_deref().unwrap_or(&self.name)
    }

    /// Number of jobs this user has checked as a rep.
    pub fn review_volume(&self) -> u32 {
        self.slice_completed_count + self.slice_failed_count + self.slice_rejected_count
    }

    /// Checked jobs that ended badly.
    pub fn review_failures(&self) -> u32 {
        self.slice_failed_count + self.slice_rejected_count
    }

    /// Count an outcome against the user as submitter.
    pub fn count_submission(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Completed => self.completed_count += 1,
            Outcome::Failed => self.failed_count += 1,
            Outcome::Rejected => self.rejected_count += 1,
        }
    }

    /// Count an outcome against the user as the reviewing rep.
    pub fn count_review(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Completed => self.slice_completed_count += 1,
            Outcome::Failed => self.slice_failed_count += 1,
            Outcome::Rejected => self.slice_rejected_count += 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Printers
// ---------------------------------------------------------------------------

/// Cumulative usage counters; `None` until first incremented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterTelemetry {
    /// Seconds spent printing.
    pub total_time_printed: Option<i64>,
    pub completed_prints: Option<i64>,
    pub failed_prints: Option<i64>,
    /// Grams of filament.
    pub total_filament_used: Option<i64>,
    pub days_on_time: Option<i64>,
}

/// Increments to apply to a printer's telemetry. Absent fields are untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryDelta {
    #[serde(default)]
    pub total_time_printed: Option<i64>,
    #[serde(default)]
    pub completed_prints: Option<i64>,
    #[serde(default)]
    pub failed_prints: Option<i64>,
    #[serde(default)]
    pub total_filament_used: Option<i64>,
    #[serde(default)]
    pub days_on_time: Option<i64>,
}

impl TelemetryDelta {
    /// Delta recorded when a job finishes successfully.
    pub fn completed(print_time: i64, filament_usage: i64) -> Self {
        Self {
            total_time_printed: Some(print_time),
            completed_prints: Some(1),
            total_filament_used: Some(filament_usage),
            ..Self::default()
        }
    }

    /// Delta recorded when a job fails, whether or not it is requeued.
    pub fn failed(print_time: i64, filament_usage: i64) -> Self {
        Self {
            total_time_printed: Some(print_time),
            failed_prints: Some(1),
            total_filament_used: Some(filament_usage),
            ..Self::default()
        }
    }

    fn fields(&self) -> [(&'static str, Option<i64>); 5] {
        [
            ("total_time_printed", self.total_time_printed),
            ("completed_prints", self.completed_prints),
            ("failed_prints", self.failed_prints),
            ("total_filament_used", self.total_filament_used),
            ("days_on_time", self.days_on_time),
        ]
    }

    /// Counters only move forward; a reset is a separate administrative act.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in self.fields() {
            if let Some(v) = value.filter(|v| *v < 0) {
                return Err(PrintdeskError::Validation(format!(
                    "{field} increment must not be negative (got {v})"
                )));
            }
        }
        Ok(())
    }
}

impl PrinterTelemetry {
    /// Add `delta` to the counters, treating unset counters as zero.
    pub fn apply(&mut self, delta: &TelemetryDelta) -> Result<()> {
        delta.validate()?;
        bump(&mut self.total_time_printed, delta.total_time_printed);
        bump(&mut self.completed_prints, delta.completed_prints);
        bump(&mut self.failed_prints, delta.failed_prints);
        bump(&mut self.total_filament_used, delta.total_filament_used);
        bump(&mut self.days_on_time, delta.days_on_time);
        Ok(())
    }
}

fn bump(counter: &mut Option<i64>, delta: Option<i64>) {
    if let Some(d) = delta {
        *counter = Some(counter.unwrap_or(0).saturating_add(d));
    }
}

/// Fields supplied when a printer is registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPrinter {
    pub name: String,
    pub printer_type: PrinterType,
    pub location: PrinterLocation,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

/// A 3D printer in the fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Printer {
    pub id: PrinterId,
    pub name: String,
    pub printer_type: PrinterType,
    pub location: PrinterLocation,
    pub ip: Option<String>,
    pub api_key: Option<String>,
    pub telemetry: PrinterTelemetry,
}

impl Printer {
    pub fn new(new: NewPrinter) -> Result<Self> {
        validate_name("printer name", &new.name)?;
        Ok(Self {
            id: PrinterId::new(),
            name: new.name,
            printer_type: new.printer_type,
            location: new.location,
            ip: new.ip.filter(|s| !s.is_empty()),
            api_key: new.api_key.filter(|s| !s.is_empty()),
            telemetry: PrinterTelemetry::default(),
        })
    }
}

/// A maintenance note attached to a printer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceLog {
    pub id: i64,
    pub printer_id: PrinterId,
    pub maintenance_date: DateTime<Utc>,
    pub maintenance_info: String,
    pub done_by: String,
}

// ---------------------------------------------------------------------------
// Print jobs
// ---------------------------------------------------------------------------

/// A print request as submitted by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPrintJob {
    pub user_id: UserId,
    /// Reviewing rep; the submitter checks their own job when absent.
    #[serde(default)]
    pub rep_check: Option<UserId>,
    pub print_name: String,
    /// Reference to the sliced file in external storage.
    pub gcode_slug: String,
    /// Reference to the model file; required for fast-tracked submissions.
    #[serde(default)]
    pub stl_slug: Option<String>,
    pub printer_type: PrinterType,
    /// Estimated print time in seconds.
    #[serde(default)]
    pub print_time: Option<i64>,
    /// Estimated filament in grams.
    #[serde(default)]
    pub filament_usage: Option<i64>,
    pub project: ProjectType,
    #[serde(default)]
    pub project_string: Option<String>,
    #[serde(default)]
    pub upload_notes: Option<String>,
}

/// A print job record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: JobId,
    pub user_id: UserId,
    pub rep_check: UserId,
    pub print_name: String,
    pub gcode_slug: String,
    pub stl_slug: Option<String>,
    pub printer_type: PrinterType,
    pub print_time: i64,
    pub filament_usage: i64,
    pub project: ProjectType,
    pub project_string: Option<String>,
    pub colour: Option<String>,
    /// Only set once the job has been started.
    pub printer: Option<PrinterId>,
    pub status: JobStatus,
    pub upload_notes: Option<String>,
    pub queue_notes: String,
    pub date_added: DateTime<Utc>,
    pub date_started: Option<DateTime<Utc>>,
    pub date_ended: Option<DateTime<Utc>>,
}

impl PrintJob {
    /// Build the record for a validated submission with its initial status.
    ///
    /// The model-file reference is only kept for jobs entering `Approval`,
    /// and the project description only for non-personal projects.
    pub fn new(request: NewPrintJob, rep_check: UserId, status: JobStatus) -> Result<Self> {
        validate_name("print name", &request.print_name)?;
        if request.gcode_slug.trim().is_empty() {
            return Err(PrintdeskError::Validation("gcode_slug must not be empty".into()));
        }
        let print_time = request.print_time.unwrap_or(0);
        let filament_usage = request.filament_usage.unwrap_or(0);
        if print_time < 0 || filament_usage < 0 {
            return Err(PrintdeskError::Validation(
                "print_time and filament_usage must not be negative".into(),
            ));
        }

        let stl_slug = match status {
            JobStatus::Approval => request.stl_slug,
            _ => None,
        };
        let project_string = match request.project {
            ProjectType::Personal => None,
            _ => request.project_string,
        };

        Ok(Self {
            id: JobId::new(),
            user_id: request.user_id,
            rep_check,
            print_name: request.print_name,
            gcode_slug: request.gcode_slug,
            stl_slug,
            printer_type: request.printer_type,
            print_time,
            filament_usage,
            project: request.project,
            project_string,
            colour: None,
            printer: None,
            status,
            upload_notes: request.upload_notes,
            queue_notes: String::new(),
            date_added: Utc::now(),
            date_started: None,
            date_ended: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Field validation shared with the patch types
// ---------------------------------------------------------------------------

pub(crate) fn validate_name(field: &str, value: &str) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PrintdeskError::Validation(format!("{field} must not be empty")));
    }
    if trimmed.chars().count() > 60 {
        return Err(PrintdeskError::Validation(format!(
            "{field} must be at most 60 characters"
        )));
    }
    Ok(())
}

pub(crate) fn validate_email(value: &str) -> Result<()> {
    match value.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(PrintdeskError::Validation(format!(
            "`{value}` is not a valid email address"
        ))),
    }
}
