// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JSON-lines command console.
//
// Each line on stdin is one `Command`; each reply is one line on stdout,
// either a `Reply` or an `ApiError`.  Service calls block on SQLite, so every
// command runs on tokio's blocking pool.

use printdesk_core::error::{PrintdeskError, Result};
use printdesk_core::patch::{JobPatch, PrinterPatch, UserPatch};
use printdesk_core::responses::ApiError;
use printdesk_core::types::{JobId, NewPrintJob, NewPrinter, NewUser, PrinterId, TelemetryDelta, UserId};
use printdesk_lifecycle::Transition;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::services::app_services::AppServices;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    // -- Users ---------------------------------------------------------------
    Login { uid: String },
    CreateUser(NewUser),
    GetUser { user_id: UserId },
    ListUsers,
    UpdateUser { user_id: UserId, patch: UserPatch },
    DeleteUser { user_id: UserId },

    // -- Printers ------------------------------------------------------------
    RegisterPrinter(NewPrinter),
    GetPrinter { printer_id: PrinterId },
    PrinterByName { name: String },
    ListPrinters,
    UpdatePrinter { printer_id: PrinterId, patch: PrinterPatch },
    DeletePrinter { printer_id: PrinterId },
    IncrementTelemetry { printer_id: PrinterId, delta: TelemetryDelta },
    ResetTelemetry { printer_id: PrinterId },
    AddMaintenance { printer_id: PrinterId, info: String, done_by: String },
    GetMaintenance { log_id: i64 },
    ListMaintenance { printer_id: PrinterId },
    MaintenanceByPrinterName { name: String },
    UpdateMaintenance { log_id: i64, info: String },
    DeleteMaintenance { log_id: i64 },

    // -- Print jobs ----------------------------------------------------------
    CreateJob(NewPrintJob),
    GetJob { job_id: JobId },
    ListJobs {
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        user_id: Option<UserId>,
    },
    JobHistory { job_id: JobId },
    RecentTransitions {
        #[serde(default = "default_recent_limit")]
        limit: usize,
    },
    UpdateJob { job_id: JobId, patch: JobPatch },
    DeleteJob { job_id: JobId },
    Approve { job_id: JobId },
    RejectApproval { job_id: JobId },
    Start {
        job_id: JobId,
        printer_id: PrinterId,
        #[serde(default)]
        colour: Option<String>,
    },
    Complete { job_id: JobId },
    Fail {
        job_id: JobId,
        #[serde(default)]
        requeue: bool,
    },
    Reject { job_id: JobId },
    Queue { job_id: JobId },
    Review { job_id: JobId },
}

fn default_recent_limit() -> usize {
    50
}

/// Successful response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub status_code: u16,
    pub details: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_info: Option<String>,
}

impl Reply {
    fn ok<T: Serialize>(body: &T) -> Result<Self> {
        Ok(Self {
            status_code: 200,
            details: serde_json::to_value(body)?,
            extra_info: None,
        })
    }

    fn created<T: Serialize>(body: &T) -> Result<Self> {
        Ok(Self {
            status_code: 201,
            ..Self::ok(body)?
        })
    }

    fn deleted(what: &str) -> Self {
        Self {
            status_code: 200,
            details: json!({ "deleted": what }),
            extra_info: None,
        }
    }

    fn transition(transition: &Transition) -> Result<Self> {
        let extra_info = if transition.is_clean() {
            None
        } else {
            Some(format!(
                "job updated; {} follow-up(s) failed, see warnings",
                transition.warnings.len()
            ))
        };
        Ok(Self {
            status_code: 200,
            details: serde_json::to_value(transition)?,
            extra_info,
        })
    }
}

/// Run one command against the services.
pub fn execute(services: &AppServices, command: Command) -> Result<Reply> {
    let jobs = &services.jobs;
    let accounts = &services.accounts;
    let fleet = &services.fleet;

    match command {
        Command::Login { uid } => Reply::ok(&accounts.login(services.directory.as_ref(), &uid)?),
        Command::CreateUser(new) => Reply::created(&accounts.create_user(new)?),
        Command::GetUser { user_id } => {
            let user = accounts.user(&user_id)?;
            let level = accounts.level_of(&user);
            Ok(Reply {
                extra_info: Some(format!("trust level {level}")),
                ..Reply::ok(&user)?
            })
        }
        Command::ListUsers => Reply::ok(&accounts.users()?),
        Command::UpdateUser { user_id, patch } => Reply::ok(&accounts.update_user(&user_id, &patch)?),
        Command::DeleteUser { user_id } => {
            accounts.delete_user(&user_id)?;
            Ok(Reply::deleted("user"))
        }

        Command::RegisterPrinter(new) => Reply::created(&fleet.register_printer(new)?),
        Command::GetPrinter { printer_id } => Reply::ok(&fleet.printer(&printer_id)?),
        Command::PrinterByName { name } => Reply::ok(&fleet.printer_by_name(&name)?),
        Command::ListPrinters => Reply::ok(&fleet.printers()?),
        Command::UpdatePrinter { printer_id, patch } => {
            Reply::ok(&fleet.update_printer(&printer_id, &patch)?)
        }
        Command::DeletePrinter { printer_id } => {
            fleet.delete_printer(&printer_id)?;
            Ok(Reply::deleted("printer"))
        }
        Command::IncrementTelemetry { printer_id, delta } => {
            Reply::ok(&fleet.increment_telemetry(&printer_id, &delta)?)
        }
        Command::ResetTelemetry { printer_id } => Reply::ok(&fleet.reset_telemetry(&printer_id)?),
        Command::AddMaintenance {
            printer_id,
            info,
            done_by,
        } => Reply::created(&fleet.add_maintenance(&printer_id, &info, &done_by)?),
        Command::GetMaintenance { log_id } => Reply::ok(&fleet.maintenance_log(log_id)?),
        Command::ListMaintenance { printer_id } => Reply::ok(&fleet.maintenance_logs(&printer_id)?),
        Command::MaintenanceByPrinterName { name } => {
            Reply::ok(&fleet.maintenance_logs_by_printer_name(&name)?)
        }
        Command::UpdateMaintenance { log_id, info } => {
            Reply::ok(&fleet.update_maintenance(log_id, &info)?)
        }
        Command::DeleteMaintenance { log_id } => {
            fleet.delete_maintenance(log_id)?;
            Ok(Reply::deleted("maintenance log"))
        }

        Command::CreateJob(request) => Reply::created(&jobs.create(request)?),
        Command::GetJob { job_id } => Reply::ok(&jobs.job(&job_id)?),
        Command::ListJobs { status, user_id } => match (status, user_id) {
            (Some(_), Some(_)) => Err(PrintdeskError::PreconditionFailed(
                "filter by status or by user, not both".into(),
            )),
            (Some(tag), None) => Reply::ok(&jobs.jobs_with_status(&tag)?),
            (None, Some(user_id)) => Reply::ok(&jobs.jobs_for_user(&user_id)?),
            (None, None) => Reply::ok(&jobs.jobs()?),
        },
        Command::JobHistory { job_id } => Reply::ok(&jobs.history(&job_id)?),
        Command::RecentTransitions { limit } => Reply::ok(&jobs.recent_transitions(limit)?),
        Command::UpdateJob { job_id, patch } => Reply::ok(&jobs.update_job(&job_id, &patch)?),
        Command::DeleteJob { job_id } => {
            jobs.delete(&job_id)?;
            Ok(Reply::deleted("print job"))
        }
        Command::Approve { job_id } => Reply::ok(&jobs.approve(&job_id)?),
        Command::RejectApproval { job_id } => Reply::transition(&jobs.reject_approval(&job_id)?),
        Command::Start {
            job_id,
            printer_id,
            colour,
        } => Reply::ok(&jobs.start(&job_id, &printer_id, colour)?),
        Command::Complete { job_id } => Reply::transition(&jobs.complete(&job_id)?),
        Command::Fail { job_id, requeue } => Reply::transition(&jobs.fail(&job_id, requeue)?),
        Command::Reject { job_id } => Reply::transition(&jobs.reject(&job_id)?),
        Command::Queue { job_id } => Reply::ok(&jobs.queue(&job_id)?),
        Command::Review { job_id } => Reply::ok(&jobs.review(&job_id)?),
    }
}

/// Parse and execute one input line, producing the JSON line to write back.
pub async fn handle_line(services: &AppServices, line: &str) -> String {
    let outcome = match serde_json::from_str::<Command>(line) {
        Ok(command) => {
            debug!(?command, "command received");
            let services = services.clone();
            match tokio::task::spawn_blocking(move || execute(&services, command)).await {
                Ok(result) => result,
                Err(e) => Err(PrintdeskError::Io(std::io::Error::other(e))),
            }
        }
        Err(e) => Err(PrintdeskError::from(e)),
    };

    let encoded = match &outcome {
        Ok(reply) => serde_json::to_string(reply),
        Err(err) => {
            let api = ApiError::from(err);
            if api.status_code >= 500 {
                warn!(error = %err, "command failed");
            }
            serde_json::to_string(&api)
        }
    };
    encoded.unwrap_or_else(|e| {
        json!({ "status_code": 500, "kind": "internal", "details": e.to_string(), "retriable": false })
            .to_string()
    })
}

/// Read commands from stdin until EOF.  Returns the number handled.
pub async fn run(services: AppServices) -> Result<usize> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut handled = 0;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let mut out = handle_line(&services, &line).await;
        out.push('\n');
        stdout.write_all(out.as_bytes()).await?;
        stdout.flush().await?;
        handled += 1;
    }

    info!(handled, "console input closed");
    Ok(handled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use printdesk_core::AppConfig;
    use printdesk_core::types::{JobStatus, PrintJob, Printer, User};
    use printdesk_lifecycle::{Identity, IdentityProvider, notification_queue};
    use printdesk_store::{Database, SharedDatabase};

    struct OnePerson;

    impl IdentityProvider for OnePerson {
        fn lookup(&self, uid: &str) -> Result<Option<Identity>> {
            Ok((uid == "ada01").then(|| Identity {
                uid: uid.into(),
                given_name: "Ada".into(),
                surname: "Lovelace".into(),
                email: "Ada@Example.ac.uk".into(),
            }))
        }
    }

    fn services() -> (AppServices, tokio::sync::mpsc::Receiver<printdesk_lifecycle::Notice>) {
        let db = SharedDatabase::new(Database::open_in_memory().unwrap());
        let (notifier, rx) = notification_queue(16);
        let services = AppServices::with_database(
            db,
            &AppConfig::default(),
            Arc::new(notifier),
            Arc::new(OnePerson),
            PathBuf::from("."),
        );
        (services, rx)
    }

    async fn send(services: &AppServices, value: Value) -> Value {
        serde_json::from_str(&handle_line(services, &value.to_string()).await).unwrap()
    }

    fn details<T: for<'de> Deserialize<'de>>(reply: &Value) -> T {
        serde_json::from_value(reply["details"].clone()).unwrap()
    }

    #[tokio::test]
    async fn login_provisions_user() {
        let (services, _rx) = services();
        let reply = send(&services, json!({"op": "login", "uid": "ada01"})).await;
        assert_eq!(reply["status_code"], 200);
        let user: User = details(&reply);
        assert_eq!(user.name, "Ada Lovelace");
        assert_eq!(user.email, "ada@example.ac.uk");

        let missing = send(&services, json!({"op": "login", "uid": "nobody"})).await;
        assert_eq!(missing["status_code"], 404);
    }

    #[tokio::test]
    async fn job_runs_through_console() {
        let (services, mut rx) = services();

        let rep: User = details(
            &send(
                &services,
                json!({"op": "create_user", "uid": "rep01", "name": "Rep One",
                       "email": "rep01@example.ac.uk", "is_rep": true}),
            )
            .await,
        );
        let printer: Printer = details(
            &send(
                &services,
                json!({"op": "register_printer", "name": "MK3-A",
                       "printer_type": "prusa", "location": "heartspace"}),
            )
            .await,
        );

        let created = send(
            &services,
            json!({"op": "create_job", "user_id": rep.id, "print_name": "hinge",
                   "gcode_slug": "gcode/hinge", "printer_type": "prusa",
                   "project": "personal"}),
        )
        .await;
        assert_eq!(created["status_code"], 201);
        let job: PrintJob = details(&created);
        // Reviewer with no history sits below the start threshold.
        assert_eq!(job.status, JobStatus::UnderReview);

        let queued: PrintJob = details(&send(&services, json!({"op": "queue", "job_id": job.id})).await);
        assert_eq!(queued.status, JobStatus::Queued);

        let started = send(
            &services,
            json!({"op": "start", "job_id": job.id, "printer_id": printer.id, "colour": "orange"}),
        )
        .await;
        let started: PrintJob = details(&started);
        assert_eq!(started.status, JobStatus::Running);

        let done = send(&services, json!({"op": "complete", "job_id": job.id})).await;
        assert_eq!(done["status_code"], 200);
        assert!(done.get("extra_info").is_none());
        let transition: Transition = details(&done);
        assert_eq!(transition.job.status, JobStatus::Completed);
        assert_eq!(rx.recv().await.unwrap().recipient, "rep01@example.ac.uk");

        let history = send(&services, json!({"op": "job_history", "job_id": job.id})).await;
        assert_eq!(history["details"].as_array().unwrap().len(), 4);

        let recent = send(&services, json!({"op": "recent_transitions", "limit": 1})).await;
        assert_eq!(recent["details"][0]["event"], "complete");
    }

    #[tokio::test]
    async fn maintenance_log_commands() {
        let (services, _rx) = services();
        let printer: Printer = details(
            &send(
                &services,
                json!({"op": "register_printer", "name": "S5-B",
                       "printer_type": "ultimaker", "location": "diamond"}),
            )
            .await,
        );
        let added = send(
            &services,
            json!({"op": "add_maintenance", "printer_id": printer.id,
                   "info": "feeder gear cleaned", "done_by": "tech07"}),
        )
        .await;
        assert_eq!(added["status_code"], 201);
        let log_id = added["details"]["id"].as_i64().unwrap();

        let updated = send(
            &services,
            json!({"op": "update_maintenance", "log_id": log_id, "info": "feeder gear replaced"}),
        )
        .await;
        assert_eq!(updated["details"]["maintenance_info"], "feeder gear replaced");

        let single = send(&services, json!({"op": "get_maintenance", "log_id": log_id})).await;
        assert_eq!(single["details"]["done_by"], "tech07");

        let by_name = send(&services, json!({"op": "maintenance_by_printer_name", "name": "S5-B"})).await;
        assert_eq!(by_name["details"].as_array().unwrap().len(), 1);

        let missing = send(&services, json!({"op": "get_maintenance", "log_id": log_id + 1})).await;
        assert_eq!(missing["status_code"], 404);
    }

    #[tokio::test]
    async fn errors_use_api_envelope() {
        let (services, _rx) = services();

        let unknown = send(&services, json!({"op": "list_jobs", "status": "exploded"})).await;
        assert_eq!(unknown["status_code"], 400);
        assert_eq!(unknown["kind"], "precondition_failed");

        let missing = send(&services, json!({"op": "complete", "job_id": JobId::new()})).await;
        assert_eq!(missing["status_code"], 404);

        let garbage = handle_line(&services, "{not json").await;
        let garbage: Value = serde_json::from_str(&garbage).unwrap();
        assert_eq!(garbage["status_code"], 400);
    }

    #[tokio::test]
    async fn list_filters_are_exclusive() {
        let (services, _rx) = services();
        let reply = send(
            &services,
            json!({"op": "list_jobs", "status": "queued", "user_id": UserId::new()}),
        )
        .await;
        assert_eq!(reply["status_code"], 400);

        let all = send(&services, json!({"op": "list_jobs"})).await;
        assert_eq!(all["details"], json!([]));
    }
}
