// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Outcome notifications.
//
// Transitions hand a `Notice` to a `Notifier` after their transaction has
// committed.  The shipped notifier only enqueues onto a bounded tokio channel;
// a separate dispatcher task drains the channel into a `NoticeSink`, so
// delivery never blocks or rolls back a transition.

use printdesk_core::error::{PrintdeskError, Result};
use printdesk_core::types::{Outcome, PrintJob, User, UserId};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A message telling a submitter how their print ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub user_id: UserId,
    pub recipient: String,
    pub display_name: String,
    pub job_name: String,
    pub outcome: Outcome,
}

impl Notice {
    pub fn new(submitter: &User, job: &PrintJob, outcome: Outcome) -> Self {
        Self {
            user_id: submitter.id,
            recipient: submitter.email.clone(),
            display_name: submitter.display_name().to_owned(),
            job_name: job.print_name.clone(),
            outcome,
        }
    }

    pub fn subject(&self) -> &'static str {
        match self.outcome {
            Outcome::Completed => "Your Print Has Finished",
            Outcome::Failed => "Sorry Your Print Has Failed",
            Outcome::Rejected => "Sorry Your Print Was Rejected",
        }
    }
}

/// Accepts notices from committed transitions.
///
/// Implementations must not block; an `Err` is reported to the caller as a
/// warning and never undoes the transition.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice) -> Result<()>;
}

/// Notifier that enqueues onto a bounded channel.
#[derive(Debug, Clone)]
pub struct QueueNotifier {
    tx: mpsc::Sender<Notice>,
}

impl Notifier for QueueNotifier {
    fn notify(&self, notice: Notice) -> Result<()> {
        if notice.recipient.trim().is_empty() {
            return Err(PrintdeskError::DependencyFailure(format!(
                "user {} has no email address",
                notice.user_id
            )));
        }
        self.tx.try_send(notice).map_err(|e| match e {
            mpsc::error::TrySendError::Full(n) => PrintdeskError::DependencyFailure(format!(
                "notification queue full, dropped notice for {}",
                n.user_id
            )),
            mpsc::error::TrySendError::Closed(n) => PrintdeskError::DependencyFailure(format!(
                "notification dispatcher stopped, dropped notice for {}",
                n.user_id
            )),
        })
    }
}

/// Create a notifier and the receiving end its dispatcher drains.
pub fn notification_queue(capacity: usize) -> (QueueNotifier, mpsc::Receiver<Notice>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (QueueNotifier { tx }, rx)
}

/// Final delivery of a notice (mail relay, chat hook, ...).
pub trait NoticeSink: Send + Sync {
    fn deliver(&self, notice: &Notice) -> Result<()>;
}

/// Sink that writes each notice to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NoticeSink for LogSink {
    fn deliver(&self, notice: &Notice) -> Result<()> {
        info!(
            to = %notice.recipient,
            name = %notice.display_name,
            job = %notice.job_name,
            subject = notice.subject(),
            "notification"
        );
        Ok(())
    }
}

/// Drain `rx` into `sink` until every sender is dropped.
///
/// Returns the number of notices delivered successfully.
pub async fn run_dispatcher<S: NoticeSink>(mut rx: mpsc::Receiver<Notice>, sink: S) -> usize {
    let mut delivered = 0;
    while let Some(notice) = rx.recv().await {
        match sink.deliver(&notice) {
            Ok(()) => {
                delivered += 1;
                debug!(user = %notice.user_id, outcome = %notice.outcome, "notice delivered");
            }
            Err(e) => warn!(user = %notice.user_id, "notice delivery failed: {e}"),
        }
    }
    info!(delivered, "notification dispatcher stopped");
    delivered
}
