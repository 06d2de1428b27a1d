// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printdesk — makerspace 3D-print request queue
//
// Entry point. Initialises logging, loads configuration, opens the database,
// starts the notification dispatcher and serves the command console.

mod console;
mod services;

use std::process::ExitCode;
use std::sync::Arc;

use printdesk_core::error::Result;
use printdesk_lifecycle::{LogSink, notification_queue, run_dispatcher};

use services::app_services::{AppServices, load_config};
use services::data_dir::data_dir;

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries console replies; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("printdesk starting");

    match serve().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "printdesk stopped");
            ExitCode::FAILURE
        }
    }
}

async fn serve() -> Result<()> {
    let dir = data_dir()?;
    let config = load_config(&dir)?;

    let (notifier, rx) = notification_queue(config.notification_queue_capacity);
    let dispatcher = tokio::spawn(run_dispatcher(rx, LogSink));

    let services = AppServices::init(dir, &config, Arc::new(notifier))?;
    tracing::info!(data_dir = %services.data_dir().display(), "console ready");
    console::run(services).await?;

    // The console dropped the last sender; drain what is left.
    match dispatcher.await {
        Ok(delivered) => tracing::info!(delivered, "notification dispatcher finished"),
        Err(e) => tracing::warn!(error = %e, "notification dispatcher aborted"),
    }
    Ok(())
}
