// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer: opens the database once and hands out the
// lifecycle services that share it.
//
// `SharedDatabase` wraps the rusqlite connection in `Arc<Mutex<>>`, so every
// clone of `AppServices` talks to the same connection.  Calls are blocking;
// the console runs them on tokio's blocking pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use printdesk_core::AppConfig;
use printdesk_core::config::CONFIG_FILE;
use printdesk_core::error::Result;
use printdesk_lifecycle::{Accounts, Fleet, IdentityProvider, Notifier, PrintJobService};
use printdesk_store::{Database, SharedDatabase};
use tracing::info;

use super::directory::FileDirectory;

/// Shared application services.
///
/// All fields are cheaply cloneable (Arc-wrapped) so the struct can be moved
/// into blocking tasks.
#[derive(Clone)]
pub struct AppServices {
    pub jobs: PrintJobService,
    pub accounts: Accounts,
    pub fleet: Fleet,
    pub directory: Arc<dyn IdentityProvider>,
    data_dir: PathBuf,
}

impl AppServices {
    /// Open the database named by `config` inside `data_dir` and build the
    /// services on top of it.  Call once at startup.
    pub fn init(data_dir: PathBuf, config: &AppConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let db_path = config.database_path(&data_dir);
        info!(path = %db_path.display(), "initialising app services");

        let db = SharedDatabase::new(Database::open(&db_path)?);
        let directory: Arc<dyn IdentityProvider> = Arc::new(FileDirectory::load(&data_dir)?);
        Ok(Self::with_database(db, config, notifier, directory, data_dir))
    }

    pub fn with_database(
        db: SharedDatabase,
        config: &AppConfig,
        notifier: Arc<dyn Notifier>,
        directory: Arc<dyn IdentityProvider>,
        data_dir: PathBuf,
    ) -> Self {
        Self {
            jobs: PrintJobService::from_config(db.clone(), config, notifier),
            accounts: Accounts::new(db.clone(), config.trust),
            fleet: Fleet::new(db),
            directory,
            data_dir,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Load `config.json`, apply environment overrides, validate.
///
/// On first run the defaults are written out so operators have a file to
/// edit.  Environment overrides are never persisted.
pub fn load_config(data_dir: &Path) -> Result<AppConfig> {
    let fresh = !data_dir.join(CONFIG_FILE).exists();
    let mut config = AppConfig::load(data_dir)?;
    if fresh {
        config.persist(data_dir)?;
        info!(path = %data_dir.join(CONFIG_FILE).display(), "default configuration written");
    }
    config.apply_env_overrides(std::env::vars())?;
    config.validate()?;
    Ok(config)
}
