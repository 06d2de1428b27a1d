// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.
//
// Settings are persisted as JSON in the data directory and may be overridden
// by environment variables.  The threshold objects are handed explicitly to
// the policy functions; nothing below the service layer reads the
// environment.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PrintdeskError, Result};

/// Name of the config file inside the data directory.
pub const CONFIG_FILE: &str = "config.json";

/// Score boundaries for the trust levels. Below `advanced` is beginner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustThresholds {
    pub advanced: i64,
    pub expert: i64,
    pub insane: i64,
}

impl Default for TrustThresholds {
    fn default() -> Self {
        Self {
            advanced: 5,
            expert: 10,
            insane: 15,
        }
    }
}

impl TrustThresholds {
    pub fn validate(&self) -> Result<()> {
        if self.advanced < 1 || self.advanced >= self.expert || self.expert >= self.insane {
            return Err(PrintdeskError::Config(format!(
                "trust thresholds must satisfy 1 <= advanced < expert < insane (got {}, {}, {})",
                self.advanced, self.expert, self.insane
            )));
        }
        Ok(())
    }
}

/// Inputs to the auto-review decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoReviewConfig {
    /// Reviews a rep must have checked before their jobs can skip review.
    /// Must be greater than zero.
    pub start_threshold: u32,
    /// Failure fraction in `[0, 1]` at or above which review is required.
    pub fail_threshold: f64,
    /// Print time in seconds at or above which review is always required.
    pub time_threshold_secs: i64,
}

impl Default for AutoReviewConfig {
    fn default() -> Self {
        Self {
            start_threshold: 5,
            fail_threshold: 0.1,
            time_threshold_secs: 36_000,
        }
    }
}

impl AutoReviewConfig {
    pub fn validate(&self) -> Result<()> {
        if self.start_threshold == 0 {
            return Err(PrintdeskError::Config(
                "auto-review start_threshold must be greater than zero".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.fail_threshold) {
            return Err(PrintdeskError::Config(format!(
                "auto-review fail_threshold must be within [0, 1] (got {})",
                self.fail_threshold
            )));
        }
        if self.time_threshold_secs < 0 {
            return Err(PrintdeskError::Config(
                "auto-review time_threshold_secs must not be negative".into(),
            ));
        }
        Ok(())
    }
}

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub trust: TrustThresholds,
    pub review: AutoReviewConfig,
    /// SQLite file, relative to the data directory unless absolute.
    pub database_file: PathBuf,
    /// Pending notifications held before new ones are refused.
    pub notification_queue_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            trust: TrustThresholds::default(),
            review: AutoReviewConfig::default(),
            database_file: PathBuf::from("printdesk.db"),
            notification_queue_capacity: 256,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        self.trust.validate()?;
        self.review.validate()?;
        if self.notification_queue_capacity == 0 {
            return Err(PrintdeskError::Config(
                "notification_queue_capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Load `config.json` from `data_dir`, falling back to defaults when the
    /// file does not exist.  A file that exists but does not parse is an error.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let config: Self = serde_json::from_str(&data)?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Write the config as pretty JSON into `data_dir`.
    pub fn persist(&self, data_dir: &Path) -> Result<()> {
        let path = data_dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(())
    }

    /// Apply the deployment environment variables on top of the loaded file.
    ///
    /// Takes the variables as an iterator so callers decide where they come
    /// from (`std::env::vars()` in the binary).
    pub fn apply_env_overrides<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let value = value.as_ref();
            match key.as_ref() {
                "ADVANCED_LEVEL" => self.trust.advanced = parse_var("ADVANCED_LEVEL", value)?,
                "EXPERT_LEVEL" => self.trust.expert = parse_var("EXPERT_LEVEL", value)?,
                "INSANE_LEVEL" => self.trust.insane = parse_var("INSANE_LEVEL", value)?,
                "AUTOREVIEW_START_THRESHOLD" => {
                    self.review.start_threshold = parse_var("AUTOREVIEW_START_THRESHOLD", value)?
                }
                "AUTOREVIEW_FAIL_THRESHOLD" => {
                    self.review.fail_threshold = parse_var("AUTOREVIEW_FAIL_THRESHOLD", value)?
                }
                "AUTOREVIEW_TIME_THRESHOLD" => {
                    self.review.time_threshold_secs =
                        parse_var("AUTOREVIEW_TIME_THRESHOLD", value)?
                }
                "PRINTDESK_DATABASE" => self.database_file = PathBuf::from(value),
                _ => {}
            }
        }
        Ok(())
    }

    /// Absolute path of the database file.
    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        if self.database_file.is_absolute() {
            self.database_file.clone()
        } else {
            data_dir.join(&self.database_file)
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| PrintdeskError::Config(format!("{name}: cannot parse `{value}`")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn env_overrides_replace_thresholds() {
        let mut config = AppConfig::default();
        config
            .apply_env_overrides([
                ("ADVANCED_LEVEL", "3"),
                ("AUTOREVIEW_FAIL_THRESHOLD", "0.25"),
                ("AUTOREVIEW_TIME_THRESHOLD", "7200"),
                ("UNRELATED", "x"),
            ])
            .unwrap();
        assert_eq!(config.trust.advanced, 3);
        assert_eq!(config.review.fail_threshold, 0.25);
        assert_eq!(config.review.time_threshold_secs, 7200);
        assert_eq!(config.trust.expert, 10);
    }

    #[test]
    fn unparsable_override_is_config_error() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env_overrides([("INSANE_LEVEL", "lots")])
            .unwrap_err();
        assert!(matches!(err, PrintdeskError::Config(_)));
    }

    #[test]
    fn zero_start_threshold_is_rejected() {
        let mut config = AppConfig::default();
        config.review.start_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn fail_threshold_must_be_a_fraction() {
        let mut config = AppConfig::default();
        config.review.fail_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn thresholds_must_ascend() {
        let thresholds = TrustThresholds {
            advanced: 10,
            expert: 10,
            insane: 15,
        };
        assert!(thresholds.validate().is_err());
    }

    #[test]
    fn load_missing_file_gives_defaults_and_persist_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(AppConfig::load(dir.path()).unwrap(), AppConfig::default());

        let mut config = AppConfig::default();
        config.review.start_threshold = 8;
        config.persist(dir.path()).unwrap();
        assert_eq!(AppConfig::load(dir.path()).unwrap(), config);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"notification_queue_capacity": 16}"#,
        )
        .unwrap();
        let config = AppConfig::load(dir.path()).unwrap();
        assert_eq!(config.notification_queue_capacity, 16);
        assert_eq!(config.trust, TrustThresholds::default());
    }

    #[test]
    fn relative_database_path_resolves_under_data_dir() {
        let config = AppConfig::default();
        assert_eq!(
            config.database_path(Path::new("/srv/printdesk")),
            PathBuf::from("/srv/printdesk/printdesk.db")
        );
    }
}
