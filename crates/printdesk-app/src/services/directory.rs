// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// File-backed identity directory used for first-login provisioning.
//
// `directory.json` in the data dir holds a JSON array of identities.  A
// deployment with a real directory service plugs in its own
// `IdentityProvider` instead.

use std::collections::HashMap;
use std::path::Path;

use printdesk_core::error::Result;
use printdesk_lifecycle::{Identity, IdentityProvider};
use tracing::{debug, info};

pub const DIRECTORY_FILE: &str = "directory.json";

#[derive(Debug, Default)]
pub struct FileDirectory {
    entries: HashMap<String, Identity>,
}

impl FileDirectory {
    /// Load `directory.json` from `data_dir`; missing file means empty.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(DIRECTORY_FILE);
        if !path.exists() {
            debug!(path = %path.display(), "no directory file, first logins will be refused");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let identities: Vec<Identity> = serde_json::from_str(&data)?;
        info!(entries = identities.len(), "identity directory loaded");
        Ok(Self {
            entries: identities.into_iter().map(|i| (i.uid.clone(), i)).collect(),
        })
    }
}

impl IdentityProvider for FileDirectory {
    fn lookup(&self, uid: &str) -> Result<Option<Identity>> {
        Ok(self.entries.get(uid).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let directory = FileDirectory::load(dir.path()).unwrap();
        assert!(directory.lookup("anyone").unwrap().is_none());
    }

    #[test]
    fn loads_entries_by_uid() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DIRECTORY_FILE),
            r#"[{"uid":"ab123","given_name":"Ada","surname":"Lovelace","email":"ada@example.ac.uk"}]"#,
        )
        .unwrap();
        let directory = FileDirectory::load(dir.path()).unwrap();
        assert_eq!(directory.lookup("ab123").unwrap().unwrap().surname, "Lovelace");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DIRECTORY_FILE), "{not json").unwrap();
        assert!(FileDirectory::load(dir.path()).is_err());
    }
}
