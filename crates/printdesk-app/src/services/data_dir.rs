// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory resolution.

use std::ffi::OsString;
use std::path::PathBuf;

use printdesk_core::error::Result;

/// Return the application data directory, creating it if needed.
///
/// `PRINTDESK_DATA_DIR` wins; otherwise `$XDG_DATA_HOME/printdesk`, then
/// `~/.local/share/printdesk`.
pub fn data_dir() -> Result<PathBuf> {
    let dir = resolve(
        std::env::var_os("PRINTDESK_DATA_DIR"),
        std::env::var_os("XDG_DATA_HOME"),
        std::env::var_os("HOME"),
    );
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn resolve(explicit: Option<OsString>, xdg: Option<OsString>, home: Option<OsString>) -> PathBuf {
    if let Some(dir) = explicit.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    let base = match (xdg.filter(|d| !d.is_empty()), home) {
        (Some(xdg), _) => PathBuf::from(xdg),
        (None, Some(home)) => PathBuf::from(home).join(".local").join("share"),
        // Last resort
        (None, None) => std::env::temp_dir(),
    };
    base.join("printdesk")
}
