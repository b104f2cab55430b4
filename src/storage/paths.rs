// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path layout for gateway data.
//!
//! ```text
//! <root>/
//!   records.redb              # Row store
//!   trust_anchor.bin          # 32-byte trusted Merkle root
//!   audit/
//!     {date}/events.jsonl     # Daily audit logs
//! ```

use std::path::{Path, PathBuf};

use crate::config::DEFAULT_DATA_DIR;

/// Storage path utilities.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all gateway data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Embedded row database file.
    pub fn records_db(&self) -> PathBuf {
        self.root.join("records.redb")
    }

    /// Trust anchor file.
    ///
    /// Lives next to, but independently of, the row store. Deleting it
    /// resets the gateway to the `NO_ANCHOR` state.
    pub fn trust_anchor(&self) -> PathBuf {
        self.root.join("trust_anchor.bin")
    }

    /// Directory containing all audit logs.
    pub fn audit_dir(&self) -> PathBuf {
        self.root.join("audit")
    }

    /// Path to daily audit events file.
    pub fn audit_events_file(&self, date: &str) -> PathBuf {
        self.audit_dir().join(date).join("events.jsonl")
    }
}
