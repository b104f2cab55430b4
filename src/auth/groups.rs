// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access groups carried by an authenticated session.

use serde::{Deserialize, Serialize};

/// Access group assigned to a principal by the credential service.
///
/// ## Group Policy
///
/// - `Write` (label `H`) - May insert records and sees identity fields
/// - `Read` (label `R`) - Read-only, identity fields are redacted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Group {
    /// Full access: insert and unredacted reads
    #[serde(rename = "H")]
    Write,
    /// Restricted reader
    #[serde(rename = "R")]
    Read,
}

impl Group {
    /// Whether this group may append new records.
    pub fn can_write(&self) -> bool {
        matches!(self, Group::Write)
    }

    /// Whether identity fields must be replaced with the redaction marker.
    pub fn redacts_identity(&self) -> bool {
        match self {
            Group::Write => false,
            Group::Read => true,
        }
    }

    /// Parse a group label (case-insensitive).
    pub fn from_label(s: &str) -> Option<Group> {
        match s.trim().to_uppercase().as_str() {
            "H" => Some(Group::Write),
            "R" => Some(Group::Read),
            _ => None,
        }
    }

    /// Single-letter label used by the credential store.
    pub fn label(&self) -> &'static str {
        match self {
            Group::Write => "H",
            Group::Read => "R",
        }
    }
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
