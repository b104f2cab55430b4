// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authenticated session handed to the gateway.

use serde::{Deserialize, Serialize};

use super::groups::Group;

/// Result of a successful login at the credential service.
///
/// The gateway never re-verifies credentials; it trusts `group` as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Username or other principal identifier (used for auditing only)
    pub principal: String,
    /// Access group granted at login
    pub group: Group,
}

impl Session {
    pub fn new(principal: impl Into<String>, group: Group) -> Self {
        Self {
            principal: principal.into(),
            group,
        }
    }
}
