// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gateway error type.
//!
//! Only structural failures live here. Per-row and per-field failures
//! (signature mismatch, AEAD tag mismatch, completeness mismatch) are
//! reported inline in the query result and never surface as an `Err`.

use crate::auth::Group;
use crate::storage::{AnchorError, StoreError};

/// Hard failure that aborts a gateway operation.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Write attempted by a session outside the write group.
    #[error("access denied: group {group} may not write records")]
    AccessDenied { group: Group },

    /// A required secret was not supplied.
    #[error("key material missing: {var} is not set")]
    KeyMaterialMissing { var: &'static str },

    /// A secret was supplied but cannot be used as a key.
    #[error("invalid key material in {var}: {reason}")]
    InvalidKeyMaterial { var: &'static str, reason: String },

    /// A submitted record cannot be sealed and stored faithfully.
    #[error("invalid record: {field} {reason}")]
    InvalidRecord { field: &'static str, reason: String },

    /// A non-secret configuration value could not be parsed.
    #[error("invalid configuration value for {var}: {reason}")]
    InvalidConfig { var: &'static str, reason: String },

    /// The row store could not be read or written.
    #[error("row store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// The trust anchor file could not be read or written.
    #[error("trust anchor unavailable: {0}")]
    TrustAnchorUnavailable(#[from] AnchorError),

    /// The system random generator or cipher failed.
    #[error("cryptographic failure: {0}")]
    Crypto(String),
}

impl GatewayError {
    /// Stable machine-readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::AccessDenied { .. } => "access_denied",
            GatewayError::KeyMaterialMissing { .. } => "key_material_missing",
            GatewayError::InvalidKeyMaterial { .. } => "invalid_key_material",
            GatewayError::InvalidRecord { .. } => "invalid_record",
            GatewayError::InvalidConfig { .. } => "invalid_config",
            GatewayError::StoreUnavailable(StoreError::MalformedLeaf { .. }) => "malformed_leaf",
            GatewayError::StoreUnavailable(_) => "store_unavailable",
            GatewayError::TrustAnchorUnavailable(_) => "trust_anchor_unavailable",
            GatewayError::Crypto(_) => "crypto_failure",
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
