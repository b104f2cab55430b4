// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sealed Records Gateway - Tamper-Evident Record Store
//!
//! Stores per-person records in an untrusted row store while enforcing
//! field-level confidentiality (AES-GCM), per-row integrity (HMAC-SHA256),
//! dataset completeness (Merkle root against a locally held trust anchor)
//! and group-based redaction of identity fields.
//!
//! ## Modules
//!
//! - `auth` - Session and access groups handed in by the credential service
//! - `config` - Environment configuration and key material
//! - `crypto` - Canonical encoding, field cipher, row signer
//! - `gateway` - Insert, trust refresh, query and inclusion proofs
//! - `merkle` - Merkle tree, root and proofs
//! - `storage` - redb row store, trust anchor file, audit log

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod gateway;
pub mod merkle;
pub mod models;
pub mod storage;

pub use error::{GatewayError, GatewayResult};
pub use gateway::{AccessGateway, InclusionProof};
