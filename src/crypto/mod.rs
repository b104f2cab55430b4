// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Record Cryptography
//!
//! - `canonical` - deterministic byte encoding of the signed fields
//! - `cipher` - AES-GCM for the confidential fields (age, gender)
//! - `signer` - HMAC-SHA256 row signatures and Merkle leaf derivation
//!
//! Keys are handed in once at construction and never logged.

pub mod canonical;
pub mod cipher;
pub mod signer;

pub use canonical::{canonicalize, FIELD_DELIMITER};
pub use cipher::FieldCipher;
pub use signer::{leaf_hash, sha256, RowSigner};

use serde::Serializer;

/// Lowercase hex encoding.
pub fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

/// First eight hex characters, for log lines.
pub fn short_hex(bytes: &[u8]) -> String {
    let mut hex = to_hex(&bytes[..bytes.len().min(4)]);
    hex.push_str("...");
    hex
}

/// Serde helper rendering byte arrays as hex strings.
pub fn serialize_hex<T, S>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: AsRef<[u8]>,
    S: Serializer,
{
    serializer.serialize_str(&to_hex(bytes.as_ref()))
}
