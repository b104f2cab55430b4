// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Record types flowing through the gateway.
//!
//! - [`NewRecord`] - plaintext input to the write path
//! - [`SealedRow`] - what the row store holds (confidential fields encrypted)
//! - [`RecordView`] / [`QueryResult`] - what a reader gets back

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::crypto::serialize_hex;

/// 32-byte SHA-256 / HMAC-SHA256 output.
pub type Digest = [u8; 32];

/// Replacement for identity fields shown to restricted readers.
pub const REDACTED: &str = "[REDACTED]";

/// Rendered in place of a confidential field whose AEAD check failed.
pub const INTEGRITY_FAIL_MARKER: &str = "[INTEGRITY FAIL]";

/// Gender as stored under encryption (`0` = female, `1` = male).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    /// Numeric code used as the plaintext before encryption.
    pub fn code(&self) -> u8 {
        match self {
            Gender::Female => 0,
            Gender::Male => 1,
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" => Ok(Gender::Female),
            "1" => Ok(Gender::Male),
            other => Err(format!("unknown gender code '{other}'")),
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gender::Female => write!(f, "Female"),
            Gender::Male => write!(f, "Male"),
        }
    }
}

/// Plaintext record submitted by a writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub age: u32,
    pub weight: f64,
    pub height: f64,
    pub history: String,
}

/// AEAD output for one confidential scalar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedField {
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
    pub tag: Vec<u8>,
}

/// A row exactly as persisted in the row store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SealedRow {
    pub first_name: String,
    pub last_name: String,
    pub gender: EncryptedField,
    pub age: EncryptedField,
    pub weight: f64,
    pub height: f64,
    pub history: String,
    /// HMAC over the canonical encoding of the plaintext fields.
    ///
    /// Kept as raw bytes: the store is untrusted, so a tag of the wrong
    /// length must still decode and then fail verification for this row.
    pub row_signature: Vec<u8>,
    /// SHA-256 of `row_signature`
    pub merkle_leaf: Vec<u8>,
    /// Informational only; not covered by the signature
    pub inserted_at: DateTime<Utc>,
}

impl SealedRow {
    /// The stored leaf as a digest, or `None` if it is not 32 bytes.
    pub fn leaf_digest(&self) -> Option<Digest> {
        self.merkle_leaf.as_slice().try_into().ok()
    }
}

/// A row read back from the store together with its store-assigned id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub id: u64,
    /// `None` when the stored bytes no longer decode as a sealed row
    pub row: Option<SealedRow>,
}

impl StoredRow {
    pub fn leaf_digest(&self) -> Option<Digest> {
        self.row.as_ref().and_then(SealedRow::leaf_digest)
    }
}

/// Outcome of decrypting one confidential field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue<T> {
    Value(T),
    /// Tag mismatch, malformed plaintext or unreadable row
    IntegrityFail,
}

impl<T> FieldValue<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            FieldValue::Value(v) => Some(v),
            FieldValue::IntegrityFail => None,
        }
    }

    pub fn is_integrity_fail(&self) -> bool {
        matches!(self, FieldValue::IntegrityFail)
    }
}

impl<T: Serialize> Serialize for FieldValue<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Value(v) => v.serialize(serializer),
            FieldValue::IntegrityFail => serializer.serialize_str(INTEGRITY_FAIL_MARKER),
        }
    }
}

impl<T: std::fmt::Display> std::fmt::Display for FieldValue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Value(v) => v.fmt(f),
            FieldValue::IntegrityFail => f.write_str(INTEGRITY_FAIL_MARKER),
        }
    }
}

/// Per-row signature verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Integrity {
    Pass,
    Fail,
}

/// Dataset-wide comparison of the recomputed root with the trust anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Completeness {
    /// Roots match
    Ok,
    /// No trust anchor has been established yet
    NoAnchor,
    /// Roots differ: rows were deleted, reordered or had their leaf rewritten
    Fail,
}

impl std::fmt::Display for Completeness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Completeness::Ok => write!(f, "OK"),
            Completeness::NoAnchor => write!(f, "NO_ANCHOR"),
            Completeness::Fail => write!(f, "FAIL"),
        }
    }
}

/// One row as seen by the querying session.
///
/// A row whose stored bytes cannot be decoded is still listed: every field
/// carries the failure marker (names stay redacted for restricted readers)
/// and `integrity` is `FAIL`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordView {
    pub id: u64,
    pub first: String,
    pub last: String,
    pub age: FieldValue<u32>,
    pub gender: FieldValue<Gender>,
    pub weight: FieldValue<f64>,
    pub height: FieldValue<f64>,
    pub history: FieldValue<String>,
    pub integrity: Integrity,
}

/// Full query output: every stored row plus the completeness status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub rows: Vec<RecordView>,
    pub completeness: Completeness,
    #[serde(serialize_with = "serialize_hex")]
    pub dataset_root: Digest,
}

impl QueryResult {
    /// Look up a single row by id.
    pub fn find(&self, id: u64) -> Option<&RecordView> {
        self.rows.iter().find(|r| r.id == id)
    }

    /// Number of rows whose signature did not verify.
    pub fn integrity_failures(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.integrity == Integrity::Fail)
            .count()
    }
}
