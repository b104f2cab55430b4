// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Everything the gateway persists, and nothing it trusts blindly.
//!
//! ## Storage Layout
//!
//! ```text
//! <data_dir>/
//!   records.redb              # Row store (untrusted)
//!   trust_anchor.bin          # Trusted Merkle root (client-held)
//!   audit/
//!     {date}/events.jsonl     # Daily audit logs
//! ```
//!
//! ## Important Notes
//!
//! - The row store is assumed to be readable and writable by parties other
//!   than this gateway; every row is re-verified on read
//! - The trust anchor must live outside the row store's control

pub mod anchor;
pub mod audit;
pub mod paths;
pub mod record_db;

pub use anchor::{AnchorError, FileAnchorStore, TrustAnchorStore};
pub use audit::{AuditError, AuditEvent, AuditEventType, AuditLog};
pub use paths::StoragePaths;
pub use record_db::{RecordDatabase, RowStore, StoreError, StoreResult};
