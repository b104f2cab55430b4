// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded row store backed by redb (pure Rust, ACID).
//!
//! The gateway treats this as an untrusted relational store: it only relies
//! on ordered append and full ordered retrieval. Anything the store returns
//! is re-verified by the gateway.
//!
//! ## Table Layout
//!
//! - `records`: row id (u64, ascending) → JSON-encoded [`SealedRow`]
//! - `meta`: key → value (e.g. `next_row_id`)
//!
//! Row ids start at 1 and are never reused, even after a row is removed.
//!
//! [`RowStore::load_all`] never fails because of a single row: bytes that no
//! longer decode as a [`SealedRow`] come back as a [`StoredRow`] without
//! content, so the gateway can report that row inline.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};

use crate::models::{Digest, SealedRow, StoredRow};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: row id → serialized SealedRow (JSON bytes).
const RECORDS: TableDefinition<u64, &[u8]> = TableDefinition::new("records");

/// Store metadata: key → u64.
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const NEXT_ROW_ID: &str = "next_row_id";

const FIRST_ROW_ID: u64 = 1;

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("row {id} cannot be decoded: {source}")]
    CorruptRow {
        id: u64,
        #[source]
        source: serde_json::Error,
    },

    #[error("row {id} has no usable merkle leaf")]
    MalformedLeaf { id: u64 },

    #[error("not found: {0}")]
    NotFound(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// RowStore
// =============================================================================

/// Ordered, append-only row storage as seen by the gateway.
pub trait RowStore {
    /// Persist a sealed row and return its assigned id.
    fn append(&self, row: &SealedRow) -> StoreResult<u64>;

    /// All rows in ascending id order, including rows that no longer decode.
    fn load_all(&self) -> StoreResult<Vec<StoredRow>>;

    /// `(id, merkle_leaf)` for every row in ascending id order.
    ///
    /// The leaf is `None` for an undecodable row or a leaf that is not 32 bytes.
    fn load_leaves(&self) -> StoreResult<Vec<(u64, Option<Digest>)>> {
        Ok(self
            .load_all()?
            .iter()
            .map(|stored| (stored.id, stored.leaf_digest()))
            .collect())
    }
}

// =============================================================================
// RecordDatabase
// =============================================================================

/// redb-backed [`RowStore`].
pub struct RecordDatabase {
    db: Database,
}

impl RecordDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(RECORDS)?;
            let _ = write_txn.open_table(META)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Look up a single row by id. Fails with [`StoreError::CorruptRow`] if
    /// the row no longer decodes.
    pub fn get(&self, id: u64) -> StoreResult<Option<SealedRow>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECORDS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(decode_row(id, value.value())?)),
            None => Ok(None),
        }
    }

    /// Number of rows currently stored.
    pub fn row_count(&self) -> StoreResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECORDS)?;
        Ok(table.len()?)
    }
}

// =============================================================================
// Out-of-band edits
//
// The gateway has no update or delete path. The backing store itself permits
// such edits, so tests use these to simulate them.
// =============================================================================

#[cfg(test)]
impl RecordDatabase {
    /// Remove a row directly. Returns whether it existed.
    pub fn remove_row(&self, id: u64) -> StoreResult<bool> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(RECORDS)?;
            let removed = table.remove(id)?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(existed)
    }

    /// Overwrite a row in place without re-sealing it.
    pub fn overwrite_row(&self, id: u64, row: &SealedRow) -> StoreResult<()> {
        self.overwrite_raw(id, &serde_json::to_vec(row)?)
    }

    /// Overwrite the stored bytes of a row verbatim.
    pub fn overwrite_raw(&self, id: u64, bytes: &[u8]) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(RECORDS)?;
            if table.get(id)?.is_none() {
                return Err(StoreError::NotFound(format!("row {id}")));
            }
            table.insert(id, bytes)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

impl RowStore for RecordDatabase {
    fn append(&self, row: &SealedRow) -> StoreResult<u64> {
        let json = serde_json::to_vec(row)?;

        let write_txn = self.db.begin_write()?;
        let id = {
            let mut meta = write_txn.open_table(META)?;
            let id = meta
                .get(NEXT_ROW_ID)?
                .map(|v| v.value())
                .unwrap_or(FIRST_ROW_ID);
            meta.insert(NEXT_ROW_ID, id + 1)?;

            let mut records = write_txn.open_table(RECORDS)?;
            records.insert(id, json.as_slice())?;
            id
        };
        write_txn.commit()?;
        Ok(id)
    }

    fn load_all(&self) -> StoreResult<Vec<StoredRow>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECORDS)?;

        let mut rows = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            let id = key.value();
            let row = match decode_row(id, value.value()) {
                Ok(row) => Some(row),
                Err(e) => {
                    tracing::warn!(row_id = id, error = %e, "Stored row cannot be decoded");
                    None
                }
            };
            rows.push(StoredRow { id, row });
        }
        Ok(rows)
    }
}

fn decode_row(id: u64, bytes: &[u8]) -> StoreResult<SealedRow> {
    serde_json::from_slice(bytes).map_err(|source| StoreError::CorruptRow { id, source })
}

// =============================================================================
// Tests
// =============================================================================
