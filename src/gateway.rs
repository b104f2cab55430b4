// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Access Gateway
//!
//! Composes the record pipeline over an untrusted row store.
//!
//! ## Write Path
//!
//! 1. Reject any session outside the write group (before any crypto work)
//! 2. Encrypt age and gender with a fresh nonce each
//! 3. Canonicalize and sign the plaintext fields, derive the Merkle leaf
//! 4. Append the sealed row
//!
//! Inserting does not move the trust anchor. Callers run
//! [`AccessGateway::refresh_trust`] right after a successful insert to accept
//! the new dataset state.
//!
//! ## Read Path
//!
//! 1. Load every row in id order and rebuild the Merkle root
//! 2. Compare it with the trust anchor (`OK` / `NO_ANCHOR` / `FAIL`)
//! 3. Per row: verify the signature, decrypt confidential fields, redact
//!
//! Per-row and per-field failures are reported inline, including rows whose
//! stored bytes no longer decode. A query only fails outright when the store
//! or the anchor file cannot be read.
//!
//! The row signature does not cover age or gender; tampering with those is
//! only visible as a per-field `[INTEGRITY FAIL]`, never as `integrity: FAIL`.

use serde::Serialize;

use crate::auth::{Group, Session};
use crate::config::{GatewayConfig, KeyMaterial};
use crate::crypto::canonical::contains_delimiter;
use crate::crypto::{canonicalize, leaf_hash, serialize_hex, short_hex, FieldCipher, RowSigner};
use crate::error::{GatewayError, GatewayResult};
use crate::merkle::{MerkleProof, MerkleTree};
use crate::models::{
    Completeness, Digest, FieldValue, Gender, Integrity, NewRecord, QueryResult, RecordView,
    SealedRow, StoredRow, INTEGRITY_FAIL_MARKER, REDACTED,
};
use crate::storage::{
    AnchorError, AuditEvent, AuditEventType, AuditLog, FileAnchorStore, RecordDatabase, RowStore,
    StoreError, TrustAnchorStore,
};

/// Inclusion proof for one stored row against the current dataset root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InclusionProof {
    pub row_id: u64,
    #[serde(serialize_with = "serialize_hex")]
    pub root: Digest,
    pub proof: MerkleProof,
}

impl InclusionProof {
    pub fn verify(&self) -> bool {
        self.proof.verify(&self.root)
    }
}

pub struct AccessGateway<S, A> {
    store: S,
    anchor: A,
    cipher: FieldCipher,
    signer: RowSigner,
    audit: Option<AuditLog>,
}

impl AccessGateway<RecordDatabase, FileAnchorStore> {
    /// Open the redb row store, file anchor and audit log under the configured data dir.
    pub fn open(config: &GatewayConfig) -> GatewayResult<Self> {
        let store = RecordDatabase::open(&config.paths.records_db())?;
        let anchor = FileAnchorStore::new(config.paths.trust_anchor());
        let gateway = Self::new(store, anchor, &config.keys)?
            .with_audit(AuditLog::new(config.paths.clone()));

        tracing::debug!(data_dir = %config.paths.root().display(), "Gateway opened");
        Ok(gateway)
    }
}

impl<S: RowStore, A: TrustAnchorStore> AccessGateway<S, A> {
    pub fn new(store: S, anchor: A, keys: &KeyMaterial) -> GatewayResult<Self> {
        Ok(Self {
            store,
            anchor,
            cipher: FieldCipher::new(keys.aead_key())?,
            signer: RowSigner::new(keys.hmac_key())?,
            audit: None,
        })
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // Write path
    // =========================================================================

    /// Seal and append a record. Write group only.
    pub fn insert(&self, session: &Session, record: &NewRecord) -> GatewayResult<u64> {
        if !session.group.can_write() {
            tracing::warn!(
                principal = %session.principal,
                group = %session.group,
                "Insert denied"
            );
            self.audit(
                AuditEvent::new(AuditEventType::InsertDenied)
                    .with_session(session)
                    .failed("group may not write records"),
            );
            return Err(GatewayError::AccessDenied {
                group: session.group,
            });
        }

        check_numbers(record)?;
        if contains_delimiter(&[&record.first_name, &record.last_name, &record.history]) {
            tracing::warn!("Record text contains the canonical delimiter");
        }

        let row = self.seal(record)?;
        let row_id = self.store.append(&row)?;

        tracing::info!(
            row_id,
            leaf = %short_hex(&row.merkle_leaf),
            "Record inserted"
        );
        self.audit(
            AuditEvent::new(AuditEventType::RecordInserted)
                .with_session(session)
                .with_row(row_id),
        );
        Ok(row_id)
    }

    fn seal(&self, record: &NewRecord) -> GatewayResult<SealedRow> {
        let gender = self.cipher.encrypt(&record.gender.code().to_string())?;
        let age = self.cipher.encrypt(&record.age.to_string())?;

        let canonical = canonicalize(
            &record.first_name,
            &record.last_name,
            record.weight,
            record.height,
            &record.history,
        );
        let row_signature = self.signer.sign(&canonical);
        let merkle_leaf = leaf_hash(&row_signature);

        Ok(SealedRow {
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            gender,
            age,
            weight: record.weight,
            height: record.height,
            history: record.history.clone(),
            row_signature: row_signature.to_vec(),
            merkle_leaf: merkle_leaf.to_vec(),
            inserted_at: chrono::Utc::now(),
        })
    }

    // =========================================================================
    // Trust
    // =========================================================================

    /// Every leaf in id order. Fails if any row lacks a usable leaf.
    fn usable_leaves(&self) -> GatewayResult<Vec<(u64, Digest)>> {
        self.store
            .load_leaves()?
            .into_iter()
            .map(|(id, leaf)| {
                leaf.map(|leaf| (id, leaf))
                    .ok_or_else(|| GatewayError::from(StoreError::MalformedLeaf { id }))
            })
            .collect()
    }

    /// Root over the leaves currently in the store.
    pub fn current_root(&self) -> GatewayResult<Digest> {
        let leaves: Vec<Digest> = self
            .usable_leaves()?
            .into_iter()
            .map(|(_, leaf)| leaf)
            .collect();
        Ok(MerkleTree::build(&leaves).root())
    }

    /// Accept the current dataset state: save its root as the trust anchor.
    ///
    /// Refuses to anchor a dataset containing a row without a usable leaf.
    pub fn refresh_trust(&self) -> GatewayResult<Digest> {
        let root = self.current_root()?;
        self.anchor.save(&root)?;

        tracing::info!(root = %short_hex(&root), "Trusted root updated");
        self.audit(
            AuditEvent::new(AuditEventType::TrustRefreshed)
                .with_details(serde_json::json!({ "root_prefix": short_hex(&root) })),
        );
        Ok(root)
    }

    fn check_completeness(
        &self,
        root: &Digest,
        unusable_leaves: usize,
    ) -> GatewayResult<Completeness> {
        match self.anchor.load() {
            Ok(None) => Ok(Completeness::NoAnchor),
            Ok(Some(_)) if unusable_leaves > 0 => Ok(Completeness::Fail),
            Ok(Some(trusted)) if trusted == *root => Ok(Completeness::Ok),
            Ok(Some(_)) => Ok(Completeness::Fail),
            Err(AnchorError::Malformed { path, len }) => {
                tracing::warn!(
                    path = %path.display(),
                    len,
                    "Trust anchor is malformed, treating dataset as unverified"
                );
                Ok(Completeness::Fail)
            }
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Read path
    // =========================================================================

    /// Verify and return every stored row as seen by `session`.
    pub fn query(&self, session: &Session) -> GatewayResult<QueryResult> {
        let rows = self.store.load_all()?;

        let leaves: Vec<Digest> = rows.iter().filter_map(StoredRow::leaf_digest).collect();
        let unusable_leaves = rows.len() - leaves.len();
        if unusable_leaves > 0 {
            tracing::warn!(unusable_leaves, "Rows without a usable merkle leaf");
        }
        let dataset_root = MerkleTree::build(&leaves).root();
        let completeness = self.check_completeness(&dataset_root, unusable_leaves)?;

        let views: Vec<RecordView> = rows
            .iter()
            .map(|stored| self.open_row(stored, session.group))
            .collect();

        let result = QueryResult {
            rows: views,
            completeness,
            dataset_root,
        };
        self.report_query(session, &result);
        Ok(result)
    }

    fn open_row(&self, stored: &StoredRow, group: Group) -> RecordView {
        let Some(row) = &stored.row else {
            return unreadable_row(stored.id, group);
        };

        let canonical = canonicalize(
            &row.first_name,
            &row.last_name,
            row.weight,
            row.height,
            &row.history,
        );
        let integrity = if self.signer.verify(&canonical, &row.row_signature) {
            Integrity::Pass
        } else {
            Integrity::Fail
        };

        let age = self.cipher.decrypt::<u32>(&row.age);
        let gender = self.cipher.decrypt::<Gender>(&row.gender);

        let (first, last) = if group.redacts_identity() {
            (REDACTED.to_string(), REDACTED.to_string())
        } else {
            (row.first_name.clone(), row.last_name.clone())
        };

        RecordView {
            id: stored.id,
            first,
            last,
            age,
            gender,
            weight: FieldValue::Value(row.weight),
            height: FieldValue::Value(row.height),
            history: FieldValue::Value(row.history.clone()),
            integrity,
        }
    }

    fn report_query(&self, session: &Session, result: &QueryResult) {
        let field_failures = result
            .rows
            .iter()
            .filter(|r| r.age.is_integrity_fail() || r.gender.is_integrity_fail())
            .count();

        tracing::info!(
            rows = result.rows.len(),
            completeness = %result.completeness,
            integrity_failures = result.integrity_failures(),
            field_failures,
            "Dataset queried"
        );

        if result.completeness == Completeness::Fail {
            tracing::warn!(
                root = %short_hex(&result.dataset_root),
                "Dataset root does not match trust anchor"
            );
            self.audit(
                AuditEvent::new(AuditEventType::CompletenessFailure)
                    .with_session(session)
                    .with_details(serde_json::json!({
                        "root_prefix": short_hex(&result.dataset_root),
                    }))
                    .failed("dataset root does not match trust anchor"),
            );
        }

        for view in result.rows.iter().filter(|r| r.integrity == Integrity::Fail) {
            tracing::warn!(row_id = view.id, "Row signature mismatch");
            self.audit(
                AuditEvent::new(AuditEventType::RowIntegrityFailure)
                    .with_session(session)
                    .with_row(view.id)
                    .failed("row signature mismatch"),
            );
        }

        self.audit(
            AuditEvent::new(AuditEventType::DatasetQueried)
                .with_session(session)
                .with_details(serde_json::json!({
                    "rows": result.rows.len(),
                    "completeness": result.completeness,
                    "integrity_failures": result.integrity_failures(),
                    "field_failures": field_failures,
                })),
        );
    }

    // =========================================================================
    // Proofs
    // =========================================================================

    /// Inclusion proof for `row_id` against the current dataset root.
    ///
    /// Returns `None` if the row is not in the store.
    pub fn prove_inclusion(&self, row_id: u64) -> GatewayResult<Option<InclusionProof>> {
        let entries = self.usable_leaves()?;
        let Some(index) = entries.iter().position(|(id, _)| *id == row_id) else {
            return Ok(None);
        };

        let leaves: Vec<Digest> = entries.into_iter().map(|(_, leaf)| leaf).collect();
        let tree = MerkleTree::build(&leaves);
        Ok(tree.proof(index).map(|proof| InclusionProof {
            row_id,
            root: tree.root(),
            proof,
        }))
    }

    fn audit(&self, event: AuditEvent) {
        if let Some(log) = &self.audit {
            if let Err(e) = log.log(&event) {
                tracing::warn!(error = %e, "Failed to write audit event");
            }
        }
    }
}

/// Reject numbers that cannot be stored and read back unchanged.
fn check_numbers(record: &NewRecord) -> GatewayResult<()> {
    for (field, value) in [("weight", record.weight), ("height", record.height)] {
        if !value.is_finite() {
            return Err(GatewayError::InvalidRecord {
                field,
                reason: format!("must be a finite number, got {value}"),
            });
        }
    }
    Ok(())
}

/// View of a row whose stored bytes no longer decode.
fn unreadable_row(id: u64, group: Group) -> RecordView {
    let identity = if group.redacts_identity() {
        REDACTED
    } else {
        INTEGRITY_FAIL_MARKER
    };
    RecordView {
        id,
        first: identity.to_string(),
        last: identity.to_string(),
        age: FieldValue::IntegrityFail,
        gender: FieldValue::IntegrityFail,
        weight: FieldValue::IntegrityFail,
        height: FieldValue::IntegrityFail,
        history: FieldValue::IntegrityFail,
        integrity: Integrity::Fail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::EMPTY_ROOT;
    use crate::storage::StoragePaths;
    use tempfile::TempDir;

    const AEAD_KEY: [u8; 32] = [0x11; 32];
    const HMAC_KEY: [u8; 32] = [0x22; 32];

    fn config(dir: &TempDir, aead: &[u8], hmac: &[u8]) -> GatewayConfig {
        GatewayConfig {
            paths: StoragePaths::new(dir.path()),
            keys: KeyMaterial::new(aead.to_vec(), hmac.to_vec()).unwrap(),
        }
    }

    fn setup() -> (TempDir, AccessGateway<RecordDatabase, FileAnchorStore>) {
        let dir = TempDir::new().unwrap();
        let gateway = AccessGateway::open(&config(&dir, &AEAD_KEY, &HMAC_KEY)).unwrap();
        (dir, gateway)
    }

    fn today() -> String {
        chrono::Utc::now().format("%Y-%m-%d").to_string()
    }

    /// Audit events written between `since` (a date taken before the
    /// operations under test) and now.
    fn audit_events(dir: &TempDir, since: &str) -> Vec<AuditEvent> {
        let audit = AuditLog::new(StoragePaths::new(dir.path()));
        let mut dates = vec![since.to_string(), today()];
        dates.dedup();
        dates
            .iter()
            .flat_map(|date| audit.read_events(date).unwrap())
            .collect()
    }

    fn doctor() -> Session {
        Session::new("doctor", Group::Write)
    }

    fn researcher() -> Session {
        Session::new("researcher", Group::Read)
    }

    fn record(first: &str, age: u32, gender: Gender) -> NewRecord {
        NewRecord {
            first_name: first.to_string(),
            last_name: "Smith".to_string(),
            gender,
            age,
            weight: 72.5,
            height: 180.0,
            history: "Mild asthma, occasional inhaler use.".to_string(),
        }
    }

    #[test]
    fn read_group_cannot_insert() {
        let (dir, gw) = setup();
        let since = today();
        let err = gw
            .insert(&researcher(), &record("Eve", 30, Gender::Female))
            .unwrap_err();
        assert!(matches!(err, GatewayError::AccessDenied { group: Group::Read }));
        assert_eq!(gw.store().row_count().unwrap(), 0);

        let denied: Vec<AuditEvent> = audit_events(&dir, &since)
            .into_iter()
            .filter(|e| e.event_type == AuditEventType::InsertDenied)
            .collect();
        assert_eq!(denied.len(), 1);
        assert_eq!(denied[0].principal.as_deref(), Some("researcher"));
    }

    #[test]
    fn query_before_any_refresh_reports_no_anchor() {
        let (_dir, gw) = setup();
        gw.insert(&doctor(), &record("Ann", 40, Gender::Female)).unwrap();

        let result = gw.query(&doctor()).unwrap();
        assert_eq!(result.completeness, Completeness::NoAnchor);
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].integrity, Integrity::Pass);
    }

    #[test]
    fn insert_refresh_query_is_ok_and_pass() {
        let (_dir, gw) = setup();
        let id = gw.insert(&doctor(), &record("Ann", 40, Gender::Female)).unwrap();
        let root = gw.refresh_trust().unwrap();

        let result = gw.query(&doctor()).unwrap();
        assert_eq!(result.completeness, Completeness::Ok);
        assert_eq!(result.dataset_root, root);

        let row = result.find(id).unwrap();
        assert_eq!(row.integrity, Integrity::Pass);
        assert_eq!(row.first, "Ann");
        assert_eq!(row.last, "Smith");
        assert_eq!(row.age, FieldValue::Value(40));
        assert_eq!(row.gender, FieldValue::Value(Gender::Female));
        assert_eq!(row.weight, FieldValue::Value(72.5));
        assert_eq!(row.height, FieldValue::Value(180.0));
    }

    #[test]
    fn unanchored_insert_leaves_anchor_stale() {
        let (_dir, gw) = setup();
        gw.insert(&doctor(), &record("R", 40, Gender::Female)).unwrap();
        gw.refresh_trust().unwrap();

        let r2 = gw.insert(&doctor(), &record("R2", 41, Gender::Male)).unwrap();
        assert_eq!(gw.query(&doctor()).unwrap().completeness, Completeness::Fail);

        // Removing R2 brings the store back to exactly the anchored state.
        assert!(gw.store().remove_row(r2).unwrap());
        let result = gw.query(&doctor()).unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.completeness, Completeness::Ok);
    }

    #[test]
    fn deleting_row_after_normal_write_flow_fails_completeness() {
        let (_dir, gw) = setup();
        gw.insert(&doctor(), &record("R", 40, Gender::Female)).unwrap();
        gw.refresh_trust().unwrap();
        let r2 = gw.insert(&doctor(), &record("R2", 41, Gender::Male)).unwrap();
        gw.refresh_trust().unwrap();

        assert!(gw.store().remove_row(r2).unwrap());

        let result = gw.query(&doctor()).unwrap();
        assert_eq!(result.completeness, Completeness::Fail);
        assert_eq!(result.rows.len(), 1);
    }

    #[test]
    fn deleting_anchored_row_fails_completeness() {
        let (_dir, gw) = setup();
        let r1 = gw.insert(&doctor(), &record("R", 40, Gender::Female)).unwrap();
        gw.refresh_trust().unwrap();
        gw.insert(&doctor(), &record("R2", 41, Gender::Male)).unwrap();
        gw.refresh_trust().unwrap();

        assert!(gw.store().remove_row(r1).unwrap());

        let result = gw.query(&researcher()).unwrap();
        assert_eq!(result.completeness, Completeness::Fail);
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].integrity, Integrity::Pass);
    }

    #[test]
    fn tampered_history_fails_only_that_row() {
        let (_dir, gw) = setup();
        let a = gw.insert(&doctor(), &record("A", 30, Gender::Male)).unwrap();
        let b = gw.insert(&doctor(), &record("B", 31, Gender::Female)).unwrap();
        gw.refresh_trust().unwrap();

        let mut row = gw.store().get(a).unwrap().unwrap();
        row.history = "No significant medical history.".to_string();
        gw.store().overwrite_row(a, &row).unwrap();

        let result = gw.query(&doctor()).unwrap();
        assert_eq!(result.find(a).unwrap().integrity, Integrity::Fail);
        assert_eq!(result.find(b).unwrap().integrity, Integrity::Pass);
        assert_eq!(result.integrity_failures(), 1);
        // The stored leaf was not touched, so the Merkle layer sees nothing.
        assert_eq!(result.completeness, Completeness::Ok);
        // The failed row is still returned, fully decrypted.
        assert_eq!(result.find(a).unwrap().age, FieldValue::Value(30));
    }

    #[test]
    fn tampered_leaf_fails_completeness() {
        let (_dir, gw) = setup();
        let a = gw.insert(&doctor(), &record("A", 30, Gender::Male)).unwrap();
        gw.refresh_trust().unwrap();

        let mut row = gw.store().get(a).unwrap().unwrap();
        row.merkle_leaf[0] ^= 0xff;
        gw.store().overwrite_row(a, &row).unwrap();

        let result = gw.query(&doctor()).unwrap();
        assert_eq!(result.completeness, Completeness::Fail);
        assert_eq!(result.rows[0].integrity, Integrity::Pass);
    }

    #[test]
    fn tampered_confidential_field_only_marks_that_field() {
        let (_dir, gw) = setup();
        let id = gw.insert(&doctor(), &record("A", 30, Gender::Male)).unwrap();
        gw.refresh_trust().unwrap();

        let mut row = gw.store().get(id).unwrap().unwrap();
        row.age.tag[0] ^= 0x01;
        gw.store().overwrite_row(id, &row).unwrap();

        let result = gw.query(&doctor()).unwrap();
        let view = result.find(id).unwrap();
        assert_eq!(view.age, FieldValue::IntegrityFail);
        assert_eq!(view.gender, FieldValue::Value(Gender::Male));
        // Age and gender are outside the row signature.
        assert_eq!(view.integrity, Integrity::Pass);
        assert_eq!(result.completeness, Completeness::Ok);

        let json = serde_json::to_value(view).unwrap();
        assert_eq!(json["age"], INTEGRITY_FAIL_MARKER);
    }

    #[test]
    fn leaf_ignores_age_and_gender() {
        let (_dir, gw) = setup();
        let a = gw.seal(&record("Same", 20, Gender::Female)).unwrap();
        let b = gw.seal(&record("Same", 85, Gender::Male)).unwrap();
        assert_eq!(a.row_signature, b.row_signature);
        assert_eq!(a.merkle_leaf, b.merkle_leaf);
        assert_ne!(a.age, b.age);

        let c = gw.seal(&record("Other", 20, Gender::Female)).unwrap();
        assert_ne!(a.merkle_leaf, c.merkle_leaf);
    }

    #[test]
    fn read_group_never_sees_names() {
        let (_dir, gw) = setup();
        for name in ["Ann", "Bob", "[REDACTED]x", ""] {
            gw.insert(&doctor(), &record(name, 50, Gender::Male)).unwrap();
        }
        gw.refresh_trust().unwrap();

        let result = gw.query(&researcher()).unwrap();
        assert_eq!(result.rows.len(), 4);
        for row in &result.rows {
            assert_eq!(row.first, REDACTED);
            assert_eq!(row.last, REDACTED);
            assert_eq!(row.age, FieldValue::Value(50));
            assert_eq!(row.integrity, Integrity::Pass);
        }
        assert_eq!(result.completeness, Completeness::Ok);
    }

    #[test]
    fn wrong_aead_key_marks_fields_but_not_integrity() {
        let dir = TempDir::new().unwrap();
        {
            let gw = AccessGateway::open(&config(&dir, &AEAD_KEY, &HMAC_KEY)).unwrap();
            gw.insert(&doctor(), &record("A", 30, Gender::Male)).unwrap();
            gw.refresh_trust().unwrap();
        }

        let gw = AccessGateway::open(&config(&dir, &[0x33; 32], &HMAC_KEY)).unwrap();
        let result = gw.query(&doctor()).unwrap();
        let row = &result.rows[0];
        assert!(row.age.is_integrity_fail());
        assert!(row.gender.is_integrity_fail());
        assert_eq!(row.integrity, Integrity::Pass);
        assert_eq!(row.first, "A");
        assert_eq!(result.completeness, Completeness::Ok);
    }

    #[test]
    fn wrong_hmac_key_fails_integrity() {
        let dir = TempDir::new().unwrap();
        {
            let gw = AccessGateway::open(&config(&dir, &AEAD_KEY, &HMAC_KEY)).unwrap();
            gw.insert(&doctor(), &record("A", 30, Gender::Male)).unwrap();
            gw.refresh_trust().unwrap();
        }

        let gw = AccessGateway::open(&config(&dir, &AEAD_KEY, &[0x44; 32])).unwrap();
        let result = gw.query(&doctor()).unwrap();
        assert_eq!(result.rows[0].integrity, Integrity::Fail);
        assert_eq!(result.rows[0].age, FieldValue::Value(30));
    }

    #[test]
    fn repeated_queries_yield_identical_root() {
        let (_dir, gw) = setup();
        for i in 0..5 {
            gw.insert(&doctor(), &record("P", 20 + i, Gender::Female)).unwrap();
        }
        let first = gw.query(&doctor()).unwrap().dataset_root;
        let second = gw.query(&researcher()).unwrap().dataset_root;
        assert_eq!(first, second);
        assert_eq!(first, gw.current_root().unwrap());
    }

    #[test]
    fn empty_dataset_anchors_zero_root() {
        let (_dir, gw) = setup();
        assert_eq!(gw.refresh_trust().unwrap(), EMPTY_ROOT);
        let result = gw.query(&doctor()).unwrap();
        assert!(result.rows.is_empty());
        assert_eq!(result.completeness, Completeness::Ok);
    }

    #[test]
    fn malformed_anchor_counts_as_failure() {
        let (dir, gw) = setup();
        gw.insert(&doctor(), &record("A", 30, Gender::Male)).unwrap();
        std::fs::write(StoragePaths::new(dir.path()).trust_anchor(), [1u8; 3]).unwrap();

        let result = gw.query(&doctor()).unwrap();
        assert_eq!(result.completeness, Completeness::Fail);
    }

    #[test]
    fn inclusion_proofs_verify_against_current_root() {
        let (_dir, gw) = setup();
        let ids: Vec<u64> = (0..5)
            .map(|i| gw.insert(&doctor(), &record("P", 20 + i, Gender::Male)).unwrap())
            .collect();
        let root = gw.refresh_trust().unwrap();

        for id in &ids {
            let proof = gw.prove_inclusion(*id).unwrap().unwrap();
            assert_eq!(proof.root, root);
            assert!(proof.verify());
        }
        assert!(gw.prove_inclusion(999).unwrap().is_none());
    }

    #[test]
    fn query_and_failures_are_audited() {
        let (dir, gw) = setup();
        let since = today();
        let id = gw.insert(&doctor(), &record("A", 30, Gender::Male)).unwrap();
        gw.refresh_trust().unwrap();

        let mut row = gw.store().get(id).unwrap().unwrap();
        row.last_name = "Jones".to_string();
        gw.store().overwrite_row(id, &row).unwrap();
        gw.query(&researcher()).unwrap();

        let types: Vec<AuditEventType> = audit_events(&dir, &since)
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(
            types,
            vec![
                AuditEventType::RecordInserted,
                AuditEventType::TrustRefreshed,
                AuditEventType::RowIntegrityFailure,
                AuditEventType::DatasetQueried,
            ]
        );
    }

    #[test]
    fn non_finite_numbers_are_rejected_before_storage() {
        let (_dir, gw) = setup();
        gw.insert(&doctor(), &record("A", 30, Gender::Male)).unwrap();

        let mut nan_weight = record("B", 31, Gender::Female);
        nan_weight.weight = f64::NAN;
        let err = gw.insert(&doctor(), &nan_weight).unwrap_err();
        assert_eq!(err.error_code(), "invalid_record");
        assert!(matches!(err, GatewayError::InvalidRecord { field: "weight", .. }));

        let mut infinite_height = record("C", 32, Gender::Male);
        infinite_height.height = f64::INFINITY;
        assert!(matches!(
            gw.insert(&doctor(), &infinite_height),
            Err(GatewayError::InvalidRecord { field: "height", .. })
        ));

        assert_eq!(gw.store().row_count().unwrap(), 1);
        gw.refresh_trust().unwrap();
        let result = gw.query(&doctor()).unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.completeness, Completeness::Ok);
    }

    #[test]
    fn truncated_signature_fails_only_that_row() {
        let (_dir, gw) = setup();
        let a = gw.insert(&doctor(), &record("A", 30, Gender::Male)).unwrap();
        let b = gw.insert(&doctor(), &record("B", 31, Gender::Female)).unwrap();
        gw.refresh_trust().unwrap();

        let mut row = gw.store().get(a).unwrap().unwrap();
        row.row_signature.pop();
        gw.store().overwrite_row(a, &row).unwrap();

        let result = gw.query(&doctor()).unwrap();
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.find(a).unwrap().integrity, Integrity::Fail);
        assert_eq!(result.find(a).unwrap().first, "A");
        let other = result.find(b).unwrap();
        assert_eq!(other.integrity, Integrity::Pass);
        assert_eq!(other.age, FieldValue::Value(31));
        assert_eq!(result.completeness, Completeness::Ok);
    }

    #[test]
    fn short_leaf_fails_completeness_and_blocks_refresh() {
        let (_dir, gw) = setup();
        let a = gw.insert(&doctor(), &record("A", 30, Gender::Male)).unwrap();
        let b = gw.insert(&doctor(), &record("B", 31, Gender::Female)).unwrap();
        gw.refresh_trust().unwrap();

        let mut row = gw.store().get(a).unwrap().unwrap();
        row.merkle_leaf.truncate(16);
        gw.store().overwrite_row(a, &row).unwrap();

        let result = gw.query(&doctor()).unwrap();
        assert_eq!(result.completeness, Completeness::Fail);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.find(a).unwrap().integrity, Integrity::Pass);
        assert_eq!(result.find(b).unwrap().integrity, Integrity::Pass);

        let err = gw.refresh_trust().unwrap_err();
        assert_eq!(err.error_code(), "malformed_leaf");
        assert!(gw.prove_inclusion(b).is_err());
    }

    #[test]
    fn undecodable_row_is_reported_inline() {
        let (_dir, gw) = setup();
        let a = gw.insert(&doctor(), &record("A", 30, Gender::Male)).unwrap();
        let b = gw.insert(&doctor(), &record("B", 31, Gender::Female)).unwrap();
        gw.refresh_trust().unwrap();

        gw.store()
            .overwrite_raw(a, br#"{"first_name":"A","weight":null}"#)
            .unwrap();

        let result = gw.query(&doctor()).unwrap();
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.completeness, Completeness::Fail);

        let broken = result.find(a).unwrap();
        assert_eq!(broken.integrity, Integrity::Fail);
        assert_eq!(broken.first, INTEGRITY_FAIL_MARKER);
        assert!(broken.weight.is_integrity_fail());
        assert!(broken.history.is_integrity_fail());
        assert!(broken.age.is_integrity_fail());

        let intact = result.find(b).unwrap();
        assert_eq!(intact.integrity, Integrity::Pass);
        assert_eq!(intact.first, "B");

        let redacted = gw.query(&researcher()).unwrap();
        assert_eq!(redacted.find(a).unwrap().first, REDACTED);
        assert_eq!(redacted.find(a).unwrap().last, REDACTED);
    }
}
