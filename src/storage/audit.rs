// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for security-relevant gateway operations.
//!
//! Inserts, denied writes, trust refreshes and queries (including any
//! integrity or completeness failure they observed) are appended to a daily
//! JSONL file. Audit entries never contain confidential field values.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::StoragePaths;
use crate::auth::{Group, Session};

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("invalid date '{0}'")]
    InvalidDate(String),
}

pub type AuditResult<T> = Result<T, AuditError>;

/// Types of auditable events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Write path
    RecordInserted,
    InsertDenied,

    // Trust
    TrustRefreshed,

    // Read path
    DatasetQueried,
    CompletenessFailure,
    RowIntegrityFailure,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: AuditEventType,
    /// Principal who triggered the event (if any).
    pub principal: Option<String>,
    /// Group of that principal.
    pub group: Option<Group>,
    /// Row affected, if the event concerns a single row.
    pub row_id: Option<u64>,
    /// Additional details as JSON.
    pub details: Option<serde_json::Value>,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error message if operation failed.
    pub error: Option<String>,
}

impl AuditEvent {
    /// Create a new audit event.
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            principal: None,
            group: None,
            row_id: None,
            details: None,
            success: true,
            error: None,
        }
    }

    /// Attribute the event to a session.
    pub fn with_session(mut self, session: &Session) -> Self {
        self.principal = Some(session.principal.clone());
        self.group = Some(session.group);
        self
    }

    pub fn with_row(mut self, row_id: u64) -> Self {
        self.row_id = Some(row_id);
        self
    }

    /// Add details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed with error message.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

/// Append-only audit log under `<root>/audit`.
#[derive(Debug, Clone)]
pub struct AuditLog {
    paths: StoragePaths,
}

impl AuditLog {
    pub fn new(paths: StoragePaths) -> Self {
        Self { paths }
    }

    /// Log an audit event.
    ///
    /// Events are appended to a daily log file in JSONL format.
    pub fn log(&self, event: &AuditEvent) -> AuditResult<()> {
        let date = event.timestamp.format("%Y-%m-%d").to_string();
        let path = self.paths.audit_events_file(&date);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }

    /// Read audit events for a specific date (`YYYY-MM-DD`).
    ///
    /// A day without events yields an empty list.
    pub fn read_events(&self, date: &str) -> AuditResult<Vec<AuditEvent>> {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| AuditError::InvalidDate(date.to_string()))?;

        let content = match fs::read_to_string(self.paths.audit_events_file(date)) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(AuditError::from))
            .collect()
    }

    /// Read events of one type for a specific date.
    pub fn read_events_of_type(
        &self,
        date: &str,
        event_type: &AuditEventType,
    ) -> AuditResult<Vec<AuditEvent>> {
        Ok(self
            .read_events(date)?
            .into_iter()
            .filter(|e| &e.event_type == event_type)
            .collect())
    }
}
