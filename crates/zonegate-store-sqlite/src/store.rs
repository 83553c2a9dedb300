// crates/zonegate-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Ledger Store
// Description: Durable LedgerStore backed by SQLite WAL.
// Purpose: Persist decisions, mitigations, evidence, and the audit chain.
// Dependencies: zonegate-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`LedgerStore`] using `SQLite`. Each
//! record is stored as canonical JSON next to the columns used for lookups,
//! together with a digest of those bytes. Loads verify the digest and fail
//! closed on corruption.
//!
//! The schema enforces the ledger's write rules on its own:
//! - `decision_states` and `audit_log` reject `UPDATE` and `DELETE`.
//! - `evidence` rejects `DELETE`, and rejects `UPDATE` once sealed.
//! - `mitigations` reject `UPDATE` once deactivated.
//!
//! `zone_assessments` is not part of the ledger: it keeps only the latest
//! risk evaluation per zone and is overwritten on each evaluation.
//!
//! Each [`LedgerBatch`] is applied in one transaction; audit entries are
//! chained to the stored tail inside that transaction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::params;
use rusqlite::params_from_iter;
use rusqlite::types::Value as SqlValue;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use zonegate_core::AssessmentSnapshot;
use zonegate_core::AuditFilter;
use zonegate_core::AuditLog;
use zonegate_core::AuditPage;
use zonegate_core::DecisionId;
use zonegate_core::DecisionState;
use zonegate_core::EvidenceFilter;
use zonegate_core::EvidenceId;
use zonegate_core::EvidenceRecord;
use zonegate_core::LedgerBatch;
use zonegate_core::LedgerStore;
use zonegate_core::Mitigation;
use zonegate_core::StoreError;
use zonegate_core::Timestamp;
use zonegate_core::ZoneId;
use zonegate_core::hashing::DEFAULT_HASH_ALGORITHM;
use zonegate_core::hashing::canonical_json_bytes;
use zonegate_core::hashing::hash_bytes;
use zonegate_core::seal_after;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

/// Ledger schema applied to a fresh database.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS decision_states (
    decision_id TEXT PRIMARY KEY,
    zone_id TEXT NOT NULL,
    sequence INTEGER NOT NULL,
    current_state TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    record_json BLOB NOT NULL,
    record_hash TEXT NOT NULL,
    UNIQUE (zone_id, sequence)
);
CREATE TRIGGER IF NOT EXISTS decision_states_no_update
BEFORE UPDATE ON decision_states
BEGIN SELECT RAISE(ABORT, 'decision_states is append-only'); END;
CREATE TRIGGER IF NOT EXISTS decision_states_no_delete
BEFORE DELETE ON decision_states
BEGIN SELECT RAISE(ABORT, 'decision_states is append-only'); END;

CREATE TABLE IF NOT EXISTS mitigations (
    mitigation_id TEXT PRIMARY KEY,
    zone_id TEXT NOT NULL,
    measure_type TEXT NOT NULL,
    active INTEGER NOT NULL,
    activated_at INTEGER NOT NULL,
    record_json BLOB NOT NULL,
    record_hash TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_mitigations_zone ON mitigations (zone_id, activated_at);
CREATE TRIGGER IF NOT EXISTS mitigations_final_once_inactive
BEFORE UPDATE ON mitigations WHEN OLD.active = 0
BEGIN SELECT RAISE(ABORT, 'deactivated mitigations are final'); END;
CREATE TRIGGER IF NOT EXISTS mitigations_no_delete
BEFORE DELETE ON mitigations
BEGIN SELECT RAISE(ABORT, 'mitigations are retained'); END;

CREATE TABLE IF NOT EXISTS evidence (
    evidence_id TEXT PRIMARY KEY,
    evidence_type TEXT NOT NULL,
    related_id TEXT NOT NULL,
    zone_id TEXT,
    sealed INTEGER NOT NULL,
    archived_at INTEGER NOT NULL,
    record_json BLOB NOT NULL,
    record_hash TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_evidence_archived ON evidence (archived_at, evidence_id);
CREATE TRIGGER IF NOT EXISTS evidence_sealed_is_final
BEFORE UPDATE ON evidence WHEN OLD.sealed = 1
BEGIN SELECT RAISE(ABORT, 'sealed evidence is immutable'); END;
CREATE TRIGGER IF NOT EXISTS evidence_no_delete
BEFORE DELETE ON evidence
BEGIN SELECT RAISE(ABORT, 'evidence is retained'); END;

CREATE TABLE IF NOT EXISTS audit_log (
    sequence INTEGER PRIMARY KEY,
    audit_id TEXT NOT NULL UNIQUE,
    timestamp INTEGER NOT NULL,
    operation_type TEXT NOT NULL,
    operator_id TEXT NOT NULL,
    zone_id TEXT,
    target_type TEXT,
    target_id TEXT,
    action TEXT NOT NULL,
    result TEXT NOT NULL,
    previous_hash TEXT NOT NULL,
    hash TEXT NOT NULL,
    entry_json BLOB NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log (timestamp, sequence);
CREATE INDEX IF NOT EXISTS idx_audit_zone ON audit_log (zone_id, timestamp);
CREATE TRIGGER IF NOT EXISTS audit_log_no_update
BEFORE UPDATE ON audit_log
BEGIN SELECT RAISE(ABORT, 'audit_log is append-only'); END;
CREATE TRIGGER IF NOT EXISTS audit_log_no_delete
BEFORE DELETE ON audit_log
BEGIN SELECT RAISE(ABORT, 'audit_log is append-only'); END;

CREATE TABLE IF NOT EXISTS zone_assessments (
    zone_id TEXT PRIMARY KEY,
    evaluated_at INTEGER NOT NULL,
    record_json BLOB NOT NULL,
    record_hash TEXT NOT NULL
);
";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` ledger store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Returns a config for `path` with default pragmas.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages avoid embedding evidence snapshots or audit metadata.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store corruption or hash mismatch.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Write raced another writer or repeated a unique key.
    #[error("sqlite store conflict: {0}")]
    Conflict(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::Conflict(message) => Self::Conflict(message),
        }
    }
}

/// Maps a `rusqlite` error, surfacing constraint violations as conflicts.
fn db_error(err: &rusqlite::Error) -> SqliteStoreError {
    if let rusqlite::Error::SqliteFailure(failure, _) = err
        && failure.code == ErrorCode::ConstraintViolation
    {
        return SqliteStoreError::Conflict(err.to_string());
    }
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed ledger store with WAL support.
///
/// # Invariants
/// - Record loads verify stored digests before deserialization.
/// - `SQLite` connection access is serialized through a mutex.
#[derive(Clone)]
pub struct SqliteLedgerStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Shared connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteLedgerStore {
    /// Opens an `SQLite`-backed ledger store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Verifies the store can execute a simple SQL statement.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] if the mutex is poisoned or the query fails.
    pub fn check_connection(&self) -> Result<(), SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map(|_| ())
            .map_err(|err| db_error(&err))
    }

    /// Locks the connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite mutex poisoned".to_string()))
    }

    /// Applies a batch inside one transaction.
    fn apply_batch(&self, batch: LedgerBatch) -> Result<Vec<AuditLog>, SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(|err| db_error(&err))?;
        if let Some(decision) = &batch.decision {
            insert_decision(&tx, decision)?;
        }
        for mitigation in &batch.mitigations {
            upsert_mitigation(&tx, mitigation)?;
        }
        for record in &batch.evidence {
            insert_evidence(&tx, record)?;
        }
        for (evidence_id, at) in &batch.seals {
            seal_evidence_row(&tx, evidence_id, *at)?;
        }
        if let Some(snapshot) = &batch.assessment {
            upsert_assessment(&tx, snapshot)?;
        }
        let tail = load_audit_tail(&tx)?;
        let sealed = seal_after(tail.as_ref(), batch.audit)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        for log in &sealed {
            insert_audit(&tx, log)?;
        }
        tx.commit().map_err(|err| db_error(&err))?;
        drop(guard);
        Ok(sealed)
    }

    /// Runs a query returning stored record blobs and decodes them.
    fn load_records<T: DeserializeOwned>(
        &self,
        sql: &str,
        values: Vec<SqlValue>,
    ) -> Result<Vec<T>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut stmt = guard.prepare(sql).map_err(|err| db_error(&err))?;
        let rows = stmt
            .query_map(params_from_iter(values), |row| {
                Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|err| db_error(&err))?;
        let mut records = Vec::new();
        for row in rows {
            let (bytes, hash) = row.map_err(|err| db_error(&err))?;
            records.push(decode_record(&bytes, &hash)?);
        }
        Ok(records)
    }

    /// Runs a query returning at most one stored record.
    fn load_record<T: DeserializeOwned>(
        &self,
        sql: &str,
        values: Vec<SqlValue>,
    ) -> Result<Option<T>, SqliteStoreError> {
        Ok(self.load_records(sql, values)?.into_iter().next())
    }

    /// Loads audit entries, verifying the row hash against the decoded entry.
    fn load_audit(&self, sql: &str, values: Vec<SqlValue>) -> Result<Vec<AuditLog>, SqliteStoreError> {
        let guard = self.lock()?;
        load_audit_rows(&guard, sql, values)
    }
}

impl LedgerStore for SqliteLedgerStore {
    fn latest_decision(&self, zone_id: &ZoneId) -> Result<Option<DecisionState>, StoreError> {
        Ok(self.load_record(
            "SELECT record_json, record_hash FROM decision_states WHERE zone_id = ?1 ORDER BY \
             sequence DESC LIMIT 1",
            vec![text(zone_id.as_str())],
        )?)
    }

    fn decision(&self, decision_id: &DecisionId) -> Result<Option<DecisionState>, StoreError> {
        Ok(self.load_record(
            "SELECT record_json, record_hash FROM decision_states WHERE decision_id = ?1",
            vec![text(decision_id.as_str())],
        )?)
    }

    fn decision_history(&self, zone_id: &ZoneId) -> Result<Vec<DecisionState>, StoreError> {
        Ok(self.load_records(
            "SELECT record_json, record_hash FROM decision_states WHERE zone_id = ?1 ORDER BY \
             sequence ASC",
            vec![text(zone_id.as_str())],
        )?)
    }

    fn zone_mitigations(&self, zone_id: &ZoneId) -> Result<Vec<Mitigation>, StoreError> {
        Ok(self.load_records(
            "SELECT record_json, record_hash FROM mitigations WHERE zone_id = ?1 ORDER BY \
             activated_at ASC, mitigation_id ASC",
            vec![text(zone_id.as_str())],
        )?)
    }

    fn latest_assessment(&self, zone_id: &ZoneId) -> Result<Option<AssessmentSnapshot>, StoreError> {
        Ok(self.load_record(
            "SELECT record_json, record_hash FROM zone_assessments WHERE zone_id = ?1",
            vec![text(zone_id.as_str())],
        )?)
    }

    fn evidence(&self, evidence_id: &EvidenceId) -> Result<Option<EvidenceRecord>, StoreError> {
        Ok(self.load_record(
            "SELECT record_json, record_hash FROM evidence WHERE evidence_id = ?1",
            vec![text(evidence_id.as_str())],
        )?)
    }

    fn list_evidence(&self, filter: &EvidenceFilter) -> Result<Vec<EvidenceRecord>, StoreError> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();
        push_text(&mut clauses, &mut values, "evidence_type", filter.evidence_type.as_deref());
        push_text(&mut clauses, &mut values, "related_id", filter.related_id.as_deref());
        push_text(&mut clauses, &mut values, "zone_id", filter.zone_id.as_ref().map(ZoneId::as_str));
        if let Some(sealed) = filter.sealed {
            clauses.push("sealed = ?".to_string());
            values.push(SqlValue::Integer(i64::from(sealed)));
        }
        push_time_range(&mut clauses, &mut values, "archived_at", filter.start_time, filter.end_time);
        let sql = format!(
            "SELECT record_json, record_hash FROM evidence{} ORDER BY archived_at ASC, evidence_id \
             ASC LIMIT ? OFFSET ?",
            where_clause(&clauses)
        );
        values.push(limit_value(filter.limit));
        values.push(offset_value(filter.offset)?);
        Ok(self.load_records(&sql, values)?)
    }

    fn query_audit(&self, filter: &AuditFilter) -> Result<AuditPage, StoreError> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();
        push_text(
            &mut clauses,
            &mut values,
            "operation_type",
            filter.operation_type.map(|value| value.as_str()),
        );
        push_text(
            &mut clauses,
            &mut values,
            "operator_id",
            filter.operator_id.as_ref().map(|value| value.as_str()),
        );
        push_text(&mut clauses, &mut values, "zone_id", filter.zone_id.as_ref().map(ZoneId::as_str));
        push_text(&mut clauses, &mut values, "target_type", filter.target_type.as_deref());
        push_text(&mut clauses, &mut values, "target_id", filter.target_id.as_deref());
        push_text(&mut clauses, &mut values, "action", filter.action.as_deref());
        push_text(&mut clauses, &mut values, "result", filter.result.map(|value| value.as_str()));
        push_time_range(&mut clauses, &mut values, "timestamp", filter.start_time, filter.end_time);
        let filters = where_clause(&clauses);

        let guard = self.lock().map_err(StoreError::from)?;
        let count: i64 = guard
            .query_row(
                &format!("SELECT COUNT(*) FROM audit_log{filters}"),
                params_from_iter(values.clone()),
                |row| row.get(0),
            )
            .map_err(|err| StoreError::from(db_error(&err)))?;
        let count = usize::try_from(count)
            .map_err(|_| StoreError::Corrupt(format!("negative audit count: {count}")))?;
        values.push(limit_value(filter.limit));
        values.push(offset_value(filter.offset)?);
        let logs = load_audit_rows(
            &guard,
            &format!(
                "SELECT entry_json, hash FROM audit_log{filters} ORDER BY timestamp DESC, sequence \
                 DESC LIMIT ? OFFSET ?"
            ),
            values,
        )?;
        drop(guard);
        Ok(AuditPage {
            logs,
            count,
        })
    }

    fn audit_range(&self, start: Timestamp, end: Timestamp) -> Result<Vec<AuditLog>, StoreError> {
        Ok(self.load_audit(
            "SELECT entry_json, hash FROM audit_log WHERE sequence BETWEEN (SELECT MIN(sequence) \
             FROM audit_log WHERE timestamp >= ?1 AND timestamp < ?2) AND (SELECT MAX(sequence) \
             FROM audit_log WHERE timestamp >= ?1 AND timestamp < ?2) ORDER BY sequence ASC",
            vec![millis(start), millis(end)],
        )?)
    }

    fn audit_before(&self, sequence: u64) -> Result<Option<AuditLog>, StoreError> {
        let logs = self.load_audit(
            "SELECT entry_json, hash FROM audit_log WHERE sequence < ?1 ORDER BY sequence DESC \
             LIMIT 1",
            vec![sequence_value(sequence)?],
        )?;
        Ok(logs.into_iter().next())
    }

    fn commit(&self, batch: LedgerBatch) -> Result<Vec<AuditLog>, StoreError> {
        Ok(self.apply_batch(batch)?)
    }
}

// ============================================================================
// SECTION: Writes
// ============================================================================

/// Appends a decision record after checking it extends the zone timeline.
fn insert_decision(tx: &Transaction<'_>, decision: &DecisionState) -> Result<(), SqliteStoreError> {
    let latest: Option<i64> = tx
        .query_row(
            "SELECT MAX(sequence) FROM decision_states WHERE zone_id = ?1",
            params![decision.zone_id.as_str()],
            |row| row.get(0),
        )
        .map_err(|err| db_error(&err))?;
    let latest = latest.unwrap_or(0);
    let sequence = sequence_i64(decision.sequence)?;
    if sequence != latest.saturating_add(1) {
        return Err(SqliteStoreError::Conflict(format!(
            "zone {} is at sequence {latest}, batch expects {}",
            decision.zone_id,
            sequence.saturating_sub(1)
        )));
    }
    let (bytes, hash) = encode_record(decision)?;
    tx.execute(
        "INSERT INTO decision_states (decision_id, zone_id, sequence, current_state, created_at, \
         record_json, record_hash) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            decision.id.as_str(),
            decision.zone_id.as_str(),
            sequence,
            decision.current_state.as_str(),
            decision.created_at.as_unix_millis(),
            bytes,
            hash,
        ],
    )
    .map_err(|err| db_error(&err))?;
    Ok(())
}

/// Inserts or replaces a mitigation; deactivated rows are final.
fn upsert_mitigation(tx: &Transaction<'_>, mitigation: &Mitigation) -> Result<(), SqliteStoreError> {
    let (bytes, hash) = encode_record(mitigation)?;
    tx.execute(
        "INSERT INTO mitigations (mitigation_id, zone_id, measure_type, active, activated_at, \
         record_json, record_hash) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT (mitigation_id) DO UPDATE SET active = excluded.active, record_json = \
         excluded.record_json, record_hash = excluded.record_hash",
        params![
            mitigation.id.as_str(),
            mitigation.zone_id.as_str(),
            mitigation.measure_type.as_str(),
            i64::from(mitigation.active),
            mitigation.activated_at.as_unix_millis(),
            bytes,
            hash,
        ],
    )
    .map_err(|err| db_error(&err))?;
    Ok(())
}

/// Inserts a new evidence record.
fn insert_evidence(tx: &Transaction<'_>, record: &EvidenceRecord) -> Result<(), SqliteStoreError> {
    let (bytes, hash) = encode_record(record)?;
    tx.execute(
        "INSERT INTO evidence (evidence_id, evidence_type, related_id, zone_id, sealed, \
         archived_at, record_json, record_hash) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            record.id.as_str(),
            record.evidence_type,
            record.related_id,
            record.zone_id.as_ref().map(ZoneId::as_str),
            i64::from(record.sealed),
            record.archived_at.as_unix_millis(),
            bytes,
            hash,
        ],
    )
    .map_err(|err| db_error(&err))?;
    Ok(())
}

/// Seals an evidence row; sealing a sealed row is a no-op.
fn seal_evidence_row(
    tx: &Transaction<'_>,
    evidence_id: &EvidenceId,
    at: Timestamp,
) -> Result<(), SqliteStoreError> {
    let row: Option<(Vec<u8>, String)> = tx
        .query_row(
            "SELECT record_json, record_hash FROM evidence WHERE evidence_id = ?1",
            params![evidence_id.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(|err| db_error(&err))?;
    let Some((bytes, hash)) = row else {
        return Err(SqliteStoreError::Invalid(format!("evidence {evidence_id} not found")));
    };
    let record: EvidenceRecord = decode_record(&bytes, &hash)?;
    if record.sealed {
        return Ok(());
    }
    let (bytes, hash) = encode_record(&record.sealed_at(at))?;
    tx.execute(
        "UPDATE evidence SET sealed = 1, record_json = ?2, record_hash = ?3 WHERE evidence_id = ?1",
        params![evidence_id.as_str(), bytes, hash],
    )
    .map_err(|err| db_error(&err))?;
    Ok(())
}

/// Replaces a zone's recorded assessment.
fn upsert_assessment(
    tx: &Transaction<'_>,
    snapshot: &AssessmentSnapshot,
) -> Result<(), SqliteStoreError> {
    let (bytes, hash) = encode_record(snapshot)?;
    tx.execute(
        "INSERT INTO zone_assessments (zone_id, evaluated_at, record_json, record_hash) VALUES \
         (?1, ?2, ?3, ?4) ON CONFLICT (zone_id) DO UPDATE SET evaluated_at = \
         excluded.evaluated_at, record_json = excluded.record_json, record_hash = \
         excluded.record_hash",
        params![
            snapshot.assessment.zone_id.as_str(),
            snapshot.evaluated_at.as_unix_millis(),
            bytes,
            hash,
        ],
    )
    .map_err(|err| db_error(&err))?;
    Ok(())
}

/// Loads the last audit entry, if any.
fn load_audit_tail(tx: &Transaction<'_>) -> Result<Option<AuditLog>, SqliteStoreError> {
    let logs = load_audit_rows(
        tx,
        "SELECT entry_json, hash FROM audit_log ORDER BY sequence DESC LIMIT 1",
        Vec::new(),
    )?;
    Ok(logs.into_iter().next())
}

/// Appends a sealed audit entry.
fn insert_audit(tx: &Transaction<'_>, log: &AuditLog) -> Result<(), SqliteStoreError> {
    let bytes = canonical_json_bytes(log).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    let entry = &log.entry;
    tx.execute(
        "INSERT INTO audit_log (sequence, audit_id, timestamp, operation_type, operator_id, \
         zone_id, target_type, target_id, action, result, previous_hash, hash, entry_json) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            sequence_i64(log.sequence)?,
            log.id.as_str(),
            entry.timestamp.as_unix_millis(),
            entry.operation_type.as_str(),
            entry.operator_id.as_str(),
            entry.zone_id.as_ref().map(ZoneId::as_str),
            entry.target_type,
            entry.target_id,
            entry.action,
            entry.result.as_str(),
            log.previous_hash,
            log.hash,
            bytes,
        ],
    )
    .map_err(|err| db_error(&err))?;
    Ok(())
}

// ============================================================================
// SECTION: Encoding
// ============================================================================

/// Encodes a record as canonical JSON with its digest.
fn encode_record<T: Serialize>(record: &T) -> Result<(Vec<u8>, String), SqliteStoreError> {
    let bytes =
        canonical_json_bytes(record).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    let hash = hash_bytes(DEFAULT_HASH_ALGORITHM, &bytes).value;
    Ok((bytes, hash))
}

/// Decodes a stored record after verifying its digest.
fn decode_record<T: DeserializeOwned>(bytes: &[u8], hash: &str) -> Result<T, SqliteStoreError> {
    let actual = hash_bytes(DEFAULT_HASH_ALGORITHM, bytes).value;
    if actual != hash {
        return Err(SqliteStoreError::Corrupt("record hash mismatch".to_string()));
    }
    serde_json::from_slice(bytes)
        .map_err(|err| SqliteStoreError::Corrupt(format!("record decode failed: {err}")))
}

/// Loads audit rows; the stored chain hash must match the decoded entry.
fn load_audit_rows(
    connection: &Connection,
    sql: &str,
    values: Vec<SqlValue>,
) -> Result<Vec<AuditLog>, SqliteStoreError> {
    let mut stmt = connection.prepare(sql).map_err(|err| db_error(&err))?;
    let rows = stmt
        .query_map(params_from_iter(values), |row| {
            Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(|err| db_error(&err))?;
    let mut logs = Vec::new();
    for row in rows {
        let (bytes, hash) = row.map_err(|err| db_error(&err))?;
        let log: AuditLog = serde_json::from_slice(&bytes)
            .map_err(|err| SqliteStoreError::Corrupt(format!("audit decode failed: {err}")))?;
        if log.hash != hash {
            return Err(SqliteStoreError::Corrupt(format!(
                "audit row {} hash column disagrees with entry",
                log.sequence
            )));
        }
        logs.push(log);
    }
    Ok(logs)
}

// ============================================================================
// SECTION: Query Builders
// ============================================================================

/// Wraps text as a SQL value.
fn text(value: &str) -> SqlValue {
    SqlValue::Text(value.to_string())
}

/// Wraps a timestamp as a SQL value.
const fn millis(value: Timestamp) -> SqlValue {
    SqlValue::Integer(value.as_unix_millis())
}

/// Converts a ledger sequence to `SQLite` integer range.
fn sequence_i64(sequence: u64) -> Result<i64, SqliteStoreError> {
    i64::try_from(sequence)
        .map_err(|_| SqliteStoreError::Invalid(format!("sequence out of range: {sequence}")))
}

/// Wraps a ledger sequence as a SQL value.
fn sequence_value(sequence: u64) -> Result<SqlValue, StoreError> {
    Ok(SqlValue::Integer(sequence_i64(sequence)?))
}

/// Wraps an optional page size; `-1` means unbounded in `SQLite`.
fn limit_value(limit: Option<usize>) -> SqlValue {
    SqlValue::Integer(limit.and_then(|value| i64::try_from(value).ok()).unwrap_or(-1))
}

/// Wraps a page offset as a SQL value.
fn offset_value(offset: usize) -> Result<SqlValue, StoreError> {
    i64::try_from(offset)
        .map(SqlValue::Integer)
        .map_err(|_| StoreError::Invalid(format!("offset out of range: {offset}")))
}

/// Adds an equality clause when the filter value is present.
fn push_text(
    clauses: &mut Vec<String>,
    values: &mut Vec<SqlValue>,
    column: &str,
    value: Option<&str>,
) {
    if let Some(value) = value {
        clauses.push(format!("{column} = ?"));
        values.push(text(value));
    }
}

/// Adds a half-open time range clause.
fn push_time_range(
    clauses: &mut Vec<String>,
    values: &mut Vec<SqlValue>,
    column: &str,
    start: Option<Timestamp>,
    end: Option<Timestamp>,
) {
    if let Some(start) = start {
        clauses.push(format!("{column} >= ?"));
        values.push(millis(start));
    }
    if let Some(end) = end {
        clauses.push(format!("{column} < ?"));
        values.push(millis(end));
    }
}

/// Renders collected clauses as a `WHERE` suffix.
fn where_clause(clauses: &[String]) -> String {
    if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with durable defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection =
        Connection::open_with_flags(&config.path, flags).map_err(|err| db_error(&err))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(|err| db_error(&err))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| db_error(&err))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| db_error(&err))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| db_error(&err))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| db_error(&err))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| db_error(&err))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| db_error(&err))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| db_error(&err))?;
            tx.execute_batch(SCHEMA_SQL).map_err(|err| db_error(&err))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| db_error(&err))?;
    Ok(())
}
