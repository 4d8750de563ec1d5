//! Augur Storage Layer
//!
//! Implements the EngineStore trait on SQLite.
//!
//! # Architecture
//!
//! - `hypotheses`: one mutable row per hypothesis, written only through
//!   compare-and-set on its `version` column
//! - `evidence`, `episodes`, `anomalies`: append-only logs guarded by triggers
//! - `outcomes`: one durable record per hypothesis
//! - `leases`: named single-flight leases with owner token and expiry
//!
//! Every multi-row write runs in one `IMMEDIATE` transaction and the file
//! is opened in WAL mode, so several processes can share a database file.
//! [`EngineStore::snapshot`] reads inside one deferred transaction and sees
//! a single committed state.
//!
//! # Examples
//!
//! ```no_run
//! use augur_domain::BandThresholds;
//! use augur_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:", BandThresholds::default()).unwrap();
//! // Store is now ready for engine operations
//! ```

#![warn(missing_docs)]

mod rows;

use augur_domain::traits::{
    CommitOutcome, EngineStore, EvidenceQuery, HypothesisQuery, HypothesisUpdate, PopulationSnapshot,
};
use augur_domain::{
    AnomalyRecord, BandThresholds, CycleLease, Episode, EpisodeId, Evidence, Hypothesis, HypothesisId,
    LeaseOutcome, OutcomeRecord,
};
use rows::{id_to_bytes, HYPOTHESIS_COLUMNS};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Uniqueness constraint violated
    #[error("Duplicate record: {0}")]
    Duplicate(String),
}

/// SQLite-based implementation of EngineStore
///
/// Bands are never read back from the database: every loaded hypothesis is
/// reclassified with the thresholds the store was opened with.
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Share a store behind a mutex or
/// open one store per thread against the same file.
pub struct SqliteStore {
    conn: Connection,
    thresholds: BandThresholds,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use augur_domain::BandThresholds;
    /// use augur_store::SqliteStore;
    ///
    /// let store = SqliteStore::new("augur.db", BandThresholds::default()).unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P, thresholds: BandThresholds) -> Result<Self, StoreError> {
        thresholds
            .validate()
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        // in-memory databases report "memory" and stay that way
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        let mut store = Self { conn, thresholds };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Thresholds used to classify loaded hypotheses
    pub fn thresholds(&self) -> &BandThresholds {
        &self.thresholds
    }

    /// Initialize the database schema
    fn initialize_schema(&mut self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    fn begin(&mut self) -> Result<Transaction<'_>, StoreError> {
        Ok(self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?)
    }

    fn load_hypotheses(
        conn: &Connection,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
        thresholds: &BandThresholds,
    ) -> Result<Vec<Hypothesis>, StoreError> {
        let mut stmt = conn.prepare(sql)?;
        let parts = stmt
            .query_map(params, rows::hypothesis_parts)?
            .collect::<Result<Vec<_>, _>>()?;

        parts
            .into_iter()
            .map(|mut p| -> Result<Hypothesis, StoreError> {
                p.evidence_ids = rows::evidence_ids(conn, p.id)?;
                Ok(Hypothesis::restore(p, thresholds))
            })
            .collect()
    }

    /// Compare-and-set write of a hypothesis row inside an open transaction
    fn cas_write(tx: &Transaction<'_>, hypothesis: &Hypothesis) -> Result<CommitOutcome, StoreError> {
        let id = id_to_bytes(hypothesis.id.value());
        let changed = tx.execute(
            "UPDATE hypotheses SET
                cluster_id = ?1, confidence = ?2, band = ?3, novelty = ?4, pass_count = ?5,
                status = ?6, flag = ?7, updated_at = ?8, version = version + 1
             WHERE id = ?9 AND version = ?10",
            params![
                hypothesis.cluster_id,
                hypothesis.confidence(),
                hypothesis.band().as_str(),
                hypothesis.novelty,
                hypothesis.pass_count() as i64,
                hypothesis.status().as_str(),
                hypothesis.flag.map(|f| f.as_str()),
                hypothesis.updated_at as i64,
                &id,
                hypothesis.version as i64,
            ],
        )?;

        if changed == 1 {
            return Ok(CommitOutcome::Committed(hypothesis.version + 1));
        }

        let exists: bool = tx
            .query_row("SELECT 1 FROM hypotheses WHERE id = ?1", params![&id], |_| Ok(true))
            .optional()?
            .unwrap_or(false);
        if exists {
            Ok(CommitOutcome::Conflict)
        } else {
            Err(StoreError::NotFound(format!("hypothesis {}", hypothesis.id)))
        }
    }

    fn insert_evidence(tx: &Transaction<'_>, evidence: &Evidence) -> Result<(), StoreError> {
        tx.execute(
            "INSERT INTO evidence (id, hypothesis_id, source_type, payload_summary, source_url, observed_at,
                                   information_value, polarity, confidence_delta, pass_number, rationale)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                id_to_bytes(evidence.id.value()),
                id_to_bytes(evidence.hypothesis_id.value()),
                evidence.source_type,
                evidence.payload_summary,
                evidence.source_url,
                evidence.observed_at as i64,
                evidence.information_value,
                evidence.polarity.as_str(),
                evidence.confidence_delta,
                evidence.pass_number as i64,
                evidence.rationale,
            ],
        )
        .map_err(|e| duplicate_or(e, || format!("evidence {}", evidence.id)))?;
        Ok(())
    }

    fn insert_anomaly(tx: &Transaction<'_>, anomaly: &AnomalyRecord) -> Result<(), StoreError> {
        tx.execute(
            "INSERT INTO anomalies (hypothesis_id, pass_number, confidence_before, confidence_after,
                                    band_before, band_after, recorded_at, note)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id_to_bytes(anomaly.hypothesis_id.value()),
                anomaly.pass_number as i64,
                anomaly.confidence_before,
                anomaly.confidence_after,
                anomaly.band_before.as_str(),
                anomaly.band_after.as_str(),
                anomaly.recorded_at as i64,
                anomaly.note,
            ],
        )?;
        Ok(())
    }
}

impl EngineStore for SqliteStore {
    type Error = StoreError;

    fn insert_hypothesis(&mut self, hypothesis: &Hypothesis, evidence: &[Evidence]) -> Result<(), Self::Error> {
        let tx = self.begin()?;
        tx.execute(
            "INSERT INTO hypotheses (id, entity_id, category, cluster_id, prior_confidence, confidence, band,
                                     novelty, pass_count, status, flag, version, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                id_to_bytes(hypothesis.id.value()),
                hypothesis.entity_id,
                hypothesis.category,
                hypothesis.cluster_id,
                hypothesis.prior_confidence(),
                hypothesis.confidence(),
                hypothesis.band().as_str(),
                hypothesis.novelty,
                hypothesis.pass_count() as i64,
                hypothesis.status().as_str(),
                hypothesis.flag.map(|f| f.as_str()),
                hypothesis.version as i64,
                hypothesis.created_at as i64,
                hypothesis.updated_at as i64,
            ],
        )
        .map_err(|e| {
            duplicate_or(e, || {
                format!(
                    "hypothesis {} ({} / {})",
                    hypothesis.id, hypothesis.entity_id, hypothesis.category
                )
            })
        })?;

        for entry in evidence {
            Self::insert_evidence(&tx, entry)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get_hypothesis(&self, id: HypothesisId) -> Result<Option<Hypothesis>, Self::Error> {
        let sql = format!("SELECT {} FROM hypotheses WHERE id = ?1", HYPOTHESIS_COLUMNS);
        let id_bytes = id_to_bytes(id.value());
        let mut found = Self::load_hypotheses(&self.conn, &sql, params![id_bytes], &self.thresholds)?;
        Ok(found.pop())
    }

    fn find_active(&self, entity_id: &str, category: &str) -> Result<Option<Hypothesis>, Self::Error> {
        let sql = format!(
            "SELECT {} FROM hypotheses WHERE entity_id = ?1 AND category = ?2 AND status = 'ACTIVE'",
            HYPOTHESIS_COLUMNS
        );
        let mut found = Self::load_hypotheses(&self.conn, &sql, params![entity_id, category], &self.thresholds)?;
        Ok(found.pop())
    }

    fn query_hypotheses(&self, query: &HypothesisQuery) -> Result<Vec<Hypothesis>, Self::Error> {
        let mut sql = format!("SELECT {} FROM hypotheses WHERE 1=1", HYPOTHESIS_COLUMNS);
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            params.push(Box::new(status.as_str()));
        }

        if let Some(entity_id) = &query.entity_id {
            sql.push_str(" AND entity_id = ?");
            params.push(Box::new(entity_id.clone()));
        }

        if let Some(category) = &query.category {
            sql.push_str(" AND category = ?");
            params.push(Box::new(category.clone()));
        }

        if let Some(cluster_id) = &query.cluster_id {
            sql.push_str(" AND cluster_id = ?");
            params.push(Box::new(cluster_id.clone()));
        }

        if let Some(after) = query.created_after {
            sql.push_str(" AND created_at >= ?");
            params.push(Box::new(after as i64));
        }

        if let Some(before) = query.created_before {
            sql.push_str(" AND created_at < ?");
            params.push(Box::new(before as i64));
        }

        sql.push_str(" ORDER BY created_at ASC, id ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            params.push(Box::new(limit as i64));
        }

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        Self::load_hypotheses(&self.conn, &sql, &param_refs, &self.thresholds)
    }

    fn commit_update(&mut self, update: HypothesisUpdate<'_>) -> Result<CommitOutcome, Self::Error> {
        let tx = self.begin()?;
        let outcome = Self::cas_write(&tx, update.hypothesis)?;
        if outcome == CommitOutcome::Conflict {
            // dropping the transaction rolls it back
            return Ok(outcome);
        }

        for entry in update.evidence {
            if entry.hypothesis_id != update.hypothesis.id {
                return Err(StoreError::InvalidData(format!(
                    "evidence {} belongs to {}, not {}",
                    entry.id, entry.hypothesis_id, update.hypothesis.id
                )));
            }
            Self::insert_evidence(&tx, entry)?;
        }

        if let Some(anomaly) = update.anomaly {
            Self::insert_anomaly(&tx, anomaly)?;
        }

        tx.commit()?;
        Ok(outcome)
    }

    fn evidence_for(&self, id: HypothesisId) -> Result<Vec<Evidence>, Self::Error> {
        self.query_evidence(&EvidenceQuery {
            hypothesis_id: Some(id),
            ..Default::default()
        })
    }

    fn query_evidence(&self, query: &EvidenceQuery) -> Result<Vec<Evidence>, Self::Error> {
        let mut sql = format!(
            "SELECT {} FROM evidence e JOIN hypotheses h ON h.id = e.hypothesis_id WHERE 1=1",
            rows::EVIDENCE_COLUMNS
        );
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(id) = query.hypothesis_id {
            sql.push_str(" AND e.hypothesis_id = ?");
            params.push(Box::new(id_to_bytes(id.value())));
        }

        if let Some(entity_id) = &query.entity_id {
            sql.push_str(" AND h.entity_id = ?");
            params.push(Box::new(entity_id.clone()));
        }

        if let Some(category) = &query.category {
            sql.push_str(" AND h.category = ?");
            params.push(Box::new(category.clone()));
        }

        if let Some(source_type) = &query.source_type {
            sql.push_str(" AND e.source_type = ?");
            params.push(Box::new(source_type.clone()));
        }

        if let Some(after) = query.observed_after {
            sql.push_str(" AND e.observed_at >= ?");
            params.push(Box::new(after as i64));
        }

        if let Some(before) = query.observed_before {
            sql.push_str(" AND e.observed_at < ?");
            params.push(Box::new(before as i64));
        }

        sql.push_str(" ORDER BY e.seq ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            params.push(Box::new(limit as i64));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let evidence = stmt
            .query_map(&param_refs[..], rows::evidence)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(evidence)
    }

    fn append_episode(&mut self, episode: &Episode) -> Result<(), Self::Error> {
        if let Some(corrected) = episode.invalidates {
            if self.get_episode(corrected)?.is_none() {
                return Err(StoreError::NotFound(format!("episode {}", corrected)));
            }
        }

        self.conn
            .execute(
                "INSERT INTO episodes (id, entity_id, episode_type, payload, valid_at, valid_before,
                                       recorded_at, invalidates)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id_to_bytes(episode.id.value()),
                    episode.entity_id,
                    episode.episode_type,
                    episode.payload,
                    episode.valid_at as i64,
                    episode.valid_before.map(|t| t as i64),
                    episode.recorded_at as i64,
                    episode.invalidates.map(|id| id_to_bytes(id.value())),
                ],
            )
            .map_err(|e| duplicate_or(e, || format!("episode {}", episode.id)))?;
        Ok(())
    }

    fn get_episode(&self, id: EpisodeId) -> Result<Option<Episode>, Self::Error> {
        let sql = format!("SELECT {} FROM episodes WHERE id = ?1", rows::EPISODE_COLUMNS);
        let episode = self
            .conn
            .query_row(&sql, params![id_to_bytes(id.value())], rows::episode)
            .optional()?;
        Ok(episode)
    }

    fn episodes_for(&self, entity_id: &str) -> Result<Vec<Episode>, Self::Error> {
        let sql = format!(
            "SELECT {} FROM episodes WHERE entity_id = ?1 ORDER BY valid_at ASC, seq ASC",
            rows::EPISODE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let episodes = stmt
            .query_map(params![entity_id], rows::episode)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(episodes)
    }

    fn record_outcome(
        &mut self,
        record: &OutcomeRecord,
        hypothesis: Option<&Hypothesis>,
    ) -> Result<CommitOutcome, Self::Error> {
        let source_types = serde_json::to_string(&record.source_types)
            .map_err(|e| StoreError::InvalidData(format!("source types: {}", e)))?;

        let tx = self.begin()?;
        let mut outcome = CommitOutcome::Committed(0);
        if let Some(h) = hypothesis {
            outcome = Self::cas_write(&tx, h)?;
            if outcome == CommitOutcome::Conflict {
                return Ok(outcome);
            }
        }

        tx.execute(
            "INSERT INTO outcomes (hypothesis_id, entity_id, category, cluster_id, outcome,
                                   effectiveness_score, source_types, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id_to_bytes(record.hypothesis_id.value()),
                record.entity_id,
                record.category,
                record.cluster_id,
                record.outcome.as_str(),
                record.effectiveness_score,
                source_types,
                record.recorded_at as i64,
            ],
        )
        .map_err(|e| duplicate_or(e, || format!("outcome for {}", record.hypothesis_id)))?;

        tx.commit()?;
        Ok(outcome)
    }

    fn outcome_for(&self, id: HypothesisId) -> Result<Option<OutcomeRecord>, Self::Error> {
        let sql = format!("SELECT {} FROM outcomes WHERE hypothesis_id = ?1", rows::OUTCOME_COLUMNS);
        let record = self
            .conn
            .query_row(&sql, params![id_to_bytes(id.value())], rows::outcome)
            .optional()?;
        Ok(record)
    }

    fn recent_outcomes(&self, limit: Option<usize>) -> Result<Vec<OutcomeRecord>, Self::Error> {
        let sql = format!(
            "SELECT {} FROM outcomes ORDER BY recorded_at DESC, seq DESC LIMIT ?1",
            rows::OUTCOME_COLUMNS
        );
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(params![limit], rows::outcome)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn anomalies(&self, limit: Option<usize>) -> Result<Vec<AnomalyRecord>, Self::Error> {
        let sql = format!(
            "SELECT {} FROM anomalies ORDER BY recorded_at DESC, seq DESC LIMIT ?1",
            rows::ANOMALY_COLUMNS
        );
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(params![limit], rows::anomaly)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn try_acquire_lease(&mut self, request: &CycleLease, now: u64) -> Result<LeaseOutcome, Self::Error> {
        let tx = self.begin()?;
        let current = tx
            .query_row(
                "SELECT name, owner, acquired_at, expires_at FROM leases WHERE name = ?1",
                params![request.name],
                rows::lease,
            )
            .optional()?;

        if let Some(held) = current {
            if !held.is_expired(now) && !held.is_held_by(&request.owner) {
                return Ok(LeaseOutcome::Held(held));
            }
        }

        tx.execute(
            "INSERT INTO leases (name, owner, acquired_at, expires_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(name) DO UPDATE SET
             owner = excluded.owner, acquired_at = excluded.acquired_at, expires_at = excluded.expires_at",
            params![
                request.name,
                request.owner,
                request.acquired_at as i64,
                request.expires_at as i64,
            ],
        )?;
        tx.commit()?;
        Ok(LeaseOutcome::Acquired(request.clone()))
    }

    fn release_lease(&mut self, name: &str, owner: &str) -> Result<bool, Self::Error> {
        let removed = self
            .conn
            .execute("DELETE FROM leases WHERE name = ?1 AND owner = ?2", params![name, owner])?;
        Ok(removed > 0)
    }

    fn current_lease(&self, name: &str) -> Result<Option<CycleLease>, Self::Error> {
        let lease = self
            .conn
            .query_row(
                "SELECT name, owner, acquired_at, expires_at FROM leases WHERE name = ?1",
                params![name],
                rows::lease,
            )
            .optional()?;
        Ok(lease)
    }

    fn snapshot(&self) -> Result<PopulationSnapshot, Self::Error> {
        let tx = self.conn.unchecked_transaction()?;
        let snapshot = PopulationSnapshot {
            hypotheses: self.query_hypotheses(&HypothesisQuery::default())?,
            outcomes: self.recent_outcomes(None)?,
            evidence: self.query_evidence(&EvidenceQuery::default())?,
            anomalies: self.anomalies(None)?,
        };
        tx.commit()?;
        Ok(snapshot)
    }
}

/// Map uniqueness violations to [`StoreError::Duplicate`]
fn duplicate_or(err: rusqlite::Error, describe: impl FnOnce() -> String) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(code, _) if code.code == rusqlite::ErrorCode::ConstraintViolation => {
            StoreError::Duplicate(describe())
        }
        _ => StoreError::Database(err),
    }
}
