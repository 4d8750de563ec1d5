//! Row decoding and column codecs

use augur_domain::{
    AdvisoryFlag, AnomalyRecord, Band, CycleLease, Episode, EpisodeId, Evidence, EvidenceId,
    HypothesisId, HypothesisParts, HypothesisStatus, Outcome, OutcomeRecord, Polarity,
};
use crate::StoreError;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};

pub(crate) const HYPOTHESIS_COLUMNS: &str = "id, entity_id, category, cluster_id, prior_confidence, confidence, \
     novelty, pass_count, status, flag, version, created_at, updated_at";

pub(crate) const EVIDENCE_COLUMNS: &str = "e.id, e.hypothesis_id, e.source_type, e.payload_summary, e.source_url, \
     e.observed_at, e.information_value, e.polarity, e.confidence_delta, e.pass_number, e.rationale";

pub(crate) const EPISODE_COLUMNS: &str =
    "id, entity_id, episode_type, payload, valid_at, valid_before, recorded_at, invalidates";

pub(crate) const OUTCOME_COLUMNS: &str = "hypothesis_id, entity_id, category, cluster_id, outcome, \
     effectiveness_score, source_types, recorded_at";

pub(crate) const ANOMALY_COLUMNS: &str = "hypothesis_id, pass_number, confidence_before, confidence_after, \
     band_before, band_after, recorded_at, note";

/// Convert a 128-bit id to bytes for storage
pub(crate) fn id_to_bytes(value: u128) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

/// Convert stored bytes back to a 128-bit id
fn bytes_to_id(bytes: &[u8]) -> Result<u128, StoreError> {
    if bytes.len() != 16 {
        return Err(StoreError::InvalidData(format!(
            "Expected 16 bytes for id, got {}",
            bytes.len()
        )));
    }
    let mut arr = [0u8; 16];
    arr.copy_from_slice(bytes);
    Ok(u128::from_be_bytes(arr))
}

fn conversion(idx: usize, ty: Type, err: StoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

fn id_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<u128> {
    let bytes: Vec<u8> = row.get(idx)?;
    bytes_to_id(&bytes).map_err(|e| conversion(idx, Type::Blob, e))
}

fn u64_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    Ok(row.get::<_, i64>(idx)? as u64)
}

fn parsed<T>(row: &Row<'_>, idx: usize, what: &str, parse: impl Fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    parse(&text).ok_or_else(|| conversion(idx, Type::Text, StoreError::InvalidData(format!("Unknown {}: {}", what, text))))
}

pub(crate) fn hypothesis_parts(row: &Row<'_>) -> rusqlite::Result<HypothesisParts> {
    let flag: Option<String> = row.get(9)?;
    let flag = match flag {
        Some(text) => Some(AdvisoryFlag::parse(&text).ok_or_else(|| {
            conversion(9, Type::Text, StoreError::InvalidData(format!("Unknown flag: {}", text)))
        })?),
        None => None,
    };

    Ok(HypothesisParts {
        id: HypothesisId::from_value(id_at(row, 0)?),
        entity_id: row.get(1)?,
        category: row.get(2)?,
        cluster_id: row.get(3)?,
        prior_confidence: row.get(4)?,
        confidence: row.get(5)?,
        novelty: row.get(6)?,
        pass_count: row.get::<_, i64>(7)? as u32,
        evidence_ids: Vec::new(),
        status: parsed(row, 8, "status", HypothesisStatus::parse)?,
        flag,
        version: u64_at(row, 10)?,
        created_at: u64_at(row, 11)?,
        updated_at: u64_at(row, 12)?,
    })
}

/// Evidence ids of a hypothesis in append order
pub(crate) fn evidence_ids(conn: &Connection, id: HypothesisId) -> Result<Vec<EvidenceId>, StoreError> {
    let mut stmt = conn.prepare_cached("SELECT id FROM evidence WHERE hypothesis_id = ?1 ORDER BY seq ASC")?;
    let ids = stmt
        .query_map(params![id_to_bytes(id.value())], |row| Ok(EvidenceId::from_value(id_at(row, 0)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

pub(crate) fn evidence(row: &Row<'_>) -> rusqlite::Result<Evidence> {
    Ok(Evidence {
        id: EvidenceId::from_value(id_at(row, 0)?),
        hypothesis_id: HypothesisId::from_value(id_at(row, 1)?),
        source_type: row.get(2)?,
        payload_summary: row.get(3)?,
        source_url: row.get(4)?,
        observed_at: u64_at(row, 5)?,
        information_value: row.get(6)?,
        polarity: parsed(row, 7, "polarity", Polarity::parse)?,
        confidence_delta: row.get(8)?,
        pass_number: row.get::<_, i64>(9)? as u32,
        rationale: row.get(10)?,
    })
}

pub(crate) fn episode(row: &Row<'_>) -> rusqlite::Result<Episode> {
    let valid_before: Option<i64> = row.get(5)?;
    let invalidates: Option<Vec<u8>> = row.get(7)?;
    let invalidates = match invalidates {
        Some(bytes) => Some(EpisodeId::from_value(
            bytes_to_id(&bytes).map_err(|e| conversion(7, Type::Blob, e))?,
        )),
        None => None,
    };

    Ok(Episode {
        id: EpisodeId::from_value(id_at(row, 0)?),
        entity_id: row.get(1)?,
        episode_type: row.get(2)?,
        payload: row.get(3)?,
        valid_at: u64_at(row, 4)?,
        valid_before: valid_before.map(|t| t as u64),
        recorded_at: u64_at(row, 6)?,
        invalidates,
    })
}

pub(crate) fn outcome(row: &Row<'_>) -> rusqlite::Result<OutcomeRecord> {
    let source_types: String = row.get(6)?;
    let source_types: Vec<String> = serde_json::from_str(&source_types)
        .map_err(|e| conversion(6, Type::Text, StoreError::InvalidData(format!("source types: {}", e))))?;

    Ok(OutcomeRecord {
        hypothesis_id: HypothesisId::from_value(id_at(row, 0)?),
        entity_id: row.get(1)?,
        category: row.get(2)?,
        cluster_id: row.get(3)?,
        outcome: parsed(row, 4, "outcome", Outcome::parse)?,
        effectiveness_score: row.get(5)?,
        source_types,
        recorded_at: u64_at(row, 7)?,
    })
}

pub(crate) fn anomaly(row: &Row<'_>) -> rusqlite::Result<AnomalyRecord> {
    Ok(AnomalyRecord {
        hypothesis_id: HypothesisId::from_value(id_at(row, 0)?),
        pass_number: row.get::<_, i64>(1)? as u32,
        confidence_before: row.get(2)?,
        confidence_after: row.get(3)?,
        band_before: parsed(row, 4, "band", Band::parse)?,
        band_after: parsed(row, 5, "band", Band::parse)?,
        recorded_at: u64_at(row, 6)?,
        note: row.get(7)?,
    })
}

pub(crate) fn lease(row: &Row<'_>) -> rusqlite::Result<CycleLease> {
    Ok(CycleLease {
        name: row.get(0)?,
        owner: row.get(1)?,
        acquired_at: u64_at(row, 2)?,
        expires_at: u64_at(row, 3)?,
    })
}
