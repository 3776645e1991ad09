//! Completeness scoring for canonical records.
//!
//! When several sources answer, the one that filled in the most useful
//! fields wins.

use crate::types::CanonicalRecord;

const REGISTRAR_WEIGHT: u32 = 3;
const REGISTRATION_DATE_WEIGHT: u32 = 2;
const EXPIRY_DATE_WEIGHT: u32 = 2;
const NAME_SERVERS_WEIGHT: u32 = 2;
const STATUS_WEIGHT: u32 = 1;

/// Highest score a record can reach.
pub const MAX_SCORE: u32 = REGISTRAR_WEIGHT
    + REGISTRATION_DATE_WEIGHT
    + EXPIRY_DATE_WEIGHT
    + NAME_SERVERS_WEIGHT
    + STATUS_WEIGHT;

/// Score a record by which fields are known.
///
/// Error records always score 0.
pub fn score(record: &CanonicalRecord) -> u32 {
    if record.is_error() {
        return 0;
    }

    let mut total = 0;
    if record.registrar.is_some() {
        total += REGISTRAR_WEIGHT;
    }
    if record.registration_date.is_some() {
        total += REGISTRATION_DATE_WEIGHT;
    }
    if record.expiry_date.is_some() {
        total += EXPIRY_DATE_WEIGHT;
    }
    if !record.name_servers.is_empty() {
        total += NAME_SERVERS_WEIGHT;
    }
    if record.status.is_some() {
        total += STATUS_WEIGHT;
    }
    total
}

/// A record is informative when it carries at least one known field.
pub fn is_informative(record: &CanonicalRecord) -> bool {
    score(record) > 0
}

/// Index of the highest-scoring record; ties keep the earliest.
pub fn best_index(records: &[CanonicalRecord]) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (idx, record) in records.iter().enumerate() {
        let s = score(record);
        match best {
            Some((_, best_score)) if best_score >= s => {}
            _ => best = Some((idx, s)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Take the highest-scoring record; ties keep the earliest.
pub fn pick_best(mut records: Vec<CanonicalRecord>) -> Option<CanonicalRecord> {
    let idx = best_index(&records)?;
    Some(records.swap_remove(idx))
}
