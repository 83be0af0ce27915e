//! Timestamp deduplication for provider rows
//!
//! Providers occasionally return the same period twice (TCBS does this around
//! corporate-action adjustments). The later row is the corrected one, so the
//! last occurrence is kept.

use crate::models::Bar;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Drop bars whose timestamp reappears later, keeping the last occurrence.
///
/// Relative order of the surviving records is preserved.
pub fn filter_duplicate_records(records: Vec<Bar>) -> Vec<Bar> {
    let mut seen_keys: HashSet<DateTime<Utc>> = HashSet::with_capacity(records.len());
    let mut filtered: Vec<Bar> = records
        .into_iter()
        .rev()
        .filter(|record| seen_keys.insert(record.time))
        .collect();

    // walked in reverse to keep the last occurrence
    filtered.reverse();
    filtered
}
