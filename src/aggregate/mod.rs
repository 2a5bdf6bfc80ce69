//! Totals and the completed subset over a working set.
//!
//! Everything here is recomputed from the full slice on every call; callers
//! never patch a previous result after a mutation.

use serde::Serialize;

use crate::model::Record;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub required: i64,
    pub done: i64,
    pub remaining: i64,
}

/// `requerimiento - hecho`, with missing quantities counted as zero.
pub fn remainder(record: &Record) -> i64 {
    record.required.unwrap_or(0) - record.done.unwrap_or(0)
}

pub fn is_complete(record: &Record) -> bool {
    remainder(record) == 0
}

pub fn totals(records: &[Record]) -> Totals {
    let required: i64 = records.iter().map(|r| r.required.unwrap_or(0)).sum();
    let done: i64 = records.iter().map(|r| r.done.unwrap_or(0)).sum();
    Totals {
        required,
        done,
        remaining: required - done,
    }
}

/// Records whose remainder is exactly zero, in their original order.
pub fn completed(records: &[Record]) -> Vec<&Record> {
    records.iter().filter(|r| is_complete(r)).collect()
}

pub fn completed_count(records: &[Record]) -> usize {
    records.iter().filter(|r| is_complete(r)).count()
}
