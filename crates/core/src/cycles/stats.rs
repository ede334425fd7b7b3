//! Pure statistics over the canonical record collection.
//!
//! Recomputed on every collection change; the collection is small enough
//! that nothing is cached across mutations.

use chrono::NaiveDate;
use serde::Serialize;

use super::model::CycleRecord;

/// Length spread (in days) above which cycles are flagged irregular.
pub const LENGTH_VARIATION_THRESHOLD_DAYS: i64 = 7;

/// Interval spread (in days) above which cycles are flagged irregular.
pub const INTERVAL_VARIATION_THRESHOLD_DAYS: i64 = 10;

/// Aggregate trend metrics derived from the record collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleStatistics {
    /// Mean cycle length, one decimal place.
    pub avg_length: f64,
    /// Mean inter-cycle interval, one decimal place. 0 with fewer than two
    /// records.
    pub avg_interval: f64,
    pub length_variation: i64,
    pub interval_variation: i64,
    pub total_cycles: usize,
    /// Presentation hint only; never blocks a write.
    pub irregular: bool,
}

/// Gap days strictly between the end of one cycle and the start of the next,
/// excluding both endpoints.
pub fn interval_days(prev_end: NaiveDate, next_start: NaiveDate) -> i64 {
    (next_start - prev_end).num_days() - 1
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn mean(values: &[i64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    round_one_decimal(values.iter().sum::<i64>() as f64 / values.len() as f64)
}

fn spread(values: &[i64]) -> i64 {
    match (values.iter().max(), values.iter().min()) {
        (Some(max), Some(min)) => max - min,
        _ => 0,
    }
}

/// Compute statistics for a start-date-ordered collection.
///
/// Returns `None` for an empty collection; this sentinel is distinct from
/// zero-valued statistics.
pub fn compute(records: &[CycleRecord]) -> Option<CycleStatistics> {
    if records.is_empty() {
        return None;
    }

    let lengths: Vec<i64> = records.iter().map(|r| r.length).collect();
    let intervals: Vec<i64> = records
        .windows(2)
        .map(|pair| interval_days(pair[0].end_date, pair[1].start_date))
        .collect();

    let length_variation = spread(&lengths);
    let interval_variation = spread(&intervals);

    Some(CycleStatistics {
        avg_length: mean(&lengths),
        avg_interval: mean(&intervals),
        length_variation,
        interval_variation,
        total_cycles: records.len(),
        irregular: length_variation > LENGTH_VARIATION_THRESHOLD_DAYS
            || interval_variation > INTERVAL_VARIATION_THRESHOLD_DAYS,
    })
}
