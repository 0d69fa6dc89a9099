//! Median / p95 reduction of a case's samples.

use crate::error::BenchError;
use crate::schema::{Sample, Stat, Summary};

/// Standard median: mean of the two middle values for even lengths, floored to an integer.
pub fn median(sorted: &[u64]) -> Option<u64> {
    let len = sorted.len();
    if len == 0 {
        return None;
    }
    let mid = len / 2;
    if len % 2 == 1 {
        Some(sorted[mid])
    } else {
        let lo = sorted[mid - 1] as u128;
        let hi = sorted[mid] as u128;
        Some(((lo + hi) / 2) as u64)
    }
}

/// Index selected by the ceiling rule: `ceil(0.95 * len) - 1`, clamped into `[0, len - 1]`.
pub fn p95_index(len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    // ceil(95 * len / 100) in integer arithmetic.
    let k = (95 * len).div_ceil(100);
    k.saturating_sub(1).min(len - 1)
}

pub fn p95(sorted: &[u64]) -> Option<u64> {
    if sorted.is_empty() {
        return None;
    }
    Some(sorted[p95_index(sorted.len())])
}

fn stat(mut values: Vec<u64>) -> Result<Stat, BenchError> {
    values.sort_unstable();
    match (median(&values), p95(&values)) {
        (Some(median), Some(p95)) => Ok(Stat { median, p95 }),
        _ => Err(BenchError::EmptySamples),
    }
}

/// Reduces a non-empty sample set into count/median/p95 over the three timing fields.
pub fn summarize(samples: &[Sample]) -> Result<Summary, BenchError> {
    if samples.is_empty() {
        return Err(BenchError::EmptySamples);
    }
    Ok(Summary {
        count: samples.len(),
        host_total_ns: stat(samples.iter().map(|s| s.host_total_ns).collect())?,
        startup_ns: stat(samples.iter().map(|s| s.startup_ns).collect())?,
        exec_ns: stat(samples.iter().map(|s| s.exec_ns).collect())?,
    })
}
