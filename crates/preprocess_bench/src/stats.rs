//! Aggregation of raw per-stage latencies into the reported statistics.
//!
//! Median-only by design: the benchmark compares configurations by their
//! median per-sample cost, and the summary matrix is built from ratios of
//! those medians. Richer quantiles are out of scope.

use anyhow::{ensure, Result};
use std::time::Duration;

/// Aggregated statistics for one stage over one timed pass.
#[derive(Debug, Clone)]
pub struct StageStats {
    pub name: String,
    /// Median per-sample latency, in microseconds.
    pub median_us: f64,
    /// Number of raw measurements behind the median.
    pub count: usize,
}

/// Median of a sample set. Averages the two middle elements for even
/// lengths; 0.0 for an empty set.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn to_micros(times: &[Duration]) -> Vec<f64> {
    times.iter().map(|t| t.as_secs_f64() * 1e6).collect()
}

/// Per-stage medians, rescaled to microseconds, in stage order.
pub fn per_stage_medians(extracted: &[(String, Vec<Duration>)]) -> Vec<StageStats> {
    extracted
        .iter()
        .map(|(name, times)| {
            let us = to_micros(times);
            StageStats {
                name: name.clone(),
                median_us: median(&us),
                count: us.len(),
            }
        })
        .collect()
}

/// The configuration's total: per sample, sum the stage latencies
/// elementwise across stages, then take the median of those sums.
///
/// This is NOT the sum of per-stage medians — the two differ whenever
/// stage costs are anti-correlated across samples, and the median-of-sums
/// is the one that reflects what a user of the whole pipeline experiences.
pub fn total_median_us(extracted: &[(String, Vec<Duration>)]) -> Result<f64> {
    ensure!(!extracted.is_empty(), "No stage timings to aggregate");

    let n = extracted[0].1.len();
    for (name, times) in extracted {
        ensure!(
            times.len() == n,
            "Stage {} has {} measurements, expected {}",
            name,
            times.len(),
            n
        );
    }

    let mut sums = vec![0.0f64; n];
    for (_, times) in extracted {
        for (sum, time) in sums.iter_mut().zip(to_micros(times)) {
            *sum += time;
        }
    }
    Ok(median(&sums))
}

/// Pairwise slowdown matrix over recorded configuration totals:
/// `matrix[row][col] = totals[row] / totals[col]`.
pub fn slowdown_matrix(totals: &[f64]) -> Vec<Vec<f64>> {
    totals
        .iter()
        .map(|row| totals.iter().map(|col| row / col).collect())
        .collect()
}
