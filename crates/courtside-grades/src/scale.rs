// Column transforms: min-max normalization, z-score rescaling, percentile
// ranks and medians. All operate over a whole population column.

use std::cmp::Ordering;

/// Threshold below which a spread (range or standard deviation) is treated
/// as zero.
const SPREAD_EPSILON: f64 = 1e-9;

/// Center of the rescaled grade band.
pub const GRADE_CENTER: f64 = 50.0;

/// Upper bound of the grade band. The lower bound is 0.
pub const GRADE_MAX: f64 = 100.0;

// ---------------------------------------------------------------------------
// Pool statistics
// ---------------------------------------------------------------------------

/// Mean and standard deviation of one column across the player population.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolStats {
    pub mean: f64,
    pub stdev: f64,
}

/// Compute mean and sample standard deviation (N-1 denominator) for a slice.
///
/// Returns zeros for an empty slice and a zero stdev for a single value.
pub fn compute_pool_stats(values: &[f64]) -> PoolStats {
    if values.is_empty() {
        return PoolStats {
            mean: 0.0,
            stdev: 0.0,
        };
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return PoolStats { mean, stdev: 0.0 };
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    PoolStats {
        mean,
        stdev: variance.sqrt(),
    }
}

/// Z-score of `value` against `stats`, or `None` for a degenerate pool.
pub fn compute_zscore(value: f64, stats: &PoolStats) -> Option<f64> {
    if stats.stdev < SPREAD_EPSILON {
        return None;
    }
    Some((value - stats.mean) / stats.stdev)
}

// ---------------------------------------------------------------------------
// Transforms
// ---------------------------------------------------------------------------

/// Min-max scale a column into [0, 1]. A constant column maps to all zeros.
pub fn normalize(column: &[f64]) -> Vec<f64> {
    let min = column.iter().copied().fold(f64::INFINITY, f64::min);
    let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if !(range > 0.0) {
        return vec![0.0; column.len()];
    }
    column.iter().map(|x| (x - min) / range).collect()
}

/// Z-score a column, stretch by `factor`, center on 50 and clip to [0, 100].
/// A zero-variance column maps to exactly 50 everywhere.
pub fn rescale(column: &[f64], factor: f64) -> Vec<f64> {
    let stats = compute_pool_stats(column);
    column
        .iter()
        .map(|&x| match compute_zscore(x, &stats) {
            Some(z) => (z * factor + GRADE_CENTER).clamp(0.0, GRADE_MAX),
            None => GRADE_CENTER,
        })
        .collect()
}

/// Percentile rank of each value: `rank / n * 100`, ranks 1-based ascending,
/// tied values share the average of their ranks.
pub fn percentile_rank(column: &[f64]) -> Vec<f64> {
    let n = column.len();
    if n == 0 {
        return Vec::new();
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| column[a].partial_cmp(&column[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && column[order[end]] == column[order[start]] {
            end += 1;
        }
        // Positions start..end hold ranks start+1 ..= end.
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg_rank / n as f64 * 100.0;
        }
        start = end;
    }
    ranks
}

/// Median of a column; the mean of the two middle values for even lengths.
/// Empty columns give 0.
pub fn median(column: &[f64]) -> f64 {
    if column.is_empty() {
        return 0.0;
    }
    let mut sorted = column.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
