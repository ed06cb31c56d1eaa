//! Sample statistics used by the corpus normalizer.

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() { return 0.0; }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n − 1 denominator); 0 with fewer than two values.
pub fn stddev(values: &[f64]) -> f64 {
    if values.len() < 2 { return 0.0; }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

/// Standardized deviation; 0 for a flat category.
pub fn z_score(value: f64, mean: f64, stddev: f64) -> f64 {
    if stddev == 0.0 { return 0.0; }
    (value - mean) / stddev
}

/// Fraction of `sorted` (ascending) strictly below `value`. Ties are not
/// split: every copy of a repeated value gets the same, lowest rank.
pub fn percentile_rank(value: f64, sorted: &[f64]) -> f64 {
    if sorted.is_empty() { return 0.0; }
    sorted.partition_point(|&v| v < value) as f64 / sorted.len() as f64
}

pub fn sorted_ascending(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}
