//! Descriptive aggregation
//!
//! Scalar reductions over a signal or a set of channels:
//! - mean, sample/population standard deviation, max, min
//! - rising-edge rate per minute and active fraction of binary signals
//! - row-wise top-k mean across channels
//! - compound motion (mean of per-channel standard deviations)
//!
//! Every reduction propagates NaN and returns NaN for empty input, so a
//! recording missing an optional channel family still yields its other features.

/// Arithmetic mean
pub fn mean(signal: &[f64]) -> f64 {
    if signal.is_empty() {
        return f64::NAN;
    }
    signal.iter().sum::<f64>() / signal.len() as f64
}

/// Sample standard deviation (n - 1 denominator); NaN for fewer than two samples
pub fn std(signal: &[f64]) -> f64 {
    deviation(signal, 1)
}

/// Population standard deviation (n denominator)
pub fn population_std(signal: &[f64]) -> f64 {
    deviation(signal, 0)
}

fn deviation(signal: &[f64], ddof: usize) -> f64 {
    if signal.len() <= ddof {
        return f64::NAN;
    }
    let m = mean(signal);
    let sum_sq: f64 = signal.iter().map(|&x| (x - m).powi(2)).sum();
    (sum_sq / (signal.len() - ddof) as f64).sqrt()
}

/// Maximum; NaN if any sample is NaN
pub fn max(signal: &[f64]) -> f64 {
    extreme(signal, f64::max)
}

/// Minimum; NaN if any sample is NaN
pub fn min(signal: &[f64]) -> f64 {
    extreme(signal, f64::min)
}

fn extreme(signal: &[f64], pick: fn(f64, f64) -> f64) -> f64 {
    let (first, rest) = match signal.split_first() {
        Some(split) => split,
        None => return f64::NAN,
    };
    if signal.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    rest.iter().fold(*first, |acc, &v| pick(acc, v))
}

/// Number of 0 → 1 transitions (first difference exactly +1)
pub fn rising_edges(binary: &[f64]) -> usize {
    binary.windows(2).filter(|w| w[1] - w[0] == 1.0).count()
}

/// Elapsed seconds between the first and last timestamp
pub fn duration_seconds(timestamps: &[f64]) -> f64 {
    match (timestamps.first(), timestamps.last()) {
        (Some(first), Some(last)) => last - first,
        _ => f64::NAN,
    }
}

/// Rising edges per minute: `edges / duration_seconds * 60`.
///
/// A signal without rising edges has rate 0 whatever the duration.
pub fn rate_per_minute(binary: &[f64], duration_seconds: f64) -> f64 {
    if binary.is_empty() {
        return f64::NAN;
    }
    let edges = rising_edges(binary);
    if edges == 0 {
        return 0.0;
    }
    edges as f64 / duration_seconds * 60.0
}

/// Fraction of samples flagged active: `sum / len`
pub fn fraction_active(binary: &[f64]) -> f64 {
    if binary.is_empty() {
        return f64::NAN;
    }
    binary.iter().sum::<f64>() / binary.len() as f64
}

/// Per row, mean of the `k` largest channel values; then mean over rows.
///
/// With `k` at or above the channel count this is the plain row mean.
pub fn top_k_mean(channels: &[&[f64]], k: usize) -> f64 {
    let rows = match channels.first() {
        Some(first) => first.len(),
        None => return f64::NAN,
    };
    if k == 0 || rows == 0 {
        return f64::NAN;
    }
    let take = k.min(channels.len());

    let mut row = Vec::with_capacity(channels.len());
    let mut total = 0.0;
    for r in 0..rows {
        row.clear();
        row.extend(channels.iter().map(|c| c[r]));
        if row.iter().any(|v| v.is_nan()) {
            return f64::NAN;
        }
        row.sort_by(|a, b| b.total_cmp(a));
        total += row[..take].iter().sum::<f64>() / take as f64;
    }
    total / rows as f64
}

/// Mean over channels of each channel's sample standard deviation
pub fn compound_motion(channels: &[&[f64]]) -> f64 {
    let stds: Vec<f64> = channels.iter().map(|c| std(c)).collect();
    mean(&stds)
}

/// Mean of the per-row average across channels
pub fn row_mean(channels: &[&[f64]]) -> f64 {
    top_k_mean(channels, channels.len())
}
