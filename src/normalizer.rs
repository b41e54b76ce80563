//! Rolling baseline normalization
//!
//! Each channel is corrected by its own trailing moving average:
//! - the window covers the current sample and the `window - 1` before it
//! - the window shrinks at the start instead of waiting for a full period
//! - only past and current samples contribute (no centering, no look-ahead)
//!
//! Positive values of the result mean "above the recent baseline".

/// Convert a window length in seconds to a sample count at `rate_hz`.
pub fn window_samples(seconds: f64, rate_hz: f64) -> usize {
    let samples = (seconds * rate_hz).round();
    if samples.is_finite() && samples >= 1.0 {
        samples as usize
    } else {
        1
    }
}

/// Running sum with Kahan compensation
#[derive(Debug, Default, Clone, Copy)]
struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    fn add(&mut self, value: f64) {
        let y = value - self.compensation;
        let t = self.sum + y;
        self.compensation = (t - self.sum) - y;
        self.sum = t;
    }
}

/// Trailing mean over `[max(0, i - window + 1), i]` for every index `i`.
///
/// NaN samples are left out of the window they fall in; a window without any
/// finite sample yields NaN. A zero window is treated as one sample.
///
/// The window sum is compensated and re-summed from scratch once per window
/// length, so large values that have left the window leave no residue.
pub fn rolling_mean(signal: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(signal.len());
    let mut sum = CompensatedSum::default();
    let mut count = 0usize;

    for (i, &value) in signal.iter().enumerate() {
        if (i + 1) % window == 0 {
            sum = CompensatedSum::default();
            count = 0;
            for &v in signal[i + 1 - window..=i].iter().filter(|v| !v.is_nan()) {
                sum.add(v);
                count += 1;
            }
        } else {
            if !value.is_nan() {
                sum.add(value);
                count += 1;
            }
            if i >= window {
                let leaving = signal[i - window];
                if !leaving.is_nan() {
                    sum.add(-leaving);
                    count -= 1;
                }
            }
            if count == 0 {
                sum = CompensatedSum::default();
            }
        }
        out.push(if count == 0 {
            f64::NAN
        } else {
            sum.sum / count as f64
        });
    }
    out
}

/// `signal - rolling_mean(signal, window)`
pub fn rolling_baseline_normalize(signal: &[f64], window: usize) -> Vec<f64> {
    rolling_mean(signal, window)
        .into_iter()
        .zip(signal)
        .map(|(baseline, &value)| value - baseline)
        .collect()
}

/// Normalize each channel independently with the same window.
pub fn normalize_channels(channels: &[&[f64]], window: usize) -> Vec<Vec<f64>> {
    channels
        .iter()
        .map(|channel| rolling_baseline_normalize(channel, window))
        .collect()
}
