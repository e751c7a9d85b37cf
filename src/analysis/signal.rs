use serde::{Deserialize, Serialize};

use super::fitting::fit_polynomial;
use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Descriptive statistics
// ---------------------------------------------------------------------------

/// Descriptive statistics over one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    /// Population variance.
    pub variance: f64,
    pub min: f64,
    pub max: f64,
    /// First quartile (linear interpolation on the sorted sequence).
    pub q1: f64,
    /// Third quartile.
    pub q3: f64,
    pub count: usize,
}

/// Compute descriptive statistics for a non-empty sequence.
pub fn calculate_statistics(values: &[f64]) -> Result<Statistics, CoreError> {
    if values.is_empty() {
        return Err(CoreError::InvalidInput(
            "statistics need at least one value".to_string(),
        ));
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    Ok(Statistics {
        mean,
        median: quantile(&sorted, 0.5),
        std_dev: variance.sqrt(),
        variance,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        q1: quantile(&sorted, 0.25),
        q3: quantile(&sorted, 0.75),
        count: values.len(),
    })
}

/// Linear-interpolated quantile over an already-sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = pos - lo as f64;
        sorted[lo] + (sorted[hi] - sorted[lo]) * frac
    }
}

// ---------------------------------------------------------------------------
// Peak detection
// ---------------------------------------------------------------------------

/// One detected peak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakResult {
    /// Index into the source sequences.
    pub index: usize,
    pub x: f64,
    pub y: f64,
    /// Height above the higher of the two bounding valleys.
    pub prominence: f64,
    /// Width in `x` at half prominence, when both crossings exist.
    pub width: Option<f64>,
}

/// Thresholds for [`find_peaks`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakOptions {
    /// Minimum prominence a peak must have to be kept.
    pub min_prominence: f64,
    /// Minimum index distance between consecutive kept peaks.
    pub min_distance: usize,
}

impl Default for PeakOptions {
    fn default() -> Self {
        Self {
            min_prominence: 0.0,
            min_distance: 1,
        }
    }
}

/// Find local maxima: a point is a peak iff strictly greater than both
/// neighbors. Prominence is measured against the higher of the two
/// nearest bounding valleys, found by walking outward until a point
/// above the peak (or the boundary) is reached.
///
/// Peaks below `min_prominence` are discarded. With `min_distance > 1`
/// peaks are filtered left to right, keeping a candidate only when its
/// index is at least `min_distance` away from the previously kept peak
/// (the first peak is always kept, so ties favor the earlier one).
pub fn find_peaks(x: &[f64], y: &[f64], options: PeakOptions) -> Result<Vec<PeakResult>, CoreError> {
    if x.is_empty() || y.is_empty() {
        return Err(CoreError::InvalidInput(
            "x and y must be non-empty".to_string(),
        ));
    }
    if x.len() != y.len() {
        return Err(CoreError::InvalidInput(format!(
            "x has {} values but y has {}",
            x.len(),
            y.len()
        )));
    }

    let mut peaks = Vec::new();
    for i in 1..y.len().saturating_sub(1) {
        if !(y[i] > y[i - 1] && y[i] > y[i + 1]) {
            continue;
        }
        let prominence = prominence_at(y, i);
        if prominence < options.min_prominence {
            continue;
        }
        peaks.push(PeakResult {
            index: i,
            x: x[i],
            y: y[i],
            prominence,
            width: half_prominence_width(x, y, i, prominence),
        });
    }

    if options.min_distance > 1 {
        let mut kept: Vec<PeakResult> = Vec::new();
        for peak in peaks {
            match kept.last() {
                Some(prev) if peak.index - prev.index < options.min_distance => {}
                _ => kept.push(peak),
            }
        }
        return Ok(kept);
    }
    Ok(peaks)
}

/// Walk outward from a peak in each direction until a point exceeding
/// the peak's own height (or the boundary); the lowest point seen along
/// the way is that side's valley.
fn prominence_at(y: &[f64], peak: usize) -> f64 {
    let height = y[peak];

    let mut left_valley = height;
    for i in (0..peak).rev() {
        if y[i] > height {
            break;
        }
        left_valley = left_valley.min(y[i]);
    }

    let mut right_valley = height;
    for &v in &y[peak + 1..] {
        if v > height {
            break;
        }
        right_valley = right_valley.min(v);
    }

    height - left_valley.max(right_valley)
}

/// Interpolated width in `x` where the signal crosses
/// `peak height − prominence / 2` on both sides, if it does.
fn half_prominence_width(x: &[f64], y: &[f64], peak: usize, prominence: f64) -> Option<f64> {
    let level = y[peak] - prominence / 2.0;

    let left = (0..peak).rev().find(|&i| y[i] <= level).map(|i| {
        let frac = (level - y[i]) / (y[i + 1] - y[i]);
        x[i] + (x[i + 1] - x[i]) * frac
    })?;

    let right = (peak + 1..y.len()).find(|&i| y[i] <= level).map(|i| {
        let frac = (y[i - 1] - level) / (y[i - 1] - y[i]);
        x[i - 1] + (x[i] - x[i - 1]) * frac
    })?;

    Some(right - left)
}

// ---------------------------------------------------------------------------
// Smoothing, differentiation, baseline correction
// ---------------------------------------------------------------------------

/// Centered moving average. The window shrinks near the boundaries (no
/// padding), so `window == 1` is the identity and an oversized window
/// degrades gracefully.
pub fn smooth_data(values: &[f64], window: usize) -> Vec<f64> {
    if values.is_empty() || window <= 1 {
        return values.to_vec();
    }
    let half = window / 2;
    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(values.len());
            values[lo..hi].iter().sum::<f64>() / (hi - lo) as f64
        })
        .collect()
}

/// Forward-difference derivative reported at the midpoint `x`.
/// Returns `(mid_x, dy_dx)`, both of length `n − 1`.
pub fn differentiate(x: &[f64], y: &[f64]) -> Result<(Vec<f64>, Vec<f64>), CoreError> {
    if x.len() != y.len() {
        return Err(CoreError::InvalidInput(format!(
            "x has {} values but y has {}",
            x.len(),
            y.len()
        )));
    }
    if x.len() < 2 {
        return Err(CoreError::InvalidInput(
            "differentiation needs at least two points".to_string(),
        ));
    }

    let mut mid_x = Vec::with_capacity(x.len() - 1);
    let mut dy_dx = Vec::with_capacity(x.len() - 1);
    for i in 0..x.len() - 1 {
        let dx = x[i + 1] - x[i];
        mid_x.push((x[i] + x[i + 1]) / 2.0);
        // A repeated x value gives an infinite slope; surface it as-is
        // rather than inventing a number.
        dy_dx.push((y[i + 1] - y[i]) / dx);
    }
    Ok((mid_x, dy_dx))
}

/// Subtract a polynomial baseline (default order 1 at call sites) from
/// the series; returns the corrected `y`.
pub fn baseline_correct(x: &[f64], y: &[f64], order: usize) -> Result<Vec<f64>, CoreError> {
    let fit = fit_polynomial(x, y, order)?;
    Ok(x.iter()
        .zip(y)
        .map(|(&xv, &yv)| yv - fit.predict(xv))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() < tol, "{a} vs {b}");
    }

    #[test]
    fn statistics_on_known_sequence() {
        let stats = calculate_statistics(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_close(stats.mean, 3.0, 1e-12);
        assert_close(stats.median, 3.0, 1e-12);
        assert_close(stats.std_dev, 1.4142135623730951, 1e-9);
        assert_close(stats.variance, 2.0, 1e-12);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 5.0);
        assert_close(stats.q1, 2.0, 1e-12);
        assert_close(stats.q3, 4.0, 1e-12);
        assert_eq!(stats.count, 5);
    }

    #[test]
    fn single_sine_bump_gives_one_peak() {
        // Densely sampled half period: one maximum at the center.
        let n = 101;
        let x: Vec<f64> = (0..n).map(|i| i as f64 / (n - 1) as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| (std::f64::consts::PI * v).sin()).collect();

        let peaks = find_peaks(&x, &y, PeakOptions::default()).unwrap();
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, n / 2);
        // Baseline is 0, so prominence equals the bump height.
        assert_close(peaks[0].prominence, 1.0, 1e-6);
        assert!(peaks[0].width.is_some());
    }

    #[test]
    fn min_distance_keeps_earlier_peak() {
        let x: Vec<f64> = (0..9).map(|i| i as f64).collect();
        let y = vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        let options = PeakOptions {
            min_prominence: 0.0,
            min_distance: 4,
        };
        let peaks = find_peaks(&x, &y, options).unwrap();
        let kept: Vec<usize> = peaks.iter().map(|p| p.index).collect();
        assert_eq!(kept, vec![1, 5]);
    }

    #[test]
    fn prominence_uses_higher_valley() {
        // Peak at index 3 between valleys at 0.5 (left) and 0.0 (right).
        let y = vec![1.0, 0.5, 0.8, 2.0, 0.0, 3.0];
        assert_close(prominence_at(&y, 3), 1.5, 1e-12);
    }

    #[test]
    fn smoothing_identity_and_oversized_window() {
        let values = vec![1.0, 4.0, 2.0, 8.0];
        assert_eq!(smooth_data(&values, 1), values);

        // Window larger than the data shrinks at the edges.
        let smoothed = smooth_data(&values, 99);
        assert_eq!(smoothed.len(), values.len());
        assert_close(smoothed[0], (1.0 + 4.0 + 2.0 + 8.0) / 4.0, 1e-12);
    }

    #[test]
    fn derivative_at_midpoints() {
        let x = vec![0.0, 1.0, 2.0];
        let y = vec![0.0, 2.0, 6.0];
        let (mid_x, dy_dx) = differentiate(&x, &y).unwrap();
        assert_eq!(mid_x, vec![0.5, 1.5]);
        assert_eq!(dy_dx, vec![2.0, 4.0]);
    }

    #[test]
    fn linear_trend_removed_by_baseline_correction() {
        let x: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 0.3 * v + 7.0).collect();
        let corrected = baseline_correct(&x, &y, 1).unwrap();
        for v in corrected {
            assert_close(v, 0.0, 1e-9);
        }
    }
}
