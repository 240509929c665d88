// src/data_analysis/derivative.rs

use ndarray::Array1;

/// Secant-slope derivative of `value` with respect to `time` over a window of
/// `window` samples: `slope[i] ≈ (v[i+n] - v[i]) / (t[i+n] - t[i])`.
///
/// The N−n valid slopes are zero-padded back to length N, ceil(n/2) zeros on
/// the left and floor(n/2) on the right, so the output stays aligned with the
/// other channels. The padded rows carry no information and are removed later
/// by trimming, so the zeros never reach the regression.
///
/// Callers must reject runs with fewer than `2 * window` samples before
/// calling (see `AnalysisError::InsufficientData`); for shorter inputs the
/// result degenerates to all zeros.
pub fn smooth_derivative(time: &Array1<f64>, value: &Array1<f64>, window: usize) -> Array1<f64> {
    let len = value.len();
    let mut slope = Array1::zeros(len);
    if window == 0 || window >= len {
        return slope;
    }
    let left_pad = window.div_ceil(2);
    for i in 0..len - window {
        slope[left_pad + i] = (value[i + window] - value[i]) / (time[i + window] - time[i]);
    }
    slope
}
