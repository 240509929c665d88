// src/data_analysis/regression.rs

//! Ordinary-least-squares fit of applied voltage against the motion
//! regressors. The quasistatic and step segments of a subset are pooled at
//! fit time; the `sign(velocity)` column estimates static friction
//! independent of direction, and gravity-affected mechanisms add a fourth
//! regressor (a constant for elevators, cosine-of-angle for arms).

use nalgebra::{DMatrix, DVector};
use ndarray::Array1;

use crate::config::MechanismKind;
use crate::data_analysis::prepare::{PreparedSegment, SubsetData};
use crate::error::{AnalysisError, AnalysisResult};

/// Fitted physical coefficients plus goodness of fit. R² is surfaced as-is;
/// there is no automatic accept/reject threshold, judging fit quality is the
/// user's job via the diagnostic plots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitResult {
    pub ks: f64,
    pub kv: f64,
    pub ka: f64,
    /// Arm gravity coefficient (cosine of angle).
    pub kcos: Option<f64>,
    /// Elevator gravity coefficient (constant).
    pub kg: Option<f64>,
    pub r_squared: f64,
}

/// Sign convention matching the regression model: zero velocity contributes
/// no static-friction voltage.
pub fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn pooled(pick: fn(&PreparedSegment) -> &Array1<f64>, data: &SubsetData) -> Vec<f64> {
    pick(&data.quasistatic)
        .iter()
        .chain(pick(&data.dynamic).iter())
        .copied()
        .collect()
}

/// Fit `voltage ≈ kS·sign(vel) + kV·vel + kA·accel [+ gravity term]` over the
/// pooled samples of one subset.
pub fn fit_subset(data: &SubsetData, mechanism: MechanismKind) -> AnalysisResult<FitResult> {
    let vel = pooled(|s| &s.velocity, data);
    let accel = pooled(|s| &s.acceleration, data);
    let volts = pooled(|s| &s.voltage, data);

    let gravity: Option<Vec<f64>> = match mechanism {
        MechanismKind::Elevator => Some(vec![1.0; vel.len()]),
        MechanismKind::Arm => {
            let qu = data.quasistatic.cosine.as_ref().ok_or_else(|| {
                AnalysisError::FitFailed("arm subset is missing its cosine channel".into())
            })?;
            let dy = data.dynamic.cosine.as_ref().ok_or_else(|| {
                AnalysisError::FitFailed("arm subset is missing its cosine channel".into())
            })?;
            Some(qu.iter().chain(dy.iter()).copied().collect())
        }
        _ => None,
    };

    let cols = 3 + usize::from(gravity.is_some());
    let rows = vel.len();
    if rows < cols {
        return Err(AnalysisError::FitFailed(format!(
            "{rows} pooled samples cannot determine {cols} coefficients"
        )));
    }

    let mut design = DMatrix::zeros(rows, cols);
    for i in 0..rows {
        design[(i, 0)] = sign(vel[i]);
        design[(i, 1)] = vel[i];
        design[(i, 2)] = accel[i];
        if let Some(g) = &gravity {
            design[(i, 3)] = g[i];
        }
    }
    let y = DVector::from_vec(volts.clone());

    let svd = design.svd(true, true);
    let beta = svd
        .solve(&y, 1e-12)
        .map_err(|e| AnalysisError::FitFailed(e.to_string()))?;

    let r_squared = r_squared(&beta, &vel, &accel, &volts, &gravity);

    let (kcos, kg) = match mechanism {
        MechanismKind::Arm => (Some(beta[3]), None),
        MechanismKind::Elevator => (None, Some(beta[3])),
        _ => (None, None),
    };
    Ok(FitResult {
        ks: beta[0],
        kv: beta[1],
        ka: beta[2],
        kcos,
        kg,
        r_squared,
    })
}

/// Centered coefficient of determination of the fitted model.
fn r_squared(
    beta: &DVector<f64>,
    vel: &[f64],
    accel: &[f64],
    volts: &[f64],
    gravity: &Option<Vec<f64>>,
) -> f64 {
    let n = volts.len();
    let mean = volts.iter().sum::<f64>() / n as f64;
    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for i in 0..n {
        let mut predicted = beta[0] * sign(vel[i]) + beta[1] * vel[i] + beta[2] * accel[i];
        if let Some(g) = gravity {
            predicted += beta[3] * g[i];
        }
        ss_res += (volts[i] - predicted).powi(2);
        ss_tot += (volts[i] - mean).powi(2);
    }
    if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else {
        // A constant response carries no variance to explain.
        if ss_res > 0.0 {
            0.0
        } else {
            1.0
        }
    }
}

/// Round to `figures` significant figures, for user-facing display.
pub fn round_sig_figs(x: f64, figures: i32) -> f64 {
    if x == 0.0 || !x.is_finite() {
        return x;
    }
    let magnitude = x.abs().log10().floor() as i32;
    let factor = 10f64.powi(figures - 1 - magnitude);
    (x * factor).round() / factor
}
