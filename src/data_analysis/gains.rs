// src/data_analysis/gains.rs

//! LQR feedback-gain synthesis from the fitted feedforward model.
//!
//! The voltage-balance fit gives a continuous plant; it is discretized at the
//! controller period with a zero-order hold, weighted by Bryson's rule, and
//! run through the discrete Riccati equation. Measurement delay is folded in
//! by propagating the gain through the closed loop for the delayed steps.

use nalgebra::DMatrix;

use crate::config::{AnalysisSettings, ControllerType, FeedbackSettings, LoopType};
use crate::constants::{
    DARE_MAX_ITERATIONS, DARE_TOLERANCE, KA_DEGENERATE_THRESHOLD, NOMINAL_VOLTAGE,
};
use crate::data_analysis::regression::FitResult;
use crate::error::{AnalysisError, AnalysisResult};

/// Proportional and derivative gains, in the selected controller's units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainResult {
    pub kp: f64,
    pub kd: f64,
    /// True when kA was too small to carry the acceleration state and the
    /// synthesis fell back to a first-order model.
    pub reduced_order: bool,
}

/// Discretize `x' = A x + B u` with a zero-order hold over `period`, via the
/// exponential of the augmented matrix `[[A, B], [0, 0]] * T`.
fn discretize_zoh(a: &DMatrix<f64>, b: &DMatrix<f64>, period: f64) -> (DMatrix<f64>, DMatrix<f64>) {
    let n = a.nrows();
    let m = b.ncols();
    let mut aug = DMatrix::zeros(n + m, n + m);
    aug.view_mut((0, 0), (n, n)).copy_from(a);
    aug.view_mut((0, n), (n, m)).copy_from(b);
    let phi = (aug * period).exp();
    let ad = phi.view((0, 0), (n, n)).into_owned();
    let bd = phi.view((0, n), (n, m)).into_owned();
    (ad, bd)
}

/// Bryson's rule: a diagonal weight of `1/tolerance²` per state or input.
fn bryson_diag(tolerances: &[f64]) -> AnalysisResult<DMatrix<f64>> {
    let mut diag = DMatrix::zeros(tolerances.len(), tolerances.len());
    for (i, &tol) in tolerances.iter().enumerate() {
        if tol <= 0.0 {
            return Err(AnalysisError::NonPositiveTolerance(tol));
        }
        diag[(i, i)] = 1.0 / (tol * tol);
    }
    Ok(diag)
}

/// Fixed-point iteration on the discrete algebraic Riccati equation,
/// `P ← AᵀPA − AᵀPB (R + BᵀPB)⁻¹ BᵀPA + Q`, started from Q. Converges
/// geometrically at the square of the closed-loop spectral radius.
fn solve_dare(
    a: &DMatrix<f64>,
    b: &DMatrix<f64>,
    q: &DMatrix<f64>,
    r: &DMatrix<f64>,
) -> AnalysisResult<DMatrix<f64>> {
    let mut p = q.clone();
    for _ in 0..DARE_MAX_ITERATIONS {
        let btp = b.transpose() * &p;
        let gain_denom = (r + &btp * b).try_inverse().ok_or_else(|| {
            AnalysisError::GainSolveFailed("singular effort penalty in Riccati step".into())
        })?;
        let atp = a.transpose() * &p;
        let next = &atp * a - (&atp * b) * gain_denom * (&btp * a) + q;
        let step = (&next - &p).amax();
        let scale = next.amax().max(1.0);
        p = next;
        if step <= DARE_TOLERANCE * scale {
            return Ok(p);
        }
    }
    Err(AnalysisError::GainSolveFailed(
        "Riccati iteration did not converge".into(),
    ))
}

/// `K = (R + BᵀPB)⁻¹ BᵀPA` for the DARE solution P.
fn lqr_gain(
    a: &DMatrix<f64>,
    b: &DMatrix<f64>,
    q: &DMatrix<f64>,
    r: &DMatrix<f64>,
) -> AnalysisResult<DMatrix<f64>> {
    let p = solve_dare(a, b, q, r)?;
    let btp = b.transpose() * &p;
    let denom = (r + &btp * b).try_inverse().ok_or_else(|| {
        AnalysisError::GainSolveFailed("singular effort penalty in gain solve".into())
    })?;
    Ok(denom * (btp * a))
}

fn matrix_power(m: &DMatrix<f64>, n: usize) -> DMatrix<f64> {
    let mut out = DMatrix::identity(m.nrows(), m.ncols());
    for _ in 0..n {
        out = out * m;
    }
    out
}

/// Account for sensor measurement delay by pushing the gain through the
/// closed-loop dynamics for the number of whole periods the measurement lags.
fn compensate_delay(
    k: DMatrix<f64>,
    ad: &DMatrix<f64>,
    bd: &DMatrix<f64>,
    delay_ms: f64,
    period: f64,
) -> DMatrix<f64> {
    let steps = (delay_ms / 1000.0 / period).round() as usize;
    if steps == 0 {
        return k;
    }
    let closed = ad - bd * &k;
    k * matrix_power(&closed, steps)
}

fn position_gains(
    kv: f64,
    ka: f64,
    fb: &FeedbackSettings,
    period: f64,
) -> AnalysisResult<GainResult> {
    if ka > KA_DEGENERATE_THRESHOLD {
        let a = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 0.0, -kv / ka]);
        let b = DMatrix::from_row_slice(2, 1, &[0.0, 1.0 / ka]);
        let (ad, bd) = discretize_zoh(&a, &b, period);
        let q = bryson_diag(&[fb.qp, fb.qv])?;
        let r = bryson_diag(&[fb.max_effort])?;
        let k = lqr_gain(&ad, &bd, &q, &r)?;
        let k = compensate_delay(k, &ad, &bd, fb.measurement_delay_ms, period);
        Ok(GainResult {
            kp: k[(0, 0)],
            kd: k[(0, 1)],
            reduced_order: false,
        })
    } else {
        // The acceleration state is unobservable in the data. Treat velocity
        // as the control input instead, with qv as its effort tolerance, and
        // map the resulting velocity command to voltage through kV.
        log::warn!(
            "kA = {ka:.3e} is effectively zero; synthesizing position gains \
             from a first-order model"
        );
        let a = DMatrix::from_row_slice(1, 1, &[0.0]);
        let b = DMatrix::from_row_slice(1, 1, &[1.0]);
        let (ad, bd) = discretize_zoh(&a, &b, period);
        let q = bryson_diag(&[fb.qp])?;
        let r = bryson_diag(&[fb.qv])?;
        let k = lqr_gain(&ad, &bd, &q, &r)?;
        let k = compensate_delay(k, &ad, &bd, fb.measurement_delay_ms, period);
        Ok(GainResult {
            kp: kv * k[(0, 0)],
            kd: 0.0,
            reduced_order: true,
        })
    }
}

fn velocity_gains(
    kv: f64,
    ka: f64,
    fb: &FeedbackSettings,
    period: f64,
) -> AnalysisResult<GainResult> {
    if ka < KA_DEGENERATE_THRESHOLD {
        // Without an acceleration term the plant responds instantly and
        // feedback has nothing to act on; feedforward alone closes the loop.
        log::warn!("kA = {ka:.3e} is effectively zero; velocity feedback gains are zero");
        return Ok(GainResult {
            kp: 0.0,
            kd: 0.0,
            reduced_order: true,
        });
    }
    let a = DMatrix::from_row_slice(1, 1, &[-kv / ka]);
    let b = DMatrix::from_row_slice(1, 1, &[1.0 / ka]);
    let (ad, bd) = discretize_zoh(&a, &b, period);
    let q = bryson_diag(&[fb.qv])?;
    let r = bryson_diag(&[fb.max_effort])?;
    let k = lqr_gain(&ad, &bd, &q, &r)?;
    let k = compensate_delay(k, &ad, &bd, fb.measurement_delay_ms, period);
    Ok(GainResult {
        kp: k[(0, 0)],
        kd: 0.0,
        reduced_order: false,
    })
}

/// Rescale voltage-domain gains into the controller's own output range, time
/// base, and (for offboard controllers) native encoder units.
fn to_controller_units(
    mut kp: f64,
    mut kd: f64,
    fb: &FeedbackSettings,
    analysis: &AnalysisSettings,
) -> (f64, f64) {
    let output_scale = fb.max_controller_output / NOMINAL_VOLTAGE;
    kp *= output_scale;
    kd *= output_scale;

    // Older firmwares multiply the D term by the loop period themselves.
    if !fb.time_normalized {
        kd /= fb.period;
    }

    if fb.convert_gains {
        let units_per_rotation = analysis
            .units
            .per_rotation()
            .unwrap_or(analysis.units_per_rotation);
        match fb.controller {
            ControllerType::Talon => {
                // Native Talon position unit is one encoder edge.
                let per_edge = units_per_rotation / (f64::from(fb.encoder_epr) * fb.gearing);
                kp *= per_edge;
                kd *= per_edge;
                if fb.loop_type == LoopType::Velocity {
                    // Talon velocity is edges per 100 ms.
                    kp *= 10.0;
                }
            }
            ControllerType::Spark => {
                kp /= fb.gearing;
                kd /= fb.gearing;
                if fb.loop_type == LoopType::Velocity {
                    // Spark MAX velocity is RPM.
                    kp /= 60.0;
                }
            }
            ControllerType::Onboard => {}
        }
    }
    (kp, kd)
}

/// Synthesize kP/kD for the fitted plant under the given feedback settings.
pub fn compute_gains(
    fit: &FitResult,
    fb: &FeedbackSettings,
    analysis: &AnalysisSettings,
) -> AnalysisResult<GainResult> {
    let period = fb.effective_period();
    let raw = match fb.loop_type {
        LoopType::Position => position_gains(fit.kv, fit.ka, fb, period)?,
        LoopType::Velocity => velocity_gains(fit.kv, fit.ka, fb, period)?,
    };
    let (kp, kd) = to_controller_units(raw.kp, raw.kd, fb, analysis);
    Ok(GainResult {
        kp,
        kd,
        reduced_order: raw.reduced_order,
    })
}
