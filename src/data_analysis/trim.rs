// src/data_analysis/trim.rs

//! Segment trimming policies.
//!
//! Quasistatic runs are trimmed before acceleration is computed, so the
//! secant window never spans the discarded static region. Step runs are
//! trimmed after, because the cut point is the acceleration peak itself.

use crate::config::MechanismKind;
use crate::data_analysis::prepare::PreparedSegment;
use crate::data_input::capture::{RawRun, TestKind};
use crate::error::{AnalysisError, AnalysisResult};

/// Drop quasistatic samples that do not represent genuine commanded motion:
/// only samples with `|velocity| > threshold` and `|voltage| > 0` survive
/// (required on both sides for a drivetrain).
///
/// An empty survivor set is a hard stop, not an empty segment; it means the
/// mechanism never moved or the encoders are miscalibrated.
pub fn trim_quasistatic(
    run: &RawRun,
    test: TestKind,
    mechanism: MechanismKind,
    threshold: f64,
) -> AnalysisResult<RawRun> {
    let both_sides = mechanism.is_drivetrain();
    let mut keep = Vec::with_capacity(run.len());
    for i in 0..run.len() {
        let mut moving = run.l_velocity[i].abs() > threshold && run.l_volts[i].abs() > 0.0;
        if both_sides {
            moving = moving
                && run.r_velocity[i].abs() > threshold
                && run.r_volts[i].abs() > 0.0;
        }
        if moving {
            keep.push(i);
        }
    }
    if keep.is_empty() {
        return Err(AnalysisError::InsufficientMotion { test, threshold });
    }
    Ok(run.select(&keep))
}

/// Drop every sample up to and including the peak-|acceleration| index. The
/// discarded ramp-up period is dominated by motor inductance rather than the
/// mechanical plant, so it would bias the kA fit.
pub fn trim_step(segment: &PreparedSegment) -> PreparedSegment {
    let mut peak = 0;
    let mut peak_abs = f64::NEG_INFINITY;
    for (i, &a) in segment.acceleration.iter().enumerate() {
        if a.abs() > peak_abs {
            peak_abs = a.abs();
            peak = i;
        }
    }
    segment.tail_from(peak + 1)
}
