// src/data_analysis/prepare.rs

//! Dataset preparation: turns the raw capture into trimmed, derived,
//! regression-ready segments grouped into named subsets.
//!
//! Per run the order of operations is fixed: voltage sign is forced to match
//! velocity sign and channels are scaled into user units first; quasistatic
//! runs are then threshold-trimmed *before* acceleration is derived, while
//! step runs get their acceleration first and are peak-trimmed after.

use ndarray::{concatenate, s, Array1, Axis};
use std::collections::BTreeMap;

use crate::config::{AnalysisSettings, MechanismKind};
use crate::data_analysis::derivative::smooth_derivative;
use crate::data_analysis::trim::{trim_quasistatic, trim_step};
use crate::data_input::capture::{CaptureSet, RawRun, TestKind};
use crate::error::{AnalysisError, AnalysisResult};

/// Aligned channels of one trimmed test segment. Acceleration is always
/// derived, never logged; the cosine channel is present for arm captures.
#[derive(Debug, Clone)]
pub struct PreparedSegment {
    pub time: Array1<f64>,
    pub voltage: Array1<f64>,
    pub position: Array1<f64>,
    pub velocity: Array1<f64>,
    pub acceleration: Array1<f64>,
    pub cosine: Option<Array1<f64>>,
}

impl PreparedSegment {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// The segment from sample index `from` to the end.
    pub fn tail_from(&self, from: usize) -> PreparedSegment {
        let from = from.min(self.len());
        PreparedSegment {
            time: self.time.slice(s![from..]).to_owned(),
            voltage: self.voltage.slice(s![from..]).to_owned(),
            position: self.position.slice(s![from..]).to_owned(),
            velocity: self.velocity.slice(s![from..]).to_owned(),
            acceleration: self.acceleration.slice(s![from..]).to_owned(),
            cosine: self.cosine.as_ref().map(|c| c.slice(s![from..]).to_owned()),
        }
    }

    /// Concatenate segments along the sample axis. The cosine channel is kept
    /// only when every part carries one.
    pub fn concat(parts: &[&PreparedSegment]) -> PreparedSegment {
        let cat = |pick: fn(&PreparedSegment) -> &Array1<f64>| {
            let views: Vec<_> = parts.iter().map(|p| pick(p).view()).collect();
            concatenate(Axis(0), &views).expect("segments are 1-D and always concatenable")
        };
        let cosine = if parts.iter().all(|p| p.cosine.is_some()) {
            let views: Vec<_> = parts
                .iter()
                .map(|p| p.cosine.as_ref().unwrap().view())
                .collect();
            Some(concatenate(Axis(0), &views).expect("cosine channels are 1-D"))
        } else {
            None
        };
        PreparedSegment {
            time: cat(|p| &p.time),
            voltage: cat(|p| &p.voltage),
            position: cat(|p| &p.position),
            velocity: cat(|p| &p.velocity),
            acceleration: cat(|p| &p.acceleration),
            cosine,
        }
    }
}

/// Named test groupings a fit can run on. Drivetrains get the side/direction
/// combinations; everything else gets Forward/Backward/Combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Subset {
    Forward,
    Backward,
    Combined,
    ForwardLeft,
    ForwardRight,
    BackwardLeft,
    BackwardRight,
    ForwardCombined,
    BackwardCombined,
    AllCombined,
}

impl Subset {
    pub fn name(self) -> &'static str {
        match self {
            Subset::Forward => "Forward",
            Subset::Backward => "Backward",
            Subset::Combined => "Combined",
            Subset::ForwardLeft => "Forward Left",
            Subset::ForwardRight => "Forward Right",
            Subset::BackwardLeft => "Backward Left",
            Subset::BackwardRight => "Backward Right",
            Subset::ForwardCombined => "Forward Combined",
            Subset::BackwardCombined => "Backward Combined",
            Subset::AllCombined => "All Combined",
        }
    }

    pub fn for_mechanism(mechanism: MechanismKind) -> &'static [Subset] {
        if mechanism.is_drivetrain() {
            &[
                Subset::ForwardLeft,
                Subset::ForwardRight,
                Subset::BackwardLeft,
                Subset::BackwardRight,
                Subset::ForwardCombined,
                Subset::BackwardCombined,
                Subset::AllCombined,
            ]
        } else {
            &[Subset::Forward, Subset::Backward, Subset::Combined]
        }
    }

    pub fn from_name(mechanism: MechanismKind, name: &str) -> Option<Subset> {
        Subset::for_mechanism(mechanism)
            .iter()
            .copied()
            .find(|s| s.name() == name)
    }

    /// The subset a fit defaults to when the caller does not pick one.
    pub fn default_for(mechanism: MechanismKind) -> Subset {
        if mechanism.is_drivetrain() {
            Subset::AllCombined
        } else {
            Subset::Combined
        }
    }
}

/// One quasistatic segment paired with one step segment, ready for the
/// fitter. The pair stays unmerged because the regression concatenates the
/// columns itself at fit time.
#[derive(Debug, Clone)]
pub struct SubsetData {
    pub quasistatic: PreparedSegment,
    pub dynamic: PreparedSegment,
}

/// All prepared subsets of one capture. Recomputed from scratch whenever the
/// accel window or motion threshold changes; nothing in here is mutated.
#[derive(Debug)]
pub struct PreparedDataset {
    pub mechanism: MechanismKind,
    subsets: BTreeMap<Subset, SubsetData>,
}

impl PreparedDataset {
    pub fn get(&self, subset: Subset) -> Option<&SubsetData> {
        self.subsets.get(&subset)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Subset, &SubsetData)> {
        self.subsets.iter().map(|(s, d)| (*s, d))
    }
}

enum Side {
    Left,
    Right,
}

/// Force voltage sign to match velocity sign (so regression signs stay
/// physically consistent) and scale encoder channels into user units. Works
/// on a copy; the capture itself is never rewritten.
fn adjust_run(run: &RawRun, mechanism: MechanismKind, settings: &AnalysisSettings) -> RawRun {
    let upr = settings.units_per_rotation;
    let mut out = run.clone();
    for i in 0..out.len() {
        out.l_volts[i] = out.l_volts[i].copysign(out.l_velocity[i]);
    }
    out.l_velocity.mapv_inplace(|v| v * upr);
    out.l_position.mapv_inplace(|p| p * upr);
    if mechanism.is_drivetrain() {
        for i in 0..out.len() {
            out.r_volts[i] = out.r_volts[i].copysign(out.r_velocity[i]);
        }
        out.r_velocity.mapv_inplace(|v| v * upr);
        out.r_position.mapv_inplace(|p| p * upr);
    }
    out
}

/// Derive acceleration for one side of a trimmed run and assemble the
/// prepared channels.
fn derive_segment(
    run: &RawRun,
    side: Side,
    test: TestKind,
    mechanism: MechanismKind,
    settings: &AnalysisSettings,
) -> AnalysisResult<PreparedSegment> {
    let window = settings.window_size;
    if run.len() < 2 * window {
        return Err(AnalysisError::InsufficientData {
            test,
            samples: run.len(),
            window,
        });
    }
    let (volts, position, velocity) = match side {
        Side::Left => (&run.l_volts, &run.l_position, &run.l_velocity),
        Side::Right => (&run.r_volts, &run.r_position, &run.r_velocity),
    };
    let acceleration = smooth_derivative(&run.time, velocity, window);
    let cosine = if mechanism.needs_cosine() {
        Some(position.mapv(|p| settings.units.cosine(p)))
    } else {
        None
    };
    Ok(PreparedSegment {
        time: run.time.clone(),
        voltage: volts.clone(),
        position: position.clone(),
        velocity: velocity.clone(),
        acceleration,
        cosine,
    })
}

fn prepare_quasistatic(
    run: &RawRun,
    side: Side,
    test: TestKind,
    mechanism: MechanismKind,
    settings: &AnalysisSettings,
) -> AnalysisResult<PreparedSegment> {
    // Trimmed before the derivative so the window never spans static data.
    derive_segment(run, side, test, mechanism, settings)
}

fn prepare_step(
    run: &RawRun,
    side: Side,
    test: TestKind,
    mechanism: MechanismKind,
    settings: &AnalysisSettings,
) -> AnalysisResult<PreparedSegment> {
    // Acceleration first; the trim point is its peak.
    let segment = derive_segment(run, side, test, mechanism, settings)?;
    Ok(trim_step(&segment))
}

/// Run the full preparation across the four captures and assemble the named
/// subsets. Any insufficient-data or insufficient-motion condition aborts the
/// whole dataset rather than leaving a partially valid one.
pub fn prepare_dataset(
    capture: &CaptureSet,
    settings: &AnalysisSettings,
) -> AnalysisResult<PreparedDataset> {
    let mechanism = capture.mechanism;
    let threshold = settings.motion_threshold;

    let sf = adjust_run(&capture.slow_forward, mechanism, settings);
    let sb = adjust_run(&capture.slow_backward, mechanism, settings);
    let ff = adjust_run(&capture.fast_forward, mechanism, settings);
    let fb = adjust_run(&capture.fast_backward, mechanism, settings);

    let sf = trim_quasistatic(&sf, TestKind::SlowForward, mechanism, threshold)?;
    let sb = trim_quasistatic(&sb, TestKind::SlowBackward, mechanism, threshold)?;

    let mut subsets = BTreeMap::new();
    if mechanism.is_drivetrain() {
        let sf_l = prepare_quasistatic(&sf, Side::Left, TestKind::SlowForward, mechanism, settings)?;
        let sf_r = prepare_quasistatic(&sf, Side::Right, TestKind::SlowForward, mechanism, settings)?;
        let sb_l = prepare_quasistatic(&sb, Side::Left, TestKind::SlowBackward, mechanism, settings)?;
        let sb_r = prepare_quasistatic(&sb, Side::Right, TestKind::SlowBackward, mechanism, settings)?;

        let ff_l = prepare_step(&ff, Side::Left, TestKind::FastForward, mechanism, settings)?;
        let ff_r = prepare_step(&ff, Side::Right, TestKind::FastForward, mechanism, settings)?;
        let fb_l = prepare_step(&fb, Side::Left, TestKind::FastBackward, mechanism, settings)?;
        let fb_r = prepare_step(&fb, Side::Right, TestKind::FastBackward, mechanism, settings)?;

        subsets.insert(
            Subset::ForwardCombined,
            SubsetData {
                quasistatic: PreparedSegment::concat(&[&sf_l, &sf_r]),
                dynamic: PreparedSegment::concat(&[&ff_l, &ff_r]),
            },
        );
        subsets.insert(
            Subset::BackwardCombined,
            SubsetData {
                quasistatic: PreparedSegment::concat(&[&sb_l, &sb_r]),
                dynamic: PreparedSegment::concat(&[&fb_l, &fb_r]),
            },
        );
        subsets.insert(
            Subset::AllCombined,
            SubsetData {
                quasistatic: PreparedSegment::concat(&[&sf_l, &sb_l, &sf_r, &sb_r]),
                dynamic: PreparedSegment::concat(&[&ff_l, &fb_l, &ff_r, &fb_r]),
            },
        );
        subsets.insert(Subset::ForwardLeft, SubsetData { quasistatic: sf_l, dynamic: ff_l });
        subsets.insert(Subset::ForwardRight, SubsetData { quasistatic: sf_r, dynamic: ff_r });
        subsets.insert(Subset::BackwardLeft, SubsetData { quasistatic: sb_l, dynamic: fb_l });
        subsets.insert(Subset::BackwardRight, SubsetData { quasistatic: sb_r, dynamic: fb_r });
    } else {
        let sf = prepare_quasistatic(&sf, Side::Left, TestKind::SlowForward, mechanism, settings)?;
        let sb = prepare_quasistatic(&sb, Side::Left, TestKind::SlowBackward, mechanism, settings)?;
        let ff = prepare_step(&ff, Side::Left, TestKind::FastForward, mechanism, settings)?;
        let fb = prepare_step(&fb, Side::Left, TestKind::FastBackward, mechanism, settings)?;

        subsets.insert(
            Subset::Combined,
            SubsetData {
                quasistatic: PreparedSegment::concat(&[&sf, &sb]),
                dynamic: PreparedSegment::concat(&[&ff, &fb]),
            },
        );
        subsets.insert(Subset::Forward, SubsetData { quasistatic: sf, dynamic: ff });
        subsets.insert(Subset::Backward, SubsetData { quasistatic: sb, dynamic: fb });
    }

    Ok(PreparedDataset { mechanism, subsets })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Units;

    fn run(n: usize, vel: impl Fn(usize) -> f64, volts: impl Fn(usize) -> f64) -> RawRun {
        RawRun {
            time: Array1::from_iter((0..n).map(|i| i as f64 * 0.02)),
            battery: Array1::from_elem(n, 12.0),
            autospeed: Array1::from_elem(n, 0.5),
            l_volts: Array1::from_iter((0..n).map(&volts)),
            r_volts: Array1::from_iter((0..n).map(&volts)),
            l_position: Array1::from_iter((0..n).map(|i| i as f64 * 0.01)),
            r_position: Array1::from_iter((0..n).map(|i| i as f64 * 0.01)),
            l_velocity: Array1::from_iter((0..n).map(&vel)),
            r_velocity: Array1::from_iter((0..n).map(&vel)),
            gyro_angle: Array1::zeros(n),
        }
    }

    fn capture(mechanism: MechanismKind, units: Units) -> CaptureSet {
        let slow_fwd = run(40, |i| 0.5 + i as f64 * 0.05, |_| 2.0);
        let slow_back = run(40, |i| -(0.5 + i as f64 * 0.05), |_| 2.0);
        let fast_fwd = run(40, |i| (i as f64 * 0.1).min(2.5), |_| 6.0);
        let fast_back = run(40, |i| -(i as f64 * 0.1).min(2.5), |_| 6.0);
        CaptureSet {
            mechanism,
            units,
            units_per_rotation: 1.0,
            slow_forward: slow_fwd,
            slow_backward: slow_back,
            fast_forward: fast_fwd,
            fast_backward: fast_back,
            track_width: None,
        }
    }

    #[test]
    fn voltage_sign_is_forced_to_match_velocity() {
        let capture = capture(MechanismKind::SimpleMotor, Units::Meters);
        let settings = AnalysisSettings::new(Units::Meters, 1.0);
        let data = prepare_dataset(&capture, &settings).unwrap();
        let backward = data.get(Subset::Backward).unwrap();
        assert!(backward.quasistatic.voltage.iter().all(|&v| v < 0.0));
        assert!(backward.quasistatic.velocity.iter().all(|&v| v < 0.0));
    }

    #[test]
    fn simple_mechanism_gets_three_subsets_without_cosine() {
        let capture = capture(MechanismKind::SimpleMotor, Units::Meters);
        let settings = AnalysisSettings::new(Units::Meters, 1.0);
        let data = prepare_dataset(&capture, &settings).unwrap();
        assert_eq!(data.iter().count(), 3);
        assert!(data.get(Subset::Combined).unwrap().quasistatic.cosine.is_none());
        assert!(data.get(Subset::AllCombined).is_none());
    }

    #[test]
    fn arm_segments_carry_a_cosine_channel() {
        let capture = capture(MechanismKind::Arm, Units::Degrees);
        let settings = AnalysisSettings::new(Units::Degrees, 360.0);
        let data = prepare_dataset(&capture, &settings).unwrap();
        let fwd = data.get(Subset::Forward).unwrap();
        let cos = fwd.quasistatic.cosine.as_ref().unwrap();
        assert_eq!(cos.len(), fwd.quasistatic.len());
        assert!(cos.iter().all(|c| (-1.0..=1.0).contains(c)));
    }

    #[test]
    fn drivetrain_combined_subsets_concatenate_both_sides() {
        let capture = capture(MechanismKind::Drivetrain, Units::Meters);
        let settings = AnalysisSettings::new(Units::Meters, 1.0);
        let data = prepare_dataset(&capture, &settings).unwrap();
        let left = data.get(Subset::ForwardLeft).unwrap();
        let combined = data.get(Subset::ForwardCombined).unwrap();
        assert_eq!(combined.quasistatic.len(), 2 * left.quasistatic.len());
        let all = data.get(Subset::AllCombined).unwrap();
        let back_left = data.get(Subset::BackwardLeft).unwrap();
        assert_eq!(
            all.dynamic.len(),
            2 * (left.dynamic.len() + back_left.dynamic.len())
        );
    }

    #[test]
    fn units_per_rotation_scales_encoder_channels() {
        let capture = capture(MechanismKind::SimpleMotor, Units::Meters);
        let settings_1x = AnalysisSettings::new(Units::Meters, 1.0);
        let mut settings_2x = settings_1x.clone();
        settings_2x.units_per_rotation = 2.0;
        let a = prepare_dataset(&capture, &settings_1x).unwrap();
        let b = prepare_dataset(&capture, &settings_2x).unwrap();
        let va = &a.get(Subset::Forward).unwrap().quasistatic.velocity;
        let vb = &b.get(Subset::Forward).unwrap().quasistatic.velocity;
        assert_eq!(va.len(), vb.len());
        for (x, y) in va.iter().zip(vb.iter()) {
            assert!((2.0 * x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn too_small_a_run_propagates_insufficient_data() {
        let mut capture = capture(MechanismKind::SimpleMotor, Units::Meters);
        capture.fast_forward = run(6, |i| i as f64, |_| 6.0);
        let settings = AnalysisSettings::new(Units::Meters, 1.0);
        match prepare_dataset(&capture, &settings) {
            Err(AnalysisError::InsufficientData { test, samples, window }) => {
                assert_eq!(test, TestKind::FastForward);
                assert_eq!(samples, 6);
                assert_eq!(window, crate::constants::DEFAULT_WINDOW_SIZE);
            }
            other => panic!("expected InsufficientData, got {other:?}"),
        }
    }
}
