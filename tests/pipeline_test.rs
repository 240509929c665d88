// tests/pipeline_test.rs
//
// End-to-end checks against a synthetic plant: captures are generated from a
// known voltage balance, pushed through preparation and fitting, and the
// recovered coefficients compared with the ones the data was built from.

use approx::assert_relative_eq;
use ndarray::Array1;

use frc_sysid::config::{
    AnalysisSettings, FeedbackSettings, GainPreset, LoopType, MechanismKind, Units,
};
use frc_sysid::data_analysis::derivative::smooth_derivative;
use frc_sysid::data_analysis::gains::compute_gains;
use frc_sysid::data_analysis::prepare::{prepare_dataset, Subset};
use frc_sysid::data_analysis::regression::{fit_subset, sign};
use frc_sysid::data_input::capture::{CaptureSet, RawRun};

const KS: f64 = 1.2;
const KV: f64 = 2.3;
const KA: f64 = 0.37;
const DT: f64 = 0.02;

/// Voltage from the model the fit is supposed to recover. Acceleration is
/// produced by the same secant derivative the pipeline applies, so the
/// regression sees an exactly consistent system.
fn model_volts(time: &Array1<f64>, vel: &Array1<f64>, window: usize) -> Array1<f64> {
    let accel = smooth_derivative(time, vel, window);
    Array1::from_iter(
        vel.iter()
            .zip(accel.iter())
            .map(|(&v, &a)| KS * sign(v) + KV * v + KA * a),
    )
}

fn run_from_profile(vel: Array1<f64>, window: usize) -> RawRun {
    let n = vel.len();
    let time = Array1::from_iter((0..n).map(|i| i as f64 * DT));
    let volts = model_volts(&time, &vel, window);
    let mut position = Array1::zeros(n);
    for i in 1..n {
        position[i] = position[i - 1] + vel[i] * DT;
    }
    RawRun {
        time,
        battery: Array1::from_elem(n, 12.0),
        autospeed: vel.clone() / 4.0,
        l_volts: volts.clone(),
        r_volts: volts,
        l_position: position.clone(),
        r_position: position,
        l_velocity: vel.clone(),
        r_velocity: vel,
        gyro_angle: Array1::zeros(n),
    }
}

/// Quasistatic profile: a slow ramp that stays above the motion threshold.
fn slow_profile(direction: f64) -> Array1<f64> {
    Array1::from_iter((0..60).map(|i| direction * (0.5 + 0.05 * i as f64)))
}

/// Step-response profile: an exponential rise toward terminal velocity.
fn fast_profile(direction: f64) -> Array1<f64> {
    Array1::from_iter((0..80).map(|i| {
        let t = i as f64 * DT;
        direction * 4.0 * (1.0 - (-t / 0.4).exp())
    }))
}

fn synthetic_capture(mechanism: MechanismKind, window: usize) -> CaptureSet {
    CaptureSet {
        mechanism,
        units: Units::Meters,
        units_per_rotation: 1.0,
        slow_forward: run_from_profile(slow_profile(1.0), window),
        slow_backward: run_from_profile(slow_profile(-1.0), window),
        fast_forward: run_from_profile(fast_profile(1.0), window),
        fast_backward: run_from_profile(fast_profile(-1.0), window),
        track_width: None,
    }
}

#[test]
fn simple_motor_pipeline_recovers_the_generating_model() {
    let capture = synthetic_capture(MechanismKind::SimpleMotor, 8);
    let settings = AnalysisSettings::new(Units::Meters, 1.0);
    let dataset = prepare_dataset(&capture, &settings).unwrap();

    let data = dataset.get(Subset::Combined).unwrap();
    let fit = fit_subset(data, MechanismKind::SimpleMotor).unwrap();

    assert_relative_eq!(fit.ks, KS, epsilon = 1e-6);
    assert_relative_eq!(fit.kv, KV, epsilon = 1e-6);
    assert_relative_eq!(fit.ka, KA, epsilon = 1e-6);
    assert!(fit.r_squared > 0.9999, "r_squared = {}", fit.r_squared);
    assert!(fit.kcos.is_none());
    assert!(fit.kg.is_none());
}

#[test]
fn forward_only_subset_also_recovers_the_model() {
    let capture = synthetic_capture(MechanismKind::SimpleMotor, 8);
    let settings = AnalysisSettings::new(Units::Meters, 1.0);
    let dataset = prepare_dataset(&capture, &settings).unwrap();

    let fit = fit_subset(dataset.get(Subset::Forward).unwrap(), MechanismKind::SimpleMotor)
        .unwrap();
    assert_relative_eq!(fit.kv, KV, epsilon = 1e-6);
    assert_relative_eq!(fit.ka, KA, epsilon = 1e-6);
}

#[test]
fn identical_drivetrain_sides_fit_identically() {
    let capture = synthetic_capture(MechanismKind::Drivetrain, 8);
    let settings = AnalysisSettings::new(Units::Meters, 1.0);
    let dataset = prepare_dataset(&capture, &settings).unwrap();

    let left = fit_subset(
        dataset.get(Subset::ForwardLeft).unwrap(),
        MechanismKind::Drivetrain,
    )
    .unwrap();
    let right = fit_subset(
        dataset.get(Subset::ForwardRight).unwrap(),
        MechanismKind::Drivetrain,
    )
    .unwrap();
    assert_eq!(left, right);

    let all = fit_subset(
        dataset.get(Subset::AllCombined).unwrap(),
        MechanismKind::Drivetrain,
    )
    .unwrap();
    assert_relative_eq!(all.ks, KS, epsilon = 1e-6);
    assert_relative_eq!(all.kv, KV, epsilon = 1e-6);
    assert_relative_eq!(all.ka, KA, epsilon = 1e-6);
}

#[test]
fn gain_synthesis_is_deterministic_and_positive() {
    let capture = synthetic_capture(MechanismKind::SimpleMotor, 8);
    let settings = AnalysisSettings::new(Units::Meters, 1.0);
    let dataset = prepare_dataset(&capture, &settings).unwrap();
    let fit = fit_subset(dataset.get(Subset::Combined).unwrap(), MechanismKind::SimpleMotor)
        .unwrap();

    let fb = FeedbackSettings::from_preset(GainPreset::Default, LoopType::Position);
    let first = compute_gains(&fit, &fb, &settings).unwrap();
    let second = compute_gains(&fit, &fb, &settings).unwrap();

    assert!(first.kp.is_finite() && first.kp > 0.0);
    assert!(first.kd.is_finite() && first.kd > 0.0);
    assert!(!first.reduced_order);
    assert_eq!(first.kp.to_bits(), second.kp.to_bits());
    assert_eq!(first.kd.to_bits(), second.kd.to_bits());

    let vel_fb = FeedbackSettings::from_preset(GainPreset::Default, LoopType::Velocity);
    let vel_gains = compute_gains(&fit, &vel_fb, &settings).unwrap();
    assert!(vel_gains.kp.is_finite() && vel_gains.kp > 0.0);
    assert_eq!(vel_gains.kd, 0.0);
}

#[test]
fn json_capture_feeds_the_same_pipeline() {
    let capture = synthetic_capture(MechanismKind::SimpleMotor, 8);
    let row = |run: &RawRun, i: usize| {
        serde_json::json!([
            run.time[i],
            run.battery[i],
            run.autospeed[i],
            run.l_volts[i],
            run.r_volts[i],
            run.l_position[i],
            run.r_position[i],
            run.l_velocity[i],
            run.r_velocity[i],
            run.gyro_angle[i],
        ])
    };
    let rows = |run: &RawRun| -> Vec<serde_json::Value> {
        (0..run.len()).map(|i| row(run, i)).collect()
    };
    let json = serde_json::json!({
        "test": "Simple",
        "units": "Meters",
        "unitsPerRotation": 1.0,
        "slow-forward": rows(&capture.slow_forward),
        "slow-backward": rows(&capture.slow_backward),
        "fast-forward": rows(&capture.fast_forward),
        "fast-backward": rows(&capture.fast_backward),
    })
    .to_string();

    let loaded = CaptureSet::from_json_str(&json).unwrap();
    assert_eq!(loaded.mechanism, MechanismKind::SimpleMotor);
    assert_eq!(loaded.units, Units::Meters);

    let settings = AnalysisSettings::new(loaded.units, loaded.units_per_rotation);
    let dataset = prepare_dataset(&loaded, &settings).unwrap();
    let fit = fit_subset(dataset.get(Subset::Combined).unwrap(), MechanismKind::SimpleMotor)
        .unwrap();
    assert_relative_eq!(fit.ks, KS, epsilon = 1e-6);
    assert_relative_eq!(fit.kv, KV, epsilon = 1e-6);
    assert_relative_eq!(fit.ka, KA, epsilon = 1e-6);
}
