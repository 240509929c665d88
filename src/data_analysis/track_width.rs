// src/data_analysis/track_width.rs

//! Empirical track width from the rotation-in-place run: both wheel arcs
//! divided by the gyro's total rotation.

use crate::config::AnalysisSettings;
use crate::data_input::capture::RawRun;
use crate::error::{AnalysisError, AnalysisResult};

/// Effective track width in the capture's linear units, or `None` when the
/// capture uses rotational units (wheel travel is then not a distance).
///
/// Wheel encoders report shaft rotations; gyro headings are radians. Each
/// wheel sweeps an arc of `trackwidth / 2 × angle`, so the diameter is the
/// summed arc lengths over the swept angle.
pub fn calc_track_width(
    run: &RawRun,
    settings: &AnalysisSettings,
) -> AnalysisResult<Option<f64>> {
    if settings.units.is_rotational() {
        return Ok(None);
    }
    if run.len() < 2 {
        return Err(AnalysisError::NoGyroMotion);
    }
    let last = run.len() - 1;
    let d_left = (run.l_position[last] - run.l_position[0]) * settings.units_per_rotation;
    let d_right = (run.r_position[last] - run.r_position[0]) * settings.units_per_rotation;
    let d_angle = run.gyro_angle[last] - run.gyro_angle[0];
    if d_angle == 0.0 {
        return Err(AnalysisError::NoGyroMotion);
    }
    Ok(Some((d_left.abs() + d_right.abs()) / d_angle.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Units;
    use approx::assert_relative_eq;
    use ndarray::Array1;
    use std::f64::consts::PI;

    fn spin_run(l_rotations: f64, r_rotations: f64, swept: f64, n: usize) -> RawRun {
        let ramp = |end: f64| Array1::from_iter((0..n).map(|i| end * i as f64 / (n - 1) as f64));
        RawRun {
            time: ramp(2.0),
            battery: Array1::from_elem(n, 12.0),
            autospeed: Array1::zeros(n),
            l_volts: Array1::from_elem(n, -4.0),
            r_volts: Array1::from_elem(n, 4.0),
            l_position: ramp(l_rotations),
            r_position: ramp(r_rotations),
            l_velocity: Array1::zeros(n),
            r_velocity: Array1::zeros(n),
            gyro_angle: ramp(swept),
        }
    }

    #[test]
    fn recovers_the_diameter_of_a_clean_spin() {
        // 0.6 m track width, wheel circumference 0.4 m, two full turns:
        // each wheel travels π × 0.6 × 2 = 3.7699 m = 9.4248 rotations.
        let circumference = 0.4;
        let arc = PI * 0.6 * 2.0;
        let run = spin_run(-arc / circumference, arc / circumference, 4.0 * PI, 100);
        let settings = AnalysisSettings::new(Units::Meters, circumference);
        let width = calc_track_width(&run, &settings).unwrap().unwrap();
        assert_relative_eq!(width, 0.6, epsilon = 1e-9);
    }

    #[test]
    fn rotational_units_yield_no_track_width() {
        let run = spin_run(-5.0, 5.0, 4.0 * PI, 10);
        let settings = AnalysisSettings::new(Units::Degrees, 360.0);
        assert_eq!(calc_track_width(&run, &settings).unwrap(), None);
    }

    #[test]
    fn a_stuck_gyro_is_reported() {
        let run = spin_run(-5.0, 5.0, 0.0, 10);
        let settings = AnalysisSettings::new(Units::Meters, 0.4);
        assert!(matches!(
            calc_track_width(&run, &settings),
            Err(AnalysisError::NoGyroMotion)
        ));
    }
}
