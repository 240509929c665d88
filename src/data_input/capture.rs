// src/data_input/capture.rs

//! Capture-file loading and validation.
//!
//! The data logger records each test as an array of ten-column rows (see the
//! `*_COL` constants) and writes them into one JSON document together with
//! the mechanism type, the measurement unit, and the units-per-rotation
//! factor. This module deserializes that document, validates the channel
//! layout, and transposes the rows into per-channel arrays for the pipeline.
//! Everything downstream treats the result as read-only.

use ndarray::Array1;
use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::config::{MechanismKind, Units};
use crate::constants::*;
use crate::error::{AnalysisError, AnalysisResult};

/// The characterization runs a capture may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TestKind {
    SlowForward,
    SlowBackward,
    FastForward,
    FastBackward,
    TrackWidth,
}

impl TestKind {
    /// JSON key used by the data logger.
    pub fn key(self) -> &'static str {
        match self {
            TestKind::SlowForward => "slow-forward",
            TestKind::SlowBackward => "slow-backward",
            TestKind::FastForward => "fast-forward",
            TestKind::FastBackward => "fast-backward",
            TestKind::TrackWidth => "track-width",
        }
    }

    /// The quasistatic (slow voltage ramp) runs.
    pub fn is_quasistatic(self) -> bool {
        matches!(self, TestKind::SlowForward | TestKind::SlowBackward)
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Raw JSON document shape, exactly as the logger writes it.
#[derive(Debug, Deserialize)]
struct CaptureFile {
    test: MechanismKind,
    units: Units,
    #[serde(rename = "unitsPerRotation")]
    units_per_rotation: f64,
    #[serde(rename = "slow-forward")]
    slow_forward: Option<Vec<Vec<f64>>>,
    #[serde(rename = "slow-backward")]
    slow_backward: Option<Vec<Vec<f64>>>,
    #[serde(rename = "fast-forward")]
    fast_forward: Option<Vec<Vec<f64>>>,
    #[serde(rename = "fast-backward")]
    fast_backward: Option<Vec<Vec<f64>>>,
    #[serde(rename = "track-width")]
    track_width: Option<Vec<Vec<f64>>>,
}

/// One test run, transposed into aligned per-channel arrays.
#[derive(Debug, Clone)]
pub struct RawRun {
    pub time: Array1<f64>,
    pub battery: Array1<f64>,
    pub autospeed: Array1<f64>,
    pub l_volts: Array1<f64>,
    pub r_volts: Array1<f64>,
    pub l_position: Array1<f64>,
    pub r_position: Array1<f64>,
    pub l_velocity: Array1<f64>,
    pub r_velocity: Array1<f64>,
    pub gyro_angle: Array1<f64>,
}

impl RawRun {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    fn from_rows(test: TestKind, rows: &[Vec<f64>]) -> AnalysisResult<RawRun> {
        for (row, values) in rows.iter().enumerate() {
            if values.len() != CHANNEL_COUNT {
                return Err(AnalysisError::ChannelMismatch {
                    test,
                    row,
                    expected: CHANNEL_COUNT,
                    actual: values.len(),
                });
            }
        }
        let column = |col: usize| Array1::from_iter(rows.iter().map(|r| r[col]));
        Ok(RawRun {
            time: column(TIME_COL),
            battery: column(BATTERY_COL),
            autospeed: column(AUTOSPEED_COL),
            l_volts: column(L_VOLTS_COL),
            r_volts: column(R_VOLTS_COL),
            l_position: column(L_ENCODER_P_COL),
            r_position: column(R_ENCODER_P_COL),
            l_velocity: column(L_ENCODER_V_COL),
            r_velocity: column(R_ENCODER_V_COL),
            gyro_angle: column(GYRO_ANGLE_COL),
        })
    }

    /// Keep only the samples at `indices`, preserving order.
    pub fn select(&self, indices: &[usize]) -> RawRun {
        use ndarray::Axis;
        RawRun {
            time: self.time.select(Axis(0), indices),
            battery: self.battery.select(Axis(0), indices),
            autospeed: self.autospeed.select(Axis(0), indices),
            l_volts: self.l_volts.select(Axis(0), indices),
            r_volts: self.r_volts.select(Axis(0), indices),
            l_position: self.l_position.select(Axis(0), indices),
            r_position: self.r_position.select(Axis(0), indices),
            l_velocity: self.l_velocity.select(Axis(0), indices),
            r_velocity: self.r_velocity.select(Axis(0), indices),
            gyro_angle: self.gyro_angle.select(Axis(0), indices),
        }
    }
}

/// A full validated capture: the four characterization runs plus metadata,
/// and the optional track-width run for drivetrains.
#[derive(Debug, Clone)]
pub struct CaptureSet {
    pub mechanism: MechanismKind,
    pub units: Units,
    pub units_per_rotation: f64,
    pub slow_forward: RawRun,
    pub slow_backward: RawRun,
    pub fast_forward: RawRun,
    pub fast_backward: RawRun,
    pub track_width: Option<RawRun>,
}

impl CaptureSet {
    pub fn from_json_str(json: &str) -> AnalysisResult<CaptureSet> {
        let file: CaptureFile = serde_json::from_str(json)?;
        CaptureSet::from_file(file)
    }

    pub fn load(path: &Path) -> AnalysisResult<CaptureSet> {
        let reader = BufReader::new(File::open(path)?);
        let file: CaptureFile = serde_json::from_reader(reader)?;
        CaptureSet::from_file(file)
    }

    fn from_file(file: CaptureFile) -> AnalysisResult<CaptureSet> {
        let require = |rows: Option<Vec<Vec<f64>>>, test: TestKind| {
            let rows = rows.ok_or(AnalysisError::MissingTest(test))?;
            RawRun::from_rows(test, &rows)
        };
        let track_width = match file.track_width {
            Some(rows) => Some(RawRun::from_rows(TestKind::TrackWidth, &rows)?),
            None => None,
        };
        Ok(CaptureSet {
            mechanism: file.test,
            units: file.units,
            units_per_rotation: file.units_per_rotation,
            slow_forward: require(file.slow_forward, TestKind::SlowForward)?,
            slow_backward: require(file.slow_backward, TestKind::SlowBackward)?,
            fast_forward: require(file.fast_forward, TestKind::FastForward)?,
            fast_backward: require(file.fast_backward, TestKind::FastBackward)?,
            track_width,
        })
    }

    pub fn run(&self, test: TestKind) -> Option<&RawRun> {
        match test {
            TestKind::SlowForward => Some(&self.slow_forward),
            TestKind::SlowBackward => Some(&self.slow_backward),
            TestKind::FastForward => Some(&self.fast_forward),
            TestKind::FastBackward => Some(&self.fast_backward),
            TestKind::TrackWidth => self.track_width.as_ref(),
        }
    }
}
