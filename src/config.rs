// src/config.rs

//! Analysis and feedback configuration: mechanism/unit enums, controller
//! presets, and the parameter records threaded through the pipeline. The
//! presets are pure data (max output, period, time-normalization, typical
//! measurement delay), not behavior.

use serde::Deserialize;
use std::f64::consts::TAU;
use std::fmt;

use crate::constants::{DEFAULT_MOTION_THRESHOLD, DEFAULT_WINDOW_SIZE};

/// Which mechanism the capture characterizes. Selects the regression model
/// (gravity term) and the available subsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum MechanismKind {
    #[serde(rename = "Simple")]
    SimpleMotor,
    Drivetrain,
    Elevator,
    Arm,
}

impl MechanismKind {
    pub fn is_drivetrain(self) -> bool {
        self == MechanismKind::Drivetrain
    }

    /// Arms get a cosine-of-angle channel in their prepared segments.
    pub fn needs_cosine(self) -> bool {
        self == MechanismKind::Arm
    }
}

impl fmt::Display for MechanismKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MechanismKind::SimpleMotor => "Simple",
            MechanismKind::Drivetrain => "Drivetrain",
            MechanismKind::Elevator => "Elevator",
            MechanismKind::Arm => "Arm",
        };
        write!(f, "{name}")
    }
}

/// Unit of the position/velocity channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Units {
    Feet,
    Meters,
    Inches,
    Radians,
    Degrees,
    Rotations,
}

impl Units {
    pub fn is_rotational(self) -> bool {
        matches!(self, Units::Radians | Units::Degrees | Units::Rotations)
    }

    /// Cosine of an angular position expressed in this unit. Linear units are
    /// treated as radians; an arm capture should always be rotational.
    pub fn cosine(self, pos: f64) -> f64 {
        match self {
            Units::Degrees => pos.to_radians().cos(),
            Units::Rotations => (TAU * pos).cos(),
            _ => pos.cos(),
        }
    }

    /// How many of this unit one rotation spans, when the unit is rotational.
    pub fn per_rotation(self) -> Option<f64> {
        match self {
            Units::Radians => Some(TAU),
            Units::Degrees => Some(360.0),
            Units::Rotations => Some(1.0),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopType {
    Position,
    Velocity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerType {
    Onboard,
    Talon,
    Spark,
}

/// Controller gain-unit presets. Each fixes the combination of max output,
/// update period, time-normalization, and typical measurement delay for a
/// supported controller/firmware pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GainPreset {
    Default,
    WpiLib2020,
    WpiLibPre2020,
    TalonFx,
    TalonSrx2020,
    TalonSrxPre2020,
    SparkMaxBrushless,
    SparkMaxBrushed,
}

/// The constants a preset pins down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresetSettings {
    pub max_controller_output: f64,
    pub period: f64,
    pub time_normalized: bool,
    pub controller: ControllerType,
    pub measurement_delay_ms: f64,
}

impl GainPreset {
    pub const ALL: [GainPreset; 8] = [
        GainPreset::Default,
        GainPreset::WpiLib2020,
        GainPreset::WpiLibPre2020,
        GainPreset::TalonFx,
        GainPreset::TalonSrx2020,
        GainPreset::TalonSrxPre2020,
        GainPreset::SparkMaxBrushless,
        GainPreset::SparkMaxBrushed,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GainPreset::Default => "Default",
            GainPreset::WpiLib2020 => "WPILib (2020-)",
            GainPreset::WpiLibPre2020 => "WPILib (Pre-2020)",
            GainPreset::TalonFx => "Talon FX",
            GainPreset::TalonSrx2020 => "Talon SRX (2020-)",
            GainPreset::TalonSrxPre2020 => "Talon SRX (Pre-2020)",
            GainPreset::SparkMaxBrushless => "Spark MAX (brushless)",
            GainPreset::SparkMaxBrushed => "Spark MAX (brushed)",
        }
    }

    pub fn from_name(name: &str) -> Option<GainPreset> {
        GainPreset::ALL.iter().copied().find(|p| p.name() == name)
    }

    /// Offboard controllers report gains in native encoder units.
    pub fn converts_gains(self) -> bool {
        !matches!(
            self.settings(LoopType::Velocity).controller,
            ControllerType::Onboard
        )
    }

    /// The delay figures come from the moving-average velocity filters in the
    /// respective firmwares: an N-tap FIR delays its output by (N-1)/2 taps,
    /// with 1 tap per ms. Position loops read the encoder directly, so the
    /// delay only applies to velocity control.
    pub fn settings(self, loop_type: LoopType) -> PresetSettings {
        let delay = |ms: f64| -> f64 {
            if loop_type == LoopType::Position {
                0.0
            } else {
                ms
            }
        };
        match self {
            GainPreset::Default | GainPreset::WpiLib2020 => PresetSettings {
                max_controller_output: 12.0,
                period: 0.02,
                time_normalized: true,
                controller: ControllerType::Onboard,
                measurement_delay_ms: delay(0.0),
            },
            GainPreset::WpiLibPre2020 => PresetSettings {
                max_controller_output: 1.0,
                period: 0.05,
                time_normalized: false,
                controller: ControllerType::Onboard,
                measurement_delay_ms: delay(0.0),
            },
            // 100 ms velocity sampling period plus a 64-tap FIR:
            // 100/2 + (64-1)/2 = 81.5 ms.
            GainPreset::TalonFx | GainPreset::TalonSrx2020 => PresetSettings {
                max_controller_output: 1.0,
                period: 0.001,
                time_normalized: true,
                controller: ControllerType::Talon,
                measurement_delay_ms: delay(81.5),
            },
            GainPreset::TalonSrxPre2020 => PresetSettings {
                max_controller_output: 1023.0,
                period: 0.001,
                time_normalized: false,
                controller: ControllerType::Talon,
                measurement_delay_ms: delay(81.5),
            },
            // 40-tap filter: (40-1)/2 = 19.5 ms.
            GainPreset::SparkMaxBrushless => PresetSettings {
                max_controller_output: 1.0,
                period: 0.001,
                time_normalized: false,
                controller: ControllerType::Spark,
                measurement_delay_ms: delay(19.5),
            },
            // 64-tap filter: (64-1)/2 = 31.5 ms.
            GainPreset::SparkMaxBrushed => PresetSettings {
                max_controller_output: 1.0,
                period: 0.001,
                time_normalized: false,
                controller: ControllerType::Spark,
                measurement_delay_ms: delay(31.5),
            },
        }
    }
}

/// Knobs for the data-preparation half of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSettings {
    /// Secant window for the acceleration derivative, in samples.
    pub window_size: usize,
    /// Minimum |velocity| for a quasistatic sample to count as motion.
    pub motion_threshold: f64,
    pub units: Units,
    /// Units traveled per rotation of the output shaft.
    pub units_per_rotation: f64,
}

impl AnalysisSettings {
    pub fn new(units: Units, units_per_rotation: f64) -> Self {
        AnalysisSettings {
            window_size: DEFAULT_WINDOW_SIZE,
            motion_threshold: DEFAULT_MOTION_THRESHOLD,
            units,
            units_per_rotation,
        }
    }
}

/// Knobs for the gain-synthesis half of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackSettings {
    pub loop_type: LoopType,
    /// Max acceptable position error (units).
    pub qp: f64,
    /// Max acceptable velocity error (units/s).
    pub qv: f64,
    /// Max acceptable control effort (V).
    pub max_effort: f64,
    pub period: f64,
    /// When a follower controller runs the loop, its period replaces
    /// `period` in the discretization.
    pub follower_period: Option<f64>,
    pub max_controller_output: f64,
    pub time_normalized: bool,
    pub controller: ControllerType,
    pub measurement_delay_ms: f64,
    /// Post-encoder gearing, for native-unit conversion.
    pub gearing: f64,
    /// Encoder edges per rotation, for native-unit conversion.
    pub encoder_epr: u32,
    /// Convert kP/kD into controller-native units.
    pub convert_gains: bool,
}

impl FeedbackSettings {
    pub fn from_preset(preset: GainPreset, loop_type: LoopType) -> Self {
        let ps = preset.settings(loop_type);
        FeedbackSettings {
            loop_type,
            qp: 1.0,
            qv: 1.5,
            max_effort: 7.0,
            period: ps.period,
            follower_period: None,
            max_controller_output: ps.max_controller_output,
            time_normalized: ps.time_normalized,
            controller: ps.controller,
            measurement_delay_ms: ps.measurement_delay_ms,
            gearing: 1.0,
            encoder_epr: 4096,
            convert_gains: preset.converts_gains(),
        }
    }

    /// Period the discrete plant is sampled at.
    pub fn effective_period(&self) -> f64 {
        self.follower_period.unwrap_or(self.period)
    }
}
