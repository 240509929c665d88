// src/constants.rs

use plotters::style::RGBColor;

// Channel column indices inside each logged row. The data logger writes the
// same ten-column rows for every test type; single-sided mechanisms only
// populate the left-hand channels meaningfully.
pub const TIME_COL: usize = 0;
pub const BATTERY_COL: usize = 1;
pub const AUTOSPEED_COL: usize = 2;
pub const L_VOLTS_COL: usize = 3;
pub const R_VOLTS_COL: usize = 4;
pub const L_ENCODER_P_COL: usize = 5;
pub const R_ENCODER_P_COL: usize = 6;
pub const L_ENCODER_V_COL: usize = 7;
pub const R_ENCODER_V_COL: usize = 8;
pub const GYRO_ANGLE_COL: usize = 9;
pub const CHANNEL_COUNT: usize = 10;

// Default accel secant window, in samples (~160 ms at a 50 Hz logger).
pub const DEFAULT_WINDOW_SIZE: usize = 8;

// Default quasistatic motion threshold, in units/s.
pub const DEFAULT_MOTION_THRESHOLD: f64 = 0.2;

// Below this, acceleration is treated as requiring negligible voltage and the
// reduced-order gain model is used instead of dividing by kA.
pub const KA_DEGENERATE_THRESHOLD: f64 = 1e-7;

// Riccati recursion convergence settings.
pub const DARE_TOLERANCE: f64 = 1e-12;
pub const DARE_MAX_ITERATIONS: usize = 10_000;

// Nominal battery voltage the LQR gains are computed against; gains are
// rescaled from this to the controller's max output afterwards.
pub const NOMINAL_VOLTAGE: f64 = 12.0;

// Diagnostic plot dimensions.
pub const PLOT_WIDTH: u32 = 1920;
pub const PLOT_HEIGHT: u32 = 1080;

// Plot typography and styling.
pub const FONT_SIZE_MAIN_TITLE: u32 = 40;
pub const FONT_SIZE_CHART_TITLE: u32 = 24;
pub const FONT_SIZE_LEGEND: u32 = 18;
pub const SCATTER_POINT_SIZE: u32 = 2;
pub const LINE_WIDTH_FIT: u32 = 2;

pub const COLOR_QUASISTATIC: RGBColor = RGBColor(31, 119, 180);
pub const COLOR_DYNAMIC: RGBColor = RGBColor(255, 127, 14);
pub const COLOR_FIT_LINE: RGBColor = RGBColor(214, 39, 40);
