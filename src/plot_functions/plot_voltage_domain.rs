// src/plot_functions/plot_voltage_domain.rs

use std::error::Error;

use crate::constants::{COLOR_DYNAMIC, COLOR_FIT_LINE, COLOR_QUASISTATIC};
use crate::data_analysis::prepare::{PreparedSegment, SubsetData};
use crate::data_analysis::regression::{sign, FitResult};
use crate::plot_framework::{calculate_range, draw_panel_grid, PanelConfig, PlotSeries};

fn gravity_voltage(seg: &PreparedSegment, fit: &FitResult, i: usize) -> f64 {
    if let Some(kg) = fit.kg {
        return kg;
    }
    match (fit.kcos, &seg.cosine) {
        (Some(kcos), Some(cos)) => kcos * cos[i],
        _ => 0.0,
    }
}

/// Velocity against the voltage left over once every non-velocity term of the
/// fitted model is subtracted. A good fit collapses onto the kV line.
pub(crate) fn velocity_portion(seg: &PreparedSegment, fit: &FitResult) -> Vec<(f64, f64)> {
    (0..seg.len())
        .map(|i| {
            let residual = seg.voltage[i]
                - fit.ks * sign(seg.velocity[i])
                - fit.ka * seg.acceleration[i]
                - gravity_voltage(seg, fit, i);
            (seg.velocity[i], residual)
        })
        .collect()
}

/// Acceleration against the acceleration-portion voltage; collapses onto the
/// kA line for a good fit.
pub(crate) fn acceleration_portion(seg: &PreparedSegment, fit: &FitResult) -> Vec<(f64, f64)> {
    (0..seg.len())
        .map(|i| {
            let residual = seg.voltage[i]
                - fit.ks * sign(seg.velocity[i])
                - fit.kv * seg.velocity[i]
                - gravity_voltage(seg, fit, i);
            (seg.acceleration[i], residual)
        })
        .collect()
}

fn portion_panel(
    points: Vec<(f64, f64)>,
    slope: f64,
    title: &str,
    x_label: &str,
    point_color: plotters::style::RGBColor,
    point_label: &str,
    line_label: String,
) -> Option<PanelConfig> {
    if points.is_empty() {
        return None;
    }
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for &(x, y) in &points {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y.min(slope * x));
        y_max = y_max.max(y.max(slope * x));
    }
    let (x_lo, x_hi) = calculate_range(x_min, x_max);
    let (y_lo, y_hi) = calculate_range(y_min, y_max);
    let fit_line = vec![(x_min, slope * x_min), (x_max, slope * x_max)];
    Some(PanelConfig {
        title: title.to_string(),
        x_range: x_lo..x_hi,
        y_range: y_lo..y_hi,
        scatter: vec![PlotSeries {
            data: points,
            label: point_label.to_string(),
            color: point_color,
        }],
        lines: vec![PlotSeries {
            data: fit_line,
            label: line_label,
            color: COLOR_FIT_LINE,
        }],
        x_label: x_label.to_string(),
        y_label: "Voltage portion (V)".to_string(),
    })
}

/// Generates the voltage-domain diagnostic plot: the quasistatic points
/// against the kV line and the dynamic points against the kA line. Curvature
/// or offsets here mean the linear model is missing something physical.
pub fn plot_voltage_domain(
    data: &SubsetData,
    fit: &FitResult,
    subset_name: &str,
    root_name: &str,
) -> Result<(), Box<dyn Error>> {
    let output_file = format!("{root_name}_VoltageDomain.png");

    let panels = vec![
        portion_panel(
            velocity_portion(&data.quasistatic, fit),
            fit.kv,
            "Velocity portion",
            "Velocity (units/s)",
            COLOR_QUASISTATIC,
            "quasistatic",
            format!("kV = {:.4}", fit.kv),
        ),
        portion_panel(
            acceleration_portion(&data.dynamic, fit),
            fit.ka,
            "Acceleration portion",
            "Acceleration (units/s^2)",
            COLOR_DYNAMIC,
            "dynamic",
            format!("kA = {:.4}", fit.ka),
        ),
    ];

    draw_panel_grid(
        &output_file,
        &format!("Voltage Domain: {subset_name} (R^2 = {:.4})", fit.r_squared),
        1,
        2,
        &panels,
    )
}
