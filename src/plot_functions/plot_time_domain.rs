// src/plot_functions/plot_time_domain.rs

use ndarray::Array1;
use ndarray_stats::QuantileExt;
use std::error::Error;

use crate::constants::{COLOR_DYNAMIC, COLOR_QUASISTATIC};
use crate::data_analysis::prepare::SubsetData;
use crate::plot_framework::{calculate_range, draw_panel_grid, PanelConfig, PlotSeries};

fn panel(
    time: &Array1<f64>,
    values: &Array1<f64>,
    title: &str,
    y_label: &str,
    color: plotters::style::RGBColor,
    series_label: &str,
) -> Result<Option<PanelConfig>, Box<dyn Error>> {
    if time.is_empty() {
        return Ok(None);
    }
    let (x_lo, x_hi) = calculate_range(*time.min()?, *time.max()?);
    let (y_lo, y_hi) = calculate_range(*values.min()?, *values.max()?);
    let data: Vec<(f64, f64)> = time.iter().copied().zip(values.iter().copied()).collect();
    Ok(Some(PanelConfig {
        title: title.to_string(),
        x_range: x_lo..x_hi,
        y_range: y_lo..y_hi,
        scatter: vec![PlotSeries {
            data,
            label: series_label.to_string(),
            color,
        }],
        lines: Vec::new(),
        x_label: "Time (s)".to_string(),
        y_label: y_label.to_string(),
    }))
}

/// Generates the stacked time-domain diagnostic plot: velocity and
/// acceleration traces for the quasistatic and step runs of one subset.
/// Discontinuities in the traces expose encoder glitches and badly chosen
/// window sizes before they poison the fit.
pub fn plot_time_domain(
    data: &SubsetData,
    subset_name: &str,
    root_name: &str,
) -> Result<(), Box<dyn Error>> {
    let output_file = format!("{root_name}_TimeDomain.png");
    let qu = &data.quasistatic;
    let dy = &data.dynamic;

    let panels = vec![
        panel(
            &qu.time,
            &qu.velocity,
            "Quasistatic Velocity",
            "Velocity (units/s)",
            COLOR_QUASISTATIC,
            "quasistatic",
        )?,
        panel(
            &qu.time,
            &qu.acceleration,
            "Quasistatic Acceleration",
            "Acceleration (units/s^2)",
            COLOR_QUASISTATIC,
            "quasistatic",
        )?,
        panel(
            &dy.time,
            &dy.velocity,
            "Dynamic Velocity",
            "Velocity (units/s)",
            COLOR_DYNAMIC,
            "dynamic",
        )?,
        panel(
            &dy.time,
            &dy.acceleration,
            "Dynamic Acceleration",
            "Acceleration (units/s^2)",
            COLOR_DYNAMIC,
            "dynamic",
        )?,
    ];

    draw_panel_grid(
        &output_file,
        &format!("Time Domain: {subset_name}"),
        2,
        2,
        &panels,
    )
}
