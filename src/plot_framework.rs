// src/plot_framework.rs

use plotters::backend::BitMapBackend;
use plotters::chart::{ChartBuilder, SeriesLabelPosition};
use plotters::drawing::IntoDrawingArea;
use plotters::element::{Circle, PathElement};
use plotters::series::LineSeries;
use plotters::style::colors::{BLACK, WHITE};
use plotters::style::{Color, IntoFont, RGBColor};

use std::error::Error;
use std::ops::Range;

use crate::constants::{
    FONT_SIZE_CHART_TITLE, FONT_SIZE_LEGEND, FONT_SIZE_MAIN_TITLE, LINE_WIDTH_FIT, PLOT_HEIGHT,
    PLOT_WIDTH, SCATTER_POINT_SIZE,
};

/// Calculate plot range with padding.
/// Adds 15% padding, or a fixed padding for degenerate ranges.
pub fn calculate_range(min_val: f64, max_val: f64) -> (f64, f64) {
    let (min, max) = if min_val <= max_val {
        (min_val, max_val)
    } else {
        (max_val, min_val)
    };
    let range = (max - min).abs();
    let padding = if range < 1e-6 { 0.5 } else { range * 0.15 };
    (min - padding, max + padding)
}

#[derive(Clone)]
pub struct PlotSeries {
    pub data: Vec<(f64, f64)>,
    pub label: String,
    pub color: RGBColor,
}

#[derive(Clone)]
pub struct PanelConfig {
    pub title: String,
    pub x_range: Range<f64>,
    pub y_range: Range<f64>,
    /// Point-cloud series, drawn as filled circles.
    pub scatter: Vec<PlotSeries>,
    /// Overlay series, drawn as lines (fitted models).
    pub lines: Vec<PlotSeries>,
    pub x_label: String,
    pub y_label: String,
}

/// Render a grid of panels to one PNG. `panels` is row-major; a `None` entry
/// leaves its cell blank.
pub fn draw_panel_grid(
    output_file: &str,
    main_title: &str,
    rows: usize,
    cols: usize,
    panels: &[Option<PanelConfig>],
) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(output_file, (PLOT_WIDTH, PLOT_HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;
    let titled = root.titled(main_title, ("sans-serif", FONT_SIZE_MAIN_TITLE).into_font())?;
    let areas = titled.split_evenly((rows, cols));

    for (area, panel) in areas.iter().zip(panels) {
        let Some(panel) = panel else { continue };
        let mut chart = ChartBuilder::on(area)
            .caption(&panel.title, ("sans-serif", FONT_SIZE_CHART_TITLE))
            .margin(10)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(panel.x_range.clone(), panel.y_range.clone())?;

        chart
            .configure_mesh()
            .x_desc(&panel.x_label)
            .y_desc(&panel.y_label)
            .draw()?;

        for series in &panel.scatter {
            let color = series.color;
            chart
                .draw_series(
                    series
                        .data
                        .iter()
                        .map(|&(x, y)| Circle::new((x, y), SCATTER_POINT_SIZE, color.filled())),
                )?
                .label(&series.label)
                .legend(move |(x, y)| Circle::new((x + 10, y), SCATTER_POINT_SIZE + 1, color.filled()));
        }
        for series in &panel.lines {
            let color = series.color;
            chart
                .draw_series(LineSeries::new(
                    series.data.iter().copied(),
                    color.stroke_width(LINE_WIDTH_FIT),
                ))?
                .label(&series.label)
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(LINE_WIDTH_FIT))
                });
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .label_font(("sans-serif", FONT_SIZE_LEGEND))
            .draw()?;
    }

    root.present()?;
    println!("  Plot saved: {output_file}");
    Ok(())
}
