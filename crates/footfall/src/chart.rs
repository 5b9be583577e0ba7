//! Line chart rendering for a store's series.
//!
//! Draws into an SVG string with plotters. Missing days break the line
//! into separate segments so a gap never reads as zero traffic.

use anyhow::Result;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::FontStyle;

use crate::types::StoreChart;

const LINE_COLOR: RGBColor = RGBColor(255, 127, 14);
const MARKER_COLOR: RGBColor = RGBColor(31, 119, 180);
const TEXT_COLOR: RGBColor = RGBColor(50, 50, 50);
const GRID_COLOR: RGBColor = RGBColor(230, 230, 230);

/// Size and spacing of a rendered chart, in pixels
#[derive(Clone, Debug)]
pub struct ChartOptions {
    pub width: u32,
    pub height: u32,
    pub margin: u32,

    /// Room under the plot for day ticks and month names
    pub x_label_area: u32,

    pub y_label_area: u32,

    /// Number of labelled gridlines on the y-axis
    pub y_labels: usize,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 900,
            height: 360,
            margin: 16,
            x_label_area: 48,
            y_label_area: 56,
            y_labels: 5,
        }
    }
}

/// Render one store chart as a standalone SVG document
pub fn render_svg(chart: &StoreChart, options: &ChartOptions) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE)?;

        let n = chart.points.len().max(1);
        let x_range = -0.5..(n as f64 - 0.5);
        let y_max = chart.peak().map_or(1.0, |peak| f64::from(peak) * 1.1).max(1.0);

        let mut ctx = ChartBuilder::on(&root)
            .margin(options.margin)
            .x_label_area_size(options.x_label_area)
            .y_label_area_size(options.y_label_area)
            .build_cartesian_2d(x_range, 0.0..y_max)?;

        ctx.configure_mesh()
            .disable_x_mesh()
            .x_labels(0)
            .y_labels(options.y_labels)
            .y_label_formatter(&|v| format!("{:.0}", v))
            .light_line_style(GRID_COLOR)
            .label_style(("sans-serif", 11).into_font().color(&TEXT_COLOR))
            .draw()?;

        for segment in segments(chart) {
            ctx.draw_series(LineSeries::new(segment, LINE_COLOR.stroke_width(2)))?;
        }

        ctx.draw_series(chart.points.iter().enumerate().filter_map(|(i, p)| {
            p.count
                .map(|count| Circle::new((i as f64, f64::from(count)), 3, MARKER_COLOR.filled()))
        }))?;

        // Day ticks and month names are placed in backend pixels under the plot
        let tick_pos = Pos::new(HPos::Center, VPos::Top);
        for (i, label) in chart.labels.iter().enumerate() {
            let (x, y) = ctx.backend_coord(&(i as f64, 0.0));
            let font = if label.emphasized {
                ("sans-serif", 11).into_font().style(FontStyle::Bold)
            } else {
                ("sans-serif", 11).into_font()
            };
            root.draw(&Text::new(
                label.text.as_str(),
                (x, y + 6),
                font.color(&TEXT_COLOR).pos(tick_pos),
            ))?;
        }

        for month in &chart.months {
            let Some(i) = chart.labels.iter().position(|l| l.date == month.anchor_date) else {
                continue;
            };
            let (x, y) = ctx.backend_coord(&(i as f64, 0.0));
            root.draw(&Text::new(
                month.text.as_str(),
                (x, y + 24),
                ("sans-serif", 13)
                    .into_font()
                    .color(&TEXT_COLOR)
                    .pos(tick_pos),
            ))?;
        }

        root.present()?;
    }
    Ok(svg)
}

/// Runs of consecutive days with data, as (day index, count) points
fn segments(chart: &StoreChart) -> Vec<Vec<(f64, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (i, point) in chart.points.iter().enumerate() {
        match point.count {
            Some(count) => current.push((i as f64, f64::from(count))),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}
