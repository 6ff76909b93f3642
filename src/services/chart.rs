// src/services/chart.rs
use log::{info, warn};
use plotters::prelude::*;
use std::path::Path;

use crate::error::{AnalysisError, Result};
use crate::models::MergedRecord;

const AGE_COLOR: RGBColor = RGBColor(31, 119, 180);
const PRICE_COLOR: RGBColor = RGBColor(44, 160, 44);

fn chart_err<E: std::fmt::Display>(e: E) -> AnalysisError {
    AnalysisError::Chart(e.to_string())
}

/// Pad a value range so flat or single-point series still get a visible axis.
fn padded_range<I: Iterator<Item = f64>>(values: I) -> std::ops::Range<f64> {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let pad = ((hi - lo) * 0.05).max(0.5);
    (lo - pad)..(hi + pad)
}

/// Years on the shared x axis, average age on the left axis and the target
/// close on the right axis. Written as SVG.
pub fn render_chart(records: &[MergedRecord], path: &Path, title: &str) -> Result<()> {
    if records.is_empty() {
        return Err(AnalysisError::EmptyJoin);
    }

    let years = padded_range(records.iter().map(|r| r.year as f64));
    let ages = padded_range(records.iter().map(|r| r.average_age));
    let prices = padded_range(records.iter().map(|r| r.close_meta));

    let root = SVGBackend::new(path, (1024, 640)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 18))
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .right_y_label_area_size(70)
        .build_cartesian_2d(years.clone(), ages)
        .map_err(chart_err)?
        .set_secondary_coord(years, prices);

    chart
        .configure_mesh()
        .x_desc("Year")
        .y_desc("Average Age")
        .x_label_formatter(&|x| format!("{:.0}", x))
        .axis_desc_style(("sans-serif", 15).into_font().color(&AGE_COLOR))
        .draw()
        .map_err(chart_err)?;

    chart
        .configure_secondary_axes()
        .y_desc("Meta Stock Price")
        .axis_desc_style(("sans-serif", 15).into_font().color(&PRICE_COLOR))
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(LineSeries::new(
            records.iter().map(|r| (r.year as f64, r.average_age)),
            AGE_COLOR.stroke_width(2),
        ))
        .map_err(chart_err)?
        .label("Average Age")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], AGE_COLOR));

    chart
        .draw_secondary_series(LineSeries::new(
            records.iter().map(|r| (r.year as f64, r.close_meta)),
            PRICE_COLOR.stroke_width(2),
        ))
        .map_err(chart_err)?
        .label("Meta Stock Price")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], PRICE_COLOR));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperMiddle)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    info!("Chart written to {}", path.display());
    Ok(())
}

/// Hand the rendered chart to the system viewer.
pub fn display_chart(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(AnalysisError::Chart(format!("{} does not exist", path.display())));
    }
    info!("Opening {} in the system viewer", path.display());
    opener::open(path).map_err(|e| {
        warn!("Could not open {}: {}", path.display(), e);
        chart_err(e)
    })
}
