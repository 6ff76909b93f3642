// src/services/aggregate.rs
use chrono::Datelike;
use log::debug;
use std::collections::BTreeMap;

use crate::models::{PriceSeries, YearlyPriceRecord};

/// Year-end anchored resample: one mean close per calendar year that has at
/// least one trading day.
pub fn resample_yearly_mean(series: &PriceSeries) -> Vec<YearlyPriceRecord> {
    let mut buckets: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
    for point in &series.points {
        let entry = buckets.entry(point.date.year()).or_insert((0.0, 0));
        entry.0 += point.close;
        entry.1 += 1;
    }

    let yearly: Vec<YearlyPriceRecord> = buckets
        .into_iter()
        .map(|(year, (sum, count))| YearlyPriceRecord {
            year,
            mean_close: sum / count as f64,
        })
        .collect();

    debug!(
        "Resampled {} daily closes for {} into {} years",
        series.points.len(),
        series.ticker,
        yearly.len()
    );
    yearly
}
