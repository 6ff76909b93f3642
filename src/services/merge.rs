// src/services/merge.rs
use log::{info, warn};
use std::collections::BTreeMap;

use crate::models::{MergedRecord, YearlyAgeRecord, YearlyPriceRecord};

/// Inner join of the age curve with the target and market yearly prices.
/// Years missing from any input are dropped; output is ascending by year.
pub fn merge_by_year(
    ages: &[YearlyAgeRecord],
    target: &[YearlyPriceRecord],
    market: &[YearlyPriceRecord],
) -> Vec<MergedRecord> {
    let target_by_year: BTreeMap<i32, f64> = target.iter().map(|r| (r.year, r.mean_close)).collect();
    let market_by_year: BTreeMap<i32, f64> = market.iter().map(|r| (r.year, r.mean_close)).collect();

    let mut merged: Vec<MergedRecord> = ages
        .iter()
        .filter_map(|age| {
            let close_meta = *target_by_year.get(&age.year)?;
            let close_sp500 = *market_by_year.get(&age.year)?;
            Some(MergedRecord {
                year: age.year,
                average_age: age.average_age,
                close_meta,
                close_sp500,
            })
        })
        .collect();
    merged.sort_by_key(|r| r.year);
    debug_assert!(
        merged.windows(2).all(|w| w[0].year < w[1].year),
        "age curve contains duplicate years"
    );

    if merged.is_empty() {
        warn!("No year is shared by the age curve and both price series");
    } else {
        info!(
            "Merged {} years ({}-{})",
            merged.len(),
            merged[0].year,
            merged[merged.len() - 1].year
        );
    }
    merged
}
