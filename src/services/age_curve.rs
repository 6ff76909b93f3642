// src/services/age_curve.rs
use log::debug;

use crate::models::YearlyAgeRecord;

/// Shape of the modeled adoption-age curve: a logistic decline followed by a
/// linear recovery.
#[derive(Debug, Clone, PartialEq)]
pub struct AgeCurveParams {
    /// Starting age (the logistic ceiling).
    pub l: f64,
    /// Growth rate; negative values make the curve decline.
    pub k: f64,
    /// Midpoint year of the decline.
    pub x0: f64,
    pub first_year: i32,
    pub logistic_last_year: i32,
    pub last_year: i32,
    pub tail_start: f64,
    pub tail_end: f64,
}

impl Default for AgeCurveParams {
    fn default() -> Self {
        AgeCurveParams {
            l: 12.5,
            k: -0.5,
            x0: 2015.0,
            first_year: 2010,
            logistic_last_year: 2021,
            last_year: 2023,
            tail_start: 8.0,
            tail_end: 11.0,
        }
    }
}

pub fn logistic_age(year: f64, l: f64, k: f64, x0: f64) -> f64 {
    l / (1.0 + (k * (year - x0)).exp())
}

/// `count` evenly spaced values from `start` to `end` inclusive.
fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count).map(|i| start + step * i as f64).collect()
        }
    }
}

pub fn generate_age_curve(params: &AgeCurveParams) -> Vec<YearlyAgeRecord> {
    let logistic_end = params.logistic_last_year.min(params.last_year);

    let mut records: Vec<YearlyAgeRecord> = (params.first_year..=logistic_end)
        .map(|year| YearlyAgeRecord {
            year,
            average_age: logistic_age(year as f64, params.l, params.k, params.x0),
        })
        .collect();

    let tail_first = (logistic_end + 1).max(params.first_year);
    let tail_count = (params.last_year - tail_first + 1).max(0) as usize;
    let tail = linspace(params.tail_start, params.tail_end, tail_count);
    records.extend(
        (tail_first..=params.last_year)
            .zip(tail)
            .map(|(year, average_age)| YearlyAgeRecord { year, average_age }),
    );

    debug!(
        "Generated age curve for {}-{} ({} years)",
        params.first_year,
        params.last_year,
        records.len()
    );
    records
}
