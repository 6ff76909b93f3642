// src/config.rs
use chrono::NaiveDate;
use log::info;
use std::env;
use std::path::PathBuf;

use crate::error::{AnalysisError, Result};
use crate::services::age_curve::AgeCurveParams;

pub const CHART_TITLE: &str =
    "Relationship between Average Age of Social Media Adoption, Market Trends, and Meta Stock Price";

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Ticker regressed on the age curve and the market index.
    pub target_ticker: String,
    pub market_ticker: String,
    /// Inclusive.
    pub start: NaiveDate,
    /// Exclusive.
    pub end: NaiveDate,
    pub use_adjusted_close: bool,
    pub age_curve: AgeCurveParams,
    pub chart_path: PathBuf,
    pub chart_title: String,
    /// Open the rendered chart in the system viewer after writing it.
    pub show_chart: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            target_ticker: "META".to_string(),
            market_ticker: "^GSPC".to_string(),
            start: NaiveDate::from_ymd_opt(2010, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            use_adjusted_close: true,
            age_curve: AgeCurveParams::default(),
            chart_path: PathBuf::from("meta_age_regression.svg"),
            chart_title: CHART_TITLE.to_string(),
            show_chart: true,
        }
    }
}

impl AnalysisConfig {
    /// Defaults overridden by the process environment. Binaries load `.env`
    /// before calling this.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AnalysisConfig::default();

        if let Some(ticker) = non_empty(lookup("TARGET_TICKER")) {
            config.target_ticker = ticker;
        }
        if let Some(ticker) = non_empty(lookup("MARKET_TICKER")) {
            config.market_ticker = ticker;
        }
        if let Some(raw) = non_empty(lookup("ANALYSIS_START")) {
            config.start = parse_date("ANALYSIS_START", &raw)?;
        }
        if let Some(raw) = non_empty(lookup("ANALYSIS_END")) {
            config.end = parse_date("ANALYSIS_END", &raw)?;
        }
        if let Some(path) = non_empty(lookup("CHART_PATH")) {
            config.chart_path = PathBuf::from(path);
        }
        if let Some(raw) = non_empty(lookup("USE_ADJUSTED_CLOSE")) {
            config.use_adjusted_close = parse_flag("USE_ADJUSTED_CLOSE", &raw)?;
        }
        if let Some(raw) = non_empty(lookup("SHOW_CHART")) {
            config.show_chart = parse_flag("SHOW_CHART", &raw)?;
        }

        if config.start >= config.end {
            return Err(AnalysisError::Config(format!(
                "start date {} must be before end date {}",
                config.start, config.end
            )));
        }

        info!(
            "Analysis config: {} vs {} from {} to {} (adjusted close: {})",
            config.target_ticker, config.market_ticker, config.start, config.end, config.use_adjusted_close
        );
        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    raw.parse::<bool>()
        .map_err(|_| AnalysisError::Config(format!("{} must be true or false, got '{}'", key, raw)))
}

fn parse_date(key: &str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| AnalysisError::Config(format!("{} must be YYYY-MM-DD, got '{}': {}", key, raw, e)))
}
