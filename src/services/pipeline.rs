// src/services/pipeline.rs
use log::{info, warn};

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::models::{MergedRecord, YearlyAgeRecord, YearlyPriceRecord};
use crate::services::age_curve::generate_age_curve;
use crate::services::aggregate::resample_yearly_mean;
use crate::services::chart::{display_chart, render_chart};
use crate::services::market_data::PriceSource;
use crate::services::merge::merge_by_year;
use crate::services::regression::{fit_merged, RegressionResult};
use crate::services::report::format_summary;

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub ages: Vec<YearlyAgeRecord>,
    pub target_yearly: Vec<YearlyPriceRecord>,
    pub market_yearly: Vec<YearlyPriceRecord>,
    pub merged: Vec<MergedRecord>,
    pub fit: RegressionResult,
}

async fn fetch_yearly<S>(source: &S, ticker: &str, config: &AnalysisConfig) -> Result<Vec<YearlyPriceRecord>>
where
    S: PriceSource + ?Sized,
{
    let series = source.daily_closes(ticker, config.start, config.end).await?;
    if series.is_empty() {
        warn!("No trading days for {} between {} and {}", ticker, config.start, config.end);
    }
    Ok(resample_yearly_mean(&series))
}

/// Generate, fetch, resample, merge and fit. No output side effects.
pub async fn run_analysis<S>(config: &AnalysisConfig, source: &S) -> Result<AnalysisOutcome>
where
    S: PriceSource + ?Sized,
{
    let ages = generate_age_curve(&config.age_curve);

    let target_yearly = fetch_yearly(source, &config.target_ticker, config).await?;
    let market_yearly = fetch_yearly(source, &config.market_ticker, config).await?;

    let merged = merge_by_year(&ages, &target_yearly, &market_yearly);
    let fit = fit_merged(&merged)?;

    Ok(AnalysisOutcome {
        ages,
        target_yearly,
        market_yearly,
        merged,
        fit,
    })
}

/// Full run: analysis, printed summary, chart rendered and shown.
pub async fn run<S>(config: &AnalysisConfig, source: &S) -> Result<AnalysisOutcome>
where
    S: PriceSource + ?Sized,
{
    let outcome = run_analysis(config, source).await?;

    println!("{}", format_summary(&outcome.fit));
    render_chart(&outcome.merged, &config.chart_path, &config.chart_title)?;
    if config.show_chart {
        display_chart(&config.chart_path)?;
    }

    info!("Analysis complete; chart at {}", config.chart_path.display());
    Ok(outcome)
}
