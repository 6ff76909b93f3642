use dotenv::dotenv;
use log::{error, info};
use std::env;

use meta_age_regression::services::aggregate::resample_yearly_mean;
use meta_age_regression::{AnalysisConfig, PriceSource, YahooChartSource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();
    let config = AnalysisConfig::from_env()?;

    let ticker = env::args().nth(1).unwrap_or_else(|| config.market_ticker.clone());
    info!("Testing Yahoo Finance daily history for {}...", ticker);

    let source = YahooChartSource::new(config.use_adjusted_close)?;
    let series = match source.daily_closes(&ticker, config.start, config.end).await {
        Ok(series) => series,
        Err(e) => {
            error!("ERROR: Failed to fetch {}: {}", ticker, e);
            return Err(e.into());
        }
    };
    info!("SUCCESS: {} daily closes for {}", series.points.len(), ticker);

    for record in resample_yearly_mean(&series) {
        println!("{}\t{:.4}", record.year, record.mean_close);
    }
    Ok(())
}
