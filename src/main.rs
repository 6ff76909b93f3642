use anyhow::Context;
use dotenv::dotenv;
use log::{error, info};

use meta_age_regression::{run, AnalysisConfig, YahooChartSource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();
    info!("Logger initialized. Starting the analysis...");

    let config = AnalysisConfig::from_env().context("failed to load configuration")?;
    let source = YahooChartSource::new(config.use_adjusted_close)?;

    match run(&config, &source).await {
        Ok(outcome) => {
            info!(
                "Regressed {} on {} years of data",
                outcome.fit.dep_name, outcome.fit.nobs
            );
            Ok(())
        }
        Err(e) => {
            error!("Analysis failed: {}", e);
            Err(e.into())
        }
    }
}
