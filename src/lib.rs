// src/lib.rs

pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use config::AnalysisConfig;
pub use error::{AnalysisError, Result};
pub use services::market_data::{PriceSource, YahooChartSource};
pub use services::pipeline::{run, run_analysis, AnalysisOutcome};
