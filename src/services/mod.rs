// src/services/mod.rs
pub mod age_curve;
pub mod aggregate;
pub mod chart;
pub mod market_data;
pub mod merge;
pub mod pipeline;
pub mod regression;
pub mod report;
