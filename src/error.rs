// src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to fetch price history for {ticker}: {reason}")]
    Fetch { ticker: String, reason: String },

    #[error("merged dataset is empty; no year is shared by the age curve and both price series")]
    EmptyJoin,

    #[error("design matrix is singular (rank {rank} of {columns} columns)")]
    SingularMatrix { rank: usize, columns: usize },

    #[error("{observations} observations leave no residual degrees of freedom for {parameters} parameters")]
    InsufficientDegreesOfFreedom { observations: usize, parameters: usize },

    #[error("regressor '{column}' has {found} values, expected {expected}")]
    DimensionMismatch { column: String, expected: usize, found: usize },

    #[error("chart rendering failed: {0}")]
    Chart(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl AnalysisError {
    pub fn fetch(ticker: impl Into<String>, reason: impl ToString) -> Self {
        AnalysisError::Fetch {
            ticker: ticker.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
