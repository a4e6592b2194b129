//! Crate-wide error type

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("Metric '{metric}' references unknown metric '{reference}'")]
    UnknownMetric { metric: String, reference: String },

    #[error("Metric '{0}' is declared more than once")]
    DuplicateMetric(String),

    #[error("Subgraph request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Subgraph API error: {0}")]
    Status(reqwest::StatusCode),

    #[error("Subgraph returned errors: {0}")]
    GraphQl(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
