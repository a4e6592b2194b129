//! Dashboard configuration from environment variables

use crate::error::{DashboardError, Result};
use crate::pagination::{DEFAULT_PAGE_DAYS, DEFAULT_RECORD_COUNT};
use crate::records::parse_date;
use std::env;

/// Configuration for the dashboard runtime
///
/// Loaded from environment variables (a `.env` file is honoured by the binary).
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Subgraph deployment URL, without the `/graphql` suffix
    pub subgraph_url: String,

    /// Earliest date to load; `None` keeps both series idle
    pub earliest_date: Option<String>,

    /// Lookback span of each query window in days
    pub page_days: i64,

    /// Record limit per query window
    pub record_count: u32,

    /// HTTP timeout per page request
    pub request_timeout_secs: u64,

    /// Plot liquid backing instead of market value
    pub liquid_backing: bool,
}

impl DashboardConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `SUBGRAPH_URL` (required, http:// or https://)
    /// - `EARLIEST_DATE` (optional, YYYY-MM-DD)
    /// - `PAGE_DAYS` (default: 14)
    /// - `RECORD_COUNT` (default: 1000)
    /// - `REQUEST_TIMEOUT_SECS` (default: 10)
    /// - `LIQUID_BACKING` (default: false)
    pub fn from_env() -> Result<Self> {
        let subgraph_url = env::var("SUBGRAPH_URL")
            .map_err(|_| DashboardError::MissingVariable("SUBGRAPH_URL".to_string()))?;

        if !subgraph_url.starts_with("http://") && !subgraph_url.starts_with("https://") {
            return Err(DashboardError::InvalidValue(
                "SUBGRAPH_URL must start with http:// or https://".to_string(),
            ));
        }

        let earliest_date = env::var("EARLIEST_DATE")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        if let Some(date) = &earliest_date {
            parse_date(date)?;
        }

        let page_days = env::var("PAGE_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PAGE_DAYS);

        if page_days <= 0 {
            return Err(DashboardError::InvalidValue(format!(
                "PAGE_DAYS must be positive, got {}",
                page_days
            )));
        }

        let record_count = env::var("RECORD_COUNT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RECORD_COUNT);

        let request_timeout_secs = env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        let liquid_backing = env::var("LIQUID_BACKING")
            .unwrap_or_else(|_| "false".to_string())
            .to_lowercase()
            .parse::<bool>()
            .unwrap_or(false);

        Ok(Self {
            subgraph_url,
            earliest_date,
            page_days,
            record_count,
            request_timeout_secs,
            liquid_backing,
        })
    }
}
