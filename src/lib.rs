//! # Treasury Dashboard
//!
//! Loads treasury asset and token supply records from a subgraph and turns
//! them into chart-ready, per-date aggregate rows.
//!
//! ## Architecture
//!
//! ```text
//! Paginator (date windows, newest → earliest_date)
//!     ↓
//! RecordSource::fetch_page (subgraph GraphQL)
//!     ↓
//! SeriesState (accumulate pages, drop stale generations)
//!     ↓
//! bucketize → aggregate(MetricSet)
//!     ↓
//! Vec<AggregateRow> + ChartSpec
//! ```
//!
//! ## Module Organization
//!
//! - `records` - Flat subgraph records and date helpers
//! - `pagination` - Query windows and the backward-walking paginator
//! - `bucket` - Group records by date
//! - `aggregate` - Declarative metric sets and per-date rows
//! - `metrics` - Treasury asset / token supply catalogues and chart descriptors
//! - `explorer` - Query-explorer deep links
//! - `subgraph` - GraphQL record source
//! - `series` - Pagination driver and cached rows per chart
//! - `config` - Environment configuration

pub mod aggregate;
pub mod bucket;
pub mod config;
pub mod error;
pub mod explorer;
pub mod metrics;
pub mod pagination;
pub mod records;
pub mod series;
pub mod subgraph;

pub use aggregate::{aggregate, AggregateRow, MetricSet, Predicate};
pub use bucket::{bucketize, DateBucket};
pub use config::DashboardConfig;
pub use error::{DashboardError, Result};
pub use pagination::{Paginator, QueryVariables, QueryWindow};
pub use records::{AssetRecord, FlatRecord, SupplyRecord};
pub use series::{SeriesLoader, SeriesState};
pub use subgraph::{RecordSource, SubgraphClient};
