//! Subgraph GraphQL integration
//!
//! Fetches one page of flat records per request. Pagination is driven by the
//! caller resubmitting a new date window, the subgraph never returns a cursor.
//!
//! ## API Reference
//!
//! Endpoint: `{subgraph_url}/graphql` (POST)
//! Body: `{"query": ..., "variables": {"filter": {...}, "recordCount": N}, "operationName": ...}`
//! Returns: `{"data": {"tokenRecords": [...]}}` or `{"errors": [...]}`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use treasury_dashboard::pagination::Paginator;
//! use treasury_dashboard::records::AssetRecord;
//! use treasury_dashboard::subgraph::{RecordSource, SubgraphClient};
//!
//! # async fn run() -> treasury_dashboard::error::Result<()> {
//! let client = SubgraphClient::new("https://api.thegraph.com/subgraphs/id/Qm...", 10)?;
//! let paginator = Paginator::new("assets", "2024-01-01", 14, 1000, Default::default())?;
//! let variables = paginator.initial_window(chrono::Utc::now().date_naive());
//! let page: Vec<AssetRecord> = client.fetch_page(&variables).await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{DashboardError, Result};
use crate::pagination::QueryVariables;
use crate::records::{AssetRecord, SupplyRecord};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

pub const TOKEN_RECORDS_QUERY: &str = r#"
    query TokenRecords($recordCount: Int!, $startingRecord: Int = 0, $filter: TokenRecord_filter) {
  tokenRecords(
    first: $recordCount
    skip: $startingRecord
    where: $filter
    orderBy: date
    orderDirection: desc
  ) {
    id
    block
    category
    date
    isLiquid
    source
    token
    value
    valueExcludingOhm
  }
}
    "#;

pub const TOKEN_SUPPLIES_QUERY: &str = r#"
    query TokenSupplies($recordCount: Int!, $startingRecord: Int = 0, $filter: TokenSupply_filter) {
  tokenSupplies(
    first: $recordCount
    skip: $startingRecord
    where: $filter
    orderBy: date
    orderDirection: desc
  ) {
    id
    balance
    block
    date
    pool
    source
    supplyBalance
    token
    type
  }
}
    "#;

/// Binds a record type to the GraphQL document that fetches it
pub trait SubgraphEntity: DeserializeOwned {
    const OPERATION_NAME: &'static str;
    /// Field under `data` holding the record array
    const COLLECTION: &'static str;
    const QUERY: &'static str;
}

impl SubgraphEntity for AssetRecord {
    const OPERATION_NAME: &'static str = "TokenRecords";
    const COLLECTION: &'static str = "tokenRecords";
    const QUERY: &'static str = TOKEN_RECORDS_QUERY;
}

impl SubgraphEntity for SupplyRecord {
    const OPERATION_NAME: &'static str = "TokenSupplies";
    const COLLECTION: &'static str = "tokenSupplies";
    const QUERY: &'static str = TOKEN_SUPPLIES_QUERY;
}

/// Source of record pages for one series
///
/// Fetch failures are returned as-is; retrying is up to the implementation.
#[async_trait]
pub trait RecordSource<R>: Send + Sync {
    async fn fetch_page(&self, variables: &QueryVariables) -> Result<Vec<R>>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: &'a QueryVariables,
    operation_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<Map<String, Value>>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// Pull the record array for `R` out of a GraphQL response body
fn parse_page<R: SubgraphEntity>(body: GraphQlResponse) -> Result<Vec<R>> {
    if !body.errors.is_empty() {
        let messages: Vec<String> = body.errors.into_iter().map(|e| e.message).collect();
        return Err(DashboardError::GraphQl(messages.join("; ")));
    }

    let collection = body
        .data
        .and_then(|mut data| data.remove(R::COLLECTION))
        .ok_or_else(|| DashboardError::GraphQl(format!("response has no {}", R::COLLECTION)))?;

    Ok(serde_json::from_value(collection)?)
}

/// HTTP client for one subgraph deployment
#[derive(Debug, Clone)]
pub struct SubgraphClient {
    endpoint: String,
    client: reqwest::Client,
}

impl SubgraphClient {
    pub fn new(subgraph_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            endpoint: subgraph_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn subgraph_url(&self) -> &str {
        &self.endpoint
    }

    pub fn graphql_url(&self) -> String {
        format!("{}/graphql", self.endpoint)
    }
}

#[async_trait]
impl<R> RecordSource<R> for SubgraphClient
where
    R: SubgraphEntity + Send + 'static,
{
    async fn fetch_page(&self, variables: &QueryVariables) -> Result<Vec<R>> {
        let request = GraphQlRequest {
            query: R::QUERY,
            variables,
            operation_name: R::OPERATION_NAME,
        };

        let response = self.client.post(self.graphql_url()).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(DashboardError::Status(response.status()));
        }

        let body: GraphQlResponse = response.json().await?;
        let records = parse_page::<R>(body)?;

        log::debug!(
            "{}: {} records for {} to {}",
            R::OPERATION_NAME,
            records.len(),
            variables.filter.date_gte,
            variables.filter.date_lt
        );
        Ok(records)
    }
}
