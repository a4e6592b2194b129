//! Treasury Dashboard runtime
//!
//! Loads treasury assets and token supply from the subgraph, back to
//! EARLIEST_DATE, and prints the chart rows plus chart descriptors as JSON.
//!
//! Usage:
//!   cargo run --release --bin treasury_dashboard > dashboard.json
//!
//! Environment variables:
//!   SUBGRAPH_URL - Subgraph deployment URL (required)
//!   EARLIEST_DATE - Oldest date to load, YYYY-MM-DD (unset: idle)
//!   PAGE_DAYS - Days per query window (default: 14)
//!   RECORD_COUNT - Records per query window (default: 1000)
//!   LIQUID_BACKING - Plot liquid backing instead of market value (default: false)

use dotenv::dotenv;
use log::{error, info};
use serde_json::{json, Map};
use treasury_dashboard::{
    config::DashboardConfig,
    explorer::build_explorer_url,
    metrics::{
        headline_total, token_supply_chart, token_supply_metrics, treasury_asset_metrics, treasury_assets_chart,
    },
    records::{AssetRecord, SupplyRecord},
    series::{SeriesLoader, SeriesState},
    subgraph::{SubgraphClient, SubgraphEntity},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = match DashboardConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("❌ Invalid configuration: {}", e);
            return Err(e.into());
        }
    };

    info!("🚀 Starting Treasury Dashboard...");
    info!("   ├─ Subgraph: {}", config.subgraph_url);
    info!("   ├─ Window: {} days / {} records", config.page_days, config.record_count);
    info!("   └─ Liquid backing: {}", config.liquid_backing);

    let Some(earliest_date) = config.earliest_date.as_deref() else {
        info!("⚠️  EARLIEST_DATE not set, nothing to load");
        return Ok(());
    };

    let client = SubgraphClient::new(&config.subgraph_url, config.request_timeout_secs)?;

    let mut assets = SeriesLoader::new(
        client.clone(),
        SeriesState::<AssetRecord>::new(
            "TreasuryAssetsGraph",
            treasury_asset_metrics()?,
            config.page_days,
            config.record_count,
            Map::new(),
        ),
    );
    let mut supply = SeriesLoader::new(
        client.clone(),
        SeriesState::<SupplyRecord>::new(
            "OhmSupply",
            token_supply_metrics()?,
            config.page_days,
            config.record_count,
            Map::new(),
        ),
    );

    // Each series keeps one page in flight; the two series load side by side
    let (asset_rows, supply_rows) = tokio::join!(assets.load(Some(earliest_date)), supply.load(Some(earliest_date)));
    let asset_rows = asset_rows?;
    let supply_rows = supply_rows?;

    info!("✅ Loaded {} asset dates, {} supply dates", asset_rows.len(), supply_rows.len());

    let assets_explorer_url = build_explorer_url::<()>(AssetRecord::QUERY, client.subgraph_url(), None)?;
    let supply_explorer_url = build_explorer_url::<()>(SupplyRecord::QUERY, client.subgraph_url(), None)?;

    let output = json!({
        "earliestDate": earliest_date,
        "treasuryAssets": {
            "chart": treasury_assets_chart(config.liquid_backing),
            "headlineTotal": headline_total(asset_rows, config.liquid_backing),
            "queryExplorerUrl": assets_explorer_url,
            "rows": asset_rows,
        },
        "ohmSupply": {
            "chart": token_supply_chart(),
            "queryExplorerUrl": supply_explorer_url,
            "rows": supply_rows,
        },
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
