//! Treasury asset and token supply metric catalogues
//!
//! Also holds the chart descriptors handed to the rendering side: which
//! metrics are plotted, their display labels and colours.

use crate::aggregate::{AggregateRow, MetricSet, Predicate};
use crate::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;

pub const CATEGORY_STABLE: &str = "Stable";
pub const CATEGORY_VOLATILE: &str = "Volatile";
pub const CATEGORY_POL: &str = "Protocol-Owned Liquidity";

pub const TOKEN_SUPPLY_TYPE_TOTAL_SUPPLY: &str = "Total Supply";
pub const TOKEN_SUPPLY_TYPE_TREASURY: &str = "Treasury";
pub const TOKEN_SUPPLY_TYPE_OFFSET: &str = "Manual Offset";
pub const TOKEN_SUPPLY_TYPE_LIQUIDITY: &str = "Liquidity";

pub const DEFAULT_COLORS: [&str; 4] = ["#FFBF00", "#708090", "#5C9BD5", "#BEBEBE"];

/// Market value and liquid backing per category
pub fn treasury_asset_metrics() -> Result<MetricSet> {
    MetricSet::builder()
        .sum("marketStable", Predicate::category(CATEGORY_STABLE))
        .sum("marketVolatile", Predicate::category(CATEGORY_VOLATILE))
        .sum("marketPol", Predicate::category(CATEGORY_POL))
        .composite("marketTotal", &["marketStable", "marketVolatile", "marketPol"])
        .sum("liquidStable", Predicate::liquid_category(CATEGORY_STABLE))
        .sum("liquidVolatile", Predicate::liquid_category(CATEGORY_VOLATILE))
        .sum("liquidPol", Predicate::liquid_category(CATEGORY_POL))
        .composite("liquidTotal", &["liquidStable", "liquidVolatile", "liquidPol"])
        .build()
}

/// Total, circulating and floating supply, plus their share of total supply
///
/// Treasury, offset and liquidity records carry negative balances, so
/// circulating and floating supply are plain sums over wider type sets.
pub fn token_supply_metrics() -> Result<MetricSet> {
    MetricSet::builder()
        .sum("totalSupply", Predicate::category(TOKEN_SUPPLY_TYPE_TOTAL_SUPPLY))
        .sum(
            "circulatingSupply",
            Predicate::category_in(&[
                TOKEN_SUPPLY_TYPE_TOTAL_SUPPLY,
                TOKEN_SUPPLY_TYPE_TREASURY,
                TOKEN_SUPPLY_TYPE_OFFSET,
            ]),
        )
        .sum(
            "floatingSupply",
            Predicate::category_in(&[
                TOKEN_SUPPLY_TYPE_TOTAL_SUPPLY,
                TOKEN_SUPPLY_TYPE_TREASURY,
                TOKEN_SUPPLY_TYPE_OFFSET,
                TOKEN_SUPPLY_TYPE_LIQUIDITY,
            ]),
        )
        .constant("totalSupplyPercentage", 100.0)
        .percentage("circulatingSupplyPercentage", "circulatingSupply", "totalSupply")
        .percentage("floatingSupplyPercentage", "floatingSupply", "totalSupply")
        .build()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Currency,
    Percentage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartType {
    /// Stacked areas with line overlays
    Composed,
    MultiLine,
}

const MARKET_VALUE_TOOLTIP: &str = "Market Value of Treasury Assets is the sum of the value (in dollars) of all \
assets held by the treasury (excluding pTokens).";

const LIQUID_BACKING_TOOLTIP: &str = "Liquid backing is the dollar amount of stablecoins, volatile assets and \
protocol-owned liquidity in the treasury, excluding OHM. This excludes the value of any illiquid (vesting/locked) \
assets. It represents the budget the Treasury has for specific market operations which cannot use OHM (inverse \
bonds, some liquidity provision, OHM incentives, etc).";

const SUPPLY_TOOLTIP: &str = "This chart illustrates the amount of circulating and floating OHM, relative to the \
total supply. Circulating and floating supply are increased by normal bonds and decreased by inverse bonds.";

/// Everything the chart needs besides the rows
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    pub chart_type: ChartType,
    pub header: String,
    pub info_tooltip: String,
    pub data_format: DataFormat,
    pub data_keys: Vec<String>,
    pub labels: BTreeMap<String, String>,
    pub colors: BTreeMap<String, String>,
    /// Keys drawn as a line over the stacked areas
    pub composed_line_keys: Vec<String>,
}

impl ChartSpec {
    fn new(
        chart_type: ChartType,
        header: &str,
        info_tooltip: &str,
        data_format: DataFormat,
        keys_and_labels: &[(&str, &str)],
        line_keys: &[&str],
    ) -> Self {
        let data_keys: Vec<String> = keys_and_labels.iter().map(|(k, _)| k.to_string()).collect();
        let labels = keys_and_labels
            .iter()
            .map(|(k, l)| (k.to_string(), l.to_string()))
            .collect();
        let colors = data_keys
            .iter()
            .zip(DEFAULT_COLORS.iter().cycle())
            .map(|(k, c)| (k.clone(), c.to_string()))
            .collect();

        Self {
            chart_type,
            header: header.to_string(),
            info_tooltip: info_tooltip.to_string(),
            data_format,
            data_keys,
            labels,
            colors,
            composed_line_keys: line_keys.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Asset chart: liquid components against market value, or the reverse
pub fn treasury_assets_chart(liquid_backing: bool) -> ChartSpec {
    if liquid_backing {
        ChartSpec::new(
            ChartType::Composed,
            "Treasury Liquid Backing",
            LIQUID_BACKING_TOOLTIP,
            DataFormat::Currency,
            &[
                ("liquidStable", "Stablecoins"),
                ("liquidVolatile", "Volatile Assets"),
                ("liquidPol", "Protocol-Owned Liquidity"),
                ("marketTotal", "Market Value"),
            ],
            &["marketTotal"],
        )
    } else {
        ChartSpec::new(
            ChartType::Composed,
            "Market Value of Treasury Assets",
            MARKET_VALUE_TOOLTIP,
            DataFormat::Currency,
            &[
                ("marketStable", "Stablecoins"),
                ("marketVolatile", "Volatile Assets"),
                ("marketPol", "Protocol-Owned Liquidity"),
                ("liquidTotal", "Liquid Backing"),
            ],
            &["liquidTotal"],
        )
    }
}

pub fn token_supply_chart() -> ChartSpec {
    ChartSpec::new(
        ChartType::MultiLine,
        "OHM Supply",
        SUPPLY_TOOLTIP,
        DataFormat::Percentage,
        &[
            ("totalSupplyPercentage", "Total Supply"),
            ("circulatingSupplyPercentage", "Circulating Supply"),
            ("floatingSupplyPercentage", "Floating Supply"),
        ],
        &[],
    )
}

/// Latest liquid or market total, for the chart header
///
/// Rows are newest first.
pub fn headline_total(rows: &[AggregateRow], liquid_backing: bool) -> Option<f64> {
    let key = if liquid_backing { "liquidTotal" } else { "marketTotal" };
    rows.first().and_then(|row| row.get(key))
}
