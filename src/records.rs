//! Flat subgraph records and date helpers
//!
//! Both record kinds are point-in-time observations keyed by a day-granularity
//! ISO-8601 date string. The subgraph serialises BigDecimal/BigInt columns as
//! JSON strings, so numeric fields accept either a string or a number.

use crate::error::{DashboardError, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

/// Date format used by the subgraph and by query windows
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Common view over a flat record, used by bucketing, pagination and aggregation
pub trait FlatRecord {
    /// Day-granularity ISO-8601 date. Treated as an opaque key when bucketing.
    fn date(&self) -> &str;

    /// Chain height the record was indexed at
    fn block(&self) -> u64;

    /// Closed-set classification label (asset category or supply type)
    fn category(&self) -> &str;

    /// Liquidity flag; records without the concept are never liquid
    fn is_liquid(&self) -> bool {
        false
    }

    /// Signed quantity summed by the aggregator
    fn value(&self) -> f64;
}

/// Treasury holding observation (subgraph `TokenRecord`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    #[serde(default)]
    pub id: String,
    pub date: String,
    #[serde(deserialize_with = "de_u64")]
    pub block: u64,
    pub category: String,
    #[serde(default)]
    pub is_liquid: bool,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub token: String,
    #[serde(deserialize_with = "de_f64")]
    pub value: f64,
    #[serde(default, deserialize_with = "de_opt_f64")]
    pub value_excluding_ohm: Option<f64>,
}

impl FlatRecord for AssetRecord {
    fn date(&self) -> &str {
        &self.date
    }

    fn block(&self) -> u64 {
        self.block
    }

    fn category(&self) -> &str {
        &self.category
    }

    fn is_liquid(&self) -> bool {
        self.is_liquid
    }

    fn value(&self) -> f64 {
        self.value
    }
}

/// Token supply component observation (subgraph `TokenSupply`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplyRecord {
    #[serde(default)]
    pub id: String,
    pub date: String,
    #[serde(deserialize_with = "de_u64")]
    pub block: u64,
    #[serde(rename = "type")]
    pub supply_type: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub pool: Option<String>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    pub balance: Option<f64>,
    #[serde(deserialize_with = "de_f64")]
    pub supply_balance: f64,
}

impl FlatRecord for SupplyRecord {
    fn date(&self) -> &str {
        &self.date
    }

    fn block(&self) -> u64 {
        self.block
    }

    fn category(&self) -> &str {
        &self.supply_type
    }

    fn value(&self) -> f64 {
        self.supply_balance
    }
}

/// Parse a `YYYY-MM-DD` string
pub fn parse_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|_| DashboardError::InvalidDate(date.to_string()))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Shift a date by a (possibly negative) number of days
///
/// `None` when the result falls outside the representable date range.
pub fn adjust_date_by_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    Duration::try_days(days).and_then(|delta| date.checked_add_signed(delta))
}

/// Midnight UTC of `date` in epoch milliseconds, `None` if it does not parse
pub fn date_timestamp_ms(date: &str) -> Option<i64> {
    let midnight = parse_date(date).ok()?.and_hms_opt(0, 0, 0)?;
    Some(midnight.and_utc().timestamp_millis())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(serde_json::Number),
    Text(String),
}

impl NumberOrString {
    fn as_f64<E: serde::de::Error>(&self) -> std::result::Result<f64, E> {
        match self {
            NumberOrString::Number(n) => n
                .as_f64()
                .ok_or_else(|| E::custom(format!("number out of range: {}", n))),
            NumberOrString::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| E::custom(format!("invalid decimal: {}", s))),
        }
    }

    fn as_u64<E: serde::de::Error>(&self) -> std::result::Result<u64, E> {
        match self {
            NumberOrString::Number(n) => n
                .as_u64()
                .ok_or_else(|| E::custom(format!("invalid block number: {}", n))),
            NumberOrString::Text(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| E::custom(format!("invalid block number: {}", s))),
        }
    }
}

fn de_f64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    NumberOrString::deserialize(deserializer)?.as_f64()
}

fn de_opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<f64>, D::Error> {
    match Option::<NumberOrString>::deserialize(deserializer)? {
        Some(v) => v.as_f64().map(Some),
        None => Ok(None),
    }
}

fn de_u64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    NumberOrString::deserialize(deserializer)?.as_u64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_record_from_subgraph_strings() {
        let json = r#"{
            "id": "20240101/DAI",
            "date": "2024-01-01",
            "block": "18908000",
            "category": "Stable",
            "isLiquid": true,
            "source": "Treasury Wallet",
            "token": "DAI",
            "value": "1250.5",
            "valueExcludingOhm": "1250.5"
        }"#;

        let record: AssetRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.block(), 18_908_000);
        assert_eq!(record.value(), 1250.5);
        assert!(record.is_liquid());
        assert_eq!(record.value_excluding_ohm, Some(1250.5));
    }

    #[test]
    fn test_supply_record_maps_type_to_category() {
        let json = r#"{
            "date": "2024-01-01",
            "block": 18908000,
            "type": "Treasury",
            "token": "OHM",
            "supplyBalance": -42.0
        }"#;

        let record: SupplyRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.category(), "Treasury");
        assert_eq!(record.value(), -42.0);
        assert!(!record.is_liquid());
        assert_eq!(record.balance, None);
    }

    #[test]
    fn test_invalid_decimal_rejected() {
        let json = r#"{"date": "2024-01-01", "block": 1, "category": "Stable", "value": "abc"}"#;
        assert!(serde_json::from_str::<AssetRecord>(json).is_err());
    }

    #[test]
    fn test_date_helpers() {
        let date = parse_date("2024-01-01").unwrap();
        assert_eq!(format_date(adjust_date_by_days(date, -14).unwrap()), "2023-12-18");
        assert_eq!(date_timestamp_ms("2024-01-01"), Some(1_704_067_200_000));
        assert_eq!(date_timestamp_ms("not-a-date"), None);
        assert!(matches!(parse_date("2024/01/01"), Err(DashboardError::InvalidDate(_))));
    }

    #[test]
    fn test_adjust_date_out_of_range() {
        let date = parse_date("2024-01-01").unwrap();
        assert_eq!(adjust_date_by_days(date, -200_000_000), None);
        assert_eq!(adjust_date_by_days(date, i64::MAX), None);
        assert_eq!(adjust_date_by_days(NaiveDate::MAX, 1), None);
    }
}
