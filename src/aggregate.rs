//! Declarative per-date metric aggregation
//!
//! A `MetricSet` is an ordered list of metric definitions. For every date
//! bucket each definition is evaluated in declared order, so composite and
//! percentage metrics can only reference metrics declared before them.
//!
//! ## Example
//!
//! ```rust
//! use treasury_dashboard::aggregate::{aggregate, MetricSet, Predicate};
//! use treasury_dashboard::bucket::bucketize;
//!
//! let metrics = MetricSet::builder()
//!     .sum("stable", Predicate::category("Stable"))
//!     .sum("volatile", Predicate::category("Volatile"))
//!     .composite("total", &["stable", "volatile"])
//!     .percentage("stablePercentage", "stable", "total")
//!     .build()?;
//! # let records: Vec<treasury_dashboard::records::AssetRecord> = Vec::new();
//! let rows = aggregate(&bucketize(records), &metrics);
//! # Ok::<(), treasury_dashboard::error::DashboardError>(())
//! ```

use crate::bucket::DateBucket;
use crate::error::{DashboardError, Result};
use crate::records::{date_timestamp_ms, FlatRecord};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashSet;

/// Record filter for summed metrics
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Category(String),
    CategoryIn(Vec<String>),
    Liquid,
    And(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    pub fn category(label: &str) -> Self {
        Predicate::Category(label.to_string())
    }

    pub fn category_in(labels: &[&str]) -> Self {
        Predicate::CategoryIn(labels.iter().map(|l| l.to_string()).collect())
    }

    /// Category match restricted to liquid records
    pub fn liquid_category(label: &str) -> Self {
        Predicate::And(Box::new(Predicate::category(label)), Box::new(Predicate::Liquid))
    }

    pub fn matches<R: FlatRecord>(&self, record: &R) -> bool {
        match self {
            Predicate::Category(label) => record.category() == label,
            Predicate::CategoryIn(labels) => labels.iter().any(|l| l == record.category()),
            Predicate::Liquid => record.is_liquid(),
            Predicate::And(a, b) => a.matches(record) && b.matches(record),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricKind {
    /// Sum of `value` over matching records
    Sum(Predicate),
    /// Sum of earlier metrics in the same row
    Composite(Vec<String>),
    /// `metric * 100 / total`; a zero total yields a non-finite value
    Percentage { metric: String, total: String },
    Constant(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricDef {
    pub name: String,
    pub kind: MetricKind,
}

/// Validated, ordered metric definitions
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSet {
    defs: Vec<MetricDef>,
}

impl MetricSet {
    pub fn builder() -> MetricSetBuilder {
        MetricSetBuilder { defs: Vec::new() }
    }

    /// Validate `defs`: unique names, references only to earlier metrics
    pub fn new(defs: Vec<MetricDef>) -> Result<Self> {
        Self::validate(&defs)?;
        Ok(Self { defs })
    }

    fn validate(defs: &[MetricDef]) -> Result<()> {
        let mut seen: HashSet<&str> = HashSet::new();

        for def in defs {
            let references: Vec<&str> = match &def.kind {
                MetricKind::Composite(parts) => parts.iter().map(String::as_str).collect(),
                MetricKind::Percentage { metric, total } => vec![metric.as_str(), total.as_str()],
                MetricKind::Sum(_) | MetricKind::Constant(_) => Vec::new(),
            };

            if let Some(missing) = references.into_iter().find(|r| !seen.contains(r)) {
                return Err(DashboardError::UnknownMetric {
                    metric: def.name.clone(),
                    reference: missing.to_string(),
                });
            }

            if !seen.insert(def.name.as_str()) {
                return Err(DashboardError::DuplicateMetric(def.name.clone()));
            }
        }

        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.defs.iter().map(|d| d.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Evaluate every metric over one date's records, in declared order
    fn evaluate<R: FlatRecord>(&self, records: &[R]) -> Vec<(String, f64)> {
        let mut values: Vec<(String, f64)> = Vec::with_capacity(self.defs.len());

        for def in &self.defs {
            let value = match &def.kind {
                MetricKind::Sum(predicate) => records
                    .iter()
                    .filter(|r| predicate.matches(*r))
                    .fold(0.0, |acc, r| acc + r.value()),
                MetricKind::Composite(parts) => parts
                    .iter()
                    .fold(0.0, |acc, part| acc + lookup(&values, part)),
                MetricKind::Percentage { metric, total } => {
                    lookup(&values, metric) * 100.0 / lookup(&values, total)
                }
                MetricKind::Constant(v) => *v,
            };
            values.push((def.name.clone(), value));
        }

        values
    }
}

// References are validated at construction
fn lookup(values: &[(String, f64)], name: &str) -> f64 {
    values
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| *v)
        .unwrap_or(f64::NAN)
}

pub struct MetricSetBuilder {
    defs: Vec<MetricDef>,
}

impl MetricSetBuilder {
    fn push(mut self, name: &str, kind: MetricKind) -> Self {
        self.defs.push(MetricDef {
            name: name.to_string(),
            kind,
        });
        self
    }

    pub fn sum(self, name: &str, predicate: Predicate) -> Self {
        self.push(name, MetricKind::Sum(predicate))
    }

    pub fn composite(self, name: &str, parts: &[&str]) -> Self {
        let parts = parts.iter().map(|p| p.to_string()).collect();
        self.push(name, MetricKind::Composite(parts))
    }

    pub fn percentage(self, name: &str, metric: &str, total: &str) -> Self {
        self.push(
            name,
            MetricKind::Percentage {
                metric: metric.to_string(),
                total: total.to_string(),
            },
        )
    }

    pub fn constant(self, name: &str, value: f64) -> Self {
        self.push(name, MetricKind::Constant(value))
    }

    pub fn build(self) -> Result<MetricSet> {
        MetricSet::new(self.defs)
    }
}

/// One chart row per distinct date
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub date: String,
    /// Midnight UTC in epoch millis
    pub timestamp: Option<i64>,
    /// Block of the first record seen for this date
    pub block: u64,
    metrics: Vec<(String, f64)>,
}

impl AggregateRow {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.metrics.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    /// Metrics in declared order
    pub fn metrics(&self) -> impl Iterator<Item = (&str, f64)> {
        self.metrics.iter().map(|(n, v)| (n.as_str(), *v))
    }
}

// Flat object: date, timestamp, block, then each metric. serde_json writes
// non-finite values as null.
impl Serialize for AggregateRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3 + self.metrics.len()))?;
        map.serialize_entry("date", &self.date)?;
        map.serialize_entry("timestamp", &self.timestamp)?;
        map.serialize_entry("block", &self.block)?;
        for (name, value) in &self.metrics {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Apply `metrics` to every date bucket; rows are sorted most recent first
pub fn aggregate<R: FlatRecord>(buckets: &DateBucket<R>, metrics: &MetricSet) -> Vec<AggregateRow> {
    let mut rows: Vec<AggregateRow> = buckets
        .iter()
        .map(|(date, records)| AggregateRow {
            date: date.to_string(),
            timestamp: date_timestamp_ms(date),
            block: records.first().map(|r| r.block()).unwrap_or_default(),
            metrics: metrics.evaluate(records),
        })
        .collect();

    // ISO-8601 day strings order chronologically
    rows.sort_by(|a, b| b.date.cmp(&a.date));
    rows
}
