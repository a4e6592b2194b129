//! Backward-walking date-window paginator
//!
//! The subgraph has no cursor token; pagination is driven by resubmitting a
//! new `date_gte`/`date_lt` window. Each window starts at the oldest date seen
//! in the previous page and reaches `page_days` further into the past, clamped
//! to the earliest date the caller is interested in.

use crate::error::Result;
use crate::records::{adjust_date_by_days, format_date, parse_date, FlatRecord};
use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Default lookback span of one window, in days
pub const DEFAULT_PAGE_DAYS: i64 = 14;

/// Default maximum number of records requested per window
pub const DEFAULT_RECORD_COUNT: u32 = 1000;

/// One page request: inclusive lower bound, exclusive upper bound and a
/// pass-through filter merged into every window
#[derive(Debug, Clone, PartialEq)]
pub struct QueryWindow {
    pub date_gte: String,
    pub date_lt: String,
    pub base_filter: Map<String, Value>,
}

impl QueryWindow {
    /// Filter object as sent to the subgraph; window bounds win over base filter keys
    pub fn to_filter(&self) -> Map<String, Value> {
        let mut filter = self.base_filter.clone();
        filter.insert("date_gte".to_string(), Value::String(self.date_gte.clone()));
        filter.insert("date_lt".to_string(), Value::String(self.date_lt.clone()));
        filter
    }
}

impl Serialize for QueryWindow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let filter = self.to_filter();
        let mut map = serializer.serialize_map(Some(filter.len()))?;
        for (key, value) in &filter {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// GraphQL variables for one page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryVariables {
    pub filter: QueryWindow,
    pub record_count: u32,
}

/// Pagination cursor for one series
///
/// Owned by the caller and recreated whenever `earliest_date` or the base
/// filter changes. All methods are pure.
#[derive(Debug, Clone)]
pub struct Paginator {
    name: String,
    earliest_date: NaiveDate,
    page_days: i64,
    record_count: u32,
    base_filter: Map<String, Value>,
}

impl Paginator {
    pub fn new(
        name: &str,
        earliest_date: &str,
        page_days: i64,
        record_count: u32,
        base_filter: Map<String, Value>,
    ) -> Result<Self> {
        let earliest_date = parse_date(earliest_date)?;
        log::info!("{}/{}: created paginator ({} day windows)", name, earliest_date, page_days);

        Ok(Self {
            name: name.to_string(),
            earliest_date,
            page_days: page_days.max(1),
            record_count,
            base_filter,
        })
    }

    pub fn earliest_date(&self) -> NaiveDate {
        self.earliest_date
    }

    pub fn page_days(&self) -> i64 {
        self.page_days
    }

    /// Start date for the window ending at `upper`, never earlier than `earliest_date`
    pub fn window_start(&self, upper: NaiveDate) -> NaiveDate {
        adjust_date_by_days(upper, -self.page_days).map_or(self.earliest_date, |d| d.max(self.earliest_date))
    }

    /// First window: from tomorrow back `page_days`
    pub fn initial_window(&self, today: NaiveDate) -> QueryVariables {
        let upper = adjust_date_by_days(today, 1).unwrap_or(today);
        self.variables(self.window_start(upper), upper)
    }

    /// Window following `prior_page`, or `None` once history is exhausted
    ///
    /// An empty page, or a page reaching back to `earliest_date`, ends pagination.
    pub fn next_window<R: FlatRecord>(&self, prior_page: &[R]) -> Option<QueryVariables> {
        let log_prefix = format!("{}/{}", self.name, self.earliest_date);
        log::debug!("{}: received {} records", log_prefix, prior_page.len());

        // The oldest date of a full page may be cut short; it becomes the next exclusive bound
        if self.record_count > 0 && prior_page.len() >= self.record_count as usize {
            log::warn!(
                "{}: page hit the {} record limit, oldest date may be incomplete",
                log_prefix,
                self.record_count
            );
        }

        // Records are expected newest-first but the order is not relied upon
        let oldest = prior_page
            .iter()
            .filter_map(|r| parse_date(r.date()).ok())
            .min();

        let Some(oldest) = oldest else {
            log::debug!("{}: previous page has no dated records, finished", log_prefix);
            return None;
        };

        if oldest <= self.earliest_date {
            log::debug!("{}: reached earliest date with {}, finished", log_prefix, oldest);
            return None;
        }

        let start = self.window_start(oldest);
        log::debug!("{}: next window {} to {}", log_prefix, start, oldest);
        Some(self.variables(start, oldest))
    }

    fn variables(&self, start: NaiveDate, end: NaiveDate) -> QueryVariables {
        QueryVariables {
            filter: QueryWindow {
                date_gte: format_date(start),
                date_lt: format_date(end),
                base_filter: self.base_filter.clone(),
            },
            record_count: self.record_count,
        }
    }
}
