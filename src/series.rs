//! Series state - drives pagination and caches aggregate rows for one chart
//!
//! ## Flow
//!
//! ```text
//! reset(earliest_date)
//!     ↓
//! PageRequest (generation N, window)
//!     ↓  fetch
//! accept_page(request, records) ──► Stale (generation != N, dropped)
//!     ↓
//! Next(PageRequest) ... until Complete
//!     ↓
//! bucketize → aggregate (full recompute) → rows()
//! ```
//!
//! A new `reset` bumps the generation, so pages that arrive for an older
//! `earliest_date` are never merged into the current state.

use crate::aggregate::{aggregate, AggregateRow, MetricSet};
use crate::bucket::bucketize;
use crate::error::Result;
use crate::pagination::{Paginator, QueryVariables};
use crate::records::FlatRecord;
use crate::subgraph::RecordSource;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::marker::PhantomData;

/// Request for one page, tagged with the generation it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub generation: u64,
    pub variables: QueryVariables,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// Page belonged to a superseded generation and was discarded
    Stale,
    Next(PageRequest),
    /// All history loaded; rows have been rebuilt
    Complete,
}

/// Pagination and aggregation state for one series
pub struct SeriesState<R> {
    name: String,
    metrics: MetricSet,
    page_days: i64,
    record_count: u32,
    base_filter: Map<String, Value>,

    generation: u64,
    paginator: Option<Paginator>,
    records: Vec<R>,
    pages_loaded: usize,
    complete: bool,
    rows: Vec<AggregateRow>,
}

impl<R: FlatRecord + Clone> SeriesState<R> {
    pub fn new(
        name: &str,
        metrics: MetricSet,
        page_days: i64,
        record_count: u32,
        base_filter: Map<String, Value>,
    ) -> Self {
        Self {
            name: name.to_string(),
            metrics,
            page_days,
            record_count,
            base_filter,
            generation: 0,
            paginator: None,
            records: Vec::new(),
            pages_loaded: 0,
            complete: false,
            rows: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn pages_loaded(&self) -> usize {
        self.pages_loaded
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Aggregate rows, newest first. Empty while loading or idle.
    pub fn rows(&self) -> &[AggregateRow] {
        &self.rows
    }

    /// Start over for a new earliest date
    ///
    /// Returns the first page request, or `None` when there is no earliest
    /// date yet (the series stays idle).
    pub fn reset(&mut self, earliest_date: Option<&str>, today: NaiveDate) -> Result<Option<PageRequest>> {
        self.generation += 1;
        self.records.clear();
        self.rows.clear();
        self.pages_loaded = 0;
        self.complete = false;
        self.paginator = None;

        let Some(earliest_date) = earliest_date else {
            log::debug!("{}: no earliest date, idle", self.name);
            return Ok(None);
        };

        log::info!("{}: earliest date changed to {}, re-fetching", self.name, earliest_date);

        let paginator = Paginator::new(
            &self.name,
            earliest_date,
            self.page_days,
            self.record_count,
            self.base_filter.clone(),
        )?;
        let variables = paginator.initial_window(today);
        self.paginator = Some(paginator);

        Ok(Some(PageRequest {
            generation: self.generation,
            variables,
        }))
    }

    /// Merge one fetched page and work out what to request next
    pub fn accept_page(&mut self, request: &PageRequest, page: Vec<R>) -> PageOutcome {
        if request.generation != self.generation || self.complete {
            log::debug!(
                "{}: discarding stale page (generation {}, current {})",
                self.name,
                request.generation,
                self.generation
            );
            return PageOutcome::Stale;
        }

        let Some(paginator) = self.paginator.as_ref() else {
            return PageOutcome::Stale;
        };

        let next = paginator.next_window(&page);
        self.records.extend(page);
        self.pages_loaded += 1;

        match next {
            // The source must honour date_lt; otherwise we would loop forever
            Some(variables) if variables.filter.date_lt < request.variables.filter.date_lt => {
                PageOutcome::Next(PageRequest {
                    generation: self.generation,
                    variables,
                })
            }
            Some(variables) => {
                log::warn!(
                    "{}: window ending {} does not precede {}, stopping",
                    self.name,
                    variables.filter.date_lt,
                    request.variables.filter.date_lt
                );
                self.finish();
                PageOutcome::Complete
            }
            None => {
                self.finish();
                PageOutcome::Complete
            }
        }
    }

    fn finish(&mut self) {
        log::debug!("{}: rebuilding by date metrics", self.name);
        let buckets = bucketize(self.records.iter().cloned());
        self.rows = aggregate(&buckets, &self.metrics);
        self.complete = true;

        log::info!(
            "{}: loaded {} records over {} pages into {} dates",
            self.name,
            self.records.len(),
            self.pages_loaded,
            self.rows.len()
        );
    }
}

/// Async driver: one page in flight at a time
pub struct SeriesLoader<S, R> {
    source: S,
    state: SeriesState<R>,
    today_fn: Box<dyn Fn() -> NaiveDate + Send + Sync>,
    _record: PhantomData<fn() -> R>,
}

impl<S, R> SeriesLoader<S, R>
where
    S: RecordSource<R>,
    R: FlatRecord + Clone + Send,
{
    /// Create a loader using today's UTC date
    pub fn new(source: S, state: SeriesState<R>) -> Self {
        Self::new_with_today_fn(source, state, Box::new(|| chrono::Utc::now().date_naive()))
    }

    /// Create a loader with a custom clock (for deterministic tests)
    pub fn new_with_today_fn(
        source: S,
        state: SeriesState<R>,
        today_fn: Box<dyn Fn() -> NaiveDate + Send + Sync>,
    ) -> Self {
        Self {
            source,
            state,
            today_fn,
            _record: PhantomData,
        }
    }

    pub fn state(&self) -> &SeriesState<R> {
        &self.state
    }

    /// Fetch all pages back to `earliest_date` and return the rebuilt rows
    ///
    /// `None` leaves the series idle with no rows.
    pub async fn load(&mut self, earliest_date: Option<&str>) -> Result<&[AggregateRow]> {
        let today = (self.today_fn)();
        let mut request = self.state.reset(earliest_date, today)?;

        while let Some(current) = request.take() {
            log::debug!(
                "{}: fetching {} to {}",
                self.state.name(),
                current.variables.filter.date_gte,
                current.variables.filter.date_lt
            );

            let page = self.source.fetch_page(&current.variables).await?;

            match self.state.accept_page(&current, page) {
                PageOutcome::Next(next) => request = Some(next),
                PageOutcome::Complete | PageOutcome::Stale => {}
            }
        }

        Ok(self.state.rows())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{treasury_asset_metrics, CATEGORY_STABLE, CATEGORY_VOLATILE};
    use crate::records::AssetRecord;

    fn asset(date: &str, category: &str, value: f64) -> AssetRecord {
        AssetRecord {
            id: String::new(),
            date: date.to_string(),
            block: 7,
            category: category.to_string(),
            is_liquid: true,
            source: String::new(),
            token: String::new(),
            value,
            value_excluding_ohm: None,
        }
    }

    fn state() -> SeriesState<AssetRecord> {
        SeriesState::new("assets", treasury_asset_metrics().unwrap(), 14, 1000, Map::new())
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    #[test]
    fn test_idle_without_earliest_date() {
        let mut s = state();
        assert!(s.reset(None, today()).unwrap().is_none());
        assert!(s.rows().is_empty());
        assert!(!s.is_complete());
    }

    #[test]
    fn test_single_page_completes() {
        let mut s = state();
        let request = s.reset(Some("2024-01-01"), today()).unwrap().unwrap();
        assert_eq!(request.variables.filter.date_gte, "2024-01-01");

        let page = vec![
            asset("2024-01-01", CATEGORY_STABLE, 100.0),
            asset("2024-01-01", CATEGORY_VOLATILE, 50.0),
        ];
        assert_eq!(s.accept_page(&request, page), PageOutcome::Complete);
        assert_eq!(s.rows().len(), 1);
        assert_eq!(s.rows()[0].get("marketTotal"), Some(150.0));
    }

    #[test]
    fn test_rows_empty_while_loading() {
        let mut s = state();
        let request = s.reset(Some("2023-12-01"), today()).unwrap().unwrap();

        let outcome = s.accept_page(&request, vec![asset("2023-12-27", CATEGORY_STABLE, 1.0)]);
        assert!(matches!(outcome, PageOutcome::Next(_)));
        assert!(s.rows().is_empty());
        assert_eq!(s.record_count(), 1);
    }

    #[test]
    fn test_stale_page_discarded() {
        let mut s = state();
        let old = s.reset(Some("2023-01-01"), today()).unwrap().unwrap();
        let current = s.reset(Some("2024-01-01"), today()).unwrap().unwrap();
        assert_ne!(old.generation, current.generation);

        let outcome = s.accept_page(&old, vec![asset("2023-12-30", CATEGORY_STABLE, 999.0)]);
        assert_eq!(outcome, PageOutcome::Stale);
        assert_eq!(s.record_count(), 0);

        let outcome = s.accept_page(&current, vec![asset("2024-01-05", CATEGORY_STABLE, 1.0)]);
        assert!(matches!(outcome, PageOutcome::Next(_)));
        assert_eq!(s.record_count(), 1);
    }

    #[test]
    fn test_reset_clears_rows() {
        let mut s = state();
        let request = s.reset(Some("2024-01-01"), today()).unwrap().unwrap();
        s.accept_page(&request, vec![asset("2024-01-01", CATEGORY_STABLE, 1.0)]);
        assert_eq!(s.rows().len(), 1);

        s.reset(Some("2024-01-02"), today()).unwrap();
        assert!(s.rows().is_empty());
        assert_eq!(s.pages_loaded(), 0);
    }

    #[test]
    fn test_non_decreasing_window_stops() {
        let mut s = state();
        let request = s.reset(Some("2023-01-01"), today()).unwrap().unwrap();

        // Source ignored date_lt and returned a record newer than the window
        let outcome = s.accept_page(&request, vec![asset("2024-02-01", CATEGORY_STABLE, 1.0)]);
        assert_eq!(outcome, PageOutcome::Complete);
        assert_eq!(s.rows().len(), 1);
    }

    #[test]
    fn test_invalid_earliest_date() {
        let mut s = state();
        assert!(s.reset(Some("01/01/2024"), today()).is_err());
    }
}
