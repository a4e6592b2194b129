//! Integration tests: series loading against an in-memory record source
//!
//! The mock source honours the `date_gte`/`date_lt` window and `recordCount`
//! like the subgraph does, returning records newest first.
//!
//! Key integration points tested:
//! - Full backward walk to EARLIEST_DATE and termination
//! - No record fetched twice across windows
//! - Idle series without an earliest date
//! - Reload with a new earliest date
//! - Fetch errors surface to the caller

#[cfg(test)]
mod series_integration_tests {
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::Map;
    use std::sync::{Arc, Mutex};
    use treasury_dashboard::metrics::{
        token_supply_metrics, treasury_asset_metrics, CATEGORY_POL, CATEGORY_STABLE, CATEGORY_VOLATILE,
        TOKEN_SUPPLY_TYPE_TOTAL_SUPPLY, TOKEN_SUPPLY_TYPE_TREASURY,
    };
    use treasury_dashboard::{
        AssetRecord, DashboardError, FlatRecord, QueryVariables, RecordSource, SeriesLoader, SeriesState,
        SupplyRecord,
    };

    struct MockSource<R> {
        records: Vec<R>,
        requests: Arc<Mutex<Vec<QueryVariables>>>,
        fail: bool,
    }

    impl<R: FlatRecord + Clone> MockSource<R> {
        fn new(mut records: Vec<R>) -> (Self, Arc<Mutex<Vec<QueryVariables>>>) {
            records.sort_by(|a, b| b.date().cmp(a.date()));
            let requests = Arc::new(Mutex::new(Vec::new()));
            let source = Self {
                records,
                requests: requests.clone(),
                fail: false,
            };
            (source, requests)
        }
    }

    #[async_trait]
    impl<R> RecordSource<R> for MockSource<R>
    where
        R: FlatRecord + Clone + Send + Sync + 'static,
    {
        async fn fetch_page(&self, variables: &QueryVariables) -> treasury_dashboard::Result<Vec<R>> {
            self.requests.lock().unwrap().push(variables.clone());

            if self.fail {
                return Err(DashboardError::GraphQl("indexing error".to_string()));
            }

            let window = &variables.filter;
            Ok(self
                .records
                .iter()
                .filter(|r| r.date() >= window.date_gte.as_str() && r.date() < window.date_lt.as_str())
                .take(variables.record_count as usize)
                .cloned()
                .collect())
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    fn dates_back_from(start: NaiveDate, days: i64) -> Vec<String> {
        (0..days)
            .map(|i| (start - chrono::Duration::days(i)).format("%Y-%m-%d").to_string())
            .collect()
    }

    fn asset(date: &str, category: &str, is_liquid: bool, value: f64) -> AssetRecord {
        AssetRecord {
            id: format!("{}/{}", date, category),
            date: date.to_string(),
            block: 19_000_000,
            category: category.to_string(),
            is_liquid,
            source: "Treasury Wallet".to_string(),
            token: "DAI".to_string(),
            value,
            value_excluding_ohm: Some(value),
        }
    }

    fn supply(date: &str, supply_type: &str, value: f64) -> SupplyRecord {
        SupplyRecord {
            id: format!("{}/{}", date, supply_type),
            date: date.to_string(),
            block: 19_000_000,
            supply_type: supply_type.to_string(),
            token: "OHM".to_string(),
            source: None,
            pool: None,
            balance: None,
            supply_balance: value,
        }
    }

    fn asset_loader(source: MockSource<AssetRecord>) -> SeriesLoader<MockSource<AssetRecord>, AssetRecord> {
        let state = SeriesState::new("assets", treasury_asset_metrics().unwrap(), 14, 1000, Map::new());
        SeriesLoader::new_with_today_fn(source, state, Box::new(today))
    }

    #[tokio::test]
    async fn test_full_history_loaded_once() {
        // Three records per day for 90 days
        let mut records = Vec::new();
        for date in dates_back_from(today(), 90) {
            records.push(asset(&date, CATEGORY_STABLE, true, 100.0));
            records.push(asset(&date, CATEGORY_VOLATILE, false, 50.0));
            records.push(asset(&date, CATEGORY_POL, true, 25.0));
        }

        let (source, requests) = MockSource::new(records);
        let mut loader = asset_loader(source);

        let earliest = (today() - chrono::Duration::days(89)).format("%Y-%m-%d").to_string();
        let rows = loader.load(Some(&earliest)).await.unwrap();

        assert_eq!(rows.len(), 90);
        for row in rows {
            assert_eq!(row.get("marketTotal"), Some(175.0));
            assert_eq!(row.get("liquidTotal"), Some(125.0));
        }
        assert_eq!(rows[0].date, "2024-03-10");
        assert_eq!(rows[89].date, earliest);
        assert_eq!(loader.state().record_count(), 270);

        // Windows walk strictly backwards and stop at the earliest date
        let requests = requests.lock().unwrap();
        assert_eq!(requests.first().unwrap().filter.date_lt, "2024-03-11");
        assert_eq!(requests.last().unwrap().filter.date_gte, earliest);
        for pair in requests.windows(2) {
            assert!(pair[1].filter.date_lt < pair[0].filter.date_lt);
            assert_eq!(pair[1].filter.date_lt, pair[0].filter.date_gte);
        }
        assert_eq!(requests.len(), 7);
    }

    #[tokio::test]
    async fn test_rows_sorted_newest_first() {
        let records = vec![
            asset("2024-03-01", CATEGORY_STABLE, true, 1.0),
            asset("2024-03-03", CATEGORY_STABLE, true, 3.0),
            asset("2024-03-02", CATEGORY_STABLE, true, 2.0),
        ];
        let (source, _) = MockSource::new(records);
        let mut loader = asset_loader(source);

        let rows = loader.load(Some("2024-03-01")).await.unwrap();
        let dates: Vec<&str> = rows.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-03-03", "2024-03-02", "2024-03-01"]);
    }

    #[tokio::test]
    async fn test_idle_without_earliest_date() {
        let (source, requests) = MockSource::new(vec![asset("2024-03-01", CATEGORY_STABLE, true, 1.0)]);
        let mut loader = asset_loader(source);

        let rows = loader.load(None).await.unwrap();
        assert!(rows.is_empty());
        assert!(requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_gap_in_history_ends_walk() {
        // Nothing between 2024-01-15 and 2024-02-20
        let mut records = Vec::new();
        for date in dates_back_from(today(), 20) {
            records.push(asset(&date, CATEGORY_STABLE, true, 1.0));
        }
        records.push(asset("2024-01-15", CATEGORY_STABLE, true, 1.0));

        let (source, requests) = MockSource::new(records);
        let mut loader = asset_loader(source);

        let rows = loader.load(Some("2024-01-01")).await.unwrap();
        assert_eq!(rows.len(), 20);
        assert!(loader.state().is_complete());
        assert!(requests.lock().unwrap().len() >= 2);
    }

    #[tokio::test]
    async fn test_reload_with_new_earliest_date() {
        let mut records = Vec::new();
        for date in dates_back_from(today(), 30) {
            records.push(asset(&date, CATEGORY_STABLE, true, 1.0));
        }
        let (source, _) = MockSource::new(records);
        let mut loader = asset_loader(source);

        assert_eq!(loader.load(Some("2024-02-10")).await.unwrap().len(), 30);
        let generation = loader.state().generation();

        assert_eq!(loader.load(Some("2024-03-01")).await.unwrap().len(), 10);
        assert!(loader.state().generation() > generation);
        assert_eq!(loader.state().record_count(), 10);
    }

    #[tokio::test]
    async fn test_supply_series_percentages() {
        let mut records = Vec::new();
        for date in dates_back_from(today(), 3) {
            records.push(supply(&date, TOKEN_SUPPLY_TYPE_TOTAL_SUPPLY, 1000.0));
            records.push(supply(&date, TOKEN_SUPPLY_TYPE_TREASURY, -400.0));
        }
        let (source, _) = MockSource::new(records);
        let state = SeriesState::new("supply", token_supply_metrics().unwrap(), 14, 1000, Map::new());
        let mut loader = SeriesLoader::new_with_today_fn(source, state, Box::new(today));

        let rows = loader.load(Some("2024-03-08")).await.unwrap();
        assert_eq!(rows.len(), 3);
        for row in rows {
            assert_eq!(row.get("circulatingSupply"), Some(600.0));
            assert_eq!(row.get("circulatingSupplyPercentage"), Some(60.0));
            assert_eq!(row.get("floatingSupplyPercentage"), Some(60.0));
        }
    }

    #[tokio::test]
    async fn test_fetch_error_propagates() {
        let (mut source, _) = MockSource::new(vec![asset("2024-03-01", CATEGORY_STABLE, true, 1.0)]);
        source.fail = true;
        let mut loader = asset_loader(source);

        let result = loader.load(Some("2024-03-01")).await;
        assert!(matches!(result, Err(DashboardError::GraphQl(_))));
        assert!(loader.state().rows().is_empty());
    }
}
