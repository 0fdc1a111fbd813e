//! Tests for the sync cycle.
//!
//! These run the whole cycle against in-memory stores and a scripted
//! provider, with tokio's paused clock so retry backoff and write delays
//! cost no real time.
//!
//! # Contract Points
//!
//! 1. A denied cycle makes no upstream call and writes no ledger record
//! 2. Id lookup and metadata calls only include the symbols that need them
//! 3. Price is fetched for every resolved symbol, every cycle
//! 4. One bad record fails that symbol only
//! 5. A batched call that exhausts its retries fails the cycle

#[cfg(test)]
mod tests {
    use crate::errors::{Error, Result};
    use crate::quotes::{
        model::{Quote, QuoteUpdate},
        provider_config::ProviderConfig,
        store::QuoteStore,
        sync::{QuoteSyncService, SyncStatus},
    };
    use crate::usage::{NewUsageRecord, UsageLedger, UsageRecord, UsageStore};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use marketcache_market_data::{
        AssetClass, AssetMetadata, CallKind, InternalId, MarketDataError, MarketDataProvider,
        ProviderCapabilities, ProviderQuote,
    };
    use rust_decimal_macros::dec;
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::sync::{Arc, Mutex};
    use std::time::Duration as StdDuration;

    // =========================================================================
    // Mock QuoteStore
    // =========================================================================

    #[derive(Clone, Default)]
    struct MockQuoteStore {
        quotes: Arc<Mutex<HashMap<(AssetClass, String), Quote>>>,
        upserts: Arc<Mutex<usize>>,
        fail_symbols: Arc<Mutex<HashSet<String>>>,
    }

    impl MockQuoteStore {
        fn new() -> Self {
            Self::default()
        }

        fn add_quote(&self, quote: Quote) {
            self.quotes
                .lock()
                .unwrap()
                .insert((quote.asset_class, quote.symbol.clone()), quote);
        }

        fn fail_on(&self, symbol: &str) {
            self.fail_symbols.lock().unwrap().insert(symbol.to_string());
        }

        fn get(&self, asset_class: AssetClass, symbol: &str) -> Option<Quote> {
            self.quotes
                .lock()
                .unwrap()
                .get(&(asset_class, symbol.to_string()))
                .cloned()
        }

        fn snapshot(&self) -> HashMap<(AssetClass, String), Quote> {
            self.quotes.lock().unwrap().clone()
        }

        fn upsert_count(&self) -> usize {
            *self.upserts.lock().unwrap()
        }
    }

    #[async_trait]
    impl QuoteStore for MockQuoteStore {
        fn get_quote(&self, asset_class: AssetClass, symbol: &str) -> Result<Option<Quote>> {
            Ok(self.get(asset_class, symbol))
        }

        fn get_quotes(
            &self,
            asset_class: AssetClass,
            symbols: &[String],
        ) -> Result<HashMap<String, Quote>> {
            Ok(symbols
                .iter()
                .filter_map(|s| self.get(asset_class, s).map(|q| (s.clone(), q)))
                .collect())
        }

        fn last_refresh_timestamp(&self, asset_class: AssetClass) -> Result<Option<DateTime<Utc>>> {
            Ok(self
                .quotes
                .lock()
                .unwrap()
                .values()
                .filter(|q| q.asset_class == asset_class)
                .map(|q| q.last_updated)
                .max())
        }

        async fn upsert_quote(&self, asset_class: AssetClass, update: QuoteUpdate) -> Result<Quote> {
            if self.fail_symbols.lock().unwrap().contains(&update.symbol) {
                return Err(Error::Unexpected("Intentional write failure".into()));
            }
            let mut quotes = self.quotes.lock().unwrap();
            let key = (asset_class, update.symbol.clone());
            let quote = Quote::upsert(asset_class, quotes.get(&key), &update);
            quotes.insert(key, quote.clone());
            *self.upserts.lock().unwrap() += 1;
            Ok(quote)
        }
    }

    // =========================================================================
    // Mock UsageStore
    // =========================================================================

    #[derive(Clone, Default)]
    struct MockUsageStore {
        records: Arc<Mutex<Vec<UsageRecord>>>,
        reject_writes: Arc<Mutex<bool>>,
    }

    impl MockUsageStore {
        fn reject_writes(&self) {
            *self.reject_writes.lock().unwrap() = true;
        }

        fn seed(&self, provider: &str, count: usize, at: DateTime<Utc>) {
            let mut records = self.records.lock().unwrap();
            for _ in 0..count {
                let id = records.len().to_string();
                records.push(UsageRecord {
                    id,
                    provider: provider.to_string(),
                    endpoint: "/seed".to_string(),
                    success: true,
                    status_code: Some(200),
                    timestamp: at,
                });
            }
        }

        fn all(&self) -> Vec<UsageRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UsageStore for MockUsageStore {
        async fn record_usage(&self, record: NewUsageRecord) -> Result<UsageRecord> {
            if *self.reject_writes.lock().unwrap() {
                return Err(Error::Unexpected("api_usage table is missing".into()));
            }
            let mut records = self.records.lock().unwrap();
            let stored = UsageRecord {
                id: records.len().to_string(),
                provider: record.provider,
                endpoint: record.endpoint,
                success: record.success,
                status_code: record.status_code,
                timestamp: record.timestamp,
            };
            records.push(stored.clone());
            Ok(stored)
        }

        fn count_usage_since(
            &self,
            provider: &str,
            since: DateTime<Utc>,
            only_successful: bool,
        ) -> Result<u64> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.provider == provider && r.timestamp >= since)
                .filter(|r| !only_successful || r.success)
                .count() as u64)
        }
    }

    // =========================================================================
    // Scripted provider
    // =========================================================================

    type ErrorFactory = fn() -> MarketDataError;

    #[derive(Clone)]
    struct MockProvider {
        id: &'static str,
        capabilities: ProviderCapabilities,
        ids: Arc<Mutex<HashMap<String, InternalId>>>,
        metadata: Arc<Mutex<HashMap<InternalId, AssetMetadata>>>,
        quotes: Arc<Mutex<HashMap<InternalId, ProviderQuote>>>,
        /// Errors returned, in order, before calls of that kind succeed.
        scripted_errors: Arc<Mutex<HashMap<CallKind, VecDeque<ErrorFactory>>>>,
        /// Calls of that kind always fail with this error.
        always_fail: Arc<Mutex<HashMap<CallKind, ErrorFactory>>>,
        calls: Arc<Mutex<Vec<(CallKind, Vec<String>)>>>,
    }

    impl MockProvider {
        fn new(id: &'static str, asset_class: AssetClass, resolves_ids: bool, supports_metadata: bool) -> Self {
            Self {
                id,
                capabilities: ProviderCapabilities {
                    asset_class,
                    resolves_ids,
                    supports_metadata,
                },
                ids: Arc::default(),
                metadata: Arc::default(),
                quotes: Arc::default(),
                scripted_errors: Arc::default(),
                always_fail: Arc::default(),
                calls: Arc::default(),
            }
        }

        fn coinmarketcap() -> Self {
            let provider = Self::new("COINMARKETCAP", AssetClass::Crypto, true, true);
            provider.add_coin("BTC", "1", "Bitcoin", 64000.0);
            provider.add_coin("ETH", "1027", "Ethereum", 3100.0);
            provider
        }

        fn metals() -> Self {
            Self::new("METAL_PRICE_API", AssetClass::Commodity, false, false)
        }

        fn add_coin(&self, symbol: &str, id: &str, name: &str, price: f64) {
            self.ids
                .lock()
                .unwrap()
                .insert(symbol.to_string(), id.to_string());
            self.metadata.lock().unwrap().insert(
                id.to_string(),
                AssetMetadata::new(
                    Some(name.to_string()),
                    Some(format!("https://logo/{}.png", id)),
                ),
            );
            self.set_price(id, symbol, Some(price));
        }

        fn set_price(&self, id: &str, symbol: &str, price: Option<f64>) {
            self.quotes.lock().unwrap().insert(
                id.to_string(),
                ProviderQuote::new(symbol, price, Some(0.5)),
            );
        }

        fn script_errors(&self, kind: CallKind, errors: Vec<ErrorFactory>) {
            self.scripted_errors
                .lock()
                .unwrap()
                .insert(kind, errors.into_iter().collect());
        }

        fn fail_always(&self, kind: CallKind, error: ErrorFactory) {
            self.always_fail.lock().unwrap().insert(kind, error);
        }

        fn calls(&self) -> Vec<(CallKind, Vec<String>)> {
            self.calls.lock().unwrap().clone()
        }

        fn calls_of(&self, kind: CallKind) -> Vec<Vec<String>> {
            self.calls()
                .into_iter()
                .filter(|(k, _)| *k == kind)
                .map(|(_, args)| args)
                .collect()
        }

        fn begin(&self, kind: CallKind, args: &[String]) -> std::result::Result<(), MarketDataError> {
            self.calls.lock().unwrap().push((kind, args.to_vec()));
            if let Some(error) = self.always_fail.lock().unwrap().get(&kind) {
                return Err(error());
            }
            if let Some(queue) = self.scripted_errors.lock().unwrap().get_mut(&kind) {
                if let Some(error) = queue.pop_front() {
                    return Err(error());
                }
            }
            Ok(())
        }
    }

    #[async_trait]
    impl MarketDataProvider for MockProvider {
        fn id(&self) -> &'static str {
            self.id
        }

        fn capabilities(&self) -> ProviderCapabilities {
            self.capabilities.clone()
        }

        fn endpoint(&self, kind: CallKind) -> &'static str {
            match kind {
                CallKind::Ids => "/ids",
                CallKind::Metadata => "/metadata",
                CallKind::Quotes => "/quotes",
            }
        }

        async fn resolve_ids(
            &self,
            symbols: &[String],
        ) -> std::result::Result<HashMap<String, InternalId>, MarketDataError> {
            self.begin(CallKind::Ids, symbols)?;
            let ids = self.ids.lock().unwrap();
            Ok(symbols
                .iter()
                .filter_map(|s| ids.get(s).map(|id| (s.clone(), id.clone())))
                .collect())
        }

        async fn fetch_metadata(
            &self,
            ids: &[InternalId],
        ) -> std::result::Result<HashMap<InternalId, AssetMetadata>, MarketDataError> {
            self.begin(CallKind::Metadata, ids)?;
            let metadata = self.metadata.lock().unwrap();
            Ok(ids
                .iter()
                .filter_map(|id| metadata.get(id).map(|m| (id.clone(), m.clone())))
                .collect())
        }

        async fn fetch_quotes(
            &self,
            ids: &[InternalId],
        ) -> std::result::Result<HashMap<InternalId, ProviderQuote>, MarketDataError> {
            self.begin(CallKind::Quotes, ids)?;
            let quotes = self.quotes.lock().unwrap();
            Ok(ids
                .iter()
                .filter_map(|id| quotes.get(id).map(|q| (id.clone(), q.clone())))
                .collect())
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn rate_limited() -> MarketDataError {
        MarketDataError::RateLimited {
            provider: "TEST".to_string(),
        }
    }

    fn unauthorized() -> MarketDataError {
        MarketDataError::Unauthorized {
            provider: "TEST".to_string(),
            status: Some(403),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap()
    }

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn crypto_config(list: &[&str]) -> ProviderConfig {
        ProviderConfig::crypto(symbols(list)).with_retry(3, StdDuration::from_millis(1000))
    }

    struct Harness {
        service: QuoteSyncService,
        provider: MockProvider,
        store: MockQuoteStore,
        usage: MockUsageStore,
    }

    fn harness(config: ProviderConfig, provider: MockProvider) -> Harness {
        let store = MockQuoteStore::new();
        let usage = MockUsageStore::default();
        harness_with(config, provider, store, usage)
    }

    fn harness_with(
        config: ProviderConfig,
        provider: MockProvider,
        store: MockQuoteStore,
        usage: MockUsageStore,
    ) -> Harness {
        let ledger = Arc::new(UsageLedger::new(Arc::new(usage.clone())));
        let service = QuoteSyncService::new(
            config,
            Arc::new(provider.clone()),
            Arc::new(store.clone()),
            ledger,
        )
        .unwrap();
        Harness {
            service,
            provider,
            store,
            usage,
        }
    }

    fn metal_row(symbol: &str, price: rust_decimal::Decimal, at: DateTime<Utc>) -> Quote {
        Quote {
            asset_class: AssetClass::Commodity,
            symbol: symbol.to_string(),
            display_name: symbol.to_string(),
            logo_url: None,
            price,
            percent_change: None,
            provider_internal_id: None,
            last_updated: at,
            metadata_updated_at: None,
        }
    }

    // =========================================================================
    // Scenarios
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_fresh_store_makes_all_three_calls() {
        let h = harness(crypto_config(&["BTC", "ETH"]), MockProvider::coinmarketcap());

        let report = h.service.run_at(t0()).await;

        assert_eq!(report.status, SyncStatus::Success);
        assert_eq!(report.updated, 2);
        assert_eq!(report.failed, 0);
        assert!(report.calls_made.ids && report.calls_made.metadata && report.calls_made.quotes);

        assert_eq!(h.provider.calls_of(CallKind::Ids), vec![symbols(&["BTC", "ETH"])]);
        assert_eq!(
            h.provider.calls_of(CallKind::Metadata),
            vec![symbols(&["1", "1027"])]
        );
        assert_eq!(
            h.provider.calls_of(CallKind::Quotes),
            vec![symbols(&["1", "1027"])]
        );

        let btc = h.store.get(AssetClass::Crypto, "BTC").unwrap();
        assert_eq!(btc.price, dec!(64000));
        assert_eq!(btc.display_name, "Bitcoin");
        assert_eq!(btc.logo_url.as_deref(), Some("https://logo/1.png"));
        assert_eq!(btc.provider_internal_id.as_deref(), Some("1"));
        assert_eq!(btc.last_updated, t0());
        assert_eq!(btc.metadata_updated_at, Some(t0()));

        // One ledger record per call.
        let records = h.usage.all();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.success && r.status_code == Some(200)));
        assert!(records.iter().all(|r| r.provider == "COINMARKETCAP"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_day_only_fetches_quotes() {
        let h = harness(crypto_config(&["BTC", "ETH"]), MockProvider::coinmarketcap());
        h.service.run_at(t0()).await;
        h.provider.set_price("1", "BTC", Some(65000.0));

        let next_day = t0() + Duration::days(1);
        let report = h.service.run_at(next_day).await;

        assert_eq!(report.status, SyncStatus::Success);
        assert!(!report.calls_made.ids);
        assert!(!report.calls_made.metadata);
        assert!(report.calls_made.quotes);
        assert_eq!(h.provider.calls_of(CallKind::Ids).len(), 1);
        assert_eq!(h.provider.calls_of(CallKind::Metadata).len(), 1);
        assert_eq!(h.provider.calls_of(CallKind::Quotes).len(), 2);

        let btc = h.store.get(AssetClass::Crypto, "BTC").unwrap();
        assert_eq!(btc.price, dec!(65000));
        assert_eq!(btc.last_updated, next_day);
        // A price-only refresh never bumps the metadata timestamp.
        assert_eq!(btc.metadata_updated_at, Some(t0()));
        assert_eq!(btc.provider_internal_id.as_deref(), Some("1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hard_stop_makes_no_calls_and_no_ledger_writes() {
        let usage = MockUsageStore::default();
        usage.seed("COINMARKETCAP", 285, t0() - Duration::days(2));
        let h = harness_with(
            crypto_config(&["BTC"]),
            MockProvider::coinmarketcap(),
            MockQuoteStore::new(),
            usage,
        );

        let report = h.service.run_at(t0()).await;

        assert_eq!(report.status, SyncStatus::Skipped);
        assert!(report.skipped);
        assert!(report.skip_reason.as_deref().unwrap().contains("285/285"));
        assert!(!report.calls_made.any());
        assert!(h.provider.calls().is_empty());
        assert_eq!(h.usage.all().len(), 285);
        assert_eq!(h.store.upsert_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_usage_from_previous_month_does_not_count() {
        let usage = MockUsageStore::default();
        usage.seed("COINMARKETCAP", 300, Utc.with_ymd_and_hms(2024, 5, 31, 23, 0, 0).unwrap());
        let h = harness_with(
            crypto_config(&["BTC"]),
            MockProvider::coinmarketcap(),
            MockQuoteStore::new(),
            usage,
        );

        let report = h.service.run_at(t0()).await;

        assert_eq!(report.status, SyncStatus::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_run_within_interval_is_a_no_op() {
        let h = harness(crypto_config(&["BTC", "ETH"]), MockProvider::coinmarketcap());
        h.service.run_at(t0()).await;
        let snapshot = h.store.snapshot();
        let upserts = h.store.upsert_count();
        let calls = h.provider.calls().len();
        let records = h.usage.all().len();

        let report = h.service.run_at(t0() + Duration::minutes(1)).await;

        assert_eq!(report.status, SyncStatus::Skipped);
        assert_eq!(report.next_eligible_at, Some(t0() + Duration::hours(4)));
        assert_eq!(h.store.snapshot(), snapshot);
        assert_eq!(h.store.upsert_count(), upserts);
        assert_eq!(h.provider.calls().len(), calls);
        assert_eq!(h.usage.all().len(), records);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nan_price_fails_only_that_symbol() {
        let store = MockQuoteStore::new();
        let yesterday = t0() - Duration::days(1);
        store.add_quote(metal_row("XAU", dec!(2300), yesterday));
        store.add_quote(metal_row("XAG", dec!(29.5), yesterday));

        let provider = MockProvider::metals();
        provider.set_price("XAU", "XAU", Some(f64::NAN));
        provider.set_price("XAG", "XAG", Some(30.25));

        let h = harness_with(
            ProviderConfig::commodities(symbols(&["XAU", "XAG"])),
            provider,
            store,
            MockUsageStore::default(),
        );

        let report = h.service.run_at(t0()).await;

        assert_eq!(report.status, SyncStatus::Partial);
        assert_eq!(report.updated, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors[0].symbol, "XAU");
        assert!(report.errors[0].reason.contains("NaN"));

        let gold = h.store.get(AssetClass::Commodity, "XAU").unwrap();
        assert_eq!(gold.price, dec!(2300));
        assert_eq!(gold.last_updated, yesterday);

        let silver = h.store.get(AssetClass::Commodity, "XAG").unwrap();
        assert_eq!(silver.price, dec!(30.25));
        assert_eq!(silver.last_updated, t0());
    }

    #[tokio::test(start_paused = true)]
    async fn test_metadata_call_scoped_to_stale_symbols() {
        let store = MockQuoteStore::new();
        let fresh = Quote {
            asset_class: AssetClass::Crypto,
            symbol: "BTC".to_string(),
            display_name: "Bitcoin (cached)".to_string(),
            logo_url: Some("https://cached/btc.png".to_string()),
            price: dec!(60000),
            percent_change: None,
            provider_internal_id: Some("1".to_string()),
            last_updated: t0() - Duration::days(1),
            metadata_updated_at: Some(t0() - Duration::days(2)),
        };
        let stale = Quote {
            symbol: "ETH".to_string(),
            display_name: "Ether".to_string(),
            provider_internal_id: Some("1027".to_string()),
            metadata_updated_at: Some(t0() - Duration::days(10)),
            ..fresh.clone()
        };
        store.add_quote(fresh);
        store.add_quote(stale);

        let h = harness_with(
            crypto_config(&["BTC", "ETH"]),
            MockProvider::coinmarketcap(),
            store,
            MockUsageStore::default(),
        );

        let report = h.service.run_at(t0()).await;

        assert!(!report.calls_made.ids);
        assert_eq!(h.provider.calls_of(CallKind::Metadata), vec![symbols(&["1027"])]);
        assert_eq!(
            h.provider.calls_of(CallKind::Quotes),
            vec![symbols(&["1", "1027"])]
        );

        let btc = h.store.get(AssetClass::Crypto, "BTC").unwrap();
        assert_eq!(btc.display_name, "Bitcoin (cached)");
        assert_eq!(btc.metadata_updated_at, Some(t0() - Duration::days(2)));
        assert_eq!(btc.price, dec!(64000));

        let eth = h.store.get(AssetClass::Crypto, "ETH").unwrap();
        assert_eq!(eth.display_name, "Ethereum");
        assert_eq!(eth.metadata_updated_at, Some(t0()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unresolved_symbol_is_item_failure() {
        let h = harness(crypto_config(&["BTC", "NOPE"]), MockProvider::coinmarketcap());

        let report = h.service.run_at(t0()).await;

        assert_eq!(report.status, SyncStatus::Partial);
        assert_eq!(report.updated, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors[0].symbol, "NOPE");
        assert_eq!(h.provider.calls_of(CallKind::Metadata), vec![symbols(&["1"])]);
        assert!(h.store.get(AssetClass::Crypto, "NOPE").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_resolved_skips_quotes_call() {
        let h = harness(crypto_config(&["NOPE"]), MockProvider::coinmarketcap());

        let report = h.service.run_at(t0()).await;

        assert_eq!(report.status, SyncStatus::Failed);
        assert!(report.calls_made.ids);
        assert!(!report.calls_made.quotes);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_symbol_missing_from_response_is_item_failure() {
        let provider = MockProvider::metals();
        provider.set_price("XAU", "XAU", Some(2400.0));
        let h = harness(ProviderConfig::commodities(symbols(&["XAU", "XPT"])), provider);

        let report = h.service.run_at(t0()).await;

        assert_eq!(report.updated, 1);
        assert_eq!(report.errors[0].symbol, "XPT");
        assert!(report.errors[0].reason.contains("No quote"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_exhaustion_fails_cycle() {
        let provider = MockProvider::metals();
        provider.set_price("XAU", "XAU", Some(2400.0));
        provider.fail_always(CallKind::Quotes, rate_limited);
        let h = harness(
            ProviderConfig::commodities(symbols(&["XAU"]))
                .with_retry(3, StdDuration::from_millis(1000)),
            provider,
        );
        let start = tokio::time::Instant::now();

        let report = h.service.run_at(t0()).await;

        assert_eq!(report.status, SyncStatus::Failed);
        assert!(report.error.as_deref().unwrap().contains("after 3 attempts"));
        assert!(report.calls_made.quotes);
        assert_eq!(h.provider.calls_of(CallKind::Quotes).len(), 3);
        assert_eq!(h.store.upsert_count(), 0);

        let records = h.usage.all();
        assert_eq!(records.len(), 3);
        assert!(records
            .iter()
            .all(|r| !r.success && r.status_code == Some(429)));
        assert!(start.elapsed() >= StdDuration::from_millis(6000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_rate_limit_recovers() {
        let provider = MockProvider::coinmarketcap();
        provider.script_errors(CallKind::Quotes, vec![rate_limited]);
        let h = harness(crypto_config(&["BTC"]), provider);

        let report = h.service.run_at(t0()).await;

        assert_eq!(report.status, SyncStatus::Success);
        assert_eq!(h.provider.calls_of(CallKind::Quotes).len(), 2);

        let quote_records: Vec<_> = h
            .usage
            .all()
            .into_iter()
            .filter(|r| r.endpoint == "/quotes")
            .collect();
        assert_eq!(quote_records.len(), 2);
        assert_eq!(quote_records[0].status_code, Some(429));
        assert!(!quote_records[0].success);
        assert!(quote_records[1].success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_failure_spends_full_retry_budget() {
        let provider = MockProvider::coinmarketcap();
        provider.fail_always(CallKind::Ids, unauthorized);
        let h = harness(crypto_config(&["BTC"]), provider);
        let start = tokio::time::Instant::now();

        let report = h.service.run_at(t0()).await;

        assert_eq!(report.status, SyncStatus::Failed);
        assert!(report.error.as_deref().unwrap().contains("after 3 attempts"));
        assert_eq!(h.provider.calls_of(CallKind::Ids).len(), 3);
        assert!(!report.calls_made.quotes);

        // Every attempt is logged with the status the server sent.
        let records = h.usage.all();
        assert_eq!(records.len(), 3);
        assert!(records
            .iter()
            .all(|r| !r.success && r.status_code == Some(403)));
        // Generic curve: 1000ms + 2000ms.
        assert!(start.elapsed() >= StdDuration::from_millis(3000));
        assert!(start.elapsed() < StdDuration::from_millis(6000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ledger_write_failure_does_not_block_cycle() {
        let usage = MockUsageStore::default();
        usage.reject_writes();
        let h = harness_with(
            crypto_config(&["BTC", "ETH"]),
            MockProvider::coinmarketcap(),
            MockQuoteStore::new(),
            usage,
        );

        let report = h.service.run_at(t0()).await;

        assert_eq!(report.status, SyncStatus::Success);
        assert_eq!(report.updated, 2);
        assert!(report.calls_made.ids && report.calls_made.metadata && report.calls_made.quotes);
        assert!(h.usage.all().is_empty());
        assert_eq!(
            h.store.get(AssetClass::Crypto, "ETH").unwrap().price,
            dec!(3100)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_metadata_entry_keeps_cached_fields() {
        let store = MockQuoteStore::new();
        store.add_quote(Quote {
            asset_class: AssetClass::Crypto,
            symbol: "BTC".to_string(),
            display_name: "Bitcoin (cached)".to_string(),
            logo_url: None,
            price: dec!(60000),
            percent_change: None,
            provider_internal_id: Some("1".to_string()),
            last_updated: t0() - Duration::days(1),
            metadata_updated_at: Some(t0() - Duration::days(1)),
        });
        let provider = MockProvider::coinmarketcap();
        provider
            .metadata
            .lock()
            .unwrap()
            .insert("1".to_string(), AssetMetadata::default());
        let h = harness_with(
            crypto_config(&["BTC"]),
            provider,
            store,
            MockUsageStore::default(),
        );

        let report = h.service.run_at(t0()).await;

        // No logo cached, so metadata was requested.
        assert_eq!(h.provider.calls_of(CallKind::Metadata), vec![symbols(&["1"])]);
        assert_eq!(report.updated, 1);

        let btc = h.store.get(AssetClass::Crypto, "BTC").unwrap();
        assert_eq!(btc.price, dec!(64000));
        assert_eq!(btc.display_name, "Bitcoin (cached)");
        assert_eq!(btc.metadata_updated_at, Some(t0() - Duration::days(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_metadata_failure_aborts_before_quotes() {
        let provider = MockProvider::coinmarketcap();
        provider.fail_always(CallKind::Metadata, || MarketDataError::Timeout {
            provider: "TEST".to_string(),
        });
        let h = harness(crypto_config(&["BTC"]), provider);

        let report = h.service.run_at(t0()).await;

        assert_eq!(report.status, SyncStatus::Failed);
        assert!(report.calls_made.metadata);
        assert!(!report.calls_made.quotes);
        assert!(report.error.as_deref().unwrap().starts_with("metadata call failed"));
        assert_eq!(h.store.upsert_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_write_failure_is_per_item() {
        let store = MockQuoteStore::new();
        store.fail_on("ETH");
        let h = harness_with(
            crypto_config(&["BTC", "ETH"]),
            MockProvider::coinmarketcap(),
            store,
            MockUsageStore::default(),
        );

        let report = h.service.run_at(t0()).await;

        assert_eq!(report.status, SyncStatus::Partial);
        assert_eq!(report.updated, 1);
        assert!(report.errors[0].reason.contains("Intentional write failure"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_delay_between_upserts() {
        let provider = MockProvider::metals();
        for symbol in ["XAU", "XAG", "XPT"] {
            provider.set_price(symbol, symbol, Some(100.0));
        }
        let h = harness(
            ProviderConfig::commodities(symbols(&["XAU", "XAG", "XPT"]))
                .with_write_delay(StdDuration::from_millis(50)),
            provider,
        );
        let start = tokio::time::Instant::now();

        let report = h.service.run_at(t0()).await;

        assert_eq!(report.updated, 3);
        // Two gaps between three writes, none before the first.
        let elapsed = start.elapsed();
        assert!(elapsed >= StdDuration::from_millis(100));
        assert!(elapsed < StdDuration::from_millis(150));
    }

    #[tokio::test(start_paused = true)]
    async fn test_warning_is_carried_into_report() {
        let usage = MockUsageStore::default();
        usage.seed("METAL_PRICE_API", 86, t0() - Duration::days(1));
        let provider = MockProvider::metals();
        provider.set_price("XAU", "XAU", Some(2400.0));
        let h = harness_with(
            ProviderConfig::commodities(symbols(&["XAU"])),
            provider,
            MockQuoteStore::new(),
            usage,
        );

        let report = h.service.run_at(t0()).await;

        assert_eq!(report.status, SyncStatus::Success);
        assert!(report.warning.as_deref().unwrap().contains("86/100"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_tracked_symbols_is_skipped() {
        let h = harness(ProviderConfig::crypto(vec![]), MockProvider::coinmarketcap());

        let report = h.service.run_at(t0()).await;

        assert!(report.skipped);
        assert!(h.provider.calls().is_empty());
    }

    #[test]
    fn test_new_rejects_mismatched_provider() {
        let ledger = Arc::new(UsageLedger::new(Arc::new(MockUsageStore::default())));
        let result = QuoteSyncService::new(
            ProviderConfig::stocks(symbols(&["AAPL"])),
            Arc::new(MockProvider::coinmarketcap()),
            Arc::new(MockQuoteStore::new()),
            ledger,
        );
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_serializes_camel_case() {
        let h = harness(crypto_config(&["BTC"]), MockProvider::coinmarketcap());

        let report = h.service.run_at(t0()).await;
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["assetClass"], "CRYPTO");
        assert_eq!(json["callsMade"]["ids"], true);
        assert_eq!(json["status"], "Success");
        assert!(report.summary().contains("updated 1"));
    }
}
