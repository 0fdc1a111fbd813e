//! Staleness-aware call planning.
//!
//! Decides which of the three upstream call categories a cycle needs:
//! - ids: only for symbols without a cached provider id
//! - metadata: only for symbols with no logo, stale metadata, or a fresh id
//! - quotes: every tracked symbol with an id, every cycle
//!
//! Each category is one batched call, so a cycle costs at most three calls
//! and usually one.

use chrono::{DateTime, Duration, Utc};
use log::debug;
use std::collections::HashMap;

use super::model::Quote;
use marketcache_market_data::{InternalId, ProviderCapabilities};

/// Calls planned for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    /// Tracked symbols in configured order.
    pub symbols: Vec<String>,
    /// Symbols to send to the batched id lookup.
    pub ids_needed: Vec<String>,
    /// Symbols to send to the batched metadata call.
    pub metadata_needed: Vec<String>,
    /// Known ids: cached, identity for providers that quote by symbol, or
    /// resolved this cycle.
    pub id_map: HashMap<String, InternalId>,
}

impl SyncPlan {
    pub fn needs_ids(&self) -> bool {
        !self.ids_needed.is_empty()
    }

    pub fn needs_metadata(&self) -> bool {
        !self.metadata_needed.is_empty()
    }

    /// Merge the id lookup result into the plan.
    ///
    /// Symbols the provider could not resolve are dropped from the metadata
    /// set and returned so the caller can report them.
    pub fn apply_resolved_ids(&mut self, resolved: &HashMap<String, InternalId>) -> Vec<String> {
        let mut unresolved = Vec::new();
        for symbol in self.ids_needed.drain(..) {
            match resolved.get(&symbol) {
                Some(id) => {
                    self.id_map.insert(symbol, id.clone());
                }
                None => unresolved.push(symbol),
            }
        }

        self.metadata_needed.retain(|s| self.id_map.contains_key(s));
        unresolved
    }

    /// Ids for the quotes call, in tracked order.
    pub fn quote_ids(&self) -> Vec<InternalId> {
        self.ids_for(&self.symbols)
    }

    /// Ids for the metadata call.
    pub fn metadata_ids(&self) -> Vec<InternalId> {
        self.ids_for(&self.metadata_needed)
    }

    pub fn is_metadata_needed(&self, symbol: &str) -> bool {
        self.metadata_needed.iter().any(|s| s == symbol)
    }

    fn ids_for(&self, symbols: &[String]) -> Vec<InternalId> {
        symbols
            .iter()
            .filter_map(|s| self.id_map.get(s).cloned())
            .collect()
    }
}

pub struct StalenessPlanner {
    metadata_ttl: Duration,
}

impl StalenessPlanner {
    pub fn new(metadata_ttl: Duration) -> Self {
        Self { metadata_ttl }
    }

    /// Plan a cycle for `tracked` given the cached rows.
    pub fn plan(
        &self,
        capabilities: &ProviderCapabilities,
        tracked: &[String],
        cached: &HashMap<String, Quote>,
        now: DateTime<Utc>,
    ) -> SyncPlan {
        let mut plan = SyncPlan {
            symbols: tracked.to_vec(),
            ..SyncPlan::default()
        };

        for symbol in tracked {
            let row = cached.get(symbol);

            let cached_id = if capabilities.resolves_ids {
                row.and_then(|q| q.provider_internal_id.clone())
            } else {
                Some(symbol.clone())
            };

            let newly_resolved = match cached_id {
                Some(id) => {
                    plan.id_map.insert(symbol.clone(), id);
                    false
                }
                None => {
                    plan.ids_needed.push(symbol.clone());
                    true
                }
            };

            if capabilities.supports_metadata
                && (newly_resolved || self.metadata_stale(row, now))
            {
                plan.metadata_needed.push(symbol.clone());
            }
        }

        debug!(
            "Planned {:?} cycle: {} symbols, {} ids needed, {} metadata needed",
            capabilities.asset_class,
            plan.symbols.len(),
            plan.ids_needed.len(),
            plan.metadata_needed.len()
        );

        plan
    }

    fn metadata_stale(&self, row: Option<&Quote>, now: DateTime<Utc>) -> bool {
        let Some(quote) = row else {
            return true;
        };
        if quote.logo_url.is_none() {
            return true;
        }
        match quote.metadata_updated_at {
            Some(at) => now - at > self.metadata_ttl,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use marketcache_market_data::AssetClass;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap()
    }

    fn crypto_caps() -> ProviderCapabilities {
        ProviderCapabilities {
            asset_class: AssetClass::Crypto,
            resolves_ids: true,
            supports_metadata: true,
        }
    }

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn cached(symbol: &str, id: Option<&str>, logo: bool, metadata_age_days: Option<i64>) -> Quote {
        Quote {
            asset_class: AssetClass::Crypto,
            symbol: symbol.to_string(),
            display_name: symbol.to_string(),
            logo_url: logo.then(|| format!("https://logo/{}.png", symbol)),
            price: dec!(1),
            percent_change: None,
            provider_internal_id: id.map(str::to_string),
            last_updated: now() - Duration::days(1),
            metadata_updated_at: metadata_age_days.map(|d| now() - Duration::days(d)),
        }
    }

    fn cache(quotes: Vec<Quote>) -> HashMap<String, Quote> {
        quotes.into_iter().map(|q| (q.symbol.clone(), q)).collect()
    }

    #[test]
    fn test_fresh_store_needs_everything() {
        let planner = StalenessPlanner::new(Duration::days(7));
        let mut plan = planner.plan(&crypto_caps(), &symbols(&["BTC", "ETH"]), &HashMap::new(), now());

        assert_eq!(plan.ids_needed, symbols(&["BTC", "ETH"]));
        assert!(plan.quote_ids().is_empty());

        let resolved = HashMap::from([
            ("BTC".to_string(), "1".to_string()),
            ("ETH".to_string(), "1027".to_string()),
        ]);
        let unresolved = plan.apply_resolved_ids(&resolved);

        assert!(unresolved.is_empty());
        assert_eq!(plan.metadata_needed, symbols(&["BTC", "ETH"]));
        assert_eq!(plan.quote_ids(), symbols(&["1", "1027"]));
        assert_eq!(plan.metadata_ids(), symbols(&["1", "1027"]));
    }

    #[test]
    fn test_cached_ids_and_fresh_metadata_need_only_quotes() {
        let planner = StalenessPlanner::new(Duration::days(7));
        let rows = cache(vec![
            cached("BTC", Some("1"), true, Some(1)),
            cached("ETH", Some("1027"), true, Some(1)),
        ]);

        let plan = planner.plan(&crypto_caps(), &symbols(&["BTC", "ETH"]), &rows, now());

        assert!(!plan.needs_ids());
        assert!(!plan.needs_metadata());
        assert_eq!(plan.quote_ids(), symbols(&["1", "1027"]));
    }

    #[test]
    fn test_only_uncached_symbols_go_to_id_lookup() {
        let planner = StalenessPlanner::new(Duration::days(7));
        let rows = cache(vec![cached("BTC", Some("1"), true, Some(1))]);

        let plan = planner.plan(&crypto_caps(), &symbols(&["BTC", "SOL"]), &rows, now());

        assert_eq!(plan.ids_needed, symbols(&["SOL"]));
        assert_eq!(plan.metadata_needed, symbols(&["SOL"]));
        assert_eq!(plan.quote_ids(), symbols(&["1"]));
    }

    #[test]
    fn test_metadata_staleness_rules() {
        let planner = StalenessPlanner::new(Duration::days(7));
        let rows = cache(vec![
            cached("FRESH", Some("1"), true, Some(6)),
            cached("STALE", Some("2"), true, Some(8)),
            cached("NOLOGO", Some("3"), false, Some(1)),
            cached("NEVER", Some("4"), true, None),
        ]);

        let plan = planner.plan(
            &crypto_caps(),
            &symbols(&["FRESH", "STALE", "NOLOGO", "NEVER"]),
            &rows,
            now(),
        );

        assert_eq!(plan.metadata_needed, symbols(&["STALE", "NOLOGO", "NEVER"]));
        assert_eq!(plan.metadata_ids(), symbols(&["2", "3", "4"]));
        // Price is never planned away.
        assert_eq!(plan.quote_ids().len(), 4);
    }

    #[test]
    fn test_unresolved_symbols_are_dropped() {
        let planner = StalenessPlanner::new(Duration::days(7));
        let mut plan = planner.plan(&crypto_caps(), &symbols(&["BTC", "NOPE"]), &HashMap::new(), now());

        let unresolved =
            plan.apply_resolved_ids(&HashMap::from([("BTC".to_string(), "1".to_string())]));

        assert_eq!(unresolved, symbols(&["NOPE"]));
        assert_eq!(plan.metadata_needed, symbols(&["BTC"]));
        assert_eq!(plan.quote_ids(), symbols(&["1"]));
    }

    #[test]
    fn test_symbol_keyed_provider_without_metadata() {
        let caps = ProviderCapabilities {
            asset_class: AssetClass::Commodity,
            resolves_ids: false,
            supports_metadata: false,
        };
        let planner = StalenessPlanner::new(Duration::days(7));

        let plan = planner.plan(&caps, &symbols(&["XAU", "XAG"]), &HashMap::new(), now());

        assert!(!plan.needs_ids());
        assert!(!plan.needs_metadata());
        assert_eq!(plan.quote_ids(), symbols(&["XAU", "XAG"]));
    }

    #[test]
    fn test_symbol_keyed_provider_with_metadata() {
        let caps = ProviderCapabilities {
            asset_class: AssetClass::Equity,
            resolves_ids: false,
            supports_metadata: true,
        };
        let planner = StalenessPlanner::new(Duration::days(7));
        let mut aapl = cached("AAPL", None, true, Some(2));
        aapl.asset_class = AssetClass::Equity;

        let plan = planner.plan(&caps, &symbols(&["AAPL", "MSFT"]), &cache(vec![aapl]), now());

        assert!(!plan.needs_ids());
        assert_eq!(plan.metadata_needed, symbols(&["MSFT"]));
        assert_eq!(plan.metadata_ids(), symbols(&["MSFT"]));
    }
}
