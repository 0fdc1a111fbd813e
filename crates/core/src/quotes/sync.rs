//! Quote synchronization service.
//!
//! This module provides the `QuoteSyncService` which runs one budget-aware
//! refresh cycle for a single provider.
//!
//! # Architecture
//!
//! ```text
//! QuoteSyncService
//!       │
//!       ├─► BudgetGatekeeper (quota + minimum interval)
//!       ├─► StalenessPlanner (which call categories this cycle needs)
//!       ├─► RetryExecutor → MarketDataProvider (batched upstream calls)
//!       ├─► UsageLedger (one record per attempt)
//!       └─► QuoteStore (per-symbol upserts)
//! ```
//!
//! # Failure semantics
//!
//! - A denied cycle makes no upstream calls and writes nothing
//! - A batched call that exhausts its retries fails the whole cycle
//! - A single bad record is reported per item and never aborts the batch

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use super::model::{MetadataUpdate, QuoteUpdate};
use super::planner::{StalenessPlanner, SyncPlan};
use super::provider_config::ProviderConfig;
use super::store::QuoteStore;
use super::validation::validate_quote;
use crate::errors::{Result, ValidationError};
use crate::limits::BudgetGatekeeper;
use crate::usage::UsageLedger;
use marketcache_market_data::{
    AssetClass, AssetMetadata, CallKind, InternalId, MarketDataError, MarketDataProvider,
    ProviderQuote, RetryError, RetryExecutor,
};

// =============================================================================
// Sync Report Types
// =============================================================================

/// Status of a sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStatus {
    /// Every tracked symbol was updated.
    Success,
    /// Some symbols were updated, some failed.
    Partial,
    /// The cycle did not run (budget denial or nothing tracked).
    Skipped,
    /// A batched call failed, or no symbol could be updated.
    Failed,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Success => write!(f, "success"),
            SyncStatus::Partial => write!(f, "partial"),
            SyncStatus::Skipped => write!(f, "skipped"),
            SyncStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Which upstream call categories were exercised this cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallsMade {
    pub ids: bool,
    pub metadata: bool,
    pub quotes: bool,
}

impl CallsMade {
    pub fn any(&self) -> bool {
        self.ids || self.metadata || self.quotes
    }

    fn mark(&mut self, kind: CallKind) {
        match kind {
            CallKind::Ids => self.ids = true,
            CallKind::Metadata => self.metadata = true,
            CallKind::Quotes => self.quotes = true,
        }
    }
}

impl fmt::Display for CallsMade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (self.ids, "ids"),
            (self.metadata, "metadata"),
            (self.quotes, "quotes"),
        ]
        .iter()
        .filter(|(made, _)| *made)
        .map(|(_, name)| *name)
        .collect();

        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join(", "))
        }
    }
}

/// Per-symbol failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
    pub symbol: String,
    pub reason: String,
}

/// Aggregate result of one sync cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub provider: String,
    pub asset_class: AssetClass,
    pub status: SyncStatus,
    /// Symbols written this cycle.
    pub updated: usize,
    /// Symbols that failed per item.
    pub failed: usize,
    pub skipped: bool,
    pub skip_reason: Option<String>,
    pub next_eligible_at: Option<DateTime<Utc>>,
    /// Soft budget warning carried from the gatekeeper.
    pub warning: Option<String>,
    pub calls_made: CallsMade,
    pub errors: Vec<ItemError>,
    /// Cycle-level failure cause.
    pub error: Option<String>,
}

impl SyncReport {
    fn new(config: &ProviderConfig) -> Self {
        Self {
            provider: config.provider_id.clone(),
            asset_class: config.asset_class,
            status: SyncStatus::Success,
            updated: 0,
            failed: 0,
            skipped: false,
            skip_reason: None,
            next_eligible_at: None,
            warning: None,
            calls_made: CallsMade::default(),
            errors: Vec::new(),
            error: None,
        }
    }

    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        match self.status {
            SyncStatus::Skipped => format!(
                "{} ({}) skipped: {}",
                self.provider,
                self.asset_class,
                self.skip_reason.as_deref().unwrap_or("no reason given")
            ),
            SyncStatus::Failed if self.error.is_some() => format!(
                "{} ({}) failed: {} [calls: {}]",
                self.provider,
                self.asset_class,
                self.error.as_deref().unwrap_or_default(),
                self.calls_made
            ),
            _ => format!(
                "{} ({}) {}: updated {}, failed {} [calls: {}]",
                self.provider,
                self.asset_class,
                self.status,
                self.updated,
                self.failed,
                self.calls_made
            ),
        }
    }

    fn skip(mut self, reason: impl Into<String>, next_eligible_at: Option<DateTime<Utc>>) -> Self {
        self.status = SyncStatus::Skipped;
        self.skipped = true;
        self.skip_reason = Some(reason.into());
        self.next_eligible_at = next_eligible_at;
        self
    }

    fn fail(mut self, error: impl Into<String>) -> Self {
        self.status = SyncStatus::Failed;
        self.error = Some(error.into());
        self
    }

    fn add_failure(&mut self, symbol: &str, reason: impl Into<String>) {
        self.failed += 1;
        self.errors.push(ItemError {
            symbol: symbol.to_string(),
            reason: reason.into(),
        });
    }

    fn finish(mut self) -> Self {
        self.status = match (self.updated, self.failed) {
            (_, 0) => SyncStatus::Success,
            (0, _) => SyncStatus::Failed,
            _ => SyncStatus::Partial,
        };
        self
    }
}

// =============================================================================
// Service Trait
// =============================================================================

/// Trait for a provider's sync cycle, as seen by a scheduler.
#[async_trait]
pub trait QuoteSyncServiceTrait: Send + Sync {
    fn provider_id(&self) -> &str;

    /// Run one cycle now. Never returns an error: every anticipated failure
    /// is captured in the report.
    async fn run_sync_cycle(&self) -> SyncReport;
}

// =============================================================================
// Quote Sync Service
// =============================================================================

/// Budget-aware sync cycle for one provider.
pub struct QuoteSyncService {
    config: ProviderConfig,
    provider: Arc<dyn MarketDataProvider>,
    quote_store: Arc<dyn QuoteStore>,
    ledger: Arc<UsageLedger>,
    gatekeeper: BudgetGatekeeper,
    planner: StalenessPlanner,
    executor: RetryExecutor,
}

impl QuoteSyncService {
    /// Create a sync service. Fails when the config is invalid or does not
    /// match the provider it is paired with.
    pub fn new(
        config: ProviderConfig,
        provider: Arc<dyn MarketDataProvider>,
        quote_store: Arc<dyn QuoteStore>,
        ledger: Arc<UsageLedger>,
    ) -> Result<Self> {
        config.validate()?;

        let capabilities = provider.capabilities();
        if capabilities.asset_class != config.asset_class {
            return Err(ValidationError::InvalidConfig(format!(
                "provider {} serves {} but config is for {}",
                provider.id(),
                capabilities.asset_class,
                config.asset_class
            ))
            .into());
        }
        if provider.id() != config.provider_id {
            return Err(ValidationError::InvalidConfig(format!(
                "config for {} paired with provider {}",
                config.provider_id,
                provider.id()
            ))
            .into());
        }

        Ok(Self {
            gatekeeper: BudgetGatekeeper::new(ledger.clone(), quote_store.clone()),
            planner: StalenessPlanner::new(config.metadata_ttl),
            executor: config.retry.executor(),
            config,
            provider,
            quote_store,
            ledger,
        })
    }

    /// Run one cycle at the current time.
    pub async fn run(&self) -> SyncReport {
        self.run_at(Utc::now()).await
    }

    /// Run one cycle as of `now`.
    pub async fn run_at(&self, now: DateTime<Utc>) -> SyncReport {
        let report = self.run_cycle(now).await;
        match report.status {
            SyncStatus::Failed => error!("{}", report.summary()),
            _ => info!("{}", report.summary()),
        }
        report
    }

    async fn run_cycle(&self, now: DateTime<Utc>) -> SyncReport {
        let mut report = SyncReport::new(&self.config);
        let asset_class = self.config.asset_class;

        let symbols = self.config.tracked_symbols();
        if symbols.is_empty() {
            return report.skip("No symbols tracked", None);
        }

        // 1. Budget
        let decision = self.gatekeeper.can_refresh(&self.config, now);
        if !decision.allowed {
            let reason = decision
                .reason
                .unwrap_or_else(|| "Refresh not allowed".to_string());
            return report.skip(reason, decision.next_eligible_at);
        }
        report.warning = decision.warning;

        // 2. Plan
        let cached = match self.quote_store.get_quotes(asset_class, &symbols) {
            Ok(cached) => cached,
            Err(e) => return report.fail(format!("Failed to read cached quotes: {}", e)),
        };
        let capabilities = self.provider.capabilities();
        let mut plan = self.planner.plan(&capabilities, &symbols, &cached, now);

        // 3. Upstream calls: ids, metadata, quotes
        let mut newly_resolved = HashSet::new();
        if plan.needs_ids() {
            let ids_needed = plan.ids_needed.clone();
            report.calls_made.mark(CallKind::Ids);
            match self
                .call(CallKind::Ids, || self.provider.resolve_ids(&ids_needed))
                .await
            {
                Ok(resolved) => {
                    for symbol in plan.apply_resolved_ids(&resolved) {
                        warn!("{}: could not resolve an id for {}", self.config.provider_id, symbol);
                        report.add_failure(&symbol, "Symbol not found by provider");
                    }
                    newly_resolved.extend(resolved.into_keys());
                }
                Err(e) => return report.fail(call_failure(CallKind::Ids, e)),
            }
        }

        let mut metadata: HashMap<InternalId, AssetMetadata> = HashMap::new();
        if plan.needs_metadata() {
            let ids = plan.metadata_ids();
            report.calls_made.mark(CallKind::Metadata);
            match self
                .call(CallKind::Metadata, || self.provider.fetch_metadata(&ids))
                .await
            {
                Ok(fetched) => metadata = fetched,
                Err(e) => return report.fail(call_failure(CallKind::Metadata, e)),
            }
        }

        let quote_ids = plan.quote_ids();
        if quote_ids.is_empty() {
            return report.finish();
        }
        report.calls_made.mark(CallKind::Quotes);
        let quotes = match self
            .call(CallKind::Quotes, || self.provider.fetch_quotes(&quote_ids))
            .await
        {
            Ok(quotes) => quotes,
            Err(e) => return report.fail(call_failure(CallKind::Quotes, e)),
        };

        // 4. Validate and merge, one symbol at a time
        self.merge(&plan, &quotes, &metadata, &newly_resolved, now, &mut report)
            .await;

        report.finish()
    }

    async fn merge(
        &self,
        plan: &SyncPlan,
        quotes: &HashMap<InternalId, ProviderQuote>,
        metadata: &HashMap<InternalId, AssetMetadata>,
        newly_resolved: &HashSet<String>,
        now: DateTime<Utc>,
        report: &mut SyncReport,
    ) {
        let mut first_write = true;

        for symbol in &plan.symbols {
            let Some(id) = plan.id_map.get(symbol) else {
                continue;
            };

            let validated = match validate_quote(quotes.get(id)) {
                Ok(v) => v,
                Err(reason) => {
                    warn!(
                        "{}: rejected quote for {} ({}): {}",
                        self.config.provider_id, symbol, id, reason
                    );
                    report.add_failure(symbol, reason);
                    continue;
                }
            };

            let mut update =
                QuoteUpdate::new(symbol.clone(), validated.price, validated.percent_change, now);
            if newly_resolved.contains(symbol) {
                update = update.with_internal_id(id.clone());
            }
            if plan.is_metadata_needed(symbol) {
                if let Some(meta) = metadata.get(id).filter(|m| !m.is_empty()) {
                    update = update.with_metadata(MetadataUpdate {
                        display_name: meta.name.clone(),
                        logo_url: meta.logo_url.clone(),
                    });
                } else {
                    debug!("{}: no metadata returned for {}", self.config.provider_id, symbol);
                }
            }

            if !first_write && !self.config.write_delay.is_zero() {
                tokio::time::sleep(self.config.write_delay).await;
            }
            first_write = false;

            match self
                .quote_store
                .upsert_quote(self.config.asset_class, update)
                .await
            {
                Ok(_) => report.updated += 1,
                Err(e) => {
                    warn!("{}: failed to store {}: {}", self.config.provider_id, symbol, e);
                    report.add_failure(symbol, format!("Failed to store quote: {}", e));
                }
            }
        }
    }

    /// Run one batched call through the retry executor, recording every
    /// attempt in the usage ledger.
    async fn call<T, F, Fut>(
        &self,
        kind: CallKind,
        operation: F,
    ) -> std::result::Result<T, RetryError<MarketDataError>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, MarketDataError>>,
    {
        let provider = self.config.provider_id.as_str();
        let endpoint = self.provider.endpoint(kind);
        let ledger = &self.ledger;
        let operation = &operation;

        debug!("{}: calling {} ({})", provider, kind, endpoint);

        self.executor
            .execute(move || async move {
                let result = operation().await;
                match &result {
                    Ok(_) => ledger.record(provider, endpoint, true, Some(200)).await,
                    // Nothing went over the wire.
                    Err(MarketDataError::NotSupported { .. }) => {}
                    Err(e) => ledger.record(provider, endpoint, false, e.status_code()).await,
                }
                result
            })
            .await
    }
}

fn call_failure(kind: CallKind, err: RetryError<MarketDataError>) -> String {
    match err {
        RetryError::Exhausted { attempts, last } => {
            format!("{} call failed after {} attempts: {}", kind, attempts, last)
        }
        RetryError::Aborted(e) => format!("{} call failed: {}", kind, e),
    }
}

#[async_trait]
impl QuoteSyncServiceTrait for QuoteSyncService {
    fn provider_id(&self) -> &str {
        &self.config.provider_id
    }

    async fn run_sync_cycle(&self) -> SyncReport {
        self.run().await
    }
}
