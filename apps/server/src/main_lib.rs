use std::sync::Arc;

use crate::config::{Config, ProviderSettings};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use marketcache_core::{
    quotes::{ProviderConfig, QuoteSyncService, QuoteSyncServiceTrait},
    usage::UsageLedger,
};
use marketcache_market_data::{
    CoinMarketCapProvider, FinancialModelingPrepProvider, MarketDataProvider,
    MetalPriceApiProvider,
};
use marketcache_storage_sqlite::{
    db::{self, spawn_writer},
    market_data::MarketDataRepository,
    usage::UsageRepository,
};

pub struct AppState {
    pub db_path: String,
    pub sync_services: Vec<Arc<dyn QuoteSyncServiceTrait>>,
}

pub fn init_tracing() {
    let log_format = std::env::var("MC_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

fn provider_config(base: ProviderConfig, settings: &ProviderSettings) -> ProviderConfig {
    match settings.monthly_limit {
        Some(limit) => base.with_monthly_limit(limit),
        None => base,
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    // Keep DATABASE_URL aligned with MC_DB_PATH so storage picks the right file
    std::env::set_var("DATABASE_URL", &config.db_path);
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = spawn_writer((*pool).clone());

    let quote_store = Arc::new(MarketDataRepository::new(pool.clone(), writer.clone()));
    let usage_store = Arc::new(UsageRepository::new(pool.clone(), writer.clone()));
    let ledger = Arc::new(UsageLedger::new(usage_store));

    let mut sync_services: Vec<Arc<dyn QuoteSyncServiceTrait>> = Vec::new();
    let mut register = |config: ProviderConfig,
                        provider: Arc<dyn MarketDataProvider>|
     -> anyhow::Result<()> {
        tracing::info!(
            "Scheduling {} for {} symbol(s)",
            provider.id(),
            config.tracked_symbols().len()
        );
        let service =
            QuoteSyncService::new(config, provider, quote_store.clone(), ledger.clone())?;
        sync_services.push(Arc::new(service));
        Ok(())
    };

    if let Some(settings) = &config.stocks {
        register(
            provider_config(ProviderConfig::stocks(settings.symbols.clone()), settings),
            Arc::new(FinancialModelingPrepProvider::new(settings.api_key.clone())),
        )?;
    }
    if let Some(settings) = &config.crypto {
        register(
            provider_config(ProviderConfig::crypto(settings.symbols.clone()), settings),
            Arc::new(CoinMarketCapProvider::new(settings.api_key.clone())),
        )?;
    }
    if let Some(settings) = &config.metals {
        register(
            provider_config(ProviderConfig::commodities(settings.symbols.clone()), settings),
            Arc::new(MetalPriceApiProvider::new(settings.api_key.clone())),
        )?;
    }

    if sync_services.is_empty() {
        tracing::warn!("No provider API keys configured; nothing will be synced");
    }

    Ok(Arc::new(AppState {
        db_path,
        sync_services,
    }))
}
