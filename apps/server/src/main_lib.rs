use std::sync::Arc;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use marketfeed_core::market_data::{
    CurrentRecordStore, MarketDataClient, MarketDataService, MarketDataServiceTrait, MarketDataStores,
    NewsStore, PriceBarStore,
};
use marketfeed_market_data::{
    FinnhubProvider, FmpProvider, Fundamentals, MarketDataProvider, Quote, RateLimiter, RetryingTransport,
};
use marketfeed_storage_sqlite::{create_pool, init, run_migrations, spawn_writer, MarketCacheRepository};

pub struct AppState {
    pub config: Config,
    pub db_path: String,
    pub limiter: Arc<RateLimiter>,
    pub market_data_service: Arc<MarketDataService>,
}

impl AppState {
    /// Release in-process caches. The writer actor stops once the last
    /// handle (held by the repository) is dropped with the state.
    pub fn shutdown(&self) {
        let (search, fundamentals) = self.market_data_service.memo_sizes();
        self.market_data_service.clear_memoized();
        tracing::info!(
            "Cleared memo tables ({} search, {} fundamentals entries)",
            search,
            fundamentals
        );
    }
}

pub fn init_tracing() {
    let log_format = std::env::var("MARKETFEED_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
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

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = create_pool(&db_path)?;
    run_migrations(&pool)?;
    let writer = spawn_writer((*pool).clone());

    // One limiter for the whole process; every adapter shares it.
    let limiter = Arc::new(RateLimiter::new());
    let transport = Arc::new(RetryingTransport::new(limiter.clone(), config.retry));

    let fmp: Arc<dyn MarketDataProvider> =
        Arc::new(FmpProvider::new(transport.clone(), config.fmp_api_key.clone()));
    let finnhub: Arc<dyn MarketDataProvider> =
        Arc::new(FinnhubProvider::new(transport.clone(), config.finnhub_api_key.clone()));

    for provider in [&fmp, &finnhub] {
        let limits = config.rate_limit.unwrap_or_else(|| provider.rate_limit());
        limiter.configure(provider.id(), limits).await;
        tracing::info!(
            "Provider {}: {} requests per {:?}",
            provider.id(),
            limits.max_requests,
            limits.window
        );
    }

    let client = Arc::new(MarketDataClient::new(fmp, finnhub));
    tracing::info!(
        "Routing: market={} fundamentals={}",
        client.market_provider_id().unwrap_or("none"),
        client.fundamentals_provider_id().unwrap_or("none")
    );

    let repository = Arc::new(MarketCacheRepository::new(pool.clone(), writer));
    let stores = MarketDataStores {
        quotes: repository.clone() as Arc<dyn CurrentRecordStore<Quote>>,
        fundamentals: repository.clone() as Arc<dyn CurrentRecordStore<Fundamentals>>,
        bars: repository.clone() as Arc<dyn PriceBarStore>,
        news: repository as Arc<dyn NewsStore>,
    };
    let market_data_service = Arc::new(MarketDataService::new(client, stores, config.freshness));

    Ok(Arc::new(AppState {
        config: config.clone(),
        db_path,
        limiter,
        market_data_service,
    }))
}
