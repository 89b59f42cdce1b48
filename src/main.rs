use std::sync::Arc;

use papertrade::api::routes::{AppState, app_router};
use papertrade::config::Config;
use papertrade::ledger::{LedgerStore, MemoryLedger, PgLedger};
use papertrade::oracle::FinnhubOracle;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    if config.finnhub_api_key.is_empty() {
        tracing::warn!("FINNHUB_API_KEY is not set; price lookups will fail");
    }

    let ledger: Arc<dyn LedgerStore> = match &config.database_url {
        Some(url) => Arc::new(PgLedger::connect(url).await.unwrap()),
        None => {
            tracing::warn!("DATABASE_URL is not set; using in-memory ledger");
            Arc::new(MemoryLedger::new())
        }
    };
    let oracle = Arc::new(FinnhubOracle::new(config.finnhub_api_key.clone()));

    let state = AppState::new(
        ledger,
        oracle,
        config.jwt_secret.clone().into_bytes(),
        config.initial_balance,
    );

    let app = app_router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await.unwrap();
    tracing::info!("listening on {}", config.bind_addr);
    axum::serve(listener, app).await.unwrap();
}
