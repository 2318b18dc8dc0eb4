use std::net::SocketAddr;
use std::sync::Arc;

mod auth;
mod config;
mod db;
mod dto;
mod error;
mod handlers;
mod history;
mod models;
mod routes;
mod store;

use auth::rate_limit::RateLimitState;
use config::Config;
use history::HistoryEngine;
use store::memory::MemoryStore;
use store::postgres::PgStore;
use store::{CalendarStore, MeasurementStore, ProfileStore};

#[derive(Clone)]
pub struct AppState {
    pub measurements: Arc<dyn MeasurementStore>,
    pub calendar: Arc<dyn CalendarStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub history: HistoryEngine,
    pub config: Arc<Config>,
    pub rate_limiter: RateLimitState,
}

/// Wire one backend into every store seam.
pub fn build_state<S>(store: Arc<S>, config: Arc<Config>) -> AppState
where
    S: MeasurementStore + CalendarStore + ProfileStore + 'static,
{
    let measurements: Arc<dyn MeasurementStore> = store.clone();
    AppState {
        history: HistoryEngine::new(measurements.clone(), config.history_default_points),
        measurements,
        calendar: store.clone(),
        profiles: store,
        config,
        rate_limiter: RateLimitState::new(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "healthlog_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env());

    let state = match config.database_url.as_deref() {
        Some(url) => {
            let db = db::create_pool(url).await?;

            sqlx::migrate!("./migrations").run(&db).await?;
            tracing::info!("Database migrations applied");

            build_state(Arc::new(PgStore::new(db)), config.clone())
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store; data will not survive a restart");
            build_state(Arc::new(MemoryStore::new()), config.clone())
        }
    };

    auth::rate_limit::spawn_rate_limit_cleanup(state.rate_limiter.clone());

    let app = routes::build_router(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    // Client IP is needed for rate limiting the contact form
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
