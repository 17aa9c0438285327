pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod extract;
pub mod layout;
pub mod middleware;
pub mod models;
pub mod realtime;
pub mod redis_client;
pub mod response;
pub mod services;
pub mod store;

use axum::{extract::State, http::StatusCode, routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::cache::CacheService;
use crate::config::Config;
use crate::database::Database;
use crate::realtime::{HoldRegistry, SeatEventHub};
use crate::redis_client::RedisClient;
use crate::services::{BookingService, SeatLayoutService};
use crate::store::{PgStore, Store};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

// Shared state для всего приложения
pub struct AppState {
    pub config: Config,
    pub db: Option<Database>,
    pub hub: SeatEventHub,
    pub holds: HoldRegistry,
    pub seat_layouts: SeatLayoutService,
    pub bookings: BookingService,
}

impl AppState {
    /// Connects Postgres (running migrations) and, if configured, Redis.
    pub async fn connect(config: Config) -> anyhow::Result<Arc<Self>> {
        let db = Database::connect(&config.database).await?;
        info!("Database connected");
        db.run_migrations().await?;

        let cache = match (&config.redis.url, config.features.enable_layout_cache) {
            (Some(url), true) => match RedisClient::connect(url).await {
                Ok(redis) => CacheService::new(redis, config.redis.layout_cache_ttl_secs),
                Err(e) => {
                    warn!("Redis unavailable, layout cache disabled: {:?}", e);
                    CacheService::disabled()
                }
            },
            _ => CacheService::disabled(),
        };

        let store: Arc<dyn Store> = Arc::new(PgStore::new(&db));
        let mut state = Self::from_parts(config, store, cache);
        state.db = Some(db);
        Ok(Arc::new(state))
    }

    /// Wires services over an existing store. Used directly by tests.
    pub fn from_parts(config: Config, store: Arc<dyn Store>, cache: CacheService) -> Self {
        let hub = SeatEventHub::new(EVENT_CHANNEL_CAPACITY);
        let holds = HoldRegistry::new(hub.clone(), Duration::from_secs(config.holds.ttl_secs));
        let notifier = config
            .features
            .enable_booking_broadcast
            .then(|| hub.clone());

        Self {
            seat_layouts: SeatLayoutService::new(store.clone(), cache.clone()),
            bookings: BookingService::new(store, cache, notifier),
            config,
            db: None,
            hub,
            holds,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Cinema Booking API v1.0" }))
        .route("/health", get(health))
        .nest("/api", controllers::routes())
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::attach_request_path))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    match &state.db {
        Some(db) => match db.ping().await {
            Ok(()) => (StatusCode::OK, "OK"),
            Err(e) => {
                warn!("Health check failed: {:?}", e);
                (StatusCode::SERVICE_UNAVAILABLE, "DB unavailable")
            }
        },
        None => (StatusCode::OK, "OK"),
    }
}
