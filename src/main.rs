use axum::Router;
use roadwatch::cache::{MemoryMemo, RedisMemo, ResponseMemo};
use roadwatch::config::Config;
use roadwatch::constants::DEFAULT_MEMO_MAX_ENTRIES;
use roadwatch::coordinator::{RequestCoordinator, RoutePlanner};
use roadwatch::db::{
    DriverStatsStore, HazardStore, InMemoryDriverStatsStore, InMemoryHazardStore,
    PgDriverStatsStore, PgHazardStore,
};
use roadwatch::navigation::Navigator;
use roadwatch::services::providers::{OpenRouteServiceClient, RoutingProvider, TomTomRoutingClient};
use roadwatch::services::{
    GeocodingService, LocalClock, RouteAcquisitionService, TomTomFlowClient, TomTomIncidentClient,
    TrafficFlowProvider, TrafficIncidentProvider,
};
use roadwatch::AppState;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roadwatch=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| format!("Failed to load configuration: {}", e))?;

    tracing::info!("Starting roadwatch API server");
    tracing::info!("Configuration loaded successfully");

    // Hazard alerts and driver stats: PostgreSQL when configured
    let (hazards, stats): (Arc<dyn HazardStore>, Arc<dyn DriverStatsStore>) =
        if let Some(ref database_url) = config.database_url {
            tracing::info!("Connecting to database...");
            let db_pool = roadwatch::db::create_pool(database_url).await?;
            tracing::info!("Database connection established");

            tracing::info!("Running database migrations...");
            sqlx::migrate!("./migrations").run(&db_pool).await?;
            tracing::info!("Database migrations completed");

            (
                Arc::new(PgHazardStore::new(db_pool.clone())),
                Arc::new(PgDriverStatsStore::new(db_pool)),
            )
        } else {
            tracing::info!("DATABASE_URL not configured. Using in-memory hazard and stats stores.");
            (
                Arc::new(InMemoryHazardStore::default()),
                Arc::new(InMemoryDriverStatsStore::default()),
            )
        };

    // Initialize memo: try Redis, fall back to in-memory
    let memo: Arc<dyn ResponseMemo> = if let Some(ref redis_url) = config.redis_url {
        tracing::info!("Connecting to Redis memo...");
        match RedisMemo::new(redis_url).await {
            Ok(redis_memo) => {
                tracing::info!("Redis memo connection established");
                Arc::new(redis_memo)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to connect to Redis: {}. Falling back to in-memory memo.",
                    e
                );
                Arc::new(MemoryMemo::new(DEFAULT_MEMO_MAX_ENTRIES))
            }
        }
    } else {
        tracing::info!("Redis URL not configured. Using in-memory memo.");
        Arc::new(MemoryMemo::new(DEFAULT_MEMO_MAX_ENTRIES))
    };

    // Routing providers and live traffic
    let primary: Arc<dyn RoutingProvider> = Arc::new(OpenRouteServiceClient::with_base_url(
        config.ors_api_key.clone(),
        config.ors_base_url.clone(),
    ));
    let (secondary, traffic, incidents) = match config.tomtom_api_key {
        Some(ref key) => {
            let routing: Arc<dyn RoutingProvider> = Arc::new(TomTomRoutingClient::with_base_url(
                key.clone(),
                config.tomtom_base_url.clone(),
            ));
            let flow: Arc<dyn TrafficFlowProvider> = Arc::new(TomTomFlowClient::with_base_url(
                key.clone(),
                config.tomtom_base_url.clone(),
                Some(memo.clone()),
            ));
            let incidents: Arc<dyn TrafficIncidentProvider> =
                Arc::new(TomTomIncidentClient::with_base_url(
                    key.clone(),
                    config.tomtom_base_url.clone(),
                    Some(memo.clone()),
                ));
            (Some(routing), Some(flow), Some(incidents))
        }
        None => {
            tracing::info!(
                "TOMTOM_API_KEY not set. Secondary provider, live traffic and incidents disabled."
            );
            (None, None, None)
        }
    };

    // Initialize services
    let acquisition = Arc::new(RouteAcquisitionService::new(
        primary,
        secondary,
        traffic,
        LocalClock::from_offset_hours(config.local_utc_offset_hours),
    ));
    let coordinator = Arc::new(RequestCoordinator::new(&config.coordinator));
    let planner = Arc::new(RoutePlanner::new(coordinator, acquisition));
    let navigator = Navigator::new(
        planner.clone(),
        hazards.clone(),
        stats,
        config.navigation.clone(),
    );
    let geocoder = GeocodingService::with_base_url(config.nominatim_base_url.clone(), memo.clone());

    // Create application state
    let state = Arc::new(AppState {
        planner,
        geocoder,
        incidents,
        navigator,
        hazards,
        memo,
    });

    // Build router with CORS and tracing
    let app = Router::new()
        .nest("/api/v1", roadwatch::routes::create_router(state))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = config.server_address();
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
