pub mod analysis;
pub mod analyze;
pub mod config;
pub mod error;
pub mod health;
pub mod ingestion;
pub mod photos;
pub mod storage;
pub mod treatments;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use crate::analysis::{gemini::GeminiProvider, plant_id::PlantIdProvider};
use crate::config::AppConfig;
use crate::health::{config_check, health_check};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: sqlx::PgPool,
    pub config: Arc<AppConfig>,
    pub gemini: GeminiProvider,
    pub plant_id: PlantIdProvider,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(AppConfig::from_env());

    if config.google_api_key.is_none() {
        tracing::warn!("GOOGLE_API_KEY not set; POST /analyze will fail against the provider");
    }
    if config.plant_id_api_key.is_none() {
        tracing::warn!("PLANT_ID_API_KEY not set; photo analysis will fail against the provider");
    }

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("Failed to connect to Postgres")?;

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .context("Failed to run database migrations")?;

    let http_client = reqwest::Client::new();
    let state = AppState {
        db_pool,
        gemini: GeminiProvider::new(
            http_client.clone(),
            config.google_api_key.clone().unwrap_or_default(),
            config.provider_timeout_secs,
        ),
        plant_id: PlantIdProvider::new(
            http_client,
            config.plant_id_api_key.clone().unwrap_or_default(),
            config.provider_timeout_secs,
        ),
        config: config.clone(),
    };

    // Body limit sits above the configured caps so the handlers get to answer
    // with a 413 that names the limit.
    let body_limit = config.max_photo_size.max(config.max_file_size) * 2;

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/analyze", post(analyze::analyze_image))
        .route("/api/analyze", post(analyze::analyze_image))
        .route("/api/photos", post(photos::handlers::upload_photo))
        .route(
            "/api/photos/analyze",
            post(photos::handlers::analyze_photo).get(photos::handlers::analysis_history),
        )
        .route(
            "/api/photos/analyze-enhanced",
            post(photos::handlers::analyze_enhanced_gone).get(photos::handlers::enhanced_history),
        )
        .route(
            "/api/photos/{id}",
            get(photos::handlers::get_photo)
                .delete(photos::handlers::delete_photo)
                .patch(photos::handlers::patch_photo),
        )
        .route("/api/treatments/details", post(treatments::treatment_details))
        .route("/api/config/check", get(config_check))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
