//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{load_data_dir, MemoryAdapter},
    config::Config,
    error::ApiError,
    web::{self, rest::ApiDoc, state::AppState},
};
use axum::Router;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Bulk Load the Data Directory ---
    info!("Loading data from {}...", config.data_dir.display());
    let store = Arc::new(MemoryAdapter::new());
    let summary = load_data_dir(&store, &config.data_dir).await?;
    match summary.reference_time {
        Some(now) => info!("Age filters are measured from {}", now),
        None => info!("No options file found; age filters use the system clock."),
    }

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        store,
        reference_time: summary.reference_time,
    });

    // --- 4. Create the Web Router ---
    let app = Router::new()
        .merge(web::router(app_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));
    let app = if config.compress {
        info!("Response compression enabled.");
        app.layer(CompressionLayer::new())
    } else {
        app
    };

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
