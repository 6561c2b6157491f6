pub mod aggregates;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;

use crate::error::ApiError;
use axum::{
    http::Uri,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub use aggregates::{location_avg_handler, user_visits_handler};
pub use middleware::log_requests;
pub use rest::{
    create_location_handler, create_user_handler, create_visit_handler, get_location_handler,
    get_user_handler, get_visit_handler, update_location_handler, update_user_handler,
    update_visit_handler, ApiDoc,
};
pub use state::AppState;

/// Builds the API router. `/{entity}/new` takes precedence over
/// `/{entity}/{id}`; unknown paths and unsupported methods are 404 with `{}`.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/users/new", post(create_user_handler))
        .route("/users/{id}", get(get_user_handler).post(update_user_handler))
        .route("/users/{id}/visits", get(user_visits_handler))
        .route("/locations/new", post(create_location_handler))
        .route(
            "/locations/{id}",
            get(get_location_handler).post(update_location_handler),
        )
        .route("/locations/{id}/avg", get(location_avg_handler))
        .route("/visits/new", post(create_visit_handler))
        .route("/visits/{id}", get(get_visit_handler).post(update_visit_handler))
        .fallback(not_found)
        .method_not_allowed_fallback(not_found)
        .layer(axum_middleware::from_fn(log_requests))
        .with_state(app_state)
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}
