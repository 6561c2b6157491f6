//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for reading, creating and updating users,
//! locations and visits, and the master definition for the OpenAPI
//! specification.
//!
//! Bodies are taken as raw bytes and decoded here so that every malformed
//! body is answered like any other validation failure: 400 with `{}`.

use crate::error::ApiError;
use crate::web::protocol::{
    decode_object, AverageResponse, EmptyResponse, GenderCode, LocationPatchBody,
    LocationRecord, UserPatchBody, UserRecord, VisitEntryRecord, VisitPatchBody, VisitRecord,
    VisitsResponse,
};
use crate::web::state::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, FromRequestParts, Path, State},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;
use travels_core::EntityId;
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        get_user_handler,
        create_user_handler,
        update_user_handler,
        get_location_handler,
        create_location_handler,
        update_location_handler,
        get_visit_handler,
        create_visit_handler,
        update_visit_handler,
        crate::web::aggregates::location_avg_handler,
        crate::web::aggregates::user_visits_handler,
    ),
    components(
        schemas(
            UserRecord,
            LocationRecord,
            VisitRecord,
            GenderCode,
            UserPatchBody,
            LocationPatchBody,
            VisitPatchBody,
            EmptyResponse,
            AverageResponse,
            VisitEntryRecord,
            VisitsResponse,
        )
    ),
    tags(
        (name = "Travels API", description = "Users, locations and visits with two aggregate queries.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Helpers
//=========================================================================================

/// The `{id}` path segment. Anything that is not an id cannot name an
/// entity, so every failure to extract it is a 404 rather than a 400.
#[derive(Debug, Clone, Copy)]
pub struct IdPath(pub EntityId);

impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::NotFound(rejection.body_text()))?;
        parse_id(&raw).map(IdPath)
    }
}

fn parse_id(raw: &str) -> Result<EntityId, ApiError> {
    raw.parse::<EntityId>()
        .map_err(|_| ApiError::NotFound(format!("'{}' is not an entity id", raw)))
}

/// Decodes a JSON object body. An unreadable body (too large, broken stream)
/// is a 400 like any malformed one.
fn read_body<T: DeserializeOwned>(body: Result<Bytes, BytesRejection>) -> Result<T, ApiError> {
    let body = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    Ok(decode_object(&body)?)
}

fn done() -> Json<EmptyResponse> {
    Json(EmptyResponse {})
}

//=========================================================================================
// Users
//=========================================================================================

/// Read a user by id.
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = u32, Path, description = "User id")),
    responses(
        (status = 200, description = "The user", body = UserRecord),
        (status = 404, description = "Unknown user", body = EmptyResponse)
    )
)]
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<Json<UserRecord>, ApiError> {
    let user = state.store.get_user(id).await?;
    Ok(Json(user.into()))
}

/// Create a user.
#[utoipa::path(
    post,
    path = "/users/new",
    request_body = UserRecord,
    responses(
        (status = 200, description = "User created", body = EmptyResponse),
        (status = 400, description = "Invalid body or id already taken", body = EmptyResponse)
    )
)]
pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<EmptyResponse>, ApiError> {
    let record: UserRecord = read_body(body)?;
    let id = record.id;
    state.store.create_user(record.to_domain()).await?;
    debug!("Created user {}", id);
    Ok(done())
}

/// Partially update a user. Only the attributes present in the body change.
#[utoipa::path(
    post,
    path = "/users/{id}",
    params(("id" = u32, Path, description = "User id")),
    request_body = UserPatchBody,
    responses(
        (status = 200, description = "User updated", body = EmptyResponse),
        (status = 400, description = "Invalid body", body = EmptyResponse),
        (status = 404, description = "Unknown user", body = EmptyResponse)
    )
)]
pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<EmptyResponse>, ApiError> {
    state.store.get_user(id).await?;
    let patch = read_body::<UserPatchBody>(body)?.into_patch()?;
    state.store.update_user(id, patch).await?;
    Ok(done())
}

//=========================================================================================
// Locations
//=========================================================================================

/// Read a location by id.
#[utoipa::path(
    get,
    path = "/locations/{id}",
    params(("id" = u32, Path, description = "Location id")),
    responses(
        (status = 200, description = "The location", body = LocationRecord),
        (status = 404, description = "Unknown location", body = EmptyResponse)
    )
)]
pub async fn get_location_handler(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<Json<LocationRecord>, ApiError> {
    let location = state.store.get_location(id).await?;
    Ok(Json(location.into()))
}

/// Create a location.
#[utoipa::path(
    post,
    path = "/locations/new",
    request_body = LocationRecord,
    responses(
        (status = 200, description = "Location created", body = EmptyResponse),
        (status = 400, description = "Invalid body or id already taken", body = EmptyResponse)
    )
)]
pub async fn create_location_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<EmptyResponse>, ApiError> {
    let record: LocationRecord = read_body(body)?;
    let id = record.id;
    state.store.create_location(record.to_domain()).await?;
    debug!("Created location {}", id);
    Ok(done())
}

/// Partially update a location.
#[utoipa::path(
    post,
    path = "/locations/{id}",
    params(("id" = u32, Path, description = "Location id")),
    request_body = LocationPatchBody,
    responses(
        (status = 200, description = "Location updated", body = EmptyResponse),
        (status = 400, description = "Invalid body", body = EmptyResponse),
        (status = 404, description = "Unknown location", body = EmptyResponse)
    )
)]
pub async fn update_location_handler(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<EmptyResponse>, ApiError> {
    state.store.get_location(id).await?;
    let patch = read_body::<LocationPatchBody>(body)?.into_patch()?;
    state.store.update_location(id, patch).await?;
    Ok(done())
}

//=========================================================================================
// Visits
//=========================================================================================

/// Read a visit by id.
#[utoipa::path(
    get,
    path = "/visits/{id}",
    params(("id" = u32, Path, description = "Visit id")),
    responses(
        (status = 200, description = "The visit", body = VisitRecord),
        (status = 404, description = "Unknown visit", body = EmptyResponse)
    )
)]
pub async fn get_visit_handler(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<Json<VisitRecord>, ApiError> {
    let visit = state.store.get_visit(id).await?;
    Ok(Json(visit.into()))
}

/// Create a visit. Its user and location are not required to exist.
#[utoipa::path(
    post,
    path = "/visits/new",
    request_body = VisitRecord,
    responses(
        (status = 200, description = "Visit created", body = EmptyResponse),
        (status = 400, description = "Invalid body, mark out of range or id already taken", body = EmptyResponse)
    )
)]
pub async fn create_visit_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<EmptyResponse>, ApiError> {
    let record: VisitRecord = read_body(body)?;
    let id = record.id;
    state.store.create_visit(record.to_domain()).await?;
    debug!("Created visit {}", id);
    Ok(done())
}

/// Partially update a visit, moving it between users or locations if needed.
#[utoipa::path(
    post,
    path = "/visits/{id}",
    params(("id" = u32, Path, description = "Visit id")),
    request_body = VisitPatchBody,
    responses(
        (status = 200, description = "Visit updated", body = EmptyResponse),
        (status = 400, description = "Invalid body", body = EmptyResponse),
        (status = 404, description = "Unknown visit", body = EmptyResponse)
    )
)]
pub async fn update_visit_handler(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<EmptyResponse>, ApiError> {
    state.store.get_visit(id).await?;
    let patch = read_body::<VisitPatchBody>(body)?.into_patch()?;
    state.store.update_visit(id, patch).await?;
    Ok(done())
}
