//! services/api/src/web/aggregates.rs
//!
//! Handlers for the two aggregate queries and the parsing of their
//! query-string filters. Filters are parsed before the store is consulted, so
//! a malformed filter is a 400 even for an unknown id.

use crate::error::ApiError;
use crate::web::protocol::{AverageResponse, EmptyResponse, VisitsResponse};
use crate::web::rest::IdPath;
use crate::web::state::AppState;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use travels_core::{
    location_average, user_visits, AverageFilter, DateRange, Gender, VisitsFilter,
};
use utoipa::IntoParams;

//=========================================================================================
// Query-String Parameters
//=========================================================================================

/// Filters of `GET /locations/{id}/avg`. Date and age bounds are inclusive.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct AverageParams {
    /// Earliest `visited_at`, Unix seconds.
    #[param(value_type = Option<i64>)]
    pub from_date: Option<String>,
    /// Latest `visited_at`, Unix seconds.
    #[param(value_type = Option<i64>)]
    pub to_date: Option<String>,
    /// Minimum age of the visiting user, in years.
    #[param(value_type = Option<i64>)]
    pub from_age: Option<String>,
    /// Maximum age of the visiting user, in years.
    #[param(value_type = Option<i64>)]
    pub to_age: Option<String>,
    /// `m` or `f`.
    pub gender: Option<String>,
}

/// Filters of `GET /users/{id}/visits`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct VisitsParams {
    #[param(value_type = Option<i64>)]
    pub from_date: Option<String>,
    #[param(value_type = Option<i64>)]
    pub to_date: Option<String>,
    /// Exact country of the visited location.
    pub country: Option<String>,
    /// Only locations strictly closer than this.
    #[param(value_type = Option<i64>)]
    pub to_distance: Option<String>,
}

fn number<T: FromStr>(name: &str, raw: Option<&str>) -> Result<Option<T>, ApiError> {
    raw.map(|value| {
        value.parse::<T>().map_err(|_| {
            ApiError::BadRequest(format!("`{}` must be an integer, got {:?}", name, value))
        })
    })
    .transpose()
}

impl AverageParams {
    pub fn into_filter(self) -> Result<AverageFilter, ApiError> {
        let gender = self
            .gender
            .as_deref()
            .map(|code| {
                Gender::from_code(code)
                    .ok_or_else(|| ApiError::BadRequest(format!("Unknown gender {:?}", code)))
            })
            .transpose()?;

        Ok(AverageFilter {
            dates: DateRange {
                from: number("fromDate", self.from_date.as_deref())?,
                to: number("toDate", self.to_date.as_deref())?,
            },
            from_age: number("fromAge", self.from_age.as_deref())?,
            to_age: number("toAge", self.to_age.as_deref())?,
            gender,
        })
    }
}

impl VisitsParams {
    pub fn into_filter(self) -> Result<VisitsFilter, ApiError> {
        Ok(VisitsFilter {
            dates: DateRange {
                from: number("fromDate", self.from_date.as_deref())?,
                to: number("toDate", self.to_date.as_deref())?,
            },
            to_distance: number("toDistance", self.to_distance.as_deref())?,
            country: self.country,
        })
    }
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Average mark of a location's visits, rounded to five decimal places.
#[utoipa::path(
    get,
    path = "/locations/{id}/avg",
    params(("id" = u32, Path, description = "Location id"), AverageParams),
    responses(
        (status = 200, description = "Average mark, 0 when nothing matches", body = AverageResponse),
        (status = 400, description = "Malformed filter", body = EmptyResponse),
        (status = 404, description = "Unknown location", body = EmptyResponse)
    )
)]
pub async fn location_avg_handler(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
    query: Result<Query<AverageParams>, QueryRejection>,
) -> Result<Json<AverageResponse>, ApiError> {
    let filter = query_params(query)?.into_filter()?;
    let avg = location_average(state.store.as_ref(), id, &filter, state.now()).await?;
    Ok(Json(AverageResponse { avg }))
}

/// A user's visits, one per timestamp, ascending by `visited_at`.
#[utoipa::path(
    get,
    path = "/users/{id}/visits",
    params(("id" = u32, Path, description = "User id"), VisitsParams),
    responses(
        (status = 200, description = "Matching visits", body = VisitsResponse),
        (status = 400, description = "Malformed filter", body = EmptyResponse),
        (status = 404, description = "Unknown user", body = EmptyResponse)
    )
)]
pub async fn user_visits_handler(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
    query: Result<Query<VisitsParams>, QueryRejection>,
) -> Result<Json<VisitsResponse>, ApiError> {
    let filter = query_params(query)?.into_filter()?;
    let entries = user_visits(state.store.as_ref(), id, &filter).await?;
    Ok(Json(VisitsResponse {
        visits: entries.into_iter().map(Into::into).collect(),
    }))
}
