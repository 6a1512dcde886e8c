/*
 * src/controllers/trip.rs
 *
 * File for Trip Controller API Endpoints
 *
 * Purpose:
 *   Create and fetch trip specifications.
 *
 * Include:
 *   api_create_trip - POST /api/trip        -> stores a validated trip spec
 *   api_get_trip    - GET  /api/trip/{id}   -> returns a stored trip spec
 */

use std::sync::Arc;

use axum::http::StatusCode;
use axum::{
	Extension, Json, Router,
	extract::Path,
	routing::{get, post},
};
use tracing::info;

use crate::error::{ApiResult, AppError};
use crate::http_models::trip::CreateTripRequest;
use crate::models::trip::TripSpec;
use crate::store::TripStore;

/// Create a new trip spec.
///
/// # Method
/// `POST /api/trip`
///
/// # Responses
/// - `201 CREATED` - JSON body with the stored trip spec (including its id)
/// - `400 BAD_REQUEST` - Validation failure (dates, travelers, meal windows)
///
/// # Examples
/// ```bash
/// curl -X POST http://localhost:3001/api/trip \
///   -H "Content-Type: application/json" \
///   -d '{"city": "Paris", "start_date": "2024-06-15", "end_date": "2024-06-16", "interests": ["museums"]}'
/// ```
///
pub async fn api_create_trip(
	Extension(trips): Extension<Arc<dyn TripStore>>,
	Json(payload): Json<CreateTripRequest>,
) -> ApiResult<(StatusCode, Json<TripSpec>)> {
	info!(
		"HANDLER ->> /api/trip 'api_create_trip' - City: {}",
		payload.city
	);

	let draft = payload.to_draft().map_err(AppError::BadRequest)?;
	let spec = trips.create(draft).await?;

	Ok((StatusCode::CREATED, Json(spec)))
}

/// Fetch a stored trip spec.
///
/// # Method
/// `GET /api/trip/{trip_id}`
///
/// # Responses
/// - `200 OK` - JSON body with the trip spec
/// - `404 NOT_FOUND` - Unknown trip id
///
pub async fn api_get_trip(
	Extension(trips): Extension<Arc<dyn TripStore>>,
	Path(trip_id): Path<i32>,
) -> ApiResult<Json<TripSpec>> {
	info!("HANDLER ->> /api/trip/{trip_id} 'api_get_trip'");

	let spec = trips
		.get(trip_id)
		.await?
		.ok_or(AppError::TripNotFound(trip_id))?;
	Ok(Json(spec))
}

pub fn trip_routes() -> Router {
	Router::new()
		.route("/", post(api_create_trip))
		.route("/{trip_id}", get(api_get_trip))
}
