/*
 * src/controllers/plan.rs
 *
 * File for Planning Pipeline API Endpoints
 *
 * Purpose:
 *   Trigger pipeline stages and fetch their persisted outputs. POST
 *   endpoints are idempotent: a stage that already ran returns its stored
 *   output with the original created_at.
 *
 * Include:
 *   api_create_macro_plan - POST /api/trip/{id}/macro-plan
 *   api_get_macro_plan    - GET  /api/trip/{id}/macro-plan
 *   api_create_poi_plan   - POST /api/trip/{id}/poi-plan
 *   api_get_poi_plan      - GET  /api/trip/{id}/poi-plan
 *   api_create_itinerary  - POST /api/trip/{id}/itinerary
 *   api_get_itinerary     - GET  /api/trip/{id}/itinerary
 *   api_plan_trip         - POST /api/trip/{id}/plan
 *   api_get_critique      - GET  /api/trip/{id}/critique
 */

use std::sync::Arc;

use axum::http::StatusCode;
use axum::{
	Extension, Json, Router,
	extract::Path,
	routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{ApiResult, AppError};
use crate::http_models::plan::{CritiqueResponse, MacroPlanResponse, PoiPlanResponse};
use crate::models::itinerary::Itinerary;
use crate::planner::orchestrator::TripPlanner;

/// Run (or reuse) the macro-plan stage.
///
/// # Method
/// `POST /api/trip/{trip_id}/macro-plan`
///
/// # Responses
/// - `201 CREATED` - JSON body `{ trip_id, days, created_at }`
/// - `404 NOT_FOUND` - Unknown trip id
/// - `502 BAD_GATEWAY` - The LLM could not produce a usable plan
///
pub async fn api_create_macro_plan(
	Extension(planner): Extension<Arc<TripPlanner>>,
	Path(trip_id): Path<i32>,
) -> ApiResult<(StatusCode, Json<MacroPlanResponse>)> {
	info!("HANDLER ->> /api/trip/{trip_id}/macro-plan 'api_create_macro_plan'");

	let (days, created_at) = planner
		.run_macro_plan(trip_id, &CancellationToken::new())
		.await?;
	Ok((
		StatusCode::CREATED,
		Json(MacroPlanResponse { trip_id, days, created_at }),
	))
}

/// Fetch the stored macro plan.
///
/// # Method
/// `GET /api/trip/{trip_id}/macro-plan`
///
pub async fn api_get_macro_plan(
	Extension(planner): Extension<Arc<TripPlanner>>,
	Path(trip_id): Path<i32>,
) -> ApiResult<Json<MacroPlanResponse>> {
	info!("HANDLER ->> /api/trip/{trip_id}/macro-plan 'api_get_macro_plan'");

	let (days, created_at) = planner
		.get_macro_plan(trip_id)
		.await?
		.ok_or(AppError::MacroPlanNotFound(trip_id))?;
	Ok(Json(MacroPlanResponse { trip_id, days, created_at }))
}

/// Run (or reuse) the POI-plan stage. Requires the macro plan.
///
/// # Method
/// `POST /api/trip/{trip_id}/poi-plan`
///
/// # Responses
/// - `201 CREATED` - JSON body `{ trip_id, blocks, created_at }`
/// - `404 NOT_FOUND` - Unknown trip, or no macro plan yet
///
pub async fn api_create_poi_plan(
	Extension(planner): Extension<Arc<TripPlanner>>,
	Path(trip_id): Path<i32>,
) -> ApiResult<(StatusCode, Json<PoiPlanResponse>)> {
	info!("HANDLER ->> /api/trip/{trip_id}/poi-plan 'api_create_poi_plan'");

	let (plan, created_at) = planner
		.run_poi_plan(trip_id, &CancellationToken::new())
		.await?;
	Ok((
		StatusCode::CREATED,
		Json(PoiPlanResponse { trip_id, blocks: plan.blocks, created_at }),
	))
}

/// Fetch the stored POI plan.
///
/// # Method
/// `GET /api/trip/{trip_id}/poi-plan`
///
pub async fn api_get_poi_plan(
	Extension(planner): Extension<Arc<TripPlanner>>,
	Path(trip_id): Path<i32>,
) -> ApiResult<Json<PoiPlanResponse>> {
	info!("HANDLER ->> /api/trip/{trip_id}/poi-plan 'api_get_poi_plan'");

	let (plan, created_at) = planner
		.get_poi_plan(trip_id)
		.await?
		.ok_or(AppError::PoiPlanNotFound(trip_id))?;
	Ok(Json(PoiPlanResponse { trip_id, blocks: plan.blocks, created_at }))
}

/// Run (or reuse) the optimization stage alone. Requires macro and POI
/// plans to already be committed.
///
/// # Method
/// `POST /api/trip/{trip_id}/itinerary`
///
pub async fn api_create_itinerary(
	Extension(planner): Extension<Arc<TripPlanner>>,
	Path(trip_id): Path<i32>,
) -> ApiResult<(StatusCode, Json<Itinerary>)> {
	info!("HANDLER ->> /api/trip/{trip_id}/itinerary 'api_create_itinerary'");

	let itinerary = planner
		.run_itinerary(trip_id, &CancellationToken::new())
		.await?;
	Ok((StatusCode::CREATED, Json(itinerary)))
}

/// Fetch the stored itinerary.
///
/// # Method
/// `GET /api/trip/{trip_id}/itinerary`
///
pub async fn api_get_itinerary(
	Extension(planner): Extension<Arc<TripPlanner>>,
	Path(trip_id): Path<i32>,
) -> ApiResult<Json<Itinerary>> {
	info!("HANDLER ->> /api/trip/{trip_id}/itinerary 'api_get_itinerary'");

	let itinerary = planner
		.get_itinerary(trip_id)
		.await?
		.ok_or(AppError::ItineraryNotFound(trip_id))?;
	Ok(Json(itinerary))
}

/// Run every missing pipeline stage and return the final itinerary. A
/// second call returns the same itinerary without re-running anything.
///
/// # Method
/// `POST /api/trip/{trip_id}/plan`
///
/// # Responses
/// - `201 CREATED` - JSON body with the full itinerary
/// - `404 NOT_FOUND` - Unknown trip id
/// - `502 BAD_GATEWAY` - The LLM could not produce a usable macro plan
///
/// # Examples
/// ```bash
/// curl -X POST http://localhost:3001/api/trip/42/plan
/// ```
///
pub async fn api_plan_trip(
	Extension(planner): Extension<Arc<TripPlanner>>,
	Path(trip_id): Path<i32>,
) -> ApiResult<(StatusCode, Json<Itinerary>)> {
	info!("HANDLER ->> /api/trip/{trip_id}/plan 'api_plan_trip'");

	let itinerary = planner.plan(trip_id, &CancellationToken::new()).await?;
	Ok((StatusCode::CREATED, Json(itinerary)))
}

/// Fetch the stored critique; empty until the pipeline has run.
///
/// # Method
/// `GET /api/trip/{trip_id}/critique`
///
pub async fn api_get_critique(
	Extension(planner): Extension<Arc<TripPlanner>>,
	Path(trip_id): Path<i32>,
) -> ApiResult<Json<CritiqueResponse>> {
	info!("HANDLER ->> /api/trip/{trip_id}/critique 'api_get_critique'");

	let issues = planner.get_critique(trip_id).await?;
	Ok(Json(CritiqueResponse { trip_id, issues }))
}

pub fn plan_routes() -> Router {
	Router::new()
		.route(
			"/{trip_id}/macro-plan",
			post(api_create_macro_plan).get(api_get_macro_plan),
		)
		.route(
			"/{trip_id}/poi-plan",
			post(api_create_poi_plan).get(api_get_poi_plan),
		)
		.route(
			"/{trip_id}/itinerary",
			post(api_create_itinerary).get(api_get_itinerary),
		)
		.route("/{trip_id}/plan", post(api_plan_trip))
		.route("/{trip_id}/critique", get(api_get_critique))
}
