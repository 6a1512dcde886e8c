/*
 * src/error.rs
 *
 * File for the application error type
 *
 * Purpose:
 *   One error enum for the whole planning surface. Pipeline preconditions
 *   and the LLM failure mode get their own variants so the HTTP layer can
 *   map them to stable status codes; everything else degrades to fallbacks
 *   before it ever reaches here.
 */

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::warn;

pub type ApiResult<T> = std::result::Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
	/// No trip with this id exists
	TripNotFound(i32),
	/// The LLM could not produce a parseable macro plan within the retry
	/// budget; carries the last underlying error
	MacroPlanGenerationFailed(String),
	/// POI planning was requested before a macro plan exists
	PoiPlanRequiresMacroPlan(i32),
	/// Itinerary optimization was requested before a POI plan exists
	ItineraryRequiresPoiPlan(i32),
	/// GET for a stage output that was never produced
	MacroPlanNotFound(i32),
	PoiPlanNotFound(i32),
	ItineraryNotFound(i32),
	/// Request payload failed validation
	BadRequest(String),
	/// An upstream provider (maps, places) failed in a way that surfaces
	Provider(String),
	/// The caller's cancellation signal fired before the stage committed
	Cancelled,
	Database(sqlx::Error),
	Serialization(serde_json::Error),
}

impl AppError {
	pub fn status_code(&self) -> StatusCode {
		match self {
			AppError::TripNotFound(_)
			| AppError::PoiPlanRequiresMacroPlan(_)
			| AppError::ItineraryRequiresPoiPlan(_)
			| AppError::MacroPlanNotFound(_)
			| AppError::PoiPlanNotFound(_)
			| AppError::ItineraryNotFound(_) => StatusCode::NOT_FOUND,
			AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
			AppError::MacroPlanGenerationFailed(_) | AppError::Provider(_) => {
				StatusCode::BAD_GATEWAY
			}
			AppError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
			AppError::Database(_) | AppError::Serialization(_) => {
				StatusCode::INTERNAL_SERVER_ERROR
			}
		}
	}
}

impl std::fmt::Display for AppError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			AppError::TripNotFound(id) => write!(f, "Trip {id} not found"),
			AppError::MacroPlanGenerationFailed(e) => {
				write!(f, "LLM failed to generate macro plan: {e}")
			}
			AppError::PoiPlanRequiresMacroPlan(id) => {
				write!(f, "Trip {id} has no macro plan; generate the macro plan first")
			}
			AppError::ItineraryRequiresPoiPlan(id) => {
				write!(f, "Trip {id} has no POI plan; generate the POI plan first")
			}
			AppError::MacroPlanNotFound(id) => write!(f, "No macro plan for trip {id}"),
			AppError::PoiPlanNotFound(id) => write!(f, "No POI plan for trip {id}"),
			AppError::ItineraryNotFound(id) => write!(f, "No itinerary for trip {id}"),
			AppError::BadRequest(msg) => write!(f, "{msg}"),
			AppError::Provider(e) => write!(f, "Upstream provider error: {e}"),
			AppError::Cancelled => write!(f, "Planning was cancelled"),
			AppError::Database(e) => write!(f, "Database error: {e}"),
			AppError::Serialization(e) => write!(f, "Serialization error: {e}"),
		}
	}
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
	fn from(e: sqlx::Error) -> Self {
		AppError::Database(e)
	}
}

impl From<serde_json::Error> for AppError {
	fn from(e: serde_json::Error) -> Self {
		AppError::Serialization(e)
	}
}

impl IntoResponse for AppError {
	fn into_response(self) -> Response {
		let status = self.status_code();
		// Internal errors are logged in full but only a generic detail
		// string leaves the process
		let detail = match &self {
			AppError::Database(_) | AppError::Serialization(_) => {
				warn!(target: "app_error", error = %self, "internal error");
				String::from("Internal server error")
			}
			other => other.to_string(),
		};
		(status, Json(json!({ "detail": detail }))).into_response()
	}
}
