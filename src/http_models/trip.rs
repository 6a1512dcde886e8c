/*
 * src/http_models/trip.rs
 *
 * File for trip request payloads
 *
 * Purpose:
 *   The create-trip payload with its validation and default handling.
 *   Optional fields resolve to the documented defaults (1 traveler,
 *   medium pace and budget, the standard daily routine).
 *
 * Include:
 *   CreateTripRequest   - POST /api/trip body
 *   DailyRoutineRequest - partial routine override within the request
 */

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;

use crate::models::trip::{BudgetLevel, DailyRoutine, PaceLevel, TripDraft};

#[derive(Debug, Clone, Deserialize)]
pub struct DailyRoutineRequest {
	pub wake_time: Option<NaiveTime>,
	pub sleep_time: Option<NaiveTime>,
	pub breakfast_window: Option<(NaiveTime, NaiveTime)>,
	pub lunch_window: Option<(NaiveTime, NaiveTime)>,
	pub dinner_window: Option<(NaiveTime, NaiveTime)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTripRequest {
	pub city: String,
	pub start_date: NaiveDate,
	pub end_date: NaiveDate,
	pub num_travelers: Option<i32>,
	pub pace: Option<PaceLevel>,
	pub budget: Option<BudgetLevel>,
	pub interests: Option<Vec<String>>,
	pub hotel_location: Option<String>,
	pub hotel_lat: Option<f64>,
	pub hotel_lon: Option<f64>,
	pub additional_preferences: Option<serde_json::Value>,
	pub daily_routine: Option<DailyRoutineRequest>,
}

impl CreateTripRequest {
	fn resolve_routine(&self) -> DailyRoutine {
		let defaults = DailyRoutine::default();
		let Some(routine) = &self.daily_routine else {
			return defaults;
		};
		DailyRoutine {
			wake_time: routine.wake_time.unwrap_or(defaults.wake_time),
			sleep_time: routine.sleep_time.unwrap_or(defaults.sleep_time),
			breakfast_window: routine.breakfast_window.unwrap_or(defaults.breakfast_window),
			lunch_window: routine.lunch_window.unwrap_or(defaults.lunch_window),
			dinner_window: routine.dinner_window.unwrap_or(defaults.dinner_window),
		}
	}

	/// Validates the payload and resolves defaults into a storable draft.
	pub fn to_draft(&self) -> Result<TripDraft, String> {
		let city = self.city.trim();
		if city.is_empty() {
			return Err(String::from("City is required"));
		}
		if self.end_date < self.start_date {
			return Err(String::from("end_date must not be before start_date"));
		}

		let num_travelers = self.num_travelers.unwrap_or(1);
		if num_travelers < 1 {
			return Err(String::from("num_travelers must be at least 1"));
		}

		let routine = self.resolve_routine();
		let windows = [
			("breakfast", routine.breakfast_window),
			("lunch", routine.lunch_window),
			("dinner", routine.dinner_window),
		];
		for (label, (start, end)) in windows {
			if end <= start {
				return Err(format!("{label} window must end after it starts"));
			}
		}
		if routine.breakfast_window.1 > routine.lunch_window.0
			|| routine.lunch_window.1 > routine.dinner_window.0
		{
			return Err(String::from(
				"meal windows must be ordered breakfast < lunch < dinner",
			));
		}

		Ok(TripDraft {
			city: city.to_string(),
			start_date: self.start_date,
			end_date: self.end_date,
			num_travelers,
			pace: self.pace.unwrap_or_default(),
			budget: self.budget.unwrap_or_default(),
			interests: self.interests.clone().unwrap_or_default(),
			hotel_location: self.hotel_location.clone(),
			hotel_lat: self.hotel_lat,
			hotel_lon: self.hotel_lon,
			additional_preferences: self.additional_preferences.clone(),
			daily_routine: routine,
		})
	}
}
