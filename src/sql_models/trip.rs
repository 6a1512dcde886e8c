/*
 * src/sql_models/trip.rs
 *
 * File for Trip table row models
 *
 * Purpose:
 *   Row model for the `trips` table and the conversion into the domain
 *   TripSpec the pipeline consumes. Pace and budget are stored as text;
 *   unrecognized values fall back to `medium` rather than failing a load.
 */

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::FromRow;

use crate::models::trip::{BudgetLevel, DailyRoutine, PaceLevel, TripSpec};

#[derive(Debug, FromRow)]
pub struct TripRow {
	pub id: i32,
	pub city: String,
	pub start_date: NaiveDate,
	pub end_date: NaiveDate,
	pub num_travelers: i32,
	pub pace: String,
	pub budget: String,
	pub interests: Vec<String>,
	pub hotel_location: Option<String>,
	pub hotel_lat: Option<f64>,
	pub hotel_lon: Option<f64>,
	pub additional_preferences: Option<serde_json::Value>,
	pub wake_time: NaiveTime,
	pub sleep_time: NaiveTime,
	pub breakfast_start: NaiveTime,
	pub breakfast_end: NaiveTime,
	pub lunch_start: NaiveTime,
	pub lunch_end: NaiveTime,
	pub dinner_start: NaiveTime,
	pub dinner_end: NaiveTime,
	pub created_at: DateTime<Utc>,
}

fn parse_pace(value: &str) -> PaceLevel {
	match value {
		"slow" => PaceLevel::Slow,
		"fast" => PaceLevel::Fast,
		_ => PaceLevel::Medium,
	}
}

fn parse_budget(value: &str) -> BudgetLevel {
	match value {
		"low" => BudgetLevel::Low,
		"high" => BudgetLevel::High,
		_ => BudgetLevel::Medium,
	}
}

impl From<TripRow> for TripSpec {
	fn from(row: TripRow) -> Self {
		TripSpec {
			id: row.id,
			city: row.city,
			start_date: row.start_date,
			end_date: row.end_date,
			num_travelers: row.num_travelers,
			pace: parse_pace(&row.pace),
			budget: parse_budget(&row.budget),
			interests: row.interests,
			hotel_location: row.hotel_location,
			hotel_lat: row.hotel_lat,
			hotel_lon: row.hotel_lon,
			additional_preferences: row.additional_preferences,
			daily_routine: DailyRoutine {
				wake_time: row.wake_time,
				sleep_time: row.sleep_time,
				breakfast_window: (row.breakfast_start, row.breakfast_end),
				lunch_window: (row.lunch_start, row.lunch_end),
				dinner_window: (row.dinner_start, row.dinner_end),
			},
		}
	}
}
