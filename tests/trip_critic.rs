/*
 * tests/trip_critic.rs
 *
 * Tests for the deterministic trip critic. Itineraries are constructed by
 * hand so each check can be driven precisely.
 */

mod common;

use chrono::Utc;

use common::{candidate, date, time, trip_spec};
use tripforge::models::critique::{CritiqueCode, IssueSeverity};
use tripforge::models::itinerary::{Itinerary, ItineraryBlock, ItineraryDay};
use tripforge::models::skeleton::BlockType;
use tripforge::models::trip::PaceLevel;
use tripforge::planner::trip_critic::TripCritic;

fn block(block_type: BlockType, start: &str, end: &str) -> ItineraryBlock {
	ItineraryBlock {
		block_type,
		start_time: time(start),
		end_time: time(end),
		theme: String::from("Block"),
		desired_categories: vec![],
		poi: Some(candidate("poi-x", "Somewhere", "attraction", 5.0)),
		travel_time_from_prev: 0,
		travel_distance_meters: None,
		travel_polyline: None,
		notes: None,
	}
}

fn day(day_number: i32, blocks: Vec<ItineraryBlock>) -> ItineraryDay {
	ItineraryDay {
		day_number,
		date: date("2024-06-15"),
		theme: String::from("Day"),
		blocks,
	}
}

fn itinerary(days: Vec<ItineraryDay>) -> Itinerary {
	Itinerary { trip_id: 1, days, created_at: Utc::now() }
}

/// A quiet, well-formed day: three meals in their windows, one activity.
fn calm_day(day_number: i32) -> ItineraryDay {
	day(
		day_number,
		vec![
			block(BlockType::Meal, "08:30:00", "09:30:00"),
			block(BlockType::Activity, "10:00:00", "12:00:00"),
			block(BlockType::Meal, "12:30:00", "13:30:00"),
			block(BlockType::Meal, "19:30:00", "20:30:00"),
		],
	)
}

// ===== DAY_TOO_BUSY =====

#[tokio::test]
async fn test_day_too_busy_on_slow_pace() {
	let mut spec = trip_spec(1, "Paris", "2024-06-15", "2024-06-16");
	spec.pace = PaceLevel::Slow;

	// 10h of non-rest blocks against a 7h slow-pace budget
	let it = itinerary(vec![day(
		1,
		vec![
			block(BlockType::Meal, "08:00:00", "09:00:00"),
			block(BlockType::Activity, "09:00:00", "13:00:00"),
			block(BlockType::Meal, "13:00:00", "14:00:00"),
			block(BlockType::Rest, "14:00:00", "15:00:00"),
			block(BlockType::Activity, "15:00:00", "19:00:00"),
		],
	)]);

	let issues = TripCritic::new().critique(&spec, &it);

	let busy: Vec<_> = issues
		.iter()
		.filter(|i| i.code == CritiqueCode::DayTooBusy)
		.collect();
	assert_eq!(busy.len(), 1);
	assert_eq!(busy[0].severity, IssueSeverity::Warning);
	assert_eq!(busy[0].day_number, Some(1));
	assert_eq!(busy[0].details["total_minutes"], 600);
	assert_eq!(busy[0].details["threshold_minutes"], 420);
}

#[tokio::test]
async fn test_same_day_is_fine_on_fast_pace() {
	let mut spec = trip_spec(1, "Paris", "2024-06-15", "2024-06-16");
	spec.pace = PaceLevel::Fast;

	let it = itinerary(vec![day(
		1,
		vec![
			block(BlockType::Meal, "08:00:00", "09:00:00"),
			block(BlockType::Activity, "09:00:00", "13:00:00"),
			block(BlockType::Meal, "13:00:00", "14:00:00"),
			block(BlockType::Activity, "15:00:00", "19:00:00"),
		],
	)]);

	let issues = TripCritic::new().critique(&spec, &it);
	assert!(issues.iter().all(|i| i.code != CritiqueCode::DayTooBusy));
}

// ===== Missing meals =====

#[tokio::test]
async fn test_missing_meal_windows() {
	let spec = trip_spec(1, "Paris", "2024-06-15", "2024-06-16");

	// One meal at 15:00 overlaps no window at all
	let it = itinerary(vec![day(
		1,
		vec![
			block(BlockType::Meal, "15:00:00", "16:00:00"),
			block(BlockType::Activity, "10:00:00", "12:00:00"),
		],
	)]);

	let issues = TripCritic::new().critique(&spec, &it);
	let codes: Vec<CritiqueCode> = issues.iter().map(|i| i.code).collect();

	assert!(codes.contains(&CritiqueCode::MissingBreakfast));
	assert!(codes.contains(&CritiqueCode::MissingLunch));
	assert!(codes.contains(&CritiqueCode::MissingDinner));

	let breakfast = issues
		.iter()
		.find(|i| i.code == CritiqueCode::MissingBreakfast)
		.unwrap();
	assert_eq!(breakfast.severity, IssueSeverity::Info);
	let dinner = issues
		.iter()
		.find(|i| i.code == CritiqueCode::MissingDinner)
		.unwrap();
	assert_eq!(dinner.severity, IssueSeverity::Warning);
}

#[tokio::test]
async fn test_covered_meal_windows_raise_nothing() {
	let spec = trip_spec(1, "Paris", "2024-06-15", "2024-06-16");
	let it = itinerary(vec![calm_day(1)]);

	let issues = TripCritic::new().critique(&spec, &it);
	assert!(issues.iter().all(|i| {
		i.code != CritiqueCode::MissingBreakfast
			&& i.code != CritiqueCode::MissingLunch
			&& i.code != CritiqueCode::MissingDinner
	}));
}

// ===== INVALID_TIME_RANGE =====

#[tokio::test]
async fn test_inverted_block_and_marathon_meal() {
	let spec = trip_spec(1, "Paris", "2024-06-15", "2024-06-16");

	let it = itinerary(vec![day(
		1,
		vec![
			// Ends before it starts
			block(BlockType::Activity, "15:00:00", "14:00:00"),
			// A seven-hour dinner
			block(BlockType::Meal, "12:00:00", "19:00:00"),
		],
	)]);

	let issues = TripCritic::new().critique(&spec, &it);
	let invalid: Vec<_> = issues
		.iter()
		.filter(|i| i.code == CritiqueCode::InvalidTimeRange)
		.collect();

	assert_eq!(invalid.len(), 2);
	assert!(invalid.iter().all(|i| i.severity == IssueSeverity::Error));
	assert_eq!(invalid[0].block_index, Some(0));
	assert_eq!(invalid[1].block_index, Some(1));
}

#[tokio::test]
async fn test_nightlife_wrap_is_not_inverted() {
	let spec = trip_spec(1, "Berlin", "2024-10-01", "2024-10-02");
	let it = itinerary(vec![day(
		1,
		vec![block(BlockType::Nightlife, "23:00:00", "02:00:00")],
	)]);

	let issues = TripCritic::new().critique(&spec, &it);
	assert!(issues.iter().all(|i| i.code != CritiqueCode::InvalidTimeRange));
}

// ===== BLOCK_OVERLAP =====

#[tokio::test]
async fn test_overlapping_blocks() {
	let spec = trip_spec(1, "Paris", "2024-06-15", "2024-06-16");
	let it = itinerary(vec![day(
		1,
		vec![
			block(BlockType::Activity, "10:00:00", "12:00:00"),
			block(BlockType::Meal, "11:30:00", "12:30:00"),
		],
	)]);

	let issues = TripCritic::new().critique(&spec, &it);
	let overlap = issues
		.iter()
		.find(|i| i.code == CritiqueCode::BlockOverlap)
		.unwrap();
	assert_eq!(overlap.severity, IssueSeverity::Error);
	assert_eq!(overlap.details["first_block"], 0);
	assert_eq!(overlap.details["second_block"], 1);
}

#[tokio::test]
async fn test_nightlife_wrap_does_not_overlap_morning() {
	let spec = trip_spec(1, "Berlin", "2024-10-01", "2024-10-02");
	let it = itinerary(vec![day(
		1,
		vec![
			block(BlockType::Meal, "08:00:00", "09:00:00"),
			block(BlockType::Nightlife, "23:00:00", "02:00:00"),
		],
	)]);

	let issues = TripCritic::new().critique(&spec, &it);
	assert!(issues.iter().all(|i| i.code != CritiqueCode::BlockOverlap));
}

// ===== LONG_TRAVEL / LATE_NIGHTLIFE =====

#[tokio::test]
async fn test_long_travel_flagged() {
	let spec = trip_spec(1, "Paris", "2024-06-15", "2024-06-16");
	let mut far_block = block(BlockType::Activity, "10:00:00", "12:00:00");
	far_block.travel_time_from_prev = 55;

	let it = itinerary(vec![day(
		1,
		vec![block(BlockType::Meal, "08:30:00", "09:00:00"), far_block],
	)]);

	let issues = TripCritic::new().critique(&spec, &it);
	let long_travel = issues
		.iter()
		.find(|i| i.code == CritiqueCode::LongTravel)
		.unwrap();
	assert_eq!(long_travel.block_index, Some(1));
	assert_eq!(long_travel.details["travel_minutes"], 55);
}

#[tokio::test]
async fn test_late_nightlife_flagged() {
	// Default sleep time is 23:00; the cap is 02:00
	let spec = trip_spec(1, "Berlin", "2024-10-01", "2024-10-02");
	let it = itinerary(vec![day(
		1,
		vec![block(BlockType::Nightlife, "23:00:00", "03:30:00")],
	)]);

	let issues = TripCritic::new().critique(&spec, &it);
	let late = issues
		.iter()
		.find(|i| i.code == CritiqueCode::LateNightlife)
		.unwrap();
	assert_eq!(late.severity, IssueSeverity::Info);
	assert_eq!(late.details["overrun_minutes"], 90);
}

#[tokio::test]
async fn test_nightlife_within_grace_is_fine() {
	let spec = trip_spec(1, "Berlin", "2024-10-01", "2024-10-02");
	let it = itinerary(vec![day(
		1,
		vec![block(BlockType::Nightlife, "23:00:00", "01:30:00")],
	)]);

	let issues = TripCritic::new().critique(&spec, &it);
	assert!(issues.iter().all(|i| i.code != CritiqueCode::LateNightlife));
}

// ===== CONSECUTIVE_INTENSE_DAYS =====

#[tokio::test]
async fn test_consecutive_intense_days() {
	let mut spec = trip_spec(1, "Paris", "2024-06-15", "2024-06-17");
	spec.pace = PaceLevel::Slow;

	let packed = |n| {
		day(
			n,
			vec![
				block(BlockType::Activity, "09:00:00", "14:00:00"),
				block(BlockType::Activity, "14:00:00", "18:00:00"),
			],
		)
	};
	let it = itinerary(vec![packed(1), packed(2), calm_day(3)]);

	let issues = TripCritic::new().critique(&spec, &it);
	let consecutive: Vec<_> = issues
		.iter()
		.filter(|i| i.code == CritiqueCode::ConsecutiveIntenseDays)
		.collect();
	assert_eq!(consecutive.len(), 1);
	assert_eq!(consecutive[0].details["first_day"], 1);
	assert_eq!(consecutive[0].details["second_day"], 2);
}

#[tokio::test]
async fn test_non_adjacent_busy_days_not_flagged() {
	let mut spec = trip_spec(1, "Paris", "2024-06-15", "2024-06-17");
	spec.pace = PaceLevel::Slow;

	let packed = |n| {
		day(
			n,
			vec![
				block(BlockType::Activity, "09:00:00", "14:00:00"),
				block(BlockType::Activity, "14:00:00", "18:00:00"),
			],
		)
	};
	let it = itinerary(vec![packed(1), calm_day(2), packed(3)]);

	let issues = TripCritic::new().critique(&spec, &it);
	assert!(issues.iter().all(|i| i.code != CritiqueCode::ConsecutiveIntenseDays));
}

// ===== Determinism =====

#[tokio::test]
async fn test_critic_is_deterministic() {
	let mut spec = trip_spec(1, "Paris", "2024-06-15", "2024-06-16");
	spec.pace = PaceLevel::Slow;

	let it = itinerary(vec![
		day(
			1,
			vec![
				block(BlockType::Meal, "15:00:00", "14:00:00"),
				block(BlockType::Activity, "09:00:00", "19:00:00"),
				block(BlockType::Nightlife, "23:00:00", "03:00:00"),
			],
		),
		calm_day(2),
	]);

	let critic = TripCritic::new();
	let first = critic.critique(&spec, &it);
	let second = critic.critique(&spec, &it);

	// Byte-identical output, not just equal issue counts
	assert_eq!(
		serde_json::to_string(&first).unwrap(),
		serde_json::to_string(&second).unwrap()
	);
}

#[tokio::test]
async fn test_issues_are_ordered_and_codes_closed() {
	let mut spec = trip_spec(1, "Paris", "2024-06-15", "2024-06-16");
	spec.pace = PaceLevel::Slow;

	let it = itinerary(vec![
		day(
			2,
			vec![
				block(BlockType::Meal, "15:00:00", "14:00:00"),
				block(BlockType::Activity, "09:00:00", "19:00:00"),
			],
		),
		day(
			1,
			vec![block(BlockType::Activity, "09:00:00", "19:00:00")],
		),
	]);

	let issues = TripCritic::new().critique(&spec, &it);
	assert!(!issues.is_empty());

	let keys: Vec<(i32, i32, &str)> = issues
		.iter()
		.map(|i| (i.day_number.unwrap_or(0), i.block_index.unwrap_or(-1), i.code.as_str()))
		.collect();
	let mut sorted = keys.clone();
	sorted.sort();
	assert_eq!(keys, sorted);

	let valid = [
		"DAY_TOO_BUSY",
		"MISSING_BREAKFAST",
		"MISSING_LUNCH",
		"MISSING_DINNER",
		"INVALID_TIME_RANGE",
		"BLOCK_OVERLAP",
		"LONG_TRAVEL",
		"LATE_NIGHTLIFE",
		"CONSECUTIVE_INTENSE_DAYS",
	];
	for issue in &issues {
		assert!(valid.contains(&issue.code.as_str()));
		assert!(!issue.message.is_empty());
	}
}

#[tokio::test]
async fn test_empty_itinerary_yields_no_issues() {
	let spec = trip_spec(1, "Paris", "2024-06-15", "2024-06-16");
	let issues = TripCritic::new().critique(&spec, &itinerary(vec![]));
	assert!(issues.is_empty());
}
