/*
 * src/planner/trip_critic.rs
 *
 * File for the deterministic trip critic
 *
 * Purpose:
 *   Scan a finished itinerary for quality problems and emit coded issues.
 *   Purely rule-based: no network, no randomness, never fails. Two runs on
 *   the same inputs produce byte-identical output (issues are sorted by
 *   day, block, then code).
 */

use serde_json::{Map, Value, json};

use crate::global::LATE_END_GRACE_MINUTES;
use crate::models::critique::{CritiqueCode, CritiqueIssue, IssueSeverity};
use crate::models::itinerary::{Itinerary, ItineraryBlock, ItineraryDay};
use crate::models::trip::{PaceLevel, TripSpec};
use crate::planner::route_optimizer::{block_span, time_to_min};

/// Meals longer than this are flagged as invalid ranges.
const MEAL_MAX_MINUTES: i64 = 360;
const LONG_TRAVEL_THRESHOLD_MINUTES: i64 = 45;

/// Daily activity budget (non-rest, non-travel minutes) per pace.
fn pace_threshold_minutes(pace: PaceLevel) -> i64 {
	match pace {
		PaceLevel::Slow => 7 * 60,
		PaceLevel::Medium => 9 * 60,
		PaceLevel::Fast => 12 * 60,
	}
}

fn details(value: Value) -> Map<String, Value> {
	match value {
		Value::Object(map) => map,
		_ => Map::new(),
	}
}

fn span(block: &ItineraryBlock) -> (i64, i64) {
	block_span(block.block_type, block.start_time, block.end_time)
}

/// Positive scheduled minutes of a block; inverted intervals count as zero.
fn block_minutes(block: &ItineraryBlock) -> i64 {
	let (start, end) = span(block);
	(end - start).max(0)
}

fn overlaps(a: (i64, i64), b: (i64, i64)) -> bool {
	a.0 < b.1 && b.0 < a.1
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TripCritic;

impl TripCritic {
	pub fn new() -> Self {
		Self
	}

	pub fn critique(&self, spec: &TripSpec, itinerary: &Itinerary) -> Vec<CritiqueIssue> {
		let mut issues = Vec::new();
		let threshold = pace_threshold_minutes(spec.pace);
		let sleep_cap = time_to_min(spec.daily_routine.sleep_time) + LATE_END_GRACE_MINUTES;

		let mut overloaded_days: Vec<i32> = Vec::new();
		for day in &itinerary.days {
			self.check_day_load(day, spec.pace, threshold, &mut overloaded_days, &mut issues);
			self.check_meals(day, spec, &mut issues);
			self.check_blocks(day, sleep_cap, &mut issues);
			self.check_overlaps(day, &mut issues);
		}
		self.check_consecutive_overload(&overloaded_days, &mut issues);

		issues.sort_by(|a, b| {
			(a.day_number.unwrap_or(0), a.block_index.unwrap_or(-1), a.code.as_str()).cmp(&(
				b.day_number.unwrap_or(0),
				b.block_index.unwrap_or(-1),
				b.code.as_str(),
			))
		});
		issues
	}

	fn check_day_load(
		&self,
		day: &ItineraryDay,
		pace: PaceLevel,
		threshold: i64,
		overloaded_days: &mut Vec<i32>,
		issues: &mut Vec<CritiqueIssue>,
	) {
		let total: i64 = day
			.blocks
			.iter()
			.filter(|b| b.block_type.needs_poi())
			.map(block_minutes)
			.sum();
		if total <= threshold {
			return;
		}

		overloaded_days.push(day.day_number);
		issues.push(CritiqueIssue {
			code: CritiqueCode::DayTooBusy,
			severity: IssueSeverity::Warning,
			message: format!(
				"Day {} schedules {} minutes of activity, over the {} pace budget of {} minutes",
				day.day_number,
				total,
				pace.as_str(),
				threshold
			),
			details: details(json!({
				"total_minutes": total,
				"threshold_minutes": threshold,
				"pace": pace.as_str(),
			})),
			day_number: Some(day.day_number),
			block_index: None,
		});
	}

	fn check_meals(&self, day: &ItineraryDay, spec: &TripSpec, issues: &mut Vec<CritiqueIssue>) {
		let routine = &spec.daily_routine;
		let windows = [
			(CritiqueCode::MissingBreakfast, IssueSeverity::Info, "breakfast", routine.breakfast_window),
			(CritiqueCode::MissingLunch, IssueSeverity::Warning, "lunch", routine.lunch_window),
			(CritiqueCode::MissingDinner, IssueSeverity::Warning, "dinner", routine.dinner_window),
		];

		for (code, severity, label, window) in windows {
			let window_span = (time_to_min(window.0), time_to_min(window.1));
			let covered = day
				.blocks
				.iter()
				.filter(|b| b.block_type == crate::models::skeleton::BlockType::Meal)
				.any(|b| overlaps(span(b), window_span));
			if covered {
				continue;
			}
			issues.push(CritiqueIssue {
				code,
				severity,
				message: format!(
					"Day {} has no meal block overlapping the {} window",
					day.day_number, label
				),
				details: details(json!({
					"window_start": window.0.format("%H:%M:%S").to_string(),
					"window_end": window.1.format("%H:%M:%S").to_string(),
				})),
				day_number: Some(day.day_number),
				block_index: None,
			});
		}
	}

	fn check_blocks(&self, day: &ItineraryDay, sleep_cap: i64, issues: &mut Vec<CritiqueIssue>) {
		use crate::models::skeleton::BlockType;

		for (index, block) in day.blocks.iter().enumerate() {
			let index = index as i32;
			let (start, end) = span(block);

			if block.block_type != BlockType::Nightlife && end <= start {
				issues.push(CritiqueIssue {
					code: CritiqueCode::InvalidTimeRange,
					severity: IssueSeverity::Error,
					message: format!(
						"Block {} on day {} ends at or before its start",
						index, day.day_number
					),
					details: details(json!({
						"start_time": block.start_time.format("%H:%M:%S").to_string(),
						"end_time": block.end_time.format("%H:%M:%S").to_string(),
					})),
					day_number: Some(day.day_number),
					block_index: Some(index),
				});
			} else if block.block_type == BlockType::Meal && end - start > MEAL_MAX_MINUTES {
				issues.push(CritiqueIssue {
					code: CritiqueCode::InvalidTimeRange,
					severity: IssueSeverity::Error,
					message: format!(
						"Meal block {} on day {} runs longer than 6 hours",
						index, day.day_number
					),
					details: details(json!({
						"duration_minutes": end - start,
						"max_minutes": MEAL_MAX_MINUTES,
					})),
					day_number: Some(day.day_number),
					block_index: Some(index),
				});
			}

			if block.travel_time_from_prev > LONG_TRAVEL_THRESHOLD_MINUTES {
				issues.push(CritiqueIssue {
					code: CritiqueCode::LongTravel,
					severity: IssueSeverity::Warning,
					message: format!(
						"Reaching block {} on day {} takes {} minutes",
						index, day.day_number, block.travel_time_from_prev
					),
					details: details(json!({
						"travel_minutes": block.travel_time_from_prev,
						"threshold_minutes": LONG_TRAVEL_THRESHOLD_MINUTES,
					})),
					day_number: Some(day.day_number),
					block_index: Some(index),
				});
			}

			if block.block_type == BlockType::Nightlife && end > sleep_cap {
				issues.push(CritiqueIssue {
					code: CritiqueCode::LateNightlife,
					severity: IssueSeverity::Info,
					message: format!(
						"Nightlife block {} on day {} ends well past sleep time",
						index, day.day_number
					),
					details: details(json!({
						"end_time": block.end_time.format("%H:%M:%S").to_string(),
						"overrun_minutes": end - sleep_cap,
					})),
					day_number: Some(day.day_number),
					block_index: Some(index),
				});
			}
		}
	}

	fn check_overlaps(&self, day: &ItineraryDay, issues: &mut Vec<CritiqueIssue>) {
		for i in 0..day.blocks.len() {
			for j in (i + 1)..day.blocks.len() {
				let a = span(&day.blocks[i]);
				let b = span(&day.blocks[j]);
				// Inverted intervals are empty; already reported as
				// INVALID_TIME_RANGE
				if a.1 <= a.0 || b.1 <= b.0 {
					continue;
				}
				if overlaps(a, b) {
					issues.push(CritiqueIssue {
						code: CritiqueCode::BlockOverlap,
						severity: IssueSeverity::Error,
						message: format!(
							"Blocks {} and {} on day {} overlap in time",
							i, j, day.day_number
						),
						details: details(json!({
							"first_block": i,
							"second_block": j,
						})),
						day_number: Some(day.day_number),
						block_index: Some(j as i32),
					});
				}
			}
		}
	}

	fn check_consecutive_overload(&self, overloaded_days: &[i32], issues: &mut Vec<CritiqueIssue>) {
		let mut overloaded_days = overloaded_days.to_vec();
		overloaded_days.sort_unstable();
		for pair in overloaded_days.windows(2) {
			if pair[1] == pair[0] + 1 {
				issues.push(CritiqueIssue {
					code: CritiqueCode::ConsecutiveIntenseDays,
					severity: IssueSeverity::Warning,
					message: format!(
						"Days {} and {} are both overloaded; consider spreading activities out",
						pair[0], pair[1]
					),
					details: details(json!({
						"first_day": pair[0],
						"second_day": pair[1],
					})),
					day_number: Some(pair[1]),
					block_index: None,
				});
			}
		}
	}
}
