/*
 * src/planner/macro_planner.rs
 *
 * File for the LLM-driven macro planning stage
 *
 * Purpose:
 *   Turn a trip spec into a day-by-day skeleton of typed time blocks. The
 *   system prompt carries the contractual interest-to-category mapping and
 *   the exclusion rules; the response is normalized (time strings) and
 *   parsed strictly (unknown block types are rejected), with the whole
 *   attempt retried on any failure.
 */

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::AppError;
use crate::global::LLM_MAX_ATTEMPTS;
use crate::models::skeleton::DaySkeleton;
use crate::models::trip::TripSpec;
use crate::providers::llm::{LlmClient, macro_planning_llm_client};

/// Token budget by trip length; longer trips need more room for the larger
/// skeleton payload.
const TOKEN_LIMIT_SHORT_TRIP: u32 = 4096;
const TOKEN_LIMIT_LONG_TRIP: u32 = 8192;
const SHORT_TRIP_MAX_DAYS: i64 = 3;

pub const MACRO_SYSTEM_PROMPT: &str = r#"You are an expert travel planner. Your job is to create a high-level skeleton for a multi-day trip.

Given trip details (dates, city, preferences, daily routine), you must:
1. Split the trip into days
2. For each day, assign an overall theme
3. Create time blocks for each day with:
   - Type (meal, activity, nightlife, rest, travel)
   - Time windows respecting the user's daily routine
   - Desired categories for POI selection later

CRITICAL: You MUST respond with valid JSON only, matching this exact structure:
{
  "days": [
    {
      "day_number": 1,
      "date": "YYYY-MM-DD",
      "theme": "Day theme description",
      "blocks": [
        {
          "block_type": "meal|activity|nightlife|rest|travel",
          "start_time": "HH:MM:SS",
          "end_time": "HH:MM:SS",
          "theme": "Block theme",
          "desired_categories": ["category1", "category2"]
        }
      ]
    }
  ]
}

Guidelines:
- Respect wake/sleep times and meal windows from the daily routine
- Match pace level (slow=fewer activities, fast=packed schedule)
- Budget affects venue types (low=casual, high=fine dining)
- Add nightlife blocks only if relevant to interests
- Include rest blocks for slow/medium pace
- Each day should have 3 meals + 2-4 activity blocks

CRITICAL - Interest Categories (STRICT RULES):
- YOU MUST use the user's interests to populate desired_categories for ALL activity blocks
- The FIRST category in desired_categories MUST be the PRIMARY category matching the interest
- Map interests to specific POI types:
  * "gastronomy" -> ["restaurant", "cafe", "food"]
  * "museums" -> ["museum", "art_gallery", "attraction"]
  * "modern art" -> ["art_gallery", "museum", "attraction"]
  * "nightlife" -> ["bar", "nightclub", "nightlife"]
  * "views" -> ["viewpoint", "attraction", "park"] (NEVER include "museum")
  * "architecture" -> ["attraction", "landmark", "viewpoint"] (NEVER include "museum")
  * "shopping" -> ["shopping", "market", "boutique"]
  * "nature" -> ["park", "garden", "nature"]
  * "history" (without museums) -> ["landmark", "monument", "attraction"] (NEVER include "museum")
  * "beach and water" -> ["beach", "waterfront", "lake"]

CRITICAL DIFFERENTIATION:
- "museums" interest -> USE "museum" as FIRST category
- "architecture" interest -> USE "attraction" or "landmark" as FIRST category, NEVER "museum"
- "views" interest -> USE "viewpoint" or "attraction" as FIRST category, NEVER "museum"
- If interests include BOTH "museums" and "architecture", alternate days between museum-focused and architecture-focused

STRICT EXCLUSION RULES:
- NEVER include "museum" in desired_categories if interests do NOT explicitly mention: "museums", "art", "history", "modern art"
- NEVER include "shopping" in desired_categories if interests do NOT explicitly mention: "shopping"
- NEVER include "nightlife" or "bar" in desired_categories if interests do NOT explicitly mention: "nightlife", "bars", "clubs"

- For meal blocks, use ["restaurant", "cafe", "local_cuisine"]
- Each activity block MUST have 2-3 categories, with the PRIMARY interest category FIRST
- DO NOT use generic categories like "culture", "sightseeing"
- NO explanations, NO markdown, ONLY valid JSON"#;

/// Enumerates the trip facts for the user prompt.
pub fn build_trip_context(spec: &TripSpec) -> String {
	let interests = if spec.interests.is_empty() {
		String::from("general sightseeing")
	} else {
		spec.interests.join(", ")
	};
	let routine = &spec.daily_routine;

	let mut context = format!(
		"Trip Details:\n\
		- City: {}\n\
		- Dates: {} to {} ({} days)\n\
		- Travelers: {}\n\
		- Pace: {} (slow=relaxed, medium=balanced, fast=packed)\n\
		- Budget: {}\n\
		- Interests: {}\n\
		\n\
		Daily Routine:\n\
		- Wake time: {}\n\
		- Sleep time: {}\n\
		- Breakfast: {} - {}\n\
		- Lunch: {} - {}\n\
		- Dinner: {} - {}",
		spec.city,
		spec.start_date,
		spec.end_date,
		spec.num_days(),
		spec.num_travelers,
		spec.pace.as_str(),
		spec.budget.as_str(),
		interests,
		routine.wake_time,
		routine.sleep_time,
		routine.breakfast_window.0,
		routine.breakfast_window.1,
		routine.lunch_window.0,
		routine.lunch_window.1,
		routine.dinner_window.0,
		routine.dinner_window.1,
	);

	if let Some(hotel) = &spec.hotel_location {
		context.push_str(&format!("\n- Hotel: {hotel}"));
	}
	if let Some(prefs) = &spec.additional_preferences {
		context.push_str(&format!("\n- Additional preferences: {prefs}"));
	}

	context
}

fn build_planning_prompt(trip_context: &str) -> String {
	format!(
		"{trip_context}\n\nGenerate a complete day-by-day skeleton for this trip.\nRespond with JSON only."
	)
}

/// Rewrites a model-emitted time string into `HH:MM:SS`. A leading `:MM:SS`
/// is promoted to `00:MM:SS`, short components are zero-padded, and anything
/// that is not three colon-separated parts collapses to `00:00:00`.
pub fn normalize_time_string(raw: &str) -> String {
	let trimmed = raw.trim();
	if trimmed.is_empty() {
		return String::from("00:00:00");
	}

	let promoted = if trimmed.starts_with(':') {
		format!("00{trimmed}")
	} else {
		trimmed.to_string()
	};

	let parts: Vec<&str> = promoted.split(':').collect();
	if parts.len() != 3 {
		return String::from("00:00:00");
	}

	let pad = |part: &str| {
		if part.is_empty() {
			String::from("00")
		} else {
			format!("{part:0>2}")
		}
	};
	format!("{}:{}:{}", pad(parts[0]), pad(parts[1]), pad(parts[2]))
}

fn normalize_block_times(block: &mut Value) {
	let Some(obj) = block.as_object_mut() else {
		return;
	};
	for key in ["start_time", "end_time"] {
		if let Some(raw) = obj.get(key).and_then(Value::as_str) {
			let normalized = normalize_time_string(raw);
			obj.insert(key.to_string(), Value::String(normalized));
		}
	}
}

/// Parses the raw LLM response into day skeletons. Time strings are
/// normalized first; everything else must deserialize strictly.
pub fn parse_skeleton_response(response: &Value) -> Result<Vec<DaySkeleton>, String> {
	let days = response
		.get("days")
		.and_then(Value::as_array)
		.ok_or_else(|| String::from("response carries no days array"))?;

	let mut skeletons = Vec::with_capacity(days.len());
	for day in days {
		let mut day = day.clone();
		if let Some(blocks) = day.get_mut("blocks").and_then(Value::as_array_mut) {
			for block in blocks.iter_mut() {
				normalize_block_times(block);
			}
		}
		let skeleton: DaySkeleton = serde_json::from_value(day)
			.map_err(|e| format!("day did not match the skeleton schema: {e}"))?;
		skeletons.push(skeleton);
	}
	Ok(skeletons)
}

pub struct MacroPlanner {
	llm: Arc<dyn LlmClient>,
}

impl MacroPlanner {
	/// Uses the currently-installed LLM factory.
	pub fn new() -> Self {
		Self {
			llm: macro_planning_llm_client(),
		}
	}

	pub fn with_client(llm: Arc<dyn LlmClient>) -> Self {
		Self { llm }
	}

	/// Generates one DaySkeleton per trip day. Retries the whole
	/// call-and-parse on any failure; once the retry budget is spent the
	/// last error surfaces as `MacroPlanGenerationFailed`.
	pub async fn generate(
		&self,
		spec: &TripSpec,
		cancel: &CancellationToken,
	) -> Result<Vec<DaySkeleton>, AppError> {
		let token_limit = if spec.num_days() <= SHORT_TRIP_MAX_DAYS {
			TOKEN_LIMIT_SHORT_TRIP
		} else {
			TOKEN_LIMIT_LONG_TRIP
		};
		let user_prompt = build_planning_prompt(&build_trip_context(spec));

		let mut last_error = String::new();
		for attempt in 1..=LLM_MAX_ATTEMPTS {
			if cancel.is_cancelled() {
				return Err(AppError::Cancelled);
			}

			match self
				.llm
				.generate_structured(&user_prompt, MACRO_SYSTEM_PROMPT, token_limit)
				.await
			{
				Ok(response) => match parse_skeleton_response(&response) {
					Ok(skeletons) if !skeletons.is_empty() => {
						info!(
							target: "macro_planner",
							trip_id = spec.id,
							days = skeletons.len(),
							attempt = attempt,
							"macro plan generated"
						);
						return Ok(skeletons);
					}
					Ok(_) => {
						last_error = String::from("LLM returned an empty skeleton list");
					}
					Err(e) => last_error = e,
				},
				Err(e) => last_error = e.to_string(),
			}

			warn!(
				target: "macro_planner",
				trip_id = spec.id,
				attempt = attempt,
				error = %last_error,
				"macro planning attempt failed"
			);
		}

		Err(AppError::MacroPlanGenerationFailed(last_error))
	}
}

impl Default for MacroPlanner {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_normalize_time_string() {
		assert_eq!(normalize_time_string("08:30:00"), "08:30:00");
		assert_eq!(normalize_time_string(":30:00"), "00:30:00");
		assert_eq!(normalize_time_string("9:5:2"), "09:05:02");
		assert_eq!(normalize_time_string("  10:00:00  "), "10:00:00");
		assert_eq!(normalize_time_string(""), "00:00:00");
		assert_eq!(normalize_time_string("10:30"), "00:00:00");
		assert_eq!(normalize_time_string("not a time"), "00:00:00");
		assert_eq!(normalize_time_string("::"), "00:00:00");
	}

	#[test]
	fn test_normalized_output_shape() {
		let re = regex::Regex::new(r"^[0-9]{2}:[0-9]{2}:[0-9]{2}$").unwrap();
		for raw in ["", ":15:00", "7:0:0", "garbage", "1:2", "08:30:00"] {
			assert!(
				re.is_match(&normalize_time_string(raw)),
				"normalization of {raw:?} broke the HH:MM:SS shape"
			);
		}
	}

	#[test]
	fn test_parse_skeleton_response_normalizes_times() {
		let response = json!({
			"days": [{
				"day_number": 1,
				"date": "2024-06-15",
				"theme": "Arrival",
				"blocks": [{
					"block_type": "meal",
					"start_time": ":30:00",
					"end_time": "9:0:0",
					"theme": "Breakfast",
					"desired_categories": ["cafe"]
				}]
			}]
		});

		let days = parse_skeleton_response(&response).unwrap();
		assert_eq!(days.len(), 1);
		assert_eq!(days[0].blocks[0].start_time.to_string(), "00:30:00");
		assert_eq!(days[0].blocks[0].end_time.to_string(), "09:00:00");
	}

	#[test]
	fn test_parse_skeleton_response_rejects_unknown_block_type() {
		let response = json!({
			"days": [{
				"day_number": 1,
				"date": "2024-06-15",
				"theme": "Arrival",
				"blocks": [{
					"block_type": "brunch",
					"start_time": "08:00:00",
					"end_time": "09:00:00",
					"theme": "Brunch",
					"desired_categories": ["cafe"]
				}]
			}]
		});

		assert!(parse_skeleton_response(&response).is_err());
	}

	#[test]
	fn test_parse_skeleton_response_requires_days() {
		assert!(parse_skeleton_response(&json!({})).is_err());
		assert!(parse_skeleton_response(&json!({ "days": "two" })).is_err());
	}
}
