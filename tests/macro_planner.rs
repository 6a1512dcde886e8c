/*
 * tests/macro_planner.rs
 *
 * Unit tests for the macro planning stage against a scripted LLM.
 */

mod common;

use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use common::{MockLlmClient, mock_macro_plan_response, trip_spec};
use tripforge::AppError;
use tripforge::models::skeleton::BlockType;
use tripforge::planner::macro_planner::{MacroPlanner, build_trip_context};
use tripforge::providers::llm::{
	LlmClient, reset_macro_planning_llm_factory, set_macro_planning_llm_factory,
};

// ===== Generation =====

#[tokio::test]
async fn test_generates_one_skeleton_per_day() {
	let planner = MacroPlanner::with_client(Arc::new(MockLlmClient::with_response(
		mock_macro_plan_response(),
	)));
	let spec = trip_spec(1, "Paris", "2024-06-15", "2024-06-16");

	let days = planner.generate(&spec, &CancellationToken::new()).await.unwrap();

	assert_eq!(days.len() as i64, spec.num_days());
	for (offset, day) in days.iter().enumerate() {
		assert_eq!(day.day_number, offset as i32 + 1);
		assert!(day.blocks.len() >= 5);
	}
}

#[tokio::test]
async fn test_skeleton_structure_matches_response() {
	let planner = MacroPlanner::with_client(Arc::new(MockLlmClient::with_response(
		mock_macro_plan_response(),
	)));
	let spec = trip_spec(1, "Paris", "2024-06-15", "2024-06-16");

	let days = planner.generate(&spec, &CancellationToken::new()).await.unwrap();

	let day1 = &days[0];
	assert_eq!(day1.theme, "Historic Center & Local Food");
	assert_eq!(day1.blocks[0].block_type, BlockType::Meal);
	assert!(day1.blocks[0].desired_categories.contains(&String::from("cafe")));

	let nightlife = days[1].blocks.last().unwrap();
	assert_eq!(nightlife.block_type, BlockType::Nightlife);
	assert!(nightlife.desired_categories.contains(&String::from("techno")));
	// Wraps past midnight
	assert!(nightlife.end_time < nightlife.start_time);
}

#[tokio::test]
async fn test_meal_blocks_inside_routine_windows() {
	let planner = MacroPlanner::with_client(Arc::new(MockLlmClient::with_response(
		mock_macro_plan_response(),
	)));
	let spec = trip_spec(1, "Paris", "2024-06-15", "2024-06-16");

	let days = planner.generate(&spec, &CancellationToken::new()).await.unwrap();

	for day in &days {
		let meals: Vec<_> = day
			.blocks
			.iter()
			.filter(|b| b.block_type == BlockType::Meal)
			.collect();
		assert!(meals.len() >= 3, "day {} has {} meals", day.day_number, meals.len());
		for meal in meals {
			assert!(meal.start_time >= spec.daily_routine.wake_time);
		}
	}
}

// ===== Normalization =====

#[tokio::test]
async fn test_malformed_time_strings_are_normalized() {
	let response = json!({
		"days": [{
			"day_number": 1,
			"date": "2024-06-15",
			"theme": "Day",
			"blocks": [{
				"block_type": "meal",
				"start_time": ":30:00",
				"end_time": "9:5:0",
				"theme": "Breakfast",
				"desired_categories": ["cafe"]
			}]
		}]
	});
	let planner = MacroPlanner::with_client(Arc::new(MockLlmClient::with_response(response)));
	let spec = trip_spec(1, "Paris", "2024-06-15", "2024-06-15");

	let days = planner.generate(&spec, &CancellationToken::new()).await.unwrap();

	assert_eq!(days[0].blocks[0].start_time.to_string(), "00:30:00");
	assert_eq!(days[0].blocks[0].end_time.to_string(), "09:05:00");
}

// ===== Retry behavior =====

#[tokio::test]
async fn test_retries_after_upstream_error() {
	let llm = Arc::new(MockLlmClient::with_script(vec![
		Err(String::from("rate limited")),
		Ok(mock_macro_plan_response()),
	]));
	let llm_dyn: Arc<dyn LlmClient> = llm.clone();
	let planner = MacroPlanner::with_client(llm_dyn);
	let spec = trip_spec(1, "Paris", "2024-06-15", "2024-06-16");

	let days = planner.generate(&spec, &CancellationToken::new()).await.unwrap();

	assert_eq!(days.len(), 2);
	assert_eq!(llm.call_count(), 2);
}

#[tokio::test]
async fn test_retries_after_unparseable_response() {
	let llm = Arc::new(MockLlmClient::with_script(vec![
		Ok(json!({ "days": [{ "day_number": 1 }] })),
		Ok(mock_macro_plan_response()),
	]));
	let llm_dyn: Arc<dyn LlmClient> = llm.clone();
	let planner = MacroPlanner::with_client(llm_dyn);
	let spec = trip_spec(1, "Paris", "2024-06-15", "2024-06-16");

	let days = planner.generate(&spec, &CancellationToken::new()).await.unwrap();

	assert_eq!(days.len(), 2);
	assert_eq!(llm.call_count(), 2);
}

#[tokio::test]
async fn test_fails_once_retry_budget_is_spent() {
	let llm = Arc::new(MockLlmClient::with_script(vec![
		Err(String::from("first failure")),
		Err(String::from("second failure")),
	]));
	let llm_dyn: Arc<dyn LlmClient> = llm.clone();
	let planner = MacroPlanner::with_client(llm_dyn);
	let spec = trip_spec(1, "Paris", "2024-06-15", "2024-06-16");

	let err = planner
		.generate(&spec, &CancellationToken::new())
		.await
		.unwrap_err();

	assert!(matches!(err, AppError::MacroPlanGenerationFailed(_)));
	// Carries the last underlying error
	assert!(err.to_string().contains("second failure"));
	assert_eq!(llm.call_count(), 2);
}

#[tokio::test]
async fn test_empty_days_list_is_a_failure() {
	let planner = MacroPlanner::with_client(Arc::new(MockLlmClient::with_response(
		json!({ "days": [] }),
	)));
	let spec = trip_spec(1, "Paris", "2024-06-15", "2024-06-16");

	let err = planner
		.generate(&spec, &CancellationToken::new())
		.await
		.unwrap_err();
	assert!(matches!(err, AppError::MacroPlanGenerationFailed(_)));
}

#[tokio::test]
async fn test_cancellation_aborts_before_the_llm_call() {
	let llm = Arc::new(MockLlmClient::with_response(mock_macro_plan_response()));
	let llm_dyn: Arc<dyn LlmClient> = llm.clone();
	let planner = MacroPlanner::with_client(llm_dyn);
	let spec = trip_spec(1, "Paris", "2024-06-15", "2024-06-16");

	let cancel = CancellationToken::new();
	cancel.cancel();

	let err = planner.generate(&spec, &cancel).await.unwrap_err();
	assert!(matches!(err, AppError::Cancelled));
	assert_eq!(llm.call_count(), 0);
}

// The factory is process-global state, so this test runs serialized
#[tokio::test]
#[serial_test::serial(llm_factory)]
async fn test_default_factory_is_swappable() {
	fn mock_factory() -> Arc<dyn LlmClient> {
		Arc::new(MockLlmClient::with_response(mock_macro_plan_response()))
	}
	set_macro_planning_llm_factory(mock_factory);

	// No client injected: the planner picks up the swapped factory
	let planner = MacroPlanner::new();
	let spec = trip_spec(1, "Paris", "2024-06-15", "2024-06-16");
	let days = planner.generate(&spec, &CancellationToken::new()).await.unwrap();
	assert_eq!(days.len(), 2);

	reset_macro_planning_llm_factory();
}

// ===== Prompt context =====

#[test]
fn test_trip_context_carries_the_spec() {
	let mut spec = trip_spec(1, "Rome", "2024-11-01", "2024-11-02");
	spec.pace = tripforge::models::trip::PaceLevel::Slow;
	spec.budget = tripforge::models::trip::BudgetLevel::High;
	spec.interests = vec![String::from("food"), String::from("architecture")];
	spec.hotel_location = Some(String::from("Hotel Artemide"));

	let context = build_trip_context(&spec);

	assert!(context.contains("Rome"));
	assert!(context.contains("slow"));
	assert!(context.contains("high"));
	assert!(context.contains("food, architecture"));
	assert!(context.contains("Hotel Artemide"));
	assert!(context.contains("(2 days)"));
}

#[test]
fn test_trip_context_defaults_interests() {
	let mut spec = trip_spec(1, "Tokyo", "2024-07-01", "2024-07-02");
	spec.interests.clear();

	let context = build_trip_context(&spec);
	assert!(context.contains("general sightseeing"));
}
