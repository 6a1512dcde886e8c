/*
 * tests/common/mod.rs
 *
 * Shared test fixtures: mock LLM / POI / travel-time providers, an
 * in-memory pipeline builder, and the canned macro-plan response used
 * across the stage tests.
 */
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use tripforge::error::AppError;
use tripforge::models::poi::PoiCandidate;
use tripforge::models::trip::{BudgetLevel, DailyRoutine, PaceLevel, TripDraft, TripSpec};
use tripforge::planner::macro_planner::MacroPlanner;
use tripforge::planner::orchestrator::TripPlanner;
use tripforge::planner::poi_planner::PoiPlanner;
use tripforge::planner::route_optimizer::RouteTimeOptimizer;
use tripforge::providers::llm::{LlmClient, LlmError};
use tripforge::providers::poi::PoiProvider;
use tripforge::providers::travel_time::{
	TravelEstimate, TravelLocation, TravelMode, TravelTimeProvider,
};
use tripforge::store::{MemoryPlanStore, MemoryTripStore, PlanStore, TripStore};

// ===== Mock LLM =====

/// Scripted LLM: queued results are consumed first, then the fallback
/// response repeats forever. Call count is observable for retry tests.
pub struct MockLlmClient {
	script: Mutex<VecDeque<Result<Value, String>>>,
	fallback: Option<Value>,
	pub calls: AtomicUsize,
}

impl MockLlmClient {
	pub fn with_response(value: Value) -> Self {
		Self {
			script: Mutex::new(VecDeque::new()),
			fallback: Some(value),
			calls: AtomicUsize::new(0),
		}
	}

	pub fn with_script(script: Vec<Result<Value, String>>) -> Self {
		Self {
			script: Mutex::new(script.into()),
			fallback: None,
			calls: AtomicUsize::new(0),
		}
	}

	pub fn call_count(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl LlmClient for MockLlmClient {
	async fn generate_structured(
		&self,
		_prompt: &str,
		_system_prompt: &str,
		_max_tokens: u32,
	) -> Result<Value, LlmError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		if let Some(step) = self.script.lock().await.pop_front() {
			return step.map_err(LlmError::Upstream);
		}
		match &self.fallback {
			Some(value) => Ok(value.clone()),
			None => Err(LlmError::Upstream(String::from("mock script exhausted"))),
		}
	}
}

// ===== Mock POI provider =====

pub fn candidate(id: &str, name: &str, category: &str, rank_score: f64) -> PoiCandidate {
	PoiCandidate {
		poi_id: id.to_string(),
		name: name.to_string(),
		category: category.to_string(),
		tags: vec![],
		rating: Some(4.2),
		price_tier: Some(2),
		location: format!("{name} street 1"),
		lat: Some(48.85 + rank_score / 1000.0),
		lon: Some(2.35 + rank_score / 1000.0),
		rank_score,
	}
}

/// Returns canned candidates keyed by the first desired category; the
/// fallback list answers everything else. Already sorted by rank.
pub struct MockPoiProvider {
	by_primary: HashMap<String, Vec<PoiCandidate>>,
	fallback: Vec<PoiCandidate>,
	pub fail: bool,
}

impl MockPoiProvider {
	pub fn returning(fallback: Vec<PoiCandidate>) -> Self {
		Self { by_primary: HashMap::new(), fallback, fail: false }
	}

	pub fn empty() -> Self {
		Self::returning(vec![])
	}

	pub fn with_primary(mut self, category: &str, candidates: Vec<PoiCandidate>) -> Self {
		self.by_primary.insert(category.to_string(), candidates);
		self
	}

	pub fn failing() -> Self {
		Self { by_primary: HashMap::new(), fallback: vec![], fail: true }
	}
}

#[async_trait]
impl PoiProvider for MockPoiProvider {
	async fn search(
		&self,
		_city: &str,
		desired_categories: &[String],
		_budget: Option<BudgetLevel>,
		limit: usize,
		_center: Option<(f64, f64)>,
	) -> Result<Vec<PoiCandidate>, AppError> {
		if self.fail {
			return Err(AppError::Provider(String::from("mock provider down")));
		}
		let mut results = desired_categories
			.first()
			.and_then(|primary| self.by_primary.get(primary))
			.unwrap_or(&self.fallback)
			.clone();
		results.truncate(limit);
		Ok(results)
	}
}

// ===== Mock travel time =====

pub struct MockTravelTimeProvider {
	pub fixed_minutes: i64,
	pub fixed_distance: Option<i64>,
	pub fixed_polyline: Option<String>,
}

impl MockTravelTimeProvider {
	pub fn fixed(minutes: i64) -> Self {
		Self {
			fixed_minutes: minutes,
			fixed_distance: Some(3000),
			fixed_polyline: Some(String::from("mock_polyline_abc123")),
		}
	}
}

#[async_trait]
impl TravelTimeProvider for MockTravelTimeProvider {
	async fn estimate(
		&self,
		_origin: &TravelLocation,
		_destination: &TravelLocation,
		_mode: TravelMode,
	) -> TravelEstimate {
		TravelEstimate {
			duration_minutes: self.fixed_minutes,
			distance_meters: self.fixed_distance,
			polyline: self.fixed_polyline.clone(),
		}
	}
}

// ===== Fixtures =====

pub fn date(s: &str) -> NaiveDate {
	NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn time(s: &str) -> NaiveTime {
	NaiveTime::parse_from_str(s, "%H:%M:%S").unwrap()
}

pub fn trip_draft(city: &str, start: &str, end: &str) -> TripDraft {
	TripDraft {
		city: city.to_string(),
		start_date: date(start),
		end_date: date(end),
		num_travelers: 1,
		pace: PaceLevel::Medium,
		budget: BudgetLevel::Medium,
		interests: vec![String::from("food"), String::from("culture")],
		hotel_location: None,
		hotel_lat: None,
		hotel_lon: None,
		additional_preferences: None,
		daily_routine: DailyRoutine::default(),
	}
}

pub fn trip_spec(id: i32, city: &str, start: &str, end: &str) -> TripSpec {
	trip_draft(city, start, end).into_spec(id)
}

/// The canned two-day macro plan the LLM mock answers with: five blocks on
/// day one, six on day two including a rest block and nightlife wrapping
/// past midnight.
pub fn mock_macro_plan_response() -> Value {
	json!({
		"days": [
			{
				"day_number": 1,
				"date": "2024-06-15",
				"theme": "Historic Center & Local Food",
				"blocks": [
					{
						"block_type": "meal",
						"start_time": "08:30:00",
						"end_time": "09:30:00",
						"theme": "Breakfast",
						"desired_categories": ["cafe", "breakfast", "bakery"]
					},
					{
						"block_type": "activity",
						"start_time": "10:00:00",
						"end_time": "13:00:00",
						"theme": "Historic landmarks",
						"desired_categories": ["landmark", "architecture", "culture"]
					},
					{
						"block_type": "meal",
						"start_time": "13:00:00",
						"end_time": "14:30:00",
						"theme": "Lunch",
						"desired_categories": ["restaurant", "local_cuisine"]
					},
					{
						"block_type": "activity",
						"start_time": "15:00:00",
						"end_time": "18:00:00",
						"theme": "Shopping and cafes",
						"desired_categories": ["shopping", "cafe"]
					},
					{
						"block_type": "meal",
						"start_time": "19:30:00",
						"end_time": "21:30:00",
						"theme": "Dinner",
						"desired_categories": ["restaurant", "fine_dining"]
					}
				]
			},
			{
				"day_number": 2,
				"date": "2024-06-16",
				"theme": "Parks & Nightlife",
				"blocks": [
					{
						"block_type": "meal",
						"start_time": "09:00:00",
						"end_time": "10:00:00",
						"theme": "Breakfast",
						"desired_categories": ["cafe", "breakfast"]
					},
					{
						"block_type": "activity",
						"start_time": "10:30:00",
						"end_time": "13:00:00",
						"theme": "Parks and views",
						"desired_categories": ["park", "viewpoint", "nature"]
					},
					{
						"block_type": "meal",
						"start_time": "13:30:00",
						"end_time": "15:00:00",
						"theme": "Lunch",
						"desired_categories": ["restaurant", "outdoor_seating"]
					},
					{
						"block_type": "rest",
						"start_time": "15:00:00",
						"end_time": "17:00:00",
						"theme": "Rest at hotel",
						"desired_categories": []
					},
					{
						"block_type": "meal",
						"start_time": "20:00:00",
						"end_time": "22:00:00",
						"theme": "Dinner",
						"desired_categories": ["restaurant", "local_cuisine"]
					},
					{
						"block_type": "nightlife",
						"start_time": "23:00:00",
						"end_time": "02:00:00",
						"theme": "Techno nightlife",
						"desired_categories": ["nightlife", "techno", "club"]
					}
				]
			}
		]
	})
}

/// One place to assemble a fully in-memory pipeline. Defaults: the canned
/// macro plan, one shared candidate pool, 10-minute travel legs.
pub struct TestPipeline {
	pub trips: Arc<MemoryTripStore>,
	pub plans: Arc<MemoryPlanStore>,
	pub planner: TripPlanner,
}

pub fn test_pipeline(llm: MockLlmClient, pois: MockPoiProvider, travel_minutes: i64) -> TestPipeline {
	let trips = Arc::new(MemoryTripStore::new());
	let plans = Arc::new(MemoryPlanStore::new());
	let trips_dyn: Arc<dyn TripStore> = Arc::clone(&trips) as Arc<dyn TripStore>;
	let plans_dyn: Arc<dyn PlanStore> = Arc::clone(&plans) as Arc<dyn PlanStore>;
	let planner = TripPlanner::with_components(
		trips_dyn,
		plans_dyn,
		MacroPlanner::with_client(Arc::new(llm)),
		PoiPlanner::new(Arc::new(pois)),
		RouteTimeOptimizer::with_provider(Arc::new(MockTravelTimeProvider::fixed(travel_minutes))),
	);
	TestPipeline { trips, plans, planner }
}

pub fn default_candidates() -> Vec<PoiCandidate> {
	vec![
		candidate("poi-1", "Top Pick", "restaurant", 11.0),
		candidate("poi-2", "Runner Up", "cafe", 9.5),
		candidate("poi-3", "Third Choice", "restaurant", 8.0),
		candidate("poi-4", "Fourth Choice", "bar", 6.5),
	]
}
