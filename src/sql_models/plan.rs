use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Row model for the `trip_plans` table: one record per trip with one JSONB
/// column per pipeline stage. A NULL stage column means "stage not yet run".
#[derive(Debug, FromRow)]
pub struct PlanRecordRow {
	pub trip_id: i32,
	pub macro_plan: Option<serde_json::Value>,
	pub macro_plan_created_at: Option<DateTime<Utc>>,
	pub poi_plan: Option<serde_json::Value>,
	pub poi_plan_created_at: Option<DateTime<Utc>>,
	pub itinerary: Option<serde_json::Value>,
	pub itinerary_created_at: Option<DateTime<Utc>>,
	pub critique: Option<serde_json::Value>,
	pub critique_created_at: Option<DateTime<Utc>>,
}
