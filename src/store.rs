/*
 * src/store.rs
 *
 * File for trip and plan persistence
 *
 * Purpose:
 *   The two storage capabilities the orchestrator consumes: the trip store
 *   (create/get trip specs) and the plan store (one record per trip with a
 *   nullable JSONB field per pipeline stage). Both come in a Postgres
 *   flavor and an in-memory flavor used by tests.
 *
 * Include:
 *   TripStore / PgTripStore / MemoryTripStore
 *   PlanStore / PgPlanStore / MemoryPlanStore
 *   PlanRecord - typed view of one trip_plans row
 *   TripLock   - per-trip serialization guard (advisory lock or mutex)
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::warn;

use crate::error::AppError;
use crate::models::critique::CritiqueIssue;
use crate::models::itinerary::Itinerary;
use crate::models::poi::PoiPlan;
use crate::models::skeleton::DaySkeleton;
use crate::models::trip::{TripDraft, TripSpec};
use crate::sql_models::plan::PlanRecordRow;
use crate::sql_models::trip::TripRow;

// ---------------------------
// Trip store
// ---------------------------

#[async_trait]
pub trait TripStore: Send + Sync {
	async fn create(&self, draft: TripDraft) -> Result<TripSpec, AppError>;
	async fn get(&self, trip_id: i32) -> Result<Option<TripSpec>, AppError>;
}

pub struct PgTripStore {
	pool: PgPool,
}

impl PgTripStore {
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}
}

const TRIP_COLUMNS: &str = "id, city, start_date, end_date, num_travelers, pace, budget, \
	interests, hotel_location, hotel_lat, hotel_lon, additional_preferences, \
	wake_time, sleep_time, breakfast_start, breakfast_end, lunch_start, lunch_end, \
	dinner_start, dinner_end, created_at";

#[async_trait]
impl TripStore for PgTripStore {
	async fn create(&self, draft: TripDraft) -> Result<TripSpec, AppError> {
		let routine = &draft.daily_routine;
		let row: TripRow = sqlx::query_as(&format!(
			r#"INSERT INTO trips (city, start_date, end_date, num_travelers, pace, budget,
				interests, hotel_location, hotel_lat, hotel_lon, additional_preferences,
				wake_time, sleep_time, breakfast_start, breakfast_end, lunch_start, lunch_end,
				dinner_start, dinner_end)
			VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
			RETURNING {TRIP_COLUMNS}"#
		))
		.bind(&draft.city)
		.bind(draft.start_date)
		.bind(draft.end_date)
		.bind(draft.num_travelers)
		.bind(draft.pace.as_str())
		.bind(draft.budget.as_str())
		.bind(&draft.interests)
		.bind(&draft.hotel_location)
		.bind(draft.hotel_lat)
		.bind(draft.hotel_lon)
		.bind(&draft.additional_preferences)
		.bind(routine.wake_time)
		.bind(routine.sleep_time)
		.bind(routine.breakfast_window.0)
		.bind(routine.breakfast_window.1)
		.bind(routine.lunch_window.0)
		.bind(routine.lunch_window.1)
		.bind(routine.dinner_window.0)
		.bind(routine.dinner_window.1)
		.fetch_one(&self.pool)
		.await?;

		Ok(row.into())
	}

	async fn get(&self, trip_id: i32) -> Result<Option<TripSpec>, AppError> {
		let row: Option<TripRow> =
			sqlx::query_as(&format!("SELECT {TRIP_COLUMNS} FROM trips WHERE id = $1"))
				.bind(trip_id)
				.fetch_optional(&self.pool)
				.await?;
		Ok(row.map(TripRow::into))
	}
}

/// In-memory trip store for tests and offline runs.
#[derive(Default)]
pub struct MemoryTripStore {
	next_id: AtomicI32,
	trips: RwLock<HashMap<i32, TripSpec>>,
}

impl MemoryTripStore {
	pub fn new() -> Self {
		Self {
			next_id: AtomicI32::new(1),
			trips: RwLock::new(HashMap::new()),
		}
	}
}

#[async_trait]
impl TripStore for MemoryTripStore {
	async fn create(&self, draft: TripDraft) -> Result<TripSpec, AppError> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let spec = draft.into_spec(id);
		self.trips.write().await.insert(id, spec.clone());
		Ok(spec)
	}

	async fn get(&self, trip_id: i32) -> Result<Option<TripSpec>, AppError> {
		Ok(self.trips.read().await.get(&trip_id).cloned())
	}
}

// ---------------------------
// Plan store
// ---------------------------

/// Typed view of one plan record. A None stage means "not yet run".
#[derive(Debug, Clone, Default)]
pub struct PlanRecord {
	pub macro_plan: Option<Vec<DaySkeleton>>,
	pub macro_plan_created_at: Option<DateTime<Utc>>,
	pub poi_plan: Option<PoiPlan>,
	pub poi_plan_created_at: Option<DateTime<Utc>>,
	pub itinerary: Option<Itinerary>,
	pub itinerary_created_at: Option<DateTime<Utc>>,
	pub critique: Option<Vec<CritiqueIssue>>,
	pub critique_created_at: Option<DateTime<Utc>>,
}

impl TryFrom<PlanRecordRow> for PlanRecord {
	type Error = AppError;

	fn try_from(row: PlanRecordRow) -> Result<Self, AppError> {
		Ok(PlanRecord {
			macro_plan: row
				.macro_plan
				.map(serde_json::from_value)
				.transpose()?,
			macro_plan_created_at: row.macro_plan_created_at,
			poi_plan: row.poi_plan.map(serde_json::from_value).transpose()?,
			poi_plan_created_at: row.poi_plan_created_at,
			itinerary: row.itinerary.map(serde_json::from_value).transpose()?,
			itinerary_created_at: row.itinerary_created_at,
			critique: row.critique.map(serde_json::from_value).transpose()?,
			critique_created_at: row.critique_created_at,
		})
	}
}

/// Guard serializing plan runs for one trip. The Postgres flavor holds a
/// session advisory lock on a dedicated pool connection; the in-memory
/// flavor holds a per-trip mutex.
pub struct TripLock {
	pg: Option<(PoolConnection<Postgres>, i64)>,
	_mem: Option<OwnedMutexGuard<()>>,
}

impl TripLock {
	fn postgres(conn: PoolConnection<Postgres>, key: i64) -> Self {
		Self { pg: Some((conn, key)), _mem: None }
	}

	fn memory(guard: OwnedMutexGuard<()>) -> Self {
		Self { pg: None, _mem: Some(guard) }
	}

	/// Releases the advisory lock and hands the connection back to the
	/// pool. Prefer this over dropping, which has to close the connection
	/// to get the lock released.
	pub async fn release(mut self) {
		if let Some((mut conn, key)) = self.pg.take() {
			match sqlx::query("SELECT pg_advisory_unlock($1)")
				.bind(key)
				.execute(&mut *conn)
				.await
			{
				Ok(_) => drop(conn),
				Err(e) => {
					warn!(
						target: "plan_store",
						error = %e,
						"advisory unlock failed; closing the connection instead"
					);
					drop(conn.detach());
				}
			}
		}
	}
}

impl Drop for TripLock {
	fn drop(&mut self) {
		if let Some((conn, _)) = self.pg.take() {
			// A pooled connection must not return while still holding the
			// session lock; closing the detached connection releases it
			drop(conn.detach());
		}
	}
}

#[async_trait]
pub trait PlanStore: Send + Sync {
	async fn lock_trip(&self, trip_id: i32) -> Result<TripLock, AppError>;
	async fn load(&self, trip_id: i32) -> Result<PlanRecord, AppError>;
	async fn save_macro_plan(
		&self,
		trip_id: i32,
		days: &[DaySkeleton],
		created_at: DateTime<Utc>,
	) -> Result<(), AppError>;
	async fn save_poi_plan(
		&self,
		trip_id: i32,
		plan: &PoiPlan,
		created_at: DateTime<Utc>,
	) -> Result<(), AppError>;
	async fn save_itinerary(&self, trip_id: i32, itinerary: &Itinerary) -> Result<(), AppError>;
	async fn save_critique(
		&self,
		trip_id: i32,
		issues: &[CritiqueIssue],
		created_at: DateTime<Utc>,
	) -> Result<(), AppError>;
}

pub struct PgPlanStore {
	pool: PgPool,
}

impl PgPlanStore {
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}

	async fn upsert_stage(
		&self,
		trip_id: i32,
		stage: &str,
		payload: serde_json::Value,
		created_at: DateTime<Utc>,
	) -> Result<(), AppError> {
		// Stage names are compile-time constants, not user input
		let sql = format!(
			r#"INSERT INTO trip_plans (trip_id, {stage}, {stage}_created_at, updated_at)
			VALUES ($1, $2, $3, $3)
			ON CONFLICT (trip_id) DO UPDATE SET
				{stage} = EXCLUDED.{stage},
				{stage}_created_at = EXCLUDED.{stage}_created_at,
				updated_at = EXCLUDED.updated_at"#
		);
		sqlx::query(&sql)
			.bind(trip_id)
			.bind(payload)
			.bind(created_at)
			.execute(&self.pool)
			.await?;
		Ok(())
	}
}

#[async_trait]
impl PlanStore for PgPlanStore {
	async fn lock_trip(&self, trip_id: i32) -> Result<TripLock, AppError> {
		let mut conn = self.pool.acquire().await?;
		let key = trip_id as i64;
		sqlx::query("SELECT pg_advisory_lock($1)")
			.bind(key)
			.execute(&mut *conn)
			.await?;
		Ok(TripLock::postgres(conn, key))
	}

	async fn load(&self, trip_id: i32) -> Result<PlanRecord, AppError> {
		let row: Option<PlanRecordRow> = sqlx::query_as(
			r#"SELECT trip_id, macro_plan, macro_plan_created_at,
				poi_plan, poi_plan_created_at,
				itinerary, itinerary_created_at,
				critique, critique_created_at
			FROM trip_plans WHERE trip_id = $1"#,
		)
		.bind(trip_id)
		.fetch_optional(&self.pool)
		.await?;

		match row {
			Some(row) => row.try_into(),
			None => Ok(PlanRecord::default()),
		}
	}

	async fn save_macro_plan(
		&self,
		trip_id: i32,
		days: &[DaySkeleton],
		created_at: DateTime<Utc>,
	) -> Result<(), AppError> {
		self.upsert_stage(trip_id, "macro_plan", serde_json::to_value(days)?, created_at)
			.await
	}

	async fn save_poi_plan(
		&self,
		trip_id: i32,
		plan: &PoiPlan,
		created_at: DateTime<Utc>,
	) -> Result<(), AppError> {
		self.upsert_stage(trip_id, "poi_plan", serde_json::to_value(plan)?, created_at)
			.await
	}

	async fn save_itinerary(&self, trip_id: i32, itinerary: &Itinerary) -> Result<(), AppError> {
		self.upsert_stage(
			trip_id,
			"itinerary",
			serde_json::to_value(itinerary)?,
			itinerary.created_at,
		)
		.await
	}

	async fn save_critique(
		&self,
		trip_id: i32,
		issues: &[CritiqueIssue],
		created_at: DateTime<Utc>,
	) -> Result<(), AppError> {
		self.upsert_stage(trip_id, "critique", serde_json::to_value(issues)?, created_at)
			.await
	}
}

/// In-memory plan store for tests. Per-trip mutexes stand in for the
/// advisory lock.
#[derive(Default)]
pub struct MemoryPlanStore {
	records: RwLock<HashMap<i32, PlanRecord>>,
	locks: Mutex<HashMap<i32, Arc<Mutex<()>>>>,
}

impl MemoryPlanStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl PlanStore for MemoryPlanStore {
	async fn lock_trip(&self, trip_id: i32) -> Result<TripLock, AppError> {
		let lock = {
			let mut locks = self.locks.lock().await;
			Arc::clone(locks.entry(trip_id).or_default())
		};
		Ok(TripLock::memory(lock.lock_owned().await))
	}

	async fn load(&self, trip_id: i32) -> Result<PlanRecord, AppError> {
		Ok(self
			.records
			.read()
			.await
			.get(&trip_id)
			.cloned()
			.unwrap_or_default())
	}

	async fn save_macro_plan(
		&self,
		trip_id: i32,
		days: &[DaySkeleton],
		created_at: DateTime<Utc>,
	) -> Result<(), AppError> {
		let mut records = self.records.write().await;
		let record = records.entry(trip_id).or_default();
		record.macro_plan = Some(days.to_vec());
		record.macro_plan_created_at = Some(created_at);
		Ok(())
	}

	async fn save_poi_plan(
		&self,
		trip_id: i32,
		plan: &PoiPlan,
		created_at: DateTime<Utc>,
	) -> Result<(), AppError> {
		let mut records = self.records.write().await;
		let record = records.entry(trip_id).or_default();
		record.poi_plan = Some(plan.clone());
		record.poi_plan_created_at = Some(created_at);
		Ok(())
	}

	async fn save_itinerary(&self, trip_id: i32, itinerary: &Itinerary) -> Result<(), AppError> {
		let mut records = self.records.write().await;
		let record = records.entry(trip_id).or_default();
		record.itinerary = Some(itinerary.clone());
		record.itinerary_created_at = Some(itinerary.created_at);
		Ok(())
	}

	async fn save_critique(
		&self,
		trip_id: i32,
		issues: &[CritiqueIssue],
		created_at: DateTime<Utc>,
	) -> Result<(), AppError> {
		let mut records = self.records.write().await;
		let record = records.entry(trip_id).or_default();
		record.critique = Some(issues.to_vec());
		record.critique_created_at = Some(created_at);
		Ok(())
	}
}
