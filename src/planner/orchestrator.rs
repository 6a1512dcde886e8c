/*
 * src/planner/orchestrator.rs
 *
 * File for the planning pipeline orchestrator
 *
 * Purpose:
 *   String the four stages together. Each stage's output is persisted on
 *   success and reused on re-entry, so planning is idempotent and
 *   resumable: a second `plan` call returns the stored itinerary without
 *   touching the LLM. Runs for the same trip are serialized through the
 *   plan store's per-trip lock.
 */

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::AppError;
use crate::models::critique::CritiqueIssue;
use crate::models::itinerary::Itinerary;
use crate::models::poi::PoiPlan;
use crate::models::skeleton::DaySkeleton;
use crate::models::trip::TripSpec;
use crate::planner::macro_planner::MacroPlanner;
use crate::planner::poi_planner::PoiPlanner;
use crate::planner::route_optimizer::RouteTimeOptimizer;
use crate::planner::trip_critic::TripCritic;
use crate::providers::poi::poi_provider;
use crate::store::{PlanStore, TripStore};

pub struct TripPlanner {
	trips: Arc<dyn TripStore>,
	plans: Arc<dyn PlanStore>,
	macro_planner: MacroPlanner,
	poi_planner: PoiPlanner,
	optimizer: RouteTimeOptimizer,
	critic: TripCritic,
}

impl TripPlanner {
	/// Builds a planner with the default provider factories; the pool is
	/// needed for the local POI tier.
	pub fn new(trips: Arc<dyn TripStore>, plans: Arc<dyn PlanStore>, pool: &PgPool) -> Self {
		Self {
			trips,
			plans,
			macro_planner: MacroPlanner::new(),
			poi_planner: PoiPlanner::new(poi_provider(pool)),
			optimizer: RouteTimeOptimizer::new(),
			critic: TripCritic::new(),
		}
	}

	/// Full injection for tests and embedders.
	pub fn with_components(
		trips: Arc<dyn TripStore>,
		plans: Arc<dyn PlanStore>,
		macro_planner: MacroPlanner,
		poi_planner: PoiPlanner,
		optimizer: RouteTimeOptimizer,
	) -> Self {
		Self {
			trips,
			plans,
			macro_planner,
			poi_planner,
			optimizer,
			critic: TripCritic::new(),
		}
	}

	async fn spec(&self, trip_id: i32) -> Result<TripSpec, AppError> {
		self.trips
			.get(trip_id)
			.await?
			.ok_or(AppError::TripNotFound(trip_id))
	}

	/// Runs every missing stage in order and returns the itinerary.
	pub async fn plan(
		&self,
		trip_id: i32,
		cancel: &CancellationToken,
	) -> Result<Itinerary, AppError> {
		let spec = self.spec(trip_id).await?;
		let lock = self.plans.lock_trip(trip_id).await?;
		let result = self.plan_locked(&spec, cancel).await;
		lock.release().await;
		result
	}

	async fn plan_locked(
		&self,
		spec: &TripSpec,
		cancel: &CancellationToken,
	) -> Result<Itinerary, AppError> {
		let record = self.plans.load(spec.id).await?;

		// A committed itinerary short-circuits the whole pipeline; only a
		// missing critique still gets filled in
		if let Some(itinerary) = record.itinerary {
			if record.critique.is_none() {
				let issues = self.critic.critique(spec, &itinerary);
				self.plans
					.save_critique(spec.id, &issues, Utc::now())
					.await?;
			}
			info!(target: "orchestrator", trip_id = spec.id, "reusing stored itinerary");
			return Ok(itinerary);
		}

		let skeleton = match record.macro_plan {
			Some(days) => days,
			None => {
				let days = self.macro_planner.generate(spec, cancel).await?;
				if cancel.is_cancelled() {
					return Err(AppError::Cancelled);
				}
				self.plans
					.save_macro_plan(spec.id, &days, Utc::now())
					.await?;
				days
			}
		};

		let poi_plan = match record.poi_plan {
			Some(plan) => plan,
			None => {
				let plan = self.poi_planner.generate(spec, &skeleton, cancel).await?;
				if cancel.is_cancelled() {
					return Err(AppError::Cancelled);
				}
				self.plans.save_poi_plan(spec.id, &plan, Utc::now()).await?;
				plan
			}
		};

		let itinerary = self
			.optimizer
			.optimize(spec, &skeleton, &poi_plan, cancel)
			.await?;
		if cancel.is_cancelled() {
			return Err(AppError::Cancelled);
		}
		self.plans.save_itinerary(spec.id, &itinerary).await?;

		let issues = self.critic.critique(spec, &itinerary);
		self.plans
			.save_critique(spec.id, &issues, Utc::now())
			.await?;

		info!(
			target: "orchestrator",
			trip_id = spec.id,
			days = itinerary.days.len(),
			issues = issues.len(),
			"planning pipeline finished"
		);
		Ok(itinerary)
	}

	/// Runs (or reuses) the macro-plan stage alone.
	pub async fn run_macro_plan(
		&self,
		trip_id: i32,
		cancel: &CancellationToken,
	) -> Result<(Vec<DaySkeleton>, DateTime<Utc>), AppError> {
		let spec = self.spec(trip_id).await?;
		let lock = self.plans.lock_trip(trip_id).await?;
		let result = async {
			let record = self.plans.load(trip_id).await?;
			if let (Some(days), Some(created_at)) =
				(record.macro_plan, record.macro_plan_created_at)
			{
				return Ok((days, created_at));
			}

			let days = self.macro_planner.generate(&spec, cancel).await?;
			if cancel.is_cancelled() {
				return Err(AppError::Cancelled);
			}
			let created_at = Utc::now();
			self.plans.save_macro_plan(trip_id, &days, created_at).await?;
			Ok((days, created_at))
		}
		.await;
		lock.release().await;
		result
	}

	/// Runs (or reuses) the POI-plan stage alone. Unlike `plan`, a missing
	/// macro plan is an error here, not something to generate on the fly.
	pub async fn run_poi_plan(
		&self,
		trip_id: i32,
		cancel: &CancellationToken,
	) -> Result<(PoiPlan, DateTime<Utc>), AppError> {
		let spec = self.spec(trip_id).await?;
		let lock = self.plans.lock_trip(trip_id).await?;
		let result = async {
			let record = self.plans.load(trip_id).await?;
			if let (Some(plan), Some(created_at)) = (record.poi_plan, record.poi_plan_created_at)
			{
				return Ok((plan, created_at));
			}

			let skeleton = record
				.macro_plan
				.ok_or(AppError::PoiPlanRequiresMacroPlan(trip_id))?;
			let plan = self.poi_planner.generate(&spec, &skeleton, cancel).await?;
			if cancel.is_cancelled() {
				return Err(AppError::Cancelled);
			}
			let created_at = Utc::now();
			self.plans.save_poi_plan(trip_id, &plan, created_at).await?;
			Ok((plan, created_at))
		}
		.await;
		lock.release().await;
		result
	}

	/// Runs (or reuses) the optimization stage alone; both upstream stages
	/// must already be committed. The critique is refreshed alongside.
	pub async fn run_itinerary(
		&self,
		trip_id: i32,
		cancel: &CancellationToken,
	) -> Result<Itinerary, AppError> {
		let spec = self.spec(trip_id).await?;
		let lock = self.plans.lock_trip(trip_id).await?;
		let result = async {
			let record = self.plans.load(trip_id).await?;
			if let Some(itinerary) = record.itinerary {
				return Ok(itinerary);
			}

			let skeleton = record
				.macro_plan
				.ok_or(AppError::MacroPlanNotFound(trip_id))?;
			let poi_plan = record
				.poi_plan
				.ok_or(AppError::ItineraryRequiresPoiPlan(trip_id))?;

			let itinerary = self
				.optimizer
				.optimize(&spec, &skeleton, &poi_plan, cancel)
				.await?;
			if cancel.is_cancelled() {
				return Err(AppError::Cancelled);
			}
			self.plans.save_itinerary(trip_id, &itinerary).await?;

			let issues = self.critic.critique(&spec, &itinerary);
			self.plans.save_critique(trip_id, &issues, Utc::now()).await?;
			Ok(itinerary)
		}
		.await;
		lock.release().await;
		result
	}

	pub async fn get_macro_plan(
		&self,
		trip_id: i32,
	) -> Result<Option<(Vec<DaySkeleton>, DateTime<Utc>)>, AppError> {
		let record = self.plans.load(trip_id).await?;
		Ok(match (record.macro_plan, record.macro_plan_created_at) {
			(Some(days), Some(created_at)) => Some((days, created_at)),
			_ => None,
		})
	}

	pub async fn get_poi_plan(
		&self,
		trip_id: i32,
	) -> Result<Option<(PoiPlan, DateTime<Utc>)>, AppError> {
		let record = self.plans.load(trip_id).await?;
		Ok(match (record.poi_plan, record.poi_plan_created_at) {
			(Some(plan), Some(created_at)) => Some((plan, created_at)),
			_ => None,
		})
	}

	pub async fn get_itinerary(&self, trip_id: i32) -> Result<Option<Itinerary>, AppError> {
		Ok(self.plans.load(trip_id).await?.itinerary)
	}

	/// Empty when the pipeline has not produced a critique yet.
	pub async fn get_critique(&self, trip_id: i32) -> Result<Vec<CritiqueIssue>, AppError> {
		Ok(self.plans.load(trip_id).await?.critique.unwrap_or_default())
	}
}
