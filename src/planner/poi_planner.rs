/*
 * src/planner/poi_planner.rs
 *
 * File for the POI planning stage
 *
 * Purpose:
 *   For every meal/activity/nightlife block in the skeleton, ask the
 *   composite provider for ranked candidates. Queries fan out concurrently
 *   but results are collected in skeleton order so the greedy
 *   top-candidate deduplication stays deterministic.
 */

use std::collections::HashSet;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::AppError;
use crate::global::{POI_CANDIDATE_LIMIT, STAGE_FANOUT_LIMIT};
use crate::models::poi::{PoiBlockCandidates, PoiCandidate, PoiPlan};
use crate::models::skeleton::{DaySkeleton, SkeletonBlock};
use crate::models::trip::TripSpec;
use crate::models::trip::BudgetLevel;
use crate::providers::poi::PoiProvider;

async fn search_block(
	provider: Arc<dyn PoiProvider>,
	city: String,
	categories: Vec<String>,
	budget: BudgetLevel,
	center: Option<(f64, f64)>,
	day_number: i32,
	block_index: i32,
) -> Result<Vec<PoiCandidate>, AppError> {
	let result = provider
		.search(&city, &categories, Some(budget), POI_CANDIDATE_LIMIT, center)
		.await;
	debug!(
		target: "poi_planner",
		day = day_number,
		block = block_index,
		found = result.as_ref().map(Vec::len).unwrap_or(0),
		"provider query finished"
	);
	result
}

pub struct PoiPlanner {
	provider: Arc<dyn PoiProvider>,
}

impl PoiPlanner {
	pub fn new(provider: Arc<dyn PoiProvider>) -> Self {
		Self { provider }
	}

	/// Produces one candidate list per POI-requiring block. Rest and travel
	/// blocks are omitted entirely; their indices still count so
	/// block_index aligns with the skeleton.
	pub async fn generate(
		&self,
		spec: &TripSpec,
		skeleton: &[DaySkeleton],
		cancel: &CancellationToken,
	) -> Result<PoiPlan, AppError> {
		if cancel.is_cancelled() {
			return Err(AppError::Cancelled);
		}

		let mut targets: Vec<(i32, i32, &SkeletonBlock)> = Vec::new();
		for day in skeleton {
			for (index, block) in day.blocks.iter().enumerate() {
				if block.block_type.needs_poi() {
					targets.push((day.day_number, index as i32, block));
				}
			}
		}

		let center = match (spec.hotel_lat, spec.hotel_lon) {
			(Some(lat), Some(lon)) => Some((lat, lon)),
			_ => None,
		};

		let pending: Vec<_> = targets
			.iter()
			.map(|&(day_number, block_index, block)| {
				Box::pin(search_block(
					Arc::clone(&self.provider),
					spec.city.clone(),
					block.desired_categories.clone(),
					spec.budget,
					center,
					day_number,
					block_index,
				)) as std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<PoiCandidate>, AppError>> + Send>>
			})
			.collect();

		let searches = stream::iter(pending).buffered(STAGE_FANOUT_LIMIT).collect::<Vec<_>>();

		let results = tokio::select! {
			results = searches => results,
			_ = cancel.cancelled() => return Err(AppError::Cancelled),
		};

		// Greedy dedup: a POI that became some block's top candidate sinks
		// to the bottom of every later list, so it only resurfaces when
		// alternatives run out
		let mut assigned_tops: HashSet<String> = HashSet::new();
		let mut blocks = Vec::with_capacity(targets.len());
		for ((day_number, block_index, block), result) in targets.into_iter().zip(results) {
			let candidates = result?;
			let (fresh, demoted): (Vec<PoiCandidate>, Vec<PoiCandidate>) = candidates
				.into_iter()
				.partition(|c| !assigned_tops.contains(&c.poi_id));

			let mut candidates = fresh;
			candidates.extend(demoted);
			if let Some(top) = candidates.first() {
				assigned_tops.insert(top.poi_id.clone());
			}

			blocks.push(PoiBlockCandidates {
				day_number,
				block_index,
				block_type: block.block_type,
				desired_categories: block.desired_categories.clone(),
				candidates,
			});
		}

		info!(
			target: "poi_planner",
			trip_id = spec.id,
			blocks = blocks.len(),
			"POI plan generated"
		);
		Ok(PoiPlan { trip_id: spec.id, blocks })
	}
}
