/*
 * src/planner/route_optimizer.rs
 *
 * File for the route & time optimization stage
 *
 * Purpose:
 *   Bind one POI per block (left-to-right, trip-wide dedup), estimate the
 *   travel legs between consecutive locations, and shift block times
 *   forward where travel makes the planned start impossible. Days are
 *   optimized independently; there is no cross-day re-optimization.
 */

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{NaiveTime, TimeDelta, Timelike, Utc};
use futures::StreamExt;
use futures::stream;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::AppError;
use crate::global::{LATE_END_GRACE_MINUTES, STAGE_FANOUT_LIMIT};
use crate::models::itinerary::{Itinerary, ItineraryBlock, ItineraryDay};
use crate::models::poi::{PoiCandidate, PoiPlan};
use crate::models::skeleton::{BlockType, DaySkeleton};
use crate::models::trip::TripSpec;
use crate::providers::travel_time::{
	TravelEstimate, TravelLocation, TravelMode, TravelTimeProvider, travel_time_provider,
};

/// Shifted blocks are never squeezed below this duration.
const MIN_BLOCK_MINUTES: i64 = 30;
const MINUTES_PER_DAY: i64 = 1440;

// ---------------------------
// Minute arithmetic
// ---------------------------

pub(crate) fn time_to_min(t: NaiveTime) -> i64 {
	(t.num_seconds_from_midnight() / 60) as i64
}

fn min_to_time(minutes: i64) -> NaiveTime {
	let seconds = (minutes.rem_euclid(MINUTES_PER_DAY) * 60) as u32;
	NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)
		.unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).unwrap())
}

/// Block interval in minutes since the start of its day. Nightlife blocks
/// may wrap past midnight, in which case the end lands beyond 24h; any
/// other inverted interval is left as-is for the critic to flag.
pub(crate) fn block_span(block_type: BlockType, start: NaiveTime, end: NaiveTime) -> (i64, i64) {
	let start_min = time_to_min(start);
	let mut end_min = time_to_min(end);
	if end_min < start_min && block_type == BlockType::Nightlife {
		end_min += MINUTES_PER_DAY;
	}
	(start_min, end_min)
}

fn poi_location(poi: &PoiCandidate) -> TravelLocation {
	TravelLocation {
		name: Some(poi.name.clone()),
		lat: poi.lat,
		lon: poi.lon,
	}
}

fn hotel_location(spec: &TripSpec) -> Option<TravelLocation> {
	if spec.hotel_location.is_none() && spec.hotel_lat.is_none() {
		return None;
	}
	Some(TravelLocation {
		name: spec.hotel_location.clone(),
		lat: spec.hotel_lat,
		lon: spec.hotel_lon,
	})
}

pub struct RouteTimeOptimizer {
	travel: Arc<dyn TravelTimeProvider>,
}

impl RouteTimeOptimizer {
	/// Uses the currently-installed travel-time provider factory.
	pub fn new() -> Self {
		Self {
			travel: travel_time_provider(),
		}
	}

	pub fn with_provider(travel: Arc<dyn TravelTimeProvider>) -> Self {
		Self { travel }
	}

	pub async fn optimize(
		&self,
		spec: &TripSpec,
		skeleton: &[DaySkeleton],
		poi_plan: &PoiPlan,
		cancel: &CancellationToken,
	) -> Result<Itinerary, AppError> {
		let candidates_by_block: HashMap<(i32, i32), _> = poi_plan
			.blocks
			.iter()
			.map(|b| ((b.day_number, b.block_index), b))
			.collect();
		let hotel = hotel_location(spec);
		let sleep_cap = time_to_min(spec.daily_routine.sleep_time) + LATE_END_GRACE_MINUTES;

		let mut used: HashSet<String> = HashSet::new();
		let mut days = Vec::with_capacity(skeleton.len());

		for day in skeleton {
			if cancel.is_cancelled() {
				return Err(AppError::Cancelled);
			}

			// Selection is strictly left-to-right so the trip-wide dedup
			// stays deterministic
			let mut selections: Vec<Option<PoiCandidate>> = Vec::with_capacity(day.blocks.len());
			for (index, block) in day.blocks.iter().enumerate() {
				if !block.block_type.needs_poi() {
					selections.push(None);
					continue;
				}
				let picked = candidates_by_block
					.get(&(day.day_number, index as i32))
					.and_then(|block_candidates| {
						block_candidates
							.candidates
							.iter()
							.find(|c| !used.contains(&c.poi_id))
							// Everything was used already; reuse the top
							// pick rather than leaving a hole
							.or_else(|| block_candidates.candidates.first())
					})
					.cloned();
				if let Some(poi) = &picked {
					used.insert(poi.poi_id.clone());
				}
				selections.push(picked);
			}

			// Travel legs are fixed once selection is done, so the whole
			// day's estimates can fan out at once
			let mut leg_requests: Vec<(usize, TravelLocation, TravelLocation)> = Vec::new();
			let mut previous_location = hotel.clone();
			for (index, selection) in selections.iter().enumerate() {
				if let Some(poi) = selection {
					let destination = poi_location(poi);
					if index > 0 {
						if let Some(origin) = previous_location.clone() {
							leg_requests.push((index, origin, destination.clone()));
						}
					}
					previous_location = Some(destination);
				}
			}

			let leg_stream = stream::iter(leg_requests.into_iter().map(
				|(index, origin, destination)| {
					let travel = Arc::clone(&self.travel);
					async move {
						let estimate = travel
							.estimate(&origin, &destination, TravelMode::Drive)
							.await;
						(index, estimate)
					}
				},
			))
			.buffered(STAGE_FANOUT_LIMIT)
			.collect::<Vec<(usize, TravelEstimate)>>();

			let legs: HashMap<usize, TravelEstimate> = tokio::select! {
				legs = leg_stream => legs.into_iter().collect(),
				_ = cancel.cancelled() => return Err(AppError::Cancelled),
			};

			// Sequential walk: shift anything that can no longer start on
			// time, preserving durations where the late-night cap allows
			let mut prev_end: Option<i64> = None;
			let mut blocks = Vec::with_capacity(day.blocks.len());
			for (index, block) in day.blocks.iter().enumerate() {
				let selection = selections[index].take();
				let leg = legs.get(&index);
				let travel_minutes = if index == 0 {
					0
				} else {
					leg.map(|e| e.duration_minutes).unwrap_or(0)
				};

				let (orig_start, orig_end) =
					block_span(block.block_type, block.start_time, block.end_time);
				let duration = orig_end - orig_start;
				let mut start_time = block.start_time;
				let mut end_time = block.end_time;
				let mut start_min = orig_start;
				let mut end_min = orig_end;

				if let Some(prev) = prev_end {
					let earliest = prev + travel_minutes;
					if start_min < earliest {
						let delta = earliest - start_min;
						start_min += delta;
						let mut shifted_end = start_min + duration.max(0);
						if shifted_end > sleep_cap {
							shifted_end = sleep_cap.max(start_min + MIN_BLOCK_MINUTES);
							if shifted_end > sleep_cap {
								warn!(
									target: "route_optimizer",
									trip_id = spec.id,
									day = day.day_number,
									block = index,
									"block pushed past the late-night cap; leaving the overrun for the critic"
								);
							}
						}
						end_min = shifted_end;
						start_time = start_time + TimeDelta::minutes(delta);
						end_time = min_to_time(end_min);
					}
				}
				prev_end = Some(end_min.max(start_min));

				let is_rest_or_travel = !block.block_type.needs_poi();
				blocks.push(ItineraryBlock {
					block_type: block.block_type,
					start_time,
					end_time,
					theme: block.theme.clone(),
					desired_categories: block.desired_categories.clone(),
					travel_time_from_prev: if is_rest_or_travel { 0 } else { travel_minutes },
					travel_distance_meters: if is_rest_or_travel {
						None
					} else {
						leg.and_then(|e| e.distance_meters)
					},
					travel_polyline: if is_rest_or_travel {
						None
					} else {
						leg.and_then(|e| e.polyline.clone())
					},
					notes: is_rest_or_travel.then(|| block.theme.clone()),
					poi: selection,
				});
			}

			days.push(ItineraryDay {
				day_number: day.day_number,
				date: day.date,
				theme: day.theme.clone(),
				blocks,
			});
		}

		info!(
			target: "route_optimizer",
			trip_id = spec.id,
			days = days.len(),
			"itinerary optimized"
		);
		Ok(Itinerary {
			trip_id: spec.id,
			days,
			created_at: Utc::now(),
		})
	}
}

impl Default for RouteTimeOptimizer {
	fn default() -> Self {
		Self::new()
	}
}
