/*
 * src/models/poi.rs
 *
 * File for POI candidate models
 *
 * Purpose:
 *   Ranked POI candidates as returned by the two-tier provider and
 *   collected per block by the POI planner.
 *
 * Include:
 *   PoiCandidate       - One ranked venue/attraction; identity is poi_id
 *   PoiBlockCandidates - Candidate list for one skeleton block
 *   PoiPlan            - All candidate lists for a trip
 */

use serde::{Deserialize, Serialize};

use crate::models::skeleton::BlockType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoiCandidate {
    /// Stable id; local rows and external place ids share this string space
    pub poi_id: String,
    pub name: String,
    /// Primary category, e.g. "restaurant"
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Upstream rating in [0, 5] when known
    pub rating: Option<f64>,
    /// Price tier 1..=4 when known
    pub price_tier: Option<i16>,
    /// Free-text address or area description
    pub location: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Monotonic ranking scalar, >= 0, higher is better
    pub rank_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoiBlockCandidates {
    pub day_number: i32,
    /// Position within the day's skeleton, 0-based, counting rest/travel
    /// blocks too so the index aligns with the skeleton
    pub block_index: i32,
    pub block_type: BlockType,
    pub desired_categories: Vec<String>,
    /// Sorted by rank_score descending; at most the provider limit, may be
    /// empty when nothing matched
    pub candidates: Vec<PoiCandidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoiPlan {
    pub trip_id: i32,
    pub blocks: Vec<PoiBlockCandidates>,
}
