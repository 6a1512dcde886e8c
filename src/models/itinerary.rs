/*
 * src/models/itinerary.rs
 *
 * File for final itinerary models
 *
 * Purpose:
 *   The time-sequenced itinerary emitted by the route optimizer: skeleton
 *   blocks with a bound POI, travel legs, and adjusted times.
 *
 * Include:
 *   ItineraryBlock - One scheduled block with optional POI and travel leg
 *   ItineraryDay   - One day of scheduled blocks
 *   Itinerary      - The whole trip
 */

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::poi::PoiCandidate;
use crate::models::skeleton::BlockType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItineraryBlock {
    pub block_type: BlockType,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub theme: String,
    #[serde(default)]
    pub desired_categories: Vec<String>,
    /// Selected venue; None for rest/travel blocks and for blocks where no
    /// candidate was available
    pub poi: Option<PoiCandidate>,
    /// Whole minutes from the previous located block (or the hotel); 0 for
    /// the first block of a day and for rest/travel blocks
    pub travel_time_from_prev: i64,
    pub travel_distance_meters: Option<i64>,
    /// Opaque encoded polyline from the routing API, when it answered
    pub travel_polyline: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItineraryDay {
    pub day_number: i32,
    pub date: NaiveDate,
    pub theme: String,
    pub blocks: Vec<ItineraryBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Itinerary {
    pub trip_id: i32,
    pub days: Vec<ItineraryDay>,
    pub created_at: DateTime<Utc>,
}
