/*
 * src/models/skeleton.rs
 *
 * File for Macro-plan skeleton models
 *
 * Purpose:
 *   The day-by-day skeleton produced by the macro planner before any POI
 *   is bound. These types double as the LLM response schema, so the enums
 *   reject unknown variants instead of coercing them.
 *
 * Include:
 *   BlockType     - meal | activity | nightlife | rest | travel
 *   SkeletonBlock - One typed time block within a day
 *   DaySkeleton   - One planned day with its ordered blocks
 */

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Meal,
    Activity,
    Nightlife,
    Rest,
    Travel,
}

impl BlockType {
    /// Whether blocks of this type get POI candidates bound to them.
    /// Rest and travel blocks never carry a POI.
    pub fn needs_poi(&self) -> bool {
        matches!(self, BlockType::Meal | BlockType::Activity | BlockType::Nightlife)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkeletonBlock {
    pub block_type: BlockType,
    /// Wall-clock HH:MM:SS
    pub start_time: NaiveTime,
    /// Wall-clock HH:MM:SS; may be earlier than start_time only when the
    /// block is nightlife wrapping past midnight
    pub end_time: NaiveTime,
    pub theme: String,
    /// Ordered POI category tags; the first is the primary category.
    /// Non-empty for meal/activity/nightlife, may be empty for rest/travel.
    #[serde(default)]
    pub desired_categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySkeleton {
    /// 1-based, contiguous, matches the offset from the trip start date
    pub day_number: i32,
    pub date: NaiveDate,
    pub theme: String,
    pub blocks: Vec<SkeletonBlock>,
}
