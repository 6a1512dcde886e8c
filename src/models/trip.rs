/*
 * src/models/trip.rs
 *
 * File for Trip specification models
 *
 * Purpose:
 *   The typed trip spec consumed by the planning pipeline, plus the
 *   pace/budget enums shared with the LLM payload schema.
 *
 * Include:
 *   TripSpec     - Full trip specification
 *   DailyRoutine - Wake/sleep times and the three meal windows
 *   PaceLevel    - slow | medium | fast
 *   BudgetLevel  - low | medium | high
 */

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// How packed the traveler wants their days. Unknown variants are rejected
/// at deserialization, never coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaceLevel {
    Slow,
    Medium,
    Fast,
}

impl Default for PaceLevel {
    fn default() -> Self {
        PaceLevel::Medium
    }
}

impl PaceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaceLevel::Slow => "slow",
            PaceLevel::Medium => "medium",
            PaceLevel::Fast => "fast",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetLevel {
    Low,
    Medium,
    High,
}

impl Default for BudgetLevel {
    fn default() -> Self {
        BudgetLevel::Medium
    }
}

impl BudgetLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetLevel::Low => "low",
            BudgetLevel::Medium => "medium",
            BudgetLevel::High => "high",
        }
    }

    /// Numeric tier used when comparing against a POI price tier (1..=3).
    pub fn tier(&self) -> i16 {
        match self {
            BudgetLevel::Low => 1,
            BudgetLevel::Medium => 2,
            BudgetLevel::High => 3,
        }
    }
}

/// Wall-clock daily routine. Meal windows are (start, end) pairs in local
/// time; they must be ordered breakfast < lunch < dinner and lie between
/// wake and sleep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRoutine {
    pub wake_time: NaiveTime,
    pub sleep_time: NaiveTime,
    pub breakfast_window: (NaiveTime, NaiveTime),
    pub lunch_window: (NaiveTime, NaiveTime),
    pub dinner_window: (NaiveTime, NaiveTime),
}

impl Default for DailyRoutine {
    fn default() -> Self {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        Self {
            wake_time: t(7, 30),
            sleep_time: t(23, 0),
            breakfast_window: (t(8, 0), t(10, 0)),
            lunch_window: (t(12, 0), t(14, 0)),
            dinner_window: (t(19, 0), t(21, 0)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripSpec {
    pub id: i32,
    pub city: String,
    /// First day of the trip (inclusive)
    pub start_date: NaiveDate,
    /// Last day of the trip (inclusive, `end_date >= start_date`)
    pub end_date: NaiveDate,
    pub num_travelers: i32,
    pub pace: PaceLevel,
    pub budget: BudgetLevel,
    /// Ordered interest tags, e.g. ["museums", "gastronomy"]
    pub interests: Vec<String>,
    /// Free-text hotel location, e.g. "Hotel Lutetia, 45 Bd Raspail"
    pub hotel_location: Option<String>,
    pub hotel_lat: Option<f64>,
    pub hotel_lon: Option<f64>,
    /// Free-form preferences forwarded verbatim to the macro planner
    pub additional_preferences: Option<serde_json::Value>,
    pub daily_routine: DailyRoutine,
}

impl TripSpec {
    /// Number of days covered by the trip, both endpoints inclusive.
    pub fn num_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

/// A validated trip spec that has not been assigned an id yet; the trip
/// store turns this into a TripSpec on insert.
#[derive(Debug, Clone)]
pub struct TripDraft {
    pub city: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub num_travelers: i32,
    pub pace: PaceLevel,
    pub budget: BudgetLevel,
    pub interests: Vec<String>,
    pub hotel_location: Option<String>,
    pub hotel_lat: Option<f64>,
    pub hotel_lon: Option<f64>,
    pub additional_preferences: Option<serde_json::Value>,
    pub daily_routine: DailyRoutine,
}

impl TripDraft {
    pub fn into_spec(self, id: i32) -> TripSpec {
        TripSpec {
            id,
            city: self.city,
            start_date: self.start_date,
            end_date: self.end_date,
            num_travelers: self.num_travelers,
            pace: self.pace,
            budget: self.budget,
            interests: self.interests,
            hotel_location: self.hotel_location,
            hotel_lat: self.hotel_lat,
            hotel_lon: self.hotel_lon,
            additional_preferences: self.additional_preferences,
            daily_routine: self.daily_routine,
        }
    }
}
