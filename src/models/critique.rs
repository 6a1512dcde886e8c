/*
 * src/models/critique.rs
 *
 * File for Trip critic models
 *
 * Purpose:
 *   Typed, severity-tagged findings about a finished itinerary. The code
 *   set is closed; the critic emits nothing outside of it.
 *
 * Include:
 *   CritiqueCode  - Closed set of issue codes
 *   IssueSeverity - info | warning | error
 *   CritiqueIssue - One finding with its structured details
 */

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CritiqueCode {
    DayTooBusy,
    MissingBreakfast,
    MissingLunch,
    MissingDinner,
    InvalidTimeRange,
    BlockOverlap,
    LongTravel,
    LateNightlife,
    ConsecutiveIntenseDays,
}

impl CritiqueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CritiqueCode::DayTooBusy => "DAY_TOO_BUSY",
            CritiqueCode::MissingBreakfast => "MISSING_BREAKFAST",
            CritiqueCode::MissingLunch => "MISSING_LUNCH",
            CritiqueCode::MissingDinner => "MISSING_DINNER",
            CritiqueCode::InvalidTimeRange => "INVALID_TIME_RANGE",
            CritiqueCode::BlockOverlap => "BLOCK_OVERLAP",
            CritiqueCode::LongTravel => "LONG_TRAVEL",
            CritiqueCode::LateNightlife => "LATE_NIGHTLIFE",
            CritiqueCode::ConsecutiveIntenseDays => "CONSECUTIVE_INTENSE_DAYS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CritiqueIssue {
    pub code: CritiqueCode,
    pub severity: IssueSeverity,
    pub message: String,
    /// Structured context for the finding (thresholds, totals, block ids)
    pub details: serde_json::Map<String, serde_json::Value>,
    pub day_number: Option<i32>,
    pub block_index: Option<i32>,
}
