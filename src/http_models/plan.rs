/*
 * src/http_models/plan.rs
 *
 * File for pipeline stage response payloads
 *
 * Purpose:
 *   Stage outputs wrapped with the trip id and the stage's created_at so
 *   callers can see when a cached output was produced.
 *
 * Include:
 *   MacroPlanResponse - day skeletons + created_at
 *   PoiPlanResponse   - per-block candidate lists + created_at
 *   CritiqueResponse  - critic issues (possibly empty)
 */

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::critique::CritiqueIssue;
use crate::models::poi::PoiBlockCandidates;
use crate::models::skeleton::DaySkeleton;

#[derive(Debug, Serialize)]
pub struct MacroPlanResponse {
	pub trip_id: i32,
	pub days: Vec<DaySkeleton>,
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PoiPlanResponse {
	pub trip_id: i32,
	pub blocks: Vec<PoiBlockCandidates>,
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CritiqueResponse {
	pub trip_id: i32,
	pub issues: Vec<CritiqueIssue>,
}
