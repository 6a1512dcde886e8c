use sqlx::FromRow;

use crate::models::poi::PoiCandidate;

/// Row model for the `pois` table (the indexed local POI store).
#[derive(Debug, FromRow)]
pub struct PoiRow {
	/// Stable text id; shares an id space with external place ids
	pub id: String,
	pub city: String,
	pub name: String,
	/// Primary category tag
	pub category: String,
	/// Secondary tags
	pub tags: Vec<String>,
	/// Rating in [0, 5] when known
	pub rating: Option<f64>,
	/// Price tier 1..=4 when known
	pub price_tier: Option<i16>,
	/// Free-text address
	pub location: Option<String>,
	pub lat: Option<f64>,
	pub lon: Option<f64>,
}

impl PoiRow {
	/// Converts into a candidate; the rank score is assigned by the
	/// provider's ranking pass, not stored on the row.
	pub fn into_candidate(self, rank_score: f64) -> PoiCandidate {
		PoiCandidate {
			poi_id: self.id,
			name: self.name,
			category: self.category,
			tags: self.tags,
			rating: self.rating,
			price_tier: self.price_tier,
			location: self.location.unwrap_or_default(),
			lat: self.lat,
			lon: self.lon,
			rank_score,
		}
	}
}
