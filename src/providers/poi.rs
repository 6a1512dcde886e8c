/*
 * src/providers/poi.rs
 *
 * File for the two-tier POI candidate provider
 *
 * Purpose:
 *   Supply ranked POI candidates for a (city, categories, budget) query.
 *   The local tier searches the indexed `pois` table; the external tier
 *   adapts Google Places nearby search into the same schema. The composite
 *   runs local first and only pulls from Places when local comes up short.
 *
 * Include:
 *   PoiProvider             - search(city, categories, budget, limit, center)
 *   DbPoiProvider           - local tier over the pois table
 *   GooglePlacesPoiProvider - external tier (geocode + nearby search)
 *   CompositePoiProvider    - local-first merge of both tiers
 */

use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use google_maps::places_new::{Field, FieldMask, PlaceType};
use num_traits::ToPrimitive;
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde::de::IntoDeserializer;
use serde_json::Value;
use sqlx::PgPool;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::global::{GOOGLE_MAPS_API_KEY, POI_PROVIDER_TIMEOUT_SECS};
use crate::models::poi::PoiCandidate;
use crate::models::trip::BudgetLevel;
use crate::sql_models::poi::PoiRow;

/// Rating assumed for POIs that carry none.
const UNRATED_BASELINE: f64 = 3.5;
/// Upstream places without a rating score as a middling venue.
const EXTERNAL_UNRATED_BASELINE: f64 = 3.0;
const NEARBY_SEARCH_RADIUS_M: f64 = 50_000.0;

#[async_trait]
pub trait PoiProvider: Send + Sync {
	async fn search(
		&self,
		city: &str,
		desired_categories: &[String],
		budget: Option<BudgetLevel>,
		limit: usize,
		center: Option<(f64, f64)>,
	) -> Result<Vec<PoiCandidate>, AppError>;
}

// ---------------------------
// Ranking
// ---------------------------

/// 1.0 when the POI's primary category is the first requested category,
/// 0.6 for a primary match further down the request, 0.3 for a tag-only
/// match, 0.0 for no match at all.
fn category_match_weight(category: &str, tags: &[String], desired: &[String]) -> f64 {
	let category = category.to_lowercase();
	let desired: Vec<String> = desired.iter().map(|c| c.to_lowercase()).collect();

	if desired.first().is_some_and(|first| *first == category) {
		return 1.0;
	}
	if desired.contains(&category) {
		return 0.6;
	}
	if tags.iter().any(|t| desired.contains(&t.to_lowercase())) {
		return 0.3;
	}
	0.0
}

/// Absolute tier distance; 0 when either side is unknown.
fn budget_mismatch(price_tier: Option<i16>, budget: Option<BudgetLevel>) -> f64 {
	match (price_tier, budget) {
		(Some(tier), Some(budget)) => (tier - budget.tier()).abs() as f64,
		_ => 0.0,
	}
}

fn rank_score(rating: Option<f64>, match_weight: f64, mismatch: f64) -> f64 {
	(2.0 * rating.unwrap_or(UNRATED_BASELINE) + 3.0 * match_weight - 0.5 * mismatch).max(0.0)
}

fn sort_by_rank(candidates: &mut [PoiCandidate]) {
	candidates.sort_by(|a, b| {
		b.rank_score
			.partial_cmp(&a.rank_score)
			.unwrap_or(std::cmp::Ordering::Equal)
	});
}

// ---------------------------
// Local tier
// ---------------------------

pub struct DbPoiProvider {
	pool: PgPool,
}

impl DbPoiProvider {
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}
}

#[async_trait]
impl PoiProvider for DbPoiProvider {
	async fn search(
		&self,
		city: &str,
		desired_categories: &[String],
		budget: Option<BudgetLevel>,
		limit: usize,
		_center: Option<(f64, f64)>,
	) -> Result<Vec<PoiCandidate>, AppError> {
		let rows: Vec<PoiRow> = sqlx::query_as(
			r#"SELECT id, city, name, category, tags, rating, price_tier, location, lat, lon
			FROM pois WHERE LOWER(city) = LOWER($1)"#,
		)
		.bind(city)
		.fetch_all(&self.pool)
		.await?;

		let mut candidates: Vec<PoiCandidate> = rows
			.into_iter()
			.filter_map(|row| {
				let weight = category_match_weight(&row.category, &row.tags, desired_categories);
				if weight <= 0.0 {
					return None;
				}
				let score = rank_score(
					row.rating,
					weight,
					budget_mismatch(row.price_tier, budget),
				);
				Some(row.into_candidate(score))
			})
			.collect();

		sort_by_rank(&mut candidates);
		candidates.truncate(limit);

		debug!(
			target: "poi_provider",
			tier = "local",
			city = city,
			returned = candidates.len(),
			"local POI search finished"
		);
		Ok(candidates)
	}
}

// ---------------------------
// External tier
// ---------------------------

pub struct GooglePlacesPoiProvider {
	api_key: String,
}

impl GooglePlacesPoiProvider {
	pub fn new(api_key: String) -> Self {
		Self { api_key }
	}

	/// None when `GOOGLE_MAPS_API_KEY` is not configured.
	pub fn from_env() -> Option<Self> {
		std::env::var(GOOGLE_MAPS_API_KEY).ok().map(Self::new)
	}

	async fn geocode_city(&self, city: &str) -> Result<(f64, f64), AppError> {
		let gm_client = google_maps::Client::try_new(self.api_key.clone())
			.map_err(|e| AppError::Provider(format!("could not create Google Maps client - {e}")))?;

		let geocode_res = gm_client
			.geocoding()
			.with_address(city)
			.execute()
			.await
			.map_err(|e| AppError::Provider(format!("geocoding failed - {e}")))?;
		if let Some(err) = geocode_res.error_message {
			return Err(AppError::Provider(format!(
				"geocoding failed with status {} - {err}",
				geocode_res.status
			)));
		}
		if !matches!(geocode_res.status, google_maps::geocoding::Status::Ok) {
			return Err(AppError::Provider(format!(
				"geocoding failed with status {}",
				geocode_res.status
			)));
		}
		if geocode_res.results.is_empty() {
			return Err(AppError::Provider(format!(
				"geocoding returned no coordinates for {city}"
			)));
		}

		let lat = geocode_res.results[0]
			.geometry
			.location
			.lat
			.to_f64()
			.ok_or_else(|| AppError::Provider(String::from("geocoded latitude not representable")))?;
		let lng = geocode_res.results[0]
			.geometry
			.location
			.lng
			.to_f64()
			.ok_or_else(|| AppError::Provider(String::from("geocoded longitude not representable")))?;
		Ok((lat, lng))
	}
}

fn value_to_f64(value: &Value) -> Option<f64> {
	// decimal fields serialize as strings
	value
		.as_f64()
		.or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

/// Translates one serialized Place into our candidate schema. Returns None
/// for places without an id.
fn place_to_candidate(place: &Value, desired_categories: &[String]) -> Option<PoiCandidate> {
	let poi_id = place["id"].as_str()?.to_string();
	let name = place["displayName"]["text"]
		.as_str()
		.map(str::to_string)
		.unwrap_or_else(|| poi_id.clone());
	let tags: Vec<String> = place["types"]
		.as_array()
		.map(|types| {
			types
				.iter()
				.filter_map(|t| t.as_str().map(String::from))
				.collect()
		})
		.unwrap_or_default();
	let category = place["primaryType"]
		.as_str()
		.map(String::from)
		.or_else(|| tags.first().cloned())
		.or_else(|| desired_categories.first().cloned())
		.unwrap_or_else(|| String::from("attraction"));
	let rating = value_to_f64(&place["rating"]);

	Some(PoiCandidate {
		rank_score: 2.0 * rating.unwrap_or(EXTERNAL_UNRATED_BASELINE),
		name,
		category,
		tags,
		rating,
		price_tier: None,
		location: place["adrFormatAddress"].as_str().unwrap_or_default().to_string(),
		lat: value_to_f64(&place["location"]["latitude"]),
		lon: value_to_f64(&place["location"]["longitude"]),
		poi_id,
	})
}

#[async_trait]
impl PoiProvider for GooglePlacesPoiProvider {
	async fn search(
		&self,
		city: &str,
		desired_categories: &[String],
		_budget: Option<BudgetLevel>,
		limit: usize,
		center: Option<(f64, f64)>,
	) -> Result<Vec<PoiCandidate>, AppError> {
		let (lat, lng) = match center {
			Some(center) => center,
			None => self.geocode_city(city).await?,
		};

		// Only categories that exist as Google place types restrict the
		// search; the rest rank later via desired_categories matching
		let included_types: Vec<PlaceType> = desired_categories
			.iter()
			.filter_map(|c| {
				PlaceType::deserialize(c.to_lowercase().as_str().into_deserializer())
					.map_err(|_: serde::de::value::Error| ())
					.ok()
			})
			.collect();

		let gm_client = google_maps::Client::try_new(self.api_key.clone())
			.map_err(|e| AppError::Provider(format!("could not create Google Maps client - {e}")))?;

		let search_res = gm_client
			.nearby_search((lat, lng, NEARBY_SEARCH_RADIUS_M))
			.map_err(|e| AppError::Provider(format!("could not build nearby search - {e}")))?
			.field_mask(FieldMask::Specific(vec![
				Field::PlacesId,
				Field::PlacesDisplayName,
				Field::PlacesTypes,
				Field::PlacesPrimaryType,
				Field::PlacesRating,
				Field::PlacesAdrFormatAddress,
				Field::PlacesLocation,
			]))
			.included_types(included_types)
			.execute()
			.await
			.map_err(|e| AppError::Provider(format!("nearby search failed - {e}")))?;

		if let Some(err) = search_res.error() {
			return Err(AppError::Provider(format!("nearby search failed - {err}")));
		}

		let mut candidates: Vec<PoiCandidate> = search_res
			.places()
			.into_iter()
			.filter_map(|place| {
				let value = serde_json::to_value(&place).ok()?;
				place_to_candidate(&value, desired_categories)
			})
			.collect();

		sort_by_rank(&mut candidates);
		candidates.truncate(limit);

		debug!(
			target: "poi_provider",
			tier = "external",
			city = city,
			returned = candidates.len(),
			"nearby search finished"
		);
		Ok(candidates)
	}
}

// ---------------------------
// Composite
// ---------------------------

pub struct CompositePoiProvider {
	local: Arc<dyn PoiProvider>,
	external: Option<Arc<dyn PoiProvider>>,
}

impl CompositePoiProvider {
	pub fn new(local: Arc<dyn PoiProvider>, external: Option<Arc<dyn PoiProvider>>) -> Self {
		Self { local, external }
	}
}

#[async_trait]
impl PoiProvider for CompositePoiProvider {
	async fn search(
		&self,
		city: &str,
		desired_categories: &[String],
		budget: Option<BudgetLevel>,
		limit: usize,
		center: Option<(f64, f64)>,
	) -> Result<Vec<PoiCandidate>, AppError> {
		let per_tier = Duration::from_secs(POI_PROVIDER_TIMEOUT_SECS);

		let mut merged = match timeout(
			per_tier,
			self.local.search(city, desired_categories, budget, limit, center),
		)
		.await
		{
			Ok(Ok(results)) => results,
			// Local failures surface; the external tier is a supplement,
			// not a replacement
			Ok(Err(e)) => return Err(e),
			Err(_) => {
				warn!(target: "poi_provider", city = city, "local tier timed out");
				Vec::new()
			}
		};

		if merged.len() >= limit.div_ceil(2) {
			merged.truncate(limit);
			return Ok(merged);
		}

		let Some(external) = &self.external else {
			merged.truncate(limit);
			return Ok(merged);
		};

		match timeout(
			per_tier,
			external.search(city, desired_categories, budget, limit, center),
		)
		.await
		{
			Ok(Ok(external_results)) => {
				// Merge by id, local wins on duplicates
				let known: HashSet<String> =
					merged.iter().map(|c| c.poi_id.clone()).collect();
				merged.extend(
					external_results
						.into_iter()
						.filter(|c| !known.contains(&c.poi_id)),
				);
				sort_by_rank(&mut merged);
				merged.truncate(limit);
			}
			Ok(Err(e)) => {
				warn!(target: "poi_provider", city = city, error = %e, "external tier failed");
			}
			Err(_) => {
				warn!(target: "poi_provider", city = city, "external tier timed out");
			}
		}

		Ok(merged)
	}
}

pub type PoiProviderFactory = fn(&PgPool) -> Arc<dyn PoiProvider>;

fn default_poi_provider(pool: &PgPool) -> Arc<dyn PoiProvider> {
	let local: Arc<dyn PoiProvider> = Arc::new(DbPoiProvider::new(pool.clone()));
	let external = GooglePlacesPoiProvider::from_env()
		.map(|p| Arc::new(p) as Arc<dyn PoiProvider>);
	Arc::new(CompositePoiProvider::new(local, external))
}

static POI_PROVIDER_FACTORY: Lazy<RwLock<PoiProviderFactory>> =
	Lazy::new(|| RwLock::new(default_poi_provider));

pub fn poi_provider(pool: &PgPool) -> Arc<dyn PoiProvider> {
	(*POI_PROVIDER_FACTORY.read().unwrap())(pool)
}

pub fn set_poi_provider_factory(factory: PoiProviderFactory) {
	*POI_PROVIDER_FACTORY.write().unwrap() = factory;
}

pub fn reset_poi_provider_factory() {
	set_poi_provider_factory(default_poi_provider);
}
