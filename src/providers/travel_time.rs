/*
 * src/providers/travel_time.rs
 *
 * File for travel-time estimation
 *
 * Purpose:
 *   Estimate duration/distance/polyline between two points. The Google
 *   Routes implementation degrades silently to the Haversine heuristic on
 *   any upstream problem, so estimation never fails.
 *
 * Include:
 *   TravelTimeProvider           - estimate(origin, destination, mode)
 *   GoogleRoutesProvider         - Routes API client with heuristic fallback
 *   HeuristicTravelTimeProvider  - Haversine * 1.3 / mode speed
 */

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::global::{GOOGLE_MAPS_API_KEY, TRAVEL_TIME_TIMEOUT_SECS};

const ROUTES_API_URL: &str = "https://routes.googleapis.com/directions/v2:computeRoutes";
const ROUTES_FIELD_MASK: &str =
	"routes.duration,routes.distanceMeters,routes.polyline.encodedPolyline";

/// Road networks are not straight lines; great-circle distances get
/// stretched by this factor before speeds are applied.
const ROAD_NETWORK_FACTOR: f64 = 1.3;
const MIN_TRAVEL_MINUTES: i64 = 5;
/// Used when either endpoint has no coordinates.
const DEFAULT_TRAVEL_MINUTES: i64 = 15;
const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TravelMode {
	Drive,
	Walk,
	Transit,
}

impl TravelMode {
	pub fn as_str(&self) -> &'static str {
		match self {
			TravelMode::Drive => "DRIVE",
			TravelMode::Walk => "WALK",
			TravelMode::Transit => "TRANSIT",
		}
	}

	/// Urban average speed for the heuristic.
	fn speed_kmh(&self) -> f64 {
		match self {
			TravelMode::Drive => 30.0,
			TravelMode::Walk => 5.0,
			TravelMode::Transit => 20.0,
		}
	}
}

/// A named point that may or may not have coordinates. Hotel locations are
/// often free text only; the heuristic handles the no-coordinate case.
#[derive(Debug, Clone, Default)]
pub struct TravelLocation {
	pub name: Option<String>,
	pub lat: Option<f64>,
	pub lon: Option<f64>,
}

impl TravelLocation {
	pub fn coords(&self) -> Option<(f64, f64)> {
		match (self.lat, self.lon) {
			(Some(lat), Some(lon)) => Some((lat, lon)),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct TravelEstimate {
	/// Whole minutes, always >= 1
	pub duration_minutes: i64,
	pub distance_meters: Option<i64>,
	pub polyline: Option<String>,
}

#[async_trait]
pub trait TravelTimeProvider: Send + Sync {
	/// Never fails; implementations degrade to a heuristic or a constant.
	async fn estimate(
		&self,
		origin: &TravelLocation,
		destination: &TravelLocation,
		mode: TravelMode,
	) -> TravelEstimate;
}

// ---------------------------
// Heuristic
// ---------------------------

fn haversine_km(a: (f64, f64), b: (f64, f64)) -> f64 {
	let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
	let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());
	let dlat = lat2 - lat1;
	let dlon = lon2 - lon1;
	let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
	2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTravelTimeProvider;

impl HeuristicTravelTimeProvider {
	fn estimate_sync(
		&self,
		origin: &TravelLocation,
		destination: &TravelLocation,
		mode: TravelMode,
	) -> TravelEstimate {
		let (from, to) = match (origin.coords(), destination.coords()) {
			(Some(from), Some(to)) => (from, to),
			_ => {
				return TravelEstimate {
					duration_minutes: DEFAULT_TRAVEL_MINUTES,
					distance_meters: None,
					polyline: None,
				};
			}
		};

		let road_km = haversine_km(from, to) * ROAD_NETWORK_FACTOR;
		let raw_minutes = |speed_kmh: f64| (road_km / speed_kmh * 60.0).ceil() as i64;

		let mut minutes = raw_minutes(mode.speed_kmh()).max(MIN_TRAVEL_MINUTES);
		if mode == TravelMode::Walk {
			// Walking stays strictly slower than driving; on very short
			// hops the shared floor would otherwise tie them
			let drive_minutes = raw_minutes(TravelMode::Drive.speed_kmh()).max(MIN_TRAVEL_MINUTES);
			minutes = minutes.max(drive_minutes + 1);
		}

		TravelEstimate {
			duration_minutes: minutes,
			distance_meters: Some((road_km * 1000.0).round() as i64),
			polyline: None,
		}
	}
}

#[async_trait]
impl TravelTimeProvider for HeuristicTravelTimeProvider {
	async fn estimate(
		&self,
		origin: &TravelLocation,
		destination: &TravelLocation,
		mode: TravelMode,
	) -> TravelEstimate {
		self.estimate_sync(origin, destination, mode)
	}
}

// ---------------------------
// Google Routes API
// ---------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ComputeRoutesRequest {
	origin: Waypoint,
	destination: Waypoint,
	travel_mode: &'static str,
}

#[derive(Serialize)]
struct Waypoint {
	location: WaypointLocation,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WaypointLocation {
	lat_lng: LatLngBody,
}

#[derive(Serialize)]
struct LatLngBody {
	latitude: f64,
	longitude: f64,
}

#[derive(Deserialize)]
struct ComputeRoutesResponse {
	#[serde(default)]
	routes: Vec<RouteBody>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteBody {
	duration: Option<String>,
	distance_meters: Option<i64>,
	polyline: Option<PolylineBody>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PolylineBody {
	encoded_polyline: Option<String>,
}

/// Parses the Routes API duration shape `"<integer>s"` into ceiling
/// minutes, never below 1.
fn parse_duration_minutes(duration: &str) -> Option<i64> {
	let seconds: i64 = duration.strip_suffix('s')?.parse().ok()?;
	Some((seconds + 59).div_euclid(60).max(1))
}

pub struct GoogleRoutesProvider {
	api_key: String,
	client: reqwest::Client,
	fallback: HeuristicTravelTimeProvider,
}

impl GoogleRoutesProvider {
	pub fn new(api_key: String) -> Self {
		Self {
			api_key,
			client: reqwest::Client::new(),
			fallback: HeuristicTravelTimeProvider,
		}
	}

	/// None when `GOOGLE_MAPS_API_KEY` is not configured.
	pub fn from_env() -> Option<Self> {
		std::env::var(GOOGLE_MAPS_API_KEY).ok().map(Self::new)
	}

	async fn request_route(
		&self,
		from: (f64, f64),
		to: (f64, f64),
		mode: TravelMode,
	) -> Result<TravelEstimate, String> {
		let body = ComputeRoutesRequest {
			origin: Waypoint {
				location: WaypointLocation {
					lat_lng: LatLngBody { latitude: from.0, longitude: from.1 },
				},
			},
			destination: Waypoint {
				location: WaypointLocation {
					lat_lng: LatLngBody { latitude: to.0, longitude: to.1 },
				},
			},
			travel_mode: mode.as_str(),
		};

		let response = self
			.client
			.post(ROUTES_API_URL)
			.header("X-Goog-Api-Key", &self.api_key)
			.header("X-Goog-FieldMask", ROUTES_FIELD_MASK)
			.json(&body)
			.send()
			.await
			.map_err(|e| format!("request failed - {e}"))?
			.error_for_status()
			.map_err(|e| format!("routes API returned an error status - {e}"))?;

		let parsed: ComputeRoutesResponse = response
			.json()
			.await
			.map_err(|e| format!("could not decode routes response - {e}"))?;

		let route = parsed
			.routes
			.into_iter()
			.next()
			.ok_or_else(|| String::from("routes response was empty"))?;
		let duration_minutes = route
			.duration
			.as_deref()
			.and_then(parse_duration_minutes)
			.ok_or_else(|| String::from("route carried no parseable duration"))?;

		Ok(TravelEstimate {
			duration_minutes,
			distance_meters: route.distance_meters,
			polyline: route.polyline.and_then(|p| p.encoded_polyline),
		})
	}
}

#[async_trait]
impl TravelTimeProvider for GoogleRoutesProvider {
	async fn estimate(
		&self,
		origin: &TravelLocation,
		destination: &TravelLocation,
		mode: TravelMode,
	) -> TravelEstimate {
		let (from, to) = match (origin.coords(), destination.coords()) {
			(Some(from), Some(to)) => (from, to),
			// No coordinates to send upstream; the heuristic owns this case
			_ => return self.fallback.estimate(origin, destination, mode).await,
		};

		let attempt = timeout(
			Duration::from_secs(TRAVEL_TIME_TIMEOUT_SECS),
			self.request_route(from, to, mode),
		)
		.await;

		match attempt {
			Ok(Ok(estimate)) => {
				debug!(
					target: "travel_time",
					minutes = estimate.duration_minutes,
					"routes API answered"
				);
				estimate
			}
			Ok(Err(e)) => {
				warn!(target: "travel_time", error = %e, "routes API failed, using heuristic");
				self.fallback.estimate(origin, destination, mode).await
			}
			Err(_) => {
				warn!(target: "travel_time", "routes API timed out, using heuristic");
				self.fallback.estimate(origin, destination, mode).await
			}
		}
	}
}

pub type TravelProviderFactory = fn() -> Arc<dyn TravelTimeProvider>;

fn default_travel_time_provider() -> Arc<dyn TravelTimeProvider> {
	match GoogleRoutesProvider::from_env() {
		Some(provider) => Arc::new(provider),
		None => Arc::new(HeuristicTravelTimeProvider),
	}
}

static TRAVEL_PROVIDER_FACTORY: Lazy<RwLock<TravelProviderFactory>> =
	Lazy::new(|| RwLock::new(default_travel_time_provider));

pub fn travel_time_provider() -> Arc<dyn TravelTimeProvider> {
	(*TRAVEL_PROVIDER_FACTORY.read().unwrap())()
}

pub fn set_travel_time_provider_factory(factory: TravelProviderFactory) {
	*TRAVEL_PROVIDER_FACTORY.write().unwrap() = factory;
}

pub fn reset_travel_time_provider_factory() {
	set_travel_time_provider_factory(default_travel_time_provider);
}
