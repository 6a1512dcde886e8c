use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use axum::Extension;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use tripforge::global::OPENAI_API_KEY;
use tripforge::planner::orchestrator::TripPlanner;
use tripforge::store::{PgPlanStore, PgTripStore, PlanStore, TripStore};
use tripforge::{controllers, db, log};

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
	// Load our environment variables
	dotenvy::dotenv().ok();
	log::init_panic_handler();
	log::init_logger();

	let bind_address =
		env::var("BIND_ADDRESS").unwrap_or_else(|_| String::from("0.0.0.0:3001"));

	// The LLM client only reads this on the first planning request; check
	// it up front so a misconfigured deployment dies at startup
	env::var(OPENAI_API_KEY).expect("OPENAI_API_KEY must be set");

	// Initialize the database pool connection
	let pool = db::create_pool().await;

	// Stores and the pipeline orchestrator; providers come from the
	// default factories (env-keyed Google clients when configured)
	let trips: Arc<dyn TripStore> = Arc::new(PgTripStore::new(pool.clone()));
	let plans: Arc<dyn PlanStore> = Arc::new(PgPlanStore::new(pool.clone()));
	let planner = Arc::new(TripPlanner::new(Arc::clone(&trips), Arc::clone(&plans), &pool));

	// There is no browser frontend attached to this service, so CORS stays
	// open
	let cors = CorsLayer::new()
		.allow_origin(Any)
		.allow_methods([Method::GET, Method::POST])
		.allow_headers(Any);

	let api_routes = axum::Router::new().nest(
		"/api/trip",
		controllers::trip::trip_routes().merge(controllers::plan::plan_routes()),
	);

	let app = api_routes
		.layer(Extension(pool.clone()))
		.layer(Extension(trips))
		.layer(Extension(planner))
		.layer(TraceLayer::new_for_http())
		.layer(cors);

	let addr = SocketAddr::from_str(&bind_address).expect("Invalid BIND_ADDRESS format");
	println!("Server starting on {}", addr);

	let listener = tokio::net::TcpListener::bind(addr).await?;
	axum::serve(listener, app.into_make_service()).await?;

	Ok(())
}
