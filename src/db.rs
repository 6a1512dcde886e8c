use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Connects to the database in `DATABASE_URL` and returns the pool.
/// Panics when the variable is missing or the database is unreachable,
/// since nothing works without it.
pub async fn create_pool() -> PgPool {
	let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
	PgPoolOptions::new()
		.max_connections(10)
		.connect(&database_url)
		.await
		.expect("Could not connect to the database")
}
