pub const LOG_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/logs");
pub const CRASH_LOG: &str = "crash.log";
pub const LATEST_LOG: &str = "latest.log";

// Environment variable names
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const GOOGLE_MAPS_API_KEY: &str = "GOOGLE_MAPS_API_KEY";

/// POI candidates fetched per block
pub const POI_CANDIDATE_LIMIT: usize = 10;
/// Max concurrent outbound requests per stage per trip
pub const STAGE_FANOUT_LIMIT: usize = 8;
/// Seconds before one LLM attempt is abandoned
pub const LLM_ATTEMPT_TIMEOUT_SECS: u64 = 60;
/// Total attempts for macro planning (first try + retries)
pub const LLM_MAX_ATTEMPTS: u32 = 2;
/// Seconds before a routing call falls back to the heuristic
pub const TRAVEL_TIME_TIMEOUT_SECS: u64 = 5;
/// Seconds before one POI provider tier is given up on
pub const POI_PROVIDER_TIMEOUT_SECS: u64 = 10;
/// How far past sleep time a block may be pushed before the schedule is
/// considered overrun (the critic flags anything beyond it)
pub const LATE_END_GRACE_MINUTES: i64 = 180;
