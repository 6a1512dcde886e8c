/*
 * src/providers/llm.rs
 *
 * File for the LLM client capability
 *
 * Purpose:
 *   One trait the macro planner consumes (`generate_structured`) plus the
 *   OpenAI-backed implementation. Responses are stripped of markdown fences
 *   and parsed leniently (serde_json first, json5 for almost-JSON output).
 *
 * Include:
 *   LlmClient       - generate_structured(prompt, system, max_tokens) -> Value
 *   OpenAiLlmClient - langchain-rust OpenAI implementation
 *   LlmError        - upstream / timeout / parse failure
 *
 * The default client is produced by a swappable factory function pointer so
 * tests can inject a mock without touching the planner.
 */

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use langchain_rust::language_models::llm::LLM;
use langchain_rust::language_models::options::CallOptions;
use langchain_rust::llm::openai::{OpenAI, OpenAIModel};
use langchain_rust::schemas::Message;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tokio::time::timeout;
use tracing::debug;

use crate::global::LLM_ATTEMPT_TIMEOUT_SECS;

#[derive(Debug)]
pub enum LlmError {
	/// The model or transport failed
	Upstream(String),
	/// The per-attempt deadline elapsed
	Timeout,
	/// The model answered but not with parseable JSON
	Parse(String),
}

impl std::fmt::Display for LlmError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			LlmError::Upstream(e) => write!(f, "LLM call failed: {e}"),
			LlmError::Timeout => write!(f, "LLM call timed out"),
			LlmError::Parse(e) => write!(f, "LLM response was not valid JSON: {e}"),
		}
	}
}

impl std::error::Error for LlmError {}

/// Structured-generation capability consumed by the macro planner.
#[async_trait]
pub trait LlmClient: Send + Sync {
	async fn generate_structured(
		&self,
		prompt: &str,
		system_prompt: &str,
		max_tokens: u32,
	) -> Result<Value, LlmError>;
}

/// OpenAI client via langchain-rust. Reads `OPENAI_API_KEY` from the
/// environment on use.
pub struct OpenAiLlmClient {
	model: OpenAIModel,
}

impl OpenAiLlmClient {
	pub fn new() -> Self {
		Self {
			model: OpenAIModel::Gpt4oMini,
		}
	}
}

impl Default for OpenAiLlmClient {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl LlmClient for OpenAiLlmClient {
	async fn generate_structured(
		&self,
		prompt: &str,
		system_prompt: &str,
		max_tokens: u32,
	) -> Result<Value, LlmError> {
		let max_tokens = max_tokens.min(u16::MAX as u32) as u16;
		let llm = OpenAI::default()
			.with_model(self.model.clone())
			.with_options(CallOptions::default().with_max_tokens(max_tokens.into()));

		let messages = [
			Message::new_system_message(system_prompt),
			Message::new_human_message(prompt),
		];

		let result = timeout(
			Duration::from_secs(LLM_ATTEMPT_TIMEOUT_SECS),
			llm.generate(&messages),
		)
		.await
		.map_err(|_| LlmError::Timeout)?
		.map_err(|e| LlmError::Upstream(e.to_string()))?;

		debug!(
			target: "llm_client",
			response_len = result.generation.len(),
			"LLM generation finished"
		);

		parse_structured_response(&result.generation)
	}
}

static CODE_FENCE: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").unwrap());

/// Parses a raw model response into JSON. Models regularly wrap the payload
/// in markdown code fences or emit trailing commas; both are tolerated here
/// so the retry budget is spent on real failures only.
pub fn parse_structured_response(raw: &str) -> Result<Value, LlmError> {
	let body = match CODE_FENCE.captures(raw) {
		Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(raw),
		None => raw,
	}
	.trim();

	if body.is_empty() {
		return Err(LlmError::Parse(String::from("empty response")));
	}

	match serde_json::from_str::<Value>(body) {
		Ok(value) => Ok(value),
		Err(first_err) => json5::from_str::<Value>(body)
			.map_err(|_| LlmError::Parse(first_err.to_string())),
	}
}

pub type LlmFactory = fn() -> Arc<dyn LlmClient>;

fn default_macro_planning_llm_client() -> Arc<dyn LlmClient> {
	Arc::new(OpenAiLlmClient::new())
}

static MACRO_PLANNING_LLM_FACTORY: Lazy<RwLock<LlmFactory>> =
	Lazy::new(|| RwLock::new(default_macro_planning_llm_client));

/// Returns a client from the currently-installed factory.
pub fn macro_planning_llm_client() -> Arc<dyn LlmClient> {
	(*MACRO_PLANNING_LLM_FACTORY.read().unwrap())()
}

/// Swaps the factory used when no client is injected explicitly.
pub fn set_macro_planning_llm_factory(factory: LlmFactory) {
	*MACRO_PLANNING_LLM_FACTORY.write().unwrap() = factory;
}

pub fn reset_macro_planning_llm_factory() {
	set_macro_planning_llm_factory(default_macro_planning_llm_client);
}
