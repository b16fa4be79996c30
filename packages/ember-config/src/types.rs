use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub memory: Memory,
	#[serde(default)]
	pub passive: Passive,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
	/// Optional. Identity recorded in `claimed_by`; derived from the host and pid when unset.
	pub worker_id: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Providers {
	/// Optional. Without it every embedding call is skipped and similarity terms drop out.
	pub embedding: Option<EmbeddingProviderConfig>,
	pub llm: LlmProviderConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: Option<String>,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	/// Optional at load time. A missing key fails the first job that needs the model, terminally.
	pub api_key: Option<String>,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// Process-wide defaults for per-agent memory settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Memory {
	pub enabled: bool,
	pub passive_updates: bool,
	pub min_strength: f32,
	pub max_memories: u32,
	pub similarity_weight: f32,
	pub reinforce_amount: f32,
	pub decay_rate: f32,
	pub capacity: u32,
}
impl Default for Memory {
	fn default() -> Self {
		Self {
			enabled: true,
			passive_updates: true,
			min_strength: 0.1,
			max_memories: 8,
			similarity_weight: 1.0,
			reinforce_amount: 0.1,
			decay_rate: 0.02,
			capacity: 200,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Passive {
	pub processing_enabled: bool,
	pub poll_interval_ms: u64,
	pub lease_seconds: i64,
	pub max_attempts: i32,
	pub transcript_token_budget: u32,
	pub chars_per_token: u32,
}
impl Default for Passive {
	fn default() -> Self {
		Self {
			processing_enabled: true,
			poll_interval_ms: 1_500,
			lease_seconds: 180,
			max_attempts: 3,
			transcript_token_budget: 6_000,
			chars_per_token: 4,
		}
	}
}
