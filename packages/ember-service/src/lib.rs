pub mod add_memory;
pub mod apply;
pub mod delete;
pub mod enqueue;
pub mod extraction;
pub mod list;
pub mod passive;
pub mod reconcile;
pub mod resolve;
pub mod retrieve;
pub mod update;

mod error;

pub use add_memory::AddMemoryRequest;
pub use apply::{ApplyCounts, ApplySummary, SkipReason, SkippedCandidate};
pub use enqueue::{EnqueueResult, RunCompleted};
pub use error::{Error, Result};
pub use passive::{PassiveOutcome, PassiveSkip, PassiveSummary};
pub use reconcile::{Reconciliation, ResolvedCandidate, Target, TargetOrigin};
pub use resolve::{MatchMode, MemoryTarget};
pub use retrieve::ScoredMemory;
pub use update::{UpdateAction, UpdateRequest, UpdateResponse};

use std::sync::Arc;

use ember_config::Config;
use ember_domain::{clock::Clock, settings::MemorySettings};
use ember_providers::{EmbeddingProvider, LlmProvider};
use ember_storage::Store;

/// Entry point for every memory operation of the subsystem.
pub struct MemoryService {
	pub cfg: Config,
	pub store: Arc<dyn Store>,
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub llm: Arc<dyn LlmProvider>,
	pub clock: Arc<dyn Clock>,
}
impl MemoryService {
	pub fn new(
		cfg: Config,
		store: Arc<dyn Store>,
		embedding: Arc<dyn EmbeddingProvider>,
		llm: Arc<dyn LlmProvider>,
		clock: Arc<dyn Clock>,
	) -> Self {
		Self { cfg, store, embedding, llm, clock }
	}

	pub fn default_settings(&self) -> MemorySettings {
		MemorySettings::from_config(&self.cfg.memory)
	}

	/// Settings from the agent's own row, or `None` when the agent has no row.
	pub async fn agent_settings(&self, agent_id: &str) -> Result<Option<MemorySettings>> {
		let overrides = self.store.memory_overrides(agent_id).await?;

		Ok(overrides.map(|overrides| self.default_settings().with_overrides(&overrides)))
	}

	/// Settings for tool calls and retrieval, which fall back to the configured defaults.
	pub async fn effective_settings(&self, agent_id: &str) -> Result<MemorySettings> {
		Ok(self.agent_settings(agent_id).await?.unwrap_or_else(|| self.default_settings()))
	}

	/// Best-effort embeddings. Any provider problem yields `None` for every text.
	pub(crate) async fn embed_best_effort(&self, texts: &[String]) -> Vec<Option<Vec<f32>>> {
		if texts.is_empty() || !self.embedding.available() {
			return vec![None; texts.len()];
		}

		match self.embedding.embed(texts).await {
			Ok(vectors) if vectors.len() == texts.len() => vectors.into_iter().map(Some).collect(),
			Ok(vectors) => {
				tracing::warn!(
					expected = texts.len(),
					got = vectors.len(),
					"Embedding provider returned a mismatched batch. Continuing without embeddings."
				);

				vec![None; texts.len()]
			},
			Err(err) => {
				tracing::warn!(error = %err, "Embedding failed. Continuing without embeddings.");

				vec![None; texts.len()]
			},
		}
	}

	pub(crate) async fn embed_one(&self, text: &str) -> Option<Vec<f32>> {
		self.embed_best_effort(&[text.to_string()]).await.pop().flatten()
	}
}

pub(crate) fn trimmed_non_empty(value: &str, field: &str) -> Result<String> {
	let trimmed = value.trim();

	if trimmed.is_empty() {
		return Err(Error::invalid(format!("{field} must be non-empty.")));
	}

	Ok(trimmed.to_string())
}
