use serde::Serialize;

use crate::MemoryService;
use ember_domain::{
	scoring::{self, ScoreInputs},
	settings::MemorySettings,
};
use ember_storage::models::Memory;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoredMemory {
	pub memory: Memory,
	pub score: f32,
	pub similarity: Option<f32>,
}

impl MemoryService {
	/// Most relevant memories for the agent's current context. Never fails: storage or provider
	/// problems shrink or empty the result instead.
	pub async fn retrieve(&self, agent_id: &str, context: &str) -> Vec<ScoredMemory> {
		let settings = match self.effective_settings(agent_id).await {
			Ok(settings) => settings,
			Err(err) => {
				tracing::warn!(agent_id, error = %err, "Failed to load memory settings. Returning no memories.");

				return Vec::new();
			},
		};

		self.retrieve_with_settings(agent_id, context, &settings).await
	}

	pub async fn retrieve_with_settings(
		&self,
		agent_id: &str,
		context: &str,
		settings: &MemorySettings,
	) -> Vec<ScoredMemory> {
		if !settings.enabled {
			return Vec::new();
		}

		if let Err(err) = self.store.decay_memories(agent_id, settings.decay_rate).await {
			tracing::warn!(agent_id, error = %err, "Memory decay failed. Scoring current strengths.");
		}

		let memories = match self.store.list_memories(agent_id, settings.min_strength).await {
			Ok(memories) => memories,
			Err(err) => {
				tracing::warn!(agent_id, error = %err, "Failed to list memories. Returning no memories.");

				return Vec::new();
			},
		};

		if memories.is_empty() {
			return Vec::new();
		}

		let context_vector =
			if context.trim().is_empty() { None } else { self.embed_one(context).await };
		let now = self.clock.now();
		let mut scored: Vec<ScoredMemory> = memories
			.into_iter()
			.map(|memory| {
				let similarity = context_vector.as_deref().and_then(|query| {
					memory
						.embedding
						.as_deref()
						.and_then(|stored| scoring::cosine_similarity(query, stored))
				});
				let score = scoring::score(
					ScoreInputs {
						similarity,
						similarity_weight: settings.similarity_weight,
						strength: memory.strength,
						access_count: memory.access_count,
						last_accessed_at: memory.last_accessed_at,
					},
					now,
				);

				ScoredMemory { memory, score, similarity }
			})
			.collect();

		scored.sort_by(|a, b| {
			b.score.total_cmp(&a.score).then(a.memory.memory_id.cmp(&b.memory.memory_id))
		});
		scored.truncate(settings.max_memories);

		for item in &mut scored {
			match self
				.store
				.reinforce_memory(item.memory.memory_id, settings.reinforce_amount, now)
				.await
			{
				Ok(Some(reinforced)) => item.memory = reinforced,
				Ok(None) => {
					tracing::debug!(memory_id = %item.memory.memory_id, "Memory vanished before reinforcement.");
				},
				Err(err) => {
					tracing::warn!(memory_id = %item.memory.memory_id, error = %err, "Memory reinforcement failed.");
				},
			}
		}

		tracing::debug!(agent_id, returned = scored.len(), "Retrieved memories.");

		scored
	}
}
