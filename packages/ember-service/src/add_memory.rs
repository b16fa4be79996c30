use serde::{Deserialize, Serialize};

use crate::{MemoryService, Result};
use ember_domain::{MAX_STRENGTH, MemoryKind};
use ember_storage::models::{Memory, NewMemory};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddMemoryRequest {
	pub agent_id: String,
	pub content: String,
	#[serde(default = "default_kind")]
	pub kind: MemoryKind,
	#[serde(default)]
	pub permanent: bool,
}

impl MemoryService {
	/// Stores a memory the agent asked to keep. Embedding is best-effort.
	pub async fn add_memory(&self, req: AddMemoryRequest) -> Result<Memory> {
		let agent_id = crate::trimmed_non_empty(&req.agent_id, "agent_id")?;
		let content = crate::trimmed_non_empty(&req.content, "content")?;
		let embedding = self.embed_one(&content).await;
		let memory = self
			.store
			.create_memory(
				&NewMemory {
					agent_id,
					kind: req.kind,
					content,
					embedding,
					strength: MAX_STRENGTH,
					permanent: req.permanent,
				},
				self.clock.now(),
			)
			.await?;

		tracing::info!(
			agent_id = %memory.agent_id,
			memory_id = %memory.memory_id,
			permanent = memory.permanent,
			"Memory added."
		);

		Ok(memory)
	}
}

fn default_kind() -> MemoryKind {
	MemoryKind::Fact
}
