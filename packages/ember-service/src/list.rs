use crate::{MemoryService, Result};
use ember_storage::models::Memory;

impl MemoryService {
	/// Memories of the agent, strongest first. Listing is read-only: no decay, no reinforcement.
	pub async fn list_memories(&self, agent_id: &str, min_strength: Option<f32>) -> Result<Vec<Memory>> {
		let min_strength = min_strength.filter(|value| value.is_finite()).unwrap_or(0.0);

		Ok(self.store.list_memories(agent_id, min_strength).await?)
	}
}
