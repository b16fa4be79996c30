use crate::{Error, MemoryService, MemoryTarget, Result};
use ember_storage::models::Memory;

impl MemoryService {
	/// Removes one memory and returns what was removed.
	pub async fn delete_memory(&self, agent_id: &str, target: &MemoryTarget) -> Result<Memory> {
		let memory = self.resolve_target(agent_id, target).await?;

		if !self.store.delete_memory(memory.memory_id).await? {
			return Err(Error::NotFound {
				message: format!("Memory {} was already deleted.", memory.memory_id),
			});
		}

		tracing::info!(agent_id, memory_id = %memory.memory_id, "Memory deleted.");

		Ok(memory)
	}
}
