use serde::{Deserialize, Serialize};

/// Effective memory settings for one agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemorySettings {
	pub enabled: bool,
	pub passive_updates: bool,
	pub min_strength: f32,
	pub max_memories: usize,
	pub similarity_weight: f32,
	pub reinforce_amount: f32,
	pub decay_rate: f32,
	pub capacity: usize,
}
impl MemorySettings {
	pub fn from_config(cfg: &ember_config::Memory) -> Self {
		Self {
			enabled: cfg.enabled,
			passive_updates: cfg.passive_updates,
			min_strength: cfg.min_strength,
			max_memories: cfg.max_memories as usize,
			similarity_weight: cfg.similarity_weight,
			reinforce_amount: cfg.reinforce_amount,
			decay_rate: cfg.decay_rate,
			capacity: cfg.capacity as usize,
		}
	}

	pub fn with_overrides(mut self, overrides: &AgentOverrides) -> Self {
		self.enabled = overrides.memory_enabled;
		self.passive_updates = overrides.passive_updates;

		if let Some(max_memories) = overrides.max_memories.filter(|value| *value > 0) {
			self.max_memories = max_memories as usize;
		}
		if let Some(min_strength) = overrides.min_strength.filter(|value| value.is_finite()) {
			self.min_strength = min_strength.clamp(0.0, 1.0);
		}
		if let Some(capacity) = overrides.capacity.filter(|value| *value > 0) {
			self.capacity = capacity as usize;
		}

		self
	}

	/// Passive extraction runs only when memory itself is on.
	pub fn passive_enabled(&self) -> bool {
		self.enabled && self.passive_updates
	}
}

/// Per-agent row stored next to the agent record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentOverrides {
	pub memory_enabled: bool,
	pub passive_updates: bool,
	pub max_memories: Option<u32>,
	pub min_strength: Option<f32>,
	pub capacity: Option<u32>,
}
