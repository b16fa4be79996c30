use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, MemoryService, Result};
use ember_storage::models::Memory;

/// Matches listed in an ambiguity error.
pub const MAX_LISTED_MATCHES: usize = 5;
const PREVIEW_CHARS: usize = 80;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
	/// Whole content, ignoring surrounding whitespace and case.
	Exact,
	/// Case-insensitive substring.
	#[default]
	Contains,
}
impl MatchMode {
	pub fn matches(self, content: &str, query: &str) -> bool {
		let content = content.trim().to_lowercase();
		let query = query.trim().to_lowercase();

		match self {
			Self::Exact => content == query,
			Self::Contains => content.contains(&query),
		}
	}
}

/// How a tool call names the memory it acts on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "by")]
pub enum MemoryTarget {
	Id { memory_id: Uuid },
	Content {
		text: String,
		#[serde(default)]
		mode: MatchMode,
	},
}

impl MemoryService {
	/// Finds exactly one memory of the agent. Content lookups never guess between several matches.
	pub async fn resolve_target(&self, agent_id: &str, target: &MemoryTarget) -> Result<Memory> {
		match target {
			MemoryTarget::Id { memory_id } => {
				let memory = self.store.get_memory(*memory_id).await?;

				memory.filter(|memory| memory.agent_id == agent_id).ok_or_else(|| Error::NotFound {
					message: format!("Memory {memory_id} does not exist for this agent."),
				})
			},
			MemoryTarget::Content { text, mode } => {
				if text.trim().is_empty() {
					return Err(Error::invalid("Match text must be non-empty."));
				}

				let mut matches: Vec<Memory> = self
					.store
					.list_memories(agent_id, 0.0)
					.await?
					.into_iter()
					.filter(|memory| mode.matches(&memory.content, text))
					.collect();

				match matches.len() {
					0 => Err(Error::NotFound {
						message: format!("No memory matches {:?}.", text.trim()),
					}),
					1 => Ok(matches.remove(0)),
					count => Err(Error::Ambiguous { message: ambiguity_message(text, count, &matches) }),
				}
			},
		}
	}
}

fn ambiguity_message(text: &str, count: usize, matches: &[Memory]) -> String {
	let listed: Vec<String> = matches
		.iter()
		.take(MAX_LISTED_MATCHES)
		.map(|memory| format!("{} ({:?})", memory.memory_id, preview(&memory.content)))
		.collect();

	format!(
		"{count} memories match {:?}. Call again with one of these ids: {}.",
		text.trim(),
		listed.join(", ")
	)
}

fn preview(content: &str) -> String {
	if content.chars().count() <= PREVIEW_CHARS {
		return content.to_string();
	}

	let mut out: String = content.chars().take(PREVIEW_CHARS).collect();

	out.push('…');

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn exact_ignores_case_and_padding() {
		assert!(MatchMode::Exact.matches("Prefers dark mode.", "  prefers DARK mode. "));
		assert!(!MatchMode::Exact.matches("Prefers dark mode.", "dark mode"));
	}

	#[test]
	fn contains_is_case_insensitive_substring() {
		assert!(MatchMode::Contains.matches("Prefers dark mode.", "DARK"));
		assert!(!MatchMode::Contains.matches("Prefers dark mode.", "light"));
	}

	#[test]
	fn long_previews_are_cut() {
		let long = "x".repeat(200);

		assert_eq!(preview(&long).chars().count(), PREVIEW_CHARS + 1);
		assert_eq!(preview("short"), "short");
	}
}
