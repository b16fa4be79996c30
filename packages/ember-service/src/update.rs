use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, MemoryService, MemoryTarget, Result};
use ember_domain::MAX_STRENGTH;
use ember_storage::models::{Memory, MemoryPatch, UpdateOutcome};

/// One tool-driven change. Exactly one of `content`, `pin`, or `delete` must be set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateRequest {
	pub agent_id: String,
	pub target: MemoryTarget,
	#[serde(default)]
	pub content: Option<String>,
	#[serde(default)]
	pub expected_version: Option<i64>,
	/// `Some(true)` pins, `Some(false)` unpins.
	#[serde(default)]
	pub pin: Option<bool>,
	#[serde(default)]
	pub delete: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateAction {
	Edited,
	Pinned,
	Unpinned,
	Deleted,
}

#[derive(Clone, Debug, Serialize)]
pub struct UpdateResponse {
	pub memory_id: Uuid,
	pub action: UpdateAction,
	/// The memory after the change; `None` once deleted.
	pub memory: Option<Memory>,
}

enum Change {
	Edit(String),
	Pin(bool),
	Delete,
}

impl MemoryService {
	pub async fn update(&self, req: UpdateRequest) -> Result<UpdateResponse> {
		let change = classify(&req)?;
		let memory = self.resolve_target(&req.agent_id, &req.target).await?;

		if let Some(expected) = req.expected_version
			&& expected != memory.version
		{
			return Err(Error::VersionConflict {
				memory_id: memory.memory_id,
				expected,
				current: memory.version,
			});
		}

		let (patch, action) = match change {
			Change::Delete => {
				if !self.store.delete_memory(memory.memory_id).await? {
					return Err(Error::NotFound {
						message: format!("Memory {} was already deleted.", memory.memory_id),
					});
				}

				tracing::info!(agent_id = %req.agent_id, memory_id = %memory.memory_id, "Memory deleted.");

				return Ok(UpdateResponse {
					memory_id: memory.memory_id,
					action: UpdateAction::Deleted,
					memory: None,
				});
			},
			Change::Edit(content) => {
				// A failed embedding clears the stored vector instead of leaving a stale one.
				let embedding = self.embed_one(&content).await;

				(
					MemoryPatch {
						content: Some(content),
						embedding: Some(embedding),
						..Default::default()
					},
					UpdateAction::Edited,
				)
			},
			Change::Pin(true) => (
				MemoryPatch {
					permanent: Some(true),
					strength: Some(MAX_STRENGTH),
					..Default::default()
				},
				UpdateAction::Pinned,
			),
			Change::Pin(false) =>
				(MemoryPatch { permanent: Some(false), ..Default::default() }, UpdateAction::Unpinned),
		};
		let outcome = self
			.store
			.update_memory(memory.memory_id, &patch, req.expected_version, self.clock.now())
			.await?;

		match outcome {
			UpdateOutcome::Updated(updated) => {
				tracing::info!(
					agent_id = %req.agent_id,
					memory_id = %updated.memory_id,
					version = updated.version,
					action = ?action,
					"Memory updated."
				);

				Ok(UpdateResponse { memory_id: updated.memory_id, action, memory: Some(updated) })
			},
			UpdateOutcome::NotFound => Err(Error::NotFound {
				message: format!("Memory {} was deleted before the update.", memory.memory_id),
			}),
			UpdateOutcome::VersionConflict { current } => Err(Error::VersionConflict {
				memory_id: memory.memory_id,
				expected: req.expected_version.unwrap_or(memory.version),
				current,
			}),
		}
	}
}

fn classify(req: &UpdateRequest) -> Result<Change> {
	let content = req.content.as_deref().map(str::trim);
	let requested = [content.is_some(), req.pin.is_some(), req.delete];

	match requested.iter().filter(|set| **set).count() {
		0 => return Err(Error::invalid("Provide one of content, pin, or delete.")),
		1 => {},
		_ => {
			return Err(Error::invalid(
				"Content edits, pin changes, and deletes cannot be combined in one call.",
			));
		},
	}

	if req.delete {
		return Ok(Change::Delete);
	}
	if let Some(pin) = req.pin {
		return Ok(Change::Pin(pin));
	}

	match content {
		Some(content) if !content.is_empty() => Ok(Change::Edit(content.to_string())),
		_ => Err(Error::invalid("content must be non-empty.")),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::MatchMode;

	fn request() -> UpdateRequest {
		UpdateRequest {
			agent_id: "agent-a".to_string(),
			target: MemoryTarget::Content { text: "tea".to_string(), mode: MatchMode::Contains },
			content: None,
			expected_version: None,
			pin: None,
			delete: false,
		}
	}

	#[test]
	fn pin_and_delete_together_are_rejected() {
		let req = UpdateRequest { pin: Some(true), delete: true, ..request() };

		assert!(matches!(classify(&req), Err(Error::InvalidRequest { .. })));
	}

	#[test]
	fn empty_call_is_rejected() {
		assert!(matches!(classify(&request()), Err(Error::InvalidRequest { .. })));
	}

	#[test]
	fn blank_content_is_rejected() {
		let req = UpdateRequest { content: Some("  ".to_string()), ..request() };

		assert!(matches!(classify(&req), Err(Error::InvalidRequest { .. })));
	}

	#[test]
	fn single_change_is_accepted() {
		let req = UpdateRequest { content: Some(" Likes green tea. ".to_string()), ..request() };

		assert!(matches!(classify(&req), Ok(Change::Edit(content)) if content == "Likes green tea."));
	}
}
