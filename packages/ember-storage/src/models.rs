use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use ember_domain::{MemoryKind, eviction::Evictable};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Memory {
	pub memory_id: Uuid,
	pub agent_id: String,
	pub kind: MemoryKind,
	pub content: String,
	#[serde(skip_serializing_if = "Option::is_none", default)]
	pub embedding: Option<Vec<f32>>,
	pub strength: f32,
	pub access_count: i64,
	pub permanent: bool,
	pub version: i64,
	#[serde(with = "ember_domain::time_serde::option")]
	pub last_accessed_at: Option<OffsetDateTime>,
	#[serde(with = "ember_domain::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "ember_domain::time_serde")]
	pub updated_at: OffsetDateTime,
}
impl Evictable for Memory {
	fn is_permanent(&self) -> bool {
		self.permanent
	}

	fn strength(&self) -> f32 {
		self.strength
	}

	fn updated_at(&self) -> OffsetDateTime {
		self.updated_at
	}
}

#[derive(Clone, Debug)]
pub struct NewMemory {
	pub agent_id: String,
	pub kind: MemoryKind,
	pub content: String,
	pub embedding: Option<Vec<f32>>,
	pub strength: f32,
	pub permanent: bool,
}

/// Fields to change on one memory. `None` leaves a field untouched.
#[derive(Clone, Debug, Default)]
pub struct MemoryPatch {
	pub content: Option<String>,
	/// `Some(None)` clears a stale embedding.
	pub embedding: Option<Option<Vec<f32>>>,
	pub kind: Option<MemoryKind>,
	pub permanent: Option<bool>,
	pub strength: Option<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum UpdateOutcome {
	Updated(Memory),
	NotFound,
	VersionConflict { current: i64 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimilarMemory {
	pub memory: Memory,
	pub similarity: f32,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
	Pending,
	Processing,
	Completed,
	Failed,
	Skipped,
}
impl QueueStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "pending",
			Self::Processing => "processing",
			Self::Completed => "completed",
			Self::Failed => "failed",
			Self::Skipped => "skipped",
		}
	}
}

impl fmt::Display for QueueStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for QueueStatus {
	type Err = String;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		match raw {
			"pending" => Ok(Self::Pending),
			"processing" => Ok(Self::Processing),
			"completed" => Ok(Self::Completed),
			"failed" => Ok(Self::Failed),
			"skipped" => Ok(Self::Skipped),
			other => Err(format!("Unknown queue status {other:?}.")),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
	pub entry_id: Uuid,
	pub job_id: String,
	pub agent_id: String,
	pub work_item_id: Option<String>,
	pub dispatch_id: Option<String>,
	pub status: QueueStatus,
	pub attempt_count: i32,
	pub max_attempts: i32,
	#[serde(with = "ember_domain::time_serde")]
	pub next_attempt_at: OffsetDateTime,
	pub claimed_by: Option<String>,
	#[serde(with = "ember_domain::time_serde::option")]
	pub lease_expires_at: Option<OffsetDateTime>,
	pub last_error: Option<String>,
	pub summary: Option<Value>,
	#[serde(with = "ember_domain::time_serde::option")]
	pub started_at: Option<OffsetDateTime>,
	#[serde(with = "ember_domain::time_serde::option")]
	pub completed_at: Option<OffsetDateTime>,
	#[serde(with = "ember_domain::time_serde")]
	pub created_at: OffsetDateTime,
}
impl QueueEntry {
	/// The current attempt is the last one allowed.
	pub fn attempts_exhausted(&self) -> bool {
		self.attempt_count >= self.max_attempts
	}

	/// Claimed again after its final attempt lost its lease.
	pub fn over_attempt_limit(&self) -> bool {
		self.attempt_count > self.max_attempts
	}
}

#[derive(Clone, Debug)]
pub struct NewQueueEntry {
	pub job_id: String,
	pub agent_id: String,
	pub work_item_id: Option<String>,
	pub dispatch_id: Option<String>,
	pub max_attempts: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnqueueOutcome {
	Inserted(Uuid),
	Duplicate,
}

/// How a failed attempt is recorded.
#[derive(Clone, Debug)]
pub struct FailureRecord {
	pub error: String,
	/// `Some` returns the entry to `pending` at that time; `None` fails it terminally.
	pub retry_at: Option<OffsetDateTime>,
	pub summary: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InferenceCall {
	pub call_id: Uuid,
	pub agent_id: String,
	pub job_id: String,
	pub work_item_id: Option<String>,
	pub dispatch_id: Option<String>,
	pub stage: String,
	pub turn_number: i32,
	pub model: String,
	pub prompt_tokens: i64,
	pub completion_tokens: i64,
	pub cost: f64,
	#[serde(with = "ember_domain::time_serde")]
	pub created_at: OffsetDateTime,
}
