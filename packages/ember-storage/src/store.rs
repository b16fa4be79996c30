use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Result,
	models::{
		EnqueueOutcome, FailureRecord, InferenceCall, Memory, MemoryPatch, NewMemory,
		NewQueueEntry, QueueEntry, SimilarMemory, UpdateOutcome,
	},
};
use ember_domain::{BoxFuture, settings::AgentOverrides, transcript::RunMessage};

pub trait MemoryStore
where
	Self: Send + Sync,
{
	/// Memories of one agent with `strength >= min_strength`, strongest first.
	fn list_memories<'a>(
		&'a self,
		agent_id: &'a str,
		min_strength: f32,
	) -> BoxFuture<'a, Result<Vec<Memory>>>;

	fn get_memory(&self, memory_id: Uuid) -> BoxFuture<'_, Result<Option<Memory>>>;

	fn create_memory<'a>(
		&'a self,
		memory: &'a NewMemory,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Memory>>;

	/// Applies `patch` and bumps `version`. With `expected_version`, a stale version is reported
	/// as a conflict and nothing is written.
	fn update_memory<'a>(
		&'a self,
		memory_id: Uuid,
		patch: &'a MemoryPatch,
		expected_version: Option<i64>,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<UpdateOutcome>>;

	fn delete_memory(&self, memory_id: Uuid) -> BoxFuture<'_, Result<bool>>;

	/// Saturating strength bump plus access bookkeeping. `None` when the memory is gone.
	fn reinforce_memory(
		&self,
		memory_id: Uuid,
		amount: f32,
		now: OffsetDateTime,
	) -> BoxFuture<'_, Result<Option<Memory>>>;

	/// Multiplicative decay of every non-permanent memory of the agent. Returns rows touched.
	fn decay_memories<'a>(&'a self, agent_id: &'a str, rate: f32) -> BoxFuture<'a, Result<u64>>;

	/// Nearest memories by cosine similarity, skipping rows without a same-sized embedding.
	fn find_similar<'a>(
		&'a self,
		agent_id: &'a str,
		vector: &'a [f32],
		limit: usize,
	) -> BoxFuture<'a, Result<Vec<SimilarMemory>>>;
}

pub trait QueueStore
where
	Self: Send + Sync,
{
	/// No-op on a duplicate `job_id`.
	fn enqueue<'a>(
		&'a self,
		entry: &'a NewQueueEntry,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<EnqueueOutcome>>;

	/// Atomically leases at most one eligible entry to `worker_id`.
	fn claim_next<'a>(
		&'a self,
		worker_id: &'a str,
		lease_seconds: i64,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Option<QueueEntry>>>;

	fn get_entry(&self, entry_id: Uuid) -> BoxFuture<'_, Result<Option<QueueEntry>>>;

	/// The `mark_*` calls only touch entries still in `processing` and report whether they did.
	fn mark_completed<'a>(
		&'a self,
		entry_id: Uuid,
		summary: &'a Value,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>>;

	fn mark_failed<'a>(
		&'a self,
		entry_id: Uuid,
		failure: &'a FailureRecord,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>>;

	fn mark_skipped<'a>(
		&'a self,
		entry_id: Uuid,
		summary: &'a Value,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>>;
}

pub trait AgentStore
where
	Self: Send + Sync,
{
	/// `None` when the agent has no settings row.
	fn memory_overrides<'a>(
		&'a self,
		agent_id: &'a str,
	) -> BoxFuture<'a, Result<Option<AgentOverrides>>>;

	/// Messages of one run in conversation order.
	fn run_messages<'a>(&'a self, job_id: &'a str) -> BoxFuture<'a, Result<Vec<RunMessage>>>;

	fn record_inference_call<'a>(&'a self, call: &'a InferenceCall) -> BoxFuture<'a, Result<()>>;
}

pub trait Store
where
	Self: MemoryStore + QueueStore + AgentStore,
{
}
impl<T> Store for T where T: MemoryStore + QueueStore + AgentStore {}
