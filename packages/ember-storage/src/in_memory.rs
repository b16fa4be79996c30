use std::{
	collections::HashMap,
	sync::{Mutex, MutexGuard},
};

use serde_json::Value;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
	Error, Result,
	models::{
		EnqueueOutcome, FailureRecord, InferenceCall, Memory, MemoryPatch, NewMemory,
		NewQueueEntry, QueueEntry, QueueStatus, SimilarMemory, UpdateOutcome,
	},
	store::{AgentStore, MemoryStore, QueueStore},
};
use ember_domain::{
	BoxFuture, MAX_STRENGTH, scoring, settings::AgentOverrides, transcript::RunMessage,
};

#[derive(Default)]
struct State {
	memories: HashMap<Uuid, Memory>,
	queue: Vec<QueueEntry>,
	agents: HashMap<String, AgentOverrides>,
	runs: HashMap<String, Vec<RunMessage>>,
	inference_calls: Vec<InferenceCall>,
}

/// Store kept in process memory. One mutex guards all tables, so every call is atomic.
#[derive(Default)]
pub struct InMemoryStore {
	state: Mutex<State>,
}
impl InMemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn put_agent_overrides(&self, agent_id: &str, overrides: AgentOverrides) {
		self.lock().agents.insert(agent_id.to_string(), overrides);
	}

	pub fn put_run_messages(&self, job_id: &str, messages: Vec<RunMessage>) {
		self.lock().runs.insert(job_id.to_string(), messages);
	}

	pub fn queue_entries(&self) -> Vec<QueueEntry> {
		self.lock().queue.clone()
	}

	pub fn inference_calls(&self) -> Vec<InferenceCall> {
		self.lock().inference_calls.clone()
	}

	fn lock(&self) -> MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(|err| err.into_inner())
	}

	fn list_memories_sync(&self, agent_id: &str, min_strength: f32) -> Vec<Memory> {
		let state = self.lock();
		let mut memories: Vec<Memory> = state
			.memories
			.values()
			.filter(|memory| memory.agent_id == agent_id && memory.strength >= min_strength)
			.cloned()
			.collect();

		memories.sort_by(|a, b| {
			b.strength
				.total_cmp(&a.strength)
				.then_with(|| b.updated_at.cmp(&a.updated_at))
				.then_with(|| a.memory_id.cmp(&b.memory_id))
		});

		memories
	}

	fn create_memory_sync(&self, memory: &NewMemory, now: OffsetDateTime) -> Result<Memory> {
		let content = memory.content.trim();

		if content.is_empty() {
			return Err(Error::InvalidArgument("Memory content must be non-empty.".to_string()));
		}

		check_vector(memory.embedding.as_deref())?;

		let created = Memory {
			memory_id: Uuid::new_v4(),
			agent_id: memory.agent_id.clone(),
			kind: memory.kind,
			content: content.to_string(),
			embedding: memory.embedding.clone(),
			strength: memory.strength.clamp(0.0, MAX_STRENGTH),
			access_count: 0,
			permanent: memory.permanent,
			version: 1,
			last_accessed_at: None,
			created_at: now,
			updated_at: now,
		};

		self.lock().memories.insert(created.memory_id, created.clone());

		Ok(created)
	}

	fn update_memory_sync(
		&self,
		memory_id: Uuid,
		patch: &MemoryPatch,
		expected_version: Option<i64>,
		now: OffsetDateTime,
	) -> Result<UpdateOutcome> {
		if patch.content.as_deref().map(|content| content.trim().is_empty()).unwrap_or(false) {
			return Err(Error::InvalidArgument("Memory content must be non-empty.".to_string()));
		}
		if let Some(embedding) = patch.embedding.as_ref() {
			check_vector(embedding.as_deref())?;
		}

		let mut state = self.lock();
		let Some(memory) = state.memories.get_mut(&memory_id) else {
			return Ok(UpdateOutcome::NotFound);
		};

		if let Some(expected) = expected_version
			&& memory.version != expected
		{
			return Ok(UpdateOutcome::VersionConflict { current: memory.version });
		}

		if let Some(content) = patch.content.as_deref() {
			memory.content = content.trim().to_string();
		}
		if let Some(embedding) = patch.embedding.as_ref() {
			memory.embedding = embedding.clone();
		}
		if let Some(kind) = patch.kind {
			memory.kind = kind;
		}
		if let Some(permanent) = patch.permanent {
			memory.permanent = permanent;
		}
		if let Some(strength) = patch.strength {
			memory.strength = strength.clamp(0.0, MAX_STRENGTH);
		}

		memory.version += 1;
		memory.updated_at = now;

		Ok(UpdateOutcome::Updated(memory.clone()))
	}

	fn reinforce_memory_sync(&self, memory_id: Uuid, amount: f32, now: OffsetDateTime) -> Option<Memory> {
		let mut state = self.lock();
		let memory = state.memories.get_mut(&memory_id)?;

		memory.strength = (memory.strength + amount.max(0.0)).min(MAX_STRENGTH);
		memory.access_count += 1;
		memory.last_accessed_at = Some(now);
		memory.version += 1;
		memory.updated_at = now;

		Some(memory.clone())
	}

	fn decay_memories_sync(&self, agent_id: &str, rate: f32) -> u64 {
		let rate = rate.clamp(0.0, 1.0);

		if rate == 0.0 {
			return 0;
		}

		let mut state = self.lock();
		let mut touched = 0;

		for memory in state.memories.values_mut() {
			if memory.agent_id != agent_id || memory.permanent || memory.strength <= 0.0 {
				continue;
			}

			memory.strength = (memory.strength * (1.0 - rate)).max(0.0);
			touched += 1;
		}

		touched
	}

	fn find_similar_sync(&self, agent_id: &str, vector: &[f32], limit: usize) -> Vec<SimilarMemory> {
		if vector.is_empty() || limit == 0 {
			return Vec::new();
		}

		let state = self.lock();
		let mut hits: Vec<SimilarMemory> = state
			.memories
			.values()
			.filter(|memory| memory.agent_id == agent_id)
			.filter_map(|memory| {
				let embedding = memory.embedding.as_deref()?;
				let similarity = scoring::cosine_similarity(vector, embedding)?;

				Some(SimilarMemory { memory: memory.clone(), similarity })
			})
			.collect();

		hits.sort_by(|a, b| {
			b.similarity.total_cmp(&a.similarity).then(a.memory.memory_id.cmp(&b.memory.memory_id))
		});
		hits.truncate(limit);

		hits
	}

	fn enqueue_sync(&self, entry: &NewQueueEntry, now: OffsetDateTime) -> EnqueueOutcome {
		let mut state = self.lock();

		if state.queue.iter().any(|existing| existing.job_id == entry.job_id) {
			return EnqueueOutcome::Duplicate;
		}

		let entry_id = Uuid::new_v4();

		state.queue.push(QueueEntry {
			entry_id,
			job_id: entry.job_id.clone(),
			agent_id: entry.agent_id.clone(),
			work_item_id: entry.work_item_id.clone(),
			dispatch_id: entry.dispatch_id.clone(),
			status: QueueStatus::Pending,
			attempt_count: 0,
			max_attempts: entry.max_attempts.max(1),
			next_attempt_at: now,
			claimed_by: None,
			lease_expires_at: None,
			last_error: None,
			summary: None,
			started_at: None,
			completed_at: None,
			created_at: now,
		});

		EnqueueOutcome::Inserted(entry_id)
	}

	fn claim_next_sync(
		&self,
		worker_id: &str,
		lease_seconds: i64,
		now: OffsetDateTime,
	) -> Result<Option<QueueEntry>> {
		if lease_seconds <= 0 {
			return Err(Error::InvalidArgument("Lease must be longer than zero seconds.".to_string()));
		}

		let mut state = self.lock();
		let claimable = state
			.queue
			.iter_mut()
			.filter(|entry| match entry.status {
				QueueStatus::Pending => entry.next_attempt_at <= now,
				QueueStatus::Processing =>
					entry.lease_expires_at.map(|expires| expires <= now).unwrap_or(true),
				_ => false,
			})
			.min_by(|a, b| {
				a.next_attempt_at.cmp(&b.next_attempt_at).then(a.created_at.cmp(&b.created_at))
			});
		let Some(entry) = claimable else { return Ok(None) };

		entry.status = QueueStatus::Processing;
		entry.claimed_by = Some(worker_id.to_string());
		entry.lease_expires_at = Some(now + Duration::seconds(lease_seconds));
		entry.attempt_count += 1;
		entry.started_at = Some(now);

		Ok(Some(entry.clone()))
	}

	fn finish_sync(
		&self,
		entry_id: Uuid,
		status: QueueStatus,
		summary: &Value,
		last_error: Option<&str>,
		now: OffsetDateTime,
	) -> bool {
		let mut state = self.lock();
		let Some(entry) = processing_entry(&mut state, entry_id) else { return false };

		entry.status = status;
		entry.summary = Some(summary.clone());
		entry.lease_expires_at = None;
		entry.completed_at = Some(now);

		if let Some(error) = last_error {
			entry.last_error = Some(error.to_string());
		}

		true
	}

	fn mark_failed_sync(&self, entry_id: Uuid, failure: &FailureRecord, now: OffsetDateTime) -> bool {
		let Some(retry_at) = failure.retry_at else {
			return self.finish_sync(
				entry_id,
				QueueStatus::Failed,
				&failure.summary,
				Some(failure.error.as_str()),
				now,
			);
		};
		let mut state = self.lock();
		let Some(entry) = processing_entry(&mut state, entry_id) else { return false };

		entry.status = QueueStatus::Pending;
		entry.next_attempt_at = retry_at;
		entry.claimed_by = None;
		entry.lease_expires_at = None;
		entry.last_error = Some(failure.error.clone());
		entry.summary = Some(failure.summary.clone());

		true
	}
}

impl MemoryStore for InMemoryStore {
	fn list_memories<'a>(
		&'a self,
		agent_id: &'a str,
		min_strength: f32,
	) -> BoxFuture<'a, Result<Vec<Memory>>> {
		Box::pin(async move { Ok(self.list_memories_sync(agent_id, min_strength)) })
	}

	fn get_memory(&self, memory_id: Uuid) -> BoxFuture<'_, Result<Option<Memory>>> {
		Box::pin(async move { Ok(self.lock().memories.get(&memory_id).cloned()) })
	}

	fn create_memory<'a>(
		&'a self,
		memory: &'a NewMemory,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Memory>> {
		Box::pin(async move { self.create_memory_sync(memory, now) })
	}

	fn update_memory<'a>(
		&'a self,
		memory_id: Uuid,
		patch: &'a MemoryPatch,
		expected_version: Option<i64>,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<UpdateOutcome>> {
		Box::pin(async move { self.update_memory_sync(memory_id, patch, expected_version, now) })
	}

	fn delete_memory(&self, memory_id: Uuid) -> BoxFuture<'_, Result<bool>> {
		Box::pin(async move { Ok(self.lock().memories.remove(&memory_id).is_some()) })
	}

	fn reinforce_memory(
		&self,
		memory_id: Uuid,
		amount: f32,
		now: OffsetDateTime,
	) -> BoxFuture<'_, Result<Option<Memory>>> {
		Box::pin(async move { Ok(self.reinforce_memory_sync(memory_id, amount, now)) })
	}

	fn decay_memories<'a>(&'a self, agent_id: &'a str, rate: f32) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move { Ok(self.decay_memories_sync(agent_id, rate)) })
	}

	fn find_similar<'a>(
		&'a self,
		agent_id: &'a str,
		vector: &'a [f32],
		limit: usize,
	) -> BoxFuture<'a, Result<Vec<SimilarMemory>>> {
		Box::pin(async move { Ok(self.find_similar_sync(agent_id, vector, limit)) })
	}
}

impl QueueStore for InMemoryStore {
	fn enqueue<'a>(
		&'a self,
		entry: &'a NewQueueEntry,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<EnqueueOutcome>> {
		Box::pin(async move { Ok(self.enqueue_sync(entry, now)) })
	}

	fn claim_next<'a>(
		&'a self,
		worker_id: &'a str,
		lease_seconds: i64,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Option<QueueEntry>>> {
		Box::pin(async move { self.claim_next_sync(worker_id, lease_seconds, now) })
	}

	fn get_entry(&self, entry_id: Uuid) -> BoxFuture<'_, Result<Option<QueueEntry>>> {
		Box::pin(async move {
			Ok(self.lock().queue.iter().find(|entry| entry.entry_id == entry_id).cloned())
		})
	}

	fn mark_completed<'a>(
		&'a self,
		entry_id: Uuid,
		summary: &'a Value,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			Ok(self.finish_sync(entry_id, QueueStatus::Completed, summary, None, now))
		})
	}

	fn mark_failed<'a>(
		&'a self,
		entry_id: Uuid,
		failure: &'a FailureRecord,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move { Ok(self.mark_failed_sync(entry_id, failure, now)) })
	}

	fn mark_skipped<'a>(
		&'a self,
		entry_id: Uuid,
		summary: &'a Value,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move { Ok(self.finish_sync(entry_id, QueueStatus::Skipped, summary, None, now)) })
	}
}

impl AgentStore for InMemoryStore {
	fn memory_overrides<'a>(
		&'a self,
		agent_id: &'a str,
	) -> BoxFuture<'a, Result<Option<AgentOverrides>>> {
		Box::pin(async move { Ok(self.lock().agents.get(agent_id).cloned()) })
	}

	fn run_messages<'a>(&'a self, job_id: &'a str) -> BoxFuture<'a, Result<Vec<RunMessage>>> {
		Box::pin(async move { Ok(self.lock().runs.get(job_id).cloned().unwrap_or_default()) })
	}

	fn record_inference_call<'a>(&'a self, call: &'a InferenceCall) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut state = self.lock();
			let duplicate = state.inference_calls.iter().any(|existing| {
				existing.job_id == call.job_id
					&& existing.stage == call.stage
					&& existing.turn_number == call.turn_number
			});

			if !duplicate {
				state.inference_calls.push(call.clone());
			}

			Ok(())
		})
	}
}

fn processing_entry(state: &mut State, entry_id: Uuid) -> Option<&mut QueueEntry> {
	state
		.queue
		.iter_mut()
		.find(|entry| entry.entry_id == entry_id && entry.status == QueueStatus::Processing)
}

fn check_vector(vector: Option<&[f32]>) -> Result<()> {
	if vector.map(|values| values.iter().any(|value| !value.is_finite())).unwrap_or(false) {
		return Err(Error::InvalidArgument("Embedding values must be finite.".to_string()));
	}

	Ok(())
}
