use serde_json::Value;
use sqlx::{Row, postgres::PgRow};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
	Error, Result,
	db::Db,
	models::{
		EnqueueOutcome, FailureRecord, InferenceCall, Memory, MemoryPatch, NewMemory,
		NewQueueEntry, QueueEntry, QueueStatus, SimilarMemory, UpdateOutcome,
	},
	store::{AgentStore, MemoryStore, QueueStore},
};
use ember_domain::{
	BoxFuture, MAX_STRENGTH, MemoryKind, settings::AgentOverrides, transcript::RunMessage,
};

const MEMORY_COLUMNS: &str = "\
memory_id,
	agent_id,
	kind,
	content,
	embedding::text AS embedding,
	strength,
	access_count,
	permanent,
	version,
	last_accessed_at,
	created_at,
	updated_at";
const QUEUE_COLUMNS: &str = "\
entry_id,
	job_id,
	agent_id,
	work_item_id,
	dispatch_id,
	status,
	attempt_count,
	max_attempts,
	next_attempt_at,
	claimed_by,
	lease_expires_at,
	last_error,
	summary,
	started_at,
	completed_at,
	created_at";

/// Postgres-backed store. Embeddings live in an unconstrained pgvector column and travel as text.
#[derive(Clone)]
pub struct PgStore {
	db: Db,
}
impl PgStore {
	pub fn new(db: Db) -> Self {
		Self { db }
	}

	pub async fn put_agent_overrides(&self, agent_id: &str, overrides: &AgentOverrides) -> Result<()> {
		sqlx::query(
			"\
INSERT INTO agent_memory_settings (
	agent_id,
	memory_enabled,
	passive_updates,
	max_memories,
	min_strength,
	capacity
)
VALUES ($1, $2, $3, $4, $5, $6)
ON CONFLICT (agent_id) DO UPDATE
SET
	memory_enabled = EXCLUDED.memory_enabled,
	passive_updates = EXCLUDED.passive_updates,
	max_memories = EXCLUDED.max_memories,
	min_strength = EXCLUDED.min_strength,
	capacity = EXCLUDED.capacity",
		)
		.bind(agent_id)
		.bind(overrides.memory_enabled)
		.bind(overrides.passive_updates)
		.bind(overrides.max_memories.map(to_i32).transpose()?)
		.bind(overrides.min_strength)
		.bind(overrides.capacity.map(to_i32).transpose()?)
		.execute(&self.db.pool)
		.await?;

		Ok(())
	}

	/// Replaces the stored messages of one run.
	pub async fn put_run_messages(&self, job_id: &str, messages: &[RunMessage]) -> Result<()> {
		let mut tx = self.db.pool.begin().await?;

		sqlx::query("DELETE FROM run_messages WHERE job_id = $1")
			.bind(job_id)
			.execute(&mut *tx)
			.await?;

		for (seq, message) in messages.iter().enumerate() {
			sqlx::query(
				"INSERT INTO run_messages (job_id, seq, role, content) VALUES ($1, $2, $3, $4)",
			)
			.bind(job_id)
			.bind(to_i32(seq as u32)?)
			.bind(message.role.as_str())
			.bind(message.content.as_str())
			.execute(&mut *tx)
			.await?;
		}

		tx.commit().await?;

		Ok(())
	}

	async fn list_memories_impl(&self, agent_id: &str, min_strength: f32) -> Result<Vec<Memory>> {
		let sql = format!(
			"\
SELECT
	{MEMORY_COLUMNS}
FROM agent_memories
WHERE agent_id = $1
	AND strength >= $2
ORDER BY strength DESC, updated_at DESC, memory_id"
		);
		let rows = sqlx::query(&sql)
			.bind(agent_id)
			.bind(min_strength)
			.fetch_all(&self.db.pool)
			.await?;

		rows.iter().map(memory_from_row).collect()
	}

	async fn get_memory_impl(&self, memory_id: Uuid) -> Result<Option<Memory>> {
		let sql = format!("SELECT {MEMORY_COLUMNS} FROM agent_memories WHERE memory_id = $1");
		let row = sqlx::query(&sql).bind(memory_id).fetch_optional(&self.db.pool).await?;

		row.as_ref().map(memory_from_row).transpose()
	}

	async fn create_memory_impl(&self, memory: &NewMemory, now: OffsetDateTime) -> Result<Memory> {
		if memory.content.trim().is_empty() {
			return Err(Error::InvalidArgument("Memory content must be non-empty.".to_string()));
		}

		let embedding = memory.embedding.as_deref().map(format_vector).transpose()?;
		let sql = format!(
			"\
INSERT INTO agent_memories (
	memory_id,
	agent_id,
	kind,
	content,
	embedding,
	strength,
	access_count,
	permanent,
	version,
	last_accessed_at,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5::text::vector, $6, 0, $7, 1, NULL, $8, $8)
RETURNING
	{MEMORY_COLUMNS}"
		);
		let row = sqlx::query(&sql)
			.bind(Uuid::new_v4())
			.bind(memory.agent_id.as_str())
			.bind(memory.kind.as_str())
			.bind(memory.content.trim())
			.bind(embedding)
			.bind(memory.strength.clamp(0.0, MAX_STRENGTH))
			.bind(memory.permanent)
			.bind(now)
			.fetch_one(&self.db.pool)
			.await?;

		memory_from_row(&row)
	}

	async fn update_memory_impl(
		&self,
		memory_id: Uuid,
		patch: &MemoryPatch,
		expected_version: Option<i64>,
		now: OffsetDateTime,
	) -> Result<UpdateOutcome> {
		if patch.content.as_deref().map(|content| content.trim().is_empty()).unwrap_or(false) {
			return Err(Error::InvalidArgument("Memory content must be non-empty.".to_string()));
		}

		let embedding = match patch.embedding.as_ref() {
			Some(Some(vector)) => Some(format_vector(vector)?),
			_ => None,
		};
		let sql = format!(
			"\
UPDATE agent_memories
SET
	content = COALESCE($2, content),
	kind = COALESCE($3, kind),
	permanent = COALESCE($4, permanent),
	strength = COALESCE($5, strength),
	embedding = CASE WHEN $6 THEN $7::text::vector ELSE embedding END,
	version = version + 1,
	updated_at = $8
WHERE memory_id = $1
	AND ($9::bigint IS NULL OR version = $9)
RETURNING
	{MEMORY_COLUMNS}"
		);
		let row = sqlx::query(&sql)
			.bind(memory_id)
			.bind(patch.content.as_deref().map(str::trim))
			.bind(patch.kind.map(MemoryKind::as_str))
			.bind(patch.permanent)
			.bind(patch.strength.map(|strength| strength.clamp(0.0, MAX_STRENGTH)))
			.bind(patch.embedding.is_some())
			.bind(embedding)
			.bind(now)
			.bind(expected_version)
			.fetch_optional(&self.db.pool)
			.await?;

		if let Some(row) = row {
			return Ok(UpdateOutcome::Updated(memory_from_row(&row)?));
		}

		let current: Option<i64> =
			sqlx::query_scalar("SELECT version FROM agent_memories WHERE memory_id = $1")
				.bind(memory_id)
				.fetch_optional(&self.db.pool)
				.await?;

		Ok(match current {
			Some(current) => UpdateOutcome::VersionConflict { current },
			None => UpdateOutcome::NotFound,
		})
	}

	async fn delete_memory_impl(&self, memory_id: Uuid) -> Result<bool> {
		let result = sqlx::query("DELETE FROM agent_memories WHERE memory_id = $1")
			.bind(memory_id)
			.execute(&self.db.pool)
			.await?;

		Ok(result.rows_affected() > 0)
	}

	async fn reinforce_memory_impl(
		&self,
		memory_id: Uuid,
		amount: f32,
		now: OffsetDateTime,
	) -> Result<Option<Memory>> {
		let sql = format!(
			"\
UPDATE agent_memories
SET
	strength = LEAST(strength + $2, $3),
	access_count = access_count + 1,
	last_accessed_at = $4,
	version = version + 1,
	updated_at = $4
WHERE memory_id = $1
RETURNING
	{MEMORY_COLUMNS}"
		);
		let row = sqlx::query(&sql)
			.bind(memory_id)
			.bind(amount.max(0.0))
			.bind(MAX_STRENGTH)
			.bind(now)
			.fetch_optional(&self.db.pool)
			.await?;

		row.as_ref().map(memory_from_row).transpose()
	}

	async fn decay_memories_impl(&self, agent_id: &str, rate: f32) -> Result<u64> {
		let rate = rate.clamp(0.0, 1.0);

		if rate == 0.0 {
			return Ok(0);
		}

		let result = sqlx::query(
			"\
UPDATE agent_memories
SET strength = GREATEST(strength * (1 - $2), 0)
WHERE agent_id = $1
	AND NOT permanent
	AND strength > 0",
		)
		.bind(agent_id)
		.bind(rate)
		.execute(&self.db.pool)
		.await?;

		Ok(result.rows_affected())
	}

	async fn find_similar_impl(
		&self,
		agent_id: &str,
		vector: &[f32],
		limit: usize,
	) -> Result<Vec<SimilarMemory>> {
		if vector.is_empty() || limit == 0 {
			return Ok(Vec::new());
		}

		let sql = format!(
			"\
SELECT
	{MEMORY_COLUMNS},
	1 - (embedding <=> $2::text::vector) AS similarity
FROM agent_memories
WHERE agent_id = $1
	AND embedding IS NOT NULL
	AND vector_dims(embedding) = $3
ORDER BY embedding <=> $2::text::vector, memory_id
LIMIT $4"
		);
		let rows = sqlx::query(&sql)
			.bind(agent_id)
			.bind(format_vector(vector)?)
			.bind(to_i32(vector.len() as u32)?)
			.bind(limit as i64)
			.fetch_all(&self.db.pool)
			.await?;

		rows.iter()
			.map(|row| -> Result<SimilarMemory> {
				let similarity: Option<f64> = row.try_get("similarity")?;

				Ok(SimilarMemory {
					memory: memory_from_row(row)?,
					similarity: similarity.filter(|value| value.is_finite()).unwrap_or(0.0) as f32,
				})
			})
			.collect()
	}

	async fn enqueue_impl(&self, entry: &NewQueueEntry, now: OffsetDateTime) -> Result<EnqueueOutcome> {
		let inserted: Option<Uuid> = sqlx::query_scalar(
			"\
INSERT INTO passive_memory_queue (
	entry_id,
	job_id,
	agent_id,
	work_item_id,
	dispatch_id,
	status,
	attempt_count,
	max_attempts,
	next_attempt_at,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, 'pending', 0, $6, $7, $7, $7)
ON CONFLICT (job_id) DO NOTHING
RETURNING entry_id",
		)
		.bind(Uuid::new_v4())
		.bind(entry.job_id.as_str())
		.bind(entry.agent_id.as_str())
		.bind(entry.work_item_id.as_deref())
		.bind(entry.dispatch_id.as_deref())
		.bind(entry.max_attempts.max(1))
		.bind(now)
		.fetch_optional(&self.db.pool)
		.await?;

		Ok(match inserted {
			Some(entry_id) => EnqueueOutcome::Inserted(entry_id),
			None => EnqueueOutcome::Duplicate,
		})
	}

	async fn claim_next_impl(
		&self,
		worker_id: &str,
		lease_seconds: i64,
		now: OffsetDateTime,
	) -> Result<Option<QueueEntry>> {
		if lease_seconds <= 0 {
			return Err(Error::InvalidArgument("Lease must be longer than zero seconds.".to_string()));
		}

		let row = sqlx::query(
			"\
UPDATE passive_memory_queue AS q
SET
	status = 'processing',
	claimed_by = $1,
	lease_expires_at = $3,
	attempt_count = q.attempt_count + 1,
	started_at = $2,
	updated_at = $2
FROM (
	SELECT entry_id
	FROM passive_memory_queue
	WHERE (status = 'pending' AND next_attempt_at <= $2)
		OR (status = 'processing' AND lease_expires_at <= $2)
	ORDER BY next_attempt_at, created_at
	LIMIT 1
	FOR UPDATE SKIP LOCKED
) AS next
WHERE q.entry_id = next.entry_id
RETURNING q.*",
		)
		.bind(worker_id)
		.bind(now)
		.bind(now + Duration::seconds(lease_seconds))
		.fetch_optional(&self.db.pool)
		.await?;

		row.as_ref().map(queue_entry_from_row).transpose()
	}

	async fn get_entry_impl(&self, entry_id: Uuid) -> Result<Option<QueueEntry>> {
		let sql = format!("SELECT {QUEUE_COLUMNS} FROM passive_memory_queue WHERE entry_id = $1");
		let row = sqlx::query(&sql).bind(entry_id).fetch_optional(&self.db.pool).await?;

		row.as_ref().map(queue_entry_from_row).transpose()
	}

	async fn finish_impl(
		&self,
		entry_id: Uuid,
		status: QueueStatus,
		summary: &Value,
		last_error: Option<&str>,
		now: OffsetDateTime,
	) -> Result<bool> {
		let result = sqlx::query(
			"\
UPDATE passive_memory_queue
SET
	status = $2,
	summary = $3,
	last_error = COALESCE($4, last_error),
	lease_expires_at = NULL,
	completed_at = $5,
	updated_at = $5
WHERE entry_id = $1
	AND status = 'processing'",
		)
		.bind(entry_id)
		.bind(status.as_str())
		.bind(summary)
		.bind(last_error)
		.bind(now)
		.execute(&self.db.pool)
		.await?;

		Ok(result.rows_affected() > 0)
	}

	async fn mark_failed_impl(
		&self,
		entry_id: Uuid,
		failure: &FailureRecord,
		now: OffsetDateTime,
	) -> Result<bool> {
		let Some(retry_at) = failure.retry_at else {
			return self
				.finish_impl(
					entry_id,
					QueueStatus::Failed,
					&failure.summary,
					Some(failure.error.as_str()),
					now,
				)
				.await;
		};
		let result = sqlx::query(
			"\
UPDATE passive_memory_queue
SET
	status = 'pending',
	next_attempt_at = $2,
	claimed_by = NULL,
	lease_expires_at = NULL,
	last_error = $3,
	summary = $4,
	updated_at = $5
WHERE entry_id = $1
	AND status = 'processing'",
		)
		.bind(entry_id)
		.bind(retry_at)
		.bind(failure.error.as_str())
		.bind(&failure.summary)
		.bind(now)
		.execute(&self.db.pool)
		.await?;

		Ok(result.rows_affected() > 0)
	}

	async fn memory_overrides_impl(&self, agent_id: &str) -> Result<Option<AgentOverrides>> {
		let row = sqlx::query(
			"\
SELECT
	memory_enabled,
	passive_updates,
	max_memories,
	min_strength,
	capacity
FROM agent_memory_settings
WHERE agent_id = $1",
		)
		.bind(agent_id)
		.fetch_optional(&self.db.pool)
		.await?;
		let Some(row) = row else { return Ok(None) };
		let max_memories: Option<i32> = row.try_get("max_memories")?;
		let capacity: Option<i32> = row.try_get("capacity")?;

		Ok(Some(AgentOverrides {
			memory_enabled: row.try_get("memory_enabled")?,
			passive_updates: row.try_get("passive_updates")?,
			max_memories: max_memories.and_then(|value| u32::try_from(value).ok()),
			min_strength: row.try_get("min_strength")?,
			capacity: capacity.and_then(|value| u32::try_from(value).ok()),
		}))
	}

	async fn run_messages_impl(&self, job_id: &str) -> Result<Vec<RunMessage>> {
		let rows: Vec<(String, String)> = sqlx::query_as(
			"SELECT role, content FROM run_messages WHERE job_id = $1 ORDER BY seq",
		)
		.bind(job_id)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(rows.into_iter().map(|(role, content)| RunMessage { role, content }).collect())
	}

	async fn record_inference_call_impl(&self, call: &InferenceCall) -> Result<()> {
		sqlx::query(
			"\
INSERT INTO inference_calls (
	call_id,
	agent_id,
	job_id,
	work_item_id,
	dispatch_id,
	stage,
	turn_number,
	model,
	prompt_tokens,
	completion_tokens,
	cost,
	created_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
ON CONFLICT (job_id, stage, turn_number) DO NOTHING",
		)
		.bind(call.call_id)
		.bind(call.agent_id.as_str())
		.bind(call.job_id.as_str())
		.bind(call.work_item_id.as_deref())
		.bind(call.dispatch_id.as_deref())
		.bind(call.stage.as_str())
		.bind(call.turn_number)
		.bind(call.model.as_str())
		.bind(call.prompt_tokens)
		.bind(call.completion_tokens)
		.bind(call.cost)
		.bind(call.created_at)
		.execute(&self.db.pool)
		.await?;

		Ok(())
	}
}

impl MemoryStore for PgStore {
	fn list_memories<'a>(
		&'a self,
		agent_id: &'a str,
		min_strength: f32,
	) -> BoxFuture<'a, Result<Vec<Memory>>> {
		Box::pin(self.list_memories_impl(agent_id, min_strength))
	}

	fn get_memory(&self, memory_id: Uuid) -> BoxFuture<'_, Result<Option<Memory>>> {
		Box::pin(self.get_memory_impl(memory_id))
	}

	fn create_memory<'a>(
		&'a self,
		memory: &'a NewMemory,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Memory>> {
		Box::pin(self.create_memory_impl(memory, now))
	}

	fn update_memory<'a>(
		&'a self,
		memory_id: Uuid,
		patch: &'a MemoryPatch,
		expected_version: Option<i64>,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<UpdateOutcome>> {
		Box::pin(self.update_memory_impl(memory_id, patch, expected_version, now))
	}

	fn delete_memory(&self, memory_id: Uuid) -> BoxFuture<'_, Result<bool>> {
		Box::pin(self.delete_memory_impl(memory_id))
	}

	fn reinforce_memory(
		&self,
		memory_id: Uuid,
		amount: f32,
		now: OffsetDateTime,
	) -> BoxFuture<'_, Result<Option<Memory>>> {
		Box::pin(self.reinforce_memory_impl(memory_id, amount, now))
	}

	fn decay_memories<'a>(&'a self, agent_id: &'a str, rate: f32) -> BoxFuture<'a, Result<u64>> {
		Box::pin(self.decay_memories_impl(agent_id, rate))
	}

	fn find_similar<'a>(
		&'a self,
		agent_id: &'a str,
		vector: &'a [f32],
		limit: usize,
	) -> BoxFuture<'a, Result<Vec<SimilarMemory>>> {
		Box::pin(self.find_similar_impl(agent_id, vector, limit))
	}
}

impl QueueStore for PgStore {
	fn enqueue<'a>(
		&'a self,
		entry: &'a NewQueueEntry,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<EnqueueOutcome>> {
		Box::pin(self.enqueue_impl(entry, now))
	}

	fn claim_next<'a>(
		&'a self,
		worker_id: &'a str,
		lease_seconds: i64,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Option<QueueEntry>>> {
		Box::pin(self.claim_next_impl(worker_id, lease_seconds, now))
	}

	fn get_entry(&self, entry_id: Uuid) -> BoxFuture<'_, Result<Option<QueueEntry>>> {
		Box::pin(self.get_entry_impl(entry_id))
	}

	fn mark_completed<'a>(
		&'a self,
		entry_id: Uuid,
		summary: &'a Value,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(self.finish_impl(entry_id, QueueStatus::Completed, summary, None, now))
	}

	fn mark_failed<'a>(
		&'a self,
		entry_id: Uuid,
		failure: &'a FailureRecord,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(self.mark_failed_impl(entry_id, failure, now))
	}

	fn mark_skipped<'a>(
		&'a self,
		entry_id: Uuid,
		summary: &'a Value,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(self.finish_impl(entry_id, QueueStatus::Skipped, summary, None, now))
	}
}

impl AgentStore for PgStore {
	fn memory_overrides<'a>(
		&'a self,
		agent_id: &'a str,
	) -> BoxFuture<'a, Result<Option<AgentOverrides>>> {
		Box::pin(self.memory_overrides_impl(agent_id))
	}

	fn run_messages<'a>(&'a self, job_id: &'a str) -> BoxFuture<'a, Result<Vec<RunMessage>>> {
		Box::pin(self.run_messages_impl(job_id))
	}

	fn record_inference_call<'a>(&'a self, call: &'a InferenceCall) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.record_inference_call_impl(call))
	}
}

/// pgvector text form, e.g. `[0.1,0.2]`.
pub fn format_vector(vector: &[f32]) -> Result<String> {
	if vector.iter().any(|value| !value.is_finite()) {
		return Err(Error::InvalidArgument("Embedding values must be finite.".to_string()));
	}

	let parts: Vec<String> = vector.iter().map(|value| value.to_string()).collect();

	Ok(format!("[{}]", parts.join(",")))
}

pub fn parse_vector(raw: &str) -> Result<Vec<f32>> {
	let inner = raw
		.trim()
		.strip_prefix('[')
		.and_then(|rest| rest.strip_suffix(']'))
		.ok_or_else(|| Error::Corrupt(format!("Embedding text {raw:?} is not a vector literal.")))?;

	if inner.trim().is_empty() {
		return Ok(Vec::new());
	}

	inner
		.split(',')
		.map(|part| {
			part.trim()
				.parse::<f32>()
				.map_err(|err| Error::Corrupt(format!("Embedding component {part:?} is invalid: {err}.")))
		})
		.collect()
}

fn memory_from_row(row: &PgRow) -> Result<Memory> {
	let kind: String = row.try_get("kind")?;
	let embedding: Option<String> = row.try_get("embedding")?;

	Ok(Memory {
		memory_id: row.try_get("memory_id")?,
		agent_id: row.try_get("agent_id")?,
		kind: kind.parse::<MemoryKind>().map_err(Error::Corrupt)?,
		content: row.try_get("content")?,
		embedding: embedding.as_deref().map(parse_vector).transpose()?,
		strength: row.try_get("strength")?,
		access_count: row.try_get("access_count")?,
		permanent: row.try_get("permanent")?,
		version: row.try_get("version")?,
		last_accessed_at: row.try_get("last_accessed_at")?,
		created_at: row.try_get("created_at")?,
		updated_at: row.try_get("updated_at")?,
	})
}

fn queue_entry_from_row(row: &PgRow) -> Result<QueueEntry> {
	let status: String = row.try_get("status")?;

	Ok(QueueEntry {
		entry_id: row.try_get("entry_id")?,
		job_id: row.try_get("job_id")?,
		agent_id: row.try_get("agent_id")?,
		work_item_id: row.try_get("work_item_id")?,
		dispatch_id: row.try_get("dispatch_id")?,
		status: status.parse::<QueueStatus>().map_err(Error::Corrupt)?,
		attempt_count: row.try_get("attempt_count")?,
		max_attempts: row.try_get("max_attempts")?,
		next_attempt_at: row.try_get("next_attempt_at")?,
		claimed_by: row.try_get("claimed_by")?,
		lease_expires_at: row.try_get("lease_expires_at")?,
		last_error: row.try_get("last_error")?,
		summary: row.try_get("summary")?,
		started_at: row.try_get("started_at")?,
		completed_at: row.try_get("completed_at")?,
		created_at: row.try_get("created_at")?,
	})
}

fn to_i32(value: u32) -> Result<i32> {
	i32::try_from(value)
		.map_err(|_| Error::InvalidArgument(format!("Value {value} does not fit in a 32-bit column.")))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn vector_text_form_is_pgvector_literal() {
		assert_eq!(format_vector(&[0.5, -1.0, 2.25]).expect("Finite vector."), "[0.5,-1,2.25]");
		assert_eq!(parse_vector("[0.5,-1,2.25]").expect("Valid literal."), vec![0.5, -1.0, 2.25]);
		assert_eq!(parse_vector("[]").expect("Empty literal."), Vec::<f32>::new());
	}

	#[test]
	fn rejects_non_finite_and_garbage_vectors() {
		assert!(format_vector(&[f32::NAN]).is_err());
		assert!(parse_vector("0.1,0.2").is_err());
		assert!(parse_vector("[0.1,abc]").is_err());
	}
}
