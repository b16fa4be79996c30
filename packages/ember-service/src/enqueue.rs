use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{MemoryService, Result};
use ember_storage::models::{EnqueueOutcome, NewQueueEntry};

/// Post-run hook payload for one completed run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunCompleted {
	pub job_id: String,
	pub agent_id: String,
	#[serde(default)]
	pub work_item_id: Option<String>,
	#[serde(default)]
	pub dispatch_id: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum EnqueueResult {
	Enqueued { entry_id: Uuid },
	/// The run was already queued; nothing changed.
	Duplicate,
	/// Memory or passive updates are off for the agent; nothing was queued.
	Disabled,
}

impl MemoryService {
	/// Queues passive extraction for a completed run, at most once per `job_id`.
	pub async fn enqueue_run(&self, run: RunCompleted) -> Result<EnqueueResult> {
		let job_id = crate::trimmed_non_empty(&run.job_id, "job_id")?;
		let agent_id = crate::trimmed_non_empty(&run.agent_id, "agent_id")?;
		let settings = self.effective_settings(&agent_id).await?;

		if !settings.passive_enabled() {
			tracing::debug!(%agent_id, %job_id, "Passive memory updates are disabled. Not enqueuing.");

			return Ok(EnqueueResult::Disabled);
		}

		let outcome = self
			.store
			.enqueue(
				&NewQueueEntry {
					job_id: job_id.clone(),
					agent_id: agent_id.clone(),
					work_item_id: run.work_item_id,
					dispatch_id: run.dispatch_id,
					max_attempts: self.cfg.passive.max_attempts,
				},
				self.clock.now(),
			)
			.await?;

		Ok(match outcome {
			EnqueueOutcome::Inserted(entry_id) => {
				tracing::info!(%agent_id, %job_id, %entry_id, "Passive memory job enqueued.");

				EnqueueResult::Enqueued { entry_id }
			},
			EnqueueOutcome::Duplicate => {
				tracing::debug!(%agent_id, %job_id, "Passive memory job already enqueued.");

				EnqueueResult::Duplicate
			},
		})
	}
}
