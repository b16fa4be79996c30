use serde_json::{Value, json};
use uuid::Uuid;

use crate::{MemoryService, Result};
use ember_domain::candidate::{self, ExtractionParse, MAX_CANDIDATES};
use ember_providers::Completion;
use ember_storage::models::{InferenceCall, QueueEntry};

pub const EXTRACTION_STAGE: &str = "passive_memory_extraction";
/// Audit turn numbers are `base + attempt_count`, so each attempt gets its own row.
pub const EXTRACTION_TURN_BASE: i32 = 10_000;

const EXTRACTION_SYSTEM_PROMPT: &str = "\
You maintain the long-term memory of an autonomous agent. Read the conversation and extract only \
durable, reusable knowledge that will still matter in future conversations: facts about the user \
or their environment, decisions that were made, the state of ongoing tasks, and corrections to \
earlier beliefs.

Do not extract transient status updates, the assistant's own phrasing or plans for this turn, \
greetings, or conversational filler. Prefer fewer, precise memories over many vague ones. Write \
each memory as one self-contained sentence.

Reply with a JSON object of the form:
{\"memories\": [{\"content\": string, \"kind\": \"fact\" | \"task\" | \"digest\", \
\"confidence\": number between 0 and 1, \"reason\": string}]}

Use \"fact\" for stable knowledge, \"task\" for work that is still in progress, and \"digest\" for \
a short summary of a longer exchange. Return {\"memories\": []} when nothing qualifies.";

impl MemoryService {
	/// One extraction call for a claimed entry. Provider errors propagate; bad replies do not.
	pub async fn extract_candidates(
		&self,
		entry: &QueueEntry,
		transcript: &str,
	) -> Result<ExtractionParse> {
		let messages = extraction_messages(transcript);
		let completion = self.llm.complete(&messages).await?;

		self.record_inference(entry, EXTRACTION_STAGE, EXTRACTION_TURN_BASE, &completion).await;

		let parsed = candidate::parse_extraction_response(&completion.text);

		if !parsed.failures.is_empty() || parsed.overflow > 0 {
			tracing::warn!(
				job_id = %entry.job_id,
				failures = ?parsed.failures,
				overflow = parsed.overflow,
				limit = MAX_CANDIDATES,
				"Dropped extraction rows."
			);
		}

		tracing::info!(
			job_id = %entry.job_id,
			candidates = parsed.candidates.len(),
			"Extracted memory candidates."
		);

		Ok(parsed)
	}

	/// Audit rows are best-effort; a failed insert never fails the job.
	pub(crate) async fn record_inference(
		&self,
		entry: &QueueEntry,
		stage: &str,
		turn_base: i32,
		completion: &Completion,
	) {
		let call = InferenceCall {
			call_id: Uuid::new_v4(),
			agent_id: entry.agent_id.clone(),
			job_id: entry.job_id.clone(),
			work_item_id: entry.work_item_id.clone(),
			dispatch_id: entry.dispatch_id.clone(),
			stage: stage.to_string(),
			turn_number: turn_base.saturating_add(entry.attempt_count),
			model: completion.model.clone(),
			prompt_tokens: i64::try_from(completion.usage.prompt_tokens).unwrap_or(i64::MAX),
			completion_tokens: i64::try_from(completion.usage.completion_tokens).unwrap_or(i64::MAX),
			cost: completion.usage.cost,
			created_at: self.clock.now(),
		};

		if let Err(err) = self.store.record_inference_call(&call).await {
			tracing::warn!(job_id = %entry.job_id, stage, error = %err, "Failed to record inference call.");
		}
	}
}

fn extraction_messages(transcript: &str) -> Vec<Value> {
	vec![
		json!({ "role": "system", "content": EXTRACTION_SYSTEM_PROMPT }),
		json!({
			"role": "user",
			"content": format!("Conversation transcript:\n\n{transcript}"),
		}),
	]
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn transcript_goes_into_the_user_turn() {
		let messages = extraction_messages("User: I prefer dark mode.");

		assert_eq!(messages.len(), 2);
		assert_eq!(messages[0]["role"], "system");
		assert!(messages[1]["content"].as_str().is_some_and(|text| text.ends_with("I prefer dark mode.")));
	}
}
