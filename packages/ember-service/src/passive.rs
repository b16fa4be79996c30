use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{ApplyCounts, ApplySummary, MemoryService, Result};
use ember_domain::{candidate::ParseFailure, transcript};
use ember_storage::models::QueueEntry;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassiveSkip {
	AgentMissing,
	PassiveUpdatesDisabled,
	NoExtractableMessages,
}
impl PassiveSkip {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::AgentMissing => "agent_missing",
			Self::PassiveUpdatesDisabled => "passive_updates_disabled",
			Self::NoExtractableMessages => "no_extractable_messages",
		}
	}

	pub fn summary(self) -> Value {
		json!({ "skipped": self.as_str() })
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PassiveSummary {
	pub candidates: usize,
	pub parse_failures: Vec<ParseFailure>,
	/// Valid candidates dropped by the per-reply cap.
	pub overflow: usize,
	pub reconciled: bool,
	#[serde(flatten)]
	pub apply: ApplySummary,
}
impl PassiveSummary {
	/// The stored queue summary: every field plus per-outcome counts.
	pub fn to_value(&self) -> Value {
		let stored = StoredSummary { summary: self, counts: self.apply.counts() };

		serde_json::to_value(stored).unwrap_or_else(|err| {
			json!({ "error": format!("Failed to encode summary: {err}.") })
		})
	}
}

#[derive(Serialize)]
struct StoredSummary<'a> {
	#[serde(flatten)]
	summary: &'a PassiveSummary,
	#[serde(flatten)]
	counts: ApplyCounts,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PassiveOutcome {
	Completed(PassiveSummary),
	Skipped(PassiveSkip),
}

impl MemoryService {
	/// Runs the whole passive pipeline for one claimed entry: transcript, extraction,
	/// reconciliation, then apply.
	pub async fn process_entry(&self, entry: &QueueEntry) -> Result<PassiveOutcome> {
		let Some(settings) = self.agent_settings(&entry.agent_id).await? else {
			return Ok(PassiveOutcome::Skipped(PassiveSkip::AgentMissing));
		};

		if !settings.passive_enabled() {
			return Ok(PassiveOutcome::Skipped(PassiveSkip::PassiveUpdatesDisabled));
		}

		let messages = self.store.run_messages(&entry.job_id).await?;
		let budget = transcript::char_budget(
			self.cfg.passive.transcript_token_budget,
			self.cfg.passive.chars_per_token,
		);
		let Some(transcript) = transcript::build_transcript(&messages, budget) else {
			return Ok(PassiveOutcome::Skipped(PassiveSkip::NoExtractableMessages));
		};
		let parsed = self.extract_candidates(entry, &transcript).await?;
		let mut summary = PassiveSummary {
			candidates: parsed.candidates.len(),
			parse_failures: parsed.failures,
			overflow: parsed.overflow,
			..Default::default()
		};

		if parsed.candidates.is_empty() {
			return Ok(PassiveOutcome::Completed(summary));
		}

		let memories = self.store.list_memories(&entry.agent_id, 0.0).await?;
		let reconciliation = self.reconcile_candidates(entry, &parsed.candidates, &memories).await?;

		summary.reconciled = reconciliation.consulted;
		summary.apply = self
			.apply_candidates(&entry.agent_id, &settings, reconciliation.candidates, memories)
			.await?;

		Ok(PassiveOutcome::Completed(summary))
	}
}
