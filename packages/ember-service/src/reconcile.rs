use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{MemoryService, Result};
use ember_domain::{
	MemoryKind,
	candidate::Candidate,
	keyword,
	reconcile::{self, MAX_NEIGHBORS, Neighbor, NeighborSignal, ReconcileAction},
};
use ember_storage::models::{Memory, QueueEntry};

pub const RECONCILE_STAGE: &str = "passive_memory_reconcile";
pub const RECONCILE_TURN_BASE: i32 = 20_000;

const RECONCILE_SYSTEM_PROMPT: &str = "\
You keep an agent's long-term memory free of duplicates and contradictions. Each new candidate \
memory comes with the most similar memories already stored. For every candidate decide:
- \"create\" when it adds knowledge none of the stored memories hold,
- \"update\" when it refines, corrects, or supersedes one stored memory (give its id as \
target_memory_id and write the merged memory as content),
- \"skip\" when a stored memory already says the same thing.

Reply with a JSON object of the form:
{\"decisions\": [{\"candidate_index\": number, \"action\": \"create\" | \"update\" | \"skip\", \
\"target_memory_id\": string or null, \"content\": string, \"reason\": string, \
\"confidence\": number between 0 and 1}]}";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetOrigin {
	/// Named by the extraction reply.
	Candidate,
	/// Proposed by reconciliation.
	Reconciler,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Target {
	pub memory_id: Uuid,
	pub origin: TargetOrigin,
}

/// A candidate after reconciliation, ready for the apply step.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolvedCandidate {
	pub candidate_index: usize,
	pub content: String,
	pub kind: MemoryKind,
	pub confidence: f32,
	pub reason: String,
	pub target: Option<Target>,
	/// Embedding of `content`, when one could be computed.
	#[serde(skip)]
	pub embedding: Option<Vec<f32>>,
	/// Reconciliation found nothing new in this candidate.
	pub skip: bool,
}
impl ResolvedCandidate {
	/// A candidate that passes through without a reconciliation decision.
	pub fn from_candidate(
		candidate_index: usize,
		candidate: &Candidate,
		embedding: Option<Vec<f32>>,
	) -> Self {
		Self {
			candidate_index,
			content: candidate.content.clone(),
			kind: candidate.kind,
			confidence: candidate.confidence,
			reason: candidate.reason.clone(),
			target: candidate
				.target_memory_id
				.map(|memory_id| Target { memory_id, origin: TargetOrigin::Candidate }),
			embedding,
			skip: false,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Reconciliation {
	pub candidates: Vec<ResolvedCandidate>,
	/// Whether the model was asked at all.
	pub consulted: bool,
}

impl MemoryService {
	/// Matches candidates against stored memories and asks the model to settle the ones that
	/// overlap. Candidates without any neighbor, or without a decision, pass through unchanged.
	pub async fn reconcile_candidates(
		&self,
		entry: &QueueEntry,
		candidates: &[Candidate],
		memories: &[Memory],
	) -> Result<Reconciliation> {
		let texts: Vec<String> = candidates.iter().map(|candidate| candidate.content.clone()).collect();
		let embeddings = self.embed_best_effort(&texts).await;
		let mut neighbor_sets = Vec::with_capacity(candidates.len());

		for (candidate, embedding) in candidates.iter().zip(&embeddings) {
			let mut signals = keyword_signals(&candidate.content, memories);

			if let Some(vector) = embedding.as_deref() {
				signals.extend(self.embedding_signals(&entry.agent_id, vector).await);
			}

			neighbor_sets.push(reconcile::select_neighbors(signals, MAX_NEIGHBORS));
		}

		let mut resolved: Vec<ResolvedCandidate> = candidates
			.iter()
			.zip(embeddings)
			.enumerate()
			.map(|(index, (candidate, embedding))| {
				ResolvedCandidate::from_candidate(index, candidate, embedding)
			})
			.collect();

		if neighbor_sets.iter().all(Vec::is_empty) {
			tracing::debug!(job_id = %entry.job_id, "No stored memory overlaps the candidates. Skipping reconciliation.");

			return Ok(Reconciliation { candidates: resolved, consulted: false });
		}

		let messages = reconcile_messages(candidates, &neighbor_sets);
		let completion = self.llm.complete(&messages).await?;

		self.record_inference(entry, RECONCILE_STAGE, RECONCILE_TURN_BASE, &completion).await;

		let allowed: Vec<HashSet<Uuid>> = neighbor_sets
			.iter()
			.map(|neighbors| neighbors.iter().map(|neighbor| neighbor.memory_id).collect())
			.collect();
		let decisions = reconcile::parse_reconcile_response(&completion.text, &allowed);

		tracing::info!(
			job_id = %entry.job_id,
			sent = allowed.iter().filter(|ids| !ids.is_empty()).count(),
			decided = decisions.len(),
			"Reconciled memory candidates."
		);

		for decision in decisions {
			let Some(item) = resolved.get_mut(decision.candidate_index) else { continue };
			let rewritten = decision.content.filter(|content| *content != item.content);

			if let Some(confidence) = decision.confidence {
				item.confidence = confidence;
			}
			if !decision.reason.is_empty() {
				item.reason = decision.reason;
			}

			match decision.action {
				ReconcileAction::Skip => item.skip = true,
				ReconcileAction::Create => item.target = None,
				ReconcileAction::Update =>
					item.target = decision
						.target_memory_id
						.map(|memory_id| Target { memory_id, origin: TargetOrigin::Reconciler }),
			}

			if let Some(content) = rewritten {
				item.content = content;
				item.embedding = self.embed_one(&item.content).await;
			}
		}

		Ok(Reconciliation { candidates: resolved, consulted: true })
	}

	async fn embedding_signals(&self, agent_id: &str, vector: &[f32]) -> Vec<NeighborSignal> {
		match self.store.find_similar(agent_id, vector, MAX_NEIGHBORS).await {
			Ok(hits) => hits
				.into_iter()
				.map(|hit| NeighborSignal {
					memory_id: hit.memory.memory_id,
					content: hit.memory.content,
					keyword: None,
					embedding: Some(hit.similarity),
				})
				.collect(),
			Err(err) => {
				tracing::warn!(agent_id, error = %err, "Similarity search failed. Using keyword matches only.");

				Vec::new()
			},
		}
	}
}

fn keyword_signals(content: &str, memories: &[Memory]) -> Vec<NeighborSignal> {
	let candidate_tokens = keyword::tokens(content);

	memories
		.iter()
		.filter_map(|memory| {
			let score = keyword::jaccard(&candidate_tokens, &keyword::tokens(&memory.content));

			(score > 0.0).then(|| NeighborSignal {
				memory_id: memory.memory_id,
				content: memory.content.clone(),
				keyword: Some(score),
				embedding: None,
			})
		})
		.collect()
}

fn reconcile_messages(candidates: &[Candidate], neighbor_sets: &[Vec<Neighbor>]) -> Vec<Value> {
	let items: Vec<Value> = candidates
		.iter()
		.zip(neighbor_sets)
		.enumerate()
		.filter(|(_, (_, neighbors))| !neighbors.is_empty())
		.map(|(index, (candidate, neighbors))| {
			json!({
				"candidate_index": index,
				"content": candidate.content,
				"kind": candidate.kind,
				"confidence": candidate.confidence,
				"reason": candidate.reason,
				"existing_memories": neighbors
					.iter()
					.map(|neighbor| json!({
						"memory_id": neighbor.memory_id,
						"content": neighbor.content,
						"similarity": neighbor.score,
					}))
					.collect::<Vec<_>>(),
			})
		})
		.collect();

	vec![
		json!({ "role": "system", "content": RECONCILE_SYSTEM_PROMPT }),
		json!({ "role": "user", "content": json!({ "candidates": items }).to_string() }),
	]
}

#[cfg(test)]
mod tests {
	use super::*;

	fn candidate(content: &str) -> Candidate {
		Candidate {
			content: content.to_string(),
			kind: MemoryKind::Fact,
			confidence: 0.9,
			reason: String::new(),
			target_memory_id: None,
		}
	}

	#[test]
	fn only_candidates_with_neighbors_are_sent() {
		let neighbor = Neighbor {
			memory_id: Uuid::nil(),
			content: "User prefers dark mode.".to_string(),
			score: 0.8,
		};
		let messages = reconcile_messages(
			&[candidate("Prefers dark mode."), candidate("Lives in Oslo.")],
			&[vec![neighbor], Vec::new()],
		);
		let payload: Value = serde_json::from_str(messages[1]["content"].as_str().expect("Text."))
			.expect("Payload is JSON.");
		let sent = payload["candidates"].as_array().expect("Candidate list.");

		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0]["candidate_index"], 0);
		assert_eq!(sent[0]["existing_memories"][0]["memory_id"], Uuid::nil().to_string());
	}
}
