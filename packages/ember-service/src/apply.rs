use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{MemoryService, ResolvedCandidate, Result, TargetOrigin};
use ember_domain::{
	candidate::MIN_APPLY_CONFIDENCE,
	eviction, scoring,
	settings::MemorySettings,
};
use ember_storage::models::{Memory, MemoryPatch, NewMemory, UpdateOutcome};

/// Embedding similarity at which a candidate rewrites an existing memory instead of adding one.
pub const SIMILAR_UPDATE_THRESHOLD: f32 = 0.85;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
	LowConfidence,
	DuplicateCandidate,
	UpdateFailed,
	TargetMemoryNotFoundFallback,
	MemoryFullAllPermanent,
	ReconcilerSkip,
}
impl SkipReason {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::LowConfidence => "low_confidence",
			Self::DuplicateCandidate => "duplicate_candidate",
			Self::UpdateFailed => "update_failed",
			Self::TargetMemoryNotFoundFallback => "target_memory_not_found_fallback",
			Self::MemoryFullAllPermanent => "memory_full_all_permanent",
			Self::ReconcilerSkip => "reconciler_skip",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedCandidate {
	pub candidate_index: usize,
	pub reason: SkipReason,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplySummary {
	pub created: Vec<Uuid>,
	pub updated: Vec<Uuid>,
	pub evicted: Vec<Uuid>,
	pub skipped: Vec<SkippedCandidate>,
}
impl ApplySummary {
	pub fn counts(&self) -> ApplyCounts {
		ApplyCounts {
			created_count: self.created.len(),
			updated_count: self.updated.len(),
			evicted_count: self.evicted.len(),
			skipped_count: self.skipped.len(),
		}
	}

	fn skip(&mut self, candidate_index: usize, reason: SkipReason) {
		tracing::info!(candidate_index, reason = reason.as_str(), "Memory candidate skipped.");

		self.skipped.push(SkippedCandidate { candidate_index, reason });
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ApplyCounts {
	pub created_count: usize,
	pub updated_count: usize,
	pub evicted_count: usize,
	pub skipped_count: usize,
}

/// Why a targeted update did not land.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TargetFailure {
	Missing,
	Rejected,
}
impl TargetFailure {
	fn reason(self) -> SkipReason {
		match self {
			Self::Missing => SkipReason::TargetMemoryNotFoundFallback,
			Self::Rejected => SkipReason::UpdateFailed,
		}
	}
}

/// The agent's memories as this batch sees them. Not re-read between candidates.
struct Snapshot {
	memories: Vec<Memory>,
}
impl Snapshot {
	fn get(&self, memory_id: Uuid) -> Option<&Memory> {
		self.memories.iter().find(|memory| memory.memory_id == memory_id)
	}

	fn upsert(&mut self, memory: Memory) {
		match self.memories.iter_mut().find(|existing| existing.memory_id == memory.memory_id) {
			Some(existing) => *existing = memory,
			None => self.memories.push(memory),
		}
	}

	fn remove(&mut self, memory_id: Uuid) {
		self.memories.retain(|memory| memory.memory_id != memory_id);
	}

	fn most_similar(&self, vector: &[f32]) -> Option<(&Memory, f32)> {
		self.memories
			.iter()
			.filter_map(|memory| {
				let stored = memory.embedding.as_deref()?;

				scoring::cosine_similarity(vector, stored).map(|similarity| (memory, similarity))
			})
			.max_by(|a, b| a.1.total_cmp(&b.1))
	}
}

impl MemoryService {
	/// Commits resolved candidates in order against one snapshot of the agent's memories,
	/// evicting the weakest unpinned memory whenever a creation would exceed capacity.
	pub async fn apply_candidates(
		&self,
		agent_id: &str,
		settings: &MemorySettings,
		resolved: Vec<ResolvedCandidate>,
		memories: Vec<Memory>,
	) -> Result<ApplySummary> {
		let mut snapshot = Snapshot { memories };
		let mut summary = ApplySummary::default();
		let mut accepted: HashSet<String> = HashSet::new();

		for candidate in resolved {
			let index = candidate.candidate_index;

			if candidate.skip {
				summary.skip(index, SkipReason::ReconcilerSkip);

				continue;
			}
			if candidate.confidence < MIN_APPLY_CONFIDENCE {
				summary.skip(index, SkipReason::LowConfidence);

				continue;
			}
			if accepted.contains(candidate.content.as_str()) {
				summary.skip(index, SkipReason::DuplicateCandidate);

				continue;
			}

			if let Some(target) = candidate.target {
				match self.update_target(&mut snapshot, agent_id, target.memory_id, &candidate, settings).await? {
					Ok(memory_id) => {
						summary.updated.push(memory_id);
						accepted.insert(candidate.content);

						continue;
					},
					Err(failure) => match target.origin {
						TargetOrigin::Candidate => {
							summary.skip(index, failure.reason());

							continue;
						},
						TargetOrigin::Reconciler => {
							tracing::info!(
								agent_id,
								memory_id = %target.memory_id,
								reason = failure.reason().as_str(),
								"Reconciled update target failed. Treating the candidate as new."
							);
						},
					},
				}
			}

			let similar = candidate.embedding.as_deref().and_then(|vector| {
				snapshot
					.most_similar(vector)
					.filter(|(_, similarity)| *similarity >= SIMILAR_UPDATE_THRESHOLD)
					.map(|(memory, _)| memory.memory_id)
			});

			if let Some(memory_id) = similar {
				match self.update_target(&mut snapshot, agent_id, memory_id, &candidate, settings).await? {
					Ok(memory_id) => {
						summary.updated.push(memory_id);
						accepted.insert(candidate.content);

						continue;
					},
					Err(failure) => {
						tracing::info!(
							agent_id,
							%memory_id,
							reason = failure.reason().as_str(),
							"Similar memory could not be updated. Creating a new one."
						);
					},
				}
			}

			let mut full = false;

			while eviction::at_capacity(snapshot.memories.len(), settings.capacity) {
				let Some(victim) = eviction::select_victim(&snapshot.memories).map(|memory| memory.memory_id)
				else {
					full = true;

					break;
				};

				if self.store.delete_memory(victim).await? {
					tracing::info!(agent_id, memory_id = %victim, "Evicted weakest memory.");

					summary.evicted.push(victim);
				}

				snapshot.remove(victim);
			}

			if full {
				summary.skip(index, SkipReason::MemoryFullAllPermanent);

				continue;
			}

			let created = self
				.store
				.create_memory(
					&NewMemory {
						agent_id: agent_id.to_string(),
						kind: candidate.kind,
						content: candidate.content.clone(),
						embedding: candidate.embedding.clone(),
						strength: candidate.kind.initial_strength(),
						permanent: false,
					},
					self.clock.now(),
				)
				.await?;

			tracing::info!(agent_id, memory_id = %created.memory_id, kind = %created.kind, "Memory created.");

			summary.created.push(created.memory_id);
			snapshot.upsert(created);
			accepted.insert(candidate.content);
		}

		Ok(summary)
	}

	/// Rewrites one memory with the candidate and reinforces it. The outer `Result` carries
	/// storage errors; the inner one says whether the update landed.
	async fn update_target(
		&self,
		snapshot: &mut Snapshot,
		agent_id: &str,
		memory_id: Uuid,
		candidate: &ResolvedCandidate,
		settings: &MemorySettings,
	) -> Result<Result<Uuid, TargetFailure>> {
		let known_version = match snapshot.get(memory_id) {
			Some(memory) => Some(memory.version),
			None => self
				.store
				.get_memory(memory_id)
				.await?
				.filter(|memory| memory.agent_id == agent_id)
				.map(|memory| memory.version),
		};
		let Some(known_version) = known_version else { return Ok(Err(TargetFailure::Missing)) };
		let patch = MemoryPatch {
			content: Some(candidate.content.clone()),
			embedding: Some(candidate.embedding.clone()),
			kind: Some(candidate.kind),
			..Default::default()
		};
		let updated = match self.update_with_fallback(memory_id, &patch, known_version).await? {
			UpdateOutcome::Updated(memory) => memory,
			UpdateOutcome::NotFound => {
				snapshot.remove(memory_id);

				return Ok(Err(TargetFailure::Missing));
			},
			UpdateOutcome::VersionConflict { .. } => return Ok(Err(TargetFailure::Rejected)),
		};
		let reinforced = self
			.store
			.reinforce_memory(memory_id, settings.reinforce_amount, self.clock.now())
			.await?
			.unwrap_or(updated);

		tracing::info!(agent_id, %memory_id, version = reinforced.version, "Memory updated from candidate.");

		snapshot.upsert(reinforced);

		Ok(Ok(memory_id))
	}

	/// Version-checked update first. Only a version conflict earns an unconditioned retry.
	async fn update_with_fallback(
		&self,
		memory_id: Uuid,
		patch: &MemoryPatch,
		known_version: i64,
	) -> Result<UpdateOutcome> {
		let now = self.clock.now();
		let checked = self.store.update_memory(memory_id, patch, Some(known_version), now).await?;
		let UpdateOutcome::VersionConflict { current } = checked else { return Ok(checked) };

		tracing::debug!(%memory_id, known_version, current, "Snapshot version is stale. Retrying without a version check.");

		Ok(self.store.update_memory(memory_id, patch, None, now).await?)
	}
}
