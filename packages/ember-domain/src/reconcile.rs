use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::model_json;

pub const KEYWORD_ADMIT_THRESHOLD: f32 = 0.35;
pub const EMBEDDING_ADMIT_THRESHOLD: f32 = 0.72;
pub const COMBINED_ADMIT_THRESHOLD: f32 = 0.70;
pub const MAX_NEIGHBORS: usize = 3;

/// One existing memory seen by either similarity signal.
#[derive(Clone, Debug, PartialEq)]
pub struct NeighborSignal {
	pub memory_id: Uuid,
	pub content: String,
	pub keyword: Option<f32>,
	pub embedding: Option<f32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
	pub memory_id: Uuid,
	pub content: String,
	pub score: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileAction {
	Create,
	Update,
	Skip,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReconcileResolution {
	pub candidate_index: usize,
	pub action: ReconcileAction,
	pub target_memory_id: Option<Uuid>,
	pub content: Option<String>,
	pub reason: String,
	pub confidence: Option<f32>,
}

pub fn admits(keyword: Option<f32>, embedding: Option<f32>) -> bool {
	let keyword = keyword.unwrap_or(0.0);
	let embedding = embedding.unwrap_or(0.0);

	keyword >= KEYWORD_ADMIT_THRESHOLD
		|| embedding >= EMBEDDING_ADMIT_THRESHOLD
		|| keyword.max(embedding) >= COMBINED_ADMIT_THRESHOLD
}

/// Merges both signals per memory id, keeps admitted ids, and returns the strongest `limit`.
pub fn select_neighbors(signals: Vec<NeighborSignal>, limit: usize) -> Vec<Neighbor> {
	let mut merged: HashMap<Uuid, NeighborSignal> = HashMap::new();

	for signal in signals {
		match merged.get_mut(&signal.memory_id) {
			Some(existing) => {
				existing.keyword = max_option(existing.keyword, signal.keyword);
				existing.embedding = max_option(existing.embedding, signal.embedding);
			},
			None => {
				merged.insert(signal.memory_id, signal);
			},
		}
	}

	let mut neighbors: Vec<Neighbor> = merged
		.into_values()
		.filter(|signal| admits(signal.keyword, signal.embedding))
		.map(|signal| Neighbor {
			memory_id: signal.memory_id,
			content: signal.content,
			score: signal.keyword.unwrap_or(0.0).max(signal.embedding.unwrap_or(0.0)),
		})
		.collect();

	neighbors.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.memory_id.cmp(&b.memory_id)));
	neighbors.truncate(limit);

	neighbors
}

/// Reads one decision per candidate. Rows that are malformed, out of range, duplicated, or that
/// target a memory outside the candidate's neighbor set are ignored.
///
/// `neighbor_ids[i]` lists the memories shown to the model for candidate `i`; an empty entry means
/// the candidate was not part of the request.
pub fn parse_reconcile_response(text: &str, neighbor_ids: &[HashSet<Uuid>]) -> Vec<ReconcileResolution> {
	let Some(document) = model_json::extract_json(text) else { return Vec::new() };
	let rows = match &document {
		Value::Array(rows) => rows.as_slice(),
		Value::Object(object) =>
			match object.get("decisions").or_else(|| object.get("resolutions")).and_then(Value::as_array)
			{
				Some(rows) => rows.as_slice(),
				None => return Vec::new(),
			},
		_ => return Vec::new(),
	};
	let mut seen = HashSet::new();
	let mut out = Vec::new();

	for row in rows {
		let Some(resolution) = parse_resolution(row) else { continue };
		let Some(allowed) = neighbor_ids.get(resolution.candidate_index) else { continue };

		if allowed.is_empty() {
			continue;
		}
		if resolution.action == ReconcileAction::Update
			&& !resolution.target_memory_id.map(|id| allowed.contains(&id)).unwrap_or(false)
		{
			continue;
		}
		if !seen.insert(resolution.candidate_index) {
			continue;
		}

		out.push(resolution);
	}

	out
}

fn parse_resolution(row: &Value) -> Option<ReconcileResolution> {
	let object = row.as_object()?;
	let candidate_index = object
		.get("candidate_index")
		.or_else(|| object.get("candidateIndex"))
		.and_then(Value::as_u64)
		.and_then(|index| usize::try_from(index).ok())?;
	let action = match object.get("action").and_then(Value::as_str)?.trim().to_ascii_lowercase().as_str()
	{
		"create" => ReconcileAction::Create,
		"update" => ReconcileAction::Update,
		"skip" => ReconcileAction::Skip,
		_ => return None,
	};
	let target_memory_id = object
		.get("target_memory_id")
		.or_else(|| object.get("targetMemoryId"))
		.and_then(Value::as_str)
		.and_then(|raw| Uuid::parse_str(raw.trim()).ok());
	let content = object
		.get("content")
		.and_then(Value::as_str)
		.map(str::trim)
		.filter(|content| !content.is_empty())
		.map(str::to_string);
	let reason =
		object.get("reason").and_then(Value::as_str).map(str::trim).unwrap_or_default().to_string();
	let confidence = object
		.get("confidence")
		.and_then(Value::as_f64)
		.filter(|value| value.is_finite())
		.map(|value| (value as f32).clamp(0.0, 1.0));

	Some(ReconcileResolution { candidate_index, action, target_memory_id, content, reason, confidence })
}

fn max_option(lhs: Option<f32>, rhs: Option<f32>) -> Option<f32> {
	match (lhs, rhs) {
		(Some(l), Some(r)) => Some(l.max(r)),
		(value, None) | (None, value) => value,
	}
}
