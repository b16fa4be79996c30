use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{MemoryKind, model_json};

/// Hard cap on candidates accepted from one extraction reply.
pub const MAX_CANDIDATES: usize = 10;
/// Candidates strictly below this confidence are never applied.
pub const MIN_APPLY_CONFIDENCE: f32 = 0.7;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
	pub content: String,
	pub kind: MemoryKind,
	pub confidence: f32,
	pub reason: String,
	pub target_memory_id: Option<Uuid>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseFailure {
	/// The reply held no JSON document at all.
	MalformedReply,
	/// The document had no candidate list.
	MissingList,
	NotAnObject,
	MissingContent,
	InvalidKind,
	InvalidConfidence,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionParse {
	pub candidates: Vec<Candidate>,
	pub failures: Vec<ParseFailure>,
	/// Valid rows dropped by the candidate cap.
	pub overflow: usize,
}
impl ExtractionParse {
	fn failed(failure: ParseFailure) -> Self {
		Self { failures: vec![failure], ..Default::default() }
	}
}

pub fn parse_candidate(row: &Value) -> Result<Candidate, ParseFailure> {
	let Some(object) = row.as_object() else { return Err(ParseFailure::NotAnObject) };
	let content = object
		.get("content")
		.and_then(Value::as_str)
		.map(str::trim)
		.filter(|content| !content.is_empty())
		.ok_or(ParseFailure::MissingContent)?;
	let kind = object
		.get("kind")
		.or_else(|| object.get("type"))
		.and_then(Value::as_str)
		.and_then(|raw| raw.parse::<MemoryKind>().ok())
		.ok_or(ParseFailure::InvalidKind)?;
	let confidence = object
		.get("confidence")
		.and_then(Value::as_f64)
		.filter(|value| value.is_finite())
		.ok_or(ParseFailure::InvalidConfidence)?;
	let reason =
		object.get("reason").and_then(Value::as_str).map(str::trim).unwrap_or_default().to_string();
	let target_memory_id = object
		.get("target_memory_id")
		.or_else(|| object.get("targetMemoryId"))
		.and_then(Value::as_str)
		.and_then(|raw| Uuid::parse_str(raw.trim()).ok());

	Ok(Candidate {
		content: content.to_string(),
		kind,
		confidence: (confidence as f32).clamp(0.0, 1.0),
		reason,
		target_memory_id,
	})
}

/// Validates an extraction reply row by row. Never fails; bad input yields recorded failures.
pub fn parse_extraction_response(text: &str) -> ExtractionParse {
	let Some(document) = model_json::extract_json(text) else {
		return ExtractionParse::failed(ParseFailure::MalformedReply);
	};
	let rows = match &document {
		Value::Array(rows) => rows,
		Value::Object(object) => match ["memories", "candidates"]
			.iter()
			.find_map(|key| object.get(*key).and_then(Value::as_array))
		{
			Some(rows) => rows,
			None => return ExtractionParse::failed(ParseFailure::MissingList),
		},
		_ => return ExtractionParse::failed(ParseFailure::MissingList),
	};
	let mut parsed = ExtractionParse::default();

	for row in rows {
		match parse_candidate(row) {
			Ok(candidate) if parsed.candidates.len() < MAX_CANDIDATES =>
				parsed.candidates.push(candidate),
			Ok(_) => parsed.overflow += 1,
			Err(failure) => parsed.failures.push(failure),
		}
	}

	parsed
}
