use std::collections::HashSet;

use serde_json::json;
use time::{Duration, OffsetDateTime, macros::datetime};
use uuid::Uuid;

use ember_domain::{
	MemoryKind,
	candidate::{self, MAX_CANDIDATES, ParseFailure},
	eviction::{self, Evictable},
	keyword,
	reconcile::{self, NeighborSignal, ReconcileAction},
	scoring::{self, ScoreInputs},
	settings::{AgentOverrides, MemorySettings},
	transcript::{self, RunMessage, TRUNCATION_MARKER},
};

struct Entry {
	name: &'static str,
	permanent: bool,
	strength: f32,
	updated_at: OffsetDateTime,
}
impl Evictable for Entry {
	fn is_permanent(&self) -> bool {
		self.permanent
	}

	fn strength(&self) -> f32 {
		self.strength
	}

	fn updated_at(&self) -> OffsetDateTime {
		self.updated_at
	}
}

fn valid_row(content: &str) -> serde_json::Value {
	json!({ "content": content, "kind": "fact", "confidence": 0.9, "reason": "stated" })
}

#[test]
fn score_matches_documented_formula() {
	let now = datetime!(2026-03-01 12:00 UTC);
	let inputs = ScoreInputs {
		similarity: Some(0.8),
		similarity_weight: 1.0,
		strength: 0.6,
		access_count: 10,
		last_accessed_at: Some(now - Duration::hours(2)),
	};
	let score = scoring::score(inputs, now);

	assert!((score - 88.0).abs() < 1e-4, "Unexpected score {score}.");
}

#[test]
fn score_without_similarity_drops_the_term() {
	let now = datetime!(2026-03-01 12:00 UTC);
	let inputs = ScoreInputs {
		similarity: None,
		similarity_weight: 1.0,
		strength: 1.0,
		access_count: 3,
		last_accessed_at: Some(now - Duration::days(3)),
	};

	assert!((scoring::score(inputs, now) - (30.0 + 6.0 + 5.0)).abs() < 1e-4);
}

#[test]
fn recency_bonus_steps_down_with_age() {
	let now = datetime!(2026-03-01 12:00 UTC);

	assert_eq!(scoring::recency_bonus(Some(now - Duration::hours(23)), now), 10.0);
	assert_eq!(scoring::recency_bonus(Some(now - Duration::days(6)), now), 5.0);
	assert_eq!(scoring::recency_bonus(Some(now - Duration::days(7)), now), 0.0);
}

#[test]
fn parse_candidate_rejects_missing_content() {
	let row = json!({ "kind": "fact", "confidence": 0.9 });

	assert_eq!(candidate::parse_candidate(&row), Err(ParseFailure::MissingContent));

	let blank = json!({ "content": "   ", "kind": "fact", "confidence": 0.9 });

	assert_eq!(candidate::parse_candidate(&blank), Err(ParseFailure::MissingContent));
}

#[test]
fn parse_candidate_rejects_unknown_kind() {
	let row = json!({ "content": "User likes tea.", "kind": "preference", "confidence": 0.9 });

	assert_eq!(candidate::parse_candidate(&row), Err(ParseFailure::InvalidKind));
}

#[test]
fn parse_candidate_requires_numeric_confidence() {
	let row = json!({ "content": "User likes tea.", "kind": "fact", "confidence": "high" });

	assert_eq!(candidate::parse_candidate(&row), Err(ParseFailure::InvalidConfidence));
}

#[test]
fn parse_candidate_accepts_valid_rows() {
	let target = Uuid::new_v4();
	let row = json!({
		"content": " Deploys happen on Fridays. ",
		"kind": "task",
		"confidence": 0.82,
		"reason": "explicit schedule",
		"target_memory_id": target.to_string(),
	});
	let parsed = candidate::parse_candidate(&row).expect("Expected a valid candidate.");

	assert_eq!(parsed.content, "Deploys happen on Fridays.");
	assert_eq!(parsed.kind, MemoryKind::Task);
	assert_eq!(parsed.target_memory_id, Some(target));
	assert!((parsed.confidence - 0.82).abs() < 1e-6);
}

#[test]
fn parse_candidate_clamps_confidence() {
	let row = json!({ "content": "User is in UTC+2.", "kind": "fact", "confidence": 1.7 });
	let parsed = candidate::parse_candidate(&row).expect("Expected a valid candidate.");

	assert_eq!(parsed.confidence, 1.0);
}

#[test]
fn extraction_response_is_capped() {
	let rows: Vec<_> = (0..20).map(|i| valid_row(&format!("Fact number {i}."))).collect();
	let reply = json!({ "memories": rows }).to_string();
	let parsed = candidate::parse_extraction_response(&reply);

	assert_eq!(parsed.candidates.len(), MAX_CANDIDATES);
	assert_eq!(parsed.overflow, 10);
	assert!(parsed.failures.is_empty());
}

#[test]
fn extraction_response_keeps_valid_rows_among_bad_ones() {
	let reply = json!({
		"memories": [
			valid_row("User prefers dark mode."),
			{ "content": "", "kind": "fact", "confidence": 0.9 },
			"not an object",
		]
	})
	.to_string();
	let parsed = candidate::parse_extraction_response(&reply);

	assert_eq!(parsed.candidates.len(), 1);
	assert_eq!(parsed.failures, vec![ParseFailure::MissingContent, ParseFailure::NotAnObject]);
}

#[test]
fn malformed_extraction_reply_is_empty_not_an_error() {
	let parsed = candidate::parse_extraction_response("I could not find anything useful.");

	assert!(parsed.candidates.is_empty());
	assert_eq!(parsed.failures, vec![ParseFailure::MalformedReply]);

	let parsed = candidate::parse_extraction_response("{\"notes\": []}");

	assert_eq!(parsed.failures, vec![ParseFailure::MissingList]);
}

#[test]
fn admission_thresholds() {
	assert!(reconcile::admits(Some(0.35), None));
	assert!(!reconcile::admits(Some(0.34), None));
	assert!(reconcile::admits(None, Some(0.72)));
	assert!(reconcile::admits(Some(0.1), Some(0.70)));
	assert!(!reconcile::admits(Some(0.2), Some(0.69)));
}

#[test]
fn neighbors_merge_by_id_and_keep_the_stronger_score() {
	let shared = Uuid::new_v4();
	let weak = Uuid::new_v4();
	let signals = vec![
		NeighborSignal {
			memory_id: shared,
			content: "User prefers dark mode.".to_string(),
			keyword: Some(0.4),
			embedding: None,
		},
		NeighborSignal {
			memory_id: shared,
			content: "User prefers dark mode.".to_string(),
			keyword: None,
			embedding: Some(0.91),
		},
		NeighborSignal {
			memory_id: weak,
			content: "Unrelated.".to_string(),
			keyword: Some(0.1),
			embedding: Some(0.2),
		},
	];
	let neighbors = reconcile::select_neighbors(signals, 3);

	assert_eq!(neighbors.len(), 1);
	assert_eq!(neighbors[0].memory_id, shared);
	assert!((neighbors[0].score - 0.91).abs() < 1e-6);
}

#[test]
fn neighbors_are_limited() {
	let signals = (0..6)
		.map(|i| NeighborSignal {
			memory_id: Uuid::new_v4(),
			content: format!("memory {i}"),
			keyword: Some(0.5 + i as f32 * 0.05),
			embedding: None,
		})
		.collect();

	assert_eq!(reconcile::select_neighbors(signals, 3).len(), 3);
}

#[test]
fn reconcile_parse_ignores_bad_rows() {
	let target = Uuid::new_v4();
	let stranger = Uuid::new_v4();
	let neighbor_ids = vec![HashSet::from([target]), HashSet::new(), HashSet::from([target])];
	let reply = json!({
		"decisions": [
			{ "candidate_index": 0, "action": "update", "target_memory_id": target.to_string(), "content": "Merged.", "reason": "same topic", "confidence": 0.9 },
			{ "candidate_index": 0, "action": "skip", "reason": "duplicate row" },
			{ "candidate_index": 1, "action": "create", "reason": "not sent" },
			{ "candidate_index": 2, "action": "update", "target_memory_id": stranger.to_string() },
			{ "candidate_index": 7, "action": "create" },
			{ "candidate_index": 2, "action": "merge" },
		]
	})
	.to_string();
	let resolutions = reconcile::parse_reconcile_response(&reply, &neighbor_ids);

	assert_eq!(resolutions.len(), 1);
	assert_eq!(resolutions[0].action, ReconcileAction::Update);
	assert_eq!(resolutions[0].target_memory_id, Some(target));
	assert_eq!(resolutions[0].content.as_deref(), Some("Merged."));
}

#[test]
fn reconcile_parse_of_garbage_is_empty() {
	assert!(reconcile::parse_reconcile_response("nope", &[HashSet::new()]).is_empty());
}

#[test]
fn eviction_picks_weakest_then_oldest() {
	let base = datetime!(2026-01-01 00:00 UTC);
	let entries = vec![
		Entry { name: "pinned", permanent: true, strength: 0.0, updated_at: base },
		Entry { name: "newer", permanent: false, strength: 0.2, updated_at: base + Duration::days(2) },
		Entry { name: "older", permanent: false, strength: 0.2, updated_at: base + Duration::days(1) },
		Entry { name: "strong", permanent: false, strength: 0.9, updated_at: base },
	];
	let victim = eviction::select_victim(&entries).expect("Expected a victim.");

	assert_eq!(victim.name, "older");
}

#[test]
fn eviction_never_selects_permanent_entries() {
	let base = datetime!(2026-01-01 00:00 UTC);
	let entries = vec![
		Entry { name: "a", permanent: true, strength: 0.0, updated_at: base },
		Entry { name: "b", permanent: true, strength: 0.1, updated_at: base },
	];

	assert!(eviction::select_victim(&entries).is_none());
	assert!(eviction::at_capacity(entries.len(), 2));
}

#[test]
fn transcript_keeps_only_user_and_assistant_turns() {
	let messages = vec![
		RunMessage::new("system", "You are a helpful agent."),
		RunMessage::new("user", "I prefer dark mode."),
		RunMessage::new("tool", "{\"ok\": true}"),
		RunMessage::new("assistant", "Noted."),
		RunMessage::new("user", "   "),
	];
	let transcript = transcript::build_transcript(&messages, 10_000).expect("Expected transcript.");

	assert_eq!(transcript, "User: I prefer dark mode.\n\nAssistant: Noted.");
}

#[test]
fn transcript_truncation_keeps_the_tail() {
	let messages = vec![
		RunMessage::new("user", "old ".repeat(50)),
		RunMessage::new("assistant", "The latest answer."),
	];
	let transcript = transcript::build_transcript(&messages, 30).expect("Expected transcript.");

	assert!(transcript.starts_with(TRUNCATION_MARKER));
	assert!(transcript.ends_with("Assistant: The latest answer."));
	assert_eq!(transcript.chars().count(), TRUNCATION_MARKER.chars().count() + 30);
}

#[test]
fn transcript_without_dialogue_is_none() {
	let messages = vec![RunMessage::new("tool", "output"), RunMessage::new("system", "rules")];

	assert!(transcript::build_transcript(&messages, 100).is_none());
	assert_eq!(transcript::char_budget(1_000, 4), 4_000);
}

#[test]
fn keyword_similarity_filters_stop_words() {
	let score = keyword::keyword_similarity(
		"The user prefers dark mode in the editor",
		"User prefers dark mode",
	);

	assert!((score - 0.8).abs() < 1e-6, "Unexpected score {score}.");
}

#[test]
fn agent_overrides_replace_defaults() {
	let defaults = MemorySettings::from_config(&ember_config::Memory::default());
	let settings = defaults.clone().with_overrides(&AgentOverrides {
		memory_enabled: true,
		passive_updates: false,
		max_memories: Some(3),
		min_strength: None,
		capacity: Some(0),
	});

	assert_eq!(settings.max_memories, 3);
	assert_eq!(settings.capacity, defaults.capacity);
	assert!(!settings.passive_enabled());
}

#[test]
fn digests_start_weaker_than_facts() {
	assert_eq!(MemoryKind::Fact.initial_strength(), 1.0);
	assert_eq!(MemoryKind::Task.initial_strength(), 1.0);
	assert_eq!(MemoryKind::Digest.initial_strength(), 0.5);
	assert_eq!("DIGEST".parse::<MemoryKind>(), Ok(MemoryKind::Digest));
}
