use std::sync::Arc;

use serde_json::json;
use time::{Duration, OffsetDateTime, macros::datetime};

use ember_domain::{MemoryKind, settings::AgentOverrides, transcript::RunMessage};
use ember_storage::{
	AgentStore, MemoryStore, PgStore, QueueStore,
	db::Db,
	models::{EnqueueOutcome, MemoryPatch, NewMemory, NewQueueEntry, QueueStatus, UpdateOutcome},
};

const NOW: OffsetDateTime = datetime!(2026-03-01 12:00 UTC);

async fn connect(test_db: &ember_testkit::TestDatabase) -> PgStore {
	let cfg = ember_config::Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 4 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	PgStore::new(db)
}

fn queue_entry(job_id: &str) -> NewQueueEntry {
	NewQueueEntry {
		job_id: job_id.to_string(),
		agent_id: "agent-a".to_string(),
		work_item_id: None,
		dispatch_id: None,
		max_attempts: 3,
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set EMBER_PG_DSN to run."]
async fn queue_claims_are_exclusive_and_idempotent() {
	let Some(base_dsn) = ember_testkit::env_dsn() else {
		eprintln!("Skipping queue_claims_are_exclusive_and_idempotent; set EMBER_PG_DSN to run this test.");

		return;
	};
	let test_db =
		ember_testkit::TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let store = Arc::new(connect(&test_db).await);

	assert!(matches!(
		store.enqueue(&queue_entry("job-1"), NOW).await.expect("Enqueue failed."),
		EnqueueOutcome::Inserted(_)
	));
	assert_eq!(
		store.enqueue(&queue_entry("job-1"), NOW).await.expect("Enqueue failed."),
		EnqueueOutcome::Duplicate
	);

	let (a, b) = tokio::join!(
		store.claim_next("worker-a", 180, NOW),
		store.claim_next("worker-b", 180, NOW)
	);
	let a = a.expect("Claim failed.");
	let b = b.expect("Claim failed.");

	assert_eq!(a.is_some() as u8 + b.is_some() as u8, 1);

	let entry = a.or(b).expect("One claim succeeded.");

	assert_eq!(entry.status, QueueStatus::Processing);
	assert_eq!(entry.attempt_count, 1);

	let reclaimed = store
		.claim_next("worker-c", 180, NOW + Duration::seconds(181))
		.await
		.expect("Claim failed.")
		.expect("Expired lease is claimable.");

	assert_eq!(reclaimed.entry_id, entry.entry_id);
	assert_eq!(reclaimed.attempt_count, 2);
	assert!(store.mark_completed(reclaimed.entry_id, &json!({ "created": 0 }), NOW).await.expect("Mark failed."));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set EMBER_PG_DSN to run."]
async fn memory_rows_round_trip_through_pgvector() {
	let Some(base_dsn) = ember_testkit::env_dsn() else {
		eprintln!("Skipping memory_rows_round_trip_through_pgvector; set EMBER_PG_DSN to run this test.");

		return;
	};
	let test_db =
		ember_testkit::TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let store = connect(&test_db).await;
	let memory = store
		.create_memory(
			&NewMemory {
				agent_id: "agent-a".to_string(),
				kind: MemoryKind::Fact,
				content: "Prefers dark mode.".to_string(),
				embedding: Some(vec![1.0, 0.0, 0.0]),
				strength: 1.0,
				permanent: false,
			},
			NOW,
		)
		.await
		.expect("Create failed.");
	let hits = store.find_similar("agent-a", &[1.0, 0.0, 0.0], 3).await.expect("Search failed.");

	assert_eq!(hits.len(), 1);
	assert!((hits[0].similarity - 1.0).abs() < 1e-5);
	assert!(store.find_similar("agent-a", &[1.0, 0.0], 3).await.expect("Search failed.").is_empty());

	let patch = MemoryPatch { content: Some("Prefers light mode.".to_string()), ..Default::default() };
	let updated =
		store.update_memory(memory.memory_id, &patch, Some(1), NOW).await.expect("Update failed.");

	assert!(matches!(updated, UpdateOutcome::Updated(ref m) if m.version == 2));
	assert_eq!(
		store.update_memory(memory.memory_id, &patch, Some(1), NOW).await.expect("Update failed."),
		UpdateOutcome::VersionConflict { current: 2 }
	);
	assert_eq!(store.decay_memories("agent-a", 0.5).await.expect("Decay failed."), 1);

	store
		.put_agent_overrides("agent-a", &AgentOverrides {
			memory_enabled: true,
			passive_updates: false,
			max_memories: Some(4),
			min_strength: None,
			capacity: None,
		})
		.await
		.expect("Upsert failed.");
	store
		.put_run_messages("job-1", &[RunMessage::new("user", "hi"), RunMessage::new("assistant", "hello")])
		.await
		.expect("Insert failed.");

	let overrides = store.memory_overrides("agent-a").await.expect("Lookup failed.").expect("Row.");

	assert!(!overrides.passive_updates);
	assert_eq!(overrides.max_memories, Some(4));
	assert_eq!(store.run_messages("job-1").await.expect("Lookup failed.").len(), 2);
	assert!(store.delete_memory(memory.memory_id).await.expect("Delete failed."));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
