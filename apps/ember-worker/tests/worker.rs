use std::{sync::Arc, time::Duration as StdDuration};

use time::{Duration, OffsetDateTime, macros::datetime};

use ember_domain::{clock::Clock, settings::AgentOverrides, transcript::RunMessage};
use ember_service::MemoryService;
use ember_storage::{
	InMemoryStore, QueueStore,
	models::{NewQueueEntry, QueueEntry, QueueStatus},
};
use ember_testkit::{HashEmbedding, ManualClock, ScriptedLlm, ScriptedReply};
use ember_worker::{TickOutcome, Worker};

const NOW: OffsetDateTime = datetime!(2026-03-01 12:00 UTC);
const AGENT: &str = "agent-w";
const FACT_REPLY: &str = r#"{"memories": [{"content": "Deploys on Fridays are frozen.", "kind": "fact", "confidence": 0.9, "reason": "Team rule."}]}"#;

struct Harness {
	store: Arc<InMemoryStore>,
	llm: Arc<ScriptedLlm>,
	clock: Arc<ManualClock>,
	worker: Worker,
}

fn harness() -> Harness {
	let store = Arc::new(InMemoryStore::new());
	let llm = Arc::new(ScriptedLlm::new());
	let clock = Arc::new(ManualClock::new(NOW));
	let service = MemoryService::new(
		ember_testkit::test_config(),
		store.clone(),
		Arc::new(HashEmbedding::unavailable()),
		llm.clone(),
		clock.clone(),
	);

	store.put_agent_overrides(AGENT, AgentOverrides {
		memory_enabled: true,
		passive_updates: true,
		..Default::default()
	});

	Harness { store, llm, clock, worker: Worker::new(Arc::new(service), "worker-1") }
}

async fn enqueue(h: &Harness, job_id: &str, max_attempts: i32) {
	h.store.put_run_messages(job_id, vec![
		RunMessage::new("user", "Remember that deploys on Fridays are frozen."),
		RunMessage::new("assistant", "Understood."),
	]);
	h.store
		.enqueue(
			&NewQueueEntry {
				job_id: job_id.to_string(),
				agent_id: AGENT.to_string(),
				work_item_id: None,
				dispatch_id: None,
				max_attempts,
			},
			h.clock.now(),
		)
		.await
		.expect("Enqueue failed.");
}

fn only_entry(h: &Harness) -> QueueEntry {
	let entries = h.store.queue_entries();

	assert_eq!(entries.len(), 1);

	entries.into_iter().next().expect("Entry.")
}

#[tokio::test]
async fn empty_queue_is_idle() {
	let h = harness();

	assert_eq!(h.worker.tick().await, TickOutcome::Idle);
	assert!(!h.worker.is_busy());
}

#[tokio::test]
async fn completed_entries_carry_a_summary() {
	let h = harness();

	enqueue(&h, "job-1", 3).await;
	h.llm.push_text(FACT_REPLY);

	assert_eq!(h.worker.tick().await, TickOutcome::Completed);

	let entry = only_entry(&h);
	let summary = entry.summary.expect("Summary.");

	assert_eq!(entry.status, QueueStatus::Completed);
	assert_eq!(entry.claimed_by.as_deref(), Some("worker-1"));
	assert!(entry.completed_at.is_some());
	assert_eq!(summary["candidates"], 1);
	assert_eq!(summary["created"].as_array().map(Vec::len), Some(1));
	assert_eq!(summary["created_count"], 1);
	assert_eq!(summary["skipped_count"], 0);
	assert_eq!(h.worker.tick().await, TickOutcome::Idle);
}

#[tokio::test]
async fn missing_agents_are_skipped_with_a_reason() {
	let h = harness();

	h.store.put_run_messages("job-ghost", vec![RunMessage::new("user", "Hello.")]);
	h.store
		.enqueue(
			&NewQueueEntry {
				job_id: "job-ghost".to_string(),
				agent_id: "agent-unknown".to_string(),
				work_item_id: None,
				dispatch_id: None,
				max_attempts: 3,
			},
			NOW,
		)
		.await
		.expect("Enqueue failed.");

	assert_eq!(h.worker.tick().await, TickOutcome::Skipped);

	let entry = only_entry(&h);

	assert_eq!(entry.status, QueueStatus::Skipped);
	assert_eq!(entry.summary.expect("Summary.")["skipped"], "agent_missing");
	assert!(h.llm.requests().is_empty());
}

#[tokio::test]
async fn retryable_failures_back_off_then_succeed() {
	let h = harness();

	enqueue(&h, "job-retry", 3).await;
	h.llm.push(ScriptedReply::TransportError("Connection reset.".to_string()));

	assert_eq!(h.worker.tick().await, TickOutcome::Failed { retryable: true });

	let entry = only_entry(&h);

	assert_eq!(entry.status, QueueStatus::Pending);
	assert_eq!(entry.attempt_count, 1);
	assert_eq!(entry.next_attempt_at, NOW + Duration::seconds(20));
	assert!(entry.last_error.is_some_and(|error| error.contains("Connection reset.")));
	assert_eq!(h.worker.tick().await, TickOutcome::Idle);

	h.clock.advance(Duration::seconds(20));
	h.llm.push_text(FACT_REPLY);

	assert_eq!(h.worker.tick().await, TickOutcome::Completed);
	assert_eq!(only_entry(&h).attempt_count, 2);
}

#[tokio::test]
async fn configuration_errors_fail_immediately() {
	let h = harness();

	enqueue(&h, "job-key", 3).await;
	h.llm.push(ScriptedReply::MissingCredentials);

	assert_eq!(h.worker.tick().await, TickOutcome::Failed { retryable: false });

	let entry = only_entry(&h);

	assert_eq!(entry.status, QueueStatus::Failed);
	assert!(entry.completed_at.is_some());
	assert_eq!(entry.summary.expect("Summary.")["retryable"], false);
}

#[tokio::test]
async fn last_attempt_failures_are_terminal() {
	let h = harness();

	enqueue(&h, "job-once", 1).await;
	h.llm.push(ScriptedReply::TransportError("Timed out.".to_string()));

	assert_eq!(h.worker.tick().await, TickOutcome::Failed { retryable: false });
	assert_eq!(only_entry(&h).status, QueueStatus::Failed);
}

#[tokio::test]
async fn reclaimed_exhausted_entries_fail_without_processing() {
	let h = harness();

	enqueue(&h, "job-stale", 1).await;
	h.store.claim_next("crashed-worker", 180, NOW).await.expect("Claim failed.").expect("Entry.");
	h.clock.advance(Duration::seconds(181));

	assert_eq!(h.worker.tick().await, TickOutcome::Failed { retryable: false });

	let entry = only_entry(&h);

	assert_eq!(entry.status, QueueStatus::Failed);
	assert_eq!(entry.attempt_count, 2);
	assert!(h.llm.requests().is_empty());
}

#[tokio::test]
async fn kill_switch_leaves_entries_pending() {
	let h = harness();

	enqueue(&h, "job-off", 3).await;
	h.worker.set_processing_enabled(false);

	assert_eq!(h.worker.tick().await, TickOutcome::Disabled);
	assert_eq!(h.worker.drain(10).await, 0);
	assert_eq!(only_entry(&h).status, QueueStatus::Pending);

	h.worker.set_processing_enabled(true);
	h.llm.push_text(FACT_REPLY);

	assert_eq!(h.worker.tick().await, TickOutcome::Completed);
}

#[tokio::test]
async fn drain_processes_entries_back_to_back() {
	let h = harness();

	for job in ["job-a", "job-b", "job-c"] {
		enqueue(&h, job, 3).await;
		h.llm.push_text(r#"{"memories": []}"#);
	}

	assert_eq!(h.worker.drain(2).await, 2);
	assert_eq!(h.worker.drain(10).await, 1);
	assert!(h.store.queue_entries().iter().all(|entry| entry.status == QueueStatus::Completed));
}

#[tokio::test(start_paused = true)]
async fn loop_start_is_idempotent_and_stop_drains() {
	let h = harness();

	enqueue(&h, "job-loop", 3).await;
	h.llm.push_text(FACT_REPLY);

	assert!(h.worker.ensure_start());
	assert!(!h.worker.ensure_start());
	assert!(h.worker.is_running());

	tokio::time::sleep(StdDuration::from_millis(3_100)).await;

	assert_eq!(only_entry(&h).status, QueueStatus::Completed);

	h.worker.stop().await;

	assert!(!h.worker.is_running());
	assert!(!h.worker.is_busy());
	assert!(h.worker.ensure_start());

	h.worker.stop().await;
}
