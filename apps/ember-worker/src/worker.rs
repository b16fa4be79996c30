use std::{
	sync::{
		Arc, Mutex,
		atomic::{AtomicBool, Ordering},
	},
	time::Duration as StdDuration,
};

use serde_json::json;
use time::format_description::well_known::Rfc3339;
use tokio::{
	sync::watch,
	task::JoinHandle,
	time::{self as tokio_time, MissedTickBehavior},
};

use ember_domain::retry;
use ember_service::{MemoryService, PassiveOutcome};
use ember_storage::models::{FailureRecord, QueueEntry};

const MAX_QUEUE_ERROR_CHARS: usize = 1_024;

/// What one tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
	/// The kill switch is off.
	Disabled,
	/// Another tick or drain holds the worker.
	Busy,
	/// Nothing was claimable.
	Idle,
	Completed,
	Skipped,
	Failed { retryable: bool },
}

/// Handle for the passive memory worker. Owned by the process entry point.
pub struct Worker {
	inner: Arc<Inner>,
	running: Mutex<Option<Running>>,
}
impl Worker {
	pub fn new(service: Arc<MemoryService>, worker_id: impl Into<String>) -> Self {
		let passive = &service.cfg.passive;
		let inner = Inner {
			worker_id: worker_id.into(),
			poll_interval: StdDuration::from_millis(passive.poll_interval_ms),
			lease_seconds: passive.lease_seconds,
			processing_enabled: AtomicBool::new(passive.processing_enabled),
			busy: AtomicBool::new(false),
			service,
		};

		Self { inner: Arc::new(inner), running: Mutex::new(None) }
	}

	pub fn worker_id(&self) -> &str {
		&self.inner.worker_id
	}

	/// Starts the polling loop unless it already runs. Returns whether a loop was started.
	///
	/// Must be called from within a Tokio runtime.
	pub fn ensure_start(&self) -> bool {
		let mut running = self.running.lock().unwrap_or_else(|err| err.into_inner());

		if running.as_ref().is_some_and(|running| !running.handle.is_finished()) {
			return false;
		}

		let (stop_tx, stop_rx) = watch::channel(false);
		let handle = tokio::spawn(run_loop(self.inner.clone(), stop_rx));

		tracing::info!(
			worker_id = %self.inner.worker_id,
			poll_interval_ms = self.inner.poll_interval.as_millis() as u64,
			"Passive memory worker started."
		);

		*running = Some(Running { stop: stop_tx, handle });

		true
	}

	/// Stops scheduling ticks and waits for an in-flight tick to finish.
	pub async fn stop(&self) {
		let running = self.running.lock().unwrap_or_else(|err| err.into_inner()).take();
		let Some(running) = running else { return };
		let _ = running.stop.send(true);

		if let Err(err) = running.handle.await {
			tracing::error!(error = %err, "Passive memory worker task ended abnormally.");
		}

		tracing::info!(worker_id = %self.inner.worker_id, "Passive memory worker stopped.");
	}

	pub fn is_running(&self) -> bool {
		self.running
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.as_ref()
			.is_some_and(|running| !running.handle.is_finished())
	}

	pub fn is_busy(&self) -> bool {
		self.inner.busy.load(Ordering::Acquire)
	}

	pub fn set_processing_enabled(&self, enabled: bool) {
		self.inner.processing_enabled.store(enabled, Ordering::Release);

		tracing::info!(enabled, "Passive memory processing toggled.");
	}

	pub fn processing_enabled(&self) -> bool {
		self.inner.processing_enabled.load(Ordering::Acquire)
	}

	pub async fn tick(&self) -> TickOutcome {
		self.inner.tick().await
	}

	/// Processes claimable entries back to back until the queue is idle or `max_jobs` ran.
	/// Returns the number of entries processed.
	pub async fn drain(&self, max_jobs: usize) -> usize {
		self.inner.drain(max_jobs).await
	}
}

struct Running {
	stop: watch::Sender<bool>,
	handle: JoinHandle<()>,
}

struct Inner {
	service: Arc<MemoryService>,
	worker_id: String,
	poll_interval: StdDuration,
	lease_seconds: i64,
	processing_enabled: AtomicBool,
	busy: AtomicBool,
}
impl Inner {
	async fn tick(&self) -> TickOutcome {
		if !self.processing_enabled.load(Ordering::Acquire) {
			tracing::debug!("Passive memory processing is disabled. Skipping tick.");

			return TickOutcome::Disabled;
		}

		let Some(_guard) = BusyGuard::acquire(&self.busy) else { return TickOutcome::Busy };

		self.claim_and_process().await
	}

	async fn drain(&self, max_jobs: usize) -> usize {
		if !self.processing_enabled.load(Ordering::Acquire) {
			return 0;
		}

		let Some(_guard) = BusyGuard::acquire(&self.busy) else { return 0 };
		let mut processed = 0;

		while processed < max_jobs {
			if self.claim_and_process().await == TickOutcome::Idle {
				break;
			}

			processed += 1;
		}

		tracing::info!(processed, "Drained passive memory queue.");

		processed
	}

	async fn claim_and_process(&self) -> TickOutcome {
		let now = self.service.clock.now();
		let entry =
			match self.service.store.claim_next(&self.worker_id, self.lease_seconds, now).await {
				Ok(Some(entry)) => entry,
				Ok(None) => return TickOutcome::Idle,
				Err(err) => {
					tracing::error!(error = %err, "Failed to claim a passive memory entry.");

					return TickOutcome::Idle;
				},
			};

		tracing::info!(
			entry_id = %entry.entry_id,
			job_id = %entry.job_id,
			agent_id = %entry.agent_id,
			attempt = entry.attempt_count,
			"Claimed passive memory entry."
		);

		if entry.over_attempt_limit() {
			let error = format!(
				"Entry was claimed again after its final attempt ({} of {}).",
				entry.attempt_count, entry.max_attempts
			);

			self.fail(&entry, error, false).await;

			return TickOutcome::Failed { retryable: false };
		}

		match self.service.process_entry(&entry).await {
			Ok(PassiveOutcome::Completed(summary)) => {
				let now = self.service.clock.now();

				match self.service.store.mark_completed(entry.entry_id, &summary.to_value(), now).await {
					Ok(true) => tracing::info!(
						entry_id = %entry.entry_id,
						created = summary.apply.created.len(),
						updated = summary.apply.updated.len(),
						evicted = summary.apply.evicted.len(),
						skipped = summary.apply.skipped.len(),
						"Passive memory entry completed."
					),
					Ok(false) => lost_claim(&entry),
					Err(err) => tracing::error!(
						entry_id = %entry.entry_id,
						error = %err,
						"Failed to mark passive memory entry completed."
					),
				}

				TickOutcome::Completed
			},
			Ok(PassiveOutcome::Skipped(reason)) => {
				let now = self.service.clock.now();

				match self.service.store.mark_skipped(entry.entry_id, &reason.summary(), now).await {
					Ok(true) => tracing::info!(
						entry_id = %entry.entry_id,
						reason = reason.as_str(),
						"Passive memory entry skipped."
					),
					Ok(false) => lost_claim(&entry),
					Err(err) => tracing::error!(
						entry_id = %entry.entry_id,
						error = %err,
						"Failed to mark passive memory entry skipped."
					),
				}

				TickOutcome::Skipped
			},
			Err(err) => {
				let retryable = err.is_retryable() && !entry.attempts_exhausted();

				self.fail(&entry, err.to_string(), retryable).await;

				TickOutcome::Failed { retryable }
			},
		}
	}

	async fn fail(&self, entry: &QueueEntry, error: String, retryable: bool) {
		let now = self.service.clock.now();
		let error = sanitize_queue_error(&error);
		let retry_at = retryable.then(|| now + retry::retry_delay(entry.attempt_count));
		let next_attempt_at = retry_at.and_then(|at| at.format(&Rfc3339).ok());
		let record = FailureRecord {
			error: error.clone(),
			retry_at,
			summary: json!({
				"error": error,
				"retryable": retryable,
				"attempt": entry.attempt_count,
				"max_attempts": entry.max_attempts,
				"next_attempt_at": next_attempt_at,
			}),
		};

		match self.service.store.mark_failed(entry.entry_id, &record, now).await {
			Ok(true) => tracing::warn!(
				entry_id = %entry.entry_id,
				job_id = %entry.job_id,
				retryable,
				attempt = entry.attempt_count,
				next_attempt_at = next_attempt_at.as_deref().unwrap_or("none"),
				error = %record.error,
				"Passive memory entry failed."
			),
			Ok(false) => lost_claim(entry),
			Err(err) => tracing::error!(
				entry_id = %entry.entry_id,
				error = %err,
				"Failed to mark passive memory entry failed."
			),
		}
	}
}

struct BusyGuard<'a> {
	flag: &'a AtomicBool,
}
impl<'a> BusyGuard<'a> {
	fn acquire(flag: &'a AtomicBool) -> Option<Self> {
		flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.ok()
			.map(|_| Self { flag })
	}
}
impl Drop for BusyGuard<'_> {
	fn drop(&mut self) {
		self.flag.store(false, Ordering::Release);
	}
}

async fn run_loop(inner: Arc<Inner>, mut stop: watch::Receiver<bool>) {
	let mut interval = tokio_time::interval(inner.poll_interval);

	interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

	loop {
		tokio::select! {
			_ = interval.tick() => {},
			_ = stop.changed() => break,
		}

		if *stop.borrow() {
			break;
		}

		// Outside the select: a stop request waits for the running tick.
		inner.tick().await;
	}
}

fn lost_claim(entry: &QueueEntry) {
	tracing::warn!(
		entry_id = %entry.entry_id,
		job_id = %entry.job_id,
		"Passive memory entry is no longer processing. Another worker likely reclaimed it."
	);
}

fn sanitize_queue_error(text: &str) -> String {
	let mut parts = Vec::new();
	let mut redact_next = false;

	for raw in text.split_whitespace() {
		if redact_next {
			parts.push("[REDACTED]".to_string());
			redact_next = false;

			continue;
		}
		if raw.eq_ignore_ascii_case("bearer") {
			redact_next = true;
		}

		let lowered = raw.to_ascii_lowercase();
		let secret = ["api_key", "apikey", "authorization", "password", "secret", "token"]
			.iter()
			.any(|key| lowered.contains(key));
		let separator = raw.find(['=', ':']);

		match separator {
			Some(at) if secret => parts.push(format!("{}[REDACTED]", &raw[..=at])),
			_ => parts.push(raw.to_string()),
		}
	}

	let mut out = parts.join(" ");

	if out.chars().count() > MAX_QUEUE_ERROR_CHARS {
		out = out.chars().take(MAX_QUEUE_ERROR_CHARS).collect();
		out.push_str("...");
	}

	out
}
