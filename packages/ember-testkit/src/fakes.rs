use std::{
	collections::VecDeque,
	sync::{
		Mutex,
		atomic::{AtomicBool, Ordering},
	},
};

use serde_json::Value;
use time::{Duration, OffsetDateTime};

use ember_domain::{BoxFuture, clock::Clock, keyword};
use ember_providers::{Completion, EmbeddingProvider, Error, LlmProvider, Result, Usage};

pub const FAKE_DIMENSIONS: usize = 64;
pub const SCRIPTED_USAGE: Usage = Usage { prompt_tokens: 120, completion_tokens: 40, cost: 0.0005 };

/// Deterministic bag-of-words embedding: identical token sets map to identical vectors.
pub struct HashEmbedding {
	available: AtomicBool,
	failing: AtomicBool,
}
impl HashEmbedding {
	pub fn new() -> Self {
		Self { available: AtomicBool::new(true), failing: AtomicBool::new(false) }
	}

	/// An embedding provider that reports it is not configured.
	pub fn unavailable() -> Self {
		let provider = Self::new();

		provider.available.store(false, Ordering::SeqCst);

		provider
	}

	/// Makes every later `embed` call fail with a transport-style error.
	pub fn set_failing(&self, failing: bool) {
		self.failing.store(failing, Ordering::SeqCst);
	}

	pub fn vector(text: &str) -> Vec<f32> {
		let mut vector = vec![0.0; FAKE_DIMENSIONS];

		for token in keyword::tokens(text) {
			vector[bucket(&token)] += 1.0;
		}

		vector
	}
}
impl Default for HashEmbedding {
	fn default() -> Self {
		Self::new()
	}
}

impl EmbeddingProvider for HashEmbedding {
	fn available(&self) -> bool {
		self.available.load(Ordering::SeqCst)
	}

	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move {
			if !self.available() {
				return Err(Error::Unavailable);
			}
			if self.failing.load(Ordering::SeqCst) {
				return Err(Error::InvalidResponse {
					message: "Scripted embedding failure.".to_string(),
				});
			}

			Ok(texts.iter().map(|text| Self::vector(text)).collect())
		})
	}
}

#[derive(Clone, Debug)]
pub enum ScriptedReply {
	Text(String),
	/// A retryable transport-style failure.
	TransportError(String),
	/// A terminal configuration failure.
	MissingCredentials,
}

/// LLM fake that answers from a queue and records every request.
pub struct ScriptedLlm {
	model: String,
	replies: Mutex<VecDeque<ScriptedReply>>,
	requests: Mutex<Vec<Vec<Value>>>,
}
impl ScriptedLlm {
	pub fn new() -> Self {
		Self {
			model: "scripted-model".to_string(),
			replies: Mutex::new(VecDeque::new()),
			requests: Mutex::new(Vec::new()),
		}
	}

	pub fn push_text(&self, text: impl Into<String>) {
		self.push(ScriptedReply::Text(text.into()));
	}

	pub fn push(&self, reply: ScriptedReply) {
		self.replies.lock().unwrap_or_else(|err| err.into_inner()).push_back(reply);
	}

	pub fn requests(&self) -> Vec<Vec<Value>> {
		self.requests.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	pub fn remaining(&self) -> usize {
		self.replies.lock().unwrap_or_else(|err| err.into_inner()).len()
	}
}
impl Default for ScriptedLlm {
	fn default() -> Self {
		Self::new()
	}
}

impl LlmProvider for ScriptedLlm {
	fn model(&self) -> &str {
		&self.model
	}

	fn complete<'a>(&'a self, messages: &'a [Value]) -> BoxFuture<'a, Result<Completion>> {
		Box::pin(async move {
			self.requests.lock().unwrap_or_else(|err| err.into_inner()).push(messages.to_vec());

			let reply = self.replies.lock().unwrap_or_else(|err| err.into_inner()).pop_front();

			match reply {
				Some(ScriptedReply::Text(text)) =>
					Ok(Completion { text, model: self.model.clone(), usage: SCRIPTED_USAGE }),
				Some(ScriptedReply::TransportError(message)) =>
					Err(Error::InvalidResponse { message }),
				Some(ScriptedReply::MissingCredentials) =>
					Err(Error::MissingCredentials { provider_id: "scripted".to_string() }),
				None => Err(Error::InvalidResponse {
					message: "No scripted reply is left.".to_string(),
				}),
			}
		})
	}
}

/// Clock that only moves when told to.
pub struct ManualClock {
	now: Mutex<OffsetDateTime>,
}
impl ManualClock {
	pub fn new(now: OffsetDateTime) -> Self {
		Self { now: Mutex::new(now) }
	}

	pub fn advance(&self, by: Duration) {
		let mut now = self.now.lock().unwrap_or_else(|err| err.into_inner());

		*now += by;
	}
}

impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.now.lock().unwrap_or_else(|err| err.into_inner())
	}
}

fn bucket(token: &str) -> usize {
	// FNV-1a keeps buckets stable across runs and platforms.
	let mut hash: u64 = 0xcbf2_9ce4_8422_2325;

	for byte in token.bytes() {
		hash ^= u64::from(byte);
		hash = hash.wrapping_mul(0x0100_0000_01b3);
	}

	(hash % FAKE_DIMENSIONS as u64) as usize
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn identical_texts_embed_identically() {
		assert_eq!(HashEmbedding::vector("Prefers dark mode"), HashEmbedding::vector("dark mode prefers"));
		assert_ne!(HashEmbedding::vector("dark mode"), HashEmbedding::vector("light theme"));
	}

	#[tokio::test]
	async fn scripted_llm_replays_in_order_and_records_requests() {
		let llm = ScriptedLlm::new();

		llm.push_text("first");
		llm.push(ScriptedReply::MissingCredentials);

		let messages = vec![serde_json::json!({ "role": "user", "content": "hi" })];
		let first = llm.complete(&messages).await.expect("First reply is scripted.");
		let second = llm.complete(&messages).await.expect_err("Second reply is an error.");

		assert_eq!(first.text, "first");
		assert!(second.is_configuration());
		assert!(llm.complete(&messages).await.is_err());
		assert_eq!(llm.requests().len(), 3);
	}
}
