use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMessage {
	pub role: String,
	pub content: String,
}
impl RunMessage {
	pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
		Self { role: role.into(), content: content.into() }
	}
}

pub const TRUNCATION_MARKER: &str = "[earlier conversation truncated]\n";

pub fn char_budget(token_budget: u32, chars_per_token: u32) -> usize {
	(token_budget as usize).saturating_mul(chars_per_token as usize)
}

/// Role-labeled transcript of the user and assistant turns, tail-truncated to `max_chars`.
///
/// Returns `None` when no user or assistant turn carries text.
pub fn build_transcript(messages: &[RunMessage], max_chars: usize) -> Option<String> {
	let mut lines = Vec::new();

	for message in messages {
		let label = match message.role.trim().to_ascii_lowercase().as_str() {
			"user" => "User",
			"assistant" => "Assistant",
			_ => continue,
		};
		let content = message.content.trim();

		if content.is_empty() {
			continue;
		}

		lines.push(format!("{label}: {content}"));
	}

	if lines.is_empty() {
		return None;
	}

	Some(keep_tail(&lines.join("\n\n"), max_chars))
}

/// Keeps the last `max_chars` characters, prefixing a marker when anything was cut.
pub fn keep_tail(text: &str, max_chars: usize) -> String {
	let total = text.chars().count();

	if total <= max_chars {
		return text.to_string();
	}

	let skip = total - max_chars;
	let tail: String = text.chars().skip(skip).collect();

	format!("{TRUNCATION_MARKER}{tail}")
}
