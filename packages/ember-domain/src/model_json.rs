use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?s)```[A-Za-z0-9_-]*\s*(.*?)```").expect("Code fence pattern must compile.")
});

/// Pulls one JSON document out of a model reply.
///
/// Accepts a bare document, a fenced block, or a document surrounded by prose.
pub fn extract_json(text: &str) -> Option<Value> {
	let trimmed = text.trim();

	if trimmed.is_empty() {
		return None;
	}
	if let Ok(value) = serde_json::from_str(trimmed) {
		return Some(value);
	}

	for captures in CODE_FENCE.captures_iter(trimmed) {
		if let Some(body) = captures.get(1)
			&& let Ok(value) = serde_json::from_str(body.as_str().trim())
		{
			return Some(value);
		}
	}

	for (open, close) in [('{', '}'), ('[', ']')] {
		if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close))
			&& start < end
			&& let Ok(value) = serde_json::from_str(&trimmed[start..=end])
		{
			return Some(value);
		}
	}

	None
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unwraps_fenced_json() {
		let value = extract_json("Sure:\n```json\n{\"memories\": []}\n```").expect("Expected JSON.");

		assert!(value.get("memories").is_some());
	}

	#[test]
	fn finds_object_inside_prose() {
		let value = extract_json("Here you go {\"a\": 1} hope it helps").expect("Expected JSON.");

		assert_eq!(value["a"], 1);
	}

	#[test]
	fn plain_text_is_not_json() {
		assert!(extract_json("no structured content here").is_none());
	}
}
