use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};
use ember_config::LlmProviderConfig;
use ember_domain::BoxFuture;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
	pub prompt_tokens: u64,
	pub completion_tokens: u64,
	/// Provider-reported cost in USD; zero when the provider does not report one.
	pub cost: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Completion {
	pub text: String,
	pub model: String,
	pub usage: Usage,
}

pub trait LlmProvider
where
	Self: Send + Sync,
{
	fn model(&self) -> &str;

	/// One chat exchange asking for a JSON object reply.
	fn complete<'a>(&'a self, messages: &'a [Value]) -> BoxFuture<'a, Result<Completion>>;
}

/// OpenAI-compatible `/chat/completions` client.
pub struct HttpLlm {
	cfg: LlmProviderConfig,
	client: Client,
}
impl HttpLlm {
	pub fn new(cfg: LlmProviderConfig) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

		Ok(Self { cfg, client })
	}

	async fn complete_remote(&self, messages: &[Value]) -> Result<Completion> {
		let headers = crate::auth_headers(
			&self.cfg.provider_id,
			self.cfg.api_key.as_deref(),
			&self.cfg.default_headers,
		)?;
		let url = format!("{}{}", self.cfg.api_base, self.cfg.path);
		let body = serde_json::json!({
			"model": self.cfg.model,
			"temperature": self.cfg.temperature,
			"response_format": { "type": "json_object" },
			"messages": messages,
		});
		let res = self.client.post(url).headers(headers).json(&body).send().await?;
		let json = crate::read_json(&self.cfg.provider_id, res).await?;

		parse_completion(json, &self.cfg.model)
	}
}

impl LlmProvider for HttpLlm {
	fn model(&self) -> &str {
		&self.cfg.model
	}

	fn complete<'a>(&'a self, messages: &'a [Value]) -> BoxFuture<'a, Result<Completion>> {
		Box::pin(self.complete_remote(messages))
	}
}

fn parse_completion(json: Value, requested_model: &str) -> Result<Completion> {
	let text = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Completion response is missing choices[0].message.content.".to_string(),
		})?;
	let model = json.get("model").and_then(|v| v.as_str()).unwrap_or(requested_model).to_string();

	Ok(Completion { text: text.to_string(), model, usage: parse_usage(json.get("usage")) })
}

fn parse_usage(usage: Option<&Value>) -> Usage {
	let Some(usage) = usage else { return Usage::default() };
	let count = |key: &str| usage.get(key).and_then(|v| v.as_u64()).unwrap_or(0);
	let cost = usage
		.get("cost")
		.or_else(|| usage.get("total_cost"))
		.and_then(|v| v.as_f64())
		.filter(|cost| cost.is_finite())
		.unwrap_or(0.0);

	Usage { prompt_tokens: count("prompt_tokens"), completion_tokens: count("completion_tokens"), cost }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_content_and_usage() {
		let json = serde_json::json!({
			"model": "openai/gpt-4o-mini",
			"choices": [{ "message": { "content": "{\"memories\": []}" } }],
			"usage": { "prompt_tokens": 120, "completion_tokens": 8, "cost": 0.00042 }
		});
		let completion = parse_completion(json, "fallback").expect("parse failed");

		assert_eq!(completion.text, "{\"memories\": []}");
		assert_eq!(completion.model, "openai/gpt-4o-mini");
		assert_eq!(completion.usage.prompt_tokens, 120);
		assert_eq!(completion.usage.completion_tokens, 8);
		assert!((completion.usage.cost - 0.00042).abs() < 1e-12);
	}

	#[test]
	fn missing_usage_defaults_to_zero() {
		let json = serde_json::json!({ "choices": [{ "message": { "content": "{}" } }] });
		let completion = parse_completion(json, "m").expect("parse failed");

		assert_eq!(completion.model, "m");
		assert_eq!(completion.usage, Usage::default());
	}
}
