use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};
use ember_config::EmbeddingProviderConfig;
use ember_domain::BoxFuture;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	/// Whether embedding calls are worth attempting at all.
	fn available(&self) -> bool;

	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// OpenAI-compatible `/embeddings` client. Built without a config it reports unavailable.
pub struct HttpEmbedding {
	cfg: Option<EmbeddingProviderConfig>,
	client: Client,
}
impl HttpEmbedding {
	pub fn new(cfg: Option<EmbeddingProviderConfig>) -> Result<Self> {
		let timeout_ms = cfg.as_ref().map(|cfg| cfg.timeout_ms).unwrap_or(10_000);
		let client = Client::builder().timeout(Duration::from_millis(timeout_ms)).build()?;

		Ok(Self { cfg, client })
	}

	async fn embed_remote(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
		let Some(cfg) = self.cfg.as_ref() else { return Err(Error::Unavailable) };

		if texts.is_empty() {
			return Ok(Vec::new());
		}

		let url = format!("{}{}", cfg.api_base, cfg.path);
		let body = serde_json::json!({
			"model": cfg.model,
			"input": texts,
			"dimensions": cfg.dimensions,
		});
		let headers =
			crate::auth_headers(&cfg.provider_id, cfg.api_key.as_deref(), &cfg.default_headers)?;
		let res = self.client.post(url).headers(headers).json(&body).send().await?;
		let json = crate::read_json(&cfg.provider_id, res).await?;
		let vectors = parse_embedding_response(json)?;

		if vectors.len() != texts.len() {
			return Err(Error::InvalidResponse {
				message: format!(
					"Embedding provider returned {} vectors for {} inputs.",
					vectors.len(),
					texts.len()
				),
			});
		}

		Ok(vectors)
	}
}

impl EmbeddingProvider for HttpEmbedding {
	fn available(&self) -> bool {
		self.cfg.is_some()
	}

	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(self.embed_remote(texts))
	}
}

fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>> {
	let data = json.get("data").and_then(|v| v.as_array()).ok_or_else(|| {
		Error::InvalidResponse { message: "Embedding response is missing data array.".to_string() }
	})?;
	let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());

	for (fallback_index, item) in data.iter().enumerate() {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.map(|v| v as usize)
			.unwrap_or(fallback_index);
		let embedding = item.get("embedding").and_then(|v| v.as_array()).ok_or_else(|| {
			Error::InvalidResponse {
				message: "Embedding item missing embedding array.".to_string(),
			}
		})?;
		let mut vec = Vec::with_capacity(embedding.len());

		for value in embedding {
			let number = value.as_f64().ok_or_else(|| Error::InvalidResponse {
				message: "Embedding value must be numeric.".to_string(),
			})?;

			vec.push(number as f32);
		}

		indexed.push((index, vec));
	}

	indexed.sort_by_key(|(index, _)| *index);

	Ok(indexed.into_iter().map(|(_, vec)| vec).collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_embeddings_in_index_order() {
		let json = serde_json::json!({
			"data": [
				{ "index": 1, "embedding": [2.0, 3.0] },
				{ "index": 0, "embedding": [0.5, 1.5] }
			]
		});
		let parsed = parse_embedding_response(json).expect("parse failed");

		assert_eq!(parsed, vec![vec![0.5, 1.5], vec![2.0, 3.0]]);
	}

	#[test]
	fn missing_data_is_an_invalid_response() {
		let err = parse_embedding_response(serde_json::json!({ "error": "boom" }))
			.expect_err("Expected parse failure.");

		assert!(matches!(err, Error::InvalidResponse { .. }));
	}
}
