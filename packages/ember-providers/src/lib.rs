pub mod embedding;
pub mod llm;

mod error;

pub use embedding::{EmbeddingProvider, HttpEmbedding};
pub use error::{Error, Result};
pub use llm::{Completion, HttpLlm, LlmProvider, Usage};

use reqwest::{
	Response, StatusCode,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

pub fn auth_headers(
	provider_id: &str,
	api_key: Option<&str>,
	default_headers: &Map<String, Value>,
) -> Result<HeaderMap> {
	let Some(api_key) = api_key.map(str::trim).filter(|key| !key.is_empty()) else {
		return Err(Error::MissingCredentials { provider_id: provider_id.to_string() });
	};
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: format!("Default header {key} for provider {provider_id} must be a string."),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

/// Maps credential rejections to a configuration error and other non-2xx replies to transport
/// errors.
pub(crate) async fn read_json(provider_id: &str, res: Response) -> Result<Value> {
	let status = res.status();

	if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
		return Err(Error::Unauthorized {
			provider_id: provider_id.to_string(),
			status: status.as_u16(),
		});
	}

	Ok(res.error_for_status()?.json().await?)
}
