pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
	#[error(transparent)]
	InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),
	#[error(transparent)]
	InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
	#[error("Provider {provider_id} has no api_key configured.")]
	MissingCredentials { provider_id: String },
	#[error("Provider {provider_id} rejected the credentials with HTTP {status}.")]
	Unauthorized { provider_id: String, status: u16 },
	#[error("Embedding provider is not configured.")]
	Unavailable,
	#[error("{message}")]
	InvalidConfig { message: String },
	#[error("{message}")]
	InvalidResponse { message: String },
}
impl Error {
	/// Errors no retry can fix without an operator changing configuration.
	pub fn is_configuration(&self) -> bool {
		matches!(
			self,
			Self::MissingCredentials { .. }
				| Self::Unauthorized { .. }
				| Self::Unavailable
				| Self::InvalidConfig { .. }
				| Self::InvalidHeaderName(_)
				| Self::InvalidHeaderValue(_)
		)
	}
}
