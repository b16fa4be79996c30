use uuid::Uuid;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error(
		"Memory {memory_id} was changed by someone else: expected version {expected}, current version {current}."
	)]
	VersionConflict { memory_id: Uuid, expected: i64, current: i64 },
	#[error("{message}")]
	Ambiguous { message: String },
	#[error("Configuration error: {message}")]
	Configuration { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl Error {
	/// Whether a later attempt could succeed without anyone changing configuration or input.
	pub fn is_retryable(&self) -> bool {
		!matches!(self, Self::Configuration { .. } | Self::InvalidRequest { .. })
	}

	pub(crate) fn invalid(message: impl Into<String>) -> Self {
		Self::InvalidRequest { message: message.into() }
	}
}

impl From<ember_storage::Error> for Error {
	fn from(err: ember_storage::Error) -> Self {
		match err {
			ember_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			other => Self::Storage { message: other.to_string() },
		}
	}
}

impl From<ember_providers::Error> for Error {
	fn from(err: ember_providers::Error) -> Self {
		if err.is_configuration() {
			Self::Configuration { message: err.to_string() }
		} else {
			Self::Provider { message: err.to_string() }
		}
	}
}
