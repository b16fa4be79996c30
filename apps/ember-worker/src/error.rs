pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Storage(#[from] ember_storage::Error),
	#[error(transparent)]
	Providers(#[from] ember_providers::Error),
}
