mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, LlmProviderConfig, Memory, Passive, Postgres, Providers,
	Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);
	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	if let Some(embedding) = cfg.providers.embedding.as_ref()
		&& embedding.dimensions == 0
	{
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}

	if cfg.providers.llm.model.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.llm.model must be non-empty.".to_string(),
		});
	}
	if !cfg.providers.llm.temperature.is_finite() || cfg.providers.llm.temperature < 0.0 {
		return Err(Error::Validation {
			message: "providers.llm.temperature must be a finite number, zero or greater."
				.to_string(),
		});
	}

	validate_memory(&cfg.memory)?;
	validate_passive(&cfg.passive)?;

	Ok(())
}

fn validate_memory(memory: &Memory) -> Result<()> {
	for (label, value) in [
		("memory.min_strength", memory.min_strength),
		("memory.reinforce_amount", memory.reinforce_amount),
		("memory.decay_rate", memory.decay_rate),
	] {
		if !value.is_finite() || !(0.0..=1.0).contains(&value) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 0.0-1.0."),
			});
		}
	}

	if !memory.similarity_weight.is_finite() || memory.similarity_weight < 0.0 {
		return Err(Error::Validation {
			message: "memory.similarity_weight must be a finite number, zero or greater."
				.to_string(),
		});
	}
	if memory.max_memories == 0 {
		return Err(Error::Validation {
			message: "memory.max_memories must be greater than zero.".to_string(),
		});
	}
	if memory.capacity == 0 {
		return Err(Error::Validation {
			message: "memory.capacity must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn validate_passive(passive: &Passive) -> Result<()> {
	if passive.poll_interval_ms == 0 {
		return Err(Error::Validation {
			message: "passive.poll_interval_ms must be greater than zero.".to_string(),
		});
	}
	if passive.lease_seconds <= 0 {
		return Err(Error::Validation {
			message: "passive.lease_seconds must be greater than zero.".to_string(),
		});
	}
	if passive.max_attempts <= 0 {
		return Err(Error::Validation {
			message: "passive.max_attempts must be greater than zero.".to_string(),
		});
	}
	if passive.transcript_token_budget == 0 {
		return Err(Error::Validation {
			message: "passive.transcript_token_budget must be greater than zero.".to_string(),
		});
	}
	if passive.chars_per_token == 0 {
		return Err(Error::Validation {
			message: "passive.chars_per_token must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.service.worker_id.as_deref().map(|id| id.trim().is_empty()).unwrap_or(false) {
		cfg.service.worker_id = None;
	}
	if cfg.providers.llm.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
		cfg.providers.llm.api_key = None;
	}

	if let Some(embedding) = cfg.providers.embedding.as_mut()
		&& embedding.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false)
	{
		embedding.api_key = None;
	}
}
