mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, Providers, Qdrant, Rerank, Retrieval, Retry, Service,
	SparseProviderConfig, Storage,
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
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.session_idle_ttl_secs == 0 {
		return Err(Error::Validation {
			message: "service.session_idle_ttl_secs must be greater than zero.".to_string(),
		});
	}
	if cfg.service.max_sessions == 0 {
		return Err(Error::Validation {
			message: "service.max_sessions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}
	if cfg.providers.embedding.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "Provider embedding api_key must be non-empty.".to_string(),
		});
	}

	for (label, value) in [
		("storage.qdrant.dense_collection", &cfg.storage.qdrant.dense_collection),
		("storage.qdrant.sparse_collection", &cfg.storage.qdrant.sparse_collection),
		("storage.qdrant.ingredients_vector", &cfg.storage.qdrant.ingredients_vector),
		("storage.qdrant.content_vector", &cfg.storage.qdrant.content_vector),
		("storage.qdrant.sparse_vector", &cfg.storage.qdrant.sparse_vector),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.storage.qdrant.ingredients_vector == cfg.storage.qdrant.content_vector {
		return Err(Error::Validation {
			message: "storage.qdrant.ingredients_vector and storage.qdrant.content_vector must differ."
				.to_string(),
		});
	}

	let sparse = &cfg.providers.sparse;

	if sparse.strict && sparse.params_path.is_none() {
		return Err(Error::Validation {
			message: "providers.sparse.params_path is required when providers.sparse.strict is true."
				.to_string(),
		});
	}

	validate_retrieval(&cfg.retrieval)?;
	validate_rerank(&cfg.rerank)?;

	Ok(())
}

fn validate_retrieval(retrieval: &Retrieval) -> Result<()> {
	for (label, value) in [
		("retrieval.top_k", retrieval.top_k),
		("retrieval.top_n", retrieval.fused_limit()),
		("retrieval.rrf_k", retrieval.rrf_k),
		("retrieval.retry.max_attempts", retrieval.retry.max_attempts),
	] {
		if value == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	if !retrieval.similarity_threshold.is_finite() {
		return Err(Error::Validation {
			message: "retrieval.similarity_threshold must be a finite number.".to_string(),
		});
	}
	if retrieval.retry.base_delay_ms > retrieval.retry.max_delay_ms {
		return Err(Error::Validation {
			message: "retrieval.retry.base_delay_ms must not exceed retrieval.retry.max_delay_ms."
				.to_string(),
		});
	}
	if retrieval.retry.call_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "retrieval.retry.call_timeout_ms must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn validate_rerank(rerank: &Rerank) -> Result<()> {
	for (label, value) in
		[("rerank.mmr_lambda", rerank.mmr_lambda), ("rerank.blend_lambda", rerank.blend_lambda)]
	{
		if !value.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if !(0.0..=1.0).contains(&value) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 0.0-1.0."),
			});
		}
	}

	if !rerank.learning_rate.is_finite() || rerank.learning_rate <= 0.0 {
		return Err(Error::Validation {
			message: "rerank.learning_rate must be a finite number greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg
		.providers
		.sparse
		.params_path
		.as_deref()
		.map(|path| path.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.providers.sparse.params_path = None;
	}

	cfg.retrieval.top_n = Some(cfg.retrieval.fused_limit());
	cfg.service.log_level = cfg.service.log_level.trim().to_string();
}
