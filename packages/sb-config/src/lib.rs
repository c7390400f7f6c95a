mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, EnrichmentProviderConfig, Notes, Postgres, Providers, Search,
	Security, SecurityAuthKey, Service, Storage, Tags,
};

use std::{collections::HashSet, fs, path::Path};

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
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}

	for (label, key, timeout_ms) in [
		("embedding", &cfg.providers.embedding.api_key, cfg.providers.embedding.timeout_ms),
		("enrichment", &cfg.providers.enrichment.api_key, cfg.providers.enrichment.timeout_ms),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
		if timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("providers.{label}.timeout_ms must be greater than zero."),
			});
		}
	}

	let temperature = cfg.providers.enrichment.temperature;

	if !temperature.is_finite() {
		return Err(Error::Validation {
			message: "providers.enrichment.temperature must be a finite number.".to_string(),
		});
	}
	if !(0.0..=2.0).contains(&temperature) {
		return Err(Error::Validation {
			message: "providers.enrichment.temperature must be in the range 0.0-2.0.".to_string(),
		});
	}
	if cfg.providers.enrichment.max_tokens == 0 {
		return Err(Error::Validation {
			message: "providers.enrichment.max_tokens must be greater than zero.".to_string(),
		});
	}

	for (label, value) in [
		("notes.page_size", cfg.notes.page_size),
		("notes.default_limit", cfg.notes.default_limit),
		("notes.max_limit", cfg.notes.max_limit),
		("notes.max_content_chars", cfg.notes.max_content_chars),
		("search.match_count", cfg.search.match_count),
		("search.keyword_limit", cfg.search.keyword_limit),
		("search.tag_limit", cfg.search.tag_limit),
		("tags.sample_limit", cfg.tags.sample_limit),
		("tags.top_n", cfg.tags.top_n),
	] {
		if value == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	if cfg.notes.default_limit > cfg.notes.max_limit {
		return Err(Error::Validation {
			message: "notes.default_limit must be at most notes.max_limit.".to_string(),
		});
	}
	if !cfg.search.match_threshold.is_finite() {
		return Err(Error::Validation {
			message: "search.match_threshold must be a finite number.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&cfg.search.match_threshold) {
		return Err(Error::Validation {
			message: "search.match_threshold must be in the range 0.0-1.0.".to_string(),
		});
	}

	validate_security(&cfg.security)
}

fn validate_security(security: &Security) -> Result<()> {
	match security.auth_mode.as_str() {
		"static_keys" => {
			if security.auth_keys.is_empty() {
				return Err(Error::Validation {
					message: "security.auth_keys must be non-empty when security.auth_mode is static_keys."
						.to_string(),
				});
			}

			let mut tokens = HashSet::new();

			for key in &security.auth_keys {
				for (label, value) in [
					("security.auth_keys.token_id", &key.token_id),
					("security.auth_keys.token", &key.token),
					("security.auth_keys.owner_id", &key.owner_id),
				] {
					if value.trim().is_empty() {
						return Err(Error::Validation {
							message: format!("{label} must be non-empty."),
						});
					}
				}

				if !tokens.insert(key.token.as_str()) {
					return Err(Error::Validation {
						message: format!(
							"security.auth_keys.token for {} duplicates another key.",
							key.token_id
						),
					});
				}
			}
		},
		"trusted_header" => {
			if security.owner_header.is_empty() {
				return Err(Error::Validation {
					message: "security.owner_header must be non-empty.".to_string(),
				});
			}
			if !security.bind_localhost_only {
				return Err(Error::Validation {
					message: "security.bind_localhost_only must be true when security.auth_mode is trusted_header."
						.to_string(),
				});
			}
		},
		_ => {
			return Err(Error::Validation {
				message: "security.auth_mode must be one of static_keys or trusted_header."
					.to_string(),
			});
		},
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg
		.providers
		.enrichment
		.system_prompt
		.as_deref()
		.map(|prompt| prompt.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.providers.enrichment.system_prompt = None;
	}

	cfg.security.owner_header = cfg.security.owner_header.trim().to_ascii_lowercase();
}
