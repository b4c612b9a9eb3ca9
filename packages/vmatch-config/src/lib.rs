mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	BackendErrors, Config, Liftover, Matchmaker, Postgres, Search, SearchCache, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	finish(cfg)
}

/// Parses, normalizes and validates a config document that is already in memory.
pub fn parse(raw: &str) -> Result<Config> {
	let cfg: Config = toml::from_str(raw).map_err(|err| Error::ParseDocument { source: err })?;

	finish(cfg)
}

fn finish(mut cfg: Config) -> Result<Config> {
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
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.search.max_variants == 0 {
		return Err(Error::Validation {
			message: "search.max_variants must be greater than zero.".to_string(),
		});
	}
	if cfg.search.default_num_results == 0 {
		return Err(Error::Validation {
			message: "search.default_num_results must be greater than zero.".to_string(),
		});
	}
	if cfg.search.cache.ttl_days <= 0 {
		return Err(Error::Validation {
			message: "search.cache.ttl_days must be greater than zero.".to_string(),
		});
	}

	for (kind, status) in &cfg.search.backend_errors.status_by_kind {
		if !(400..=599).contains(status) {
			return Err(Error::Validation {
				message: format!(
					"search.backend_errors.status_by_kind.{kind} must be an HTTP error status (400-599)."
				),
			});
		}
	}

	if cfg.matchmaker.external_match_tag.is_empty() {
		return Err(Error::Validation {
			message: "matchmaker.external_match_tag must be non-empty.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg
		.liftover
		.grch37_to_grch38_chain
		.as_deref()
		.map(|path| path.as_os_str().to_string_lossy().trim().is_empty())
		.unwrap_or(false)
	{
		cfg.liftover.grch37_to_grch38_chain = None;
	}

	let tag = cfg.matchmaker.external_match_tag.trim();

	if tag.len() != cfg.matchmaker.external_match_tag.len() {
		cfg.matchmaker.external_match_tag = tag.to_string();
	}
}
