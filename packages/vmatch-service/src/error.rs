use std::collections::{BTreeMap, BTreeSet};

use vmatch_config::BackendErrors;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{message}")]
	InvalidSearch { message: String },
	#[error("Invalid coordinate: {message}")]
	InvalidCoordinate { message: String },
	#[error("Invalid submission {submission}: {message}")]
	InvalidSubmission { submission: String, message: String },
	#[error("No matches found for {submission} (family {family}) - {variant}")]
	UnresolvedVariant { submission: String, family: String, variant: String },
	#[error(
		"{count} matches found for {submission} (family {family}) - {variant}: {}",
		candidates.join(", ")
	)]
	AmbiguousVariant {
		submission: String,
		family: String,
		variant: String,
		count: usize,
		candidates: Vec<String>,
	},
	#[error("Search backend error ({kind}): {message}")]
	Backend { kind: String, message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl Error {
	pub(crate) fn invalid_search(message: impl Into<String>) -> Self {
		Self::InvalidSearch { message: message.into() }
	}
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}
impl From<vmatch_storage::Error> for Error {
	fn from(err: vmatch_storage::Error) -> Self {
		match err {
			vmatch_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			vmatch_storage::Error::InvalidArgument(message) => Self::Storage { message },
			vmatch_storage::Error::NotFound(message) => Self::Storage { message },
		}
	}
}
impl From<vmatch_domain::Error> for Error {
	fn from(err: vmatch_domain::Error) -> Self {
		match err {
			vmatch_domain::Error::InvalidCoordinate { message } =>
				Self::InvalidCoordinate { message },
			vmatch_domain::Error::InvalidVariantId(raw) =>
				Self::InvalidCoordinate { message: format!("Invalid variant ID: {raw}") },
			other => Self::Storage { message: other.to_string() },
		}
	}
}

/// Maps errors onto the status codes the request layer reports.
#[derive(Debug, Clone, Default)]
pub struct ErrorPolicy {
	status_by_kind: BTreeMap<String, u16>,
	quiet_kinds: BTreeSet<String>,
}
impl ErrorPolicy {
	pub fn new(cfg: &BackendErrors) -> Self {
		Self { status_by_kind: cfg.status_by_kind.clone(), quiet_kinds: cfg.quiet_kinds.clone() }
	}

	pub fn status_code(&self, err: &Error) -> u16 {
		match err {
			Error::InvalidSearch { .. } => 400,
			Error::Backend { kind, .. } => self.status_by_kind.get(kind).copied().unwrap_or(500),
			_ => 500,
		}
	}

	/// Whether the error should be reported at `error` level.
	pub fn should_log(&self, err: &Error) -> bool {
		match err {
			Error::Backend { kind, .. } => !self.quiet_kinds.contains(kind),
			_ => true,
		}
	}
}
