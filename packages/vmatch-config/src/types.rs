use std::{
	collections::{BTreeMap, BTreeSet},
	path::PathBuf,
};

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub search: Search,
	#[serde(default)]
	pub liftover: Liftover,
	#[serde(default)]
	pub matchmaker: Matchmaker,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Search {
	/// Ceiling on the number of variants a single "load all" request may materialize.
	pub max_variants: u64,
	pub default_num_results: u32,
	pub cache: SearchCache,
	#[serde(default)]
	pub backend_errors: BackendErrors,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchCache {
	pub enabled: bool,
	pub ttl_days: i64,
}

/// Status mapping for errors raised by the variant index.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendErrors {
	/// Backend error kind to HTTP status, e.g. `connection = 504`.
	#[serde(default)]
	pub status_by_kind: BTreeMap<String, u16>,
	/// Kinds that are expected during normal operation and must not count as error-rate noise.
	#[serde(default)]
	pub quiet_kinds: BTreeSet<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Liftover {
	/// UCSC chain file (plain or gzip) mapping GRCh37 coordinates onto GRCh38.
	pub grch37_to_grch38_chain: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct Matchmaker {
	#[serde(default = "default_external_match_tag")]
	pub external_match_tag: String,
}
impl Default for Matchmaker {
	fn default() -> Self {
		Self { external_match_tag: default_external_match_tag() }
	}
}

fn default_external_match_tag() -> String {
	"seqr MME".to_string()
}
