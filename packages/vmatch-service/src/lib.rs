pub mod matchmaker;
pub mod pg;
pub mod search;

mod error;

pub use error::{Error, ErrorPolicy, Result};
pub use matchmaker::{
	FeatureGene, FeatureVariant, GenomicFeature, MatchmakerSubmission, SavedVariant,
	SubmissionVariantLink,
	linker::{LinkReport, SubmissionLinker},
	matcher::VariantMatcher,
};
pub use search::{
	DatasetType, FrequencyFilter, GeneCounts, Inheritance, LocusFilter, QualityFilter,
	SearchModel, SearchOptions, SearchResults, SearchSpec, SortKey, VariantRecord,
	backend::{GeneAggSearch, PageRequest, PreviousResults, SearchBackend, VariantSearch},
	cache::{CachedSearch, cache_key},
	locus::{Gene, ResolvedLocus},
	memory_index::MemoryIndex,
	query::VariantQuery,
};

use std::{collections::BTreeMap, future::Future, pin::Pin, sync::Arc};

use serde_json::Value;

use vmatch_config::Search;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Key-value store holding previous search state.
pub trait SearchCacheStore
where
	Self: Send + Sync,
{
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Value>>>;

	fn set<'a>(
		&'a self,
		key: &'a str,
		value: Value,
		ttl: time::Duration,
	) -> BoxFuture<'a, Result<()>>;
}

/// Paged access to the variant index.
pub trait VariantIndex
where
	Self: Send + Sync,
{
	/// Fetches up to `size` records, continuing from `cursor` when one is given.
	fn search<'a>(
		&'a self,
		query: &'a VariantQuery,
		cursor: Option<&'a str>,
		size: usize,
	) -> BoxFuture<'a, Result<IndexPage>>;

	fn gene_counts<'a>(
		&'a self,
		query: &'a VariantQuery,
	) -> BoxFuture<'a, Result<BTreeMap<String, GeneCounts>>>;
}

/// Resolves gene IDs and symbols.
pub trait GeneCatalog
where
	Self: Send + Sync,
{
	fn lookup<'a>(&'a self, tokens: &'a [String]) -> BoxFuture<'a, Result<Vec<Gene>>>;
}

/// Read access to submissions and saved variants, plus the single bulk link write.
pub trait MatchmakerStore
where
	Self: Send + Sync,
{
	fn submissions_with_features<'a>(&'a self) -> BoxFuture<'a, Result<Vec<MatchmakerSubmission>>>;

	fn saved_variants_for_families<'a>(
		&'a self,
		family_pks: &'a [i64],
	) -> BoxFuture<'a, Result<Vec<SavedVariant>>>;

	fn insert_links<'a>(
		&'a self,
		links: &'a [SubmissionVariantLink],
	) -> BoxFuture<'a, Result<u64>>;
}

/// One page of index results.
#[derive(Debug, Clone, Default)]
pub struct IndexPage {
	pub records: Vec<VariantRecord>,
	pub total: u64,
	/// `None` once the index has nothing further to return.
	pub cursor: Option<String>,
}

pub struct SearchService {
	pub cfg: Search,
	pub index: Arc<dyn VariantIndex>,
	pub cache: Arc<dyn SearchCacheStore>,
	pub genes: Arc<dyn GeneCatalog>,
}
impl SearchService {
	pub fn new(
		cfg: Search,
		index: Arc<dyn VariantIndex>,
		cache: Arc<dyn SearchCacheStore>,
		genes: Arc<dyn GeneCatalog>,
	) -> Self {
		Self { cfg, index, cache, genes }
	}
}
