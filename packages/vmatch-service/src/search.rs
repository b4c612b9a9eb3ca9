pub mod backend;
pub mod cache;
pub mod locus;
pub mod memory_index;
pub mod query;

mod model;

pub use model::{
	DatasetType, FrequencyFilter, GeneCounts, Inheritance, LocusFilter, QualityFilter,
	SearchModel, SearchOptions, SearchResults, SearchSpec, SortKey, VariantRecord,
};

use std::collections::BTreeMap;

use tracing::{debug, warn};

use vmatch_domain::{locus::VariantId, xpos};

use crate::{
	Error, Result, SearchService,
	search::{
		backend::{GeneAggSearch, PageRequest, PreviousResults, SearchBackend, VariantSearch},
		cache::{CachedSearch, cache_key},
		locus::ResolvedLocus,
		query::VariantQuery,
	},
};

impl SearchService {
	/// Runs a saved search, serving from and updating the per-(search, sort) cache.
	pub async fn get_variants(
		&self,
		search: &SearchModel,
		options: SearchOptions,
	) -> Result<SearchResults> {
		let backend = VariantSearch::new(options.sort, self.cfg.max_variants);
		let (variants, total_results) = self.execute(search, &backend, options).await?;

		Ok(SearchResults { variants, total_results })
	}

	/// Variant counts per gene for a saved search. Shares the `xpos` cache entry.
	pub async fn get_variant_gene_counts(
		&self,
		search: &SearchModel,
	) -> Result<BTreeMap<String, GeneCounts>> {
		let (counts, _) = self.execute(search, &GeneAggSearch, SearchOptions::default()).await?;

		Ok(counts)
	}

	/// Looks up one variant without touching the cache.
	pub async fn get_single_variant(
		&self,
		families: &[String],
		variant_id: &str,
	) -> Result<VariantRecord> {
		let id = parse_variant_ids(&[variant_id.to_string()])?;
		let query =
			VariantQuery::for_families(families).with_locus(ResolvedLocus::VariantIds(id));
		let page = self.index.search(&query, None, 1).await?;

		page.records
			.into_iter()
			.next()
			.ok_or_else(|| Error::invalid_search(format!("Variant {variant_id} not found")))
	}

	pub async fn get_variants_for_variant_ids(
		&self,
		families: &[String],
		variant_ids: &[String],
		dataset_type: Option<DatasetType>,
	) -> Result<Vec<VariantRecord>> {
		let ids = parse_variant_ids(variant_ids)?;
		let size = ids.len();
		let mut query =
			VariantQuery::for_families(families).with_locus(ResolvedLocus::VariantIds(ids));

		if let Some(dataset_type) = dataset_type {
			query = query.with_dataset_type(dataset_type);
		}

		Ok(self.index.search(&query, None, size).await?.records)
	}

	/// Looks up `(xpos, ref, alt)` triples among variant calls.
	pub async fn get_variants_for_variant_tuples(
		&self,
		families: &[String],
		tuples: &[(i64, String, String)],
	) -> Result<Vec<VariantRecord>> {
		let mut variant_ids = Vec::with_capacity(tuples.len());

		for (xpos, ref_allele, alt_allele) in tuples {
			let (chrom, pos) = xpos::get_chrom_pos(*xpos)?;
			let chrom = if chrom == "M" { "MT" } else { chrom };

			variant_ids.push(format!("{chrom}-{pos}-{ref_allele}-{alt_allele}"));
		}

		self.get_variants_for_variant_ids(families, &variant_ids, Some(DatasetType::Variants))
			.await
	}

	async fn execute<B>(
		&self,
		search: &SearchModel,
		backend: &B,
		options: SearchOptions,
	) -> Result<(B::Output, Option<u64>)>
	where
		B: SearchBackend,
	{
		let key = cache_key(&search.guid, backend.sort());
		let previous = self.read_cache(&key).await;
		let request = PageRequest {
			page: options.page.max(1),
			num_results: options.num_results.unwrap_or(self.cfg.default_num_results),
			load_all: options.load_all,
		};
		let mut request = match backend.process_previous_results(&previous, request) {
			PreviousResults::Cached(results) => {
				debug!(cache_key = %key, search_guid = %search.guid, "Search served from cache.");

				return Ok((results, previous.total_results));
			},
			PreviousResults::Revised(request) => request,
		};

		if request.load_all
			&& previous.total_results.is_some_and(|total| total >= self.cfg.max_variants)
		{
			return Err(Error::invalid_search(backend::TOO_MANY_VARIANTS));
		}

		let locus = locus::resolve_locus(search.search.locus.as_ref(), self.genes.as_ref()).await?;

		if let ResolvedLocus::VariantIds(ids) = &locus {
			request.num_results = ids.len() as u32;
		}

		let query = VariantQuery::for_families(&search.families)
			.with_filters(&search.search)
			.with_locus(locus)
			.with_skip_genotype_filter(options.skip_genotype_filter)
			.with_sort(backend.sort().unwrap_or_default());
		let mut state = previous;

		debug!(
			cache_key = %key,
			search_guid = %search.guid,
			page = request.page,
			num_results = request.num_results,
			load_all = request.load_all,
			"Search cache miss."
		);

		let results = backend.search(self.index.as_ref(), &query, &mut state, request).await?;

		self.write_cache(&key, &state).await;

		Ok((results, state.total_results))
	}

	// Cache failures degrade to a fresh query rather than failing the search.
	async fn read_cache(&self, key: &str) -> CachedSearch {
		if !self.cfg.cache.enabled {
			return CachedSearch::default();
		}

		match self.cache.get(key).await {
			Ok(Some(value)) => CachedSearch::decode(key, value),
			Ok(None) => CachedSearch::default(),
			Err(err) => {
				warn!(error = %err, cache_key = %key, "Search cache read failed.");

				CachedSearch::default()
			},
		}
	}

	async fn write_cache(&self, key: &str, state: &CachedSearch) {
		if !self.cfg.cache.enabled {
			return;
		}

		let value = match serde_json::to_value(state) {
			Ok(value) => value,
			Err(err) => {
				warn!(error = %err, cache_key = %key, "Failed to encode search cache entry.");

				return;
			},
		};
		let ttl = time::Duration::days(self.cfg.cache.ttl_days);

		if let Err(err) = self.cache.set(key, value, ttl).await {
			warn!(error = %err, cache_key = %key, "Search cache write failed.");
		}
	}
}

fn parse_variant_ids(raw: &[String]) -> Result<Vec<VariantId>> {
	let mut ids = Vec::with_capacity(raw.len());
	let mut invalid = Vec::new();

	for item in raw {
		match VariantId::parse_validated(item) {
			Ok(id) => ids.push(id),
			Err(_) => invalid.push(item.as_str()),
		}
	}

	if !invalid.is_empty() {
		return Err(Error::invalid_search(format!("Invalid variants: {}", invalid.join(", "))));
	}

	Ok(ids)
}
