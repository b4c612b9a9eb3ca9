use std::collections::BTreeMap;

use crate::{
	BoxFuture, Error, Result, VariantIndex,
	search::{GeneCounts, SortKey, VariantRecord, cache::CachedSearch, query::VariantQuery},
};

pub(crate) const TOO_MANY_VARIANTS: &str =
	"Too many variants to load. Please refine your search and try again";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
	/// 1-based.
	pub page: u32,
	pub num_results: u32,
	pub load_all: bool,
}
impl PageRequest {
	fn start(&self) -> usize {
		self.page.saturating_sub(1) as usize * self.num_results as usize
	}

	fn end(&self) -> usize {
		self.page as usize * self.num_results as usize
	}
}

pub enum PreviousResults<T> {
	/// The cached state already answers the request.
	Cached(T),
	/// The index must be queried, with possibly revised paging.
	Revised(PageRequest),
}

/// A result-shaping strategy over the variant index.
///
/// Both strategies share the cache contract: `process_previous_results` decides whether the
/// cached state answers a request, and `search` advances that state by querying the index.
pub trait SearchBackend
where
	Self: Send + Sync,
{
	type Output: Send;

	/// `None` when results are not sorted; such searches share the `xpos` cache entry.
	fn sort(&self) -> Option<SortKey>;

	fn process_previous_results(
		&self,
		previous: &CachedSearch,
		request: PageRequest,
	) -> PreviousResults<Self::Output>;

	fn search<'a>(
		&'a self,
		index: &'a dyn VariantIndex,
		query: &'a VariantQuery,
		state: &'a mut CachedSearch,
		request: PageRequest,
	) -> BoxFuture<'a, Result<Self::Output>>;
}

/// Per-variant records, paged in sort order.
#[derive(Debug, Clone)]
pub struct VariantSearch {
	pub sort: SortKey,
	pub max_variants: u64,
}
impl VariantSearch {
	pub fn new(sort: SortKey, max_variants: u64) -> Self {
		Self { sort, max_variants }
	}

	async fn load(
		&self,
		index: &dyn VariantIndex,
		query: &VariantQuery,
		state: &mut CachedSearch,
		request: PageRequest,
	) -> Result<Vec<VariantRecord>> {
		// Loaded records without a cursor cannot be resumed, so restart from the first result.
		if state.cursor.is_none() && !state.is_fully_loaded() {
			state.all_results.clear();
		}

		loop {
			let target = if request.load_all {
				match state.total_results {
					Some(total) if total >= self.max_variants =>
						return Err(Error::invalid_search(TOO_MANY_VARIANTS)),
					Some(total) => Some(total as usize),
					None => None,
				}
			} else {
				Some(request.end())
			};
			let loaded = state.all_results.len();
			let size = match target {
				Some(target) if loaded >= target => break,
				Some(target) => target - loaded,
				None => request.num_results as usize,
			};

			if loaded > 0 && state.cursor.is_none() {
				break;
			}

			let page = index.search(query, state.cursor.as_deref(), size).await?;
			let exhausted = page.cursor.is_none() || page.records.is_empty();

			tracing::debug!(
				fetched = page.records.len(),
				total = page.total,
				exhausted,
				"Fetched variant page."
			);

			state.total_results = Some(page.total);
			state.cursor = page.cursor;
			state.all_results.extend(page.records);

			if exhausted {
				break;
			}
		}

		let end = if request.load_all {
			state.all_results.len()
		} else {
			request.end().min(state.all_results.len())
		};
		let start = if request.load_all { 0 } else { request.start().min(end) };

		Ok(state.all_results[start..end].to_vec())
	}
}
impl SearchBackend for VariantSearch {
	type Output = Vec<VariantRecord>;

	fn sort(&self) -> Option<SortKey> {
		Some(self.sort)
	}

	fn process_previous_results(
		&self,
		previous: &CachedSearch,
		request: PageRequest,
	) -> PreviousResults<Self::Output> {
		let Some(total) = previous.total_results else {
			return PreviousResults::Revised(request);
		};
		let total = total as usize;
		let (start, end) =
			if request.load_all { (0, total) } else { (request.start(), request.end().min(total)) };

		if previous.all_results.len() >= end {
			return PreviousResults::Cached(previous.all_results[start.min(end)..end].to_vec());
		}

		PreviousResults::Revised(request)
	}

	fn search<'a>(
		&'a self,
		index: &'a dyn VariantIndex,
		query: &'a VariantQuery,
		state: &'a mut CachedSearch,
		request: PageRequest,
	) -> BoxFuture<'a, Result<Self::Output>> {
		Box::pin(self.load(index, query, state, request))
	}
}

/// Variant counts per gene instead of records.
#[derive(Debug, Clone, Default)]
pub struct GeneAggSearch;
impl SearchBackend for GeneAggSearch {
	type Output = BTreeMap<String, GeneCounts>;

	fn sort(&self) -> Option<SortKey> {
		None
	}

	fn process_previous_results(
		&self,
		previous: &CachedSearch,
		request: PageRequest,
	) -> PreviousResults<Self::Output> {
		if let Some(gene_aggs) = &previous.gene_aggs {
			return PreviousResults::Cached(gene_aggs.clone());
		}
		if previous.is_fully_loaded() {
			return PreviousResults::Cached(count_genes(&previous.all_results));
		}

		PreviousResults::Revised(request)
	}

	fn search<'a>(
		&'a self,
		index: &'a dyn VariantIndex,
		query: &'a VariantQuery,
		state: &'a mut CachedSearch,
		_request: PageRequest,
	) -> BoxFuture<'a, Result<Self::Output>> {
		Box::pin(async move {
			let counts = index.gene_counts(query).await?;

			state.gene_aggs = Some(counts.clone());

			Ok(counts)
		})
	}
}

/// Counts records by main transcript gene, in total and per family.
pub fn count_genes<'a, I>(records: I) -> BTreeMap<String, GeneCounts>
where
	I: IntoIterator<Item = &'a VariantRecord>,
{
	let mut counts: BTreeMap<String, GeneCounts> = BTreeMap::new();

	for record in records {
		let Some(gene_id) = record.main_gene_id() else {
			continue;
		};
		let entry = counts.entry(gene_id.to_string()).or_default();

		entry.total += 1;

		for family in &record.family_guids {
			*entry.families.entry(family.clone()).or_default() += 1;
		}
	}

	counts
}

#[cfg(test)]
mod tests {
	use super::{CachedSearch, PageRequest, PreviousResults, SearchBackend, VariantSearch};
	use crate::search::{DatasetType, SortKey, VariantRecord};

	fn record(pos: u64) -> VariantRecord {
		VariantRecord {
			variant_id: format!("1-{pos}-A-G"),
			chrom: "1".to_string(),
			pos,
			end: None,
			xpos: 1_000_000_000 + pos as i64,
			ref_allele: Some("A".to_string()),
			alt_allele: Some("G".to_string()),
			rsid: None,
			dataset_type: DatasetType::Variants,
			sv_type: None,
			family_guids: vec!["F1".to_string()],
			gene_ids: Vec::new(),
			consequences: Vec::new(),
			clinvar_significance: None,
			populations: Default::default(),
			in_silico: Default::default(),
			genotype_quality: None,
			allele_balance: None,
			filters: Vec::new(),
		}
	}

	fn cached(total: u64, loaded: u64) -> CachedSearch {
		CachedSearch {
			total_results: Some(total),
			all_results: (1..=loaded).map(record).collect(),
			cursor: Some("c".to_string()),
			gene_aggs: None,
		}
	}

	fn page(page: u32, num_results: u32, load_all: bool) -> PageRequest {
		PageRequest { page, num_results, load_all }
	}

	#[test]
	fn loaded_pages_are_served_from_cache() {
		let backend = VariantSearch::new(SortKey::Xpos, 100);
		let PreviousResults::Cached(hit) =
			backend.process_previous_results(&cached(10, 4), page(2, 2, false))
		else {
			panic!("Expected a cached page.");
		};

		assert_eq!(hit.iter().map(|record| record.pos).collect::<Vec<_>>(), vec![3, 4]);
		assert!(matches!(
			backend.process_previous_results(&cached(10, 4), page(3, 2, false)),
			PreviousResults::Revised(_)
		));
	}

	#[test]
	fn last_page_is_clamped_to_the_total() {
		let backend = VariantSearch::new(SortKey::Xpos, 100);
		let PreviousResults::Cached(hit) =
			backend.process_previous_results(&cached(5, 5), page(2, 3, false))
		else {
			panic!("Expected a cached page.");
		};

		assert_eq!(hit.len(), 2);
		assert!(matches!(
			backend.process_previous_results(&cached(5, 5), page(4, 3, false)),
			PreviousResults::Cached(records) if records.is_empty()
		));
	}

	#[test]
	fn load_all_needs_every_record() {
		let backend = VariantSearch::new(SortKey::Xpos, 100);

		assert!(matches!(
			backend.process_previous_results(&cached(5, 4), page(1, 2, true)),
			PreviousResults::Revised(_)
		));
		assert!(matches!(
			backend.process_previous_results(&cached(5, 5), page(1, 2, true)),
			PreviousResults::Cached(records) if records.len() == 5
		));
		assert!(matches!(
			backend.process_previous_results(&CachedSearch::default(), page(1, 2, false)),
			PreviousResults::Revised(_)
		));
	}
}
