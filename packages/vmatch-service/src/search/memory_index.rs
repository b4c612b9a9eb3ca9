//! An in-process [`VariantIndex`] over a fixed record list.
//!
//! Genotype and inheritance evaluation belong to the production index; this one applies the
//! site-level filters only and carries the rest of the query through untouched.

use std::{cmp::Ordering, collections::BTreeMap};

use serde::Deserialize;

use vmatch_domain::locus::VariantIdentity;

use crate::{
	BoxFuture, Error, IndexPage, Result, VariantIndex,
	search::{
		GeneCounts, SortKey, VariantRecord, backend::count_genes, locus::ResolvedLocus,
		query::VariantQuery,
	},
};

const GNOMAD_POPULATION: &str = "gnomad_genomes";

#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
	records: Vec<VariantRecord>,
}
impl MemoryIndex {
	pub fn new(records: Vec<VariantRecord>) -> Self {
		Self { records }
	}

	pub fn records(&self) -> &[VariantRecord] {
		&self.records
	}

	fn matching(&self, query: &VariantQuery) -> Vec<&VariantRecord> {
		let mut hits: Vec<&VariantRecord> =
			self.records.iter().filter(|record| matches_query(record, query)).collect();

		hits.sort_by(|a, b| compare(a, b, query.sort));

		hits
	}
}
impl VariantIndex for MemoryIndex {
	fn search<'a>(
		&'a self,
		query: &'a VariantQuery,
		cursor: Option<&'a str>,
		size: usize,
	) -> BoxFuture<'a, Result<IndexPage>> {
		Box::pin(async move {
			let offset = match cursor {
				Some(raw) => Cursor::decode(raw)?.offset,
				None => 0,
			};
			let hits = self.matching(query);
			let total = hits.len();
			let records: Vec<VariantRecord> =
				hits.into_iter().skip(offset).take(size).cloned().collect();
			let next = offset + records.len();
			let cursor = (next < total).then(|| Cursor { offset: next }.encode());

			Ok(IndexPage { records, total: total as u64, cursor })
		})
	}

	fn gene_counts<'a>(
		&'a self,
		query: &'a VariantQuery,
	) -> BoxFuture<'a, Result<BTreeMap<String, GeneCounts>>> {
		Box::pin(async move { Ok(count_genes(self.matching(query))) })
	}
}

#[derive(Deserialize)]
struct Cursor {
	offset: usize,
}
impl Cursor {
	fn encode(&self) -> String {
		serde_json::json!({ "offset": self.offset }).to_string()
	}

	fn decode(raw: &str) -> Result<Self> {
		serde_json::from_str(raw).map_err(|err| Error::Backend {
			kind: "invalid_cursor".to_string(),
			message: format!("Cursor {raw:?} is not a memory index cursor: {err}"),
		})
	}
}

fn matches_query(record: &VariantRecord, query: &VariantQuery) -> bool {
	record.family_guids.iter().any(|family| query.families.contains(family))
		&& query.dataset_type.is_none_or(|dataset_type| record.dataset_type == dataset_type)
		&& matches_locus(record, &query.locus)
		&& matches_frequencies(record, query)
		&& matches_annotations(record, query)
		&& matches_in_silico(record, query)
		&& (query.skip_genotype_filter || matches_quality(record, query))
}

fn matches_locus(record: &VariantRecord, locus: &ResolvedLocus) -> bool {
	match locus {
		ResolvedLocus::Unrestricted => true,
		ResolvedLocus::GenesIntervals { genes, intervals } =>
			genes.iter().any(|gene| record.gene_ids.contains(&gene.gene_id))
				|| intervals.iter().any(|interval| interval.contains(&record.chrom, record.pos)),
		ResolvedLocus::VariantIds(ids) => {
			let identity = record.identity();

			ids.iter().any(|id| {
				VariantIdentity::new(
					&id.chrom,
					id.pos,
					None,
					Some(&id.ref_allele),
					Some(&id.alt_allele),
				) == identity
			})
		},
		ResolvedLocus::RsIds(rs_ids) =>
			record.rsid.as_ref().is_some_and(|rsid| rs_ids.contains(rsid)),
	}
}

fn matches_frequencies(record: &VariantRecord, query: &VariantQuery) -> bool {
	query.frequencies.iter().all(|(population, filter)| {
		match (filter.af, record.populations.get(population)) {
			(Some(max_af), Some(af)) => *af <= max_af,
			_ => true,
		}
	})
}

// Annotation and pathogenicity filters are alternatives: either one admits the record.
fn matches_annotations(record: &VariantRecord, query: &VariantQuery) -> bool {
	let terms: Vec<&str> = query.annotation_terms().collect();
	let significances: Vec<&str> = query.pathogenicity_terms().collect();

	if terms.is_empty() && significances.is_empty() {
		return true;
	}

	record.consequences.iter().any(|consequence| terms.contains(&consequence.as_str()))
		|| record
			.clinvar_significance
			.as_deref()
			.is_some_and(|significance| significances.contains(&significance))
}

fn matches_in_silico(record: &VariantRecord, query: &VariantQuery) -> bool {
	query
		.in_silico
		.iter()
		.all(|(predictor, min)| record.in_silico.get(predictor).is_none_or(|score| score >= min))
}

fn matches_quality(record: &VariantRecord, query: &VariantQuery) -> bool {
	let Some(quality) = &query.quality_filter else {
		return true;
	};

	quality.min_gq.is_none_or(|min| record.genotype_quality.is_none_or(|gq| gq >= min))
		&& quality.min_ab.is_none_or(|min| record.allele_balance.is_none_or(|ab| ab >= min))
		&& (quality.vcf_filter.as_deref() != Some("pass") || record.filters.is_empty())
}

fn compare(a: &VariantRecord, b: &VariantRecord, sort: SortKey) -> Ordering {
	let primary = match sort {
		SortKey::Xpos => Ordering::Equal,
		SortKey::Gnomad => population_af(a).total_cmp(&population_af(b)),
		SortKey::Cadd => descending_score(a, b, "cadd"),
		SortKey::Revel => descending_score(a, b, "revel"),
	};

	primary.then(a.xpos.cmp(&b.xpos)).then_with(|| a.variant_id.cmp(&b.variant_id))
}

fn population_af(record: &VariantRecord) -> f64 {
	record.populations.get(GNOMAD_POPULATION).copied().unwrap_or(0.0)
}

// Highest score first, unscored records last.
fn descending_score(a: &VariantRecord, b: &VariantRecord, predictor: &str) -> Ordering {
	match (a.in_silico.get(predictor), b.in_silico.get(predictor)) {
		(Some(a), Some(b)) => b.total_cmp(a),
		(Some(_), None) => Ordering::Less,
		(None, Some(_)) => Ordering::Greater,
		(None, None) => Ordering::Equal,
	}
}
