use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use vmatch_domain::locus::VariantIdentity;

use crate::Error;

/// A saved search: identity plus the families it runs against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchModel {
	pub guid: String,
	pub families: Vec<String>,
	pub search: SearchSpec,
}

/// User-authored filters. Immutable once saved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSpec {
	#[serde(default)]
	pub inheritance: Option<Inheritance>,
	#[serde(default)]
	pub freqs: BTreeMap<String, FrequencyFilter>,
	#[serde(default)]
	pub pathogenicity: BTreeMap<String, Vec<String>>,
	#[serde(default)]
	pub annotations: BTreeMap<String, Vec<String>>,
	#[serde(default)]
	pub annotations_secondary: BTreeMap<String, Vec<String>>,
	#[serde(default)]
	pub in_silico: BTreeMap<String, f64>,
	#[serde(default, rename = "qualityFilter")]
	pub quality_filter: Option<QualityFilter>,
	#[serde(default, rename = "customQuery")]
	pub custom_query: Option<Value>,
	#[serde(default)]
	pub locus: Option<LocusFilter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inheritance {
	#[serde(default)]
	pub mode: Option<String>,
	#[serde(default)]
	pub filter: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrequencyFilter {
	#[serde(default)]
	pub af: Option<f64>,
	#[serde(default)]
	pub ac: Option<u32>,
	#[serde(default)]
	pub hh: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityFilter {
	#[serde(default)]
	pub min_gq: Option<u32>,
	/// Minimum allele balance, in percent.
	#[serde(default)]
	pub min_ab: Option<u32>,
	/// `"pass"` keeps only calls without VCF filter flags.
	#[serde(default)]
	pub vcf_filter: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocusFilter {
	/// Genes and intervals, e.g. `BRCA1, chr2:1000-2000`.
	#[serde(default)]
	pub raw_items: Option<String>,
	/// Variant IDs or rsIDs, e.g. `1-12345-A-G` or `rs123`.
	#[serde(default)]
	pub raw_variant_items: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
	#[default]
	Xpos,
	Gnomad,
	Cadd,
	Revel,
}
impl SortKey {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Xpos => "xpos",
			Self::Gnomad => "gnomad",
			Self::Cadd => "cadd",
			Self::Revel => "revel",
		}
	}
}
impl FromStr for SortKey {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		match raw {
			"xpos" => Ok(Self::Xpos),
			"gnomad" => Ok(Self::Gnomad),
			"cadd" => Ok(Self::Cadd),
			"revel" => Ok(Self::Revel),
			other => Err(Error::invalid_search(format!("Invalid sort: {other}"))),
		}
	}
}
impl fmt::Display for SortKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatasetType {
	Variants,
	Sv,
	Mito,
}

/// A variant as returned by the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantRecord {
	pub variant_id: String,
	pub chrom: String,
	pub pos: u64,
	#[serde(default)]
	pub end: Option<u64>,
	pub xpos: i64,
	#[serde(default, rename = "ref")]
	pub ref_allele: Option<String>,
	#[serde(default, rename = "alt")]
	pub alt_allele: Option<String>,
	#[serde(default)]
	pub rsid: Option<String>,
	pub dataset_type: DatasetType,
	#[serde(default)]
	pub sv_type: Option<String>,
	pub family_guids: Vec<String>,
	/// Gene IDs, main transcript gene first.
	#[serde(default)]
	pub gene_ids: Vec<String>,
	#[serde(default)]
	pub consequences: Vec<String>,
	#[serde(default)]
	pub clinvar_significance: Option<String>,
	/// Population allele frequencies keyed by population.
	#[serde(default)]
	pub populations: BTreeMap<String, f64>,
	#[serde(default)]
	pub in_silico: BTreeMap<String, f64>,
	#[serde(default)]
	pub genotype_quality: Option<u32>,
	#[serde(default)]
	pub allele_balance: Option<u32>,
	#[serde(default)]
	pub filters: Vec<String>,
}
impl VariantRecord {
	pub fn identity(&self) -> VariantIdentity {
		VariantIdentity::new(
			&self.chrom,
			self.pos,
			self.end,
			self.ref_allele.as_deref(),
			self.alt_allele.as_deref(),
		)
	}

	pub fn main_gene_id(&self) -> Option<&str> {
		self.gene_ids.first().map(String::as_str)
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneCounts {
	pub total: u64,
	pub families: BTreeMap<String, u64>,
}

/// Paging and shaping knobs for a variant search.
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
	pub sort: SortKey,
	/// 1-based.
	pub page: u32,
	/// Falls back to `search.default_num_results`.
	pub num_results: Option<u32>,
	pub load_all: bool,
	pub skip_genotype_filter: bool,
}
impl Default for SearchOptions {
	fn default() -> Self {
		Self {
			sort: SortKey::Xpos,
			page: 1,
			num_results: None,
			load_all: false,
			skip_genotype_filter: false,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
	pub variants: Vec<VariantRecord>,
	pub total_results: Option<u64>,
}
