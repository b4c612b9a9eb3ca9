//! Locus filter resolution.
//!
//! Raw locus text is classified once into a [`ResolvedLocus`] and downstream consumers match on
//! the variant instead of inspecting the text again.

use serde::{Deserialize, Serialize};

use vmatch_domain::locus::{GenomicInterval, VariantId};

use crate::{Error, GeneCatalog, Result, search::LocusFilter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gene {
	pub gene_id: String,
	pub gene_symbol: String,
	pub chrom: String,
	pub start: u64,
	pub end: u64,
}
impl Gene {
	fn answers_to(&self, token: &str) -> bool {
		self.gene_id == token || self.gene_symbol.eq_ignore_ascii_case(token)
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum ResolvedLocus {
	#[default]
	Unrestricted,
	GenesIntervals {
		genes: Vec<Gene>,
		intervals: Vec<GenomicInterval>,
	},
	VariantIds(Vec<VariantId>),
	RsIds(Vec<String>),
}

#[derive(Debug, Default)]
pub struct LocusListItems {
	pub genes: Vec<Gene>,
	pub intervals: Vec<GenomicInterval>,
	pub invalid: Vec<String>,
}

#[derive(Debug, Default)]
pub struct VariantItems {
	pub rs_ids: Vec<String>,
	pub variant_ids: Vec<VariantId>,
	pub invalid: Vec<String>,
}

pub async fn resolve_locus(
	locus: Option<&LocusFilter>,
	catalog: &dyn GeneCatalog,
) -> Result<ResolvedLocus> {
	let Some(locus) = locus else {
		return Ok(ResolvedLocus::Unrestricted);
	};
	let items = parse_locus_list_items(locus.raw_items.as_deref(), catalog).await?;

	if !items.invalid.is_empty() {
		return Err(Error::invalid_search(format!(
			"Invalid genes/intervals: {}",
			items.invalid.join(", ")
		)));
	}

	let variant_items = parse_variant_items(locus.raw_variant_items.as_deref());

	if !items.genes.is_empty() || !items.intervals.is_empty() {
		if !variant_items.rs_ids.is_empty()
			|| !variant_items.variant_ids.is_empty()
			|| !variant_items.invalid.is_empty()
		{
			return Err(Error::invalid_search(
				"Invalid locus: found both genes/intervals and variants",
			));
		}

		return Ok(ResolvedLocus::GenesIntervals { genes: items.genes, intervals: items.intervals });
	}
	if !variant_items.invalid.is_empty() {
		return Err(Error::invalid_search(format!(
			"Invalid variants: {}",
			variant_items.invalid.join(", ")
		)));
	}
	if !variant_items.rs_ids.is_empty() && !variant_items.variant_ids.is_empty() {
		return Err(Error::invalid_search(
			"Invalid variant notation: found both variant IDs and rsIDs",
		));
	}
	if !variant_items.variant_ids.is_empty() {
		return Ok(ResolvedLocus::VariantIds(variant_items.variant_ids));
	}
	if !variant_items.rs_ids.is_empty() {
		return Ok(ResolvedLocus::RsIds(variant_items.rs_ids));
	}

	Ok(ResolvedLocus::Unrestricted)
}

/// Splits gene/interval text into resolved genes, intervals, and tokens that matched neither.
pub async fn parse_locus_list_items(
	raw: Option<&str>,
	catalog: &dyn GeneCatalog,
) -> Result<LocusListItems> {
	let mut out = LocusListItems::default();
	let mut gene_tokens = Vec::new();

	for token in tokens(raw.unwrap_or_default()) {
		match GenomicInterval::parse(token) {
			Some(Ok(interval)) => out.intervals.push(interval),
			Some(Err(_)) => out.invalid.push(token.to_string()),
			None => gene_tokens.push(token.to_string()),
		}
	}

	if gene_tokens.is_empty() {
		return Ok(out);
	}

	let genes = catalog.lookup(&gene_tokens).await?;

	for token in gene_tokens {
		match genes.iter().find(|gene| gene.answers_to(&token)) {
			Some(gene) if !out.genes.contains(gene) => out.genes.push(gene.clone()),
			Some(_) => {},
			None => out.invalid.push(token),
		}
	}

	Ok(out)
}

/// Splits variant text into rsIDs and validated `chrom-pos-ref-alt` IDs.
pub fn parse_variant_items(raw: Option<&str>) -> VariantItems {
	let mut out = VariantItems::default();

	for token in tokens(raw.unwrap_or_default()) {
		if token.starts_with("rs") {
			out.rs_ids.push(token.to_string());

			continue;
		}

		match VariantId::parse_validated(token) {
			Ok(id) => out.variant_ids.push(id),
			Err(_) => out.invalid.push(token.to_string()),
		}
	}

	out
}

fn tokens(raw: &str) -> impl Iterator<Item = &str> {
	raw.split(|c: char| c == ',' || c.is_whitespace()).filter(|token| !token.is_empty())
}
