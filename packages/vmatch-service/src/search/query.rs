use std::collections::BTreeMap;

use serde_json::Value;

use crate::search::{
	DatasetType, FrequencyFilter, Inheritance, QualityFilter, SearchSpec, SortKey,
	locus::ResolvedLocus,
};

/// A fully specified index query.
///
/// Built in stages by consuming `with_*` methods and handed to the index once. No stage
/// mutates a shared builder, so a partially built query can be cloned and specialised freely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantQuery {
	pub families: Vec<String>,
	pub inheritance: Option<Inheritance>,
	pub frequencies: BTreeMap<String, FrequencyFilter>,
	pub pathogenicity: BTreeMap<String, Vec<String>>,
	pub annotations: BTreeMap<String, Vec<String>>,
	pub annotations_secondary: BTreeMap<String, Vec<String>>,
	pub in_silico: BTreeMap<String, f64>,
	pub quality_filter: Option<QualityFilter>,
	pub custom_query: Option<Value>,
	pub locus: ResolvedLocus,
	pub skip_genotype_filter: bool,
	pub dataset_type: Option<DatasetType>,
	pub sort: SortKey,
}
impl VariantQuery {
	pub fn for_families(families: &[String]) -> Self {
		Self { families: families.to_vec(), ..Self::default() }
	}

	/// Copies every filter field of a saved search. The locus is resolved separately.
	pub fn with_filters(self, spec: &SearchSpec) -> Self {
		Self {
			inheritance: spec.inheritance.clone(),
			frequencies: spec.freqs.clone(),
			pathogenicity: spec.pathogenicity.clone(),
			annotations: spec.annotations.clone(),
			annotations_secondary: spec.annotations_secondary.clone(),
			in_silico: spec.in_silico.clone(),
			quality_filter: spec.quality_filter.clone(),
			custom_query: spec.custom_query.clone(),
			..self
		}
	}

	pub fn with_locus(self, locus: ResolvedLocus) -> Self {
		Self { locus, ..self }
	}

	pub fn with_skip_genotype_filter(self, skip_genotype_filter: bool) -> Self {
		Self { skip_genotype_filter, ..self }
	}

	pub fn with_dataset_type(self, dataset_type: DatasetType) -> Self {
		Self { dataset_type: Some(dataset_type), ..self }
	}

	pub fn with_sort(self, sort: SortKey) -> Self {
		Self { sort, ..self }
	}

	/// Every consequence term requested across primary and secondary annotations.
	pub fn annotation_terms(&self) -> impl Iterator<Item = &str> {
		self.annotations
			.values()
			.chain(self.annotations_secondary.values())
			.flatten()
			.map(String::as_str)
	}

	pub fn pathogenicity_terms(&self) -> impl Iterator<Item = &str> {
		self.pathogenicity.values().flatten().map(String::as_str)
	}
}

#[cfg(test)]
mod tests {
	use vmatch_domain::locus::VariantId;

	use super::VariantQuery;
	use crate::search::{DatasetType, SearchSpec, SortKey, locus::ResolvedLocus};

	#[test]
	fn stages_do_not_disturb_earlier_ones() {
		let spec: SearchSpec = serde_json::from_value(serde_json::json!({
			"annotations": { "missense": ["missense_variant"] },
			"annotations_secondary": { "splice": ["splice_donor_variant"] },
		}))
		.expect("Failed to parse search.");
		let base = VariantQuery::for_families(&["F1".to_string()]).with_filters(&spec);
		let id: VariantId = "1-100-A-G".parse().expect("variant id");
		let narrowed = base
			.clone()
			.with_locus(ResolvedLocus::VariantIds(vec![id]))
			.with_dataset_type(DatasetType::Variants)
			.with_sort(SortKey::Cadd);

		assert_eq!(base.locus, ResolvedLocus::Unrestricted);
		assert_eq!(base.dataset_type, None);
		assert_eq!(narrowed.families, base.families);
		assert_eq!(narrowed.sort, SortKey::Cadd);
		assert_eq!(
			narrowed.annotation_terms().collect::<Vec<_>>(),
			vec!["missense_variant", "splice_donor_variant"]
		);
	}
}
