use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::search::{GeneCounts, SortKey, VariantRecord};

/// State of a previous search, stored under [`cache_key`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSearch {
	/// Unknown until the index has answered once.
	#[serde(default)]
	pub total_results: Option<u64>,
	/// Every record loaded so far, in sort order, starting from the first result.
	#[serde(default)]
	pub all_results: Vec<VariantRecord>,
	/// Index continuation for the record after the last one in `all_results`.
	#[serde(default)]
	pub cursor: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub gene_aggs: Option<BTreeMap<String, GeneCounts>>,
}
impl CachedSearch {
	pub fn is_fully_loaded(&self) -> bool {
		self.total_results.is_some_and(|total| self.all_results.len() as u64 >= total)
	}

	pub(crate) fn decode(key: &str, value: Value) -> Self {
		match serde_json::from_value(value) {
			Ok(state) => state,
			Err(err) => {
				tracing::warn!(
					error = %err,
					cache_key = %key,
					"Ignoring undecodable search cache entry."
				);

				Self::default()
			},
		}
	}
}

/// Gene aggregation searches carry no sort and share the `xpos` entry.
pub fn cache_key(search_guid: &str, sort: Option<SortKey>) -> String {
	format!("search_results__{search_guid}__{}", sort.unwrap_or(SortKey::Xpos).as_str())
}
