pub mod linker;
pub mod matcher;

use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use serde_json::Value;

use vmatch_domain::{
	liftover::GenomeBuild,
	locus::{Locus, VariantIdentity},
};

use crate::Result;

/// A curated variant call owned by a family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedVariant {
	pub saved_variant_id: i64,
	pub guid: String,
	pub family_pk: i64,
	pub xpos: i64,
	pub xpos_end: Option<i64>,
	pub ref_allele: Option<String>,
	pub alt_allele: Option<String>,
	pub sv_type: Option<String>,
	/// Tag type names, one entry per tag.
	pub tags: Vec<String>,
}
impl SavedVariant {
	pub fn identity(&self) -> Result<VariantIdentity> {
		let locus = Locus::from_xpos(
			self.xpos,
			self.xpos_end,
			self.ref_allele.as_deref(),
			self.alt_allele.as_deref(),
		)?;

		Ok(locus.identity())
	}

	pub fn has_tag(&self, name: &str) -> bool {
		self.tags.iter().any(|tag| tag == name)
	}
}

#[derive(Debug, Clone)]
pub struct MatchmakerSubmission {
	pub submission_id: i64,
	pub guid: String,
	pub family_pk: i64,
	pub family_id: String,
	/// Reference build of the owning project.
	pub genome_build: GenomeBuild,
	pub deleted: bool,
	pub features: Vec<GenomicFeature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenomicFeature {
	#[serde(default)]
	pub variant: Option<FeatureVariant>,
	#[serde(default)]
	pub gene: Option<FeatureGene>,
}

/// A variant as described by an exchange submission. Positions are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureVariant {
	pub reference_name: String,
	#[serde(deserialize_with = "position")]
	pub start: u64,
	#[serde(default, deserialize_with = "optional_position")]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub end: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub assembly: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reference_bases: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub alternate_bases: Option<String>,
}
impl FeatureVariant {
	pub fn identity(&self) -> VariantIdentity {
		VariantIdentity::new(
			&self.reference_name,
			self.start,
			self.end,
			self.reference_bases.as_deref(),
			self.alternate_bases.as_deref(),
		)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureGene {
	pub id: String,
}

/// A resolved (submission, feature) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionVariantLink {
	pub submission_id: i64,
	pub saved_variant_id: i64,
	pub gene_id: String,
}

// Exchange payloads carry positions as either numbers or numeric strings.
fn position<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
	D: Deserializer<'de>,
{
	match Value::deserialize(deserializer)? {
		Value::Number(number) =>
			number.as_u64().ok_or_else(|| D::Error::custom(format!("Invalid position: {number}"))),
		Value::String(text) =>
			text.trim().parse().map_err(|_| D::Error::custom(format!("Invalid position: {text}"))),
		other => Err(D::Error::custom(format!("Invalid position: {other}"))),
	}
}

fn optional_position<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
	D: Deserializer<'de>,
{
	match Value::deserialize(deserializer)? {
		Value::Null => Ok(None),
		value => position(value).map(Some).map_err(D::Error::custom),
	}
}
