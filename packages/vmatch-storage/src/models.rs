use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SavedVariantRow {
	pub saved_variant_id: i64,
	pub guid: String,
	pub family_pk: i64,
	pub xpos: i64,
	pub xpos_end: Option<i64>,
	pub ref_allele: Option<String>,
	pub alt_allele: Option<String>,
	pub sv_type: Option<String>,
	pub tag_names: Vec<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubmissionRow {
	pub submission_id: i64,
	pub guid: String,
	pub family_pk: i64,
	pub family_id: String,
	pub genome_version: String,
	pub genomic_features: Value,
	pub deleted_date: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct SubmissionGene {
	pub submission_gene_id: Uuid,
	pub submission_id: i64,
	pub saved_variant_id: i64,
	pub gene_id: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GeneRow {
	pub gene_id: String,
	pub gene_symbol: String,
	pub chrom: String,
	pub start_pos: i64,
	pub end_pos: i64,
}
