use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::{
	Error, Result,
	db::Db,
	models::{GeneRow, SavedVariantRow, SubmissionGene, SubmissionRow},
};

const GENE_ID_MAX_CHARS: usize = 20;
const INSERT_BATCH_SIZE: usize = 1_000;

/// Returns the cached payload when it has not expired, recording the hit.
pub async fn fetch_cache_payload(
	pool: &PgPool,
	key: &str,
	now: OffsetDateTime,
) -> Result<Option<Value>> {
	let payload: Option<Value> = sqlx::query_scalar(
		"\
UPDATE search_results_cache
SET last_accessed_at = $1, hit_count = hit_count + 1
WHERE cache_key = $2 AND expires_at > $1
RETURNING payload",
	)
	.bind(now)
	.bind(key)
	.fetch_optional(pool)
	.await?;

	Ok(payload)
}

/// Upserts a cache entry. Concurrent writers for the same key resolve as last write wins.
pub async fn store_cache_payload(
	pool: &PgPool,
	key: &str,
	payload: &Value,
	now: OffsetDateTime,
	expires_at: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO search_results_cache (
	cache_key,
	payload,
	created_at,
	last_accessed_at,
	expires_at,
	hit_count
)
VALUES ($1, $2, $3, $3, $4, 0)
ON CONFLICT (cache_key) DO UPDATE SET
	payload = EXCLUDED.payload,
	last_accessed_at = EXCLUDED.last_accessed_at,
	expires_at = EXCLUDED.expires_at",
	)
	.bind(key)
	.bind(payload)
	.bind(now)
	.bind(expires_at)
	.execute(pool)
	.await?;

	Ok(())
}

pub async fn purge_expired_cache(pool: &PgPool, now: OffsetDateTime) -> Result<u64> {
	let result = sqlx::query("DELETE FROM search_results_cache WHERE expires_at <= $1")
		.bind(now)
		.execute(pool)
		.await?;

	Ok(result.rows_affected())
}

pub async fn list_saved_variants(
	pool: &PgPool,
	family_pks: &[i64],
) -> Result<Vec<SavedVariantRow>> {
	if family_pks.is_empty() {
		return Ok(Vec::new());
	}

	let rows = sqlx::query_as::<_, SavedVariantRow>(
		"\
SELECT
	sv.saved_variant_id,
	sv.guid,
	sv.family_pk,
	sv.xpos,
	sv.xpos_end,
	sv.ref AS ref_allele,
	sv.alt AS alt_allele,
	NULLIF(sv.saved_variant_json->>'svType', '') AS sv_type,
	COALESCE(
		array_agg(vtt.name ORDER BY vt.variant_tag_id) FILTER (WHERE vtt.name IS NOT NULL),
		ARRAY[]::text[]
	) AS tag_names
FROM saved_variants sv
LEFT JOIN variant_tags vt ON vt.saved_variant_id = sv.saved_variant_id
LEFT JOIN variant_tag_types vtt ON vtt.variant_tag_type_id = vt.variant_tag_type_id
WHERE sv.family_pk = ANY($1)
GROUP BY sv.saved_variant_id
ORDER BY sv.family_pk, sv.saved_variant_id",
	)
	.bind(family_pks)
	.fetch_all(pool)
	.await?;

	Ok(rows)
}

pub async fn list_submissions_with_features(pool: &PgPool) -> Result<Vec<SubmissionRow>> {
	let rows = sqlx::query_as::<_, SubmissionRow>(
		"\
SELECT
	s.submission_id,
	s.guid,
	s.family_pk,
	f.family_id,
	p.genome_version,
	s.genomic_features,
	s.deleted_date
FROM matchmaker_submissions s
JOIN families f ON f.family_pk = s.family_pk
JOIN projects p ON p.project_id = f.project_id
WHERE s.genomic_features IS NOT NULL
	AND jsonb_typeof(s.genomic_features) = 'array'
ORDER BY s.family_pk, s.submission_id",
	)
	.fetch_all(pool)
	.await?;

	Ok(rows)
}

/// Inserts every link in one transaction; either all rows land or none do.
pub async fn insert_submission_genes(db: &Db, genes: &[SubmissionGene]) -> Result<u64> {
	if let Some(gene) = genes.iter().find(|gene| gene.gene_id.chars().count() > GENE_ID_MAX_CHARS)
	{
		return Err(Error::InvalidArgument(format!(
			"gene_id {:?} exceeds {GENE_ID_MAX_CHARS} characters.",
			gene.gene_id
		)));
	}

	let mut tx = db.pool.begin().await?;
	let mut inserted = 0;

	for batch in genes.chunks(INSERT_BATCH_SIZE) {
		let mut builder = QueryBuilder::<Postgres>::new(
			"INSERT INTO matchmaker_submission_genes (submission_gene_id, submission_id, saved_variant_id, gene_id) ",
		);

		builder.push_values(batch, |mut row, gene| {
			row.push_bind(gene.submission_gene_id)
				.push_bind(gene.submission_id)
				.push_bind(gene.saved_variant_id)
				.push_bind(gene.gene_id.clone());
		});

		inserted += builder.build().execute(&mut *tx).await?.rows_affected();
	}

	tx.commit().await?;

	Ok(inserted)
}

/// Resolves gene tokens by exact gene ID or case-insensitive symbol.
pub async fn find_genes(pool: &PgPool, tokens: &[String]) -> Result<Vec<GeneRow>> {
	if tokens.is_empty() {
		return Ok(Vec::new());
	}

	let upper: Vec<String> = tokens.iter().map(|token| token.to_uppercase()).collect();
	let rows = sqlx::query_as::<_, GeneRow>(
		"\
SELECT gene_id, gene_symbol, chrom, start_pos, end_pos
FROM genes
WHERE gene_id = ANY($1) OR upper(gene_symbol) = ANY($2)
ORDER BY gene_id",
	)
	.bind(tokens)
	.bind(&upper)
	.fetch_all(pool)
	.await?;

	Ok(rows)
}
