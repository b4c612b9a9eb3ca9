//! Postgres-backed store implementations.

use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use vmatch_domain::liftover::GenomeBuild;
use vmatch_storage::{
	db::Db,
	models::{GeneRow, SavedVariantRow, SubmissionGene, SubmissionRow},
	queries,
};

use crate::{
	BoxFuture, Error, GeneCatalog, MatchmakerStore, Result, SearchCacheStore,
	matchmaker::{GenomicFeature, MatchmakerSubmission, SavedVariant, SubmissionVariantLink},
	search::locus::Gene,
};

impl SearchCacheStore for Db {
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Value>>> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();

			Ok(queries::fetch_cache_payload(&self.pool, key, now).await?)
		})
	}

	fn set<'a>(
		&'a self,
		key: &'a str,
		value: Value,
		ttl: time::Duration,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();

			queries::store_cache_payload(&self.pool, key, &value, now, now + ttl).await?;

			Ok(())
		})
	}
}

impl GeneCatalog for Db {
	fn lookup<'a>(&'a self, tokens: &'a [String]) -> BoxFuture<'a, Result<Vec<Gene>>> {
		Box::pin(async move {
			let rows = queries::find_genes(&self.pool, tokens).await?;

			rows.into_iter().map(gene_from_row).collect()
		})
	}
}

impl MatchmakerStore for Db {
	fn submissions_with_features<'a>(&'a self) -> BoxFuture<'a, Result<Vec<MatchmakerSubmission>>> {
		Box::pin(async move {
			let rows = queries::list_submissions_with_features(&self.pool).await?;

			rows.into_iter().map(submission_from_row).collect()
		})
	}

	fn saved_variants_for_families<'a>(
		&'a self,
		family_pks: &'a [i64],
	) -> BoxFuture<'a, Result<Vec<SavedVariant>>> {
		Box::pin(async move {
			let rows = queries::list_saved_variants(&self.pool, family_pks).await?;

			Ok(rows.into_iter().map(saved_variant_from_row).collect())
		})
	}

	fn insert_links<'a>(
		&'a self,
		links: &'a [SubmissionVariantLink],
	) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			let genes: Vec<SubmissionGene> = links
				.iter()
				.map(|link| SubmissionGene {
					submission_gene_id: Uuid::new_v4(),
					submission_id: link.submission_id,
					saved_variant_id: link.saved_variant_id,
					gene_id: link.gene_id.clone(),
				})
				.collect();

			Ok(queries::insert_submission_genes(self, &genes).await?)
		})
	}
}

fn gene_from_row(row: GeneRow) -> Result<Gene> {
	let position = |value: i64| {
		u64::try_from(value).map_err(|_| Error::InvalidCoordinate {
			message: format!("Gene {} has a negative coordinate: {value}", row.gene_id),
		})
	};

	Ok(Gene {
		start: position(row.start_pos)?,
		end: position(row.end_pos)?,
		gene_id: row.gene_id.clone(),
		gene_symbol: row.gene_symbol.clone(),
		chrom: row.chrom.clone(),
	})
}

fn submission_from_row(row: SubmissionRow) -> Result<MatchmakerSubmission> {
	let genome_build: GenomeBuild =
		row.genome_version.parse().map_err(|err| Error::InvalidSubmission {
			submission: row.guid.clone(),
			message: format!("Project genome version is unusable: {err}"),
		})?;
	let features: Vec<GenomicFeature> =
		serde_json::from_value(row.genomic_features).map_err(|err| Error::InvalidSubmission {
			submission: row.guid.clone(),
			message: format!("Genomic features are malformed: {err}"),
		})?;

	Ok(MatchmakerSubmission {
		submission_id: row.submission_id,
		guid: row.guid,
		family_pk: row.family_pk,
		family_id: row.family_id,
		genome_build,
		deleted: row.deleted_date.is_some(),
		features,
	})
}

fn saved_variant_from_row(row: SavedVariantRow) -> SavedVariant {
	SavedVariant {
		saved_variant_id: row.saved_variant_id,
		guid: row.guid,
		family_pk: row.family_pk,
		xpos: row.xpos,
		xpos_end: row.xpos_end,
		ref_allele: row.ref_allele,
		alt_allele: row.alt_allele,
		sv_type: row.sv_type,
		tags: row.tag_names,
	}
}
