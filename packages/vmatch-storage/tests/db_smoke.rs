use serde_json::json;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use vmatch_config::Postgres;
use vmatch_storage::{db::Db, models::SubmissionGene, queries};
use vmatch_testkit::TestDatabase;

async fn bootstrap(test_db: &TestDatabase) -> Db {
	let cfg = Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 2 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	db
}

// Returns (family_pk, saved_variant_id, submission_id).
async fn seed_family(db: &Db) -> (i64, i64, i64) {
	let project_id: i64 = sqlx::query_scalar(
		"INSERT INTO projects (guid, name, genome_version) VALUES ('P1', 'Project', '38') RETURNING project_id",
	)
	.fetch_one(&db.pool)
	.await
	.expect("Failed to insert project.");
	let family_pk: i64 = sqlx::query_scalar(
		"INSERT INTO families (guid, project_id, family_id) VALUES ('F1', $1, 'fam1') RETURNING family_pk",
	)
	.bind(project_id)
	.fetch_one(&db.pool)
	.await
	.expect("Failed to insert family.");
	let saved_variant_id: i64 = sqlx::query_scalar(
		"\
INSERT INTO saved_variants (guid, family_pk, xpos, xpos_end, ref, alt, variant_id, saved_variant_json)
VALUES ('SV1', $1, 1000012345, 1000012345, 'A', 'G', '1-12345-A-G', $2)
RETURNING saved_variant_id",
	)
	.bind(family_pk)
	.bind(json!({ "svType": "" }))
	.fetch_one(&db.pool)
	.await
	.expect("Failed to insert saved variant.");
	let tag_type_id: i64 = sqlx::query_scalar(
		"INSERT INTO variant_tag_types (name) VALUES ('seqr MME') RETURNING variant_tag_type_id",
	)
	.fetch_one(&db.pool)
	.await
	.expect("Failed to insert tag type.");

	sqlx::query("INSERT INTO variant_tags (saved_variant_id, variant_tag_type_id) VALUES ($1, $2)")
		.bind(saved_variant_id)
		.bind(tag_type_id)
		.execute(&db.pool)
		.await
		.expect("Failed to insert tag.");

	let submission_id: i64 = sqlx::query_scalar(
		"\
INSERT INTO matchmaker_submissions (guid, family_pk, individual_id, genomic_features)
VALUES ('MS1', $1, 'I1', $2)
RETURNING submission_id",
	)
	.bind(family_pk)
	.bind(json!([{ "variant": { "referenceName": "1", "start": 12345 }, "gene": { "id": "ENSG1" } }]))
	.fetch_one(&db.pool)
	.await
	.expect("Failed to insert submission.");

	(family_pk, saved_variant_id, submission_id)
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set VMATCH_PG_DSN to run."]
async fn db_connects_and_bootstraps() {
	let Some(base_dsn) = vmatch_testkit::env_dsn() else {
		eprintln!("Skipping db_connects_and_bootstraps; set VMATCH_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;

	// A second bootstrap must be a no-op.
	db.ensure_schema().await.expect("Failed to re-run schema.");

	let count: i64 = sqlx::query_scalar(
		"SELECT count(*) FROM information_schema.tables WHERE table_name = 'search_results_cache'",
	)
	.fetch_one(&db.pool)
	.await
	.expect("Failed to query schema tables.");

	assert_eq!(count, 1);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set VMATCH_PG_DSN to run."]
async fn cache_entries_expire_and_purge() {
	let Some(base_dsn) = vmatch_testkit::env_dsn() else {
		eprintln!("Skipping cache_entries_expire_and_purge; set VMATCH_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;
	let now = OffsetDateTime::now_utc();
	let payload = json!({ "totalResults": 3 });

	queries::store_cache_payload(&db.pool, "live", &payload, now, now + Duration::weeks(2))
		.await
		.expect("Failed to store cache entry.");
	queries::store_cache_payload(&db.pool, "stale", &payload, now, now - Duration::seconds(1))
		.await
		.expect("Failed to store cache entry.");

	let live = queries::fetch_cache_payload(&db.pool, "live", now)
		.await
		.expect("Failed to fetch cache entry.");
	let stale = queries::fetch_cache_payload(&db.pool, "stale", now)
		.await
		.expect("Failed to fetch cache entry.");

	assert_eq!(live, Some(payload.clone()));
	assert_eq!(stale, None);

	let updated = json!({ "totalResults": 4 });

	queries::store_cache_payload(&db.pool, "live", &updated, now, now + Duration::weeks(2))
		.await
		.expect("Failed to overwrite cache entry.");

	let live = queries::fetch_cache_payload(&db.pool, "live", now)
		.await
		.expect("Failed to fetch cache entry.");

	assert_eq!(live, Some(updated));
	assert_eq!(queries::purge_expired_cache(&db.pool, now).await.expect("Failed to purge."), 1);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set VMATCH_PG_DSN to run."]
async fn submission_reads_and_link_writes() {
	let Some(base_dsn) = vmatch_testkit::env_dsn() else {
		eprintln!("Skipping submission_reads_and_link_writes; set VMATCH_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;
	let (family_pk, saved_variant_id, submission_id) = seed_family(&db).await;
	let submissions =
		queries::list_submissions_with_features(&db.pool).await.expect("Failed to list submissions.");

	assert_eq!(submissions.len(), 1);
	assert_eq!(submissions[0].genome_version, "38");
	assert_eq!(submissions[0].family_id, "fam1");

	let variants = queries::list_saved_variants(&db.pool, &[family_pk])
		.await
		.expect("Failed to list saved variants.");

	assert_eq!(variants.len(), 1);
	assert_eq!(variants[0].tag_names, vec!["seqr MME".to_string()]);
	assert_eq!(variants[0].sv_type, None);

	let link = |gene_id: &str| SubmissionGene {
		submission_gene_id: Uuid::new_v4(),
		submission_id,
		saved_variant_id,
		gene_id: gene_id.to_string(),
	};
	let too_long = queries::insert_submission_genes(&db, &[link("ENSG1"), link(&"X".repeat(21))])
		.await;

	assert!(too_long.is_err());

	let inserted =
		queries::insert_submission_genes(&db, &[link("ENSG1")]).await.expect("Failed to insert.");
	let stored: i64 = sqlx::query_scalar("SELECT count(*) FROM matchmaker_submission_genes")
		.fetch_one(&db.pool)
		.await
		.expect("Failed to count links.");

	assert_eq!(inserted, 1);
	assert_eq!(stored, 1);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
