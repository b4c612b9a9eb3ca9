use std::{
	collections::HashMap,
	sync::{
		Mutex,
		atomic::{AtomicUsize, Ordering},
	},
};

use vmatch_domain::{
	liftover::{GenomeBuild, Lifter},
	xpos,
};
use vmatch_service::{
	BoxFuture, Error, FeatureGene, FeatureVariant, GenomicFeature, LinkReport,
	MatchmakerStore, MatchmakerSubmission, Result, SavedVariant, SubmissionLinker,
	SubmissionVariantLink, VariantMatcher,
};

const MATCH_TAG: &str = "seqr MME";

#[derive(Default)]
struct SpyLifter {
	mappings: HashMap<(String, u64), u64>,
	calls: AtomicUsize,
}
impl SpyLifter {
	fn mapping(chrom: &str, from: u64, to: u64) -> Self {
		Self { mappings: HashMap::from([((chrom.to_string(), from), to)]), ..Self::default() }
	}

	fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl Lifter for SpyLifter {
	fn convert(&self, from: GenomeBuild, to: GenomeBuild, chrom: &str, pos: u64) -> Option<u64> {
		assert_eq!((from, to), (GenomeBuild::GRCh37, GenomeBuild::GRCh38));

		self.calls.fetch_add(1, Ordering::SeqCst);

		self.mappings.get(&(chrom.to_string(), pos)).copied()
	}
}

#[derive(Default)]
struct MemoryStore {
	submissions: Vec<MatchmakerSubmission>,
	saved_variants: Vec<SavedVariant>,
	preloads: Mutex<Vec<Vec<i64>>>,
	inserts: Mutex<Vec<Vec<SubmissionVariantLink>>>,
}
impl MatchmakerStore for MemoryStore {
	fn submissions_with_features<'a>(&'a self) -> BoxFuture<'a, Result<Vec<MatchmakerSubmission>>> {
		Box::pin(async move { Ok(self.submissions.clone()) })
	}

	fn saved_variants_for_families<'a>(
		&'a self,
		family_pks: &'a [i64],
	) -> BoxFuture<'a, Result<Vec<SavedVariant>>> {
		self.preloads.lock().expect("preload lock").push(family_pks.to_vec());

		let variants = self
			.saved_variants
			.iter()
			.filter(|variant| family_pks.contains(&variant.family_pk))
			.cloned()
			.collect();

		Box::pin(async move { Ok(variants) })
	}

	fn insert_links<'a>(
		&'a self,
		links: &'a [SubmissionVariantLink],
	) -> BoxFuture<'a, Result<u64>> {
		self.inserts.lock().expect("insert lock").push(links.to_vec());

		Box::pin(async move { Ok(links.len() as u64) })
	}
}

fn snv(id: i64, family_pk: i64, chrom: &str, pos: u64, tags: &[&str]) -> SavedVariant {
	let xpos = xpos::get_xpos(chrom, pos).expect("valid coordinate");

	SavedVariant {
		saved_variant_id: id,
		guid: format!("SV{id}"),
		family_pk,
		xpos,
		xpos_end: Some(xpos),
		ref_allele: Some("A".to_string()),
		alt_allele: Some("G".to_string()),
		sv_type: None,
		tags: tags.iter().map(|tag| tag.to_string()).collect(),
	}
}

fn structural(id: i64, sv_type: &str, tag_count: usize) -> SavedVariant {
	SavedVariant {
		saved_variant_id: id,
		guid: format!("SV{id}"),
		family_pk: 1,
		xpos: xpos::get_xpos("2", 5_000).expect("valid coordinate"),
		xpos_end: Some(xpos::get_xpos("2", 9_000).expect("valid coordinate")),
		ref_allele: None,
		alt_allele: None,
		sv_type: Some(sv_type.to_string()),
		tags: vec!["Tier 1".to_string(); tag_count],
	}
}

fn snv_feature(chrom: &str, pos: u64, assembly: Option<&str>) -> FeatureVariant {
	FeatureVariant {
		reference_name: chrom.to_string(),
		start: pos,
		end: None,
		assembly: assembly.map(str::to_string),
		reference_bases: Some("A".to_string()),
		alternate_bases: Some("G".to_string()),
	}
}

fn sv_feature() -> FeatureVariant {
	FeatureVariant {
		reference_name: "2".to_string(),
		start: 5_000,
		end: Some(9_000),
		assembly: None,
		reference_bases: None,
		alternate_bases: None,
	}
}

fn submission(guid: &str, family_pk: i64, build: GenomeBuild) -> MatchmakerSubmission {
	MatchmakerSubmission {
		submission_id: family_pk * 10,
		guid: guid.to_string(),
		family_pk,
		family_id: format!("fam{family_pk}"),
		genome_build: build,
		deleted: false,
		features: Vec::new(),
	}
}

fn linked(variant: FeatureVariant, gene: &str) -> GenomicFeature {
	GenomicFeature { variant: Some(variant), gene: Some(FeatureGene { id: gene.to_string() }) }
}

fn resolved_guid(
	lifter: &SpyLifter,
	submission: &MatchmakerSubmission,
	variant: &FeatureVariant,
	candidates: &[SavedVariant],
) -> Result<Option<String>> {
	let matcher = VariantMatcher::new(lifter, MATCH_TAG);

	Ok(matcher.resolve(submission, variant, candidates)?.map(|sv| sv.guid.clone()))
}

#[test]
fn exact_matches_skip_liftover() {
	let lifter = SpyLifter::mapping("1", 1_000, 2_000);
	let candidates = vec![snv(1, 1, "1", 1_000, &[])];
	let found = resolved_guid(
		&lifter,
		&submission("MS1", 1, GenomeBuild::GRCh38),
		&snv_feature("chr1", 1_000, Some("GRCh37")),
		&candidates,
	)
	.expect("resolve");

	assert_eq!(found.as_deref(), Some("SV1"));
	assert_eq!(lifter.calls(), 0);
}

#[test]
fn grch37_variants_are_lifted_for_grch38_projects() {
	let lifter = SpyLifter::mapping("1", 1_000, 2_000);
	let candidates = vec![snv(1, 1, "1", 1_000_000, &[]), snv(2, 1, "1", 2_000, &[])];
	let found = resolved_guid(
		&lifter,
		&submission("MS1", 1, GenomeBuild::GRCh38),
		&snv_feature("1", 1_000, Some("GRCh37")),
		&candidates,
	)
	.expect("resolve");

	assert_eq!(found.as_deref(), Some("SV2"));
	assert_eq!(lifter.calls(), 1);
}

#[test]
fn liftover_needs_a_grch38_project_and_a_grch37_variant() {
	let lifter = SpyLifter::mapping("1", 1_000, 2_000);
	let candidates = vec![snv(2, 1, "1", 2_000, &[])];
	let cases = [
		(GenomeBuild::GRCh37, Some("GRCh37")),
		(GenomeBuild::GRCh38, Some("GRCh38")),
		(GenomeBuild::GRCh38, None),
		(GenomeBuild::GRCh38, Some("NCBI36")),
	];

	for (build, assembly) in cases {
		let result = resolved_guid(
			&lifter,
			&submission("MS1", 1, build),
			&snv_feature("1", 1_000, assembly),
			&candidates,
		);

		assert!(
			matches!(result, Err(Error::UnresolvedVariant { .. })),
			"Expected no match for {build} with assembly {assembly:?}."
		);
	}

	assert_eq!(lifter.calls(), 0);
}

#[test]
fn unmapped_positions_stay_unresolved() {
	let lifter = SpyLifter::default();
	let candidates = vec![snv(2, 1, "1", 2_000, &[])];
	let result = resolved_guid(
		&lifter,
		&submission("MS1", 1, GenomeBuild::GRCh38),
		&snv_feature("1", 1_000, Some("GRCh37")),
		&candidates,
	);

	let Err(Error::UnresolvedVariant { submission, family, variant }) = result else {
		panic!("Expected an unresolved variant.");
	};

	assert_eq!(submission, "MS1");
	assert_eq!(family, "fam1");
	assert!(variant.contains("\"referenceName\":\"1\""));
	assert_eq!(lifter.calls(), 1);
}

#[test]
fn legacy_build_in_reference_name_is_swapped() {
	let lifter = SpyLifter::mapping("1", 1_000, 2_000);
	let candidates = vec![snv(2, 1, "1", 2_000, &[])];
	let legacy = snv_feature("GRCh37", 1_000, Some("1"));
	let found = resolved_guid(
		&lifter,
		&submission("MS1", 1, GenomeBuild::GRCh38),
		&legacy,
		&candidates,
	)
	.expect("resolve");

	assert_eq!(found.as_deref(), Some("SV2"));

	let broken = snv_feature("GRCh37", 1_000, None);
	let result = resolved_guid(
		&lifter,
		&submission("MS1", 1, GenomeBuild::GRCh38),
		&broken,
		&candidates,
	);

	assert!(matches!(result, Err(Error::InvalidSubmission { .. })));
}

#[test]
fn external_match_tag_wins_over_tag_count() {
	let lifter = SpyLifter::default();
	let candidates = vec![
		snv(1, 1, "1", 1_000, &["Tier 1", "Known gene", "Review"]),
		snv(2, 1, "1", 1_000, &[MATCH_TAG]),
		snv(3, 1, "1", 1_000, &["Tier 1"]),
	];
	let found = resolved_guid(
		&lifter,
		&submission("MS1", 1, GenomeBuild::GRCh38),
		&snv_feature("1", 1_000, None),
		&candidates,
	)
	.expect("resolve");

	assert_eq!(found.as_deref(), Some("SV2"));
}

#[test]
fn structural_variants_of_one_type_prefer_the_most_tagged() {
	let lifter = SpyLifter::default();
	let candidates = vec![structural(1, "DEL", 1), structural(2, "DEL", 3)];
	let found = resolved_guid(
		&lifter,
		&submission("MS1", 1, GenomeBuild::GRCh38),
		&sv_feature(),
		&candidates,
	)
	.expect("resolve");

	assert_eq!(found.as_deref(), Some("SV2"));
}

#[test]
fn mixed_or_untyped_duplicates_are_ambiguous() {
	let lifter = SpyLifter::default();
	let mixed = vec![structural(1, "DEL", 1), structural(2, "DUP", 3)];
	let result = resolved_guid(
		&lifter,
		&submission("MS1", 1, GenomeBuild::GRCh38),
		&sv_feature(),
		&mixed,
	);

	let Err(Error::AmbiguousVariant { count, candidates, .. }) = result else {
		panic!("Expected an ambiguous variant.");
	};

	assert_eq!(count, 2);
	assert_eq!(candidates, vec!["SV1".to_string(), "SV2".to_string()]);

	// Two copies carrying the external tag do not settle it either.
	let double_tagged =
		vec![snv(1, 1, "1", 1_000, &[MATCH_TAG]), snv(2, 1, "1", 1_000, &[MATCH_TAG])];
	let result = resolved_guid(
		&lifter,
		&submission("MS1", 1, GenomeBuild::GRCh38),
		&snv_feature("1", 1_000, None),
		&double_tagged,
	);

	assert!(matches!(result, Err(Error::AmbiguousVariant { count: 2, .. })));
}

#[test]
fn deleted_submissions_tolerate_missing_variants() {
	let lifter = SpyLifter::default();
	let mut deleted = submission("MS1", 1, GenomeBuild::GRCh38);

	deleted.deleted = true;

	let found = resolved_guid(&lifter, &deleted, &snv_feature("1", 1_000, None), &[])
		.expect("resolve");

	assert_eq!(found, None);
}

fn link_store() -> MemoryStore {
	let mut first = submission("MS1", 1, GenomeBuild::GRCh38);
	let mut second = submission("MS2", 2, GenomeBuild::GRCh38);
	let mut retired = submission("MS3", 1, GenomeBuild::GRCh38);

	first.features = vec![
		linked(snv_feature("1", 1_000, None), "ENSG_A"),
		GenomicFeature { variant: None, gene: Some(FeatureGene { id: "ENSG_B".to_string() }) },
	];
	second.features = vec![linked(snv_feature("X", 300, None), "ENSG_C")];
	retired.submission_id = 30;
	retired.deleted = true;
	retired.features = vec![linked(snv_feature("5", 77, None), "ENSG_D")];

	MemoryStore {
		submissions: vec![second, first, retired],
		saved_variants: vec![snv(1, 1, "1", 1_000, &[]), snv(2, 2, "X", 300, &[])],
		..MemoryStore::default()
	}
}

#[tokio::test]
async fn linker_writes_every_link_at_once() {
	let store = link_store();
	let lifter = SpyLifter::default();
	let linker = SubmissionLinker::new(&store, VariantMatcher::new(&lifter, MATCH_TAG));
	let report = linker.run().await.expect("link run");

	assert_eq!(
		report,
		LinkReport { submissions: 3, families: 2, links: 2, unmatched: 1, skipped_features: 1 }
	);
	assert_eq!(*store.preloads.lock().expect("preload lock"), vec![vec![1, 2]]);

	let inserts = store.inserts.lock().expect("insert lock");

	assert_eq!(inserts.len(), 1);
	assert_eq!(
		inserts[0],
		vec![
			SubmissionVariantLink {
				submission_id: 10,
				saved_variant_id: 1,
				gene_id: "ENSG_A".to_string()
			},
			SubmissionVariantLink {
				submission_id: 20,
				saved_variant_id: 2,
				gene_id: "ENSG_C".to_string()
			},
		]
	);
}

#[tokio::test]
async fn unresolved_features_abort_before_writing() {
	let mut store = link_store();

	store.submissions[2].deleted = false;

	let lifter = SpyLifter::default();
	let linker = SubmissionLinker::new(&store, VariantMatcher::new(&lifter, MATCH_TAG));
	let Err(Error::UnresolvedVariant { submission, .. }) = linker.run().await else {
		panic!("Expected an unresolved variant.");
	};

	assert_eq!(submission, "MS3");
	assert!(store.inserts.lock().expect("insert lock").is_empty());
}

#[tokio::test]
async fn matched_features_need_a_gene() {
	let mut store = link_store();

	store.submissions[0].features[0].gene = None;

	let lifter = SpyLifter::default();
	let linker = SubmissionLinker::new(&store, VariantMatcher::new(&lifter, MATCH_TAG));

	assert!(matches!(linker.run().await, Err(Error::InvalidSubmission { .. })));
	assert!(store.inserts.lock().expect("insert lock").is_empty());
}

#[tokio::test]
async fn empty_runs_touch_nothing() {
	let store = MemoryStore::default();
	let lifter = SpyLifter::default();
	let linker = SubmissionLinker::new(&store, VariantMatcher::new(&lifter, MATCH_TAG));

	assert_eq!(linker.run().await.expect("link run"), LinkReport::default());
	assert!(store.preloads.lock().expect("preload lock").is_empty());
	assert!(store.inserts.lock().expect("insert lock").is_empty());
}
