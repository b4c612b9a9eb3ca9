use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{debug, info};

use crate::{
	Error, MatchmakerStore, Result,
	matchmaker::{
		MatchmakerSubmission, SavedVariant, SubmissionVariantLink, matcher::VariantMatcher,
	},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkReport {
	pub submissions: usize,
	pub families: usize,
	pub links: u64,
	/// Features of soft-deleted submissions that matched nothing.
	pub unmatched: usize,
	/// Features that carry no variant description.
	pub skipped_features: usize,
}

/// One-shot batch that links every submission feature to a saved variant.
///
/// Any unresolved or ambiguous feature aborts the run before anything is written.
pub struct SubmissionLinker<'a> {
	store: &'a dyn MatchmakerStore,
	matcher: VariantMatcher<'a>,
}
impl<'a> SubmissionLinker<'a> {
	pub fn new(store: &'a dyn MatchmakerStore, matcher: VariantMatcher<'a>) -> Self {
		Self { store, matcher }
	}

	pub async fn run(&self) -> Result<LinkReport> {
		let submissions = self.store.submissions_with_features().await?;

		if submissions.is_empty() {
			info!("No submissions with genomic features.");

			return Ok(LinkReport::default());
		}

		info!(submissions = submissions.len(), "Linking submission variants.");

		let mut report = LinkReport { submissions: submissions.len(), ..LinkReport::default() };
		let mut by_family: BTreeMap<i64, Vec<MatchmakerSubmission>> = BTreeMap::new();

		for submission in submissions {
			by_family.entry(submission.family_pk).or_default().push(submission);
		}

		report.families = by_family.len();

		let family_pks: Vec<i64> = by_family.keys().copied().collect();
		let mut variants_by_family: HashMap<i64, Vec<SavedVariant>> = HashMap::new();

		for variant in self.store.saved_variants_for_families(&family_pks).await? {
			variants_by_family.entry(variant.family_pk).or_default().push(variant);
		}

		let mut links = Vec::new();

		for (family_pk, submissions) in &by_family {
			let candidates =
				variants_by_family.get(family_pk).map(Vec::as_slice).unwrap_or_default();

			for submission in submissions {
				self.link_submission(submission, candidates, &mut links, &mut report)?;
			}
		}

		info!(links = links.len(), "Writing submission variant links.");

		report.links = self.store.insert_links(&links).await?;

		info!(
			submissions = report.submissions,
			families = report.families,
			links = report.links,
			unmatched = report.unmatched,
			skipped_features = report.skipped_features,
			"Submission linking finished."
		);

		Ok(report)
	}

	fn link_submission(
		&self,
		submission: &MatchmakerSubmission,
		candidates: &[SavedVariant],
		links: &mut Vec<SubmissionVariantLink>,
		report: &mut LinkReport,
	) -> Result<()> {
		for feature in &submission.features {
			let Some(variant) = &feature.variant else {
				debug!(submission = %submission.guid, "Skipping feature without a variant.");

				report.skipped_features += 1;

				continue;
			};
			let Some(saved_variant) = self.matcher.resolve(submission, variant, candidates)? else {
				debug!(submission = %submission.guid, "Deleted submission matched no variant.");

				report.unmatched += 1;

				continue;
			};
			let Some(gene) = &feature.gene else {
				return Err(Error::InvalidSubmission {
					submission: submission.guid.clone(),
					message: "Feature has a variant but no gene.".to_string(),
				});
			};

			links.push(SubmissionVariantLink {
				submission_id: submission.submission_id,
				saved_variant_id: saved_variant.saved_variant_id,
				gene_id: gene.id.clone(),
			});
		}

		Ok(())
	}
}
