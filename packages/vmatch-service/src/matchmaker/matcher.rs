use vmatch_domain::{
	liftover::{GenomeBuild, Lifter},
	locus::VariantIdentity,
};

use crate::{
	Error, Result,
	matchmaker::{FeatureVariant, MatchmakerSubmission, SavedVariant},
};

/// Resolves an exchange variant description to one of a family's saved variants.
///
/// Matching is exact on [`VariantIdentity`]. A variant declared on GRCh37 for a GRCh38 project
/// gets one liftover retry. Several matches are narrowed first by the external match tag and
/// then, for structural variants of one type, by tag count.
pub struct VariantMatcher<'a> {
	lifter: &'a dyn Lifter,
	external_match_tag: &'a str,
}
impl<'a> VariantMatcher<'a> {
	pub fn new(lifter: &'a dyn Lifter, external_match_tag: &'a str) -> Self {
		Self { lifter, external_match_tag }
	}

	/// `Ok(None)` only for soft-deleted submissions without a match.
	pub fn resolve<'v>(
		&self,
		submission: &MatchmakerSubmission,
		variant: &FeatureVariant,
		candidates: &'v [SavedVariant],
	) -> Result<Option<&'v SavedVariant>> {
		let variant = normalize(submission, variant)?;
		let identity = variant.identity();
		let mut matches = find_matches(candidates, &identity)?;

		if matches.is_empty()
			&& submission.genome_build == GenomeBuild::GRCh38
			&& declared_build(&variant) == Some(GenomeBuild::GRCh37)
		{
			let lifted = self.lifter.convert(
				GenomeBuild::GRCh37,
				GenomeBuild::GRCh38,
				&variant.reference_name,
				variant.start,
			);

			tracing::debug!(
				submission = %submission.guid,
				chrom = %variant.reference_name,
				pos = variant.start,
				lifted = ?lifted,
				"Retrying match on GRCh38."
			);

			if let Some(pos) = lifted {
				matches = find_matches(candidates, &identity.with_pos(pos))?;
			}
		}

		if matches.len() > 1 {
			return self.disambiguate(submission, &variant, matches);
		}

		match matches.first() {
			Some(single) => Ok(Some(*single)),
			None if submission.deleted => Ok(None),
			None => Err(Error::UnresolvedVariant {
				submission: submission.guid.clone(),
				family: submission.family_id.clone(),
				variant: describe(&variant),
			}),
		}
	}

	fn disambiguate<'v>(
		&self,
		submission: &MatchmakerSubmission,
		variant: &FeatureVariant,
		matches: Vec<&'v SavedVariant>,
	) -> Result<Option<&'v SavedVariant>> {
		let tagged: Vec<&SavedVariant> =
			matches.iter().copied().filter(|sv| sv.has_tag(self.external_match_tag)).collect();

		if let [only] = tagged.as_slice() {
			return Ok(Some(*only));
		}

		// Re-loaded structural variants get new IDs but are the same call; any copy will do.
		let sv_type = matches[0].sv_type.as_deref().filter(|sv_type| !sv_type.is_empty());

		if let Some(sv_type) = sv_type
			&& matches.iter().all(|sv| sv.sv_type.as_deref() == Some(sv_type))
		{
			return Ok(matches.into_iter().max_by_key(|sv| sv.tags.len()));
		}

		Err(Error::AmbiguousVariant {
			submission: submission.guid.clone(),
			family: submission.family_id.clone(),
			variant: describe(variant),
			count: matches.len(),
			candidates: matches.iter().map(|sv| sv.guid.clone()).collect(),
		})
	}
}

// Legacy submissions put the assembly in `referenceName` and the chromosome in `assembly`.
fn normalize(
	submission: &MatchmakerSubmission,
	variant: &FeatureVariant,
) -> Result<FeatureVariant> {
	let mut variant = variant.clone();

	if variant.reference_name == GenomeBuild::GRCh37.as_str() {
		let Some(chrom) = variant.assembly.take() else {
			return Err(Error::InvalidSubmission {
				submission: submission.guid.clone(),
				message: "Variant names GRCh37 as its chromosome without an assembly field."
					.to_string(),
			});
		};

		variant.reference_name = chrom;
		variant.assembly = Some(GenomeBuild::GRCh37.as_str().to_string());
	}

	Ok(variant)
}

fn declared_build(variant: &FeatureVariant) -> Option<GenomeBuild> {
	variant.assembly.as_deref().and_then(|assembly| assembly.parse().ok())
}

fn find_matches<'v>(
	candidates: &'v [SavedVariant],
	identity: &VariantIdentity,
) -> Result<Vec<&'v SavedVariant>> {
	let mut matches = Vec::new();

	for candidate in candidates {
		if candidate.identity()? == *identity {
			matches.push(candidate);
		}
	}

	Ok(matches)
}

fn describe(variant: &FeatureVariant) -> String {
	serde_json::to_string(variant).unwrap_or_else(|_| variant.identity().to_string())
}
