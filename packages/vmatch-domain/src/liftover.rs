//! Coordinate conversion between genome assemblies.
//!
//! Positions in this API are 1-based. Chain files are loaded once, at startup, and the
//! converter is then shared read-only for the lifetime of the process.

pub mod chain;

use std::{collections::HashMap, fmt, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

pub use chain::{Chain, ChainBlock, ChainFile};

use crate::{Error, Result};

/// Human reference assemblies, ordered from earlier to later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GenomeBuild {
	#[serde(rename = "GRCh37", alias = "37", alias = "hg19")]
	GRCh37,
	#[serde(rename = "GRCh38", alias = "38", alias = "hg38")]
	GRCh38,
}
impl GenomeBuild {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::GRCh37 => "GRCh37",
			Self::GRCh38 => "GRCh38",
		}
	}
}
impl FromStr for GenomeBuild {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw.trim() {
			"GRCh37" | "37" | "hg19" => Ok(Self::GRCh37),
			"GRCh38" | "38" | "hg38" => Ok(Self::GRCh38),
			other => Err(Error::InvalidCoordinate {
				message: format!("Unknown genome build: {other}"),
			}),
		}
	}
}
impl fmt::Display for GenomeBuild {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A single lifted coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiftedPosition {
	pub chrom: String,
	pub pos: u64,
	pub chain_score: u64,
}

/// Anything that can convert a position between assemblies.
///
/// Returning `None` means "no mapping"; callers treat that as an unmatched variant rather
/// than an error.
pub trait Lifter
where
	Self: Send + Sync,
{
	fn convert(&self, from: GenomeBuild, to: GenomeBuild, chrom: &str, pos: u64) -> Option<u64>;
}

/// Chain-file backed converter.
#[derive(Debug, Default)]
pub struct Liftover {
	chains: HashMap<(GenomeBuild, GenomeBuild), ChainFile>,
}
impl Liftover {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_chains(mut self, from: GenomeBuild, to: GenomeBuild, chains: ChainFile) -> Self {
		self.chains.insert((from, to), chains);

		self
	}

	pub fn load(mut self, from: GenomeBuild, to: GenomeBuild, path: &Path) -> Result<Self> {
		self.chains.insert((from, to), ChainFile::from_path(path)?);

		Ok(self)
	}

	pub fn supports(&self, from: GenomeBuild, to: GenomeBuild) -> bool {
		self.chains.get(&(from, to)).is_some_and(|chains| !chains.is_empty())
	}

	/// Every mapping of a 1-based position, best chain first.
	pub fn candidates(
		&self,
		from: GenomeBuild,
		to: GenomeBuild,
		chrom: &str,
		pos: u64,
	) -> Vec<LiftedPosition> {
		let Some(chains) = self.chains.get(&(from, to)) else {
			return Vec::new();
		};
		let Some(zero_based) = pos.checked_sub(1) else {
			return Vec::new();
		};

		chains
			.covering(chrom, zero_based)
			.into_iter()
			.filter_map(|chain| {
				chain.lift_position(zero_based).map(|lifted| LiftedPosition {
					chrom: chain.query_name.clone(),
					pos: lifted + 1,
					chain_score: chain.score,
				})
			})
			.collect()
	}
}
impl Lifter for Liftover {
	fn convert(&self, from: GenomeBuild, to: GenomeBuild, chrom: &str, pos: u64) -> Option<u64> {
		self.candidates(from, to, chrom, pos).into_iter().next().map(|lifted| lifted.pos)
	}
}
