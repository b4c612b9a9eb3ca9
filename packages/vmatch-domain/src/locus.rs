use std::{fmt, str::FromStr, sync::OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, xpos};

/// A genomic position or range, optionally carrying alleles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locus {
	pub chrom: String,
	pub pos: u64,
	pub end: Option<u64>,
	pub ref_allele: Option<String>,
	pub alt_allele: Option<String>,
}
impl Locus {
	pub fn from_xpos(
		xpos: i64,
		xpos_end: Option<i64>,
		ref_allele: Option<&str>,
		alt_allele: Option<&str>,
	) -> Result<Self> {
		let (chrom, pos) = xpos::get_chrom_pos(xpos)?;
		let end = xpos_end.map(xpos::get_chrom_pos).transpose()?.map(|(_, end)| end);

		Ok(Self {
			chrom: chrom.to_string(),
			pos,
			end,
			ref_allele: ref_allele.map(str::to_string),
			alt_allele: alt_allele.map(str::to_string),
		})
	}

	pub fn identity(&self) -> VariantIdentity {
		VariantIdentity::new(
			&self.chrom,
			self.pos,
			self.end,
			self.ref_allele.as_deref(),
			self.alt_allele.as_deref(),
		)
	}
}

/// Exact identity of a variant: chromosome, start, and either the alleles or, for
/// allele-less records such as structural variants, the end position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantIdentity {
	chrom: String,
	pos: u64,
	tail: IdentityTail,
}
impl VariantIdentity {
	pub fn new(
		chrom: &str,
		pos: u64,
		end: Option<u64>,
		ref_allele: Option<&str>,
		alt_allele: Option<&str>,
	) -> Self {
		let chrom = xpos::canonical_chrom(chrom).unwrap_or(chrom).to_string();
		let tail = match ref_allele.filter(|allele| !allele.is_empty()) {
			Some(ref_allele) => IdentityTail::Alleles {
				ref_allele: ref_allele.to_string(),
				alt_allele: alt_allele.map(str::to_string),
			},
			None => IdentityTail::End(end),
		};

		Self { chrom, pos, tail }
	}

	pub fn with_pos(&self, pos: u64) -> Self {
		Self { pos, ..self.clone() }
	}
}
impl fmt::Display for VariantIdentity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}-{}-", self.chrom, self.pos)?;

		match &self.tail {
			IdentityTail::Alleles { ref_allele, alt_allele } =>
				write!(f, "{ref_allele}-{}", alt_allele.as_deref().unwrap_or("")),
			IdentityTail::End(Some(end)) => write!(f, "{end}"),
			IdentityTail::End(None) => Ok(()),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum IdentityTail {
	Alleles { ref_allele: String, alt_allele: Option<String> },
	End(Option<u64>),
}

/// A `chrom-pos-ref-alt` variant ID, e.g. `1-12345-A-G` or `chrX-100-T-TA`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantId {
	pub chrom: String,
	pub pos: u64,
	pub ref_allele: String,
	pub alt_allele: String,
}
impl VariantId {
	/// Parses and additionally checks that the chromosome and position encode to an xpos.
	pub fn parse_validated(text: &str) -> Result<Self> {
		let id: Self = text.parse()?;

		xpos::get_xpos(&id.chrom, id.pos)?;

		Ok(id)
	}

	pub fn xpos(&self) -> Result<i64> {
		xpos::get_xpos(&self.chrom, self.pos)
	}
}
impl FromStr for VariantId {
	type Err = Error;

	fn from_str(text: &str) -> Result<Self> {
		let trimmed = text.trim();
		let bare = trimmed.strip_prefix("chr").unwrap_or(trimmed);
		let parts: Vec<&str> = bare.split('-').collect();
		let [chrom, pos, ref_allele, alt_allele] = parts.as_slice() else {
			return Err(Error::InvalidVariantId(text.to_string()));
		};

		if chrom.is_empty() || ref_allele.is_empty() || alt_allele.is_empty() {
			return Err(Error::InvalidVariantId(text.to_string()));
		}

		let pos = pos.parse::<u64>().map_err(|_| Error::InvalidVariantId(text.to_string()))?;

		Ok(Self {
			chrom: chrom.to_string(),
			pos,
			ref_allele: ref_allele.to_string(),
			alt_allele: alt_allele.to_string(),
		})
	}
}
impl fmt::Display for VariantId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}-{}-{}-{}", self.chrom, self.pos, self.ref_allele, self.alt_allele)
	}
}

/// A closed genomic interval, 1-based and inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenomicInterval {
	pub chrom: String,
	pub start: u64,
	pub end: u64,
}
impl GenomicInterval {
	/// Parses `chr1:100-200` (the `chr` prefix and thousands separators are optional).
	/// Returns `None` when the text is not shaped like an interval at all.
	pub fn parse(text: &str) -> Option<Result<Self>> {
		let captures = interval_pattern()?.captures(text.trim())?;
		let chrom = &captures[1];
		let start = captures[2].replace(',', "").parse::<u64>();
		let end = captures[3].replace(',', "").parse::<u64>();
		let (Ok(start), Ok(end)) = (start, end) else {
			return Some(Err(Error::InvalidCoordinate {
				message: format!("Invalid interval: {text}"),
			}));
		};

		Some(Self::new(chrom, start, end))
	}

	pub fn new(chrom: &str, start: u64, end: u64) -> Result<Self> {
		let start_xpos = xpos::get_xpos(chrom, start)?;
		let end_xpos = xpos::get_xpos(chrom, end)?;

		if end_xpos < start_xpos {
			return Err(Error::InvalidCoordinate {
				message: format!("Interval end precedes start: {chrom}:{start}-{end}"),
			});
		}

		let chrom = xpos::canonical_chrom(chrom).unwrap_or(chrom).to_string();

		Ok(Self { chrom, start, end })
	}

	pub fn contains(&self, chrom: &str, pos: u64) -> bool {
		xpos::canonical_chrom(chrom) == Some(self.chrom.as_str())
			&& (self.start..=self.end).contains(&pos)
	}
}

fn interval_pattern() -> Option<&'static Regex> {
	static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

	PATTERN
		.get_or_init(|| {
			Regex::new(r"^(?:chr)?([0-9]{1,2}|[XYM]|MT):([0-9][0-9,]*)-([0-9][0-9,]*)$").ok()
		})
		.as_ref()
}
