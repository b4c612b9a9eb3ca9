//! Genome-wide sortable positions.
//!
//! An xpos packs a chromosome ordinal and a 1-based position into one integer,
//! `ordinal * 1e9 + pos`, so that integer order equals genomic order across the
//! canonical chromosome list.

use crate::{Error, Result};

pub const CHROMOSOMES: [&str; 25] = [
	"1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15", "16", "17",
	"18", "19", "20", "21", "22", "X", "Y", "M",
];
pub const MIN_POSITION: u64 = 1;
pub const MAX_POSITION: u64 = 300_000_000;

const XPOS_FACTOR: i64 = 1_000_000_000;

/// Maps any accepted spelling (`chr1`, `1`, `MT`, `chrM`) onto its canonical name.
pub fn canonical_chrom(chrom: &str) -> Option<&'static str> {
	let trimmed = chrom.trim();
	let bare = trimmed.strip_prefix("chr").unwrap_or(trimmed);
	let bare = if bare.eq_ignore_ascii_case("MT") { "M" } else { bare };

	CHROMOSOMES.iter().copied().find(|candidate| candidate.eq_ignore_ascii_case(bare))
}

pub fn chrom_ordinal(chrom: &str) -> Option<i64> {
	let canonical = canonical_chrom(chrom)?;

	CHROMOSOMES.iter().position(|candidate| *candidate == canonical).map(|idx| idx as i64 + 1)
}

pub fn get_xpos(chrom: &str, pos: u64) -> Result<i64> {
	let ordinal = chrom_ordinal(chrom).ok_or_else(|| Error::InvalidCoordinate {
		message: format!("Invalid chromosome: {chrom}"),
	})?;

	if !(MIN_POSITION..=MAX_POSITION).contains(&pos) {
		return Err(Error::InvalidCoordinate {
			message: format!("Invalid position {pos} on chromosome {chrom}"),
		});
	}

	Ok(ordinal * XPOS_FACTOR + pos as i64)
}

pub fn get_chrom_pos(xpos: i64) -> Result<(&'static str, u64)> {
	let ordinal = xpos / XPOS_FACTOR;
	let pos = xpos % XPOS_FACTOR;
	let chrom = usize::try_from(ordinal - 1)
		.ok()
		.and_then(|idx| CHROMOSOMES.get(idx).copied())
		.ok_or_else(|| Error::InvalidCoordinate { message: format!("Invalid xpos: {xpos}") })?;

	if pos < MIN_POSITION as i64 {
		return Err(Error::InvalidCoordinate { message: format!("Invalid xpos: {xpos}") });
	}

	Ok((chrom, pos as u64))
}

#[cfg(test)]
mod tests {
	use super::{CHROMOSOMES, canonical_chrom, get_chrom_pos, get_xpos};

	#[test]
	fn canonical_chrom_accepts_common_spellings() {
		assert_eq!(canonical_chrom("chr1"), Some("1"));
		assert_eq!(canonical_chrom("x"), Some("X"));
		assert_eq!(canonical_chrom("MT"), Some("M"));
		assert_eq!(canonical_chrom("chrM"), Some("M"));
		assert_eq!(canonical_chrom("GRCh37"), None);
	}

	#[test]
	fn every_chromosome_round_trips() {
		for chrom in CHROMOSOMES {
			for pos in [1, 12_345, 300_000_000] {
				let xpos = get_xpos(chrom, pos).expect("valid coordinate");

				assert_eq!(get_chrom_pos(xpos).expect("valid xpos"), (chrom, pos));
			}
		}
	}

	#[test]
	fn known_value() {
		assert_eq!(get_xpos("chr2", 100).expect("valid coordinate"), 2_000_000_100);
		assert_eq!(get_xpos("MT", 5).expect("valid coordinate"), 25_000_000_005);
	}

	#[test]
	fn out_of_range_positions_fail() {
		assert!(get_xpos("1", 0).is_err());
		assert!(get_xpos("1", 300_000_001).is_err());
		assert!(get_xpos("23", 10).is_err());
		assert!(get_chrom_pos(26_000_000_001).is_err());
		assert!(get_chrom_pos(1_000_000_000).is_err());
	}
}
