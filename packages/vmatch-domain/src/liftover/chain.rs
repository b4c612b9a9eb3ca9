//! UCSC chain file parsing.
//!
//! Chain coordinates are 0-based, half-open. Contig names are stored in their
//! canonical form (`chr1` and `1` both become `1`) so lookups do not depend on
//! the naming convention of the file.

use std::{
	collections::HashMap,
	fs::File,
	io::{BufRead, BufReader, Read},
	path::Path,
};

use flate2::read::GzDecoder;

use crate::{Error, Result, xpos};

#[derive(Debug, Clone)]
pub struct Chain {
	pub id: u64,
	pub score: u64,
	pub target_name: String,
	pub target_start: u64,
	pub target_end: u64,
	pub query_name: String,
	pub query_size: u64,
	pub query_minus: bool,
	pub query_start: u64,
	pub blocks: Vec<ChainBlock>,
}
impl Chain {
	pub fn contains(&self, pos: u64) -> bool {
		pos >= self.target_start && pos < self.target_end
	}

	/// Maps a 0-based target position onto the query. `None` when the position falls in a gap.
	pub fn lift_position(&self, pos: u64) -> Option<u64> {
		if !self.contains(pos) {
			return None;
		}

		let mut target = self.target_start;
		let mut query = self.query_start;

		for block in &self.blocks {
			let block_end = target + block.size;

			if pos < block_end {
				let lifted = query + (pos - target);

				return Some(if self.query_minus { self.query_size - lifted - 1 } else { lifted });
			}

			target = block_end + block.target_gap;
			query += block.size + block.query_gap;

			if pos < target {
				return None;
			}
		}

		None
	}
}

#[derive(Debug, Clone, Copy)]
pub struct ChainBlock {
	pub size: u64,
	pub target_gap: u64,
	pub query_gap: u64,
}

/// Chains grouped by canonical target contig.
#[derive(Debug, Clone, Default)]
pub struct ChainFile {
	chains: HashMap<String, Vec<Chain>>,
}
impl ChainFile {
	/// Reads a plain or gzip-compressed (`.gz`) chain file.
	pub fn from_path(path: &Path) -> Result<Self> {
		let file = File::open(path)?;

		if path.extension().is_some_and(|ext| ext == "gz") {
			Self::parse(GzDecoder::new(file))
		} else {
			Self::parse(file)
		}
	}

	pub fn parse<R>(reader: R) -> Result<Self>
	where
		R: Read,
	{
		let mut out = Self::default();
		let mut current: Option<Chain> = None;

		for (idx, line) in BufReader::new(reader).lines().enumerate() {
			let line_no = idx + 1;
			let line = line?;
			let line = line.trim();

			if line.is_empty() || line.starts_with('#') {
				continue;
			}
			if line.starts_with("chain") {
				if let Some(chain) = current.take() {
					out.insert(chain);
				}

				current = Some(parse_header(line, line_no)?);

				continue;
			}

			let Some(chain) = current.as_mut() else {
				return Err(Error::ChainFile {
					line: line_no,
					message: "Alignment block precedes any chain header.".to_string(),
				});
			};

			chain.blocks.push(parse_block(line, line_no)?);
		}

		if let Some(chain) = current {
			out.insert(chain);
		}

		Ok(out)
	}

	pub fn is_empty(&self) -> bool {
		self.chains.is_empty()
	}

	/// Chains covering a 0-based target position, best score first.
	pub fn covering(&self, contig: &str, pos: u64) -> Vec<&Chain> {
		let Some(chains) = self.chains.get(&contig_key(contig)) else {
			return Vec::new();
		};
		let mut hits: Vec<&Chain> = chains.iter().filter(|chain| chain.contains(pos)).collect();

		hits.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));

		hits
	}

	fn insert(&mut self, mut chain: Chain) {
		chain.query_name = contig_key(&chain.query_name);

		self.chains.entry(contig_key(&chain.target_name)).or_default().push(chain);
	}
}

fn contig_key(name: &str) -> String {
	xpos::canonical_chrom(name).map(str::to_string).unwrap_or_else(|| name.to_string())
}

// chain score tName tSize tStrand tStart tEnd qName qSize qStrand qStart qEnd id
fn parse_header(line: &str, line_no: usize) -> Result<Chain> {
	let parts: Vec<&str> = line.split_whitespace().collect();

	if parts.len() < 12 {
		return Err(Error::ChainFile {
			line: line_no,
			message: format!("Expected at least 12 header fields, found {}.", parts.len()),
		});
	}

	let number = |idx: usize, label: &str| {
		parts[idx].parse::<u64>().map_err(|_| Error::ChainFile {
			line: line_no,
			message: format!("Invalid {label}: {}", parts[idx]),
		})
	};

	if parts[4] != "+" {
		return Err(Error::ChainFile {
			line: line_no,
			message: "Target strand must be '+'.".to_string(),
		});
	}

	Ok(Chain {
		id: parts.get(12).and_then(|raw| raw.parse().ok()).unwrap_or(line_no as u64),
		score: number(1, "score")?,
		target_name: parts[2].to_string(),
		target_start: number(5, "target start")?,
		target_end: number(6, "target end")?,
		query_name: parts[7].to_string(),
		query_size: number(8, "query size")?,
		query_minus: parts[9] == "-",
		query_start: number(10, "query start")?,
		blocks: Vec::new(),
	})
}

fn parse_block(line: &str, line_no: usize) -> Result<ChainBlock> {
	let fields = line
		.split_whitespace()
		.map(|raw| raw.parse::<u64>())
		.collect::<std::result::Result<Vec<_>, _>>()
		.map_err(|_| Error::ChainFile {
			line: line_no,
			message: format!("Invalid alignment block: {line}"),
		})?;

	match fields.as_slice() {
		[size] => Ok(ChainBlock { size: *size, target_gap: 0, query_gap: 0 }),
		[size, target_gap, query_gap] =>
			Ok(ChainBlock { size: *size, target_gap: *target_gap, query_gap: *query_gap }),
		_ => Err(Error::ChainFile {
			line: line_no,
			message: format!("Expected 1 or 3 block fields: {line}"),
		}),
	}
}
