pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid coordinate: {message}")]
	InvalidCoordinate { message: String },
	#[error("Invalid variant ID: {0}")]
	InvalidVariantId(String),
	#[error("Invalid chain file at line {line}: {message}")]
	ChainFile { line: usize, message: String },
	#[error(transparent)]
	Io(#[from] std::io::Error),
}
