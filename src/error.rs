use std::io::ErrorKind;

use thiserror::Error;

use crate::world::io::region::coord::ChunkCoord;

/// The master error type.
#[derive(Debug, Error)]
pub enum McError {
	#[error("IO Error: {0}")]
	IoError(std::io::Error),
	#[error("Corrupt data: {0}")]
	CorruptData(String),
	#[error("Unsupported format version: {0}")]
	UnsupportedVersion(u16),
	#[error("Unsupported compression algorithm: {0}")]
	UnsupportedAlgorithm(u8),
	#[error("Index {index} is out of range for length {len}.")]
	IndexOutOfRange {
		index: usize,
		len: usize,
	},
	#[error("Value can not be represented in the world format: {0}")]
	Unrepresentable(String),
	#[error("Chunk {0} lies outside of the region bounds.")]
	CoordOutOfBounds(ChunkCoord),
	#[error("Attempted to save two chunks to the same location: {0}")]
	DuplicateChunk(ChunkCoord),
	#[error("Parse Error: {0}")]
	ParseError(String),
}

impl McError {
	#[inline(always)]
	pub fn corrupt<T, S: AsRef<str>>(msg: S) -> Result<T, Self> {
		Err(McError::CorruptData(msg.as_ref().to_owned()))
	}

	#[inline(always)]
	pub fn unrepresentable<T, S: AsRef<str>>(msg: S) -> Result<T, Self> {
		Err(McError::Unrepresentable(msg.as_ref().to_owned()))
	}

	/// Fails with [McError::CorruptData] when `condition` is false.
	pub fn check<S: AsRef<str>>(condition: bool, msg: S) -> Result<(), Self> {
		if condition {
			Ok(())
		} else {
			McError::corrupt(msg)
		}
	}

	/// Returns true for [McError::CorruptData].
	pub fn is_corrupt(&self) -> bool {
		matches!(self, McError::CorruptData(_))
	}
}

// A stream that ends early is a truncated buffer, not an IO failure.
impl From<std::io::Error> for McError {
	fn from(value: std::io::Error) -> Self {
		if value.kind() == ErrorKind::UnexpectedEof {
			McError::CorruptData("unexpected end of data".to_owned())
		} else {
			McError::IoError(value)
		}
	}
}

impl From<std::string::FromUtf8Error> for McError {
	fn from(value: std::string::FromUtf8Error) -> Self {
		McError::CorruptData(format!("invalid UTF-8 string: {value}"))
	}
}

pub type McResult<T> = Result<T,McError>;
