//! Compression of chunk records.
//!
//! Every record is compressed on its own so that any chunk can be read
//! without touching its neighbours. The uncompressed length is stored next
//! to each record and bounds decompression.

use std::io::{Read, Write};

use flate2::{
	Compression,
	read::{GzDecoder, ZlibDecoder},
	write::{GzEncoder, ZlibEncoder},
};

use crate::{
	ioext::*,
	McResult, McError,
};

/// Compression scheme used for chunk records.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionScheme {
	/// Records are stored as is.
	None = 0,
	/// Zstandard, only available with the `zstd` feature.
	Zstd = 1,
	ZLib = 2,
	GZip = 3,
}

/// Zstd when the feature is enabled, ZLib otherwise.
impl Default for CompressionScheme {
	fn default() -> Self {
		if cfg!(feature = "zstd") {
			CompressionScheme::Zstd
		} else {
			CompressionScheme::ZLib
		}
	}
}

impl CompressionScheme {
	pub fn id(self) -> u8 {
		self as u8
	}

	/// The default level for this scheme, used when none is configured.
	pub fn default_level(self) -> i32 {
		match self {
			CompressionScheme::None => 0,
			CompressionScheme::Zstd => 3,
			CompressionScheme::ZLib | CompressionScheme::GZip => 6,
		}
	}

	/// True when this build can read and write the scheme.
	pub fn is_available(self) -> bool {
		match self {
			CompressionScheme::Zstd => cfg!(feature = "zstd"),
			_ => true,
		}
	}

	pub fn compress(self, data: &[u8], level: i32) -> McResult<Vec<u8>> {
		compress(data, self.id(), level)
	}

	pub fn decompress(self, data: &[u8], raw_length: usize) -> McResult<Vec<u8>> {
		decompress(data, self.id(), raw_length)
	}
}

impl TryFrom<u8> for CompressionScheme {
	type Error = McError;

	fn try_from(value: u8) -> Result<Self, Self::Error> {
		match value {
			0 => Ok(CompressionScheme::None),
			1 => Ok(CompressionScheme::Zstd),
			2 => Ok(CompressionScheme::ZLib),
			3 => Ok(CompressionScheme::GZip),
			unknown => Err(McError::UnsupportedAlgorithm(unknown)),
		}
	}
}

impl Readable for CompressionScheme {
	fn read_from<R: Read>(reader: &mut R) -> McResult<Self> {
		CompressionScheme::try_from(reader.read_value::<u8>()?)
	}
}

impl Writable for CompressionScheme {
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
		writer.write_value(self.id())
	}
}

fn flate_level(level: i32) -> Compression {
	Compression::new(level.clamp(0, 9) as u32)
}

/// Compresses `data` with the algorithm `id`.
pub fn compress(data: &[u8], id: u8, level: i32) -> McResult<Vec<u8>> {
	match CompressionScheme::try_from(id)? {
		CompressionScheme::None => Ok(data.to_vec()),
		CompressionScheme::Zstd => compress_zstd(data, level),
		CompressionScheme::ZLib => {
			let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), flate_level(level));
			encoder.write_all(data)?;
			Ok(encoder.finish()?)
		}
		CompressionScheme::GZip => {
			let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), flate_level(level));
			encoder.write_all(data)?;
			Ok(encoder.finish()?)
		}
	}
}

/// Decompresses `data` with the algorithm `id`.
/// Output that differs from `raw_length` is [McError::CorruptData].
pub fn decompress(data: &[u8], id: u8, raw_length: usize) -> McResult<Vec<u8>> {
	let output = match CompressionScheme::try_from(id)? {
		CompressionScheme::None => data.to_vec(),
		CompressionScheme::Zstd => decompress_zstd(data, raw_length)?,
		CompressionScheme::ZLib => read_bounded(ZlibDecoder::new(data), raw_length)?,
		CompressionScheme::GZip => read_bounded(GzDecoder::new(data), raw_length)?,
	};
	if output.len() != raw_length {
		return McError::corrupt(format!(
			"record decompressed to {} bytes, expected {raw_length}",
			output.len()
		));
	}
	Ok(output)
}

// Reads at most one byte past the expected length so oversized output is
// detected without inflating all of it.
fn read_bounded<R: Read>(decoder: R, raw_length: usize) -> McResult<Vec<u8>> {
	let mut output = Vec::with_capacity(raw_length.min(1 << 20));
	decoder.take(raw_length as u64 + 1)
		.read_to_end(&mut output)
		.or_else(|err| McError::corrupt(format!("decompression failed: {err}")))?;
	Ok(output)
}

#[cfg(feature = "zstd")]
fn compress_zstd(data: &[u8], level: i32) -> McResult<Vec<u8>> {
	Ok(zstd::bulk::compress(data, level)?)
}

#[cfg(feature = "zstd")]
fn decompress_zstd(data: &[u8], raw_length: usize) -> McResult<Vec<u8>> {
	let decoder = zstd::stream::read::Decoder::with_buffer(data)
		.or_else(|err| McError::corrupt(format!("decompression failed: {err}")))?;
	read_bounded(decoder, raw_length)
}

#[cfg(not(feature = "zstd"))]
fn compress_zstd(_: &[u8], _: i32) -> McResult<Vec<u8>> {
	Err(McError::UnsupportedAlgorithm(CompressionScheme::Zstd.id()))
}

#[cfg(not(feature = "zstd"))]
fn decompress_zstd(_: &[u8], _: usize) -> McResult<Vec<u8>> {
	Err(McError::UnsupportedAlgorithm(CompressionScheme::Zstd.id()))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample() -> Vec<u8> {
		(0..10_000u32).flat_map(|i| (i % 251).to_be_bytes()).collect()
	}

	#[test]
	fn every_available_scheme() {
		let data = sample();
		for scheme in [CompressionScheme::None, CompressionScheme::Zstd, CompressionScheme::ZLib, CompressionScheme::GZip] {
			if !scheme.is_available() {
				continue;
			}
			let packed = scheme.compress(&data, scheme.default_level()).unwrap();
			if scheme != CompressionScheme::None {
				assert!(packed.len() < data.len(), "{scheme:?}");
			}
			assert_eq!(scheme.decompress(&packed, data.len()).unwrap(), data, "{scheme:?}");
		}
	}

	#[test]
	fn unknown_algorithm() {
		assert!(matches!(compress(b"abc", 9, 0), Err(McError::UnsupportedAlgorithm(9))));
		assert!(matches!(decompress(b"abc", 200, 3), Err(McError::UnsupportedAlgorithm(200))));
	}

	#[test]
	fn length_mismatch_is_corrupt() {
		let data = sample();
		for scheme in [CompressionScheme::None, CompressionScheme::Zstd, CompressionScheme::ZLib, CompressionScheme::GZip] {
			if !scheme.is_available() {
				continue;
			}
			let packed = scheme.compress(&data, 1).unwrap();
			assert!(scheme.decompress(&packed, data.len() - 1).unwrap_err().is_corrupt(), "{scheme:?}");
			assert!(scheme.decompress(&packed, data.len() + 1).unwrap_err().is_corrupt(), "{scheme:?}");
		}
	}

	#[test]
	fn huge_claimed_length_is_corrupt() {
		let data = sample();
		for scheme in [CompressionScheme::None, CompressionScheme::Zstd, CompressionScheme::ZLib, CompressionScheme::GZip] {
			if !scheme.is_available() {
				continue;
			}
			let packed = scheme.compress(&data, 1).unwrap();
			assert!(scheme.decompress(&packed, u32::MAX as usize).unwrap_err().is_corrupt(), "{scheme:?}");
		}
	}

	#[test]
	fn garbage_is_corrupt() {
		assert!(decompress(&[1, 2, 3, 4, 5], CompressionScheme::ZLib.id(), 10).unwrap_err().is_corrupt());
		assert!(decompress(&[1, 2, 3, 4, 5], CompressionScheme::GZip.id(), 10).unwrap_err().is_corrupt());
		if CompressionScheme::Zstd.is_available() {
			assert!(decompress(&[1, 2, 3, 4, 5], CompressionScheme::Zstd.id(), 10).unwrap_err().is_corrupt());
		}
	}

	#[cfg(not(feature = "zstd"))]
	#[test]
	fn zstd_needs_feature() {
		assert!(matches!(compress(b"abc", 1, 3), Err(McError::UnsupportedAlgorithm(1))));
	}
}
