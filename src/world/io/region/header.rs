use std::io::{Read, Write};

use crate::{
	ioext::*,
	world::io::{
		compression::CompressionScheme,
		migrate::FormatVersion,
	},
	McResult, McError,
};

use super::coord::RegionBounds;

/// Every region starts with these bytes.
pub const MAGIC: [u8; 4] = *b"Polr";

/// The fixed part of the header, without the user data bytes.
pub const FIXED_HEADER_LEN: u64 = 4 + 2 + 1 + 1 + 1 + 4 + 12 + 8 + 4;

/// The header at the beginning of every region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionHeader {
	/// The format version every chunk record in the region was written with.
	pub version: u16,
	pub compression: CompressionScheme,
	pub min_section: i8,
	pub max_section: i8,
	/// The game data version of the content, see [crate::world::io::convert].
	pub data_version: i32,
	pub bounds: RegionBounds,
	/// Absolute position of the index table.
	pub index_offset: u64,
	/// Opaque world-level bytes owned by the host.
	pub user_data: Vec<u8>,
}

impl RegionHeader {
	/// The encoded size of this header.
	pub fn len(&self) -> u64 {
		FIXED_HEADER_LEN + self.user_data.len() as u64
	}

	pub fn section_count(&self) -> usize {
		(self.max_section as i32 - self.min_section as i32 + 1).max(0) as usize
	}
}

impl Readable for RegionHeader {
	fn read_from<R: Read>(reader: &mut R) -> McResult<Self> {
		let mut magic = [0u8; 4];
		reader.read_exact(&mut magic)?;
		if magic != MAGIC {
			return McError::corrupt(format!("bad magic: {magic:02X?}"));
		}
		let version = reader.read_value::<u16>()?;
		FormatVersion::check(version)?;
		let compression = reader.read_value::<CompressionScheme>()?;
		let min_section = reader.read_value::<i8>()?;
		let max_section = reader.read_value::<i8>()?;
		if max_section < min_section {
			return McError::corrupt(format!("section range {min_section}..={max_section} is empty"));
		}
		Ok(Self {
			version,
			compression,
			min_section,
			max_section,
			data_version: reader.read_value()?,
			bounds: reader.read_value()?,
			index_offset: reader.read_value()?,
			user_data: reader.read_byte_array()?,
		})
	}
}

impl Writable for RegionHeader {
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
		writer.write_all(&MAGIC)?;
		let mut size = MAGIC.len();
		size += writer.write_value(self.version)?;
		size += writer.write_value(self.compression)?;
		size += writer.write_value(self.min_section)?;
		size += writer.write_value(self.max_section)?;
		size += writer.write_value(self.data_version)?;
		size += writer.write_value(self.bounds)?;
		size += writer.write_value(self.index_offset)?;
		size += writer.write_byte_array(&self.user_data)?;
		Ok(size)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn header() -> RegionHeader {
		RegionHeader {
			version: FormatVersion::CURRENT,
			compression: CompressionScheme::ZLib,
			min_section: -4,
			max_section: 19,
			data_version: 3953,
			bounds: RegionBounds::new(-16, 32, 32, 32),
			index_offset: 0,
			user_data: b"seed=42".to_vec(),
		}
	}

	#[test]
	fn layout() {
		let header = header();
		let bytes = to_bytes(&header).unwrap();
		assert_eq!(bytes.len() as u64, header.len());
		assert_eq!(&bytes[..4], b"Polr");
		assert_eq!(&bytes[4..7], &[0, 4, 2]);
		assert_eq!(&bytes[9..13], &3953i32.to_be_bytes());
		assert_eq!(read_exact_value::<RegionHeader>(&bytes).unwrap(), header);
		assert_eq!(header.section_count(), 24);
	}

	#[test]
	fn rejects_bad_headers() {
		let bytes = to_bytes(&header()).unwrap();

		let mut bad_magic = bytes.clone();
		bad_magic[0] = b'X';
		assert!(read_exact_value::<RegionHeader>(&bad_magic).unwrap_err().is_corrupt());

		let mut future = bytes.clone();
		future[5] = 9;
		assert!(matches!(read_exact_value::<RegionHeader>(&future), Err(McError::UnsupportedVersion(9))));

		let mut unknown_algorithm = bytes.clone();
		unknown_algorithm[6] = 7;
		assert!(matches!(read_exact_value::<RegionHeader>(&unknown_algorithm), Err(McError::UnsupportedAlgorithm(7))));

		assert!(read_exact_value::<RegionHeader>(&bytes[..20]).unwrap_err().is_corrupt());
	}
}
