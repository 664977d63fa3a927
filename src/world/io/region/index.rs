use std::io::{Read, Write};

use crate::{
	ioext::*,
	McResult,
};

use super::timestamp::Timestamp;

/// Bytes per index entry.
pub const ENTRY_LEN: u64 = 8 + 4 + 4 + 4;

/// Where a chunk record lives in the region.
/// An offset of zero means the chunk is not present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IndexEntry {
	/// Absolute position of the compressed record.
	pub offset: u64,
	/// Length of the compressed record.
	pub length: u32,
	/// Length of the record after decompression.
	pub raw_length: u32,
	pub timestamp: Timestamp,
}

impl IndexEntry {
	pub const EMPTY: IndexEntry = IndexEntry {
		offset: 0,
		length: 0,
		raw_length: 0,
		timestamp: Timestamp::new(0),
	};

	pub fn is_present(&self) -> bool {
		self.offset != 0
	}

	/// The position right after the record.
	pub fn end(&self) -> u64 {
		self.offset.saturating_add(self.length as u64)
	}
}

impl Readable for IndexEntry {
	fn read_from<R: Read>(reader: &mut R) -> McResult<Self> {
		Ok(Self {
			offset: reader.read_value()?,
			length: reader.read_value()?,
			raw_length: reader.read_value()?,
			timestamp: reader.read_value()?,
		})
	}
}

impl Writable for IndexEntry {
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
		Ok(
			writer.write_value(self.offset)?
			+ writer.write_value(self.length)?
			+ writer.write_value(self.raw_length)?
			+ writer.write_value(self.timestamp)?
		)
	}
}

/// One [IndexEntry] per slot of the region bounds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexTable(Vec<IndexEntry>);

impl IndexTable {
	/// A table of `len` empty entries.
	pub fn empty(len: usize) -> Self {
		Self(vec![IndexEntry::EMPTY; len])
	}

	pub fn read<R: Read>(reader: &mut R, len: usize) -> McResult<Self> {
		let mut entries = Vec::with_capacity(len.min(65536));
		for _ in 0..len {
			entries.push(reader.read_value::<IndexEntry>()?);
		}
		Ok(Self(entries))
	}

	/// The encoded size of the table.
	pub fn byte_len(&self) -> u64 {
		self.0.len() as u64 * ENTRY_LEN
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn get(&self, index: usize) -> Option<&IndexEntry> {
		self.0.get(index)
	}

	pub fn get_mut(&mut self, index: usize) -> Option<&mut IndexEntry> {
		self.0.get_mut(index)
	}

	pub fn iter(&self) -> std::slice::Iter<IndexEntry> {
		self.0.iter()
	}

	/// Slots that hold a chunk, in index order.
	pub fn present(&self) -> impl Iterator<Item = (usize, &IndexEntry)> {
		self.0.iter().enumerate().filter(|(_, entry)| entry.is_present())
	}
}

impl Writable for IndexTable {
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
		self.0.iter().try_fold(0, |size, entry| Ok(size + writer.write_value(entry)?))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn entry_layout() {
		let entry = IndexEntry {
			offset: 0x0102,
			length: 3,
			raw_length: 4,
			timestamp: Timestamp::new(5),
		};
		let bytes = to_bytes(&entry).unwrap();
		assert_eq!(bytes.len() as u64, ENTRY_LEN);
		assert_eq!(bytes, [0, 0, 0, 0, 0, 0, 1, 2, 0, 0, 0, 3, 0, 0, 0, 4, 0, 0, 0, 5]);
		assert_eq!(read_exact_value::<IndexEntry>(&bytes).unwrap(), entry);
	}

	#[test]
	fn table() {
		let mut table = IndexTable::empty(4);
		table.get_mut(2).unwrap().offset = 100;
		let bytes = to_bytes(&table).unwrap();
		assert_eq!(bytes.len() as u64, table.byte_len());
		let decoded = IndexTable::read(&mut bytes.as_slice(), 4).unwrap();
		assert_eq!(decoded, table);
		assert_eq!(decoded.present().map(|(index, _)| index).collect::<Vec<_>>(), [2]);
	}
}
