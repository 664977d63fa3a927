use std::{
	fs::File,
	io::{
		BufReader,
		Read,
		Seek, SeekFrom,
	},
	path::Path,
};

use log::{debug, warn};

use crate::{
	ioext::*,
	world::{
		chunk::ChunkColumn,
		io::{
			convert::{convert_column, needs_conversion, DataConverter},
			migrate::migrate,
		},
		region::Region,
	},
	McResult, McError,
};

use super::{
	coord::*,
	header::*,
	index::*,
	timestamp::*,
};

/// An abstraction for reading regions.
/// The header and index are read up front, after which any chunk can be
/// read on its own. When you're done reading, you can call `.finish()`
/// to take the reader back.
pub struct RegionReader<R: Read + Seek> {
	/// The reader that this [RegionReader] is bound to.
	reader: R,
	header: RegionHeader,
	index: IndexTable,
	/// Total length of the stream.
	len: u64,
	converter: Option<Box<dyn DataConverter>>,
}

impl RegionReader<BufReader<File>> {
	/// Opens a buffered region file.
	pub fn open<P: AsRef<Path>>(path: P) -> McResult<Self> {
		let file = File::open(path)?;
		RegionReader::new(BufReader::new(file))
	}
}

impl<R: Read + Seek> RegionReader<R> {
	/// Reads the header and index from the start of `reader`.
	pub fn new(mut reader: R) -> McResult<Self> {
		let len = reader.seek(SeekFrom::End(0))?;
		reader.seek(SeekFrom::Start(0))?;
		let header = reader.read_value::<RegionHeader>()?;
		let index_len = header.bounds.len() as u64 * ENTRY_LEN;
		if header.index_offset < header.len() || header.index_offset.saturating_add(index_len) > len {
			return McError::corrupt(format!(
				"index at {} with {index_len} bytes does not fit a region of {len} bytes",
				header.index_offset
			));
		}
		reader.seek(SeekFrom::Start(header.index_offset))?;
		let index = IndexTable::read(&mut reader, header.bounds.len())?;
		debug!(
			"Opened region {:?}, version {}, {} chunks",
			header.bounds,
			header.version,
			index.present().count()
		);
		Ok(Self {
			reader,
			header,
			index,
			len,
			converter: None,
		})
	}

	/// Runs `converter` over every chunk read from a region with an older data version.
	pub fn with_converter<C: DataConverter + 'static>(mut self, converter: C) -> Self {
		self.converter = Some(Box::new(converter));
		self
	}

	/// The data version of chunks as they are returned, after conversion.
	pub fn data_version(&self) -> i32 {
		match &self.converter {
			Some(converter) if needs_conversion(converter.as_ref(), self.header.data_version) => converter.data_version(),
			_ => self.header.data_version,
		}
	}

	pub fn header(&self) -> &RegionHeader {
		&self.header
	}

	pub fn bounds(&self) -> RegionBounds {
		self.header.bounds
	}

	pub fn index(&self) -> &IndexTable {
		&self.index
	}

	/// The index entry of `coord`.
	pub fn entry(&self, coord: ChunkCoord) -> McResult<&IndexEntry> {
		let slot = self.header.bounds.try_index(coord)?;
		self.index.get(slot).ok_or(McError::IndexOutOfRange {
			index: slot,
			len: self.index.len(),
		})
	}

	/// When the chunk at `coord` was written, `None` when it is absent.
	pub fn timestamp(&self, coord: ChunkCoord) -> McResult<Option<Timestamp>> {
		let entry = self.entry(coord)?;
		Ok(entry.is_present().then_some(entry.timestamp))
	}

	/// Coordinates of every present chunk, in index order.
	pub fn coords(&self) -> Vec<ChunkCoord> {
		self.index.present()
			.filter_map(|(slot, _)| self.header.bounds.coord(slot))
			.collect()
	}

	/// Reads the compressed record of `coord` without decoding it.
	pub fn read_compressed(&mut self, coord: ChunkCoord) -> McResult<Option<Vec<u8>>> {
		let entry = *self.entry(coord)?;
		if !entry.is_present() {
			return Ok(None);
		}
		let index_start = self.header.index_offset;
		let index_end = index_start + self.index.byte_len();
		if entry.offset < self.header.len() || entry.end() > self.len {
			return McError::corrupt(format!(
				"record of chunk {coord} at {}..{} lies outside the data area {}..{}",
				entry.offset,
				entry.end(),
				self.header.len(),
				self.len
			));
		}
		// Records may sit on either side of the index but never inside it.
		if entry.offset < index_end && entry.end() > index_start {
			return McError::corrupt(format!(
				"record of chunk {coord} at {}..{} overlaps the index at {index_start}..{index_end}",
				entry.offset,
				entry.end()
			));
		}
		self.reader.seek(SeekFrom::Start(entry.offset))?;
		self.reader.read_bytes(entry.length as usize).map(Some)
	}

	/// Reads the decompressed record of `coord`, migrated to the current version.
	pub fn read_raw_chunk(&mut self, coord: ChunkCoord) -> McResult<Option<Vec<u8>>> {
		let entry = *self.entry(coord)?;
		let Some(compressed) = self.read_compressed(coord)? else {
			return Ok(None);
		};
		let raw = self.header.compression.decompress(&compressed, entry.raw_length as usize)?;
		Ok(Some(migrate(&raw, self.header.version)?.into_owned()))
	}

	/// Reads and decodes the chunk at `coord`.
	/// Absent chunks are `Ok(None)`. A damaged record only fails this chunk.
	pub fn read_chunk(&mut self, coord: ChunkCoord) -> McResult<Option<ChunkColumn>> {
		let Some(raw) = self.read_raw_chunk(coord)? else {
			return Ok(None);
		};
		let mut column = read_exact_value::<ChunkColumn>(&raw)?;
		let range = (self.header.min_section, self.header.max_section);
		if (column.min_section(), column.max_section()) != range {
			return McError::corrupt(format!(
				"chunk {coord} covers sections {}..={}, region covers {}..={}",
				column.min_section(), column.max_section(), range.0, range.1
			));
		}
		if let Some(converter) = &self.converter {
			convert_column(&mut column, converter.as_ref(), self.header.data_version);
		}
		Ok(Some(column))
	}

	/// Every present chunk with its own result, so that a damaged record
	/// does not hide the others.
	pub fn chunks(&mut self) -> impl Iterator<Item = (ChunkCoord, McResult<ChunkColumn>)> + '_ {
		let coords = self.coords();
		coords.into_iter().filter_map(move |coord| {
			match self.read_chunk(coord) {
				Ok(Some(column)) => Some((coord, Ok(column))),
				Ok(None) => None,
				Err(err) => {
					warn!("Failed to read chunk {coord}: {err}");
					Some((coord, Err(err)))
				}
			}
		})
	}

	/// Reads every chunk into an in-memory [Region].
	/// Fails on the first damaged record. Use [RegionReader::chunks] to skip them instead.
	pub fn read_region(mut self) -> McResult<Region> {
		let mut region = Region::new(
			self.header.bounds,
			self.header.min_section,
			self.header.max_section,
		)?;
		region.version = self.header.version;
		region.compression = self.header.compression;
		region.data_version = self.data_version();
		region.user_data = self.header.user_data.clone();
		for coord in self.coords() {
			if let Some(column) = self.read_chunk(coord)? {
				region.insert(coord, column)?;
			}
		}
		Ok(region)
	}

	/// Take the reader back.
	pub fn finish(self) -> R {
		self.reader
	}
}
