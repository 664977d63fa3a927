use std::{
	collections::BTreeMap,
	fs::File,
	io::{BufWriter, Write},
	path::Path,
};

use log::{debug, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{
	ioext::*,
	world::{
		chunk::ChunkColumn,
		region::Region,
		io::{
			compression::CompressionScheme,
			migrate::FormatVersion,
		},
	},
	McResult, McError,
};

use super::{
	coord::*,
	header::*,
	index::*,
	timestamp::*,
};

/// Settings for writing a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
	pub compression: CompressionScheme,
	/// Compression level, the scheme's default when `None`.
	pub level: Option<i32>,
	/// Encode and compress chunk records on the rayon thread pool.
	/// Has no effect without the `parallel` feature.
	pub parallel: bool,
	/// Timestamp written for every chunk, the current time when `None`.
	pub timestamp: Option<Timestamp>,
}

impl Default for WriteOptions {
	fn default() -> Self {
		Self {
			compression: CompressionScheme::default(),
			level: None,
			parallel: true,
			timestamp: None,
		}
	}
}

impl WriteOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn compression(mut self, compression: CompressionScheme) -> Self {
		self.compression = compression;
		self
	}

	pub fn level(mut self, level: i32) -> Self {
		self.level = Some(level);
		self
	}

	pub fn parallel(mut self, parallel: bool) -> Self {
		self.parallel = parallel;
		self
	}

	pub fn timestamp<T: Into<Timestamp>>(mut self, timestamp: T) -> Self {
		self.timestamp = Some(timestamp.into());
		self
	}

	fn effective_level(&self) -> i32 {
		self.level.unwrap_or_else(|| self.compression.default_level())
	}
}

/// A read-only view of a region that can be written.
/// Hosts implement this over their own world state; [crate::world::region::Region]
/// implements it for in-memory regions.
pub trait RegionSnapshot: Sync {
	fn bounds(&self) -> RegionBounds;
	/// Inclusive section range shared by every column.
	fn section_range(&self) -> (i8, i8);
	fn user_data(&self) -> &[u8];
	/// The game data version of the content. Hosts that do not track one keep 0.
	fn data_version(&self) -> i32 {
		0
	}
	/// Every present column. Absent coordinates are not generated.
	fn columns(&self) -> Vec<(ChunkCoord, &ChunkColumn)>;
}

/// A compressed record waiting for its place in the region.
struct EncodedChunk {
	slot: usize,
	coord: ChunkCoord,
	raw_length: u32,
	data: Vec<u8>,
}

fn encode_chunk(slot: usize, coord: ChunkCoord, column: &ChunkColumn, options: &WriteOptions) -> McResult<EncodedChunk> {
	let raw = column.encode()?;
	let Ok(raw_length) = u32::try_from(raw.len()) else {
		return McError::unrepresentable(format!("chunk {coord} encodes to {} bytes", raw.len()));
	};
	let data = options.compression.compress(&raw, options.effective_level())?;
	trace!("Encoded chunk {coord}: {raw_length} bytes, {} compressed", data.len());
	Ok(EncodedChunk {
		slot,
		coord,
		raw_length,
		data,
	})
}

/// Writes whole regions in one pass: header, index, then the chunk records.
/// When you're done writing, you can call `.finish()` to take the writer back.
pub struct RegionWriter<W: Write> {
	/// The writer that this [RegionWriter] is bound to.
	writer: W,
	options: WriteOptions,
}

impl RegionWriter<BufWriter<File>> {
	/// Creates (or truncates) the file at `path`.
	pub fn create<P: AsRef<Path>>(path: P, options: WriteOptions) -> McResult<Self> {
		let file = File::create(path)?;
		Ok(Self::new(BufWriter::new(file), options))
	}
}

impl<W: Write> RegionWriter<W> {
	pub fn new(writer: W, options: WriteOptions) -> Self {
		Self {
			writer,
			options,
		}
	}

	pub fn options(&self) -> &WriteOptions {
		&self.options
	}

	/// Encodes every column of `snapshot` and writes the region.
	/// Returns the number of bytes written.
	pub fn write_snapshot<S: RegionSnapshot + ?Sized>(&mut self, snapshot: &S) -> McResult<u64> {
		if !self.options.compression.is_available() {
			return Err(McError::UnsupportedAlgorithm(self.options.compression.id()));
		}
		let bounds = snapshot.bounds();
		if !bounds.is_addressable() {
			return McError::unrepresentable(format!("bounds {bounds:?} extend past the coordinate range"));
		}
		let (min_section, max_section) = snapshot.section_range();
		if max_section < min_section {
			return McError::unrepresentable(format!("section range {min_section}..={max_section} is empty"));
		}
		// Validate placement before spending time on compression.
		let mut slots = BTreeMap::new();
		for (coord, column) in snapshot.columns() {
			let slot = bounds.try_index(coord)?;
			if (column.min_section(), column.max_section()) != (min_section, max_section) {
				return McError::unrepresentable(format!(
					"chunk {coord} covers sections {}..={}, region covers {min_section}..={max_section}",
					column.min_section(), column.max_section()
				));
			}
			if slots.insert(slot, (coord, column)).is_some() {
				return Err(McError::DuplicateChunk(coord));
			}
		}
		debug!("Writing region {bounds:?} with {} chunks using {:?}", slots.len(), self.options.compression);
		let jobs = slots.into_iter()
			.map(|(slot, (coord, column))| (slot, coord, column))
			.collect::<Vec<_>>();
		let chunks = self.encode_all(&jobs)?;

		let timestamp = self.options.timestamp.unwrap_or_else(Timestamp::utc_now);
		let mut header = RegionHeader {
			version: FormatVersion::CURRENT,
			compression: self.options.compression,
			min_section,
			max_section,
			data_version: snapshot.data_version(),
			bounds,
			index_offset: 0,
			user_data: snapshot.user_data().to_vec(),
		};
		header.index_offset = header.len();
		let mut index = IndexTable::empty(bounds.len());
		let mut offset = header.index_offset + index.byte_len();
		for chunk in &chunks {
			let Ok(length) = u32::try_from(chunk.data.len()) else {
				return McError::unrepresentable(format!("chunk {} compresses to {} bytes", chunk.coord, chunk.data.len()));
			};
			if let Some(entry) = index.get_mut(chunk.slot) {
				*entry = IndexEntry {
					offset,
					length,
					raw_length: chunk.raw_length,
					timestamp,
				};
			}
			offset += length as u64;
		}

		let mut size = self.writer.write_value(&header)? as u64;
		size += self.writer.write_value(&index)? as u64;
		for chunk in &chunks {
			self.writer.write_all(&chunk.data)?;
			size += chunk.data.len() as u64;
		}
		self.writer.flush()?;
		debug!("Wrote {size} bytes");
		Ok(size)
	}

	/// Writes an in-memory [Region].
	pub fn write_region(&mut self, region: &Region) -> McResult<u64> {
		self.write_snapshot(region)
	}

	#[cfg(feature = "parallel")]
	fn encode_all(&self, jobs: &[(usize, ChunkCoord, &ChunkColumn)]) -> McResult<Vec<EncodedChunk>> {
		let options = &self.options;
		if options.parallel {
			jobs.par_iter()
				.map(|&(slot, coord, column)| encode_chunk(slot, coord, column, options))
				.collect()
		} else {
			jobs.iter()
				.map(|&(slot, coord, column)| encode_chunk(slot, coord, column, options))
				.collect()
		}
	}

	#[cfg(not(feature = "parallel"))]
	fn encode_all(&self, jobs: &[(usize, ChunkCoord, &ChunkColumn)]) -> McResult<Vec<EncodedChunk>> {
		jobs.iter()
			.map(|&(slot, coord, column)| encode_chunk(slot, coord, column, &self.options))
			.collect()
	}

	/// Take the writer back.
	pub fn finish(self) -> W {
		self.writer
	}
}
