//! An in-memory region: every column of a rectangle of chunks.

use std::{
	collections::BTreeMap,
	io::Cursor,
	path::Path,
};

use crate::{
	world::{
		chunk::ChunkColumn,
		io::{
			compression::CompressionScheme,
			migrate::FormatVersion,
			region::{
				coord::*,
				reader::RegionReader,
				writer::*,
			},
		},
	},
	McResult, McError,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
	/// The format version this region was read from. Regions are always written at [FormatVersion::CURRENT].
	pub version: u16,
	/// The scheme used by [Region::to_bytes] and [Region::save].
	pub compression: CompressionScheme,
	/// Game data version of the content. After a converting read this is the converter's version.
	pub data_version: i32,
	/// Opaque world-level bytes owned by the host.
	pub user_data: Vec<u8>,
	bounds: RegionBounds,
	min_section: i8,
	max_section: i8,
	chunks: BTreeMap<ChunkCoord, ChunkColumn>,
}

impl Region {
	/// An empty region. Every column added later must cover `min_section..=max_section`.
	pub fn new(bounds: RegionBounds, min_section: i8, max_section: i8) -> McResult<Self> {
		if max_section < min_section {
			return McError::unrepresentable(format!("section range {min_section}..={max_section} is empty"));
		}
		if !bounds.is_addressable() {
			return McError::unrepresentable(format!("bounds {bounds:?} extend past the coordinate range"));
		}
		Ok(Self {
			version: FormatVersion::CURRENT,
			compression: CompressionScheme::default(),
			data_version: 0,
			user_data: Vec::new(),
			bounds,
			min_section,
			max_section,
			chunks: BTreeMap::new(),
		})
	}

	pub fn bounds(&self) -> RegionBounds {
		self.bounds
	}

	pub fn min_section(&self) -> i8 {
		self.min_section
	}

	pub fn max_section(&self) -> i8 {
		self.max_section
	}

	fn check_column(&self, coord: ChunkCoord, column: &ChunkColumn) -> McResult<()> {
		if !self.bounds.contains(coord) {
			return Err(McError::CoordOutOfBounds(coord));
		}
		if (column.min_section(), column.max_section()) != (self.min_section, self.max_section) {
			return McError::unrepresentable(format!(
				"chunk {coord} covers sections {}..={}, region covers {}..={}",
				column.min_section(), column.max_section(), self.min_section, self.max_section
			));
		}
		Ok(())
	}

	/// Adds a column. Fails with [McError::DuplicateChunk] if `coord` is taken.
	pub fn insert(&mut self, coord: ChunkCoord, column: ChunkColumn) -> McResult<()> {
		self.check_column(coord, &column)?;
		if self.chunks.contains_key(&coord) {
			return Err(McError::DuplicateChunk(coord));
		}
		self.chunks.insert(coord, column);
		Ok(())
	}

	/// Adds or replaces a column, returning the previous one.
	pub fn replace(&mut self, coord: ChunkCoord, column: ChunkColumn) -> McResult<Option<ChunkColumn>> {
		self.check_column(coord, &column)?;
		Ok(self.chunks.insert(coord, column))
	}

	pub fn remove(&mut self, coord: ChunkCoord) -> Option<ChunkColumn> {
		self.chunks.remove(&coord)
	}

	pub fn get(&self, coord: ChunkCoord) -> Option<&ChunkColumn> {
		self.chunks.get(&coord)
	}

	pub fn get_mut(&mut self, coord: ChunkCoord) -> Option<&mut ChunkColumn> {
		self.chunks.get_mut(&coord)
	}

	pub fn contains(&self, coord: ChunkCoord) -> bool {
		self.chunks.contains_key(&coord)
	}

	/// Present columns ordered by coordinate.
	pub fn chunks(&self) -> impl Iterator<Item = (ChunkCoord, &ChunkColumn)> {
		self.chunks.iter().map(|(&coord, column)| (coord, column))
	}

	pub fn len(&self) -> usize {
		self.chunks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.chunks.is_empty()
	}

	/// Encodes the region with [Region::compression] and default options otherwise.
	pub fn to_bytes(&self) -> McResult<Vec<u8>> {
		self.to_bytes_with(WriteOptions::default().compression(self.compression))
	}

	pub fn to_bytes_with(&self, options: WriteOptions) -> McResult<Vec<u8>> {
		let mut writer = RegionWriter::new(Vec::new(), options);
		writer.write_region(self)?;
		Ok(writer.finish())
	}

	/// Decodes a whole region, failing on the first damaged chunk.
	pub fn from_bytes(bytes: &[u8]) -> McResult<Self> {
		RegionReader::new(Cursor::new(bytes))?.read_region()
	}

	pub fn save<P: AsRef<Path>>(&self, path: P) -> McResult<u64> {
		let mut writer = RegionWriter::create(path, WriteOptions::default().compression(self.compression))?;
		writer.write_region(self)
	}

	pub fn load<P: AsRef<Path>>(path: P) -> McResult<Self> {
		RegionReader::open(path)?.read_region()
	}
}

impl RegionSnapshot for Region {
	fn bounds(&self) -> RegionBounds {
		self.bounds
	}

	fn section_range(&self) -> (i8, i8) {
		(self.min_section, self.max_section)
	}

	fn user_data(&self) -> &[u8] {
		&self.user_data
	}

	fn data_version(&self) -> i32 {
		self.data_version
	}

	fn columns(&self) -> Vec<(ChunkCoord, &ChunkColumn)> {
		self.chunks().collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn insert_rules() {
		let mut region = Region::new(RegionBounds::new(0, 0, 2, 2), -4, 3).unwrap();
		let coord = ChunkCoord::new(1, 1);
		region.insert(coord, ChunkColumn::new(-4, 3).unwrap()).unwrap();
		assert!(matches!(
			region.insert(coord, ChunkColumn::new(-4, 3).unwrap()),
			Err(McError::DuplicateChunk(c)) if c == coord
		));
		assert!(matches!(
			region.insert(ChunkCoord::new(2, 0), ChunkColumn::new(-4, 3).unwrap()),
			Err(McError::CoordOutOfBounds(_))
		));
		assert!(matches!(
			region.insert(ChunkCoord::new(0, 0), ChunkColumn::new(0, 3).unwrap()),
			Err(McError::Unrepresentable(_))
		));
		assert!(region.replace(coord, ChunkColumn::new(-4, 3).unwrap()).unwrap().is_some());
		assert_eq!(region.len(), 1);
		assert!(region.remove(coord).is_some());
		assert!(region.is_empty());
		assert!(matches!(
			Region::new(RegionBounds::new(i32::MAX, 0, 2, 1), 0, 0),
			Err(McError::Unrepresentable(_))
		));
	}

	#[test]
	fn empty_region_roundtrip() {
		let mut region = Region::new(RegionBounds::new(-1, -1, 3, 3), 0, 0).unwrap();
		region.compression = CompressionScheme::ZLib;
		region.user_data = b"world".to_vec();
		region.data_version = 3955;
		let decoded = Region::from_bytes(&region.to_bytes().unwrap()).unwrap();
		assert_eq!(decoded, region);
	}
}
