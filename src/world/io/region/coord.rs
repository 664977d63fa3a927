use std::io::{Read, Write};

use crate::{
	for_each_int_type,
	ioext::*,
	McResult, McError,
};

/// The position of a chunk column, in chunks.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct ChunkCoord {
	pub x: i32,
	pub z: i32,
}

impl ChunkCoord {
	pub const fn new(x: i32, z: i32) -> Self {
		Self { x, z }
	}

	pub fn tuple<T>(self) -> (T, T)
	where
	(T, T): From<Self> {
		self.into()
	}
}

macro_rules! __chunkcoord_impl {
	($type:ty) => {
		impl From<($type, $type)> for ChunkCoord {
			fn from(value: ($type, $type)) -> Self {
				Self::new(value.0 as i32, value.1 as i32)
			}
		}

		impl From<ChunkCoord> for ($type, $type) {
			fn from(value: ChunkCoord) -> Self {
				(value.x as $type, value.z as $type)
			}
		}
	};
}

for_each_int_type!(__chunkcoord_impl;signed);

impl std::fmt::Display for ChunkCoord {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "({}, {})", self.x, self.z)
	}
}

/// The rectangle of chunk coordinates a region covers.
/// Index slots are laid out row by row along `x`, one row per `z`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct RegionBounds {
	pub min_x: i32,
	pub min_z: i32,
	pub width: u16,
	pub depth: u16,
}

impl RegionBounds {
	pub const fn new(min_x: i32, min_z: i32, width: u16, depth: u16) -> Self {
		Self {
			min_x,
			min_z,
			width,
			depth,
		}
	}

	/// The smallest bounds containing every coordinate, `None` when there are none.
	pub fn enclosing<I: IntoIterator<Item = ChunkCoord>>(coords: I) -> McResult<Option<Self>> {
		let mut coords = coords.into_iter();
		let Some(first) = coords.next() else {
			return Ok(None);
		};
		let (min, max) = coords.fold((first, first), |(min, max), coord| {
			(
				ChunkCoord::new(min.x.min(coord.x), min.z.min(coord.z)),
				ChunkCoord::new(max.x.max(coord.x), max.z.max(coord.z)),
			)
		});
		let width = max.x as i64 - min.x as i64 + 1;
		let depth = max.z as i64 - min.z as i64 + 1;
		if width > u16::MAX as i64 || depth > u16::MAX as i64 {
			return McError::unrepresentable(format!("region spanning {width}x{depth} chunks"));
		}
		Ok(Some(Self::new(min.x, min.z, width as u16, depth as u16)))
	}

	/// Number of index slots.
	pub const fn len(&self) -> usize {
		self.width as usize * self.depth as usize
	}

	pub const fn is_empty(&self) -> bool {
		self.width == 0 || self.depth == 0
	}

	pub fn contains(&self, coord: ChunkCoord) -> bool {
		self.index(coord).is_some()
	}

	/// The index slot of `coord`, `None` when it lies outside.
	pub fn index(&self, coord: ChunkCoord) -> Option<usize> {
		let dx = coord.x as i64 - self.min_x as i64;
		let dz = coord.z as i64 - self.min_z as i64;
		if dx < 0 || dz < 0 || dx >= self.width as i64 || dz >= self.depth as i64 {
			return None;
		}
		Some(dz as usize * self.width as usize + dx as usize)
	}

	/// Like [RegionBounds::index], failing with [McError::CoordOutOfBounds].
	pub fn try_index(&self, coord: ChunkCoord) -> McResult<usize> {
		self.index(coord).ok_or(McError::CoordOutOfBounds(coord))
	}

	/// The coordinate stored in index slot `index`.
	pub fn coord(&self, index: usize) -> Option<ChunkCoord> {
		if index >= self.len() {
			return None;
		}
		let width = self.width as usize;
		Some(ChunkCoord::new(
			(self.min_x as i64 + (index % width) as i64) as i32,
			(self.min_z as i64 + (index / width) as i64) as i32,
		))
	}

	pub fn iter(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
		(0..self.len()).filter_map(|index| self.coord(index))
	}

	/// True when every slot maps to a coordinate within `i32`.
	pub fn is_addressable(&self) -> bool {
		self.min_x as i64 + self.width as i64 - 1 <= i32::MAX as i64
			&& self.min_z as i64 + self.depth as i64 - 1 <= i32::MAX as i64
	}
}

impl Readable for RegionBounds {
	fn read_from<R: Read>(reader: &mut R) -> McResult<Self> {
		let bounds = Self {
			min_x: reader.read_value()?,
			min_z: reader.read_value()?,
			width: reader.read_value()?,
			depth: reader.read_value()?,
		};
		if !bounds.is_addressable() {
			return McError::corrupt(format!("bounds {bounds:?} extend past the coordinate range"));
		}
		Ok(bounds)
	}
}

impl Writable for RegionBounds {
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
		if !self.is_addressable() {
			return McError::unrepresentable(format!("bounds {self:?} extend past the coordinate range"));
		}
		Ok(
			writer.write_value(self.min_x)?
			+ writer.write_value(self.min_z)?
			+ writer.write_value(self.width)?
			+ writer.write_value(self.depth)?
		)
	}
}
