//! Per-column height information.
//!
//! A chunk carries up to 32 heightmaps selected by a bit mask. Each map
//! holds one height per column (16×16), measured in blocks above the
//! bottom of the chunk's lowest section.

use std::{
	collections::BTreeMap,
	io::{Read, Write},
};

use crate::{
	ioext::*,
	math::bit::bits_to_represent,
	world::packed,
	McResult, McError,
};

/// Columns per heightmap.
pub const HEIGHTMAP_SIZE: usize = 16 * 16;
/// Maximum number of heightmaps in one chunk.
pub const MAX_HEIGHTMAPS: u8 = 32;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HeightmapKind {
	MotionBlocking = 0,
	MotionBlockingNoLeaves = 1,
	OceanFloor = 2,
	OceanFloorWg = 3,
	WorldSurface = 4,
	WorldSurfaceWg = 5,
}

impl HeightmapKind {
	pub const ALL: [HeightmapKind; 6] = [
		HeightmapKind::MotionBlocking,
		HeightmapKind::MotionBlockingNoLeaves,
		HeightmapKind::OceanFloor,
		HeightmapKind::OceanFloorWg,
		HeightmapKind::WorldSurface,
		HeightmapKind::WorldSurfaceWg,
	];

	/// Bit position in the heightmap mask.
	pub const fn slot(self) -> u8 {
		self as u8
	}

	pub const fn name(self) -> &'static str {
		match self {
			HeightmapKind::MotionBlocking => "MOTION_BLOCKING",
			HeightmapKind::MotionBlockingNoLeaves => "MOTION_BLOCKING_NO_LEAVES",
			HeightmapKind::OceanFloor => "OCEAN_FLOOR",
			HeightmapKind::OceanFloorWg => "OCEAN_FLOOR_WG",
			HeightmapKind::WorldSurface => "WORLD_SURFACE",
			HeightmapKind::WorldSurfaceWg => "WORLD_SURFACE_WG",
		}
	}
}

/// The heightmaps of one chunk, keyed by mask slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Heightmaps {
	maps: BTreeMap<u8, Vec<u16>>,
}

impl Heightmaps {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, kind: HeightmapKind, heights: Vec<u16>) -> McResult<()> {
		self.insert_slot(kind.slot(), heights)
	}

	/// Inserts a heightmap in any of the 32 mask slots.
	pub fn insert_slot(&mut self, slot: u8, heights: Vec<u16>) -> McResult<()> {
		if slot >= MAX_HEIGHTMAPS {
			return McError::unrepresentable(format!("heightmap slot {slot}"));
		}
		if heights.len() != HEIGHTMAP_SIZE {
			return McError::unrepresentable(format!("heightmap with {} columns", heights.len()));
		}
		self.maps.insert(slot, heights);
		Ok(())
	}

	pub fn get(&self, kind: HeightmapKind) -> Option<&[u16]> {
		self.get_slot(kind.slot())
	}

	pub fn get_slot(&self, slot: u8) -> Option<&[u16]> {
		self.maps.get(&slot).map(Vec::as_slice)
	}

	pub fn remove(&mut self, kind: HeightmapKind) -> Option<Vec<u16>> {
		self.maps.remove(&kind.slot())
	}

	pub fn mask(&self) -> u32 {
		self.maps.keys().fold(0, |mask, &slot| mask | 1 << slot)
	}

	pub fn is_empty(&self) -> bool {
		self.maps.is_empty()
	}

	pub fn len(&self) -> usize {
		self.maps.len()
	}

	/// Bits per height for a chunk of `section_count` sections.
	pub fn bits(section_count: usize) -> u32 {
		bits_to_represent((section_count * 16) as u32)
	}

	/// Writes the mask and each present heightmap in slot order.
	pub fn write_to<W: Write>(&self, writer: &mut W, section_count: usize) -> McResult<usize> {
		let limit = section_count * 16;
		let bits = Self::bits(section_count);
		let mut size = writer.write_value(self.mask())?;
		for (slot, heights) in &self.maps {
			if let Some(height) = heights.iter().find(|&&height| height as usize > limit) {
				return McError::unrepresentable(format!(
					"height {height} in heightmap {slot} exceeds column height {limit}"
				));
			}
			let indices = heights.iter().map(|&height| height as u32).collect::<Vec<u32>>();
			let bytes = packed::pack(&indices, bits);
			writer.write_all(&bytes)?;
			size += bytes.len();
		}
		Ok(size)
	}

	pub fn read_from<R: Read>(reader: &mut R, section_count: usize) -> McResult<Self> {
		let mask = reader.read_value::<u32>()?;
		let bits = Self::bits(section_count);
		let limit = section_count * 16;
		let mut maps = BTreeMap::new();
		for slot in (0..MAX_HEIGHTMAPS).filter(|slot| mask & (1 << slot) != 0) {
			let bytes = reader.read_bytes(packed::packed_len(HEIGHTMAP_SIZE, bits))?;
			let heights = packed::unpack(&bytes, HEIGHTMAP_SIZE, bits)?;
			if heights.iter().any(|&height| height as usize > limit) {
				return McError::corrupt(format!("heightmap {slot} exceeds column height {limit}"));
			}
			maps.insert(slot, heights.into_iter().map(|height| height as u16).collect());
		}
		Ok(Self { maps })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ramp(max: u16) -> Vec<u16> {
		(0..HEIGHTMAP_SIZE).map(|i| i as u16 % (max + 1)).collect()
	}

	#[test]
	fn mask_and_roundtrip() {
		let mut maps = Heightmaps::new();
		maps.insert(HeightmapKind::WorldSurface, ramp(384)).unwrap();
		maps.insert(HeightmapKind::MotionBlocking, ramp(100)).unwrap();
		maps.insert_slot(31, vec![0; HEIGHTMAP_SIZE]).unwrap();
		assert_eq!(maps.mask(), 0b1 | 0b1_0000 | 1 << 31);
		let mut bytes = Vec::new();
		let size = maps.write_to(&mut bytes, 24).unwrap();
		// 24 sections need 9 bits per column.
		assert_eq!(size, 4 + 3 * 288);
		assert_eq!(bytes.len(), size);
		let decoded = Heightmaps::read_from(&mut bytes.as_slice(), 24).unwrap();
		assert_eq!(decoded, maps);
		assert_eq!(decoded.get(HeightmapKind::WorldSurface).unwrap()[255], 255);
		assert_eq!(decoded.get(HeightmapKind::MotionBlocking).unwrap()[255], 255 % 101);
	}

	#[test]
	fn rejects_tall_columns() {
		let mut maps = Heightmaps::new();
		maps.insert(HeightmapKind::OceanFloor, ramp(17)).unwrap();
		assert!(matches!(maps.write_to(&mut Vec::new(), 1), Err(McError::Unrepresentable(_))));
		assert!(maps.insert(HeightmapKind::OceanFloor, vec![0; 10]).is_err());
		assert!(maps.insert_slot(32, vec![0; HEIGHTMAP_SIZE]).is_err());
	}
}
