//! A 16×16×16 cube of blocks with its biomes, light and block entities.

use std::io::{Read, Write};

use crate::{
	ioext::*,
	math::bit::{GetBit, SetBit},
	world::{
		biome::Biome,
		blockentity::BlockEntity,
		blockstate::BlockState,
		io::migrate::{migrate_section, FormatVersion},
		light::LightContent,
		packed,
		palette::{Palette, PalettedGrid},
	},
	McResult, McError,
};

/// Blocks in a section.
pub const SECTION_BLOCKS: usize = 16 * 16 * 16;
/// Biome cells in a section, one per 4×4×4 blocks.
pub const SECTION_BIOMES: usize = 4 * 4 * 4;
pub const MAX_BLOCK_PALETTE: usize = SECTION_BLOCKS;
pub const MAX_BIOME_PALETTE: usize = SECTION_BIOMES;

/// The leading byte of an encoded section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectionFlags(u8);

impl SectionFlags {
	pub const UNIFORM_BLOCKS: usize = 0;
	pub const UNIFORM_BIOMES: usize = 1;
	pub const HAS_BLOCK_ENTITIES: usize = 2;
	pub const DEFAULT_LIGHT: usize = 3;

	/// Reserved bits are dropped.
	pub fn from_byte(byte: u8) -> Self {
		Self(byte & 0x0F)
	}

	pub fn bits(self) -> u8 {
		self.0
	}

	pub fn get(self, flag: usize) -> bool {
		self.0.get_bit(flag)
	}

	pub fn with(self, flag: usize, on: bool) -> Self {
		Self(self.0.set_bit(flag, on))
	}
}

/// Cell index of a block within a section.
pub const fn block_index(x: usize, y: usize, z: usize) -> usize {
	(y & 0xF) * 256 + (z & 0xF) * 16 + (x & 0xF)
}

/// Cell index of a biome within a section, in biome cell coordinates (`0..4`).
pub const fn biome_index(x: usize, y: usize, z: usize) -> usize {
	(y & 0x3) * 16 + (z & 0x3) * 4 + (x & 0x3)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
	pub blocks: PalettedGrid<BlockState>,
	pub biomes: PalettedGrid<Biome>,
	pub block_light: LightContent,
	pub sky_light: LightContent,
	pub block_entities: Vec<BlockEntity>,
}

impl Default for Section {
	fn default() -> Self {
		Self::filled(BlockState::air(), Biome::plains())
	}
}

impl Section {
	/// A section of a single block and biome, without light.
	pub fn filled(block: BlockState, biome: Biome) -> Self {
		Self {
			blocks: PalettedGrid::uniform(block, SECTION_BLOCKS),
			biomes: PalettedGrid::uniform(biome, SECTION_BIOMES),
			block_light: LightContent::Missing,
			sky_light: LightContent::Missing,
			block_entities: Vec::new(),
		}
	}

	/// Builds a section from per-cell values in `y, z, x` order.
	pub fn from_cells(blocks: Vec<BlockState>, biomes: Vec<Biome>) -> McResult<Self> {
		if blocks.len() != SECTION_BLOCKS || biomes.len() != SECTION_BIOMES {
			return McError::unrepresentable(format!(
				"section needs {SECTION_BLOCKS} blocks and {SECTION_BIOMES} biomes, found {} and {}",
				blocks.len(), biomes.len()
			));
		}
		Ok(Self {
			blocks: PalettedGrid::from_cells(blocks),
			biomes: PalettedGrid::from_cells(biomes),
			..Self::default()
		})
	}

	pub fn block(&self, x: usize, y: usize, z: usize) -> Option<&BlockState> {
		self.blocks.get(block_index(x, y, z))
	}

	pub fn set_block(&mut self, x: usize, y: usize, z: usize, state: BlockState) -> McResult<()> {
		self.blocks.set(block_index(x, y, z), state)
	}

	/// The biome at a block position.
	pub fn biome(&self, x: usize, y: usize, z: usize) -> Option<&Biome> {
		self.biomes.get(biome_index(x / 4, y / 4, z / 4))
	}

	pub fn set_biome(&mut self, x: usize, y: usize, z: usize, biome: Biome) -> McResult<()> {
		self.biomes.set(biome_index(x / 4, y / 4, z / 4), biome)
	}

	/// True when every block is air.
	pub fn is_air(&self) -> bool {
		self.blocks.is_uniform() && self.blocks.get(0).map_or(false, |state| state.name() == "minecraft:air")
	}

	pub fn flags(&self) -> SectionFlags {
		SectionFlags::default()
			.with(SectionFlags::UNIFORM_BLOCKS, self.blocks.is_uniform())
			.with(SectionFlags::UNIFORM_BIOMES, self.biomes.is_uniform())
			.with(SectionFlags::HAS_BLOCK_ENTITIES, !self.block_entities.is_empty())
			.with(SectionFlags::DEFAULT_LIGHT, self.block_light.is_missing() && self.sky_light.is_missing())
	}

	pub fn encode(&self) -> McResult<Vec<u8>> {
		to_bytes(self)
	}

	/// Decodes a section written at `version`, migrating it first when older.
	pub fn decode(bytes: &[u8], version: u16) -> McResult<Self> {
		if version == FormatVersion::CURRENT {
			return read_exact_value(bytes);
		}
		let migrated = migrate_section(bytes, version)?;
		read_exact_value(&migrated)
	}
}

fn write_palette<W: Write, T: Writable + std::hash::Hash + Eq>(
	writer: &mut W,
	palette: &Palette<T>,
	limit: usize,
	what: &str,
) -> McResult<usize> {
	if palette.is_empty() || palette.len() > limit {
		return McError::unrepresentable(format!("{what} palette of {} entries", palette.len()));
	}
	let mut size = writer.write_value(palette.len() as u16)?;
	for entry in palette.iter() {
		size += writer.write_value(entry)?;
	}
	Ok(size)
}

fn write_grid<W: Write, T: std::hash::Hash + Eq + Clone>(
	writer: &mut W,
	grid: &PalettedGrid<T>,
	cells: usize,
) -> McResult<usize> {
	if grid.len() != cells {
		return McError::unrepresentable(format!("grid of {} cells, expected {cells}", grid.len()));
	}
	if grid.is_uniform() {
		return Ok(0);
	}
	let bytes = packed::pack(grid.indices(), grid.palette().bits_per_index());
	writer.write_all(&bytes)?;
	Ok(bytes.len())
}

fn read_grid<R: Read, T: Readable + std::hash::Hash + Eq + Clone>(
	reader: &mut R,
	cells: usize,
	limit: usize,
	uniform: bool,
) -> McResult<PalettedGrid<T>> {
	let entries = read_counted::<u16, T, _>(reader, limit)?;
	let palette = Palette::from_entries(entries)?;
	if palette.is_empty() {
		return McError::corrupt("empty palette");
	}
	let indices = if uniform {
		if !palette.is_uniform() {
			return McError::corrupt("uniform grid with more than one palette entry");
		}
		vec![0; cells]
	} else {
		let bits = palette.bits_per_index();
		let bytes = reader.read_bytes(packed::packed_len(cells, bits))?;
		packed::unpack(&bytes, cells, bits)?
	};
	PalettedGrid::from_parts(palette, indices)
}

impl Writable for Section {
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
		let flags = self.flags();
		let mut size = writer.write_value(flags.bits())?;
		size += write_palette(writer, self.blocks.palette(), MAX_BLOCK_PALETTE, "block")?;
		size += write_grid(writer, &self.blocks, SECTION_BLOCKS)?;
		size += write_palette(writer, self.biomes.palette(), MAX_BIOME_PALETTE, "biome")?;
		size += write_grid(writer, &self.biomes, SECTION_BIOMES)?;
		if !flags.get(SectionFlags::DEFAULT_LIGHT) {
			size += writer.write_value(&self.block_light)?;
			size += writer.write_value(&self.sky_light)?;
		}
		if flags.get(SectionFlags::HAS_BLOCK_ENTITIES) {
			let Ok(count) = u16::try_from(self.block_entities.len()) else {
				return McError::unrepresentable(format!("{} block entities in one section", self.block_entities.len()));
			};
			size += writer.write_value(count)?;
			for entity in &self.block_entities {
				size += writer.write_value(entity)?;
			}
		}
		Ok(size)
	}
}

impl Readable for Section {
	fn read_from<R: Read>(reader: &mut R) -> McResult<Self> {
		let flags = SectionFlags::from_byte(reader.read_value()?);
		let blocks = read_grid(reader, SECTION_BLOCKS, MAX_BLOCK_PALETTE, flags.get(SectionFlags::UNIFORM_BLOCKS))?;
		let biomes = read_grid(reader, SECTION_BIOMES, MAX_BIOME_PALETTE, flags.get(SectionFlags::UNIFORM_BIOMES))?;
		let (block_light, sky_light) = if flags.get(SectionFlags::DEFAULT_LIGHT) {
			(LightContent::Missing, LightContent::Missing)
		} else {
			(reader.read_value()?, reader.read_value()?)
		};
		let block_entities = if flags.get(SectionFlags::HAS_BLOCK_ENTITIES) {
			read_counted::<u16, BlockEntity, _>(reader, u16::MAX as usize)?
		} else {
			Vec::new()
		};
		Ok(Self {
			blocks,
			biomes,
			block_light,
			sky_light,
			block_entities,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		blockstate,
		cells,
		world::light::LightArray,
	};

	fn layered() -> Section {
		let blocks = cells!(16; |_x, y, _z| match y {
			0 => blockstate!(bedrock),
			1..=3 => blockstate!(stone),
			_ => blockstate!(air),
		});
		let biomes = cells!(4; |x, _y, _z| if x < 2 { Biome::plains() } else { Biome::new("minecraft:desert") });
		Section::from_cells(blocks, biomes).unwrap()
	}

	#[test]
	fn uniform_section_layout() {
		let section = Section::default();
		let bytes = section.encode().unwrap();
		let mut expected = vec![0b1011u8];
		expected.extend(to_bytes(&1u16).unwrap());
		expected.extend(to_bytes("minecraft:air").unwrap());
		expected.extend(to_bytes(&1u16).unwrap());
		expected.extend(to_bytes("minecraft:plains").unwrap());
		assert_eq!(bytes, expected);
		assert_eq!(Section::decode(&bytes, FormatVersion::CURRENT).unwrap(), section);
	}

	#[test]
	fn packed_grid_sizes() {
		let section = layered();
		let bytes = section.encode().unwrap();
		let header = 1 + 2
			+ 2 + "minecraft:bedrock".len()
			+ 2 + "minecraft:stone".len()
			+ 2 + "minecraft:air".len();
		let biome_palette = 2 + 2 + "minecraft:plains".len() + 2 + "minecraft:desert".len();
		// Three states pack at two bits (1024 bytes), two biomes at one bit (8 bytes).
		assert_eq!(bytes.len(), header + 1024 + biome_palette + 8);
		let decoded = Section::decode(&bytes, FormatVersion::CURRENT).unwrap();
		assert_eq!(decoded, section);
		assert_eq!(decoded.block(5, 2, 9).unwrap().name(), "minecraft:stone");
		assert_eq!(decoded.biome(12, 0, 3).unwrap().name(), "minecraft:desert");
	}

	#[test]
	fn light_and_block_entities() {
		let mut section = layered();
		let mut light = LightArray::default();
		light.set(4, 4, 4, 14);
		section.block_light = LightContent::Present(light);
		section.sky_light = LightContent::Full;
		section.block_entities.push(BlockEntity::new(1, 4, 2, "minecraft:chest"));
		let flags = section.flags();
		assert!(flags.get(SectionFlags::HAS_BLOCK_ENTITIES));
		assert!(!flags.get(SectionFlags::DEFAULT_LIGHT));
		let bytes = section.encode().unwrap();
		assert_eq!(Section::decode(&bytes, FormatVersion::CURRENT).unwrap(), section);
	}

	#[test]
	fn reserved_flag_bits_are_ignored() {
		let mut bytes = Section::default().encode().unwrap();
		bytes[0] |= 0xF0;
		assert_eq!(Section::decode(&bytes, FormatVersion::CURRENT).unwrap(), Section::default());
	}

	#[test]
	fn bad_index_is_corrupt() {
		// Three entries use two bits per index; index 3 has no entry.
		let mut section = layered();
		section.set_block(0, 0, 0, blockstate!(air)).unwrap();
		let mut bytes = section.encode().unwrap();
		let grid_start = 1 + 2
			+ 2 + "minecraft:bedrock".len()
			+ 2 + "minecraft:stone".len()
			+ 2 + "minecraft:air".len();
		bytes[grid_start] |= 0b11;
		assert!(Section::decode(&bytes, FormatVersion::CURRENT).unwrap_err().is_corrupt());
	}

	#[test]
	fn truncation_is_corrupt() {
		let bytes = layered().encode().unwrap();
		for cut in [0, 1, 10, bytes.len() - 1] {
			assert!(Section::decode(&bytes[..cut], FormatVersion::CURRENT).unwrap_err().is_corrupt(), "cut at {cut}");
		}
	}

	#[test]
	fn oversized_palette_is_rejected() {
		let biomes = (0..SECTION_BIOMES).map(|i| Biome::new(format!("test:biome_{i}"))).collect::<Vec<_>>();
		let section = Section::from_cells(vec![BlockState::air(); SECTION_BLOCKS], biomes).unwrap();
		// 64 biomes is the limit and still encodes.
		assert!(section.encode().is_ok());
		let palette = Palette::from_entries((0..=SECTION_BIOMES).map(|i| Biome::new(format!("test:biome_{i}")))).unwrap();
		let mut section = section;
		section.biomes = PalettedGrid::from_parts(palette, vec![0; SECTION_BIOMES]).unwrap();
		assert!(matches!(section.encode(), Err(McError::Unrepresentable(_))));
		assert!(Section::from_cells(vec![BlockState::air(); 10], vec![Biome::plains(); SECTION_BIOMES]).is_err());
	}
}
