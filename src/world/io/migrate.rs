//! Upgrades chunk records written by older format versions.
//!
//! Each version gap has one [MigrationStep]. A step walks a record in the
//! layout of its source version and writes the layout of the next version,
//! copying every field it does not change byte for byte. Steps are chained
//! until the record reaches [FormatVersion::CURRENT].

use std::borrow::Cow;

use log::{debug, trace};

use crate::{
	ioext::*,
	math::bit::bits_per_index,
	nbt::tag::NamedTag,
	world::{
		blockstate::BlockState,
		heightmap::{Heightmaps, HEIGHTMAP_SIZE},
		light::{LightContent, LIGHT_ARRAY_LEN},
		packed::{pack, packed_len, unpack},
		section::*,
	},
	McResult, McError,
};

/// Known format versions.
pub struct FormatVersion;

impl FormatVersion {
	/// Light stored as one presence byte followed by both light arrays.
	pub const INITIAL: u16 = 1;
	/// Light stored per channel with a content byte; the default light flag.
	pub const IMPROVED_LIGHT: u16 = 2;
	/// `minecraft:grass` renamed to `minecraft:short_grass`.
	pub const SHORT_GRASS: u16 = 3;
	/// Chunk records end with host user data.
	pub const CHUNK_USER_DATA: u16 = 4;
	pub const CURRENT: u16 = Self::CHUNK_USER_DATA;

	pub fn is_supported(version: u16) -> bool {
		(Self::INITIAL..=Self::CURRENT).contains(&version)
	}

	pub fn check(version: u16) -> McResult<()> {
		if Self::is_supported(version) {
			Ok(())
		} else {
			Err(McError::UnsupportedVersion(version))
		}
	}
}

const LEGACY_GRASS: &str = "minecraft:grass";
const SHORT_GRASS: &str = "minecraft:short_grass";

/// One upgrade from a version to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationStep {
	/// `INITIAL` to `IMPROVED_LIGHT`.
	SplitLight,
	/// `IMPROVED_LIGHT` to `SHORT_GRASS`.
	RenameShortGrass,
	/// `SHORT_GRASS` to `CHUNK_USER_DATA`.
	AppendUserData,
}

impl MigrationStep {
	/// The step that upgrades records of `version`.
	pub fn from_version(version: u16) -> Option<Self> {
		match version {
			FormatVersion::INITIAL => Some(MigrationStep::SplitLight),
			FormatVersion::IMPROVED_LIGHT => Some(MigrationStep::RenameShortGrass),
			FormatVersion::SHORT_GRASS => Some(MigrationStep::AppendUserData),
			_ => None,
		}
	}

	/// The steps needed to bring `version` up to date, oldest first.
	pub fn chain(version: u16) -> McResult<Vec<MigrationStep>> {
		FormatVersion::check(version)?;
		Ok((version..FormatVersion::CURRENT).filter_map(Self::from_version).collect())
	}

	pub fn source(self) -> u16 {
		match self {
			MigrationStep::SplitLight => FormatVersion::INITIAL,
			MigrationStep::RenameShortGrass => FormatVersion::IMPROVED_LIGHT,
			MigrationStep::AppendUserData => FormatVersion::SHORT_GRASS,
		}
	}

	pub fn target(self) -> u16 {
		self.source() + 1
	}

	/// Upgrades a whole chunk record by one version.
	pub fn apply(self, raw: &[u8]) -> McResult<Vec<u8>> {
		let mut rewriter = Rewriter::new(raw, self);
		rewriter.chunk()?;
		rewriter.finish()
	}

	/// Upgrades a single section by one version.
	pub fn apply_section(self, raw: &[u8]) -> McResult<Vec<u8>> {
		let mut rewriter = Rewriter::new(raw, self);
		rewriter.section()?;
		rewriter.finish()
	}
}

/// Brings a chunk record written at `version` up to [FormatVersion::CURRENT].
/// Records that are already current are returned as is.
pub fn migrate(raw: &[u8], version: u16) -> McResult<Cow<'_, [u8]>> {
	let steps = MigrationStep::chain(version)?;
	if !steps.is_empty() {
		debug!("Migrating chunk record from version {version} ({} steps)", steps.len());
	}
	steps.into_iter().try_fold(Cow::Borrowed(raw), |record, step| {
		trace!("Applying {step:?} ({} -> {})", step.source(), step.target());
		step.apply(&record).map(Cow::Owned)
	})
}

/// Brings a section written at `version` up to [FormatVersion::CURRENT].
pub fn migrate_section(raw: &[u8], version: u16) -> McResult<Cow<'_, [u8]>> {
	MigrationStep::chain(version)?
		.into_iter()
		.try_fold(Cow::Borrowed(raw), |section, step| {
			step.apply_section(&section).map(Cow::Owned)
		})
}

/// Walks a record in the source layout of `step`, writing the target layout.
struct Rewriter<'a> {
	input: &'a [u8],
	output: Vec<u8>,
	step: MigrationStep,
}

impl<'a> Rewriter<'a> {
	fn new(input: &'a [u8], step: MigrationStep) -> Self {
		Self {
			input,
			output: Vec::with_capacity(input.len() + 16),
			step,
		}
	}

	fn finish(self) -> McResult<Vec<u8>> {
		if !self.input.is_empty() {
			return McError::corrupt(format!("{} trailing bytes", self.input.len()));
		}
		Ok(self.output)
	}

	/// Copies `length` bytes unchanged.
	fn copy(&mut self, length: usize) -> McResult<()> {
		if self.input.len() < length {
			return McError::corrupt(format!("expected {length} bytes, found {}", self.input.len()));
		}
		let (head, tail) = self.input.split_at(length);
		self.output.extend_from_slice(head);
		self.input = tail;
		Ok(())
	}

	/// Reads a value without writing it.
	fn take<T: Readable>(&mut self) -> McResult<T> {
		T::read_from(&mut self.input)
	}

	/// Reads a value and copies its exact bytes.
	fn pass<T: Readable>(&mut self) -> McResult<T> {
		let before = self.input;
		let value = self.take::<T>()?;
		let used = before.len() - self.input.len();
		self.output.extend_from_slice(&before[..used]);
		Ok(value)
	}

	fn emit<T: Writable>(&mut self, value: T) -> McResult<()> {
		self.output.write_value(value)?;
		Ok(())
	}

	fn chunk(&mut self) -> McResult<()> {
		let min_section = self.pass::<i8>()?;
		let max_section = self.pass::<i8>()?;
		if max_section < min_section {
			return McError::corrupt(format!("section range {min_section}..={max_section} is empty"));
		}
		let count = (max_section as i32 - min_section as i32 + 1) as usize;
		let mask = self.pass::<u32>()?;
		let heightmap_len = packed_len(HEIGHTMAP_SIZE, Heightmaps::bits(count));
		for _ in 0..mask.count_ones() {
			self.copy(heightmap_len)?;
		}
		// Generation status.
		self.pass::<u8>()?;
		let stored = self.pass::<u16>()? as usize;
		if stored != count {
			return McError::corrupt(format!("expected {count} sections, found {stored}"));
		}
		for _ in 0..count {
			self.section()?;
		}
		if self.step == MigrationStep::AppendUserData {
			self.emit(0u32)?;
		}
		Ok(())
	}

	fn section(&mut self) -> McResult<()> {
		let flags_at = self.output.len();
		let mut flags = SectionFlags::from_byte(self.pass::<u8>()?);
		if self.step == MigrationStep::RenameShortGrass {
			let merged = self.renamed_block_palette(flags.get(SectionFlags::UNIFORM_BLOCKS))?;
			if merged {
				flags = flags.with(SectionFlags::UNIFORM_BLOCKS, true);
				self.output[flags_at] = flags.bits();
			}
		} else {
			self.palette(SECTION_BLOCKS, MAX_BLOCK_PALETTE, flags.get(SectionFlags::UNIFORM_BLOCKS))?;
		}
		self.palette(SECTION_BIOMES, MAX_BIOME_PALETTE, flags.get(SectionFlags::UNIFORM_BIOMES))?;
		if self.step == MigrationStep::SplitLight {
			let has_light = self.take::<bool>()?;
			if has_light {
				for _ in 0..2 {
					self.emit(LightContent::PRESENT)?;
					self.copy(LIGHT_ARRAY_LEN)?;
				}
			}
			self.output[flags_at] = flags.with(SectionFlags::DEFAULT_LIGHT, !has_light).bits();
		} else if !flags.get(SectionFlags::DEFAULT_LIGHT) {
			for _ in 0..2 {
				match self.pass::<u8>()? {
					LightContent::PRESENT => self.copy(LIGHT_ARRAY_LEN)?,
					content if content < LightContent::PRESENT => (),
					unknown => return McError::corrupt(format!("unknown light content: {unknown}")),
				}
			}
		}
		if flags.get(SectionFlags::HAS_BLOCK_ENTITIES) {
			let count = self.pass::<u16>()?;
			for _ in 0..count {
				self.pass::<u16>()?;
				self.pass::<Option<String>>()?;
				self.pass::<Option<NamedTag>>()?;
			}
		}
		Ok(())
	}

	fn palette_len(&mut self, limit: usize) -> McResult<usize> {
		let count = self.take::<u16>()? as usize;
		if count == 0 || count > limit {
			return McError::corrupt(format!("invalid palette size: {count}"));
		}
		Ok(count)
	}

	fn palette(&mut self, cells: usize, limit: usize, uniform: bool) -> McResult<()> {
		let count = self.palette_len(limit)?;
		self.emit(count as u16)?;
		for _ in 0..count {
			self.pass::<String>()?;
		}
		if !uniform {
			self.copy(packed_len(cells, bits_per_index(count)))?;
		}
		Ok(())
	}

	/// Renames legacy grass in a block palette. Entries that become equal are
	/// merged and the grid is repacked for the smaller palette.
	/// Returns true when a mixed grid collapsed into a uniform one.
	fn renamed_block_palette(&mut self, uniform: bool) -> McResult<bool> {
		let count = self.palette_len(MAX_BLOCK_PALETTE)?;
		let mut entries: Vec<String> = Vec::with_capacity(count);
		let mut remap = Vec::with_capacity(count);
		for _ in 0..count {
			let text = self.take::<String>()?;
			let state = BlockState::parse(&text)
				.or_else(|_| McError::corrupt(format!("invalid block state: {text:?}")))?;
			let text = if state.name() == LEGACY_GRASS {
				state.with_name(SHORT_GRASS).to_string()
			} else {
				text
			};
			let index = match entries.iter().position(|entry| *entry == text) {
				Some(index) => index,
				None => {
					entries.push(text);
					entries.len() - 1
				}
			};
			remap.push(index as u32);
		}
		let merged = entries.len();
		if merged < count {
			trace!("Merged {} block palette entries after renaming grass", count - merged);
		}
		self.emit(merged as u16)?;
		for entry in entries {
			self.emit(entry)?;
		}
		if uniform {
			return Ok(false);
		}
		let grid_len = packed_len(SECTION_BLOCKS, bits_per_index(count));
		if self.input.len() < grid_len {
			return McError::corrupt(format!("expected {grid_len} bytes, found {}", self.input.len()));
		}
		let (grid, rest) = self.input.split_at(grid_len);
		self.input = rest;
		if merged == count {
			self.output.extend_from_slice(grid);
			return Ok(false);
		}
		let indices = unpack(grid, SECTION_BLOCKS, bits_per_index(count))?
			.into_iter()
			.map(|index| remap.get(index as usize).copied().ok_or(index))
			.collect::<Result<Vec<u32>, u32>>()
			.or_else(|bad| McError::corrupt(format!("palette index {bad} out of range for palette of {count}")))?;
		if merged == 1 {
			return Ok(true);
		}
		self.output.extend(pack(&indices, bits_per_index(merged)));
		Ok(false)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		blockstate,
		world::{
			biome::Biome,
			chunk::{ChunkColumn, GenerationStatus},
			light::LightArray,
		},
	};

	fn string(text: &str) -> Vec<u8> {
		to_bytes(text).unwrap()
	}

	/// A version 1 record: one uniform grass section and no light.
	fn initial_record(has_light: bool) -> Vec<u8> {
		let mut bytes = vec![0, 0, 0, 0, 0, 0, 0, 0, 1, 0b011];
		bytes.extend([0, 1]);
		bytes.extend(string("minecraft:grass"));
		bytes.extend([0, 1]);
		bytes.extend(string("minecraft:plains"));
		if has_light {
			bytes.push(1);
			bytes.extend([0x11; LIGHT_ARRAY_LEN]);
			bytes.extend([0xFF; LIGHT_ARRAY_LEN]);
		} else {
			bytes.push(0);
		}
		bytes
	}

	fn expected_chunk() -> ChunkColumn {
		let section = Section::filled(BlockState::named(SHORT_GRASS), Biome::plains());
		let mut chunk = ChunkColumn::from_sections(0, 0, vec![section]).unwrap();
		chunk.status = GenerationStatus::Empty;
		chunk
	}

	#[test]
	fn initial_record_upgrades() {
		let raw = initial_record(false);
		let migrated = migrate(&raw, FormatVersion::INITIAL).unwrap();
		assert_eq!(migrated.as_ref(), expected_chunk().encode().unwrap().as_slice());
		assert_eq!(ChunkColumn::decode(&raw, FormatVersion::INITIAL).unwrap(), expected_chunk());
	}

	#[test]
	fn initial_light_becomes_present() {
		let chunk = ChunkColumn::decode(&initial_record(true), FormatVersion::INITIAL).unwrap();
		let section = &chunk.sections[0];
		assert_eq!(section.block_light, LightContent::Present(LightArray::filled(1)));
		assert_eq!(section.sky_light, LightContent::Present(LightArray::filled(15)));
	}

	#[test]
	fn split_light_step() {
		let upgraded = MigrationStep::SplitLight.apply(&initial_record(false)).unwrap();
		// Flags gain the default light flag and the presence byte is gone.
		assert_eq!(upgraded[9], 0b1011);
		assert_eq!(upgraded.len(), initial_record(false).len() - 1);
	}

	#[test]
	fn grass_rename_keeps_properties() {
		let mut raw = vec![0, 0, 0, 0, 0, 0, 0, 0, 1, 0b1010];
		raw.extend([0, 3]);
		raw.extend(string("minecraft:grass[snowy=false]"));
		raw.extend(string("minecraft:grass_block"));
		raw.extend(string("minecraft:grass"));
		let indices = (0..SECTION_BLOCKS as u32).map(|i| i % 3).collect::<Vec<_>>();
		raw.extend(crate::world::packed::pack(&indices, 2));
		raw.extend([0, 1]);
		raw.extend(string("minecraft:plains"));

		let upgraded = MigrationStep::RenameShortGrass.apply(&raw).unwrap();
		let chunk = ChunkColumn::decode(&raw, FormatVersion::IMPROVED_LIGHT).unwrap();
		assert_eq!(chunk.encode().unwrap(), MigrationStep::AppendUserData.apply(&upgraded).unwrap());
		let names = chunk.sections[0].blocks.palette().iter().map(ToString::to_string).collect::<Vec<_>>();
		assert_eq!(names, [
			"minecraft:short_grass[snowy=false]",
			"minecraft:grass_block",
			"minecraft:short_grass",
		]);
		assert_eq!(chunk.block(2, 0, 0), Some(&blockstate!(short_grass)));
	}

	/// A version 2 record with one mixed block grid over `palette`.
	fn improved_light_record(palette: &[&str], indices: &[u32]) -> Vec<u8> {
		let mut raw = vec![0, 0, 0, 0, 0, 0, 0, 0, 1, 0b1010];
		raw.extend((palette.len() as u16).to_be_bytes());
		for entry in palette {
			raw.extend(string(entry));
		}
		raw.extend(crate::world::packed::pack(indices, bits_per_index(palette.len())));
		raw.extend([0, 1]);
		raw.extend(string("minecraft:plains"));
		raw
	}

	#[test]
	fn grass_rename_merges_with_short_grass() {
		let indices = (0..SECTION_BLOCKS as u32).map(|i| i % 3).collect::<Vec<_>>();
		let raw = improved_light_record(&["minecraft:grass", "minecraft:stone", "minecraft:short_grass"], &indices);
		let upgraded = MigrationStep::RenameShortGrass.apply(&raw).unwrap();
		let chunk = ChunkColumn::decode(&raw, FormatVersion::IMPROVED_LIGHT).unwrap();
		let section = &chunk.sections[0];
		let names = section.blocks.palette().iter().map(ToString::to_string).collect::<Vec<_>>();
		assert_eq!(names, ["minecraft:short_grass", "minecraft:stone"]);
		assert_eq!(section.block(0, 0, 0), Some(&blockstate!(short_grass)));
		assert_eq!(section.block(1, 0, 0), Some(&blockstate!(stone)));
		assert_eq!(section.block(2, 0, 0), Some(&blockstate!(short_grass)));
		assert_eq!(chunk.encode().unwrap(), MigrationStep::AppendUserData.apply(&upgraded).unwrap());
	}

	#[test]
	fn grass_rename_can_collapse_a_grid() {
		let indices = (0..SECTION_BLOCKS as u32).map(|i| i % 2).collect::<Vec<_>>();
		let raw = improved_light_record(&["minecraft:grass", "minecraft:short_grass"], &indices);
		let upgraded = MigrationStep::RenameShortGrass.apply(&raw).unwrap();
		// The grid is gone and the section is flagged uniform.
		assert_eq!(upgraded[9], 0b1011);
		let chunk = ChunkColumn::decode(&raw, FormatVersion::IMPROVED_LIGHT).unwrap();
		assert_eq!(chunk, expected_chunk());
	}

	#[test]
	fn grass_rename_rejects_bad_indices() {
		let mut indices = vec![0; SECTION_BLOCKS];
		indices[7] = 3;
		let raw = improved_light_record(&["minecraft:grass", "minecraft:stone", "minecraft:short_grass"], &indices);
		assert!(MigrationStep::RenameShortGrass.apply(&raw).unwrap_err().is_corrupt());
	}

	#[test]
	fn user_data_is_appended() {
		let chunk = expected_chunk();
		let current = chunk.encode().unwrap();
		// The previous layout is the same record without the trailing user data.
		let previous = &current[..current.len() - 4];
		assert_eq!(migrate(previous, FormatVersion::SHORT_GRASS).unwrap().as_ref(), current.as_slice());
	}

	#[test]
	fn current_is_untouched() {
		let current = expected_chunk().encode().unwrap();
		let migrated = migrate(&current, FormatVersion::CURRENT).unwrap();
		assert!(matches!(migrated, Cow::Borrowed(_)));
		assert_eq!(migrated.as_ref(), current.as_slice());
	}

	#[test]
	fn unsupported_versions() {
		assert!(matches!(migrate(&[], 0), Err(McError::UnsupportedVersion(0))));
		assert!(matches!(migrate(&[], FormatVersion::CURRENT + 1), Err(McError::UnsupportedVersion(5))));
		assert!(matches!(migrate_section(&[], 99), Err(McError::UnsupportedVersion(99))));
	}

	#[test]
	fn truncated_old_record_is_corrupt() {
		let raw = initial_record(true);
		assert!(migrate(&raw[..raw.len() - 10], FormatVersion::INITIAL).unwrap_err().is_corrupt());
	}

	#[test]
	fn section_migration() {
		let record = initial_record(false);
		let section = Section::decode(&record[9..], FormatVersion::INITIAL).unwrap();
		assert_eq!(section, expected_chunk().sections[0]);
	}
}
