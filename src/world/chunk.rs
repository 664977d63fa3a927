//! A full-height column of sections.

use std::io::{Read, Write};

use crate::{
	ioext::*,
	world::{
		blockstate::BlockState,
		heightmap::Heightmaps,
		io::migrate::{migrate, FormatVersion},
		section::Section,
	},
	McResult, McError,
};

/// How far world generation got for a chunk.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum GenerationStatus {
	Empty = 0,
	StructureStarts = 1,
	StructureReferences = 2,
	Biomes = 3,
	Noise = 4,
	Surface = 5,
	Carvers = 6,
	Features = 7,
	InitializeLight = 8,
	Light = 9,
	Spawn = 10,
	#[default]
	Full = 11,
}

impl TryFrom<u8> for GenerationStatus {
	type Error = McError;

	fn try_from(value: u8) -> Result<Self, Self::Error> {
		use GenerationStatus::*;
		Ok(match value {
			0 => Empty,
			1 => StructureStarts,
			2 => StructureReferences,
			3 => Biomes,
			4 => Noise,
			5 => Surface,
			6 => Carvers,
			7 => Features,
			8 => InitializeLight,
			9 => Light,
			10 => Spawn,
			11 => Full,
			unknown => return McError::corrupt(format!("unknown generation status: {unknown}")),
		})
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkColumn {
	min_section: i8,
	max_section: i8,
	/// Bottom to top, one per section in `min_section..=max_section`.
	pub sections: Vec<Section>,
	pub heightmaps: Heightmaps,
	pub status: GenerationStatus,
	/// Opaque bytes owned by the host.
	pub user_data: Vec<u8>,
}

impl ChunkColumn {
	/// A column of air sections covering `min_section..=max_section`.
	pub fn new(min_section: i8, max_section: i8) -> McResult<Self> {
		let count = section_count(min_section, max_section)?;
		Ok(Self {
			min_section,
			max_section,
			sections: vec![Section::default(); count],
			heightmaps: Heightmaps::new(),
			status: GenerationStatus::Full,
			user_data: Vec::new(),
		})
	}

	/// Builds a column from its sections, which must match the range.
	pub fn from_sections(min_section: i8, max_section: i8, sections: Vec<Section>) -> McResult<Self> {
		let count = section_count(min_section, max_section)?;
		if sections.len() != count {
			return McError::unrepresentable(format!(
				"section range {min_section}..={max_section} needs {count} sections, found {}",
				sections.len()
			));
		}
		Ok(Self {
			sections,
			..Self::new(min_section, max_section)?
		})
	}

	pub fn min_section(&self) -> i8 {
		self.min_section
	}

	pub fn max_section(&self) -> i8 {
		self.max_section
	}

	pub fn section_count(&self) -> usize {
		self.sections.len()
	}

	/// The section at section coordinate `y`.
	pub fn section(&self, y: i32) -> Option<&Section> {
		let index = usize::try_from(y - self.min_section as i32).ok()?;
		self.sections.get(index)
	}

	pub fn section_mut(&mut self, y: i32) -> Option<&mut Section> {
		let index = usize::try_from(y - self.min_section as i32).ok()?;
		self.sections.get_mut(index)
	}

	/// The block at local `x`/`z` and world `y`.
	pub fn block(&self, x: usize, y: i32, z: usize) -> Option<&BlockState> {
		self.section(y.div_euclid(16))?
			.block(x, y.rem_euclid(16) as usize, z)
	}

	pub fn set_block(&mut self, x: usize, y: i32, z: usize, state: BlockState) -> McResult<()> {
		let section_y = y.div_euclid(16);
		let Some(section) = self.section_mut(section_y) else {
			return McError::unrepresentable(format!("block height {y} is outside the column"));
		};
		section.set_block(x, y.rem_euclid(16) as usize, z, state)
	}

	pub fn encode(&self) -> McResult<Vec<u8>> {
		to_bytes(self)
	}

	/// Decodes a chunk record written at `version`, migrating it first when older.
	pub fn decode(bytes: &[u8], version: u16) -> McResult<Self> {
		if version == FormatVersion::CURRENT {
			return read_exact_value(bytes);
		}
		let migrated = migrate(bytes, version)?;
		read_exact_value(&migrated)
	}
}

fn section_count(min_section: i8, max_section: i8) -> McResult<usize> {
	if max_section < min_section {
		return McError::unrepresentable(format!("section range {min_section}..={max_section} is empty"));
	}
	Ok((max_section as i32 - min_section as i32 + 1) as usize)
}

impl Writable for ChunkColumn {
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
		let count = section_count(self.min_section, self.max_section)?;
		if self.sections.len() != count {
			return McError::unrepresentable(format!(
				"section range {}..={} needs {count} sections, found {}",
				self.min_section, self.max_section, self.sections.len()
			));
		}
		let mut size = writer.write_value(self.min_section)?;
		size += writer.write_value(self.max_section)?;
		size += self.heightmaps.write_to(writer, count)?;
		size += writer.write_value(self.status as u8)?;
		size += writer.write_value(count as u16)?;
		for section in &self.sections {
			size += writer.write_value(section)?;
		}
		size += writer.write_byte_array(&self.user_data)?;
		Ok(size)
	}
}

impl Readable for ChunkColumn {
	fn read_from<R: Read>(reader: &mut R) -> McResult<Self> {
		let min_section = reader.read_value::<i8>()?;
		let max_section = reader.read_value::<i8>()?;
		if max_section < min_section {
			return McError::corrupt(format!("section range {min_section}..={max_section} is empty"));
		}
		let expected = (max_section as i32 - min_section as i32 + 1) as usize;
		let heightmaps = Heightmaps::read_from(reader, expected)?;
		let status = GenerationStatus::try_from(reader.read_value::<u8>()?)?;
		let count = reader.read_value::<u16>()? as usize;
		if count != expected {
			return McError::corrupt(format!(
				"section range {min_section}..={max_section} needs {expected} sections, found {count}"
			));
		}
		let sections = (0..count)
			.map(|_| reader.read_value::<Section>())
			.collect::<McResult<Vec<Section>>>()?;
		let user_data = reader.read_byte_array()?;
		Ok(Self {
			min_section,
			max_section,
			sections,
			heightmaps,
			status,
			user_data,
		})
	}
}
