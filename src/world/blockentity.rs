use std::io::{Read, Write};

use crate::{
	ioext::*,
	nbt::tag::NamedTag,
	McResult, McError,
};

/// A block entity attached to one cell of a section.
/// The payload is opaque to the codec and written back byte for byte.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockEntity {
	/// Local `x` in `0..16`.
	pub x: u8,
	/// Local `y` in `0..16`.
	pub y: u8,
	/// Local `z` in `0..16`.
	pub z: u8,
	pub id: Option<String>,
	pub data: Option<NamedTag>,
}

impl BlockEntity {
	pub fn new<S: AsRef<str>>(x: u8, y: u8, z: u8, id: S) -> Self {
		Self {
			x, y, z,
			id: Some(id.as_ref().to_owned()),
			data: None,
		}
	}

	pub fn with_data(mut self, data: NamedTag) -> Self {
		self.data = Some(data);
		self
	}

	/// The packed local position, `y << 8 | z << 4 | x`.
	pub fn packed_pos(&self) -> McResult<u16> {
		if self.x > 15 || self.y > 15 || self.z > 15 {
			return McError::unrepresentable(format!(
				"block entity position ({}, {}, {}) is outside the section",
				self.x, self.y, self.z
			));
		}
		Ok((self.y as u16) << 8 | (self.z as u16) << 4 | self.x as u16)
	}

	/// The cell index this entity sits in, matching the block grid order.
	pub fn cell(&self) -> usize {
		self.y as usize * 256 + self.z as usize * 16 + self.x as usize
	}
}

impl Readable for BlockEntity {
	fn read_from<R: Read>(reader: &mut R) -> McResult<Self> {
		let pos = reader.read_value::<u16>()?;
		if pos >> 12 != 0 {
			return McError::corrupt(format!("invalid block entity position: {pos:#06x}"));
		}
		Ok(Self {
			x: (pos & 0xF) as u8,
			z: (pos >> 4 & 0xF) as u8,
			y: (pos >> 8 & 0xF) as u8,
			id: reader.read_value()?,
			data: reader.read_value()?,
		})
	}
}

impl Writable for BlockEntity {
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
		let mut size = writer.write_value(self.packed_pos()?)?;
		size += writer.write_value(&self.id)?;
		size += writer.write_value(&self.data)?;
		Ok(size)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{compound, nbt::tag::Tag};

	#[test]
	fn position_packing() {
		let entity = BlockEntity::new(3, 15, 9, "minecraft:sign");
		assert_eq!(entity.packed_pos().unwrap(), 0x0F93);
		assert_eq!(entity.cell(), 15 * 256 + 9 * 16 + 3);
		let outside = BlockEntity::new(16, 0, 0, "minecraft:sign");
		assert!(matches!(outside.packed_pos(), Err(McError::Unrepresentable(_))));
	}

	#[test]
	fn payload_survives() {
		let Tag::Compound(data) = compound!(
			("Text1", "{\"text\":\"hello\"}"),
			("GlowingText", 1i8),
		) else {
			unreachable!()
		};
		let entity = BlockEntity::new(0, 1, 2, "minecraft:sign").with_data(NamedTag::unnamed(data));
		let bytes = to_bytes(&entity).unwrap();
		assert_eq!(read_exact_value::<BlockEntity>(&bytes).unwrap(), entity);
		let bare = BlockEntity { id: None, ..Default::default() };
		assert_eq!(to_bytes(&bare).unwrap(), vec![0, 0, 0, 0]);
	}
}
