use std::io::{Read, Write};

use crate::{
	ioext::*,
	McResult, McError,
};

/// Bytes in a light array: 4096 cells at 4 bits each.
pub const LIGHT_ARRAY_LEN: usize = 2048;

/// Nibble-packed light levels for the 4096 cells of a section.
/// Cell `i` (`y*256 + z*16 + x`) lives in byte `i / 2`, low nibble first.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct LightArray(Box<[u8; LIGHT_ARRAY_LEN]>);

impl LightArray {
	/// Every cell at `level`.
	pub fn filled(level: u8) -> Self {
		let level = level & 0xF;
		Self(Box::new([level | (level << 4); LIGHT_ARRAY_LEN]))
	}

	pub fn from_bytes(bytes: &[u8]) -> McResult<Self> {
		if bytes.len() != LIGHT_ARRAY_LEN {
			return McError::corrupt(format!("light array must be {LIGHT_ARRAY_LEN} bytes, found {}", bytes.len()));
		}
		let mut array = Box::new([0u8; LIGHT_ARRAY_LEN]);
		array.copy_from_slice(bytes);
		Ok(Self(array))
	}

	pub fn as_bytes(&self) -> &[u8] {
		self.0.as_slice()
	}

	const fn cell(x: usize, y: usize, z: usize) -> (usize, u32) {
		let index = (y & 0xF) * 256 + (z & 0xF) * 16 + (x & 0xF);
		(index / 2, (index as u32 & 1) * 4)
	}

	pub fn get(&self, x: usize, y: usize, z: usize) -> u8 {
		let (byte, shift) = Self::cell(x, y, z);
		(self.0[byte] >> shift) & 0xF
	}

	pub fn set(&mut self, x: usize, y: usize, z: usize, level: u8) {
		let (byte, shift) = Self::cell(x, y, z);
		self.0[byte] = (self.0[byte] & !(0xF << shift)) | ((level & 0xF) << shift);
	}
}

impl Default for LightArray {
	fn default() -> Self {
		Self::filled(0)
	}
}

impl std::fmt::Debug for LightArray {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "LightArray([{} bytes])", LIGHT_ARRAY_LEN)
	}
}

/// How a section stores one light channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum LightContent {
	/// Not computed; the host recalculates it.
	#[default]
	Missing,
	/// Every cell at level 0.
	Empty,
	/// Every cell at level 15.
	Full,
	Present(LightArray),
}

impl LightContent {
	pub const MISSING: u8 = 0;
	pub const EMPTY: u8 = 1;
	pub const FULL: u8 = 2;
	pub const PRESENT: u8 = 3;

	pub fn id(&self) -> u8 {
		match self {
			LightContent::Missing => Self::MISSING,
			LightContent::Empty => Self::EMPTY,
			LightContent::Full => Self::FULL,
			LightContent::Present(_) => Self::PRESENT,
		}
	}

	pub fn is_missing(&self) -> bool {
		matches!(self, LightContent::Missing)
	}

	/// The light levels this content stands for, `None` when missing.
	pub fn to_array(&self) -> Option<LightArray> {
		match self {
			LightContent::Missing => None,
			LightContent::Empty => Some(LightArray::filled(0)),
			LightContent::Full => Some(LightArray::filled(15)),
			LightContent::Present(array) => Some(array.clone()),
		}
	}
}

impl Readable for LightContent {
	fn read_from<R: Read>(reader: &mut R) -> McResult<Self> {
		Ok(match reader.read_value::<u8>()? {
			Self::MISSING => LightContent::Missing,
			Self::EMPTY => LightContent::Empty,
			Self::FULL => LightContent::Full,
			Self::PRESENT => {
				let bytes = reader.read_bytes(LIGHT_ARRAY_LEN)?;
				LightContent::Present(LightArray::from_bytes(&bytes)?)
			}
			other => return McError::corrupt(format!("unknown light content: {other}")),
		})
	}
}

impl Writable for LightContent {
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
		let mut size = writer.write_value(self.id())?;
		if let LightContent::Present(array) = self {
			writer.write_all(array.as_bytes())?;
			size += LIGHT_ARRAY_LEN;
		}
		Ok(size)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn nibbles() {
		let mut light = LightArray::default();
		light.set(0, 0, 0, 7);
		light.set(1, 0, 0, 15);
		light.set(15, 15, 15, 3);
		assert_eq!(light.as_bytes()[0], 0xF7);
		assert_eq!(light.get(1, 0, 0), 15);
		assert_eq!(light.get(15, 15, 15), 3);
		assert_eq!(light.as_bytes()[LIGHT_ARRAY_LEN - 1], 0x30);
	}

	#[test]
	fn content_encoding() {
		assert_eq!(to_bytes(&LightContent::Full).unwrap(), vec![2]);
		let present = LightContent::Present(LightArray::filled(9));
		let bytes = to_bytes(&present).unwrap();
		assert_eq!(bytes.len(), 1 + LIGHT_ARRAY_LEN);
		assert_eq!(read_exact_value::<LightContent>(&bytes).unwrap(), present);
		assert!(read_exact_value::<LightContent>(&[4]).unwrap_err().is_corrupt());
		assert!(read_exact_value::<LightContent>(&bytes[..100]).unwrap_err().is_corrupt());
		assert_eq!(LightContent::Full.to_array().unwrap().get(3, 4, 5), 15);
	}
}
