//! Binary IO building blocks shared by every codec in the crate.
//! All multi-byte values are big-endian.

use std::io::{
	self,
	Read, Write,
	Seek, SeekFrom,
};

use byteorder::{
	BigEndian,
	ReadBytesExt,
	WriteBytesExt,
};

use crate::{
	McResult, McError,
	for_each_int_type,
};

/// A value that can be read from a binary stream.
pub trait Readable: Sized {
	fn read_from<R: Read>(reader: &mut R) -> McResult<Self>;
}

/// A value that can be written to a binary stream.
/// Returns the number of bytes written.
pub trait Writable {
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize>;
}

impl<T: Writable + ?Sized> Writable for &T {
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
		(**self).write_to(writer)
	}
}

pub trait ReadExt: Read + Sized {
	fn read_value<T: Readable>(&mut self) -> McResult<T> {
		T::read_from(self)
	}

	/// Reads exactly `length` bytes without trusting `length` for the allocation.
	fn read_bytes(&mut self, length: usize) -> McResult<Vec<u8>> {
		let mut buffer = Vec::with_capacity(length.min(4096));
		self.take(length as u64).read_to_end(&mut buffer)?;
		if buffer.len() != length {
			return McError::corrupt(format!("expected {length} bytes, found {}", buffer.len()));
		}
		Ok(buffer)
	}

	/// Reads a `u32` length followed by that many bytes.
	fn read_byte_array(&mut self) -> McResult<Vec<u8>> {
		let length = self.read_value::<u32>()?;
		self.read_bytes(length as usize)
	}
}

impl<T: Read> ReadExt for T {}

pub trait WriteExt: Write + Sized {
	fn write_value<T: Writable>(&mut self, value: T) -> McResult<usize> {
		value.write_to(self)
	}

	/// Writes a `u32` length followed by the bytes.
	fn write_byte_array(&mut self, bytes: &[u8]) -> McResult<usize> {
		let Ok(length) = u32::try_from(bytes.len()) else {
			return McError::unrepresentable(format!("byte array of {} bytes", bytes.len()));
		};
		self.write_value(length)?;
		self.write_all(bytes)?;
		Ok(4 + bytes.len())
	}
}

impl<T: Write> WriteExt for T {}

pub trait SeekExt: Seek {
	/// Returns a [SeekFrom] that points to the current stream position.
	fn seek_return(&mut self) -> io::Result<SeekFrom> {
		Ok(SeekFrom::Start(self.stream_position()?))
	}
}

impl<T: Seek> SeekExt for T {}

macro_rules! __primitive_io {
	($type:ty, $read:ident, $write:ident) => {
		impl Readable for $type {
			fn read_from<R: Read>(reader: &mut R) -> McResult<Self> {
				Ok(reader.$read::<BigEndian>()?)
			}
		}

		impl Writable for $type {
			fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
				writer.$write::<BigEndian>(*self)?;
				Ok(std::mem::size_of::<$type>())
			}
		}
	};
}

__primitive_io!(u16, read_u16, write_u16);
__primitive_io!(i16, read_i16, write_i16);
__primitive_io!(u32, read_u32, write_u32);
__primitive_io!(i32, read_i32, write_i32);
__primitive_io!(u64, read_u64, write_u64);
__primitive_io!(i64, read_i64, write_i64);
__primitive_io!(f32, read_f32, write_f32);
__primitive_io!(f64, read_f64, write_f64);

impl Readable for u8 {
	fn read_from<R: Read>(reader: &mut R) -> McResult<Self> {
		Ok(reader.read_u8()?)
	}
}

impl Writable for u8 {
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
		writer.write_u8(*self)?;
		Ok(1)
	}
}

impl Readable for i8 {
	fn read_from<R: Read>(reader: &mut R) -> McResult<Self> {
		Ok(reader.read_i8()?)
	}
}

impl Writable for i8 {
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
		writer.write_i8(*self)?;
		Ok(1)
	}
}

impl Readable for bool {
	fn read_from<R: Read>(reader: &mut R) -> McResult<Self> {
		match reader.read_u8()? {
			0 => Ok(false),
			1 => Ok(true),
			other => McError::corrupt(format!("invalid boolean byte: {other}")),
		}
	}
}

impl Writable for bool {
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
		writer.write_value(*self as u8)
	}
}

/// Strings are a `u16` byte length followed by UTF-8.
impl Readable for String {
	fn read_from<R: Read>(reader: &mut R) -> McResult<Self> {
		let length = reader.read_value::<u16>()?;
		let bytes = reader.read_bytes(length as usize)?;
		Ok(String::from_utf8(bytes)?)
	}
}

impl Writable for str {
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
		let Ok(length) = u16::try_from(self.len()) else {
			return McError::unrepresentable(format!("string of {} bytes", self.len()));
		};
		writer.write_value(length)?;
		writer.write_all(self.as_bytes())?;
		Ok(2 + self.len())
	}
}

impl Writable for String {
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
		self.as_str().write_to(writer)
	}
}

/// An optional value is a presence byte followed by the value.
impl<T: Readable> Readable for Option<T> {
	fn read_from<R: Read>(reader: &mut R) -> McResult<Self> {
		if reader.read_value::<bool>()? {
			Ok(Some(reader.read_value()?))
		} else {
			Ok(None)
		}
	}
}

impl<T: Writable> Writable for Option<T> {
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
		match self {
			Some(value) => Ok(writer.write_value(true)? + value.write_to(writer)?),
			None => writer.write_value(false),
		}
	}
}

/// Reads a value and fails if anything is left over in `bytes`.
pub fn read_exact_value<T: Readable>(bytes: &[u8]) -> McResult<T> {
	let mut reader = bytes;
	let value = T::read_from(&mut reader)?;
	if !reader.is_empty() {
		return McError::corrupt(format!("{} trailing bytes", reader.len()));
	}
	Ok(value)
}

/// Writes a value into a fresh buffer.
pub fn to_bytes<T: Writable + ?Sized>(value: &T) -> McResult<Vec<u8>> {
	let mut buffer = Vec::new();
	value.write_to(&mut buffer)?;
	Ok(buffer)
}

macro_rules! __size_check {
	($type:ty) => {
		impl LengthPrefix for $type {
			fn to_length(self) -> usize {
				self as usize
			}
		}
	};
}

/// Integer types usable as count prefixes.
pub trait LengthPrefix: Copy {
	fn to_length(self) -> usize;
}

for_each_int_type!(__size_check;unsigned);

/// Reads a count prefix of type `P` and that many values.
pub fn read_counted<P, T, R>(reader: &mut R, limit: usize) -> McResult<Vec<T>>
where
P: Readable + LengthPrefix,
T: Readable,
R: Read {
	let count = reader.read_value::<P>()?.to_length();
	if count > limit {
		return McError::corrupt(format!("count {count} exceeds limit {limit}"));
	}
	(0..count).map(|_| T::read_from(reader)).collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn string_roundtrip() {
		let bytes = to_bytes("minecraft:stone").unwrap();
		assert_eq!(&bytes[..2], &[0, 15]);
		let value: String = read_exact_value(&bytes).unwrap();
		assert_eq!(value, "minecraft:stone");
	}

	#[test]
	fn truncated_string_is_corrupt() {
		let bytes = to_bytes("minecraft:stone").unwrap();
		let result: McResult<String> = read_exact_value(&bytes[..bytes.len() - 1]);
		assert!(result.unwrap_err().is_corrupt());
	}

	#[test]
	fn huge_length_does_not_allocate() {
		let bytes = [0xFFu8, 0xFF, 0xFF, 0xFF, 1, 2, 3];
		let result = (&bytes[..]).read_byte_array();
		assert!(result.unwrap_err().is_corrupt());
	}

	#[test]
	fn option_and_bool() {
		let bytes = to_bytes(&Some(7u16)).unwrap();
		assert_eq!(bytes, vec![1, 0, 7]);
		let value: Option<u16> = read_exact_value(&bytes).unwrap();
		assert_eq!(value, Some(7));
		let result: McResult<bool> = read_exact_value(&[2]);
		assert!(result.unwrap_err().is_corrupt());
	}

	#[test]
	fn counted_limit() {
		let bytes = [0u8, 3, 0, 1, 0, 2, 0, 3];
		let values = read_counted::<u16, u16, _>(&mut &bytes[..], 3).unwrap();
		assert_eq!(values, vec![1, 2, 3]);
		assert!(read_counted::<u16, u16, _>(&mut &bytes[..], 2).unwrap_err().is_corrupt());
	}
}
