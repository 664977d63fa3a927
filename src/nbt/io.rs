//! Binary NBT reading and writing.
//!
//! Strings are written as `u16` length + UTF-8 and array/list lengths as
//! `i32`, matching the layout the host server uses for block entity data.
//! Compounds keep their insertion order, so a payload that is read and
//! written again produces the same bytes.

use std::io::{Read, Write};

use crate::{
	ioext::*,
	McResult, McError,
};

use super::{
	tag::*,
	Map,
};

/// Nesting deeper than this is treated as corrupt data.
pub const MAX_DEPTH: usize = 512;

fn read_length<R: Read>(reader: &mut R) -> McResult<usize> {
	let length = reader.read_value::<i32>()?;
	if length < 0 {
		return McError::corrupt(format!("negative NBT length: {length}"));
	}
	Ok(length as usize)
}

fn write_length<W: Write>(writer: &mut W, length: usize) -> McResult<usize> {
	let Ok(length) = i32::try_from(length) else {
		return McError::unrepresentable(format!("NBT array of {length} elements"));
	};
	writer.write_value(length)
}

fn read_tag_id<R: Read>(reader: &mut R) -> McResult<TagID> {
	let id = reader.read_value::<u8>()?;
	TagID::try_from(id).or_else(|unknown| McError::corrupt(format!("unknown NBT tag id: {unknown}")))
}

fn read_array<R: Read, T: Readable>(reader: &mut R) -> McResult<Vec<T>> {
	let length = read_length(reader)?;
	// Don't trust the length for the allocation.
	let mut values = Vec::with_capacity(length.min(1024));
	for _ in 0..length {
		values.push(reader.read_value()?);
	}
	Ok(values)
}

fn write_array<W: Write, T: Writable>(writer: &mut W, values: &[T]) -> McResult<usize> {
	let mut size = write_length(writer, values.len())?;
	for value in values {
		size += value.write_to(writer)?;
	}
	Ok(size)
}

fn check_depth(depth: usize) -> McResult<()> {
	if depth > MAX_DEPTH {
		return McError::corrupt("NBT nested too deeply");
	}
	Ok(())
}

fn read_compound<R: Read>(reader: &mut R, depth: usize) -> McResult<Map> {
	check_depth(depth)?;
	let mut map = Map::new();
	loop {
		let id = read_tag_id(reader)?;
		if id == TagID::End {
			return Ok(map);
		}
		let name = reader.read_value::<String>()?;
		if map.contains_key(&name) {
			return McError::corrupt(format!("duplicate NBT key: {name:?}"));
		}
		let tag = read_payload(reader, id, depth + 1)?;
		map.insert(name, tag);
	}
}

fn write_compound<W: Write>(writer: &mut W, map: &Map) -> McResult<usize> {
	let mut size = 0;
	for (name, tag) in map {
		size += writer.write_value(tag.id() as u8)?;
		size += writer.write_value(name)?;
		size += write_payload(writer, tag)?;
	}
	size += writer.write_value(TagID::End as u8)?;
	Ok(size)
}

fn read_list<R: Read>(reader: &mut R, depth: usize) -> McResult<ListTag> {
	check_depth(depth)?;
	let id = read_tag_id(reader)?;
	let length = read_length(reader)?;
	macro_rules! elements {
		($read:expr) => {
			{
				let mut values = Vec::with_capacity(length.min(1024));
				for _ in 0..length {
					values.push($read);
				}
				values
			}
		};
	}
	Ok(match id {
		TagID::End => {
			if length != 0 {
				return McError::corrupt("list of End tags with a non-zero length");
			}
			ListTag::Empty
		}
		TagID::Byte => ListTag::Byte(elements!(reader.read_value()?)),
		TagID::Short => ListTag::Short(elements!(reader.read_value()?)),
		TagID::Int => ListTag::Int(elements!(reader.read_value()?)),
		TagID::Long => ListTag::Long(elements!(reader.read_value()?)),
		TagID::Float => ListTag::Float(elements!(reader.read_value()?)),
		TagID::Double => ListTag::Double(elements!(reader.read_value()?)),
		TagID::ByteArray => ListTag::ByteArray(elements!(read_array(reader)?)),
		TagID::String => ListTag::String(elements!(reader.read_value()?)),
		TagID::List => ListTag::List(elements!(read_list(reader, depth + 1)?)),
		TagID::Compound => ListTag::Compound(elements!(read_compound(reader, depth + 1)?)),
		TagID::IntArray => ListTag::IntArray(elements!(read_array(reader)?)),
		TagID::LongArray => ListTag::LongArray(elements!(read_array(reader)?)),
	})
}

fn write_list<W: Write>(writer: &mut W, list: &ListTag) -> McResult<usize> {
	let mut size = writer.write_value(list.element_id() as u8)?;
	size += write_length(writer, list.len())?;
	macro_rules! elements {
		($values:expr, |$value:ident| $write:expr) => {
			for $value in $values {
				size += $write;
			}
		};
	}
	match list {
		ListTag::Empty => (),
		ListTag::Byte(values) => elements!(values, |value| writer.write_value(value)?),
		ListTag::Short(values) => elements!(values, |value| writer.write_value(value)?),
		ListTag::Int(values) => elements!(values, |value| writer.write_value(value)?),
		ListTag::Long(values) => elements!(values, |value| writer.write_value(value)?),
		ListTag::Float(values) => elements!(values, |value| writer.write_value(value)?),
		ListTag::Double(values) => elements!(values, |value| writer.write_value(value)?),
		ListTag::ByteArray(values) => elements!(values, |value| write_array(writer, value)?),
		ListTag::String(values) => elements!(values, |value| writer.write_value(value)?),
		ListTag::List(values) => elements!(values, |value| write_list(writer, value)?),
		ListTag::Compound(values) => elements!(values, |value| write_compound(writer, value)?),
		ListTag::IntArray(values) => elements!(values, |value| write_array(writer, value)?),
		ListTag::LongArray(values) => elements!(values, |value| write_array(writer, value)?),
	}
	Ok(size)
}

fn read_payload<R: Read>(reader: &mut R, id: TagID, depth: usize) -> McResult<Tag> {
	check_depth(depth)?;
	Ok(match id {
		TagID::End => return McError::corrupt("unexpected End tag"),
		TagID::Byte => Tag::Byte(reader.read_value()?),
		TagID::Short => Tag::Short(reader.read_value()?),
		TagID::Int => Tag::Int(reader.read_value()?),
		TagID::Long => Tag::Long(reader.read_value()?),
		TagID::Float => Tag::Float(reader.read_value()?),
		TagID::Double => Tag::Double(reader.read_value()?),
		TagID::ByteArray => Tag::ByteArray(read_array(reader)?),
		TagID::String => Tag::String(reader.read_value()?),
		TagID::List => Tag::List(read_list(reader, depth)?),
		TagID::Compound => Tag::Compound(read_compound(reader, depth)?),
		TagID::IntArray => Tag::IntArray(read_array(reader)?),
		TagID::LongArray => Tag::LongArray(read_array(reader)?),
	})
}

fn write_payload<W: Write>(writer: &mut W, tag: &Tag) -> McResult<usize> {
	match tag {
		Tag::Byte(value) => writer.write_value(value),
		Tag::Short(value) => writer.write_value(value),
		Tag::Int(value) => writer.write_value(value),
		Tag::Long(value) => writer.write_value(value),
		Tag::Float(value) => writer.write_value(value),
		Tag::Double(value) => writer.write_value(value),
		Tag::ByteArray(value) => write_array(writer, value),
		Tag::String(value) => writer.write_value(value),
		Tag::List(value) => write_list(writer, value),
		Tag::Compound(value) => write_compound(writer, value),
		Tag::IntArray(value) => write_array(writer, value),
		Tag::LongArray(value) => write_array(writer, value),
	}
}

impl Readable for NamedTag {
	fn read_from<R: Read>(reader: &mut R) -> McResult<Self> {
		let id = read_tag_id(reader)?;
		if id != TagID::Compound {
			return McError::corrupt(format!("NBT root must be a Compound, found {id:?}"));
		}
		let name = reader.read_value::<String>()?;
		let tag = read_compound(reader, 0)?;
		Ok(NamedTag { name, tag })
	}
}

impl Writable for NamedTag {
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
		let mut size = writer.write_value(TagID::Compound as u8)?;
		size += writer.write_value(&self.name)?;
		size += write_compound(writer, &self.tag)?;
		Ok(size)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::compound;

	fn sample() -> NamedTag {
		let Tag::Compound(items) = compound!(
			("id", "minecraft:chest"),
			("Lock", ""),
			("Count", 3i8),
		) else {
			unreachable!()
		};
		let Tag::Compound(tag) = compound!(
			("x", 10i32),
			("CustomName", "{\"text\":\"Loot\"}"),
			("Items", ListTag::from(vec![items])),
			("Energy", 1.5f64),
			("Empty", ListTag::Empty),
			("Seeds", vec![1i64, -2, 3]),
		) else {
			unreachable!()
		};
		NamedTag::unnamed(tag)
	}

	#[test]
	fn payload_roundtrip_preserves_order() {
		let original = sample();
		let bytes = to_bytes(&original).unwrap();
		let decoded: NamedTag = read_exact_value(&bytes).unwrap();
		assert_eq!(decoded, original);
		let keys: Vec<&String> = decoded.tag.keys().collect();
		assert_eq!(keys, ["x", "CustomName", "Items", "Energy", "Empty", "Seeds"]);
		assert_eq!(to_bytes(&decoded).unwrap(), bytes);
	}

	#[test]
	fn truncated_payload_is_corrupt() {
		let bytes = to_bytes(&sample()).unwrap();
		for cut in [1, 5, bytes.len() / 2, bytes.len() - 1] {
			let result: McResult<NamedTag> = read_exact_value(&bytes[..cut]);
			assert!(result.unwrap_err().is_corrupt(), "cut at {cut}");
		}
	}

	#[test]
	fn rejects_bad_ids() {
		// Root that is not a compound.
		let result: McResult<NamedTag> = read_exact_value(&[1, 0, 0, 5]);
		assert!(result.unwrap_err().is_corrupt());
		// Unknown tag id inside the compound.
		let result: McResult<NamedTag> = read_exact_value(&[10, 0, 0, 42, 0, 0]);
		assert!(result.unwrap_err().is_corrupt());
	}

	#[test]
	fn deep_nesting_is_rejected() {
		let mut bytes = vec![10u8, 0, 0];
		for _ in 0..(MAX_DEPTH + 2) {
			bytes.extend_from_slice(&[10, 0, 0]);
		}
		let result: McResult<NamedTag> = (&bytes[..]).read_value();
		assert!(result.unwrap_err().is_corrupt());
	}

	#[test]
	fn deep_list_nesting_is_rejected() {
		// Root compound holding a list of lists of lists...
		let mut bytes = vec![10u8, 0, 0, 9, 0, 1, b'l'];
		for _ in 0..200_000 {
			bytes.extend_from_slice(&[9, 0, 0, 0, 1]);
		}
		let result = std::thread::Builder::new()
			.stack_size(8 << 20)
			.spawn(move || read_exact_value::<NamedTag>(&bytes).map(|_| ()))
			.unwrap()
			.join()
			.unwrap();
		assert!(result.unwrap_err().is_corrupt());
	}

	#[test]
	fn duplicate_keys_are_corrupt() {
		let mut bytes = vec![10u8, 0, 0];
		for value in [1u8, 2] {
			bytes.extend_from_slice(&[1, 0, 1, b'a', value]);
		}
		bytes.push(0);
		let result: McResult<NamedTag> = read_exact_value(&bytes);
		assert!(result.unwrap_err().is_corrupt());
	}
}
