use std::{
	fmt::Display,
	io::{Read, Write},
};

use crate::{
	ioext::*,
	McResult,
};

/// A biome identifier such as `minecraft:plains`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Biome(String);

impl Biome {
	pub fn new<S: AsRef<str>>(name: S) -> Self {
		Self(name.as_ref().to_owned())
	}

	pub fn plains() -> Self {
		Self::new("minecraft:plains")
	}

	pub fn name(&self) -> &str {
		&self.0
	}
}

impl Default for Biome {
	fn default() -> Self {
		Self::plains()
	}
}

impl<S: AsRef<str>> From<S> for Biome {
	fn from(value: S) -> Self {
		Biome::new(value)
	}
}

impl Display for Biome {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

impl Readable for Biome {
	fn read_from<R: Read>(reader: &mut R) -> McResult<Self> {
		Ok(Self(reader.read_value()?))
	}
}

impl Writable for Biome {
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
		writer.write_value(&self.0)
	}
}
