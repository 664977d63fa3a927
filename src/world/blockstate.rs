use std::{
	fmt::Display,
	io::{Read, Write},
	str::FromStr,
};

use chumsky::prelude::*;
use sorted_vec::SortedVec;

use crate::{
	ioext::*,
	McResult, McError,
};

/// Create a [BlockState].
///
/// Syntax:
/// ```ignore
/// blockstate!(air)
/// // Becomes
/// BlockState::new("minecraft:air", BlockProperties::none())
///
/// blockstate!(namespace:tile[prop1="string_literal", prop2=identifier, prop3=10])
/// // Becomes
/// BlockState::new("namespace:tile", BlockProperties::from([
/// 	("prop1".to_owned(), "string_literal".to_owned()),
/// 	("prop2".to_owned(), "identifier".to_owned()),
/// 	("prop3".to_owned(), "10".to_owned())
/// ]))
/// ```
#[macro_export]
macro_rules! blockstate {
	($id:ident) => {
		// We assume 'minecraft' namespace by default.
		$crate::blockstate!(minecraft:$id)
	};
	($id:ident [ $($name:tt = $value:tt),+$(,)? ]) => {
		$crate::blockstate!(minecraft:$id[ $($name = $value),+ ])
	};
	($namespace:ident:$id:ident) => {
		$crate::world::blockstate::BlockState::new(
			format!("{}:{}", stringify!($namespace), stringify!($id)),
			$crate::world::blockstate::BlockProperties::none()
		)
	};
	($namespace:ident:$id:ident [ $($name:tt = $value:tt),+$(,)? ]) => {
		$crate::world::blockstate::BlockState::new(
			format!("{}:{}", stringify!($namespace), stringify!($id)),
			$crate::world::blockstate::BlockProperties::from([
				$(
					(
						$crate::blockstate!(@decode_token; $name),
						$crate::blockstate!(@decode_token; $value)
					),
				)+
			])
		)
	};
	(@decode_token; $value:literal) => {
		$value.to_string()
	};
	(@decode_token; $value:ident) => {
		stringify!($value).to_owned()
	};
}

pub use crate::blockstate;

#[derive(Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub struct BlockProperty {
	pub name: String,
	pub value: String,
}

impl BlockProperty {
	pub fn new<S1: AsRef<str>, S2: AsRef<str>>(name: S1, value: S2) -> Self {
		Self {
			name: name.as_ref().to_owned(),
			value: value.as_ref().to_owned(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn value(&self) -> &str {
		&self.value
	}
}

impl<S1: AsRef<str>, S2: AsRef<str>> From<(S1, S2)> for BlockProperty {
	fn from(value: (S1, S2)) -> Self {
		BlockProperty::new(value.0, value.1)
	}
}

/// Properties sorted by name, so two states with the same properties
/// compare, hash and print identically regardless of input order.
/// An empty set is always stored as `None`.
#[derive(Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct BlockProperties {
	properties: Option<SortedVec<BlockProperty>>
}

impl BlockProperties {
	pub fn none() -> Self {
		Self {
			properties: None
		}
	}

	pub fn is_empty(&self) -> bool {
		self.properties.is_none()
	}

	pub fn len(&self) -> usize {
		self.properties.as_ref().map_or(0, |props| props.len())
	}

	pub fn properties(&self) -> Option<&[BlockProperty]> {
		self.properties.as_ref().map(|props| props.as_slice())
	}

	pub fn get(&self, name: &str) -> Option<&str> {
		self.properties()?
			.iter()
			.find(|prop| prop.name == name)
			.map(BlockProperty::value)
	}
}

impl<T: Into<BlockProperty>, It: IntoIterator<Item = T>> From<It> for BlockProperties {
	fn from(value: It) -> Self {
		let properties = value.into_iter()
			.map(T::into)
			.collect::<Vec<BlockProperty>>();
		if properties.is_empty() {
			return Self::none();
		}
		Self {
			properties: Some(SortedVec::from_unsorted(properties))
		}
	}
}

#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct BlockState {
	name: String,
	properties: BlockProperties,
}

impl BlockState {
	pub fn new<S: AsRef<str>, P: Into<BlockProperties>>(name: S, properties: P) -> Self {
		Self {
			name: name.as_ref().to_owned(),
			properties: properties.into(),
		}
	}

	/// A state without properties.
	pub fn named<S: AsRef<str>>(name: S) -> Self {
		Self::new(name, BlockProperties::none())
	}

	pub fn air() -> Self {
		blockstate!(air)
	}

	/// Parses the textual form `namespace:id[key=value,...]`.
	/// Whitespace around properties is accepted, property order is not significant.
	pub fn parse<S: AsRef<str>>(source: S) -> McResult<Self> {
		let state = blockstate_parser()
			.parse(source.as_ref())
			.map_err(|errors| McError::ParseError(format!("{errors:?}")))?;
		if let Some(props) = state.properties() {
			if props.windows(2).any(|pair| pair[0].name == pair[1].name) {
				return Err(McError::ParseError(format!("duplicate property in {}", source.as_ref())));
			}
		}
		Ok(state)
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// The same properties under another identifier.
	pub fn with_name<S: AsRef<str>>(&self, name: S) -> Self {
		Self {
			name: name.as_ref().to_owned(),
			properties: self.properties.clone(),
		}
	}

	pub fn properties(&self) -> Option<&[BlockProperty]> {
		self.properties.properties()
	}

	pub fn property(&self, name: &str) -> Option<&str> {
		self.properties.get(name)
	}

	/// Checks that the canonical text of this state parses back to it.
	pub fn check_representable(&self) -> McResult<()> {
		if !is_identifier(&self.name) {
			return McError::unrepresentable(format!("block name {:?}", self.name));
		}
		let props = self.properties().unwrap_or_default();
		if let Some(prop) = props.iter().find(|prop| !is_identifier(&prop.name) || !is_identifier(&prop.value)) {
			return McError::unrepresentable(format!("property {:?}={:?} of {}", prop.name, prop.value, self.name));
		}
		if props.windows(2).any(|pair| pair[0].name == pair[1].name) {
			return McError::unrepresentable(format!("duplicate property in {self}"));
		}
		Ok(())
	}
}

fn blockstate_parser() -> impl Parser<char, BlockState, Error = Simple<char>> {
	let identifier = filter(|c: &char| !c.is_whitespace() && !"[]=,".contains(*c))
		.repeated().at_least(1)
		.collect::<String>();
	let property = identifier.clone()
		.then_ignore(just('=').padded())
		.then(identifier.clone())
		.padded()
		.map(|(name, value)| BlockProperty { name, value });
	let properties = property
		.separated_by(just(','))
		.delimited_by(just('['), just(']'));
	identifier
		.then(properties.or_not())
		.then_ignore(end())
		.map(|(name, properties)| BlockState::new(name, properties.unwrap_or_default()))
}

impl FromStr for BlockState {
	type Err = McError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		BlockState::parse(s)
	}
}

impl Display for BlockState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}{}", &self.name, &self.properties)
	}
}

impl Display for BlockProperties {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let Some(props) = &self.properties else {
			return Ok(());
		};
		write!(f, "[")?;
		props.iter()
			.enumerate()
			.try_for_each(|(index, prop)| {
				if index > 0 {
					write!(f, ",")?;
				}
				write!(f, "{}={}", &prop.name, &prop.value)
			})?;
		write!(f, "]")
	}
}

/// Block states are stored in palettes as their canonical text.
impl Readable for BlockState {
	fn read_from<R: Read>(reader: &mut R) -> McResult<Self> {
		let text = reader.read_value::<String>()?;
		BlockState::parse(&text)
			.or_else(|_| McError::corrupt(format!("invalid block state: {text:?}")))
	}
}

/// True when `text` reads back as a single identifier token.
fn is_identifier(text: &str) -> bool {
	!text.is_empty() && !text.chars().any(|c| c.is_whitespace() || "[]=,".contains(c))
}

impl Writable for BlockState {
	/// Fails with [McError::Unrepresentable] for states whose text would not parse back.
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
		self.check_representable()?;
		writer.write_value(self.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn canonical_text() {
		let state = BlockState::parse("minecraft:oak_stairs[ waterlogged = false , facing=north,half=top]").unwrap();
		assert_eq!(state.name(), "minecraft:oak_stairs");
		assert_eq!(state.property("facing"), Some("north"));
		assert_eq!(state.to_string(), "minecraft:oak_stairs[facing=north,half=top,waterlogged=false]");
		let reordered: BlockState = "minecraft:oak_stairs[half=top,waterlogged=false,facing=north]".parse().unwrap();
		assert_eq!(state, reordered);
	}

	#[test]
	fn no_properties() {
		let state = BlockState::parse("minecraft:stone").unwrap();
		assert_eq!(state, BlockState::named("minecraft:stone"));
		assert_eq!(state.properties(), None);
		assert_eq!(state.to_string(), "minecraft:stone");
		// Empty brackets mean the same thing.
		assert_eq!(BlockState::parse("minecraft:stone[]").unwrap(), state);
	}

	#[test]
	fn macro_matches_parser() {
		let state = blockstate!(redstone_wire[power = 15, east = "side", north = none]);
		assert_eq!(state, BlockState::parse("minecraft:redstone_wire[east=side,north=none,power=15]").unwrap());
		assert_eq!(BlockState::air().to_string(), "minecraft:air");
	}

	#[test]
	fn rejects_malformed() {
		for text in ["", "minecraft:stone[", "minecraft:stone[a]", "minecraft:stone[a=1,a=2]", "minecraft:stone x"] {
			assert!(matches!(BlockState::parse(text), Err(McError::ParseError(_))), "{text:?}");
		}
	}

	#[test]
	fn stored_as_text() {
		let state = blockstate!(lever[face = wall, powered = true]);
		let bytes = to_bytes(&state).unwrap();
		let decoded: BlockState = read_exact_value(&bytes).unwrap();
		assert_eq!(decoded, state);
		let garbage = to_bytes("minecraft:lever[face").unwrap();
		let result: McResult<BlockState> = read_exact_value(&garbage);
		assert!(result.unwrap_err().is_corrupt());
	}

	#[test]
	fn unparseable_states_do_not_encode() {
		let states = [
			BlockState::named(""),
			BlockState::named("minecraft:oak sign"),
			BlockState::new("minecraft:sign", [("text", "a,b")]),
			BlockState::new("minecraft:sign", [("text", "")]),
			BlockState::new("minecraft:sign", [("rot=", "1")]),
			BlockState::new("minecraft:sign", [("rotation", "1"), ("rotation", "2")]),
		];
		for state in states {
			assert!(matches!(to_bytes(&state), Err(McError::Unrepresentable(_))), "{state:?}");
		}
		assert!(to_bytes(&BlockState::new("minecraft:sign", [("rotation", "1")])).is_ok());
	}
}
