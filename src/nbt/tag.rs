use crate::nbt::Map;

/// The tag IDs used in the binary NBT encoding.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagID {
	End = 0,
	Byte = 1,
	Short = 2,
	Int = 3,
	Long = 4,
	Float = 5,
	Double = 6,
	ByteArray = 7,
	String = 8,
	List = 9,
	Compound = 10,
	IntArray = 11,
	LongArray = 12,
}

impl TryFrom<u8> for TagID {
	type Error = u8;

	fn try_from(value: u8) -> Result<Self, Self::Error> {
		use TagID::*;
		Ok(match value {
			0 => End,
			1 => Byte,
			2 => Short,
			3 => Int,
			4 => Long,
			5 => Float,
			6 => Double,
			7 => ByteArray,
			8 => String,
			9 => List,
			10 => Compound,
			11 => IntArray,
			12 => LongArray,
			unknown => return Err(unknown),
		})
	}
}

/// A single NBT value.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
	Byte(i8),
	Short(i16),
	Int(i32),
	Long(i64),
	Float(f32),
	Double(f64),
	ByteArray(Vec<i8>),
	String(String),
	List(ListTag),
	Compound(Map),
	IntArray(Vec<i32>),
	LongArray(Vec<i64>),
}

/// A homogeneous NBT list.
/// An empty list keeps no element type, it is written with the End id.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ListTag {
	#[default]
	Empty,
	Byte(Vec<i8>),
	Short(Vec<i16>),
	Int(Vec<i32>),
	Long(Vec<i64>),
	Float(Vec<f32>),
	Double(Vec<f64>),
	ByteArray(Vec<Vec<i8>>),
	String(Vec<String>),
	List(Vec<ListTag>),
	Compound(Vec<Map>),
	IntArray(Vec<Vec<i32>>),
	LongArray(Vec<Vec<i64>>),
}

/// The root of an NBT document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NamedTag {
	pub name: String,
	pub tag: Map,
}

impl NamedTag {
	pub fn new<S: Into<String>>(name: S, tag: Map) -> Self {
		Self {
			name: name.into(),
			tag,
		}
	}

	/// A root compound without a name, the form used for block entity payloads.
	pub fn unnamed(tag: Map) -> Self {
		Self::new(String::new(), tag)
	}
}

impl Tag {
	pub fn id(&self) -> TagID {
		match self {
			Tag::Byte(_) => TagID::Byte,
			Tag::Short(_) => TagID::Short,
			Tag::Int(_) => TagID::Int,
			Tag::Long(_) => TagID::Long,
			Tag::Float(_) => TagID::Float,
			Tag::Double(_) => TagID::Double,
			Tag::ByteArray(_) => TagID::ByteArray,
			Tag::String(_) => TagID::String,
			Tag::List(_) => TagID::List,
			Tag::Compound(_) => TagID::Compound,
			Tag::IntArray(_) => TagID::IntArray,
			Tag::LongArray(_) => TagID::LongArray,
		}
	}
}

impl ListTag {
	/// The element id, [TagID::End] for an empty list.
	pub fn element_id(&self) -> TagID {
		match self {
			ListTag::Empty => TagID::End,
			ListTag::Byte(_) => TagID::Byte,
			ListTag::Short(_) => TagID::Short,
			ListTag::Int(_) => TagID::Int,
			ListTag::Long(_) => TagID::Long,
			ListTag::Float(_) => TagID::Float,
			ListTag::Double(_) => TagID::Double,
			ListTag::ByteArray(_) => TagID::ByteArray,
			ListTag::String(_) => TagID::String,
			ListTag::List(_) => TagID::List,
			ListTag::Compound(_) => TagID::Compound,
			ListTag::IntArray(_) => TagID::IntArray,
			ListTag::LongArray(_) => TagID::LongArray,
		}
	}

	pub fn len(&self) -> usize {
		match self {
			ListTag::Empty => 0,
			ListTag::Byte(list) => list.len(),
			ListTag::Short(list) => list.len(),
			ListTag::Int(list) => list.len(),
			ListTag::Long(list) => list.len(),
			ListTag::Float(list) => list.len(),
			ListTag::Double(list) => list.len(),
			ListTag::ByteArray(list) => list.len(),
			ListTag::String(list) => list.len(),
			ListTag::List(list) => list.len(),
			ListTag::Compound(list) => list.len(),
			ListTag::IntArray(list) => list.len(),
			ListTag::LongArray(list) => list.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

macro_rules! tag_from_impls {
	($($type:ty => $variant:ident;)+) => {
		$(
			impl From<$type> for Tag {
				fn from(value: $type) -> Self {
					Tag::$variant(value)
				}
			}
		)+
	};
}

tag_from_impls!(
	i8 => Byte;
	i16 => Short;
	i32 => Int;
	i64 => Long;
	f32 => Float;
	f64 => Double;
	Vec<i8> => ByteArray;
	String => String;
	ListTag => List;
	Map => Compound;
	Vec<i32> => IntArray;
	Vec<i64> => LongArray;
);

impl From<&str> for Tag {
	fn from(value: &str) -> Self {
		Tag::String(value.to_owned())
	}
}

impl From<bool> for Tag {
	fn from(value: bool) -> Self {
		Tag::Byte(value as i8)
	}
}

macro_rules! list_from_impls {
	($($type:ty => $variant:ident;)+) => {
		$(
			impl From<Vec<$type>> for ListTag {
				fn from(value: Vec<$type>) -> Self {
					if value.is_empty() {
						ListTag::Empty
					} else {
						ListTag::$variant(value)
					}
				}
			}
		)+
	};
}

list_from_impls!(
	i16 => Short;
	i64 => Long;
	f32 => Float;
	f64 => Double;
	String => String;
	ListTag => List;
	Map => Compound;
);

impl From<Vec<&str>> for ListTag {
	fn from(value: Vec<&str>) -> Self {
		value.into_iter().map(str::to_owned).collect::<Vec<String>>().into()
	}
}
