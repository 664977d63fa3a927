use std::io::{Read, Write};

use chrono::{DateTime, TimeZone, Utc};

use crate::{
	ioext::*,
	McResult,
};

/// A 32-bit Unix timestamp recording when a chunk record was last written.
/// Zero means unknown.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default, Hash)]
pub struct Timestamp(u32);

impl Timestamp {
	pub const fn new(seconds: u32) -> Self {
		Self(seconds)
	}

	pub const fn seconds(self) -> u32 {
		self.0
	}

	pub fn is_unknown(self) -> bool {
		self.0 == 0
	}

	pub fn to_datetime(self) -> Option<DateTime<Utc>> {
		if self.is_unknown() {
			return None;
		}
		Utc.timestamp_opt(self.0 as i64, 0).single()
	}

	/// Get a [Timestamp] for the current time (in Utc).
	pub fn utc_now() -> Timestamp {
		Timestamp::from(Utc::now())
	}
}

impl From<u32> for Timestamp {
	fn from(value: u32) -> Self {
		Self(value)
	}
}

impl From<Timestamp> for u32 {
	fn from(value: Timestamp) -> Self {
		value.0
	}
}

/// Times before the epoch or past 2106 saturate.
impl From<DateTime<Utc>> for Timestamp {
	fn from(value: DateTime<Utc>) -> Self {
		Timestamp(value.timestamp().clamp(0, u32::MAX as i64) as u32)
	}
}

impl Readable for Timestamp {
	fn read_from<R: Read>(reader: &mut R) -> McResult<Self> {
		Ok(Self(reader.read_value()?))
	}
}

impl Writable for Timestamp {
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
		writer.write_value(self.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn datetime_conversion() {
		let time = Utc.with_ymd_and_hms(2024, 4, 23, 12, 30, 0).unwrap();
		let stamp = Timestamp::from(time);
		assert_eq!(stamp.seconds(), 1713875400);
		assert_eq!(stamp.to_datetime(), Some(time));
		assert_eq!(Timestamp::default().to_datetime(), None);
		assert!(!Timestamp::utc_now().is_unknown());
	}
}
