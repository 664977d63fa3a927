//! Module for bit level manipulation.

pub trait SetBit {
	fn set_bit(self, index: usize, on: bool) -> Self;
}

pub trait GetBit {
	fn get_bit(self, index: usize) -> bool;
}

/// The number of bits needed to represent a value.
/// `0.bit_length() == 0`, `255.bit_length() == 8`, `256.bit_length() == 9`.
pub trait BitLength {
	fn bit_length(self) -> u32;
}

macro_rules! __get_set_impl {
	($type:ty) => {

		impl SetBit for $type {
			fn set_bit(self, index: usize, on: bool) -> Self {
				if on {
					self | (1 << index)
				} else {
					self & !(1 << index)
				}
			}
		}

		impl GetBit for $type {
			fn get_bit(self, index: usize) -> bool {
				(self & (1 << index)) != 0
			}
		}

		impl BitLength for $type {
			fn bit_length(self) -> u32 {
				<$type>::BITS - self.leading_zeros()
			}
		}

	};
}

crate::for_each_int_type!(__get_set_impl;unsigned);

/// Bits per packed index for a palette of `palette_len` entries.
/// This is `max(1, ceil(log2(palette_len)))`; a palette of one still
/// reports one bit even though its grid is never written.
pub const fn bits_per_index(palette_len: usize) -> u32 {
	if palette_len <= 2 {
		1
	} else {
		usize::BITS - (palette_len - 1).leading_zeros()
	}
}

/// Bits needed to store any value in `0..=max`.
pub const fn bits_to_represent(max: u32) -> u32 {
	if max == 0 {
		1
	} else {
		u32::BITS - max.leading_zeros()
	}
}
