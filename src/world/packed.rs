//! Dense bit packing for palette indices.
//!
//! Indices are laid out least significant bit first across 64-bit words with
//! no padding, so one index may straddle two words. Words are serialized
//! little-endian and the output is cut to `ceil(cells * bits / 8)` bytes.

use crate::{
	McResult, McError,
};

/// The number of bytes that `cells` indices of `bits` width occupy.
pub const fn packed_len(cells: usize, bits: u32) -> usize {
	(cells * bits as usize + 7) / 8
}

const fn mask(bits: u32) -> u64 {
	(1u64 << bits) - 1
}

/// Packs `indices` at `bits` bits each. Every index must fit in `bits`.
pub fn pack(indices: &[u32], bits: u32) -> Vec<u8> {
	debug_assert!((1..=32).contains(&bits));
	let total_bits = indices.len() * bits as usize;
	let mut words = vec![0u64; (total_bits + 63) / 64];
	let mask = mask(bits);
	for (cell, &index) in indices.iter().enumerate() {
		debug_assert!((index as u64) <= mask, "index {index} does not fit in {bits} bits");
		let value = index as u64 & mask;
		let bit = cell * bits as usize;
		let (word, offset) = (bit / 64, (bit % 64) as u32);
		words[word] |= value << offset;
		if offset + bits > 64 {
			words[word + 1] |= value >> (64 - offset);
		}
	}
	let mut bytes = words.into_iter()
		.flat_map(u64::to_le_bytes)
		.collect::<Vec<u8>>();
	bytes.truncate(packed_len(indices.len(), bits));
	bytes
}

/// Unpacks `cells` indices of `bits` width.
/// Fails with [McError::CorruptData] when `bytes` is too short.
pub fn unpack(bytes: &[u8], cells: usize, bits: u32) -> McResult<Vec<u32>> {
	if !(1..=32).contains(&bits) {
		return McError::corrupt(format!("invalid index width: {bits}"));
	}
	let needed = packed_len(cells, bits);
	if bytes.len() < needed {
		return McError::corrupt(format!("packed grid needs {needed} bytes, found {}", bytes.len()));
	}
	let words = bytes[..needed]
		.chunks(8)
		.map(|chunk| {
			let mut word = [0u8; 8];
			word[..chunk.len()].copy_from_slice(chunk);
			u64::from_le_bytes(word)
		})
		.collect::<Vec<u64>>();
	let mask = mask(bits);
	Ok((0..cells).map(|cell| {
		let bit = cell * bits as usize;
		let (word, offset) = (bit / 64, (bit % 64) as u32);
		let mut value = words[word] >> offset;
		if offset + bits > 64 {
			value |= words[word + 1] << (64 - offset);
		}
		(value & mask) as u32
	}).collect())
}
