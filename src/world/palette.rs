//! Palettes map a grid of repeated values to a short list of distinct values
//! plus one small index per cell.

use std::hash::Hash;

use indexmap::IndexSet;

use crate::{
	math::bit::bits_per_index,
	McResult, McError,
};

/// Ordered set of distinct values. Indices are assigned in first-seen order
/// and never change once assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette<T: Hash + Eq> {
	entries: IndexSet<T>,
}

impl<T: Hash + Eq> Default for Palette<T> {
	fn default() -> Self {
		Self {
			entries: IndexSet::new(),
		}
	}
}

impl<T: Hash + Eq> Palette<T> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a palette from cell values, returning the palette and one index per cell.
	pub fn build<I: IntoIterator<Item = T>>(values: I) -> (Self, Vec<u32>) {
		let mut palette = Self::new();
		let indices = values.into_iter()
			.map(|value| palette.register(value))
			.collect();
		(palette, indices)
	}

	/// Builds a palette from stored entries. Entries must be distinct.
	pub fn from_entries<I: IntoIterator<Item = T>>(entries: I) -> McResult<Self> {
		let mut palette = Self::new();
		for entry in entries {
			if !palette.entries.insert(entry) {
				return McError::corrupt("duplicate palette entry");
			}
		}
		Ok(palette)
	}

	/// Adds `value` if it is new and returns its index.
	pub fn register(&mut self, value: T) -> u32 {
		self.entries.insert_full(value).0 as u32
	}

	pub fn index_of(&self, value: &T) -> Option<u32> {
		self.entries.get_index_of(value).map(|index| index as u32)
	}

	pub fn resolve(&self, index: u32) -> McResult<&T> {
		self.entries.get_index(index as usize).ok_or(McError::IndexOutOfRange {
			index: index as usize,
			len: self.entries.len(),
		})
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// A palette of one entry describes a grid where every cell holds that entry.
	pub fn is_uniform(&self) -> bool {
		self.entries.len() == 1
	}

	pub fn bits_per_index(&self) -> u32 {
		bits_per_index(self.entries.len())
	}

	pub fn iter(&self) -> impl Iterator<Item = &T> {
		self.entries.iter()
	}
}

/// A fixed-size grid stored as a palette and one palette index per cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PalettedGrid<T: Hash + Eq> {
	palette: Palette<T>,
	indices: Vec<u32>,
}

impl<T: Hash + Eq + Clone> PalettedGrid<T> {
	/// Every cell holds `value`.
	pub fn uniform(value: T, cells: usize) -> Self {
		let (palette, _) = Palette::build([value]);
		Self {
			palette,
			indices: vec![0; cells],
		}
	}

	pub fn from_cells<I: IntoIterator<Item = T>>(cells: I) -> Self {
		let (palette, indices) = Palette::build(cells);
		Self {
			palette,
			indices,
		}
	}

	/// Joins a palette with its indices, failing with [McError::CorruptData]
	/// if an index does not point into the palette.
	pub fn from_parts(palette: Palette<T>, indices: Vec<u32>) -> McResult<Self> {
		if let Some(bad) = indices.iter().find(|&&index| index as usize >= palette.len()) {
			return McError::corrupt(format!("palette index {bad} out of range for palette of {}", palette.len()));
		}
		Ok(Self {
			palette,
			indices,
		})
	}

	pub fn palette(&self) -> &Palette<T> {
		&self.palette
	}

	pub fn indices(&self) -> &[u32] {
		&self.indices
	}

	/// Number of cells.
	pub fn len(&self) -> usize {
		self.indices.len()
	}

	pub fn is_empty(&self) -> bool {
		self.indices.is_empty()
	}

	pub fn is_uniform(&self) -> bool {
		self.palette.is_uniform()
	}

	pub fn get(&self, cell: usize) -> Option<&T> {
		let index = *self.indices.get(cell)?;
		self.palette.resolve(index).ok()
	}

	/// Replaces the value of one cell. Values no longer referenced stay in the palette.
	pub fn set(&mut self, cell: usize, value: T) -> McResult<()> {
		let len = self.indices.len();
		let Some(slot) = self.indices.get_mut(cell) else {
			return Err(McError::IndexOutOfRange { index: cell, len });
		};
		*slot = self.palette.register(value);
		Ok(())
	}

	pub fn cells(&self) -> impl Iterator<Item = &T> {
		self.indices.iter().filter_map(|&index| self.palette.resolve(index).ok())
	}

	pub fn to_cells(&self) -> Vec<T> {
		self.cells().cloned().collect()
	}

	/// Rebuilds the palette from the cells, dropping entries no cell uses.
	pub fn compact(&self) -> Self {
		Self::from_cells(self.cells().cloned())
	}

	/// Replaces every palette entry with `convert(entry)`. Entries that
	/// convert to the same value are merged and the cells follow them.
	pub fn map_palette<F: FnMut(&T) -> T>(&self, mut convert: F) -> Self {
		let mut palette = Palette::new();
		let remap = self.palette.iter()
			.map(|entry| palette.register(convert(entry)))
			.collect::<Vec<u32>>();
		let indices = self.indices.iter()
			.map(|&index| remap[index as usize])
			.collect();
		Self {
			palette,
			indices,
		}
	}
}
