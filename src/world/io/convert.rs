//! Host hooks for upgrading game data written at an older data version.
//!
//! The format version describes the layout of a record. The data version is
//! the game's own version number, stored in the region header, and says which
//! block names and block entity schemas the content uses. The codec does not
//! know those schemas, so a host supplies a [DataConverter] and the reader runs
//! it over every chunk whose region is older than the converter.

use log::trace;

use crate::world::{
	blockentity::BlockEntity,
	blockstate::BlockState,
	chunk::ChunkColumn,
};

/// Upgrades chunk content from an older data version.
/// Both methods default to leaving the data untouched.
pub trait DataConverter: Send + Sync {
	/// The data version that converted content ends up at.
	fn data_version(&self) -> i32;

	/// Converts one block palette entry.
	fn convert_block_state(&self, state: &BlockState, from: i32, to: i32) -> BlockState {
		let _ = (from, to);
		state.clone()
	}

	/// Converts one block entity. A `None` id or payload removes it from the entity.
	fn convert_block_entity(&self, entity: BlockEntity, from: i32, to: i32) -> BlockEntity {
		let _ = (from, to);
		entity
	}
}

/// True when content written at `from` needs `converter`.
pub fn needs_conversion(converter: &dyn DataConverter, from: i32) -> bool {
	from < converter.data_version()
}

/// Runs `converter` over every block palette and block entity of `column`.
/// Block palette entries that convert to the same state are merged.
/// Does nothing when `from` is not older than the converter.
pub fn convert_column(column: &mut ChunkColumn, converter: &dyn DataConverter, from: i32) {
	if !needs_conversion(converter, from) {
		return;
	}
	let to = converter.data_version();
	trace!("Converting chunk content from data version {from} to {to}");
	for section in column.sections.iter_mut() {
		section.blocks = section.blocks.map_palette(|state| converter.convert_block_state(state, from, to));
		section.block_entities = std::mem::take(&mut section.block_entities)
			.into_iter()
			.map(|entity| converter.convert_block_entity(entity, from, to))
			.collect();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		blockstate,
		world::{biome::Biome, section::Section},
	};

	struct FlattenSigns;

	impl DataConverter for FlattenSigns {
		fn data_version(&self) -> i32 {
			3700
		}

		fn convert_block_state(&self, state: &BlockState, _: i32, _: i32) -> BlockState {
			if state.name() == "minecraft:standing_sign" {
				state.with_name("minecraft:oak_sign")
			} else {
				state.clone()
			}
		}

		fn convert_block_entity(&self, mut entity: BlockEntity, from: i32, to: i32) -> BlockEntity {
			assert_eq!((from, to), (3000, 3700));
			if entity.id.as_deref() == Some("minecraft:standing_sign") {
				entity.id = Some("minecraft:sign".to_owned());
			}
			entity
		}
	}

	fn column() -> ChunkColumn {
		let mut section = Section::filled(blockstate!(oak_sign[rotation=4]), Biome::plains());
		section.set_block(1, 0, 0, blockstate!(standing_sign[rotation=4])).unwrap();
		section.set_block(2, 0, 0, blockstate!(stone)).unwrap();
		section.block_entities.push(BlockEntity::new(1, 0, 0, "minecraft:standing_sign"));
		ChunkColumn::from_sections(0, 0, vec![section]).unwrap()
	}

	#[test]
	fn older_content_is_converted() {
		let mut column = column();
		convert_column(&mut column, &FlattenSigns, 3000);
		let section = &column.sections[0];
		assert_eq!(section.blocks.palette().len(), 2);
		assert_eq!(section.block(1, 0, 0), Some(&blockstate!(oak_sign[rotation=4])));
		assert_eq!(section.block(2, 0, 0), Some(&blockstate!(stone)));
		assert_eq!(section.block_entities[0].id.as_deref(), Some("minecraft:sign"));
	}

	#[test]
	fn current_content_is_untouched() {
		let mut column = column();
		convert_column(&mut column, &FlattenSigns, 3700);
		assert_eq!(column, self::column());
		assert!(!needs_conversion(&FlattenSigns, 4000));
	}
}
