//! The region container: a header, an index with one entry per chunk slot,
//! then the compressed chunk records.

pub mod coord;
pub mod header;
pub mod index;
pub mod timestamp;
pub mod reader;
pub mod writer;

pub use coord::{ChunkCoord, RegionBounds};
pub use reader::RegionReader;
pub use writer::{RegionSnapshot, RegionWriter, WriteOptions};
