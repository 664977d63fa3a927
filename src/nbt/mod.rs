//! The NBT model used for block entity payloads.

pub mod tag;
pub mod io;
pub mod macros;

pub use tag::*;

/// Compound storage. Keeps insertion order so payloads write back byte for byte.
pub type Map = indexmap::IndexMap<String, tag::Tag>;
