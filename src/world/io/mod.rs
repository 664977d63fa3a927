pub mod compression;
pub mod convert;
pub mod migrate;
pub mod region;
