pub mod biome;
pub mod blockentity;
pub mod blockstate;
pub mod chunk;
pub mod heightmap;
pub mod io;
pub mod light;
pub mod packed;
pub mod palette;
pub mod region;
pub mod section;
