//! Terrain grid, its world placement and procedural generation

pub mod island;
pub mod mapper;
pub mod terrain;

// Re-export main types
pub use island::IslandGenerator;
pub use mapper::WorldMapper;
pub use terrain::{TerrainGenerator, TerrainGrid};
