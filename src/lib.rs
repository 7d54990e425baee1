pub mod error;
pub mod field;
pub mod mesh;
pub mod plugin;
pub mod registry;
pub mod tables;
pub mod terrain;
pub mod types;
pub mod utils;

pub use plugin::TerrainPlugin;
pub use terrain::Terrain;
