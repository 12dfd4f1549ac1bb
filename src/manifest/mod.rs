//! Scene and tile manifest models

pub mod scene;
pub mod tile;

pub use scene::{Layer, SceneManifest, SceneOptions};
pub use tile::{GeometryMeta, ManifestNode, TileManifest};
