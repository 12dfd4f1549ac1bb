//! Paged-LOD streaming engine
//!
//! Frame-sliced scheduler over a hierarchical LOD tree: computes per-node
//! screen-space error, prioritizes and throttles downloads, hands payloads
//! to the mesh decoder on a worker pool, attaches results to tree nodes,
//! and evicts subtrees whose data has not been needed recently.

pub mod budget;
pub mod context;
pub mod lod;
pub mod pool;
pub mod queue;
pub mod resources;
pub mod root;
pub mod source;
pub mod tile;
mod update;
pub mod worker;

pub use budget::TextureBudget;
pub use context::{StreamingContext, MAX_STAGED};
pub use lod::{PagedLod, Sibling, SiblingMesh};
pub use pool::{Handle, Pool};
pub use queue::{DownloadQueue, DownloadRequest};
pub use resources::{Material, RenderGeometry, TextureImage};
pub use root::{LoadStage, RootConfig, SceneInfo, SceneRoot, UpdatePhase, ViewParams};
pub use source::{DirTileSource, TileSource};
pub use tile::{parse_tile, DecodedGeometry, TileData, TileFile, TilePayload};
pub use worker::{
    DecodedImage, ImageJob, ImageResult, LoadRequest, TileLoader, TileResult,
    DEFAULT_WORKER_COUNT,
};
