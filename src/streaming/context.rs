//! Streaming context: every pool and staging queue in one place
//!
//! Owned by the scene root and passed where needed, so independent scenes
//! never share state through process-wide globals.

use std::collections::VecDeque;

use super::lod::PagedLod;
use super::pool::{Handle, Pool};
use super::resources::{Material, RenderGeometry, TextureImage};
use super::tile::DecodedGeometry;

/// Cap on each staging queue; loads are refused beyond this backlog
pub const MAX_STAGED: usize = 50;

/// Geometry payload waiting for its one-per-frame attach
#[derive(Debug)]
pub struct PendingGeometry {
    pub node: Handle<PagedLod>,
    pub generation: u64,
    pub name: String,
    pub geometry: DecodedGeometry,
}

/// Image payload waiting for its asynchronous decode to start
#[derive(Debug)]
pub struct PendingImage {
    pub node: Handle<PagedLod>,
    pub generation: u64,
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Which staging queue the next processing tick serves
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessState {
    Images,
    Geometry,
}

/// Pools and queues for one streaming scene
#[derive(Debug)]
pub struct StreamingContext {
    pub geometries: Pool<RenderGeometry>,
    pub textures: Pool<TextureImage>,
    pub materials: Pool<Material>,

    /// FIFO of decoded geometry, attached one per processing tick
    pub geometry_queue: VecDeque<PendingGeometry>,
    /// FIFO of raw images; the oldest starts decoding each processing tick
    pub image_queue: VecDeque<PendingImage>,
    /// Images handed to the async decode pipeline, not yet completed
    pub images_in_flight: usize,

    pub process_state: ProcessState,
}

impl Default for StreamingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamingContext {
    pub fn new() -> Self {
        Self {
            geometries: Pool::new(),
            textures: Pool::new(),
            materials: Pool::new(),
            geometry_queue: VecDeque::new(),
            image_queue: VecDeque::new(),
            images_in_flight: 0,
            process_state: ProcessState::Images,
        }
    }

    /// True when the staging backlog is too deep to accept another tile.
    pub fn staging_full(&self) -> bool {
        self.image_queue.len() + self.images_in_flight > MAX_STAGED
            || self.geometry_queue.len() > MAX_STAGED
    }

    /// Drop queued payloads and reset staging state. Pools are left alone;
    /// live resources stay owned by their tree positions.
    pub fn clear_queues(&mut self) {
        self.geometry_queue.clear();
        self.image_queue.clear();
        self.images_in_flight = 0;
        self.process_state = ProcessState::Images;
    }
}
