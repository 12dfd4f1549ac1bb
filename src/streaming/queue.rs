//! Priority queue for child-siblinghood downloads
//!
//! Rebuilt every updating pass: traversal pushes one request per sibling
//! whose children still need loading, the dispatch phase sorts and drains
//! it. Lower score means more urgently needed (nearer to the camera, more
//! screen-space overshoot); ties prefer the shallower tree level so coarse
//! structure streams in before fine detail.

use super::lod::PagedLod;
use super::pool::Handle;

/// One queued request: load the children of `sibling` under `node`
#[derive(Clone, Copy, Debug)]
pub struct DownloadRequest {
    pub node: Handle<PagedLod>,
    pub sibling: usize,
    /// Normalized distance² plus the pixel-diameter overshoot term
    pub score: f32,
    pub level: u32,
}

/// Best-effort priority queue, recomputed each traversal
#[derive(Debug, Default)]
pub struct DownloadQueue {
    entries: Vec<DownloadRequest>,
}

impl DownloadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, request: DownloadRequest) {
        self.entries.push(request);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &DownloadRequest> {
        self.entries.iter()
    }

    /// Sort into dispatch order and drain.
    pub fn drain_sorted(&mut self) -> Vec<DownloadRequest> {
        self.entries.sort_by(|a, b| {
            a.score
                .total_cmp(&b.score)
                .then_with(|| a.level.cmp(&b.level))
        });
        std::mem::take(&mut self.entries)
    }
}
