//! Tile fetch/parse worker pool and the asynchronous image pipeline
//!
//! A fixed-size pool of async workers fetches tile bytes and parses them
//! off the update path; the scheduler polls completions without blocking.
//! Worker-slot accounting stays on the scheduler side: a slot is taken
//! when a request is dispatched and returned when its result is drained,
//! so the launch phase can refuse loads synchronously when the pool is
//! exhausted. Results carry the requesting node's generation; stale
//! results are dropped by the caller.

use std::sync::Arc;

use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::core::{Error, Result};

use super::lod::PagedLod;
use super::pool::Handle;
use super::source::TileSource;
use super::tile::{self, TileData};

/// Default number of parse workers
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Request to fetch and parse one tile
#[derive(Clone, Debug)]
pub struct LoadRequest {
    pub node: Handle<PagedLod>,
    pub generation: u64,
    pub path: String,
    /// Higher is dispatched first when requests queue up at the pool
    pub priority: f32,
}

/// Completed tile load
#[derive(Debug)]
pub struct TileResult {
    pub node: Handle<PagedLod>,
    pub generation: u64,
    pub result: Result<TileData>,
}

/// Raw image bytes waiting for asynchronous decode
#[derive(Debug)]
pub struct ImageJob {
    pub node: Handle<PagedLod>,
    pub generation: u64,
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Decoded RGBA8 image
#[derive(Debug)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Completed image decode
#[derive(Debug)]
pub struct ImageResult {
    pub node: Handle<PagedLod>,
    pub generation: u64,
    pub name: String,
    pub result: Result<DecodedImage>,
}

/// Concurrent tile loader with a bounded worker pool
pub struct TileLoader {
    request_tx: mpsc::UnboundedSender<LoadRequest>,
    result_rx: mpsc::UnboundedReceiver<TileResult>,
    image_tx: mpsc::UnboundedSender<ImageResult>,
    image_rx: mpsc::UnboundedReceiver<ImageResult>,
    worker_count: usize,
    available: usize,
    handle: tokio::runtime::Handle,
    #[allow(dead_code)]
    runtime: Option<Runtime>,
}

impl std::fmt::Debug for TileLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileLoader")
            .field("worker_count", &self.worker_count)
            .field("available", &self.available)
            .finish()
    }
}

impl TileLoader {
    /// Create a loader with its own runtime.
    pub fn new<S: TileSource>(source: S, worker_count: usize) -> Self {
        let runtime = Runtime::new().expect("failed to create tokio runtime");
        let handle = runtime.handle().clone();
        Self::build(source, worker_count, handle, Some(runtime))
    }

    /// Create a loader on the caller's tokio runtime.
    ///
    /// Panics when called outside a runtime context.
    pub fn new_with_current_runtime<S: TileSource>(source: S, worker_count: usize) -> Self {
        Self::build(source, worker_count, tokio::runtime::Handle::current(), None)
    }

    fn build<S: TileSource>(
        source: S,
        worker_count: usize,
        handle: tokio::runtime::Handle,
        runtime: Option<Runtime>,
    ) -> Self {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<LoadRequest>();
        let (result_tx, result_rx) = mpsc::unbounded_channel::<TileResult>();
        let (image_tx, image_rx) = mpsc::unbounded_channel::<ImageResult>();

        let source = Arc::new(source);
        handle.spawn(async move {
            Self::worker_loop(source, worker_count, &mut request_rx, result_tx).await;
        });

        Self {
            request_tx,
            result_rx,
            image_tx,
            image_rx,
            worker_count,
            available: worker_count,
            handle,
            runtime,
        }
    }

    /// Worker loop: requests queue up and start as slots free, highest
    /// priority first.
    async fn worker_loop<S: TileSource>(
        source: Arc<S>,
        max_concurrent: usize,
        request_rx: &mut mpsc::UnboundedReceiver<LoadRequest>,
        result_tx: mpsc::UnboundedSender<TileResult>,
    ) {
        let mut active_tasks = JoinSet::new();
        let mut pending: Vec<LoadRequest> = Vec::new();

        loop {
            tokio::select! {
                Some(request) = request_rx.recv() => {
                    pending.push(request);
                }

                Some(result) = active_tasks.join_next(), if !active_tasks.is_empty() => {
                    match result {
                        Ok(tile_result) => {
                            let _ = result_tx.send(tile_result);
                        }
                        Err(e) => {
                            log::error!("tile worker task panicked: {e}");
                        }
                    }
                }

                else => {
                    if pending.is_empty() && active_tasks.is_empty() {
                        break;
                    }
                }
            }

            while active_tasks.len() < max_concurrent && !pending.is_empty() {
                pending.sort_by(|a, b| {
                    b.priority
                        .partial_cmp(&a.priority)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                let request = pending.remove(0);
                let source = source.clone();
                active_tasks.spawn(async move { Self::load_tile_task(source, request).await });
            }
        }
    }

    async fn load_tile_task<S: TileSource>(source: Arc<S>, request: LoadRequest) -> TileResult {
        let result = match source.fetch(&request.path).await {
            Ok(bytes) => {
                match tokio::task::spawn_blocking(move || tile::parse_tile(&bytes)).await {
                    Ok(parsed) => parsed,
                    Err(e) => Err(Error::Worker(format!("parse task failed: {e}"))),
                }
            }
            Err(e) => Err(e),
        };
        TileResult {
            node: request.node,
            generation: request.generation,
            result,
        }
    }

    /// Dispatch a load, taking a worker slot.
    ///
    /// Returns `false` without side effects when the pool is exhausted.
    pub fn request(&mut self, request: LoadRequest) -> bool {
        if self.available == 0 {
            return false;
        }
        self.available -= 1;
        self.request_tx
            .send(request)
            .expect("tile worker loop terminated");
        true
    }

    /// Drain completed tile loads (non-blocking), returning their slots.
    pub fn poll_results(&mut self) -> Vec<TileResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.result_rx.try_recv() {
            self.available = (self.available + 1).min(self.worker_count);
            results.push(result);
        }
        results
    }

    /// Start an asynchronous image decode.
    pub fn decode_image(&self, job: ImageJob) {
        let tx = self.image_tx.clone();
        self.handle.spawn_blocking(move || {
            let result = decode_image_bytes(&job.bytes);
            let _ = tx.send(ImageResult {
                node: job.node,
                generation: job.generation,
                name: job.name,
                result,
            });
        });
    }

    /// Drain completed image decodes (non-blocking).
    pub fn poll_images(&mut self) -> Vec<ImageResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.image_rx.try_recv() {
            results.push(result);
        }
        results
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Worker slots currently free
    pub fn available_workers(&self) -> usize {
        self.available
    }
}

fn decode_image_bytes(bytes: &[u8]) -> Result<DecodedImage> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| Error::ImageDecode(e.to_string()))?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(DecodedImage {
        width,
        height,
        rgba: rgba.into_raw(),
    })
}
