//! Error types for the streaming client

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    /// Bad magic, unsupported version or unknown compression tag.
    /// Fatal for the tile; never retried.
    #[error("container format error: {0}")]
    Format(String),

    /// Corrupt entropy stream. Fatal for the tile; no partial output is
    /// usable because the index/position arrays would be inconsistent.
    #[error("decompression error: {0}")]
    Decompression(String),

    /// Fetch failed or was aborted. Retryable after the back-off window.
    #[error("network error: {0}")]
    Network(String),

    /// A parse worker died. Retryable after the back-off window.
    #[error("worker error: {0}")]
    Worker(String),

    /// Texture image failed to decode. The tile keeps its geometry and is
    /// marked loaded-with-error.
    #[error("image decode error: {0}")]
    ImageDecode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
