//! Tile byte sources
//!
//! The engine fetches tiles through this trait; hosts plug in whatever
//! transport they have (HTTP, object storage). The filesystem source below
//! covers local datasets and tests.

use std::path::PathBuf;

use crate::core::{Error, Result};

/// Asynchronous provider of raw tile bytes, addressed by relative path
pub trait TileSource: Send + Sync + 'static {
    fn fetch(&self, path: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Reads tiles from a directory tree
#[derive(Clone, Debug)]
pub struct DirTileSource {
    base: PathBuf,
}

impl DirTileSource {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &PathBuf {
        &self.base
    }
}

impl TileSource for DirTileSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.base.join(path);
        tokio::fs::read(&full)
            .await
            .map_err(|e| Error::Network(format!("{}: {e}", full.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Tile_000.bin"), b"payload").unwrap();

        let source = DirTileSource::new(dir.path());
        let bytes = source.fetch("Tile_000.bin").await.unwrap();
        assert_eq!(bytes, b"payload");
    }

    #[tokio::test]
    async fn test_fetch_missing_file_is_network_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirTileSource::new(dir.path());
        match source.fetch("missing.bin").await {
            Err(Error::Network(_)) => {}
            other => panic!("expected network error, got {other:?}"),
        }
    }
}
