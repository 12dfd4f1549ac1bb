//! Tile payload parsing
//!
//! A tile is one fetched blob: a head container whose comment JSON lists
//! the sizes and names of the trailing files plus the siblinghood's node
//! array, followed by those files back-to-back. `.ctm` entries are
//! geometry containers and are decoded here (on a worker, off the update
//! path); anything else is an image and passes through as raw bytes for
//! the asynchronous image pipeline.

use rayon::prelude::*;

use crate::core::{Error, Result};
use crate::manifest::{GeometryMeta, ManifestNode, TileManifest};
use crate::mesh::{MeshFile, Reader};

/// One file carried by a tile
#[derive(Debug)]
pub struct TileFile {
    pub name: String,
    pub payload: TilePayload,
}

#[derive(Debug)]
pub enum TilePayload {
    Geometry(DecodedGeometry),
    Image(Vec<u8>),
}

/// A decoded geometry container plus its comment metadata
#[derive(Debug)]
pub struct DecodedGeometry {
    pub file: MeshFile,
    pub meta: GeometryMeta,
}

/// Fully parsed tile: the siblinghood layout and every carried file
#[derive(Debug)]
pub struct TileData {
    pub nodes: Vec<ManifestNode>,
    pub files: Vec<TileFile>,
}

fn is_geometry_name(name: &str) -> bool {
    name.rsplit('.')
        .next()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ctm"))
}

/// Parse a tile blob into its manifest nodes and decoded files.
pub fn parse_tile(bytes: &[u8]) -> Result<TileData> {
    let mut stream = Reader::new(bytes);
    let head = MeshFile::decode_from(&mut stream)?;
    let manifest = TileManifest::parse(&head.header.comment)?;

    if manifest.size.len() != manifest.name.len() {
        return Err(Error::Format(format!(
            "tile file table mismatch: {} sizes, {} names",
            manifest.size.len(),
            manifest.name.len()
        )));
    }

    // Slice the trailing files out of the blob by the declared sizes.
    let mut offset = stream.position();
    let mut slices = Vec::with_capacity(manifest.name.len());
    for (name, &size) in manifest.name.iter().zip(&manifest.size) {
        let size = size as usize;
        let end = offset
            .checked_add(size)
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| {
                Error::Format(format!("tile file {name} extends past the payload"))
            })?;
        slices.push((name.clone(), &bytes[offset..end]));
        offset = end;
    }

    // Geometry containers decode in parallel; images pass through.
    let files = slices
        .into_par_iter()
        .map(|(name, data)| {
            let payload = if is_geometry_name(&name) {
                let file = MeshFile::decode(data)?;
                let meta = GeometryMeta::parse(&file.header.comment)?;
                TilePayload::Geometry(DecodedGeometry { file, meta })
            } else {
                TilePayload::Image(data.to_vec())
            };
            Ok(TileFile { name, payload })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(TileData {
        nodes: manifest.node,
        files,
    })
}
