//! Compressed mesh container decoding
//!
//! Parses the chunked binary container (header, index/vertex/normal/UV/
//! attribute chunks), dispatches to the reader for the header's
//! compression scheme, and reconstructs typed numeric buffers backed by a
//! single contiguous allocation.

pub mod container;
pub mod interleave;
pub mod reader;
pub mod restore;
pub mod stream;

pub use container::{
    AttrChannel, CompressionMethod, MeshBody, MeshFile, MeshHeader, UvChannel,
};
pub use stream::Reader;
