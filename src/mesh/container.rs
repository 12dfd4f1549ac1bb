//! Mesh container header and body
//!
//! A container is a fixed header followed by tagged chunks. The body's
//! typed buffers all live in one contiguous word allocation carved by
//! offset, sized up front from the header counts; buffer views reinterpret
//! word ranges as `u32` or `f32` slices.

use std::ops::Range;

use crate::core::{Error, Result};

use super::reader;
use super::stream::Reader;

/// Four-character chunk tag as a little-endian u32
pub const fn fourcc(tag: &[u8; 4]) -> u32 {
    u32::from_le_bytes(*tag)
}

pub const MAGIC: u32 = fourcc(b"OCTM");
pub const FORMAT_VERSION: i32 = 5;

pub const CHUNK_INDICES: u32 = fourcc(b"INDX");
pub const CHUNK_VERTICES: u32 = fourcc(b"VERT");
pub const CHUNK_NORMALS: u32 = fourcc(b"NORM");
pub const CHUNK_UV: u32 = fourcc(b"TEXC");
pub const CHUNK_ATTR: u32 = fourcc(b"ATTR");
pub const CHUNK_GRID_INDICES: u32 = fourcc(b"GIDX");
pub const CHUNK_GRID_HEADER: u32 = fourcc(b"MG2H");

const FLAG_HAS_NORMALS: u32 = 0x0000_0001;

// Upper bound on the body allocation, in words. Headers promising more
// than this are treated as corrupt rather than honored.
const MAX_BODY_WORDS: usize = 1 << 28;

/// Chunk compression scheme, tagged in the header
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompressionMethod {
    /// Literal packed values
    Raw,
    /// Entropy-coded byte planes with index delta prediction
    Mg1,
    /// Mg1 plus spatial-grid vertex quantization and tangent-space normals
    Mg2,
}

impl CompressionMethod {
    pub const fn tag(self) -> u32 {
        match self {
            Self::Raw => 0x0057_4152,
            Self::Mg1 => 0x0031_474D,
            Self::Mg2 => 0x0032_474D,
        }
    }

    fn from_tag(tag: u32) -> Result<Self> {
        match tag {
            t if t == Self::Raw.tag() => Ok(Self::Raw),
            t if t == Self::Mg1.tag() => Ok(Self::Mg1),
            t if t == Self::Mg2.tag() => Ok(Self::Mg2),
            other => Err(Error::Format(format!(
                "unknown compression method tag {other:#010x}"
            ))),
        }
    }
}

/// Parsed container header; immutable once read
#[derive(Clone, Debug)]
pub struct MeshHeader {
    pub file_format: i32,
    pub compression_method: CompressionMethod,
    pub vertex_count: u32,
    pub triangle_count: u32,
    pub uv_map_count: u32,
    pub attr_map_count: u32,
    pub flags: u32,
    /// Free-text metadata; carries the JSON scene hints for tiles
    pub comment: String,
}

impl MeshHeader {
    pub fn read(stream: &mut Reader<'_>) -> Result<Self> {
        let magic = stream.read_u32()?;
        if magic != MAGIC {
            return Err(Error::Format(format!("bad magic {magic:#010x}")));
        }
        let file_format = stream.read_i32()?;
        if file_format != FORMAT_VERSION {
            return Err(Error::Format(format!(
                "unsupported format version {file_format}"
            )));
        }
        let compression_method = CompressionMethod::from_tag(stream.read_u32()?)?;
        Ok(Self {
            file_format,
            compression_method,
            vertex_count: stream.read_u32()?,
            triangle_count: stream.read_u32()?,
            uv_map_count: stream.read_u32()?,
            attr_map_count: stream.read_u32()?,
            flags: stream.read_u32()?,
            comment: stream.read_string()?,
        })
    }

    pub fn has_normals(&self) -> bool {
        self.flags & FLAG_HAS_NORMALS != 0
    }
}

/// Named UV channel (2 floats per vertex)
#[derive(Clone, Debug)]
pub struct UvChannel {
    pub name: String,
    pub file_name: String,
    pub(crate) range: Range<usize>,
}

/// Named generic attribute channel (4 floats per vertex)
#[derive(Clone, Debug)]
pub struct AttrChannel {
    pub name: String,
    pub(crate) range: Range<usize>,
}

/// Container body: every buffer is a range of one shared word allocation
#[derive(Debug)]
pub struct MeshBody {
    pub(crate) words: Vec<u32>,
    pub(crate) indices: Range<usize>,
    pub(crate) positions: Range<usize>,
    pub(crate) normals: Option<Range<usize>>,
    pub(crate) uv: Vec<UvChannel>,
    pub(crate) attr: Vec<AttrChannel>,
}

impl MeshBody {
    pub(crate) fn allocate(header: &MeshHeader) -> Result<Self> {
        let i = header.triangle_count as usize * 3;
        let v = header.vertex_count as usize * 3;
        let n = if header.has_normals() { v } else { 0 };
        let u = header.vertex_count as usize * 2;
        let a = header.vertex_count as usize * 4;

        let total = i
            .checked_add(v)
            .and_then(|t| t.checked_add(n))
            .and_then(|t| t.checked_add(u.checked_mul(header.uv_map_count as usize)?))
            .and_then(|t| t.checked_add(a.checked_mul(header.attr_map_count as usize)?))
            .ok_or_else(|| Error::Format("body size overflow".into()))?;
        if total > MAX_BODY_WORDS {
            return Err(Error::Format(format!("body of {total} words is too large")));
        }

        let indices = 0..i;
        let positions = i..i + v;
        let normals = header.has_normals().then_some(i + v..i + v + n);
        let mut offset = i + v + n;

        // Channel names are filled in by the chunk readers.
        let uv = (0..header.uv_map_count)
            .map(|_| {
                let range = offset..offset + u;
                offset += u;
                UvChannel {
                    name: String::new(),
                    file_name: String::new(),
                    range,
                }
            })
            .collect();
        let attr = (0..header.attr_map_count)
            .map(|_| {
                let range = offset..offset + a;
                offset += a;
                AttrChannel {
                    name: String::new(),
                    range,
                }
            })
            .collect();

        Ok(Self {
            words: vec![0; total],
            indices,
            positions,
            normals,
            uv,
            attr,
        })
    }

    /// Triangle indices, 3 per triangle
    pub fn indices(&self) -> &[u32] {
        &self.words[self.indices.clone()]
    }

    /// Vertex positions, 3 floats per vertex
    pub fn positions(&self) -> &[f32] {
        bytemuck::cast_slice(&self.words[self.positions.clone()])
    }

    /// Vertex normals, 3 floats per vertex, when present
    pub fn normals(&self) -> Option<&[f32]> {
        self.normals
            .clone()
            .map(|r| bytemuck::cast_slice(&self.words[r]))
    }

    pub fn uv_channels(&self) -> &[UvChannel] {
        &self.uv
    }

    pub fn attr_channels(&self) -> &[AttrChannel] {
        &self.attr
    }

    /// UV coordinates of channel `index`, 2 floats per vertex
    pub fn uv(&self, index: usize) -> &[f32] {
        bytemuck::cast_slice(&self.words[self.uv[index].range.clone()])
    }

    /// Attribute values of channel `index`, 4 floats per vertex
    pub fn attr(&self, index: usize) -> &[f32] {
        bytemuck::cast_slice(&self.words[self.attr[index].range.clone()])
    }
}

/// A fully decoded mesh container
#[derive(Debug)]
pub struct MeshFile {
    pub header: MeshHeader,
    pub body: MeshBody,
}

impl MeshFile {
    /// Decode a container from its wire bytes.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut stream = Reader::new(data);
        Self::decode_from(&mut stream)
    }

    /// Decode a container from a cursor, leaving it positioned just past
    /// the container. Tiles concatenate several files into one payload.
    pub fn decode_from(stream: &mut Reader<'_>) -> Result<Self> {
        let header = MeshHeader::read(stream)?;
        let mut body = MeshBody::allocate(&header)?;
        reader::read_body(stream, &header, &mut body)?;
        Ok(Self { header, body })
    }
}
