//! Chunk readers for the three compression schemes

use std::ops::Range;

use crate::codec::lzma;
use crate::core::{Error, Result};

use super::container::{
    CompressionMethod, MeshBody, MeshHeader, CHUNK_ATTR, CHUNK_GRID_HEADER, CHUNK_GRID_INDICES,
    CHUNK_INDICES, CHUNK_NORMALS, CHUNK_UV, CHUNK_VERTICES,
};
use super::interleave;
use super::restore::{self, Grid};
use super::stream::Reader;

/// Spatial quantization header, present only in MG2 containers.
/// Consumed during decode, never retained.
#[derive(Clone, Debug)]
struct GridHeader {
    vertex_precision: f32,
    normal_precision: f32,
    grid: Grid,
}

impl GridHeader {
    fn read(stream: &mut Reader<'_>) -> Result<Self> {
        expect_chunk(stream, CHUNK_GRID_HEADER)?;
        let vertex_precision = stream.read_f32()?;
        let normal_precision = stream.read_f32()?;
        let lower = [stream.read_f32()?, stream.read_f32()?, stream.read_f32()?];
        let upper = [stream.read_f32()?, stream.read_f32()?, stream.read_f32()?];
        let div = [stream.read_u32()?, stream.read_u32()?, stream.read_u32()?];
        if div.iter().any(|&d| d == 0) {
            return Err(Error::Format("grid division count is zero".into()));
        }

        let size = std::array::from_fn(|axis| {
            (f64::from(upper[axis]) - f64::from(lower[axis])) / f64::from(div[axis])
        });
        Ok(Self {
            vertex_precision,
            normal_precision,
            grid: Grid { lower, div, size },
        })
    }
}

fn expect_chunk(stream: &mut Reader<'_>, expected: u32) -> Result<()> {
    let tag = stream.read_u32()?;
    if tag != expected {
        let name = expected.to_le_bytes();
        return Err(Error::Format(format!(
            "expected {} chunk, found tag {tag:#010x}",
            name.map(|b| b as char).iter().collect::<String>()
        )));
    }
    Ok(())
}

/// Entropy-decode one chunk payload into the given word range.
///
/// The advisory packed-size field is read but not trusted; the stream
/// advances exactly as far as the entropy decoder consumes.
fn read_packed(
    stream: &mut Reader<'_>,
    body: &mut MeshBody,
    range: Range<usize>,
    component_count: usize,
) -> Result<()> {
    let _packed_size = stream.read_u32()?;
    let packed = lzma::decompress(stream, Some(range.len() * 4))?;
    interleave::deinterleave(&packed, component_count, &mut body.words[range]);
    Ok(())
}

pub(crate) fn read_body(
    stream: &mut Reader<'_>,
    header: &MeshHeader,
    body: &mut MeshBody,
) -> Result<()> {
    match header.compression_method {
        CompressionMethod::Raw => read_raw(stream, body),
        CompressionMethod::Mg1 => read_mg1(stream, body),
        CompressionMethod::Mg2 => read_mg2(stream, header, body),
    }
}

fn read_raw(stream: &mut Reader<'_>, body: &mut MeshBody) -> Result<()> {
    expect_chunk(stream, CHUNK_INDICES)?;
    for i in body.indices.clone() {
        body.words[i] = stream.read_u32()?;
    }

    expect_chunk(stream, CHUNK_VERTICES)?;
    for i in body.positions.clone() {
        body.words[i] = stream.read_u32()?;
    }

    if let Some(range) = body.normals.clone() {
        expect_chunk(stream, CHUNK_NORMALS)?;
        for i in range {
            body.words[i] = stream.read_u32()?;
        }
    }

    for channel in 0..body.uv.len() {
        expect_chunk(stream, CHUNK_UV)?;
        body.uv[channel].name = stream.read_string()?;
        body.uv[channel].file_name = stream.read_string()?;
        for i in body.uv[channel].range.clone() {
            body.words[i] = stream.read_u32()?;
        }
    }

    for channel in 0..body.attr.len() {
        expect_chunk(stream, CHUNK_ATTR)?;
        body.attr[channel].name = stream.read_string()?;
        for i in body.attr[channel].range.clone() {
            body.words[i] = stream.read_u32()?;
        }
    }

    Ok(())
}

fn read_mg1(stream: &mut Reader<'_>, body: &mut MeshBody) -> Result<()> {
    expect_chunk(stream, CHUNK_INDICES)?;
    let indices = body.indices.clone();
    read_packed(stream, body, indices.clone(), 3)?;
    restore::restore_indices(&mut body.words[indices]);

    expect_chunk(stream, CHUNK_VERTICES)?;
    let positions = body.positions.clone();
    read_packed(stream, body, positions, 1)?;

    if let Some(range) = body.normals.clone() {
        expect_chunk(stream, CHUNK_NORMALS)?;
        read_packed(stream, body, range, 3)?;
    }

    for channel in 0..body.uv.len() {
        expect_chunk(stream, CHUNK_UV)?;
        body.uv[channel].name = stream.read_string()?;
        body.uv[channel].file_name = stream.read_string()?;
        let range = body.uv[channel].range.clone();
        read_packed(stream, body, range, 2)?;
    }

    for channel in 0..body.attr.len() {
        expect_chunk(stream, CHUNK_ATTR)?;
        body.attr[channel].name = stream.read_string()?;
        let range = body.attr[channel].range.clone();
        read_packed(stream, body, range, 4)?;
    }

    Ok(())
}

fn read_mg2(stream: &mut Reader<'_>, header: &MeshHeader, body: &mut MeshBody) -> Result<()> {
    let grid_header = GridHeader::read(stream)?;

    expect_chunk(stream, CHUNK_VERTICES)?;
    let positions = body.positions.clone();
    read_packed(stream, body, positions.clone(), 3)?;

    expect_chunk(stream, CHUNK_GRID_INDICES)?;
    let _packed_size = stream.read_u32()?;
    let mut grid_indices = vec![0u32; header.vertex_count as usize];
    let packed = lzma::decompress(stream, Some(grid_indices.len() * 4))?;
    interleave::deinterleave(&packed, 1, &mut grid_indices);
    restore::restore_grid_indices(&mut grid_indices);

    restore::restore_vertices(
        &mut body.words[positions],
        &grid_header.grid,
        &grid_indices,
        grid_header.vertex_precision,
    );

    expect_chunk(stream, CHUNK_INDICES)?;
    let indices = body.indices.clone();
    read_packed(stream, body, indices.clone(), 3)?;
    restore::restore_indices(&mut body.words[indices]);

    if let Some(range) = body.normals.clone() {
        expect_chunk(stream, CHUNK_NORMALS)?;
        read_packed(stream, body, range.clone(), 3)?;

        let smooth = restore::calc_smooth_normals(body.indices(), body.positions());
        restore::restore_normals(
            &mut body.words[range],
            &smooth,
            grid_header.normal_precision,
        );
    }

    for channel in 0..body.uv.len() {
        expect_chunk(stream, CHUNK_UV)?;
        body.uv[channel].name = stream.read_string()?;
        body.uv[channel].file_name = stream.read_string()?;
        let precision = stream.read_f32()?;
        let range = body.uv[channel].range.clone();
        read_packed(stream, body, range.clone(), 2)?;
        restore::restore_map(&mut body.words[range], 2, precision);
    }

    for channel in 0..body.attr.len() {
        expect_chunk(stream, CHUNK_ATTR)?;
        body.attr[channel].name = stream.read_string()?;
        let precision = stream.read_f32()?;
        let range = body.attr[channel].range.clone();
        read_packed(stream, body, range.clone(), 4)?;
        restore::restore_map(&mut body.words[range], 4, precision);
    }

    Ok(())
}
