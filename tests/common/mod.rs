//! Shared test support: a minimal container writer and the delta encoders
//! that mirror the crate's restoration routines. Test-only; the crate
//! itself never authors containers.

#![allow(dead_code)]

use pagedmesh::codec::lzma;
use pagedmesh::mesh::container::{
    CompressionMethod, CHUNK_ATTR, CHUNK_GRID_HEADER, CHUNK_GRID_INDICES, CHUNK_INDICES,
    CHUNK_NORMALS, CHUNK_UV, CHUNK_VERTICES, FORMAT_VERSION, MAGIC,
};
use pagedmesh::mesh::interleave;

pub const FLAG_HAS_NORMALS: u32 = 0x0000_0001;

#[derive(Clone, Debug)]
pub struct UvMapSpec {
    pub name: String,
    pub file_name: String,
    pub uv: Vec<f32>,
    pub precision: f32,
}

#[derive(Clone, Debug)]
pub struct AttrMapSpec {
    pub name: String,
    pub attr: Vec<f32>,
    pub precision: f32,
}

/// Source arrays for a container under test
#[derive(Clone, Debug, Default)]
pub struct SourceMesh {
    pub indices: Vec<u32>,
    pub positions: Vec<f32>,
    pub normals: Option<Vec<f32>>,
    pub uv_maps: Vec<UvMapSpec>,
    pub attr_maps: Vec<AttrMapSpec>,
    pub comment: String,
}

impl SourceMesh {
    pub fn vertex_count(&self) -> u32 {
        (self.positions.len() / 3) as u32
    }

    pub fn triangle_count(&self) -> u32 {
        (self.indices.len() / 3) as u32
    }
}

/// Spatial quantization parameters for MG2 writing
#[derive(Clone, Debug)]
pub struct GridSpec {
    pub lower: [f32; 3],
    pub upper: [f32; 3],
    pub div: [u32; 3],
    pub vertex_precision: f32,
    pub normal_precision: f32,
}

impl GridSpec {
    fn size(&self, axis: usize) -> f64 {
        (f64::from(self.upper[axis]) - f64::from(self.lower[axis])) / f64::from(self.div[axis])
    }
}

// --- byte-level writers ---

pub fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub fn push_f32(out: &mut Vec<u8>, value: f32) {
    push_u32(out, value.to_bits());
}

pub fn push_string(out: &mut Vec<u8>, value: &str) {
    push_u32(out, value.len() as u32);
    out.extend(value.chars().map(|c| c as u8));
}

fn push_header(out: &mut Vec<u8>, mesh: &SourceMesh, method: CompressionMethod) {
    push_u32(out, MAGIC);
    push_u32(out, FORMAT_VERSION as u32);
    push_u32(out, method.tag());
    push_u32(out, mesh.vertex_count());
    push_u32(out, mesh.triangle_count());
    push_u32(out, mesh.uv_maps.len() as u32);
    push_u32(out, mesh.attr_maps.len() as u32);
    push_u32(out, if mesh.normals.is_some() { FLAG_HAS_NORMALS } else { 0 });
    push_string(out, &mesh.comment);
}

/// Interleave + entropy-code one chunk payload with its packed-size field.
fn push_packed(out: &mut Vec<u8>, words: &[u32], component_count: usize) {
    let packed = interleave::interleave(words, component_count);
    let compressed = lzma::compress(&packed);
    push_u32(out, compressed.len() as u32);
    out.extend_from_slice(&compressed);
}

// --- delta encoders (inverses of the crate's restore routines) ---

pub fn delta_encode_indices(indices: &[u32]) -> Vec<u32> {
    let mut out = indices.to_vec();
    let len = out.len();
    let mut i = len.saturating_sub(3);
    while i >= 3 {
        out[i + 2] = indices[i + 2].wrapping_sub(indices[i]);
        if indices[i] == indices[i - 3] {
            out[i + 1] = indices[i + 1].wrapping_sub(indices[i - 2]);
        } else {
            out[i + 1] = indices[i + 1].wrapping_sub(indices[i]);
        }
        out[i] = indices[i].wrapping_sub(indices[i - 3]);
        i -= 3;
    }
    if len > 0 {
        out[2] = indices[2].wrapping_sub(indices[0]);
        out[1] = indices[1].wrapping_sub(indices[0]);
    }
    out
}

pub fn zigzag_encode(value: i64) -> u32 {
    if value < 0 {
        ((-value as u32) << 1) - 1
    } else {
        (value as u32) << 1
    }
}

/// Per-component zig-zag deltas against the channel precision.
pub fn delta_encode_map(values: &[f32], component_count: usize, precision: f32) -> Vec<u32> {
    let mut out = vec![0u32; values.len()];
    for start in 0..component_count {
        let mut prev = 0i64;
        let mut j = start;
        while j < values.len() {
            let quantized = (f64::from(values[j]) / f64::from(precision)).round() as i64;
            out[j] = zigzag_encode(quantized - prev);
            prev = quantized;
            j += component_count;
        }
    }
    out
}

// --- container writers ---

pub fn write_raw(mesh: &SourceMesh) -> Vec<u8> {
    let mut out = Vec::new();
    push_header(&mut out, mesh, CompressionMethod::Raw);

    push_u32(&mut out, CHUNK_INDICES);
    for &i in &mesh.indices {
        push_u32(&mut out, i);
    }
    push_u32(&mut out, CHUNK_VERTICES);
    for &v in &mesh.positions {
        push_f32(&mut out, v);
    }
    if let Some(normals) = &mesh.normals {
        push_u32(&mut out, CHUNK_NORMALS);
        for &v in normals {
            push_f32(&mut out, v);
        }
    }
    for uv in &mesh.uv_maps {
        push_u32(&mut out, CHUNK_UV);
        push_string(&mut out, &uv.name);
        push_string(&mut out, &uv.file_name);
        for &v in &uv.uv {
            push_f32(&mut out, v);
        }
    }
    for attr in &mesh.attr_maps {
        push_u32(&mut out, CHUNK_ATTR);
        push_string(&mut out, &attr.name);
        for &v in &attr.attr {
            push_f32(&mut out, v);
        }
    }
    out
}

pub fn write_mg1(mesh: &SourceMesh) -> Vec<u8> {
    let mut out = Vec::new();
    push_header(&mut out, mesh, CompressionMethod::Mg1);

    push_u32(&mut out, CHUNK_INDICES);
    push_packed(&mut out, &delta_encode_indices(&mesh.indices), 3);

    push_u32(&mut out, CHUNK_VERTICES);
    let position_bits: Vec<u32> = mesh.positions.iter().map(|v| v.to_bits()).collect();
    push_packed(&mut out, &position_bits, 1);

    if let Some(normals) = &mesh.normals {
        push_u32(&mut out, CHUNK_NORMALS);
        let normal_bits: Vec<u32> = normals.iter().map(|v| v.to_bits()).collect();
        push_packed(&mut out, &normal_bits, 3);
    }
    for uv in &mesh.uv_maps {
        push_u32(&mut out, CHUNK_UV);
        push_string(&mut out, &uv.name);
        push_string(&mut out, &uv.file_name);
        let bits: Vec<u32> = uv.uv.iter().map(|v| v.to_bits()).collect();
        push_packed(&mut out, &bits, 2);
    }
    for attr in &mesh.attr_maps {
        push_u32(&mut out, CHUNK_ATTR);
        push_string(&mut out, &attr.name);
        let bits: Vec<u32> = attr.attr.iter().map(|v| v.to_bits()).collect();
        push_packed(&mut out, &bits, 4);
    }
    out
}

/// Quantize vertices onto the grid. Vertices must already be sorted by
/// grid index, with non-decreasing x-residuals inside each cell (the
/// layout real exporters produce).
fn quantize_vertices(mesh: &SourceMesh, grid: &GridSpec) -> (Vec<u32>, Vec<u32>) {
    let vertex_count = mesh.vertex_count() as usize;
    let precision = f64::from(grid.vertex_precision);
    let mut grid_indices = Vec::with_capacity(vertex_count);
    let mut residuals = vec![0u32; vertex_count * 3];

    let mut prev_grid_idx: Option<u32> = None;
    let mut prev_x_residual = 0u64;

    for v in 0..vertex_count {
        let mut cell = [0u32; 3];
        let mut residual = [0u64; 3];
        for axis in 0..3 {
            let value = f64::from(mesh.positions[v * 3 + axis]);
            let offset = value - f64::from(grid.lower[axis]);
            let size = grid.size(axis);
            let c = ((offset / size).floor() as i64)
                .clamp(0, i64::from(grid.div[axis]) - 1) as u32;
            cell[axis] = c;
            let r = ((offset - f64::from(c) * size) / precision).round();
            assert!(r >= 0.0, "vertex {v} axis {axis} has a negative residual");
            residual[axis] = r as u64;
        }

        let grid_idx = cell[0] + grid.div[0] * (cell[1] + grid.div[1] * cell[2]);
        assert!(
            prev_grid_idx.is_none_or(|prev| prev <= grid_idx),
            "vertices must be sorted by grid index"
        );

        // The x residual continues the delta chain inside a shared cell
        if prev_grid_idx == Some(grid_idx) {
            assert!(
                residual[0] >= prev_x_residual,
                "x residuals must be non-decreasing inside a cell"
            );
            residuals[v * 3] = (residual[0] - prev_x_residual) as u32;
        } else {
            residuals[v * 3] = residual[0] as u32;
        }
        residuals[v * 3 + 1] = residual[1] as u32;
        residuals[v * 3 + 2] = residual[2] as u32;

        prev_x_residual = residual[0];
        prev_grid_idx = Some(grid_idx);
        grid_indices.push(grid_idx);
    }

    (grid_indices, residuals)
}

/// Normals encoded on the phi == 0 fast path: `ro` scales the smooth
/// normal directly, so sources whose normals equal the smooth normals
/// round-trip exactly.
fn quantize_normals(normal_count: usize, normal_precision: f32) -> Vec<u32> {
    let ro = (1.0 / f64::from(normal_precision)).round() as u32;
    let mut out = vec![0u32; normal_count * 3];
    for v in 0..normal_count {
        out[v * 3] = ro;
    }
    out
}

pub fn write_mg2(mesh: &SourceMesh, grid: &GridSpec) -> Vec<u8> {
    let mut out = Vec::new();
    push_header(&mut out, mesh, CompressionMethod::Mg2);

    push_u32(&mut out, CHUNK_GRID_HEADER);
    push_f32(&mut out, grid.vertex_precision);
    push_f32(&mut out, grid.normal_precision);
    for axis in 0..3 {
        push_f32(&mut out, grid.lower[axis]);
    }
    for axis in 0..3 {
        push_f32(&mut out, grid.upper[axis]);
    }
    for axis in 0..3 {
        push_u32(&mut out, grid.div[axis]);
    }

    let (grid_indices, residuals) = quantize_vertices(mesh, grid);

    push_u32(&mut out, CHUNK_VERTICES);
    push_packed(&mut out, &residuals, 3);

    push_u32(&mut out, CHUNK_GRID_INDICES);
    let mut grid_deltas = grid_indices.clone();
    for i in (1..grid_deltas.len()).rev() {
        grid_deltas[i] = grid_deltas[i].wrapping_sub(grid_deltas[i - 1]);
    }
    push_packed(&mut out, &grid_deltas, 1);

    push_u32(&mut out, CHUNK_INDICES);
    push_packed(&mut out, &delta_encode_indices(&mesh.indices), 3);

    if mesh.normals.is_some() {
        push_u32(&mut out, CHUNK_NORMALS);
        let quantized = quantize_normals(mesh.vertex_count() as usize, grid.normal_precision);
        push_packed(&mut out, &quantized, 3);
    }
    for uv in &mesh.uv_maps {
        push_u32(&mut out, CHUNK_UV);
        push_string(&mut out, &uv.name);
        push_string(&mut out, &uv.file_name);
        push_f32(&mut out, uv.precision);
        push_packed(&mut out, &delta_encode_map(&uv.uv, 2, uv.precision), 2);
    }
    for attr in &mesh.attr_maps {
        push_u32(&mut out, CHUNK_ATTR);
        push_string(&mut out, &attr.name);
        push_f32(&mut out, attr.precision);
        push_packed(&mut out, &delta_encode_map(&attr.attr, 4, attr.precision), 4);
    }
    out
}

// --- tile payload assembly ---

/// Head container (no geometry) carrying the tile manifest, followed by
/// the named files back-to-back.
pub fn write_tile(files: &[(&str, Vec<u8>)], nodes_json: &str) -> Vec<u8> {
    let sizes: Vec<String> = files.iter().map(|(_, d)| d.len().to_string()).collect();
    let names: Vec<String> = files.iter().map(|(n, _)| format!("\"{n}\"")).collect();
    let comment = format!(
        "{{\"size\":[{}],\"name\":[{}],\"node\":{}}}",
        sizes.join(","),
        names.join(","),
        nodes_json
    );

    let head = SourceMesh {
        comment,
        ..Default::default()
    };
    let mut tile = write_raw(&head);
    for (_, data) in files {
        tile.extend_from_slice(data);
    }
    tile
}

/// A tiny PNG with a solid color, for the image pipeline.
pub fn write_png(width: u32, height: u32) -> Vec<u8> {
    let mut png = Vec::new();
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([90, 120, 150, 255]));
    img.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();
    png
}
