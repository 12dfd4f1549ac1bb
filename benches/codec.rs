use criterion::{criterion_group, criterion_main, Criterion, black_box};

use pagedmesh::codec::lzma;
use pagedmesh::mesh::interleave;
use pagedmesh::mesh::restore;

fn sample_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 7 + i / 64) % 251) as u8).collect()
}

fn sample_words(len: usize) -> Vec<u32> {
    (0..len as u32)
        .map(|i| i.wrapping_mul(0x9E37_79B9) >> 8)
        .collect()
}

/// A long coherent triangle strip, the index pattern the delta coder is
/// tuned for.
fn strip_indices(triangles: usize) -> Vec<u32> {
    let mut indices = Vec::with_capacity(triangles * 3);
    for i in 0..triangles as u32 {
        indices.extend_from_slice(&[i, i + 1, i + 2]);
    }
    indices
}

fn bench_lzma_decompress_64k(c: &mut Criterion) {
    let data = sample_bytes(64 * 1024);
    let compressed = lzma::compress(&data);

    c.bench_function("lzma_decompress_64k", |b| {
        b.iter(|| {
            let mut stream: &[u8] = black_box(&compressed);
            lzma::decompress(&mut stream, Some(data.len())).unwrap()
        });
    });
}

fn bench_lzma_compress_64k(c: &mut Criterion) {
    let data = sample_bytes(64 * 1024);

    c.bench_function("lzma_compress_64k", |b| {
        b.iter(|| lzma::compress(black_box(&data)));
    });
}

fn bench_deinterleave_vertices(c: &mut Criterion) {
    // 16k vertices, 3 components each
    let words = sample_words(16 * 1024 * 3);
    let packed = interleave::interleave(&words, 3);
    let mut out = vec![0u32; words.len()];

    c.bench_function("deinterleave_16k_vertices", |b| {
        b.iter(|| {
            interleave::deinterleave(black_box(&packed), 3, black_box(&mut out));
        });
    });
}

fn bench_restore_indices(c: &mut Criterion) {
    let indices = strip_indices(32 * 1024);

    c.bench_function("restore_indices_32k_tris", |b| {
        b.iter(|| {
            let mut work = black_box(&indices).clone();
            restore::restore_indices(&mut work);
            work
        });
    });
}

fn bench_smooth_normals(c: &mut Criterion) {
    // A 128x128 height-field grid of triangles
    let n = 128usize;
    let mut positions = Vec::with_capacity(n * n * 3);
    for y in 0..n {
        for x in 0..n {
            positions.push(x as f32);
            positions.push(y as f32);
            positions.push(((x * 3 + y * 7) % 11) as f32 * 0.1);
        }
    }
    let mut indices = Vec::new();
    for y in 0..n as u32 - 1 {
        for x in 0..n as u32 - 1 {
            let i = y * n as u32 + x;
            indices.extend_from_slice(&[i, i + 1, i + n as u32]);
            indices.extend_from_slice(&[i + 1, i + n as u32 + 1, i + n as u32]);
        }
    }

    c.bench_function("smooth_normals_128_grid", |b| {
        b.iter(|| restore::calc_smooth_normals(black_box(&indices), black_box(&positions)));
    });
}

criterion_group!(
    benches,
    bench_lzma_decompress_64k,
    bench_lzma_compress_64k,
    bench_deinterleave_vertices,
    bench_restore_indices,
    bench_smooth_normals,
);
criterion_main!(benches);
