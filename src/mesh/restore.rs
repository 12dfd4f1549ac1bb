//! Restoration of delta/quantized encodings
//!
//! The compressed readers produce raw integer words; these routines undo
//! the delta, zig-zag and spatial-grid predictions and write the final
//! float values back into the shared word store.

/// Undo triangle-index delta coding in place.
///
/// The first triangle's first index is absolute and its other two are
/// deltas from it. For every later triangle the first index is a delta
/// from the previous triangle's first index; the second index is a delta
/// from the previous triangle's second index when the two first indices
/// are equal (a shared-edge fan, common in coherent exports) and from the
/// own first index otherwise; the third is always a delta from the own
/// first index.
pub fn restore_indices(indices: &mut [u32]) {
    let len = indices.len();
    if len > 0 {
        indices[2] = indices[2].wrapping_add(indices[0]);
        indices[1] = indices[1].wrapping_add(indices[0]);
    }
    let mut i = 3;
    while i < len {
        indices[i] = indices[i].wrapping_add(indices[i - 3]);

        if indices[i] == indices[i - 3] {
            indices[i + 1] = indices[i + 1].wrapping_add(indices[i - 2]);
        } else {
            indices[i + 1] = indices[i + 1].wrapping_add(indices[i]);
        }

        indices[i + 2] = indices[i + 2].wrapping_add(indices[i]);
        i += 3;
    }
}

/// Undo grid-index delta coding (running sum) in place.
pub fn restore_grid_indices(grid_indices: &mut [u32]) {
    for i in 1..grid_indices.len() {
        grid_indices[i] = grid_indices[i].wrapping_add(grid_indices[i - 1]);
    }
}

/// Spatial quantization grid for vertex reconstruction
#[derive(Clone, Debug)]
pub struct Grid {
    pub lower: [f32; 3],
    pub div: [u32; 3],
    /// Per-axis cell size, (upper - lower) / div
    pub size: [f64; 3],
}

/// Reconstruct world-space vertex positions from grid cells and residuals.
///
/// `words` holds one integer residual triple per vertex and receives the
/// float bits. Grid indices are linearized z-major; the x residual of
/// consecutive vertices in the same cell continues the delta chain instead
/// of resetting, which recovers fine sub-cell precision cheaply.
pub fn restore_vertices(words: &mut [u32], grid: &Grid, grid_indices: &[u32], precision: f32) {
    let ydiv = u64::from(grid.div[0]);
    let zdiv = ydiv * u64::from(grid.div[1]);
    let precision = f64::from(precision);

    let mut prev_grid_idx: Option<u32> = None;
    let mut prev_delta: u64 = 0;

    for (i, &grid_idx) in grid_indices.iter().enumerate() {
        let j = i * 3;

        let mut x = u64::from(grid_idx);
        let z = x / zdiv;
        x -= z * zdiv;
        let y = x / ydiv;
        x -= y * ydiv;

        let mut delta = u64::from(words[j]);
        if prev_grid_idx == Some(grid_idx) {
            delta += prev_delta;
        }

        words[j] = ((f64::from(grid.lower[0]) + x as f64 * grid.size[0]
            + precision * delta as f64) as f32)
            .to_bits();
        words[j + 1] = ((f64::from(grid.lower[1]) + y as f64 * grid.size[1]
            + precision * f64::from(words[j + 1])) as f32)
            .to_bits();
        words[j + 2] = ((f64::from(grid.lower[2]) + z as f64 * grid.size[2]
            + precision * f64::from(words[j + 2])) as f32)
            .to_bits();

        prev_grid_idx = Some(grid_idx);
        prev_delta = delta;
    }
}

/// Unweighted per-vertex face-normal averages from positions and indices.
///
/// Degenerate faces and isolated vertices yield near-zero vectors; their
/// normalization is skipped so the raw accumulation survives.
pub fn calc_smooth_normals(indices: &[u32], positions: &[f32]) -> Vec<f32> {
    let mut smooth = vec![0f32; positions.len()];

    let mut i = 0;
    while i + 2 < indices.len() {
        let ix = indices[i] as usize * 3;
        let iy = indices[i + 1] as usize * 3;
        let iz = indices[i + 2] as usize * 3;
        i += 3;

        let v1x = f64::from(positions[iy]) - f64::from(positions[ix]);
        let v2x = f64::from(positions[iz]) - f64::from(positions[ix]);
        let v1y = f64::from(positions[iy + 1]) - f64::from(positions[ix + 1]);
        let v2y = f64::from(positions[iz + 1]) - f64::from(positions[ix + 1]);
        let v1z = f64::from(positions[iy + 2]) - f64::from(positions[ix + 2]);
        let v2z = f64::from(positions[iz + 2]) - f64::from(positions[ix + 2]);

        let mut nx = v1y * v2z - v1z * v2y;
        let mut ny = v1z * v2x - v1x * v2z;
        let mut nz = v1x * v2y - v1y * v2x;

        let len = (nx * nx + ny * ny + nz * nz).sqrt();
        if len > 1e-10 {
            nx /= len;
            ny /= len;
            nz /= len;
        }

        for (base, d) in [(ix, (nx, ny, nz)), (iy, (nx, ny, nz)), (iz, (nx, ny, nz))] {
            smooth[base] = (f64::from(smooth[base]) + d.0) as f32;
            smooth[base + 1] = (f64::from(smooth[base + 1]) + d.1) as f32;
            smooth[base + 2] = (f64::from(smooth[base + 2]) + d.2) as f32;
        }
    }

    let mut i = 0;
    while i + 2 < smooth.len() {
        let len = (f64::from(smooth[i]) * f64::from(smooth[i])
            + f64::from(smooth[i + 1]) * f64::from(smooth[i + 1])
            + f64::from(smooth[i + 2]) * f64::from(smooth[i + 2]))
        .sqrt();
        if len > 1e-10 {
            smooth[i] = (f64::from(smooth[i]) / len) as f32;
            smooth[i + 1] = (f64::from(smooth[i + 1]) / len) as f32;
            smooth[i + 2] = (f64::from(smooth[i + 2]) / len) as f32;
        }
        i += 3;
    }

    smooth
}

/// Reconstruct normals from quantized spherical offsets around the smooth
/// normal basis.
///
/// Each vertex stores magnitude `ro`, polar step `phi` and azimuth index
/// `theta`. `phi == 0` collapses to a pure scaling of the smooth normal.
/// The in-plane basis is built from the smooth normal with an arbitrary
/// orthogonal vector; a near-zero basis length skips normalization.
pub fn restore_normals(words: &mut [u32], smooth: &[f32], precision: f32) {
    const PI_DIV_2: f64 = std::f64::consts::PI * 0.5;
    let precision = f64::from(precision);

    let mut i = 0;
    while i + 2 < words.len() {
        let ro = f64::from(words[i]) * precision;
        let phi_int = words[i + 1];

        if phi_int == 0 {
            words[i] = ((f64::from(smooth[i]) * ro) as f32).to_bits();
            words[i + 1] = ((f64::from(smooth[i + 1]) * ro) as f32).to_bits();
            words[i + 2] = ((f64::from(smooth[i + 2]) * ro) as f32).to_bits();
        } else {
            let theta = if phi_int <= 4 {
                (f64::from(words[i + 2]) - 2.0) * PI_DIV_2
            } else {
                (f64::from(words[i + 2]) * 4.0 / f64::from(phi_int) - 2.0) * PI_DIV_2
            };

            let phi = f64::from(phi_int) * (precision * PI_DIV_2);
            let sin_phi = ro * phi.sin();

            let nx = sin_phi * theta.cos();
            let ny = sin_phi * theta.sin();
            let nz = ro * phi.cos();

            let sx = f64::from(smooth[i]);
            let sy = f64::from(smooth[i + 1]);
            let sz = f64::from(smooth[i + 2]);

            let mut bz = sy;
            let mut by = sx - sz;

            let len = (2.0 * bz * bz + by * by).sqrt();
            if len > 1e-20 {
                by /= len;
                bz /= len;
            }

            words[i] = ((sx * nz + (sy * bz - sz * by) * ny - bz * nx) as f32).to_bits();
            words[i + 1] = ((sy * nz - (sz + sx) * bz * ny + by * nx) as f32).to_bits();
            words[i + 2] = ((sz * nz + (sx * by + sy * bz) * ny + bz * nx) as f32).to_bits();
        }
        i += 3;
    }
}

/// Undo per-component zig-zag delta coding for a UV or attribute channel.
///
/// Deltas accumulate independently per component index (mod the channel
/// width); each restored integer is descaled by the channel precision.
pub fn restore_map(words: &mut [u32], component_count: usize, precision: f32) {
    let len = words.len();
    let precision = f64::from(precision);

    for start in 0..component_count {
        let mut delta: i64 = 0;

        let mut j = start;
        while j < len {
            let value = words[j];

            delta += if value & 1 != 0 {
                -((i64::from(value) + 1) >> 1)
            } else {
                i64::from(value >> 1)
            };

            words[j] = ((delta as f64 * precision) as f32).to_bits();
            j += component_count;
        }
    }
}
