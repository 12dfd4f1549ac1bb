//! Bounding sphere

use crate::core::types::{Mat4, Vec3};

/// Bounding sphere defined by center and radius
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        // NaN radii show up when manifests carry bad bounds; clamp to a
        // point sphere so frustum tests stay well-defined.
        let radius = if radius.is_nan() { 0.0 } else { radius };
        Self { center, radius }
    }

    /// Transform the sphere by an affine matrix, scaling the radius by the
    /// largest axis scale.
    pub fn transformed(&self, m: &Mat4) -> Sphere {
        let center = m.transform_point3(self.center);
        let scale = m
            .x_axis
            .truncate()
            .length()
            .max(m.y_axis.truncate().length())
            .max(m.z_axis.truncate().length());
        Sphere {
            center,
            radius: self.radius * scale,
        }
    }
}
