//! Per-node manifests embedded in container comment fields
//!
//! A tile's head container carries the file table and the node array for
//! the whole siblinghood; each geometry container carries its own texture
//! binding and bounding-sphere override.

use serde::Deserialize;

use crate::core::types::Vec3;
use crate::core::{Error, Result};
use crate::math::Sphere;

/// One node of a tile manifest: a sibling with its refinement bounds and
/// child sub-tile URLs
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ManifestNode {
    pub id: Option<String>,
    pub name: Option<String>,
    pub center: Option<[f64; 3]>,
    pub radius: Option<f64>,
    #[serde(rename = "bbMin")]
    pub bb_min: Option<[f64; 3]>,
    #[serde(rename = "bbMax")]
    pub bb_max: Option<[f64; 3]>,
    #[serde(rename = "maxScreenDiameter")]
    pub max_screen_diameter: Option<f64>,
    #[serde(default)]
    pub children: Vec<String>,
}

impl ManifestNode {
    /// Sibling name: `id` with `name` as the legacy fallback.
    pub fn label(&self) -> &str {
        self.id
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or_default()
    }

    /// Bounding sphere from explicit center/radius, derived from the
    /// bounding box (half diagonal) when absent, or a zero sphere.
    pub fn sphere(&self) -> Sphere {
        let center = if let Some(c) = self.center {
            Vec3::new(c[0] as f32, c[1] as f32, c[2] as f32)
        } else if let (Some(lo), Some(hi)) = (self.bb_min, self.bb_max) {
            Vec3::new(
                (0.5 * (lo[0] + hi[0])) as f32,
                (0.5 * (lo[1] + hi[1])) as f32,
                (0.5 * (lo[2] + hi[2])) as f32,
            )
        } else {
            Vec3::ZERO
        };

        let radius = if let Some(r) = self.radius {
            r as f32
        } else if let (Some(lo), Some(hi)) = (self.bb_min, self.bb_max) {
            let dx = hi[0] - lo[0];
            let dy = hi[1] - lo[1];
            let dz = hi[2] - lo[2];
            (0.5 * (dx * dx + dy * dy + dz * dz).sqrt()) as f32
        } else {
            0.0
        };

        Sphere::new(center, radius)
    }
}

/// Tile-level manifest from the head container's comment: the sizes and
/// names of the trailing files, plus the siblinghood's node array
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TileManifest {
    #[serde(default)]
    pub size: Vec<u64>,
    #[serde(default)]
    pub name: Vec<String>,
    #[serde(default)]
    pub node: Vec<ManifestNode>,
}

impl TileManifest {
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::Format(format!("tile manifest: {e}")))
    }
}

/// Geometry-level metadata from a geometry container's comment
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GeometryMeta {
    /// Texture binding name; meshes without one render untextured
    pub texture: Option<String>,
    pub sphere_center: Option<[f64; 3]>,
    pub sphere_radius: Option<f64>,
    /// Name of the sibling this geometry belongs to
    pub node: Option<String>,
}

impl GeometryMeta {
    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(text)
            .map_err(|e| Error::Format(format!("geometry metadata: {e}")))
    }

    pub fn sphere(&self) -> Option<Sphere> {
        match (self.sphere_center, self.sphere_radius) {
            (Some(c), Some(r)) => Some(Sphere::new(
                Vec3::new(c[0] as f32, c[1] as f32, c[2] as f32),
                r as f32,
            )),
            _ => None,
        }
    }
}
