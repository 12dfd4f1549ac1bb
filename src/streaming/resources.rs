//! Pooled renderable resources
//!
//! The rendering library is an external collaborator; the engine only
//! carries plain data records (geometry buffers, decoded texture images,
//! material bindings) and hands them out through pool handles.

use crate::manifest::GeometryMeta;
use crate::math::Sphere;
use crate::mesh::MeshFile;

use super::pool::Handle;

/// Renderable geometry buffers extracted from a decoded container
#[derive(Debug)]
pub struct RenderGeometry {
    pub indices: Vec<u32>,
    pub positions: Vec<f32>,
    pub normals: Option<Vec<f32>>,
    /// First UV channel, when present
    pub uvs: Option<Vec<f32>>,
    /// First attribute channel when named "Color" (4 floats per vertex)
    pub colors: Option<Vec<f32>>,
    /// Texture binding name from the geometry metadata
    pub texture_name: Option<String>,
    pub sphere: Option<Sphere>,
}

impl RenderGeometry {
    /// Build buffers from a decoded container and its metadata.
    pub fn from_mesh(file: &MeshFile, meta: &GeometryMeta) -> Self {
        let body = &file.body;
        let uvs = (!body.uv_channels().is_empty()).then(|| body.uv(0).to_vec());
        let colors = body
            .attr_channels()
            .first()
            .filter(|c| c.name == "Color")
            .map(|_| body.attr(0).to_vec());

        Self {
            indices: body.indices().to_vec(),
            positions: body.positions().to_vec(),
            normals: body.normals().map(<[f32]>::to_vec),
            uvs,
            colors,
            texture_name: meta.texture.clone(),
            sphere: meta.sphere(),
        }
    }

    /// Approximate resident size in bytes
    pub fn byte_size(&self) -> usize {
        4 * (self.indices.len()
            + self.positions.len()
            + self.normals.as_ref().map_or(0, Vec::len)
            + self.uvs.as_ref().map_or(0, Vec::len)
            + self.colors.as_ref().map_or(0, Vec::len))
    }
}

/// Decoded texture image, RGBA8
#[derive(Debug)]
pub struct TextureImage {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Material: a texture binding plus the dimensions charged to the budget
#[derive(Debug)]
pub struct Material {
    pub texture: Handle<TextureImage>,
    pub texture_width: u32,
    pub texture_height: u32,
}
