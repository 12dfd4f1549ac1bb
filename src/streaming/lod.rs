//! Paged-LOD tree nodes
//!
//! A `PagedLod` is one tree position addressable by URL and level. Loading
//! it yields a siblinghood: alternative representations of the same
//! spatial cell, each with its own bounding sphere, refinement threshold,
//! meshes and child subtrees. Nodes are plain records in the node arena;
//! every cross-reference is a pool handle.

use crate::math::Sphere;

use super::pool::Handle;
use super::resources::{Material, RenderGeometry};

/// One mesh of a sibling: geometry plus its (possibly pending) material
#[derive(Debug)]
pub struct SiblingMesh {
    pub geometry: Handle<RenderGeometry>,
    /// Texture binding name; bound to a material once that texture decodes
    pub texture_name: Option<String>,
    pub material: Option<Handle<Material>>,
}

/// One representation within a siblinghood
#[derive(Debug)]
pub struct Sibling {
    pub name: String,
    pub sphere: Sphere,
    /// Maximum allowed on-screen diameter in pixels before refinement
    pub max_lod_range: f32,
    pub visible: bool,
    /// True while this sibling is shown, hiding the whole subtree below it
    pub ancestor_visible: bool,
    /// Timestamp of the last visible-to-hidden transition
    pub last_seen_ms: Option<u64>,
    /// How many of this sibling's child tree nodes have finished loading
    pub children_loaded: usize,
    pub meshes: Vec<SiblingMesh>,
}

impl Sibling {
    pub fn new(name: String, sphere: Sphere, max_lod_range: f32) -> Self {
        Self {
            name,
            sphere,
            max_lod_range,
            visible: false,
            ancestor_visible: false,
            last_seen_ms: None,
            children_loaded: 0,
            meshes: Vec::new(),
        }
    }
}

/// Tile URLs may carry characters some object stores reject; normalize on
/// the way in. `_start` marker nodes are skipped entirely.
fn normalize_url(url: &str) -> String {
    url.replace('+', "%2B").replace("_start", "")
}

/// A tree node: owns a siblinghood and, per sibling, a group of child
/// nodes created lazily from the tile manifest
#[derive(Debug)]
pub struct PagedLod {
    pub level: u32,
    pub subfolder: String,
    pub url: String,
    /// Owning node and sibling index; `None` for top-level layer nodes
    pub parent: Option<(Handle<PagedLod>, usize)>,
    /// Index among the root's children, for top-level load notification
    pub root_child_index: Option<usize>,

    pub siblings: Vec<Sibling>,
    /// Child tree nodes per sibling, same indexing as `siblings`
    pub sibling_children: Vec<Vec<Handle<PagedLod>>>,
    /// (sibling index, priority score), re-sorted every updating pass
    pub sibling_order: Vec<(usize, f32)>,
    pub sibling_in_frustum: Vec<bool>,
    pub materials_used: Vec<Handle<Material>>,

    pub loaded: bool,
    pub load_requested: bool,
    pub files_to_load: usize,
    pub files_loaded: usize,
    pub loading_error: bool,
    pub last_error_ms: u64,
    /// Bumped on every data clear; in-flight results with an older
    /// generation are dropped on arrival
    pub generation: u64,
}

impl PagedLod {
    pub fn new(
        parent: Option<(Handle<PagedLod>, usize)>,
        subfolder: &str,
        url: &str,
        level: u32,
    ) -> Self {
        Self {
            level,
            subfolder: normalize_url(subfolder),
            url: normalize_url(url),
            parent,
            root_child_index: None,
            siblings: Vec::new(),
            sibling_children: Vec::new(),
            sibling_order: Vec::new(),
            sibling_in_frustum: Vec::new(),
            materials_used: Vec::new(),
            loaded: false,
            load_requested: false,
            files_to_load: 0,
            files_loaded: 0,
            loading_error: false,
            last_error_ms: 0,
            generation: 0,
        }
    }

    /// Fetch path relative to the scene's server path
    pub fn tile_path(&self) -> String {
        format!("{}{}", self.subfolder, self.url)
    }

    /// Most recent time any sibling was seen, `None` if never
    pub fn latest_seen(&self) -> Option<u64> {
        self.siblings.iter().filter_map(|s| s.last_seen_ms).max()
    }

    /// True if at least one sibling is currently visible
    pub fn any_sibling_visible(&self) -> bool {
        self.siblings.iter().any(|s| s.visible)
    }

    /// Total loaded children across all siblings. Non-zero means some
    /// descendant is being shown, so this node must survive eviction.
    pub fn children_loaded_total(&self) -> usize {
        self.siblings.iter().map(|s| s.children_loaded).sum()
    }

    /// Lift the post-error block so traversal can request a fresh load.
    pub fn unblock_for_loading(&mut self) {
        self.loaded = false;
        self.load_requested = false;
        self.loading_error = false;
        self.last_error_ms = 0;
    }
}
