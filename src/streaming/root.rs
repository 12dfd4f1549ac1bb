//! Scene root: the frame-sliced streaming state machine
//!
//! Each `update()` call runs one slice of the cycle
//! `Idle → ProcessDownloads → Updating → LaunchDownloads → RemoveReady`,
//! so completion handling, tree traversal, download dispatch and eviction
//! never pile up in a single frame. Completed worker and image results are
//! drained on every call.

use crate::core::types::Mat4;
use crate::core::Error;
use crate::manifest::{ManifestNode, SceneManifest};
use crate::math::{Aabb, Frustum};

use super::budget::TextureBudget;
use super::context::{PendingGeometry, PendingImage, ProcessState, StreamingContext};
use super::lod::{PagedLod, Sibling, SiblingMesh};
use super::pool::{Handle, Pool};
use super::queue::{DownloadQueue, DownloadRequest};
use super::resources::{Material, RenderGeometry, TextureImage};
use super::source::TileSource;
use super::tile::{DecodedGeometry, TilePayload};
use super::worker::{ImageJob, LoadRequest, TileLoader, DEFAULT_WORKER_COUNT};

/// Per-frame camera/viewport parameters for traversal
#[derive(Clone, Copy, Debug)]
pub struct ViewParams {
    pub frustum: Frustum,
    /// World-to-camera transform (the camera's inverse world matrix)
    pub view_from_world: Mat4,
    /// 1 / tan(vertical field of view / 2)
    pub focal_length: f32,
    pub viewport_height: f32,
}

impl ViewParams {
    /// Projected on-screen diameter in pixels of a sphere.
    pub fn diameter_pixels(&self, center: crate::core::types::Vec3, radius: f32) -> f32 {
        let cam = self.view_from_world.transform_point3(center);
        radius * self.viewport_height * self.focal_length / cam.z.abs()
    }
}

/// Scheduling slice the root runs on its next update call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdatePhase {
    Idle,
    ProcessDownloads,
    Updating,
    LaunchDownloads,
    RemoveReady,
}

/// Which pipeline stage a load failure came from; fetch and worker
/// failures finish the load immediately, per-file failures count the file
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadStage {
    Network,
    Worker,
    Image,
}

/// Tunables for a streaming scene
#[derive(Clone, Debug)]
pub struct RootConfig {
    /// Base path/URL prepended to every tile path
    pub server_path: String,
    /// Siblinghoods unseen for this long become eviction candidates
    pub expiry_ms: u64,
    /// Back-off window before an errored node may retry its load
    pub wait_after_error_ms: u64,
    pub worker_count: usize,
    /// ProcessDownloads slices per cycle
    pub max_repeat_downloads: u32,
    /// Top-level children traversed per Updating slice
    pub update_step: usize,
    /// Fold the pixel-diameter overshoot into sibling priority scores
    pub order_by_pixel_radius: bool,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            server_path: String::new(),
            expiry_ms: 20_000,
            wait_after_error_ms: 10_000,
            worker_count: DEFAULT_WORKER_COUNT,
            max_repeat_downloads: 10,
            update_step: 1,
            order_by_pixel_radius: true,
        }
    }
}

/// Scene-level metadata gathered from the scene manifest
#[derive(Clone, Debug, Default)]
pub struct SceneInfo {
    pub name: String,
    pub description: String,
    pub navigation_mode: String,
    pub logo: String,
    pub srs: String,
    pub srs_origin: Vec<f64>,
}

/// Root of a streaming paged-LOD scene
pub struct SceneRoot {
    pub(crate) nodes: Pool<PagedLod>,
    pub(crate) children: Vec<Handle<PagedLod>>,
    pub(crate) ctx: StreamingContext,
    pub(crate) loader: TileLoader,
    pub(crate) config: RootConfig,
    pub(crate) budget: TextureBudget,
    pub(crate) download_queue: DownloadQueue,

    pub(crate) phase: UpdatePhase,
    current_index: usize,
    repeat_downloads: u32,
    pub(crate) frame_timestamp_ms: u64,
    pub(crate) last_remove_expired_ms: u64,

    children_loaded: usize,
    layers_ready: bool,
    scene_loaded: bool,
    info: SceneInfo,
}

impl std::fmt::Debug for SceneRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneRoot")
            .field("children", &self.children.len())
            .field("nodes", &self.nodes.len())
            .field("phase", &self.phase)
            .finish()
    }
}

impl SceneRoot {
    pub fn new<S: TileSource>(source: S, config: RootConfig) -> Self {
        let loader = TileLoader::new(source, config.worker_count);
        Self::with_loader(loader, config)
    }

    /// Use a pre-built loader (e.g. one attached to the host's runtime).
    pub fn with_loader(loader: TileLoader, config: RootConfig) -> Self {
        Self {
            nodes: Pool::new(),
            children: Vec::new(),
            ctx: StreamingContext::new(),
            loader,
            config,
            budget: TextureBudget::default(),
            download_queue: DownloadQueue::new(),
            phase: UpdatePhase::Idle,
            current_index: 0,
            repeat_downloads: 0,
            frame_timestamp_ms: 0,
            last_remove_expired_ms: 0,
            children_loaded: 0,
            layers_ready: false,
            scene_loaded: false,
            info: SceneInfo::default(),
        }
    }

    // --- Scene setup ---

    /// Apply a parsed scene manifest: add one top-level node per mesh
    /// pyramid layer and record scene metadata. Returns whether all layers
    /// share a single spatial reference system.
    pub fn apply_scene_manifest(&mut self, manifest: &SceneManifest) -> bool {
        let mut same_srs = true;
        let mut srs: Option<&str> = None;
        let mut srs_origin: Option<&[f64]> = None;

        for layer in &manifest.layers {
            if !layer.is_mesh_pyramid() {
                continue;
            }
            if let Some(root) = &layer.root {
                self.add_layer(root);
            }
            if let Some(layer_srs) = &layer.srs {
                self.info.srs = layer_srs.clone();
                match srs {
                    None => srs = Some(layer_srs),
                    Some(prev) if prev != layer_srs => same_srs = false,
                    Some(_) => {}
                }
            }
            if let Some(origin) = &layer.srs_origin {
                self.info.srs_origin = origin.clone();
                match srs_origin {
                    None => srs_origin = Some(origin),
                    Some(prev) if prev != origin.as_slice() => same_srs = false,
                    Some(_) => {}
                }
            }
        }

        if let Some(name) = &manifest.name {
            self.info.name = name.clone();
        }
        if let Some(description) = &manifest.description {
            self.info.description = description.clone();
        }
        for options in &manifest.scene_options {
            if let Some(mode) = &options.navigation_mode {
                self.info.navigation_mode = mode.clone();
            }
        }
        if let Some(logo) = &manifest.logo {
            self.info.logo = logo.clone();
        }

        self.scene_loaded = true;
        same_srs
    }

    /// Add a top-level paged-LOD tree rooted at `url`.
    pub fn add_layer(&mut self, url: &str) {
        let (subfolder, file) = match url.rfind('/') {
            Some(i) => (&url[..i + 1], &url[i + 1..]),
            None => ("", url),
        };
        let node = PagedLod::new(None, subfolder, file, 0);
        let handle = self.nodes.insert(node);
        self.children.push(handle);
    }

    /// Re-derive the texture budget; call on init and on canvas resize.
    pub fn update_viewport(&mut self, width: u32, height: u32, is_desktop: bool) {
        self.budget.update_viewport(width, height, is_desktop);
    }

    // --- Frame update ---

    /// Run one scheduling slice. Call once per animation frame with the
    /// current wall-clock time in milliseconds.
    pub fn update(&mut self, view: &ViewParams, now_ms: u64) {
        self.frame_timestamp_ms = now_ms;
        self.drain_completions();

        match self.phase {
            UpdatePhase::Idle => {
                self.current_index = 0;
                self.repeat_downloads = 1;
                self.process_downloads();
                self.phase = UpdatePhase::ProcessDownloads;
            }
            UpdatePhase::ProcessDownloads => {
                if self.repeat_downloads < self.config.max_repeat_downloads {
                    self.process_downloads();
                    self.repeat_downloads += 1;
                }
                if self.repeat_downloads >= self.config.max_repeat_downloads {
                    self.phase = UpdatePhase::Updating;
                }
            }
            UpdatePhase::Updating => self.update_slice(view),
            UpdatePhase::LaunchDownloads => self.launch_downloads(),
            UpdatePhase::RemoveReady => self.remove_expired(view),
        }
    }

    /// One Updating slice: a bounded number of top-level children.
    fn update_slice(&mut self, view: &ViewParams) {
        let end_index = self
            .children
            .len()
            .min(self.current_index + self.config.update_step);

        for i in self.current_index..end_index {
            let child = self.children[i];
            let requested = self.nodes.get(child).is_some_and(|n| n.load_requested);
            if requested {
                self.update_node(child, view, false);
            } else {
                self.request_load(child, Some(i), f32::INFINITY);
            }
        }

        if end_index == self.children.len() {
            self.phase = UpdatePhase::LaunchDownloads;
        } else {
            self.current_index += self.config.update_step;
        }
    }

    // --- Download intake ---

    /// Drain completed tile loads and image decodes. Results for nodes
    /// that were recycled in the meantime are dropped.
    fn drain_completions(&mut self) {
        for result in self.loader.poll_results() {
            let live = self
                .nodes
                .get(result.node)
                .is_some_and(|n| n.generation == result.generation);
            if !live {
                log::trace!("dropping tile result for recycled node");
                continue;
            }

            match result.result {
                Ok(tile) => {
                    let file_count = tile.files.len();
                    self.update_siblings_data(result.node, &tile.nodes, file_count);
                    for file in tile.files {
                        match file.payload {
                            TilePayload::Geometry(geometry) => {
                                self.ctx.geometry_queue.push_back(PendingGeometry {
                                    node: result.node,
                                    generation: result.generation,
                                    name: file.name,
                                    geometry,
                                });
                            }
                            TilePayload::Image(bytes) => {
                                self.ctx.image_queue.push_back(PendingImage {
                                    node: result.node,
                                    generation: result.generation,
                                    name: file.name,
                                    bytes,
                                });
                            }
                        }
                    }
                }
                Err(e) => {
                    log::warn!("tile load failed: {e}");
                    let stage = match e {
                        Error::Network(_) => LoadStage::Network,
                        _ => LoadStage::Worker,
                    };
                    self.on_loading_error(result.node, stage);
                }
            }
        }

        for image in self.loader.poll_images() {
            self.ctx.images_in_flight = self.ctx.images_in_flight.saturating_sub(1);
            let live = self
                .nodes
                .get(image.node)
                .is_some_and(|n| n.generation == image.generation);
            if !live {
                log::trace!("dropping image result for recycled node");
                continue;
            }

            match image.result {
                Ok(decoded) => {
                    let texture = self.ctx.textures.insert(TextureImage {
                        name: image.name,
                        width: decoded.width,
                        height: decoded.height,
                        rgba: decoded.rgba,
                    });
                    self.attach_texture(image.node, texture);
                }
                Err(e) => {
                    log::warn!("image decode failed for {}: {e}", image.name);
                    self.on_loading_error(image.node, LoadStage::Image);
                }
            }
        }
    }

    /// One processing tick, alternating between the image and geometry
    /// staging queues so neither starves the other.
    fn process_downloads(&mut self) {
        match self.ctx.process_state {
            ProcessState::Images => {
                self.ctx.process_state = ProcessState::Geometry;
                if let Some(pending) = self.ctx.image_queue.pop_front() {
                    self.ctx.images_in_flight += 1;
                    self.loader.decode_image(ImageJob {
                        node: pending.node,
                        generation: pending.generation,
                        name: pending.name,
                        bytes: pending.bytes,
                    });
                }
            }
            ProcessState::Geometry => {
                self.ctx.process_state = ProcessState::Images;
                if let Some(pending) = self.ctx.geometry_queue.pop_front() {
                    let live = self
                        .nodes
                        .get(pending.node)
                        .is_some_and(|n| n.generation == pending.generation);
                    if live {
                        self.attach_geometry(pending.node, pending.geometry);
                    } else {
                        log::trace!("dropping staged geometry for recycled node");
                    }
                }
            }
        }
    }

    // --- Siblinghood assembly ---

    /// Build the siblinghood from a tile manifest: one sibling per node
    /// entry, with its child tree nodes created lazily from the manifest
    /// URLs. Resets the file counters for the incoming payloads.
    pub fn update_siblings_data(
        &mut self,
        node: Handle<PagedLod>,
        manifest_nodes: &[ManifestNode],
        files_to_load: usize,
    ) {
        self.clear_siblings(node);

        let Some(n) = self.nodes.get(node) else {
            return;
        };
        let parent_subfolder = n.subfolder.clone();
        let child_level = n.level + 1;

        for (sibling_index, data) in manifest_nodes.iter().enumerate() {
            let sibling = Sibling::new(
                data.label().to_string(),
                data.sphere(),
                data.max_screen_diameter.unwrap_or(0.0) as f32,
            );

            let mut child_handles = Vec::with_capacity(data.children.len());
            for child_url in &data.children {
                let (child_subfolder, child_file) = match child_url.rfind('/') {
                    Some(i) => (
                        format!("{parent_subfolder}{}", &child_url[..i + 1]),
                        &child_url[i + 1..],
                    ),
                    None => (parent_subfolder.clone(), child_url.as_str()),
                };
                let child = PagedLod::new(
                    Some((node, sibling_index)),
                    &child_subfolder,
                    child_file,
                    child_level,
                );
                child_handles.push(self.nodes.insert(child));
            }

            let n = &mut self.nodes[node];
            n.siblings.push(sibling);
            n.sibling_children.push(child_handles);
            n.sibling_order.push((sibling_index, f32::INFINITY));
            n.sibling_in_frustum.push(false);
        }

        let n = &mut self.nodes[node];
        n.files_to_load = files_to_load;
        n.files_loaded = 0;
        if n.files_loaded >= n.files_to_load {
            self.loading_finished(node);
        }
    }

    /// Attach one decoded geometry to its sibling (selected by the node
    /// name in the geometry metadata). Counts the file exactly once, even
    /// when the sibling is unknown.
    pub fn attach_geometry(&mut self, node: Handle<PagedLod>, geometry: DecodedGeometry) {
        let render = RenderGeometry::from_mesh(&geometry.file, &geometry.meta);
        let sibling_name = geometry.meta.node.clone().unwrap_or_default();
        let texture_name = render.texture_name.clone();

        if let Some(n) = self.nodes.get(node) {
            let sibling_index = n.siblings.iter().position(|s| s.name == sibling_name);
            if let Some(sibling_index) = sibling_index {
                let material = n.materials_used.iter().copied().find(|&m| {
                    self.ctx
                        .materials
                        .get(m)
                        .and_then(|m| self.ctx.textures.get(m.texture))
                        .is_some_and(|t| Some(t.name.as_str()) == texture_name.as_deref())
                });
                let handle = self.ctx.geometries.insert(render);
                self.nodes[node].siblings[sibling_index].meshes.push(SiblingMesh {
                    geometry: handle,
                    texture_name,
                    material,
                });
            } else {
                log::debug!("geometry for unknown sibling {sibling_name:?}");
            }

            self.count_file_loaded(node);
        }
    }

    /// Attach a decoded texture: create a material, charge the budget, and
    /// bind every mesh waiting for this texture name. Counts the file
    /// exactly once.
    pub fn attach_texture(&mut self, node: Handle<PagedLod>, texture: Handle<TextureImage>) {
        let Some(tex) = self.ctx.textures.get(texture) else {
            return;
        };
        let name = tex.name.clone();
        let (width, height) = (tex.width, tex.height);

        if self.nodes.get(node).is_none() {
            // Owner vanished; do not leak the decoded image
            self.ctx.textures.remove(texture);
            return;
        }

        let material = self.ctx.materials.insert(Material {
            texture,
            texture_width: width,
            texture_height: height,
        });
        self.budget.add(width, height);

        let n = &mut self.nodes[node];
        n.materials_used.push(material);
        for sibling in &mut n.siblings {
            for mesh in &mut sibling.meshes {
                if mesh.texture_name.as_deref() == Some(name.as_str()) {
                    mesh.material = Some(material);
                }
            }
        }

        self.count_file_loaded(node);
    }

    /// Exactly-once increment of the loaded-file counter; each completion
    /// path funnels through here.
    fn count_file_loaded(&mut self, node: Handle<PagedLod>) {
        let Some(n) = self.nodes.get_mut(node) else {
            return;
        };
        n.files_loaded += 1;
        debug_assert!(n.files_loaded <= n.files_to_load);
        if n.files_loaded >= n.files_to_load {
            log::debug!("all siblings of {} loaded", n.url);
            self.loading_finished(node);
        }
    }

    /// A load stage failed. Fetch/worker failures finish the load
    /// immediately; per-file failures count their file so the load
    /// finishes when every file is accounted for.
    pub fn on_loading_error(&mut self, node: Handle<PagedLod>, stage: LoadStage) {
        let Some(n) = self.nodes.get_mut(node) else {
            return;
        };
        n.loading_error = true;
        match stage {
            LoadStage::Network | LoadStage::Worker => self.loading_finished(node),
            LoadStage::Image => self.count_file_loaded(node),
        }
    }

    /// All payloads accounted for. On error the node stays blocked until
    /// the back-off window elapses; otherwise it becomes loaded and its
    /// parent's bookkeeping advances.
    fn loading_finished(&mut self, node: Handle<PagedLod>) {
        let now = self.frame_timestamp_ms;
        let Some(n) = self.nodes.get_mut(node) else {
            return;
        };

        if n.loading_error {
            n.last_error_ms = now;
            return;
        }

        n.loaded = true;
        let parent = n.parent;
        let root_child_index = n.root_child_index;
        match parent {
            None => {
                if let Some(index) = root_child_index {
                    self.on_child_loaded(index);
                }
            }
            Some((parent, sibling_index)) => {
                if let Some(p) = self.nodes.get_mut(parent) {
                    if let Some(sibling) = p.siblings.get_mut(sibling_index) {
                        sibling.children_loaded += 1;
                    }
                }
            }
        }
    }

    /// A top-level layer finished loading: force it visible so the first
    /// tile shows before the next traversal, and track scene readiness.
    fn on_child_loaded(&mut self, index: usize) {
        if let Some(&child) = self.children.get(index) {
            self.set_node_visible(child, true);
        }
        self.children_loaded += 1;
        if self.children_loaded == self.children.len() {
            self.layers_ready = true;
        }
    }

    // --- Download dispatch ---

    /// Try to start loading a node's tile. Refuses (returns `false`)
    /// without side effects when the staging queues are backed up or no
    /// worker slot is free; the node stays unrequested and will be
    /// re-queued by a later traversal.
    pub fn request_load(
        &mut self,
        node: Handle<PagedLod>,
        root_child_index: Option<usize>,
        priority: f32,
    ) -> bool {
        let Some(n) = self.nodes.get_mut(node) else {
            return true;
        };
        if n.load_requested {
            return true;
        }
        if self.ctx.staging_full() {
            return false;
        }

        if let Some(index) = root_child_index {
            n.root_child_index = Some(index);
        }
        let request = LoadRequest {
            node,
            generation: n.generation,
            path: format!("{}{}", self.config.server_path, n.tile_path()),
            priority,
        };
        if !self.loader.request(request) {
            return false;
        }
        self.nodes[node].load_requested = true;
        true
    }

    /// Start loads for every unrequested child of a sibling. Stops
    /// attempting further children once one load is refused, preserving
    /// priority order.
    fn load_sibling_children(
        &mut self,
        node: Handle<PagedLod>,
        sibling: usize,
        score: f32,
    ) -> bool {
        let children = self
            .nodes
            .get(node)
            .and_then(|n| n.sibling_children.get(sibling))
            .cloned()
            .unwrap_or_default();

        let mut launched = true;
        for child in children {
            let requested = self.nodes.get(child).is_some_and(|n| n.load_requested);
            if !requested && launched {
                launched = self.request_load(child, None, -score);
            }
        }
        launched
    }

    /// Drain the download queue in priority order. The first
    /// resource-exhaustion refusal stops issuing loads so a lower-priority
    /// request can never jump a blocked higher-priority one, but the queue
    /// is still emptied; unserved nodes are re-queued next traversal.
    fn launch_downloads(&mut self) {
        let mut launched = true;
        for request in self.download_queue.drain_sorted() {
            if launched {
                launched =
                    self.load_sibling_children(request.node, request.sibling, request.score);
                log::trace!(
                    "download slot for sibling {} (score {:.3}, level {}): launched={launched}",
                    request.sibling,
                    request.score,
                    request.level,
                );
            }
        }
        self.phase = UpdatePhase::RemoveReady;
    }

    // --- Visibility plumbing ---

    /// Show or hide a whole node. Hiding records last-seen stamps and
    /// inherits the parent sibling's ancestor-visible flag so exclusivity
    /// bookkeeping stays consistent down the subtree.
    pub(crate) fn set_node_visible(&mut self, node: Handle<PagedLod>, visible: bool) {
        let now = self.frame_timestamp_ms;
        let parent_ancestor_visible = self
            .nodes
            .get(node)
            .and_then(|n| n.parent)
            .and_then(|(parent, sibling_index)| {
                let p = self.nodes.get(parent)?;
                Some(p.siblings.get(sibling_index)?.ancestor_visible)
            })
            .unwrap_or(false);

        let Some(n) = self.nodes.get_mut(node) else {
            return;
        };
        for sibling in &mut n.siblings {
            if !visible {
                if sibling.visible {
                    sibling.last_seen_ms = Some(now);
                }
                sibling.ancestor_visible = parent_ancestor_visible;
            }
            sibling.visible = visible;
        }
    }

    // --- Teardown ---

    /// Release a node's data: meshes, materials, textures and the whole
    /// child forest go back to their pools; the node itself stays in the
    /// tree, unloaded and re-loadable. Bumps the generation so in-flight
    /// results for the old payload are dropped.
    pub fn delete_data(&mut self, node: Handle<PagedLod>) {
        if let Some(n) = self.nodes.get(node) {
            log::debug!("deleting data of {}", n.url);
        }
        self.clear_siblings(node);
        self.clear_materials(node);

        let Some(n) = self.nodes.get_mut(node) else {
            return;
        };
        n.loaded = false;
        n.load_requested = false;
        n.files_to_load = 0;
        n.files_loaded = 0;
        n.loading_error = false;
        n.last_error_ms = 0;
        n.root_child_index = None;
        n.generation += 1;
    }

    /// Clear the siblinghood: release mesh geometry, then recursively
    /// delete and recycle every child tree node.
    fn clear_siblings(&mut self, node: Handle<PagedLod>) {
        let Some(n) = self.nodes.get_mut(node) else {
            return;
        };
        let siblings = std::mem::take(&mut n.siblings);
        let groups = std::mem::take(&mut n.sibling_children);
        n.sibling_order.clear();
        n.sibling_in_frustum.clear();

        for sibling in siblings {
            for mesh in sibling.meshes {
                self.ctx.geometries.remove(mesh.geometry);
            }
        }
        for group in groups {
            for child in group.into_iter().rev() {
                self.delete_data(child);
                self.nodes.remove(child);
            }
        }
    }

    /// Release materials and their textures, refunding the budget.
    fn clear_materials(&mut self, node: Handle<PagedLod>) {
        let Some(n) = self.nodes.get_mut(node) else {
            return;
        };
        for handle in std::mem::take(&mut n.materials_used) {
            if let Some(material) = self.ctx.materials.remove(handle) {
                self.ctx.textures.remove(material.texture);
                self.budget
                    .remove(material.texture_width, material.texture_height);
            }
        }
    }

    /// Tear the scene down to its top-level tiles: all deeper data is
    /// released, queues are dropped, and the top tiles stay visible.
    pub fn unload(&mut self) {
        self.download_queue.clear();
        self.scene_loaded = false;

        for child in self.children.clone() {
            self.unload_node(child);
        }
        self.ctx.clear_queues();
    }

    fn unload_node(&mut self, node: Handle<PagedLod>) {
        let groups = self
            .nodes
            .get(node)
            .map(|n| n.sibling_children.clone())
            .unwrap_or_default();

        for group in &groups {
            for &child in group {
                self.unload_node(child);
            }
        }
        for (sibling_index, group) in groups.iter().enumerate() {
            for &child in group.iter().rev() {
                self.delete_data(child);
            }
            if let Some(n) = self.nodes.get_mut(node) {
                if let Some(sibling) = n.siblings.get_mut(sibling_index) {
                    sibling.children_loaded = 0;
                }
            }
        }
        // The undeleted top levels stay on screen
        self.set_node_visible(node, true);
    }

    // --- Queries ---

    /// Scene bounding box assembled from the top-level sibling spheres.
    pub fn bounding_box(&self) -> Aabb {
        let mut bbox = Aabb::empty();
        for &child in &self.children {
            if let Some(node) = self.nodes.get(child) {
                for sibling in &node.siblings {
                    if sibling.sphere.radius > 0.0 {
                        bbox.expand_sphere(sibling.sphere.center, sibling.sphere.radius);
                    }
                }
            }
        }
        bbox
    }

    pub fn phase(&self) -> UpdatePhase {
        self.phase
    }

    pub fn children(&self) -> &[Handle<PagedLod>] {
        &self.children
    }

    pub fn node(&self, handle: Handle<PagedLod>) -> Option<&PagedLod> {
        self.nodes.get(handle)
    }

    pub fn node_mut(&mut self, handle: Handle<PagedLod>) -> Option<&mut PagedLod> {
        self.nodes.get_mut(handle)
    }

    pub fn context(&self) -> &StreamingContext {
        &self.ctx
    }

    pub fn budget(&self) -> &TextureBudget {
        &self.budget
    }

    pub fn queued_downloads(&self) -> usize {
        self.download_queue.len()
    }

    pub fn available_workers(&self) -> usize {
        self.loader.available_workers()
    }

    pub fn is_scene_loaded(&self) -> bool {
        self.scene_loaded
    }

    /// True once every top-level layer has finished its first load.
    pub fn layers_ready(&self) -> bool {
        self.layers_ready
    }

    pub fn info(&self) -> &SceneInfo {
        &self.info
    }

    /// Queued download requests, unsorted (dispatch order is decided when
    /// the queue drains).
    pub fn download_requests(&self) -> impl Iterator<Item = &DownloadRequest> {
        self.download_queue.iter()
    }
}
