//! Tree traversal: visibility, refinement and eviction
//!
//! Depth-first walk of the paged-LOD tree, once per Updating slice. Along
//! any root-to-leaf path exactly one resolution band is shown, except
//! where an interior node's children are not fully loaded and the node
//! stays visible as a fallback. Eviction runs on a coarse wall-clock
//! cadence and works post-order, so the deepest stale data goes first.

use super::lod::PagedLod;
use super::pool::Handle;
use super::queue::DownloadRequest;
use super::root::{SceneRoot, UpdatePhase, ViewParams};

impl SceneRoot {
    /// Update one node and its subtree.
    ///
    /// Unloaded nodes are leaves for traversal purposes; an errored one is
    /// unblocked here once its back-off window has elapsed. A subtree
    /// under a visible ancestor sibling (or outside the frustum) is forced
    /// invisible but still recursed to keep bookkeeping consistent; no
    /// loads are triggered from such a subtree.
    pub(crate) fn update_node(
        &mut self,
        node: Handle<PagedLod>,
        view: &ViewParams,
        out_of_frustum: bool,
    ) {
        let Some(n) = self.nodes.get(node) else {
            return;
        };

        if !n.loaded {
            if n.loading_error
                && self.frame_timestamp_ms.saturating_sub(n.last_error_ms)
                    > self.config.wait_after_error_ms
            {
                self.nodes[node].unblock_for_loading();
            }
            return;
        }

        if out_of_frustum {
            self.set_node_visible(node, false);
            self.traverse_children_by_order(node, view, true);
            return;
        }

        // A visible ancestor sibling hides this whole subtree.
        let ancestor_visible = n
            .parent
            .and_then(|(parent, sibling_index)| {
                let p = self.nodes.get(parent)?;
                Some(p.siblings.get(sibling_index)?.ancestor_visible)
            })
            .unwrap_or(false);
        if ancestor_visible {
            self.set_node_visible(node, false);
            self.traverse_children_by_order(node, view, true);
            return;
        }

        self.update_visible_by_frustum(node, view);
        self.sort_siblings_by_priority(node, view);

        let order = self.nodes[node].sibling_order.clone();
        for (sibling_index, score) in order {
            self.update_sibling(node, sibling_index, score, view, false);
        }
    }

    fn update_visible_by_frustum(&mut self, node: Handle<PagedLod>, view: &ViewParams) {
        let Some(n) = self.nodes.get_mut(node) else {
            return;
        };
        for i in 0..n.siblings.len() {
            n.sibling_in_frustum[i] = view.frustum.intersects_sphere(&n.siblings[i].sphere);
        }
    }

    /// Compute sibling priority scores and sort ascending (most urgent
    /// first): normalized squared camera distance plus the pixel-diameter
    /// overshoot term. Out-of-frustum siblings score infinity.
    fn sort_siblings_by_priority(&mut self, node: Handle<PagedLod>, view: &ViewParams) {
        let order_by_pixel_radius = self.config.order_by_pixel_radius;
        let Some(n) = self.nodes.get_mut(node) else {
            return;
        };

        let mut max_distance = f32::NEG_INFINITY;
        for entry in &mut n.sibling_order {
            let sibling = &n.siblings[entry.0];
            if n.sibling_in_frustum[entry.0] {
                let cam = view.view_from_world.transform_point3(sibling.sphere.center);
                entry.1 = cam.length_squared();
                if entry.1 > max_distance {
                    max_distance = entry.1;
                }
            } else {
                entry.1 = f32::INFINITY;
            }
        }

        if order_by_pixel_radius {
            for entry in &mut n.sibling_order {
                if entry.1 != f32::INFINITY {
                    let sibling = &n.siblings[entry.0];
                    let diameter =
                        view.diameter_pixels(sibling.sphere.center, sibling.sphere.radius);
                    let overshoot = (diameter - sibling.max_lod_range) / diameter;
                    entry.1 = entry.1 / max_distance + overshoot;
                }
            }
        }

        n.sibling_order.sort_by(|a, b| a.1.total_cmp(&b.1));
    }

    /// Update one sibling: decide between showing it, refining into its
    /// children, or keeping it as a fallback while children load (and
    /// queue the download). Always recurses so deeper bookkeeping stays
    /// current.
    fn update_sibling(
        &mut self,
        node: Handle<PagedLod>,
        sibling_index: usize,
        score: f32,
        view: &ViewParams,
        out_of_frustum: bool,
    ) {
        let pixel_ratio = self.budget.pixel_ratio();
        let now = self.frame_timestamp_ms;
        let Some(n) = self.nodes.get_mut(node) else {
            return;
        };

        n.siblings[sibling_index].ancestor_visible = false;

        if !n.sibling_in_frustum[sibling_index] || out_of_frustum {
            let sibling = &mut n.siblings[sibling_index];
            if sibling.visible {
                sibling.last_seen_ms = Some(now);
            }
            sibling.visible = false;
            // Everything below is out of frustum too; skip the sphere tests
            self.traverse_sibling_children(node, sibling_index, view, true);
            return;
        }

        let sibling = &n.siblings[sibling_index];
        let diameter = view.diameter_pixels(sibling.sphere.center, sibling.sphere.radius);
        let max_range = pixel_ratio * sibling.max_lod_range;
        let level = n.level;

        if max_range > diameter {
            // Adequate resolution at this level
            let sibling = &mut n.siblings[sibling_index];
            sibling.visible = true;
            sibling.ancestor_visible = true;
        } else {
            let child_count = n.sibling_children[sibling_index].len();
            if child_count > 0 {
                if n.siblings[sibling_index].children_loaded < child_count {
                    // Children missing: stay visible as the fallback and
                    // ask for them
                    let children = n.sibling_children[sibling_index].clone();
                    let sibling = &mut n.siblings[sibling_index];
                    sibling.visible = true;
                    sibling.ancestor_visible = true;

                    let load_needed = children
                        .iter()
                        .any(|&c| self.nodes.get(c).is_some_and(|c| !c.load_requested));
                    if load_needed {
                        self.download_queue.push(DownloadRequest {
                            node,
                            sibling: sibling_index,
                            score,
                            level,
                        });
                    }
                } else {
                    // Children take over
                    let sibling = &mut n.siblings[sibling_index];
                    if sibling.visible {
                        sibling.last_seen_ms = Some(now);
                    }
                    sibling.visible = false;
                }
            } else {
                // Leaf: nothing finer exists
                let sibling = &mut n.siblings[sibling_index];
                sibling.visible = true;
                sibling.ancestor_visible = true;
            }
        }

        self.traverse_sibling_children(node, sibling_index, view, out_of_frustum);
    }

    fn traverse_sibling_children(
        &mut self,
        node: Handle<PagedLod>,
        sibling_index: usize,
        view: &ViewParams,
        out_of_frustum: bool,
    ) {
        let children = self
            .nodes
            .get(node)
            .and_then(|n| n.sibling_children.get(sibling_index))
            .cloned()
            .unwrap_or_default();
        for child in children {
            self.update_node(child, view, out_of_frustum);
        }
    }

    /// Recurse using the previously computed order, skipping siblings that
    /// were outside the frustum on the last scored pass.
    fn traverse_children_by_order(
        &mut self,
        node: Handle<PagedLod>,
        view: &ViewParams,
        out_of_frustum: bool,
    ) {
        let order = self
            .nodes
            .get(node)
            .map(|n| n.sibling_order.clone())
            .unwrap_or_default();
        for (sibling_index, score) in order {
            if score != f32::INFINITY {
                self.traverse_sibling_children(node, sibling_index, view, out_of_frustum);
            }
        }
    }

    // --- Eviction ---

    /// RemoveReady slice: run a full eviction pass when enough wall-clock
    /// time has passed since the last one, then return to Idle.
    ///
    /// The gate is 1.2x the expiry time so a pass never runs before
    /// anything could have expired; the stamp is pushed 200ms into the
    /// future to absorb the cost of the pass itself.
    pub(crate) fn remove_expired(&mut self, view: &ViewParams) {
        let now = self.frame_timestamp_ms;
        let gate = (self.config.expiry_ms as f64 * 1.2) as u64;

        if self.last_remove_expired_ms == 0 {
            // First pass after construction only arms the timer
            self.last_remove_expired_ms = now + 200;
        } else if now.saturating_sub(self.last_remove_expired_ms) > gate {
            self.last_remove_expired_ms = now + 200;
            log::debug!("running expired-children pass");
            for child in self.children.clone() {
                self.remove_expired_children(child, view);
            }
        }

        self.phase = UpdatePhase::Idle;
    }

    fn remove_expired_children(&mut self, node: Handle<PagedLod>, view: &ViewParams) {
        let groups = self
            .nodes
            .get(node)
            .map(|n| n.sibling_children.clone())
            .unwrap_or_default();

        for group in &groups {
            for &child in group {
                self.remove_expired_children(child, view);
            }
        }
        for sibling_index in 0..groups.len() {
            self.remove_sibling_expired(node, sibling_index, view);
        }
    }

    /// Evict one sibling's child siblinghood when every child is fully
    /// idle: not visible now or recently, not mid-load, and without loaded
    /// descendants of its own. Even then the deletion is suppressed while
    /// the parent sibling is on screen above its refinement threshold,
    /// because the children would be re-requested immediately.
    fn remove_sibling_expired(
        &mut self,
        node: Handle<PagedLod>,
        sibling_index: usize,
        view: &ViewParams,
    ) {
        let Some(n) = self.nodes.get(node) else {
            return;
        };
        let Some(children) = n.sibling_children.get(sibling_index).cloned() else {
            return;
        };
        let sphere = n.siblings[sibling_index].sphere;
        let max_lod_range = n.siblings[sibling_index].max_lod_range;
        let expiry = self.config.expiry_ms;
        let frame = self.frame_timestamp_ms;

        let mut children_exist = 0usize;
        for &child in &children {
            let Some(c) = self.nodes.get(child) else {
                continue;
            };
            let time_not_seen = c
                .latest_seen()
                .map_or(u64::MAX, |seen| frame.saturating_sub(seen));

            if c.loaded && (c.any_sibling_visible() || time_not_seen < expiry) {
                children_exist += 1;
            } else if c.load_requested && !c.loaded {
                children_exist += 1;
            } else if c.children_loaded_total() > 0 {
                children_exist += 1;
            }
        }
        if children_exist > 0 {
            return;
        }

        if view.frustum.intersects_sphere(&sphere) {
            let diameter = view.diameter_pixels(sphere.center, sphere.radius);
            if self.budget.pixel_ratio() * max_lod_range < diameter {
                // Still wanted at finer resolution; deleting would bounce
                return;
            }
        }

        for &child in children.iter().rev() {
            if self.nodes.get(child).is_some_and(|c| c.loaded) {
                self.delete_data(child);
            }
        }
        if let Some(n) = self.nodes.get_mut(node) {
            n.siblings[sibling_index].children_loaded = 0;
        }
    }
}
