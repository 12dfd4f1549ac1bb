//! End-to-end streaming over a real tile set on disk: manifest apply,
//! tile fetch/parse through the worker pool, refinement, texture binding,
//! error back-off and unload.

mod common;

use std::time::Duration;

use pagedmesh::core::types::Mat4;
use pagedmesh::manifest::SceneManifest;
use pagedmesh::math::Frustum;
use pagedmesh::streaming::{DirTileSource, PagedLod, RootConfig, SceneRoot, ViewParams};

/// Camera at the origin looking down -Z: a sphere of radius 2 at z = -10
/// projects to 200 px on a 1000 px viewport.
fn view() -> ViewParams {
    let proj = Mat4::perspective_rh(90f32.to_radians(), 1.0, 0.1, 1000.0);
    ViewParams {
        frustum: Frustum::from_view_projection(&proj),
        view_from_world: Mat4::IDENTITY,
        focal_length: 1.0,
        viewport_height: 1000.0,
    }
}

fn geometry_bytes(comment: &str) -> Vec<u8> {
    let mesh = common::SourceMesh {
        indices: vec![0, 1, 2],
        positions: vec![0.0, 0.0, -10.0, 1.0, 0.0, -10.0, 0.0, 1.0, -10.0],
        comment: comment.into(),
        ..Default::default()
    };
    common::write_mg1(&mesh)
}

/// Two-level tile set: the root tile needs refinement at the test view
/// (200 px projected vs 100 px threshold) and names one child tile that
/// is adequate everywhere.
fn write_tiles(dir: &std::path::Path) {
    let root_tile = common::write_tile(
        &[
            (
                "Geometry_0.ctm",
                geometry_bytes(r#"{"texture":"Texture_0.jpg","node":"Node_0"}"#),
            ),
            ("Texture_0.jpg", common::write_png(4, 4)),
        ],
        r#"[{"id":"Node_0","center":[0,0,-10],"radius":2,"maxScreenDiameter":100,"children":["Tile_001.bin"]}]"#,
    );
    std::fs::write(dir.join("Tile_000.bin"), root_tile).unwrap();

    let child_tile = common::write_tile(
        &[("Geometry_0.ctm", geometry_bytes(r#"{"node":"Node_0"}"#))],
        r#"[{"id":"Node_0","center":[0,0,-10],"radius":2,"maxScreenDiameter":100000,"children":[]}]"#,
    );
    std::fs::write(dir.join("Tile_001.bin"), child_tile).unwrap();
}

/// Walk the whole tree checking the file-counter invariant.
fn assert_counters(root: &SceneRoot) {
    fn walk(root: &SceneRoot, node: pagedmesh::streaming::Handle<PagedLod>) {
        let Some(n) = root.node(node) else { return };
        assert!(
            n.files_loaded <= n.files_to_load,
            "{}: {} files loaded of {}",
            n.url,
            n.files_loaded,
            n.files_to_load
        );
        for group in &n.sibling_children {
            for &child in group {
                walk(root, child);
            }
        }
    }
    for &child in root.children() {
        walk(root, child);
    }
}

/// Run update slices (16 ms of simulated time each) until `done` holds.
fn drive(
    root: &mut SceneRoot,
    view: &ViewParams,
    now: &mut u64,
    max_steps: usize,
    mut done: impl FnMut(&SceneRoot) -> bool,
) -> bool {
    for _ in 0..max_steps {
        root.update(view, *now);
        *now += 16;
        assert_counters(root);
        if done(root) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    false
}

fn test_config() -> RootConfig {
    RootConfig {
        max_repeat_downloads: 1,
        expiry_ms: 600_000,
        ..Default::default()
    }
}

#[test]
fn test_stream_two_level_scene() {
    let dir = tempfile::tempdir().unwrap();
    write_tiles(dir.path());

    let mut root = SceneRoot::new(DirTileSource::new(dir.path()), test_config());
    root.update_viewport(1000, 1000, true);

    let manifest = SceneManifest::parse(
        r#"{"name": "Quarry",
            "layers": [{"type": "meshPyramid", "root": "Tile_000.bin",
                        "SRS": "EPSG:32631", "SRSOrigin": [100.0, 200.0, 0.0]}],
            "sceneOptions": [{"navigationMode": "orbit"}]}"#,
    )
    .unwrap();
    assert!(root.apply_scene_manifest(&manifest));
    assert!(root.is_scene_loaded());
    assert_eq!(root.info().name, "Quarry");
    assert_eq!(root.info().srs, "EPSG:32631");
    assert_eq!(root.children().len(), 1);

    let view = view();
    let mut now = 1_000u64;
    let top = root.children()[0];

    // The root tile streams in and the layer reports ready
    assert!(
        drive(&mut root, &view, &mut now, 4000, |r| r.layers_ready()),
        "root tile never finished loading"
    );

    let n = root.node(top).unwrap();
    assert!(n.loaded);
    assert_eq!(n.siblings.len(), 1);
    assert_eq!(n.siblings[0].name, "Node_0");
    assert_eq!(n.files_loaded, n.files_to_load);
    assert_eq!(n.sibling_children[0].len(), 1);
    let child = n.sibling_children[0][0];

    // The scene box covers the sibling sphere
    let bbox = root.bounding_box();
    assert!(!bbox.is_empty());
    assert!(bbox.contains_point(pagedmesh::core::types::Vec3::new(0.0, 0.0, -10.0)));

    // 4x4 texture charged to the budget, material bound by name
    assert!(
        drive(&mut root, &view, &mut now, 4000, |r| {
            let n = r.node(top).unwrap();
            !n.siblings[0].meshes.is_empty() && n.siblings[0].meshes[0].material.is_some()
        }),
        "texture never bound to the mesh"
    );
    assert_eq!(root.budget().used(), 16);

    // 200 px projected vs 100 px threshold: the root stays visible as the
    // fallback and the child's load is requested
    assert!(
        drive(&mut root, &view, &mut now, 4000, |r| {
            r.node(child).is_some_and(|c| c.load_requested)
        }),
        "child load never requested"
    );
    assert!(root.node(top).unwrap().siblings[0].visible);

    // Once the child is in, the bands swap: child shown, root hidden
    assert!(
        drive(&mut root, &view, &mut now, 4000, |r| {
            let parent_hidden = !r.node(top).unwrap().siblings[0].visible;
            let child_shown = r
                .node(child)
                .is_some_and(|c| c.loaded && c.siblings.first().is_some_and(|s| s.visible));
            parent_hidden && child_shown
        }),
        "resolution bands never swapped to the child"
    );
    let c = root.node(child).unwrap();
    assert_eq!(c.level, 1);
    assert_eq!(c.siblings[0].meshes.len(), 1);

    // Unload tears back down to the top tiles
    root.unload();
    let n = root.node(top).unwrap();
    assert!(n.loaded);
    assert!(n.any_sibling_visible());
    assert_eq!(n.siblings[0].children_loaded, 0);
    assert!(!root.node(child).unwrap().loaded);
    assert_eq!(root.queued_downloads(), 0);
}

#[test]
fn test_missing_tile_errors_and_retries_after_backoff() {
    let dir = tempfile::tempdir().unwrap();

    let mut root = SceneRoot::new(
        DirTileSource::new(dir.path()),
        RootConfig {
            max_repeat_downloads: 1,
            wait_after_error_ms: 200,
            ..Default::default()
        },
    );
    root.update_viewport(1000, 1000, true);
    root.add_layer("Missing.bin");

    let view = view();
    let mut now = 1_000u64;
    let top = root.children()[0];

    // The failed fetch marks the node errored, not loaded
    assert!(
        drive(&mut root, &view, &mut now, 4000, |r| {
            r.node(top).is_some_and(|n| n.loading_error)
        }),
        "missing tile never reported an error"
    );
    let n = root.node(top).unwrap();
    assert!(!n.loaded);
    assert!(n.last_error_ms > 0);

    // After the back-off window the node is unblocked and re-requested
    now += 1_000;
    assert!(
        drive(&mut root, &view, &mut now, 4000, |r| {
            r.node(top)
                .is_some_and(|n| n.load_requested && !n.loading_error)
        }),
        "errored node never retried after back-off"
    );
}
