//! Container round-trips: every compression method must restore the
//! source arrays bit-exact (MG2 up to its declared quantization, which the
//! fixtures here hit exactly).

mod common;

use common::{AttrMapSpec, GridSpec, SourceMesh, UvMapSpec};
use pagedmesh::mesh::restore::calc_smooth_normals;
use pagedmesh::mesh::{CompressionMethod, MeshFile};

fn quad_mesh() -> SourceMesh {
    SourceMesh {
        // Second triangle shares its first index with the first, taking
        // the previous-second-index delta path
        indices: vec![0, 1, 2, 0, 2, 3],
        positions: vec![
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            1.0, 1.0, 0.0, //
            0.0, 1.0, 0.0,
        ],
        normals: Some(vec![
            0.0, 0.0, 1.0, //
            0.0, 0.0, 1.0, //
            0.0, 0.0, 1.0, //
            0.0, 0.0, 1.0,
        ]),
        uv_maps: vec![UvMapSpec {
            name: "Diffuse color".into(),
            file_name: "Texture_0.jpg".into(),
            uv: vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
            precision: 1.0 / 1024.0,
        }],
        attr_maps: vec![AttrMapSpec {
            name: "Color".into(),
            attr: vec![
                1.0, 0.0, 0.0, 1.0, //
                0.0, 1.0, 0.0, 1.0, //
                0.0, 0.0, 1.0, 1.0, //
                0.5, 0.5, 0.5, 1.0,
            ],
            precision: 1.0 / 256.0,
        }],
        comment: r#"{"texture":"Texture_0.jpg","node":"Node_0"}"#.into(),
    }
}

fn assert_exact(file: &MeshFile, mesh: &SourceMesh) {
    assert_eq!(file.body.indices(), mesh.indices.as_slice());
    assert_eq!(file.body.positions(), mesh.positions.as_slice());
    match &mesh.normals {
        Some(normals) => assert_eq!(file.body.normals().unwrap(), normals.as_slice()),
        None => assert!(file.body.normals().is_none()),
    }
    for (i, uv) in mesh.uv_maps.iter().enumerate() {
        assert_eq!(file.body.uv_channels()[i].name, uv.name);
        assert_eq!(file.body.uv_channels()[i].file_name, uv.file_name);
        assert_eq!(file.body.uv(i), uv.uv.as_slice());
    }
    for (i, attr) in mesh.attr_maps.iter().enumerate() {
        assert_eq!(file.body.attr_channels()[i].name, attr.name);
        assert_eq!(file.body.attr(i), attr.attr.as_slice());
    }
    assert_eq!(file.header.comment, mesh.comment);
}

#[test]
fn test_raw_roundtrip() {
    let mesh = quad_mesh();
    let file = MeshFile::decode(&common::write_raw(&mesh)).unwrap();
    assert_eq!(file.header.compression_method, CompressionMethod::Raw);
    assert_eq!(file.header.vertex_count, 4);
    assert_eq!(file.header.triangle_count, 2);
    assert_exact(&file, &mesh);
}

#[test]
fn test_mg1_roundtrip() {
    let mesh = quad_mesh();
    let file = MeshFile::decode(&common::write_mg1(&mesh)).unwrap();
    assert_eq!(file.header.compression_method, CompressionMethod::Mg1);
    assert_exact(&file, &mesh);
}

#[test]
fn test_mg1_roundtrip_without_normals() {
    let mut mesh = quad_mesh();
    mesh.normals = None;
    let file = MeshFile::decode(&common::write_mg1(&mesh)).unwrap();
    assert!(!file.header.has_normals());
    assert_exact(&file, &mesh);
}

#[test]
fn test_mg1_roundtrip_arbitrary_bits() {
    // Byte-plane packing must restore any f32 pattern bit-exact, including
    // negatives, denormals and huge magnitudes
    let mesh = SourceMesh {
        indices: vec![0, 1, 2],
        positions: vec![-0.0, 1e-40, 3.4e38, -7.25, f32::MIN_POSITIVE, 123456.78, 0.1, -0.1, 2.5],
        ..Default::default()
    };
    let file = MeshFile::decode(&common::write_mg1(&mesh)).unwrap();
    for (decoded, source) in file.body.positions().iter().zip(&mesh.positions) {
        assert_eq!(decoded.to_bits(), source.to_bits());
    }
}

/// MG2 fixture: vertices sorted by grid index, residuals exact multiples
/// of the precision, two vertices sharing a cell to exercise the
/// continued x-delta chain.
fn mg2_mesh_and_grid() -> (SourceMesh, GridSpec) {
    let grid = GridSpec {
        lower: [0.0, 0.0, 0.0],
        upper: [4.0, 4.0, 4.0],
        div: [4, 4, 4],
        vertex_precision: 0.25,
        normal_precision: 0.25,
    };
    let positions = vec![
        0.25, 0.5, 0.75, // cell (0,0,0)
        0.5, 0.0, 0.25, // cell (0,0,0) again, x residual grows
        1.5, 1.25, 1.75, // cell (1,1,1)
        3.75, 3.5, 3.0, // cell (3,3,3)
    ];
    let indices = vec![0, 1, 2, 0, 2, 3];
    // The normal writer's fast path scales the smooth normal by one, so
    // smooth normals themselves are the exactly-representable input
    let normals = calc_smooth_normals(&indices, &positions);

    let mesh = SourceMesh {
        indices,
        positions,
        normals: Some(normals),
        uv_maps: vec![UvMapSpec {
            name: "Diffuse color".into(),
            file_name: "Texture_0.jpg".into(),
            uv: vec![0.0, 0.0, 0.5, 0.0, 0.5, 0.5, 0.0, 0.25],
            precision: 1.0 / 1024.0,
        }],
        attr_maps: vec![AttrMapSpec {
            name: "Color".into(),
            attr: vec![
                0.25, 0.5, 0.75, 1.0, //
                0.25, 0.5, 0.75, 1.0, //
                0.0, 0.0, 0.0, 1.0, //
                1.0, 0.5, 0.25, 0.0,
            ],
            precision: 1.0 / 256.0,
        }],
        comment: String::new(),
    };
    (mesh, grid)
}

#[test]
fn test_mg2_roundtrip() {
    let (mesh, grid) = mg2_mesh_and_grid();
    let file = MeshFile::decode(&common::write_mg2(&mesh, &grid)).unwrap();
    assert_eq!(file.header.compression_method, CompressionMethod::Mg2);
    assert_exact(&file, &mesh);
}

#[test]
fn test_mg2_roundtrip_without_normals() {
    let (mut mesh, grid) = mg2_mesh_and_grid();
    mesh.normals = None;
    let file = MeshFile::decode(&common::write_mg2(&mesh, &grid)).unwrap();
    assert!(!file.header.has_normals());
    assert_exact(&file, &mesh);
}

#[test]
fn test_head_container_roundtrip() {
    // A tile head: zero geometry, the manifest rides in the comment
    let mesh = SourceMesh {
        comment: r#"{"size":[10],"name":["Geometry_0.ctm"],"node":[]}"#.into(),
        ..Default::default()
    };
    let file = MeshFile::decode(&common::write_raw(&mesh)).unwrap();
    assert_eq!(file.header.vertex_count, 0);
    assert_eq!(file.header.triangle_count, 0);
    assert!(file.body.indices().is_empty());
    assert_eq!(file.header.comment, mesh.comment);
}

#[test]
fn test_degenerate_index_runs_roundtrip() {
    // All-equal indices produce zero-delta runs through the tie-break path
    let mesh = SourceMesh {
        indices: vec![5, 5, 5, 5, 5, 5],
        positions: vec![0.0; 18],
        ..Default::default()
    };
    let file = MeshFile::decode(&common::write_mg1(&mesh)).unwrap();
    assert_eq!(file.body.indices(), mesh.indices.as_slice());
}

#[test]
fn test_corrupt_compressed_chunk_rejected() {
    let mesh = quad_mesh();
    let mut data = common::write_mg1(&mesh);
    // Truncating the stream mid-chunk must fail the whole container
    data.truncate(data.len() - 10);
    assert!(MeshFile::decode(&data).is_err());
}
