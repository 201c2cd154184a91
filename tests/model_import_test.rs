mod common;

use std::path::{Path, PathBuf};

use common::test_utils::{CountingDecoder, Fixture, StubImporter, quad, write_cube};
use mesh_ngin::{
    ImportError, ImportOptions, Model,
    data_structures::texture::TextureKind,
    gpu::headless::{Command, HeadlessGpu},
    load_model,
    resources::scene::{ImportedScene, SceneNode},
};

fn assert_indices_in_range(model: &Model) {
    for mesh in &model.meshes {
        assert_eq!(mesh.indices.len() % 3, 0, "{} is not a triangle list", mesh.name);
        assert!(
            mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()),
            "{} indexes past its vertices",
            mesh.name
        );
    }
}

#[test]
fn obj_with_material_loads_geometry_and_both_textures() {
    let fixture = Fixture::new("cube");
    let path = write_cube(&fixture);
    let mut gpu = HeadlessGpu::new();

    let model = load_model(&path, &ImportOptions::default(), &mut gpu);

    assert_eq!(model.directory, fixture.dir());
    assert_eq!(model.meshes.len(), 1);
    let cube = &model.meshes[0];
    assert_eq!(cube.num_faces(), 12);
    assert_eq!(cube.indices.len(), 36);
    assert_indices_in_range(&model);

    let kinds: Vec<_> = cube.textures.iter().map(|t| t.kind).collect();
    assert_eq!(kinds, vec![TextureKind::Diffuse, TextureKind::Specular]);
    assert_eq!(cube.textures[0].path, "crate_diffuse.png");
    assert_eq!(gpu.texture_uploads(), 2);
}

#[test]
fn bundled_cube_asset_imports() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/objects/model.obj");
    let mut gpu = HeadlessGpu::new();

    let model = load_model(&path, &ImportOptions::default(), &mut gpu);

    assert!(!model.is_empty());
    assert_indices_in_range(&model);
    assert_eq!(model.textures.len(), 2);
}

#[test]
fn meshes_without_texture_coordinates_get_zero_uvs() {
    let scene = ImportedScene {
        incomplete: false,
        root: Some(SceneNode::new("root").with_meshes([0])),
        meshes: vec![quad("bare", None)],
        materials: Vec::new(),
    };
    let mut gpu = HeadlessGpu::new();

    let model = Model::import(
        Path::new("bare.obj"),
        &ImportOptions::default(),
        &StubImporter(scene),
        &CountingDecoder::new(3),
        &mut gpu,
    );

    let mesh = &model.meshes[0];
    assert_eq!(mesh.vertices.len(), 4);
    assert!(mesh.vertices.iter().all(|v| v.tex_coords == [0.0, 0.0]));
    assert!(mesh.textures.is_empty());
    assert_indices_in_range(&model);
}

#[test]
fn flipping_uvs_keeps_absent_coordinates_at_zero() {
    let scene = ImportedScene {
        incomplete: false,
        root: Some(SceneNode::new("root").with_meshes([0])),
        meshes: vec![quad("bare", None)],
        materials: Vec::new(),
    };
    let options = ImportOptions {
        flip_uvs: true,
        ..Default::default()
    };
    let mut gpu = HeadlessGpu::new();

    let model = Model::import(
        Path::new("bare.obj"),
        &options,
        &StubImporter(scene),
        &CountingDecoder::new(3),
        &mut gpu,
    );

    assert!(model.meshes[0].vertices.iter().all(|v| v.tex_coords == [0.0, 0.0]));
}

#[test]
fn incomplete_scene_yields_an_empty_model() {
    let scene = ImportedScene {
        incomplete: true,
        root: Some(SceneNode::new("root").with_meshes([0])),
        meshes: vec![quad("partial", None)],
        materials: Vec::new(),
    };
    let importer = StubImporter(scene);
    let decoder = CountingDecoder::new(3);
    let mut gpu = HeadlessGpu::new();
    let path = Path::new("models/partial.obj");

    let err = Model::try_import(path, &ImportOptions::default(), &importer, &decoder, &mut gpu)
        .unwrap_err();
    assert!(matches!(err, ImportError::Incomplete));

    let model = Model::import(path, &ImportOptions::default(), &importer, &decoder, &mut gpu);
    assert!(model.is_empty());
    assert_eq!(model.directory, PathBuf::from("models"));
    assert!(gpu.commands().is_empty());
}

#[test]
fn empty_obj_file_does_not_panic() {
    let fixture = Fixture::new("empty-obj");
    let path = fixture.write("empty.obj", "# nothing here\n");
    let mut gpu = HeadlessGpu::new();

    let model = load_model(&path, &ImportOptions::default(), &mut gpu);

    assert!(model.is_empty());
    assert_eq!(gpu.draw_calls(), 0);
}

#[test]
fn unknown_extension_and_missing_file_yield_empty_models() {
    let mut gpu = HeadlessGpu::new();

    assert!(load_model("scene.fbx", &ImportOptions::default(), &mut gpu).is_empty());
    assert!(load_model("no/such/file.obj", &ImportOptions::default(), &mut gpu).is_empty());
    assert!(gpu.commands().is_empty());
}

#[test]
fn missing_texture_file_keeps_the_mesh() {
    let fixture = Fixture::new("no-texture");
    fixture.write("cube.mtl", "newmtl crate\nmap_Kd gone.png\n");
    let path = fixture.write("cube.obj", common::test_utils::CUBE_OBJ);
    let mut gpu = HeadlessGpu::new();

    let model = load_model(&path, &ImportOptions::default(), &mut gpu);

    assert_eq!(model.meshes.len(), 1);
    assert_eq!(model.meshes[0].textures.len(), 1);
    assert_eq!(gpu.texture_uploads(), 0);
    assert!(model.textures.is_empty());

    let empty_handle = model.meshes[0].textures[0].id;
    model.destroy(&mut gpu);
    assert!(gpu.commands().contains(&Command::DeleteTexture(empty_handle)));
}

const TRIANGLE_GLTF: &str = r#"{
  "asset": { "version": "2.0" },
  "scene": 0,
  "scenes": [{ "nodes": [0] }],
  "nodes": [
    { "name": "lifted", "translation": [0.0, 2.0, 0.0], "children": [1] },
    { "name": "triangle", "mesh": 0 }
  ],
  "meshes": [{ "name": "tri", "primitives": [{ "attributes": { "POSITION": 0 }, "material": 0 }] }],
  "materials": [{
    "name": "paint",
    "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } }
  }],
  "textures": [{ "source": 0 }],
  "images": [{ "uri": "paint.png" }],
  "buffers": [{ "uri": "tri.bin", "byteLength": 36 }],
  "bufferViews": [{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }],
  "accessors": [{
    "bufferView": 0,
    "componentType": 5126,
    "count": 3,
    "type": "VEC3",
    "min": [0.0, 0.0, 0.0],
    "max": [1.0, 1.0, 0.0]
  }]
}"#;

fn write_gltf_triangle(fixture: &Fixture) -> PathBuf {
    let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    std::fs::write(
        fixture.path("tri.bin"),
        bytemuck::cast_slice::<f32, u8>(&positions),
    )
    .unwrap();
    fixture.write_png("paint.png", 2, 2, 4);
    fixture.write("tri.gltf", TRIANGLE_GLTF)
}

#[test]
fn gltf_keeps_local_space_unless_baking_is_requested() {
    let fixture = Fixture::new("gltf");
    let path = write_gltf_triangle(&fixture);

    let mut gpu = HeadlessGpu::new();
    let local = load_model(&path, &ImportOptions::default(), &mut gpu);
    assert_eq!(local.meshes.len(), 1);
    assert_eq!(local.meshes[0].vertices[2].position, [0.0, 1.0, 0.0]);
    assert_eq!(local.meshes[0].textures[0].kind, TextureKind::Diffuse);
    assert_indices_in_range(&local);

    let options = ImportOptions {
        bake_node_transforms: true,
        ..Default::default()
    };
    let baked = load_model(&path, &options, &mut gpu);
    assert_eq!(baked.meshes[0].vertices[2].position, [0.0, 3.0, 0.0]);
}
