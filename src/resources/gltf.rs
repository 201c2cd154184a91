use std::path::Path;

use crate::resources::scene::{ImportedScene, SceneImporter, SceneMaterial, SceneMesh, SceneNode};

/// glTF 2.0 importer (`.gltf` with external buffers, or binary `.glb`).
///
/// Each triangle primitive becomes its own mesh. Only base-colour textures
/// referenced by URI are picked up, as the diffuse map.
#[derive(Clone, Copy, Debug, Default)]
pub struct GltfImporter;

impl SceneImporter for GltfImporter {
    fn import(&self, path: &Path) -> anyhow::Result<ImportedScene> {
        let gltf::Gltf { document, blob } = gltf::Gltf::open(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));

        // Resolves the GLB blob, external files and base64 `data:` URIs alike.
        let buffer_data = gltf::import_buffers(&document, Some(base), blob)?;

        let materials = document.materials().map(to_scene_material).collect();

        // Primitives of glTF mesh `i` end up at `mesh_slots[i]` in the flat list.
        let mut meshes = Vec::new();
        let mut mesh_slots = Vec::new();
        for mesh in document.meshes() {
            let mut slots = Vec::new();
            for primitive in mesh.primitives() {
                if primitive.mode() != gltf::mesh::Mode::Triangles {
                    log::warn!(
                        "Skipping {:?} primitive {} of mesh {}",
                        primitive.mode(),
                        primitive.index(),
                        mesh.index()
                    );
                    continue;
                }
                slots.push(meshes.len());
                meshes.push(to_scene_mesh(&mesh, &primitive, &buffer_data));
            }
            mesh_slots.push(slots);
        }

        let scene = document.default_scene().or_else(|| document.scenes().next());
        let root = scene.map(|scene| {
            let mut roots: Vec<SceneNode> = scene
                .nodes()
                .map(|node| to_scene_node(&node, &mesh_slots))
                .collect();
            if roots.len() == 1 {
                roots.remove(0)
            } else {
                let name = scene.name().unwrap_or("scene").to_string();
                roots
                    .into_iter()
                    .fold(SceneNode::new(name), SceneNode::with_child)
            }
        });

        Ok(ImportedScene {
            incomplete: meshes.is_empty(),
            root,
            meshes,
            materials,
        })
    }
}

fn to_scene_node(node: &gltf::Node, mesh_slots: &[Vec<usize>]) -> SceneNode {
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node{}", node.index()));
    let meshes = node
        .mesh()
        .and_then(|mesh| mesh_slots.get(mesh.index()))
        .cloned()
        .unwrap_or_default();
    node.children().fold(
        SceneNode::new(name)
            .with_transform(node.transform().matrix().into())
            .with_meshes(meshes),
        |parent, child| parent.with_child(to_scene_node(&child, mesh_slots)),
    )
}

fn to_scene_mesh(
    mesh: &gltf::Mesh,
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
) -> SceneMesh {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .map(|p| p.collect())
        .unwrap_or_default();
    let normals = reader
        .read_normals()
        .map(|n| n.collect())
        .unwrap_or_default();
    let mut tex_coords = Vec::new();
    while let Some(set) = reader.read_tex_coords(tex_coords.len() as u32) {
        tex_coords.push(set.into_f32().collect());
    }
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    let name = match mesh.name() {
        Some(name) => format!("{}#{}", name, primitive.index()),
        None => format!("mesh{}#{}", mesh.index(), primitive.index()),
    };

    SceneMesh {
        name,
        positions,
        normals,
        tex_coords,
        faces: indices.chunks(3).map(<[u32]>::to_vec).collect(),
        material: primitive.material().index(),
    }
}

fn to_scene_material(material: gltf::Material) -> SceneMaterial {
    let name = material
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("material{}", material.index().unwrap_or_default()));
    let mut diffuse = Vec::new();
    if let Some(info) = material.pbr_metallic_roughness().base_color_texture() {
        match info.texture().source().source() {
            gltf::image::Source::Uri { uri, .. } if uri.starts_with("data:") => {
                log::warn!("Inline base colour texture of {} is not supported", name)
            }
            gltf::image::Source::Uri { uri, .. } => diffuse.push(percent_decode(uri)),
            gltf::image::Source::View { .. } => {
                log::warn!("Embedded base colour texture of {} is not supported", name)
            }
        }
    }
    SceneMaterial {
        name,
        diffuse,
        specular: Vec::new(),
    }
}

/// Decodes `%XX` escapes in a relative URI; malformed escapes are kept as written.
fn percent_decode(uri: &str) -> String {
    let bytes = uri.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let escaped = (bytes[i] == b'%')
            .then(|| uri.get(i + 1..i + 3))
            .flatten()
            .and_then(|hex| u8::from_str_radix(hex, 16).ok());
        match escaped {
            Some(byte) => {
                out.push(byte);
                i += 3;
            }
            None => {
                out.push(bytes[i]);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
