use std::rc::Rc;

use cgmath::{InnerSpace, Matrix, SquareMatrix};

use crate::{
    data_structures::{
        model::{Mesh, ModelVertex},
        texture::{Texture, TextureCache, TextureKind},
    },
    gpu::GraphicsApi,
    resources::{
        ImportOptions,
        scene::{SceneMaterial, SceneMesh},
        texture::ImageDecoder,
    },
};

/**
 * Interleaves the importer's per-attribute arrays into one vertex per position.
 *
 * Missing normals become zero vectors and vertices without a first texture
 * coordinate set get (0, 0). When `transform` is given, positions and normals
 * are moved into that space.
 */
pub fn build_vertices(
    mesh: &SceneMesh,
    options: &ImportOptions,
    transform: Option<&cgmath::Matrix4<f32>>,
) -> Vec<ModelVertex> {
    let uvs = mesh.tex_coords.first();
    let normal_matrix = transform.map(normal_matrix);

    mesh.positions
        .iter()
        .enumerate()
        .map(|(i, &position)| {
            let normal = mesh.normals.get(i).copied().unwrap_or([0.0; 3]);
            // Flipping only applies to coordinates the mesh actually has.
            let tex_coords = match uvs.and_then(|set| set.get(i)) {
                Some(&[u, v]) if options.flip_uvs => [u, 1.0 - v],
                Some(&uv) => uv,
                None => [0.0; 2],
            };
            match (transform, normal_matrix) {
                (Some(m), Some(n)) => ModelVertex {
                    position: (*m * cgmath::Vector3::from(position).extend(1.0))
                        .truncate()
                        .into(),
                    normal: normalize_or_zero(n * cgmath::Vector3::from(normal)).into(),
                    tex_coords,
                },
                _ => ModelVertex {
                    position,
                    normal,
                    tex_coords,
                },
            }
        })
        .collect()
}

/// Flattens faces into a triangle list.
///
/// Faces that are not triangles or that reference a missing vertex are
/// dropped with a warning, so every returned index is below `vertex_count`.
pub fn build_indices(mesh: &SceneMesh, vertex_count: usize) -> Vec<u32> {
    let mut indices = Vec::with_capacity(mesh.faces.len() * 3);
    let mut not_triangles = 0usize;
    let mut out_of_range = 0usize;
    for face in &mesh.faces {
        if face.len() != 3 {
            not_triangles += 1;
        } else if face.iter().any(|&i| i as usize >= vertex_count) {
            out_of_range += 1;
        } else {
            indices.extend_from_slice(face);
        }
    }
    if not_triangles > 0 || out_of_range > 0 {
        log::warn!(
            "Mesh {} lost {} non-triangle and {} out-of-range faces",
            mesh.name,
            not_triangles,
            out_of_range
        );
    }
    indices
}

/// Loads the material's diffuse textures followed by its specular textures.
pub fn material_textures<G: GraphicsApi + ?Sized>(
    material: &SceneMaterial,
    cache: &mut TextureCache,
    decoder: &dyn ImageDecoder,
    gpu: &mut G,
) -> Vec<Rc<Texture>> {
    [TextureKind::Diffuse, TextureKind::Specular]
        .into_iter()
        .flat_map(|kind| material.textures(kind).iter().map(move |path| (kind, path)))
        .map(|(kind, path)| cache.load(path, kind, decoder, gpu))
        .collect()
}

/// Converts one imported mesh and uploads it.
pub fn load_mesh<G: GraphicsApi + ?Sized>(
    mesh: &SceneMesh,
    materials: &[SceneMaterial],
    options: &ImportOptions,
    transform: Option<&cgmath::Matrix4<f32>>,
    cache: &mut TextureCache,
    decoder: &dyn ImageDecoder,
    gpu: &mut G,
) -> Mesh {
    let vertices = build_vertices(mesh, options, transform);
    let indices = build_indices(mesh, vertices.len());

    let textures = match mesh.material.map(|idx| (idx, materials.get(idx))) {
        Some((_, Some(material))) => material_textures(material, cache, decoder, gpu),
        Some((idx, None)) => {
            log::warn!("Mesh {} references missing material {}", mesh.name, idx);
            Vec::new()
        }
        None => Vec::new(),
    };

    log::debug!(
        "Mesh {}: {} vertices, {} faces, {} textures",
        mesh.name,
        vertices.len(),
        indices.len() / 3,
        textures.len()
    );
    Mesh::new(mesh.name.clone(), vertices, indices, textures, gpu)
}

fn normal_matrix(m: &cgmath::Matrix4<f32>) -> cgmath::Matrix3<f32> {
    let upper = cgmath::Matrix3::from_cols(m.x.truncate(), m.y.truncate(), m.z.truncate());
    upper.invert().map(|inv| inv.transpose()).unwrap_or(upper)
}

fn normalize_or_zero(v: cgmath::Vector3<f32>) -> cgmath::Vector3<f32> {
    if v.magnitude2() > 0.0 { v.normalize() } else { v }
}
