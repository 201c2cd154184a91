use std::path::Path;

use crate::resources::scene::{ImportedScene, SceneImporter, SceneMaterial, SceneMesh, SceneNode};

/// Wavefront OBJ importer backed by `tobj`.
///
/// OBJ has no node hierarchy, so every object becomes a mesh of a single root
/// node, in file order.
#[derive(Clone, Copy, Debug, Default)]
pub struct ObjImporter;

impl SceneImporter for ObjImporter {
    fn import(&self, path: &Path) -> anyhow::Result<ImportedScene> {
        let (models, materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )?;

        let materials = match materials {
            Ok(materials) => materials.into_iter().map(to_scene_material).collect(),
            Err(e) => {
                log::warn!(
                    "Materials of {} could not be loaded, meshes stay untextured: {}",
                    path.display(),
                    e
                );
                Vec::new()
            }
        };

        // tobj reports a nameless, empty object even for files without geometry.
        let meshes: Vec<SceneMesh> = models
            .into_iter()
            .filter(|m| !m.mesh.positions.is_empty() && !m.mesh.indices.is_empty())
            .map(to_scene_mesh)
            .collect();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "root".to_string());
        let root = SceneNode::new(name).with_meshes(0..meshes.len());

        Ok(ImportedScene {
            incomplete: meshes.is_empty(),
            root: Some(root),
            meshes,
            materials,
        })
    }
}

fn to_scene_material(m: tobj::Material) -> SceneMaterial {
    SceneMaterial {
        name: m.name,
        diffuse: m.diffuse_texture.into_iter().collect(),
        specular: m.specular_texture.into_iter().collect(),
    }
}

fn to_scene_mesh(m: tobj::Model) -> SceneMesh {
    let mesh = m.mesh;
    let positions = mesh
        .positions
        .chunks_exact(3)
        .map(|p| [p[0], p[1], p[2]])
        .collect::<Vec<_>>();
    let normals = mesh
        .normals
        .chunks_exact(3)
        .map(|n| [n[0], n[1], n[2]])
        .collect();
    let tex_coords = if mesh.texcoords.is_empty() {
        Vec::new()
    } else {
        vec![
            mesh.texcoords
                .chunks_exact(2)
                .map(|t| [t[0], t[1]])
                .collect(),
        ]
    };
    // With `triangulate` set tobj leaves the arities empty and every face is a triangle.
    let faces = if mesh.face_arities.is_empty() {
        mesh.indices.chunks(3).map(<[u32]>::to_vec).collect()
    } else {
        let mut start = 0;
        mesh.face_arities
            .iter()
            .map(|&arity| {
                let end = (start + arity as usize).min(mesh.indices.len());
                let face = mesh.indices[start..end].to_vec();
                start = end;
                face
            })
            .collect()
    };

    SceneMesh {
        name: m.name,
        positions,
        normals,
        tex_coords,
        faces,
        material: mesh.material_id,
    }
}
