//! Importer-neutral scene description.
//!
//! Importers translate their file format into an [`ImportedScene`]: a tree of
//! nodes referencing meshes by index, plus the materials those meshes use.
//! Nothing here touches the GPU.

use std::path::Path;

use cgmath::SquareMatrix;

use crate::data_structures::texture::TextureKind;

#[derive(Clone, Debug, Default)]
pub struct ImportedScene {
    /// Set when the importer could read the file but not everything a model needs.
    pub incomplete: bool,
    pub root: Option<SceneNode>,
    pub meshes: Vec<SceneMesh>,
    pub materials: Vec<SceneMaterial>,
}

#[derive(Clone, Debug)]
pub struct SceneNode {
    pub name: String,
    /// Transform relative to the parent node.
    pub transform: cgmath::Matrix4<f32>,
    /// Indices into [`ImportedScene::meshes`].
    pub meshes: Vec<usize>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: cgmath::Matrix4::identity(),
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_meshes(mut self, meshes: impl IntoIterator<Item = usize>) -> Self {
        self.meshes.extend(meshes);
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_transform(mut self, transform: cgmath::Matrix4<f32>) -> Self {
        self.transform = transform;
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct SceneMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    /// Empty when the file carries no normals.
    pub normals: Vec<[f32; 3]>,
    /// One entry per texture-coordinate set; only the first is used.
    pub tex_coords: Vec<Vec<[f32; 2]>>,
    /// Vertex indices per face. Triangulating importers yield three per face.
    pub faces: Vec<Vec<u32>>,
    pub material: Option<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SceneMaterial {
    pub name: String,
    /// Texture paths relative to the scene file's directory.
    pub diffuse: Vec<String>,
    pub specular: Vec<String>,
}

impl SceneMaterial {
    pub fn textures(&self, kind: TextureKind) -> &[String] {
        match kind {
            TextureKind::Diffuse => &self.diffuse,
            TextureKind::Specular => &self.specular,
        }
    }
}

/// Parses a scene file, triangulating polygons on the way.
///
/// An `Err` means no scene could be produced at all; its message is the
/// importer's diagnostic.
pub trait SceneImporter {
    fn import(&self, path: &Path) -> anyhow::Result<ImportedScene>;
}
