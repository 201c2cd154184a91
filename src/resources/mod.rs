/**
 * This module contains all logic for loading meshes and textures from external files.
 *
 * Scene files are parsed by a [`SceneImporter`] into an importer-neutral
 * [`ImportedScene`], which is then walked depth-first and uploaded mesh by mesh.
 */
pub mod gltf;
pub mod mesh;
pub mod obj;
pub mod scene;
pub mod texture;

use std::path::{Path, PathBuf};

use cgmath::SquareMatrix;
use serde::Deserialize;

use crate::{
    data_structures::model::Model,
    gpu::GraphicsApi,
    resources::{
        scene::{ImportedScene, SceneImporter, SceneNode},
        texture::{ImageCrateDecoder, ImageDecoder},
    },
};

/// Post-processing applied while turning an imported scene into GPU meshes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Replace every v texture coordinate with `1 - v`.
    pub flip_uvs: bool,
    /// Apply accumulated node transforms to vertex positions and normals.
    /// Off by default: every mesh is kept in its own local space.
    pub bake_node_transforms: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("no importer for file extension {0:?}")]
    Unsupported(String),
    #[error("{0}")]
    NoScene(String),
    #[error("scene is incomplete")]
    Incomplete,
    #[error("scene has no root node")]
    NoRootNode,
}

/// Picks the importer for `path` by its (case-insensitive) extension.
pub fn importer_for(path: &Path) -> Result<Box<dyn SceneImporter>, ImportError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "obj" => Ok(Box::new(obj::ObjImporter)),
        "gltf" | "glb" => Ok(Box::new(gltf::GltfImporter)),
        _ => Err(ImportError::Unsupported(ext)),
    }
}

/// Directory texture paths are resolved against: everything before the last separator.
pub fn model_directory(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Loads a model from disk with the importer matching its extension.
///
/// Never fails: problems are logged and an empty model is returned.
pub fn load_model<G: GraphicsApi + ?Sized>(
    path: impl AsRef<Path>,
    options: &ImportOptions,
    gpu: &mut G,
) -> Model {
    let path = path.as_ref();
    match importer_for(path) {
        Ok(importer) => Model::import(path, options, importer.as_ref(), &ImageCrateDecoder, gpu),
        Err(e) => {
            log::error!("ERROR::IMPORT::{}", e);
            Model::empty(model_directory(path))
        }
    }
}

impl Model {
    /// Imports `path`, logging any failure and falling back to an empty model.
    pub fn import<G: GraphicsApi + ?Sized>(
        path: &Path,
        options: &ImportOptions,
        importer: &dyn SceneImporter,
        decoder: &dyn ImageDecoder,
        gpu: &mut G,
    ) -> Model {
        match Self::try_import(path, options, importer, decoder, gpu) {
            Ok(model) => model,
            Err(e) => {
                log::error!("ERROR::IMPORT::{}", e);
                Model::empty(model_directory(path))
            }
        }
    }

    /// Imports `path` and reports why nothing could be built.
    pub fn try_import<G: GraphicsApi + ?Sized>(
        path: &Path,
        options: &ImportOptions,
        importer: &dyn SceneImporter,
        decoder: &dyn ImageDecoder,
        gpu: &mut G,
    ) -> Result<Model, ImportError> {
        log::info!("Importing model {}", path.display());
        let scene = importer
            .import(path)
            .map_err(|e| ImportError::NoScene(format!("{:#}", e)))?;
        Self::from_scene(&scene, model_directory(path), options, decoder, gpu)
    }

    /// Builds a model from an already imported scene.
    ///
    /// Meshes are appended in depth-first order: a node's own meshes first,
    /// then each child subtree in order.
    pub fn from_scene<G: GraphicsApi + ?Sized>(
        scene: &ImportedScene,
        directory: PathBuf,
        options: &ImportOptions,
        decoder: &dyn ImageDecoder,
        gpu: &mut G,
    ) -> Result<Model, ImportError> {
        if scene.incomplete {
            return Err(ImportError::Incomplete);
        }
        let root = scene.root.as_ref().ok_or(ImportError::NoRootNode)?;

        let mut model = Model::empty(directory);
        process_node(root, cgmath::Matrix4::identity(), scene, options, decoder, gpu, &mut model);
        log::info!(
            "Loaded {} meshes and {} textures from {}",
            model.meshes.len(),
            model.textures.len(),
            model.directory.display()
        );
        Ok(model)
    }
}

fn process_node<G: GraphicsApi + ?Sized>(
    node: &SceneNode,
    parent: cgmath::Matrix4<f32>,
    scene: &ImportedScene,
    options: &ImportOptions,
    decoder: &dyn ImageDecoder,
    gpu: &mut G,
    model: &mut Model,
) {
    let world = parent * node.transform;
    let transform = options.bake_node_transforms.then_some(&world);

    for &idx in &node.meshes {
        let Some(scene_mesh) = scene.meshes.get(idx) else {
            log::warn!("Node {} references missing mesh {}", node.name, idx);
            continue;
        };
        let mesh = mesh::load_mesh(
            scene_mesh,
            &scene.materials,
            options,
            transform,
            &mut model.textures,
            decoder,
            gpu,
        );
        model.meshes.push(mesh);
    }
    for child in &node.children {
        process_node(child, world, scene, options, decoder, gpu, model);
    }
}
