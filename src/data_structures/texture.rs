//! Textures and the per-model texture cache.
//!
//! A [`Texture`] is nothing more than a GPU handle with the role it was loaded
//! for and the material path it came from. Meshes share textures through `Rc`
//! so the same handle can be bound by every mesh that references its path.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    rc::Rc,
};

use crate::{
    gpu::{GraphicsApi, TextureId},
    resources::texture::{ImageDecoder, upload_from_file},
};

/// Material slot a texture is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Diffuse,
    Specular,
}

impl TextureKind {
    /// Sampler name prefix inside the shader's `material` struct.
    pub fn uniform_prefix(&self) -> &'static str {
        match self {
            TextureKind::Diffuse => "textureDiffuse",
            TextureKind::Specular => "textureSpecular",
        }
    }

    /// Full sampler uniform name for the `number`-th texture of this kind (1-based).
    pub fn uniform_name(&self, number: u32) -> String {
        format!("material.{}{}", self.uniform_prefix(), number)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Texture {
    pub id: TextureId,
    pub kind: TextureKind,
    /// Path as written in the material, relative to the model's directory.
    pub path: String,
}

/// Textures loaded while importing one model, keyed by their material path.
///
/// Paths are compared as plain strings: two different paths to identical
/// images are decoded and uploaded twice. Failed loads are not looked up
/// again, so asking again retries the decode, but their empty handles are
/// kept for [`TextureCache::handles`].
#[derive(Debug, Default)]
pub struct TextureCache {
    directory: PathBuf,
    loaded: Vec<Rc<Texture>>,
    by_path: HashMap<String, usize>,
    failed: Vec<TextureId>,
}

impl TextureCache {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Default::default()
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn get(&self, path: &str) -> Option<&Rc<Texture>> {
        self.by_path.get(path).map(|&idx| &self.loaded[idx])
    }

    /// Successfully loaded textures in load order.
    pub fn textures(&self) -> &[Rc<Texture>] {
        &self.loaded
    }

    /// Every handle this cache allocated, including those of failed loads.
    pub fn handles(&self) -> impl Iterator<Item = TextureId> + '_ {
        self.loaded
            .iter()
            .map(|texture| texture.id)
            .chain(self.failed.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }

    /// Returns the texture for `path`, decoding and uploading it on first use.
    ///
    /// A hit returns the cached texture as it was first loaded, including its
    /// kind. On a decode failure the error is logged and a texture whose
    /// handle was allocated but never filled is returned, so rendering
    /// degrades instead of failing.
    pub fn load<G: GraphicsApi + ?Sized>(
        &mut self,
        path: &str,
        kind: TextureKind,
        decoder: &dyn ImageDecoder,
        gpu: &mut G,
    ) -> Rc<Texture> {
        if let Some(texture) = self.get(path) {
            log::debug!("Texture cache hit for {}", path);
            return texture.clone();
        }

        let file = self.directory.join(path);
        let id = gpu.create_texture();
        let texture = Rc::new(Texture {
            id,
            kind,
            path: path.to_string(),
        });
        match upload_from_file(gpu, id, &file, decoder) {
            Ok(()) => {
                self.by_path.insert(path.to_string(), self.loaded.len());
                self.loaded.push(texture.clone());
            }
            Err(e) => {
                log::error!("Texture failed to load at path {}: {:#}", file.display(), e);
                self.failed.push(id);
            }
        }
        texture
    }
}
