//! Data structures: models, textures and instances.
//!
//! This module contains the core data types the loaders produce and the frame
//! loop draws:
//!
//! - `model` contains vertices, meshes and models with their GPU buffers
//! - `texture` contains the texture handle type and the per-model texture cache
//! - `instance` holds per-instance transforms and the buffer that feeds them to the GPU

pub mod instance;
pub mod model;
pub mod texture;
