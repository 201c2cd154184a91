//! mesh-ngin
//!
//! A small OpenGL model viewer. Scene files are imported into flat lists of
//! meshes whose vertex and index data is uploaded once, material textures are
//! decoded once per path and shared between meshes, and a whole model can be
//! drawn thousands of times with a single instanced call per mesh.
//!
//! High-level modules
//! - `camera`: fly camera, projection and the input-driven controller
//! - `config`: viewer configuration loaded from JSON
//! - `context`: window and OpenGL context bootstrap
//! - `data_structures`: meshes, models, textures and instances
//! - `flow`: application state, frame loop and the demo flows
//! - `gpu`: graphics API abstraction with an OpenGL and a headless back end
//! - `resources`: scene importers, image decoding and model loading
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod gpu;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use data_structures::model::{DrawModel, Mesh, Model, ModelVertex};
pub use resources::{ImportError, ImportOptions, load_model};
