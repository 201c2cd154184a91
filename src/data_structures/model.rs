//! Meshes, models and how they are drawn.
//!
//! A [`Mesh`] owns one drawable unit: its vertices and indices on the CPU side
//! plus the vertex array, vertex buffer and index buffer they were uploaded to.
//! Uploading happens once in [`Mesh::new`]; afterwards the mesh is immutable.
//! A [`Model`] is the flat list of meshes produced by importing one file,
//! together with the texture cache that file populated.

use std::{mem, path::PathBuf, rc::Rc};

use crate::{
    data_structures::{
        instance::InstanceBuffer,
        texture::{Texture, TextureCache, TextureKind},
    },
    gpu::{
        BufferId, BufferTarget, GraphicsApi, ShaderContext, VertexArrayId, VertexAttribute,
        VertexBufferLayout, VertexStepMode,
    },
};

pub use crate::gpu::Vertex;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl ModelVertex {
    pub const POSITION_LOCATION: u32 = 0;
    pub const NORMAL_LOCATION: u32 = 1;
    pub const TEX_COORDS_LOCATION: u32 = 2;

    const ATTRIBUTES: [VertexAttribute; 3] = [
        VertexAttribute {
            location: Self::POSITION_LOCATION,
            components: 3,
            offset: 0,
        },
        VertexAttribute {
            location: Self::NORMAL_LOCATION,
            components: 3,
            offset: mem::size_of::<[f32; 3]>() as i32,
        },
        VertexAttribute {
            location: Self::TEX_COORDS_LOCATION,
            components: 2,
            offset: mem::size_of::<[f32; 6]>() as i32,
        },
    ];
}

impl Vertex for ModelVertex {
    fn desc() -> VertexBufferLayout {
        VertexBufferLayout {
            stride: mem::size_of::<ModelVertex>() as i32,
            step_mode: VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// One drawable unit with its own GPU buffers.
///
/// Textures are shared with the owning model's [`TextureCache`] and with any
/// other mesh that references the same material path.
#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    pub textures: Vec<Rc<Texture>>,
    vertex_array: VertexArrayId,
    vertex_buffer: BufferId,
    index_buffer: BufferId,
}

impl Mesh {
    /// Uploads vertices and indices as static buffers and records the vertex
    /// layout in a fresh vertex array.
    ///
    /// Every index must be smaller than `vertices.len()`; the mesh loader
    /// guarantees this for imported geometry.
    pub fn new<G: GraphicsApi + ?Sized>(
        name: impl Into<String>,
        vertices: Vec<ModelVertex>,
        indices: Vec<u32>,
        textures: Vec<Rc<Texture>>,
        gpu: &mut G,
    ) -> Self {
        debug_assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));

        let vertex_array = gpu.create_vertex_array();
        let vertex_buffer = gpu.create_buffer();
        let index_buffer = gpu.create_buffer();

        gpu.bind_vertex_array(Some(vertex_array));
        gpu.upload_buffer(
            BufferTarget::Array,
            vertex_buffer,
            bytemuck::cast_slice(&vertices),
        );
        gpu.upload_buffer(
            BufferTarget::ElementArray,
            index_buffer,
            bytemuck::cast_slice(&indices),
        );
        gpu.set_vertex_layout(&ModelVertex::desc());
        gpu.bind_vertex_array(None);

        Self {
            name: name.into(),
            vertices,
            indices,
            textures,
            vertex_array,
            vertex_buffer,
            index_buffer,
        }
    }

    pub fn vertex_array(&self) -> VertexArrayId {
        self.vertex_array
    }

    pub fn num_elements(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Number of triangles, assuming a triangle list.
    pub fn num_faces(&self) -> usize {
        self.indices.len() / 3
    }

    /// Binds each texture to its own unit and tells the shader which unit
    /// holds `material.textureDiffuseN` / `material.textureSpecularN`.
    ///
    /// Diffuse and specular textures are numbered independently from 1,
    /// while units are assigned in texture order. Unit 0 is active on return.
    pub fn bind_textures<G: GraphicsApi + ?Sized>(&self, gpu: &mut G, shader: &dyn ShaderContext) {
        let mut diffuse_number = 1;
        let mut specular_number = 1;
        for (unit, texture) in self.textures.iter().enumerate() {
            let unit = unit as u32;
            gpu.active_texture(unit);
            let number = match texture.kind {
                TextureKind::Diffuse => {
                    diffuse_number += 1;
                    diffuse_number - 1
                }
                TextureKind::Specular => {
                    specular_number += 1;
                    specular_number - 1
                }
            };
            shader.set_int(&texture.kind.uniform_name(number), unit as i32);
            gpu.bind_texture(Some(texture.id));
        }
        gpu.active_texture(0);
    }

    /// Releases the mesh's buffers. Textures belong to the cache.
    pub fn destroy<G: GraphicsApi + ?Sized>(&self, gpu: &mut G) {
        gpu.delete_vertex_array(self.vertex_array);
        gpu.delete_buffer(self.vertex_buffer);
        gpu.delete_buffer(self.index_buffer);
    }
}

/// All meshes imported from one scene file, in traversal order.
#[derive(Debug, Default)]
pub struct Model {
    pub meshes: Vec<Mesh>,
    pub directory: PathBuf,
    pub textures: TextureCache,
}

impl Model {
    /// A model with no meshes, which is what failed imports produce.
    pub fn empty(directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();
        Self {
            meshes: Vec::new(),
            textures: TextureCache::new(directory.clone()),
            directory,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn draw<G: GraphicsApi + ?Sized>(&self, gpu: &mut G, shader: &dyn ShaderContext) {
        gpu.draw_model(self, shader);
    }

    /// Draws every mesh once per instance in `instances`.
    ///
    /// `instances` must have been bound to these meshes with
    /// [`InstanceBuffer::bind_to`] beforehand.
    pub fn draw_instanced<G: GraphicsApi + ?Sized>(
        &self,
        gpu: &mut G,
        shader: &dyn ShaderContext,
        instances: &InstanceBuffer,
    ) {
        gpu.draw_model_instanced(self, shader, instances.len());
    }

    pub fn destroy<G: GraphicsApi + ?Sized>(&self, gpu: &mut G) {
        for mesh in &self.meshes {
            mesh.destroy(gpu);
        }
        for texture in self.textures.handles() {
            gpu.delete_texture(texture);
        }
    }
}

/// Draw helpers available on every [`GraphicsApi`].
pub trait DrawModel {
    fn draw_mesh(&mut self, mesh: &Mesh, shader: &dyn ShaderContext);

    fn draw_mesh_instanced(&mut self, mesh: &Mesh, shader: &dyn ShaderContext, instances: u32);

    fn draw_model(&mut self, model: &Model, shader: &dyn ShaderContext);

    fn draw_model_instanced(&mut self, model: &Model, shader: &dyn ShaderContext, instances: u32);
}

impl<G> DrawModel for G
where
    G: GraphicsApi + ?Sized,
{
    fn draw_mesh(&mut self, mesh: &Mesh, shader: &dyn ShaderContext) {
        mesh.bind_textures(self, shader);
        self.bind_vertex_array(Some(mesh.vertex_array));
        self.draw_elements(mesh.num_elements());
        self.bind_vertex_array(None);
    }

    fn draw_mesh_instanced(&mut self, mesh: &Mesh, shader: &dyn ShaderContext, instances: u32) {
        mesh.bind_textures(self, shader);
        self.bind_vertex_array(Some(mesh.vertex_array));
        self.draw_elements_instanced(mesh.num_elements(), instances);
        self.bind_vertex_array(None);
    }

    fn draw_model(&mut self, model: &Model, shader: &dyn ShaderContext) {
        for mesh in &model.meshes {
            self.draw_mesh(mesh, shader);
        }
    }

    fn draw_model_instanced(&mut self, model: &Model, shader: &dyn ShaderContext, instances: u32) {
        for mesh in &model.meshes {
            self.draw_mesh_instanced(mesh, shader, instances);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{
        TextureId,
        headless::{Command, HeadlessGpu, RecordingShader, Uniform},
    };

    fn triangle() -> (Vec<ModelVertex>, Vec<u32>) {
        let vertices = vec![
            ModelVertex {
                position: [0.0, 0.0, 0.0],
                ..Default::default()
            },
            ModelVertex {
                position: [1.0, 0.0, 0.0],
                ..Default::default()
            },
            ModelVertex {
                position: [0.0, 1.0, 0.0],
                ..Default::default()
            },
        ];
        (vertices, vec![0, 1, 2])
    }

    fn texture(id: u32, kind: TextureKind) -> Rc<Texture> {
        Rc::new(Texture {
            id: TextureId(id),
            kind,
            path: format!("{}.png", id),
        })
    }

    #[test]
    fn vertex_layout_matches_struct_offsets() {
        let layout = ModelVertex::desc();
        assert_eq!(layout.stride, 32);
        assert_eq!(layout.step_mode, VertexStepMode::Vertex);
        let offsets: Vec<_> = layout
            .attributes
            .iter()
            .map(|a| (a.location, a.components, a.offset))
            .collect();
        assert_eq!(offsets, vec![(0, 3, 0), (1, 3, 12), (2, 2, 24)]);
    }

    #[test]
    fn construction_uploads_each_buffer_once() {
        let mut gpu = HeadlessGpu::new();
        let (vertices, indices) = triangle();
        let mesh = Mesh::new("tri", vertices, indices, vec![], &mut gpu);

        let uploads: Vec<_> = gpu
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::UploadBuffer { target, bytes, .. } => Some((*target, *bytes)),
                _ => None,
            })
            .collect();
        assert_eq!(
            uploads,
            vec![(BufferTarget::Array, 3 * 32), (BufferTarget::ElementArray, 3 * 4)]
        );
        assert!(gpu
            .commands()
            .contains(&Command::SetVertexLayout(ModelVertex::desc())));
        assert_eq!(gpu.bound_vertex_array(), None);

        gpu.clear_commands();
        gpu.draw_mesh(&mesh, &RecordingShader::new());
        gpu.draw_mesh(&mesh, &RecordingShader::new());
        assert_eq!(gpu.count(|c| matches!(c, Command::UploadBuffer { .. })), 0);
    }

    #[test]
    fn textures_are_numbered_per_kind_on_distinct_units() {
        let mut gpu = HeadlessGpu::new();
        let shader = RecordingShader::new();
        let (vertices, indices) = triangle();
        let mesh = Mesh::new(
            "tri",
            vertices,
            indices,
            vec![
                texture(10, TextureKind::Diffuse),
                texture(11, TextureKind::Specular),
                texture(12, TextureKind::Diffuse),
            ],
            &mut gpu,
        );

        gpu.draw_mesh(&mesh, &shader);

        assert_eq!(
            shader.writes(),
            vec![
                ("material.textureDiffuse1".to_string(), Uniform::Int(0)),
                ("material.textureSpecular1".to_string(), Uniform::Int(1)),
                ("material.textureDiffuse2".to_string(), Uniform::Int(2)),
            ]
        );
        assert_eq!(gpu.active_unit(), 0);
        let binds: Vec<_> = gpu
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::BindTexture(Some(t)) => Some(t.0),
                _ => None,
            })
            .collect();
        assert_eq!(binds, vec![10, 11, 12]);
    }

    #[test]
    fn draw_covers_the_full_index_list() {
        let mut gpu = HeadlessGpu::new();
        let (vertices, indices) = triangle();
        let mesh = Mesh::new("tri", vertices, indices, vec![], &mut gpu);
        gpu.clear_commands();

        gpu.draw_mesh(&mesh, &RecordingShader::new());

        assert!(gpu.commands().contains(&Command::DrawElements {
            vertex_array: Some(mesh.vertex_array()),
            count: 3,
        }));
    }

    #[test]
    fn instanced_draw_is_a_single_call() {
        let mut gpu = HeadlessGpu::new();
        let (vertices, indices) = triangle();
        let mesh = Mesh::new("tri", vertices, indices, vec![], &mut gpu);
        gpu.clear_commands();

        gpu.draw_mesh_instanced(&mesh, &RecordingShader::new(), 250);

        assert_eq!(gpu.draw_calls(), 1);
        assert!(gpu.commands().contains(&Command::DrawElementsInstanced {
            vertex_array: Some(mesh.vertex_array()),
            count: 3,
            instances: 250,
        }));
    }
}
