//! A window-less [`GraphicsApi`] that records instead of rendering.
//!
//! Handles are allocated from per-kind counters starting at 1, uploads are
//! kept so their sizes can be inspected, and every call is appended to a
//! [`Command`] log. Useful for validating assets without a GL context and for
//! asserting exactly which GPU calls a loader or draw issued.

use std::{cell::RefCell, rc::Rc};

use super::{
    BufferId, BufferTarget, GraphicsApi, SamplerParams, ShaderCompiler, ShaderContext,
    TextureFormat, TextureId, VertexArrayId, VertexBufferLayout,
};

/// One recorded call against the headless device.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    CreateVertexArray(VertexArrayId),
    BindVertexArray(Option<VertexArrayId>),
    CreateBuffer(BufferId),
    UploadBuffer {
        target: BufferTarget,
        buffer: BufferId,
        bytes: usize,
    },
    BindBuffer(BufferTarget, Option<BufferId>),
    SetVertexLayout(VertexBufferLayout),
    CreateTexture(TextureId),
    UploadTexture2d {
        texture: TextureId,
        width: u32,
        height: u32,
        format: TextureFormat,
    },
    GenerateMipmap(TextureId),
    SetSampler(TextureId, SamplerParams),
    ActiveTexture(u32),
    BindTexture(Option<TextureId>),
    DrawElements {
        vertex_array: Option<VertexArrayId>,
        count: u32,
    },
    DrawElementsInstanced {
        vertex_array: Option<VertexArrayId>,
        count: u32,
        instances: u32,
    },
    DeleteVertexArray(VertexArrayId),
    DeleteBuffer(BufferId),
    DeleteTexture(TextureId),
}

#[derive(Debug, Default)]
pub struct HeadlessGpu {
    commands: Vec<Command>,
    next_vertex_array: u32,
    next_buffer: u32,
    next_texture: u32,
    bound_vertex_array: Option<VertexArrayId>,
    active_unit: u32,
    programs: Vec<RecordingShader>,
}

impl HeadlessGpu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Empties the command log; handle counters keep running.
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn count(&self, predicate: impl Fn(&Command) -> bool) -> usize {
        self.commands.iter().filter(|c| predicate(c)).count()
    }

    pub fn draw_calls(&self) -> usize {
        self.count(|c| {
            matches!(
                c,
                Command::DrawElements { .. } | Command::DrawElementsInstanced { .. }
            )
        })
    }

    pub fn texture_uploads(&self) -> usize {
        self.count(|c| matches!(c, Command::UploadTexture2d { .. }))
    }

    pub fn bound_vertex_array(&self) -> Option<VertexArrayId> {
        self.bound_vertex_array
    }

    pub fn active_unit(&self) -> u32 {
        self.active_unit
    }

    /// Every program compiled so far, in creation order.
    pub fn programs(&self) -> &[RecordingShader] {
        &self.programs
    }
}

impl ShaderCompiler for HeadlessGpu {
    type Program = RecordingShader;

    fn compile_program(&mut self, vertex: &str, fragment: &str) -> anyhow::Result<RecordingShader> {
        if vertex.trim().is_empty() || fragment.trim().is_empty() {
            anyhow::bail!("empty shader source");
        }
        let program = RecordingShader::new();
        self.programs.push(program.clone());
        Ok(program)
    }
}

impl GraphicsApi for HeadlessGpu {
    fn create_vertex_array(&mut self) -> VertexArrayId {
        self.next_vertex_array += 1;
        let id = VertexArrayId(self.next_vertex_array);
        self.commands.push(Command::CreateVertexArray(id));
        id
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>) {
        self.bound_vertex_array = vertex_array;
        self.commands.push(Command::BindVertexArray(vertex_array));
    }

    fn create_buffer(&mut self) -> BufferId {
        self.next_buffer += 1;
        let id = BufferId(self.next_buffer);
        self.commands.push(Command::CreateBuffer(id));
        id
    }

    fn upload_buffer(&mut self, target: BufferTarget, buffer: BufferId, data: &[u8]) {
        self.commands.push(Command::UploadBuffer {
            target,
            buffer,
            bytes: data.len(),
        });
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferId>) {
        self.commands.push(Command::BindBuffer(target, buffer));
    }

    fn set_vertex_layout(&mut self, layout: &VertexBufferLayout) {
        self.commands.push(Command::SetVertexLayout(*layout));
    }

    fn create_texture(&mut self) -> TextureId {
        self.next_texture += 1;
        let id = TextureId(self.next_texture);
        self.commands.push(Command::CreateTexture(id));
        id
    }

    fn upload_texture_2d(
        &mut self,
        texture: TextureId,
        width: u32,
        height: u32,
        format: TextureFormat,
        _pixels: &[u8],
    ) {
        self.commands.push(Command::UploadTexture2d {
            texture,
            width,
            height,
            format,
        });
    }

    fn generate_mipmap(&mut self, texture: TextureId) {
        self.commands.push(Command::GenerateMipmap(texture));
    }

    fn set_sampler(&mut self, texture: TextureId, params: SamplerParams) {
        self.commands.push(Command::SetSampler(texture, params));
    }

    fn active_texture(&mut self, unit: u32) {
        self.active_unit = unit;
        self.commands.push(Command::ActiveTexture(unit));
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        self.commands.push(Command::BindTexture(texture));
    }

    fn draw_elements(&mut self, count: u32) {
        self.commands.push(Command::DrawElements {
            vertex_array: self.bound_vertex_array,
            count,
        });
    }

    fn draw_elements_instanced(&mut self, count: u32, instances: u32) {
        self.commands.push(Command::DrawElementsInstanced {
            vertex_array: self.bound_vertex_array,
            count,
            instances,
        });
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.commands.push(Command::DeleteVertexArray(vertex_array));
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.commands.push(Command::DeleteBuffer(buffer));
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.commands.push(Command::DeleteTexture(texture));
    }
}

/// A uniform write captured by [`RecordingShader`].
#[derive(Clone, Debug, PartialEq)]
pub enum Uniform {
    Int(i32),
    Float(f32),
    Vec3([f32; 3]),
    Mat4([[f32; 4]; 4]),
}

/// Shader stand-in that remembers every uniform write in order.
///
/// Clones share their log, so a program handed out by
/// [`HeadlessGpu::compile_program`](ShaderCompiler::compile_program) can
/// still be inspected through [`HeadlessGpu::programs`].
#[derive(Clone, Debug, Default)]
pub struct RecordingShader {
    writes: Rc<RefCell<Vec<(String, Uniform)>>>,
    uses: Rc<RefCell<usize>>,
}

impl RecordingShader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<(String, Uniform)> {
        self.writes.borrow().clone()
    }

    /// The last value written to `name`, if any.
    pub fn get(&self, name: &str) -> Option<Uniform> {
        self.writes
            .borrow()
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, u)| u.clone())
    }

    pub fn uses(&self) -> usize {
        *self.uses.borrow()
    }

    fn push(&self, name: &str, uniform: Uniform) {
        self.writes.borrow_mut().push((name.to_string(), uniform));
    }
}

impl ShaderContext for RecordingShader {
    fn use_program(&self) {
        *self.uses.borrow_mut() += 1;
    }

    fn set_int(&self, name: &str, value: i32) {
        self.push(name, Uniform::Int(value));
    }

    fn set_float(&self, name: &str, value: f32) {
        self.push(name, Uniform::Float(value));
    }

    fn set_vec3(&self, name: &str, value: cgmath::Vector3<f32>) {
        self.push(name, Uniform::Vec3(value.into()));
    }

    fn set_mat4(&self, name: &str, value: &cgmath::Matrix4<f32>) {
        self.push(name, Uniform::Mat4((*value).into()));
    }
}
