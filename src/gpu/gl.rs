//! OpenGL 3.3 core back end built on `glow`.
//!
//! `glow` names objects with non-zero integers, which map one-to-one onto the
//! crate's handle types. A handle of `0` stands for "no object" and binds as
//! `None`, matching what `glGen*` leaves behind when allocation fails.

use std::{num::NonZeroU32, rc::Rc};

use anyhow::{Context as _, anyhow};
use glow::HasContext;

use super::{
    BufferId, BufferTarget, FilterMode, GraphicsApi, SamplerParams, ShaderCompiler, ShaderContext,
    TextureFormat, TextureId, VertexArrayId, VertexBufferLayout, WrapMode,
};

fn buffer_target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Array => glow::ARRAY_BUFFER,
        BufferTarget::ElementArray => glow::ELEMENT_ARRAY_BUFFER,
    }
}

fn native_buffer(id: BufferId) -> Option<glow::NativeBuffer> {
    NonZeroU32::new(id.0).map(glow::NativeBuffer)
}

fn native_texture(id: TextureId) -> Option<glow::NativeTexture> {
    NonZeroU32::new(id.0).map(glow::NativeTexture)
}

fn native_vertex_array(id: VertexArrayId) -> Option<glow::NativeVertexArray> {
    NonZeroU32::new(id.0).map(glow::NativeVertexArray)
}

fn format_enum(format: TextureFormat) -> u32 {
    match format {
        TextureFormat::Red => glow::RED,
        TextureFormat::Rgb => glow::RGB,
        TextureFormat::Rgba => glow::RGBA,
    }
}

fn wrap_enum(wrap: WrapMode) -> i32 {
    (match wrap {
        WrapMode::Repeat => glow::REPEAT,
        WrapMode::ClampToEdge => glow::CLAMP_TO_EDGE,
        WrapMode::MirroredRepeat => glow::MIRRORED_REPEAT,
    }) as i32
}

fn filter_enum(filter: FilterMode) -> i32 {
    (match filter {
        FilterMode::Nearest => glow::NEAREST,
        FilterMode::Linear => glow::LINEAR,
        FilterMode::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
    }) as i32
}

/// A [`GraphicsApi`] issuing real GL calls on the current context.
///
/// The context is shared with the [`ShaderProgram`]s created from it.
pub struct GlDevice {
    gl: Rc<glow::Context>,
}

impl GlDevice {
    pub fn new(gl: glow::Context) -> Self {
        Self { gl: Rc::new(gl) }
    }

    pub fn gl(&self) -> Rc<glow::Context> {
        self.gl.clone()
    }

    pub fn viewport(&self, width: u32, height: u32) {
        unsafe {
            self.gl.viewport(0, 0, width as i32, height as i32);
        }
    }

    pub fn clear(&self, colour: [f32; 4]) {
        unsafe {
            self.gl
                .clear_color(colour[0], colour[1], colour[2], colour[3]);
            self.gl
                .clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
    }

    pub fn enable_depth_test(&self) {
        unsafe {
            self.gl.enable(glow::DEPTH_TEST);
        }
    }
}

impl ShaderCompiler for GlDevice {
    type Program = ShaderProgram;

    fn compile_program(&mut self, vertex: &str, fragment: &str) -> anyhow::Result<ShaderProgram> {
        ShaderProgram::new(self.gl.clone(), vertex, fragment)
    }
}

impl GraphicsApi for GlDevice {
    fn create_vertex_array(&mut self) -> VertexArrayId {
        match unsafe { self.gl.create_vertex_array() } {
            Ok(vao) => VertexArrayId(vao.0.get()),
            Err(e) => {
                log::error!("Failed to create vertex array: {}", e);
                VertexArrayId(0)
            }
        }
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>) {
        unsafe {
            self.gl
                .bind_vertex_array(vertex_array.and_then(native_vertex_array));
        }
    }

    fn create_buffer(&mut self) -> BufferId {
        match unsafe { self.gl.create_buffer() } {
            Ok(buffer) => BufferId(buffer.0.get()),
            Err(e) => {
                log::error!("Failed to create buffer: {}", e);
                BufferId(0)
            }
        }
    }

    fn upload_buffer(&mut self, target: BufferTarget, buffer: BufferId, data: &[u8]) {
        let target = buffer_target(target);
        unsafe {
            self.gl.bind_buffer(target, native_buffer(buffer));
            self.gl
                .buffer_data_u8_slice(target, data, glow::STATIC_DRAW);
        }
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferId>) {
        unsafe {
            self.gl
                .bind_buffer(buffer_target(target), buffer.and_then(native_buffer));
        }
    }

    fn set_vertex_layout(&mut self, layout: &VertexBufferLayout) {
        let divisor = layout.step_mode.divisor();
        for attribute in layout.attributes {
            unsafe {
                self.gl.enable_vertex_attrib_array(attribute.location);
                self.gl.vertex_attrib_pointer_f32(
                    attribute.location,
                    attribute.components,
                    glow::FLOAT,
                    false,
                    layout.stride,
                    attribute.offset,
                );
                self.gl.vertex_attrib_divisor(attribute.location, divisor);
            }
        }
    }

    fn create_texture(&mut self) -> TextureId {
        match unsafe { self.gl.create_texture() } {
            Ok(texture) => TextureId(texture.0.get()),
            Err(e) => {
                log::error!("Failed to create texture: {}", e);
                TextureId(0)
            }
        }
    }

    fn upload_texture_2d(
        &mut self,
        texture: TextureId,
        width: u32,
        height: u32,
        format: TextureFormat,
        pixels: &[u8],
    ) {
        let format = format_enum(format);
        unsafe {
            self.gl
                .bind_texture(glow::TEXTURE_2D, native_texture(texture));
            // Rows of RED and RGB images are not necessarily 4-byte aligned.
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                format as i32,
                width as i32,
                height as i32,
                0,
                format,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(pixels)),
            );
        }
    }

    fn generate_mipmap(&mut self, texture: TextureId) {
        unsafe {
            self.gl
                .bind_texture(glow::TEXTURE_2D, native_texture(texture));
            self.gl.generate_mipmap(glow::TEXTURE_2D);
        }
    }

    fn set_sampler(&mut self, texture: TextureId, params: SamplerParams) {
        unsafe {
            self.gl
                .bind_texture(glow::TEXTURE_2D, native_texture(texture));
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                wrap_enum(params.wrap_s),
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                wrap_enum(params.wrap_t),
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                filter_enum(params.min_filter),
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                filter_enum(params.mag_filter),
            );
        }
    }

    fn active_texture(&mut self, unit: u32) {
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
        }
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        unsafe {
            self.gl
                .bind_texture(glow::TEXTURE_2D, texture.and_then(native_texture));
        }
    }

    fn draw_elements(&mut self, count: u32) {
        unsafe {
            self.gl
                .draw_elements(glow::TRIANGLES, count as i32, glow::UNSIGNED_INT, 0);
        }
    }

    fn draw_elements_instanced(&mut self, count: u32, instances: u32) {
        unsafe {
            self.gl.draw_elements_instanced(
                glow::TRIANGLES,
                count as i32,
                glow::UNSIGNED_INT,
                0,
                instances as i32,
            );
        }
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        if let Some(vao) = native_vertex_array(vertex_array) {
            unsafe { self.gl.delete_vertex_array(vao) };
        }
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if let Some(buffer) = native_buffer(buffer) {
            unsafe { self.gl.delete_buffer(buffer) };
        }
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if let Some(texture) = native_texture(texture) {
            unsafe { self.gl.delete_texture(texture) };
        }
    }
}

/// A linked vertex + fragment program.
pub struct ShaderProgram {
    gl: Rc<glow::Context>,
    program: glow::NativeProgram,
}

impl ShaderProgram {
    pub fn new(gl: Rc<glow::Context>, vertex: &str, fragment: &str) -> anyhow::Result<Self> {
        unsafe {
            let program = gl.create_program().map_err(|e| anyhow!(e))?;
            let mut shaders = Vec::with_capacity(2);
            for (kind, source, label) in [
                (glow::VERTEX_SHADER, vertex, "vertex"),
                (glow::FRAGMENT_SHADER, fragment, "fragment"),
            ] {
                let shader = gl
                    .create_shader(kind)
                    .map_err(|e| anyhow!(e))
                    .with_context(|| format!("Cannot create {} shader", label))?;
                gl.shader_source(shader, source);
                gl.compile_shader(shader);
                if !gl.get_shader_compile_status(shader) {
                    let log = gl.get_shader_info_log(shader);
                    gl.delete_shader(shader);
                    gl.delete_program(program);
                    return Err(anyhow!("{} shader failed to compile: {}", label, log));
                }
                gl.attach_shader(program, shader);
                shaders.push(shader);
            }
            gl.link_program(program);
            let linked = gl.get_program_link_status(program);
            for shader in shaders {
                gl.detach_shader(program, shader);
                gl.delete_shader(shader);
            }
            if !linked {
                let log = gl.get_program_info_log(program);
                gl.delete_program(program);
                return Err(anyhow!("shader program failed to link: {}", log));
            }
            Ok(Self { gl, program })
        }
    }

    fn location(&self, name: &str) -> Option<glow::NativeUniformLocation> {
        unsafe { self.gl.get_uniform_location(self.program, name) }
    }
}

impl ShaderContext for ShaderProgram {
    fn use_program(&self) {
        unsafe { self.gl.use_program(Some(self.program)) };
    }

    fn set_int(&self, name: &str, value: i32) {
        unsafe { self.gl.uniform_1_i32(self.location(name).as_ref(), value) };
    }

    fn set_float(&self, name: &str, value: f32) {
        unsafe { self.gl.uniform_1_f32(self.location(name).as_ref(), value) };
    }

    fn set_vec3(&self, name: &str, value: cgmath::Vector3<f32>) {
        unsafe {
            self.gl
                .uniform_3_f32(self.location(name).as_ref(), value.x, value.y, value.z)
        };
    }

    fn set_mat4(&self, name: &str, value: &cgmath::Matrix4<f32>) {
        let columns: &[f32; 16] = value.as_ref();
        unsafe {
            self.gl
                .uniform_matrix_4_f32_slice(self.location(name).as_ref(), false, columns)
        };
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        unsafe { self.gl.delete_program(self.program) };
    }
}
