//! Graphics API abstraction.
//!
//! The loaders and meshes in this crate never talk to OpenGL directly. They
//! issue commands against [`GraphicsApi`], a retained-mode resource model where
//! every GPU object is an opaque integer handle and binding state is global to
//! the context. Two back ends exist:
//!
//! - [`gl::GlDevice`] drives a real OpenGL 3.3 core context through `glow`
//! - [`headless::HeadlessGpu`] hands out handles and records every command,
//!   which is what the tests assert against
//!
//! Shader programs are reached through [`ShaderContext`], which only knows how
//! to set named uniforms on the currently used program.

pub mod gl;
pub mod headless;

/// Handle of a vertex array object (the bound vertex layout plus its element buffer).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct VertexArrayId(pub u32);

/// Handle of a GPU buffer (vertex, index or instance data).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

/// Handle of a 2D texture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Per-vertex or per-instance attribute data.
    Array,
    /// Triangle indices, captured by the bound vertex array.
    ElementArray,
}

/// Pixel layout of an uploaded texture, picked from the decoded channel count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Red,
    Rgb,
    Rgba,
}

impl TextureFormat {
    /// Maps 1, 3 and 4 channels to single-channel, RGB and RGBA.
    ///
    /// Two-channel (luminance + alpha) and any other count are rejected.
    pub fn from_channels(channels: u8) -> Option<Self> {
        match channels {
            1 => Some(TextureFormat::Red),
            3 => Some(TextureFormat::Rgb),
            4 => Some(TextureFormat::Rgba),
            _ => None,
        }
    }

    pub fn channels(&self) -> u8 {
        match self {
            TextureFormat::Red => 1,
            TextureFormat::Rgb => 3,
            TextureFormat::Rgba => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WrapMode {
    Repeat,
    ClampToEdge,
    MirroredRepeat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    Linear,
    /// Linear within and between mip levels. Only valid for minification.
    LinearMipmapLinear,
}

/// Sampling state stored on a texture object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplerParams {
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
}

impl Default for SamplerParams {
    fn default() -> Self {
        Self {
            wrap_s: WrapMode::Repeat,
            wrap_t: WrapMode::Repeat,
            min_filter: FilterMode::LinearMipmapLinear,
            mag_filter: FilterMode::Linear,
        }
    }
}

/// How often an attribute advances: once per vertex or once per drawn instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexStepMode {
    Vertex,
    Instance,
}

impl VertexStepMode {
    /// The attribute divisor OpenGL expects for this step mode.
    pub fn divisor(&self) -> u32 {
        match self {
            VertexStepMode::Vertex => 0,
            VertexStepMode::Instance => 1,
        }
    }
}

/// A float attribute read from the currently bound array buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    /// Number of f32 components (1 to 4).
    pub components: i32,
    pub offset: i32,
}

/// Describes how the bytes of one array buffer map onto shader locations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexBufferLayout {
    pub stride: i32,
    pub step_mode: VertexStepMode,
    pub attributes: &'static [VertexAttribute],
}

/// Types that can be uploaded into an array buffer and described to the GPU.
pub trait Vertex: bytemuck::Pod {
    fn desc() -> VertexBufferLayout;
}

/// Resource creation, binding and draw primitives of a stateful graphics API.
///
/// Methods mirror the OpenGL calls they stand for: bindings are global, array
/// buffer layouts are captured by whichever vertex array is bound, and draw
/// calls read indices from the bound vertex array's element buffer. Resource
/// creation never fails at this level; a back end that cannot allocate hands
/// out the null handle `0`.
pub trait GraphicsApi {
    fn create_vertex_array(&mut self) -> VertexArrayId;

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>);

    fn create_buffer(&mut self) -> BufferId;

    /// Binds `buffer` to `target` and fills it with static data.
    fn upload_buffer(&mut self, target: BufferTarget, buffer: BufferId, data: &[u8]);

    /// Binds `buffer` to `target` without touching its contents.
    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferId>);

    /// Enables and points every attribute of `layout` at the bound array buffer.
    fn set_vertex_layout(&mut self, layout: &VertexBufferLayout);

    fn create_texture(&mut self) -> TextureId;

    /// Uploads tightly packed 8-bit pixels as mip level 0.
    fn upload_texture_2d(
        &mut self,
        texture: TextureId,
        width: u32,
        height: u32,
        format: TextureFormat,
        pixels: &[u8],
    );

    fn generate_mipmap(&mut self, texture: TextureId);

    fn set_sampler(&mut self, texture: TextureId, params: SamplerParams);

    /// Selects texture unit `unit` (0-based) for subsequent texture binds.
    fn active_texture(&mut self, unit: u32);

    fn bind_texture(&mut self, texture: Option<TextureId>);

    /// Draws `count` indices of the bound vertex array as a triangle list.
    fn draw_elements(&mut self, count: u32);

    /// Same as [`draw_elements`](Self::draw_elements), repeated `instances` times in one call.
    fn draw_elements_instanced(&mut self, count: u32, instances: u32);

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId);

    fn delete_buffer(&mut self, buffer: BufferId);

    fn delete_texture(&mut self, texture: TextureId);
}

/// Named uniform access on a shader program.
///
/// Setters apply to the program made current by [`use_program`](Self::use_program).
/// Names that the program does not declare are ignored, as in OpenGL.
pub trait ShaderContext {
    fn use_program(&self);

    fn set_int(&self, name: &str, value: i32);

    fn set_float(&self, name: &str, value: f32);

    fn set_vec3(&self, name: &str, value: cgmath::Vector3<f32>);

    fn set_mat4(&self, name: &str, value: &cgmath::Matrix4<f32>);
}

/// Back ends that can build shader programs from GLSL sources.
pub trait ShaderCompiler {
    type Program: ShaderContext;

    fn compile_program(&mut self, vertex: &str, fragment: &str) -> anyhow::Result<Self::Program>;
}
