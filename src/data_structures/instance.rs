//! Instance transformation data for GPU rendering.
//!
//! Per-instance transforms are packed into one GPU buffer and exposed to the
//! vertex shader as a per-instance `mat4`, so a single draw call can render
//! thousands of copies of the same mesh.

use std::mem;

use cgmath::{InnerSpace, One, Rotation3};
use rand::Rng;

use crate::{
    data_structures::model::Mesh,
    gpu::{
        BufferId, BufferTarget, GraphicsApi, Vertex, VertexAttribute, VertexBufferLayout,
        VertexStepMode,
    },
};

/// Per-instance transformation: position, rotation (as quaternion), and scale.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    /// Create a new instance with identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            // `Quaternion::one()` is the identity quaternion (no rotation)
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn to_raw(&self) -> InstanceRaw {
        InstanceRaw::from(self.to_matrix())
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

impl From<cgmath::Vector3<f32>> for Instance {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

/**
 * The raw instance is the actual data stored on the GPU: one column-major model matrix.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
}

impl From<cgmath::Matrix4<f32>> for InstanceRaw {
    fn from(matrix: cgmath::Matrix4<f32>) -> Self {
        Self {
            model: matrix.into(),
        }
    }
}

impl InstanceRaw {
    /// First of the four consecutive locations occupied by the model matrix.
    pub const FIRST_LOCATION: u32 = 3;

    // A mat4 takes up 4 vertex slots as it is technically 4 vec4s.
    const ATTRIBUTES: [VertexAttribute; 4] = [
        VertexAttribute {
            location: Self::FIRST_LOCATION,
            components: 4,
            offset: 0,
        },
        VertexAttribute {
            location: Self::FIRST_LOCATION + 1,
            components: 4,
            offset: mem::size_of::<[f32; 4]>() as i32,
        },
        VertexAttribute {
            location: Self::FIRST_LOCATION + 2,
            components: 4,
            offset: mem::size_of::<[f32; 8]>() as i32,
        },
        VertexAttribute {
            location: Self::FIRST_LOCATION + 3,
            components: 4,
            offset: mem::size_of::<[f32; 12]>() as i32,
        },
    ];
}

/**
 * Stride is one full matrix. The step mode is per instance, so the shader
 * only moves on to the next matrix when it starts a new instance.
 */
impl Vertex for InstanceRaw {
    fn desc() -> VertexBufferLayout {
        VertexBufferLayout {
            stride: mem::size_of::<InstanceRaw>() as i32,
            step_mode: VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// A set of instance transforms uploaded once as a single GPU buffer.
#[derive(Debug)]
pub struct InstanceBuffer {
    buffer: BufferId,
    count: u32,
}

impl InstanceBuffer {
    pub fn new<G: GraphicsApi + ?Sized>(gpu: &mut G, transforms: &[cgmath::Matrix4<f32>]) -> Self {
        let raw = transforms
            .iter()
            .map(|&m| InstanceRaw::from(m))
            .collect::<Vec<_>>();
        let buffer = gpu.create_buffer();
        gpu.upload_buffer(BufferTarget::Array, buffer, bytemuck::cast_slice(&raw));
        gpu.bind_buffer(BufferTarget::Array, None);
        Self {
            buffer,
            count: raw.len() as u32,
        }
    }

    pub fn from_instances<G: GraphicsApi + ?Sized>(gpu: &mut G, instances: &[Instance]) -> Self {
        let transforms = instances.iter().map(Instance::to_matrix).collect::<Vec<_>>();
        Self::new(gpu, &transforms)
    }

    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    pub fn len(&self) -> u32 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Wires the instance matrix into every mesh's vertex array.
    ///
    /// Call once after the meshes exist and before the first instanced draw;
    /// the binding lives in the vertex arrays and is not repeated per frame.
    pub fn bind_to<G: GraphicsApi + ?Sized>(&self, gpu: &mut G, meshes: &[Mesh]) {
        let layout = InstanceRaw::desc();
        for mesh in meshes {
            gpu.bind_vertex_array(Some(mesh.vertex_array()));
            gpu.bind_buffer(BufferTarget::Array, Some(self.buffer));
            gpu.set_vertex_layout(&layout);
            gpu.bind_vertex_array(None);
        }
        gpu.bind_buffer(BufferTarget::Array, None);
    }

    pub fn destroy<G: GraphicsApi + ?Sized>(&self, gpu: &mut G) {
        gpu.delete_buffer(self.buffer);
    }
}

/// Scatters `amount` instances along a ring in the XZ plane.
///
/// Each instance draws one displacement in `[-offset, offset)` and applies it
/// to x, to z, and at 40% to y. It is then scaled uniformly between 0.05 and
/// 0.25 and rotated by a random angle around a fixed tilted axis.
pub fn ring_field<R: Rng>(
    amount: usize,
    radius: f32,
    offset: f32,
    rng: &mut R,
) -> Vec<Instance> {
    let axis = cgmath::Vector3::new(0.4, 0.6, 0.8).normalize();
    (0..amount)
        .map(|i| {
            let angle = i as f32 / amount as f32 * 360.0;
            let displacement = if offset > 0.0 {
                rng.random_range(-offset..offset)
            } else {
                0.0
            };
            let x = angle.sin() * radius + displacement;
            let y = displacement * 0.4;
            let z = angle.cos() * radius + displacement;

            let scale = rng.random_range(0.05f32..0.25);
            let rotation = cgmath::Quaternion::from_axis_angle(
                axis,
                cgmath::Deg(rng.random_range(0.0f32..360.0)),
            );
            Instance {
                position: cgmath::Vector3::new(x, y, z),
                rotation,
                scale: cgmath::Vector3::new(scale, scale, scale),
            }
        })
        .collect()
}
