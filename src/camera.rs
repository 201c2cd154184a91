//! Fly camera, perspective projection and the input-driven controller.

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseScrollDelta},
    keyboard::KeyCode,
};

pub const DEFAULT_YAW: cgmath::Deg<f32> = cgmath::Deg(90.0);
pub const DEFAULT_PITCH: cgmath::Deg<f32> = cgmath::Deg(0.0);
pub const DEFAULT_SPEED: f32 = 5.0;
pub const DEFAULT_SENSITIVITY: f32 = 0.1;
pub const DEFAULT_FOVY: cgmath::Deg<f32> = cgmath::Deg(45.0);

const MIN_FOVY: f32 = 1.0;
const MAX_FOVY: f32 = 45.0;
const MAX_PITCH: f32 = 89.0;

#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3<f32>,
    yaw: Rad<f32>,
    pitch: Rad<f32>,
    world_up: Vector3<f32>,
}

impl Camera {
    pub fn new<V: Into<Point3<f32>>, Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(
        position: V,
        yaw: Y,
        pitch: P,
    ) -> Self {
        Self {
            position: position.into(),
            yaw: yaw.into(),
            pitch: pitch.into(),
            world_up: Vector3::unit_y(),
        }
    }

    pub fn yaw(&self) -> Rad<f32> {
        self.yaw
    }

    pub fn pitch(&self) -> Rad<f32> {
        self.pitch
    }

    pub fn front(&self) -> Vector3<f32> {
        let (sin_pitch, cos_pitch) = self.pitch.0.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.0.sin_cos();
        Vector3::new(cos_yaw * cos_pitch, sin_pitch, sin_yaw * cos_pitch).normalize()
    }

    pub fn right(&self) -> Vector3<f32> {
        self.front().cross(self.world_up).normalize()
    }

    pub fn up(&self) -> Vector3<f32> {
        self.right().cross(self.front()).normalize()
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.front(), self.up())
    }

    /// Turns the camera by mouse offsets in pixels (y grows upwards).
    pub fn rotate(&mut self, x_offset: f32, y_offset: f32, sensitivity: f32, constrain_pitch: bool) {
        self.yaw += Rad::from(cgmath::Deg(x_offset * sensitivity));
        self.pitch += Rad::from(cgmath::Deg(y_offset * sensitivity));
        if constrain_pitch {
            let limit = Rad::from(cgmath::Deg(MAX_PITCH)).0;
            self.pitch.0 = self.pitch.0.clamp(-limit, limit);
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new((0.0, 0.0, 0.0), DEFAULT_YAW, DEFAULT_PITCH)
    }
}

#[derive(Debug, Clone)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn fovy(&self) -> Rad<f32> {
        self.fovy
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Narrows the field of view by `amount` degrees, kept within [1°, 45°].
    pub fn zoom(&mut self, amount: f32) {
        let degrees = cgmath::Deg::from(self.fovy).0 - amount;
        self.fovy = Rad::from(cgmath::Deg(degrees.clamp(MIN_FOVY, MAX_FOVY)));
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Accumulates input between frames and applies it in [`CameraController::update_camera`].
#[derive(Debug)]
pub struct CameraController {
    amount_left: f32,
    amount_right: f32,
    amount_forward: f32,
    amount_backward: f32,
    rotate_horizontal: f32,
    rotate_vertical: f32,
    scroll: f32,
    speed: f32,
    sensitivity: f32,
}

impl CameraController {
    pub fn new(speed: f32, sensitivity: f32) -> Self {
        Self {
            amount_left: 0.0,
            amount_right: 0.0,
            amount_forward: 0.0,
            amount_backward: 0.0,
            rotate_horizontal: 0.0,
            rotate_vertical: 0.0,
            scroll: 0.0,
            speed,
            sensitivity,
        }
    }

    /// Returns whether the key was one of the movement keys.
    pub fn process_keyboard(&mut self, key: KeyCode, state: ElementState) -> bool {
        let amount = if state == ElementState::Pressed { 1.0 } else { 0.0 };
        match key {
            KeyCode::KeyW | KeyCode::ArrowUp => {
                self.amount_forward = amount;
                true
            }
            KeyCode::KeyS | KeyCode::ArrowDown => {
                self.amount_backward = amount;
                true
            }
            KeyCode::KeyA | KeyCode::ArrowLeft => {
                self.amount_left = amount;
                true
            }
            KeyCode::KeyD | KeyCode::ArrowRight => {
                self.amount_right = amount;
                true
            }
            _ => false,
        }
    }

    /// Mouse motion, x to the right and y upwards.
    pub fn process_mouse(&mut self, x_offset: f64, y_offset: f64) {
        self.rotate_horizontal += x_offset as f32;
        self.rotate_vertical += y_offset as f32;
    }

    pub fn process_scroll(&mut self, delta: &MouseScrollDelta) {
        self.scroll += match delta {
            MouseScrollDelta::LineDelta(_, scroll) => *scroll,
            MouseScrollDelta::PixelDelta(PhysicalPosition { y: scroll, .. }) => {
                (*scroll / 100.0) as f32
            }
        };
    }

    pub fn update_camera(&mut self, camera: &mut Camera, projection: &mut Projection, dt: f32) {
        let velocity = self.speed * dt;
        camera.position += camera.front() * (self.amount_forward - self.amount_backward) * velocity;
        camera.position += camera.right() * (self.amount_right - self.amount_left) * velocity;

        camera.rotate(self.rotate_horizontal, self.rotate_vertical, self.sensitivity, true);
        self.rotate_horizontal = 0.0;
        self.rotate_vertical = 0.0;

        if self.scroll != 0.0 {
            projection.zoom(self.scroll);
            self.scroll = 0.0;
        }
    }
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(DEFAULT_SPEED, DEFAULT_SENSITIVITY)
    }
}
