//! Flow control and application event loop.
//!
//! A "flow" is one demo scene: it loads its resources once in
//! [`GraphicsFlow::on_init`] and issues its draw calls every frame in
//! [`GraphicsFlow::on_render`]. Everything the frame loop mutates (camera,
//! timing, quit request) lives in [`AppState`], which is passed explicitly to
//! the flow and to the input handlers.
//!
//! Mouse look reads raw device motion rather than cursor positions, so
//! turning keeps working after the grabbed cursor reaches the window edge.
//!
//! # Lifecycle Flow
//!
//! Each redraw:
//! 1. Tick the frame clock
//! 2. Apply accumulated input to the camera
//! 3. Clear colour and depth
//! 4. Let the flow render
//! 5. Swap buffers and request the next redraw
//!
//! A close request ends the loop at the next event boundary.

pub mod instanced;
pub mod lit;

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowId,
};

use crate::{
    camera::{self, Camera, CameraController, Projection},
    config::{DemoConfig, DemoMode},
    context::Context,
    gpu::{GraphicsApi, ShaderCompiler, gl::GlDevice},
};

/// Trait for implementing a renderable demo scene.
///
/// `G` is the graphics back end; flows are written against the traits so
/// they run the same on a real context and on the headless recorder.
pub trait GraphicsFlow<G: GraphicsApi + ShaderCompiler> {
    /// Load models, compile shaders and upload everything the flow draws.
    fn on_init(&mut self, gpu: &mut G, state: &mut AppState) -> anyhow::Result<()>;

    /// Called every frame before rendering.
    fn on_update(&mut self, _state: &AppState, _dt: Duration) {}

    /// Issue this frame's draw calls.
    fn on_render(&self, gpu: &mut G, state: &AppState);
}

/// Time between consecutive frames.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    delta: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(now: Instant) -> Self {
        Self {
            last: now,
            delta: Duration::ZERO,
        }
    }

    pub fn tick(&mut self) -> Duration {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> Duration {
        self.delta = now.saturating_duration_since(self.last);
        self.last = now;
        self.delta
    }

    pub fn delta(&self) -> Duration {
        self.delta
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutable per-session state shared between input handling and rendering.
#[derive(Debug)]
pub struct AppState {
    pub camera: Camera,
    pub projection: Projection,
    pub controller: CameraController,
    pub clock: FrameClock,
    pub light_position: cgmath::Vector3<f32>,
    pub clear_colour: [f32; 4],
    width: u32,
    height: u32,
    quit: bool,
}

impl AppState {
    pub fn new(config: &DemoConfig) -> Self {
        Self {
            camera: Camera::new(
                config.camera_position,
                camera::DEFAULT_YAW,
                camera::DEFAULT_PITCH,
            ),
            projection: Projection::new(
                config.width,
                config.height,
                camera::DEFAULT_FOVY,
                0.1,
                config.effective_z_far(),
            ),
            controller: CameraController::default(),
            clock: FrameClock::new(),
            light_position: config.light_position.into(),
            clear_colour: config.effective_clear_colour(),
            width: config.width,
            height: config.height,
            quit: false,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.width = width;
            self.height = height;
            self.projection.resize(width, height);
        }
    }

    pub fn handle_key(&mut self, key: KeyCode, state: ElementState) {
        if self.controller.process_keyboard(key, state) || state != ElementState::Pressed {
            return;
        }
        match key {
            KeyCode::Escape => self.quit = true,
            KeyCode::KeyP => {
                let p = self.camera.position;
                log::info!("CAMERA POSITION: {:.3} {:.3} {:.3}", p.x, p.y, p.z);
            }
            _ => {}
        }
    }

    /// Raw mouse motion in device units; device y grows downwards.
    pub fn handle_mouse_motion(&mut self, dx: f64, dy: f64) {
        self.controller.process_mouse(dx, -dy);
    }

    pub fn handle_scroll(&mut self, delta: &MouseScrollDelta) {
        self.controller.process_scroll(delta);
    }

    /// Applies the input gathered since the last frame.
    pub fn update(&mut self, dt: Duration) {
        self.controller
            .update_camera(&mut self.camera, &mut self.projection, dt.as_secs_f32());
    }

    pub fn view(&self) -> cgmath::Matrix4<f32> {
        self.camera.calc_matrix()
    }

    pub fn projection(&self) -> cgmath::Matrix4<f32> {
        self.projection.calc_matrix()
    }

    pub fn request_quit(&mut self) {
        self.quit = true;
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }
}

struct App {
    config: DemoConfig,
    state: AppState,
    flow: Box<dyn GraphicsFlow<GlDevice>>,
    context: Option<Context>,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: DemoConfig) -> Self {
        let state = AppState::new(&config);
        let flow: Box<dyn GraphicsFlow<GlDevice>> = match config.mode {
            DemoMode::Lit => Box::new(lit::LitModelFlow::<GlDevice>::new(&config)),
            DemoMode::Instanced => {
                Box::new(instanced::InstancedFieldFlow::<GlDevice>::new(&config))
            }
        };
        Self {
            config,
            state,
            flow,
            context: None,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.context.is_some() {
            return;
        }
        let mut context = match Context::new(event_loop, &self.config) {
            Ok(context) => context,
            Err(e) => return self.fail(event_loop, e),
        };
        let size = context.window().inner_size();
        self.state.resize(size.width, size.height);

        if let Err(e) = self.flow.on_init(&mut context.gpu, &mut self.state) {
            return self.fail(event_loop, e);
        }
        self.state.clock = FrameClock::new();
        context.window().request_redraw();
        self.context = Some(context);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(context) = &mut self.context else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => self.state.request_quit(),
            WindowEvent::Resized(size) => {
                context.resize(size.width, size.height);
                self.state.resize(size.width, size.height);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state,
                        ..
                    },
                ..
            } => self.state.handle_key(key, state),
            WindowEvent::MouseWheel { delta, .. } => self.state.handle_scroll(&delta),
            WindowEvent::RedrawRequested => {
                let dt = self.state.clock.tick();
                self.state.update(dt);
                self.flow.on_update(&self.state, dt);

                context.begin_frame(self.state.clear_colour);
                self.flow.on_render(&mut context.gpu, &self.state);
                if let Err(e) = context.swap_buffers() {
                    log::error!("Unable to present frame: {:#}", e);
                }
                context.window().request_redraw();
            }
            _ => {}
        }

        if self.state.should_quit() {
            event_loop.exit();
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if self.context.is_none() {
            return;
        }
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.state.handle_mouse_motion(dx, dy);
        }
    }
}

/// Opens the window and runs the demo selected by `config` until it is closed.
pub fn run(config: DemoConfig) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };
    log::info!("Starting {:?} demo with {}", config.mode, config.model.display());

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use cgmath::EuclideanSpace;

    use super::*;

    #[test]
    fn frame_clock_measures_between_ticks() {
        let start = Instant::now();
        let mut clock = FrameClock::starting_at(start);
        assert_eq!(clock.tick_at(start + Duration::from_millis(16)), Duration::from_millis(16));
        assert_eq!(clock.tick_at(start + Duration::from_millis(20)), Duration::from_millis(4));
        assert_eq!(clock.delta(), Duration::from_millis(4));
    }

    #[test]
    fn state_starts_from_config() {
        let config = DemoConfig::default();
        let state = AppState::new(&config);
        assert_eq!(state.camera.position.to_vec(), cgmath::Vector3::new(1.0, 5.0, -22.0));
        assert_eq!(state.light_position, cgmath::Vector3::new(1.2, 10.0, -10.0));
        assert_eq!(state.size(), (800, 600));
        assert_eq!(state.clear_colour, [0.0, 0.0, 0.0, 1.0]);
        assert!(!state.should_quit());
    }

    #[test]
    fn escape_requests_quit() {
        let mut state = AppState::new(&DemoConfig::default());
        state.handle_key(KeyCode::Escape, ElementState::Released);
        assert!(!state.should_quit());
        state.handle_key(KeyCode::Escape, ElementState::Pressed);
        assert!(state.should_quit());
    }

    #[test]
    fn held_key_moves_camera_on_update() {
        let mut state = AppState::new(&DemoConfig::default());
        let start = state.camera.position;
        state.handle_key(KeyCode::KeyW, ElementState::Pressed);
        state.update(Duration::from_millis(200));
        assert!((state.camera.position - start).z > 0.99);

        let moved = state.camera.position;
        state.handle_key(KeyCode::KeyW, ElementState::Released);
        state.update(Duration::from_millis(200));
        assert_eq!(state.camera.position, moved);
    }

    #[test]
    fn mouse_motion_turns_the_camera() {
        let mut state = AppState::new(&DemoConfig::default());
        let yaw = state.camera.yaw();
        state.handle_mouse_motion(50.0, 0.0);
        state.update(Duration::ZERO);
        assert!(state.camera.yaw() > yaw);

        // Moving the mouse up (negative device y) looks up.
        state.handle_mouse_motion(0.0, -30.0);
        state.update(Duration::ZERO);
        assert!(state.camera.pitch().0 > 0.0);
    }

    #[test]
    fn mouse_look_is_not_bounded_by_the_window() {
        let mut state = AppState::new(&DemoConfig::default());
        let yaw = state.camera.yaw();
        // 40 frames of 100 units each, far more than an 800px window allows.
        for _ in 0..40 {
            state.handle_mouse_motion(100.0, 0.0);
            state.update(Duration::ZERO);
        }
        let turned = cgmath::Deg::from(state.camera.yaw() - yaw);
        assert!((turned.0 - 400.0).abs() < 1e-2);
    }

    #[test]
    fn zero_sized_resize_is_ignored() {
        let mut state = AppState::new(&DemoConfig::default());
        state.resize(0, 0);
        assert_eq!(state.size(), (800, 600));
        state.resize(1024, 768);
        assert_eq!(state.size(), (1024, 768));
    }
}
