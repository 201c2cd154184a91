use std::num::NonZeroU32;

use anyhow::{Context as _, anyhow};
use glutin::{
    config::{Config, ConfigTemplateBuilder, GlConfig},
    context::{ContextApi, ContextAttributesBuilder, GlProfile, PossiblyCurrentContext, Version},
    display::{GetGlDisplay, GlDisplay},
    prelude::NotCurrentGlContext,
    surface::{GlSurface, Surface, SwapInterval, WindowSurface},
};
use glutin_winit::{DisplayBuilder, GlWindow};
use raw_window_handle::HasWindowHandle;
use winit::{
    dpi::LogicalSize,
    event_loop::ActiveEventLoop,
    window::{CursorGrabMode, Window},
};

use crate::{config::DemoConfig, gpu::gl::GlDevice};

/// The window together with its current OpenGL 3.3 core context.
pub struct Context {
    pub gpu: GlDevice,
    surface: Surface<WindowSurface>,
    gl_context: PossiblyCurrentContext,
    // Dropped last: the surface and context refer to it.
    window: Window,
}

impl Context {
    pub fn new(event_loop: &ActiveEventLoop, config: &DemoConfig) -> anyhow::Result<Self> {
        let window_attributes = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(LogicalSize::new(config.width, config.height));

        let template = ConfigTemplateBuilder::new().with_depth_size(24);
        let (window, gl_config) = DisplayBuilder::new()
            .with_window_attributes(Some(window_attributes))
            .build(event_loop, template, pick_config)
            .map_err(|e| anyhow!("creating GL display: {}", e))?;
        let window = window.ok_or_else(|| anyhow!("display builder returned no window"))?;
        log::info!(
            "GL config: {} samples, depth {}",
            gl_config.num_samples(),
            gl_config.depth_size()
        );

        let raw_window = window.window_handle()?.as_raw();
        let context_attributes = ContextAttributesBuilder::new()
            .with_profile(GlProfile::Core)
            .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
            .build(Some(raw_window));

        let display = gl_config.display();
        let not_current = unsafe { display.create_context(&gl_config, &context_attributes) }
            .context("creating GL 3.3 core context")?;

        let surface_attributes = window.build_surface_attributes(Default::default())?;
        let surface = unsafe { display.create_window_surface(&gl_config, &surface_attributes) }
            .context("creating window surface")?;
        let gl_context = not_current.make_current(&surface)?;

        if let Err(e) =
            surface.set_swap_interval(&gl_context, SwapInterval::Wait(NonZeroU32::MIN))
        {
            log::warn!("Could not enable vsync: {}", e);
        }

        let gl = unsafe {
            glow::Context::from_loader_function_cstr(|symbol| display.get_proc_address(symbol))
        };
        // Mouse look reads device motion; the cursor only has to stay out of the way.
        if let Err(e) = window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined))
        {
            log::warn!("Could not grab the cursor: {}", e);
        }
        window.set_cursor_visible(false);

        let gpu = GlDevice::new(gl);
        let size = window.inner_size();
        gpu.viewport(size.width, size.height);
        gpu.enable_depth_test();

        Ok(Self {
            gpu,
            surface,
            gl_context,
            window,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if let (Some(w), Some(h)) = (NonZeroU32::new(width), NonZeroU32::new(height)) {
            self.surface.resize(&self.gl_context, w, h);
            self.gpu.viewport(width, height);
        }
    }

    /// Clears colour and depth for a new frame.
    pub fn begin_frame(&self, clear_colour: [f32; 4]) {
        self.gpu.enable_depth_test();
        self.gpu.clear(clear_colour);
    }

    pub fn swap_buffers(&self) -> anyhow::Result<()> {
        self.surface.swap_buffers(&self.gl_context)?;
        Ok(())
    }
}

// The picker must hand back a `Config` and has no error channel. An empty
// iterator means the display offers no GL configuration at all, a state the
// viewer cannot start from, so this is the one panic outside tests. The
// same reduce-then-unwrap shape is what glutin-winit's own examples use.
fn pick_config(configs: Box<dyn Iterator<Item = Config> + '_>) -> Config {
    most_samples(configs, |config| config.num_samples()).expect("display offered no GL configs")
}

/// The candidate with the most samples; ties keep the earliest.
fn most_samples<T>(candidates: impl Iterator<Item = T>, samples: impl Fn(&T) -> u8) -> Option<T> {
    candidates.reduce(|best, candidate| {
        if samples(&candidate) > samples(&best) {
            candidate
        } else {
            best
        }
    })
}
