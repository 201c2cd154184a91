use std::path::PathBuf;

use cgmath::{EuclideanSpace, SquareMatrix};

use crate::{
    config::DemoConfig,
    data_structures::model::Model,
    flow::{AppState, GraphicsFlow},
    gpu::{GraphicsApi, ShaderCompiler, ShaderContext},
    resources::{self, ImportOptions},
};

pub const VERTEX_SHADER: &str = include_str!("../../assets/shaders/model.vert");
pub const FRAGMENT_SHADER: &str = include_str!("../../assets/shaders/model.frag");

/// Attenuation and colours of the single point light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub ambient: cgmath::Vector3<f32>,
    pub diffuse: cgmath::Vector3<f32>,
    pub specular: cgmath::Vector3<f32>,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            ambient: cgmath::Vector3::new(0.5, 0.5, 0.5),
            diffuse: cgmath::Vector3::new(0.0, 1.0, 0.0),
            specular: cgmath::Vector3::new(1.0, 1.0, 1.0),
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
        }
    }
}

impl PointLight {
    /// Writes the light into `pointLights[index]`.
    pub fn apply(&self, shader: &dyn ShaderContext, index: usize, position: cgmath::Vector3<f32>) {
        let field = |name: &str| format!("pointLights[{}].{}", index, name);
        shader.set_vec3(&field("position"), position);
        shader.set_vec3(&field("ambient"), self.ambient);
        shader.set_vec3(&field("diffuse"), self.diffuse);
        shader.set_vec3(&field("specular"), self.specular);
        shader.set_float(&field("constant"), self.constant);
        shader.set_float(&field("linear"), self.linear);
        shader.set_float(&field("quadratic"), self.quadratic);
    }
}

/// One imported model at the origin, lit by a point light.
pub struct LitModelFlow<G: ShaderCompiler> {
    model_path: PathBuf,
    import: ImportOptions,
    light: PointLight,
    shininess: f32,
    model: Model,
    shader: Option<G::Program>,
}

impl<G: ShaderCompiler> LitModelFlow<G> {
    pub fn new(config: &DemoConfig) -> Self {
        Self {
            model_path: config.model.clone(),
            import: config.import,
            light: PointLight::default(),
            shininess: 32.0,
            model: Model::default(),
            shader: None,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }
}

impl<G: GraphicsApi + ShaderCompiler> GraphicsFlow<G> for LitModelFlow<G> {
    fn on_init(&mut self, gpu: &mut G, _state: &mut AppState) -> anyhow::Result<()> {
        let shader = gpu.compile_program(VERTEX_SHADER, FRAGMENT_SHADER)?;
        self.model = resources::load_model(&self.model_path, &self.import, gpu);
        if self.model.is_empty() {
            log::warn!("{} produced no meshes, nothing will be drawn", self.model_path.display());
        }
        self.shader = Some(shader);
        Ok(())
    }

    fn on_render(&self, gpu: &mut G, state: &AppState) {
        let Some(shader) = &self.shader else {
            return;
        };
        shader.use_program();
        self.light.apply(shader, 0, state.light_position);
        shader.set_vec3("viewPos", state.camera.position.to_vec());
        shader.set_float("material.shininess", self.shininess);
        shader.set_mat4("projection", &state.projection());
        shader.set_mat4("view", &state.view());
        shader.set_mat4("model", &cgmath::Matrix4::identity());
        self.model.draw(gpu, shader);
    }
}
