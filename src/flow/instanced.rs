use std::path::PathBuf;

use rand::{SeedableRng, rngs::StdRng};

use crate::{
    config::DemoConfig,
    data_structures::{
        instance::{self, InstanceBuffer},
        model::Model,
    },
    flow::{AppState, GraphicsFlow},
    gpu::{GraphicsApi, ShaderCompiler, ShaderContext},
    resources::{self, ImportOptions},
};

pub const VERTEX_SHADER: &str = include_str!("../../assets/shaders/instanced.vert");
pub const FRAGMENT_SHADER: &str = include_str!("../../assets/shaders/instanced.frag");

/// Copies of one model scattered on a ring, drawn with one instanced call per mesh.
pub struct InstancedFieldFlow<G: ShaderCompiler> {
    model_path: PathBuf,
    import: ImportOptions,
    amount: usize,
    radius: f32,
    offset: f32,
    seed: Option<u64>,
    model: Model,
    instances: Option<InstanceBuffer>,
    shader: Option<G::Program>,
}

impl<G: ShaderCompiler> InstancedFieldFlow<G> {
    pub fn new(config: &DemoConfig) -> Self {
        Self {
            model_path: config.model.clone(),
            import: config.import,
            amount: config.instances,
            radius: config.ring_radius,
            offset: config.ring_offset,
            seed: config.seed,
            model: Model::default(),
            instances: None,
            shader: None,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn instances(&self) -> Option<&InstanceBuffer> {
        self.instances.as_ref()
    }
}

impl<G: GraphicsApi + ShaderCompiler> GraphicsFlow<G> for InstancedFieldFlow<G> {
    fn on_init(&mut self, gpu: &mut G, _state: &mut AppState) -> anyhow::Result<()> {
        let shader = gpu.compile_program(VERTEX_SHADER, FRAGMENT_SHADER)?;
        self.model = resources::load_model(&self.model_path, &self.import, gpu);

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let field = instance::ring_field(self.amount, self.radius, self.offset, &mut rng);
        let instances = InstanceBuffer::from_instances(gpu, &field);
        instances.bind_to(gpu, &self.model.meshes);
        log::info!(
            "Instancing {} copies of {} meshes",
            instances.len(),
            self.model.meshes.len()
        );

        self.instances = Some(instances);
        self.shader = Some(shader);
        Ok(())
    }

    fn on_render(&self, gpu: &mut G, state: &AppState) {
        let (Some(shader), Some(instances)) = (&self.shader, &self.instances) else {
            return;
        };
        if instances.is_empty() {
            return;
        }
        shader.use_program();
        shader.set_mat4("projection", &state.projection());
        shader.set_mat4("view", &state.view());
        self.model.draw_instanced(gpu, shader, instances);
    }
}
