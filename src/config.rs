//! Viewer configuration, read from an optional JSON file.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

use crate::resources::ImportOptions;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemoMode {
    /// One model lit by a point light.
    #[default]
    Lit,
    /// A ring of randomly transformed copies drawn with instancing.
    Instanced,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub model: PathBuf,
    pub mode: DemoMode,
    pub instances: usize,
    pub ring_radius: f32,
    pub ring_offset: f32,
    /// Fixed seed for the instance field; random when absent.
    pub seed: Option<u64>,
    pub camera_position: [f32; 3],
    pub light_position: [f32; 3],
    /// Overrides the mode's own background colour.
    pub clear_colour: Option<[f32; 4]>,
    pub z_far: f32,
    pub import: ImportOptions,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            title: "mesh-ngin".to_string(),
            width: 800,
            height: 600,
            model: PathBuf::from("assets/objects/model.obj"),
            mode: DemoMode::Lit,
            instances: 10000,
            ring_radius: 50.0,
            ring_offset: 2.5,
            seed: None,
            camera_position: [1.0, 5.0, -22.0],
            light_position: [1.2, 10.0, -10.0],
            clear_colour: None,
            z_far: 100.0,
            import: ImportOptions::default(),
        }
    }
}

impl DemoConfig {
    pub const INSTANCED_MIN_Z_FAR: f32 = 1000.0;
    pub const LIT_CLEAR_COLOUR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
    pub const INSTANCED_CLEAR_COLOUR: [f32; 4] = [0.1, 0.1, 0.1, 1.0];

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Config from the first CLI argument, or the defaults when there is none.
    pub fn from_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Self> {
        match args.nth(1) {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Background colour: the configured one, else black for the lit model
    /// and dark grey for the instanced ring.
    pub fn effective_clear_colour(&self) -> [f32; 4] {
        self.clear_colour.unwrap_or(match self.mode {
            DemoMode::Lit => Self::LIT_CLEAR_COLOUR,
            DemoMode::Instanced => Self::INSTANCED_CLEAR_COLOUR,
        })
    }

    /// Far plane for the active mode; the instanced ring needs more depth.
    pub fn effective_z_far(&self) -> f32 {
        match self.mode {
            DemoMode::Lit => self.z_far,
            DemoMode::Instanced => self.z_far.max(Self::INSTANCED_MIN_Z_FAR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        assert_eq!(DemoConfig::from_json("{}").unwrap(), DemoConfig::default());
    }

    #[test]
    fn partial_config_overrides_only_given_fields() {
        let config = DemoConfig::from_json(
            r#"{ "mode": "instanced", "instances": 250, "seed": 9, "import": { "flip_uvs": true } }"#,
        )
        .unwrap();
        assert_eq!(config.mode, DemoMode::Instanced);
        assert_eq!(config.instances, 250);
        assert_eq!(config.seed, Some(9));
        assert!(config.import.flip_uvs);
        assert!(!config.import.bake_node_transforms);
        assert_eq!(config.width, 800);
    }

    #[test]
    fn instanced_mode_extends_the_far_plane() {
        let mut config = DemoConfig::default();
        assert_eq!(config.effective_z_far(), 100.0);
        config.mode = DemoMode::Instanced;
        assert_eq!(config.effective_z_far(), 1000.0);
    }

    #[test]
    fn clear_colour_follows_the_mode_unless_set() {
        let mut config = DemoConfig::default();
        assert_eq!(config.effective_clear_colour(), [0.0, 0.0, 0.0, 1.0]);
        config.mode = DemoMode::Instanced;
        assert_eq!(config.effective_clear_colour(), [0.1, 0.1, 0.1, 1.0]);

        let config = DemoConfig::from_json(r#"{ "clear_colour": [0.2, 0.3, 0.4, 1.0] }"#).unwrap();
        assert_eq!(config.effective_clear_colour(), [0.2, 0.3, 0.4, 1.0]);
    }

    #[test]
    fn missing_argument_uses_defaults_and_missing_file_fails() {
        let args = vec!["mesh-viewer".to_string()];
        assert_eq!(DemoConfig::from_args(args.into_iter()).unwrap(), DemoConfig::default());

        let args = vec!["mesh-viewer".to_string(), "no/such/config.json".to_string()];
        assert!(DemoConfig::from_args(args.into_iter()).is_err());
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(DemoConfig::from_json(r#"{ "mode": "wireframe" }"#).is_err());
    }
}
