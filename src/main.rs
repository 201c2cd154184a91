use mesh_ngin::{config::DemoConfig, flow};

fn main() -> anyhow::Result<()> {
    let config = DemoConfig::from_args(std::env::args())?;
    flow::run(config)
}
