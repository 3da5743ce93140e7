use soillib::prelude::*;
use soillib_demos::{fractal_terrain, init_tracing, save_scalar_png, Colormap, Plane, TerrainConfig};

fn main() -> anyhow::Result<()> {
    init_tracing();
    let (index, height) = fractal_terrain(&TerrainConfig::default().with_seed(11))?;

    // Walks per round scale with the grid so every cell is sampled a few times.
    let config = AccumulationConfig::default()
        .with_iterations(8)
        .with_samples(index.elem() / 2)
        .with_steps(512)
        .with_seed(42);
    let counts = Accumulation::new(&index, &height)
        .with_config(config)
        .full()?;

    let area = Plane::from_array(&counts.export(&index)?)?;
    let log_area = area.map(|v| v.max(1.0).ln());
    save_scalar_png(&log_area, Colormap::Heat, "flow-accumulation.png")?;

    let relief = Plane::from_array(&height.export(&index)?)?;
    save_scalar_png(&relief, Colormap::Terrain, "flow-accumulation-height.png")?;
    Ok(())
}
