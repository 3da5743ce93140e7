use soillib::prelude::*;
use soillib_demos::{fractal_terrain, init_tracing, save_scalar_png, Colormap, Plane, TerrainConfig};
use tracing::info;

fn main() -> anyhow::Result<()> {
    init_tracing();
    let (index, height) = fractal_terrain(&TerrainConfig::default().with_size(128))?;

    let codes = Flow::new(&index, &height).full()?;
    let codes = Plane::from_array(&codes.export(&index)?)?;

    // Histogram of D8 codes; 0 marks pits and flats.
    for (offset, code) in NEIGHBORS {
        let count = codes.values.iter().filter(|&&c| c == code as f32).count();
        info!("D8 {:>3} ({:>2}, {:>2}): {} cells", code, offset.x, offset.y, count);
    }
    let pits = codes.values.iter().filter(|&&c| c == NO_FLOW as f32).count();
    info!("No flow: {} cells", pits);

    // Map codes onto their scan slot so the ramp spreads evenly.
    let slots = codes.map(|c| if c > 0.0 { c.log2() + 1.0 } else { 0.0 });
    save_scalar_png(&slots, Colormap::Terrain, "flow-direction-codes.png")?;
    Ok(())
}
