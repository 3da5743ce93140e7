use soillib::prelude::*;
use soillib_demos::{
    fractal_terrain, init_tracing, relief_shade, save_normal_png, save_scalar_png, Colormap,
    Plane, TerrainConfig, VectorPlane,
};

fn main() -> anyhow::Result<()> {
    init_tracing();
    let (index, height) = fractal_terrain(&TerrainConfig::default().with_size(512))?;

    let normals = Normal::new(&index, &height).full()?;

    let height_plane = Plane::from_array(&height.export(&index)?)?;
    let normal_plane = VectorPlane::from_array(&normals.export(&index)?)?;

    save_scalar_png(&height_plane, Colormap::Terrain, "normal-relief-height.png")?;
    save_normal_png(&normal_plane, "normal-relief-normals.png")?;

    let relief = relief_shade(&height_plane, &normal_plane)?;
    save_scalar_png(&relief, Colormap::Gray, "normal-relief-shaded.png")?;
    Ok(())
}
