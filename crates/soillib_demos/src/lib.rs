#![forbid(unsafe_code)]

mod rendering;
mod terrain;

pub use rendering::{
    init_tracing, relief_shade, save_normal_png, save_scalar_png, Colormap, Plane, VectorPlane,
};
pub use terrain::{fractal_terrain, TerrainConfig};
