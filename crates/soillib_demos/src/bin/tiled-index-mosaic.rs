use glam::IVec2;
use soillib::prelude::*;
use soillib_demos::{init_tracing, save_scalar_png, Colormap, Plane};
use tracing::info;

const TILE: i32 = 48;

fn main() -> anyhow::Result<()> {
    init_tracing();

    // A 4x4 mosaic with a missing tile and one oversized tile overlapping its neighbours.
    let mut tiles = vec![QuadNode::new([TILE, TILE], [TILE * 2, TILE + TILE / 2])];
    for tx in 0..4 {
        for ty in 0..4 {
            if (tx, ty) != (3, 0) {
                tiles.push(QuadNode::new([tx * TILE, ty * TILE], [TILE, TILE]));
            }
        }
    }
    let index = Index::quad(tiles)?;
    info!(
        "Mosaic spans {:?}..{:?} with {} offsets.",
        index.min(),
        index.max(),
        index.elem()
    );

    // Height is a function of world position, so tile seams are continuous.
    let grid = index.as_grid()?;
    let heights: Vec<f32> = (0..grid.elem())
        .map(|i| {
            let p = grid.unflatten(i).unwrap_or(IVec2::ZERO).as_vec2() / TILE as f32;
            (p.x * 1.3).sin() * (p.y * 0.9).cos() + 0.15 * p.length()
        })
        .collect();
    let height = Node::cached(heights);

    let config = AccumulationConfig::default()
        .with_iterations(4)
        .with_samples(grid.elem())
        .with_steps(256);
    let counts = Accumulation::new(&index, &height)
        .with_config(config)
        .full()?;

    // Cells outside every tile stay NaN and render as background.
    let area = Plane::from_array(&counts.export(&index)?)?
        .map(|v| if v.is_nan() { v } else { v.max(1.0).ln() });
    save_scalar_png(&area, Colormap::Heat, "tiled-index-mosaic-flow.png")?;

    let relief = Plane::from_array(&height.export(&index)?)?;
    save_scalar_png(&relief, Colormap::Terrain, "tiled-index-mosaic-height.png")?;
    Ok(())
}
