use soillib::error::Result;
use soillib::prelude::*;

/// Parameters of the synthetic fractal height field.
#[derive(Clone, Copy, Debug)]
pub struct TerrainConfig {
    pub size: i32,
    pub seed: u32,
    pub octaves: usize,
    /// Feature size of the coarsest octave, in cells.
    pub cell: f32,
    /// Weight of the radial basin added under the noise.
    pub basin: f32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            size: 256,
            seed: 7,
            octaves: 6,
            cell: 96.0,
            basin: 0.6,
        }
    }
}

impl TerrainConfig {
    pub fn with_size(mut self, size: i32) -> Self {
        self.size = size;
        self
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }
}

/// Fractal noise over a square flat index, lifted into a radial basin and baked.
///
/// Heights stay roughly in `[0, 1]`.
pub fn fractal_terrain(config: &TerrainConfig) -> Result<(Index, Node)> {
    let index = Index::flat(&[config.size, config.size])?;
    let frequency = f64::from(config.size.max(1)) / f64::from(config.cell.max(1.0));
    let noise = Noise::new(&index)
        .with_config(
            NoiseConfig::default()
                .with_seed(config.seed)
                .with_octaves(config.octaves)
                .with_frequency(frequency),
        )
        .full()?;

    let TerrainConfig { size, basin, .. } = *config;
    let n = size.max(1) as usize;
    let c = (n as f32 - 1.0) * 0.5;
    let radial = Node::computed(move |i| {
        let (x, y) = ((i / n) as f32 - c, (i % n) as f32 - c);
        let r = (x * x + y * y).sqrt() / c.max(1.0);
        (1.0 - basin) * 0.5 + basin * r
    });

    let height = Node::binary(BinaryOp::Add, noise.scale(0.5 * (1.0 - basin))?, radial)?;
    let height = height.bake(&index)?;
    Ok((index, height))
}
