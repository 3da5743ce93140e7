//! Fractal noise fields.
//!
//! [`Noise`] produces a lazy `float32` node of fractal Brownian motion over Perlin noise,
//! sampled at each cell of a 2D index. Positions are measured from the index's minimum corner
//! and divided by its longest extent, so a tiled index and a flat index covering the same
//! cells produce the same values.
use glam::{DVec2, IVec2};
use ::noise::{Fbm, MultiFractal, NoiseFn, Perlin};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::index::{GridIndex, Index};
use crate::node::Node;

/// Tunables of a [`Noise`] field.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoiseConfig {
    pub seed: u32,
    /// Features per longest index extent in the first octave.
    pub frequency: f64,
    /// Number of summed octaves, `1..=32`.
    pub octaves: usize,
    /// Amplitude ratio between consecutive octaves.
    pub persistence: f64,
    /// Frequency ratio between consecutive octaves.
    pub lacunarity: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            frequency: 1.0,
            octaves: 8,
            persistence: 0.6,
            lacunarity: 2.0,
        }
    }
}

impl NoiseConfig {
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_octaves(mut self, octaves: usize) -> Self {
        self.octaves = octaves;
        self
    }

    pub fn with_persistence(mut self, persistence: f64) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn with_lacunarity(mut self, lacunarity: f64) -> Self {
        self.lacunarity = lacunarity;
        self
    }

    /// Validates the configuration, returning an error if any parameter is invalid.
    pub fn validate(&self) -> Result<()> {
        if !(1..=Fbm::<Perlin>::MAX_OCTAVES).contains(&self.octaves) {
            return Err(Error::InvalidConfig(format!(
                "octaves must be in 1..={}, got {}",
                Fbm::<Perlin>::MAX_OCTAVES,
                self.octaves
            )));
        }
        if !(self.frequency.is_finite() && self.frequency > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "frequency must be positive and finite, got {}",
                self.frequency
            )));
        }
        if !self.persistence.is_finite() || !self.lacunarity.is_finite() {
            return Err(Error::InvalidConfig(
                "persistence and lacunarity must be finite".into(),
            ));
        }
        Ok(())
    }
}

/// Fractal noise over a 2D index.
#[derive(Clone, Copy, Debug)]
pub struct Noise<'a> {
    index: &'a Index,
    config: NoiseConfig,
}

impl<'a> Noise<'a> {
    pub fn new(index: &'a Index) -> Self {
        Self {
            index,
            config: NoiseConfig::default(),
        }
    }

    pub fn with_config(mut self, config: NoiseConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &NoiseConfig {
        &self.config
    }

    /// Build a lazy `float32` node over the index's linear space, roughly in `[-1, 1]`.
    ///
    /// Offsets without a position in the index read as NaN. Call [`Node::bake`] to
    /// evaluate it once into a buffer.
    pub fn full(&self) -> Result<Node> {
        self.config.validate()?;
        let grid = self.index.as_grid()?;
        if grid.elem() == 0 {
            warn!("Noise requested over an empty index.");
        }
        let origin = grid.min();
        let scale = 1.0 / f64::from(grid.ext().max_element().max(1));
        let NoiseConfig {
            seed,
            frequency,
            octaves,
            persistence,
            lacunarity,
        } = self.config;
        let fbm = Fbm::<Perlin>::new(seed)
            .set_octaves(octaves)
            .set_frequency(frequency)
            .set_persistence(persistence)
            .set_lacunarity(lacunarity);
        debug!(
            "Noise field over {} cells: seed {seed}, {octaves} octaves at frequency {frequency}.",
            grid.elem()
        );

        let index = self.index.clone();
        Ok(Node::computed(move |i| {
            let Some(pos) = index.as_grid().ok().and_then(|grid| grid.unflatten(i)) else {
                return f32::NAN;
            };
            let p = sample_point(pos, origin, scale);
            fbm.get(p.to_array()) as f32
        }))
    }
}

fn sample_point(pos: IVec2, origin: IVec2, scale: f64) -> DVec2 {
    (pos.as_dvec2() - origin.as_dvec2()) * scale
}
