//! Stochastic flow accumulation.
//!
//! Walkers start at sampled cells and follow the steepest-descent [`Direction`] for up to
//! `steps` hops, incrementing a counter at every visited cell. A walk ends early when it
//! leaves the index or reaches a cell without flow. The counters estimate relative drainage
//! area; they are not an exact flow-routing solution.
//!
//! [`Direction`]: crate::algorithm::Direction
use glam::IVec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::algorithm::direction::directions;
use crate::algorithm::Surface;
use crate::error::{Error, Result};
use crate::index::Index;
use crate::node::Node;

/// How walk start positions are chosen.
///
/// Starts are drawn from the index's canonical cells only: offsets of overlapping tiles that
/// are shadowed by an earlier tile never start a walk, so every cell is equally likely.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StartPositions {
    /// Uniformly random cells.
    #[default]
    Random,
    /// Consecutive cells in linear order, wrapping around the index.
    Ordered,
}

/// Tunables of an [`Accumulation`] run.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccumulationConfig {
    /// Maximum hops per walk.
    pub steps: usize,
    /// Number of sampling rounds.
    pub iterations: usize,
    /// Walks started per round.
    pub samples: usize,
    /// Seed of the generator used by [`Accumulation::full`].
    pub seed: u64,
    pub start: StartPositions,
}

impl Default for AccumulationConfig {
    fn default() -> Self {
        Self {
            steps: 3072,
            iterations: 128,
            samples: 1024,
            seed: 0,
            start: StartPositions::Random,
        }
    }
}

impl AccumulationConfig {
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_start(mut self, start: StartPositions) -> Self {
        self.start = start;
        self
    }

    /// Total number of walks.
    pub fn walks(&self) -> Option<usize> {
        self.iterations.checked_mul(self.samples)
    }

    /// Validates the configuration, returning an error if the hop budget overflows.
    pub fn validate(&self) -> Result<()> {
        if self
            .walks()
            .and_then(|walks| walks.checked_mul(self.steps))
            .is_none()
        {
            return Err(Error::InvalidConfig(format!(
                "iterations * samples * steps overflows ({} * {} * {})",
                self.iterations, self.samples, self.steps
            )));
        }
        Ok(())
    }
}

/// Monte Carlo flow accumulation over a height field.
#[derive(Clone, Copy, Debug)]
pub struct Accumulation<'a> {
    index: &'a Index,
    height: &'a Node,
    config: AccumulationConfig,
}

impl<'a> Accumulation<'a> {
    pub fn new(index: &'a Index, height: &'a Node) -> Self {
        Self {
            index,
            height,
            config: AccumulationConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AccumulationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &AccumulationConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut AccumulationConfig {
        &mut self.config
    }

    pub fn steps(&self) -> usize {
        self.config.steps
    }

    pub fn set_steps(&mut self, steps: usize) {
        self.config.steps = steps;
    }

    pub fn iterations(&self) -> usize {
        self.config.iterations
    }

    pub fn set_iterations(&mut self, iterations: usize) {
        self.config.iterations = iterations;
    }

    pub fn samples(&self) -> usize {
        self.config.samples
    }

    pub fn set_samples(&mut self, samples: usize) {
        self.config.samples = samples;
    }

    /// Run with a generator seeded from the configured seed.
    pub fn full(&self) -> Result<Node> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        self.full_with_rng(&mut rng)
    }

    /// Run with a caller-provided generator. The seed in the configuration is ignored.
    pub fn full_with_rng(&self, rng: &mut impl Rng) -> Result<Node> {
        self.config.validate()?;
        let surface = Surface::new(self.index, self.height)?;
        let grid = surface.grid();
        let elem = surface.elem();
        let mut counts = vec![0i32; elem];
        let starts: Vec<IVec2> = grid.positions().map(|(_, pos)| pos).collect();
        if starts.is_empty() {
            warn!("Accumulation requested over an empty index.");
            return Ok(Node::cached(counts));
        }
        if self.config.samples == 0 || self.config.iterations == 0 {
            warn!("Accumulation configured without walks; output is all zero.");
            return Ok(Node::cached(counts));
        }

        let directions = directions(&surface);
        let AccumulationConfig {
            steps,
            iterations,
            samples,
            start,
            ..
        } = self.config;

        let mut hops = 0usize;
        for round in 0..iterations {
            for sample in 0..samples {
                let mut pos = match start {
                    StartPositions::Random => starts[uniform(rng, starts.len())],
                    StartPositions::Ordered => starts[(round * samples + sample) % starts.len()],
                };
                for _ in 0..steps {
                    let Some(i) = grid.flatten(pos) else {
                        break;
                    };
                    counts[i] = counts[i].saturating_add(1);
                    hops += 1;
                    let dir = directions[i];
                    if dir == IVec2::ZERO {
                        break;
                    }
                    pos += dir;
                }
            }
        }

        debug!(
            "Accumulated {} hops from {} walks over {} cells.",
            hops,
            iterations * samples,
            elem
        );
        Ok(Node::cached(counts))
    }
}

/// Uniform offset in `[0, n)` by multiply-shift.
#[inline]
fn uniform(rng: &mut impl Rng, n: usize) -> usize {
    ((rng.next_u64() as u128 * n as u128) >> 64) as usize
}
