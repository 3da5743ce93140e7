//! Terrain and hydrology algorithms over 2D indices.
//!
//! Every algorithm is a request object built from an [`Index`] and, except for [`Noise`], a
//! scalar height [`Node`]. Nothing is computed until `full()` is called, which returns a
//! fresh node over the index's linear space.
//!
//! - [`Noise`]: lazy fractal noise, the usual source of synthetic heights.
//! - [`Normal`]: unit surface normals from finite differences.
//! - [`Direction`]: steepest-descent neighbour offset per cell.
//! - [`Flow`]: the same routing as D8 codes.
//! - [`Accumulation`]: Monte Carlo flow accumulation by path tracing.
use glam::IVec2;

use crate::buffer::Host;
use crate::error::{Error, Result};
use crate::index::{GridIndex, Index};
use crate::node::Node;
use crate::types::DType;

pub mod accumulation;
pub mod direction;
pub mod noise;
pub mod normal;

pub use accumulation::{Accumulation, AccumulationConfig, StartPositions};
pub use direction::{Direction, Flow};
pub use self::noise::{Noise, NoiseConfig};
pub use normal::Normal;

/// Neighbour offsets in scan order, paired with their D8 codes.
///
/// `x` is the first (row) coordinate, `y` the second (column) coordinate.
pub const NEIGHBORS: [(IVec2, i32); 8] = [
    (IVec2::new(0, 1), 1),
    (IVec2::new(1, 1), 2),
    (IVec2::new(1, 0), 4),
    (IVec2::new(1, -1), 8),
    (IVec2::new(0, -1), 16),
    (IVec2::new(-1, -1), 32),
    (IVec2::new(-1, 0), 64),
    (IVec2::new(-1, 1), 128),
];

/// D8 code of a cell without a lower neighbour.
pub const NO_FLOW: i32 = 0;

/// Heights of a 2D index, collected once per request in double precision.
pub(crate) struct Surface<'a> {
    grid: &'a dyn GridIndex,
    heights: Vec<f64>,
}

impl<'a> Surface<'a> {
    pub(crate) fn new(index: &'a Index, height: &Node) -> Result<Self> {
        let grid = index.as_grid()?;
        let dtype = height.dtype();
        if !dtype.is_scalar() {
            return Err(Error::TypeMismatch {
                expected: "scalar",
                found: dtype,
            });
        }
        if let Some(found @ Host::Gpu) = height.buffer().map(|b| b.host()) {
            return Err(Error::HostMismatch {
                expected: Host::Cpu,
                found,
            });
        }
        let n = grid.elem();
        let heights = match height.buffer() {
            Some(buffer) if buffer.elem() >= n && buffer.dtype() == DType::Float64 => {
                buffer.as_typed::<f64>()?.read()[..n].to_vec()
            }
            Some(buffer) if buffer.elem() >= n && buffer.dtype() == DType::Float32 => buffer
                .as_typed::<f32>()?
                .read()[..n]
                .iter()
                .map(|&h| f64::from(h))
                .collect(),
            _ => (0..n)
                .map(|i| height.scalar(i))
                .collect::<Result<Vec<f64>>>()?,
        };
        Ok(Self { grid, heights })
    }

    pub(crate) fn grid(&self) -> &'a dyn GridIndex {
        self.grid
    }

    pub(crate) fn elem(&self) -> usize {
        self.heights.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    /// Height at linear offset `i`.
    #[inline]
    pub(crate) fn at(&self, i: usize) -> f64 {
        self.heights[i]
    }

    /// Height at `pos`, or `None` outside the index.
    #[inline]
    pub(crate) fn height(&self, pos: IVec2) -> Option<f64> {
        self.grid.flatten(pos).map(|i| self.heights[i])
    }

    /// Height at `pos + offset`, or `None` outside the index or the coordinate range.
    #[inline]
    pub(crate) fn neighbour(&self, pos: IVec2, offset: IVec2) -> Option<f64> {
        let x = pos.x.checked_add(offset.x)?;
        let y = pos.y.checked_add(offset.y)?;
        self.height(IVec2::new(x, y))
    }

    /// Position of every linear offset in order, including offsets shadowed by an earlier
    /// tile.
    pub(crate) fn cells(&self) -> impl Iterator<Item = (usize, IVec2)> + '_ {
        (0..self.elem()).filter_map(move |i| Some((i, self.grid.unflatten(i)?)))
    }

    /// Slot in [`NEIGHBORS`] of the steepest strictly lower neighbour of `pos`.
    ///
    /// Slopes are height drops divided by the offset length. Ties keep the earlier slot.
    pub(crate) fn steepest(&self, pos: IVec2, h: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (slot, (offset, _)) in NEIGHBORS.iter().enumerate() {
            let Some(hn) = self.neighbour(pos, *offset) else {
                continue;
            };
            let slope = (h - hn) / offset.as_dvec2().length();
            if slope > 0.0 && best.is_none_or(|(_, s)| slope > s) {
                best = Some((slot, slope));
            }
        }
        best.map(|(slot, _)| slot)
    }
}
