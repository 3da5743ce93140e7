//! Steepest-descent routing.
use glam::IVec2;
use tracing::{debug, warn};

use crate::algorithm::{Surface, NEIGHBORS, NO_FLOW};
use crate::buffer::BufferT;
use crate::error::Result;
use crate::index::Index;
use crate::node::Node;

/// Per-cell offset to the steepest strictly lower neighbour; `IVec2::ZERO` for no flow.
///
/// Neighbours are scanned in the order of [`NEIGHBORS`] and ties keep the earliest one.
/// Neighbours outside the index are skipped.
#[derive(Clone, Copy, Debug)]
pub struct Direction<'a> {
    index: &'a Index,
    height: &'a Node,
}

impl<'a> Direction<'a> {
    pub fn new(index: &'a Index, height: &'a Node) -> Self {
        Self { index, height }
    }

    /// Compute an `IVec2` node of descent offsets.
    pub fn full(&self) -> Result<Node> {
        let surface = Surface::new(self.index, self.height)?;
        if surface.is_empty() {
            warn!("Direction requested over an empty index.");
            return Ok(Node::cached(BufferT::<IVec2>::new(0)));
        }
        let directions = directions(&surface);
        debug!(
            "Routed {} cells, {} without flow.",
            directions.len(),
            directions.iter().filter(|d| **d == IVec2::ZERO).count()
        );
        Ok(Node::cached(directions))
    }
}

pub(crate) fn directions(surface: &Surface<'_>) -> Vec<IVec2> {
    surface
        .cells()
        .map(|(i, pos)| {
            surface
                .steepest(pos, surface.at(i))
                .map_or(IVec2::ZERO, |slot| NEIGHBORS[slot].0)
        })
        .collect()
}

/// Per-cell D8 code of the steepest descent: E=1, SE=2, S=4, SW=8, W=16, NW=32, N=64,
/// NE=128 and 0 for no flow.
#[derive(Clone, Copy, Debug)]
pub struct Flow<'a> {
    index: &'a Index,
    height: &'a Node,
}

impl<'a> Flow<'a> {
    pub fn new(index: &'a Index, height: &'a Node) -> Self {
        Self { index, height }
    }

    /// Compute an `Int` node of D8 codes.
    pub fn full(&self) -> Result<Node> {
        let surface = Surface::new(self.index, self.height)?;
        if surface.is_empty() {
            warn!("Flow requested over an empty index.");
            return Ok(Node::cached(BufferT::<i32>::new(0)));
        }
        let codes: Vec<i32> = surface
            .cells()
            .map(|(i, pos)| {
                surface
                    .steepest(pos, surface.at(i))
                    .map_or(NO_FLOW, |slot| NEIGHBORS[slot].1)
            })
            .collect();
        debug!("Encoded {} cells as D8 codes.", codes.len());
        Ok(Node::cached(codes))
    }
}
