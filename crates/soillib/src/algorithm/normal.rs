//! Surface normals from finite differences.
use glam::{DVec2, DVec3, IVec2, Vec3};
use tracing::{debug, warn};

use crate::algorithm::Surface;
use crate::buffer::BufferT;
use crate::error::Result;
use crate::index::Index;
use crate::node::Node;

/// Surface normals of a height field.
///
/// The gradient uses central differences where both neighbours along an axis exist,
/// one-sided differences at the domain edge, and zero where neither exists. The normal is
/// `normalize(-dh/dx, -dh/dy, 1)`.
#[derive(Clone, Copy, Debug)]
pub struct Normal<'a> {
    index: &'a Index,
    height: &'a Node,
}

impl<'a> Normal<'a> {
    pub fn new(index: &'a Index, height: &'a Node) -> Self {
        Self { index, height }
    }

    /// Compute a `Vec3` node of unit normals over the index's linear space.
    pub fn full(&self) -> Result<Node> {
        let surface = Surface::new(self.index, self.height)?;
        if surface.is_empty() {
            warn!("Normal requested over an empty index.");
            return Ok(Node::cached(BufferT::<Vec3>::new(0)));
        }

        let mut normals = vec![Vec3::Z; surface.elem()];
        for (i, pos) in surface.cells() {
            let g = gradient(&surface, pos, surface.at(i));
            normals[i] = DVec3::new(-g.x, -g.y, 1.0).normalize().as_vec3();
        }

        debug!("Computed {} surface normals.", normals.len());
        Ok(Node::cached(normals))
    }
}

fn gradient(surface: &Surface<'_>, pos: IVec2, h: f64) -> DVec2 {
    let axis = |step: IVec2| {
        let fwd = surface.neighbour(pos, step);
        let back = surface.neighbour(pos, -step);
        match (fwd, back) {
            (Some(fwd), Some(back)) => (fwd - back) / 2.0,
            (Some(fwd), None) => fwd - h,
            (None, Some(back)) => h - back,
            (None, None) => 0.0,
        }
    };
    DVec2::new(axis(IVec2::X), axis(IVec2::Y))
}
