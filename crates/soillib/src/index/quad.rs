//! Tiled composite index.
//!
//! A [`QuadIndex`] stitches rectangular [`QuadNode`] tiles into one coordinate space. Each
//! tile owns a local [`FlatIndex`] and a base offset; the composite linear space is the
//! concatenation of the tiles' linear spaces in insertion order.
//!
//! Tiles may overlap. Lookups scan tiles in insertion order and the first containing tile
//! wins, so callers control overlap resolution through tile order. Positions of a later
//! tile that are shadowed by an earlier one keep their linear offsets but are never returned
//! by [`QuadIndex::flatten`].
use glam::IVec2;

use crate::error::{Error, Result};
use crate::index::flat::FlatIndex;
use crate::index::GridIndex;

/// One rectangular tile of a [`QuadIndex`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuadNode {
    min: IVec2,
    ext: IVec2,
    max: IVec2,
    index: FlatIndex<2>,
    offset: usize,
}

impl QuadNode {
    /// Create a tile covering `[min, min + ext)`.
    ///
    /// Negative extents are empty; extents reaching past `i32::MAX` are clipped there.
    pub fn new(min: impl Into<IVec2>, ext: impl Into<IVec2>) -> Self {
        let min = min.into();
        let max = min.saturating_add(ext.into().max(IVec2::ZERO));
        let ext = max - min;
        Self {
            min,
            ext,
            max,
            index: FlatIndex::new(ext.to_array()),
            offset: 0,
        }
    }

    pub fn min(&self) -> IVec2 {
        self.min
    }

    pub fn max(&self) -> IVec2 {
        self.max
    }

    pub fn ext(&self) -> IVec2 {
        self.ext
    }

    pub fn elem(&self) -> usize {
        self.index.elem()
    }

    /// First composite linear offset owned by this tile.
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn oob(&self, pos: IVec2) -> bool {
        !(pos.cmpge(self.min).all() && pos.cmplt(self.max).all())
    }

    /// Tile-local linear offset of `pos`.
    #[inline]
    pub fn flatten(&self, pos: IVec2) -> Option<usize> {
        if self.oob(pos) {
            return None;
        }
        self.index.flatten((pos - self.min).to_array())
    }

    /// World position of tile-local offset `index`.
    #[inline]
    pub fn unflatten(&self, index: usize) -> Option<IVec2> {
        self.index
            .unflatten(index)
            .map(|local| self.min + IVec2::from_array(local))
    }
}

/// Composite index over an ordered set of tiles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuadIndex {
    nodes: Vec<QuadNode>,
    min: IVec2,
    max: IVec2,
    elem: usize,
}

impl QuadIndex {
    /// Build the composite index, assigning each tile its base offset and computing the
    /// bounding box of all tiles. An empty tile list yields an empty index at the origin.
    ///
    /// Fails if the tiles together hold more elements than `usize` can address.
    pub fn new(nodes: Vec<QuadNode>) -> Result<Self> {
        let mut nodes = nodes;
        let mut offset = 0usize;
        let mut min = IVec2::splat(i32::MAX);
        let mut max = IVec2::splat(i32::MIN);
        for node in nodes.iter_mut() {
            node.offset = offset;
            offset = node
                .index
                .checked_elem()
                .and_then(|elem| offset.checked_add(elem))
                .ok_or_else(|| {
                    Error::InvalidArgument(format!(
                        "tile at {} of extent {} overflows the linear offset range",
                        node.min, node.ext
                    ))
                })?;
            min = min.min(node.min);
            max = max.max(node.max);
        }
        if nodes.is_empty() {
            min = IVec2::ZERO;
            max = IVec2::ZERO;
        }
        Ok(Self {
            nodes,
            min,
            max,
            elem: offset,
        })
    }

    pub fn nodes(&self) -> &[QuadNode] {
        &self.nodes
    }

    /// First tile in insertion order containing `pos`.
    pub fn node(&self, pos: IVec2) -> Option<&QuadNode> {
        self.nodes.iter().find(|node| !node.oob(pos))
    }
}

impl GridIndex for QuadIndex {
    fn min(&self) -> IVec2 {
        self.min
    }

    fn max(&self) -> IVec2 {
        self.max
    }

    fn elem(&self) -> usize {
        self.elem
    }

    fn oob(&self, pos: IVec2) -> bool {
        self.node(pos).is_none()
    }

    fn flatten(&self, pos: IVec2) -> Option<usize> {
        let node = self.node(pos)?;
        node.flatten(pos).map(|local| node.offset + local)
    }

    fn unflatten(&self, index: usize) -> Option<IVec2> {
        if index >= self.elem {
            return None;
        }
        let slot = self
            .nodes
            .partition_point(|node| node.offset + node.elem() <= index);
        let node = self.nodes.get(slot)?;
        node.unflatten(index - node.offset)
    }
}
