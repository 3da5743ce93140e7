//! Coordinate to linear-offset mapping.
//!
//! - [`FlatIndex`]: dense row-major N-dimensional extents (`D = 1..=4` through [`Index`]).
//! - [`QuadIndex`]: a mosaic of rectangular [`QuadNode`] tiles sharing one coordinate space.
//! - [`Index`]: the erased handle passed to nodes and algorithms.
//! - [`GridIndex`]: the 2D view the terrain algorithms walk over.
//!
//! Out-of-bounds positions are reported as `None` rather than an error, so membership
//! tests stay cheap.
use glam::IVec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub mod flat;
pub mod quad;

pub use flat::FlatIndex;
pub use quad::{QuadIndex, QuadNode};

/// Two-dimensional index over `IVec2` positions.
pub trait GridIndex {
    fn min(&self) -> IVec2;

    fn max(&self) -> IVec2;

    /// Extent of the bounding box.
    fn ext(&self) -> IVec2 {
        self.max() - self.min()
    }

    /// Number of linear offsets.
    fn elem(&self) -> usize;

    fn oob(&self, pos: IVec2) -> bool;

    fn flatten(&self, pos: IVec2) -> Option<usize>;

    fn unflatten(&self, index: usize) -> Option<IVec2>;

    /// Canonical `(offset, position)` pairs: offsets whose position flattens back to them.
    fn positions(&self) -> Box<dyn Iterator<Item = (usize, IVec2)> + '_> {
        Box::new((0..self.elem()).filter_map(move |i| {
            let pos = self.unflatten(i)?;
            (self.flatten(pos) == Some(i)).then_some((i, pos))
        }))
    }
}

/// Tag of an [`Index`] variant.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndexKind {
    Flat1,
    Flat2,
    Flat3,
    Flat4,
    Quad,
}

/// Erased index handle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Index {
    Flat1(FlatIndex<1>),
    Flat2(FlatIndex<2>),
    Flat3(FlatIndex<3>),
    Flat4(FlatIndex<4>),
    Quad(QuadIndex),
}

macro_rules! with_flat {
    ($index:expr, $flat:ident => $body:expr, $quad:ident => $quad_body:expr) => {
        match $index {
            Index::Flat1($flat) => $body,
            Index::Flat2($flat) => $body,
            Index::Flat3($flat) => $body,
            Index::Flat4($flat) => $body,
            Index::Quad($quad) => $quad_body,
        }
    };
}

fn coords<const D: usize>(pos: &[i32]) -> Result<[i32; D]> {
    pos.try_into().map_err(|_| Error::DimensionMismatch {
        expected: D,
        found: pos.len(),
    })
}

fn sized<const D: usize>(index: FlatIndex<D>) -> Result<FlatIndex<D>> {
    match index.checked_elem() {
        Some(_) => Ok(index),
        None => Err(Error::InvalidArgument(format!(
            "extent {:?} has more elements than fit in usize",
            index.ext()
        ))),
    }
}

impl Index {
    /// Dense index over `ext`; supports 1 to 4 dimensions.
    pub fn flat(ext: &[i32]) -> Result<Self> {
        Ok(match ext.len() {
            1 => Index::Flat1(sized(FlatIndex::new(coords(ext)?))?),
            2 => Index::Flat2(sized(FlatIndex::new(coords(ext)?))?),
            3 => Index::Flat3(sized(FlatIndex::new(coords(ext)?))?),
            4 => Index::Flat4(sized(FlatIndex::new(coords(ext)?))?),
            n => {
                return Err(Error::InvalidArgument(format!(
                    "flat index supports 1 to 4 dimensions, got {n}"
                )))
            }
        })
    }

    /// Tiled index over `nodes`, resolved in insertion order.
    ///
    /// Fails with [`Error::InvalidArgument`] if the tiles hold more elements than `usize`
    /// can address.
    pub fn quad(nodes: Vec<QuadNode>) -> Result<Self> {
        Ok(Index::Quad(QuadIndex::new(nodes)?))
    }

    pub fn kind(&self) -> IndexKind {
        match self {
            Index::Flat1(_) => IndexKind::Flat1,
            Index::Flat2(_) => IndexKind::Flat2,
            Index::Flat3(_) => IndexKind::Flat3,
            Index::Flat4(_) => IndexKind::Flat4,
            Index::Quad(_) => IndexKind::Quad,
        }
    }

    pub fn dims(&self) -> usize {
        with_flat!(self, f => f.dims(), _q => 2)
    }

    pub fn elem(&self) -> usize {
        with_flat!(self, f => f.elem(), q => GridIndex::elem(q))
    }

    pub fn is_empty(&self) -> bool {
        self.elem() == 0
    }

    pub fn min(&self) -> Vec<i32> {
        with_flat!(self, f => f.min().to_vec(), q => GridIndex::min(q).to_array().to_vec())
    }

    pub fn max(&self) -> Vec<i32> {
        with_flat!(self, f => f.max().to_vec(), q => GridIndex::max(q).to_array().to_vec())
    }

    pub fn ext(&self) -> Vec<i32> {
        with_flat!(self, f => f.ext().to_vec(), q => GridIndex::ext(q).to_array().to_vec())
    }

    /// Linear offset of `pos`; `Ok(None)` when out of bounds.
    pub fn flatten(&self, pos: &[i32]) -> Result<Option<usize>> {
        Ok(match self {
            Index::Flat1(f) => f.flatten(coords(pos)?),
            Index::Flat2(f) => f.flatten(coords(pos)?),
            Index::Flat3(f) => f.flatten(coords(pos)?),
            Index::Flat4(f) => f.flatten(coords(pos)?),
            Index::Quad(q) => q.flatten(IVec2::from_array(coords(pos)?)),
        })
    }

    pub fn unflatten(&self, index: usize) -> Option<Vec<i32>> {
        with_flat!(
            self,
            f => f.unflatten(index).map(|p| p.to_vec()),
            q => q.unflatten(index).map(|p| p.to_array().to_vec())
        )
    }

    pub fn oob(&self, pos: &[i32]) -> Result<bool> {
        Ok(self.flatten(pos)?.is_none())
    }

    /// Canonical `(offset, position)` pairs in offset order. Offsets shadowed by an
    /// earlier overlapping tile are skipped.
    pub fn iter(&self) -> Box<dyn Iterator<Item = (usize, Vec<i32>)> + '_> {
        match self {
            Index::Quad(q) => Box::new(
                q.positions()
                    .map(|(i, pos)| (i, pos.to_array().to_vec())),
            ),
            _ => Box::new((0..self.elem()).filter_map(move |i| Some((i, self.unflatten(i)?)))),
        }
    }

    /// Visit every canonical `(offset, position)` pair in offset order.
    pub fn for_each(&self, mut f: impl FnMut(usize, &[i32])) {
        for (i, pos) in self.iter() {
            f(i, &pos);
        }
    }

    /// The 2D view of this index, for `Flat2` and `Quad`.
    pub fn as_grid(&self) -> Result<&dyn GridIndex> {
        match self {
            Index::Flat2(f) => Ok(f as &dyn GridIndex),
            Index::Quad(q) => Ok(q as &dyn GridIndex),
            other => Err(Error::DimensionMismatch {
                expected: 2,
                found: other.dims(),
            }),
        }
    }
}

impl From<FlatIndex<1>> for Index {
    fn from(index: FlatIndex<1>) -> Self {
        Index::Flat1(index)
    }
}

impl From<FlatIndex<2>> for Index {
    fn from(index: FlatIndex<2>) -> Self {
        Index::Flat2(index)
    }
}

impl From<FlatIndex<3>> for Index {
    fn from(index: FlatIndex<3>) -> Self {
        Index::Flat3(index)
    }
}

impl From<FlatIndex<4>> for Index {
    fn from(index: FlatIndex<4>) -> Self {
        Index::Flat4(index)
    }
}

impl From<QuadIndex> for Index {
    fn from(index: QuadIndex) -> Self {
        Index::Quad(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_constructor_picks_dimensionality() {
        assert_eq!(Index::flat(&[4]).unwrap().kind(), IndexKind::Flat1);
        assert_eq!(Index::flat(&[4, 4, 2]).unwrap().kind(), IndexKind::Flat3);
        assert!(matches!(
            Index::flat(&[]),
            Err(Error::InvalidArgument(_))
        ));
        assert!(Index::flat(&[1, 1, 1, 1, 1]).is_err());
    }

    #[test]
    fn oversized_extents_are_rejected() {
        assert!(matches!(
            Index::flat(&[i32::MAX; 4]),
            Err(Error::InvalidArgument(_))
        ));
        let index = Index::flat(&[i32::MAX, 0, i32::MAX]).unwrap();
        assert_eq!(index.elem(), 0);
    }

    #[test]
    fn far_positions_are_out_of_bounds_for_every_kind() {
        let flat = Index::flat(&[2, 2]).unwrap();
        let quad = Index::quad(vec![QuadNode::new([1, 0], [2, 2])]).unwrap();
        for index in [flat, quad] {
            for pos in [[i32::MIN, 0], [0, i32::MAX], [i32::MAX, i32::MIN]] {
                assert!(index.oob(&pos).unwrap());
                assert_eq!(index.flatten(&pos).unwrap(), None);
            }
        }
    }

    #[test]
    fn erased_lookup_checks_arity() {
        let index = Index::flat(&[3, 3]).unwrap();
        assert_eq!(index.flatten(&[1, 0]).unwrap(), Some(3));
        assert_eq!(index.flatten(&[3, 0]).unwrap(), None);
        let err = index.flatten(&[1, 0, 0]).expect_err("arity 3 on a 2D index");
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 2,
                found: 3
            }
        ));
    }

    #[test]
    fn erased_bounds_for_quad() {
        let index = Index::quad(vec![
            QuadNode::new([-2, 0], [2, 2]),
            QuadNode::new([0, 0], [1, 4]),
        ])
        .unwrap();
        assert_eq!(index.dims(), 2);
        assert_eq!(index.min(), vec![-2, 0]);
        assert_eq!(index.max(), vec![1, 4]);
        assert_eq!(index.ext(), vec![3, 4]);
        assert_eq!(index.elem(), 8);
        assert!(index.oob(&[-1, 3]).unwrap());
        assert!(!index.oob(&[0, 3]).unwrap());
    }

    #[test]
    fn for_each_visits_canonical_positions() {
        let index = Index::quad(vec![
            QuadNode::new([0, 0], [2, 2]),
            QuadNode::new([1, 1], [2, 2]),
        ])
        .unwrap();
        let mut seen = Vec::new();
        index.for_each(|i, pos| seen.push((i, pos.to_vec())));
        // Offset 4 is the shadowed (1, 1) cell of the second tile.
        assert_eq!(seen.len(), 7);
        assert!(seen.iter().all(|(i, _)| *i != 4));

        let flat = Index::flat(&[2, 3]).unwrap();
        let mut count = 0;
        flat.for_each(|i, pos| {
            assert_eq!(flat.flatten(pos).unwrap(), Some(i));
            count += 1;
        });
        assert_eq!(count, 6);
    }

    #[test]
    fn grid_view_only_for_two_dimensions() {
        assert!(Index::flat(&[2, 2]).unwrap().as_grid().is_ok());
        assert!(Index::quad(Vec::new()).unwrap().as_grid().is_ok());
        let err = Index::flat(&[2, 2, 2])
            .unwrap()
            .as_grid()
            .err()
            .expect("3D has no grid view");
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 2,
                found: 3
            }
        ));
    }
}
