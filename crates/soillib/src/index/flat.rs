//! Dense N-dimensional index.
//!
//! [`FlatIndex`] maps positions in `[0, ext)` to row-major linear offsets: the last axis is
//! contiguous. For `D = 2` a position `(x, y)` maps to `x * ext[1] + y`.
use glam::IVec2;

use crate::index::GridIndex;

/// Dense row-major index over an N-dimensional extent anchored at the origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FlatIndex<const D: usize> {
    ext: [i32; D],
}

impl<const D: usize> FlatIndex<D> {
    /// Create an index over `ext`. Negative extents are treated as empty axes.
    pub fn new(ext: [i32; D]) -> Self {
        Self {
            ext: ext.map(|e| e.max(0)),
        }
    }

    pub const fn dims(&self) -> usize {
        D
    }

    pub fn min(&self) -> [i32; D] {
        [0; D]
    }

    pub fn max(&self) -> [i32; D] {
        self.ext
    }

    pub fn ext(&self) -> [i32; D] {
        self.ext
    }

    /// Number of addressable positions.
    pub fn elem(&self) -> usize {
        self.ext.iter().map(|&e| e as usize).product()
    }

    /// Number of addressable positions, or `None` if it does not fit in `usize`.
    pub fn checked_elem(&self) -> Option<usize> {
        self.ext
            .iter()
            .try_fold(1usize, |n, &e| n.checked_mul(e as usize))
    }

    /// Row-major strides in elements.
    pub fn strides(&self) -> [usize; D] {
        let mut strides = [1usize; D];
        for d in (0..D.saturating_sub(1)).rev() {
            strides[d] = strides[d + 1] * self.ext[d + 1] as usize;
        }
        strides
    }

    /// True if any coordinate lies outside `[0, ext[d])`.
    #[inline]
    pub fn oob(&self, pos: [i32; D]) -> bool {
        pos.iter().zip(self.ext.iter()).any(|(&p, &e)| p < 0 || p >= e)
    }

    /// Linear offset of `pos`, or `None` if it is out of bounds.
    #[inline]
    pub fn flatten(&self, pos: [i32; D]) -> Option<usize> {
        if self.oob(pos) {
            return None;
        }
        let mut offset = 0usize;
        for d in 0..D {
            offset = offset * self.ext[d] as usize + pos[d] as usize;
        }
        Some(offset)
    }

    /// Position of linear offset `index`, or `None` if `index >= elem()`.
    #[inline]
    pub fn unflatten(&self, index: usize) -> Option<[i32; D]> {
        if index >= self.elem() {
            return None;
        }
        let mut pos = [0i32; D];
        let mut rest = index;
        for d in (0..D).rev() {
            let e = self.ext[d] as usize;
            pos[d] = (rest % e) as i32;
            rest /= e;
        }
        Some(pos)
    }

    /// Positions in linear order.
    pub fn iter(&self) -> impl Iterator<Item = [i32; D]> + '_ {
        (0..self.elem()).filter_map(move |i| self.unflatten(i))
    }
}

impl GridIndex for FlatIndex<2> {
    fn min(&self) -> IVec2 {
        IVec2::ZERO
    }

    fn max(&self) -> IVec2 {
        IVec2::from_array(self.ext)
    }

    fn elem(&self) -> usize {
        FlatIndex::elem(self)
    }

    fn oob(&self, pos: IVec2) -> bool {
        FlatIndex::oob(self, pos.to_array())
    }

    fn flatten(&self, pos: IVec2) -> Option<usize> {
        FlatIndex::flatten(self, pos.to_array())
    }

    fn unflatten(&self, index: usize) -> Option<IVec2> {
        FlatIndex::unflatten(self, index).map(IVec2::from_array)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn strides_are_row_major() {
        let index = FlatIndex::new([4, 3, 2]);
        assert_eq!(index.strides(), [6, 2, 1]);
        assert_eq!(index.elem(), 24);
        assert_eq!(index.flatten([1, 2, 1]), Some(6 + 4 + 1));
    }

    #[test]
    fn flatten_matches_stride_sum() {
        let index = FlatIndex::new([5, 7]);
        let strides = index.strides();
        for pos in index.iter() {
            let expected = pos[0] as usize * strides[0] + pos[1] as usize * strides[1];
            assert_eq!(index.flatten(pos), Some(expected));
        }
    }

    #[test]
    fn first_axis_is_the_slow_axis() {
        let index = FlatIndex::new([3, 3]);
        assert_eq!(index.flatten([1, 0]), Some(3));
        assert_eq!(index.flatten([0, 1]), Some(1));
    }

    #[test]
    fn oob_rejects_each_face() {
        let index = FlatIndex::new([2, 3]);
        assert!(index.oob([-1, 0]));
        assert!(index.oob([0, -1]));
        assert!(index.oob([2, 0]));
        assert!(index.oob([0, 3]));
        assert!(!index.oob([1, 2]));
        assert_eq!(index.flatten([2, 0]), None);
        assert_eq!(index.unflatten(6), None);
    }

    #[test]
    fn zero_extent_is_empty() {
        let index = FlatIndex::new([0, 4]);
        assert_eq!(index.elem(), 0);
        assert!(index.oob([0, 0]));
        assert_eq!(index.iter().count(), 0);

        let negative = FlatIndex::new([-3]);
        assert_eq!(negative.ext(), [0]);
    }

    #[test]
    fn checked_elem_detects_overflow() {
        assert_eq!(FlatIndex::new([4, 3, 2]).checked_elem(), Some(24));
        assert_eq!(FlatIndex::new([i32::MAX, 0, i32::MAX]).checked_elem(), Some(0));
        assert_eq!(FlatIndex::new([i32::MAX; 4]).checked_elem(), None);
    }

    #[test]
    fn iter_visits_in_linear_order() {
        let index = FlatIndex::new([2, 2]);
        let positions: Vec<_> = index.iter().collect();
        assert_eq!(positions, vec![[0, 0], [0, 1], [1, 0], [1, 1]]);
    }

    #[test]
    fn grid_view_uses_ivec2() {
        let index = FlatIndex::new([3, 4]);
        let grid: &dyn GridIndex = &index;
        assert_eq!(grid.ext(), IVec2::new(3, 4));
        assert_eq!(grid.flatten(IVec2::new(2, 1)), Some(9));
        assert_eq!(grid.unflatten(9), Some(IVec2::new(2, 1)));
    }

    proptest! {
        #[test]
        fn unflatten_inverts_flatten_2d(
            ex in 1i32..20, ey in 1i32..20,
            x in 0i32..20, y in 0i32..20,
        ) {
            let index = FlatIndex::new([ex, ey]);
            let pos = [x % ex, y % ey];
            let i = index.flatten(pos).expect("in bounds");
            prop_assert!(i < index.elem());
            prop_assert_eq!(index.unflatten(i), Some(pos));
        }

        #[test]
        fn unflatten_inverts_flatten_4d(
            ext in prop::array::uniform4(1i32..6),
            raw in prop::array::uniform4(0i32..6),
        ) {
            let index = FlatIndex::new(ext);
            let pos: [i32; 4] = std::array::from_fn(|d| raw[d] % ext[d]);
            let i = index.flatten(pos).expect("in bounds");
            prop_assert_eq!(index.unflatten(i), Some(pos));
        }

        #[test]
        fn flatten_is_a_bijection_on_offsets(ex in 1i32..12, ey in 1i32..12) {
            let index = FlatIndex::new([ex, ey]);
            for i in 0..index.elem() {
                let pos = index.unflatten(i).expect("in range");
                prop_assert_eq!(index.flatten(pos), Some(i));
            }
        }
    }
}
