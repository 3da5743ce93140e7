#![forbid(unsafe_code)]
//! soillib: typed numeric grids with tiled indices, lazy nodes and terrain flow algorithms.
//!
//! Modules:
//! - types: element type tags (`DType`), erased values and generic dispatch (`select`)
//! - buffer: shared typed storage (`BufferT<T>`) and its type-erased handle (`Buffer`)
//! - index: flat N-d and tiled 2D coordinate mappings
//! - node: constant, cached and computed fields over linear offsets, plus dense export
//! - algorithm: fractal noise, normals, flow direction, D8 flow codes and stochastic flow
//!   accumulation
//!
//! For examples, see the `soillib_demos` crate.
pub mod algorithm;
pub mod buffer;
pub mod error;
pub mod index;
pub mod node;
pub mod types;

/// Convenient re-exports for common types. Import with `use soillib::prelude::*;`.
pub mod prelude {
    pub use crate::algorithm::{
        Accumulation, AccumulationConfig, Direction, Flow, Noise, NoiseConfig, Normal,
        StartPositions, NEIGHBORS, NO_FLOW,
    };
    pub use crate::buffer::{Buffer, BufferT, Host, WeakBuffer};
    pub use crate::error::{Error, Result};
    pub use crate::index::{FlatIndex, GridIndex, Index, IndexKind, QuadIndex, QuadNode};
    pub use crate::node::{Array, ArrayData, BinaryOp, ComputeOp, Computed, Node};
    pub use crate::types::{select, select_tag, Category, DType, Element, Select, Value};
}
