//! Dense host export of nodes.
//!
//! [`Node::materialize`] writes a node into a dense buffer covering the index's bounding box.
//! Offsets that the index does not reach hold [`Element::UNSET`]. [`Node::export`] further
//! splits vector elements into a trailing component axis, producing a flat scalar [`Array`].
use glam::{IVec2, Vec2, Vec3};
use tracing::debug;

use crate::buffer::{Buffer, BufferT};
use crate::error::Result;
use crate::index::Index;
use crate::node::Node;
use crate::types::{select, DType, Element, Select};

/// Scalar component storage of an [`Array`].
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayData {
    Int(Vec<i32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

/// Row-major host array with an explicit shape.
#[derive(Clone, Debug, PartialEq)]
pub struct Array {
    shape: Vec<usize>,
    data: ArrayData,
}

impl Array {
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Scalar type of the stored components.
    pub fn dtype(&self) -> DType {
        match self.data {
            ArrayData::Int(_) => DType::Int,
            ArrayData::Float32(_) => DType::Float32,
            ArrayData::Float64(_) => DType::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ArrayData::Int(v) => v.len(),
            ArrayData::Float32(v) => v.len(),
            ArrayData::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn into_data(self) -> ArrayData {
        self.data
    }
}

struct Materialize<'a> {
    node: &'a Node,
    index: &'a Index,
}

impl Select for Materialize<'_> {
    type Output = Result<Buffer>;

    fn call<T: Element>(self) -> Result<Buffer> {
        let min = self.index.min();
        let dense = Index::flat(&self.index.ext())?;
        let out = BufferT::<T>::filled(dense.elem(), T::UNSET);
        {
            let mut data = out.write();
            for (i, pos) in self.index.iter() {
                let local: Vec<i32> = pos.iter().zip(&min).map(|(p, m)| p - m).collect();
                if let Some(j) = dense.flatten(&local)? {
                    data[j] = self.node.get::<T>(i)?;
                }
            }
        }
        Ok(out.into())
    }
}

fn components<T, C, const N: usize>(data: &[T], split: impl Fn(&T) -> [C; N]) -> Vec<C> {
    data.iter().flat_map(split).collect()
}

impl Node {
    /// Dense buffer over the bounding box of `index`.
    pub fn materialize(&self, index: &Index) -> Result<Buffer> {
        let buffer = select(self.dtype(), Materialize { node: self, index })?;
        debug!(
            "Materialized {} node over {:?} into {} elements.",
            self.dtype(),
            index.ext(),
            buffer.elem()
        );
        Ok(buffer)
    }

    /// Dense host array over the bounding box of `index`, with a trailing component axis
    /// for vector types.
    pub fn export(&self, index: &Index) -> Result<Array> {
        let buffer = self.materialize(index)?;
        let dtype = buffer.dtype();
        let mut shape: Vec<usize> = index.ext().iter().map(|&e| e.max(0) as usize).collect();
        if !dtype.is_scalar() {
            shape.push(dtype.components());
        }
        let data = match dtype {
            DType::Int => ArrayData::Int(buffer.as_typed::<i32>()?.to_vec()),
            DType::Float32 => ArrayData::Float32(buffer.as_typed::<f32>()?.to_vec()),
            DType::Float64 => ArrayData::Float64(buffer.as_typed::<f64>()?.to_vec()),
            DType::Vec2 => ArrayData::Float32(components(
                &buffer.as_typed::<Vec2>()?.read(),
                Vec2::to_array,
            )),
            DType::Vec3 => ArrayData::Float32(components(
                &buffer.as_typed::<Vec3>()?.read(),
                Vec3::to_array,
            )),
            DType::IVec2 => ArrayData::Int(components(
                &buffer.as_typed::<IVec2>()?.read(),
                IVec2::to_array,
            )),
        };
        Ok(Array { shape, data })
    }
}
