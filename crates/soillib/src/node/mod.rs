//! Type-erased fields over linear offsets.
//!
//! A [`Node`] answers "what is the value at linear offset `i`" and nothing more: it knows no
//! positions. Pairing a node with an [`Index`] happens in the algorithms and in
//! [`Node::bake`], [`Node::materialize`] and [`Node::export`].
//!
//! - [`Node::Constant`]: one value everywhere.
//! - [`Node::Cached`]: backed by a shared [`Buffer`].
//! - [`Node::Computed`]: an operation tree evaluated on every access.
use std::sync::Arc;

use tracing::debug;

use crate::buffer::{Buffer, BufferT};
use crate::error::{Error, Result};
use crate::index::Index;
use crate::types::{select, DType, Element, Select, Value};

pub mod computed;
pub mod export;

pub use computed::{BinaryOp, ComputeOp, Computed};
pub use export::{Array, ArrayData};

#[derive(Clone, Debug)]
pub enum Node {
    Constant(Value),
    Cached(Buffer),
    Computed(Computed),
}

impl Node {
    pub fn constant(value: impl Into<Value>) -> Self {
        Node::Constant(value.into())
    }

    pub fn cached(buffer: impl Into<Buffer>) -> Self {
        Node::Cached(buffer.into())
    }

    /// A node evaluating `f` at every requested offset.
    pub fn computed<T, F>(f: F) -> Self
    where
        T: Element,
        F: Fn(usize) -> T + Send + Sync + 'static,
    {
        Node::Computed(Computed::function(f))
    }

    /// Lazily scale this node by `factor`. See [`Computed::scale`].
    pub fn scale(self, factor: impl Into<Value>) -> Result<Self> {
        Ok(Node::Computed(Computed::scale(
            Arc::new(self),
            factor.into(),
        )?))
    }

    /// Lazily combine two nodes of the same type element by element.
    pub fn binary(op: BinaryOp, lhs: Node, rhs: Node) -> Result<Self> {
        Ok(Node::Computed(Computed::binary(
            op,
            Arc::new(lhs),
            Arc::new(rhs),
        )?))
    }

    pub fn dtype(&self) -> DType {
        match self {
            Node::Constant(value) => value.dtype(),
            Node::Cached(buffer) => buffer.dtype(),
            Node::Computed(computed) => computed.dtype(),
        }
    }

    /// Backing buffer of a cached node.
    pub fn buffer(&self) -> Option<&Buffer> {
        match self {
            Node::Cached(buffer) => Some(buffer),
            _ => None,
        }
    }

    fn check_offset(buffer: &Buffer, i: usize) -> Result<()> {
        if i >= buffer.elem() {
            return Err(Error::InvalidArgument(format!(
                "offset {i} outside buffer of {} elements",
                buffer.elem()
            )));
        }
        Ok(())
    }

    /// Typed value at linear offset `i`.
    pub fn get<T: Element>(&self, i: usize) -> Result<T> {
        match self {
            Node::Constant(value) => value.get(),
            Node::Cached(buffer) => {
                Self::check_offset(buffer, i)?;
                buffer.get(i)
            }
            Node::Computed(computed) => computed.eval(i)?.get(),
        }
    }

    /// Erased value at linear offset `i`.
    pub fn value(&self, i: usize) -> Result<Value> {
        match self {
            Node::Constant(value) => Ok(*value),
            Node::Cached(buffer) => {
                Self::check_offset(buffer, i)?;
                buffer.get_value(i)
            }
            Node::Computed(computed) => computed.eval(i),
        }
    }

    /// Scalar value at `i` widened to `f64`.
    pub fn scalar(&self, i: usize) -> Result<f64> {
        let value = self.value(i)?;
        value.as_f64().ok_or(Error::TypeMismatch {
            expected: "scalar",
            found: value.dtype(),
        })
    }

    /// Evaluate every linear offset of `index` into a new cached node.
    pub fn bake(&self, index: &Index) -> Result<Node> {
        struct Bake<'a> {
            node: &'a Node,
            elem: usize,
        }

        impl Select for Bake<'_> {
            type Output = Result<Buffer>;

            fn call<T: Element>(self) -> Result<Buffer> {
                let values = (0..self.elem)
                    .map(|i| self.node.get::<T>(i))
                    .collect::<Result<Vec<T>>>()?;
                Ok(BufferT::from_vec(values).into())
            }
        }

        let elem = index.elem();
        let buffer = select(self.dtype(), Bake { node: self, elem })?;
        debug!("Baked {} node over {} elements.", self.dtype(), elem);
        Ok(Node::Cached(buffer))
    }

    /// Move a cached floating-point node toward `target`: `x = x * (1 - rate) + y * rate`.
    pub fn track(&self, target: &Node, rate: f64) -> Result<()> {
        let Node::Cached(buffer) = self else {
            return Err(Error::InvalidArgument(
                "track requires a cached node".to_owned(),
            ));
        };
        let dtype = buffer.dtype();
        if target.dtype() != dtype {
            return Err(Error::type_mismatch(dtype, target.dtype()));
        }
        if !dtype.is_float() {
            return Err(Error::TypeMismatch {
                expected: "floating point",
                found: dtype,
            });
        }
        // Targets may read this buffer, so they are evaluated before any write.
        let targets = (0..buffer.elem())
            .map(|i| target.value(i))
            .collect::<Result<Vec<_>>>()?;
        for (i, y) in targets.into_iter().enumerate() {
            let x = buffer.get_value(i)?;
            buffer.set_value(i, lerp(x, y, rate)?)?;
        }
        Ok(())
    }
}

fn lerp(x: Value, y: Value, rate: f64) -> Result<Value> {
    let r = rate as f32;
    Ok(match (x, y) {
        (Value::Float32(x), Value::Float32(y)) => Value::Float32(x * (1.0 - r) + y * r),
        (Value::Float64(x), Value::Float64(y)) => Value::Float64(x * (1.0 - rate) + y * rate),
        (Value::Vec2(x), Value::Vec2(y)) => Value::Vec2(x * (1.0 - r) + y * r),
        (Value::Vec3(x), Value::Vec3(y)) => Value::Vec3(x * (1.0 - r) + y * r),
        (x, y) => return Err(Error::type_mismatch(x.dtype(), y.dtype())),
    })
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        Node::Constant(value)
    }
}

impl From<Buffer> for Node {
    fn from(buffer: Buffer) -> Self {
        Node::Cached(buffer)
    }
}

impl From<Computed> for Node {
    fn from(computed: Computed) -> Self {
        Node::Computed(computed)
    }
}

#[cfg(test)]
mod tests {
    use glam::{IVec2, Vec2};

    use super::*;
    use crate::buffer::Host;

    #[test]
    fn constant_is_the_same_everywhere() {
        let node = Node::constant(3.0f32);
        assert_eq!(node.dtype(), DType::Float32);
        for i in [0, 1, 17, usize::MAX] {
            assert_eq!(node.get::<f32>(i).unwrap(), 3.0);
        }
    }

    #[test]
    fn typed_get_checks_the_node_type() {
        let node = Node::constant(3.0f32);
        let err = node.get::<i32>(0).expect_err("int from a float node");
        assert!(matches!(
            err,
            Error::TypeMismatch {
                expected: "int",
                found: DType::Float32
            }
        ));
        let cached = Node::cached(vec![1.0f64, 2.0]);
        assert!(cached.get::<f32>(0).is_err());
        assert_eq!(cached.get::<f64>(1).unwrap(), 2.0);
    }

    #[test]
    fn cached_reads_through_shared_storage() {
        let buffer = BufferT::from_vec(vec![1i32, 2, 3]);
        let node = Node::cached(buffer.clone());
        buffer.set(1, 20);
        assert_eq!(node.value(1).unwrap(), Value::Int(20));
        assert_eq!(node.scalar(2).unwrap(), 3.0);
        assert!(matches!(
            node.value(3),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn cached_on_device_refuses_reads() {
        let node = Node::cached(vec![1.0f32]);
        node.buffer().unwrap().to_gpu();
        assert!(matches!(node.value(0), Err(Error::HostMismatch { .. })));
    }

    #[test]
    fn scalar_rejects_vectors() {
        let node = Node::constant(IVec2::ONE);
        assert!(matches!(
            node.scalar(0),
            Err(Error::TypeMismatch {
                expected: "scalar",
                ..
            })
        ));
    }

    #[test]
    fn scale_wraps_without_materializing() {
        let buffer = BufferT::from_vec(vec![1.0f32, 2.0, 3.0]);
        let scaled = Node::cached(buffer.clone()).scale(10.0f32).unwrap();
        assert!(matches!(scaled, Node::Computed(_)));
        assert_eq!(scaled.get::<f32>(2).unwrap(), 30.0);
        // Later writes to the base are visible through the lazy wrapper.
        buffer.set(2, 4.0);
        assert_eq!(scaled.get::<f32>(2).unwrap(), 40.0);
    }

    #[test]
    fn bake_evaluates_every_offset() {
        let index = Index::flat(&[2, 2]).unwrap();
        let node = Node::binary(
            BinaryOp::Add,
            Node::computed(|i| i as f64),
            Node::constant(0.5f64),
        )
        .unwrap();
        let baked = node.bake(&index).unwrap();
        let buffer = baked.buffer().expect("baked nodes are cached");
        assert_eq!(
            buffer.as_typed::<f64>().unwrap().to_vec(),
            vec![0.5, 1.5, 2.5, 3.5]
        );
    }

    #[test]
    fn track_moves_toward_target() {
        let node = Node::cached(vec![0.0f32, 10.0]);
        node.track(&Node::constant(20.0f32), 0.25).unwrap();
        let values = node.buffer().unwrap().as_typed::<f32>().unwrap().to_vec();
        assert_eq!(values, vec![5.0, 12.5]);
    }

    #[test]
    fn track_against_itself_is_stable() {
        let node = Node::cached(vec![Vec2::new(1.0, 2.0)]);
        node.track(&node.clone(), 0.5).unwrap();
        assert_eq!(node.get::<Vec2>(0).unwrap(), Vec2::new(1.0, 2.0));

        let derived = node.clone().scale(2.0f32).unwrap();
        node.track(&derived, 0.5).unwrap();
        assert_eq!(node.get::<Vec2>(0).unwrap(), Vec2::new(1.5, 3.0));
    }

    #[test]
    fn track_rejects_invalid_receivers() {
        let constant = Node::constant(1.0f32);
        assert!(matches!(
            constant.track(&Node::constant(2.0f32), 0.5),
            Err(Error::InvalidArgument(_))
        ));
        let ints = Node::cached(vec![1i32]);
        assert!(matches!(
            ints.track(&Node::constant(2i32), 0.5),
            Err(Error::TypeMismatch { .. })
        ));
        let floats = Node::cached(vec![1.0f32]);
        assert!(matches!(
            floats.track(&Node::constant(2.0f64), 0.5),
            Err(Error::TypeMismatch { .. })
        ));
        assert_eq!(floats.buffer().unwrap().host(), Host::Cpu);
    }
}
