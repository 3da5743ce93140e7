//! Lazily evaluated operation trees.
use std::fmt;
use std::sync::Arc;

use glam::{IVec2, Vec2, Vec3};

use crate::error::{Error, Result};
use crate::node::Node;
use crate::types::{select, DType, Element, Select, Value};

/// Element-wise binary operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Min,
    Max,
}

/// Per-offset evaluation function.
#[derive(Clone)]
pub struct IndexFn(Arc<dyn Fn(usize) -> Value + Send + Sync>);

impl fmt::Debug for IndexFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IndexFn(..)")
    }
}

/// Operation evaluated for every requested linear offset.
#[derive(Clone, Debug)]
pub enum ComputeOp {
    Function(IndexFn),
    Scale { input: Arc<Node>, factor: Value },
    Binary {
        op: BinaryOp,
        lhs: Arc<Node>,
        rhs: Arc<Node>,
    },
}

/// A node whose values are produced on demand.
#[derive(Clone, Debug)]
pub struct Computed {
    dtype: DType,
    op: ComputeOp,
}

impl Computed {
    pub fn function<T, F>(f: F) -> Self
    where
        T: Element,
        F: Fn(usize) -> T + Send + Sync + 'static,
    {
        Self {
            dtype: T::DTYPE,
            op: ComputeOp::Function(IndexFn(Arc::new(move |i| f(i).into_value()))),
        }
    }

    /// Multiply every value of `input` by `factor`.
    ///
    /// Scalar factors are converted to the input's type; for vector inputs they are
    /// broadcast to every component.
    pub fn scale(input: Arc<Node>, factor: Value) -> Result<Self> {
        let dtype = input.dtype();
        let factor = coerce(factor, dtype)?;
        Ok(Self {
            dtype,
            op: ComputeOp::Scale { input, factor },
        })
    }

    pub fn binary(op: BinaryOp, lhs: Arc<Node>, rhs: Arc<Node>) -> Result<Self> {
        let dtype = lhs.dtype();
        if rhs.dtype() != dtype {
            return Err(Error::type_mismatch(dtype, rhs.dtype()));
        }
        Ok(Self {
            dtype,
            op: ComputeOp::Binary { op, lhs, rhs },
        })
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn op(&self) -> &ComputeOp {
        &self.op
    }

    /// Evaluate the operation at linear offset `i`.
    pub fn eval(&self, i: usize) -> Result<Value> {
        match &self.op {
            ComputeOp::Function(f) => Ok((f.0)(i)),
            ComputeOp::Scale { input, factor } => apply(BinaryOp::Mul, input.value(i)?, *factor),
            ComputeOp::Binary { op, lhs, rhs } => apply(*op, lhs.value(i)?, rhs.value(i)?),
        }
    }
}

struct Apply {
    op: BinaryOp,
    lhs: Value,
    rhs: Value,
}

impl Select for Apply {
    type Output = Result<Value>;

    fn call<T: Element>(self) -> Result<Value> {
        let a = self.lhs.get::<T>()?;
        let b = self.rhs.get::<T>()?;
        let out = match self.op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Min => a.min_elem(b),
            BinaryOp::Max => a.max_elem(b),
        };
        Ok(out.into_value())
    }
}

fn apply(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value> {
    select(lhs.dtype(), Apply { op, lhs, rhs })
}

fn coerce(factor: Value, dtype: DType) -> Result<Value> {
    if factor.dtype() == dtype {
        return Ok(factor);
    }
    let component = || {
        factor
            .as_f64()
            .ok_or_else(|| Error::type_mismatch(dtype, factor.dtype()))
    };
    Ok(match dtype {
        DType::Int | DType::Float32 | DType::Float64 => factor.cast(dtype)?,
        DType::Vec2 => Value::Vec2(Vec2::splat(component()? as f32)),
        DType::Vec3 => Value::Vec3(Vec3::splat(component()? as f32)),
        DType::IVec2 => Value::IVec2(IVec2::splat(component()? as i32)),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn function_reports_its_element_type() {
        let c = Computed::function(|i| IVec2::new(i as i32, 0));
        assert_eq!(c.dtype(), DType::IVec2);
        assert_eq!(c.eval(3).unwrap(), Value::IVec2(IVec2::new(3, 0)));
    }

    #[test]
    fn scale_is_evaluated_per_access() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let base = Arc::new(Node::computed(move |i| {
            counter.fetch_add(1, Ordering::Relaxed);
            i as f32
        }));
        let scaled = Computed::scale(base, Value::Float32(2.0)).unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 0);
        assert_eq!(scaled.eval(4).unwrap(), Value::Float32(8.0));
        assert_eq!(scaled.eval(4).unwrap(), Value::Float32(8.0));
        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn scalar_factor_broadcasts_over_vectors() {
        let base = Arc::new(Node::constant(Vec3::new(1.0, 2.0, 3.0)));
        let scaled = Computed::scale(base, Value::Float64(0.5)).unwrap();
        assert_eq!(scaled.eval(0).unwrap(), Value::Vec3(Vec3::new(0.5, 1.0, 1.5)));

        let ints = Arc::new(Node::constant(7i32));
        let scaled = Computed::scale(ints, Value::Float32(2.0)).unwrap();
        assert_eq!(scaled.eval(0).unwrap(), Value::Int(14));
    }

    #[test]
    fn vector_factor_must_match() {
        let base = Arc::new(Node::constant(1.0f32));
        let err = Computed::scale(base, Value::Vec2(Vec2::ONE)).expect_err("vec2 factor");
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn binary_ops_are_elementwise() {
        let lhs = Arc::new(Node::constant(Vec2::new(1.0, 5.0)));
        let rhs = Arc::new(Node::constant(Vec2::new(3.0, 2.0)));
        let eval = |op| {
            Computed::binary(op, Arc::clone(&lhs), Arc::clone(&rhs))
                .unwrap()
                .eval(0)
                .unwrap()
        };
        assert_eq!(eval(BinaryOp::Add), Value::Vec2(Vec2::new(4.0, 7.0)));
        assert_eq!(eval(BinaryOp::Sub), Value::Vec2(Vec2::new(-2.0, 3.0)));
        assert_eq!(eval(BinaryOp::Mul), Value::Vec2(Vec2::new(3.0, 10.0)));
        assert_eq!(eval(BinaryOp::Min), Value::Vec2(Vec2::new(1.0, 2.0)));
        assert_eq!(eval(BinaryOp::Max), Value::Vec2(Vec2::new(3.0, 5.0)));
    }

    #[test]
    fn binary_operands_must_share_a_type() {
        let lhs = Arc::new(Node::constant(1.0f32));
        let rhs = Arc::new(Node::constant(1.0f64));
        let err = Computed::binary(BinaryOp::Add, lhs, rhs).expect_err("f32 + f64");
        assert!(matches!(
            err,
            Error::TypeMismatch {
                expected: "float32",
                found: DType::Float64
            }
        ));
    }
}
