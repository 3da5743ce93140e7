//! Element type registry and generic dispatch.
//!
//! Every erased handle in the crate ([`Buffer`], [`crate::node::Node`]) carries one [`DType`].
//! Crossing from the erased to the concrete domain happens through [`select`], which calls a
//! [`Select`] implementation instantiated for the concrete [`Element`] type named by the tag.
//!
//! The element set is closed: [`Element`] is sealed and implemented exactly for
//! `i32`, `f32`, `f64`, [`glam::Vec2`], [`glam::Vec3`] and [`glam::IVec2`].
use std::fmt;
use std::ops::{Add, Mul, Sub};
use std::str::FromStr;

use glam::{IVec2, Vec2, Vec3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::buffer::{Buffer, BufferData, BufferT};
use crate::error::{Error, Result};

/// Runtime type tag of an element.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    Int,
    Float32,
    Float64,
    Vec2,
    Vec3,
    IVec2,
}

/// Algebraic category of an element type.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Scalar,
    Vector,
}

impl DType {
    /// All supported tags, ordered by their raw tag value.
    pub const ALL: [DType; 6] = [
        DType::Int,
        DType::Float32,
        DType::Float64,
        DType::Vec2,
        DType::Vec3,
        DType::IVec2,
    ];

    /// Lowercase name of the type, as accepted by [`DType::from_str`].
    pub const fn name(self) -> &'static str {
        match self {
            DType::Int => "int",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
            DType::Vec2 => "vec2",
            DType::Vec3 => "vec3",
            DType::IVec2 => "ivec2",
        }
    }

    /// Raw tag value, the inverse of `DType::try_from(u8)`.
    pub const fn tag(self) -> u8 {
        match self {
            DType::Int => 0,
            DType::Float32 => 1,
            DType::Float64 => 2,
            DType::Vec2 => 3,
            DType::Vec3 => 4,
            DType::IVec2 => 5,
        }
    }

    pub const fn category(self) -> Category {
        match self {
            DType::Int | DType::Float32 | DType::Float64 => Category::Scalar,
            DType::Vec2 | DType::Vec3 | DType::IVec2 => Category::Vector,
        }
    }

    /// Number of scalar components per element.
    pub const fn components(self) -> usize {
        match self {
            DType::Int | DType::Float32 | DType::Float64 => 1,
            DType::Vec2 | DType::IVec2 => 2,
            DType::Vec3 => 3,
        }
    }

    /// Scalar type of a single component.
    pub const fn component(self) -> DType {
        match self {
            DType::Int | DType::IVec2 => DType::Int,
            DType::Float32 | DType::Vec2 | DType::Vec3 => DType::Float32,
            DType::Float64 => DType::Float64,
        }
    }

    #[inline]
    pub const fn is_scalar(self) -> bool {
        matches!(self.category(), Category::Scalar)
    }

    /// True if the components are floating point.
    #[inline]
    pub const fn is_float(self) -> bool {
        !matches!(self.component(), DType::Int)
    }

    /// Size of one element in bytes.
    pub fn size_of(self) -> usize {
        struct SizeOf;

        impl Select for SizeOf {
            type Output = usize;

            fn call<T: Element>(self) -> usize {
                std::mem::size_of::<T>()
            }
        }

        select(self, SizeOf)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for DType {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self> {
        DType::ALL
            .get(tag as usize)
            .copied()
            .ok_or_else(|| Error::UnsupportedType {
                tag: tag.to_string(),
            })
    }
}

impl FromStr for DType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "int" | "i32" => Ok(DType::Int),
            "float32" | "f32" | "float" => Ok(DType::Float32),
            "float64" | "f64" | "double" => Ok(DType::Float64),
            "vec2" => Ok(DType::Vec2),
            "vec3" => Ok(DType::Vec3),
            "ivec2" => Ok(DType::IVec2),
            _ => Err(Error::UnsupportedType { tag: s.to_owned() }),
        }
    }
}

/// A generic operation that can be instantiated for every [`Element`] type.
///
/// Implementors carry their arguments as fields; [`select`] picks the instantiation.
pub trait Select {
    type Output;

    fn call<T: Element>(self) -> Self::Output;
}

/// Invoke `op` instantiated for the concrete type named by `dtype`.
#[inline]
pub fn select<S: Select>(dtype: DType, op: S) -> S::Output {
    match dtype {
        DType::Int => op.call::<i32>(),
        DType::Float32 => op.call::<f32>(),
        DType::Float64 => op.call::<f64>(),
        DType::Vec2 => op.call::<Vec2>(),
        DType::Vec3 => op.call::<Vec3>(),
        DType::IVec2 => op.call::<IVec2>(),
    }
}

/// Like [`select`], for a raw tag that may lie outside the enumeration.
pub fn select_tag<S: Select>(tag: u8, op: S) -> Result<S::Output> {
    Ok(select(DType::try_from(tag)?, op))
}

mod sealed {
    pub trait Sealed {}
}

/// A concrete element type storable in a [`BufferT`].
///
/// Sealed: the set of implementors is exactly the set of [`DType`] variants.
pub trait Element:
    sealed::Sealed
    + Copy
    + Default
    + PartialEq
    + fmt::Debug
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
{
    const DTYPE: DType;

    /// Sentinel written to positions outside an index's domain.
    const UNSET: Self;

    fn into_value(self) -> Value;

    /// Exact-type extraction; no numeric conversion happens here.
    fn from_value(value: Value) -> Option<Self>;

    /// Component-wise minimum.
    fn min_elem(self, other: Self) -> Self;

    /// Component-wise maximum.
    fn max_elem(self, other: Self) -> Self;

    #[doc(hidden)]
    fn wrap(buffer: BufferT<Self>) -> Buffer;

    #[doc(hidden)]
    fn view(buffer: &Buffer) -> Option<&BufferT<Self>>;

    #[doc(hidden)]
    fn unwrap(buffer: Buffer) -> std::result::Result<BufferT<Self>, Buffer>;
}

macro_rules! impl_element {
    ($t:ty, $variant:ident, $unset:expr) => {
        impl sealed::Sealed for $t {}

        impl Element for $t {
            const DTYPE: DType = DType::$variant;
            const UNSET: Self = $unset;

            #[inline]
            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            #[inline]
            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v),
                    _ => None,
                }
            }

            #[inline]
            fn min_elem(self, other: Self) -> Self {
                self.min(other)
            }

            #[inline]
            fn max_elem(self, other: Self) -> Self {
                self.max(other)
            }

            fn wrap(buffer: BufferT<Self>) -> Buffer {
                Buffer::from_data(BufferData::$variant(buffer))
            }

            fn view(buffer: &Buffer) -> Option<&BufferT<Self>> {
                match buffer.data() {
                    BufferData::$variant(b) => Some(b),
                    _ => None,
                }
            }

            fn unwrap(buffer: Buffer) -> std::result::Result<BufferT<Self>, Buffer> {
                match buffer.into_data() {
                    BufferData::$variant(b) => Ok(b),
                    other => Err(Buffer::from_data(other)),
                }
            }
        }

        impl From<$t> for Value {
            fn from(value: $t) -> Self {
                Value::$variant(value)
            }
        }
    };
}

impl_element!(i32, Int, i32::MIN);
impl_element!(f32, Float32, f32::NAN);
impl_element!(f64, Float64, f64::NAN);
impl_element!(Vec2, Vec2, Vec2::NAN);
impl_element!(Vec3, Vec3, Vec3::NAN);
impl_element!(IVec2, IVec2, IVec2::new(i32::MIN, i32::MIN));

/// An erased element value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Int(i32),
    Float32(f32),
    Float64(f64),
    Vec2(Vec2),
    Vec3(Vec3),
    IVec2(IVec2),
}

impl Value {
    pub fn dtype(&self) -> DType {
        match self {
            Value::Int(_) => DType::Int,
            Value::Float32(_) => DType::Float32,
            Value::Float64(_) => DType::Float64,
            Value::Vec2(_) => DType::Vec2,
            Value::Vec3(_) => DType::Vec3,
            Value::IVec2(_) => DType::IVec2,
        }
    }

    /// Scalar values widened to `f64`; `None` for vectors.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Int(v) => Some(v as f64),
            Value::Float32(v) => Some(v as f64),
            Value::Float64(v) => Some(v),
            Value::Vec2(_) | Value::Vec3(_) | Value::IVec2(_) => None,
        }
    }

    /// Extract the concrete value, failing with [`Error::TypeMismatch`] on a different type.
    pub fn get<T: Element>(self) -> Result<T> {
        T::from_value(self).ok_or_else(|| Error::type_mismatch(T::DTYPE, self.dtype()))
    }

    /// Convert to `dtype`. Scalars convert between each other numerically; vectors only
    /// convert to their own type.
    pub fn cast(self, dtype: DType) -> Result<Value> {
        if self.dtype() == dtype {
            return Ok(self);
        }
        let Some(v) = self.as_f64().filter(|_| dtype.is_scalar()) else {
            return Err(Error::TypeMismatch {
                expected: dtype.name(),
                found: self.dtype(),
            });
        };
        Ok(match dtype {
            DType::Int => Value::Int(v as i32),
            DType::Float32 => Value::Float32(v as f32),
            _ => Value::Float64(v),
        })
    }
}

impl From<mint::Vector2<f32>> for Value {
    fn from(value: mint::Vector2<f32>) -> Self {
        Value::Vec2(value.into())
    }
}

impl From<mint::Vector3<f32>> for Value {
    fn from(value: mint::Vector3<f32>) -> Self {
        Value::Vec3(value.into())
    }
}

impl From<mint::Vector2<i32>> for Value {
    fn from(value: mint::Vector2<i32>) -> Self {
        Value::IVec2(value.into())
    }
}
