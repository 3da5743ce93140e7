//! Shared, homogeneous element storage.
//!
//! [`BufferT<T>`] is a strict-typed array behind a shared handle: clones alias the same
//! storage, writes through any alias are visible to all of them, and the storage is freed
//! when the last handle drops. [`Buffer`] is the type-erased wrapper that holds exactly one
//! [`BufferT<T>`] and checks the requested element type on every typed access.
//!
//! Storage has a residency ([`Host`]). There is no device driver in this crate: device
//! residency is a separate staging allocation, so relocation keeps its exclusive
//! allocate-copy-free semantics and erased accessors refuse device-resident data.
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Weak};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Error, Result};
use crate::types::{select, DType, Element, Select, Value};

/// Residency of a buffer's storage.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Host {
    #[default]
    Cpu,
    Gpu,
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Host::Cpu => f.write_str("cpu"),
            Host::Gpu => f.write_str("gpu"),
        }
    }
}

struct Storage<T> {
    data: Vec<T>,
    host: Host,
}

/// Strict-typed shared array.
pub struct BufferT<T: Element> {
    inner: Arc<RwLock<Storage<T>>>,
}

/// Non-owning observer of a [`BufferT`] allocation.
pub struct WeakBuffer<T: Element> {
    inner: Weak<RwLock<Storage<T>>>,
}

/// Shared read access to a buffer's elements.
pub struct BufferRead<'a, T>(RwLockReadGuard<'a, Storage<T>>);

/// Exclusive write access to a buffer's elements.
pub struct BufferWrite<'a, T>(RwLockWriteGuard<'a, Storage<T>>);

impl<T> Deref for BufferRead<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0.data
    }
}

impl<T> Deref for BufferWrite<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0.data
    }
}

impl<T> DerefMut for BufferWrite<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.0.data
    }
}

impl<T: Element> BufferT<T> {
    /// Allocate `len` default-initialized elements on the CPU.
    pub fn new(len: usize) -> Self {
        Self::with_host(len, Host::Cpu)
    }

    /// Allocate `len` default-initialized elements on `host`.
    pub fn with_host(len: usize, host: Host) -> Self {
        Self::from_storage(vec![T::default(); len], host)
    }

    /// Allocate `len` copies of `value` on the CPU.
    pub fn filled(len: usize, value: T) -> Self {
        Self::from_storage(vec![value; len], Host::Cpu)
    }

    /// Wrap existing CPU data without copying.
    pub fn from_vec(data: Vec<T>) -> Self {
        Self::from_storage(data, Host::Cpu)
    }

    fn from_storage(data: Vec<T>, host: Host) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Storage { data, host })),
        }
    }

    fn storage(&self) -> RwLockReadGuard<'_, Storage<T>> {
        self.inner.read()
    }

    fn storage_mut(&self) -> RwLockWriteGuard<'_, Storage<T>> {
        self.inner.write()
    }

    /// Number of elements.
    pub fn elem(&self) -> usize {
        self.storage().data.len()
    }

    /// Total size in bytes.
    pub fn size(&self) -> usize {
        self.elem() * std::mem::size_of::<T>()
    }

    pub fn is_empty(&self) -> bool {
        self.elem() == 0
    }

    pub fn host(&self) -> Host {
        self.storage().host
    }

    /// Number of live handles sharing this storage.
    pub fn refs(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Read the element at linear offset `index`.
    ///
    /// # Panics
    /// Panics if `index >= self.elem()`. Offsets are expected to come from an index.
    #[inline]
    pub fn get(&self, index: usize) -> T {
        self.storage().data[index]
    }

    /// Write the element at linear offset `index`; visible through every alias.
    ///
    /// # Panics
    /// Panics if `index >= self.elem()`.
    #[inline]
    pub fn set(&self, index: usize, value: T) {
        self.storage_mut().data[index] = value;
    }

    pub fn fill(&self, value: T) {
        self.storage_mut().data.fill(value);
    }

    pub fn zero(&self) {
        self.fill(T::default());
    }

    /// Borrow all elements for reading.
    pub fn read(&self) -> BufferRead<'_, T> {
        BufferRead(self.storage())
    }

    /// Borrow all elements for writing.
    pub fn write(&self) -> BufferWrite<'_, T> {
        BufferWrite(self.storage_mut())
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.storage().data.clone()
    }

    /// Relocate the storage to the CPU. No-op if already there.
    pub fn to_cpu(&self) {
        self.relocate(Host::Cpu);
    }

    /// Relocate the storage to the device. No-op if already there.
    pub fn to_gpu(&self) {
        self.relocate(Host::Gpu);
    }

    fn relocate(&self, target: Host) {
        let mut storage = self.storage_mut();
        if storage.host == target {
            return;
        }
        let moved = storage.data.to_vec();
        let source = std::mem::replace(&mut storage.data, moved);
        drop(source);
        trace!(
            "Relocated buffer of {} {} elements from {} to {}.",
            storage.data.len(),
            T::DTYPE,
            storage.host,
            target
        );
        storage.host = target;
    }

    /// Detach this handle from its storage, leaving it empty. Safe to call repeatedly.
    pub fn release(&mut self) {
        *self = Self::new(0);
    }

    /// True if both handles share the same storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn downgrade(&self) -> WeakBuffer<T> {
        WeakBuffer {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl<T: Element> WeakBuffer<T> {
    /// True while at least one [`BufferT`] handle keeps the storage alive.
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    pub fn upgrade(&self) -> Option<BufferT<T>> {
        self.inner.upgrade().map(|inner| BufferT { inner })
    }
}

impl<T: Element> Clone for BufferT<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Element> Default for BufferT<T> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<T: Element> From<Vec<T>> for BufferT<T> {
    fn from(data: Vec<T>) -> Self {
        Self::from_vec(data)
    }
}

impl<T: Element> fmt::Debug for BufferT<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let storage = self.storage();
        f.debug_struct("BufferT")
            .field("dtype", &T::DTYPE)
            .field("elem", &storage.data.len())
            .field("host", &storage.host)
            .field("refs", &Arc::strong_count(&self.inner))
            .finish()
    }
}

#[derive(Clone, Debug)]
pub(crate) enum BufferData {
    Int(BufferT<i32>),
    Float32(BufferT<f32>),
    Float64(BufferT<f64>),
    Vec2(BufferT<glam::Vec2>),
    Vec3(BufferT<glam::Vec3>),
    IVec2(BufferT<glam::IVec2>),
}

macro_rules! with_buffer {
    ($data:expr, $b:ident => $body:expr) => {
        match $data {
            BufferData::Int($b) => $body,
            BufferData::Float32($b) => $body,
            BufferData::Float64($b) => $body,
            BufferData::Vec2($b) => $body,
            BufferData::Vec3($b) => $body,
            BufferData::IVec2($b) => $body,
        }
    };
}

/// Type-erased shared buffer.
#[derive(Clone, Debug)]
pub struct Buffer {
    data: BufferData,
}

impl Buffer {
    /// Allocate `len` default-initialized elements of `dtype` on the CPU.
    pub fn new(dtype: DType, len: usize) -> Self {
        struct Allocate(usize);

        impl Select for Allocate {
            type Output = Buffer;

            fn call<T: Element>(self) -> Buffer {
                Buffer::from(BufferT::<T>::new(self.0))
            }
        }

        select(dtype, Allocate(len))
    }

    pub(crate) fn from_data(data: BufferData) -> Self {
        Self { data }
    }

    pub(crate) fn data(&self) -> &BufferData {
        &self.data
    }

    pub(crate) fn into_data(self) -> BufferData {
        self.data
    }

    pub fn dtype(&self) -> DType {
        match self.data {
            BufferData::Int(_) => DType::Int,
            BufferData::Float32(_) => DType::Float32,
            BufferData::Float64(_) => DType::Float64,
            BufferData::Vec2(_) => DType::Vec2,
            BufferData::Vec3(_) => DType::Vec3,
            BufferData::IVec2(_) => DType::IVec2,
        }
    }

    pub fn elem(&self) -> usize {
        with_buffer!(&self.data, b => b.elem())
    }

    /// Total size in bytes.
    pub fn size(&self) -> usize {
        with_buffer!(&self.data, b => b.size())
    }

    pub fn is_empty(&self) -> bool {
        self.elem() == 0
    }

    pub fn host(&self) -> Host {
        with_buffer!(&self.data, b => b.host())
    }

    pub fn refs(&self) -> usize {
        with_buffer!(&self.data, b => b.refs())
    }

    /// Borrow the strict-typed buffer. Fails unless `T` matches [`Buffer::dtype`].
    pub fn as_typed<T: Element>(&self) -> Result<&BufferT<T>> {
        T::view(self).ok_or_else(|| Error::type_mismatch(T::DTYPE, self.dtype()))
    }

    /// Convert into the strict-typed buffer, sharing the same storage.
    pub fn into_typed<T: Element>(self) -> Result<BufferT<T>> {
        T::unwrap(self).map_err(|b| Error::type_mismatch(T::DTYPE, b.dtype()))
    }

    fn ensure_cpu(&self) -> Result<()> {
        match self.host() {
            Host::Cpu => Ok(()),
            found => Err(Error::HostMismatch {
                expected: Host::Cpu,
                found,
            }),
        }
    }

    /// Checked typed read of the element at `index`.
    pub fn get<T: Element>(&self, index: usize) -> Result<T> {
        let typed = self.as_typed::<T>()?;
        self.ensure_cpu()?;
        Ok(typed.get(index))
    }

    /// Checked typed write of the element at `index`.
    pub fn set<T: Element>(&self, index: usize, value: T) -> Result<()> {
        let typed = self.as_typed::<T>()?;
        self.ensure_cpu()?;
        typed.set(index, value);
        Ok(())
    }

    /// Erased read of the element at `index`.
    pub fn get_value(&self, index: usize) -> Result<Value> {
        self.ensure_cpu()?;
        Ok(with_buffer!(&self.data, b => b.get(index).into_value()))
    }

    /// Erased write; the value must have this buffer's exact type.
    pub fn set_value(&self, index: usize, value: Value) -> Result<()> {
        self.ensure_cpu()?;
        with_buffer!(&self.data, b => {
            b.set(index, value.get()?);
            Ok(())
        })
    }

    /// Set every element to zero.
    pub fn zero(&self) -> Result<()> {
        self.ensure_cpu()?;
        with_buffer!(&self.data, b => b.zero());
        Ok(())
    }

    /// Set every element to `value`, which must have this buffer's exact type.
    pub fn fill(&self, value: Value) -> Result<()> {
        self.ensure_cpu()?;
        with_buffer!(&self.data, b => {
            b.fill(value.get()?);
            Ok(())
        })
    }

    pub fn to_cpu(&self) {
        with_buffer!(&self.data, b => b.to_cpu())
    }

    pub fn to_gpu(&self) {
        with_buffer!(&self.data, b => b.to_gpu())
    }

    /// True if both handles share the same storage.
    pub fn ptr_eq(&self, other: &Buffer) -> bool {
        match (&self.data, &other.data) {
            (BufferData::Int(a), BufferData::Int(b)) => a.ptr_eq(b),
            (BufferData::Float32(a), BufferData::Float32(b)) => a.ptr_eq(b),
            (BufferData::Float64(a), BufferData::Float64(b)) => a.ptr_eq(b),
            (BufferData::Vec2(a), BufferData::Vec2(b)) => a.ptr_eq(b),
            (BufferData::Vec3(a), BufferData::Vec3(b)) => a.ptr_eq(b),
            (BufferData::IVec2(a), BufferData::IVec2(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl<T: Element> From<BufferT<T>> for Buffer {
    fn from(buffer: BufferT<T>) -> Self {
        T::wrap(buffer)
    }
}

impl<T: Element> From<Vec<T>> for Buffer {
    fn from(data: Vec<T>) -> Self {
        T::wrap(BufferT::from_vec(data))
    }
}
