//! Error types and result alias for the crate.
//!
//! This module defines [`enum@crate::error::Error`] and the crate-wide [Result] alias. Variants cover
//! unsupported type tags, typed access with the wrong element type, coordinate arity errors,
//! buffer residency errors, invalid arguments and configuration, and generic errors.
//!
//! Out-of-bounds positions are not errors: index lookups report them as `None`.
use thiserror::Error;

use crate::buffer::Host;
use crate::types::DType;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported type tag '{tag}'")]
    UnsupportedType { tag: String },

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: DType,
    },

    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("buffer resides on {found}, expected {expected}")]
    HostMismatch { expected: Host, found: Host },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn type_mismatch(expected: DType, found: DType) -> Self {
        Error::TypeMismatch {
            expected: expected.name(),
            found,
        }
    }
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Other(value)
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::Other(value.to_owned())
    }
}
