//! Store errors

use thiserror::Error;

use crate::atom::AtomKey;

/// Errors surfaced by the fallible store accessors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The stored value does not have the type the source promised
    #[error("atom {key:?} does not hold a value of type `{expected}`")]
    TypeMismatch {
        key: AtomKey,
        expected: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;
