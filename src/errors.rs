use thiserror::Error;

use crate::path::{PathComponent, PathComponentError};
use crate::Digest;

/// Errors related to communication with the store.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("object {0} not found")]
    NotFound(Digest),

    #[error("internal storage error: {0}")]
    StorageError(String),
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(value: std::sync::PoisonError<T>) -> Self {
        Error::StorageError(value.to_string())
    }
}

/// Errors that can occur when populating [crate::Tree] values.
#[derive(Debug, Error, PartialEq)]
pub enum TreeError {
    /// Multiple entries with the same name encountered
    #[error("{:?} is a duplicate name", .0)]
    DuplicateName(PathComponent),

    /// Invalid entry name encountered
    #[error("invalid name: {0}")]
    InvalidName(#[from] PathComponentError),
}
