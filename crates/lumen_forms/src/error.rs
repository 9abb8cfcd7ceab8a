//! Form errors

use thiserror::Error;

use crate::path::FieldPath;

#[derive(Debug, Error)]
pub enum FormError {
    #[error("invalid field path `{0}`")]
    InvalidPath(String),

    #[error("no value at `{0}`")]
    PathNotFound(FieldPath),

    #[error("value at `{0}` is neither an object nor an array")]
    NotAContainer(FieldPath),

    #[error("index {index} out of bounds at `{path}` (length {len})")]
    IndexOutOfBounds {
        path: FieldPath,
        index: usize,
        len: usize,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FormError>;
