//! Animation errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnimationError {
    #[error("tween duration must be a positive, finite number of milliseconds (got {0})")]
    InvalidDuration(f64),

    #[error("target frame rate must be greater than zero")]
    InvalidFps,

    #[error("invalid animation config: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, AnimationError>;
