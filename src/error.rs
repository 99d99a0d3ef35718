//! Error types for Salina

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("No chunk files matching prefix '{prefix}' in {dir}")]
    ChunkNotFound { prefix: String, dir: PathBuf },

    #[error("Malformed chunk name '{0}': expected '<prefix>-chunk-<i>-Of-<n>'")]
    MalformedChunkName(String),

    #[error("Invalid dataset cache: {0}")]
    CacheInvalid(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;
