//! Error types for texture construction and backend creation.

use thiserror::Error;

/// Backend initialization failure.
///
/// Creation is the only fallible backend operation. Every variant maps to a
/// stable nonzero code for callers that report failures numerically.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("no compatible graphics device found")]
    NoDevice,
    #[error("invalid surface: {0}")]
    InvalidSurface(String),
    #[error("shader compilation failed: {0}")]
    Shader(String),
    #[error("pipeline creation failed: {0}")]
    Pipeline(String),
}

impl BackendError {
    /// Numeric error code. Never zero.
    pub fn code(&self) -> i32 {
        match self {
            Self::NoDevice => 1,
            Self::InvalidSurface(_) => 2,
            Self::Shader(_) => 3,
            Self::Pipeline(_) => 4,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TextureError {
    #[error("texture has no pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
}
