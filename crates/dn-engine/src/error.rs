//! Error types for engine operations

use thiserror::Error;

/// Engine error types
#[derive(Error, Debug)]
pub enum EngineError {
    /// Model buffer has no bytes
    #[error("Model is empty")]
    EmptyModel,

    /// Engine rejected the model buffer
    #[error("Failed to load model: {reason}")]
    ModelLoadFailed { reason: String },

    /// Engine state could not be constructed
    #[error("Failed to create denoiser: {reason}")]
    CreateFailed { reason: String },

    /// Fallible reservation failed
    #[error("Could not allocate {bytes} bytes")]
    Allocation { bytes: usize },

    /// Model file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
