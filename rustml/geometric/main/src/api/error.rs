//! Error types for geometric layers

use rustml_core::TensorError;
use rustml_nn::NnError;
use thiserror::Error;

/// Result type for geometric operations
pub type GeometricResult<T> = Result<T, GeometricError>;

/// Errors that can occur in pooling layers, batching and checkpointing
#[derive(Error, Debug)]
pub enum GeometricError {
    #[error("Tensor error: {0}")]
    TensorError(#[from] TensorError),

    #[error("Neural network error: {0}")]
    NnError(#[from] NnError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Set id {id} out of range for {num_sets} sets")]
    SetIdOutOfRange { id: usize, num_sets: usize },

    #[error("Empty batch: at least one element is required")]
    EmptyBatch,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Config(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),
}
