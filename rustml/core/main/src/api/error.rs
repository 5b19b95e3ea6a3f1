//! Error types for tensor operations

use thiserror::Error;

/// Result type for tensor operations
pub type TensorResult<T> = Result<T, TensorError>;

/// Errors that can occur in tensor operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorError {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Cannot broadcast shapes {shape1:?} and {shape2:?}")]
    BroadcastError {
        shape1: Vec<usize>,
        shape2: Vec<usize>,
    },

    #[error("Invalid dimension {dim} for tensor with {ndim} dimensions")]
    InvalidDimension { dim: i64, ndim: usize },

    #[error("Index {index} out of bounds for dimension {dim} with size {size}")]
    IndexOutOfBounds {
        dim: usize,
        index: usize,
        size: usize,
    },

    #[error("Operation on empty tensor list")]
    EmptyTensor,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}
