//! Facade re-exports for rustml-core

pub use crate::api::error::*;
pub use crate::core::tensor::Tensor;
pub use crate::core::shape::Shape;
pub use crate::core::runtime::RuntimeConfig;
