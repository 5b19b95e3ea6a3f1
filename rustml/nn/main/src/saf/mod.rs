//! Facade re-exports for rustml-nn

pub use crate::api::error::*;
pub use crate::api::traits::*;
pub use crate::api::types::*;
pub use crate::core::lstm::LSTM;
