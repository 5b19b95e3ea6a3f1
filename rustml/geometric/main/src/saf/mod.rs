//! Facade re-exports for rustml-geometric

pub use crate::api::error::*;
pub use crate::api::types::*;
pub use crate::core::batch::{to_batch, to_batch_sized};
pub use crate::core::checkpoint::CONFIG_METADATA_KEY;
pub use crate::core::set2set::Set2Set;
