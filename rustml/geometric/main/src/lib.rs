//! # RustML Geometric
//!
//! Graph-level pooling for RustML.
//!
//! This crate provides:
//! - `Set2Set`: iterative attention pooling of variable-size sets into fixed-size vectors
//! - `to_batch`: scatter of a flat, set-tagged element list into a padded dense layout
//! - `Set2SetConfig`: JSON-loadable layer configuration
//! - safetensors checkpoints with PyTorch-compatible parameter names
//!
//! ## Example
//!
//! ```rust
//! use rustml_core::Tensor;
//! use rustml_geometric::{Set2Set, Set2SetConfig};
//!
//! // Two graphs: nodes 0..3 belong to graph 0, nodes 3..5 to graph 1
//! let x = Tensor::ones([5, 4]);
//! let batch = [0, 0, 0, 1, 1];
//!
//! let pool = Set2Set::new(Set2SetConfig::new(4, 3)).unwrap();
//! let out = pool.forward(&x, &batch).unwrap();
//! assert_eq!(out.shape(), &[2, 8]);
//! assert_eq!(pool.to_string(), "Set2Set(4, 8)");
//! ```

pub mod api;
mod core;
mod saf;

pub use saf::*;
