//! # RustML Core
//!
//! Dense tensor substrate for RustML layers.
//!
//! This crate provides an f32 `Tensor` with the operations graph-level pooling
//! layers are built from: broadcasting element-wise arithmetic, reductions,
//! softmax, masking and concatenation.
//!
//! ## Features
//!
//! - Row-major storage shared through `Arc` (reshape is zero-copy)
//! - NumPy-style broadcasting for `add` and `mul`
//! - Row-parallel softmax via rayon, tunable through `RuntimeConfig`
//!
//! ## Example
//!
//! ```rust
//! use rustml_core::Tensor;
//!
//! let x = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], [2, 3]).unwrap();
//! let w = Tensor::from_vec(vec![1.0, 0.0, -1.0], [3]).unwrap();
//! let scores = x.mul(&w).unwrap().sum(-1).unwrap();
//! assert_eq!(scores.shape(), &[2]);
//! assert_eq!(scores.to_vec(), vec![-2.0, -2.0]);
//! ```

pub mod api;
mod core;
mod saf;

pub use saf::*;
