//! # RustML Neural Network
//!
//! Recurrent building blocks for RustML.
//!
//! This crate provides:
//! - `LSTM`: a stacked long short-term memory network
//! - `RecurrentUpdate`: the step interface recurrent layers expose, with the
//!   hidden/cell state passed in and returned explicitly
//!
//! ## Example
//!
//! ```rust
//! use rustml_core::Tensor;
//! use rustml_nn::{LSTM, RecurrentState, RecurrentUpdate};
//!
//! let lstm = LSTM::new(8, 4, 1).unwrap();
//! let state = RecurrentState::zeros(1, 3, 4);
//! let input = Tensor::zeros([1, 3, 8]); // [seq_len, batch, input_size]
//! let (output, next) = lstm.step(&input, &state).unwrap();
//! assert_eq!(output.shape(), &[1, 3, 4]);
//! assert_eq!(next.h.shape(), &[1, 3, 4]);
//! ```

pub mod api;
mod core;
mod saf;

pub use saf::*;
