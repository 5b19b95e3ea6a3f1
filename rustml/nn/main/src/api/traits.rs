//! Neural network traits

use crate::api::error::NnResult;
use crate::api::types::RecurrentState;
use rand::RngCore;
use rustml_core::Tensor;
use std::collections::HashMap;

/// A recurrent layer advanced one sequence at a time with explicit state.
///
/// The layer holds only its parameters; hidden and cell state are passed in
/// and the updated state is returned, so one instance can serve any number
/// of independent sequences.
pub trait RecurrentUpdate {
    /// Run `input` (`[seq_len, batch, input_size]`) from `state`.
    ///
    /// Returns the top layer's hidden output for every timestep
    /// (`[seq_len, batch, hidden_size]`) and the state after the last one.
    fn step(&self, input: &Tensor, state: &RecurrentState) -> NnResult<(Tensor, RecurrentState)>;

    /// Re-draw every parameter from the layer's default initialization.
    fn reset_parameters(&mut self, rng: &mut dyn RngCore);

    /// Parameters keyed by name, in a stable order.
    fn named_parameters(&self) -> Vec<(String, &Tensor)>;

    /// Replace parameters from a name-keyed map. Every parameter must be
    /// present with its current shape.
    fn load_named_parameters(&mut self, params: &HashMap<String, Tensor>) -> NnResult<()>;

    fn input_size(&self) -> usize;
    fn hidden_size(&self) -> usize;
    fn num_layers(&self) -> usize;

    fn parameter_count(&self) -> usize {
        self.named_parameters().iter().map(|(_, p)| p.numel()).sum()
    }
}
