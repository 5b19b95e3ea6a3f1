//! Types for recurrent layers

use rustml_core::Tensor;

/// Hidden and cell state of a stacked recurrent layer.
///
/// Both tensors are `[num_layers, batch, hidden_size]`.
#[derive(Debug, Clone)]
pub struct RecurrentState {
    pub h: Tensor,
    pub c: Tensor,
}

impl RecurrentState {
    /// All-zero state.
    pub fn zeros(num_layers: usize, batch: usize, hidden_size: usize) -> Self {
        Self {
            h: Tensor::zeros([num_layers, batch, hidden_size]),
            c: Tensor::zeros([num_layers, batch, hidden_size]),
        }
    }

    pub fn num_layers(&self) -> usize {
        self.h.shape()[0]
    }

    pub fn batch_size(&self) -> usize {
        self.h.shape()[1]
    }
}
