use crate::api::error::{NnError, NnResult};
use crate::api::traits::RecurrentUpdate;
use crate::api::types::RecurrentState;
use rand::RngCore;
use rand::distributions::{Distribution, Uniform};
use rustml_core::Tensor;
use std::collections::HashMap;
use std::time::Instant;

/// Parameters for a single LSTM layer.
struct LSTMLayerParams {
    w_ih: Tensor, // [4*hidden_size, input_size_for_layer]
    w_hh: Tensor, // [4*hidden_size, hidden_size]
    b_ih: Tensor, // [4*hidden_size]
    b_hh: Tensor, // [4*hidden_size]
}

/// Stacked LSTM with explicit state threading.
///
/// Implements the standard LSTM equations per timestep per layer:
///   gates = W_ih @ x_t + b_ih + W_hh @ h_{t-1} + b_hh
///   i, f, g, o = split(gates, 4)
///   i_t = sigmoid(i), f_t = sigmoid(f), g_t = tanh(g), o_t = sigmoid(o)
///   c_t = f_t * c_{t-1} + i_t * g_t
///   h_t = o_t * tanh(c_t)
///
/// Input shape:  [seq_len, batch, input_size]
/// Output shape: [seq_len, batch, hidden_size]
/// State shape:  [num_layers, batch, hidden_size] for both h and c
///
/// Parameters are named `weight_ih_l{k}`, `weight_hh_l{k}`, `bias_ih_l{k}`,
/// `bias_hh_l{k}` with the gate blocks stacked in i, f, g, o order, so weights
/// exported from other frameworks load without reordering.
pub struct LSTM {
    layers: Vec<LSTMLayerParams>,
    input_size: usize,
    hidden_size: usize,
    num_layers: usize,
}

impl LSTM {
    /// Creates a new LSTM with weights drawn from the thread RNG.
    ///
    /// - `input_size`: dimensionality of the input features
    /// - `hidden_size`: number of hidden units per layer
    /// - `num_layers`: number of stacked LSTM layers
    pub fn new(input_size: usize, hidden_size: usize, num_layers: usize) -> NnResult<Self> {
        Self::with_rng(input_size, hidden_size, num_layers, &mut rand::thread_rng())
    }

    /// Creates a new LSTM with weights drawn from `rng`.
    pub fn with_rng(
        input_size: usize,
        hidden_size: usize,
        num_layers: usize,
        rng: &mut dyn RngCore,
    ) -> NnResult<Self> {
        if num_layers == 0 {
            return Err(NnError::InvalidConfig("LSTM must have at least 1 layer".into()));
        }
        if hidden_size == 0 {
            return Err(NnError::InvalidConfig("hidden_size must be positive".into()));
        }
        if input_size == 0 {
            return Err(NnError::InvalidConfig("input_size must be positive".into()));
        }

        let gate_size = 4 * hidden_size;
        let layers = (0..num_layers)
            .map(|layer_idx| {
                let layer_input_size = if layer_idx == 0 { input_size } else { hidden_size };
                LSTMLayerParams {
                    w_ih: Tensor::zeros([gate_size, layer_input_size]),
                    w_hh: Tensor::zeros([gate_size, hidden_size]),
                    b_ih: Tensor::zeros([gate_size]),
                    b_hh: Tensor::zeros([gate_size]),
                }
            })
            .collect();

        let mut lstm = Self {
            layers,
            input_size,
            hidden_size,
            num_layers,
        };
        lstm.reset_parameters(rng);
        Ok(lstm)
    }

    fn layer_input_size(&self, layer_idx: usize) -> usize {
        if layer_idx == 0 { self.input_size } else { self.hidden_size }
    }

    fn named_parameters_mut(&mut self) -> Vec<(String, &mut Tensor)> {
        let mut params = Vec::with_capacity(self.num_layers * 4);
        for (l, layer) in self.layers.iter_mut().enumerate() {
            params.push((format!("weight_ih_l{l}"), &mut layer.w_ih));
            params.push((format!("weight_hh_l{l}"), &mut layer.w_hh));
            params.push((format!("bias_ih_l{l}"), &mut layer.b_ih));
            params.push((format!("bias_hh_l{l}"), &mut layer.b_hh));
        }
        params
    }
}

impl RecurrentUpdate for LSTM {
    fn step(&self, input: &Tensor, state: &RecurrentState) -> NnResult<(Tensor, RecurrentState)> {
        let shape = input.shape();
        if shape.len() != 3 || shape[2] != self.input_size {
            return Err(NnError::ShapeMismatch(format!(
                "LSTM input must be [seq_len, batch, {}], got {:?}",
                self.input_size, shape
            )));
        }
        let seq_len = shape[0];
        let batch = shape[1];
        let hidden = self.hidden_size;

        let state_shape = [self.num_layers, batch, hidden];
        if state.h.shape() != state_shape || state.c.shape() != state_shape {
            return Err(NnError::ShapeMismatch(format!(
                "LSTM state must be {:?}, got h={:?} c={:?}",
                state_shape,
                state.h.shape(),
                state.c.shape()
            )));
        }

        let _t = if log::log_enabled!(log::Level::Trace) { Some(Instant::now()) } else { None };

        let per_layer = batch * hidden;
        let split_layers = |t: &Tensor| -> Vec<Vec<f32>> {
            let data = t.as_slice();
            (0..self.num_layers)
                .map(|l| data[l * per_layer..(l + 1) * per_layer].to_vec())
                .collect()
        };
        let mut h_data = split_layers(&state.h);
        let mut c_data = split_layers(&state.c);

        let input_data = input.as_slice();
        let step_in = batch * self.input_size;
        let mut output_data = vec![0.0f32; seq_len * per_layer];

        for t in 0..seq_len {
            // The input flowing through layers for this timestep
            let mut layer_input = input_data[t * step_in..(t + 1) * step_in].to_vec();

            for l in 0..self.num_layers {
                let (h_new, c_new) = cell_forward(
                    &self.layers[l],
                    &layer_input,
                    &h_data[l],
                    &c_data[l],
                    batch,
                    self.layer_input_size(l),
                    hidden,
                );
                h_data[l].copy_from_slice(&h_new);
                c_data[l] = c_new;
                // Output of this layer becomes input to the next layer
                layer_input = h_new;
            }

            output_data[t * per_layer..(t + 1) * per_layer].copy_from_slice(&layer_input);
        }

        let output = Tensor::from_vec(output_data, [seq_len, batch, hidden])?;
        let next = RecurrentState {
            h: Tensor::from_vec(h_data.concat(), state_shape)?,
            c: Tensor::from_vec(c_data.concat(), state_shape)?,
        };

        if let Some(t) = _t {
            log::trace!(
                "[perf] lstm::step {:?}->{:?} {:.3}ms",
                shape,
                output.shape(),
                t.elapsed().as_secs_f64() * 1000.0
            );
        }

        Ok((output, next))
    }

    /// Every weight and bias is drawn from U(-k, k) with `k = 1/sqrt(hidden_size)`.
    fn reset_parameters(&mut self, rng: &mut dyn RngCore) {
        let k = 1.0 / (self.hidden_size as f32).sqrt();
        let dist = Uniform::new(-k, k);
        for (_, param) in self.named_parameters_mut() {
            *param = Tensor::from_fn(param.shape().to_vec(), |_| dist.sample(&mut *rng));
        }
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        let mut params = Vec::with_capacity(self.num_layers * 4);
        for (l, layer) in self.layers.iter().enumerate() {
            params.push((format!("weight_ih_l{l}"), &layer.w_ih));
            params.push((format!("weight_hh_l{l}"), &layer.w_hh));
            params.push((format!("bias_ih_l{l}"), &layer.b_ih));
            params.push((format!("bias_hh_l{l}"), &layer.b_hh));
        }
        params
    }

    fn load_named_parameters(&mut self, params: &HashMap<String, Tensor>) -> NnResult<()> {
        // Validate everything before touching any weight
        let mut replacements = Vec::with_capacity(self.num_layers * 4);
        for (name, current) in self.named_parameters() {
            let loaded = params
                .get(&name)
                .ok_or_else(|| NnError::MissingParameter(name.clone()))?;
            if loaded.shape() != current.shape() {
                return Err(NnError::ShapeMismatch(format!(
                    "{}: expected {:?}, got {:?}",
                    name,
                    current.shape(),
                    loaded.shape()
                )));
            }
            replacements.push(loaded.clone());
        }
        for ((_, slot), loaded) in self.named_parameters_mut().into_iter().zip(replacements) {
            *slot = loaded;
        }
        Ok(())
    }

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn num_layers(&self) -> usize {
        self.num_layers
    }
}

/// One LSTM cell update for a whole batch. Returns (h_new, c_new), each `[batch * hidden]`.
fn cell_forward(
    params: &LSTMLayerParams,
    x: &[f32],
    h: &[f32],
    c: &[f32],
    batch: usize,
    lis: usize,
    hidden: usize,
) -> (Vec<f32>, Vec<f32>) {
    let w_ih = params.w_ih.as_slice();
    let w_hh = params.w_hh.as_slice();
    let b_ih = params.b_ih.as_slice();
    let b_hh = params.b_hh.as_slice();
    let gate_size = 4 * hidden;

    let mut h_new = vec![0.0f32; batch * hidden];
    let mut c_new = vec![0.0f32; batch * hidden];
    let mut gates = vec![0.0f32; gate_size];

    for b in 0..batch {
        let x_b = &x[b * lis..(b + 1) * lis];
        let h_b = &h[b * hidden..(b + 1) * hidden];

        for (g, gate) in gates.iter_mut().enumerate() {
            *gate = b_ih[g]
                + b_hh[g]
                + dot(&w_ih[g * lis..(g + 1) * lis], x_b)
                + dot(&w_hh[g * hidden..(g + 1) * hidden], h_b);
        }

        for j in 0..hidden {
            // Gates order: i, f, g, o (each hidden-sized)
            let i_gate = sigmoid(gates[j]);
            let f_gate = sigmoid(gates[hidden + j]);
            let g_gate = gates[2 * hidden + j].tanh();
            let o_gate = sigmoid(gates[3 * hidden + j]);

            let idx = b * hidden + j;
            c_new[idx] = f_gate * c[idx] + i_gate * g_gate;
            h_new[idx] = o_gate * c_new[idx].tanh();
        }
    }

    (h_new, c_new)
}

#[inline]
fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Inline sigmoid for scalar values.
#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
