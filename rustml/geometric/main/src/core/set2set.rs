use crate::api::error::{GeometricError, GeometricResult};
use crate::api::types::{PaddingMode, Set2SetConfig, Set2SetTrace};
use crate::core::batch::to_batch;
use rand::RngCore;
use rustml_core::Tensor;
use rustml_nn::{LSTM, RecurrentState, RecurrentUpdate};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Instant;

/// Name prefix of the recurrent parameters in a state dict.
pub(crate) const RECURRENT_PREFIX: &str = "lstm.";

/// Set2Set global pooling.
///
/// Reduces each set of `in_channels`-dimensional elements to one vector of size
/// `2 * in_channels` by running `processing_steps` rounds of content-based attention
/// driven by a recurrent query:
///
/// ```text
/// q_t   = LSTM(q*_{t-1})
/// a_ij  = softmax_j(x_ij · q_i)
/// r_i   = Σ_j a_ij x_ij
/// q*_t  = q_t ‖ r_t
/// ```
///
/// The recurrent state starts at zero on every call, so `forward` reads the parameters
/// only and can run concurrently on a shared instance.
pub struct Set2Set<R: RecurrentUpdate = LSTM> {
    config: Set2SetConfig,
    lstm: R,
}

impl Set2Set<LSTM> {
    /// Build a layer with LSTM weights drawn from the thread RNG.
    pub fn new(config: Set2SetConfig) -> GeometricResult<Self> {
        Self::with_rng(config, &mut rand::thread_rng())
    }

    /// Build a layer with LSTM weights drawn from `rng`.
    pub fn with_rng(config: Set2SetConfig, rng: &mut dyn RngCore) -> GeometricResult<Self> {
        config.validate()?;
        let lstm = LSTM::with_rng(config.out_channels(), config.in_channels, config.num_layers, rng)?;
        Ok(Self { config, lstm })
    }
}

impl<R: RecurrentUpdate> Set2Set<R> {
    /// Build a layer around an existing recurrent update.
    ///
    /// The update must map `2 * in_channels` inputs to `in_channels` hidden units with
    /// `num_layers` layers.
    pub fn with_recurrent(config: Set2SetConfig, lstm: R) -> GeometricResult<Self> {
        config.validate()?;
        let expected = (config.out_channels(), config.in_channels, config.num_layers);
        let got = (lstm.input_size(), lstm.hidden_size(), lstm.num_layers());
        if expected != got {
            return Err(GeometricError::InvalidConfig(format!(
                "recurrent update (input, hidden, layers) must be {:?}, got {:?}",
                expected, got
            )));
        }
        Ok(Self { config, lstm })
    }

    pub fn config(&self) -> &Set2SetConfig {
        &self.config
    }

    pub fn in_channels(&self) -> usize {
        self.config.in_channels
    }

    pub fn out_channels(&self) -> usize {
        self.config.out_channels()
    }

    pub fn processing_steps(&self) -> usize {
        self.config.processing_steps
    }

    pub fn num_layers(&self) -> usize {
        self.config.num_layers
    }

    pub fn padding(&self) -> PaddingMode {
        self.config.padding
    }

    pub fn recurrent(&self) -> &R {
        &self.lstm
    }

    /// Re-initialize the recurrent weights from the thread RNG.
    pub fn reset_parameters(&mut self) {
        self.reset_parameters_with_rng(&mut rand::thread_rng());
    }

    pub fn reset_parameters_with_rng(&mut self, rng: &mut dyn RngCore) {
        self.lstm.reset_parameters(rng);
    }

    pub fn parameter_count(&self) -> usize {
        self.lstm.parameter_count()
    }

    /// Pool `x` (`[N, in_channels]`) into `[num_sets, 2 * in_channels]`.
    ///
    /// `batch[i]` is the set-id of row `i`; row `s` of the output belongs to set `s`.
    pub fn forward(&self, x: &Tensor, batch: &[usize]) -> GeometricResult<Tensor> {
        self.run(x, batch, None)
    }

    /// Like [`forward`](Self::forward), also returning the attention weights of each step.
    pub fn forward_with_attention(&self, x: &Tensor, batch: &[usize]) -> GeometricResult<Set2SetTrace> {
        let mut attention = Vec::with_capacity(self.config.processing_steps);
        let output = self.run(x, batch, Some(&mut attention))?;
        Ok(Set2SetTrace { output, attention })
    }

    fn run(
        &self,
        x: &Tensor,
        batch: &[usize],
        mut attention: Option<&mut Vec<Tensor>>,
    ) -> GeometricResult<Tensor> {
        let channels = self.config.in_channels;
        if x.ndim() != 2 || x.shape()[1] != channels {
            return Err(GeometricError::ShapeMismatch(format!(
                "Set2Set input must be [N, {}], got {:?}",
                channels,
                x.shape()
            )));
        }

        let _t = if log::log_enabled!(log::Level::Debug) { Some(Instant::now()) } else { None };

        let padded = to_batch(x, batch)?;
        let num_sets = padded.num_sets();
        let max_set_size = padded.max_set_size();
        let mask = match self.config.padding {
            PaddingMode::Masked => Some(padded.padding_mask()),
            PaddingMode::Unmasked => None,
        };
        let xs = &padded.x;

        let mut state = RecurrentState::zeros(self.config.num_layers, num_sets, channels);
        let mut q_star = Tensor::zeros([1, num_sets, 2 * channels]);

        for step in 0..self.config.processing_steps {
            let (q, next) = self.lstm.step(&q_star, &state)?;
            state = next;
            let q = q.reshape([num_sets, 1, channels])?;

            // Dot-product score of every element against its set's query: [num_sets, max_set_size]
            let mut e = xs.mul(&q)?.sum(-1)?;
            if let Some(mask) = &mask {
                e = e.masked_fill(mask, f32::NEG_INFINITY)?;
            }
            let a = e.softmax(-1)?;

            // Attention-weighted readout: [num_sets, 1, channels]
            let r = a.reshape([num_sets, max_set_size, 1])?.mul(xs)?.sum_keepdim(1)?;
            q_star = Tensor::cat(&[&q, &r], -1)?.reshape([1, num_sets, 2 * channels])?;

            log::trace!("set2set step {}/{}: q*={:?}", step + 1, self.config.processing_steps, q_star);

            if let Some(attention) = attention.as_mut() {
                attention.push(a);
            }
        }

        let output = q_star.reshape([num_sets, 2 * channels])?;

        if let Some(t) = _t {
            log::debug!(
                "[perf] set2set::forward n={} sets={} max_set_size={} steps={} {:.3}ms",
                batch.len(),
                num_sets,
                max_set_size,
                self.config.processing_steps,
                t.elapsed().as_secs_f64() * 1000.0
            );
        }

        Ok(output)
    }

    /// Parameters keyed by their checkpoint names (`lstm.weight_ih_l0`, ...).
    pub fn state_dict(&self) -> HashMap<String, Tensor> {
        self.named_parameters().into_iter().collect()
    }

    /// Parameters in a stable order with their checkpoint names.
    pub(crate) fn named_parameters(&self) -> Vec<(String, Tensor)> {
        self.lstm
            .named_parameters()
            .into_iter()
            .map(|(name, t)| (format!("{RECURRENT_PREFIX}{name}"), t.clone()))
            .collect()
    }

    /// Replace every parameter from `state`. Names and shapes must match exactly; on any
    /// error the layer is left unchanged.
    pub fn load_state_dict(&mut self, state: &HashMap<String, Tensor>) -> GeometricResult<()> {
        let known: HashSet<String> = self.lstm.named_parameters().into_iter().map(|(n, _)| n).collect();
        let mut inner = HashMap::with_capacity(state.len());
        for (name, tensor) in state {
            let key = name
                .strip_prefix(RECURRENT_PREFIX)
                .filter(|key| known.contains(*key))
                .ok_or_else(|| GeometricError::Checkpoint(format!("unexpected parameter: {}", name)))?;
            inner.insert(key.to_string(), tensor.clone());
        }
        self.lstm.load_named_parameters(&inner)?;
        Ok(())
    }
}

impl<R: RecurrentUpdate> fmt::Display for Set2Set<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Set2Set({}, {})", self.in_channels(), self.out_channels())
    }
}

impl<R: RecurrentUpdate> fmt::Debug for Set2Set<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Set2Set")
            .field("config", &self.config)
            .field("parameters", &self.parameter_count())
            .finish()
    }
}
