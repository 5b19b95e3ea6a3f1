//! safetensors checkpoints for Set2Set.
//!
//! Parameters are stored as F32 tensors under their state-dict names. The layer
//! config is kept as JSON in the file metadata so a checkpoint can rebuild the
//! layer on its own.

use crate::api::error::{GeometricError, GeometricResult};
use crate::api::types::Set2SetConfig;
use crate::core::set2set::Set2Set;
use rand::rngs::mock::StepRng;
use rustml_core::Tensor;
use rustml_nn::{LSTM, RecurrentUpdate};
use safetensors::tensor::TensorView;
use safetensors::{Dtype, SafeTensors};
use std::collections::HashMap;
use std::path::Path;

/// Metadata key holding the serialized [`Set2SetConfig`].
pub const CONFIG_METADATA_KEY: &str = "set2set.config";

impl<R: RecurrentUpdate> Set2Set<R> {
    /// Write parameters and config to a safetensors file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> GeometricResult<()> {
        let params = self.named_parameters();
        let views = params
            .iter()
            .map(|(name, t)| {
                TensorView::new(Dtype::F32, t.shape().to_vec(), t.as_bytes())
                    .map(|view| (name.as_str(), view))
                    .map_err(|e| GeometricError::Checkpoint(e.to_string()))
            })
            .collect::<GeometricResult<Vec<_>>>()?;

        let metadata = HashMap::from([(CONFIG_METADATA_KEY.to_string(), self.config().to_json_string()?)]);
        safetensors::serialize_to_file(views, &Some(metadata), path.as_ref())
            .map_err(|e| GeometricError::Checkpoint(e.to_string()))?;

        log::debug!("saved {} parameters to {}", params.len(), path.as_ref().display());
        Ok(())
    }

    /// Replace the parameters from a safetensors file written by [`save`](Self::save).
    pub fn load_weights<P: AsRef<Path>>(&mut self, path: P) -> GeometricResult<()> {
        let (_, tensors) = read_checkpoint(path.as_ref())?;
        self.load_state_dict(&tensors)
    }
}

impl Set2Set<LSTM> {
    /// Rebuild a layer from a checkpoint written by [`save`](Self::save).
    pub fn load<P: AsRef<Path>>(path: P) -> GeometricResult<Self> {
        let (config, tensors) = read_checkpoint(path.as_ref())?;
        let config = config.ok_or_else(|| {
            GeometricError::Checkpoint(format!("missing '{}' metadata", CONFIG_METADATA_KEY))
        })?;
        // Initial weights are overwritten by the load below
        let mut layer = Self::with_rng(config, &mut StepRng::new(0, 0))?;
        layer.load_state_dict(&tensors)?;
        Ok(layer)
    }
}

fn read_checkpoint(path: &Path) -> GeometricResult<(Option<Set2SetConfig>, HashMap<String, Tensor>)> {
    let bytes = std::fs::read(path)?;

    let (_, metadata) =
        SafeTensors::read_metadata(&bytes).map_err(|e| GeometricError::Checkpoint(e.to_string()))?;
    let config = metadata
        .metadata()
        .as_ref()
        .and_then(|m| m.get(CONFIG_METADATA_KEY))
        .map(|json| Set2SetConfig::from_json_str(json))
        .transpose()?;

    let st = SafeTensors::deserialize(&bytes).map_err(|e| GeometricError::Checkpoint(e.to_string()))?;
    let mut tensors = HashMap::new();
    for (name, view) in st.tensors() {
        if view.dtype() != Dtype::F32 {
            return Err(GeometricError::Checkpoint(format!(
                "{}: unsupported dtype {:?}",
                name,
                view.dtype()
            )));
        }
        let tensor = Tensor::from_bytes(view.data(), view.shape().to_vec())?;
        tensors.insert(name, tensor);
    }

    log::debug!("read {} tensors from {}", tensors.len(), path.display());
    Ok((config, tensors))
}
