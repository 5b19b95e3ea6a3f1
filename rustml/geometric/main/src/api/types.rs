//! Configuration and data types for geometric layers

use crate::api::error::{GeometricError, GeometricResult};
use rustml_core::Tensor;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// How zero-padded positions take part in the attention softmax.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaddingMode {
    /// Padding rows score 0 and receive `exp(0)/Σ` of the attention mass.
    #[default]
    Unmasked,
    /// Padding scores are set to `-inf` before the softmax, so padding gets zero weight.
    Masked,
}

/// Static configuration of a [`Set2Set`](crate::Set2Set) layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Set2SetConfig {
    /// Feature size of each set element.
    pub in_channels: usize,
    /// Number of attention rounds.
    pub processing_steps: usize,
    /// Stacked recurrent layers.
    #[serde(default = "default_num_layers")]
    pub num_layers: usize,
    #[serde(default)]
    pub padding: PaddingMode,
}

fn default_num_layers() -> usize {
    1
}

impl Set2SetConfig {
    pub fn new(in_channels: usize, processing_steps: usize) -> Self {
        Self {
            in_channels,
            processing_steps,
            num_layers: default_num_layers(),
            padding: PaddingMode::default(),
        }
    }

    pub fn with_num_layers(mut self, num_layers: usize) -> Self {
        self.num_layers = num_layers;
        self
    }

    pub fn with_padding(mut self, padding: PaddingMode) -> Self {
        self.padding = padding;
        self
    }

    /// Width of the pooled output, `2 * in_channels`.
    pub fn out_channels(&self) -> usize {
        2 * self.in_channels
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> GeometricResult<Self> {
        let config: Set2SetConfig =
            serde_json::from_str(json).map_err(|e| GeometricError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> GeometricResult<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config: Set2SetConfig =
            serde_json::from_reader(reader).map_err(|e| GeometricError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> GeometricResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| GeometricError::Config(e.to_string()))
    }

    pub fn validate(&self) -> GeometricResult<()> {
        if self.in_channels == 0 {
            return Err(GeometricError::InvalidConfig("in_channels must be > 0".into()));
        }
        if self.processing_steps == 0 {
            return Err(GeometricError::InvalidConfig("processing_steps must be > 0".into()));
        }
        if self.num_layers == 0 {
            return Err(GeometricError::InvalidConfig("num_layers must be > 0".into()));
        }
        Ok(())
    }
}

/// Variable-size sets laid out as a zero-padded dense tensor.
#[derive(Debug, Clone)]
pub struct PaddedBatch {
    /// `[num_sets, max_set_size, channels]`
    pub x: Tensor,
    /// Number of real elements in each set.
    pub counts: Vec<usize>,
}

impl PaddedBatch {
    pub fn num_sets(&self) -> usize {
        self.x.shape()[0]
    }

    pub fn max_set_size(&self) -> usize {
        self.x.shape()[1]
    }

    pub fn channels(&self) -> usize {
        self.x.shape()[2]
    }

    /// `[num_sets, max_set_size]` mask holding 1.0 at padding positions.
    pub fn padding_mask(&self) -> Tensor {
        let max_set_size = self.max_set_size();
        let counts = &self.counts;
        Tensor::from_fn([self.num_sets(), max_set_size], |i| {
            if i % max_set_size >= counts[i / max_set_size] { 1.0 } else { 0.0 }
        })
    }
}

/// Output of [`Set2Set::forward_with_attention`](crate::Set2Set::forward_with_attention).
#[derive(Debug, Clone)]
pub struct Set2SetTrace {
    /// `[num_sets, 2 * in_channels]`, identical to `forward`.
    pub output: Tensor,
    /// Attention weights of every step, each `[num_sets, max_set_size]`.
    pub attention: Vec<Tensor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_from_json() {
        let config = Set2SetConfig::from_json_str(r#"{"in_channels": 16, "processing_steps": 3}"#).unwrap();
        assert_eq!(config, Set2SetConfig::new(16, 3));
        assert_eq!(config.num_layers, 1);
        assert_eq!(config.padding, PaddingMode::Unmasked);
        assert_eq!(config.out_channels(), 32);
    }

    #[test]
    fn test_config_full_json() {
        let json = r#"{"in_channels": 4, "processing_steps": 2, "num_layers": 3, "padding": "masked"}"#;
        let config = Set2SetConfig::from_json_str(json).unwrap();
        assert_eq!(
            config,
            Set2SetConfig::new(4, 2).with_num_layers(3).with_padding(PaddingMode::Masked)
        );

        let back = Set2SetConfig::from_json_str(&config.to_json_string().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_config_rejects_bad_input() {
        assert!(matches!(
            Set2SetConfig::from_json_str(r#"{"in_channels": 4}"#),
            Err(GeometricError::Config(_))
        ));
        assert!(matches!(
            Set2SetConfig::from_json_str(r#"{"in_channels": 4, "processing_steps": 1, "padding": "zero"}"#),
            Err(GeometricError::Config(_))
        ));
        assert!(matches!(
            Set2SetConfig::from_json_str(r#"{"in_channels": 4, "processing_steps": 0}"#),
            Err(GeometricError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate() {
        assert!(Set2SetConfig::new(4, 1).validate().is_ok());
        assert!(Set2SetConfig::new(0, 1).validate().is_err());
        assert!(Set2SetConfig::new(4, 0).validate().is_err());
        assert!(Set2SetConfig::new(4, 1).with_num_layers(0).validate().is_err());
    }

    #[test]
    fn test_padding_mask() {
        let batch = PaddedBatch {
            x: Tensor::zeros([3, 3, 2]),
            counts: vec![3, 1, 0],
        };
        assert_eq!(batch.num_sets(), 3);
        assert_eq!(batch.max_set_size(), 3);
        assert_eq!(batch.channels(), 2);
        assert_eq!(
            batch.padding_mask().to_vec(),
            vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0]
        );
    }
}
