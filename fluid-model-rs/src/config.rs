//! Run configuration for the fluid model demo.
//!
//! Covers the model dimensions, optimizer, synthetic data, and where the
//! chart artifacts go. The turbulence metric itself has no knobs.
//!
//! # Example
//!
//! ```rust
//! use fluid_model_rs::FluidConfig;
//!
//! let config = FluidConfig::default();
//! assert_eq!(config.input_dim, 784);
//! config.validate().unwrap();
//!
//! // Loading from file
//! // let config = FluidConfig::from_file("fluid.toml")?;
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FluidError, FluidResult};

/// Configuration for a training run.
///
/// | Parameter | Default |
/// |-----------|---------|
/// | `input_dim` | 784 |
/// | `hidden_dim` | 128 |
/// | `output_dim` | 10 |
/// | `learning_rate` | 0.01 |
/// | `batch_size` | 64 |
/// | `epochs` | 2 |
/// | `num_samples` | 2000 |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluidConfig {
    /// Flattened input features per sample
    #[serde(default = "default_input_dim")]
    pub input_dim: usize,

    /// Width of the hidden layer
    #[serde(default = "default_hidden_dim")]
    pub hidden_dim: usize,

    /// Number of output classes
    #[serde(default = "default_output_dim")]
    pub output_dim: usize,

    /// SGD learning rate
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    /// Samples per mini-batch; the last batch of an epoch may be shorter
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_epochs")]
    pub epochs: usize,

    /// Size of the synthetic dataset
    #[serde(default = "default_num_samples")]
    pub num_samples: usize,

    /// Seed for data generation and shuffling
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Reshuffle batches every epoch
    #[serde(default = "default_shuffle")]
    pub shuffle: bool,

    /// Directory receiving the SVG artifacts
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Frame delay for the live view
    #[serde(default = "default_animation_interval_ms")]
    pub animation_interval_ms: u64,
}

fn default_input_dim() -> usize {
    784
}

fn default_hidden_dim() -> usize {
    128
}

fn default_output_dim() -> usize {
    10
}

fn default_learning_rate() -> f64 {
    0.01
}

fn default_batch_size() -> usize {
    64
}

fn default_epochs() -> usize {
    2
}

fn default_num_samples() -> usize {
    2000
}

fn default_seed() -> u64 {
    42
}

fn default_shuffle() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_animation_interval_ms() -> u64 {
    500
}

impl Default for FluidConfig {
    fn default() -> Self {
        Self {
            input_dim: default_input_dim(),
            hidden_dim: default_hidden_dim(),
            output_dim: default_output_dim(),
            learning_rate: default_learning_rate(),
            batch_size: default_batch_size(),
            epochs: default_epochs(),
            num_samples: default_num_samples(),
            seed: default_seed(),
            shuffle: default_shuffle(),
            output_dir: default_output_dir(),
            animation_interval_ms: default_animation_interval_ms(),
        }
    }
}

impl FluidConfig {
    /// Load a configuration from a TOML file.
    ///
    /// Missing keys fall back to their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> FluidResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&content)
            .map_err(|e| FluidError::invalid_config(format!("Failed to parse config: {e}")))
    }

    /// Save the configuration as TOML.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> FluidResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FluidError::invalid_config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Reject configurations that cannot produce a training run.
    pub fn validate(&self) -> FluidResult<()> {
        let dims = [
            ("input_dim", self.input_dim),
            ("hidden_dim", self.hidden_dim),
            ("output_dim", self.output_dim),
            ("batch_size", self.batch_size),
            ("epochs", self.epochs),
            ("num_samples", self.num_samples),
        ];
        for (name, value) in dims {
            if value == 0 {
                return Err(FluidError::invalid_config(format!("{name} must be > 0")));
            }
        }

        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(FluidError::invalid_config(format!(
                "learning_rate must be positive and finite, got {}",
                self.learning_rate
            )));
        }

        Ok(())
    }

    /// Number of optimizer steps per epoch.
    pub fn steps_per_epoch(&self) -> usize {
        self.num_samples.div_ceil(self.batch_size.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = FluidConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.steps_per_epoch(), 32); // ceil(2000 / 64)
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        let config = FluidConfig {
            batch_size: 0,
            ..FluidConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn test_rejects_bad_learning_rate() {
        for lr in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            let config = FluidConfig {
                learning_rate: lr,
                ..FluidConfig::default()
            };
            assert!(config.validate().is_err(), "accepted lr = {}", lr);
        }
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: FluidConfig = toml::from_str("epochs = 5\nhidden_dim = 32\n").unwrap();
        assert_eq!(config.epochs, 5);
        assert_eq!(config.hidden_dim, 32);
        assert_eq!(config.input_dim, 784);
        assert_eq!(config.learning_rate, 0.01);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fluid.toml");

        let config = FluidConfig {
            seed: 7,
            output_dir: PathBuf::from("artifacts"),
            ..FluidConfig::default()
        };
        config.to_file(&path).unwrap();

        assert_eq!(FluidConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = FluidConfig::from_file("/nonexistent/fluid.toml").unwrap_err();
        assert!(matches!(err, FluidError::Io(_)));
    }
}
