//! Two-layer feed-forward classifier.
//!
//! `input -> fc1 -> ReLU -> fc2 -> logits`. Inputs of any trailing shape are
//! flattened per sample, so image-shaped batches work directly.

use candle_core::{DType, Device, Tensor};
use candle_nn::{linear, Linear, Module, VarBuilder, VarMap};

use crate::config::FluidConfig;
use crate::error::FluidResult;

/// Simple feed-forward model used to demonstrate turbulence tracking.
pub struct SimpleFluidModel {
    fc1: Linear,
    fc2: Linear,
    input_dim: usize,
}

impl SimpleFluidModel {
    /// Build the model from a VarBuilder. Parameters are registered as
    /// `fc1.weight`, `fc1.bias`, `fc2.weight`, `fc2.bias`.
    pub fn new(config: &FluidConfig, vb: VarBuilder) -> FluidResult<Self> {
        let fc1 = linear(config.input_dim, config.hidden_dim, vb.pp("fc1"))?;
        let fc2 = linear(config.hidden_dim, config.output_dim, vb.pp("fc2"))?;
        Ok(Self {
            fc1,
            fc2,
            input_dim: config.input_dim,
        })
    }

    /// Create a model with fresh parameters stored in `var_map`.
    pub fn with_var_map(config: &FluidConfig, var_map: &VarMap, device: &Device) -> FluidResult<Self> {
        let vb = VarBuilder::from_varmap(var_map, DType::F32, device);
        Self::new(config, vb)
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Forward pass.
    /// Input: (batch, ...) with `input_dim` values per sample
    /// Output: (batch, output_dim) logits
    pub fn forward(&self, x: &Tensor) -> FluidResult<Tensor> {
        let batch = x.dim(0)?;
        let x = x.reshape((batch, ()))?;
        let x = self.fc1.forward(&x)?.relu()?;
        Ok(self.fc2.forward(&x)?)
    }
}
