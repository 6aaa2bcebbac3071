//! Small feed-forward classifier trained with gradient turbulence tracking.
//!
//! This crate wires a two-layer MLP, a synthetic classification dataset, and
//! an SGD training loop to [`turbulence_tools::TurbulenceTracker`], so every
//! optimizer step records its loss and gradient snapshot:
//! - `config`: TOML-backed run configuration
//! - `data`: seeded synthetic dataset and mini-batching
//! - `model`: `fc1 -> relu -> fc2`
//! - `trainer`: the instrumented training loop
//!
//! # Example
//!
//! ```no_run
//! use candle_core::Device;
//! use fluid_model_rs::{FluidConfig, FluidTrainer, SyntheticDataset};
//!
//! let config = FluidConfig {
//!     epochs: 1,
//!     ..FluidConfig::default()
//! };
//! let data = SyntheticDataset::generate(
//!     config.num_samples, config.input_dim, config.output_dim, config.seed,
//! ).unwrap();
//!
//! let mut trainer = FluidTrainer::new(config, Device::Cpu).unwrap();
//! trainer.train(&data).unwrap();
//! println!("[Turbulence Diagnosis] {}", trainer.tracker().diagnose());
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod trainer;

pub use config::FluidConfig;
pub use data::{FluidBatch, SyntheticDataset};
pub use error::{FluidError, FluidResult};
pub use model::SimpleFluidModel;
pub use trainer::{capture_gradients, EpochSummary, FluidTrainer};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::FluidConfig;
    pub use crate::data::{FluidBatch, SyntheticDataset};
    pub use crate::error::{FluidError, FluidResult};
    pub use crate::model::SimpleFluidModel;
    pub use crate::trainer::{EpochSummary, FluidTrainer};
    pub use turbulence_tools::{Diagnosis, TurbulenceTracker};
}
