//! Training loop instrumented with turbulence tracking.
//!
//! Each step runs forward, cross-entropy, backward, and an SGD update, then
//! copies every available gradient into a [`GradientSnapshot`] and records it
//! in the run's [`TurbulenceTracker`] before the next step can overwrite it.
//!
//! # Example
//!
//! ```no_run
//! use candle_core::Device;
//! use fluid_model_rs::{FluidConfig, FluidTrainer, SyntheticDataset};
//!
//! let config = FluidConfig::default();
//! let data = SyntheticDataset::generate(
//!     config.num_samples, config.input_dim, config.output_dim, config.seed,
//! ).unwrap();
//!
//! let mut trainer = FluidTrainer::new(config, Device::Cpu).unwrap();
//! trainer.train(&data).unwrap();
//! println!("{}", trainer.tracker().diagnose());
//! ```

use candle_core::backprop::GradStore;
use candle_core::Device;
use candle_nn::{loss, Optimizer, VarMap, SGD};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};
use turbulence_tools::{GradientSnapshot, TurbulenceTracker};

use crate::config::FluidConfig;
use crate::data::{FluidBatch, SyntheticDataset};
use crate::error::{FluidError, FluidResult};
use crate::model::SimpleFluidModel;

/// Per-epoch training summary.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochSummary {
    /// One-based epoch number
    pub epoch: usize,
    pub steps: usize,
    pub average_loss: f32,
    /// Mean of the turbulence scores recorded during this epoch
    pub mean_turbulence: Option<f64>,
}

/// Copy the gradient of every variable in `var_map` out of `grads`.
///
/// Variables without a gradient (unused or frozen) are left out of the
/// snapshot.
pub fn capture_gradients(var_map: &VarMap, grads: &GradStore) -> FluidResult<GradientSnapshot> {
    let data = var_map
        .data()
        .lock()
        .map_err(|_| FluidError::training("VarMap lock poisoned"))?;

    let mut snapshot = GradientSnapshot::new();
    for (name, var) in data.iter() {
        match grads.get(var.as_tensor()) {
            Some(grad) => snapshot.insert_tensor(name.clone(), grad)?,
            None => debug!(parameter = %name, "no gradient this step"),
        }
    }

    Ok(snapshot)
}

/// Trainer for [`SimpleFluidModel`] that records loss and gradient turbulence.
pub struct FluidTrainer {
    config: FluidConfig,
    device: Device,
    var_map: VarMap,
    model: SimpleFluidModel,
    optimizer: SGD,
    tracker: TurbulenceTracker,
    rng: StdRng,
}

impl FluidTrainer {
    /// Build the model and optimizer for a validated configuration.
    pub fn new(config: FluidConfig, device: Device) -> FluidResult<Self> {
        config.validate()?;

        let var_map = VarMap::new();
        let model = SimpleFluidModel::with_var_map(&config, &var_map, &device)?;
        let optimizer = SGD::new(var_map.all_vars(), config.learning_rate)?;
        let rng = StdRng::seed_from_u64(config.seed.wrapping_add(1));

        info!(
            input_dim = config.input_dim,
            hidden_dim = config.hidden_dim,
            output_dim = config.output_dim,
            learning_rate = config.learning_rate,
            "created fluid trainer"
        );

        Ok(Self {
            config,
            device,
            var_map,
            model,
            optimizer,
            tracker: TurbulenceTracker::new(),
            rng,
        })
    }

    pub fn config(&self) -> &FluidConfig {
        &self.config
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn model(&self) -> &SimpleFluidModel {
        &self.model
    }

    pub fn var_map(&self) -> &VarMap {
        &self.var_map
    }

    pub fn tracker(&self) -> &TurbulenceTracker {
        &self.tracker
    }

    /// Hand over the tracker once training is done.
    pub fn into_tracker(self) -> TurbulenceTracker {
        self.tracker
    }

    /// Single training step: forward, backward, optimizer step, then record
    /// loss and gradients. Returns the batch loss.
    pub fn train_step(&mut self, batch: &FluidBatch) -> FluidResult<f32> {
        let logits = self.model.forward(&batch.features)?;
        let loss = loss::cross_entropy(&logits, &batch.labels)?;

        let grads = loss.backward()?;
        self.optimizer.step(&grads)?;

        let loss_value = loss.to_scalar::<f32>()?;
        let snapshot = capture_gradients(&self.var_map, &grads)?;
        let record = self.tracker.record_step(snapshot, loss_value);

        debug!(
            step = record.step,
            loss = loss_value,
            turbulence = record.turbulence.map(|t| t.score),
            "train step"
        );
        Ok(loss_value)
    }

    /// Run one pass over `dataset`.
    pub fn train_epoch(&mut self, dataset: &SyntheticDataset, epoch: usize) -> FluidResult<EpochSummary> {
        if dataset.input_dim() != self.config.input_dim {
            return Err(FluidError::data(format!(
                "dataset has {} features per sample, model expects {}",
                dataset.input_dim(),
                self.config.input_dim
            )));
        }

        let rng = if self.config.shuffle {
            Some(&mut self.rng)
        } else {
            None
        };
        let batches = dataset.batches(self.config.batch_size, rng, &self.device)?;

        let turbulence_before = self.tracker.turbulence_history().len();
        let mut epoch_loss = 0.0f32;
        for batch in &batches {
            epoch_loss += self.train_step(batch)?;
        }

        let steps = batches.len();
        let average_loss = if steps == 0 {
            0.0
        } else {
            epoch_loss / steps as f32
        };
        let epoch_scores = &self.tracker.turbulence_history()[turbulence_before..];
        let mean_turbulence = (!epoch_scores.is_empty())
            .then(|| epoch_scores.iter().sum::<f64>() / epoch_scores.len() as f64);

        info!("[Epoch {}] Average Loss: {:.4}", epoch + 1, average_loss);

        Ok(EpochSummary {
            epoch: epoch + 1,
            steps,
            average_loss,
            mean_turbulence,
        })
    }

    /// Train for `epochs` passes over `dataset`.
    pub fn train_loop(
        &mut self,
        dataset: &SyntheticDataset,
        epochs: usize,
    ) -> FluidResult<Vec<EpochSummary>> {
        (0..epochs)
            .map(|epoch| self.train_epoch(dataset, epoch))
            .collect()
    }

    /// Train for the configured number of epochs.
    pub fn train(&mut self, dataset: &SyntheticDataset) -> FluidResult<Vec<EpochSummary>> {
        self.train_loop(dataset, self.config.epochs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_config() -> FluidConfig {
        FluidConfig {
            input_dim: 8,
            hidden_dim: 6,
            output_dim: 3,
            batch_size: 4,
            epochs: 1,
            num_samples: 12,
            learning_rate: 0.1,
            ..FluidConfig::default()
        }
    }

    fn tiny_data(config: &FluidConfig) -> SyntheticDataset {
        SyntheticDataset::generate(config.num_samples, config.input_dim, config.output_dim, 5)
            .unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = FluidConfig {
            hidden_dim: 0,
            ..tiny_config()
        };
        assert!(FluidTrainer::new(config, Device::Cpu).is_err());
    }

    #[test]
    fn test_train_step_records_all_parameters() {
        let config = tiny_config();
        let data = tiny_data(&config);
        let mut trainer = FluidTrainer::new(config.clone(), Device::Cpu).unwrap();

        let batches = data.batches(config.batch_size, None, &Device::Cpu).unwrap();
        let loss = trainer.train_step(&batches[0]).unwrap();

        assert!(loss.is_finite());
        let tracker = trainer.tracker();
        assert_eq!(tracker.loss_history(), &[loss]);
        let snapshot = tracker.latest_snapshot().unwrap();
        let names: Vec<&str> = snapshot.names().collect();
        assert_eq!(names, vec!["fc1.bias", "fc1.weight", "fc2.bias", "fc2.weight"]);
        assert_eq!(snapshot.get("fc1.weight").unwrap().shape(), &[6, 8]);
        assert!(tracker.turbulence_history().is_empty());
    }

    #[test]
    fn test_epoch_summary() {
        let config = tiny_config();
        let data = tiny_data(&config);
        let mut trainer = FluidTrainer::new(config, Device::Cpu).unwrap();

        let summaries = trainer.train(&data).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].epoch, 1);
        assert_eq!(summaries[0].steps, 3);
        assert!(summaries[0].average_loss > 0.0);
        assert!(summaries[0].mean_turbulence.is_some());
        assert_eq!(trainer.tracker().turbulence_history().len(), 2);
    }

    #[test]
    fn test_dataset_dim_mismatch() {
        let config = tiny_config();
        let data = SyntheticDataset::generate(4, 5, 3, 0).unwrap();
        let mut trainer = FluidTrainer::new(config, Device::Cpu).unwrap();
        assert!(matches!(
            trainer.train_epoch(&data, 0),
            Err(FluidError::Data(_))
        ));
    }

    #[test]
    fn test_snapshot_is_taken_before_next_update() {
        let config = tiny_config();
        let data = tiny_data(&config);
        let mut trainer = FluidTrainer::new(config.clone(), Device::Cpu).unwrap();
        let batches = data.batches(config.batch_size, None, &Device::Cpu).unwrap();

        trainer.train_step(&batches[0]).unwrap();
        let first = trainer.tracker().gradient_history()[0].clone();
        trainer.train_step(&batches[1]).unwrap();
        trainer.train_step(&batches[2]).unwrap();

        assert_eq!(trainer.tracker().gradient_history()[0], first);
    }
}
