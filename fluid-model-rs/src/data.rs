//! Synthetic classification data.
//!
//! Standard-normal feature rows with uniform integer labels. There is no
//! signal to learn; the point is to drive a realistic optimization loop.

use candle_core::{Device, Tensor};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::error::{FluidError, FluidResult};

/// One mini-batch: `features` is (batch, input_dim) f32, `labels` is (batch,) u32.
#[derive(Debug, Clone)]
pub struct FluidBatch {
    pub features: Tensor,
    pub labels: Tensor,
}

impl FluidBatch {
    pub fn batch_size(&self) -> usize {
        self.labels.dims().first().copied().unwrap_or(0)
    }
}

/// In-memory dataset of random features and labels.
#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    features: Vec<f32>,
    labels: Vec<u32>,
    input_dim: usize,
}

impl SyntheticDataset {
    /// Generate `num_samples` rows of `input_dim` features with labels in `[0, num_classes)`.
    pub fn generate(
        num_samples: usize,
        input_dim: usize,
        num_classes: usize,
        seed: u64,
    ) -> FluidResult<Self> {
        if num_classes == 0 || input_dim == 0 {
            return Err(FluidError::data(
                "input_dim and num_classes must be positive",
            ));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let features = (0..num_samples * input_dim)
            .map(|_| rng.sample::<f32, _>(StandardNormal))
            .collect();
        let labels = (0..num_samples)
            .map(|_| rng.gen_range(0..num_classes as u32))
            .collect();

        Ok(Self {
            features,
            labels,
            input_dim,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Number of batches per pass, counting a trailing partial batch.
    pub fn num_batches(&self, batch_size: usize) -> usize {
        self.len().div_ceil(batch_size.max(1))
    }

    /// Split the dataset into mini-batches on `device`.
    ///
    /// With `rng` the sample order is shuffled first; otherwise batches follow
    /// storage order.
    pub fn batches(
        &self,
        batch_size: usize,
        rng: Option<&mut StdRng>,
        device: &Device,
    ) -> FluidResult<Vec<FluidBatch>> {
        if batch_size == 0 {
            return Err(FluidError::data("batch_size must be positive"));
        }

        let mut order: Vec<usize> = (0..self.len()).collect();
        if let Some(rng) = rng {
            order.shuffle(rng);
        }

        order
            .chunks(batch_size)
            .map(|indices| self.gather(indices, device))
            .collect()
    }

    fn gather(&self, indices: &[usize], device: &Device) -> FluidResult<FluidBatch> {
        let mut features = Vec::with_capacity(indices.len() * self.input_dim);
        let mut labels = Vec::with_capacity(indices.len());
        for &i in indices {
            features.extend_from_slice(&self.features[i * self.input_dim..(i + 1) * self.input_dim]);
            labels.push(self.labels[i]);
        }

        Ok(FluidBatch {
            features: Tensor::from_vec(features, (indices.len(), self.input_dim), device)?,
            labels: Tensor::from_vec(labels, indices.len(), device)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_deterministic() {
        let a = SyntheticDataset::generate(10, 4, 3, 1).unwrap();
        let b = SyntheticDataset::generate(10, 4, 3, 1).unwrap();
        assert_eq!(a.features, b.features);
        assert_eq!(a.labels, b.labels);
        assert!(a.labels.iter().all(|&l| l < 3));
    }

    #[test]
    fn test_batches_cover_dataset() {
        let data = SyntheticDataset::generate(10, 4, 3, 1).unwrap();
        let batches = data.batches(4, None, &Device::Cpu).unwrap();

        assert_eq!(batches.len(), 3);
        assert_eq!(data.num_batches(4), 3);
        assert_eq!(batches[0].features.dims(), &[4, 4]);
        assert_eq!(batches[2].batch_size(), 2);
    }

    #[test]
    fn test_shuffled_batches_keep_all_labels() {
        let data = SyntheticDataset::generate(32, 2, 5, 9).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let batches = data.batches(8, Some(&mut rng), &Device::Cpu).unwrap();

        let mut seen: Vec<u32> = batches
            .iter()
            .flat_map(|b| b.labels.to_vec1::<u32>().unwrap())
            .collect();
        let mut expected = data.labels.clone();
        seen.sort_unstable();
        expected.sort_unstable();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let data = SyntheticDataset::generate(4, 2, 2, 0).unwrap();
        assert!(data.batches(0, None, &Device::Cpu).is_err());
    }
}
