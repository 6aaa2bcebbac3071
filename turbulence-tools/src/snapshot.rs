//! Gradient snapshots captured at a single training step.
//!
//! A [`GradientSnapshot`] maps opaque parameter names (whatever the model
//! calls its variables) to owned, host-side [`GradientTensor`]s. Converting
//! from a candle [`Tensor`] always copies the data out of the device buffer,
//! so a snapshot never observes later in-place updates of the source.
//!
//! # Example
//!
//! ```rust
//! use turbulence_tools::{GradientSnapshot, GradientTensor};
//!
//! let mut snapshot = GradientSnapshot::new();
//! snapshot.insert("fc1.weight", GradientTensor::new(vec![2, 2], vec![1.0, 0.0, 0.0, 1.0]).unwrap());
//! snapshot.insert("fc1.bias", GradientTensor::from_slice(&[0.5, -0.5]));
//!
//! assert_eq!(snapshot.len(), 2);
//! assert_eq!(snapshot.names().next(), Some("fc1.bias"));
//! ```

use std::collections::BTreeMap;

use candle_core::{DType, Tensor};
use thiserror::Error;

/// Errors raised while building gradient tensors.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Shape mismatch: shape {shape:?} holds {expected} values, got {got}")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        got: usize,
    },

    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),
}

/// Result type for snapshot construction.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Dense gradient array of arbitrary rank, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientTensor {
    shape: Vec<usize>,
    values: Vec<f32>,
}

impl GradientTensor {
    /// Create a tensor from a shape and row-major values.
    ///
    /// A rank-0 (scalar) tensor has an empty shape and exactly one value.
    pub fn new(shape: Vec<usize>, values: Vec<f32>) -> SnapshotResult<Self> {
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(SnapshotError::ShapeMismatch {
                shape,
                expected,
                got: values.len(),
            });
        }
        Ok(Self { shape, values })
    }

    /// Create a 1-D tensor by copying a slice.
    pub fn from_slice(values: &[f32]) -> Self {
        Self {
            shape: vec![values.len()],
            values: values.to_vec(),
        }
    }

    /// Copy a candle tensor into host memory.
    ///
    /// The tensor is detached from any computation graph and cast to `f32`.
    pub fn from_tensor(tensor: &Tensor) -> SnapshotResult<Self> {
        let shape = tensor.dims().to_vec();
        let values: Vec<f32> = tensor
            .detach()
            .to_dtype(DType::F32)?
            .flatten_all()?
            .to_vec1()?;
        Self::new(shape, values)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Flattened, row-major view of the gradient values.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Euclidean norm of the flattened values, accumulated in `f64`.
    pub fn norm(&self) -> f64 {
        self.values
            .iter()
            .map(|&v| f64::from(v) * f64::from(v))
            .sum::<f64>()
            .sqrt()
    }

    /// `(rows, cols)` when the tensor is a matrix.
    pub fn dims2(&self) -> Option<(usize, usize)> {
        match self.shape.as_slice() {
            &[rows, cols] => Some((rows, cols)),
            _ => None,
        }
    }

    /// Element at `(row, col)` of a matrix.
    pub fn get2(&self, row: usize, col: usize) -> Option<f32> {
        let (rows, cols) = self.dims2()?;
        if row >= rows || col >= cols {
            return None;
        }
        self.values.get(row * cols + col).copied()
    }
}

/// All gradients available at one training step, keyed by parameter name.
///
/// Iteration is sorted by name, so rendering and comparison order is stable
/// across steps and runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradientSnapshot {
    gradients: BTreeMap<String, GradientTensor>,
}

impl GradientSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a gradient, returning the previous one stored under `name`.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        gradient: GradientTensor,
    ) -> Option<GradientTensor> {
        self.gradients.insert(name.into(), gradient)
    }

    /// Copy a named candle gradient into the snapshot.
    pub fn insert_tensor(&mut self, name: impl Into<String>, tensor: &Tensor) -> SnapshotResult<()> {
        self.insert(name, GradientTensor::from_tensor(tensor)?);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&GradientTensor> {
        self.gradients.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.gradients.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.gradients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gradients.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.gradients.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &GradientTensor)> {
        self.gradients.iter().map(|(name, grad)| (name.as_str(), grad))
    }

    /// Total number of gradient values across all parameters.
    pub fn num_values(&self) -> usize {
        self.gradients.values().map(GradientTensor::len).sum()
    }
}

impl<S: Into<String>> FromIterator<(S, GradientTensor)> for GradientSnapshot {
    fn from_iter<I: IntoIterator<Item = (S, GradientTensor)>>(iter: I) -> Self {
        Self {
            gradients: iter
                .into_iter()
                .map(|(name, grad)| (name.into(), grad))
                .collect(),
        }
    }
}
