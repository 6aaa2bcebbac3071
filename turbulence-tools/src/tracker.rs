//! Gradient turbulence tracking
//!
//! Measures how much the *direction* of each parameter's gradient changes
//! between consecutive optimization steps:
//! - Cosine similarity between the current and previous flattened gradient
//! - Angle (radians, in `[0, π]`) from the clamped cosine
//! - Turbulence score = mean angle over all comparable parameters
//!
//! Large, erratic direction changes correlate with oscillating or diverging
//! optimization independently of gradient magnitude.
//!
//! # Example
//!
//! ```rust
//! use turbulence_tools::{GradientSnapshot, GradientTensor, TurbulenceTracker};
//!
//! let mut tracker = TurbulenceTracker::new();
//!
//! for grad in [[1.0, 0.0], [1.0, 0.0], [0.0, 1.0]] {
//!     let snapshot: GradientSnapshot =
//!         std::iter::once(("w", GradientTensor::from_slice(&grad))).collect();
//!     tracker.record_step(snapshot, 0.5);
//! }
//!
//! let history = tracker.turbulence_history();
//! assert_eq!(history.len(), 2);
//! assert!((history[1] - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
//! ```

use tracing::debug;

use crate::diagnosis::{diagnose, Diagnosis};
use crate::snapshot::GradientSnapshot;

/// Gradients whose norm does not exceed this are treated as directionless.
pub const NORM_EPSILON: f64 = 1e-12;

/// Outcome of comparing two consecutive gradient snapshots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurbulenceStep {
    /// Mean angle in radians over the compared parameters (0.0 if none)
    pub score: f64,
    /// Parameters that contributed an angle
    pub compared: usize,
    /// Parameters skipped because either gradient norm was near zero
    pub skipped_degenerate: usize,
    /// Parameters present in only one snapshot, or reshaped between steps
    pub skipped_unmatched: usize,
}

impl TurbulenceStep {
    /// Whether any parameter pair actually contributed to the score.
    ///
    /// A score of 0.0 with `compared == 0` means "nothing to compare", not
    /// "perfectly aligned gradients".
    pub fn is_informative(&self) -> bool {
        self.compared > 0
    }
}

/// What a single [`TurbulenceTracker::record_step`] call appended.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    /// Zero-based index of the step in the loss history
    pub step: usize,
    pub loss: f32,
    /// False when the step carried no gradients
    pub snapshot_recorded: bool,
    /// Present once at least two snapshots exist
    pub turbulence: Option<TurbulenceStep>,
}

/// Angle in radians between two equally sized vectors.
///
/// Returns `None` when either vector has a norm at or below [`NORM_EPSILON`].
/// The cosine is clamped to `[-1, 1]` before `acos`, so floating point
/// overshoot cannot produce NaN. Non-finite inputs are not filtered.
pub fn angle_between(a: &[f32], b: &[f32]) -> Option<f64> {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let (norm_a, norm_b) = (norm_a.sqrt(), norm_b.sqrt());

    // Written as a negated `>` so a NaN norm is also skipped.
    if !(norm_a > NORM_EPSILON && norm_b > NORM_EPSILON) {
        return None;
    }

    let cosine = (dot / (norm_a * norm_b)).clamp(-1.0, 1.0);
    Some(cosine.acos())
}

/// Compare two snapshots parameter by parameter.
///
/// Only names present in both snapshots with the same number of values are
/// compared.
pub fn compute_turbulence(curr: &GradientSnapshot, prev: &GradientSnapshot) -> TurbulenceStep {
    let mut angles = Vec::with_capacity(curr.len());
    let mut skipped_degenerate = 0;
    let mut skipped_unmatched = 0;

    for (name, c) in curr.iter() {
        let p = match prev.get(name) {
            Some(p) if p.len() == c.len() => p,
            _ => {
                skipped_unmatched += 1;
                continue;
            }
        };

        match angle_between(c.values(), p.values()) {
            Some(angle) => angles.push(angle),
            None => skipped_degenerate += 1,
        }
    }

    skipped_unmatched += prev.names().filter(|name| !curr.contains(name)).count();

    let score = if angles.is_empty() {
        0.0
    } else {
        angles.iter().sum::<f64>() / angles.len() as f64
    };

    TurbulenceStep {
        score,
        compared: angles.len(),
        skipped_degenerate,
        skipped_unmatched,
    }
}

/// Accumulates per-step loss and gradient snapshots for one training run.
///
/// Histories only grow; the tracker is meant to live exactly as long as the
/// run it observes. `turbulence_history().len()` is always
/// `gradient_history().len().saturating_sub(1)`.
#[derive(Debug, Default)]
pub struct TurbulenceTracker {
    loss_history: Vec<f32>,
    gradient_history: Vec<GradientSnapshot>,
    turbulence_history: Vec<f64>,
    turbulence_steps: Vec<TurbulenceStep>,
}

impl TurbulenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one training step.
    ///
    /// The loss is always appended. An empty snapshot (no parameter had a
    /// gradient) is dropped without touching the gradient or turbulence
    /// histories. Otherwise the snapshot is stored, and once two exist the
    /// turbulence between the last two is appended.
    pub fn record_step(&mut self, gradients: GradientSnapshot, loss: f32) -> StepRecord {
        let step = self.loss_history.len();
        self.loss_history.push(loss);

        if gradients.is_empty() {
            debug!(step, loss, "no gradients this step");
            return StepRecord {
                step,
                loss,
                snapshot_recorded: false,
                turbulence: None,
            };
        }

        self.gradient_history.push(gradients);

        let turbulence = match self.gradient_history.as_slice() {
            [.., prev, curr] => {
                let result = compute_turbulence(curr, prev);
                self.turbulence_history.push(result.score);
                self.turbulence_steps.push(result);
                debug!(
                    step,
                    loss,
                    turbulence = result.score,
                    compared = result.compared,
                    skipped_degenerate = result.skipped_degenerate,
                    skipped_unmatched = result.skipped_unmatched,
                    "recorded step"
                );
                Some(result)
            }
            _ => {
                debug!(step, loss, "recorded first gradient snapshot");
                None
            }
        };

        StepRecord {
            step,
            loss,
            snapshot_recorded: true,
            turbulence,
        }
    }

    pub fn loss_history(&self) -> &[f32] {
        &self.loss_history
    }

    pub fn gradient_history(&self) -> &[GradientSnapshot] {
        &self.gradient_history
    }

    pub fn turbulence_history(&self) -> &[f64] {
        &self.turbulence_history
    }

    /// Per-score comparison counts, parallel to `turbulence_history`.
    pub fn turbulence_steps(&self) -> &[TurbulenceStep] {
        &self.turbulence_steps
    }

    pub fn latest_snapshot(&self) -> Option<&GradientSnapshot> {
        self.gradient_history.last()
    }

    /// Number of `record_step` calls so far.
    pub fn steps_recorded(&self) -> usize {
        self.loss_history.len()
    }

    /// Stability diagnosis over the whole turbulence history.
    pub fn diagnose(&self) -> Diagnosis {
        diagnose(&self.turbulence_history)
    }
}
