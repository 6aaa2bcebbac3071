//! Gradient turbulence tools
//!
//! This crate provides:
//! - Per-step gradient snapshots detached from the training graph
//! - Turbulence tracking: mean angle between consecutive gradients
//! - Stability diagnosis from the turbulence history
//! - SVG charts (loss curve, turbulence, gradient vector field)
//! - Animated two-panel terminal view of loss and turbulence
//!
//! # Example
//!
//! ```rust
//! use turbulence_tools::{GradientSnapshot, GradientTensor, StabilityLevel, TurbulenceTracker};
//!
//! let mut tracker = TurbulenceTracker::new();
//! for step in 0..5 {
//!     let grad = GradientTensor::from_slice(&[1.0, 0.1 * step as f32]);
//!     let snapshot: GradientSnapshot = std::iter::once(("w", grad)).collect();
//!     tracker.record_step(snapshot, 1.0 / (step + 1) as f32);
//! }
//!
//! assert_eq!(tracker.turbulence_history().len(), 4);
//! assert_eq!(tracker.diagnose().level(), Some(StabilityLevel::Stable));
//! ```

pub mod charts;
pub mod diagnosis;
pub mod live_view;
pub mod snapshot;
pub mod tracker;

pub use charts::{
    plot_gradient_vector_field, plot_loss_curve, plot_turbulence, VizError, VizResult,
    DEFAULT_GRADIENT_FIELD_FILE, DEFAULT_LOSS_CURVE_FILE, DEFAULT_TURBULENCE_FILE,
};
pub use diagnosis::{diagnose, Diagnosis, StabilityLevel, HIGH_THRESHOLD, STABLE_THRESHOLD};
pub use live_view::LiveTurbulenceView;
pub use snapshot::{GradientSnapshot, GradientTensor, SnapshotError, SnapshotResult};
pub use tracker::{
    angle_between, compute_turbulence, StepRecord, TurbulenceStep, TurbulenceTracker,
    NORM_EPSILON,
};
