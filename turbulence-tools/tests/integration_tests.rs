//! Integration tests for turbulence-tools
//!
//! Tests cover:
//! 1. Turbulence scenarios from consecutive gradient snapshots
//! 2. History length invariants across mixed steps
//! 3. Snapshot capture from candle tensors
//! 4. Diagnosis over tracker output
//! 5. Chart artifacts written from a tracked run

use std::f64::consts::{FRAC_PI_2, PI};
use std::fs;

use candle_core::{Device, Tensor, Var};
use turbulence_tools::{
    diagnose, plot_gradient_vector_field, plot_loss_curve, plot_turbulence, Diagnosis,
    GradientSnapshot, GradientTensor, StabilityLevel, TurbulenceTracker,
};

fn snapshot(entries: &[(&str, &[f32])]) -> GradientSnapshot {
    entries
        .iter()
        .map(|(name, values)| (*name, GradientTensor::from_slice(values)))
        .collect()
}

// ============================================================================
// Test 1: Turbulence Scenarios
// ============================================================================

#[test]
fn test_orthogonal_turn_after_steady_steps() {
    let mut tracker = TurbulenceTracker::new();
    tracker.record_step(snapshot(&[("w", &[1.0, 0.0])]), 1.0);
    tracker.record_step(snapshot(&[("w", &[1.0, 0.0])]), 0.9);
    tracker.record_step(snapshot(&[("w", &[0.0, 1.0])]), 0.8);

    let history = tracker.turbulence_history();
    assert_eq!(history.len(), 2);
    assert!(history[0].abs() < 1e-9);
    assert!((history[1] - FRAC_PI_2).abs() < 1e-9);
    assert!((history[1] - 1.5708).abs() < 1e-4);
}

#[test]
fn test_sign_flip_every_step_is_maximal_turbulence() {
    let mut tracker = TurbulenceTracker::new();
    for step in 0..6 {
        let sign = if step % 2 == 0 { 1.0 } else { -1.0 };
        tracker.record_step(
            snapshot(&[("w", &[sign * 0.3, sign * -0.7]), ("b", &[sign])]),
            1.0,
        );
    }

    for score in tracker.turbulence_history() {
        assert!((score - PI).abs() < 1e-6, "score = {}", score);
    }
    assert_eq!(tracker.diagnose().level(), Some(StabilityLevel::High));
}

#[test]
fn test_matrix_gradients_are_flattened() {
    let prev = GradientTensor::new(vec![2, 2], vec![1.0, 0.0, 0.0, 0.0]).unwrap();
    let curr = GradientTensor::new(vec![2, 2], vec![0.0, 0.0, 0.0, 1.0]).unwrap();

    let mut tracker = TurbulenceTracker::new();
    tracker.record_step(std::iter::once(("w", prev)).collect(), 1.0);
    let record = tracker.record_step(std::iter::once(("w", curr)).collect(), 1.0);

    let step = record.turbulence.unwrap();
    assert_eq!(step.compared, 1);
    assert!((step.score - FRAC_PI_2).abs() < 1e-9);
}

#[test]
fn test_frozen_layer_contributes_nothing() {
    let mut tracker = TurbulenceTracker::new();
    tracker.record_step(snapshot(&[("w", &[1.0, 0.0]), ("frozen", &[0.0, 0.0])]), 1.0);
    let record = tracker.record_step(
        snapshot(&[("w", &[1.0, 0.0]), ("frozen", &[0.0, 0.0])]),
        1.0,
    );

    let step = record.turbulence.unwrap();
    assert_eq!(step.compared, 1);
    assert_eq!(step.skipped_degenerate, 1);
    assert!(step.score.abs() < 1e-9);
}

// ============================================================================
// Test 2: History Invariants
// ============================================================================

#[test]
fn test_gradient_free_steps_do_not_break_pairing() {
    let mut tracker = TurbulenceTracker::new();
    tracker.record_step(snapshot(&[("w", &[1.0, 0.0])]), 1.0);
    tracker.record_step(GradientSnapshot::new(), 0.5);
    tracker.record_step(GradientSnapshot::new(), 0.4);
    tracker.record_step(snapshot(&[("w", &[0.0, 1.0])]), 0.3);

    assert_eq!(tracker.loss_history(), &[1.0, 0.5, 0.4, 0.3]);
    assert_eq!(tracker.gradient_history().len(), 2);
    // Compares against the last snapshot, not the last step
    assert_eq!(tracker.turbulence_history().len(), 1);
    assert!((tracker.turbulence_history()[0] - FRAC_PI_2).abs() < 1e-9);
}

#[test]
fn test_uninformative_zero_is_distinguishable() {
    let mut tracker = TurbulenceTracker::new();
    tracker.record_step(snapshot(&[("a", &[1.0])]), 1.0);
    tracker.record_step(snapshot(&[("b", &[1.0])]), 1.0);

    assert_eq!(tracker.turbulence_history(), &[0.0]);
    let step = tracker.turbulence_steps()[0];
    assert!(!step.is_informative());
    assert_eq!(step.skipped_unmatched, 2);
}

// ============================================================================
// Test 3: Snapshot Capture From Candle
// ============================================================================

#[test]
fn test_snapshot_survives_variable_update() {
    let device = Device::Cpu;
    let var = Var::new(&[[1.0f32, 0.0], [0.0, 1.0]], &device).unwrap();

    let mut captured = GradientSnapshot::new();
    captured.insert_tensor("w", var.as_tensor()).unwrap();

    var.set(&Tensor::zeros((2, 2), candle_core::DType::F32, &device).unwrap())
        .unwrap();

    let w = captured.get("w").unwrap();
    assert_eq!(w.shape(), &[2, 2]);
    assert_eq!(w.values(), &[1.0, 0.0, 0.0, 1.0]);
}

#[test]
fn test_snapshot_from_backward_pass() {
    let device = Device::Cpu;
    let w = Var::new(&[1.0f32, 2.0, 3.0], &device).unwrap();
    let x = Tensor::new(&[0.5f32, -1.0, 2.0], &device).unwrap();

    // loss = sum(w * x)  =>  d loss / d w = x
    let loss = w.as_tensor().mul(&x).unwrap().sum_all().unwrap();
    let grads = loss.backward().unwrap();
    let grad = grads.get(w.as_tensor()).unwrap();

    let mut snap = GradientSnapshot::new();
    snap.insert_tensor("w", grad).unwrap();
    assert_eq!(snap.get("w").unwrap().values(), &[0.5, -1.0, 2.0]);
}

// ============================================================================
// Test 4: Diagnosis
// ============================================================================

#[test]
fn test_diagnosis_of_fresh_tracker() {
    let tracker = TurbulenceTracker::new();
    assert_eq!(tracker.diagnose(), Diagnosis::NoData);
}

#[test]
fn test_diagnosis_monotone_in_mean() {
    let levels: Vec<StabilityLevel> = [0.0, 0.1, 0.29, 0.3, 0.5, 0.69, 0.7, 0.9, 3.0]
        .iter()
        .map(|&m| diagnose(&[m]).level().unwrap())
        .collect();

    let rank = |l: &StabilityLevel| match l {
        StabilityLevel::Stable => 0,
        StabilityLevel::Moderate => 1,
        StabilityLevel::High => 2,
    };
    assert!(levels.windows(2).all(|w| rank(&w[0]) <= rank(&w[1])));
    assert_eq!(levels[3], StabilityLevel::Moderate);
    assert_eq!(levels[6], StabilityLevel::High);
}

// ============================================================================
// Test 5: Chart Artifacts
// ============================================================================

#[test]
fn test_artifacts_from_tracked_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut tracker = TurbulenceTracker::new();

    for step in 0..20 {
        let t = step as f32 * 0.3;
        let weight = GradientTensor::new(
            vec![3, 4],
            (0..12).map(|i| (t + i as f32).sin()).collect(),
        )
        .unwrap();
        let bias = GradientTensor::from_slice(&[t.cos(), t.sin(), 0.5]);
        let snap: GradientSnapshot = vec![("layer.bias", bias), ("layer.weight", weight)]
            .into_iter()
            .collect();
        tracker.record_step(snap, 2.0 / (step + 1) as f32);
    }

    let loss_path = dir.path().join("loss_curve.svg");
    let turb_path = dir.path().join("turbulence.svg");
    let field_path = dir.path().join("gradient_field.svg");

    assert!(plot_loss_curve(tracker.loss_history(), Some(&loss_path))
        .unwrap()
        .is_some());
    assert!(plot_turbulence(tracker.turbulence_history(), Some(&turb_path))
        .unwrap()
        .is_some());
    assert!(plot_gradient_vector_field(
        tracker.latest_snapshot().unwrap(),
        "(Last Step)",
        Some(&field_path)
    )
    .unwrap()
    .is_some());

    let field = fs::read_to_string(&field_path).unwrap();
    assert!(field.contains("Gradient Vector Field (Last Step)"));
    let turbulence = fs::read_to_string(&turb_path).unwrap();
    assert!(turbulence.contains("Average Gradient Angle"));
    assert!(fs::read_to_string(&loss_path).unwrap().contains("Loss Curve"));
}
