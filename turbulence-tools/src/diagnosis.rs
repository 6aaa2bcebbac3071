//! Stability diagnosis from a turbulence history.
//!
//! The thresholds are calibration choices for the mean gradient angle in
//! radians, not derived quantities:
//!
//! | Mean angle | Level |
//! |------------|-------|
//! | `< 0.3` | [`StabilityLevel::Stable`] |
//! | `0.3 ..< 0.7` | [`StabilityLevel::Moderate`] |
//! | `>= 0.7` | [`StabilityLevel::High`] |

use std::fmt;

/// Upper bound (exclusive) of the stable band.
pub const STABLE_THRESHOLD: f64 = 0.3;

/// Lower bound (inclusive) of the high-turbulence band.
pub const HIGH_THRESHOLD: f64 = 0.7;

/// Coarse classification of training stability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StabilityLevel {
    /// Gradient direction barely changes between steps
    Stable,
    /// Noticeable direction changes, possibly small oscillations
    Moderate,
    /// Large direction changes, training may be unstable
    High,
}

impl StabilityLevel {
    /// Classify a mean turbulence score.
    ///
    /// NaN is not special-cased; it fails both comparisons and lands in `High`.
    pub fn classify(mean: f64) -> Self {
        if mean < STABLE_THRESHOLD {
            Self::Stable
        } else if mean < HIGH_THRESHOLD {
            Self::Moderate
        } else {
            Self::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Moderate => "moderate",
            Self::High => "high",
        }
    }
}

impl fmt::Display for StabilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`diagnose`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Diagnosis {
    /// No turbulence score has been recorded yet
    NoData,
    /// Classification of the mean turbulence score
    Assessed { level: StabilityLevel, mean: f64 },
}

impl Diagnosis {
    pub fn level(&self) -> Option<StabilityLevel> {
        match self {
            Self::NoData => None,
            Self::Assessed { level, .. } => Some(*level),
        }
    }

    pub fn mean(&self) -> Option<f64> {
        match self {
            Self::NoData => None,
            Self::Assessed { mean, .. } => Some(*mean),
        }
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoData => write!(f, "No turbulence data collected yet."),
            Self::Assessed { level, mean } => {
                let remark = match level {
                    StabilityLevel::Stable => "Training seems smooth.",
                    StabilityLevel::Moderate => "Potential small oscillations.",
                    StabilityLevel::High => "Training may be unstable.",
                };
                write!(f, "Turbulence is {} (avg={:.2}). {}", level, mean, remark)
            }
        }
    }
}

/// Diagnose training stability from the arithmetic mean of all scores.
pub fn diagnose(turbulence_history: &[f64]) -> Diagnosis {
    if turbulence_history.is_empty() {
        return Diagnosis::NoData;
    }

    let mean = turbulence_history.iter().sum::<f64>() / turbulence_history.len() as f64;
    Diagnosis::Assessed {
        level: StabilityLevel::classify(mean),
        mean,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_history() {
        let d = diagnose(&[]);
        assert_eq!(d, Diagnosis::NoData);
        assert_eq!(d.to_string(), "No turbulence data collected yet.");
    }

    #[test]
    fn test_classification_bands() {
        assert_eq!(diagnose(&[0.1]).level(), Some(StabilityLevel::Stable));
        assert_eq!(diagnose(&[0.5]).level(), Some(StabilityLevel::Moderate));
        assert_eq!(diagnose(&[0.9]).level(), Some(StabilityLevel::High));
    }

    #[test]
    fn test_boundaries_are_half_open() {
        assert_eq!(StabilityLevel::classify(0.3), StabilityLevel::Moderate);
        assert_eq!(StabilityLevel::classify(0.7), StabilityLevel::High);
        assert_eq!(StabilityLevel::classify(0.299_999), StabilityLevel::Stable);
        assert_eq!(StabilityLevel::classify(0.699_999), StabilityLevel::Moderate);
    }

    #[test]
    fn test_uses_mean_of_history() {
        // mean = 0.5 even though every value lies outside the moderate band
        let d = diagnose(&[0.1, 0.9]);
        assert_eq!(d.level(), Some(StabilityLevel::Moderate));
        assert!((d.mean().unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            diagnose(&[0.1, 0.1]).to_string(),
            "Turbulence is stable (avg=0.10). Training seems smooth."
        );
        assert_eq!(
            diagnose(&[0.5]).to_string(),
            "Turbulence is moderate (avg=0.50). Potential small oscillations."
        );
        assert_eq!(
            diagnose(&[1.2]).to_string(),
            "Turbulence is high (avg=1.20). Training may be unstable."
        );
    }

    #[test]
    fn test_nan_mean_falls_through_to_high() {
        let d = diagnose(&[0.1, f64::NAN]);
        assert_eq!(d.level(), Some(StabilityLevel::High));
        assert!(d.mean().unwrap().is_nan());
    }
}
