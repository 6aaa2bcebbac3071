//! Error types for the fluid model and trainer.

use thiserror::Error;

/// Result type for fluid model operations.
pub type FluidResult<T> = Result<T, FluidError>;

/// Errors that can occur while building, training, or reporting on the model.
#[derive(Debug, Error)]
pub enum FluidError {
    /// Tensor operation failed
    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    /// Gradient snapshot could not be built
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] turbulence_tools::SnapshotError),

    /// Chart rendering or terminal view failed
    #[error("Visualization error: {0}")]
    Viz(#[from] turbulence_tools::VizError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Training error
    #[error("Training error: {0}")]
    Training(String),

    /// Data error
    #[error("Data error: {0}")]
    Data(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FluidError {
    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a training error
    pub fn training(msg: impl Into<String>) -> Self {
        Self::Training(msg.into())
    }

    /// Create a data error
    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            FluidError::invalid_config("batch_size must be > 0").to_string(),
            "Invalid configuration: batch_size must be > 0"
        );
        assert_eq!(
            FluidError::training("lock poisoned").to_string(),
            "Training error: lock poisoned"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: FluidError = io.into();
        assert!(matches!(err, FluidError::Io(_)));
    }
}
