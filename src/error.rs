//! Error taxonomy for the quantized tree pipeline.
//!
//! Each concern has its own error enum; [`Error`] aggregates them so the
//! public API can return a single `Result` type.

use crate::compat::xgboost::ConversionError;
use crate::ir::TreeValidationError;
use crate::quantization::QuantizationError;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

// =============================================================================
// ConfigError
// =============================================================================

/// Invalid or unsupported hyperparameter combination.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("only 0.5 or None are supported for base_score, got {0}")]
    UnsupportedBaseScore(f32),
    #[error("n_bits must be in 1..={max}, got {value}")]
    InvalidNBits { value: u32, max: u32 },
    #[error("learning_rate must be positive, got {0}")]
    InvalidLearningRate(f32),
    #[error("n_estimators must be at least 1")]
    InvalidNEstimators,
    #[error("max_depth must be at least 1")]
    InvalidMaxDepth,
    #[error("{field} must be in (0, 1], got {value}")]
    InvalidSamplingRatio { field: &'static str, value: f32 },
    #[error("{field} must be non-negative, got {value}")]
    InvalidRegularization { field: &'static str, value: f32 },
    #[error("scale_pos_weight must be positive, got {0}")]
    InvalidScalePosWeight(f32),
    #[error("unsupported objective '{0}', only binary classification is supported")]
    UnsupportedObjective(String),
    #[error("unsupported booster '{0}', only 'gbtree' is supported")]
    UnsupportedBooster(String),
    #[error("unsupported tree_method '{0}'")]
    UnsupportedTreeMethod(String),
    #[error("unknown importance_type '{0}'")]
    UnknownImportanceType(String),
    #[error("unknown framework '{0}'")]
    UnknownFramework(String),
    #[error("framework mismatch: requested '{requested}', ensemble is '{actual}'")]
    FrameworkMismatch {
        requested: &'static str,
        actual: &'static str,
    },
    #[error("tree {tree} node {node} uses a categorical split, which cannot be quantized")]
    CategoricalSplit { tree: usize, node: usize },
}

// =============================================================================
// Error
// =============================================================================

/// Top-level error returned by the public API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// An operation was requested in a state that does not allow it.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// The facade deliberately does not implement this operation.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Quantization(#[from] QuantizationError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("invalid tree structure: {0}")]
    TreeValidation(#[from] TreeValidationError),
}

impl Error {
    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_into_error() {
        let err: Error = ConfigError::UnsupportedBaseScore(0.7).into();
        assert!(matches!(
            err,
            Error::Configuration(ConfigError::UnsupportedBaseScore(v)) if (v - 0.7).abs() < 1e-6
        ));
        assert!(err.to_string().contains("base_score"));
    }

    #[test]
    fn framework_mismatch_message_names_both_sides() {
        let err = ConfigError::FrameworkMismatch {
            requested: "sklearn",
            actual: "xgboost",
        };
        let msg = err.to_string();
        assert!(msg.contains("sklearn") && msg.contains("xgboost"));
    }
}
