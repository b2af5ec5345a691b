//! boosters-quant: quantized gradient-boosted trees as integer tensor arithmetic.
//!
//! A binary XGBoost-style classifier whose inputs, leaves and outputs are all
//! fixed-point quantized, and whose inference is re-expressed as batched
//! integer comparisons, gathers and sums. The routing decisions of every tree
//! are reproduced exactly, with no tree traversal at prediction time.
//!
//! # Key Types
//!
//! - [`QuantizedXGBClassifier`] - fit / predict / predict_proba
//! - [`QuantizedXgbConfig`] - hyperparameters (builder)
//! - [`QuantizedArray`] / [`FeatureQuantizers`] - fixed-point quantizers
//! - [`TensorPredictor`] - vectorized ensemble evaluation
//!
//! # Pipeline
//!
//! ```text
//! features -> FeatureQuantizers -> codes -> BoostingBackend -> XgbModel
//!          -> extract (TreeIr) -> tree_to_tensors -> TensorPredictor + q_y
//! ```
//!
//! # Loading XGBoost Models
//!
//! Models trained elsewhere on the same codes can be parsed with
//! [`compat::xgboost::XgbModel`] and wrapped with
//! [`QuantizedXGBClassifier::from_fitted_parts`].

// Re-export approx traits for users who want to compare predictions
pub use approx;

pub mod compat;
pub mod error;
pub mod ir;
pub mod model;
pub mod quantization;
pub mod tensor;
pub mod testing;
pub mod training;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use error::{ConfigError, Error, Result};

pub use model::{ExecutionMode, QuantizedXGBClassifier, QuantizedXgbConfig};

pub use compat::{Framework, TreeEnsemble};
pub use ir::{IrNode, TreeIr};
pub use quantization::{FeatureQuantizers, QuantizedArray};
pub use tensor::{tree_to_tensors, EnsembleTensors, TensorPredictor};

pub use training::{BoosterParams, BoostingBackend, HistGradientBooster, Verbosity};

pub use utils::{run_with_threads, Parallelism};
