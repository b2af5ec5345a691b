//! User-facing estimator.
//!
//! - [`QuantizedXGBClassifier`]: fit / predict / predict_proba over the
//!   quantized tensor pipeline
//! - [`QuantizedXgbConfig`]: validated hyperparameters (`bon` builder)
//! - [`ExecutionMode`]: clear or encrypted inference

mod classifier;
mod config;

pub use classifier::{ExecutionMode, QuantizedXGBClassifier};
pub use config::QuantizedXgbConfig;
