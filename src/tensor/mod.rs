//! Tensorized ensemble inference.
//!
//! - [`tree_to_tensors`]: extract, quantize leaves, pack, fit the output quantizer
//! - [`EnsembleTensors`]: the padded `[tree][node]` arrays
//! - [`TensorPredictor`]: vectorized evaluation without tree traversal

mod predictor;
mod tensorize;
mod tensors;

pub use predictor::TensorPredictor;
pub use tensorize::tree_to_tensors;
pub use tensors::EnsembleTensors;
