//! XGBoost model compatibility.
//!
//! Parses XGBoost JSON models and extracts their trees into the crate's
//! quantized-threshold IR.
//!
//! Only binary gbtree classifiers trained on integer feature codes with a
//! neutral `base_score` of 0.5 are supported.

mod extract;
mod importance;
mod json;

pub use extract::{code_threshold, ConversionError};
pub use importance::ImportanceType;
pub use json::*;
