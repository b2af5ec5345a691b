//! Boosting backend that fits ensembles on quantized feature codes.
//!
//! The classifier never trains trees itself. It hands integer codes and labels
//! to a [`BoostingBackend`] and gets back a model in XGBoost's JSON layout.
//!
//! - [`BoostingBackend`]: the seam; implement it to plug in another library
//! - [`HistGradientBooster`]: bundled XGBoost-style logistic boosting
//! - [`BoosterParams`]: hyperparameters passed through the seam
//! - [`TrainingLogger`] / [`Verbosity`]: verbosity-gated `tracing` output

mod gain;
mod grower;
mod logger;
mod objective;
mod sampling;
mod trainer;

pub use gain::GainParams;
pub use logger::{TrainingLogger, Verbosity};
pub use objective::{sigmoid, BinaryObjective, LogisticLoss};
pub use sampling::{ColumnSampler, RowSampler};
pub use trainer::HistGradientBooster;

use ndarray::{ArrayView1, ArrayView2};

use crate::compat::xgboost::XgbModel;
use crate::error::Result;

/// A boosting library that fits binary classifiers on integer codes.
///
/// Implementations must return a `gbtree` model whose split conditions are
/// expressed in code space and whose `base_score` is 0.5.
pub trait BoostingBackend {
    fn fit(
        &self,
        codes: ArrayView2<i64>,
        labels: ArrayView1<f32>,
        params: &BoosterParams,
    ) -> Result<XgbModel>;
}

/// Hyperparameters forwarded to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct BoosterParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f32,
    pub gamma: f32,
    pub min_child_weight: f32,
    pub max_delta_step: f32,
    pub subsample: f32,
    pub colsample_bytree: f32,
    pub colsample_bylevel: f32,
    pub colsample_bynode: f32,
    pub reg_alpha: f32,
    pub reg_lambda: f32,
    pub scale_pos_weight: f32,
    pub objective: BinaryObjective,
    pub tree_method: String,
    /// Worker threads; 0 uses all cores.
    pub n_jobs: usize,
    pub seed: u64,
    pub verbosity: Verbosity,
}

impl Default for BoosterParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 6,
            learning_rate: 0.3,
            gamma: 0.0,
            min_child_weight: 1.0,
            max_delta_step: 0.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            colsample_bylevel: 1.0,
            colsample_bynode: 1.0,
            reg_alpha: 0.0,
            reg_lambda: 1.0,
            scale_pos_weight: 1.0,
            objective: BinaryObjective::Logistic,
            tree_method: "auto".to_string(),
            n_jobs: 0,
            seed: 0,
            verbosity: Verbosity::Silent,
        }
    }
}

impl BoosterParams {
    pub fn gain_params(&self) -> GainParams {
        GainParams {
            reg_lambda: self.reg_lambda as f64,
            reg_alpha: self.reg_alpha as f64,
            gamma: self.gamma as f64,
            min_child_weight: self.min_child_weight as f64,
            max_delta_step: self.max_delta_step as f64,
        }
    }
}
