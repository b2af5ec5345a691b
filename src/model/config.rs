//! Classifier configuration with builder pattern.
//!
//! [`QuantizedXgbConfig`] carries the quantization bit width and the
//! XGBoost-compatible hyperparameters forwarded to the boosting backend. It
//! uses the `bon` crate for the builder and validates at build time.
//!
//! # Example
//!
//! ```
//! use boosters_quant::model::QuantizedXgbConfig;
//!
//! // All defaults
//! let config = QuantizedXgbConfig::builder().build().unwrap();
//! assert_eq!(config.n_bits, 7);
//!
//! // Customize
//! let config = QuantizedXgbConfig::builder()
//!     .n_bits(5)
//!     .n_estimators(50)
//!     .max_depth(4)
//!     .base_score(0.5)
//!     .build()
//!     .unwrap();
//!
//! // Only 0.5 or None are accepted for base_score
//! assert!(QuantizedXgbConfig::builder().base_score(0.7).build().is_err());
//! ```

use std::num::NonZeroUsize;

use bon::Builder;

use crate::compat::xgboost::ImportanceType;
use crate::error::ConfigError;
use crate::quantization::MAX_N_BITS;
use crate::training::{BinaryObjective, BoosterParams, Verbosity};

const DEFAULT_N_BITS: u32 = 7;
const DEFAULT_MAX_DEPTH: usize = 3;
const DEFAULT_LEARNING_RATE: f32 = 0.1;
const DEFAULT_N_ESTIMATORS: usize = 20;

/// The only base score whose margin is zero.
const SUPPORTED_BASE_SCORE: f32 = 0.5;

const TREE_METHODS: [&str; 4] = ["auto", "exact", "approx", "hist"];

// =============================================================================
// QuantizedXgbConfig
// =============================================================================

/// Configuration of a [`QuantizedXGBClassifier`](super::QuantizedXGBClassifier).
///
/// # Structure
///
/// - **Quantization**: `n_bits` for inputs, leaves and outputs
/// - **Boosting**: `n_estimators`, `learning_rate`, `max_depth`, `objective`
/// - **Regularization**: `gamma`, `min_child_weight`, `max_delta_step`,
///   `reg_alpha`, `reg_lambda`, `scale_pos_weight`
/// - **Sampling**: `subsample` and the `colsample_*` ratios
/// - **Resources**: `n_jobs`, `random_state`, `verbosity`
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct QuantizedXgbConfig {
    // === Quantization ===
    /// Bit width of every quantizer. Default: 7.
    #[builder(default = DEFAULT_N_BITS)]
    pub n_bits: u32,

    // === Boosting ===
    /// Maximum tree depth. Default: 3.
    #[builder(default = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// Shrinkage applied to every leaf. Default: 0.1.
    #[builder(default = DEFAULT_LEARNING_RATE)]
    pub learning_rate: f32,

    /// Number of boosting rounds. Default: 20.
    #[builder(default = DEFAULT_N_ESTIMATORS)]
    pub n_estimators: usize,

    /// Default: `"gbtree"`, the only supported booster.
    #[builder(default = "gbtree".to_string(), into)]
    pub booster: String,

    /// Default: `"auto"`.
    #[builder(default = "auto".to_string(), into)]
    pub tree_method: String,

    /// Default: `"binary:logistic"`.
    #[builder(default = "binary:logistic".to_string(), into)]
    pub objective: String,

    /// Must be 0.5 or `None`.
    pub base_score: Option<f32>,

    // === Regularization ===
    #[builder(default = 0.0)]
    pub gamma: f32,

    #[builder(default = 1.0)]
    pub min_child_weight: f32,

    /// 0 disables the clip.
    #[builder(default = 0.0)]
    pub max_delta_step: f32,

    #[builder(default = 0.0)]
    pub reg_alpha: f32,

    #[builder(default = 1.0)]
    pub reg_lambda: f32,

    #[builder(default = 1.0)]
    pub scale_pos_weight: f32,

    // === Sampling ===
    #[builder(default = 1.0)]
    pub subsample: f32,

    #[builder(default = 1.0)]
    pub colsample_bytree: f32,

    #[builder(default = 1.0)]
    pub colsample_bylevel: f32,

    #[builder(default = 1.0)]
    pub colsample_bynode: f32,

    // === Reporting ===
    /// Aggregation used by `feature_importances`. Default: weight.
    #[builder(default)]
    pub importance_type: ImportanceType,

    // === Resources ===
    /// Worker threads for training. `None` uses all available cores.
    pub n_jobs: Option<NonZeroUsize>,

    /// Random seed. `None` means 0.
    pub random_state: Option<u64>,

    /// Default: `Silent`.
    #[builder(default)]
    pub verbosity: Verbosity,
}

/// Custom finishing function that validates the config.
impl<S: quantized_xgb_config_builder::IsComplete> QuantizedXgbConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for any value [`QuantizedXgbConfig::validate`] rejects.
    pub fn build(self) -> Result<QuantizedXgbConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl Default for QuantizedXgbConfig {
    fn default() -> Self {
        Self {
            n_bits: DEFAULT_N_BITS,
            max_depth: DEFAULT_MAX_DEPTH,
            learning_rate: DEFAULT_LEARNING_RATE,
            n_estimators: DEFAULT_N_ESTIMATORS,
            booster: "gbtree".to_string(),
            tree_method: "auto".to_string(),
            objective: "binary:logistic".to_string(),
            base_score: None,
            gamma: 0.0,
            min_child_weight: 1.0,
            max_delta_step: 0.0,
            reg_alpha: 0.0,
            reg_lambda: 1.0,
            scale_pos_weight: 1.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            colsample_bylevel: 1.0,
            colsample_bynode: 1.0,
            importance_type: ImportanceType::default(),
            n_jobs: None,
            random_state: None,
            verbosity: Verbosity::default(),
        }
    }
}

impl QuantizedXgbConfig {
    /// Validate the configuration.
    ///
    /// Also run by `fit`, so configs built with struct syntax are checked too.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(base_score) = self.base_score {
            if base_score != SUPPORTED_BASE_SCORE {
                return Err(ConfigError::UnsupportedBaseScore(base_score));
            }
        }

        if self.n_bits == 0 || self.n_bits > MAX_N_BITS {
            return Err(ConfigError::InvalidNBits {
                value: self.n_bits,
                max: MAX_N_BITS,
            });
        }

        // NaN fails every comparison, so test the accepting condition.
        if !(self.learning_rate > 0.0) {
            return Err(ConfigError::InvalidLearningRate(self.learning_rate));
        }
        if self.n_estimators == 0 {
            return Err(ConfigError::InvalidNEstimators);
        }
        if self.max_depth == 0 {
            return Err(ConfigError::InvalidMaxDepth);
        }

        for (field, value) in [
            ("subsample", self.subsample),
            ("colsample_bytree", self.colsample_bytree),
            ("colsample_bylevel", self.colsample_bylevel),
            ("colsample_bynode", self.colsample_bynode),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::InvalidSamplingRatio { field, value });
            }
        }

        for (field, value) in [
            ("gamma", self.gamma),
            ("min_child_weight", self.min_child_weight),
            ("max_delta_step", self.max_delta_step),
            ("reg_alpha", self.reg_alpha),
            ("reg_lambda", self.reg_lambda),
        ] {
            if !(value >= 0.0) {
                return Err(ConfigError::InvalidRegularization { field, value });
            }
        }

        if !(self.scale_pos_weight > 0.0) {
            return Err(ConfigError::InvalidScalePosWeight(self.scale_pos_weight));
        }

        if self.booster != "gbtree" {
            return Err(ConfigError::UnsupportedBooster(self.booster.clone()));
        }
        if !TREE_METHODS.contains(&self.tree_method.as_str()) {
            return Err(ConfigError::UnsupportedTreeMethod(self.tree_method.clone()));
        }
        BinaryObjective::from_name(&self.objective)?;

        Ok(())
    }

    /// Backend hyperparameters for a run on `n_jobs` threads (0 = all cores).
    pub fn booster_params(&self, n_jobs: usize) -> Result<BoosterParams, ConfigError> {
        Ok(BoosterParams {
            n_estimators: self.n_estimators,
            max_depth: self.max_depth,
            learning_rate: self.learning_rate,
            gamma: self.gamma,
            min_child_weight: self.min_child_weight,
            max_delta_step: self.max_delta_step,
            subsample: self.subsample,
            colsample_bytree: self.colsample_bytree,
            colsample_bylevel: self.colsample_bylevel,
            colsample_bynode: self.colsample_bynode,
            reg_alpha: self.reg_alpha,
            reg_lambda: self.reg_lambda,
            scale_pos_weight: self.scale_pos_weight,
            objective: BinaryObjective::from_name(&self.objective)?,
            tree_method: self.tree_method.clone(),
            n_jobs,
            seed: self.random_state.unwrap_or(0),
            verbosity: self.verbosity,
        })
    }

    /// Thread count from `n_jobs`, where 0 means all cores.
    pub fn n_threads(&self) -> usize {
        self.n_jobs.map_or(0, NonZeroUsize::get)
    }
}

// =============================================================================
// Tests
// =============================================================================
