//! External ensemble formats.
//!
//! A fitted ensemble enters the quantized pipeline through [`TreeEnsemble`],
//! which names the framework it comes from and yields its trees as
//! [`TreeIr`]s with thresholds in feature-code space.

pub mod xgboost;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::ir::TreeIr;

pub use xgboost::{ConversionError, XgbModel};

/// Framework that produced a tree ensemble.
///
/// The framework decides how split conditions are read: XGBoost routes left
/// on `x < condition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    XGBoost,
}

impl Framework {
    pub fn name(self) -> &'static str {
        match self {
            Framework::XGBoost => "xgboost",
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Framework {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xgboost" => Ok(Framework::XGBoost),
            _ => Err(ConfigError::UnknownFramework(s.to_string())),
        }
    }
}

/// A fitted ensemble whose trees can be lifted into the IR.
pub trait TreeEnsemble {
    /// Framework the ensemble was trained with.
    fn framework(&self) -> Framework;

    /// Trees with integer thresholds and float leaves.
    ///
    /// `n_features` bounds the feature indices splits may use.
    fn extract_trees(&self, n_features: usize) -> Result<Vec<TreeIr<f64>>>;
}

impl TreeEnsemble for XgbModel {
    fn framework(&self) -> Framework {
        Framework::XGBoost
    }

    fn extract_trees(&self, n_features: usize) -> Result<Vec<TreeIr<f64>>> {
        XgbModel::extract_trees(self, n_features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framework_parses_case_insensitively() {
        assert_eq!("XGBoost".parse::<Framework>().unwrap(), Framework::XGBoost);
        assert_eq!(Framework::XGBoost.to_string(), "xgboost");
    }

    #[test]
    fn unknown_framework_is_rejected() {
        assert_eq!(
            "sklearn".parse::<Framework>().unwrap_err(),
            ConfigError::UnknownFramework("sklearn".into())
        );
    }
}
