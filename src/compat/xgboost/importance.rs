//! Feature importance from XGBoost node statistics.
//!
//! Supported importance types:
//! - **Weight**: number of splits using each feature
//! - **Gain**: average loss reduction of those splits
//! - **Cover**: average hessian sum at those splits
//! - **TotalGain** / **TotalCover**: the unaveraged sums

use std::fmt;
use std::str::FromStr;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use super::json::XgbModel;

/// How per-feature importance is aggregated over split nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportanceType {
    /// Split count.
    #[default]
    Weight,
    Gain,
    Cover,
    TotalGain,
    TotalCover,
}

impl ImportanceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ImportanceType::Weight => "weight",
            ImportanceType::Gain => "gain",
            ImportanceType::Cover => "cover",
            ImportanceType::TotalGain => "total_gain",
            ImportanceType::TotalCover => "total_cover",
        }
    }
}

impl fmt::Display for ImportanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportanceType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weight" => Ok(ImportanceType::Weight),
            "gain" => Ok(ImportanceType::Gain),
            "cover" => Ok(ImportanceType::Cover),
            "total_gain" => Ok(ImportanceType::TotalGain),
            "total_cover" => Ok(ImportanceType::TotalCover),
            _ => Err(ConfigError::UnknownImportanceType(s.to_string())),
        }
    }
}

impl XgbModel {
    /// Per-feature importance, normalized to sum to one.
    ///
    /// Features never used in a split get zero. If no tree splits at all the
    /// result is all zeros. Split features at or beyond `n_features` are ignored.
    pub fn feature_importance(&self, kind: ImportanceType, n_features: usize) -> Array1<f64> {
        let mut counts = Array1::<f64>::zeros(n_features);
        let mut gains = Array1::<f64>::zeros(n_features);
        let mut covers = Array1::<f64>::zeros(n_features);

        let trees = self.model_trees().map(|m| m.trees.as_slice()).unwrap_or(&[]);
        for tree in trees {
            for (node, &left) in tree.left_children.iter().enumerate() {
                if left == -1 {
                    continue;
                }
                let Some(feature) = tree
                    .split_indices
                    .get(node)
                    .and_then(|&f| usize::try_from(f).ok())
                    .filter(|&f| f < n_features)
                else {
                    continue;
                };
                counts[feature] += 1.0;
                gains[feature] += tree.loss_changes.get(node).copied().unwrap_or(0.0);
                covers[feature] += tree.sum_hessian.get(node).copied().unwrap_or(0.0);
            }
        }

        let mut scores = match kind {
            ImportanceType::Weight => counts,
            ImportanceType::TotalGain => gains,
            ImportanceType::TotalCover => covers,
            ImportanceType::Gain => average(&gains, &counts),
            ImportanceType::Cover => average(&covers, &counts),
        };

        let total = scores.sum();
        if total > 0.0 {
            scores /= total;
        }
        scores
    }
}

fn average(sums: &Array1<f64>, counts: &Array1<f64>) -> Array1<f64> {
    ndarray::Zip::from(sums)
        .and(counts)
        .map_collect(|&s, &c| if c > 0.0 { s / c } else { 0.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::xgb_stump_model;
    use approx::assert_abs_diff_eq;
    use rstest::rstest;

    #[rstest]
    #[case("weight", ImportanceType::Weight)]
    #[case("GAIN", ImportanceType::Gain)]
    #[case("total_cover", ImportanceType::TotalCover)]
    fn parses_importance_type(#[case] s: &str, #[case] expected: ImportanceType) {
        assert_eq!(s.parse::<ImportanceType>().unwrap(), expected);
    }

    #[test]
    fn unknown_importance_type_is_config_error() {
        assert_eq!(
            "split".parse::<ImportanceType>().unwrap_err(),
            ConfigError::UnknownImportanceType("split".into())
        );
    }

    #[test]
    fn single_split_feature_gets_all_importance() {
        let model = xgb_stump_model(1, 2.5, -0.4, 0.6);

        for kind in [
            ImportanceType::Weight,
            ImportanceType::Gain,
            ImportanceType::Cover,
            ImportanceType::TotalGain,
            ImportanceType::TotalCover,
        ] {
            let imp = model.feature_importance(kind, 3);
            assert_abs_diff_eq!(imp[0], 0.0);
            assert_abs_diff_eq!(imp[1], 1.0);
            assert_abs_diff_eq!(imp[2], 0.0);
        }
    }
}
