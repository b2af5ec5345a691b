//! Extraction of the tree IR from XGBoost node arrays.

use crate::error::{ConfigError, Result};
use crate::ir::{IrNode, NodeId, TreeIr, TreeValidationError};

use super::json::{GradientBooster, Tree as XgbTree, XgbModel};

/// Base score that maps to a zero margin under the logistic link.
const NEUTRAL_BASE_SCORE: f32 = 0.5;

/// Error type for malformed XGBoost node arrays.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("tree {0} has no nodes")]
    EmptyTree(usize),
    #[error("tree {tree}: '{field}' has {actual} entries, expected at least {expected}")]
    ArrayLength {
        tree: usize,
        field: &'static str,
        actual: usize,
        expected: usize,
    },
    #[error(
        "invalid node index in tree {tree}: node {node} references child {child} but tree has {num_nodes} nodes"
    )]
    InvalidNodeIndex {
        tree: usize,
        node: usize,
        child: i32,
        num_nodes: usize,
    },
    #[error("tree {tree} node {node} splits on feature {feature}, but inputs have {n_features} features")]
    FeatureOutOfRange {
        tree: usize,
        node: usize,
        feature: i32,
        n_features: usize,
    },
    #[error("tree {tree} node {node} has non-finite split condition {value}")]
    NonFiniteCondition {
        tree: usize,
        node: usize,
        value: f32,
    },
    #[error("tree {tree}: {source}")]
    InvalidTree {
        tree: usize,
        #[source]
        source: TreeValidationError,
    },
}

/// Integer threshold equivalent to XGBoost's `x < condition` on integer codes.
///
/// For integer `x`, `x < c` holds exactly when `x <= ceil(c) - 1`.
#[inline]
pub fn code_threshold(condition: f32) -> i64 {
    (condition as f64).ceil() as i64 - 1
}

impl XgbModel {
    /// Check that this model is a binary gbtree classifier with a neutral prior.
    pub fn check_supported(&self) -> Result<(), ConfigError> {
        let learner = &self.learner;

        if !matches!(learner.gradient_booster, GradientBooster::Gbtree { .. }) {
            return Err(ConfigError::UnsupportedBooster(
                learner.gradient_booster.name().to_string(),
            ));
        }

        if !learner.objective.is_binary_margin() {
            return Err(ConfigError::UnsupportedObjective(
                learner.objective.name().to_string(),
            ));
        }

        let param = &learner.learner_model_param;
        if param.n_class > 1 || param.num_target > 1 {
            return Err(ConfigError::UnsupportedObjective(format!(
                "{} with {} classes and {} targets",
                learner.objective.name(),
                param.n_class,
                param.num_target
            )));
        }

        if (param.base_score - NEUTRAL_BASE_SCORE).abs() > 1e-6 {
            return Err(ConfigError::UnsupportedBaseScore(param.base_score));
        }

        Ok(())
    }

    /// Convert every tree to the quantized-threshold IR.
    ///
    /// The model must have been trained on integer feature codes, so split
    /// conditions already live in code space. Leaf values are kept as floats.
    ///
    /// # Errors
    ///
    /// - [`ConfigError`] for unsupported boosters, objectives, base scores or
    ///   categorical splits
    /// - [`ConversionError`] for malformed node arrays or feature indices
    ///   outside `0..n_features`
    pub fn extract_trees(&self, n_features: usize) -> Result<Vec<TreeIr<f64>>> {
        self.check_supported()?;

        let model_trees = match &self.learner.gradient_booster {
            GradientBooster::Gbtree { model } => model,
            other => {
                return Err(ConfigError::UnsupportedBooster(other.name().to_string()).into())
            }
        };

        model_trees
            .trees
            .iter()
            .enumerate()
            .map(|(tree_idx, tree)| convert_tree(tree, tree_idx, n_features))
            .collect()
    }
}

/// Convert a single XGBoost tree.
fn convert_tree(xgb_tree: &XgbTree, tree_idx: usize, n_features: usize) -> Result<TreeIr<f64>> {
    let num_nodes = usize::try_from(xgb_tree.tree_param.num_nodes).unwrap_or(0);
    if num_nodes == 0 {
        return Err(ConversionError::EmptyTree(tree_idx).into());
    }

    for (field, actual) in [
        ("left_children", xgb_tree.left_children.len()),
        ("right_children", xgb_tree.right_children.len()),
        ("split_indices", xgb_tree.split_indices.len()),
        ("split_conditions", xgb_tree.split_conditions.len()),
    ] {
        if actual < num_nodes {
            return Err(ConversionError::ArrayLength {
                tree: tree_idx,
                field,
                actual,
                expected: num_nodes,
            }
            .into());
        }
    }

    let child_id = |node: usize, child: i32| -> Result<NodeId> {
        if child < 0 || child as usize >= num_nodes {
            return Err(ConversionError::InvalidNodeIndex {
                tree: tree_idx,
                node,
                child,
                num_nodes,
            }
            .into());
        }
        Ok(child as NodeId)
    };

    let mut nodes = Vec::with_capacity(num_nodes);
    for node_idx in 0..num_nodes {
        let left_child = xgb_tree.left_children[node_idx];
        let condition = xgb_tree.split_conditions[node_idx];

        if !condition.is_finite() {
            return Err(ConversionError::NonFiniteCondition {
                tree: tree_idx,
                node: node_idx,
                value: condition,
            }
            .into());
        }

        // A node is a leaf if left_child == -1 (XGBoost convention); the leaf
        // value lives in split_conditions.
        if left_child == -1 {
            nodes.push(IrNode::Leaf {
                value: condition as f64,
            });
            continue;
        }

        if xgb_tree.split_type.get(node_idx).copied().unwrap_or(0) == 1 {
            return Err(ConfigError::CategoricalSplit {
                tree: tree_idx,
                node: node_idx,
            }
            .into());
        }

        let feature = xgb_tree.split_indices[node_idx];
        if feature < 0 || feature as usize >= n_features {
            return Err(ConversionError::FeatureOutOfRange {
                tree: tree_idx,
                node: node_idx,
                feature,
                n_features,
            }
            .into());
        }

        nodes.push(IrNode::Split {
            feature: feature as usize,
            threshold: code_threshold(condition),
            left: child_id(node_idx, left_child)?,
            right: child_id(node_idx, xgb_tree.right_children[node_idx])?,
        });
    }

    TreeIr::new(nodes).map_err(|source| {
        ConversionError::InvalidTree {
            tree: tree_idx,
            source,
        }
        .into()
    })
}
