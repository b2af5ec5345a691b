//! Dense `[tree][node]` arrays for batched evaluation.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ir::{IrNode, NodeId, TreeIr};

/// Padded node arrays of a whole ensemble.
///
/// Every array has shape `[n_trees, max_nodes]`. Trees with fewer nodes are
/// padded with inert leaves (value 0, both children pointing at themselves)
/// that no traversal ever reaches. Real leaves also point at themselves, so
/// repeated child selection is a fixed point once a leaf is reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleTensors {
    features: Array2<usize>,
    thresholds: Array2<i64>,
    left: Array2<NodeId>,
    right: Array2<NodeId>,
    leaf_values: Array2<i64>,
    is_leaf: Array2<bool>,
    max_depth: usize,
    n_features: usize,
    leaf_scale: f64,
}

impl EnsembleTensors {
    /// Pack quantized trees into padded arrays.
    ///
    /// `leaf_scale` converts a sum of integer leaves back to a raw margin.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] if `n_features` is zero or a split uses a
    /// feature `>= n_features`.
    pub fn from_trees(trees: &[TreeIr<i64>], n_features: usize, leaf_scale: f64) -> Result<Self> {
        if n_features == 0 {
            return Err(Error::invalid_input("ensemble needs at least one input feature"));
        }
        if let Some(feature) = trees.iter().filter_map(TreeIr::max_feature).max() {
            if feature >= n_features {
                return Err(Error::invalid_input(format!(
                    "split on feature {} but inputs have {} features",
                    feature, n_features
                )));
            }
        }

        let n_trees = trees.len();
        let max_nodes = trees.iter().map(TreeIr::n_nodes).max().unwrap_or(0);
        let max_depth = trees.iter().map(TreeIr::depth).max().unwrap_or(0);
        let shape = (n_trees, max_nodes);

        // Padding defaults: self-pointing zero-valued leaves.
        let mut features = Array2::<usize>::zeros(shape);
        let mut thresholds = Array2::<i64>::zeros(shape);
        let mut left = Array2::from_shape_fn(shape, |(_, k)| k as NodeId);
        let mut right = left.clone();
        let mut leaf_values = Array2::<i64>::zeros(shape);
        let mut is_leaf = Array2::from_elem(shape, true);

        for (t, tree) in trees.iter().enumerate() {
            for (k, node) in tree.nodes().iter().enumerate() {
                match node {
                    IrNode::Split {
                        feature,
                        threshold,
                        left: l,
                        right: r,
                    } => {
                        features[[t, k]] = *feature;
                        thresholds[[t, k]] = *threshold;
                        left[[t, k]] = *l;
                        right[[t, k]] = *r;
                        is_leaf[[t, k]] = false;
                    }
                    IrNode::Leaf { value } => {
                        leaf_values[[t, k]] = *value;
                    }
                }
            }
        }

        Ok(Self {
            features,
            thresholds,
            left,
            right,
            leaf_values,
            is_leaf,
            max_depth,
            n_features,
            leaf_scale,
        })
    }

    #[inline]
    pub fn n_trees(&self) -> usize {
        self.features.nrows()
    }

    /// Padded node count per tree.
    #[inline]
    pub fn max_nodes(&self) -> usize {
        self.features.ncols()
    }

    #[inline]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Real value of one unit of summed integer leaves.
    #[inline]
    pub fn leaf_scale(&self) -> f64 {
        self.leaf_scale
    }

    pub fn features(&self) -> &Array2<usize> {
        &self.features
    }

    pub fn thresholds(&self) -> &Array2<i64> {
        &self.thresholds
    }

    pub fn left(&self) -> &Array2<NodeId> {
        &self.left
    }

    pub fn right(&self) -> &Array2<NodeId> {
        &self.right
    }

    pub fn leaf_values(&self) -> &Array2<i64> {
        &self.leaf_values
    }

    pub fn is_leaf(&self) -> &Array2<bool> {
        &self.is_leaf
    }
}
