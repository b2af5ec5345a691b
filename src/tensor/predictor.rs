//! Branch-free batch evaluation of [`EnsembleTensors`].

use std::sync::Arc;

use ndarray::{Array1, Array2, ArrayView2, Axis, Zip};

use super::EnsembleTensors;
use crate::error::{Error, Result};
use crate::ir::NodeId;

/// Evaluates a tensorized ensemble on quantized feature codes.
///
/// Pure and immutable: the only state is the shared tensor bundle, so clones
/// are cheap and a predictor can be used from several threads at once.
///
/// Evaluation runs level by level over the whole batch instead of walking
/// each tree per row:
///
/// 1. compare every node of every tree against its feature code at once
/// 2. advance all `(sample, tree)` positions to the chosen child,
///    `max_depth` times
/// 3. gather leaf values at the final positions, masked by the leaf mask
/// 4. sum over trees
#[derive(Debug, Clone)]
pub struct TensorPredictor {
    tensors: Arc<EnsembleTensors>,
}

impl TensorPredictor {
    pub fn new(tensors: EnsembleTensors) -> Self {
        Self {
            tensors: Arc::new(tensors),
        }
    }

    pub fn tensors(&self) -> &EnsembleTensors {
        &self.tensors
    }

    pub fn n_features(&self) -> usize {
        self.tensors.n_features()
    }

    pub fn n_trees(&self) -> usize {
        self.tensors.n_trees()
    }

    /// Per-tree integer leaf contributions, shape `[n_samples, n_trees]`.
    pub fn predict_tree_codes(&self, codes: ArrayView2<i64>) -> Result<Array2<i64>> {
        self.check_width(codes.ncols())?;

        let t = &*self.tensors;
        let n_samples = codes.nrows();
        let (n_trees, max_nodes) = (t.n_trees(), t.max_nodes());

        // [n_samples, n_trees * max_nodes]: code seen by each node, flattened
        // tree-major so column `tree * max_nodes + node` belongs to that node.
        let node_features: Vec<usize> = t.features().iter().copied().collect();
        let node_thresholds: Array1<i64> = t.thresholds().iter().copied().collect();
        let node_codes = codes.select(Axis(1), &node_features);
        let goes_left: Array2<bool> = Zip::from(&node_codes)
            .and_broadcast(&node_thresholds)
            .map_collect(|&code, &threshold| code <= threshold);

        let mut positions = Array2::<NodeId>::zeros((n_samples, n_trees));
        for _ in 0..t.max_depth() {
            Zip::indexed(&mut positions).for_each(|(s, tree), pos| {
                let node = *pos as usize;
                *pos = if goes_left[[s, tree * max_nodes + node]] {
                    t.left()[[tree, node]]
                } else {
                    t.right()[[tree, node]]
                };
            });
        }

        let contributions = Zip::indexed(&positions).map_collect(|(_, tree), &pos| {
            let node = pos as usize;
            let mask = i64::from(t.is_leaf()[[tree, node]]);
            t.leaf_values()[[tree, node]] * mask
        });

        Ok(contributions)
    }

    /// Integer ensemble sums, shape `[n_samples, 1]`.
    pub fn predict_codes(&self, codes: ArrayView2<i64>) -> Result<Array2<i64>> {
        let per_tree = self.predict_tree_codes(codes)?;
        Ok(per_tree.sum_axis(Axis(1)).insert_axis(Axis(1)))
    }

    /// Raw signed margin, shape `[n_samples, 1]`.
    pub fn predict_raw(&self, codes: ArrayView2<i64>) -> Result<Array2<f64>> {
        let scale = self.tensors.leaf_scale();
        Ok(self.predict_codes(codes)?.mapv(|sum| sum as f64 * scale))
    }

    fn check_width(&self, n_cols: usize) -> Result<()> {
        if n_cols != self.tensors.n_features() {
            return Err(Error::invalid_input(format!(
                "expected {} feature codes per row, got {}",
                self.tensors.n_features(),
                n_cols
            )));
        }
        Ok(())
    }
}
