//! Depth-wise histogram tree growing on integer feature codes.

use ndarray::ArrayView2;
use rand::rngs::StdRng;

use super::gain::GainParams;
use super::sampling::ColumnSampler;
use crate::compat::xgboost::{Tree as XgbTree, TreeParam};
use crate::utils::Parallelism;

/// Parent id XGBoost stores for the root.
const ROOT_PARENT: i32 = i32::MAX;

/// Gradient and hessian sums of one histogram bin.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct GradStats {
    grad: f64,
    hess: f64,
}

impl GradStats {
    #[inline]
    fn add(&mut self, grad: f64, hess: f64) {
        self.grad += grad;
        self.hess += hess;
    }
}

/// Best split found for one feature.
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    /// Rows with `code <= bin` go left.
    bin: i64,
    gain: f64,
}

/// A node in the tree being built.
#[derive(Debug, Clone)]
struct BuildNode {
    parent: i32,
    left: i32,
    right: i32,
    feature: i32,
    /// Split condition for splits, shrunk leaf value for leaves.
    condition: f32,
    base_weight: f32,
    loss_change: f64,
    sum_hess: f64,
}

impl BuildNode {
    fn new(parent: i32) -> Self {
        Self {
            parent,
            left: -1,
            right: -1,
            feature: 0,
            condition: 0.0,
            base_weight: 0.0,
            loss_change: 0.0,
            sum_hess: 0.0,
        }
    }
}

/// A node waiting to be expanded at the current depth.
struct Pending {
    id: usize,
    rows: Vec<usize>,
    stats: GradStats,
}

/// Parameters fixed for every tree of one training run.
#[derive(Debug, Clone)]
pub struct GrowerParams {
    pub max_depth: usize,
    pub learning_rate: f64,
    pub gain: GainParams,
    pub columns: ColumnSampler,
}

/// Grows one regression tree on gradient statistics.
///
/// Codes are non-negative integers; `n_bins[f]` is one more than the largest
/// code of feature `f`. Histograms for the candidate features of a node are
/// built in parallel when allowed.
pub struct TreeGrower<'c, 'a> {
    codes: ArrayView2<'c, i64>,
    n_bins: &'a [usize],
    params: &'a GrowerParams,
    parallelism: Parallelism,
}

impl<'c, 'a> TreeGrower<'c, 'a> {
    pub fn new(
        codes: ArrayView2<'c, i64>,
        n_bins: &'a [usize],
        params: &'a GrowerParams,
        parallelism: Parallelism,
    ) -> Self {
        Self {
            codes,
            n_bins,
            params,
            parallelism,
        }
    }

    /// Grow a tree level by level and emit it in XGBoost's node-array layout.
    ///
    /// Leaf values in `split_conditions` already include the learning rate.
    pub fn grow(
        &self,
        tree_id: i32,
        rows: Vec<usize>,
        tree_features: &[usize],
        grad: &[f64],
        hess: &[f64],
        rng: &mut StdRng,
    ) -> XgbTree {
        let gain = &self.params.gain;
        let mut stats = GradStats::default();
        for &r in &rows {
            stats.add(grad[r], hess[r]);
        }

        let mut nodes = vec![BuildNode::new(ROOT_PARENT)];
        let mut level = vec![Pending { id: 0, rows, stats }];

        for depth in 0..=self.params.max_depth {
            if level.is_empty() {
                break;
            }
            let level_features = self.params.columns.for_level(tree_features, rng);
            let mut next = Vec::new();

            for pending in level {
                let Pending { id, rows, stats } = pending;
                let weight = gain.leaf_weight(stats.grad, stats.hess);
                nodes[id].base_weight = weight as f32;
                nodes[id].sum_hess = stats.hess;

                let split = if depth < self.params.max_depth && rows.len() > 1 {
                    let node_features = self.params.columns.for_node(&level_features, rng);
                    self.find_split(&rows, &node_features, stats, grad, hess)
                        .filter(|s| gain.keeps_split(s.gain))
                } else {
                    None
                };

                let Some(split) = split else {
                    nodes[id].condition = (self.params.learning_rate * weight) as f32;
                    continue;
                };

                let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                    .into_iter()
                    .partition(|&r| self.codes[[r, split.feature]] <= split.bin);
                let left_stats = sum_stats(&left_rows, grad, hess);
                let right_stats = GradStats {
                    grad: stats.grad - left_stats.grad,
                    hess: stats.hess - left_stats.hess,
                };

                let left_id = nodes.len();
                let right_id = left_id + 1;
                nodes.push(BuildNode::new(id as i32));
                nodes.push(BuildNode::new(id as i32));

                let node = &mut nodes[id];
                node.left = left_id as i32;
                node.right = right_id as i32;
                node.feature = split.feature as i32;
                // x < bin + 0.5 on integers is code <= bin
                node.condition = split.bin as f32 + 0.5;
                node.loss_change = split.gain;

                next.push(Pending {
                    id: left_id,
                    rows: left_rows,
                    stats: left_stats,
                });
                next.push(Pending {
                    id: right_id,
                    rows: right_rows,
                    stats: right_stats,
                });
            }

            level = next;
        }

        into_xgb_tree(tree_id, nodes, self.codes.ncols())
    }

    /// Best split over `features`, ties broken towards the lower feature index.
    fn find_split(
        &self,
        rows: &[usize],
        features: &[usize],
        parent: GradStats,
        grad: &[f64],
        hess: &[f64],
    ) -> Option<SplitCandidate> {
        let candidates = self.parallelism.maybe_par_map(features.to_vec(), |feature| {
            let histogram = self.build_histogram(rows, feature, grad, hess);
            self.best_split_for_feature(feature, &histogram, parent)
        });

        candidates
            .into_iter()
            .flatten()
            .fold(None, |best: Option<SplitCandidate>, c| match best {
                Some(b) if b.gain >= c.gain => Some(b),
                _ => Some(c),
            })
    }

    fn build_histogram(
        &self,
        rows: &[usize],
        feature: usize,
        grad: &[f64],
        hess: &[f64],
    ) -> Vec<GradStats> {
        let mut histogram = vec![GradStats::default(); self.n_bins[feature]];
        let column = self.codes.column(feature);
        for &r in rows {
            histogram[column[r] as usize].add(grad[r], hess[r]);
        }
        histogram
    }

    fn best_split_for_feature(
        &self,
        feature: usize,
        histogram: &[GradStats],
        parent: GradStats,
    ) -> Option<SplitCandidate> {
        let gain = &self.params.gain;
        let mut left = GradStats::default();
        let mut best: Option<SplitCandidate> = None;

        // The last bin cannot be a split point: nothing would go right.
        for (bin, stats) in histogram.iter().enumerate().take(histogram.len().saturating_sub(1)) {
            left.add(stats.grad, stats.hess);
            let right_hess = parent.hess - left.hess;
            if !gain.is_valid_split(left.hess, right_hess) {
                continue;
            }
            let split_gain = gain.split_gain(left.grad, left.hess, parent.grad, parent.hess);
            if best.map_or(true, |b| split_gain > b.gain) {
                best = Some(SplitCandidate {
                    feature,
                    bin: bin as i64,
                    gain: split_gain,
                });
            }
        }
        best
    }
}

fn sum_stats(rows: &[usize], grad: &[f64], hess: &[f64]) -> GradStats {
    let mut stats = GradStats::default();
    for &r in rows {
        stats.add(grad[r], hess[r]);
    }
    stats
}

fn into_xgb_tree(tree_id: i32, nodes: Vec<BuildNode>, n_features: usize) -> XgbTree {
    let n = nodes.len();
    XgbTree {
        tree_param: TreeParam {
            num_nodes: n as i64,
            size_leaf_vector: 1,
            num_feature: n_features as i64,
            num_deleted: 0,
        },
        id: tree_id,
        loss_changes: nodes.iter().map(|n| n.loss_change).collect(),
        sum_hessian: nodes.iter().map(|n| n.sum_hess).collect(),
        base_weights: nodes.iter().map(|n| n.base_weight).collect(),
        left_children: nodes.iter().map(|n| n.left).collect(),
        right_children: nodes.iter().map(|n| n.right).collect(),
        parents: nodes.iter().map(|n| n.parent).collect(),
        split_indices: nodes.iter().map(|n| n.feature).collect(),
        split_conditions: nodes.iter().map(|n| n.condition).collect(),
        split_type: vec![0; n],
        default_left: vec![0; n],
        categories: Vec::new(),
        categories_nodes: Vec::new(),
        categories_segments: Vec::new(),
        categories_sizes: Vec::new(),
    }
}

/// Evaluate an XGBoost tree on one row of codes, following `x < condition`.
pub fn predict_xgb_tree(tree: &XgbTree, row: ndarray::ArrayView1<i64>) -> f64 {
    let mut node = 0usize;
    loop {
        let left = tree.left_children[node];
        if left < 0 {
            return tree.split_conditions[node] as f64;
        }
        let code = row[tree.split_indices[node] as usize] as f32;
        node = if code < tree.split_conditions[node] {
            left as usize
        } else {
            tree.right_children[node] as usize
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};
    use rand::SeedableRng;

    fn params(max_depth: usize) -> GrowerParams {
        GrowerParams {
            max_depth,
            learning_rate: 1.0,
            gain: GainParams {
                reg_lambda: 0.0,
                min_child_weight: 0.0,
                ..Default::default()
            },
            columns: ColumnSampler {
                bytree: 1.0,
                bylevel: 1.0,
                bynode: 1.0,
            },
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0)
    }

    /// Grow one tree with bins and parameters that live only inside this call.
    fn grow_scoped(codes: ArrayView2<'_, i64>, grad: &[f64], hess: &[f64]) -> XgbTree {
        let n_bins: Vec<usize> = codes
            .columns()
            .into_iter()
            .map(|c| c.iter().copied().max().unwrap_or(0) as usize + 1)
            .collect();
        let local = params(2);
        let grower = TreeGrower::new(codes, &n_bins, &local, Parallelism::Sequential);
        let features: Vec<usize> = (0..codes.ncols()).collect();
        grower.grow(0, (0..codes.nrows()).collect(), &features, grad, hess, &mut rng())
    }

    #[test]
    fn finds_perfect_split() {
        // Feature 1 separates gradients, feature 0 is noise.
        let codes = array![[0, 0], [1, 0], [0, 3], [1, 3]];
        let grad = [1.0, 1.0, -1.0, -1.0];
        let hess = [1.0; 4];
        let n_bins = [2, 4];
        let p = params(1);
        let grower = TreeGrower::new(codes.view(), &n_bins, &p, Parallelism::Sequential);

        let tree = grower.grow(0, (0..4).collect(), &[0, 1], &grad, &hess, &mut rng());

        assert_eq!(tree.tree_param.num_nodes, 3);
        assert_eq!(tree.split_indices[0], 1);
        assert_eq!(tree.parents, vec![ROOT_PARENT, 0, 0]);
        assert_eq!(tree.left_children, vec![1, -1, -1]);
        // Any bin in 0..=2 separates; the first reached wins.
        assert_eq!(tree.split_conditions[0], 0.5);
        assert_eq!(tree.split_conditions[1], -1.0);
        assert_eq!(tree.split_conditions[2], 1.0);
        assert!(tree.loss_changes[0] > 0.0);
        assert_eq!(tree.sum_hessian[0], 4.0);
    }

    #[test]
    fn grower_params_can_be_scoped_shorter_than_codes() {
        let codes = array![[0, 0], [1, 0], [0, 3], [1, 3]];
        let grad = [1.0, 1.0, -1.0, -1.0];
        let hess = [1.0; 4];

        let tree = grow_scoped(codes.view(), &grad, &hess);

        assert_eq!(tree.split_indices[0], 1);
        assert_eq!(predict_xgb_tree(&tree, codes.row(0)), -1.0);
    }

    #[test]
    fn constant_gradients_give_single_leaf() {
        let codes = array![[0], [1], [2]];
        let grad = [1.0; 3];
        let hess = [1.0; 3];
        let p = params(3);
        let grower = TreeGrower::new(codes.view(), &[3], &p, Parallelism::Sequential);

        let tree = grower.grow(0, (0..3).collect(), &[0], &grad, &hess, &mut rng());

        assert_eq!(tree.tree_param.num_nodes, 1);
        assert_eq!(tree.left_children, vec![-1]);
        assert_eq!(tree.split_conditions[0], -1.0);
    }

    #[test]
    fn respects_max_depth() {
        let codes = Array2::from_shape_fn((16, 1), |(i, _)| i as i64);
        let grad: Vec<f64> = (0..16).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let hess = vec![1.0; 16];
        let p = params(2);
        let grower = TreeGrower::new(codes.view(), &[16], &p, Parallelism::Parallel);

        let tree = grower.grow(0, (0..16).collect(), &[0], &grad, &hess, &mut rng());

        assert!(tree.tree_param.num_nodes <= 7);
    }

    #[test]
    fn predicts_with_strict_less_than() {
        let codes = array![[0, 0], [1, 0], [0, 3], [1, 3]];
        let grad = [1.0, 1.0, -1.0, -1.0];
        let hess = [1.0; 4];
        let p = params(1);
        let grower = TreeGrower::new(codes.view(), &[2, 4], &p, Parallelism::Sequential);
        let tree = grower.grow(0, (0..4).collect(), &[0, 1], &grad, &hess, &mut rng());

        assert_eq!(predict_xgb_tree(&tree, codes.row(0)), -1.0);
        assert_eq!(predict_xgb_tree(&tree, codes.row(3)), 1.0);
    }
}
