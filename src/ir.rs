//! Framework-neutral tree representation over quantized inputs.
//!
//! This module provides:
//! - [`TreeIr`]: a validated, immutable node list for one tree
//! - [`IrNode`]: split or leaf entry
//! - [`TreeValidationError`]: structural validation errors
//! - [`scalar_predict`]: the node-by-node reference evaluator
//!
//! Splits compare integer feature codes: a sample goes left when
//! `code[feature] <= threshold`.

use ndarray::{Array1, ArrayView1, ArrayView2, Axis};

/// Node identifier, an index into the tree's node list.
pub type NodeId = u32;

// ============================================================================
// IrNode
// ============================================================================

/// One node of a [`TreeIr`].
#[derive(Debug, Clone, PartialEq)]
pub enum IrNode<L> {
    /// Internal node. Samples with `code[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: i64,
        left: NodeId,
        right: NodeId,
    },
    /// Terminal node holding the tree's contribution.
    Leaf { value: L },
}

impl<L> IrNode<L> {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, IrNode::Leaf { .. })
    }
}

// ============================================================================
// TreeValidationError
// ============================================================================

/// Structural validation errors for [`TreeIr`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeValidationError {
    #[error("tree has no nodes")]
    EmptyTree,
    #[error("node {node} references {side} child {child}, but the tree has {n_nodes} nodes")]
    ChildOutOfBounds {
        node: NodeId,
        side: &'static str,
        child: NodeId,
        n_nodes: usize,
    },
    #[error("node {node} references itself as a child")]
    SelfLoop { node: NodeId },
    #[error("node {node} is reachable by more than one path")]
    DuplicateVisit { node: NodeId },
    #[error("node {node} is not reachable from the root")]
    UnreachableNode { node: NodeId },
}

// ============================================================================
// TreeIr
// ============================================================================

/// A strict binary tree over quantized feature codes.
///
/// Node 0 is the root. Construction guarantees every node is reachable from
/// the root exactly once, so the structure has no cycles or shared subtrees.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeIr<L> {
    nodes: Vec<IrNode<L>>,
    depth: usize,
}

impl<L> TreeIr<L> {
    /// Build and validate a tree.
    pub fn new(nodes: Vec<IrNode<L>>) -> Result<Self, TreeValidationError> {
        let depth = validate(&nodes)?;
        Ok(Self { nodes, depth })
    }

    /// A tree with a single leaf.
    pub fn leaf(value: L) -> Self {
        Self {
            nodes: vec![IrNode::Leaf { value }],
            depth: 0,
        }
    }

    pub fn nodes(&self) -> &[IrNode<L>] {
        &self.nodes
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Iterate over leaf values in node order.
    pub fn leaf_values(&self) -> impl Iterator<Item = &L> {
        self.nodes.iter().filter_map(|n| match n {
            IrNode::Leaf { value } => Some(value),
            IrNode::Split { .. } => None,
        })
    }

    /// Largest feature index used by any split.
    pub fn max_feature(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                IrNode::Split { feature, .. } => Some(*feature),
                IrNode::Leaf { .. } => None,
            })
            .max()
    }

    /// Same topology with every leaf value mapped through `f`.
    pub fn map_leaves<M>(&self, mut f: impl FnMut(&L) -> M) -> TreeIr<M> {
        let nodes = self
            .nodes
            .iter()
            .map(|n| match n {
                IrNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => IrNode::Split {
                    feature: *feature,
                    threshold: *threshold,
                    left: *left,
                    right: *right,
                },
                IrNode::Leaf { value } => IrNode::Leaf { value: f(value) },
            })
            .collect();
        TreeIr {
            nodes,
            depth: self.depth,
        }
    }

    /// Walk from the root to the leaf reached by `codes`.
    ///
    /// `codes` must hold at least `max_feature() + 1` entries.
    #[inline]
    pub fn traverse(&self, codes: ArrayView1<i64>) -> NodeId {
        let mut node: NodeId = 0;
        while let IrNode::Split {
            feature,
            threshold,
            left,
            right,
        } = &self.nodes[node as usize]
        {
            node = if codes[*feature] <= *threshold {
                *left
            } else {
                *right
            };
        }
        node
    }
}

impl<L: Copy> TreeIr<L> {
    /// Leaf value reached by `codes`.
    #[inline]
    pub fn predict_row(&self, codes: ArrayView1<i64>) -> L {
        match &self.nodes[self.traverse(codes) as usize] {
            IrNode::Leaf { value } => *value,
            IrNode::Split { .. } => unreachable!("traverse always stops at a leaf"),
        }
    }
}

/// Reference evaluator: sum of leaf values reached by each row, one tree at
/// a time, one row at a time.
pub fn scalar_predict(trees: &[TreeIr<i64>], codes: ArrayView2<i64>) -> Array1<i64> {
    codes
        .axis_iter(Axis(0))
        .map(|row| trees.iter().map(|t| t.predict_row(row)).sum::<i64>())
        .collect()
}

/// Check topology with an explicit stack and return the tree depth.
fn validate<L>(nodes: &[IrNode<L>]) -> Result<usize, TreeValidationError> {
    let n_nodes = nodes.len();
    if n_nodes == 0 {
        return Err(TreeValidationError::EmptyTree);
    }

    let mut visited = vec![false; n_nodes];
    let mut stack: Vec<(NodeId, usize)> = vec![(0, 0)];
    let mut max_depth = 0;

    while let Some((node, depth)) = stack.pop() {
        let idx = node as usize;
        if visited[idx] {
            return Err(TreeValidationError::DuplicateVisit { node });
        }
        visited[idx] = true;
        max_depth = max_depth.max(depth);

        if let IrNode::Split { left, right, .. } = &nodes[idx] {
            for (side, child) in [("left", *left), ("right", *right)] {
                if child == node {
                    return Err(TreeValidationError::SelfLoop { node });
                }
                if child as usize >= n_nodes {
                    return Err(TreeValidationError::ChildOutOfBounds {
                        node,
                        side,
                        child,
                        n_nodes,
                    });
                }
                stack.push((child, depth + 1));
            }
        }
    }

    // Every node reached once from the root means no node has two parents,
    // which also rules out cycles.
    if let Some(node) = visited.iter().position(|v| !v) {
        return Err(TreeValidationError::UnreachableNode {
            node: node as NodeId,
        });
    }

    Ok(max_depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn split<L>(feature: usize, threshold: i64, left: NodeId, right: NodeId) -> IrNode<L> {
        IrNode::Split {
            feature,
            threshold,
            left,
            right,
        }
    }

    /// ```text
    ///        0: f0 <= 3
    ///       /          \
    ///   1: f1 <= 1    2: leaf 30
    ///   /       \
    /// 3: leaf 10  4: leaf 20
    /// ```
    fn small_tree() -> TreeIr<i64> {
        TreeIr::new(vec![
            split(0, 3, 1, 2),
            split(1, 1, 3, 4),
            IrNode::Leaf { value: 30 },
            IrNode::Leaf { value: 10 },
            IrNode::Leaf { value: 20 },
        ])
        .unwrap()
    }

    #[test]
    fn traverse_uses_less_or_equal() {
        let tree = small_tree();

        assert_eq!(tree.predict_row(array![3, 1].view()), 10);
        assert_eq!(tree.predict_row(array![3, 2].view()), 20);
        assert_eq!(tree.predict_row(array![4, 0].view()), 30);
    }

    #[test]
    fn shape_accessors() {
        let tree = small_tree();

        assert_eq!(tree.n_nodes(), 5);
        assert_eq!(tree.n_leaves(), 3);
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.max_feature(), Some(1));
        assert_eq!(tree.leaf_values().copied().collect::<Vec<_>>(), vec![30, 10, 20]);
    }

    #[test]
    fn map_leaves_keeps_topology() {
        let tree = small_tree().map_leaves(|v| *v as f64 / 10.0);

        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.predict_row(array![0, 5].view()), 2.0);
    }

    #[test]
    fn scalar_predict_sums_trees() {
        let trees = vec![small_tree(), TreeIr::leaf(-5)];
        let codes = array![[0, 0], [9, 9]];

        assert_eq!(scalar_predict(&trees, codes.view()).to_vec(), vec![5, 25]);
    }

    #[test]
    fn rejects_empty_tree() {
        assert_eq!(
            TreeIr::<f64>::new(vec![]).unwrap_err(),
            TreeValidationError::EmptyTree
        );
    }

    #[test]
    fn rejects_child_out_of_bounds() {
        let err = TreeIr::new(vec![
            split(0, 0, 1, 7),
            IrNode::Leaf { value: 1.0 },
        ])
        .unwrap_err();

        assert!(matches!(
            err,
            TreeValidationError::ChildOutOfBounds { node: 0, side: "right", child: 7, .. }
        ));
    }

    #[test]
    fn rejects_self_loop() {
        let err = TreeIr::new(vec![
            split(0, 0, 0, 1),
            IrNode::Leaf { value: 1.0 },
        ])
        .unwrap_err();

        assert_eq!(err, TreeValidationError::SelfLoop { node: 0 });
    }

    #[test]
    fn rejects_shared_child() {
        let err = TreeIr::new(vec![
            split(0, 0, 1, 1),
            IrNode::Leaf { value: 1.0 },
        ])
        .unwrap_err();

        assert_eq!(err, TreeValidationError::DuplicateVisit { node: 1 });
    }

    #[test]
    fn rejects_cycle() {
        let err = TreeIr::new(vec![
            split(0, 0, 1, 2),
            split(0, 0, 0, 2),
            IrNode::Leaf { value: 1.0 },
        ])
        .unwrap_err();

        assert!(matches!(err, TreeValidationError::DuplicateVisit { .. }));
    }

    #[test]
    fn rejects_unreachable_node() {
        let err = TreeIr::new(vec![
            split(0, 0, 1, 2),
            IrNode::Leaf { value: 1.0 },
            IrNode::Leaf { value: 2.0 },
            IrNode::Leaf { value: 3.0 },
        ])
        .unwrap_err();

        assert_eq!(err, TreeValidationError::UnreachableNode { node: 3 });
    }
}
