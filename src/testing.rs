//! Test fixtures shared by unit and integration tests.
//!
//! - [`data`]: seeded synthetic features and binary labels
//! - [`xgb_stump_model`]: a one-split XGBoost model built in memory

pub mod data;

pub use data::{classification_data, random_features};

use crate::compat::xgboost::{
    GBTreeModelParam, GradientBooster, Learner, LearnerModelParam, ModelTrees, Objective,
    RegLossParam, Tree, TreeParam, XgbModel,
};

/// A `binary:logistic` model with a single stump.
///
/// Node 0 splits on `feature` at `condition` (`x < condition` goes left),
/// node 1 is the left leaf and node 2 the right leaf. Node 0 carries a loss
/// change of 4 and a hessian sum of 10 for importance computations.
pub fn xgb_stump_model(feature: i32, condition: f32, left: f32, right: f32) -> XgbModel {
    let tree = Tree {
        tree_param: TreeParam {
            num_nodes: 3,
            size_leaf_vector: 1,
            num_feature: (feature + 1).max(1) as i64,
            num_deleted: 0,
        },
        id: 0,
        loss_changes: vec![4.0, 0.0, 0.0],
        sum_hessian: vec![10.0, 5.0, 5.0],
        base_weights: vec![0.0, left, right],
        left_children: vec![1, -1, -1],
        right_children: vec![2, -1, -1],
        parents: vec![i32::MAX, 0, 0],
        split_indices: vec![feature, 0, 0],
        split_conditions: vec![condition, left, right],
        split_type: vec![0, 0, 0],
        default_left: vec![0, 0, 0],
        categories: Vec::new(),
        categories_nodes: Vec::new(),
        categories_segments: Vec::new(),
        categories_sizes: Vec::new(),
    };

    XgbModel {
        version: [2, 0, 3],
        learner: Learner {
            feature_names: Vec::new(),
            feature_types: Vec::new(),
            gradient_booster: GradientBooster::Gbtree {
                model: ModelTrees {
                    trees: vec![tree],
                    tree_info: vec![0],
                    gbtree_model_param: GBTreeModelParam {
                        num_trees: 1,
                        num_parallel_tree: 1,
                    },
                },
            },
            objective: Objective::BinaryLogistic {
                reg_loss_param: RegLossParam::default(),
            },
            learner_model_param: LearnerModelParam {
                n_features: (feature + 1).max(1) as i64,
                ..Default::default()
            },
        },
    }
}
