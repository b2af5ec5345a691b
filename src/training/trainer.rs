//! Histogram gradient boosting on quantized feature codes.

use ndarray::{ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::grower::{predict_xgb_tree, GrowerParams, TreeGrower};
use super::logger::TrainingLogger;
use super::objective::LogisticLoss;
use super::sampling::{ColumnSampler, RowSampler};
use super::{BoosterParams, BoostingBackend};
use crate::compat::xgboost::{
    GBTreeModelParam, GradientBooster, Learner, LearnerModelParam, ModelTrees, XgbModel,
};
use crate::error::{Error, Result};
use crate::utils::run_with_threads;

/// Version written into emitted models.
const MODEL_VERSION: [u32; 3] = [2, 0, 3];

/// XGBoost-style second-order boosting with exact histograms over codes.
///
/// Every distinct code of a feature is its own histogram bin, so candidate
/// splits are exactly the midpoints between consecutive codes. The model
/// starts from a zero margin (`base_score = 0.5`).
#[derive(Debug, Clone, Copy, Default)]
pub struct HistGradientBooster;

impl BoostingBackend for HistGradientBooster {
    fn fit(
        &self,
        codes: ArrayView2<i64>,
        labels: ArrayView1<f32>,
        params: &BoosterParams,
    ) -> Result<XgbModel> {
        let n_rows = codes.nrows();
        let n_features = codes.ncols();
        if n_rows == 0 || n_features == 0 {
            return Err(Error::invalid_input("training data must be non-empty"));
        }
        if labels.len() != n_rows {
            return Err(Error::invalid_input(format!(
                "labels have {} entries but codes have {} rows",
                labels.len(),
                n_rows
            )));
        }
        if codes.iter().any(|&c| c < 0) {
            return Err(Error::invalid_input("feature codes must be non-negative"));
        }

        let n_bins: Vec<usize> = codes
            .axis_iter(Axis(1))
            .map(|col| col.iter().copied().max().unwrap_or(0) as usize + 1)
            .collect();
        let labels: Vec<f32> = labels.to_vec();

        let logger = TrainingLogger::new(params.verbosity);
        if labels.iter().all(|&l| l == labels[0]) {
            logger.warn("labels contain a single class; trees will only shift the margin");
        }
        if params.tree_method != "hist" && params.tree_method != "auto" {
            logger.debug(&format!(
                "tree_method '{}' runs as exact histograms over codes",
                params.tree_method
            ));
        }

        run_with_threads(params.n_jobs, |parallelism| {
            let grower_params = GrowerParams {
                max_depth: params.max_depth,
                learning_rate: params.learning_rate as f64,
                gain: params.gain_params(),
                columns: ColumnSampler {
                    bytree: params.colsample_bytree,
                    bylevel: params.colsample_bylevel,
                    bynode: params.colsample_bynode,
                },
            };
            let grower = TreeGrower::new(codes, &n_bins, &grower_params, parallelism);
            let rows = RowSampler {
                subsample: params.subsample,
            };
            let loss = LogisticLoss {
                scale_pos_weight: params.scale_pos_weight as f64,
            };
            let mut rng = StdRng::seed_from_u64(params.seed);

            let mut margins = vec![0.0f64; n_rows];
            let mut grad = vec![0.0f64; n_rows];
            let mut hess = vec![0.0f64; n_rows];
            let mut trees = Vec::with_capacity(params.n_estimators);

            logger.start_training(params.n_estimators, n_rows, n_features);

            for round in 0..params.n_estimators {
                loss.compute_gradients(&margins, &labels, &mut grad, &mut hess);

                let sampled_rows = rows.sample(n_rows, &mut rng);
                let tree_features = grower_params.columns.for_tree(n_features, &mut rng);
                let tree = grower.grow(
                    round as i32,
                    sampled_rows,
                    &tree_features,
                    &grad,
                    &hess,
                    &mut rng,
                );

                for (margin, row) in margins.iter_mut().zip(codes.axis_iter(Axis(0))) {
                    *margin += predict_xgb_tree(&tree, row);
                }
                trees.push(tree);

                if logger.enabled(super::Verbosity::Info) {
                    let train_loss = LogisticLoss::log_loss(&margins, &labels);
                    logger.log_round(round, &[("train-logloss", train_loss)]);
                }
            }

            logger.finish_training(trees.len());
            Ok(build_model(trees, n_features, params))
        })
    }
}

fn build_model(
    trees: Vec<crate::compat::xgboost::Tree>,
    n_features: usize,
    params: &BoosterParams,
) -> XgbModel {
    let num_trees = trees.len();
    XgbModel {
        version: MODEL_VERSION,
        learner: Learner {
            feature_names: Vec::new(),
            feature_types: Vec::new(),
            gradient_booster: GradientBooster::Gbtree {
                model: ModelTrees {
                    trees,
                    tree_info: vec![0; num_trees],
                    gbtree_model_param: GBTreeModelParam {
                        num_trees: num_trees as i64,
                        num_parallel_tree: 1,
                    },
                },
            },
            objective: params.objective.to_xgb(params.scale_pos_weight),
            learner_model_param: LearnerModelParam {
                base_score: 0.5,
                n_class: 0,
                n_features: n_features as i64,
                num_target: 1,
                boost_from_average: false,
            },
        },
    }
}
