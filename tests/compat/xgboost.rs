//! XGBoost JSON import: parsing, support checks, threshold conversion and
//! tensorization of a model dumped in code space.

use boosters_quant::compat::xgboost::{code_threshold, XgbModel};
use boosters_quant::ir::IrNode;
use boosters_quant::{tree_to_tensors, ConfigError, Error, Framework};

use ndarray::array;
use rstest::rstest;

// =============================================================================
// Fixtures
// =============================================================================

/// Two trees over two code features.
///
/// Tree 0: `f0 < 3.5` ? 0.2 : (`f1 < 2` ? -0.1 : 0.4)
/// Tree 1: `f1 < 0.5` ? -0.3 : 0.3
const GBTREE: &str = r#"{
    "name": "gbtree",
    "model": {
        "gbtree_model_param": { "num_trees": "2", "num_parallel_tree": "1" },
        "tree_info": [0, 0],
        "trees": [
            {
                "tree_param": { "num_nodes": "5", "size_leaf_vector": "1", "num_feature": "2", "num_deleted": "0" },
                "id": 0,
                "loss_changes": [3.0, 0.0, 1.5, 0.0, 0.0],
                "sum_hessian": [20.0, 8.0, 12.0, 5.0, 7.0],
                "base_weights": [0.0, 0.2, 0.1, -0.1, 0.4],
                "left_children": [1, -1, 3, -1, -1],
                "right_children": [2, -1, 4, -1, -1],
                "parents": [2147483647, 0, 0, 2, 2],
                "split_indices": [0, 0, 1, 0, 0],
                "split_conditions": [3.5, 0.2, 2.0, -0.1, 0.4],
                "split_type": [0, 0, 0, 0, 0],
                "default_left": [0, 0, 0, 0, 0],
                "categories": [],
                "categories_nodes": [],
                "categories_segments": [],
                "categories_sizes": []
            },
            {
                "tree_param": { "num_nodes": "3", "size_leaf_vector": "1", "num_feature": "2", "num_deleted": "0" },
                "id": 1,
                "loss_changes": [2.0, 0.0, 0.0],
                "sum_hessian": [20.0, 10.0, 10.0],
                "base_weights": [0.0, -0.3, 0.3],
                "left_children": [1, -1, -1],
                "right_children": [2, -1, -1],
                "parents": [2147483647, 0, 0],
                "split_indices": [1, 0, 0],
                "split_conditions": [0.5, -0.3, 0.3],
                "default_left": [0, 0, 0]
            }
        ]
    }
}"#;

const GBLINEAR: &str = r#"{ "name": "gblinear", "model": { "weights": [0.1, 0.2, 0.0] } }"#;

fn model_json(booster: &str, objective: &str, base_score: &str, num_class: u32) -> String {
    format!(
        r#"{{
            "version": [2, 0, 3],
            "learner": {{
                "feature_names": [],
                "feature_types": [],
                "gradient_booster": {booster},
                "objective": {objective},
                "learner_model_param": {{
                    "base_score": "{base_score}",
                    "boost_from_average": "1",
                    "num_class": "{num_class}",
                    "num_feature": "2",
                    "num_target": "1"
                }}
            }}
        }}"#
    )
}

fn logistic() -> &'static str {
    r#"{ "name": "binary:logistic", "reg_loss_param": { "scale_pos_weight": "1" } }"#
}

fn parse(booster: &str, objective: &str, base_score: &str, num_class: u32) -> XgbModel {
    XgbModel::from_json_str(&model_json(booster, objective, base_score, num_class)).unwrap()
}

// =============================================================================
// Extraction
// =============================================================================

#[rstest]
#[case(3.5, 3)]
#[case(2.0, 1)]
#[case(0.5, 0)]
#[case(-0.5, -1)]
fn condition_maps_to_code_threshold(#[case] condition: f32, #[case] expected: i64) {
    assert_eq!(code_threshold(condition), expected);
}

#[test]
fn extracts_integer_thresholds_from_dump() {
    let model = parse(GBTREE, logistic(), "5E-1", 0);
    let trees = model.extract_trees(2).unwrap();

    assert_eq!(trees.len(), 2);
    assert_eq!(trees[0].n_nodes(), 5);
    assert_eq!(trees[0].depth(), 2);

    match &trees[0].nodes()[0] {
        IrNode::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            assert_eq!((*feature, *threshold, *left, *right), (0, 3, 1, 2));
        }
        other => panic!("expected split at root, got {other:?}"),
    }
    match &trees[0].nodes()[2] {
        IrNode::Split {
            feature, threshold, ..
        } => assert_eq!((*feature, *threshold), (1, 1)),
        other => panic!("expected split at node 2, got {other:?}"),
    }

    let leaves: Vec<f64> = trees[1].leaf_values().copied().collect();
    assert_eq!(leaves.len(), 2);
    assert!((leaves[0] + 0.3).abs() < 1e-6);
    assert!((leaves[1] - 0.3).abs() < 1e-6);
}

#[test]
fn split_on_missing_feature_is_rejected() {
    let model = parse(GBTREE, logistic(), "0.5", 0);

    assert!(matches!(model.extract_trees(1), Err(Error::Conversion(_))));
}

#[test]
fn tensorized_dump_reproduces_leaf_sums() {
    let model = parse(GBTREE, logistic(), "[5E-1]", 0);
    let codes = array![[0, 0], [3, 1], [4, 1], [4, 2], [7, 0], [7, 5]];

    let (predictor, q_y) = tree_to_tensors(&model, codes.view(), Framework::XGBoost, 8).unwrap();
    let raw = predictor.predict_raw(codes.view()).unwrap();

    let expected = [
        0.2 - 0.3,
        0.2 + 0.3,
        -0.1 + 0.3,
        0.4 + 0.3,
        -0.1 - 0.3,
        0.4 + 0.3,
    ];
    // Each of the two leaves is off by at most half a quantization step
    let tolerance = predictor.tensors().leaf_scale();
    for (row, want) in expected.into_iter().enumerate() {
        assert!(
            (raw[[row, 0]] - want).abs() <= tolerance,
            "row {row}: got {}, want {want}",
            raw[[row, 0]]
        );
    }
    assert_eq!(q_y.n_bits(), 8);
    assert_eq!(predictor.n_trees(), 2);
}

// =============================================================================
// Unsupported models
// =============================================================================

#[test]
fn rejects_linear_booster() {
    let model = parse(GBLINEAR, logistic(), "0.5", 0);

    assert_eq!(
        model.check_supported(),
        Err(ConfigError::UnsupportedBooster("gblinear".into()))
    );
    assert!(matches!(
        model.extract_trees(2),
        Err(Error::Configuration(ConfigError::UnsupportedBooster(_)))
    ));
}

#[test]
fn rejects_dart_booster() {
    let dart = format!(r#"{{ "name": "dart", "gbtree": {GBTREE}, "weight_drop": [1.0, 1.0] }}"#);
    let model = parse(&dart, logistic(), "0.5", 0);

    assert_eq!(
        model.check_supported(),
        Err(ConfigError::UnsupportedBooster("dart".into()))
    );
}

#[test]
fn rejects_multiclass_objective() {
    let softprob = r#"{ "name": "multi:softprob", "softmax_multiclass_param": { "num_class": "3" } }"#;
    let model = parse(GBTREE, softprob, "0.5", 3);

    assert!(matches!(
        model.check_supported(),
        Err(ConfigError::UnsupportedObjective(_))
    ));
}

#[test]
fn rejects_shifted_base_score() {
    let model = parse(GBTREE, logistic(), "0.7", 0);

    match model.check_supported() {
        Err(ConfigError::UnsupportedBaseScore(v)) => assert!((v - 0.7).abs() < 1e-6),
        other => panic!("expected base score rejection, got {other:?}"),
    }
}

#[test]
fn logitraw_is_accepted() {
    let raw = r#"{ "name": "binary:logitraw", "reg_loss_param": { "scale_pos_weight": "1" } }"#;
    let model = parse(GBTREE, raw, "0.5", 0);

    assert!(model.check_supported().is_ok());
}
