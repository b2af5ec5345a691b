//! XGBoost JSON model layout.
//!
//! Parses the XGBoost >= 1.6 JSON format. These are "foreign types" describing the
//! native node arrays; [`super::extract`] turns them into [`crate::ir::TreeIr`].
//! The histogram backend in [`crate::training`] emits the same layout, so models
//! trained there and models dumped by XGBoost itself go through one code path.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use serde_with::{serde_as, DisplayFromStr};

// =============================================================================
// Custom deserializers for XGBoost-specific formats
// =============================================================================

fn deserialize_base_score<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as SerdeError;

    let value = Value::deserialize(deserializer)?;
    // Unwrap arrays and stringified arrays down to a scalar
    let mut cur = value;
    loop {
        match cur {
            Value::Number(n) => {
                return n
                    .as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| SerdeError::custom("invalid number"));
            }
            Value::String(s) => {
                if let Ok(f) = s.parse::<f32>() {
                    return Ok(f);
                }
                // bracketed like "[5E-1]"
                let t = s.trim();
                if let Some(inner) = t.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
                    if let Ok(f) = inner.parse::<f32>() {
                        return Ok(f);
                    }
                }
                match serde_json::from_str::<Vec<Value>>(&s) {
                    Ok(arr) => match arr.into_iter().next() {
                        Some(first) => cur = first,
                        None => return Err(SerdeError::custom("empty array")),
                    },
                    Err(_) => {
                        return Err(SerdeError::custom(format!(
                            "cannot parse base_score from string: {}",
                            s
                        )))
                    }
                }
            }
            Value::Array(arr) => match arr.into_iter().next() {
                Some(first) => cur = first,
                None => return Err(SerdeError::custom("empty array")),
            },
            _ => {
                return Err(SerdeError::custom(
                    "base_score must be number, string, or array",
                ));
            }
        }
    }
}

fn deserialize_bool_any<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as SerdeError;

    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Bool(b) => Ok(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i != 0);
            }
            if let Some(f) = n.as_f64() {
                return Ok(f != 0.0);
            }
            Err(SerdeError::custom("invalid number for bool"))
        }
        Value::String(s) => {
            let t = s.trim();
            if t.eq_ignore_ascii_case("true") || t == "1" {
                return Ok(true);
            }
            if t.eq_ignore_ascii_case("false") || t == "0" {
                return Ok(false);
            }
            Err(SerdeError::custom(format!(
                "cannot parse bool from string: {}",
                s
            )))
        }
        _ => Err(SerdeError::custom("unsupported type for bool")),
    }
}

fn default_scale_pos_weight() -> f32 {
    1.0
}
fn default_num_target() -> i64 {
    1
}
fn default_boost_from_average() -> bool {
    true
}

// =============================================================================
// Tree / model level definitions
// =============================================================================

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeParam {
    #[serde_as(as = "DisplayFromStr")]
    pub num_nodes: i64,
    #[serde_as(as = "DisplayFromStr")]
    pub size_leaf_vector: i64,
    #[serde_as(as = "DisplayFromStr")]
    pub num_feature: i64,
    #[serde_as(as = "DisplayFromStr")]
    pub num_deleted: i64,
}

/// Node arrays of one tree, indexed by node id.
///
/// A node is a leaf when `left_children[i] == -1`; its value is then stored in
/// `split_conditions[i]`. Split nodes route left when `x < split_conditions[i]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub tree_param: TreeParam,
    pub id: i32,
    pub loss_changes: Vec<f64>,
    pub sum_hessian: Vec<f64>,
    pub base_weights: Vec<f32>,
    pub left_children: Vec<i32>,
    pub right_children: Vec<i32>,
    pub parents: Vec<i32>,
    pub split_indices: Vec<i32>,
    pub split_conditions: Vec<f32>,
    #[serde(default)]
    pub split_type: Vec<i32>,
    pub default_left: Vec<i32>,
    #[serde(default)]
    pub categories: Vec<i32>,
    #[serde(default)]
    pub categories_nodes: Vec<i32>,
    #[serde(default)]
    pub categories_segments: Vec<i32>,
    #[serde(default)]
    pub categories_sizes: Vec<i32>,
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GBTreeModelParam {
    #[serde_as(as = "DisplayFromStr")]
    pub num_trees: i64,
    #[serde_as(as = "DisplayFromStr")]
    pub num_parallel_tree: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelTrees {
    pub trees: Vec<Tree>,
    pub tree_info: Vec<i32>,
    pub gbtree_model_param: GBTreeModelParam,
}

impl ModelTrees {
    /// Number of trees in this model.
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}

// =============================================================================
// Gradient booster variants (gbtree | gblinear | dart)
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbLinearModel {
    pub weights: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GBTreeDefinition {
    pub name: String,
    pub model: ModelTrees,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum GradientBooster {
    Gbtree {
        model: ModelTrees,
    },
    Gblinear {
        model: GbLinearModel,
    },
    Dart {
        gbtree: GBTreeDefinition,
        weight_drop: Vec<f32>,
    },
}

impl GradientBooster {
    /// Booster name as it appears in XGBoost JSON.
    pub fn name(&self) -> &'static str {
        match self {
            GradientBooster::Gbtree { .. } => "gbtree",
            GradientBooster::Gblinear { .. } => "gblinear",
            GradientBooster::Dart { .. } => "dart",
        }
    }
}

// =============================================================================
// Objective / learner-level definitions
// =============================================================================

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegLossParam {
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "default_scale_pos_weight")]
    pub scale_pos_weight: f32,
}

impl Default for RegLossParam {
    fn default() -> Self {
        Self {
            scale_pos_weight: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureType {
    #[serde(rename = "float", alias = "float32", alias = "f")]
    Float,
    #[serde(rename = "int", alias = "i")]
    Int,
    #[serde(rename = "indicator")]
    Indicator,
    #[serde(rename = "q", alias = "quantitative")]
    Quantitative,
    #[serde(rename = "c", alias = "categorical")]
    Categorical,
}

/// Learning objective.
///
/// Only the logistic family is modelled in detail; every other XGBoost
/// objective parses as [`Objective::Other`] and is rejected on extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum Objective {
    #[serde(rename = "binary:logistic")]
    BinaryLogistic {
        #[serde(default)]
        reg_loss_param: RegLossParam,
    },
    #[serde(rename = "binary:logitraw")]
    BinaryLogitRaw {
        #[serde(default)]
        reg_loss_param: RegLossParam,
    },
    #[serde(rename = "reg:logistic")]
    RegLogistic {
        #[serde(default)]
        reg_loss_param: RegLossParam,
    },
    #[serde(other)]
    Other,
}

impl Objective {
    /// Get the objective name as it appears in XGBoost JSON.
    pub fn name(&self) -> &'static str {
        match self {
            Objective::BinaryLogistic { .. } => "binary:logistic",
            Objective::BinaryLogitRaw { .. } => "binary:logitraw",
            Objective::RegLogistic { .. } => "reg:logistic",
            Objective::Other => "other",
        }
    }

    /// Whether the model output is a binary classification margin.
    pub fn is_binary_margin(&self) -> bool {
        matches!(
            self,
            Objective::BinaryLogistic { .. } | Objective::BinaryLogitRaw { .. }
        )
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerModelParam {
    #[serde(deserialize_with = "deserialize_base_score")]
    pub base_score: f32,
    #[serde(rename = "num_class")]
    #[serde_as(as = "DisplayFromStr")]
    pub n_class: i64,
    #[serde(rename = "num_feature")]
    #[serde_as(as = "DisplayFromStr")]
    pub n_features: i64,
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "default_num_target")]
    pub num_target: i64,
    #[serde(deserialize_with = "deserialize_bool_any")]
    #[serde(default = "default_boost_from_average")]
    pub boost_from_average: bool,
}

impl Default for LearnerModelParam {
    fn default() -> Self {
        Self {
            base_score: 0.5,
            n_class: 0,
            n_features: 0,
            num_target: 1,
            boost_from_average: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Learner {
    #[serde(default)]
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub feature_types: Vec<FeatureType>,
    pub gradient_booster: GradientBooster,
    pub objective: Objective,
    pub learner_model_param: LearnerModelParam,
}

// =============================================================================
// Top-level XGBoost model
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XgbModel {
    pub version: [u32; 3],
    pub learner: Learner,
}

impl XgbModel {
    /// Load a model from a JSON file.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use boosters_quant::compat::xgboost::XgbModel;
    ///
    /// let model = XgbModel::from_file("model.json")?;
    /// ```
    pub fn from_file(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Parse a model from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parse a model from a serde_json Value.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }

    /// Tree list of a gbtree or dart booster.
    pub fn model_trees(&self) -> Option<&ModelTrees> {
        match &self.learner.gradient_booster {
            GradientBooster::Gbtree { model } => Some(model),
            GradientBooster::Dart { gbtree, .. } => Some(&gbtree.model),
            GradientBooster::Gblinear { .. } => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn base_score_parses_number_string_array_and_bracketed() {
        let v_num = json!({"base_score": 0.5, "num_class": "0", "num_feature": "2"});
        let p_num: LearnerModelParam = serde_json::from_value(v_num).unwrap();
        assert_eq!(p_num.base_score, 0.5);

        let v_str = json!({"base_score": "5E-1", "num_class": "0", "num_feature": "2"});
        let p_str: LearnerModelParam = serde_json::from_value(v_str).unwrap();
        assert_eq!(p_str.base_score, 0.5);

        let v_arr = json!({"base_score": [0.5], "num_class": "0", "num_feature": "2"});
        let p_arr: LearnerModelParam = serde_json::from_value(v_arr).unwrap();
        assert_eq!(p_arr.base_score, 0.5);

        let v_bracketed = json!({"base_score": "[5E-1]", "num_class": "0", "num_feature": "2"});
        let p_bracketed: LearnerModelParam = serde_json::from_value(v_bracketed).unwrap();
        assert_eq!(p_bracketed.base_score, 0.5);
    }

    #[test]
    fn boost_from_average_accepts_various_types() {
        let v_int = json!({"base_score": 0.5, "num_class": "0", "num_feature": "0", "boost_from_average": 1});
        let p_int: LearnerModelParam = serde_json::from_value(v_int).unwrap();
        assert!(p_int.boost_from_average);

        let v_false_str = json!({"base_score": 0.5, "num_class": "0", "num_feature": "0", "boost_from_average": "0"});
        let p_false_str: LearnerModelParam = serde_json::from_value(v_false_str).unwrap();
        assert!(!p_false_str.boost_from_average);
    }

    #[test]
    fn unknown_objectives_parse_as_other() {
        let obj: Objective =
            serde_json::from_value(json!({"name": "reg:squarederror", "reg_loss_param": {}}))
                .unwrap();
        assert!(matches!(obj, Objective::Other));
        assert!(!obj.is_binary_margin());

        let obj: Objective = serde_json::from_value(
            json!({"name": "binary:logistic", "reg_loss_param": {"scale_pos_weight": "2"}}),
        )
        .unwrap();
        assert!(obj.is_binary_margin());
        assert_eq!(obj.name(), "binary:logistic");
    }

    #[test]
    fn gblinear_has_no_trees() {
        let booster: GradientBooster =
            serde_json::from_value(json!({"name": "gblinear", "model": {"weights": [0.1, 0.2]}}))
                .unwrap();
        assert_eq!(booster.name(), "gblinear");
    }
}
