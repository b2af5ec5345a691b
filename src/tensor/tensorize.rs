//! Conversion of a fitted ensemble into a bound [`TensorPredictor`].

use ndarray::{Array1, ArrayView2};
use tracing::debug;

use super::{EnsembleTensors, TensorPredictor};
use crate::compat::{Framework, TreeEnsemble};
use crate::error::{ConfigError, Error, Result};
use crate::ir::TreeIr;
use crate::quantization::QuantizedArray;

/// Tensorize an ensemble trained on `codes` and fit its output quantizer.
///
/// Leaf values of all trees are quantized jointly at `output_n_bits` and
/// shifted by the zero point, so a sum of integer leaves times the leaf scale
/// is the raw margin. The returned quantizer is fitted on the margins of the
/// training codes.
///
/// # Errors
///
/// - [`ConfigError::FrameworkMismatch`] if `framework` is not the ensemble's
/// - anything [`TreeEnsemble::extract_trees`] raises
/// - [`Error::InvalidInput`] for an ensemble without trees or an empty batch
pub fn tree_to_tensors(
    model: &impl TreeEnsemble,
    codes: ArrayView2<i64>,
    framework: Framework,
    output_n_bits: u32,
) -> Result<(TensorPredictor, QuantizedArray)> {
    if model.framework() != framework {
        return Err(ConfigError::FrameworkMismatch {
            requested: framework.name(),
            actual: model.framework().name(),
        }
        .into());
    }
    if codes.nrows() == 0 {
        return Err(Error::invalid_input("cannot tensorize on an empty batch"));
    }

    let n_features = codes.ncols();
    let trees = model.extract_trees(n_features)?;
    if trees.is_empty() {
        return Err(Error::invalid_input("ensemble has no trees"));
    }

    let leaves: Array1<f64> = trees.iter().flat_map(TreeIr::leaf_values).copied().collect();
    let leaf_quantizer = QuantizedArray::new(output_n_bits, leaves.view())?;
    let zero_point = leaf_quantizer.zero_point();

    let int_trees: Vec<TreeIr<i64>> = trees
        .iter()
        .map(|tree| tree.map_leaves(|&v| leaf_quantizer.quantize_value(v) - zero_point))
        .collect();

    let tensors = EnsembleTensors::from_trees(&int_trees, n_features, leaf_quantizer.scale())?;
    debug!(
        n_trees = tensors.n_trees(),
        max_nodes = tensors.max_nodes(),
        max_depth = tensors.max_depth(),
        leaf_scale = tensors.leaf_scale(),
        "tensorized ensemble"
    );

    let predictor = TensorPredictor::new(tensors);
    let train_margins = predictor.predict_raw(codes)?;
    let output_quantizer = QuantizedArray::new(output_n_bits, train_margins.column(0))?;

    Ok((predictor, output_quantizer))
}
