//! Per-feature input quantization.

use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::{QuantizationError, QuantizedArray};
use crate::error::{Error, Result};

/// One quantizer per input column.
///
/// Fitted once on training data. Later batches are encoded through the same
/// per-column scale and zero point, never refitted, so inference codes match
/// training codes exactly. Values outside a column's training range saturate
/// to `0` or `2^n_bits - 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureQuantizers {
    quantizers: Vec<QuantizedArray>,
}

impl FeatureQuantizers {
    /// Fit one quantizer per column of `features` (shape `[n_samples, n_features]`).
    ///
    /// Returns the quantizers together with the training codes.
    pub fn fit(n_bits: u32, features: ArrayView2<f64>) -> Result<(Self, Array2<i64>)> {
        if features.ncols() == 0 {
            return Err(Error::invalid_input("features must have at least one column"));
        }

        let mut codes = Array2::<i64>::zeros(features.raw_dim());
        let mut quantizers = Vec::with_capacity(features.ncols());

        for (column, mut out) in features
            .axis_iter(Axis(1))
            .zip(codes.axis_iter_mut(Axis(1)))
        {
            let q = QuantizedArray::new(n_bits, column)?;
            out.assign(&q.qvalues());
            quantizers.push(q);
        }

        Ok((Self { quantizers }, codes))
    }

    /// Build from already-fitted per-column quantizers.
    pub fn from_quantizers(quantizers: Vec<QuantizedArray>) -> Self {
        Self { quantizers }
    }

    pub fn n_features(&self) -> usize {
        self.quantizers.len()
    }

    pub fn get(&self, feature: usize) -> Option<&QuantizedArray> {
        self.quantizers.get(feature)
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuantizedArray> {
        self.quantizers.iter()
    }

    /// Encode a batch through the fitted quantizers.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] on a column-count mismatch,
    /// [`Error::Quantization`] on non-finite values.
    pub fn quantize(&self, features: ArrayView2<f64>) -> Result<Array2<i64>> {
        self.check_width(features.ncols())?;
        if let Some(index) = features.iter().position(|v| !v.is_finite()) {
            return Err(QuantizationError::NonFinite { index }.into());
        }

        let mut codes = Array2::<i64>::zeros(features.raw_dim());
        for ((column, mut out), q) in features
            .axis_iter(Axis(1))
            .zip(codes.axis_iter_mut(Axis(1)))
            .zip(&self.quantizers)
        {
            out.assign(&q.quantize(column));
        }
        Ok(codes)
    }

    /// Decode a batch of codes back to feature values.
    pub fn dequantize(&self, codes: ArrayView2<i64>) -> Result<Array2<f64>> {
        self.check_width(codes.ncols())?;

        let mut values = Array2::<f64>::zeros(codes.raw_dim());
        for ((column, mut out), q) in codes
            .axis_iter(Axis(1))
            .zip(values.axis_iter_mut(Axis(1)))
            .zip(&self.quantizers)
        {
            out.assign(&q.dequantize_codes(column));
        }
        Ok(values)
    }

    fn check_width(&self, n_cols: usize) -> Result<()> {
        if n_cols != self.n_features() {
            return Err(Error::invalid_input(format!(
                "expected {} features, got {}",
                self.n_features(),
                n_cols
            )));
        }
        Ok(())
    }
}
