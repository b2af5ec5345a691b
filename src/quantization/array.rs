//! Uniform fixed-point quantized array.

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use super::{QuantizationError, MAX_N_BITS};

/// Below this range width a column is treated as a single constant value.
const STABILITY_CONST: f64 = 1e-6;

/// Uniform unsigned fixed-point encoding of a set of values.
///
/// Maps the real range `[min, max]` of the values it was fitted on onto the
/// integer codes `[0, 2^n_bits - 1]`:
///
/// ```text
/// code  = clip(rint(value / scale + zero_point), 0, 2^n_bits - 1)
/// value ≈ scale * (code - zero_point)
/// ```
///
/// The scale and zero point are derived once, at construction. Later data is
/// bound onto the same parameters with [`update_values`](Self::update_values)
/// or [`update_quantized_values`](Self::update_quantized_values), so values
/// outside the fitted range saturate at the ends of the code range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantizedArray {
    n_bits: u32,
    scale: f64,
    zero_point: i64,
    values: Array1<f64>,
    qvalues: Array1<i64>,
}

impl QuantizedArray {
    /// Fit quantization parameters on `values` and encode them.
    ///
    /// # Errors
    ///
    /// - [`QuantizationError::InvalidNBits`] if `n_bits` is outside `1..=16`
    /// - [`QuantizationError::Empty`] if `values` is empty
    /// - [`QuantizationError::NonFinite`] if any value is NaN or infinite
    pub fn new(n_bits: u32, values: ArrayView1<f64>) -> Result<Self, QuantizationError> {
        if n_bits == 0 || n_bits > MAX_N_BITS {
            return Err(QuantizationError::InvalidNBits(n_bits));
        }
        if values.is_empty() {
            return Err(QuantizationError::Empty);
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(QuantizationError::NonFinite { index });
        }

        let (scale, zero_point) = compute_parameters(n_bits, values);
        let mut quantized = Self {
            n_bits,
            scale,
            zero_point,
            values: values.to_owned(),
            qvalues: Array1::zeros(0),
        };
        quantized.qvalues = quantized.quantize(values);
        Ok(quantized)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn n_bits(&self) -> u32 {
        self.n_bits
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn zero_point(&self) -> i64 {
        self.zero_point
    }

    /// Raw values this array currently holds.
    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.values.view()
    }

    /// Integer codes of [`values`](Self::values).
    pub fn qvalues(&self) -> ArrayView1<'_, i64> {
        self.qvalues.view()
    }

    /// Smallest representable code.
    #[inline]
    pub fn qmin(&self) -> i64 {
        0
    }

    /// Largest representable code.
    #[inline]
    pub fn qmax(&self) -> i64 {
        (1i64 << self.n_bits) - 1
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    /// Encode a single value with this array's parameters.
    ///
    /// Saturates at `qmin`/`qmax`. NaN encodes as `qmin`.
    #[inline]
    pub fn quantize_value(&self, value: f64) -> i64 {
        let code = (value / self.scale + self.zero_point as f64).round_ties_even();
        // `as` saturates for out-of-range floats and maps NaN to 0.
        (code as i64).clamp(self.qmin(), self.qmax())
    }

    /// Encode `values` with this array's parameters.
    pub fn quantize(&self, values: ArrayView1<f64>) -> Array1<i64> {
        values.mapv(|v| self.quantize_value(v))
    }

    /// Decode a single code.
    #[inline]
    pub fn dequantize_value(&self, code: i64) -> f64 {
        self.scale * (code - self.zero_point) as f64
    }

    /// Decode arbitrary codes with this array's parameters.
    pub fn dequantize_codes(&self, codes: ArrayView1<i64>) -> Array1<f64> {
        codes.mapv(|c| self.dequantize_value(c))
    }

    /// Decode the codes this array holds.
    pub fn dequantize(&self) -> Array1<f64> {
        self.dequantize_codes(self.qvalues.view())
    }

    // =========================================================================
    // Rebinding
    // =========================================================================

    /// Bind new raw values onto the existing scale and zero point.
    ///
    /// The parameters are not re-derived from `values`, so the result encodes
    /// exactly like `self`.
    pub fn update_values(&self, values: ArrayView1<f64>) -> QuantizedArray {
        QuantizedArray {
            n_bits: self.n_bits,
            scale: self.scale,
            zero_point: self.zero_point,
            values: values.to_owned(),
            qvalues: self.quantize(values),
        }
    }

    /// Pass new raw values through this array's fixed-point grid.
    ///
    /// Returns `dequantize(quantize(values))` using the existing parameters.
    /// Values beyond the fitted range saturate to the range ends.
    pub fn update_quantized_values(&self, values: ArrayView1<f64>) -> Array1<f64> {
        values.mapv(|v| self.dequantize_value(self.quantize_value(v)))
    }
}

/// Derive `(scale, zero_point)` for the given values.
fn compute_parameters(n_bits: u32, values: ArrayView1<f64>) -> (f64, i64) {
    let qmax = ((1i64 << n_bits) - 1) as f64;
    let rmin = values.iter().copied().fold(f64::INFINITY, f64::min);
    let rmax = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if rmax - rmin < STABILITY_CONST {
        // Single distinct value
        if rmax.abs() < STABILITY_CONST {
            (1.0, (-rmin).round() as i64)
        } else {
            // The value maps onto the highest code
            (rmax / qmax, 0)
        }
    } else {
        let scale = (rmax - rmin) / qmax;
        let zero_point = (-rmin * qmax / (rmax - rmin)).round() as i64;
        (scale, zero_point)
    }
}
