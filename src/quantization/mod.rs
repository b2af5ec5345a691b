//! Fixed-point quantization of inputs and outputs.
//!
//! - [`QuantizedArray`]: uniform fixed-point encoder/decoder fitted on one
//!   set of values
//! - [`FeatureQuantizers`]: one [`QuantizedArray`] per input column

mod array;
mod features;

pub use array::QuantizedArray;
pub use features::FeatureQuantizers;

/// Largest supported bit width.
pub const MAX_N_BITS: u32 = 16;

/// Errors raised while fitting a quantizer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuantizationError {
    #[error("n_bits must be in 1..={MAX_N_BITS}, got {0}")]
    InvalidNBits(u32),
    #[error("cannot quantize an empty array")]
    Empty,
    #[error("cannot quantize non-finite value at index {index}")]
    NonFinite { index: usize },
}
