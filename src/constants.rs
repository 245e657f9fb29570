//! Physical constants.

use crate::Float;

/// Universal gas constant [J mol⁻¹ K⁻¹].
pub const GAS_CONSTANT: Float = 8.31446261815324;
