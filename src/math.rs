//! complex scalar constants and tolerances shared across the engine.
//!
//! Amplitude arithmetic is delegated to `num_complex::Complex64`; double
//! precision in both lanes.

use num_complex::Complex64;

/// the complex coefficient attached to one basis index.
pub type Amplitude = Complex64;

pub const C_ZERO: Complex64 = Complex64::new(0.0, 0.0);
pub const C_ONE: Complex64 = Complex64::new(1.0, 0.0);
pub const C_I: Complex64 = Complex64::new(0.0, 1.0);

/// squared magnitudes below this are treated as numerically zero.
pub const MIN_NORM: f64 = 1e-15;

/// tolerated drift of the running norm from unity before a rescale.
pub const NORM_EPSILON: f64 = 1e-10;
