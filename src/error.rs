//! error kinds reported by the engine.
//!
//! Validation always runs before any amplitude mutation, so a rejected call
//! leaves the register unchanged. The one fatal kind is `Allocation`: a
//! register cannot exist without its buffer, and no partial-resize recovery
//! is attempted.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// a qubit index at or past the register width
    #[error("qubit index {index} out of range for a {qubit_count}-qubit register")]
    OutOfRange { index: usize, qubit_count: usize },

    /// two role-distinct bit positions in one call refer to the same qubit
    #[error("qubit {index} is used in more than one role in the same call")]
    Overlap { index: usize },

    /// an imported vector or lookup table does not match the register dimension
    #[error("size mismatch: expected {expected}, got {got}")]
    SizeMismatch { expected: usize, got: usize },

    /// the amplitude buffer could not be obtained at the requested size
    #[error("could not allocate a state vector of {dim} amplitudes")]
    Allocation { dim: usize },

    /// a forced or sampled measurement outcome has numerically zero probability
    #[error("measurement outcome has zero probability")]
    DegenerateMeasurement,
}
