//! qreg: a multithreaded quantum register state-vector engine.
//!
//! The engine keeps the full `2^N` complex amplitude vector of an N-qubit
//! register in memory and evolves it in place under unitary gates,
//! projective measurement, register composition/decomposition, and
//! permutation-style arithmetic. Amplitude sweeps are chunked across worker
//! threads with rayon; probability reductions use one accumulator per
//! worker, merged after the final barrier.
//!
//! All mutating operations take `&mut self`, so whole-register operations on
//! one register are serialized by the borrow checker, matching the engine's
//! concurrency contract: parallelism lives *inside* a call, never across
//! calls on the same register.

pub mod error;
pub mod math;
pub mod register;
pub mod statevector;

mod address;
mod arith;
mod gates;
mod parallel;

#[cfg(test)]
mod test;

pub use error::{Error, Result};
pub use register::{QReg, SharedRng};
pub use statevector::StateVec;
