//! contiguous amplitude storage for one register.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::math::C_ZERO;

/// An owned buffer of `2^N` basis-state amplitudes, indexed by basis index.
///
/// The buffer is the serialization surface of the engine: a raw,
/// basis-index-ordered sequence of complex numbers with no header. The qubit
/// count travels out-of-band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateVec {
    amps: Vec<Complex64>,
}

impl StateVec {
    /// Allocates a zero-filled buffer of `dim` amplitudes.
    ///
    /// Allocation failure is fatal for the caller: a register cannot exist
    /// without its buffer.
    pub fn try_new(dim: usize) -> Result<Self> {
        let mut amps = Vec::new();
        amps.try_reserve_exact(dim)
            .map_err(|_| Error::Allocation { dim })?;
        amps.resize(dim, C_ZERO);
        Ok(StateVec { amps })
    }

    pub fn from_vec(amps: Vec<Complex64>) -> Self {
        StateVec { amps }
    }

    pub fn len(&self) -> usize {
        self.amps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amps.is_empty()
    }

    /// Bulk-overwrites the buffer from a caller-supplied vector.
    ///
    /// The caller must exclude concurrent gate operations for the duration;
    /// with respect to a single thread the overwrite is atomic.
    pub fn import(&mut self, input: &[Complex64]) -> Result<()> {
        if input.len() != self.amps.len() {
            return Err(Error::SizeMismatch {
                expected: self.amps.len(),
                got: input.len(),
            });
        }
        self.amps.copy_from_slice(input);
        Ok(())
    }

    pub fn as_slice(&self) -> &[Complex64] {
        &self.amps
    }

    pub fn as_mut_slice(&mut self) -> &mut [Complex64] {
        &mut self.amps
    }

    pub fn to_vec(&self) -> Vec<Complex64> {
        self.amps.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::C_ONE;

    #[test]
    fn import_rejects_wrong_length() {
        let mut sv = StateVec::try_new(4).unwrap();
        let err = sv.import(&[C_ONE; 3]).unwrap_err();
        assert_eq!(
            err,
            Error::SizeMismatch {
                expected: 4,
                got: 3
            }
        );
        // rejected import leaves the buffer unchanged
        assert_eq!(sv.as_slice(), &[C_ZERO; 4]);
    }

    #[test]
    fn import_overwrites_in_full() {
        let mut sv = StateVec::try_new(2).unwrap();
        sv.import(&[C_ZERO, C_ONE]).unwrap();
        assert_eq!(sv.as_slice()[1], C_ONE);
    }
}
