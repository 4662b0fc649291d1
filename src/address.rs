//! bit-mask addressing for gate and arithmetic kernels.
//!
//! An operation touching a subset of qubits iterates only over the
//! *unaffected* index bits: a flat counter is expanded onto full basis
//! indices with every special bit cleared, and the kernel then sets the
//! special bits to each required combination itself.

use crate::error::{Error, Result};

/// single-bit masks for the given qubits, ascending.
pub(crate) fn sorted_powers(qubits: &[usize]) -> Vec<usize> {
    let mut powers: Vec<usize> = qubits.iter().map(|&q| 1usize << q).collect();
    powers.sort_unstable();
    powers
}

/// maps a flat counter onto the full basis index with every mask bit cleared.
///
/// `powers` must be ascending single-bit masks. As the counter sweeps
/// `0..(dim >> powers.len())`, every index whose special bits are all low is
/// produced exactly once.
#[inline]
pub(crate) fn expand(counter: usize, powers: &[usize]) -> usize {
    let mut index = counter;
    for &power in powers {
        let low = power - 1;
        index = ((index & !low) << 1) | (index & low);
    }
    index
}

pub(crate) fn validate_qubit(qubit: usize, qubit_count: usize) -> Result<()> {
    if qubit >= qubit_count {
        return Err(Error::OutOfRange {
            index: qubit,
            qubit_count,
        });
    }
    Ok(())
}

pub(crate) fn validate_range(start: usize, length: usize, qubit_count: usize) -> Result<()> {
    if start + length > qubit_count {
        return Err(Error::OutOfRange {
            index: start + length - 1,
            qubit_count,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn expand_is_a_bijection_onto_cleared_indices() {
        // qubits 1 and 3 special in a 5-qubit space
        let powers = sorted_powers(&[3, 1]);
        let produced: HashSet<usize> = (0..(1usize << 3)).map(|k| expand(k, &powers)).collect();
        assert_eq!(produced.len(), 1 << 3);
        for index in &produced {
            assert_eq!(index & 0b01010, 0, "special bits must be clear");
        }
    }

    #[test]
    fn expand_without_masks_is_identity() {
        for k in 0..32 {
            assert_eq!(expand(k, &[]), k);
        }
    }

    #[test]
    fn range_validation() {
        assert!(validate_range(0, 4, 4).is_ok());
        assert!(validate_range(2, 3, 4).is_err());
        assert!(validate_qubit(3, 4).is_ok());
        assert!(validate_qubit(4, 4).is_err());
    }
}
