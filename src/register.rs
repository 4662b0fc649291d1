//! the quantum register: construction, norm tracking, measurement, and
//! register composition/decomposition.

use std::f64::consts::TAU;
use std::sync::Arc;

use num_complex::Complex64;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::address;
use crate::error::{Error, Result};
use crate::math::{C_ONE, C_ZERO, MIN_NORM, NORM_EPSILON};
use crate::parallel;
use crate::statevector::StateVec;

/// Pseudo-random source for measurement sampling, shared between registers.
pub type SharedRng = Arc<Mutex<StdRng>>;

fn default_rng() -> SharedRng {
    Arc::new(Mutex::new(StdRng::from_entropy()))
}

/// An N-qubit register holding the full `2^N` amplitude vector.
///
/// Bit *k* of a basis index is the classical value of qubit *k*. The
/// register owns its buffer exclusively; composition and decomposition
/// consume their inputs by value, so no alias of a retired buffer remains
/// reachable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QReg {
    pub(crate) qubit_count: usize,
    pub(crate) state: StateVec,
    pub(crate) running_norm: f64,
    pub(crate) do_normalize: bool,
    #[serde(skip, default = "default_rng")]
    pub(crate) rng: SharedRng,
}

impl QReg {
    /// Creates a register in the computational basis state `perm` with unit
    /// phase.
    pub fn new(qubit_count: usize, perm: usize) -> Result<Self> {
        Self::with_rng(qubit_count, perm, Some(C_ONE), default_rng())
    }

    /// Like [`QReg::new`], with an explicit initial phase factor. `None`
    /// draws a random global phase from the shared source.
    pub fn with_phase(qubit_count: usize, perm: usize, phase: Option<Complex64>) -> Result<Self> {
        Self::with_rng(qubit_count, perm, phase, default_rng())
    }

    /// Full-control constructor: initial permutation, phase factor and the
    /// shared random source used for measurement sampling.
    pub fn with_rng(
        qubit_count: usize,
        perm: usize,
        phase: Option<Complex64>,
        rng: SharedRng,
    ) -> Result<Self> {
        let dim = dimension_of(qubit_count)?;
        if perm >= dim {
            return Err(Error::OutOfRange {
                index: perm,
                qubit_count,
            });
        }
        let mut state = StateVec::try_new(dim)?;
        let phase = match phase {
            Some(p) => p,
            None => Complex64::from_polar(1.0, rng.lock().gen::<f64>() * TAU),
        };
        state.as_mut_slice()[perm] = phase;
        Ok(QReg {
            qubit_count,
            state,
            running_norm: 1.0,
            do_normalize: true,
            rng,
        })
    }

    /// Partial-init mode: a zeroed buffer meant to be overwritten before
    /// use, e.g. via [`QReg::set_quantum_state`].
    pub fn zeroed(qubit_count: usize) -> Result<Self> {
        let dim = dimension_of(qubit_count)?;
        Ok(QReg {
            qubit_count,
            state: StateVec::try_new(dim)?,
            running_norm: 0.0,
            do_normalize: true,
            rng: default_rng(),
        })
    }

    /// Adopts a caller-supplied amplitude vector; its length must be a power
    /// of two.
    pub fn from_state(amps: Vec<Complex64>) -> Result<Self> {
        let dim = amps.len();
        if dim == 0 || !dim.is_power_of_two() {
            return Err(Error::SizeMismatch {
                expected: dim.next_power_of_two().max(1),
                got: dim,
            });
        }
        let mut reg = QReg {
            qubit_count: dim.trailing_zeros() as usize,
            state: StateVec::from_vec(amps),
            running_norm: 0.0,
            do_normalize: true,
            rng: default_rng(),
        };
        reg.update_running_norm();
        Ok(reg)
    }

    pub fn qubit_count(&self) -> usize {
        self.qubit_count
    }

    /// `2^qubit_count`, the number of amplitudes.
    pub fn dim(&self) -> usize {
        self.state.len()
    }

    pub fn shared_rng(&self) -> SharedRng {
        self.rng.clone()
    }

    /// Enables or disables the automatic rescale after norm-tracking
    /// operations.
    pub fn enable_normalize(&mut self, on: bool) {
        self.do_normalize = on;
    }

    pub fn normalization_enabled(&self) -> bool {
        self.do_normalize
    }

    // --- raw amplitude import/export -----------------------------------

    /// Read-only view of the amplitude buffer in basis-index order.
    pub fn get_state(&self) -> &[Complex64] {
        self.state.as_slice()
    }

    /// Bulk-overwrites the amplitude buffer; the length must equal the
    /// current dimension.
    pub fn set_quantum_state(&mut self, input: &[Complex64]) -> Result<()> {
        self.state.import(input)?;
        self.update_running_norm();
        Ok(())
    }

    /// Makes this register a copy of `other`'s simulation state. The shared
    /// random source is left as-is.
    pub fn copy_state(&mut self, other: &QReg) {
        self.qubit_count = other.qubit_count;
        self.state = other.state.clone();
        self.running_norm = other.running_norm;
        self.do_normalize = other.do_normalize;
    }

    /// Collapses the whole register to the single basis state `perm`.
    pub fn set_permutation(&mut self, perm: usize) -> Result<()> {
        if perm >= self.state.len() {
            return Err(Error::OutOfRange {
                index: perm,
                qubit_count: self.qubit_count,
            });
        }
        let amps = self.state.as_mut_slice();
        parallel::par_update(amps, |_, _| C_ZERO);
        amps[perm] = C_ONE;
        self.running_norm = 1.0;
        Ok(())
    }

    // --- normalization ---------------------------------------------------

    /// Recomputes the exact sum of squared magnitudes over the full buffer.
    pub fn update_running_norm(&mut self) {
        let amps = self.state.as_slice();
        self.running_norm = parallel::par_sum(amps.len(), |i| amps[i].norm_sqr());
    }

    /// Returns the cached running norm, optionally refreshing it first.
    pub fn get_norm(&mut self, update: bool) -> f64 {
        if update {
            self.update_running_norm();
        }
        self.running_norm
    }

    pub fn set_norm(&mut self, norm: f64) {
        self.running_norm = norm;
    }

    /// Rescales the buffer to unit norm when normalization is enabled and
    /// the norm has drifted beyond tolerance. `nrm` overrides the cached
    /// running norm.
    pub fn normalize_state(&mut self, nrm: Option<f64>) {
        if !self.do_normalize {
            return;
        }
        let nrm = nrm.unwrap_or(self.running_norm);
        if nrm < MIN_NORM {
            // degenerate; leave the buffer untouched rather than divide by ~0
            return;
        }
        if (nrm - 1.0).abs() < NORM_EPSILON {
            self.running_norm = 1.0;
            return;
        }
        let scale = 1.0 / nrm.sqrt();
        parallel::par_update(self.state.as_mut_slice(), |_, a| a * scale);
        self.running_norm = 1.0;
    }

    // --- probability and measurement ------------------------------------

    /// Probability of measuring `qubit` as 1. Does not mutate state.
    pub fn prob(&self, qubit: usize) -> Result<f64> {
        address::validate_qubit(qubit, self.qubit_count)?;
        let q_pow = 1usize << qubit;
        let powers = address::sorted_powers(&[qubit]);
        let amps = self.state.as_slice();
        Ok(parallel::par_sum(amps.len() >> 1, |k| {
            amps[address::expand(k, &powers) | q_pow].norm_sqr()
        }))
    }

    /// Probability of observing the exact basis state `perm`.
    pub fn prob_all(&self, perm: usize) -> Result<f64> {
        if perm >= self.state.len() {
            return Err(Error::OutOfRange {
                index: perm,
                qubit_count: self.qubit_count,
            });
        }
        Ok(self.state.as_slice()[perm].norm_sqr())
    }

    /// Measures `qubit`, collapsing the state and rescaling the remainder to
    /// unit norm.
    pub fn m(&mut self, qubit: usize) -> Result<bool> {
        self.force_m(qubit, false, false)
    }

    /// Measures `qubit`; when `do_force` is set the outcome is `result`
    /// rather than sampled.
    ///
    /// Forcing (or, at the edge of float precision, sampling) an outcome
    /// whose probability is numerically zero reports
    /// [`Error::DegenerateMeasurement`] and leaves the state unchanged.
    pub fn force_m(&mut self, qubit: usize, result: bool, do_force: bool) -> Result<bool> {
        address::validate_qubit(qubit, self.qubit_count)?;
        if self.do_normalize && (self.running_norm - 1.0).abs() > NORM_EPSILON {
            self.update_running_norm();
            self.normalize_state(None);
        }
        let prob_one = self.prob(qubit)?;
        let outcome = if do_force {
            result
        } else {
            self.rng.lock().gen::<f64>() < prob_one
        };
        let nrmlzr = if outcome { prob_one } else { 1.0 - prob_one };
        if nrmlzr < MIN_NORM {
            return Err(Error::DegenerateMeasurement);
        }
        log::debug!(
            "measured qubit {} -> {} (outcome probability {:.6})",
            qubit,
            outcome as u8,
            nrmlzr
        );
        let mask = 1usize << qubit;
        let want = if outcome { mask } else { 0 };
        let scale = 1.0 / nrmlzr.sqrt();
        parallel::par_update(self.state.as_mut_slice(), |i, a| {
            if i & mask == want {
                a * scale
            } else {
                C_ZERO
            }
        });
        self.running_norm = 1.0;
        Ok(outcome)
    }

    /// Measures `length` qubits starting at `start`, bit by bit. Each step
    /// re-derives probabilities against the already-collapsed state.
    pub fn m_reg(&mut self, start: usize, length: usize) -> Result<usize> {
        address::validate_range(start, length, self.qubit_count)?;
        let mut value = 0usize;
        for j in 0..length {
            if self.m(start + j)? {
                value |= 1 << j;
            }
        }
        Ok(value)
    }

    // --- composition -----------------------------------------------------

    /// Joins two registers via tensor product, consuming both.
    ///
    /// Returns the combined register and the bit offset at which `other`'s
    /// qubits now live (equal to `self.qubit_count()` before the join). The
    /// combined amplitude at index `(i2 << n1) | i1` is
    /// `self[i1] * other[i2]`.
    pub fn compose(self, other: QReg) -> Result<(QReg, usize)> {
        let offset = self.qubit_count;
        let qubit_count = self.qubit_count + other.qubit_count;
        let dim = dimension_of(qubit_count)?;
        let mut state = StateVec::try_new(dim)?;
        {
            let low = self.state.as_slice();
            let high = other.state.as_slice();
            let low_mask = low.len() - 1;
            let shift = self.qubit_count;
            parallel::par_write(state.as_mut_slice(), |i| {
                low[i & low_mask] * high[i >> shift]
            });
        }
        log::debug!(
            "composed {}-qubit and {}-qubit registers",
            self.qubit_count,
            other.qubit_count
        );
        Ok((
            QReg {
                qubit_count,
                state,
                running_norm: self.running_norm * other.running_norm,
                do_normalize: self.do_normalize,
                rng: self.rng,
            },
            offset,
        ))
    }

    /// Joins many registers in caller order, returning the combined register
    /// and the composition map: one bit offset per input register.
    pub fn compose_all(regs: Vec<QReg>) -> Result<(QReg, Vec<usize>)> {
        let mut iter = regs.into_iter();
        let mut combined = iter.next().ok_or(Error::SizeMismatch {
            expected: 1,
            got: 0,
        })?;
        let mut offsets = vec![0usize];
        for reg in iter {
            let (next, offset) = combined.compose(reg)?;
            offsets.push(offset);
            combined = next;
        }
        Ok((combined, offsets))
    }

    /// Splits the contiguous qubit range `[start, start+length)` out into
    /// its own register, returning `(remainder, extracted)`.
    ///
    /// The split assumes the extracted factor is unentangled with the
    /// remainder. That assumption is not checked: for entangled inputs the
    /// result is an approximation built from per-partition probabilities and
    /// representative phases, not an error.
    pub fn decompose(self, start: usize, length: usize) -> Result<(QReg, QReg)> {
        address::validate_range(start, length, self.qubit_count)?;
        let remainder_state = self.factor(start, length, false)?;
        let part_state = self.factor(start, length, true)?;
        log::debug!(
            "decomposed {} qubits at offset {} out of {}",
            length,
            start,
            self.qubit_count
        );
        let mut remainder = QReg {
            qubit_count: self.qubit_count - length,
            state: remainder_state,
            running_norm: 0.0,
            do_normalize: self.do_normalize,
            rng: self.rng.clone(),
        };
        let mut part = QReg {
            qubit_count: length,
            state: part_state,
            running_norm: 0.0,
            do_normalize: self.do_normalize,
            rng: self.rng,
        };
        remainder.update_running_norm();
        remainder.normalize_state(None);
        part.update_running_norm();
        part.normalize_state(None);
        Ok((remainder, part))
    }

    /// Like [`QReg::decompose`], but discards the extracted sub-register
    /// without building its buffer. Same unentangled-factor caveat.
    pub fn dispose(self, start: usize, length: usize) -> Result<QReg> {
        address::validate_range(start, length, self.qubit_count)?;
        let remainder_state = self.factor(start, length, false)?;
        log::debug!(
            "disposed {} qubits at offset {} out of {}",
            length,
            start,
            self.qubit_count
        );
        let mut remainder = QReg {
            qubit_count: self.qubit_count - length,
            state: remainder_state,
            running_norm: 0.0,
            do_normalize: self.do_normalize,
            rng: self.rng,
        };
        remainder.update_running_norm();
        remainder.normalize_state(None);
        Ok(remainder)
    }

    /// Accumulates one side of a bit partition: per-index probability summed
    /// over the other side, phase taken from the strongest contributing
    /// amplitude.
    fn factor(&self, start: usize, length: usize, of_part: bool) -> Result<StateVec> {
        let part_power = 1usize << length;
        let remainder_power = 1usize << (self.qubit_count - length);
        let start_mask = (1usize << start) - 1;
        let amps = self.state.as_slice();
        // remainder index j reoccupies the bits around the extracted range
        let remainder_index = move |j: usize| (j & start_mask) | ((j & !start_mask) << length);
        let (outer, inner) = if of_part {
            (part_power, remainder_power)
        } else {
            (remainder_power, part_power)
        };
        let mut out = StateVec::try_new(outer)?;
        parallel::par_write(out.as_mut_slice(), |o| {
            let mut prob = 0.0;
            let mut best = C_ZERO;
            let mut best_norm = 0.0;
            for i in 0..inner {
                let index = if of_part {
                    remainder_index(i) | (o << start)
                } else {
                    remainder_index(o) | (i << start)
                };
                let amp = amps[index];
                let n = amp.norm_sqr();
                prob += n;
                if n > best_norm {
                    best_norm = n;
                    best = amp;
                }
            }
            if prob < MIN_NORM {
                C_ZERO
            } else {
                Complex64::from_polar(prob.sqrt(), best.arg())
            }
        });
        Ok(out)
    }

    // --- classical bit/register setters ----------------------------------

    /// Sets `qubit` to a classical value. Measures first, so superposition
    /// over the bit collapses.
    pub fn set_bit(&mut self, qubit: usize, value: bool) -> Result<()> {
        if self.m(qubit)? != value {
            self.x(qubit)?;
        }
        Ok(())
    }

    /// Sets `length` bits starting at `start` to the classical `value`
    /// (masked to the field width). Measures the field first.
    pub fn set_reg(&mut self, start: usize, length: usize, value: usize) -> Result<()> {
        address::validate_range(start, length, self.qubit_count)?;
        if start == 0 && length == self.qubit_count {
            return self.set_permutation(value & (self.state.len() - 1));
        }
        let value = value & ((1usize << length) - 1);
        let measured = self.m_reg(start, length)?;
        for j in 0..length {
            if ((measured ^ value) >> j) & 1 == 1 {
                self.x(start + j)?;
            }
        }
        Ok(())
    }

    /// Replaces the amplitude buffer wholesale, relabeling indices through
    /// `src`: the new amplitude at index `i` is the old amplitude at
    /// `src(i)`. `src` must be a bijection on the index space.
    pub(crate) fn permute_indices<F>(&mut self, src: F) -> Result<()>
    where
        F: Fn(usize) -> usize + Sync,
    {
        let mut next = StateVec::try_new(self.state.len())?;
        {
            let old = self.state.as_slice();
            parallel::par_write(next.as_mut_slice(), |i| old[src(i)]);
        }
        self.state = next;
        Ok(())
    }

    /// Gather variant of [`QReg::permute_indices`] for maps that are only
    /// injective on the populated subspace: `src` returns `None` for
    /// destination indices outside the image, which receive zero amplitude.
    pub(crate) fn gather_indices<F>(&mut self, src: F) -> Result<()>
    where
        F: Fn(usize) -> Option<usize> + Sync,
    {
        let mut next = StateVec::try_new(self.state.len())?;
        {
            let old = self.state.as_slice();
            parallel::par_write(next.as_mut_slice(), |i| match src(i) {
                Some(from) => old[from],
                None => C_ZERO,
            });
        }
        self.state = next;
        Ok(())
    }
}

fn dimension_of(qubit_count: usize) -> Result<usize> {
    1usize
        .checked_shl(qubit_count as u32)
        .ok_or(Error::Allocation { dim: usize::MAX })
}
