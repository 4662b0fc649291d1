//! the 2x2 gate application kernel and the gate vocabulary built on it.
//!
//! Every single-qubit and controlled gate funnels into [`QReg::apply_2x2`]:
//! the amplitude buffer is cut into blocks of `2^(target+1)` entries, each
//! block pairs index `base+j` (target bit 0) with `base+j+2^target` (target
//! bit 1), and the blocks are swept in parallel. Blocks are disjoint memory,
//! so workers never contend; the only synchronization is the barrier before
//! the partial-norm reduction.

use std::f64::consts::FRAC_1_SQRT_2;

use num_complex::Complex64;
use rayon::prelude::*;

use crate::address;
use crate::error::{Error, Result};
use crate::math::{C_I, C_ONE, C_ZERO, NORM_EPSILON};
use crate::parallel::{self, PSTRIDE};
use crate::register::QReg;

fn pauli_x() -> [Complex64; 4] {
    [C_ZERO, C_ONE, C_ONE, C_ZERO]
}

fn pauli_y() -> [Complex64; 4] {
    [C_ZERO, -C_I, C_I, C_ZERO]
}

fn pauli_z() -> [Complex64; 4] {
    [C_ONE, C_ZERO, C_ZERO, -C_ONE]
}

fn hadamard() -> [Complex64; 4] {
    let h = Complex64::new(FRAC_1_SQRT_2, 0.0);
    [h, h, h, -h]
}

impl QReg {
    /// Applies a 2x2 unitary to `target`, gated by `controls`: each entry is
    /// `(qubit, active_value)` — `true` for a control, `false` for an
    /// anti-control, combined with AND semantics. Basis indices failing the
    /// control condition pass through untouched.
    ///
    /// With `do_calc_norm`, the squared magnitudes of all written amplitudes
    /// are accumulated into the running norm, and the state is rescaled if
    /// normalization is enabled and the norm drifted.
    pub(crate) fn apply_2x2(
        &mut self,
        target: usize,
        controls: &[(usize, bool)],
        mtrx: &[Complex64; 4],
        do_calc_norm: bool,
    ) -> Result<()> {
        address::validate_qubit(target, self.qubit_count)?;
        for (n, &(c, _)) in controls.iter().enumerate() {
            address::validate_qubit(c, self.qubit_count)?;
            if c == target {
                return Err(Error::Overlap { index: c });
            }
            for &(c2, _) in &controls[n + 1..] {
                if c == c2 {
                    return Err(Error::Overlap { index: c });
                }
            }
        }

        let t_pow = 1usize << target;
        let block = t_pow << 1;
        let mut ctrl_mask = 0usize;
        let mut ctrl_active = 0usize;
        for &(c, active) in controls {
            ctrl_mask |= 1 << c;
            if active {
                ctrl_active |= 1 << c;
            }
        }
        let [m00, m01, m10, m11] = *mtrx;

        let kernel = |base: usize, chunk: &mut [Complex64]| -> f64 {
            let mut local = 0.0;
            for j in 0..t_pow {
                if ((base + j) & ctrl_mask) != ctrl_active {
                    continue;
                }
                let a0 = chunk[j];
                let a1 = chunk[j + t_pow];
                let n0 = m00 * a0 + m01 * a1;
                let n1 = m10 * a0 + m11 * a1;
                chunk[j] = n0;
                chunk[j + t_pow] = n1;
                if do_calc_norm {
                    local += n0.norm_sqr() + n1.norm_sqr();
                }
            }
            local
        };

        let amps = self.state.as_mut_slice();
        let norm = if amps.len() < parallel::dispatch_threshold() {
            let mut total = 0.0;
            for (ci, chunk) in amps.chunks_mut(block).enumerate() {
                total += kernel(ci * block, chunk);
            }
            total
        } else {
            amps.par_chunks_mut(block)
                .enumerate()
                .with_min_len((PSTRIDE / block).max(1))
                .map(|(ci, chunk)| kernel(ci * block, chunk))
                .sum()
        };

        if do_calc_norm {
            self.running_norm = norm;
            if self.do_normalize && (norm - 1.0).abs() > NORM_EPSILON {
                self.normalize_state(None);
            }
        }
        Ok(())
    }

    /// Applies an arbitrary 2x2 matrix `[u00, u01, u10, u11]` to one qubit.
    pub fn apply_single_bit(
        &mut self,
        mtrx: &[Complex64; 4],
        do_calc_norm: bool,
        qubit: usize,
    ) -> Result<()> {
        self.apply_2x2(qubit, &[], mtrx, do_calc_norm)
    }

    // --- Pauli and Hadamard ----------------------------------------------

    /// Bit flip.
    pub fn x(&mut self, qubit: usize) -> Result<()> {
        self.apply_2x2(qubit, &[], &pauli_x(), false)
    }

    pub fn y(&mut self, qubit: usize) -> Result<()> {
        self.apply_2x2(qubit, &[], &pauli_y(), false)
    }

    /// Phase flip.
    pub fn z(&mut self, qubit: usize) -> Result<()> {
        self.apply_2x2(qubit, &[], &pauli_z(), false)
    }

    pub fn h(&mut self, qubit: usize) -> Result<()> {
        self.apply_2x2(qubit, &[], &hadamard(), true)
    }

    // --- controlled gates -------------------------------------------------

    pub fn cnot(&mut self, control: usize, target: usize) -> Result<()> {
        self.apply_2x2(target, &[(control, true)], &pauli_x(), false)
    }

    /// CNOT triggered when the control is 0.
    pub fn anti_cnot(&mut self, control: usize, target: usize) -> Result<()> {
        self.apply_2x2(target, &[(control, false)], &pauli_x(), false)
    }

    /// Toffoli: both controls must be 1.
    pub fn ccnot(&mut self, control1: usize, control2: usize, target: usize) -> Result<()> {
        self.apply_2x2(target, &[(control1, true), (control2, true)], &pauli_x(), false)
    }

    /// Toffoli triggered when both controls are 0.
    pub fn anti_ccnot(&mut self, control1: usize, control2: usize, target: usize) -> Result<()> {
        self.apply_2x2(
            target,
            &[(control1, false), (control2, false)],
            &pauli_x(),
            false,
        )
    }

    pub fn cy(&mut self, control: usize, target: usize) -> Result<()> {
        self.apply_2x2(target, &[(control, true)], &pauli_y(), false)
    }

    pub fn cz(&mut self, control: usize, target: usize) -> Result<()> {
        self.apply_2x2(target, &[(control, true)], &pauli_z(), false)
    }

    // --- rotations --------------------------------------------------------

    /// Phase rotation: |1> picks up `e^{i*radians}`.
    pub fn rt(&mut self, radians: f64, qubit: usize) -> Result<()> {
        let m = [C_ONE, C_ZERO, C_ZERO, Complex64::from_polar(1.0, radians)];
        self.apply_2x2(qubit, &[], &m, true)
    }

    /// Rotation around the X axis by `radians`.
    pub fn rx(&mut self, radians: f64, qubit: usize) -> Result<()> {
        let cos = (radians / 2.0).cos();
        let sin = (radians / 2.0).sin();
        let m = [
            Complex64::new(cos, 0.0),
            Complex64::new(0.0, -sin),
            Complex64::new(0.0, -sin),
            Complex64::new(cos, 0.0),
        ];
        self.apply_2x2(qubit, &[], &m, true)
    }

    /// Rotation around the Y axis by `radians`.
    pub fn ry(&mut self, radians: f64, qubit: usize) -> Result<()> {
        let cos = (radians / 2.0).cos();
        let sin = (radians / 2.0).sin();
        let m = [
            Complex64::new(cos, 0.0),
            Complex64::new(-sin, 0.0),
            Complex64::new(sin, 0.0),
            Complex64::new(cos, 0.0),
        ];
        self.apply_2x2(qubit, &[], &m, true)
    }

    /// Rotation around the Z axis by `radians`.
    pub fn rz(&mut self, radians: f64, qubit: usize) -> Result<()> {
        let m = [
            Complex64::from_polar(1.0, -radians / 2.0),
            C_ZERO,
            C_ZERO,
            Complex64::from_polar(1.0, radians / 2.0),
        ];
        self.apply_2x2(qubit, &[], &m, true)
    }

    /// Global phase `e^{i*radians}` on the subspace of one qubit.
    pub fn exp_i(&mut self, radians: f64, qubit: usize) -> Result<()> {
        let phase = Complex64::from_polar(1.0, radians);
        let m = [phase, C_ZERO, C_ZERO, phase];
        self.apply_2x2(qubit, &[], &m, true)
    }

    /// `e^{i*radians*X}`.
    pub fn exp_x(&mut self, radians: f64, qubit: usize) -> Result<()> {
        let cos = radians.cos();
        let sin = radians.sin();
        let m = [
            Complex64::new(cos, 0.0),
            Complex64::new(0.0, sin),
            Complex64::new(0.0, sin),
            Complex64::new(cos, 0.0),
        ];
        self.apply_2x2(qubit, &[], &m, true)
    }

    /// `e^{i*radians*Y}`.
    pub fn exp_y(&mut self, radians: f64, qubit: usize) -> Result<()> {
        let cos = radians.cos();
        let sin = radians.sin();
        let m = [
            Complex64::new(cos, 0.0),
            Complex64::new(sin, 0.0),
            Complex64::new(-sin, 0.0),
            Complex64::new(cos, 0.0),
        ];
        self.apply_2x2(qubit, &[], &m, true)
    }

    /// `e^{i*radians*Z}`.
    pub fn exp_z(&mut self, radians: f64, qubit: usize) -> Result<()> {
        let m = [
            Complex64::from_polar(1.0, radians),
            C_ZERO,
            C_ZERO,
            Complex64::from_polar(1.0, -radians),
        ];
        self.apply_2x2(qubit, &[], &m, true)
    }

    pub fn crt(&mut self, radians: f64, control: usize, target: usize) -> Result<()> {
        let m = [C_ONE, C_ZERO, C_ZERO, Complex64::from_polar(1.0, radians)];
        self.apply_2x2(target, &[(control, true)], &m, false)
    }

    pub fn crx(&mut self, radians: f64, control: usize, target: usize) -> Result<()> {
        let cos = (radians / 2.0).cos();
        let sin = (radians / 2.0).sin();
        let m = [
            Complex64::new(cos, 0.0),
            Complex64::new(0.0, -sin),
            Complex64::new(0.0, -sin),
            Complex64::new(cos, 0.0),
        ];
        self.apply_2x2(target, &[(control, true)], &m, false)
    }

    pub fn cry(&mut self, radians: f64, control: usize, target: usize) -> Result<()> {
        let cos = (radians / 2.0).cos();
        let sin = (radians / 2.0).sin();
        let m = [
            Complex64::new(cos, 0.0),
            Complex64::new(-sin, 0.0),
            Complex64::new(sin, 0.0),
            Complex64::new(cos, 0.0),
        ];
        self.apply_2x2(target, &[(control, true)], &m, false)
    }

    pub fn crz(&mut self, radians: f64, control: usize, target: usize) -> Result<()> {
        let m = [
            Complex64::from_polar(1.0, -radians / 2.0),
            C_ZERO,
            C_ZERO,
            Complex64::from_polar(1.0, radians / 2.0),
        ];
        self.apply_2x2(target, &[(control, true)], &m, false)
    }

    // --- swap -------------------------------------------------------------

    /// Exchanges the states of two qubits.
    pub fn swap(&mut self, qubit1: usize, qubit2: usize) -> Result<()> {
        address::validate_qubit(qubit1, self.qubit_count)?;
        address::validate_qubit(qubit2, self.qubit_count)?;
        if qubit1 == qubit2 {
            return Ok(());
        }
        let p1 = 1usize << qubit1;
        let p2 = 1usize << qubit2;
        let both = p1 | p2;
        self.permute_indices(|i| {
            if ((i & p1) != 0) != ((i & p2) != 0) {
                i ^ both
            } else {
                i
            }
        })
    }

    // --- register-spanning conveniences -----------------------------------

    /// X on every bit of a contiguous field, as a single index relabeling.
    pub fn x_reg(&mut self, start: usize, length: usize) -> Result<()> {
        address::validate_range(start, length, self.qubit_count)?;
        if length == 0 {
            return Ok(());
        }
        let mask = ((1usize << length) - 1) << start;
        self.permute_indices(|i| i ^ mask)
    }

    pub fn h_reg(&mut self, start: usize, length: usize) -> Result<()> {
        address::validate_range(start, length, self.qubit_count)?;
        for j in 0..length {
            self.h(start + j)?;
        }
        Ok(())
    }

    pub fn cnot_reg(&mut self, control: usize, target: usize, length: usize) -> Result<()> {
        address::validate_range(control, length, self.qubit_count)?;
        address::validate_range(target, length, self.qubit_count)?;
        if control == target {
            return Err(Error::Overlap { index: control });
        }
        for j in 0..length {
            self.cnot(control + j, target + j)?;
        }
        Ok(())
    }

    pub fn anti_cnot_reg(&mut self, control: usize, target: usize, length: usize) -> Result<()> {
        address::validate_range(control, length, self.qubit_count)?;
        address::validate_range(target, length, self.qubit_count)?;
        if control == target {
            return Err(Error::Overlap { index: control });
        }
        for j in 0..length {
            self.anti_cnot(control + j, target + j)?;
        }
        Ok(())
    }

    pub fn ccnot_reg(
        &mut self,
        control1: usize,
        control2: usize,
        target: usize,
        length: usize,
    ) -> Result<()> {
        address::validate_range(control1, length, self.qubit_count)?;
        address::validate_range(control2, length, self.qubit_count)?;
        address::validate_range(target, length, self.qubit_count)?;
        if control1 == target || control2 == target || control1 == control2 {
            return Err(Error::Overlap { index: target });
        }
        for j in 0..length {
            self.ccnot(control1 + j, control2 + j, target + j)?;
        }
        Ok(())
    }

    pub fn anti_ccnot_reg(
        &mut self,
        control1: usize,
        control2: usize,
        target: usize,
        length: usize,
    ) -> Result<()> {
        address::validate_range(control1, length, self.qubit_count)?;
        address::validate_range(control2, length, self.qubit_count)?;
        address::validate_range(target, length, self.qubit_count)?;
        if control1 == target || control2 == target || control1 == control2 {
            return Err(Error::Overlap { index: target });
        }
        for j in 0..length {
            self.anti_ccnot(control1 + j, control2 + j, target + j)?;
        }
        Ok(())
    }

    pub fn swap_reg(&mut self, start1: usize, start2: usize, length: usize) -> Result<()> {
        address::validate_range(start1, length, self.qubit_count)?;
        address::validate_range(start2, length, self.qubit_count)?;
        for j in 0..length {
            self.swap(start1 + j, start2 + j)?;
        }
        Ok(())
    }
}
