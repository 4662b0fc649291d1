//! arithmetic and lookup operations over contiguous bit fields.
//!
//! These are permutations of the basis-index space, not 2x2 kernel
//! applications: the amplitude at one index moves to the index whose field
//! encodes the arithmetic result. Each op rebuilds the buffer as a parallel
//! gather through the inverse index map, so writes are race-free by
//! construction. Carry and overflow flag qubits ride along inside the
//! permutation; a superposed carry-in is resolved by measuring the carry
//! qubit first and folding its value into the addend.

use crate::address;
use crate::error::{Error, Result};
use crate::parallel;
use crate::register::QReg;

/// signed overflow of `f + t` over a field of `len_power` values.
fn signed_overflow_add(f: usize, t: usize, len_power: usize) -> bool {
    let sign = len_power >> 1;
    let g = (f + t) & (len_power - 1);
    ((f & sign) == (t & sign)) && ((g & sign) != (f & sign))
}

/// signed overflow of `f - t` over a field of `len_power` values.
fn signed_overflow_sub(f: usize, t: usize, len_power: usize) -> bool {
    let sign = len_power >> 1;
    let g = (f + len_power - t) & (len_power - 1);
    ((f & sign) != (t & sign)) && ((g & sign) != (f & sign))
}

/// little-endian lookup of one table entry of `value_bytes` bytes.
fn table_value(values: &[u8], index: usize, value_bytes: usize) -> usize {
    let mut v = 0usize;
    for b in 0..value_bytes {
        v |= (values[index * value_bytes + b] as usize) << (8 * b);
    }
    v
}

fn bcd_decode(field: usize, nibbles: usize) -> Option<usize> {
    let mut value = 0usize;
    let mut scale = 1usize;
    for d in 0..nibbles {
        let digit = (field >> (4 * d)) & 0xF;
        if digit > 9 {
            return None;
        }
        value += digit * scale;
        scale *= 10;
    }
    Some(value)
}

fn bcd_encode(mut value: usize, nibbles: usize) -> usize {
    let mut field = 0usize;
    for d in 0..nibbles {
        field |= (value % 10) << (4 * d);
        value /= 10;
    }
    field
}

fn validate_flag_outside(flag: usize, start: usize, length: usize) -> Result<()> {
    if flag >= start && flag < start + length {
        return Err(Error::Overlap { index: flag });
    }
    Ok(())
}

impl QReg {
    /// measures a flag qubit down to |0>, reporting its prior value.
    fn measure_and_clear(&mut self, flag: usize) -> Result<bool> {
        let was_set = self.m(flag)?;
        if was_set {
            self.x(flag)?;
        }
        Ok(was_set)
    }

    // --- rotate -----------------------------------------------------------

    /// Cyclic left shift of the field by `shift` bit positions.
    pub fn rol(&mut self, shift: usize, start: usize, length: usize) -> Result<()> {
        address::validate_range(start, length, self.qubit_count)?;
        if length == 0 {
            return Ok(());
        }
        let shift = shift % length;
        if shift == 0 {
            return Ok(());
        }
        let len_power = 1usize << length;
        let reg_mask = (len_power - 1) << start;
        self.permute_indices(|i| {
            let g = (i & reg_mask) >> start;
            // the value landing at g was rotated left, so its source is g rotated right
            let f = ((g >> shift) | (g << (length - shift))) & (len_power - 1);
            (i & !reg_mask) | (f << start)
        })
    }

    /// Cyclic right shift of the field by `shift` bit positions.
    pub fn ror(&mut self, shift: usize, start: usize, length: usize) -> Result<()> {
        address::validate_range(start, length, self.qubit_count)?;
        if length == 0 {
            return Ok(());
        }
        let shift = shift % length;
        if shift == 0 {
            return Ok(());
        }
        self.rol(length - shift, start, length)
    }

    // --- modular add/subtract ---------------------------------------------

    /// Adds `to_add` to the field, modulo `2^length`.
    pub fn inc(&mut self, to_add: usize, start: usize, length: usize) -> Result<()> {
        address::validate_range(start, length, self.qubit_count)?;
        if length == 0 {
            return Ok(());
        }
        let len_power = 1usize << length;
        let to_add = to_add & (len_power - 1);
        if to_add == 0 {
            return Ok(());
        }
        let reg_mask = (len_power - 1) << start;
        self.permute_indices(|i| {
            let g = (i & reg_mask) >> start;
            let f = (g + len_power - to_add) & (len_power - 1);
            (i & !reg_mask) | (f << start)
        })
    }

    /// Subtracts `to_sub` from the field, modulo `2^length`.
    pub fn dec(&mut self, to_sub: usize, start: usize, length: usize) -> Result<()> {
        address::validate_range(start, length, self.qubit_count)?;
        if length == 0 {
            return Ok(());
        }
        let len_power = 1usize << length;
        self.inc(len_power - (to_sub & (len_power - 1)), start, length)
    }

    /// Add with carry: the carry qubit is measured in (adding 1 when set)
    /// and written out by the permutation when the addition wraps.
    pub fn incc(
        &mut self,
        to_add: usize,
        start: usize,
        length: usize,
        carry_index: usize,
    ) -> Result<()> {
        address::validate_range(start, length, self.qubit_count)?;
        address::validate_qubit(carry_index, self.qubit_count)?;
        validate_flag_outside(carry_index, start, length)?;
        if length == 0 {
            return Ok(());
        }
        let len_power = 1usize << length;
        let mut to_add = to_add & (len_power - 1);
        if self.measure_and_clear(carry_index)? {
            to_add += 1;
        }
        let reg_mask = (len_power - 1) << start;
        let carry_mask = 1usize << carry_index;
        self.gather_indices(|i| {
            let g = (i & reg_mask) >> start;
            let f = (g + len_power - (to_add & (len_power - 1))) & (len_power - 1);
            let wraps = f + to_add >= len_power;
            if ((i & carry_mask) != 0) != wraps {
                return None;
            }
            Some((i & !(reg_mask | carry_mask)) | (f << start))
        })
    }

    /// Subtract with carry, no-borrow convention: a clear carry-in borrows an
    /// extra 1; the carry-out is set when no borrow occurred.
    pub fn decc(
        &mut self,
        to_sub: usize,
        start: usize,
        length: usize,
        carry_index: usize,
    ) -> Result<()> {
        address::validate_range(start, length, self.qubit_count)?;
        address::validate_qubit(carry_index, self.qubit_count)?;
        validate_flag_outside(carry_index, start, length)?;
        if length == 0 {
            return Ok(());
        }
        let len_power = 1usize << length;
        let mut to_sub = to_sub & (len_power - 1);
        if !self.measure_and_clear(carry_index)? {
            to_sub += 1;
        }
        let reg_mask = (len_power - 1) << start;
        let carry_mask = 1usize << carry_index;
        self.gather_indices(|i| {
            let g = (i & reg_mask) >> start;
            let f = (g + to_sub) & (len_power - 1);
            let no_borrow = f >= to_sub;
            if ((i & carry_mask) != 0) != no_borrow {
                return None;
            }
            Some((i & !(reg_mask | carry_mask)) | (f << start))
        })
    }

    /// Signed add: flips the overflow qubit when the addition crosses the
    /// signed boundary of the field.
    pub fn incs(
        &mut self,
        to_add: usize,
        start: usize,
        length: usize,
        overflow_index: usize,
    ) -> Result<()> {
        address::validate_range(start, length, self.qubit_count)?;
        address::validate_qubit(overflow_index, self.qubit_count)?;
        validate_flag_outside(overflow_index, start, length)?;
        if length == 0 {
            return Ok(());
        }
        let len_power = 1usize << length;
        let to_add = to_add & (len_power - 1);
        if to_add == 0 {
            return Ok(());
        }
        let reg_mask = (len_power - 1) << start;
        let overflow_mask = 1usize << overflow_index;
        self.permute_indices(|i| {
            let g = (i & reg_mask) >> start;
            let f = (g + len_power - to_add) & (len_power - 1);
            let mut src = (i & !reg_mask) | (f << start);
            if signed_overflow_add(f, to_add, len_power) {
                src ^= overflow_mask;
            }
            src
        })
    }

    /// Signed subtract; see [`QReg::incs`].
    pub fn decs(
        &mut self,
        to_sub: usize,
        start: usize,
        length: usize,
        overflow_index: usize,
    ) -> Result<()> {
        address::validate_range(start, length, self.qubit_count)?;
        address::validate_qubit(overflow_index, self.qubit_count)?;
        validate_flag_outside(overflow_index, start, length)?;
        if length == 0 {
            return Ok(());
        }
        let len_power = 1usize << length;
        let to_sub = to_sub & (len_power - 1);
        if to_sub == 0 {
            return Ok(());
        }
        let reg_mask = (len_power - 1) << start;
        let overflow_mask = 1usize << overflow_index;
        self.permute_indices(|i| {
            let g = (i & reg_mask) >> start;
            let f = (g + to_sub) & (len_power - 1);
            let mut src = (i & !reg_mask) | (f << start);
            if signed_overflow_sub(f, to_sub, len_power) {
                src ^= overflow_mask;
            }
            src
        })
    }

    /// Signed add with both an overflow and a carry flag qubit.
    pub fn incsc(
        &mut self,
        to_add: usize,
        start: usize,
        length: usize,
        overflow_index: usize,
        carry_index: usize,
    ) -> Result<()> {
        address::validate_range(start, length, self.qubit_count)?;
        address::validate_qubit(overflow_index, self.qubit_count)?;
        address::validate_qubit(carry_index, self.qubit_count)?;
        validate_flag_outside(overflow_index, start, length)?;
        validate_flag_outside(carry_index, start, length)?;
        if overflow_index == carry_index {
            return Err(Error::Overlap {
                index: carry_index,
            });
        }
        if length == 0 {
            return Ok(());
        }
        let len_power = 1usize << length;
        let mut to_add = to_add & (len_power - 1);
        if self.measure_and_clear(carry_index)? {
            to_add += 1;
        }
        let reg_mask = (len_power - 1) << start;
        let carry_mask = 1usize << carry_index;
        let overflow_mask = 1usize << overflow_index;
        self.gather_indices(|i| {
            let g = (i & reg_mask) >> start;
            let f = (g + len_power - (to_add & (len_power - 1))) & (len_power - 1);
            let wraps = f + to_add >= len_power;
            if ((i & carry_mask) != 0) != wraps {
                return None;
            }
            let mut src = (i & !(reg_mask | carry_mask)) | (f << start);
            if signed_overflow_add(f, to_add & (len_power - 1), len_power) {
                src ^= overflow_mask;
            }
            Some(src)
        })
    }

    /// Signed add with a carry flag only; without an overflow output the
    /// signed add reduces to the carry form.
    pub fn incsc_carry(
        &mut self,
        to_add: usize,
        start: usize,
        length: usize,
        carry_index: usize,
    ) -> Result<()> {
        self.incc(to_add, start, length, carry_index)
    }

    /// Signed subtract with both an overflow and a carry flag qubit.
    pub fn decsc(
        &mut self,
        to_sub: usize,
        start: usize,
        length: usize,
        overflow_index: usize,
        carry_index: usize,
    ) -> Result<()> {
        address::validate_range(start, length, self.qubit_count)?;
        address::validate_qubit(overflow_index, self.qubit_count)?;
        address::validate_qubit(carry_index, self.qubit_count)?;
        validate_flag_outside(overflow_index, start, length)?;
        validate_flag_outside(carry_index, start, length)?;
        if overflow_index == carry_index {
            return Err(Error::Overlap {
                index: carry_index,
            });
        }
        if length == 0 {
            return Ok(());
        }
        let len_power = 1usize << length;
        let mut to_sub = to_sub & (len_power - 1);
        if !self.measure_and_clear(carry_index)? {
            to_sub += 1;
        }
        let reg_mask = (len_power - 1) << start;
        let carry_mask = 1usize << carry_index;
        let overflow_mask = 1usize << overflow_index;
        self.gather_indices(|i| {
            let g = (i & reg_mask) >> start;
            let f = (g + to_sub) & (len_power - 1);
            let no_borrow = f >= to_sub;
            if ((i & carry_mask) != 0) != no_borrow {
                return None;
            }
            let mut src = (i & !(reg_mask | carry_mask)) | (f << start);
            if signed_overflow_sub(f, to_sub & (len_power - 1), len_power) {
                src ^= overflow_mask;
            }
            Some(src)
        })
    }

    /// Signed subtract with a carry flag only; see [`QReg::incsc_carry`].
    pub fn decsc_carry(
        &mut self,
        to_sub: usize,
        start: usize,
        length: usize,
        carry_index: usize,
    ) -> Result<()> {
        self.decc(to_sub, start, length, carry_index)
    }

    // --- BCD --------------------------------------------------------------

    /// Adds `to_add` to the field interpreted as packed BCD digits, modulo
    /// `10^(length/4)`. Basis states holding invalid digits pass through
    /// unchanged.
    pub fn incbcd(&mut self, to_add: usize, start: usize, length: usize) -> Result<()> {
        address::validate_range(start, length, self.qubit_count)?;
        let nibbles = length / 4;
        if nibbles * 4 != length {
            return Err(Error::SizeMismatch {
                expected: nibbles * 4,
                got: length,
            });
        }
        if nibbles == 0 {
            return Ok(());
        }
        let modulus = 10usize.pow(nibbles as u32);
        let to_add = to_add % modulus;
        if to_add == 0 {
            return Ok(());
        }
        let reg_mask = ((1usize << length) - 1) << start;
        self.permute_indices(|i| {
            let g = (i & reg_mask) >> start;
            match bcd_decode(g, nibbles) {
                None => i,
                Some(value) => {
                    let f = bcd_encode((value + modulus - to_add) % modulus, nibbles);
                    (i & !reg_mask) | (f << start)
                }
            }
        })
    }

    /// BCD subtract; see [`QReg::incbcd`].
    pub fn decbcd(&mut self, to_sub: usize, start: usize, length: usize) -> Result<()> {
        address::validate_range(start, length, self.qubit_count)?;
        let nibbles = length / 4;
        if nibbles * 4 != length {
            return Err(Error::SizeMismatch {
                expected: nibbles * 4,
                got: length,
            });
        }
        if nibbles == 0 {
            return Ok(());
        }
        let modulus = 10usize.pow(nibbles as u32);
        self.incbcd(modulus - (to_sub % modulus), start, length)
    }

    /// BCD add with carry; carry semantics match [`QReg::incc`] in base 10.
    pub fn incbcdc(
        &mut self,
        to_add: usize,
        start: usize,
        length: usize,
        carry_index: usize,
    ) -> Result<()> {
        address::validate_range(start, length, self.qubit_count)?;
        address::validate_qubit(carry_index, self.qubit_count)?;
        validate_flag_outside(carry_index, start, length)?;
        let nibbles = length / 4;
        if nibbles * 4 != length {
            return Err(Error::SizeMismatch {
                expected: nibbles * 4,
                got: length,
            });
        }
        if nibbles == 0 {
            return Ok(());
        }
        let modulus = 10usize.pow(nibbles as u32);
        let mut to_add = to_add % modulus;
        if self.measure_and_clear(carry_index)? {
            to_add += 1;
        }
        let reg_mask = ((1usize << length) - 1) << start;
        let carry_mask = 1usize << carry_index;
        self.gather_indices(|i| {
            let g = (i & reg_mask) >> start;
            match bcd_decode(g, nibbles) {
                None => Some(i),
                Some(value) => {
                    let f_value = (value + modulus - (to_add % modulus)) % modulus;
                    let wraps = f_value + to_add >= modulus;
                    if ((i & carry_mask) != 0) != wraps {
                        return None;
                    }
                    let f = bcd_encode(f_value, nibbles);
                    Some((i & !(reg_mask | carry_mask)) | (f << start))
                }
            }
        })
    }

    /// BCD subtract with carry, no-borrow convention in base 10.
    pub fn decbcdc(
        &mut self,
        to_sub: usize,
        start: usize,
        length: usize,
        carry_index: usize,
    ) -> Result<()> {
        address::validate_range(start, length, self.qubit_count)?;
        address::validate_qubit(carry_index, self.qubit_count)?;
        validate_flag_outside(carry_index, start, length)?;
        let nibbles = length / 4;
        if nibbles * 4 != length {
            return Err(Error::SizeMismatch {
                expected: nibbles * 4,
                got: length,
            });
        }
        if nibbles == 0 {
            return Ok(());
        }
        let modulus = 10usize.pow(nibbles as u32);
        let mut to_sub = to_sub % modulus;
        if !self.measure_and_clear(carry_index)? {
            to_sub += 1;
        }
        let reg_mask = ((1usize << length) - 1) << start;
        let carry_mask = 1usize << carry_index;
        self.gather_indices(|i| {
            let g = (i & reg_mask) >> start;
            match bcd_decode(g, nibbles) {
                None => Some(i),
                Some(value) => {
                    let f_value = (value + to_sub) % modulus;
                    let no_borrow = f_value >= to_sub;
                    if ((i & carry_mask) != 0) != no_borrow {
                        return None;
                    }
                    let f = bcd_encode(f_value, nibbles);
                    Some((i & !(reg_mask | carry_mask)) | (f << start))
                }
            }
        })
    }

    // --- bitwise logic -----------------------------------------------------

    /// `output <- input1 AND input2`. The output bit is set classically
    /// (measured and cleared) first.
    pub fn and_bit(&mut self, input1: usize, input2: usize, output: usize) -> Result<()> {
        address::validate_qubit(input1, self.qubit_count)?;
        address::validate_qubit(input2, self.qubit_count)?;
        address::validate_qubit(output, self.qubit_count)?;
        if input1 == output || input2 == output {
            return Err(Error::Overlap { index: output });
        }
        self.set_bit(output, false)?;
        if input1 == input2 {
            self.cnot(input1, output)
        } else {
            self.ccnot(input1, input2, output)
        }
    }

    /// `output <- input1 OR input2`.
    pub fn or_bit(&mut self, input1: usize, input2: usize, output: usize) -> Result<()> {
        address::validate_qubit(input1, self.qubit_count)?;
        address::validate_qubit(input2, self.qubit_count)?;
        address::validate_qubit(output, self.qubit_count)?;
        if input1 == output || input2 == output {
            return Err(Error::Overlap { index: output });
        }
        if input1 == input2 {
            self.set_bit(output, false)?;
            self.cnot(input1, output)
        } else {
            self.set_bit(output, true)?;
            self.anti_ccnot(input1, input2, output)
        }
    }

    /// `output <- input1 XOR input2`. The output may coincide with one
    /// input, in which case the other input is xor-ed into it in place.
    pub fn xor_bit(&mut self, input1: usize, input2: usize, output: usize) -> Result<()> {
        address::validate_qubit(input1, self.qubit_count)?;
        address::validate_qubit(input2, self.qubit_count)?;
        address::validate_qubit(output, self.qubit_count)?;
        if input1 == input2 {
            // a XOR a is always zero
            return self.set_bit(output, false);
        }
        if output == input1 {
            return self.cnot(input2, output);
        }
        if output == input2 {
            return self.cnot(input1, output);
        }
        self.set_bit(output, false)?;
        self.cnot(input1, output)?;
        self.cnot(input2, output)
    }

    pub fn and_reg(
        &mut self,
        input1: usize,
        input2: usize,
        output: usize,
        length: usize,
    ) -> Result<()> {
        address::validate_range(input1, length, self.qubit_count)?;
        address::validate_range(input2, length, self.qubit_count)?;
        address::validate_range(output, length, self.qubit_count)?;
        if output == input1 || output == input2 {
            return Err(Error::Overlap { index: output });
        }
        for j in 0..length {
            self.and_bit(input1 + j, input2 + j, output + j)?;
        }
        Ok(())
    }

    pub fn or_reg(
        &mut self,
        input1: usize,
        input2: usize,
        output: usize,
        length: usize,
    ) -> Result<()> {
        address::validate_range(input1, length, self.qubit_count)?;
        address::validate_range(input2, length, self.qubit_count)?;
        address::validate_range(output, length, self.qubit_count)?;
        if output == input1 || output == input2 {
            return Err(Error::Overlap { index: output });
        }
        for j in 0..length {
            self.or_bit(input1 + j, input2 + j, output + j)?;
        }
        Ok(())
    }

    pub fn xor_reg(
        &mut self,
        input1: usize,
        input2: usize,
        output: usize,
        length: usize,
    ) -> Result<()> {
        address::validate_range(input1, length, self.qubit_count)?;
        address::validate_range(input2, length, self.qubit_count)?;
        address::validate_range(output, length, self.qubit_count)?;
        for j in 0..length {
            self.xor_bit(input1 + j, input2 + j, output + j)?;
        }
        Ok(())
    }

    // --- phase-flip conditionals -------------------------------------------

    /// Flips the phase of every basis state whose field is zero.
    pub fn zero_phase_flip(&mut self, start: usize, length: usize) -> Result<()> {
        address::validate_range(start, length, self.qubit_count)?;
        let reg_mask = ((1usize << length) - 1) << start;
        parallel::par_update(self.state.as_mut_slice(), |i, a| {
            if i & reg_mask == 0 {
                -a
            } else {
                a
            }
        });
        Ok(())
    }

    /// Flips the phase where the field value is below `greater_perm` and the
    /// flag qubit is set.
    pub fn c_phase_flip_if_less(
        &mut self,
        greater_perm: usize,
        start: usize,
        length: usize,
        flag_index: usize,
    ) -> Result<()> {
        address::validate_range(start, length, self.qubit_count)?;
        address::validate_qubit(flag_index, self.qubit_count)?;
        validate_flag_outside(flag_index, start, length)?;
        let reg_mask = ((1usize << length) - 1) << start;
        let flag_mask = 1usize << flag_index;
        parallel::par_update(self.state.as_mut_slice(), |i, a| {
            if (i & flag_mask) != 0 && ((i & reg_mask) >> start) < greater_perm {
                -a
            } else {
                a
            }
        });
        Ok(())
    }

    /// Global phase flip.
    pub fn phase_flip(&mut self) {
        parallel::par_update(self.state.as_mut_slice(), |_, a| -a);
    }

    // --- indexed lookup ----------------------------------------------------

    /// Loads `values[index_field]` into the value field (which is zeroed
    /// first), fusing a classical memory read into the index permutation.
    /// Returns the probability-weighted expected value of the value field,
    /// rounded to nearest.
    pub fn indexed_lda(
        &mut self,
        index_start: usize,
        index_length: usize,
        value_start: usize,
        value_length: usize,
        values: &[u8],
    ) -> Result<usize> {
        self.validate_indexed(index_start, index_length, value_start, value_length, None, values)?;
        self.set_reg(value_start, value_length, 0)?;
        let index_mask = ((1usize << index_length) - 1) << index_start;
        let value_mask = ((1usize << value_length) - 1) << value_start;
        let value_bytes = (value_length + 7) / 8;
        let value_power = 1usize << value_length;
        self.gather_indices(|i| {
            let index_field = (i & index_mask) >> index_start;
            let loaded = table_value(values, index_field, value_bytes) & (value_power - 1);
            if (i & value_mask) >> value_start == loaded {
                Some(i & !value_mask)
            } else {
                None
            }
        })?;
        Ok(self.expected_field_value(value_start, value_length))
    }

    /// Adds the looked-up byte value into the value field with carry.
    /// Returns the expected value of the value field after the operation.
    pub fn indexed_adc(
        &mut self,
        index_start: usize,
        index_length: usize,
        value_start: usize,
        value_length: usize,
        carry_index: usize,
        values: &[u8],
    ) -> Result<usize> {
        self.validate_indexed(
            index_start,
            index_length,
            value_start,
            value_length,
            Some(carry_index),
            values,
        )?;
        let carry_in = if self.measure_and_clear(carry_index)? {
            1
        } else {
            0
        };
        let index_mask = ((1usize << index_length) - 1) << index_start;
        let value_mask = ((1usize << value_length) - 1) << value_start;
        let value_bytes = (value_length + 7) / 8;
        let value_power = 1usize << value_length;
        let carry_mask = 1usize << carry_index;
        self.gather_indices(|i| {
            let index_field = (i & index_mask) >> index_start;
            let to_add =
                (table_value(values, index_field, value_bytes) & (value_power - 1)) + carry_in;
            let g = (i & value_mask) >> value_start;
            let f = (g + value_power - (to_add & (value_power - 1))) & (value_power - 1);
            let wraps = f + to_add >= value_power;
            if ((i & carry_mask) != 0) != wraps {
                return None;
            }
            Some((i & !(value_mask | carry_mask)) | (f << value_start))
        })?;
        Ok(self.expected_field_value(value_start, value_length))
    }

    /// Subtracts the looked-up byte value from the value field with carry
    /// (no-borrow convention). Returns the expected value of the value field
    /// after the operation.
    pub fn indexed_sbc(
        &mut self,
        index_start: usize,
        index_length: usize,
        value_start: usize,
        value_length: usize,
        carry_index: usize,
        values: &[u8],
    ) -> Result<usize> {
        self.validate_indexed(
            index_start,
            index_length,
            value_start,
            value_length,
            Some(carry_index),
            values,
        )?;
        let borrow_in = if self.measure_and_clear(carry_index)? {
            0
        } else {
            1
        };
        let index_mask = ((1usize << index_length) - 1) << index_start;
        let value_mask = ((1usize << value_length) - 1) << value_start;
        let value_bytes = (value_length + 7) / 8;
        let value_power = 1usize << value_length;
        let carry_mask = 1usize << carry_index;
        self.gather_indices(|i| {
            let index_field = (i & index_mask) >> index_start;
            let to_sub =
                (table_value(values, index_field, value_bytes) & (value_power - 1)) + borrow_in;
            let g = (i & value_mask) >> value_start;
            let f = (g + to_sub) & (value_power - 1);
            let no_borrow = f >= to_sub;
            if ((i & carry_mask) != 0) != no_borrow {
                return None;
            }
            Some((i & !(value_mask | carry_mask)) | (f << value_start))
        })?;
        Ok(self.expected_field_value(value_start, value_length))
    }

    fn validate_indexed(
        &self,
        index_start: usize,
        index_length: usize,
        value_start: usize,
        value_length: usize,
        carry_index: Option<usize>,
        values: &[u8],
    ) -> Result<()> {
        address::validate_range(index_start, index_length, self.qubit_count)?;
        address::validate_range(value_start, value_length, self.qubit_count)?;
        // the two fields must not share qubits
        if index_start < value_start + value_length && value_start < index_start + index_length {
            return Err(Error::Overlap { index: index_start.max(value_start) });
        }
        if let Some(carry) = carry_index {
            address::validate_qubit(carry, self.qubit_count)?;
            validate_flag_outside(carry, index_start, index_length)?;
            validate_flag_outside(carry, value_start, value_length)?;
        }
        let value_bytes = (value_length + 7) / 8;
        let needed = (1usize << index_length) * value_bytes;
        if values.len() < needed {
            return Err(Error::SizeMismatch {
                expected: needed,
                got: values.len(),
            });
        }
        Ok(())
    }

    /// probability-weighted expected value of a bit field, rounded.
    fn expected_field_value(&self, start: usize, length: usize) -> usize {
        let reg_mask = ((1usize << length) - 1) << start;
        let amps = self.state.as_slice();
        let expectation = parallel::par_sum(amps.len(), |i| {
            amps[i].norm_sqr() * (((i & reg_mask) >> start) as f64)
        });
        (expectation + 0.5) as usize
    }
}
