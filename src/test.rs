use std::f64::consts::PI;
use std::sync::Arc;

use num_complex::Complex64;
use parking_lot::Mutex;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::Error;
use crate::math::{C_ONE, C_ZERO};
use crate::register::QReg;

const TOL: f64 = 1e-10;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// register with a fixed random stream, so sampled measurements repeat.
fn seeded(qubit_count: usize, perm: usize, seed: u64) -> QReg {
    QReg::with_rng(
        qubit_count,
        perm,
        Some(C_ONE),
        Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
    )
    .unwrap()
}

fn assert_close(got: f64, want: f64) {
    assert!(
        (got - want).abs() < TOL,
        "expected {want}, got {got}"
    );
}

fn assert_amps_close(got: &[Complex64], want: &[Complex64]) {
    assert_eq!(got.len(), want.len());
    for (i, (g, w)) in got.iter().zip(want).enumerate() {
        assert!(
            (g - w).norm() < TOL,
            "amplitude {i}: expected {w}, got {g}"
        );
    }
}

/// a generic unentangled 3-qubit state with all-real positive amplitudes.
fn rotated_state() -> QReg {
    let mut reg = QReg::new(3, 0).unwrap();
    reg.ry(0.6, 0).unwrap();
    reg.ry(1.1, 1).unwrap();
    reg.ry(0.3, 2).unwrap();
    reg
}

// --- construction and basis states ------------------------------------

#[test]
fn new_register_is_a_basis_state() {
    let reg = QReg::new(3, 5).unwrap();
    for perm in 0..8 {
        let want = if perm == 5 { 1.0 } else { 0.0 };
        assert_close(reg.prob_all(perm).unwrap(), want);
    }
}

#[test]
fn new_rejects_out_of_range_permutation() {
    let err = QReg::new(2, 4).unwrap_err();
    assert!(matches!(err, Error::OutOfRange { index: 4, .. }));
}

#[test]
fn from_state_requires_power_of_two_length() {
    let err = QReg::from_state(vec![C_ONE; 3]).unwrap_err();
    assert!(matches!(err, Error::SizeMismatch { got: 3, .. }));
    let reg = QReg::from_state(vec![C_ONE, C_ZERO, C_ZERO, C_ZERO]).unwrap();
    assert_eq!(reg.qubit_count(), 2);
}

#[test]
fn set_quantum_state_rejects_wrong_dimension() {
    let mut reg = QReg::new(2, 0).unwrap();
    let err = reg.set_quantum_state(&[C_ONE; 3]).unwrap_err();
    assert!(matches!(
        err,
        Error::SizeMismatch {
            expected: 4,
            got: 3
        }
    ));
}

// --- gates -------------------------------------------------------------

#[test]
fn x_twice_is_identity_on_a_generic_state() {
    let mut reg = rotated_state();
    let before = reg.get_state().to_vec();
    reg.x(1).unwrap();
    reg.x(1).unwrap();
    assert_amps_close(reg.get_state(), &before);
}

#[test]
fn cnot_truth_table() {
    // (control, target) over all four basis inputs; control is qubit 0
    for input in 0..4usize {
        let mut reg = QReg::new(2, input).unwrap();
        reg.cnot(0, 1).unwrap();
        let want = if input & 1 == 1 { input ^ 2 } else { input };
        assert_close(reg.prob_all(want).unwrap(), 1.0);
    }
}

#[test]
fn gate_on_bad_qubit_is_rejected() {
    let mut reg = QReg::new(3, 0).unwrap();
    assert!(matches!(
        reg.x(5).unwrap_err(),
        Error::OutOfRange { index: 5, .. }
    ));
    assert!(matches!(
        reg.cnot(1, 1).unwrap_err(),
        Error::Overlap { index: 1 }
    ));
}

#[test]
fn bell_state_probabilities() {
    init_logging();
    let mut reg = QReg::new(2, 0).unwrap();
    reg.h(0).unwrap();
    reg.cnot(0, 1).unwrap();
    assert_close(reg.prob(0).unwrap(), 0.5);
    assert_close(reg.prob(1).unwrap(), 0.5);
    assert_close(reg.prob_all(0).unwrap(), 0.5);
    assert_close(reg.prob_all(3).unwrap(), 0.5);
    assert_close(reg.prob_all(1).unwrap(), 0.0);
}

#[test]
fn norm_stays_unit_through_a_gate_chain() {
    let mut reg = QReg::new(4, 0).unwrap();
    for q in 0..4 {
        reg.h(q).unwrap();
    }
    reg.rx(0.7, 0).unwrap();
    reg.ry(1.3, 1).unwrap();
    reg.rz(2.1, 2).unwrap();
    reg.rt(0.4, 3).unwrap();
    reg.cnot(0, 2).unwrap();
    reg.ccnot(1, 2, 3).unwrap();
    reg.exp_x(0.2, 0).unwrap();
    assert_close(reg.get_norm(true), 1.0);
}

#[test]
fn rz_applies_opposed_half_angle_phases() {
    let mut reg = QReg::new(1, 0).unwrap();
    reg.h(0).unwrap();
    reg.rz(PI, 0).unwrap();
    let amps = reg.get_state();
    // e^{-i pi/2} = -i on |0>, e^{i pi/2} = i on |1>
    let r = std::f64::consts::FRAC_1_SQRT_2;
    assert_amps_close(
        amps,
        &[Complex64::new(0.0, -r), Complex64::new(0.0, r)],
    );
}

#[test]
fn swap_exchanges_qubits() {
    let mut reg = QReg::new(2, 1).unwrap();
    reg.swap(0, 1).unwrap();
    assert_close(reg.prob_all(2).unwrap(), 1.0);
    // no-op form
    reg.swap(1, 1).unwrap();
    assert_close(reg.prob_all(2).unwrap(), 1.0);
}

#[test]
fn x_reg_flips_a_whole_field() {
    let mut reg = QReg::new(4, 0b0101).unwrap();
    reg.x_reg(0, 3).unwrap();
    assert_close(reg.prob_all(0b0010).unwrap(), 1.0);
}

#[test]
fn cnot_reg_is_bitwise() {
    let mut reg = QReg::new(4, 0b0010).unwrap();
    // control field [0,2), target field [2,4)
    reg.cnot_reg(0, 2, 2).unwrap();
    assert_close(reg.prob_all(0b1010).unwrap(), 1.0);
}

// --- measurement --------------------------------------------------------

#[test]
fn measuring_a_basis_state_is_deterministic() {
    let mut reg = seeded(3, 0b101, 7);
    assert!(reg.m(0).unwrap());
    assert!(!reg.m(1).unwrap());
    assert!(reg.m(2).unwrap());
    assert_close(reg.prob_all(0b101).unwrap(), 1.0);
}

#[test]
fn m_reg_reads_low_bit_first() {
    let mut reg = seeded(4, 0b1101, 7);
    assert_eq!(reg.m_reg(0, 4).unwrap(), 0b1101);
    assert_eq!(reg.m_reg(1, 2).unwrap(), 0b10);
}

#[test]
fn forcing_a_zero_probability_outcome_fails() {
    let mut reg = QReg::new(1, 0).unwrap();
    let before = reg.get_state().to_vec();
    let err = reg.force_m(0, true, true).unwrap_err();
    assert!(matches!(err, Error::DegenerateMeasurement));
    // state untouched by the failed collapse
    assert_amps_close(reg.get_state(), &before);
}

#[test]
fn forced_measurement_collapses_and_rescales() {
    let mut reg = QReg::new(2, 0).unwrap();
    reg.h(0).unwrap();
    reg.cnot(0, 1).unwrap();
    assert!(reg.force_m(0, true, true).unwrap());
    assert_close(reg.prob_all(3).unwrap(), 1.0);
    assert_close(reg.get_norm(true), 1.0);
}

#[test]
fn set_bit_and_set_reg_write_classical_values() {
    let mut reg = seeded(4, 0, 3);
    reg.set_bit(2, true).unwrap();
    assert_close(reg.prob_all(0b0100).unwrap(), 1.0);
    reg.set_reg(0, 3, 0b110).unwrap();
    assert_close(reg.prob_all(0b0110).unwrap(), 1.0);
    // whole-register form collapses directly to the permutation
    reg.set_reg(0, 4, 0b1001).unwrap();
    assert_close(reg.prob_all(0b1001).unwrap(), 1.0);
}

// --- composition --------------------------------------------------------

#[test]
fn compose_places_the_second_register_above_the_first() {
    let a = QReg::new(1, 1).unwrap();
    let b = QReg::new(2, 0b10).unwrap();
    let (joined, offset) = a.compose(b).unwrap();
    assert_eq!(offset, 1);
    assert_eq!(joined.qubit_count(), 3);
    assert_close(joined.prob_all(0b101).unwrap(), 1.0);
}

#[test]
fn compose_all_reports_every_offset() {
    let regs = vec![
        QReg::new(1, 1).unwrap(),
        QReg::new(1, 0).unwrap(),
        QReg::new(1, 1).unwrap(),
    ];
    let (joined, offsets) = QReg::compose_all(regs).unwrap();
    assert_eq!(offsets, vec![0, 1, 2]);
    assert_close(joined.prob_all(0b101).unwrap(), 1.0);
}

#[test]
fn compose_all_of_nothing_is_an_error() {
    assert!(QReg::compose_all(Vec::new()).is_err());
}

#[test]
fn decompose_recovers_unentangled_factors() {
    let mut a = QReg::new(1, 0).unwrap();
    a.ry(0.8, 0).unwrap();
    let mut b = QReg::new(2, 0).unwrap();
    b.ry(0.5, 0).unwrap();
    b.ry(1.7, 1).unwrap();
    let a_amps = a.get_state().to_vec();
    let b_amps = b.get_state().to_vec();

    let (joined, offset) = a.compose(b).unwrap();
    let (remainder, part) = joined.decompose(offset, 2).unwrap();
    assert_eq!(remainder.qubit_count(), 1);
    assert_eq!(part.qubit_count(), 2);
    assert_amps_close(remainder.get_state(), &a_amps);
    assert_amps_close(part.get_state(), &b_amps);
}

#[test]
fn dispose_keeps_the_remainder_normalized() {
    let a = QReg::new(1, 1).unwrap();
    let mut b = QReg::new(2, 0).unwrap();
    b.ry(0.9, 0).unwrap();
    b.ry(0.4, 1).unwrap();
    let b_amps = b.get_state().to_vec();

    let (joined, _) = a.compose(b).unwrap();
    let mut remainder = joined.dispose(0, 1).unwrap();
    assert_eq!(remainder.qubit_count(), 2);
    assert_amps_close(remainder.get_state(), &b_amps);
    assert_close(remainder.get_norm(true), 1.0);
}

// --- rotate and add -----------------------------------------------------

#[test]
fn rol_shifts_field_bits_up() {
    let mut reg = QReg::new(4, 0b0001).unwrap();
    reg.rol(1, 0, 3).unwrap();
    assert_close(reg.prob_all(0b0010).unwrap(), 1.0);
    reg.rol(2, 0, 3).unwrap();
    assert_close(reg.prob_all(0b0001).unwrap(), 1.0);
}

#[test]
fn ror_undoes_rol_on_a_superposition() {
    let mut reg = rotated_state();
    let before = reg.get_state().to_vec();
    reg.rol(2, 0, 3).unwrap();
    reg.ror(2, 0, 3).unwrap();
    assert_amps_close(reg.get_state(), &before);
}

#[test]
fn inc_wraps_modulo_field_width() {
    let mut reg = QReg::new(4, 0b1110).unwrap();
    // field is qubits [1,4); 0b111 + 1 wraps to 0, qubit 0 untouched
    reg.inc(1, 1, 3).unwrap();
    assert_close(reg.prob_all(0b0000).unwrap(), 1.0);
}

#[test]
fn inc_then_dec_restores_a_superposition() {
    let mut reg = rotated_state();
    let before = reg.get_state().to_vec();
    reg.inc(5, 0, 3).unwrap();
    reg.dec(5, 0, 3).unwrap();
    assert_amps_close(reg.get_state(), &before);
}

#[test]
fn incc_reports_wraparound_in_the_carry() {
    // field qubits [0,2), carry at 2
    let mut reg = seeded(3, 0b011, 1);
    reg.incc(1, 0, 2, 2).unwrap();
    assert_close(reg.prob_all(0b100).unwrap(), 1.0);

    // no wrap leaves the carry clear
    let mut reg = seeded(3, 0b001, 1);
    reg.incc(1, 0, 2, 2).unwrap();
    assert_close(reg.prob_all(0b010).unwrap(), 1.0);
}

#[test]
fn incc_folds_a_set_carry_into_the_addend() {
    let mut reg = seeded(3, 0b101, 1);
    // field = 1, carry set: 1 + 1 + 1 = 3, no wrap
    reg.incc(1, 0, 2, 2).unwrap();
    assert_close(reg.prob_all(0b011).unwrap(), 1.0);
}

#[test]
fn decc_uses_the_no_borrow_convention() {
    // carry clear borrows an extra 1; carry-out set means no borrow
    let mut reg = seeded(3, 0b010, 1);
    reg.decc(1, 0, 2, 2).unwrap();
    // 2 - 1 - 1 = 0, no borrow, carry set
    assert_close(reg.prob_all(0b100).unwrap(), 1.0);

    // carry-in set: subtract exactly 1
    let mut reg = seeded(3, 0b110, 1);
    reg.decc(1, 0, 2, 2).unwrap();
    assert_close(reg.prob_all(0b101).unwrap(), 1.0);
}

#[test]
fn incs_flips_the_overflow_flag_on_signed_overflow() {
    // field [0,2) holds +1; adding +1 crosses the signed boundary
    let mut reg = QReg::new(3, 0b001).unwrap();
    reg.incs(1, 0, 2, 2).unwrap();
    assert_close(reg.prob_all(0b110).unwrap(), 1.0);

    // 0 + 1 stays in range, flag untouched
    let mut reg = QReg::new(3, 0b000).unwrap();
    reg.incs(1, 0, 2, 2).unwrap();
    assert_close(reg.prob_all(0b001).unwrap(), 1.0);
}

#[test]
fn decs_flips_the_overflow_flag_on_signed_underflow() {
    // field holds -2; subtracting 1 underflows to +1
    let mut reg = QReg::new(3, 0b010).unwrap();
    reg.decs(1, 0, 2, 2).unwrap();
    assert_close(reg.prob_all(0b101).unwrap(), 1.0);
}

#[test]
fn incsc_tracks_carry_and_overflow_together() {
    // field [0,2), overflow at 2, carry at 3; field = 3 (unsigned), +1 wraps
    let mut reg = seeded(4, 0b0011, 1);
    reg.incsc(1, 0, 2, 2, 3).unwrap();
    // result 0, carry set, signed -1 + 1 = 0 is no overflow
    assert_close(reg.prob_all(0b1000).unwrap(), 1.0);
}

#[test]
fn flag_inside_the_field_is_rejected() {
    let mut reg = QReg::new(3, 0).unwrap();
    assert!(matches!(
        reg.incc(1, 0, 2, 1).unwrap_err(),
        Error::Overlap { index: 1 }
    ));
    assert!(matches!(
        reg.incsc(1, 0, 2, 2, 2).unwrap_err(),
        Error::Overlap { index: 2 }
    ));
}

// --- BCD ----------------------------------------------------------------

#[test]
fn incbcd_carries_between_digits() {
    let mut reg = QReg::new(8, 0x09).unwrap();
    reg.incbcd(1, 0, 8).unwrap();
    assert_close(reg.prob_all(0x10).unwrap(), 1.0);
}

#[test]
fn incbcd_wraps_at_the_decimal_modulus() {
    let mut reg = QReg::new(8, 0x99).unwrap();
    reg.incbcd(1, 0, 8).unwrap();
    assert_close(reg.prob_all(0x00).unwrap(), 1.0);
}

#[test]
fn decbcd_undoes_incbcd() {
    let mut reg = QReg::new(8, 0x42).unwrap();
    reg.incbcd(17, 0, 8).unwrap();
    reg.decbcd(17, 0, 8).unwrap();
    assert_close(reg.prob_all(0x42).unwrap(), 1.0);
}

#[test]
fn incbcdc_sets_the_carry_on_decimal_wrap() {
    // one digit at [0,4), carry at 4
    let mut reg = seeded(5, 0x9, 1);
    reg.incbcdc(1, 0, 4, 4).unwrap();
    assert_close(reg.prob_all(0b10000).unwrap(), 1.0);
}

#[test]
fn decbcdc_uses_the_no_borrow_convention() {
    let mut reg = seeded(5, 0x5, 1);
    // carry clear borrows an extra 1: 5 - 2 = 3, no borrow, carry out set
    reg.decbcdc(1, 0, 4, 4).unwrap();
    assert_close(reg.prob_all(0b10011).unwrap(), 1.0);
}

#[test]
fn bcd_length_must_be_whole_nibbles() {
    let mut reg = QReg::new(6, 0).unwrap();
    assert!(matches!(
        reg.incbcd(1, 0, 6).unwrap_err(),
        Error::SizeMismatch {
            expected: 4,
            got: 6
        }
    ));
}

// --- bitwise logic ------------------------------------------------------

#[test]
fn bitwise_truth_tables() {
    for input in 0..4usize {
        let a = input & 1 == 1;
        let b = input & 2 == 2;

        let mut reg = seeded(3, input, 5);
        reg.and_bit(0, 1, 2).unwrap();
        assert_eq!(reg.m(2).unwrap(), a && b, "AND on input {input}");

        let mut reg = seeded(3, input, 5);
        reg.or_bit(0, 1, 2).unwrap();
        assert_eq!(reg.m(2).unwrap(), a || b, "OR on input {input}");

        let mut reg = seeded(3, input, 5);
        reg.xor_bit(0, 1, 2).unwrap();
        assert_eq!(reg.m(2).unwrap(), a != b, "XOR on input {input}");
    }
}

#[test]
fn xor_bit_works_in_place() {
    let mut reg = seeded(2, 0b11, 5);
    reg.xor_bit(0, 1, 0).unwrap();
    assert_close(reg.prob_all(0b10).unwrap(), 1.0);
}

#[test]
fn and_output_may_not_alias_an_input() {
    let mut reg = seeded(2, 0, 5);
    assert!(matches!(
        reg.and_bit(0, 1, 0).unwrap_err(),
        Error::Overlap { index: 0 }
    ));
}

#[test]
fn logic_over_registers() {
    // fields: input1 [0,2), input2 [2,4), output [4,6)
    let mut reg = seeded(6, 0b01_10_11, 5);
    reg.and_reg(0, 2, 4, 2).unwrap();
    assert_eq!(reg.m_reg(4, 2).unwrap(), 0b11 & 0b10);

    let mut reg = seeded(6, 0b00_10_01, 5);
    reg.or_reg(0, 2, 4, 2).unwrap();
    assert_eq!(reg.m_reg(4, 2).unwrap(), 0b01 | 0b10);

    let mut reg = seeded(6, 0b00_10_11, 5);
    reg.xor_reg(0, 2, 4, 2).unwrap();
    assert_eq!(reg.m_reg(4, 2).unwrap(), 0b11 ^ 0b10);
}

// --- phase flips --------------------------------------------------------

#[test]
fn zero_phase_flip_negates_the_zero_field() {
    let mut reg = QReg::new(1, 0).unwrap();
    reg.h(0).unwrap();
    let r = std::f64::consts::FRAC_1_SQRT_2;
    reg.zero_phase_flip(0, 1).unwrap();
    assert_amps_close(
        reg.get_state(),
        &[Complex64::new(-r, 0.0), Complex64::new(r, 0.0)],
    );
}

#[test]
fn c_phase_flip_if_less_requires_the_flag() {
    // field [0,2), flag at 2; field = 1 < 2 and flag set
    let mut reg = QReg::new(3, 0b101).unwrap();
    reg.c_phase_flip_if_less(2, 0, 2, 2).unwrap();
    assert_amps_close(&reg.get_state()[5..6], &[-C_ONE]);

    // flag clear leaves the phase alone
    let mut reg = QReg::new(3, 0b001).unwrap();
    reg.c_phase_flip_if_less(2, 0, 2, 2).unwrap();
    assert_amps_close(&reg.get_state()[1..2], &[C_ONE]);
}

#[test]
fn phase_flip_negates_everything() {
    let mut reg = rotated_state();
    let before = reg.get_state().to_vec();
    reg.phase_flip();
    let negated: Vec<Complex64> = before.iter().map(|a| -a).collect();
    assert_amps_close(reg.get_state(), &negated);
}

// --- indexed lookup -----------------------------------------------------

#[test]
fn indexed_lda_loads_the_table_under_superposition() {
    init_logging();
    // index [0,2), value [2,4)
    let mut reg = seeded(4, 0, 11);
    reg.h(0).unwrap();
    reg.h(1).unwrap();
    let table = [0u8, 1, 2, 3];
    let expected = reg.indexed_lda(0, 2, 2, 2, &table).unwrap();
    assert_eq!(expected, 2); // mean of 0..=3 is 1.5, rounded up
    for idx in 0..4usize {
        assert_close(reg.prob_all(idx | (idx << 2)).unwrap(), 0.25);
    }
}

#[test]
fn indexed_lda_overwrites_the_value_field() {
    let mut reg = seeded(4, 0b1101, 11);
    // index field holds 1; stale value 0b11 is cleared before the load
    let table = [2u8, 3, 0, 1];
    let expected = reg.indexed_lda(0, 2, 2, 2, &table).unwrap();
    assert_eq!(expected, 3);
    assert_close(reg.prob_all(0b1101).unwrap(), 1.0);
}

#[test]
fn indexed_adc_adds_the_looked_up_value_with_carry() {
    // index [0,2), value [2,4), carry at 4; index 2, value 1
    let mut reg = seeded(5, 0b00110, 11);
    let table = [0u8, 0, 3, 0];
    let expected = reg.indexed_adc(0, 2, 2, 2, 4, &table).unwrap();
    // 1 + 3 = 4 wraps to 0 with carry out
    assert_eq!(expected, 0);
    assert_close(reg.prob_all(0b10010).unwrap(), 1.0);
}

#[test]
fn indexed_sbc_subtracts_with_the_no_borrow_convention() {
    // carry set in: subtract exactly table[idx]; index 1, value 3
    let mut reg = seeded(5, 0b11101, 11);
    let table = [0u8, 2, 0, 0];
    let expected = reg.indexed_sbc(0, 2, 2, 2, 4, &table).unwrap();
    // 3 - 2 = 1, no borrow, carry out set
    assert_eq!(expected, 1);
    assert_close(reg.prob_all(0b10101).unwrap(), 1.0);
}

#[test]
fn indexed_ops_validate_their_layout() {
    let mut reg = seeded(4, 0, 11);
    let table = [0u8; 4];
    // fields overlap
    assert!(matches!(
        reg.indexed_lda(0, 2, 1, 2, &table).unwrap_err(),
        Error::Overlap { .. }
    ));
    // table too short for the index space
    assert!(matches!(
        reg.indexed_lda(0, 2, 2, 2, &table[..2]).unwrap_err(),
        Error::SizeMismatch {
            expected: 4,
            got: 2
        }
    ));
}

// --- serialization ------------------------------------------------------

#[test]
fn serde_round_trip_preserves_the_state() {
    let mut reg = rotated_state();
    reg.rt(0.25, 1).unwrap();
    let json = serde_json::to_string(&reg).unwrap();
    let back: QReg = serde_json::from_str(&json).unwrap();
    assert_eq!(back.qubit_count(), reg.qubit_count());
    assert_amps_close(back.get_state(), reg.get_state());
}

// --- properties ---------------------------------------------------------

proptest! {
    #[test]
    fn inc_dec_round_trips_any_basis_state(perm in 0usize..32, v in 0usize..64) {
        let mut reg = QReg::new(5, perm).unwrap();
        reg.inc(v, 1, 3).unwrap();
        reg.dec(v, 1, 3).unwrap();
        prop_assert!((reg.prob_all(perm).unwrap() - 1.0).abs() < TOL);
    }

    #[test]
    fn rol_by_the_field_length_is_identity(perm in 0usize..16, shift in 0usize..8) {
        let mut reg = QReg::new(4, perm).unwrap();
        reg.rol(shift, 0, 4).unwrap();
        reg.rol(4 - (shift % 4), 0, 4).unwrap();
        prop_assert!((reg.prob_all(perm).unwrap() - 1.0).abs() < TOL);
    }

    #[test]
    fn x_is_an_involution(perm in 0usize..16, qubit in 0usize..4) {
        let mut reg = QReg::new(4, perm).unwrap();
        reg.x(qubit).unwrap();
        reg.x(qubit).unwrap();
        prop_assert!((reg.prob_all(perm).unwrap() - 1.0).abs() < TOL);
    }
}
