//! chunked parallel dispatch over basis-index ranges.
//!
//! Every amplitude sweep in the engine goes through these helpers: an index
//! range is split into contiguous chunks across the rayon worker pool, with
//! a serial fallback when the range is too small for thread dispatch to pay
//! for itself. Reductions fold into one accumulator per worker and merge
//! after all chunks finish; no shared mutable counters.

use num_complex::Complex64;
use rayon::prelude::*;

/// minimum items handed to one worker at a time.
pub(crate) const PSTRIDE: usize = 1 << 11;

/// below this iteration count the sweep runs in the calling thread.
pub(crate) fn dispatch_threshold() -> usize {
    PSTRIDE * num_cpus::get()
}

/// sums `f(i)` over `0..count`; partial sums are per-worker and combined
/// only after every chunk has finished.
pub(crate) fn par_sum<F>(count: usize, f: F) -> f64
where
    F: Fn(usize) -> f64 + Sync,
{
    if count < dispatch_threshold() {
        (0..count).map(f).sum()
    } else {
        (0..count)
            .into_par_iter()
            .with_min_len(PSTRIDE)
            .fold(|| 0.0f64, |acc, i| acc + f(i))
            .sum()
    }
}

/// fills `dst` with `f(i)` per index.
pub(crate) fn par_write<F>(dst: &mut [Complex64], f: F)
where
    F: Fn(usize) -> Complex64 + Sync,
{
    if dst.len() < dispatch_threshold() {
        for (i, amp) in dst.iter_mut().enumerate() {
            *amp = f(i);
        }
    } else {
        dst.par_iter_mut()
            .enumerate()
            .with_min_len(PSTRIDE)
            .for_each(|(i, amp)| *amp = f(i));
    }
}

/// rewrites `dst` in place as `f(i, dst[i])`.
pub(crate) fn par_update<F>(dst: &mut [Complex64], f: F)
where
    F: Fn(usize, Complex64) -> Complex64 + Sync,
{
    if dst.len() < dispatch_threshold() {
        for (i, amp) in dst.iter_mut().enumerate() {
            *amp = f(i, *amp);
        }
    } else {
        dst.par_iter_mut()
            .enumerate()
            .with_min_len(PSTRIDE)
            .for_each(|(i, amp)| *amp = f(i, *amp));
    }
}
