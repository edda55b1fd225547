//! FFT block-size selection for overlap-save convolution
//!
//! Too small an FFT size means many blocks, each paying fixed transform
//! setup cost; too large a size spends most of each transform on padding,
//! especially near the signal's end. [`optimal_fft_size`] walks
//! power-of-two candidates with a bounded greedy search instead of an
//! exhaustive one, trading a possibly better global optimum for
//! O(log(max/min)) candidate evaluations.

use crate::utils::next_power_of_two;

/// Smallest FFT size the optimizer will return.
pub const MIN_FFT_SIZE: usize = 64;

/// Upper bound on the greedy candidate search.
///
/// The returned size can still exceed this when the kernel alone demands
/// it; the cap only stops the doubling walk.
pub const MAX_FFT_SIZE: usize = 8192;

/// Number of FFT blocks needed to cover `total_len` output samples at the
/// given FFT size.
pub fn block_count(total_len: usize, fft_size: usize, kernel_len: usize) -> usize {
    let block_size = fft_size - kernel_len + 1;
    total_len.div_ceil(block_size)
}

/// Pick the power-of-two FFT size for one overlap-save call.
///
/// The size is at least `next_power_of_two(2 * kernel_len - 1)` (floored
/// at [`MIN_FFT_SIZE`]), which guarantees a positive block size of
/// `fft_size - kernel_len + 1`. Signals no longer than ten kernels take
/// that floor directly; longer signals double the candidate while the
/// efficiency score strictly improves, stopping at the first decline.
///
/// # Example
///
/// ```rust
/// use blockconv::optimal_fft_size;
///
/// let fft_size = optimal_fft_size(48_000, 512);
/// assert!(fft_size.is_power_of_two());
/// assert!(fft_size >= 2 * 512 - 1);
/// ```
pub fn optimal_fft_size(signal_len: usize, kernel_len: usize) -> usize {
    debug_assert!(kernel_len > 0, "kernel must not be empty");

    let min_size = next_power_of_two(MIN_FFT_SIZE.max(2 * kernel_len - 1));

    // Short signals never amortize per-block overhead; skip the search.
    if signal_len <= 10 * kernel_len {
        return min_size;
    }

    let total_len = signal_len + kernel_len - 1;
    let cap = MAX_FFT_SIZE.min(total_len);

    let mut best = min_size;
    let mut best_score = efficiency_score(total_len, min_size, kernel_len);

    let mut candidate = min_size * 2;
    while candidate <= cap {
        let score = efficiency_score(total_len, candidate, kernel_len);
        if score <= best_score {
            break;
        }
        best = candidate;
        best_score = score;
        candidate *= 2;
    }

    best
}

/// Output samples per unit of transform work at a candidate size.
///
/// The `size * log2(size)` factor models FFT cost per block; multiplying
/// by the block count gives total work for the whole call.
fn efficiency_score(total_len: usize, fft_size: usize, kernel_len: usize) -> f64 {
    let blocks = block_count(total_len, fft_size, kernel_len) as f64;
    let size = fft_size as f64;
    (total_len as f64) / (blocks * size * size.log2())
}
