//! Shared buffer utilities for convolution processing
//!
//! Power-of-two sizing, zero-padding, and level measurement/normalization
//! helpers used by the convolution strategies and the demo tools.

use crate::{ConvolveError, ConvolveResult, Sample, SampleBuffer};

/// Find the next power of two greater than or equal to n
pub fn next_power_of_two(n: usize) -> usize {
    if n == 0 {
        return 1;
    }
    let mut power = 1;
    while power < n {
        power *= 2;
    }
    power
}

/// Zero-pad a buffer to `target_len` samples.
///
/// Input longer than `target_len` is returned unchanged (no truncation).
pub fn pad_to(buffer: &[Sample], target_len: usize) -> SampleBuffer {
    let mut padded = buffer.to_vec();
    if padded.len() < target_len {
        padded.resize(target_len, 0.0);
    }
    padded
}

/// Normalization methods for audio signals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NormalizationMethod {
    /// Peak normalization to specified level.
    Peak {
        /// Target peak level (typically 0.0 to 1.0).
        target_level: Sample,
    },
    /// RMS normalization to specified level.
    Rms {
        /// Target RMS level (typically 0.0 to 1.0).
        target_level: Sample,
    },
    /// Scale to unit energy (L2 norm of 1.0).
    ///
    /// The usual preparation for an impulse response kernel, so convolution
    /// preserves overall signal energy.
    UnitEnergy,
}

/// Normalize an audio buffer using the specified method
pub fn normalize(buffer: &mut [Sample], method: NormalizationMethod) -> ConvolveResult<()> {
    if buffer.is_empty() {
        return Err(ConvolveError::EmptyInput);
    }

    let (measured, target) = match method {
        NormalizationMethod::Peak { target_level } => (calculate_peak(buffer), target_level),
        NormalizationMethod::Rms { target_level } => (calculate_rms(buffer), target_level),
        NormalizationMethod::UnitEnergy => (calculate_energy(buffer), 1.0),
    };

    if measured > 0.0 {
        let scale = target / measured;
        for sample in buffer {
            *sample *= scale;
        }
    }

    Ok(())
}

/// Calculate RMS (Root Mean Square) of a buffer
pub fn calculate_rms(buffer: &[Sample]) -> Sample {
    if buffer.is_empty() {
        return 0.0;
    }

    let sum_squares: Sample = buffer.iter().map(|&x| x * x).sum();
    (sum_squares / (buffer.len() as Sample)).sqrt()
}

/// Calculate peak amplitude of a buffer
pub fn calculate_peak(buffer: &[Sample]) -> Sample {
    buffer.iter().map(|&x| x.abs()).fold(0.0, f64::max)
}

/// Calculate the L2 norm (square root of total energy) of a buffer
pub fn calculate_energy(buffer: &[Sample]) -> Sample {
    buffer.iter().map(|&x| x * x).sum::<Sample>().sqrt()
}
