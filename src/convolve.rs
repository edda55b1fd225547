//! Linear convolution strategies behind one contract
//!
//! Every function here computes the full linear convolution: the output
//! has `signal.len() + kernel.len() - 1` samples. Three implementations
//! trade setup cost against asymptotics: a direct time-domain sum, a
//! single-shot spectral multiply, and the overlap-save block engine that
//! scales to long signals with bounded memory. [`convolve`] picks one
//! from the input lengths; [`convolve_with`] takes an explicit
//! [`Strategy`].

use crate::sizing::optimal_fft_size;
use crate::transform::SpectralTransform;
use crate::utils::{next_power_of_two, normalize, pad_to, NormalizationMethod};
use crate::{ConvolveError, ConvolveResult, Sample, SampleBuffer};

/// Convolution implementation selector.
///
/// All variants produce the same result within floating tolerance; they
/// differ only in cost profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Direct time-domain sum, O(signal * kernel). Cheapest for tiny
    /// inputs, and the reference the spectral variants are tested
    /// against.
    Direct,
    /// One FFT spanning the whole padded output. Fastest when the output
    /// fits a single reasonably sized transform.
    SingleShotSpectral,
    /// Block convolution with bounded memory; the only variant that
    /// scales to long signals.
    OverlapSave,
}

impl Strategy {
    /// Pick a strategy from the input lengths.
    ///
    /// Tiny products go direct (no FFT setup worth paying), outputs that
    /// fit one 8192-point transform go single-shot, everything else is
    /// block-convolved.
    pub fn select(signal_len: usize, kernel_len: usize) -> Self {
        let output_len = signal_len + kernel_len - 1;
        if signal_len * kernel_len <= 4096 {
            Strategy::Direct
        } else if next_power_of_two(output_len) <= 8192 {
            Strategy::SingleShotSpectral
        } else {
            Strategy::OverlapSave
        }
    }
}

fn validate(signal: &[Sample], kernel: &[Sample]) -> ConvolveResult<()> {
    if signal.is_empty() || kernel.is_empty() {
        return Err(ConvolveError::EmptyInput);
    }
    Ok(())
}

/// Convolve a signal with a kernel, selecting the strategy by length
///
/// # Example
///
/// ```rust
/// use blockconv::convolve;
///
/// let signal = vec![1.0, 0.5];
/// let kernel = vec![0.2, 0.1];
/// let result = convolve(&signal, &kernel).unwrap();
/// assert_eq!(result.len(), 3);
/// ```
pub fn convolve(signal: &[Sample], kernel: &[Sample]) -> ConvolveResult<SampleBuffer> {
    validate(signal, kernel)?;
    convolve_with(signal, kernel, Strategy::select(signal.len(), kernel.len()))
}

/// Convolve with an explicitly chosen [`Strategy`]
pub fn convolve_with(
    signal: &[Sample],
    kernel: &[Sample],
    strategy: Strategy,
) -> ConvolveResult<SampleBuffer> {
    match strategy {
        Strategy::Direct => direct_convolve(signal, kernel),
        Strategy::SingleShotSpectral => spectral_convolve(signal, kernel),
        Strategy::OverlapSave => overlap_save_convolve(signal, kernel),
    }
}

/// Direct time-domain convolution
///
/// O(signal * kernel) accumulation. Slower than the spectral variants for
/// anything but tiny inputs, but trivially correct; the other strategies
/// are validated against it.
pub fn direct_convolve(signal: &[Sample], kernel: &[Sample]) -> ConvolveResult<SampleBuffer> {
    validate(signal, kernel)?;

    let output_len = signal.len() + kernel.len() - 1;
    let mut output = vec![0.0; output_len];

    for (i, &signal_sample) in signal.iter().enumerate() {
        for (j, &kernel_sample) in kernel.iter().enumerate() {
            output[i + j] += signal_sample * kernel_sample;
        }
    }

    Ok(output)
}

/// Single-shot spectral convolution
///
/// Pads both inputs to one power-of-two FFT covering the whole output,
/// multiplies the spectra, and inverse-transforms. Memory and transform
/// size grow with the signal, so prefer [`overlap_save_convolve`] for
/// long material.
pub fn spectral_convolve(signal: &[Sample], kernel: &[Sample]) -> ConvolveResult<SampleBuffer> {
    validate(signal, kernel)?;

    let output_len = signal.len() + kernel.len() - 1;
    let fft_size = next_power_of_two(output_len);
    let mut transform = SpectralTransform::new();

    let signal_spectrum = transform.forward(&pad_to(signal, fft_size));
    let kernel_spectrum = transform.forward(&pad_to(kernel, fft_size));
    let product = transform.multiply(&signal_spectrum, &kernel_spectrum)?;

    let mut output = transform.inverse(&product);
    output.truncate(output_len);
    Ok(output)
}

/// Overlap-save convolution with a throwaway engine
///
/// Convenience wrapper over [`OverlapSaveEngine`] for one-off calls. When
/// convolving repeatedly, keep an engine around so its transform-plan
/// cache survives between calls.
pub fn overlap_save_convolve(signal: &[Sample], kernel: &[Sample]) -> ConvolveResult<SampleBuffer> {
    OverlapSaveEngine::new().convolve(signal, kernel)
}

/// Overlap-save block convolution engine
///
/// Walks the signal in steps of `block_size = fft_size - kernel_len + 1`.
/// Each block reads `fft_size` samples starting `kernel_len - 1` samples
/// before its output position (silence before the signal starts, zeros
/// after it ends), so consecutive blocks overlap by exactly the kernel
/// history. After the spectral multiply and inverse transform, the first
/// `kernel_len - 1` samples of the block result are circular-convolution
/// aliases and are discarded; the rest is exact linear-convolution output
/// written straight into its disjoint slice of the result.
///
/// The engine carries no signal state between calls; each call is an
/// independent, deterministic function of its inputs. Only the transform
/// plan cache persists, and it never changes results.
///
/// # Example
///
/// ```rust
/// use blockconv::OverlapSaveEngine;
///
/// let mut engine = OverlapSaveEngine::new();
/// let signal = vec![1.0, 0.0, 0.0, 0.0];
/// let kernel = vec![0.5, 0.3, 0.1];
/// let result = engine.convolve(&signal, &kernel).unwrap();
/// assert_eq!(result.len(), signal.len() + kernel.len() - 1);
/// ```
pub struct OverlapSaveEngine {
    transform: SpectralTransform,
}

impl OverlapSaveEngine {
    /// Create a new engine with an empty transform-plan cache
    pub fn new() -> Self {
        Self {
            transform: SpectralTransform::new(),
        }
    }

    /// Convolve a signal with a kernel.
    ///
    /// Returns the full linear convolution of
    /// `signal.len() + kernel.len() - 1` samples, or
    /// [`ConvolveError::EmptyInput`] if either argument has no samples.
    pub fn convolve(
        &mut self,
        signal: &[Sample],
        kernel: &[Sample],
    ) -> ConvolveResult<SampleBuffer> {
        validate(signal, kernel)?;

        let kernel_len = kernel.len();
        let overlap = kernel_len - 1;
        let fft_size = optimal_fft_size(signal.len(), kernel_len);
        let block_size = fft_size - overlap;
        let result_len = signal.len() + overlap;

        // Kernel spectrum is computed once and shared by every block.
        let kernel_spectrum = self.transform.forward(&pad_to(kernel, fft_size));

        let mut result = vec![0.0; result_len];
        let mut block = vec![0.0; fft_size];
        let mut position = 0;

        // Walk until the whole output is covered, including the tail past
        // the signal's end. Valid counts sum to result_len exactly.
        while position < result_len {
            fill_block(&mut block, signal, position, overlap);

            let block_spectrum = self.transform.forward(&block);
            let product = self.transform.multiply(&block_spectrum, &kernel_spectrum)?;
            let block_result = self.transform.inverse(&product);

            // The first `overlap` samples wrapped around; skip them.
            let valid_len = block_size.min(result_len - position);
            result[position..position + valid_len]
                .copy_from_slice(&block_result[overlap..overlap + valid_len]);

            position += valid_len;
        }

        Ok(result)
    }
}

impl Default for OverlapSaveEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy one FFT block out of the conceptually zero-extended signal.
///
/// The block for output `position` starts `overlap` samples earlier;
/// reads before the signal's start or past its end yield zeros.
fn fill_block(block: &mut [Sample], signal: &[Sample], position: usize, overlap: usize) {
    block.fill(0.0);

    let signal_start = position.saturating_sub(overlap);
    let block_start = overlap.saturating_sub(position);

    if signal_start < signal.len() {
        let copy_len = (signal.len() - signal_start).min(block.len() - block_start);
        block[block_start..block_start + copy_len]
            .copy_from_slice(&signal[signal_start..signal_start + copy_len]);
    }
}

/// Configuration for applying an impulse response
///
/// # Example
///
/// ```rust
/// use blockconv::apply_ir;
///
/// let dry_audio = vec![1.0, 0.0, 0.0, 0.0];
/// let impulse_response = vec![0.5, 0.3, 0.1];
/// let wet_audio = apply_ir(&dry_audio, &impulse_response).unwrap();
/// assert_eq!(wet_audio.len(), dry_audio.len() + impulse_response.len() - 1);
/// ```
#[derive(Debug, Clone)]
pub struct ConvolutionConfig {
    /// Whether to normalize the output to peak level 1.0
    pub normalize: bool,
    /// Trim the output to input length (removes the reverb tail)
    ///
    /// If `true`, output length equals input length.
    /// If `false`, output includes the full tail (input + ir - 1).
    pub trim_to_input: bool,
    /// Dry/wet mix (0.0 = all dry, 1.0 = all wet)
    pub wet_level: Sample,
    /// Output gain multiplier, applied after dry/wet mixing
    pub gain: Sample,
}

impl Default for ConvolutionConfig {
    fn default() -> Self {
        Self {
            normalize: false,
            trim_to_input: false,
            wet_level: 1.0,
            gain: 1.0,
        }
    }
}

/// Apply an impulse response to audio
///
/// Uses the default configuration (full wet, no normalization, includes
/// the tail). For custom settings, use [`apply_ir_with_config`].
pub fn apply_ir(input: &[Sample], impulse_response: &[Sample]) -> ConvolveResult<SampleBuffer> {
    apply_ir_with_config(input, impulse_response, &ConvolutionConfig::default())
}

/// Apply an impulse response with custom configuration
///
/// # Example
///
/// ```rust
/// use blockconv::{apply_ir_with_config, ConvolutionConfig};
///
/// let input = vec![1.0, 0.0, 0.0, 0.0];
/// let ir = vec![0.5, 0.3, 0.1];
///
/// let config = ConvolutionConfig {
///     trim_to_input: true,
///     wet_level: 0.5,
///     ..ConvolutionConfig::default()
/// };
/// let mixed = apply_ir_with_config(&input, &ir, &config).unwrap();
/// assert_eq!(mixed.len(), input.len());
/// ```
pub fn apply_ir_with_config(
    input: &[Sample],
    impulse_response: &[Sample],
    config: &ConvolutionConfig,
) -> ConvolveResult<SampleBuffer> {
    let convolved = convolve(input, impulse_response)?;

    let mut output = if config.trim_to_input {
        convolved.into_iter().take(input.len()).collect()
    } else {
        convolved
    };

    // Dry/wet mix; past the input's end there is no dry signal to blend
    if config.wet_level < 1.0 {
        let dry_level = 1.0 - config.wet_level;
        for (i, wet_sample) in output.iter_mut().enumerate() {
            if i < input.len() {
                *wet_sample = dry_level * input[i] + config.wet_level * *wet_sample;
            } else {
                *wet_sample *= config.wet_level;
            }
        }
    }

    if config.gain != 1.0 {
        for sample in &mut output {
            *sample *= config.gain;
        }
    }

    if config.normalize {
        normalize(&mut output, NormalizationMethod::Peak { target_level: 1.0 })?;
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const ALL_STRATEGIES: [Strategy; 3] = [
        Strategy::Direct,
        Strategy::SingleShotSpectral,
        Strategy::OverlapSave,
    ];

    fn test_signal(len: usize) -> SampleBuffer {
        (0..len).map(|i| ((i as f64) * 0.37).sin()).collect()
    }

    fn decaying_kernel(len: usize) -> SampleBuffer {
        (0..len).map(|i| (-(i as f64) * 0.05).exp() * 0.5).collect()
    }

    fn assert_buffers_close(actual: &[Sample], expected: &[Sample], epsilon: f64) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(a, e, epsilon = epsilon);
        }
    }

    #[test]
    fn test_single_sample_identity() {
        for strategy in ALL_STRATEGIES {
            let result = convolve_with(&[1.0], &[1.0], strategy).unwrap();
            assert_buffers_close(&result, &[1.0], 1e-12);
        }
    }

    #[test]
    fn test_known_values() {
        // [1, 0.5] * [0.2, 0.1] = [0.2, 0.2, 0.05]
        for strategy in ALL_STRATEGIES {
            let result = convolve_with(&[1.0, 0.5], &[0.2, 0.1], strategy).unwrap();
            assert_buffers_close(&result, &[0.2, 0.2, 0.05], 1e-12);
        }
    }

    #[test]
    fn test_scalar_product() {
        for strategy in ALL_STRATEGIES {
            let result = convolve_with(&[3.0], &[2.0], strategy).unwrap();
            assert_buffers_close(&result, &[6.0], 1e-12);
        }
    }

    #[test]
    fn test_unit_impulse_identity() {
        // Convolving with [1.0] reproduces the signal
        let signal = test_signal(300);
        for strategy in ALL_STRATEGIES {
            let result = convolve_with(&signal, &[1.0], strategy).unwrap();
            assert_buffers_close(&result, &signal, 1e-12);
        }
    }

    #[test]
    fn test_length_law() {
        let cases: [(usize, usize); 4] = [(1, 1), (7, 3), (100, 31), (1000, 257)];
        for (signal_len, kernel_len) in cases {
            let signal = test_signal(signal_len);
            let kernel = decaying_kernel(kernel_len);
            for strategy in ALL_STRATEGIES {
                let result = convolve_with(&signal, &kernel, strategy).unwrap();
                assert_eq!(result.len(), signal_len + kernel_len - 1);
            }
        }
    }

    #[test]
    fn test_commutativity() {
        let a = test_signal(150);
        let b = decaying_kernel(40);

        let ab = convolve(&a, &b).unwrap();
        let ba = convolve(&b, &a).unwrap();

        assert_buffers_close(&ab, &ba, 1e-9);
    }

    #[test]
    fn test_empty_inputs_rejected() {
        for strategy in ALL_STRATEGIES {
            assert_eq!(
                convolve_with(&[], &[1.0], strategy),
                Err(ConvolveError::EmptyInput)
            );
            assert_eq!(
                convolve_with(&[1.0], &[], strategy),
                Err(ConvolveError::EmptyInput)
            );
        }
        assert_eq!(convolve(&[], &[]), Err(ConvolveError::EmptyInput));
        assert_eq!(apply_ir(&[], &[1.0]), Err(ConvolveError::EmptyInput));
    }

    #[test]
    fn test_overlap_save_matches_direct_multi_block() {
        // 2000 samples against a 64-sample kernel spans many blocks
        let signal = test_signal(2000);
        let kernel = decaying_kernel(64);

        let blocked = overlap_save_convolve(&signal, &kernel).unwrap();
        let reference = direct_convolve(&signal, &kernel).unwrap();

        assert_buffers_close(&blocked, &reference, 1e-9);
    }

    #[test]
    fn test_overlap_save_matches_direct_kernel_longer_than_signal() {
        let signal = test_signal(10);
        let kernel = decaying_kernel(100);

        let blocked = overlap_save_convolve(&signal, &kernel).unwrap();
        let reference = direct_convolve(&signal, &kernel).unwrap();

        assert_buffers_close(&blocked, &reference, 1e-9);
    }

    #[test]
    fn test_overlap_save_matches_direct_signal_shorter_than_block() {
        // One partial block, tail zero-padded
        let signal = test_signal(30);
        let kernel = decaying_kernel(8);

        let blocked = overlap_save_convolve(&signal, &kernel).unwrap();
        let reference = direct_convolve(&signal, &kernel).unwrap();

        assert_buffers_close(&blocked, &reference, 1e-9);
    }

    #[test]
    fn test_overlap_save_exact_block_multiple() {
        // A 33-sample kernel forces fft_size 128 and block size 96; signal
        // lengths at exact block multiples exercise the tail block whose
        // input is entirely past the signal's end.
        let kernel = decaying_kernel(33);
        for &signal_len in &[96usize, 192, 288] {
            let signal = test_signal(signal_len);

            let blocked = overlap_save_convolve(&signal, &kernel).unwrap();
            let reference = direct_convolve(&signal, &kernel).unwrap();

            assert_buffers_close(&blocked, &reference, 1e-9);
        }
    }

    #[test]
    fn test_spectral_matches_direct() {
        let signal = test_signal(500);
        let kernel = decaying_kernel(37);

        let spectral = spectral_convolve(&signal, &kernel).unwrap();
        let reference = direct_convolve(&signal, &kernel).unwrap();

        assert_buffers_close(&spectral, &reference, 1e-9);
    }

    #[test]
    fn test_long_signal_output_finite() {
        // 4096 x 32 -> 4127 samples, all finite
        let signal = test_signal(4096);
        let kernel = decaying_kernel(32);

        let result = convolve(&signal, &kernel).unwrap();
        assert_eq!(result.len(), 4127);
        assert!(result.iter().all(|x| x.is_finite()));

        let blocked = overlap_save_convolve(&signal, &kernel).unwrap();
        assert_eq!(blocked.len(), 4127);
        assert!(blocked.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_engine_reuse_is_deterministic() {
        let signal = test_signal(1000);
        let kernel = decaying_kernel(50);

        let mut engine = OverlapSaveEngine::new();
        let first = engine.convolve(&signal, &kernel).unwrap();
        let second = engine.convolve(&signal, &kernel).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_engine_calls_are_independent() {
        // A call after different material matches a fresh engine's output
        let signal = test_signal(600);
        let kernel = decaying_kernel(20);

        let mut warm = OverlapSaveEngine::new();
        let _ = warm.convolve(&test_signal(900), &decaying_kernel(70)).unwrap();
        let warm_result = warm.convolve(&signal, &kernel).unwrap();

        let fresh_result = OverlapSaveEngine::new().convolve(&signal, &kernel).unwrap();
        assert_eq!(warm_result, fresh_result);
    }

    #[test]
    fn test_strategy_selection() {
        assert_eq!(Strategy::select(4, 3), Strategy::Direct);
        assert_eq!(Strategy::select(64, 64), Strategy::Direct);
        assert_eq!(Strategy::select(4096, 32), Strategy::SingleShotSpectral);
        assert_eq!(Strategy::select(100_000, 2048), Strategy::OverlapSave);
    }

    #[test]
    fn test_convolution_config_default() {
        let config = ConvolutionConfig::default();
        assert!(!config.normalize);
        assert!(!config.trim_to_input);
        assert_eq!(config.wet_level, 1.0);
        assert_eq!(config.gain, 1.0);
    }

    #[test]
    fn test_apply_ir_with_config() {
        let input = vec![1.0, 0.0, 0.0, 0.0];
        let ir = vec![0.5, 0.25];

        let config = ConvolutionConfig {
            normalize: false,
            trim_to_input: true,
            wet_level: 0.5,
            gain: 2.0,
        };

        let result = apply_ir_with_config(&input, &ir, &config).unwrap();
        assert_eq!(result.len(), input.len());

        // Dry/wet mix then gain: (0.5 * 1.0 + 0.5 * 0.5) * 2.0
        assert_abs_diff_eq!(result[0], 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_apply_ir_with_normalize() {
        let input = vec![1.0, 0.0, 0.0, 0.0];
        let ir = vec![2.0, 2.0];

        let config = ConvolutionConfig {
            normalize: true,
            ..ConvolutionConfig::default()
        };

        let result = apply_ir_with_config(&input, &ir, &config).unwrap();
        let peak = result.iter().map(|&x| x.abs()).fold(0.0, f64::max);
        assert_abs_diff_eq!(peak, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_apply_ir_full_wet() {
        let input = vec![1.0, 0.5, 0.0, 0.0];
        let ir = vec![0.5, 0.25];

        let result = apply_ir(&input, &ir).unwrap();
        // Full wet is just the convolution
        assert_abs_diff_eq!(result[0], 0.5, epsilon = 1e-12);
        assert_eq!(result.len(), input.len() + ir.len() - 1);
    }

    #[test]
    fn test_apply_ir_wet_on_tail() {
        let input = vec![1.0, 0.0];
        let ir = vec![0.5, 0.25, 0.125];

        let config = ConvolutionConfig {
            wet_level: 0.5,
            ..ConvolutionConfig::default()
        };

        let result = apply_ir_with_config(&input, &ir, &config).unwrap();
        // Past the input's end there is no dry signal to blend in
        assert_abs_diff_eq!(result[2], 0.5 * 0.125, epsilon = 1e-12);
    }

    #[test]
    fn test_fill_block_leading_history_is_silence() {
        let signal = vec![1.0, 2.0, 3.0, 4.0];
        let mut block = vec![9.0; 8];

        // First block: 3 samples of history before the signal starts
        fill_block(&mut block, &signal, 0, 3);
        assert_eq!(block, vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 0.0]);
    }

    #[test]
    fn test_fill_block_past_signal_end() {
        let signal = vec![1.0, 2.0, 3.0, 4.0];
        let mut block = vec![9.0; 8];

        // A block positioned past the signal reads only its tail
        fill_block(&mut block, &signal, 3, 1);
        assert_eq!(block, vec![3.0, 4.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }
}
