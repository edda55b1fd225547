//! Spectral transform context for FFT-based convolution
//!
//! Wraps rustfft's complex FFT behind the three operations convolution
//! needs: forward transform, inverse transform, and elementwise spectral
//! multiply. The context owns the transform-plan cache, so plan sharing is
//! visible in the type signature rather than hidden in thread-local state;
//! parallel callers hold one context per worker.

use crate::{ConvolveError, ConvolveResult, Sample, SampleBuffer};
use rustfft::{num_complex::Complex, FftPlanner};

/// Complex spectrum produced by [`SpectralTransform::forward`].
pub type Spectrum = Vec<Complex<Sample>>;

/// FFT context for forward/inverse transforms and spectral multiplication.
///
/// Transform plans are cached inside the context and reused across calls,
/// which is what makes precomputing one kernel spectrum and transforming
/// many blocks of the same size cheap. The cache never affects results:
/// the same input always produces the same output.
///
/// # Example
///
/// ```rust
/// use blockconv::SpectralTransform;
///
/// let mut transform = SpectralTransform::new();
/// let buffer = vec![1.0, 2.0, 3.0, 4.0];
/// let spectrum = transform.forward(&buffer);
/// let round_trip = transform.inverse(&spectrum);
/// assert!((round_trip[2] - 3.0).abs() < 1e-12);
/// ```
pub struct SpectralTransform {
    planner: FftPlanner<Sample>,
}

impl SpectralTransform {
    /// Create a new transform context with an empty plan cache
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    /// Forward-transform a real buffer into its complex spectrum.
    ///
    /// The buffer length must be a power of two; the returned spectrum has
    /// the same length.
    pub fn forward(&mut self, buffer: &[Sample]) -> Spectrum {
        debug_assert!(
            buffer.len().is_power_of_two(),
            "FFT length must be a power of two, got {}",
            buffer.len()
        );

        let fft = self.planner.plan_fft_forward(buffer.len());
        let mut spectrum: Spectrum = buffer.iter().map(|&x| Complex::new(x, 0.0)).collect();
        fft.process(&mut spectrum);
        spectrum
    }

    /// Inverse-transform a spectrum back into a real buffer.
    ///
    /// Scales by 1/N (rustfft leaves the inverse unnormalized) and keeps
    /// the real part, so `inverse(forward(x))` reproduces `x` within
    /// floating tolerance for any real power-of-two-length input.
    pub fn inverse(&mut self, spectrum: &[Complex<Sample>]) -> SampleBuffer {
        debug_assert!(
            spectrum.len().is_power_of_two(),
            "FFT length must be a power of two, got {}",
            spectrum.len()
        );

        let n = spectrum.len();
        let ifft = self.planner.plan_fft_inverse(n);
        let mut buffer = spectrum.to_vec();
        ifft.process(&mut buffer);
        buffer.iter().map(|c| c.re / (n as Sample)).collect()
    }

    /// Multiply two spectra elementwise.
    ///
    /// Fails with [`ConvolveError::LengthMismatch`] if the spectra differ
    /// in length. Both spectra in this crate always come from the same FFT
    /// size, so hitting the error indicates a caller bug, not a runtime
    /// condition to recover from.
    pub fn multiply(
        &self,
        a: &[Complex<Sample>],
        b: &[Complex<Sample>],
    ) -> ConvolveResult<Spectrum> {
        if a.len() != b.len() {
            return Err(ConvolveError::LengthMismatch);
        }

        Ok(a.iter().zip(b.iter()).map(|(x, y)| x * y).collect())
    }
}

impl Default for SpectralTransform {
    fn default() -> Self {
        Self::new()
    }
}
