//! # Compare Convolution Strategies
//!
//! Runs the direct, single-shot spectral, and overlap-save strategies on
//! the same material, cross-checks their outputs, and reports timings.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --example compare_strategies
//! ```

use anyhow::Result;
use blockconv::{convolve_with, optimal_fft_size, Strategy};
use std::time::Instant;

/// Deterministic test tone: a few mixed sinusoids
fn make_signal(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| {
            let t = i as f64;
            0.6 * (t * 0.031).sin() + 0.3 * (t * 0.17).sin() + 0.1 * (t * 0.71).sin()
        })
        .collect()
}

/// Exponentially decaying impulse response
fn make_ir(len: usize) -> Vec<f64> {
    (0..len).map(|i| (-(i as f64) * 0.01).exp() * 0.4).collect()
}

fn max_deviation(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

fn main() -> Result<()> {
    println!("Convolution strategy comparison\n");

    let shapes: [(usize, usize); 3] = [(1_000, 64), (20_000, 256), (200_000, 1024)];

    for (signal_len, kernel_len) in shapes {
        let signal = make_signal(signal_len);
        let kernel = make_ir(kernel_len);

        println!(
            "signal {} x kernel {} (overlap-save FFT size {})",
            signal_len,
            kernel_len,
            optimal_fft_size(signal_len, kernel_len)
        );

        let start = Instant::now();
        let reference = convolve_with(&signal, &kernel, Strategy::Direct)?;
        println!("  direct:       {:>10.2?}", start.elapsed());

        let start = Instant::now();
        let spectral = convolve_with(&signal, &kernel, Strategy::SingleShotSpectral)?;
        println!(
            "  single-shot:  {:>10.2?}  (max deviation {:.2e})",
            start.elapsed(),
            max_deviation(&spectral, &reference)
        );

        let start = Instant::now();
        let blocked = convolve_with(&signal, &kernel, Strategy::OverlapSave)?;
        println!(
            "  overlap-save: {:>10.2?}  (max deviation {:.2e})",
            start.elapsed(),
            max_deviation(&blocked, &reference)
        );

        println!();
    }

    Ok(())
}
