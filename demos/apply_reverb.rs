//! # Apply Convolution Reverb
//!
//! A CLI tool that applies an impulse response to an audio file.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --example apply_reverb -- <input_audio.wav> <impulse_response.wav> [output.wav]
//! ```
//!
//! ## Example
//!
//! ```bash
//! # Apply reverb to vocals using a hall IR
//! cargo run --release --example apply_reverb -- vocals.wav hall_ir.wav vocals_reverb.wav
//! ```

use anyhow::{Context, Result};
use blockconv::{convolve, normalize, NormalizationMethod};
use hound::{WavReader, WavSpec, WavWriter};
use std::env;

/// Read WAV samples as f64, supporting 16/24/32-bit int and 32-bit float
fn read_wav_samples(reader: &mut WavReader<std::io::BufReader<std::fs::File>>) -> Result<Vec<f64>> {
    let spec = reader.spec();

    match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 16) => Ok(reader
            .samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read 16-bit samples")?
            .into_iter()
            .map(|s| (s as f64) / 32768.0)
            .collect()),
        (hound::SampleFormat::Int, 24) => Ok(reader
            .samples::<i32>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read 24-bit samples")?
            .into_iter()
            .map(|s| (s as f64) / 8388608.0)
            .collect()),
        (hound::SampleFormat::Int, 32) => Ok(reader
            .samples::<i32>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read 32-bit samples")?
            .into_iter()
            .map(|s| (s as f64) / 2147483648.0)
            .collect()),
        (hound::SampleFormat::Float, 32) => Ok(reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read 32-bit float samples")?
            .into_iter()
            .map(|s| s as f64)
            .collect()),
        _ => {
            anyhow::bail!(
                "Unsupported audio format: {} bits, {:?}",
                spec.bits_per_sample,
                spec.sample_format
            )
        }
    }
}

/// Split interleaved stereo into (left, right)
fn deinterleave(samples: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let left = samples.iter().step_by(2).copied().collect();
    let right = samples.iter().skip(1).step_by(2).copied().collect();
    (left, right)
}

/// Merge (left, right) into interleaved stereo
fn interleave(left: &[f64], right: &[f64]) -> Vec<f64> {
    let mut output = Vec::with_capacity(left.len() + right.len());
    for (l, r) in left.iter().zip(right.iter()) {
        output.push(*l);
        output.push(*r);
    }
    output
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!(
            "Usage: {} <input_audio.wav> <impulse_response.wav> [output.wav]",
            args[0]
        );
        eprintln!("Applies an impulse response to an audio file");
        std::process::exit(1);
    }

    let audio_path = &args[1];
    let ir_path = &args[2];
    let output_path = if args.len() > 3 {
        &args[3]
    } else {
        "output_reverb.wav"
    };

    println!("Convolution Reverb Tool");
    println!("Audio: {}", audio_path);
    println!("IR: {}", ir_path);
    println!("Output: {}", output_path);
    println!();

    let mut audio_reader =
        WavReader::open(audio_path).with_context(|| format!("Failed to open {}", audio_path))?;
    let audio_spec = audio_reader.spec();
    let audio_samples = read_wav_samples(&mut audio_reader)?;

    println!(
        "Audio: {} Hz, {} channels, {} samples ({:.2}s)",
        audio_spec.sample_rate,
        audio_spec.channels,
        audio_samples.len(),
        (audio_samples.len() as f64) / (audio_spec.sample_rate as f64 * audio_spec.channels as f64)
    );

    let mut ir_reader =
        WavReader::open(ir_path).with_context(|| format!("Failed to open {}", ir_path))?;
    let ir_spec = ir_reader.spec();
    let mut ir_samples = read_wav_samples(&mut ir_reader)?;

    println!(
        "IR: {} Hz, {} channels, {} samples ({:.2}s)",
        ir_spec.sample_rate,
        ir_spec.channels,
        ir_samples.len(),
        (ir_samples.len() as f64) / (ir_spec.sample_rate as f64 * ir_spec.channels as f64)
    );

    if audio_spec.sample_rate != ir_spec.sample_rate {
        anyhow::bail!(
            "Sample rate mismatch: audio is {} Hz but IR is {} Hz",
            audio_spec.sample_rate,
            ir_spec.sample_rate
        );
    }

    // Scale the IR to unit energy so the convolution preserves levels
    normalize(&mut ir_samples, NormalizationMethod::UnitEnergy)
        .context("Failed to normalize impulse response")?;

    println!("\nProcessing...");

    let output = match (audio_spec.channels, ir_spec.channels) {
        (1, 1) => {
            println!("Mode: Mono audio + Mono IR = Mono output");
            convolve(&audio_samples, &ir_samples)?
        }
        (2, 2) => {
            println!("Mode: Stereo audio + Stereo IR = Stereo output");
            let (audio_left, audio_right) = deinterleave(&audio_samples);
            let (ir_left, ir_right) = deinterleave(&ir_samples);
            let left = convolve(&audio_left, &ir_left)?;
            let right = convolve(&audio_right, &ir_right)?;
            interleave(&left, &right)
        }
        (1, 2) => {
            println!("Mode: Mono audio + Stereo IR = Stereo output");
            let (ir_left, ir_right) = deinterleave(&ir_samples);
            let left = convolve(&audio_samples, &ir_left)?;
            let right = convolve(&audio_samples, &ir_right)?;
            interleave(&left, &right)
        }
        (2, 1) => {
            println!("Mode: Stereo audio + Mono IR = Stereo output");
            let (audio_left, audio_right) = deinterleave(&audio_samples);
            let left = convolve(&audio_left, &ir_samples)?;
            let right = convolve(&audio_right, &ir_samples)?;
            interleave(&left, &right)
        }
        (audio_channels, ir_channels) => {
            anyhow::bail!(
                "Unsupported channel configuration: {} audio channels, {} IR channels",
                audio_channels,
                ir_channels
            );
        }
    };

    let output_channels = if audio_spec.channels == 1 && ir_spec.channels == 1 {
        1
    } else {
        2
    };

    // Prevent clipping before the 16-bit write
    let peak = output.iter().map(|s| s.abs()).fold(0.0f64, f64::max);
    let normalized: Vec<f64> = if peak > 1.0 {
        println!("Normalizing output (peak was {:.2})", peak);
        output.iter().map(|s| s / peak).collect()
    } else {
        output
    };

    let output_spec = WavSpec {
        channels: output_channels,
        sample_rate: audio_spec.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(output_path, output_spec)
        .with_context(|| format!("Failed to create {}", output_path))?;

    for &sample in &normalized {
        let sample_i16 = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
        writer.write_sample(sample_i16)?;
    }

    writer.finalize()?;

    println!("\nDone.");
    println!(
        "Output: {} samples ({:.2}s, {} channels)",
        normalized.len(),
        (normalized.len() as f64) / (audio_spec.sample_rate as f64 * output_channels as f64),
        output_channels
    );
    println!("Saved: {}", output_path);

    Ok(())
}
