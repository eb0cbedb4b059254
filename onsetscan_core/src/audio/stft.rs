use std::f32::consts::PI;

use ndarray::Array2;
use realfft::RealFftPlanner;

use crate::error::{Error, Result};

/// Number of centered frames for a signal of `len` samples.
pub fn frame_count(len: usize, hop_size: usize) -> usize {
    1 + len / hop_size
}

/// Periodic Hann window.
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / size as f32).cos())
        .collect()
}

/// Centered short-time power spectrum, shape `(n_fft / 2 + 1, frames)`.
///
/// The signal is padded with `n_fft / 2` zeros on both sides so frame `t` is
/// centered on sample `t * hop_size`.
pub fn power_spectrogram(samples: &[f32], n_fft: usize, hop_size: usize) -> Result<Array2<f32>> {
    if samples.is_empty() {
        return Err(Error::EmptySignal);
    }
    if n_fft == 0 || hop_size == 0 {
        return Err(Error::InvalidParameter(format!(
            "n_fft ({n_fft}) and hop size ({hop_size}) must be > 0"
        )));
    }

    let pad = n_fft / 2;
    let mut padded = vec![0.0f32; samples.len() + 2 * pad];
    padded[pad..pad + samples.len()].copy_from_slice(samples);

    let n_frames = frame_count(samples.len(), hop_size);
    let n_bins = n_fft / 2 + 1;
    let window = hann_window(n_fft);

    let mut planner = RealFftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n_fft);
    let mut frame = fft.make_input_vec();
    let mut spectrum = fft.make_output_vec();

    let mut power = Array2::<f32>::zeros((n_bins, n_frames));

    for t in 0..n_frames {
        let start = t * hop_size;
        for (i, slot) in frame.iter_mut().enumerate() {
            // Odd n_fft leaves the last frame one sample short of the padding.
            *slot = padded.get(start + i).copied().unwrap_or(0.0) * window[i];
        }

        fft.process(&mut frame, &mut spectrum)
            .map_err(|e| Error::InvalidParameter(format!("fft: {e}")))?;

        for (k, c) in spectrum.iter().enumerate() {
            power[[k, t]] = c.norm_sqr();
        }
    }

    Ok(power)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_count_matches_centered_framing() {
        assert_eq!(frame_count(0, 512), 1);
        assert_eq!(frame_count(511, 512), 1);
        assert_eq!(frame_count(512, 512), 2);
        assert_eq!(frame_count(220_500, 512), 431);
    }

    #[test]
    fn hann_is_periodic() {
        let w = hann_window(8);
        assert!(w[0].abs() < 1e-7);
        assert!((w[4] - 1.0).abs() < 1e-6);
        assert!((w[2] - w[6]).abs() < 1e-6);
    }

    #[test]
    fn spectrogram_shape() {
        let samples = vec![0.25f32; 5000];
        let spec = power_spectrogram(&samples, 2048, 512).unwrap();
        assert_eq!(spec.dim(), (1025, frame_count(5000, 512)));
    }

    #[test]
    fn sine_energy_lands_in_its_bin() {
        let sr = 8192.0f32;
        let n_fft = 1024;
        // 512 Hz sits exactly on bin 64 at this rate and size.
        let samples: Vec<f32> = (0..8192)
            .map(|i| (2.0 * PI * 512.0 * i as f32 / sr).sin())
            .collect();
        let spec = power_spectrogram(&samples, n_fft, 256).unwrap();
        let middle = spec.ncols() / 2;
        let column = spec.column(middle);
        let (peak_bin, _) = column
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |best, (k, &v)| if v > best.1 { (k, v) } else { best });
        assert_eq!(peak_bin, 64);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(power_spectrogram(&[], 2048, 512), Err(Error::EmptySignal)));
    }
}
