use serde::Serialize;
use tracing::debug;

use crate::audio::{mel, peaks, stft};
use crate::config::{OnsetConfig, PeakPickConfig};
use crate::error::{Error, Result};

/// Onset envelope of one excerpt together with the frames picked from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OnsetAnalysis {
    /// One non-negative value per frame.
    pub envelope: Vec<f32>,
    /// Strictly increasing frame indices into `envelope`.
    pub peaks: Vec<usize>,
    pub hop_size: usize,
}

impl OnsetAnalysis {
    /// Start time in seconds of every envelope frame.
    pub fn frame_times(&self, sample_rate: u32) -> Vec<f64> {
        frames_to_time(0..self.envelope.len(), sample_rate, self.hop_size)
    }

    /// Times in seconds of the picked peaks.
    pub fn peak_times(&self, sample_rate: u32) -> Vec<f64> {
        frames_to_time(self.peaks.iter().copied(), sample_rate, self.hop_size)
    }
}

pub fn frames_to_time<I>(frames: I, sample_rate: u32, hop_size: usize) -> Vec<f64>
where
    I: IntoIterator<Item = usize>,
{
    frames
        .into_iter()
        .map(|f| (f * hop_size) as f64 / sample_rate as f64)
        .collect()
}

/// Onset envelope and peaks with the default envelope and peak-picking
/// parameters and the given hop size.
pub fn detect_peaks(samples: &[f32], sample_rate: u32, hop_size: usize) -> Result<OnsetAnalysis> {
    let onset = OnsetConfig {
        hop_size,
        ..OnsetConfig::default()
    };
    detect_peaks_with(samples, sample_rate, &onset, &PeakPickConfig::default())
}

pub fn detect_peaks_with(
    samples: &[f32],
    sample_rate: u32,
    onset: &OnsetConfig,
    picking: &PeakPickConfig,
) -> Result<OnsetAnalysis> {
    let envelope = onset_strength(samples, sample_rate, onset)?;
    let peaks = peaks::pick_peaks(&envelope, picking);

    debug!("{} frames, {} peaks", envelope.len(), peaks.len());

    Ok(OnsetAnalysis {
        envelope,
        peaks,
        hop_size: onset.hop_size,
    })
}

/// Spectral-flux onset strength on a log-mel spectrogram.
///
/// Frame `t` is the mean over mel bands of the positive dB increase between
/// frames `t - lag` and `t`, shifted right by `n_fft / (2 * hop_size)` frames
/// so that a rise lines up with the frame whose window starts covering it.
/// The result has exactly `1 + len / hop_size` frames.
pub fn onset_strength(samples: &[f32], sample_rate: u32, config: &OnsetConfig) -> Result<Vec<f32>> {
    if samples.is_empty() {
        return Err(Error::EmptySignal);
    }
    if sample_rate == 0 {
        return Err(Error::InvalidParameter("sample rate must be > 0".into()));
    }
    if config.hop_size == 0 || config.n_fft == 0 || config.n_mels == 0 || config.lag == 0 {
        return Err(Error::InvalidParameter(format!(
            "hop size, n_fft, n_mels and lag must be > 0 (got {}, {}, {}, {})",
            config.hop_size, config.n_fft, config.n_mels, config.lag
        )));
    }

    let power = stft::power_spectrogram(samples, config.n_fft, config.hop_size)?;
    let mut db = mel::mel_spectrogram(&power, sample_rate, config.n_fft, config.n_mels);
    mel::power_to_db(&mut db, config.top_db);

    let n_frames = db.ncols();
    let n_mels = db.nrows() as f32;
    let shift = config.lag + config.n_fft / (2 * config.hop_size);

    let mut envelope = vec![0.0f32; n_frames];
    for t in config.lag..n_frames {
        let target = t - config.lag + shift;
        if target >= n_frames {
            break;
        }
        let current = db.column(t);
        let previous = db.column(t - config.lag);
        let flux: f32 = current
            .iter()
            .zip(previous.iter())
            .map(|(c, p)| (c - p).max(0.0))
            .sum();
        envelope[target] = flux / n_mels;
    }

    Ok(envelope)
}
