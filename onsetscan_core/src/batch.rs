//! Dataset-wide drivers.
//!
//! Every item produces an [`ItemOutcome`]; a failing track is logged with its
//! path and the run moves on to the next one.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::audio::decoder::load_excerpt_at;
use crate::audio::onset::{detect_peaks_with, OnsetAnalysis};
use crate::audio::transcode::{ensure_waveform, Transcode};
use crate::config::PipelineConfig;
use crate::dataset;
use crate::error::Result;

/// Result of processing one track.
#[derive(Debug)]
pub struct ItemOutcome<T> {
    pub path: PathBuf,
    pub result: Result<T>,
}

impl<T> ItemOutcome<T> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Onset analysis of one track's excerpt.
#[derive(Debug, Clone)]
pub struct TrackPeaks {
    pub sample_rate: u32,
    /// Length of the analyzed excerpt in samples.
    pub sample_count: usize,
    pub analysis: OnsetAnalysis,
}

impl TrackPeaks {
    pub fn peak_times(&self) -> Vec<f64> {
        self.analysis.peak_times(self.sample_rate)
    }
}

/// Counts of successful and failed items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn of<T>(outcomes: &[ItemOutcome<T>]) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_ok()).count();
        Self {
            succeeded,
            failed: outcomes.len() - succeeded,
        }
    }
}

/// Load the configured excerpt of `path` and detect its onset peaks.
pub fn analyze_track(path: &Path, config: &PipelineConfig) -> Result<TrackPeaks> {
    let excerpt = &config.excerpt;
    let waveform = load_excerpt_at(
        path,
        excerpt.offset_seconds,
        excerpt.duration_seconds,
        excerpt.sample_rate,
    )?;
    let analysis = detect_peaks_with(
        &waveform.samples,
        waveform.sample_rate,
        &config.onset,
        &config.peaks,
    )?;

    Ok(TrackPeaks {
        sample_rate: waveform.sample_rate,
        sample_count: waveform.samples.len(),
        analysis,
    })
}

/// Analyze each path in order.
pub fn analyze_paths<I>(paths: I, config: &PipelineConfig) -> Vec<ItemOutcome<TrackPeaks>>
where
    I: IntoIterator<Item = PathBuf>,
{
    let outcomes: Vec<_> = paths
        .into_iter()
        .map(|path| {
            let result = analyze_track(&path, config);
            if let Err(e) = &result {
                warn!("An error occurred processing {}: {}", path.display(), e);
            }
            ItemOutcome { path, result }
        })
        .collect();

    let summary = BatchSummary::of(&outcomes);
    info!(
        "analyzed {} tracks ({} failed)",
        summary.succeeded, summary.failed
    );
    outcomes
}

/// Analyze the waveform tracks under the dataset root, at most `limit` of them.
pub fn analyze_all(config: &PipelineConfig, limit: Option<usize>) -> Result<Vec<ItemOutcome<TrackPeaks>>> {
    let tracks = dataset::waveform_tracks(&config.dataset.root)?;
    let limit = limit.unwrap_or(tracks.len());
    info!(
        "found {} waveform tracks under {}",
        tracks.len(),
        config.dataset.root.display()
    );
    Ok(analyze_paths(tracks.into_iter().take(limit), config))
}

/// Convert every compressed track under the dataset root to a sibling WAV.
pub fn convert_all<T>(config: &PipelineConfig, transcoder: &T) -> Result<Vec<ItemOutcome<PathBuf>>>
where
    T: Transcode + ?Sized,
{
    let tracks = dataset::compressed_tracks(&config.dataset.root)?;
    info!(
        "converting {} tracks under {}",
        tracks.len(),
        config.dataset.root.display()
    );

    let outcomes: Vec<_> = tracks
        .into_iter()
        .map(|path| {
            let result = ensure_waveform(&path, transcoder);
            if let Err(e) = &result {
                warn!("failed to convert {}: {}", path.display(), e);
            }
            ItemOutcome { path, result }
        })
        .collect();

    let summary = BatchSummary::of(&outcomes);
    info!("Done! {} converted or cached, {} failed", summary.succeeded, summary.failed);
    Ok(outcomes)
}
