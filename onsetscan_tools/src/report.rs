use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};
use tracing::info;

use onsetscan_core::batch::{ItemOutcome, TrackPeaks};

#[derive(Debug, Serialize)]
struct ReportLine<'a> {
    audio_path: String,
    sample_rate: u32,
    frames: usize,
    hop_size: usize,
    peaks: &'a [usize],
    peak_times: Vec<f64>,
}

/// How many outcomes made it into the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportStats {
    pub written: usize,
    /// Failed items, left out of the report.
    pub skipped: usize,
}

/// Write one JSON line per successfully analyzed track to `out_path`.
pub fn write_report(outcomes: &[ItemOutcome<TrackPeaks>], out_path: &Path) -> Result<ReportStats> {
    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let out_file = File::create(out_path)
        .with_context(|| format!("Failed to create output: {}", out_path.display()))?;
    let mut writer = BufWriter::new(out_file);

    let stats = write_report_to(outcomes, &mut writer)?;
    writer.flush()?;

    info!("Wrote: {}", out_path.display());
    info!("Kept: {}", stats.written);
    info!("Skipped (failed): {}", stats.skipped);

    Ok(stats)
}

pub fn write_report_to<W: Write>(outcomes: &[ItemOutcome<TrackPeaks>], mut writer: W) -> Result<ReportStats> {
    let mut stats = ReportStats::default();

    for outcome in outcomes {
        let Ok(track) = &outcome.result else {
            stats.skipped += 1;
            continue;
        };

        let line = ReportLine {
            audio_path: outcome.path.to_string_lossy().to_string(),
            sample_rate: track.sample_rate,
            frames: track.analysis.envelope.len(),
            hop_size: track.analysis.hop_size,
            peaks: &track.analysis.peaks,
            peak_times: track.peak_times(),
        };

        serde_json::to_writer(&mut writer, &line)?;
        writer.write_all(b"\n")?;
        stats.written += 1;
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use onsetscan_core::{Error, OnsetAnalysis};
    use std::path::PathBuf;

    fn outcomes() -> Vec<ItemOutcome<TrackPeaks>> {
        vec![
            ItemOutcome {
                path: PathBuf::from("rock/album/a.wav"),
                result: Ok(TrackPeaks {
                    sample_rate: 22_050,
                    sample_count: 2048,
                    analysis: OnsetAnalysis {
                        envelope: vec![0.0, 1.0, 0.0, 0.0, 0.0],
                        peaks: vec![1],
                        hop_size: 512,
                    },
                }),
            },
            ItemOutcome {
                path: PathBuf::from("rock/album/b.wav"),
                result: Err(Error::EmptySignal),
            },
        ]
    }

    #[test]
    fn writes_successes_and_counts_failures() {
        let mut buf = Vec::new();
        let stats = write_report_to(&outcomes(), &mut buf).unwrap();

        assert_eq!(stats, ReportStats { written: 1, skipped: 1 });

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1);

        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["audio_path"], "rock/album/a.wav");
        assert_eq!(value["frames"], 5);
        assert_eq!(value["peaks"], serde_json::json!([1]));
        let t = value["peak_times"][0].as_f64().unwrap();
        assert!((t - 512.0 / 22_050.0).abs() < 1e-12);
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("reports/peaks.jsonl");

        let stats = write_report(&outcomes(), &out).unwrap();

        assert_eq!(stats.written, 1);
        assert_eq!(std::fs::read_to_string(&out).unwrap().lines().count(), 1);
    }
}
