//! Pipeline configuration.
//!
//! Every pipeline entry point takes its settings from a [`PipelineConfig`]
//! instead of process-wide constants. All sections are optional in the TOML
//! file; missing fields fall back to the defaults below.
//!
//! ```toml
//! [dataset]
//! root = "datasets/mp3s-32k"
//!
//! [excerpt]
//! offset_seconds = 1.0
//! duration_seconds = 10.0
//!
//! [onset]
//! hop_size = 512
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Analysis rate every excerpt is resampled to.
pub const DEFAULT_SAMPLE_RATE: u32 = 22_050;
pub const DEFAULT_HOP_SIZE: usize = 512;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub dataset: DatasetConfig,
    pub transcoder: TranscoderConfig,
    pub excerpt: ExcerptConfig,
    pub onset: OnsetConfig,
    pub peaks: PeakPickConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Root of the `<genre>/<album>/<track>` tree.
    pub root: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("datasets/mp3s-32k"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscoderConfig {
    pub program: String,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExcerptConfig {
    pub offset_seconds: f64,
    pub duration_seconds: f64,
    pub sample_rate: u32,
}

impl Default for ExcerptConfig {
    fn default() -> Self {
        Self {
            offset_seconds: 1.0,
            duration_seconds: 10.0,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

/// Onset-strength envelope parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OnsetConfig {
    /// Frame advance in samples.
    pub hop_size: usize,
    /// STFT window length in samples.
    pub n_fft: usize,
    pub n_mels: usize,
    /// Dynamic range kept below the loudest mel cell, in dB.
    pub top_db: f32,
    /// Frame distance used for the spectral difference.
    pub lag: usize,
}

impl Default for OnsetConfig {
    fn default() -> Self {
        Self {
            hop_size: DEFAULT_HOP_SIZE,
            n_fft: 2048,
            n_mels: 128,
            top_db: 80.0,
            lag: 1,
        }
    }
}

/// Peak-picking parameters. All windows are in frames.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PeakPickConfig {
    pub pre_max: usize,
    pub post_max: usize,
    pub pre_avg: usize,
    pub post_avg: usize,
    /// Absolute margin above the local mean.
    pub delta: f32,
    /// Relative margin above the local mean (`x >= mean * (1 + relative)`).
    pub relative: f32,
    /// Minimum distance between accepted peaks.
    pub wait: usize,
}

impl Default for PeakPickConfig {
    fn default() -> Self {
        Self {
            pre_max: 10,
            post_max: 10,
            pre_avg: 10,
            post_avg: 10,
            delta: 0.5,
            relative: 0.5,
            wait: 10,
        }
    }
}

impl PipelineConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PipelineConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Reject settings no pipeline step can run with.
    pub fn validate(&self) -> Result<()> {
        let excerpt = &self.excerpt;
        if !(excerpt.offset_seconds.is_finite() && excerpt.offset_seconds >= 0.0) {
            return Err(Error::Config(format!(
                "excerpt.offset_seconds must be >= 0, got {}",
                excerpt.offset_seconds
            )));
        }
        if !(excerpt.duration_seconds.is_finite() && excerpt.duration_seconds > 0.0) {
            return Err(Error::Config(format!(
                "excerpt.duration_seconds must be > 0, got {}",
                excerpt.duration_seconds
            )));
        }
        if excerpt.sample_rate == 0 {
            return Err(Error::Config("excerpt.sample_rate must be > 0".into()));
        }
        if self.onset.hop_size == 0 || self.onset.n_fft == 0 || self.onset.n_mels == 0 {
            return Err(Error::Config(
                "onset.hop_size, onset.n_fft and onset.n_mels must be > 0".into(),
            ));
        }
        if self.onset.lag == 0 {
            return Err(Error::Config("onset.lag must be > 0".into()));
        }
        if self.transcoder.program.trim().is_empty() {
            return Err(Error::Config("transcoder.program must not be empty".into()));
        }
        Ok(())
    }
}
