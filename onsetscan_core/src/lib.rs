//! Onset analysis for a dataset of music tracks.
//!
//! The pipeline has three steps, each usable on its own:
//!
//! 1. [`ensure_waveform`] converts an MP3 to a sibling WAV with an external
//!    transcoder, skipping the work when the WAV already exists.
//! 2. [`load_excerpt`] decodes a mono window of a track at the analysis rate.
//! 3. [`detect_peaks`] computes the onset-strength envelope and picks peaks.
//!
//! [`batch`] runs the steps over a whole dataset, one outcome per track.

pub mod audio;
pub mod batch;
pub mod config;
pub mod dataset;
pub mod error;

pub use audio::decoder::{load_excerpt, load_excerpt_at, Waveform};
pub use audio::onset::{detect_peaks, detect_peaks_with, frames_to_time, OnsetAnalysis};
pub use audio::transcode::{ensure_waveform, FfmpegTranscoder, Transcode};
pub use config::PipelineConfig;
pub use error::{Error, Result};
