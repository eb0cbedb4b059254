//! onsetscan - onset peak analysis over a music dataset.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use onsetscan_core::batch::{self, BatchSummary};
use onsetscan_core::{ensure_waveform, FfmpegTranscoder, PipelineConfig};

#[derive(Parser, Debug)]
#[command(name = "onsetscan")]
#[command(about = "Convert tracks and pick onset peaks from their excerpts")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "ONSETSCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Dataset root, overrides the configuration file
    #[arg(long, env = "ONSETSCAN_DATASET_ROOT")]
    dataset_root: Option<PathBuf>,

    /// Frame advance in samples
    #[arg(long)]
    hop_size: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert every MP3 under the dataset root to a sibling WAV
    Convert,

    /// Detect onset peaks for every WAV under the dataset root
    Analyze {
        /// Only analyze the first N tracks
        #[arg(short, long)]
        limit: Option<usize>,

        /// Write a JSON Lines report here
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Detect onset peaks in a single file, converting it first if needed
    Peaks {
        file: PathBuf,

        /// Excerpt start in seconds
        #[arg(long)]
        offset: Option<f64>,

        /// Excerpt length in seconds
        #[arg(long)]
        duration: Option<f64>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "onsetscan=info,onsetscan_core=info,onsetscan_tools=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    match args.command {
        Command::Convert => {
            let transcoder = FfmpegTranscoder::new(config.transcoder.program.clone());
            info!("transcoding with {}", transcoder.program());
            let outcomes = batch::convert_all(&config, &transcoder)?;
            let summary = BatchSummary::of(&outcomes);
            println!("Converted: {}", summary.succeeded);
            println!("Failed: {}", summary.failed);
        }
        Command::Analyze { limit, report } => {
            let outcomes = batch::analyze_all(&config, limit)?;
            for outcome in &outcomes {
                if let Ok(track) = &outcome.result {
                    println!(
                        "{}: {} peaks in {} frames",
                        outcome.path.display(),
                        track.analysis.peaks.len(),
                        track.analysis.envelope.len()
                    );
                }
            }
            if let Some(report) = report {
                let stats = onsetscan_tools::write_report(&outcomes, &report)?;
                println!("Wrote {} tracks to {}", stats.written, report.display());
            }
            let summary = BatchSummary::of(&outcomes);
            println!("Analyzed: {}", summary.succeeded);
            println!("Failed: {}", summary.failed);
        }
        Command::Peaks {
            file,
            offset,
            duration,
        } => {
            let mut config = config;
            if let Some(offset) = offset {
                config.excerpt.offset_seconds = offset;
            }
            if let Some(duration) = duration {
                config.excerpt.duration_seconds = duration;
            }
            config.validate()?;

            let transcoder = FfmpegTranscoder::new(config.transcoder.program.clone());
            let wav = ensure_waveform(&file, &transcoder)
                .with_context(|| format!("An error occurred converting {}", file.display()))?;
            let track = batch::analyze_track(&wav, &config)
                .with_context(|| format!("An error occurred processing {}", wav.display()))?;

            info!(
                "{} frames at {} Hz, hop {}",
                track.analysis.envelope.len(),
                track.sample_rate,
                track.analysis.hop_size
            );
            for (frame, time) in track.analysis.peaks.iter().zip(track.peak_times()) {
                println!("{frame}\t{time:.3}");
            }
        }
    }

    Ok(())
}

fn load_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(root) = &args.dataset_root {
        config.dataset.root = root.clone();
    }
    if let Some(hop) = args.hop_size {
        config.onset.hop_size = hop;
    }
    config.validate()?;

    Ok(config)
}
