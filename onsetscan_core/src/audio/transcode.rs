use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::error::{Error, Result};

pub const COMPRESSED_EXTENSION: &str = "mp3";
pub const WAVEFORM_EXTENSION: &str = "wav";

/// Process boundary for producing a waveform file from a compressed one.
pub trait Transcode {
    /// Write `output` from `input`. Called only when `output` does not exist.
    fn transcode(&self, input: &Path, output: &Path) -> Result<()>;
}

/// Runs `<program> -i <input> <output>` and waits for it.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: String,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl Transcode for FfmpegTranscoder {
    fn transcode(&self, input: &Path, output: &Path) -> Result<()> {
        debug!(
            "{} -i {} {}",
            self.program,
            input.display(),
            output.display()
        );

        let result = Command::new(&self.program)
            .arg("-i")
            .arg(input)
            .arg(output)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::ExternalTool {
                program: self.program.clone(),
                status: "spawn failed".to_string(),
                output: e.to_string(),
            })?;

        if !result.status.success() {
            let mut combined = String::from_utf8_lossy(&result.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&result.stderr));
            return Err(Error::external_tool(&self.program, result.status, combined));
        }

        Ok(())
    }
}

/// Sibling waveform path for a compressed track, or `None` for anything else.
pub fn waveform_path(path: &Path) -> Option<PathBuf> {
    let ext = path.extension()?.to_str()?;
    if ext.eq_ignore_ascii_case(COMPRESSED_EXTENSION) {
        Some(path.with_extension(WAVEFORM_EXTENSION))
    } else {
        None
    }
}

/// Return a waveform path for `path`, transcoding an MP3 to its sibling WAV
/// when that file does not exist yet. Non-MP3 paths come back unchanged.
pub fn ensure_waveform<T>(path: &Path, transcoder: &T) -> Result<PathBuf>
where
    T: Transcode + ?Sized,
{
    let Some(wav) = waveform_path(path) else {
        return Ok(path.to_path_buf());
    };

    if wav.exists() {
        debug!("{} already converted", path.display());
        return Ok(wav);
    }

    if let Err(e) = transcoder.transcode(path, &wav) {
        // A partial output would otherwise pass the existence check next time.
        if wav.exists() {
            if let Err(rm) = std::fs::remove_file(&wav) {
                warn!("failed to remove partial {}: {}", wav.display(), rm);
            }
        }
        return Err(e);
    }
    Ok(wav)
}
