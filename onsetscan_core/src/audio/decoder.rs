use anyhow::{anyhow, bail, Context, Result};
use std::path::Path;
use tracing::debug;

use symphonia::core::{
    audio::SampleBuffer,
    codecs::{DecoderOptions, CODEC_TYPE_NULL},
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};

use rubato::{Fft, FixedSync, Resampler};
use audioadapter_buffers::direct::InterleavedSlice;

use crate::config::DEFAULT_SAMPLE_RATE;
use crate::error::Error;

/// Mono samples at a known rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Load `duration_seconds` of audio starting at `offset_seconds`, downmixed to
/// mono and resampled to the default analysis rate.
pub fn load_excerpt<P: AsRef<Path>>(
    source: P,
    offset_seconds: f64,
    duration_seconds: f64,
) -> crate::Result<Waveform> {
    load_excerpt_at(source, offset_seconds, duration_seconds, DEFAULT_SAMPLE_RATE)
}

/// Same as [`load_excerpt`] with an explicit output rate.
pub fn load_excerpt_at<P: AsRef<Path>>(
    source: P,
    offset_seconds: f64,
    duration_seconds: f64,
    target_rate: u32,
) -> crate::Result<Waveform> {
    let path = source.as_ref();

    if !(offset_seconds.is_finite() && offset_seconds >= 0.0) {
        return Err(Error::InvalidParameter(format!(
            "offset must be >= 0 seconds, got {offset_seconds}"
        )));
    }
    if !(duration_seconds.is_finite() && duration_seconds > 0.0) {
        return Err(Error::InvalidParameter(format!(
            "duration must be > 0 seconds, got {duration_seconds}"
        )));
    }
    if target_rate == 0 {
        return Err(Error::InvalidParameter("target sample rate must be > 0".into()));
    }

    let (mono, sr_in) = decode_window_mono(path, offset_seconds, duration_seconds)
        .map_err(|e| Error::decode(path, e))?;

    let samples = resample_mono(&mono, sr_in, target_rate).map_err(|e| Error::decode(path, e))?;

    debug!(
        "loaded {} ({} frames at {} Hz -> {} samples at {} Hz)",
        path.display(),
        mono.len(),
        sr_in,
        samples.len(),
        target_rate
    );

    Ok(Waveform {
        samples,
        sample_rate: target_rate,
    })
}

/// Decode the `[offset, offset + duration)` window of a file to mono f32 at its
/// native rate.
fn decode_window_mono(path: &Path, offset_seconds: f64, duration_seconds: f64) -> Result<(Vec<f32>, u32)> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open audio file: {}", path.display()))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .context("unsupported format or failed to probe container")?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| anyhow!("no supported audio tracks found"))?;

    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("failed to create decoder for selected track")?;

    // The window is only known in frames once the rate is, which may come from
    // the first decoded buffer.
    let mut sample_rate: Option<u32> = track.codec_params.sample_rate;
    let mut window: Option<(u64, u64)> = sample_rate.map(|sr| frame_window(sr, offset_seconds, duration_seconds));

    let mut mono: Vec<f32> = Vec::new();
    let mut frames_seen: u64 = 0;

    loop {
        if let Some((_, end)) = window {
            if frames_seen >= end {
                break;
            }
        }

        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::ResetRequired) => {
                bail!("decoder reset required (chained streams)");
            }
            Err(SymphoniaError::IoError(_)) => break, // end of file
            Err(e) => return Err(e).context("error reading next packet"),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::IoError(_)) => continue,
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(SymphoniaError::ResetRequired) => {
                bail!("decoder reset required mid-stream");
            }
            Err(e) => return Err(e).context("unrecoverable decode error"),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count();
        if channels == 0 {
            continue;
        }
        let sr = *sample_rate.get_or_insert(spec.rate);
        let (start, end) = *window.get_or_insert_with(|| frame_window(sr, offset_seconds, duration_seconds));

        let mut sbuf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sbuf.copy_interleaved_ref(decoded);

        for frame in sbuf.samples().chunks_exact(channels) {
            if frames_seen >= start && frames_seen < end {
                mono.push(frame.iter().sum::<f32>() / channels as f32);
            }
            frames_seen += 1;
        }
    }

    let sr_in = sample_rate.ok_or_else(|| anyhow!("could not determine input sample rate"))?;
    let (start, _) = window.unwrap_or_else(|| frame_window(sr_in, offset_seconds, duration_seconds));

    if (duration_seconds * sr_in as f64).round() < 1.0 {
        bail!(
            "{}s excerpt covers no source frames at {} Hz",
            duration_seconds,
            sr_in
        );
    }
    if frames_seen <= start {
        bail!(
            "source holds {:.3}s of audio, shorter than the {:.3}s offset",
            frames_seen as f64 / sr_in as f64,
            offset_seconds
        );
    }
    if mono.is_empty() {
        bail!("decoded audio was empty");
    }

    Ok((mono, sr_in))
}

/// `[start, end)` in source frames for an excerpt.
fn frame_window(sample_rate: u32, offset_seconds: f64, duration_seconds: f64) -> (u64, u64) {
    let start = (offset_seconds * sample_rate as f64).round() as u64;
    let len = (duration_seconds * sample_rate as f64).round() as u64;
    (start, start.saturating_add(len))
}

/// Resample mono audio with rubato's FFT resampler.
pub fn resample_mono(mono: &[f32], sr_in: u32, sr_out: u32) -> Result<Vec<f32>> {
    if sr_in == sr_out {
        return Ok(mono.to_vec());
    }

    let chunk_size: usize = 1024;
    let sub_chunks: usize = 1;

    let mut resampler = Fft::<f32>::new(
        sr_in as usize,
        sr_out as usize,
        chunk_size,
        sub_chunks,
        1,                // mono
        FixedSync::Input, // fixed input chunking, output varies
    )
        .context("failed to construct FFT resampler")?;

    let input_len_frames = mono.len();
    let out_len_frames = resampler.process_all_needed_output_len(input_len_frames);

    let mut out = vec![0.0f32; out_len_frames];

    let input_adapter =
        InterleavedSlice::new(mono, 1, input_len_frames).context("bad input adapter")?;

    let mut output_adapter =
        InterleavedSlice::new_mut(&mut out, 1, out_len_frames).context("bad output adapter")?;

    let (_frames_read, frames_written) =
        resampler.process_all_into_buffer(&input_adapter, &mut output_adapter, input_len_frames, None)?;

    out.truncate(frames_written);
    Ok(out)
}
