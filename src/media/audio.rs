//! Mono audio tracks
//!
//! Decoded audio is held as mono f32 samples at a known rate. WAV input is read
//! with `hound`, downmixed to mono and linearly resampled.

use crate::error::{AnalysisError, AnalysisResult};
use std::borrow::Cow;
use std::path::Path;

/// Mono audio samples in `[-1.0, 1.0]` at `sample_rate` Hz
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioTrack {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// A silent track of the given length
    pub fn silence(duration_ms: u64, sample_rate: u32) -> Self {
        let len = (duration_ms * sample_rate as u64 / 1000) as usize;
        Self::new(vec![0.0; len], sample_rate)
    }

    /// Read a WAV file, downmix to mono and resample to `target_rate`
    pub fn from_wav(path: &Path, target_rate: u32) -> AnalysisResult<Self> {
        let reader = hound::WavReader::open(path).map_err(|e| {
            AnalysisError::MediaRead(format!("{}: {}", path.display(), e))
        })?;
        Self::from_wav_reader(reader, target_rate)
    }

    fn from_wav_reader<R: std::io::Read>(
        mut reader: hound::WavReader<R>,
        target_rate: u32,
    ) -> AnalysisResult<Self> {
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(|e| AnalysisError::MediaRead(e.to_string()))?,
            hound::SampleFormat::Int => {
                let bits = spec.bits_per_sample;
                let max_value = 1i64
                    .checked_shl(u32::from(bits).saturating_sub(1))
                    .filter(|_| bits > 0 && bits <= 32)
                    .ok_or_else(|| {
                        AnalysisError::MediaRead(format!("unsupported bits_per_sample: {bits}"))
                    })? as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max_value))
                    .collect::<Result<_, _>>()
                    .map_err(|e| AnalysisError::MediaRead(e.to_string()))?
            }
        };

        let mono = downmix(&interleaved, channels);
        Ok(AudioTrack::new(mono, spec.sample_rate).resampled(target_rate).into_owned())
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / self.sample_rate as u64
    }

    /// Samples covering `[start_ms, end_ms)`, clipped to the track.
    ///
    /// Ranges past the end of the track yield a shorter or empty slice.
    pub fn slice_ms(&self, start_ms: u64, end_ms: u64) -> &[f32] {
        let to_index = |ms: u64| -> usize {
            let idx = ms.saturating_mul(self.sample_rate as u64) / 1000;
            (idx as usize).min(self.samples.len())
        };
        let start = to_index(start_ms);
        let end = to_index(end_ms.max(start_ms));
        &self.samples[start..end]
    }

    /// This track at `target_rate`, borrowing when no conversion is needed
    pub fn resampled(&self, target_rate: u32) -> Cow<'_, AudioTrack> {
        if target_rate == self.sample_rate || self.sample_rate == 0 || target_rate == 0 {
            return Cow::Borrowed(self);
        }
        Cow::Owned(AudioTrack::new(
            resample_linear(&self.samples, self.sample_rate, target_rate),
            target_rate,
        ))
    }
}

/// Average interleaved channels into one
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Linear-interpolation resampler
fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let output_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 / ratio;
        let src_idx = src_pos.floor() as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        if src_idx + 1 < samples.len() {
            output.push(samples[src_idx] * (1.0 - frac) + samples[src_idx + 1] * frac);
        } else if src_idx < samples.len() {
            output.push(samples[src_idx]);
        }
    }

    output
}
