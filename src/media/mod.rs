//! Media access
//!
//! The analyzer never decodes containers itself. A [`MediaDecoder`] turns a
//! local media path into a mono audio track and a frame source; how it does
//! so (FFmpeg, a platform API, pre-extracted files) is its own business.

mod audio;
mod frames;

pub use audio::AudioTrack;
pub use frames::{Frame, FrameSource, ImageSequenceSource, VecFrameSource};

use crate::context::AnalysisContext;
use crate::error::{AnalysisError, AnalysisResult};
use std::path::Path;

/// Audio file name inside a prepared media directory
pub const AUDIO_FILE_NAME: &str = "audio.wav";

/// Frame directory name inside a prepared media directory
pub const FRAMES_DIR_NAME: &str = "frames";

/// Trait for media decoders
pub trait MediaDecoder: Send + Sync {
    /// Decode the audio track as mono samples at `sample_rate` Hz.
    ///
    /// Scratch files, if any, belong in `ctx.work_dir()`.
    fn decode_audio(
        &self,
        media: &Path,
        sample_rate: u32,
        ctx: &AnalysisContext,
    ) -> AnalysisResult<AudioTrack>;

    /// Open the video stream for sequential frame access
    fn decode_video(
        &self,
        media: &Path,
        mirror: bool,
        ctx: &AnalysisContext,
    ) -> AnalysisResult<Box<dyn FrameSource>>;
}

/// Decoder for a demuxed media directory: `frames/` holding one image per
/// frame and `audio.wav` holding the soundtrack.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameDirectoryDecoder;

impl MediaDecoder for FrameDirectoryDecoder {
    fn decode_audio(
        &self,
        media: &Path,
        sample_rate: u32,
        _ctx: &AnalysisContext,
    ) -> AnalysisResult<AudioTrack> {
        ensure_dir(media)?;
        AudioTrack::from_wav(&media.join(AUDIO_FILE_NAME), sample_rate)
    }

    fn decode_video(
        &self,
        media: &Path,
        mirror: bool,
        _ctx: &AnalysisContext,
    ) -> AnalysisResult<Box<dyn FrameSource>> {
        ensure_dir(media)?;
        let source = ImageSequenceSource::open(&media.join(FRAMES_DIR_NAME), mirror)?;
        Ok(Box::new(source))
    }
}

fn ensure_dir(media: &Path) -> AnalysisResult<()> {
    if media.is_dir() {
        Ok(())
    } else {
        Err(AnalysisError::MediaRead(format!(
            "{} is not a media directory",
            media.display()
        )))
    }
}
