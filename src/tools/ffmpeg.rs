use async_trait::async_trait;
use std::path::Path;

use super::{run_tool, Transcoder};
use crate::keyframes::RAW_FRAME_PREFIX;
use crate::StageError;

/// Sample rate expected by the transcriber
pub const AUDIO_SAMPLE_RATE: u32 = 16_000;

/// Audio and keyframe extraction backed by ffmpeg
pub struct FfmpegTranscoder {
    ffmpeg_path: String,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    /// Output pattern ffmpeg fills with sequential ordinals
    pub fn frame_pattern(frames_dir: &Path) -> std::path::PathBuf {
        frames_dir.join(format!("{}%05d.png", RAW_FRAME_PREFIX))
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<(), StageError> {
        tracing::debug!("Extracting audio from {}", video_path.display());

        let sample_rate = AUDIO_SAMPLE_RATE.to_string();
        let input = video_path.to_string_lossy();
        let output = audio_path.to_string_lossy();

        run_tool(
            &self.ffmpeg_path,
            [
                "-y", // Overwrite output file
                "-i",
                &*input,
                "-vn", // No video
                "-acodec",
                "pcm_s16le",
                "-ar",
                sample_rate.as_str(),
                "-ac",
                "1",
                &*output,
            ],
        )
        .await?;

        Ok(())
    }

    async fn extract_frames(
        &self,
        video_path: &Path,
        frames_dir: &Path,
        interval_secs: u64,
    ) -> Result<(), StageError> {
        tracing::debug!("Sampling one frame every {}s from {}", interval_secs, video_path.display());

        let filter = format!("fps=1/{}", interval_secs);
        let input = video_path.to_string_lossy();
        let pattern = Self::frame_pattern(frames_dir);
        let pattern = pattern.to_string_lossy();

        run_tool(
            &self.ffmpeg_path,
            ["-y", "-i", &*input, "-vf", filter.as_str(), &*pattern],
        )
        .await?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}
