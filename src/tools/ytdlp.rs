use async_trait::async_trait;
use std::path::Path;

use super::{run_tool, Downloader};
use crate::StageError;

/// Format selection preferring an MP4 container that ffmpeg can read directly
const FORMAT_SELECTOR: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// Video downloader backed by yt-dlp
pub struct YtDlpDownloader {
    yt_dlp_path: String,
}

impl YtDlpDownloader {
    pub fn new(yt_dlp_path: impl Into<String>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
        }
    }

    /// Always re-download: a file left at `video_path` must never count as this run's video
    fn download_args(url: &str, video_path: &Path) -> Vec<String> {
        vec![
            "-f".to_string(),
            FORMAT_SELECTOR.to_string(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
            "--write-info-json".to_string(),
            "--no-playlist".to_string(),
            "--force-overwrites".to_string(),
            "-o".to_string(),
            video_path.to_string_lossy().into_owned(),
            url.to_string(),
        ]
    }

    /// yt-dlp writes the info document next to the video as `<stem>.info.json`
    fn written_info_path(video_path: &Path) -> std::path::PathBuf {
        let stem = video_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());
        video_path.with_file_name(format!("{}.info.json", stem))
    }
}

#[async_trait]
impl Downloader for YtDlpDownloader {
    async fn download(&self, url: &str, video_path: &Path, info_path: &Path) -> Result<(), StageError> {
        tracing::debug!("Downloading video for: {}", url);

        run_tool(&self.yt_dlp_path, Self::download_args(url, video_path)).await?;

        let written = Self::written_info_path(video_path);
        if written.exists() && written != info_path {
            fs_err::rename(&written, info_path)?;
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

impl Default for YtDlpDownloader {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}
