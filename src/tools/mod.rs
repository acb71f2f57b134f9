//! External collaborators: the downloader and the transcoder, plus the shared process runner.
//!
//! Every tool is invoked as a child process and awaited to completion. Failure to spawn maps
//! to [`StageError::ToolUnavailable`], a non-zero exit to [`StageError::ToolExecutionFailure`].

use async_trait::async_trait;
use std::path::Path;
use std::process::{Output, Stdio};
use tokio::process::Command;

pub mod ffmpeg;
pub mod ytdlp;

use crate::config::Config;
use crate::utils::excerpt;
use crate::StageError;

/// Diagnostic output kept when a tool fails
pub const DIAGNOSTIC_LIMIT: usize = 500;

/// Fetches a video and its provider info document
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `url` to `video_path` and write the provider info to `info_path`
    async fn download(&self, url: &str, video_path: &Path, info_path: &Path) -> Result<(), StageError>;

    fn name(&self) -> &'static str;
}

/// Produces audio tracks and still frames from a video file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Extract a mono 16 kHz WAV track
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<(), StageError>;

    /// Sample one frame every `interval_secs` seconds into `frames_dir`, named with
    /// [`crate::keyframes::RAW_FRAME_PREFIX`] and a sequential ordinal
    async fn extract_frames(
        &self,
        video_path: &Path,
        frames_dir: &Path,
        interval_secs: u64,
    ) -> Result<(), StageError>;

    fn name(&self) -> &'static str;
}

/// Run an external command to completion, mapping failures onto the stage taxonomy
pub async fn run_tool<I, S>(program: &str, args: I) -> Result<Output, StageError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let args: Vec<std::ffi::OsString> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
    tracing::debug!("Running {} {:?}", program, args);

    let output = Command::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| StageError::ToolUnavailable {
            tool: program.to_string(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let diagnostic = if stderr.trim().is_empty() {
            String::from_utf8_lossy(&output.stdout).into_owned()
        } else {
            stderr.into_owned()
        };

        return Err(StageError::ToolExecutionFailure {
            tool: program.to_string(),
            exit_code: output.status.code(),
            diagnostic: excerpt(diagnostic.trim(), DIAGNOSTIC_LIMIT),
        });
    }

    Ok(output)
}

/// Result of probing one collaborator
#[derive(Debug, Clone)]
pub struct ToolCheck {
    pub tool: String,
    pub ok: bool,
    pub detail: String,
}

/// Run a tool with a cheap invocation and report its first line of output
pub async fn check_tool(program: &str, arg: &str) -> ToolCheck {
    match run_tool(program, [arg]).await {
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = stdout.lines().next().unwrap_or("available").trim().to_string();
            ToolCheck {
                tool: program.to_string(),
                ok: true,
                detail,
            }
        }
        Err(e) => ToolCheck {
            tool: program.to_string(),
            ok: false,
            detail: e.to_string(),
        },
    }
}

/// Check that every collaborator is reachable without running the pipeline
pub async fn verify_toolchain(config: &Config) -> Vec<ToolCheck> {
    let mut checks = Vec::new();

    checks.push(check_tool(&config.tools.yt_dlp, "--version").await);
    checks.push(check_tool(&config.tools.ffmpeg, "-version").await);

    let mut whisper = check_tool(&config.tools.whisper, "--help").await;
    if whisper.ok {
        whisper.detail = format!("available (model: {})", config.transcription.model);
    }
    checks.push(whisper);

    checks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_tool_is_unavailable() {
        let err = run_tool("definitely-not-a-real-tool-xyz", ["--version"]).await.unwrap_err();
        assert!(matches!(err, StageError::ToolUnavailable { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_carries_exit_code_and_bounded_diagnostic() {
        let script = "printf '%0.s!' $(seq 1 2000) >&2; exit 3";
        let err = run_tool("sh", ["-c", script]).await.unwrap_err();
        match err {
            StageError::ToolExecutionFailure { exit_code, diagnostic, .. } => {
                assert_eq!(exit_code, Some(3));
                assert!(diagnostic.chars().count() <= DIAGNOSTIC_LIMIT + 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_check_tool_reports_first_line() {
        let check = check_tool("echo", "hello").await;
        assert!(check.ok);
        assert_eq!(check.detail, "hello");
    }
}
