//! Video Digest - A Rust CLI tool for turning online videos into navigable digests
//!
//! This library downloads a video from a supported platform, extracts audio and periodic
//! keyframes, transcribes the speech, and aligns the transcript with the keyframes into a
//! plain-text digest. Every processed video gets its own workspace directory and an entry
//! in a shared catalog.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod digest;
pub mod keyframes;
pub mod metadata;
pub mod output;
pub mod pipeline;
pub mod platform;
pub mod tools;
pub mod transcribe;
pub mod utils;
pub mod workspace;

use std::path::PathBuf;

pub use catalog::{CatalogEntry, CatalogIndex};
pub use cli::{Cli, Commands};
pub use config::Config;
pub use pipeline::{Pipeline, ProcessOutcome, ProcessRequest, Stage, Toolchain};
pub use platform::{PlatformProfile, ProfileRegistry, VideoId};
pub use transcribe::TranscriptSegment;
pub use workspace::ArtifactWorkspace;

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Failure of a single pipeline stage
#[derive(thiserror::Error, Debug)]
pub enum StageError {
    #[error("{tool} is not available: {reason}")]
    ToolUnavailable { tool: String, reason: String },

    #[error("{tool} exited with {}: {diagnostic}", exit_label(.exit_code))]
    ToolExecutionFailure {
        tool: String,
        exit_code: Option<i32>,
        diagnostic: String,
    },

    #[error("expected artifact was not produced: {}", .0.display())]
    ExpectedArtifactMissing(PathBuf),

    #[error("unexpected tool output: {0}")]
    InvalidToolOutput(String),

    #[error("catalog is locked by another writer: {}", .0.display())]
    CatalogLocked(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn exit_label(code: impl std::borrow::Borrow<Option<i32>>) -> String {
    match code.borrow() {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl StageError {
    /// Exit code of the failed external command, if there was one
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            StageError::ToolExecutionFailure { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

/// Error types specific to the digest pipeline
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Cannot extract video ID from URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to prepare workspace")]
    Workspace(#[source] std::io::Error),

    #[error("Stage '{stage}' failed")]
    StageFailed {
        stage: Stage,
        #[source]
        source: StageError,
    },
}

impl PipelineError {
    /// Stage that aborted the run, if the failure happened inside one
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
