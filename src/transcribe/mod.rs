use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tempfile::TempDir;

pub mod processor;

use crate::tools::run_tool;
use crate::StageError;

/// Individual transcript segment with timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds
    pub start: f64,

    /// End time in seconds
    pub end: f64,

    /// Segment text
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Point used to decide which keyframe window the segment belongs to
    pub fn midpoint(&self) -> f64 {
        (self.start + self.end) / 2.0
    }
}

/// Full output of a transcription run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Segments in chronological order
    pub segments: Vec<TranscriptSegment>,

    /// Language reported by the engine
    pub language: Option<String>,
}

/// Speech-to-text engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the whole file, returning every segment at once
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript, StageError>;

    /// Model identifier recorded in the metadata
    fn model(&self) -> String;

    fn name(&self) -> &'static str;
}

/// Transcriber backed by the OpenAI Whisper command-line tool
pub struct WhisperTranscriber {
    whisper_path: String,
    model: String,
    language: Option<String>,
}

impl WhisperTranscriber {
    pub fn new(whisper_path: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            whisper_path: whisper_path.into(),
            model: model.into(),
            language: None,
        }
    }

    /// Fix the spoken language instead of letting Whisper detect it
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        let language = language.into();
        self.language = (!language.trim().is_empty()).then_some(language);
        self
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript, StageError> {
        let output_dir = TempDir::new()?;
        let audio = audio_path.to_string_lossy();
        let out = output_dir.path().to_string_lossy();

        let mut args: Vec<String> = vec![
            audio.to_string(),
            "--model".into(),
            self.model.clone(),
            "--output_format".into(),
            "json".into(),
            "--output_dir".into(),
            out.to_string(),
            "--verbose".into(),
            "False".into(),
        ];
        if let Some(language) = &self.language {
            args.push("--language".into());
            args.push(language.clone());
        }

        tracing::info!("Running Whisper ({}) on {}", self.model, audio_path.display());
        run_tool(&self.whisper_path, &args).await?;

        let stem = audio_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        let json_path = output_dir.path().join(format!("{}.json", stem));
        if !json_path.exists() {
            return Err(StageError::ExpectedArtifactMissing(json_path));
        }

        let content = fs_err::read_to_string(&json_path)?;
        processor::parse_whisper_json(&content)
    }

    fn model(&self) -> String {
        self.model.clone()
    }

    fn name(&self) -> &'static str {
        "whisper"
    }
}

/// Render segments as `[start - end] text` lines
pub fn render_transcript(segments: &[TranscriptSegment]) -> String {
    let mut out = segments
        .iter()
        .map(|seg| format!("[{:.1}s - {:.1}s] {}", seg.start, seg.end, seg.text))
        .collect::<Vec<_>>()
        .join("\n");
    out.push('\n');
    out
}
