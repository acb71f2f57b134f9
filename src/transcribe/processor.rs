use serde::Deserialize;

use super::{Transcript, TranscriptSegment};
use crate::StageError;

/// Whisper JSON output (`--output_format json`)
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

/// Parse Whisper's JSON into chronologically ordered segments with trimmed text
pub fn parse_whisper_json(content: &str) -> Result<Transcript, StageError> {
    let output: WhisperOutput = serde_json::from_str(content)
        .map_err(|e| StageError::InvalidToolOutput(format!("whisper JSON: {}", e)))?;

    let mut segments: Vec<TranscriptSegment> = output
        .segments
        .into_iter()
        .map(|seg| {
            let (start, end) = if seg.end < seg.start {
                (seg.start, seg.start)
            } else {
                (seg.start, seg.end)
            };
            TranscriptSegment::new(start, end, seg.text.trim())
        })
        .collect();

    // Whisper emits in order already; a stable sort keeps ties as given
    segments.sort_by(|a, b| a.start.total_cmp(&b.start));

    if segments.is_empty() {
        tracing::warn!("Transcriber returned no segments");
    }

    Ok(Transcript {
        segments,
        language: output.language.filter(|l| !l.is_empty()),
    })
}
