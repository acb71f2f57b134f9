//! End-to-end runs of the digest pipeline against in-process fake tools.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use video_digest::catalog::CatalogIndex;
use video_digest::config::Config;
use video_digest::metadata::VideoMetadata;
use video_digest::pipeline::{Pipeline, ProcessRequest, Stage, Toolchain};
use video_digest::platform::{Platform, ProfileRegistry};
use video_digest::tools::{Downloader, Transcoder};
use video_digest::transcribe::{Transcriber, Transcript, TranscriptSegment};
use video_digest::{PipelineError, StageError};

const YOUTUBE_URL: &str = "https://www.youtube.com/watch?v=abcdefghijk";
const TIKTOK_URL: &str = "https://www.tiktok.com/@dancer/video/7234567890123456789";

struct FakeDownloader {
    info: Value,
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn download(&self, _url: &str, video_path: &Path, info_path: &Path) -> Result<(), StageError> {
        fs_err::write(video_path, b"not really a video")?;
        fs_err::write(info_path, serde_json::to_string(&self.info)?)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake-downloader"
    }
}

/// Claims success without producing anything
struct SilentDownloader;

#[async_trait]
impl Downloader for SilentDownloader {
    async fn download(&self, _url: &str, _video_path: &Path, _info_path: &Path) -> Result<(), StageError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "silent-downloader"
    }
}

struct FakeTranscoder {
    frames: usize,
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn extract_audio(&self, _video_path: &Path, audio_path: &Path) -> Result<(), StageError> {
        fs_err::write(audio_path, b"RIFF")?;
        Ok(())
    }

    async fn extract_frames(&self, _video_path: &Path, frames_dir: &Path, _interval_secs: u64) -> Result<(), StageError> {
        fs_err::create_dir_all(frames_dir)?;
        for n in 1..=self.frames {
            fs_err::write(frames_dir.join(format!("raw_{:05}.png", n)), n.to_string())?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake-transcoder"
    }
}

struct FakeTranscriber {
    result: Result<Vec<TranscriptSegment>, String>,
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, _audio_path: &Path) -> Result<Transcript, StageError> {
        match &self.result {
            Ok(segments) => Ok(Transcript {
                segments: segments.clone(),
                language: Some("en".to_string()),
            }),
            Err(diagnostic) => Err(StageError::ToolExecutionFailure {
                tool: "whisper".to_string(),
                exit_code: Some(2),
                diagnostic: diagnostic.clone(),
            }),
        }
    }

    fn model(&self) -> String {
        "tiny".to_string()
    }

    fn name(&self) -> &'static str {
        "fake-transcriber"
    }
}

fn youtube_info() -> Value {
    json!({
        "id": "abcdefghijk",
        "title": "My Great Talk!",
        "channel": "Talk Channel",
        "uploader": "talk_uploader",
        "channel_id": "UC123",
        "channel_url": "https://www.youtube.com/channel/UC123",
        "webpage_url": YOUTUBE_URL,
        "description": "A talk about things.",
        "upload_date": "20240315",
        "duration": 47,
        "width": 1920,
        "height": 1080,
        "language": "en",
        "view_count": 1000,
        "like_count": 50,
        "comment_count": 7,
        "channel_follower_count": 12345,
        "tags": ["talk", "things"],
        "categories": ["Education"]
    })
}

fn segments() -> Vec<TranscriptSegment> {
    vec![
        TranscriptSegment::new(0.0, 4.0, "Hello and welcome."),
        TranscriptSegment::new(14.0, 18.0, "This crosses into the second window."),
        TranscriptSegment::new(31.0, 33.0, "Third window."),
        TranscriptSegment::new(46.0, 50.0, "Runs past the end."),
    ]
}

fn toolchain(info: Value, frames: usize, transcript: Result<Vec<TranscriptSegment>, String>) -> Toolchain {
    Toolchain {
        downloader: Box::new(FakeDownloader { info }),
        transcoder: Box::new(FakeTranscoder { frames }),
        transcriber: Box::new(FakeTranscriber { result: transcript }),
    }
}

fn pipeline(output: &Path, tools: Toolchain) -> Pipeline {
    let config = Config {
        output_dir: output.to_path_buf(),
        catalog_lock_timeout_secs: 2,
        ..Config::default()
    };
    let registry = ProfileRegistry::from_config(&config).unwrap();
    Pipeline::new(config, registry, tools).with_progress(false)
}

fn keyframe_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs_err::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn workspace(output: &TempDir, id: &str) -> PathBuf {
    output.path().join(id)
}

#[tokio::test]
async fn youtube_video_produces_full_workspace() {
    let output = TempDir::new().unwrap();
    let tools = toolchain(youtube_info(), 4, Ok(segments()));

    let outcome = pipeline(output.path(), tools)
        .process(&ProcessRequest::new(YOUTUBE_URL))
        .await
        .unwrap();

    assert_eq!(outcome.video_id.as_str(), "abcdefghijk");
    assert_eq!(outcome.platform, Platform::Youtube);
    assert_eq!(outcome.keyframe_count, 4);
    assert_eq!(outcome.segment_count, 4);
    assert_eq!(outcome.catalog_total, 1);

    let ws = workspace(&output, "abcdefghijk");
    assert_eq!(outcome.workspace_dir, ws);
    assert!(ws.join("video.mp4").is_file());
    assert!(ws.join("audio.wav").is_file());
    assert!(!ws.join("info.json").exists(), "provider info is transient");
    assert_eq!(
        keyframe_names(&ws.join("keyframes")),
        vec!["frame_000s.png", "frame_015s.png", "frame_030s.png", "frame_045s.png"]
    );

    let transcript = fs_err::read_to_string(ws.join("transcript.txt")).unwrap();
    assert!(transcript.starts_with("[0.0s - 4.0s] Hello and welcome.\n"));
    assert_eq!(transcript.lines().count(), 4);

    let digest = fs_err::read_to_string(ws.join("digest.txt")).unwrap();
    let mut lines = digest.lines();
    assert_eq!(lines.next(), Some("YOUTUBE VIDEO DIGEST -- abcdefghijk"));
    assert_eq!(lines.next(), Some("Title: My Great Talk!"));
    assert_eq!(
        lines.next(),
        Some("Channel: Talk Channel | Duration: 0:47 | Language: English")
    );
    assert!(digest.contains("[frame_000s.png] 0s-15s\n  Hello and welcome.\n"));
    assert!(digest.contains("[frame_015s.png] 15s-30s\n  This crosses into the second window.\n"));
    assert!(digest.contains("[frame_030s.png] 30s-45s\n  Third window.\n"));
    assert!(digest.contains("[frame_045s.png] 45s-47s\n  Runs past the end.\n"));

    let meta = VideoMetadata::read_from(&ws.join("metadata.json")).unwrap();
    assert_eq!(meta.alias, "my-great-talk");
    assert_eq!(meta.creator, "Talk Channel");
    assert_eq!(meta.upload_date.as_deref(), Some("2024-03-15"));
    assert_eq!(meta.resolution, "1920x1080");
    assert_eq!(meta.subscriber_count, Some(12345));
    assert_eq!(meta.keyframe_count, 4);
    assert_eq!(meta.keyframe_interval_seconds, 15);
    assert_eq!(meta.transcript_segments, 4);
    assert_eq!(meta.whisper_model, "tiny");

    let index = CatalogIndex::load_or_init(&CatalogIndex::path_in(output.path())).unwrap();
    assert_eq!(index.total_videos, 1);
    assert_eq!(index.videos[0].video_id.as_str(), "abcdefghijk");
    assert_eq!(index.videos[0].path, "abcdefghijk/");
    assert_eq!(index.videos[0].alias, "my-great-talk");
}

#[tokio::test]
async fn reprocessing_replaces_artifacts_and_catalog_entry() {
    let output = TempDir::new().unwrap();

    pipeline(output.path(), toolchain(youtube_info(), 4, Ok(segments())))
        .process(&ProcessRequest::new(YOUTUBE_URL))
        .await
        .unwrap();

    let outcome = pipeline(output.path(), toolchain(youtube_info(), 3, Ok(segments())))
        .process(&ProcessRequest::new(YOUTUBE_URL).with_alias(Some("renamed".to_string())))
        .await
        .unwrap();

    assert_eq!(outcome.keyframe_count, 3);
    let ws = workspace(&output, "abcdefghijk");
    // no frames survive from the first run
    assert_eq!(keyframe_names(&ws.join("keyframes")).len(), 3);

    let index = CatalogIndex::load_or_init(&CatalogIndex::path_in(output.path())).unwrap();
    assert_eq!(index.total_videos, 1);
    assert_eq!(index.videos[0].alias, "renamed");
}

#[tokio::test]
async fn reprocessing_never_reuses_the_previous_download() {
    let output = TempDir::new().unwrap();

    pipeline(output.path(), toolchain(youtube_info(), 4, Ok(segments())))
        .process(&ProcessRequest::new(YOUTUBE_URL))
        .await
        .unwrap();

    let tools = Toolchain {
        downloader: Box::new(SilentDownloader),
        transcoder: Box::new(FakeTranscoder { frames: 4 }),
        transcriber: Box::new(FakeTranscriber { result: Ok(segments()) }),
    };
    let err = pipeline(output.path(), tools)
        .process(&ProcessRequest::new(YOUTUBE_URL))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::StageFailed {
            stage: Stage::Download,
            source: StageError::ExpectedArtifactMissing(_),
        }
    ));

    // nothing from the first run is left to pass for this run's output
    let ws = workspace(&output, "abcdefghijk");
    for file in ["video.mp4", "audio.wav", "transcript.txt", "digest.txt", "metadata.json"] {
        assert!(!ws.join(file).exists(), "{} survived the reset", file);
    }
    assert!(keyframe_names(&ws.join("keyframes")).is_empty());

    // the catalog still describes the last successful run
    let index = CatalogIndex::load_or_init(&CatalogIndex::path_in(output.path())).unwrap();
    assert_eq!(index.total_videos, 1);
    assert_eq!(index.videos[0].title, "My Great Talk!");
}

#[tokio::test]
async fn tiktok_video_uses_short_interval_and_plain_metadata() {
    let output = TempDir::new().unwrap();
    let info = json!({
        "title": "",
        "uploader": "dancer",
        "duration": 10,
        "width": 1080,
        "height": 1920,
        "tags": ["ignored"],
        "language": "es"
    });

    let outcome = pipeline(
        output.path(),
        toolchain(info, 4, Ok(vec![TranscriptSegment::new(4.0, 5.0, "hola")])),
    )
    .process(&ProcessRequest::new(TIKTOK_URL))
    .await
    .unwrap();

    assert_eq!(outcome.video_id.as_str(), "7234567890123456789");
    assert_eq!(outcome.platform, Platform::Tiktok);

    let ws = workspace(&output, "7234567890123456789");
    assert_eq!(
        keyframe_names(&ws.join("keyframes")),
        vec!["frame_000s.png", "frame_003s.png", "frame_006s.png", "frame_009s.png"]
    );

    let digest = fs_err::read_to_string(ws.join("digest.txt")).unwrap();
    assert!(digest.starts_with("TIKTOK VIDEO DIGEST -- 7234567890123456789\n"));
    assert!(digest.contains("Creator: dancer | Duration: 0:10\n"));
    assert!(!digest.contains("Language"));
    assert!(digest.contains("[frame_003s.png] 3s-6s\n  hola\n"));
    assert!(digest.contains("[frame_009s.png] 9s-10s\n"));

    // empty title falls back to the video ID
    let raw: Value =
        serde_json::from_str(&fs_err::read_to_string(ws.join("metadata.json")).unwrap()).unwrap();
    assert_eq!(raw["alias"], "7234567890123456789");
    assert_eq!(raw["creator"], "dancer");
    assert!(raw.get("tags").is_none());
    assert!(raw.get("language").is_none());
    assert!(raw.get("channel_id").is_none());
}

#[tokio::test]
async fn forced_platform_overrides_detection() {
    let output = TempDir::new().unwrap();
    let url = "https://mirror.example.com/share/video/7234567890123456789";

    let outcome = pipeline(output.path(), toolchain(json!({ "duration": 3 }), 1, Ok(Vec::new())))
        .process(&ProcessRequest::new(url).with_platform(Some(Platform::Tiktok)))
        .await
        .unwrap();

    assert_eq!(outcome.video_id.as_str(), "7234567890123456789");
    let meta = &outcome.metadata;
    assert_eq!(meta.creator, "");
    assert_eq!(meta.url, url);
}

#[tokio::test]
async fn unsupported_url_is_rejected_before_any_work() {
    let output = TempDir::new().unwrap();

    let err = pipeline(output.path(), toolchain(youtube_info(), 4, Ok(segments())))
        .process(&ProcessRequest::new("https://vimeo.com/123456"))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::InvalidUrl(_)));
    assert_eq!(fs_err::read_dir(output.path()).unwrap().count(), 0);
}

#[test]
fn transcription_failure_leaves_partial_workspace_and_no_catalog() {
    let output = TempDir::new().unwrap();
    let tools = toolchain(youtube_info(), 4, Err("CUDA out of memory".to_string()));

    let err = tokio_test::block_on(
        pipeline(output.path(), tools).process(&ProcessRequest::new(YOUTUBE_URL)),
    )
    .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Transcribe));
    assert_eq!(err.to_string(), "Stage 'transcribe' failed");
    let message = format!("{:#}", anyhow::Error::from(err));
    assert!(message.contains("exit code 2"));
    assert!(message.contains("CUDA out of memory"));

    let ws = workspace(&output, "abcdefghijk");
    assert!(ws.join("audio.wav").is_file());
    assert!(ws.join("keyframes").join("frame_000s.png").is_file());
    assert!(ws.join("info.json").is_file(), "cleanup never ran");
    assert!(!ws.join("digest.txt").exists());
    assert!(!ws.join("metadata.json").exists());
    assert!(!CatalogIndex::path_in(output.path()).exists());
}

#[tokio::test]
async fn concurrent_runs_share_one_catalog() {
    let output = TempDir::new().unwrap();
    let first = pipeline(output.path(), toolchain(youtube_info(), 4, Ok(segments())));
    let second = pipeline(output.path(), toolchain(json!({ "duration": 6 }), 2, Ok(Vec::new())));

    let youtube_request = ProcessRequest::new(YOUTUBE_URL);
    let tiktok_request = ProcessRequest::new(TIKTOK_URL);
    let (a, b) = tokio::join!(first.process(&youtube_request), second.process(&tiktok_request));
    a.unwrap();
    b.unwrap();

    let index = CatalogIndex::load_or_init(&CatalogIndex::path_in(output.path())).unwrap();
    assert_eq!(index.total_videos, 2);
    assert!(!output.path().join("index.json.lock").exists());
}
