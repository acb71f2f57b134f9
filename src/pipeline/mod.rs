//! Stage sequencer.
//!
//! Runs `Download -> ExtractAudio -> ExtractKeyframes -> Transcribe -> BuildDigest -> Catalog
//! -> Cleanup` strictly in order. A stage only counts as successful when its tool succeeded
//! and the artifact it should have produced exists. The first failure aborts the run; files
//! already written stay in the workspace for inspection and the catalog is left untouched.

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::catalog::{upsert_catalog, CatalogEntry};
use crate::config::Config;
use crate::digest::{render_digest, DigestHeader};
use crate::keyframes::{expected_keyframe_count, index_keyframes, Keyframe};
use crate::metadata::{self, build_metadata, MetadataContext, MetadataLimits, VideoMetadata};
use crate::platform::{Platform, PlatformProfile, ProfileRegistry, VideoId};
use crate::tools::ffmpeg::FfmpegTranscoder;
use crate::tools::ytdlp::YtDlpDownloader;
use crate::tools::{Downloader, Transcoder};
use crate::transcribe::{render_transcript, Transcriber, Transcript, WhisperTranscriber};
use crate::workspace::{ArtifactStatus, ArtifactWorkspace};
use crate::{PipelineError, StageError};

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Download,
    ExtractAudio,
    ExtractKeyframes,
    Transcribe,
    BuildDigest,
    Catalog,
    Cleanup,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Download,
        Stage::ExtractAudio,
        Stage::ExtractKeyframes,
        Stage::Transcribe,
        Stage::BuildDigest,
        Stage::Catalog,
        Stage::Cleanup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Download => "download",
            Stage::ExtractAudio => "extract-audio",
            Stage::ExtractKeyframes => "extract-keyframes",
            Stage::Transcribe => "transcribe",
            Stage::BuildDigest => "build-digest",
            Stage::Catalog => "catalog",
            Stage::Cleanup => "cleanup",
        }
    }

    /// 1-based position in the run
    pub fn number(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0) + 1
    }

    fn description(&self) -> &'static str {
        match self {
            Stage::Download => "Downloading video",
            Stage::ExtractAudio => "Extracting audio",
            Stage::ExtractKeyframes => "Extracting keyframes",
            Stage::Transcribe => "Transcribing audio",
            Stage::BuildDigest => "Building digest",
            Stage::Catalog => "Writing metadata and catalog",
            Stage::Cleanup => "Cleaning up",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The external collaborators a run delegates to
pub struct Toolchain {
    pub downloader: Box<dyn Downloader>,
    pub transcoder: Box<dyn Transcoder>,
    pub transcriber: Box<dyn Transcriber>,
}

impl Toolchain {
    /// yt-dlp, ffmpeg and Whisper as configured
    pub fn from_config(config: &Config) -> Self {
        Self {
            downloader: Box::new(YtDlpDownloader::new(&config.tools.yt_dlp)),
            transcoder: Box::new(FfmpegTranscoder::new(&config.tools.ffmpeg)),
            transcriber: Box::new(
                WhisperTranscriber::new(&config.tools.whisper, &config.transcription.model)
                    .with_language(&config.transcription.language),
            ),
        }
    }
}

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub video_id: VideoId,
    pub platform: Platform,
    pub workspace_dir: PathBuf,
    pub keyframe_count: usize,
    pub segment_count: usize,
    pub metadata: VideoMetadata,
    pub catalog_total: usize,
}

/// Request for a single run
#[derive(Debug, Clone, Default)]
pub struct ProcessRequest {
    pub url: String,
    pub alias: Option<String>,
    pub platform: Option<Platform>,
}

impl ProcessRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_alias(mut self, alias: Option<String>) -> Self {
        self.alias = alias;
        self
    }

    pub fn with_platform(mut self, platform: Option<Platform>) -> Self {
        self.platform = platform;
        self
    }
}

/// Main digest pipeline
pub struct Pipeline {
    config: Config,
    profiles: ProfileRegistry,
    tools: Toolchain,
    show_progress: bool,
}

impl Pipeline {
    pub fn new(config: Config, profiles: ProfileRegistry, tools: Toolchain) -> Self {
        Self {
            config,
            profiles,
            tools,
            show_progress: true,
        }
    }

    /// Build a pipeline with the real tools and configured profiles
    pub fn from_config(config: Config) -> crate::Result<Self> {
        let profiles = ProfileRegistry::from_config(&config)?;
        let tools = Toolchain::from_config(&config);
        Ok(Self::new(config, profiles, tools))
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run every stage for one URL
    pub async fn process(&self, request: &ProcessRequest) -> Result<ProcessOutcome, PipelineError> {
        let url = request.url.trim();
        let profile = self.profiles.select(url, request.platform)?;
        let video_id = profile.resolve_video_id(url)?;

        tracing::info!("Processing {} video {} from {}", profile.name(), video_id, url);

        let workspace = ArtifactWorkspace::open(&self.config.output_dir, &video_id)
            .map_err(PipelineError::Workspace)?;

        let existing = workspace.status();
        if existing.is_complete() {
            tracing::info!("Reprocessing {}; the previous digest will be replaced", video_id);
        } else if existing != ArtifactStatus::default() {
            tracing::info!("Discarding partial artifacts of an earlier run for {}", video_id);
        }
        workspace.reset_for_run().map_err(PipelineError::Workspace)?;

        let info = self
            .stage(Stage::Download, self.download(url, &workspace))
            .await?;
        tracing::info!(
            "Title: {} ({})",
            metadata::first_str(&info, &["title"]).unwrap_or_else(|| "Unknown".to_string()),
            metadata::format_duration(metadata::duration_secs(&info))
        );

        self.stage(Stage::ExtractAudio, self.extract_audio(&workspace))
            .await?;

        let keyframes = self
            .stage(
                Stage::ExtractKeyframes,
                self.extract_keyframes(&workspace, profile, metadata::duration_secs(&info)),
            )
            .await?;

        let transcript = self
            .stage(Stage::Transcribe, self.transcribe(&workspace))
            .await?;

        self.stage(
            Stage::BuildDigest,
            self.build_digest(&workspace, profile, &info, &transcript, &keyframes),
        )
        .await?;

        let (metadata, catalog_total) = self
            .stage(
                Stage::Catalog,
                self.write_metadata_and_catalog(
                    &workspace,
                    profile,
                    url,
                    request.alias.as_deref(),
                    &info,
                    keyframes.len(),
                    transcript.segments.len(),
                ),
            )
            .await?;

        self.stage(Stage::Cleanup, async {
            workspace.remove_transient_info();
            Ok(())
        })
        .await?;

        tracing::info!("Completed {} ({})", video_id, metadata.alias);

        Ok(ProcessOutcome {
            video_id,
            platform: profile.platform,
            workspace_dir: workspace.dir().to_path_buf(),
            keyframe_count: keyframes.len(),
            segment_count: transcript.segments.len(),
            metadata,
            catalog_total,
        })
    }

    /// Run one stage with progress reporting, tagging any failure with the stage
    async fn stage<T, F>(&self, stage: Stage, work: F) -> Result<T, PipelineError>
    where
        F: Future<Output = Result<T, StageError>>,
    {
        let message = format!("[{}/{}] {}", stage.number(), Stage::ALL.len(), stage.description());
        tracing::info!("{}", message);

        let progress = self.spinner(&message);
        match work.await {
            Ok(value) => {
                progress.finish_with_message(format!("{} ... ok", message));
                Ok(value)
            }
            Err(source) => {
                progress.abandon_with_message(format!("{} ... FAILED", message));
                tracing::error!("Stage {} failed: {}", stage, source);
                Err(PipelineError::StageFailed { stage, source })
            }
        }
    }

    fn spinner(&self, message: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let progress = ProgressBar::new_spinner();
        progress.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        progress.set_message(message.to_string());
        progress.enable_steady_tick(Duration::from_millis(120));
        progress
    }

    async fn download(&self, url: &str, workspace: &ArtifactWorkspace) -> Result<Value, StageError> {
        let video_path = workspace.video_path();
        let info_path = workspace.info_path();

        tracing::debug!("Fetching {} with {}", url, self.tools.downloader.name());
        self.tools.downloader.download(url, &video_path, &info_path).await?;
        require_artifact(&video_path)?;

        if let Ok(meta) = fs_err::metadata(&video_path) {
            tracing::info!(
                "Downloaded {} ({})",
                video_path.display(),
                crate::utils::format_file_size(meta.len())
            );
        }

        Ok(read_info(&info_path))
    }

    async fn extract_audio(&self, workspace: &ArtifactWorkspace) -> Result<(), StageError> {
        let audio_path = workspace.audio_path();
        tracing::debug!("Extracting audio with {}", self.tools.transcoder.name());
        self.tools
            .transcoder
            .extract_audio(&workspace.video_path(), &audio_path)
            .await?;
        require_artifact(&audio_path)
    }

    async fn extract_keyframes(
        &self,
        workspace: &ArtifactWorkspace,
        profile: &PlatformProfile,
        duration_secs: u64,
    ) -> Result<Vec<Keyframe>, StageError> {
        let frames_dir = workspace.keyframes_dir();
        workspace.clear_keyframes()?;

        tracing::debug!(
            "Sampling a frame every {}s with {}",
            profile.keyframe_interval,
            self.tools.transcoder.name()
        );
        self.tools
            .transcoder
            .extract_frames(&workspace.video_path(), &frames_dir, profile.keyframe_interval)
            .await?;

        let keyframes = index_keyframes(&frames_dir, profile.keyframe_interval)?;
        if keyframes.is_empty() {
            return Err(StageError::ExpectedArtifactMissing(frames_dir));
        }

        let expected = expected_keyframe_count(duration_secs, profile.keyframe_interval);
        if duration_secs > 0 && (keyframes.len() as u64).abs_diff(expected) > 1 {
            tracing::warn!(
                "Extracted {} keyframes, expected about {} for {}s at {}s intervals",
                keyframes.len(),
                expected,
                duration_secs,
                profile.keyframe_interval
            );
        }

        tracing::info!("Keyframes: {} frames extracted", keyframes.len());
        Ok(keyframes)
    }

    async fn transcribe(&self, workspace: &ArtifactWorkspace) -> Result<Transcript, StageError> {
        tracing::debug!(
            "Transcribing with {} (model {})",
            self.tools.transcriber.name(),
            self.tools.transcriber.model()
        );
        let transcript = self
            .tools
            .transcriber
            .transcribe(&workspace.audio_path())
            .await?;

        if transcript.segments.is_empty() {
            tracing::warn!("Transcription is empty; digest windows will have no text");
        }

        let transcript_path = workspace.transcript_path();
        fs_err::write(&transcript_path, render_transcript(&transcript.segments))?;
        tracing::info!("Transcript: {} segments", transcript.segments.len());

        Ok(transcript)
    }

    async fn build_digest(
        &self,
        workspace: &ArtifactWorkspace,
        profile: &PlatformProfile,
        info: &Value,
        transcript: &Transcript,
        keyframes: &[Keyframe],
    ) -> Result<(), StageError> {
        let provider_duration = metadata::duration_secs(info);
        // without a provider duration the sampled frames bound the video
        let duration_secs = if provider_duration > 0 {
            provider_duration
        } else {
            keyframes.len() as u64 * profile.keyframe_interval
        };

        let language = profile.extras.language.then(|| {
            metadata::first_str(info, &["language"])
                .or_else(|| transcript.language.clone())
                .unwrap_or_else(|| "en".to_string())
        });

        let header = DigestHeader {
            digest_title: profile.digest_title.to_string(),
            video_id: workspace.video_id().clone(),
            title: metadata::first_str(info, &["title"]).unwrap_or_else(|| "Unknown".to_string()),
            creator_label: profile.creator_label.to_string(),
            creator: metadata::creator(info, profile).unwrap_or_else(|| "Unknown".to_string()),
            duration_secs,
            language,
        };

        let digest = render_digest(
            &header,
            &transcript.segments,
            keyframes,
            duration_secs,
            profile.keyframe_interval,
        );
        fs_err::write(workspace.digest_path(), digest)?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn write_metadata_and_catalog(
        &self,
        workspace: &ArtifactWorkspace,
        profile: &PlatformProfile,
        url: &str,
        alias: Option<&str>,
        info: &Value,
        keyframe_count: usize,
        segment_count: usize,
    ) -> Result<(VideoMetadata, usize), StageError> {
        let today = chrono::Local::now().date_naive();
        let whisper_model = self.tools.transcriber.model();

        let ctx = MetadataContext {
            profile,
            video_id: workspace.video_id(),
            source_url: url,
            alias,
            keyframe_count,
            transcript_segments: segment_count,
            whisper_model: &whisper_model,
            date_processed: today,
            limits: MetadataLimits {
                alias_max_len: self.config.alias_max_len,
                description_max_len: self.config.description_max_len,
                max_tags: self.config.max_tags,
            },
        };

        let metadata = build_metadata(info, &ctx);
        metadata.write_to(&workspace.metadata_path())?;
        tracing::info!("Alias: {}", metadata.alias);

        let entry = CatalogEntry::from_metadata(&metadata, workspace.relative_path());
        let index = upsert_catalog(
            &self.config.output_dir,
            entry,
            today,
            Duration::from_secs(self.config.catalog_lock_timeout_secs),
        )
        .await?;

        Ok((metadata, index.total_videos))
    }
}

fn require_artifact(path: &Path) -> Result<(), StageError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(StageError::ExpectedArtifactMissing(path.to_path_buf()))
    }
}

/// Provider info, or an empty object when it is missing or unreadable
fn read_info(path: &Path) -> Value {
    let content = match fs_err::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("No provider info available: {}", e);
            return Value::Object(Default::default());
        }
    };

    serde_json::from_str(&content).unwrap_or_else(|e| {
        tracing::warn!("Could not parse {}: {}", path.display(), e);
        Value::Object(Default::default())
    })
}
