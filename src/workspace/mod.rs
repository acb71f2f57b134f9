//! Per-video artifact directory.
//!
//! A workspace is `<base>/<video_id>/` and owns every file the pipeline produces for that
//! video. Opening is idempotent and never deletes anything. Reprocessing is a total replace:
//! the sequencer calls [`ArtifactWorkspace::reset_for_run`] before downloading, so every
//! artifact check in a run is answered by files that run produced.

use std::path::{Path, PathBuf};

use crate::platform::VideoId;

pub const VIDEO_FILE: &str = "video.mp4";
pub const AUDIO_FILE: &str = "audio.wav";
pub const INFO_FILE: &str = "info.json";
pub const TRANSCRIPT_FILE: &str = "transcript.txt";
pub const DIGEST_FILE: &str = "digest.txt";
pub const METADATA_FILE: &str = "metadata.json";
pub const KEYFRAMES_DIR: &str = "keyframes";

/// Which artifacts currently exist in a workspace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactStatus {
    pub video: bool,
    pub audio: bool,
    pub info: bool,
    pub keyframe_count: usize,
    pub transcript: bool,
    pub digest: bool,
    pub metadata: bool,
}

impl ArtifactStatus {
    /// All durable artifacts are present (the transient info document is not required)
    pub fn is_complete(&self) -> bool {
        self.video
            && self.audio
            && self.keyframe_count > 0
            && self.transcript
            && self.digest
            && self.metadata
    }
}

/// On-disk workspace for a single video
#[derive(Debug, Clone)]
pub struct ArtifactWorkspace {
    video_id: VideoId,
    dir: PathBuf,
}

impl ArtifactWorkspace {
    /// Resolve the workspace for `video_id` under `base_dir`, creating it if absent
    pub fn open(base_dir: &Path, video_id: &VideoId) -> std::io::Result<Self> {
        let dir = base_dir.join(video_id.as_str());
        fs_err::create_dir_all(dir.join(KEYFRAMES_DIR))?;

        tracing::debug!("Workspace ready: {}", dir.display());

        Ok(Self {
            video_id: video_id.clone(),
            dir,
        })
    }

    pub fn video_id(&self) -> &VideoId {
        &self.video_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn video_path(&self) -> PathBuf {
        self.dir.join(VIDEO_FILE)
    }

    pub fn audio_path(&self) -> PathBuf {
        self.dir.join(AUDIO_FILE)
    }

    pub fn info_path(&self) -> PathBuf {
        self.dir.join(INFO_FILE)
    }

    pub fn keyframes_dir(&self) -> PathBuf {
        self.dir.join(KEYFRAMES_DIR)
    }

    pub fn transcript_path(&self) -> PathBuf {
        self.dir.join(TRANSCRIPT_FILE)
    }

    pub fn digest_path(&self) -> PathBuf {
        self.dir.join(DIGEST_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    /// Path of the workspace relative to the output root, as recorded in the catalog
    pub fn relative_path(&self) -> String {
        format!("{}/", self.video_id)
    }

    /// Inspect which artifacts exist right now
    pub fn status(&self) -> ArtifactStatus {
        let keyframe_count = fs_err::read_dir(self.keyframes_dir())
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.path().extension().map_or(false, |ext| ext == "png"))
                    .count()
            })
            .unwrap_or(0);

        ArtifactStatus {
            video: self.video_path().is_file(),
            audio: self.audio_path().is_file(),
            info: self.info_path().is_file(),
            keyframe_count,
            transcript: self.transcript_path().is_file(),
            digest: self.digest_path().is_file(),
            metadata: self.metadata_path().is_file(),
        }
    }

    /// Remove every image left in the keyframes directory by an earlier run
    pub fn clear_keyframes(&self) -> std::io::Result<usize> {
        let mut removed = 0;
        for entry in fs_err::read_dir(self.keyframes_dir())? {
            let path = entry?.path();
            if path.is_file() && path.extension().map_or(false, |ext| ext == "png") {
                fs_err::remove_file(&path)?;
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::debug!("Removed {} stale keyframes", removed);
        }
        Ok(removed)
    }

    /// Remove every artifact a run produces so nothing from a previous run can satisfy
    /// this run's artifact checks. The directories themselves stay. Returns the number
    /// of files removed.
    pub fn reset_for_run(&self) -> std::io::Result<usize> {
        let mut removed = self.clear_keyframes()?;
        for path in [
            self.video_path(),
            self.audio_path(),
            self.info_path(),
            self.transcript_path(),
            self.digest_path(),
            self.metadata_path(),
        ] {
            match fs_err::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        if removed > 0 {
            tracing::debug!("Reset workspace {} ({} files removed)", self.dir.display(), removed);
        }
        Ok(removed)
    }

    /// Delete the raw provider info once metadata has been distilled from it.
    /// Returns whether a file was removed; failures are logged, not propagated.
    pub fn remove_transient_info(&self) -> bool {
        let path = self.info_path();
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!("Cleaned up {}", path.display());
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                tracing::warn!("Could not remove {}: {}", path.display(), e);
                false
            }
        }
    }
}
