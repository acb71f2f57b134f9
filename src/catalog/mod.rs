//! Cross-video catalog stored as `index.json` at the output root.
//!
//! The catalog holds at most one entry per video. An upsert removes any existing entry for
//! the same ID and appends the new one, so reprocessed videos move to the end of the list.
//! The file is shared by every run writing to the same output directory; read-modify-write
//! must happen while holding a [`CatalogLock`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

use crate::metadata::VideoMetadata;
use crate::platform::VideoId;
use crate::StageError;

pub const CATALOG_FILE: &str = "index.json";
pub const MANIFEST_VERSION: &str = "1.0";

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Floor for stale-lock detection, well above file timestamp granularity
const MIN_STALE_LOCK_AGE: Duration = Duration::from_secs(5);

/// Summary of one processed video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub video_id: VideoId,
    pub alias: String,
    pub url: String,
    pub creator: String,
    pub title: String,
    pub duration_seconds: u64,
    pub date_processed: String,
    /// Workspace path relative to the output root
    pub path: String,
}

impl CatalogEntry {
    pub fn from_metadata(metadata: &VideoMetadata, path: impl Into<String>) -> Self {
        Self {
            video_id: metadata.video_id.clone(),
            alias: metadata.alias.clone(),
            url: metadata.url.clone(),
            creator: metadata.creator.clone(),
            title: metadata.title.clone(),
            duration_seconds: metadata.duration_seconds,
            date_processed: metadata.date_processed.clone(),
            path: path.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogIndex {
    pub manifest_version: String,
    pub last_updated: String,
    pub total_videos: usize,
    pub videos: Vec<CatalogEntry>,
}

impl Default for CatalogIndex {
    fn default() -> Self {
        Self {
            manifest_version: MANIFEST_VERSION.to_string(),
            last_updated: String::new(),
            total_videos: 0,
            videos: Vec::new(),
        }
    }
}

impl CatalogIndex {
    /// Path of the catalog inside an output directory
    pub fn path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(CATALOG_FILE)
    }

    /// Read the catalog, or start an empty one if the file does not exist yet
    pub fn load_or_init(path: &Path) -> Result<Self, StageError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs_err::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Insert or replace the entry for `entry.video_id`
    pub fn upsert(&mut self, entry: CatalogEntry, today: NaiveDate) {
        self.videos.retain(|v| v.video_id != entry.video_id);
        self.videos.push(entry);
        self.total_videos = self.videos.len();
        self.last_updated = today.format("%Y-%m-%d").to_string();
    }

    pub fn get(&self, video_id: &VideoId) -> Option<&CatalogEntry> {
        self.videos.iter().find(|v| &v.video_id == video_id)
    }

    /// Persist atomically: write a sibling temp file, then rename over the catalog
    pub fn save(&self, path: &Path) -> Result<(), StageError> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs_err::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        let json = serde_json::to_string_pretty(self)?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| StageError::Io(e.error))?;

        Ok(())
    }
}

/// Advisory single-writer lock held as `index.json.lock` next to the catalog.
/// Released when dropped.
///
/// Writers hold the lock only for one load-upsert-save, so a lock file older than the
/// acquire timeout (never less than [`MIN_STALE_LOCK_AGE`]) was left by a writer that died
/// and is taken over.
#[derive(Debug)]
pub struct CatalogLock {
    path: PathBuf,
}

impl CatalogLock {
    pub fn lock_path(catalog_path: &Path) -> PathBuf {
        let mut name = catalog_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| CATALOG_FILE.into());
        name.push(".lock");
        catalog_path.with_file_name(name)
    }

    /// Whether the lock file at `path` has not been touched for longer than `max_age`
    fn is_stale(path: &Path, max_age: Duration) -> bool {
        fs_err::metadata(path)
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .map_or(false, |age| age > max_age.max(MIN_STALE_LOCK_AGE))
    }

    /// Wait up to `timeout` for exclusive access to the catalog
    pub async fn acquire(catalog_path: &Path, timeout: Duration) -> Result<Self, StageError> {
        let path = Self::lock_path(catalog_path);
        if let Some(dir) = path.parent() {
            fs_err::create_dir_all(dir)?;
        }

        let started = Instant::now();
        loop {
            match fs_err::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(mut file) => {
                    // the pid identifies the holder when inspecting a lock by hand
                    let _ = writeln!(file, "{}", std::process::id());
                    tracing::debug!("Acquired catalog lock {}", path.display());
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if started.elapsed() >= timeout {
                        return Err(StageError::CatalogLocked(path));
                    }
                    if Self::is_stale(&path, timeout) {
                        tracing::warn!("Removing stale catalog lock {}", path.display());
                        match std::fs::remove_file(&path) {
                            Ok(()) => continue,
                            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                            Err(e) => return Err(StageError::Io(e)),
                        }
                    }
                    tokio::time::sleep(LOCK_POLL_INTERVAL).await;
                }
                Err(e) => return Err(StageError::Io(e)),
            }
        }
    }
}

impl Drop for CatalogLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!("Could not release catalog lock {}: {}", self.path.display(), e);
        }
    }
}

/// Locked load, upsert and persist of the catalog under `base_dir`
pub async fn upsert_catalog(
    base_dir: &Path,
    entry: CatalogEntry,
    today: NaiveDate,
    lock_timeout: Duration,
) -> Result<CatalogIndex, StageError> {
    let path = CatalogIndex::path_in(base_dir);
    let _lock = CatalogLock::acquire(&path, lock_timeout).await?;

    let mut index = CatalogIndex::load_or_init(&path)?;
    if index.get(&entry.video_id).is_some() {
        tracing::info!("Replacing catalog entry for {}", entry.video_id);
    }
    index.upsert(entry, today);
    index.save(&path)?;

    tracing::info!("Catalog updated: {} videos total", index.total_videos);
    Ok(index)
}
