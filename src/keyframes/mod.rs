//! Keyframe indexing.
//!
//! The transcoder names frames by extraction ordinal. The indexer sorts them by that ordinal
//! and renames the i-th frame to carry its timestamp `i * interval`, so later stages can
//! compute windows from the index alone.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::StageError;

/// Prefix of frames as written by the transcoder, before indexing
pub const RAW_FRAME_PREFIX: &str = "raw_";

/// A sampled still image and the moment it represents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Dense zero-based position
    pub index: usize,

    /// Always `index * interval`
    pub timestamp_secs: u64,

    pub image_path: PathBuf,
}

impl Keyframe {
    pub fn file_name(&self) -> String {
        frame_file_name(self.timestamp_secs)
    }
}

/// File name encoding a keyframe timestamp, e.g. `frame_015s.png`
pub fn frame_file_name(timestamp_secs: u64) -> String {
    format!("frame_{:03}s.png", timestamp_secs)
}

/// Number of frames a sampler at `interval` produces for `duration_secs` of video
pub fn expected_keyframe_count(duration_secs: u64, interval: u64) -> u64 {
    if interval == 0 {
        return 0;
    }
    duration_secs.div_ceil(interval)
}

/// Ordinal of a raw frame name such as `raw_00012.png`
fn raw_ordinal(name: &str) -> Option<u64> {
    name.strip_prefix(RAW_FRAME_PREFIX)?
        .strip_suffix(".png")?
        .parse()
        .ok()
}

/// Sort raw frame names by their extraction ordinal; names without one sort last by name
pub fn order_raw_frames(mut names: Vec<String>) -> Vec<String> {
    names.sort_by(|a, b| match (raw_ordinal(a), raw_ordinal(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.cmp(b),
    });
    names
}

/// Relabel the raw frames in `frames_dir` with their timestamps
pub fn index_keyframes(frames_dir: &Path, interval: u64) -> Result<Vec<Keyframe>, StageError> {
    let mut names = Vec::new();
    for entry in fs_err::read_dir(frames_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(RAW_FRAME_PREFIX) && name.ends_with(".png") {
            names.push(name);
        }
    }

    let keyframes = order_raw_frames(names)
        .into_iter()
        .enumerate()
        .map(|(index, name)| {
            let timestamp_secs = index as u64 * interval;
            let image_path = frames_dir.join(frame_file_name(timestamp_secs));
            fs_err::rename(frames_dir.join(&name), &image_path)?;
            Ok(Keyframe {
                index,
                timestamp_secs,
                image_path,
            })
        })
        .collect::<Result<Vec<_>, StageError>>()?;

    tracing::debug!("Indexed {} keyframes in {}", keyframes.len(), frames_dir.display());
    Ok(keyframes)
}
