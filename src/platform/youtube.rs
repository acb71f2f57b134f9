use super::{MetadataExtras, Platform, PlatformProfile};
use crate::Result;

/// Seconds between keyframes; YouTube videos run long
pub const KEYFRAME_INTERVAL: u64 = 15;

const ID_PATTERNS: &[&str] = &[
    r"(?:v=|/v/|youtu\.be/)([a-zA-Z0-9_-]{11})",
    r"(?:embed/)([a-zA-Z0-9_-]{11})",
    r"(?:shorts/)([a-zA-Z0-9_-]{11})",
];

const CREATOR_FIELDS: &[&str] = &["channel", "uploader"];

/// YouTube profile: watch, short-link, embed and shorts URLs
pub fn profile() -> Result<PlatformProfile> {
    PlatformProfile::new(
        Platform::Youtube,
        ID_PATTERNS,
        KEYFRAME_INTERVAL,
        CREATOR_FIELDS,
        MetadataExtras::all(),
        "YOUTUBE VIDEO DIGEST",
        "Channel",
    )
}
