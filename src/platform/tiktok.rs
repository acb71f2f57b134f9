use super::{MetadataExtras, Platform, PlatformProfile};
use crate::Result;

/// Seconds between keyframes; TikTok videos are short
pub const KEYFRAME_INTERVAL: u64 = 3;

const ID_PATTERNS: &[&str] = &[r"/video/(\d+)", r"(\d{15,25})"];

const CREATOR_FIELDS: &[&str] = &["creator", "uploader", "channel"];

/// TikTok profile. Short share links without a numeric ID cannot be resolved.
pub fn profile() -> Result<PlatformProfile> {
    PlatformProfile::new(
        Platform::Tiktok,
        ID_PATTERNS,
        KEYFRAME_INTERVAL,
        CREATOR_FIELDS,
        MetadataExtras::none(),
        "TIKTOK VIDEO DIGEST",
        "Creator",
    )
}
