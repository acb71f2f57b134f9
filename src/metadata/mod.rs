use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::platform::{PlatformProfile, VideoId};
use crate::StageError;

/// Version stamped into every metadata record
pub const PIPELINE_VERSION: &str = "1.0";

/// Normalized per-video record written to `metadata.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub video_id: VideoId,
    pub alias: String,
    pub url: String,
    pub creator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_url: Option<String>,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<String>,
    pub duration_seconds: u64,
    pub duration_string: String,
    pub resolution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscriber_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    pub keyframe_count: usize,
    pub keyframe_interval_seconds: u64,
    pub transcript_segments: usize,
    pub date_processed: String,
    pub whisper_model: String,
    pub pipeline_version: String,
}

impl VideoMetadata {
    /// Write the record as pretty-printed JSON
    pub fn write_to(&self, path: &Path) -> Result<(), StageError> {
        let json = serde_json::to_string_pretty(self)?;
        fs_err::write(path, json)?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self, StageError> {
        let content = fs_err::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Bounds applied to free-form provider fields
#[derive(Debug, Clone, Copy)]
pub struct MetadataLimits {
    pub alias_max_len: usize,
    pub description_max_len: usize,
    pub max_tags: usize,
}

impl Default for MetadataLimits {
    fn default() -> Self {
        Self {
            alias_max_len: 50,
            description_max_len: 500,
            max_tags: 20,
        }
    }
}

/// Everything besides the provider info needed to build a record
#[derive(Debug, Clone)]
pub struct MetadataContext<'a> {
    pub profile: &'a PlatformProfile,
    pub video_id: &'a VideoId,
    pub source_url: &'a str,
    pub alias: Option<&'a str>,
    pub keyframe_count: usize,
    pub transcript_segments: usize,
    pub whisper_model: &'a str,
    pub date_processed: NaiveDate,
    pub limits: MetadataLimits,
}

/// First non-empty string among `keys`
pub fn first_str(info: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| info.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Non-negative counter, 0 when absent
fn count(info: &Value, key: &str) -> u64 {
    match info.get(key) {
        Some(v) => v
            .as_u64()
            .or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        None => 0,
    }
}

fn string_list(info: &Value, key: &str, limit: Option<usize>) -> Vec<String> {
    let items = info
        .get(key)
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    match limit {
        Some(n) => items.into_iter().take(n).collect(),
        None => items,
    }
}

/// Whole seconds of the provider's duration
pub fn duration_secs(info: &Value) -> u64 {
    info.get("duration")
        .and_then(Value::as_f64)
        .filter(|d| d.is_finite() && *d > 0.0)
        .map(|d| d.floor() as u64)
        .unwrap_or(0)
}

/// Creator name following the profile's fallback chain
pub fn creator(info: &Value, profile: &PlatformProfile) -> Option<String> {
    first_str(info, profile.creator_fields)
}

/// Format seconds as `H:MM:SS`, or `M:SS` under an hour
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// URL-safe alias: lowercase ASCII alphanumerics separated by single hyphens
pub fn slugify(title: &str, max_len: usize) -> String {
    let mut slug = String::new();
    let mut in_separator = false;

    for c in title.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
            in_separator = false;
        } else if !in_separator {
            slug.push('-');
            in_separator = true;
        }
    }

    // truncate first, trim last
    let truncated: String = slug.chars().take(max_len).collect();
    truncated.trim_matches('-').to_string()
}

/// Provider dates come as `YYYYMMDD`
pub fn format_upload_date(raw: &str) -> String {
    if raw.len() == 8 && raw.chars().all(|c| c.is_ascii_digit()) {
        format!("{}-{}-{}", &raw[..4], &raw[4..6], &raw[6..])
    } else {
        raw.to_string()
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn resolution(info: &Value) -> String {
    let dim = |key: &str| {
        info.get(key)
            .and_then(Value::as_u64)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "?".to_string())
    };
    format!("{}x{}", dim("width"), dim("height"))
}

/// Distill provider info into a normalized record
pub fn build_metadata(info: &Value, ctx: &MetadataContext<'_>) -> VideoMetadata {
    let extras = ctx.profile.extras;
    let title = first_str(info, &["title"]).unwrap_or_default();
    let duration = duration_secs(info);

    let alias = ctx
        .alias
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            let slug = slugify(&title, ctx.limits.alias_max_len);
            if slug.is_empty() {
                ctx.video_id.to_string()
            } else {
                slug
            }
        });

    VideoMetadata {
        video_id: ctx.video_id.clone(),
        alias,
        url: first_str(info, &["webpage_url", "original_url"])
            .unwrap_or_else(|| ctx.source_url.to_string()),
        creator: creator(info, ctx.profile).unwrap_or_default(),
        channel_id: extras
            .channel
            .then(|| first_str(info, &["channel_id"]).unwrap_or_default()),
        channel_url: extras
            .channel
            .then(|| first_str(info, &["channel_url", "uploader_url"]).unwrap_or_default()),
        title,
        description: truncate_chars(
            &first_str(info, &["description"]).unwrap_or_default(),
            ctx.limits.description_max_len,
        ),
        upload_date: extras.upload_date.then(|| {
            first_str(info, &["upload_date"])
                .map(|d| format_upload_date(&d))
                .unwrap_or_default()
        }),
        duration_seconds: duration,
        duration_string: format_duration(duration),
        resolution: resolution(info),
        language: extras
            .language
            .then(|| first_str(info, &["language"]).unwrap_or_else(|| "en".to_string())),
        view_count: count(info, "view_count"),
        like_count: count(info, "like_count"),
        comment_count: count(info, "comment_count"),
        subscriber_count: extras
            .subscriber_count
            .then(|| count(info, "channel_follower_count")),
        tags: extras
            .tags
            .then(|| string_list(info, "tags", Some(ctx.limits.max_tags))),
        categories: extras.categories.then(|| string_list(info, "categories", None)),
        keyframe_count: ctx.keyframe_count,
        keyframe_interval_seconds: ctx.profile.keyframe_interval,
        transcript_segments: ctx.transcript_segments,
        date_processed: ctx.date_processed.format("%Y-%m-%d").to_string(),
        whisper_model: ctx.whisper_model.to_string(),
        pipeline_version: PIPELINE_VERSION.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{tiktok, youtube};
    use serde_json::json;

    fn context<'a>(profile: &'a PlatformProfile, id: &'a VideoId, alias: Option<&'a str>) -> MetadataContext<'a> {
        MetadataContext {
            profile,
            video_id: id,
            source_url: "https://example.com/input",
            alias,
            keyframe_count: 4,
            transcript_segments: 7,
            whisper_model: "base",
            date_processed: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
            limits: MetadataLimits::default(),
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(47), "0:47");
        assert_eq!(format_duration(754), "12:34");
        assert_eq!(format_duration(3661), "1:01:01");
    }

    #[test]
    fn test_slugify() {
        let slug = slugify("Top 10 Tips!! (2024)", 50);
        assert_eq!(slug, "top-10-tips-2024");
        assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        assert!(!slug.contains("--"));

        assert_eq!(slugify("  ...Hello, World...  ", 50), "hello-world");
        assert_eq!(slugify("Café au lait", 50), "caf-au-lait");
        assert_eq!(slugify("!!!", 50), "");
    }

    #[test]
    fn test_slugify_respects_cap_and_trims_after_truncation() {
        let slug = slugify("abcd efgh ijkl", 5);
        assert_eq!(slug, "abcd");
        assert!(slugify(&"word ".repeat(40), 50).chars().count() <= 50);
    }

    #[test]
    fn test_format_upload_date() {
        assert_eq!(format_upload_date("20240131"), "2024-01-31");
        assert_eq!(format_upload_date("2024-01-31"), "2024-01-31");
        assert_eq!(format_upload_date(""), "");
    }

    #[test]
    fn test_youtube_metadata_with_fallbacks() {
        let profile = youtube::profile().unwrap();
        let id = VideoId::new("abcdefghijk");
        let tags: Vec<String> = (0..30).map(|i| format!("t{}", i)).collect();
        let description = "d".repeat(800);
        let info = json!({
            "title": "Top 10 Tips!! (2024)",
            "uploader": "Uploader Name",
            "uploader_url": "https://youtube.com/@up",
            "original_url": "https://youtu.be/abcdefghijk",
            "duration": 3725.6,
            "upload_date": "20240131",
            "width": 1920,
            "height": 1080,
            "view_count": 1000,
            "channel_follower_count": 55,
            "tags": tags,
            "categories": ["Education"],
            "description": description,
        });

        let meta = build_metadata(&info, &context(&profile, &id, None));

        assert_eq!(meta.alias, "top-10-tips-2024");
        assert_eq!(meta.creator, "Uploader Name");
        assert_eq!(meta.url, "https://youtu.be/abcdefghijk");
        assert_eq!(meta.channel_url.as_deref(), Some("https://youtube.com/@up"));
        assert_eq!(meta.channel_id.as_deref(), Some(""));
        assert_eq!(meta.duration_seconds, 3725);
        assert_eq!(meta.duration_string, "1:02:05");
        assert_eq!(meta.upload_date.as_deref(), Some("2024-01-31"));
        assert_eq!(meta.resolution, "1920x1080");
        assert_eq!(meta.language.as_deref(), Some("en"));
        assert_eq!(meta.like_count, 0);
        assert_eq!(meta.subscriber_count, Some(55));
        assert_eq!(meta.tags.as_ref().map(Vec::len), Some(20));
        assert_eq!(meta.categories, Some(vec!["Education".to_string()]));
        assert_eq!(meta.description.chars().count(), 500);
        assert_eq!(meta.date_processed, "2024-03-09");
        assert_eq!(meta.keyframe_interval_seconds, 15);
        assert_eq!(meta.pipeline_version, PIPELINE_VERSION);
    }

    #[test]
    fn test_tiktok_metadata_omits_extras() {
        let profile = tiktok::profile().unwrap();
        let id = VideoId::new("7301234567890123456");
        let info = json!({
            "title": "dance",
            "creator": "",
            "uploader": "dancer",
            "channel": "Dancer Channel",
            "tags": ["x"],
        });

        let meta = build_metadata(&info, &context(&profile, &id, Some("my-clip")));
        assert_eq!(meta.alias, "my-clip");
        assert_eq!(meta.creator, "dancer");
        assert_eq!(meta.url, "https://example.com/input");
        assert_eq!(meta.resolution, "?x?");
        assert!(meta.tags.is_none());
        assert!(meta.language.is_none());

        let json = serde_json::to_value(&meta).unwrap();
        assert!(json.get("tags").is_none());
        assert!(json.get("subscriber_count").is_none());
        assert!(json.get("channel_id").is_none());
    }

    #[test]
    fn test_empty_info_uses_defaults() {
        let profile = youtube::profile().unwrap();
        let id = VideoId::new("abcdefghijk");
        let meta = build_metadata(&json!({}), &context(&profile, &id, None));
        assert_eq!(meta.alias, "abcdefghijk");
        assert_eq!(meta.duration_string, "0:00");
        assert_eq!(meta.view_count, 0);
        assert_eq!(meta.title, "");
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("metadata.json");
        let profile = tiktok::profile().unwrap();
        let id = VideoId::new("123456789012345");
        let meta = build_metadata(&json!({"title": "Ünïcode"}), &context(&profile, &id, None));

        meta.write_to(&path).unwrap();
        let raw = fs_err::read_to_string(&path).unwrap();
        assert!(raw.contains("Ünïcode"));
        assert_eq!(VideoMetadata::read_from(&path).unwrap(), meta);
    }
}
