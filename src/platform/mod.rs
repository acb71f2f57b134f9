use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

pub mod tiktok;
pub mod youtube;

use crate::config::Config;
use crate::{PipelineError, Result};

/// Source platforms the pipeline knows how to process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Tiktok,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Tiktok => "tiktok",
        }
    }

    /// Hosts served by this platform (subdomains match too)
    pub fn hosts(&self) -> &'static [&'static str] {
        match self {
            Platform::Youtube => &["youtube.com", "youtu.be", "youtube-nocookie.com"],
            Platform::Tiktok => &["tiktok.com"],
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable per-video identifier derived from a source URL
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Optional metadata fields a platform exposes beyond the common set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetadataExtras {
    pub channel: bool,
    pub upload_date: bool,
    pub language: bool,
    pub subscriber_count: bool,
    pub tags: bool,
    pub categories: bool,
}

impl MetadataExtras {
    pub fn all() -> Self {
        Self {
            channel: true,
            upload_date: true,
            language: true,
            subscriber_count: true,
            tags: true,
            categories: true,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

/// Everything that differs between source platforms.
///
/// The pipeline itself is platform-agnostic: ID extraction, keyframe cadence, the provider
/// fields used for the creator, and the optional metadata all come from this value.
#[derive(Debug, Clone)]
pub struct PlatformProfile {
    pub platform: Platform,
    id_patterns: Vec<Regex>,
    /// Seconds between sampled keyframes
    pub keyframe_interval: u64,
    /// Provider fields tried in order for the creator name
    pub creator_fields: &'static [&'static str],
    pub extras: MetadataExtras,
    /// First line of the rendered digest
    pub digest_title: &'static str,
    /// Label used for the creator in the digest header
    pub creator_label: &'static str,
}

impl PlatformProfile {
    pub fn new(
        platform: Platform,
        patterns: &[&str],
        keyframe_interval: u64,
        creator_fields: &'static [&'static str],
        extras: MetadataExtras,
        digest_title: &'static str,
        creator_label: &'static str,
    ) -> Result<Self> {
        if keyframe_interval == 0 {
            anyhow::bail!("Keyframe interval for {} must be positive", platform);
        }

        let id_patterns = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            platform,
            id_patterns,
            keyframe_interval,
            creator_fields,
            extras,
            digest_title,
            creator_label,
        })
    }

    /// Override the sampling interval
    pub fn with_keyframe_interval(mut self, seconds: u64) -> Result<Self> {
        if seconds == 0 {
            anyhow::bail!("Keyframe interval for {} must be positive", self.platform);
        }
        self.keyframe_interval = seconds;
        Ok(self)
    }

    /// Derive the video ID from a URL. The first pattern that matches wins.
    pub fn resolve_video_id(&self, url: &str) -> std::result::Result<VideoId, PipelineError> {
        self.id_patterns
            .iter()
            .find_map(|pattern| pattern.captures(url))
            .and_then(|caps| caps.get(1))
            .map(|m| VideoId::new(m.as_str()))
            .ok_or_else(|| PipelineError::InvalidUrl(url.to_string()))
    }

    /// Check whether the URL's host belongs to this platform
    pub fn supports_url(&self, url: &str) -> bool {
        let Some(host) = Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_lowercase)) else {
            return false;
        };

        self.platform
            .hosts()
            .iter()
            .any(|h| host == *h || host.ends_with(&format!(".{}", h)))
    }

    pub fn name(&self) -> &'static str {
        self.platform.as_str()
    }
}

/// Registry of the known platform profiles
pub struct ProfileRegistry {
    profiles: Vec<PlatformProfile>,
}

impl ProfileRegistry {
    /// Create a registry with the built-in profiles
    pub fn new() -> Result<Self> {
        Ok(Self {
            profiles: vec![youtube::profile()?, tiktok::profile()?],
        })
    }

    /// Create a registry with per-platform overrides from the configuration applied
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut registry = Self::new()?;

        for profile in registry.profiles.iter_mut() {
            let overrides = config.profiles.for_platform(profile.platform);
            if let Some(interval) = overrides.keyframe_interval {
                *profile = profile.clone().with_keyframe_interval(interval)?;
            }
        }

        Ok(registry)
    }

    pub fn get(&self, platform: Platform) -> Option<&PlatformProfile> {
        self.profiles.iter().find(|p| p.platform == platform)
    }

    /// Find the profile whose hosts match the URL
    pub fn find_for_url(&self, url: &str) -> Option<&PlatformProfile> {
        self.profiles.iter().find(|p| p.supports_url(url))
    }

    /// Pick the forced platform if given, otherwise detect it from the URL
    pub fn select(
        &self,
        url: &str,
        forced: Option<Platform>,
    ) -> std::result::Result<&PlatformProfile, PipelineError> {
        let profile = match forced {
            Some(platform) => self.get(platform),
            None => self.find_for_url(url),
        };
        profile.ok_or_else(|| PipelineError::InvalidUrl(url.to_string()))
    }

    pub fn list(&self) -> &[PlatformProfile] {
        &self.profiles
    }
}
