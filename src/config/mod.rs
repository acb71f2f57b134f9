use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::platform::Platform;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base directory holding one workspace per video plus the catalog
    pub output_dir: PathBuf,

    /// External tool locations
    pub tools: ToolsConfig,

    /// Speech-to-text settings
    pub transcription: TranscriptionConfig,

    /// Per-platform overrides
    pub profiles: ProfilesConfig,

    /// Maximum length of a generated alias
    pub alias_max_len: usize,

    /// Maximum number of characters kept from the description
    pub description_max_len: usize,

    /// Maximum number of tags kept in the metadata record
    pub max_tags: usize,

    /// Seconds to wait for another writer to release the catalog
    pub catalog_lock_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub yt_dlp: String,
    pub ffmpeg: String,
    pub whisper: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Whisper model name
    pub model: String,

    /// Spoken language passed to the transcriber
    pub language: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilesConfig {
    pub youtube: ProfileOverrides,
    pub tiktok: ProfileOverrides,
}

impl ProfilesConfig {
    pub fn for_platform(&self, platform: Platform) -> &ProfileOverrides {
        match platform {
            Platform::Youtube => &self.youtube,
            Platform::Tiktok => &self.tiktok,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileOverrides {
    /// Seconds between keyframes (platform default if not set)
    pub keyframe_interval: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            tools: ToolsConfig::default(),
            transcription: TranscriptionConfig::default(),
            profiles: ProfilesConfig::default(),
            alias_max_len: 50,
            description_max_len: 500,
            max_tags: 20,
            catalog_lock_timeout_secs: 30,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            yt_dlp: "yt-dlp".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            whisper: "whisper".to_string(),
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model: "base".to_string(),
            language: "en".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            serde_yaml::from_str::<Config>(&content)
                .context("Failed to parse config file")?
        } else {
            let config = Self::default();
            config.save().await?;
            config
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("video-digest").join("config.yaml"))
    }

    /// Environment variables take precedence over the file
    fn apply_env(&mut self) {
        if let Some(dir) = env_non_empty("VIDEO_DIGEST_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(path) = env_non_empty("YTDLP_PATH") {
            self.tools.yt_dlp = path;
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("yt_dlp", &self.tools.yt_dlp),
            ("ffmpeg", &self.tools.ffmpeg),
            ("whisper", &self.tools.whisper),
        ] {
            if path.trim().is_empty() {
                anyhow::bail!("Tool path '{}' must not be empty", name);
            }
        }

        for platform in [Platform::Youtube, Platform::Tiktok] {
            if self.profiles.for_platform(platform).keyframe_interval == Some(0) {
                anyhow::bail!("Keyframe interval for {} must be positive", platform);
            }
        }

        if self.alias_max_len == 0 {
            anyhow::bail!("alias_max_len must be positive");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Output Directory: {}", self.output_dir.display());
        println!("  yt-dlp: {}", self.tools.yt_dlp);
        println!("  ffmpeg: {}", self.tools.ffmpeg);
        println!("  whisper: {}", self.tools.whisper);
        println!("  Whisper Model: {}", self.transcription.model);
        println!("  Language: {}", self.transcription.language);
        for platform in [Platform::Youtube, Platform::Tiktok] {
            if let Some(interval) = self.profiles.for_platform(platform).keyframe_interval {
                println!("  {} Keyframe Interval: {}s", platform, interval);
            }
        }
        if let Ok(path) = Self::config_path() {
            println!("  Config File: {}", path.display());
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
