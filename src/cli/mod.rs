use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::platform::Platform;

#[derive(Parser)]
#[command(
    name = "video-digest",
    about = "Video Digest - Turn YouTube and TikTok videos into keyframe-aligned transcript digests",
    version,
    long_about = "Downloads a video, samples keyframes at a fixed interval, transcribes the audio with Whisper and writes a plain-text digest pairing each keyframe with what was said during its window. Every video gets its own folder and an entry in a shared catalog."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process a video URL into a digest
    Process {
        /// Video URL (YouTube or TikTok)
        #[arg(value_name = "URL")]
        url: String,

        /// Human-readable alias for the catalog (derived from the title if not given)
        #[arg(short, long, value_name = "ALIAS")]
        alias: Option<String>,

        /// Force a platform instead of detecting it from the URL
        #[arg(short, long, value_enum)]
        platform: Option<Platform>,

        /// Base output directory (overrides the configured one)
        #[arg(short, long, value_name = "DIR", env = "VIDEO_DIGEST_OUTPUT_DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Check that yt-dlp, ffmpeg and Whisper are available
    Verify,

    /// List supported platforms
    Platforms,

    /// Show or initialize the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}
