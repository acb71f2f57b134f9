use crate::config::Config;
use crate::tools::check_tool;

/// Keep at most `limit` characters of `text`, marking the cut with `...`
pub fn excerpt(text: &str, limit: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Format file size in human-readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let unit_index = (bytes_f.log10() / THRESHOLD.log10()).floor() as usize;
    let unit_index = unit_index.min(UNITS.len() - 1);

    let size = bytes_f / THRESHOLD.powi(unit_index as i32);

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Host of a URL without the `www.` prefix, for display
pub fn extract_domain(url: &str) -> Option<String> {
    url::Url::parse(url).ok()?.host_str().map(|host| {
        host.strip_prefix("www.").unwrap_or(host).to_string()
    })
}

/// Warn-only check of the external tools a run needs
pub async fn check_dependencies(config: &Config) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_tool(&config.tools.yt_dlp, "--version").await.ok {
        missing.push(format!("{} - required to download videos", config.tools.yt_dlp));
    }

    if !check_tool(&config.tools.ffmpeg, "-version").await.ok {
        missing.push(format!("{} - required for audio and keyframe extraction", config.tools.ffmpeg));
    }

    if !check_tool(&config.tools.whisper, "--help").await.ok {
        missing.push(format!("{} - required for transcription", config.tools.whisper));
    }

    missing
}
