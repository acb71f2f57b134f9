//! Transcript to keyframe alignment and digest rendering.
//!
//! Each keyframe owns the half-open window `[i * interval, min((i + 1) * interval, duration))`.
//! A segment belongs to the window containing its midpoint. Segments whose midpoint falls
//! outside every window (before the first, or past a truncated tail) are clamped to the
//! nearest window so that every segment lands in exactly one place.

use crate::keyframes::Keyframe;
use crate::metadata::format_duration;
use crate::platform::VideoId;
use crate::transcribe::TranscriptSegment;

/// Column width of wrapped body text, excluding the indent
pub const WRAP_WIDTH: usize = 76;

/// Prefix of every body line
pub const WRAP_INDENT: &str = "  ";

const RULE_WIDTH: usize = 80;

/// Time span covered by one keyframe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyframeWindow {
    pub index: usize,
    pub start: u64,
    pub end: u64,
}

impl KeyframeWindow {
    pub fn contains(&self, t: f64) -> bool {
        self.start as f64 <= t && t < self.end as f64
    }
}

/// Windows for `count` keyframes
pub fn keyframe_windows(count: usize, duration_secs: u64, interval: u64) -> Vec<KeyframeWindow> {
    (0..count)
        .map(|index| {
            let start = index as u64 * interval;
            let end = ((index as u64 + 1) * interval).min(duration_secs).max(start);
            KeyframeWindow { index, start, end }
        })
        .collect()
}

/// Window index a point in time belongs to
fn window_for(t: f64, windows: &[KeyframeWindow]) -> Option<usize> {
    if let Some(w) = windows.iter().find(|w| w.contains(t)) {
        return Some(w.index);
    }
    let first = windows.first()?;
    if t < first.start as f64 {
        return Some(first.index);
    }
    windows
        .iter()
        .rev()
        .find(|w| w.start as f64 <= t)
        .map(|w| w.index)
}

/// For every window, the indices of the segments assigned to it, in input order.
/// With no windows there is nothing to assign to and every bucket list is empty.
pub fn assign_segments(segments: &[TranscriptSegment], windows: &[KeyframeWindow]) -> Vec<Vec<usize>> {
    let mut buckets = vec![Vec::new(); windows.len()];
    for (i, seg) in segments.iter().enumerate() {
        if let Some(w) = window_for(seg.midpoint(), windows) {
            buckets[w].push(i);
        }
    }
    buckets
}

/// Greedy word wrap; every line is prefixed with `indent`. A word longer than `width`
/// sits on a line of its own.
pub fn wrap_text(text: &str, width: usize, indent: &str) -> String {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current_len > 0 && current_len + 1 + word_len > width {
            lines.push(format!("{}{}", indent, current));
            current.clear();
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }
    if current_len > 0 {
        lines.push(format!("{}{}", indent, current));
    }

    lines.join("\n")
}

/// Identity lines at the top of a digest
#[derive(Debug, Clone)]
pub struct DigestHeader {
    pub digest_title: String,
    pub video_id: VideoId,
    pub title: String,
    pub creator_label: String,
    pub creator: String,
    pub duration_secs: u64,
    pub language: Option<String>,
}

fn language_display(code: &str) -> String {
    if code.starts_with("en") {
        "English".to_string()
    } else {
        code.to_string()
    }
}

/// Render the digest document
pub fn render_digest(
    header: &DigestHeader,
    segments: &[TranscriptSegment],
    keyframes: &[Keyframe],
    duration_secs: u64,
    interval: u64,
) -> String {
    let mut lines = Vec::new();

    lines.push(format!("{} -- {}", header.digest_title, header.video_id));
    lines.push(format!("Title: {}", header.title));
    let mut byline = format!(
        "{}: {} | Duration: {}",
        header.creator_label,
        header.creator,
        format_duration(header.duration_secs)
    );
    if let Some(language) = &header.language {
        byline.push_str(&format!(" | Language: {}", language_display(language)));
    }
    lines.push(byline);
    lines.push("=".repeat(RULE_WIDTH));
    lines.push(String::new());

    let windows = keyframe_windows(keyframes.len(), duration_secs, interval);
    let buckets = assign_segments(segments, &windows);

    for ((window, bucket), keyframe) in windows.iter().zip(&buckets).zip(keyframes) {
        lines.push(format!(
            "[{}] {}s-{}s",
            keyframe.file_name(),
            window.start,
            window.end
        ));
        if !bucket.is_empty() {
            let combined = bucket
                .iter()
                .map(|&i| segments[i].text.trim())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            let wrapped = wrap_text(&combined, WRAP_WIDTH, WRAP_INDENT);
            if !wrapped.is_empty() {
                lines.push(wrapped);
            }
        }
        lines.push(String::new());
    }

    lines.join("\n")
}
