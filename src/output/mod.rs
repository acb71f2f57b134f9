//! Terminal reporting for the CLI.

use console::style;

use crate::pipeline::ProcessOutcome;
use crate::platform::ProfileRegistry;
use crate::tools::ToolCheck;
use crate::utils::extract_domain;
use crate::workspace::{DIGEST_FILE, METADATA_FILE, TRANSCRIPT_FILE};

/// Summary printed after a successful run
pub fn format_summary(outcome: &ProcessOutcome) -> String {
    let meta = &outcome.metadata;
    let source = extract_domain(&meta.url).unwrap_or_else(|| meta.url.clone());

    let mut lines = vec![
        format!("Video:      {} ({})", meta.title, outcome.video_id),
        format!("Source:     {} ({})", source, outcome.platform),
        format!("Alias:      {}", meta.alias),
        format!("Creator:    {}", meta.creator),
        format!("Duration:   {}", meta.duration_string),
        format!(
            "Keyframes:  {} every {}s",
            outcome.keyframe_count, meta.keyframe_interval_seconds
        ),
        format!("Segments:   {}", outcome.segment_count),
        format!("Folder:     {}", outcome.workspace_dir.display()),
    ];
    for file in [DIGEST_FILE, TRANSCRIPT_FILE, METADATA_FILE] {
        lines.push(format!("  - {}", file));
    }
    lines.push(format!("Catalog:    {} videos", outcome.catalog_total));

    lines.join("\n")
}

pub fn print_summary(outcome: &ProcessOutcome) {
    println!("{}", style("Digest complete").green().bold());
    println!("{}", format_summary(outcome));
}

/// Print one line per tool; returns whether every tool is available
pub fn print_verify_report(checks: &[ToolCheck]) -> bool {
    println!("Checking external tools:");
    for check in checks {
        let mark = if check.ok {
            style("ok").green()
        } else {
            style("MISSING").red().bold()
        };
        println!("  [{}] {}: {}", mark, check.tool, check.detail);
    }

    let all_ok = checks.iter().all(|c| c.ok);
    if all_ok {
        println!("{}", style("All tools available").green());
    } else {
        println!("{}", style("Some tools are unavailable").red());
    }
    all_ok
}

pub fn format_platforms(registry: &ProfileRegistry) -> String {
    let mut lines = vec!["Supported platforms:".to_string()];
    for profile in registry.list() {
        lines.push(format!(
            "  - {} ({}) - keyframe every {}s",
            profile.name(),
            profile.platform.hosts().join(", "),
            profile.keyframe_interval
        ));
    }
    lines.join("\n")
}
