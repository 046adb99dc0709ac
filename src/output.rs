//! CLI output formatting and display helpers.

use std::path::{Path, PathBuf};

use harvester_core::{ItemOutcome, RunSummary};
use tracing::info;

/// Returns terminal width from COLUMNS, or 80 if unset/invalid.
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|width| *width >= 20)
        .unwrap_or(80)
}

/// Truncates text to at most `width` chars, appending ellipsis if truncated.
pub fn truncate_to_width(text: &str, width: usize) -> String {
    let text_len = text.chars().count();
    if text_len <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    if width == 1 {
        return "…".to_string();
    }

    let mut output: String = text.chars().take(width - 1).collect();
    output.push('…');
    output
}

fn outcome_tag(outcome: &ItemOutcome) -> &'static str {
    match outcome {
        ItemOutcome::Exported { .. } => "saved",
        ItemOutcome::Degraded { .. } => "saved*",
        ItemOutcome::Skipped { .. } => "skipped",
        ItemOutcome::Failed { .. } => "failed",
    }
}

fn outcome_detail(outcome: &ItemOutcome) -> String {
    match outcome {
        ItemOutcome::Exported { path, .. } => file_label(path),
        ItemOutcome::Degraded { path, strategy } => format!("{} ({strategy})", file_label(path)),
        ItemOutcome::Skipped { reason } | ItemOutcome::Failed { reason } => reason.clone(),
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

/// Output directory as an absolute path when it can be resolved.
pub(crate) fn display_output_dir(dir: &Path) -> PathBuf {
    std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf())
}

/// Renders the end-of-run report, one line per entry, truncated to `width`.
pub(crate) fn render_summary_lines(summary: &RunSummary, width: usize) -> Vec<String> {
    let mut lines = Vec::with_capacity(summary.records.len() + 3);
    for record in &summary.records {
        let line = format!(
            "  {:02} [{}] {}: {}",
            record.item.rank,
            outcome_tag(&record.outcome),
            record.item.title,
            outcome_detail(&record.outcome)
        );
        lines.push(truncate_to_width(&line, width));
    }

    lines.push(format!(
        "Exported {}/{} (degraded {}, skipped {}, failed {})",
        summary.succeeded(),
        summary.attempted(),
        summary.degraded(),
        summary.skipped(),
        summary.failed()
    ));
    if summary.discovery_exhausted {
        lines.push(format!(
            "Only {} item(s) were found on the landing page",
            summary.discovered
        ));
    }
    if summary.interrupted {
        lines.push(format!(
            "Interrupted after {} of {} item(s)",
            summary.attempted(),
            summary.discovered
        ));
    }
    lines.push(format!(
        "Saved to: {}",
        display_output_dir(&summary.output_dir).display()
    ));
    lines
}

pub(crate) fn print_run_summary(summary: &RunSummary) {
    info!(
        succeeded = summary.succeeded(),
        attempted = summary.attempted(),
        output_dir = %summary.output_dir.display(),
        "Harvest Summary"
    );
    for line in render_summary_lines(summary, terminal_width()) {
        println!("{line}");
    }
}
