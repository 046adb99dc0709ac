//! Deterministic document file names.
//!
//! Both export strategies share one allow-list transform so the same item
//! always maps to the same `NN_title.ext` path.

/// Title length cap used by the native exporter.
pub const NATIVE_TITLE_CHARS: usize = 50;

/// Title length cap used by the browser-print exporter.
pub const PRINT_TITLE_CHARS: usize = 80;

/// Placeholder for titles with no allowed characters.
pub const UNTITLED: &str = "untitled";

/// Keeps Unicode alphanumerics, spaces, hyphens and underscores, drops
/// everything else, then truncates to `max_chars` characters.
#[must_use]
pub fn sanitize_title(title: &str, max_chars: usize) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let truncated: String = kept.trim().chars().take(max_chars).collect();
    let truncated = truncated.trim_end();
    if truncated.is_empty() {
        UNTITLED.to_string()
    } else {
        truncated.to_string()
    }
}

/// `{rank:02}_{sanitized}.{extension}`
#[must_use]
pub fn document_file_name(rank: usize, title: &str, max_chars: usize, extension: &str) -> String {
    format!("{rank:02}_{}.{extension}", sanitize_title(title, max_chars))
}
