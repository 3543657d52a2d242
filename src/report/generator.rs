//! Skip-list and summary generation.
//!
//! Skip lists are written as bare lines of crater configuration, ready to be
//! pasted under the `[crates]` and `[github-repos]` tables.

use crate::models::RunSummary;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Join sorted lines with `\n`, without a trailing newline.
pub fn render_skip_list(lines: &[String]) -> String {
    lines.join("\n")
}

/// Write a skip list to a file, replacing it.
pub fn write_skip_list(path: &Path, lines: &[String]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    std::fs::write(path, render_skip_list(lines))
        .with_context(|| format!("Failed to write skip list to {}", path.display()))?;

    info!("Wrote {} entries to {}", lines.len(), path.display());
    Ok(())
}

/// Generate a JSON run summary.
pub fn generate_json_summary(summary: &RunSummary) -> Result<String> {
    serde_json::to_string_pretty(summary).map_err(Into::into)
}

/// Write a JSON run summary to a file.
pub fn write_json_summary(summary: &RunSummary, path: &Path) -> Result<()> {
    let content = generate_json_summary(summary)?;

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write summary to {}", path.display()))?;

    info!("Wrote run summary to {}", path.display());
    Ok(())
}
