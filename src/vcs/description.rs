//! Change-description assembly.
//!
//! The description of an integration change is rebuilt from the server's
//! interchanges listing on every run. Candidate changes may themselves be
//! integrations produced by an earlier campaign, so any engine-authored
//! header and footer lines found in the listing are stripped first;
//! otherwise the boilerplate compounds across repeated runs.

use crate::types::IntegrationTask;

/// First line of every engine-authored description.
pub const HEADER: &str = "Integration of pending changes:";

/// Last line of every engine-authored description.
pub const FOOTER: &str = "(generated integration description)";

/// Removes engine-authored header/footer lines from an interchanges listing.
///
/// Matching is exact on the trimmed line. Content lines are preserved in
/// order, including interior blanks, but leading and trailing blank lines
/// left behind by a stripped marker are dropped.
pub fn strip_engine_markers(lines: &[String]) -> Vec<String> {
    let mut kept: Vec<String> = lines
        .iter()
        .filter(|line| {
            let trimmed = line.trim();
            trimmed != HEADER && trimmed != FOOTER
        })
        .cloned()
        .collect();

    while kept.first().is_some_and(|l| l.trim().is_empty()) {
        kept.remove(0);
    }
    while kept.last().is_some_and(|l| l.trim().is_empty()) {
        kept.pop();
    }
    kept
}

/// Builds the description for a task from the cleaned interchanges listing.
pub fn build(task: &IntegrationTask, change_lines: &[String]) -> String {
    let body = strip_engine_markers(change_lines);

    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');
    out.push_str(&format!(
        "{} ({} -> {})\n\n",
        task.title, task.source, task.target
    ));
    for line in &body {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(FOOTER);
    out.push('\n');
    out
}

/// Placeholder description used when the server's scan limit prevented
/// enumerating the pending changes.
pub fn scan_limited_placeholder(task: &IntegrationTask) -> String {
    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');
    out.push_str(&format!(
        "{} ({} -> {})\n\n\
         Pending change listing unavailable: the server's scan limit was\n\
         reached while enumerating candidate changes.\n",
        task.title, task.source, task.target
    ));
    out.push_str(FOOTER);
    out.push('\n');
    out
}
