//! CLI output formatting for both pipeline stages.
//!
//! # Information-First Display
//!
//! The primary display for every record or listed file is its semantic
//! identity (title and positional index). Identifiers, file names and failure
//! details follow as indented context lines, so the output reads as an
//! inventory of what was published while still letting users trace each line
//! back to a CMS record or a file on disk.
//!
//! # Output Format
//!
//! ## Generate
//!
//! ```text
//! Manifests
//! 001 Bath Abbey → bath-abbey.json
//!     Record: 12
//!     Canvases: 2
//! 002 Untitled sketch
//!     Record: 13
//!     Skipped: no image
//!
//! Generated 1 manifest from 2 records (1 skipped)
//! ```
//!
//! ## Index
//!
//! ```text
//! Index → docs/index.html
//! 001 Bath Abbey (bath-abbey.json)
//!     Size: 1.2 KB
//!     Annotations: 3
//! 002 (notes.txt)
//!     Size: 0.1 KB
//!
//! Listed 2 entries on 1 page
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::index::{IndexDocument, IndexEntry, format_size};
use crate::pipeline::{RecordOutcome, RunReport};
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Title line: titled entries show the title, untitled ones the name in parens.
///
/// ```text
/// 001 Bath Abbey (bath-abbey.json)
/// 002 (notes.txt)
/// ```
fn entry_line(index: usize, title: &str, name: &str) -> String {
    if title.is_empty() {
        format!("{} ({})", format_index(index), name)
    } else {
        format!("{} {} ({})", format_index(index), title, name)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{count} {one}")
    } else {
        format!("{count} {many}")
    }
}

// ============================================================================
// Generate
// ============================================================================

pub fn format_run_report(report: &RunReport) -> Vec<String> {
    let mut lines = vec!["Manifests".to_string()];

    for (i, outcome) in report.outcomes.iter().enumerate() {
        let pos = format_index(i + 1);
        match outcome {
            RecordOutcome::Written {
                id,
                title,
                path,
                canvases,
            } => {
                lines.push(format!("{} {} → {}", pos, title, file_name(path)));
                lines.push(format!("{}Record: {}", indent(1), id));
                lines.push(format!("{}Canvases: {}", indent(1), canvases));
            }
            RecordOutcome::Skipped { id, title } => {
                lines.push(format!("{} {}", pos, title));
                lines.push(format!("{}Record: {}", indent(1), id));
                lines.push(format!("{}Skipped: no image", indent(1)));
            }
            RecordOutcome::WriteFailed {
                id,
                title,
                path,
                error,
            } => {
                lines.push(format!("{} {} → {}", pos, title, file_name(path)));
                lines.push(format!("{}Record: {}", indent(1), id));
                lines.push(format!("{}Write failed: {}", indent(1), error));
            }
        }
    }

    lines.push(String::new());
    let mut summary = format!(
        "Generated {} from {}",
        plural(report.generated(), "manifest", "manifests"),
        plural(report.fetched, "record", "records")
    );
    let mut notes = Vec::new();
    if report.skipped() > 0 {
        notes.push(format!("{} skipped", report.skipped()));
    }
    if report.failed() > 0 {
        notes.push(format!("{} failed", report.failed()));
    }
    if !notes.is_empty() {
        summary.push_str(&format!(" ({})", notes.join(", ")));
    }
    lines.push(summary);
    lines
}

pub fn print_run_report(report: &RunReport) {
    for line in format_run_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Index
// ============================================================================

fn entry_lines(index: usize, entry: &IndexEntry) -> Vec<String> {
    if entry.is_dir {
        return vec![format!("{} {}/", format_index(index), entry.name)];
    }
    let mut lines = vec![entry_line(index, &entry.title, &entry.name)];
    if let Some(bytes) = entry.size_bytes {
        lines.push(format!("{}Size: {}", indent(1), format_size(bytes)));
    }
    if entry.annotation_count > 0 {
        lines.push(format!(
            "{}Annotations: {}",
            indent(1),
            entry.annotation_count
        ));
    }
    lines
}

pub fn format_index_report(document: &IndexDocument, index_path: &Path) -> Vec<String> {
    let mut lines = vec![format!("Index → {}", index_path.display())];
    for (i, entry) in document.entries.iter().enumerate() {
        lines.extend(entry_lines(i + 1, entry));
    }
    lines.push(String::new());
    lines.push(format!(
        "Listed {} on {}",
        plural(document.entries.len(), "entry", "entries"),
        plural(document.page_count, "page", "pages")
    ));
    lines
}

pub fn print_index_report(document: &IndexDocument, index_path: &Path) {
    for line in format_index_report(document, index_path) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
