//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Output is an inventory of the site, not of files: each document is shown
//! by position and title, with its source and address as indented context
//! lines. Paths are secondary, so the listing reads like the site itself.
//!
//! ## Check
//!
//! ```text
//! Documents
//! 001 Home [section_index]
//!     Source: _index.md
//!     URL: / (home.html)
//! 002 Hello World [post]
//!     Source: blog/hello-world.md
//!     URL: /blog/hello-world/ (post.html)
//!
//! Posts
//! 001 01 Jan, 2024 Hello World
//!
//! Tags
//! go (1 post) → /blog/go/
//!
//! Navigation
//! Home → / (0)
//! Blog → /blog/ (100)
//! ```
//!
//! ## Build
//!
//! ```text
//! Home → index.html
//! Hello World → blog/hello-world/index.html
//! Tag go → blog/go/index.html
//! Not found → 404.html
//!
//! Site built: 2 documents processed, 1 tag page, 3 files copied → public
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::model::ContentModel;
use crate::pipeline::BuildReport;
use crate::types::DocumentKind;
use std::path::Path;

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn kind_label(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::SectionIndex => "section_index",
        DocumentKind::ContentIndex => "content_index",
        DocumentKind::Post => "post",
        DocumentKind::Page => "page",
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

/// `/`-joined display form of a relative path.
fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// ============================================================================
// Check
// ============================================================================

pub fn format_check_output(model: &ContentModel) -> Vec<String> {
    let mut lines = vec!["Documents".to_string()];
    for (i, doc) in model.documents.iter().enumerate() {
        lines.push(format!(
            "{} {} [{}]",
            format_index(i + 1),
            doc.title,
            kind_label(doc.kind)
        ));
        lines.push(format!("{}Source: {}", indent(1), slash_path(&doc.source_path)));
        lines.push(format!("{}URL: {} ({})", indent(1), doc.url, doc.layout));
    }

    if !model.posts.is_empty() {
        lines.push(String::new());
        lines.push("Posts".to_string());
        for (i, post) in model.posts.iter().enumerate() {
            lines.push(format!(
                "{} {} {}",
                format_index(i + 1),
                post.date_formatted,
                post.title
            ));
        }
    }

    if !model.tags.is_empty() {
        lines.push(String::new());
        lines.push("Tags".to_string());
        for tag in model.tags.values() {
            lines.push(format!(
                "{} ({}) \u{2192} {}",
                tag.name,
                plural(tag.count, "post", "posts"),
                tag.url
            ));
        }
    }

    lines.push(String::new());
    lines.push("Navigation".to_string());
    for entry in &model.nav {
        lines.push(format!("{} \u{2192} {} ({})", entry.title, entry.url, entry.weight));
    }

    for (heading, paths) in [("Drafts", &model.drafts), ("Skipped", &model.skipped)] {
        if paths.is_empty() {
            continue;
        }
        lines.push(String::new());
        lines.push(heading.to_string());
        for path in paths {
            lines.push(format!("{}{}", indent(1), slash_path(path)));
        }
    }

    lines
}

pub fn print_check_output(model: &ContentModel) {
    for line in format_check_output(model) {
        println!("{}", line);
    }
}

// ============================================================================
// Build
// ============================================================================

pub fn format_build_output(model: &ContentModel, report: &BuildReport) -> Vec<String> {
    let mut lines: Vec<String> = model
        .documents
        .iter()
        .map(|doc| format!("{} \u{2192} {}", doc.title, slash_path(&doc.output_path)))
        .collect();

    for tag in model.tags.values() {
        lines.push(format!(
            "Tag {} \u{2192} {}",
            tag.name,
            slash_path(&tag.output_path)
        ));
    }
    if report.not_found_page {
        lines.push("Not found \u{2192} 404.html".to_string());
    }

    if !report.skipped.is_empty() {
        lines.push(String::new());
        lines.push("Skipped (unreadable or malformed header)".to_string());
        for path in &report.skipped {
            lines.push(format!("{}{}", indent(1), slash_path(path)));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "Site built: {} processed, {}, {} copied \u{2192} {}",
        plural(report.documents, "document", "documents"),
        plural(report.tag_pages, "tag page", "tag pages"),
        plural(report.static_files + report.content_assets, "file", "files"),
        report.output_dir.display()
    ));
    lines
}

pub fn print_build_output(model: &ContentModel, report: &BuildReport) {
    for line in format_build_output(model, report) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
