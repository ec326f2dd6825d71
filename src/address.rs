//! Public URLs, output paths, and layout selection.
//!
//! | kind | directory | url | output |
//! |------|-----------|-----|--------|
//! | SectionIndex / ContentIndex | root | `/` | `index.html` |
//! | SectionIndex / ContentIndex | `d` | `/d/` | `d/index.html` |
//! | Page / Post | root | `/slug/` | `slug/index.html` |
//! | Page / Post | `d` | `/d/slug/` | `d/slug/index.html` |
//!
//! Every output is an `index.html` inside a directory mirroring the URL, so
//! the site works from any static file server without rewrite rules.

use crate::types::DocumentKind;
use std::path::PathBuf;

pub const HOME_LAYOUT: &str = "home.html";
pub const LIST_LAYOUT: &str = "list.html";
pub const POST_LAYOUT: &str = "post.html";
pub const PAGE_LAYOUT: &str = "page.html";
pub const NOT_FOUND_TEMPLATE: &str = "404.html";

const INDEX_FILE: &str = "index.html";

/// Where a document is published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub url: String,
    /// Relative to the output root.
    pub output_path: PathBuf,
}

/// Resolve the address of a document.
///
/// `dir` is the `/`-joined directory relative to the content root (empty at
/// root); `slug` is ignored for index kinds.
pub fn resolve(kind: DocumentKind, dir: &str, slug: &str) -> Address {
    let mut segments: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    if !kind.is_index() {
        segments.push(slug);
    }
    address_for(&segments)
}

/// Address of a directory-style page made of the given URL segments.
pub fn address_for(segments: &[&str]) -> Address {
    let url = if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", segments.join("/"))
    };
    let mut output_path: PathBuf = segments.iter().collect();
    output_path.push(INDEX_FILE);
    Address { url, output_path }
}

/// Pick the template for a document that declares no `layout`.
pub fn select_layout(kind: DocumentKind, depth: usize, declared: Option<&str>) -> String {
    if let Some(layout) = declared {
        return layout.to_string();
    }
    match kind {
        DocumentKind::SectionIndex if depth == 0 => HOME_LAYOUT,
        DocumentKind::SectionIndex | DocumentKind::ContentIndex => LIST_LAYOUT,
        DocumentKind::Post => POST_LAYOUT,
        DocumentKind::Page => PAGE_LAYOUT,
    }
    .to_string()
}
