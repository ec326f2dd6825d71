//! Shared types of the content model.
//!
//! These are produced by [`model`](crate::model), consumed by
//! [`render`](crate::render), and serialized verbatim into template contexts
//! and the `scan` JSON dump, so field names are part of the template contract.

use chrono::NaiveDate;
use serde::Serialize;
use std::path::PathBuf;

/// Classification of a source document. Mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// `_index.md`: landing page of a section (or of the whole site at root).
    SectionIndex,
    /// `index.md`: landing page of a content bundle directory.
    ContentIndex,
    /// Any other document living under the posts section.
    Post,
    /// Everything else.
    Page,
}

impl DocumentKind {
    pub fn is_index(self) -> bool {
        matches!(self, DocumentKind::SectionIndex | DocumentKind::ContentIndex)
    }
}

/// One processed source file with its derived address, layout, and content.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub title: String,
    pub date: NaiveDate,
    /// `date` rendered as `01 Jan, 2024`.
    pub date_formatted: String,
    /// Empty only for index kinds without a declared slug.
    pub slug: String,
    pub kind: DocumentKind,
    /// Transformed body HTML.
    pub content: String,
    /// Absolute site path, always ending in `/`.
    pub url: String,
    /// Relative to the output root; always ends in `index.html`.
    pub output_path: PathBuf,
    /// Relative to the content root.
    pub source_path: PathBuf,
    /// Every declared header field, untouched.
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// First directory segment below the content root.
    pub section: Option<String>,
    /// Path segments between the content root and the file, minus one.
    pub depth: usize,
    pub layout: String,
    pub tags: Vec<String>,
    pub weight: i64,
    pub is_post: bool,
    /// True for section indexes (`_index.md`) only.
    pub is_index: bool,
}

/// Posts sharing a label, keyed by the slug of that label.
#[derive(Debug, Clone, Serialize)]
pub struct Tag {
    /// Name as first declared.
    pub name: String,
    pub slug: String,
    /// Address of the tag's listing page.
    pub url: String,
    #[serde(skip)]
    pub output_path: PathBuf,
    pub count: usize,
    /// Newest first.
    pub posts: Vec<Document>,
}

/// A single entry of the site navigation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavEntry {
    pub title: String,
    pub url: String,
    pub weight: i64,
}
