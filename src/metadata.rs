//! Document headers and their defaults.
//!
//! Every document starts with an optional metadata header: YAML between
//! `---` fences, or TOML between `+++` fences.
//!
//! ```text
//! ---
//! title: Hello World
//! date: 2024-01-01
//! tags: [rust, web]
//! weight: 10
//! ---
//! Body text…
//! ```
//!
//! ## Resolution
//!
//! All fallback rules live in [`resolve_header`], which runs once per
//! document and produces a [`ResolvedHeader`]. Classification, addressing,
//! and layout selection only ever read that record.
//!
//! - **Title**: declared `title` → stem with dashes as spaces, title-cased
//! - **Date**: declared `date` → file modification date
//! - **Slug**: declared `slug` → slug of the title → slug of the stem
//!   (empty for index kinds). A declared slug must be one path segment; a
//!   page or post with no usable slug at all is malformed.
//! - **Weight**: declared `weight` → 50
//!
//! The raw header is kept verbatim so templates can read custom fields such
//! as `math` or `description`.

use crate::slug::slugify;
use crate::types::DocumentKind;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Navigation weight of a page that declares none.
pub const DEFAULT_WEIGHT: i64 = 50;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("malformed metadata in {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

/// Header fields after every default has been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedHeader {
    pub title: String,
    pub date: NaiveDate,
    pub slug: String,
    pub tags: Vec<String>,
    pub layout: Option<String>,
    pub weight: i64,
    /// The header exactly as declared.
    pub metadata: Map<String, Value>,
}

/// Resolve a metadata field from multiple sources.
///
/// Takes a list of optional values in priority order and returns the first
/// non-None, non-empty value.
pub fn resolve(sources: &[Option<&str>]) -> Option<String> {
    sources
        .iter()
        .filter_map(|opt| {
            opt.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
        .next()
}

/// Split a source file into its header map and body.
///
/// A file without a header yields an empty map and the whole text as body.
pub fn parse_document(
    source: &str,
    path: &Path,
) -> Result<(Map<String, Value>, String), MetadataError> {
    let malformed = |reason: String| MetadataError::Malformed {
        path: path.to_path_buf(),
        reason,
    };

    let text = source.strip_prefix('\u{feff}').unwrap_or(source);
    let Some((fence, header, body)) = split_header(text) else {
        return Ok((Map::new(), text.to_string()));
    };

    let value = match fence {
        Fence::Yaml => yaml_header(header).map_err(malformed)?,
        Fence::Toml => toml_header(header).map_err(malformed)?,
    };

    match value {
        Value::Object(map) => Ok((map, body.to_string())),
        Value::Null => Ok((Map::new(), body.to_string())),
        other => Err(malformed(format!(
            "header must be a key/value mapping, found {}",
            json_type_name(&other)
        ))),
    }
}

/// Apply every default rule to a parsed header.
///
/// `stem` is the file name without extension; `modified` the file's
/// modification date, used when no `date` is declared.
pub fn resolve_header(
    metadata: Map<String, Value>,
    stem: &str,
    kind: DocumentKind,
    modified: NaiveDate,
) -> Result<ResolvedHeader, String> {
    let declared_title = optional_string(&metadata, "title")?;
    let title = resolve(&[declared_title.as_deref()]).unwrap_or_else(|| title_from_stem(stem));

    let date = match metadata.get("date") {
        None | Some(Value::Null) => modified,
        Some(Value::String(s)) => parse_date(s)?,
        Some(other) => return Err(format!("`date` must be a date, found {}", json_type_name(other))),
    };

    let declared_slug = optional_string(&metadata, "slug")?
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let slug = match declared_slug {
        Some(s) => single_segment(s)?,
        None if kind.is_index() => String::new(),
        None => derived_slug(&title, stem)?,
    };

    let weight = match metadata.get("weight") {
        None | Some(Value::Null) => DEFAULT_WEIGHT,
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| format!("`weight` must be an integer, found {n}"))?,
        Some(other) => {
            return Err(format!(
                "`weight` must be an integer, found {}",
                json_type_name(other)
            ));
        }
    };

    Ok(ResolvedHeader {
        title,
        date,
        slug,
        tags: tags(&metadata)?,
        layout: optional_string(&metadata, "layout")?.filter(|l| !l.trim().is_empty()),
        weight,
        metadata,
    })
}

/// A declared slug becomes a single output directory, so it may not climb
/// out of its parent or hide itself.
fn single_segment(slug: String) -> Result<String, String> {
    if slug.contains(['/', '\\']) || slug.starts_with('.') {
        return Err(format!("`slug` must be a single path segment, found `{slug}`"));
    }
    Ok(slug)
}

fn derived_slug(title: &str, stem: &str) -> Result<String, String> {
    [slugify(title), slugify(stem)]
        .into_iter()
        .find(|s| !s.is_empty())
        .ok_or_else(|| format!("no URL slug can be made from title `{title}` or file name `{stem}`"))
}

/// `my-first-post` → `My First Post`.
pub fn title_from_stem(stem: &str) -> String {
    let spaced = stem.replace('-', " ");
    let mut title = String::with_capacity(spaced.len());
    let mut at_word_start = true;
    for c in spaced.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                title.extend(c.to_uppercase());
            } else {
                title.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            title.push(c);
            at_word_start = true;
        }
    }
    title
}

/// Accepts `2024-01-31`, `2024-01-31T10:00:00Z`, and `2024-01-31 10:00`.
pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    let trimmed = value.trim();
    let day = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| format!("invalid date `{trimmed}`: {e}"))
}

// ============================================================================
// Header splitting
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum Fence {
    Yaml,
    Toml,
}

/// Locate the header fences. Returns `(fence, header, body)`.
fn split_header(text: &str) -> Option<(Fence, &str, &str)> {
    let first_line_end = text.find('\n').unwrap_or(text.len());
    let first_line = text[..first_line_end].trim_end();
    let fence = match first_line {
        "---" => Fence::Yaml,
        "+++" => Fence::Toml,
        _ => return None,
    };
    let marker = if fence == Fence::Yaml { "---" } else { "+++" };

    let header_start = (first_line_end + 1).min(text.len());
    let mut offset = header_start;
    for line in text[header_start..].split_inclusive('\n') {
        let content = line.trim_end();
        if content == marker || (fence == Fence::Yaml && content == "...") {
            let body_start = offset + line.len();
            return Some((fence, &text[header_start..offset], &text[body_start..]));
        }
        offset += line.len();
    }
    None
}

fn yaml_header(header: &str) -> Result<Value, String> {
    if header.trim().is_empty() {
        return Ok(Value::Null);
    }
    let yaml: serde_yaml::Value = serde_yaml::from_str(header).map_err(|e| e.to_string())?;
    serde_json::to_value(yaml).map_err(|e| e.to_string())
}

fn toml_header(header: &str) -> Result<Value, String> {
    let table: toml::Table = toml::from_str(header).map_err(|e| e.to_string())?;
    Ok(toml_to_json(toml::Value::Table(table)))
}

/// TOML datetimes become their string form so `date` reads the same from
/// either header flavour.
pub(crate) fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

// ============================================================================
// Field readers
// ============================================================================

fn optional_string(metadata: &Map<String, Value>, key: &str) -> Result<Option<String>, String> {
    match metadata.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(format!(
            "`{key}` must be a string, found {}",
            json_type_name(other)
        )),
    }
}

/// `tags: [a, b]` or a single `tags: a`.
fn tags(metadata: &Map<String, Value>) -> Result<Vec<String>, String> {
    let scalar = |v: &Value| match v {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(format!(
            "`tags` entries must be strings, found {}",
            json_type_name(other)
        )),
    };

    match metadata.get("tags") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(scalar)
            .filter(|t| !matches!(t, Ok(s) if s.is_empty()))
            .collect(),
        Some(single) => Ok(vec![scalar(single)?]),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn parse(source: &str) -> (Map<String, Value>, String) {
        parse_document(source, Path::new("test.md")).unwrap()
    }

    // =========================================================================
    // resolve()
    // =========================================================================

    #[test]
    fn resolve_first_non_empty_wins() {
        assert_eq!(resolve(&[None, Some("  "), Some("b")]), Some("b".into()));
        assert_eq!(resolve(&[Some(" a "), Some("b")]), Some("a".into()));
        assert_eq!(resolve(&[None, None]), None);
    }

    // =========================================================================
    // Header parsing
    // =========================================================================

    #[test]
    fn yaml_header_and_body_split() {
        let (meta, body) = parse("---\ntitle: Hello\ntags: [a, b]\n---\nBody line\n");
        assert_eq!(meta["title"], "Hello");
        assert_eq!(meta["tags"], serde_json::json!(["a", "b"]));
        assert_eq!(body, "Body line\n");
    }

    #[test]
    fn toml_header_with_native_date() {
        let (meta, body) = parse("+++\ntitle = \"Hi\"\ndate = 2024-03-05\n+++\nText");
        assert_eq!(meta["title"], "Hi");
        assert_eq!(meta["date"], "2024-03-05");
        assert_eq!(body, "Text");
    }

    #[test]
    fn no_header_means_whole_body() {
        let (meta, body) = parse("# Just text\n");
        assert!(meta.is_empty());
        assert_eq!(body, "# Just text\n");
    }

    #[test]
    fn empty_header_is_empty_map() {
        let (meta, body) = parse("---\n---\nBody");
        assert!(meta.is_empty());
        assert_eq!(body, "Body");
    }

    #[test]
    fn unclosed_fence_is_treated_as_body() {
        let (meta, body) = parse("---\ntitle: x\nno closing fence");
        assert!(meta.is_empty());
        assert!(body.starts_with("---"));
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        let (meta, _) = parse("\u{feff}---\ntitle: BOM\n---\n");
        assert_eq!(meta["title"], "BOM");
    }

    #[test]
    fn invalid_yaml_is_malformed() {
        let err = parse_document("---\ntitle: [unclosed\n---\n", Path::new("bad.md")).unwrap_err();
        let MetadataError::Malformed { path, .. } = err;
        assert_eq!(path, Path::new("bad.md"));
    }

    #[test]
    fn scalar_header_is_malformed() {
        assert!(parse_document("---\njust a string\n---\n", Path::new("x.md")).is_err());
    }

    // =========================================================================
    // Defaults
    // =========================================================================

    #[test]
    fn title_from_stem_title_cases() {
        assert_eq!(title_from_stem("my-first-post"), "My First Post");
        assert_eq!(title_from_stem("about"), "About");
        assert_eq!(title_from_stem("_index"), "_Index");
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let h = resolve_header(Map::new(), "hello-world", DocumentKind::Post, day(2023, 5, 1)).unwrap();
        assert_eq!(h.title, "Hello World");
        assert_eq!(h.date, day(2023, 5, 1));
        assert_eq!(h.slug, "hello-world");
        assert_eq!(h.weight, DEFAULT_WEIGHT);
        assert!(h.tags.is_empty());
        assert_eq!(h.layout, None);
    }

    #[test]
    fn declared_fields_win() {
        let (meta, _) = parse(
            "---\ntitle: Über Post\ndate: 2024-01-01\nslug: custom\nlayout: wide.html\nweight: 7\ntags: go\n---\n",
        );
        let h = resolve_header(meta, "x", DocumentKind::Post, day(2000, 1, 1)).unwrap();
        assert_eq!(h.title, "Über Post");
        assert_eq!(h.date, day(2024, 1, 1));
        assert_eq!(h.slug, "custom");
        assert_eq!(h.layout.as_deref(), Some("wide.html"));
        assert_eq!(h.weight, 7);
        assert_eq!(h.tags, vec!["go".to_string()]);
    }

    #[test]
    fn slug_derived_from_declared_title() {
        let (meta, _) = parse("---\ntitle: Hello, World!\n---\n");
        let h = resolve_header(meta, "file-name", DocumentKind::Page, day(2024, 1, 1)).unwrap();
        assert_eq!(h.slug, "hello-world");
    }

    #[test]
    fn index_kinds_have_empty_slug() {
        let h = resolve_header(Map::new(), "_index", DocumentKind::SectionIndex, day(2024, 1, 1)).unwrap();
        assert_eq!(h.slug, "");
        let h = resolve_header(Map::new(), "index", DocumentKind::ContentIndex, day(2024, 1, 1)).unwrap();
        assert_eq!(h.slug, "");
    }

    #[test]
    fn empty_title_slug_falls_back_to_stem() {
        let (meta, _) = parse("---\ntitle: '!!!'\n---\n");
        let h = resolve_header(meta, "notes", DocumentKind::Page, day(2024, 1, 1)).unwrap();
        assert_eq!(h.slug, "notes");

        let (meta, _) = parse("---\nslug: ''\n---\n");
        let h = resolve_header(meta, "notes", DocumentKind::Post, day(2024, 1, 1)).unwrap();
        assert_eq!(h.slug, "notes");
    }

    #[test]
    fn page_without_any_slug_is_error() {
        let err = resolve_header(Map::new(), "!!!", DocumentKind::Page, day(2024, 1, 1)).unwrap_err();
        assert!(err.contains("no URL slug"), "{err}");
    }

    #[test]
    fn declared_slug_must_be_one_segment() {
        for slug in ["../../outside", "a/b", "a\\\\b", ".hidden", ".."] {
            let (meta, _) = parse(&format!("---\nslug: \"{slug}\"\n---\n"));
            assert!(
                resolve_header(meta, "x", DocumentKind::Page, day(2024, 1, 1)).is_err(),
                "{slug}"
            );
        }
    }

    #[test]
    fn datetime_values_keep_their_day() {
        assert_eq!(parse_date("2024-02-03T10:00:00Z").unwrap(), day(2024, 2, 3));
        assert_eq!(parse_date("2024-02-03 10:00").unwrap(), day(2024, 2, 3));
        assert!(parse_date("yesterday").is_err());
    }

    #[test]
    fn bad_field_types_are_errors() {
        let (meta, _) = parse("---\nweight: heavy\n---\n");
        assert!(resolve_header(meta, "x", DocumentKind::Page, day(2024, 1, 1)).is_err());

        let (meta, _) = parse("---\ndate: not-a-date\n---\n");
        assert!(resolve_header(meta, "x", DocumentKind::Page, day(2024, 1, 1)).is_err());

        let (meta, _) = parse("---\ntitle: [a, b]\n---\n");
        assert!(resolve_header(meta, "x", DocumentKind::Page, day(2024, 1, 1)).is_err());
    }

    #[test]
    fn raw_metadata_passes_through() {
        let (meta, _) = parse("---\nmath: true\ndescription: Notes\n---\n");
        let h = resolve_header(meta, "x", DocumentKind::Page, day(2024, 1, 1)).unwrap();
        assert_eq!(h.metadata["math"], true);
        assert_eq!(h.metadata["description"], "Notes");
    }
}
