//! Filesystem scanning of the content root.
//!
//! Walks the content directory once and splits what it finds into Markdown
//! sources (read into memory with their modification date) and content
//! assets (everything else, copied later next to the pages that use them).
//!
//! ```text
//! content/
//! ├── _index.md              # source
//! ├── about.md               # source
//! ├── blog/
//! │   ├── _index.md          # source
//! │   ├── hello.md           # source
//! │   └── hello-diagram.png  # asset
//! └── .obsidian/             # skipped entirely
//! ```
//!
//! Output order is the byte order of the `/`-joined relative paths, so the
//! same tree always produces the same model regardless of platform or
//! directory listing order.

use crate::classify::{is_hidden, is_markdown};
use chrono::{DateTime, Local, NaiveDate};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("content directory not found: {0}")]
    MissingContentRoot(PathBuf),
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("walking content directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// A Markdown file read from the content root.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Relative to the content root.
    pub rel_path: PathBuf,
    pub text: String,
    /// Local date of the file's last modification.
    pub modified: NaiveDate,
}

/// Everything found under the content root.
#[derive(Debug, Default)]
pub struct ContentScan {
    /// Sorted by relative path.
    pub sources: Vec<SourceDocument>,
    /// Non-Markdown files, relative to the content root, sorted.
    pub assets: Vec<PathBuf>,
    /// Markdown files that are not valid UTF-8, skipped.
    pub undecodable: Vec<PathBuf>,
    /// True if the content root has a directory named like the posts section.
    pub posts_section_present: bool,
}

/// Scan `content_root`, skipping every dot-prefixed file or directory.
pub fn scan(content_root: &Path, posts_section: &str) -> Result<ContentScan, ScanError> {
    if !content_root.is_dir() {
        return Err(ScanError::MissingContentRoot(content_root.to_path_buf()));
    }

    let mut files: Vec<(String, PathBuf)> = Vec::new();
    let walker = WalkDir::new(content_root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(content_root)
            .unwrap_or(entry.path())
            .to_path_buf();
        if is_hidden(&rel) {
            continue;
        }
        files.push((sort_key(&rel), rel));
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));

    let mut scan = ContentScan {
        posts_section_present: content_root.join(posts_section).is_dir(),
        ..Default::default()
    };

    for (_, rel) in files {
        if is_markdown(&rel) {
            match read_source(content_root, &rel)? {
                Some(source) => scan.sources.push(source),
                None => scan.undecodable.push(rel),
            }
        } else {
            scan.assets.push(rel);
        }
    }

    Ok(scan)
}

/// `None` when the file is not valid UTF-8.
fn read_source(content_root: &Path, rel_path: &Path) -> Result<Option<SourceDocument>, ScanError> {
    let path = content_root.join(rel_path);
    let io_err = |source| ScanError::Io {
        path: path.clone(),
        source,
    };
    let bytes = fs::read(&path).map_err(io_err)?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(path = %rel_path.display(), "not valid UTF-8 ({e}); document skipped");
            return Ok(None);
        }
    };
    let modified = fs::metadata(&path)
        .and_then(|m| m.modified())
        .map_err(io_err)?;
    Ok(Some(SourceDocument {
        rel_path: rel_path.to_path_buf(),
        text,
        modified: DateTime::<Local>::from(modified).date_naive(),
    }))
}

fn sort_key(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
