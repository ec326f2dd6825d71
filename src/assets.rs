//! Copying of files that are published unchanged.
//!
//! Two sources feed the output tree verbatim:
//!
//! - the static directory, mirrored at the output root (`static/css/site.css`
//!   → `public/css/site.css`);
//! - non-Markdown files found in the content directory, mirrored at their
//!   content-relative path so a post can reference `diagram.png` next to it.
//!
//! Dot-prefixed files and directories are never copied.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("IO error copying {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("walking {0}")]
    Walk(#[from] walkdir::Error),
}

/// Mirror `static_dir` into `output_dir`. A missing static directory copies
/// nothing. Returns the number of files copied.
pub fn copy_static(static_dir: &Path, output_dir: &Path) -> Result<usize, AssetError> {
    if !static_dir.is_dir() {
        return Ok(0);
    }

    let mut copied = 0;
    let walker = WalkDir::new(static_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(static_dir).unwrap_or(entry.path());
        copy_file(entry.path(), &output_dir.join(rel))?;
        copied += 1;
    }
    Ok(copied)
}

/// Copy content assets (paths relative to `content_root`) into `output_dir`.
pub fn copy_content_assets(
    content_root: &Path,
    assets: &[PathBuf],
    output_dir: &Path,
) -> Result<usize, AssetError> {
    for rel in assets {
        copy_file(&content_root.join(rel), &output_dir.join(rel))?;
    }
    Ok(assets.len())
}

fn copy_file(src: &Path, dst: &Path) -> Result<(), AssetError> {
    let io_err = |source| AssetError::Io {
        path: src.to_path_buf(),
        source,
    };
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::copy(src, dst).map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, rel).unwrap();
    }

    #[test]
    fn static_tree_mirrored_at_output_root() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write(src.path(), "css/site.css");
        write(src.path(), "favicon.ico");
        write(src.path(), ".git/config");

        let copied = copy_static(src.path(), out.path()).unwrap();
        assert_eq!(copied, 2);
        assert_eq!(
            fs::read_to_string(out.path().join("css/site.css")).unwrap(),
            "css/site.css"
        );
        assert!(out.path().join("favicon.ico").exists());
        assert!(!out.path().join(".git").exists());
    }

    #[test]
    fn missing_static_dir_copies_nothing() {
        let tmp = TempDir::new().unwrap();
        let copied = copy_static(&tmp.path().join("static"), tmp.path()).unwrap();
        assert_eq!(copied, 0);
    }

    #[test]
    fn content_assets_keep_relative_paths() {
        let content = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write(content.path(), "blog/diagram.png");

        let copied =
            copy_content_assets(content.path(), &[PathBuf::from("blog/diagram.png")], out.path())
                .unwrap();
        assert_eq!(copied, 1);
        assert!(out.path().join("blog/diagram.png").is_file());
    }
}
