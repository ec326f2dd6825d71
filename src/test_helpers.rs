//! Shared test utilities for the plainpress test suite.
//!
//! Provides fixture setup and lookup helpers that work with the content
//! model (`ContentModel`, `Document`, `Tag`).
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let project = Project::load(tmp.path(), None).unwrap();
//! let (model, _) = load_model(&project).unwrap();
//!
//! let about = find_document(&model, "/about/");
//! assert_eq!(about.title, "About");
//! assert_eq!(nav_titles(&model), vec!["Home", "About", "Blog"]);
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::model::ContentModel;
use crate::types::{Document, Tag};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy the `fixtures/site/` project to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Model lookups (panic with a clear message on miss)
// =========================================================================

/// Find a document by URL. Panics if not found.
pub fn find_document<'a>(model: &'a ContentModel, url: &str) -> &'a Document {
    model.document_at(url).unwrap_or_else(|| {
        let urls: Vec<&str> = model.documents.iter().map(|d| d.url.as_str()).collect();
        panic!("document at '{url}' not found. Available: {urls:?}")
    })
}

/// Find a tag by slug. Panics if not found.
pub fn find_tag<'a>(model: &'a ContentModel, slug: &str) -> &'a Tag {
    model.tags.get(slug).unwrap_or_else(|| {
        let slugs: Vec<&String> = model.tags.keys().collect();
        panic!("tag '{slug}' not found. Available: {slugs:?}")
    })
}

/// Navigation titles in order.
pub fn nav_titles(model: &ContentModel) -> Vec<&str> {
    model.nav.iter().map(|n| n.title.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Project, load_model};
    use crate::types::DocumentKind;

    #[test]
    fn fixture_site_loads() {
        let tmp = setup_fixtures();
        let project = Project::load(tmp.path(), None).unwrap();
        let (model, scan) = load_model(&project).unwrap();

        assert_eq!(nav_titles(&model), vec!["Home", "About", "Blog"]);
        assert_eq!(find_document(&model, "/blog/").kind, DocumentKind::SectionIndex);
        assert_eq!(find_tag(&model, "go").count, 1);
        assert_eq!(scan.assets.len(), 1);
    }
}
