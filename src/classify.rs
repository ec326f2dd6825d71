//! Path classification for source documents.
//!
//! Every Markdown file under the content root is classified from its path
//! alone, before its header is read. Rules apply in priority order:
//!
//! 1. Any segment starting with `.` hides the file (`.obsidian/notes.md`).
//! 2. A stem starting with `_` other than `_index` is a draft (`_wip.md`).
//! 3. `_index` is a section index.
//! 4. `index` is a content index.
//! 5. A file below a directory named like the posts section is a post.
//! 6. Anything else is a page.
//!
//! Rule 4 wins over rule 5, so `blog/my-post/index.md` is a content index,
//! not a post.

use crate::types::DocumentKind;
use std::path::{Component, Path};

/// File extensions recognised as Markdown documents (compared case-insensitively).
pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

const SECTION_INDEX_STEM: &str = "_index";
const CONTENT_INDEX_STEM: &str = "index";

/// Outcome of classifying one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Document(ClassifiedPath),
    /// Inside a dot-prefixed segment.
    Hidden,
    /// Underscore-prefixed stem.
    Draft,
}

/// Location facts of a path that will become a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedPath {
    pub kind: DocumentKind,
    /// Segments from the content root to the file, minus one.
    pub depth: usize,
    /// Parent directory relative to the content root, `/`-joined. Empty at root.
    pub dir: String,
    /// File name without extension.
    pub stem: String,
    /// First directory segment, `None` for files directly in the root.
    pub section: Option<String>,
}

/// True if `path` has a Markdown extension.
pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .map(|e| {
            let ext = e.to_string_lossy();
            MARKDOWN_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// True if any segment of the relative path starts with `.`.
pub fn is_hidden(rel_path: &Path) -> bool {
    segments(rel_path).iter().any(|s| s.starts_with('.'))
}

/// Classify a document path relative to the content root.
///
/// - `"_index.md"` → SectionIndex, depth 0, dir ""
/// - `"blog/_index.md"` → SectionIndex, depth 1, dir "blog"
/// - `"docs/setup/index.md"` → ContentIndex, depth 2, dir "docs/setup"
/// - `"blog/hello.md"` → Post (with `posts_section = "blog"`)
/// - `"about.md"` → Page
/// - `"blog/_draft.md"` → Draft
/// - `".trash/old.md"` → Hidden
pub fn classify(rel_path: &Path, posts_section: &str) -> Classification {
    let segments = segments(rel_path);
    let Some((file_name, dirs)) = segments.split_last() else {
        return Classification::Hidden;
    };

    if segments.iter().any(|s| s.starts_with('.')) {
        return Classification::Hidden;
    }

    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    if stem.starts_with('_') && stem != SECTION_INDEX_STEM {
        return Classification::Draft;
    }

    let kind = if stem == SECTION_INDEX_STEM {
        DocumentKind::SectionIndex
    } else if stem == CONTENT_INDEX_STEM {
        DocumentKind::ContentIndex
    } else if dirs.iter().any(|d| d == posts_section) {
        DocumentKind::Post
    } else {
        DocumentKind::Page
    };

    Classification::Document(ClassifiedPath {
        kind,
        depth: dirs.len(),
        dir: dirs.join("/"),
        stem,
        section: dirs.first().cloned(),
    })
}

fn segments(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(path: &str) -> ClassifiedPath {
        match classify(Path::new(path), "blog") {
            Classification::Document(c) => c,
            other => panic!("expected a document for {path}, got {other:?}"),
        }
    }

    #[test]
    fn root_section_index() {
        let c = doc("_index.md");
        assert_eq!(c.kind, DocumentKind::SectionIndex);
        assert_eq!(c.depth, 0);
        assert_eq!(c.dir, "");
        assert_eq!(c.section, None);
    }

    #[test]
    fn section_index_in_posts_section_is_not_a_post() {
        let c = doc("blog/_index.md");
        assert_eq!(c.kind, DocumentKind::SectionIndex);
        assert_eq!(c.depth, 1);
        assert_eq!(c.section.as_deref(), Some("blog"));
    }

    #[test]
    fn content_index_wins_over_posts_section() {
        let c = doc("blog/my-post/index.md");
        assert_eq!(c.kind, DocumentKind::ContentIndex);
        assert_eq!(c.dir, "blog/my-post");
        assert_eq!(c.depth, 2);
    }

    #[test]
    fn post_below_posts_section() {
        let c = doc("blog/hello-world.md");
        assert_eq!(c.kind, DocumentKind::Post);
        assert_eq!(c.stem, "hello-world");
    }

    #[test]
    fn nested_posts_section_segment_still_counts() {
        assert_eq!(doc("team/blog/update.md").kind, DocumentKind::Post);
        assert_eq!(doc("team/blog/update.md").section.as_deref(), Some("team"));
    }

    #[test]
    fn file_named_like_posts_section_is_a_page() {
        assert_eq!(doc("blog.md").kind, DocumentKind::Page);
    }

    #[test]
    fn root_page() {
        let c = doc("about.md");
        assert_eq!(c.kind, DocumentKind::Page);
        assert_eq!(c.depth, 0);
    }

    #[test]
    fn drafts_are_excluded() {
        assert_eq!(classify(Path::new("_draft.md"), "blog"), Classification::Draft);
        assert_eq!(
            classify(Path::new("blog/_wip.md"), "blog"),
            Classification::Draft
        );
    }

    #[test]
    fn hidden_segments_are_excluded() {
        assert_eq!(
            classify(Path::new(".obsidian/notes.md"), "blog"),
            Classification::Hidden
        );
        assert_eq!(
            classify(Path::new("docs/.cache/_index.md"), "blog"),
            Classification::Hidden
        );
    }

    #[test]
    fn hidden_wins_over_draft() {
        assert_eq!(
            classify(Path::new(".trash/_old.md"), "blog"),
            Classification::Hidden
        );
    }

    #[test]
    fn markdown_extensions() {
        assert!(is_markdown(Path::new("a.md")));
        assert!(is_markdown(Path::new("a.MD")));
        assert!(is_markdown(Path::new("a.markdown")));
        assert!(!is_markdown(Path::new("a.txt")));
        assert!(!is_markdown(Path::new("README")));
    }

    #[test]
    fn hidden_detection() {
        assert!(is_hidden(Path::new(".git/config")));
        assert!(is_hidden(Path::new("img/.DS_Store")));
        assert!(!is_hidden(Path::new("img/photo.png")));
    }
}
