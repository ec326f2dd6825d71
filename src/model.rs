//! Content model construction.
//!
//! Turns the scanned sources into the complete in-memory site: every
//! document with its address and layout, the date-sorted post list, the
//! per-section post buckets, the tag index, and the navigation.
//!
//! The build is a single pass over the sources in scan order followed by a
//! few derivation steps:
//!
//! 1. Classify, parse the header, resolve defaults, transform the body,
//!    resolve the address and layout. Malformed headers skip the document.
//! 2. Stable-sort posts newest first, so same-day posts keep scan order.
//! 3. Bucket the sorted posts by section.
//! 4. Fold tags: names come from the first post (in scan order) declaring
//!    them, post lists from the sorted posts.
//! 5. Navigation: Home, root-level pages (a root `index.md` included), and
//!    the posts section.
//! 6. Reject any two outputs (documents or tag pages) sharing a path.
//!
//! Nothing here touches the filesystem; the model is rebuilt from scratch on
//! every build.

use crate::address::{self, select_layout};
use crate::classify::{Classification, ClassifiedPath, classify};
use crate::config::BuildConfig;
use crate::markdown;
use crate::metadata::{self, MetadataError};
use crate::scan::{ContentScan, SourceDocument};
use crate::slug::slugify;
use crate::types::{Document, DocumentKind, NavEntry, Tag};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use thiserror::Error;

/// Navigation weight of the Home entry.
pub const HOME_WEIGHT: i64 = 0;
/// Navigation weight of the posts section entry.
pub const POSTS_WEIGHT: i64 = 100;

const DATE_FORMAT: &str = "%d %b, %Y";

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("output path collision at {path}: {first} and {second}")]
    OutputPathCollision {
        path: PathBuf,
        first: String,
        second: String,
    },
}

/// The whole site, ready to render.
#[derive(Debug, Default, Serialize)]
pub struct ContentModel {
    /// Every document, in scan order.
    pub documents: Vec<Document>,
    /// Posts only, newest first.
    pub posts: Vec<Document>,
    /// Section name → its posts, newest first.
    pub sections: BTreeMap<String, Vec<Document>>,
    /// Tag slug → tag.
    pub tags: BTreeMap<String, Tag>,
    pub nav: Vec<NavEntry>,
    /// Drafts, relative to the content root.
    pub drafts: Vec<PathBuf>,
    /// Documents skipped for malformed headers or non-UTF-8 text.
    pub skipped: Vec<PathBuf>,
}

impl ContentModel {
    /// The document published at `url`, if any.
    pub fn document_at(&self, url: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.url == url)
    }
}

/// Build the content model from a content scan.
pub fn build_model(scan: &ContentScan, config: &BuildConfig) -> Result<ContentModel, ModelError> {
    let mut model = ContentModel {
        skipped: scan.undecodable.clone(),
        ..Default::default()
    };

    for source in &scan.sources {
        let located = match classify(&source.rel_path, &config.posts_section) {
            Classification::Document(located) => located,
            Classification::Draft => {
                tracing::debug!(path = %source.rel_path.display(), "skipping draft");
                model.drafts.push(source.rel_path.clone());
                continue;
            }
            Classification::Hidden => continue,
        };

        match build_document(source, located) {
            Ok(doc) => model.documents.push(doc),
            Err(e) => {
                tracing::warn!("{e}; document skipped");
                model.skipped.push(source.rel_path.clone());
            }
        }
    }

    model.posts = model
        .documents
        .iter()
        .filter(|d| d.kind == DocumentKind::Post)
        .cloned()
        .collect();
    // Vec::sort_by is stable: same-day posts keep scan order.
    model.posts.sort_by(|a, b| b.date.cmp(&a.date));

    model.sections = build_sections(&model.documents, &model.posts);
    model.tags = build_tags(&model.documents, &model.posts, &config.posts_section);
    model.nav = build_nav(&model.documents, config, scan.posts_section_present);

    check_collisions(&model)?;
    Ok(model)
}

fn build_document(source: &SourceDocument, located: ClassifiedPath) -> Result<Document, MetadataError> {
    let (header, body) = metadata::parse_document(&source.text, &source.rel_path)?;
    let resolved = metadata::resolve_header(header, &located.stem, located.kind, source.modified)
        .map_err(|reason| MetadataError::Malformed {
            path: source.rel_path.clone(),
            reason,
        })?;

    let address = address::resolve(located.kind, &located.dir, &resolved.slug);
    let layout = select_layout(located.kind, located.depth, resolved.layout.as_deref());

    Ok(Document {
        title: resolved.title,
        date_formatted: resolved.date.format(DATE_FORMAT).to_string(),
        date: resolved.date,
        slug: resolved.slug,
        kind: located.kind,
        content: markdown::transform(&body),
        url: address.url,
        output_path: address.output_path,
        source_path: source.rel_path.clone(),
        metadata: resolved.metadata,
        section: located.section,
        depth: located.depth,
        layout,
        tags: resolved.tags,
        weight: resolved.weight,
        is_post: located.kind == DocumentKind::Post,
        is_index: located.kind == DocumentKind::SectionIndex,
    })
}

fn build_sections(documents: &[Document], posts: &[Document]) -> BTreeMap<String, Vec<Document>> {
    let mut sections: BTreeMap<String, Vec<Document>> = BTreeMap::new();
    for doc in documents.iter().filter(|d| !d.is_post) {
        if let Some(section) = &doc.section {
            sections.entry(section.clone()).or_default();
        }
    }
    for post in posts {
        if let Some(section) = &post.section {
            sections.entry(section.clone()).or_default().push(post.clone());
        }
    }
    sections
}

fn build_tags(
    documents: &[Document],
    posts: &[Document],
    posts_section: &str,
) -> BTreeMap<String, Tag> {
    let mut tags: BTreeMap<String, Tag> = BTreeMap::new();

    for name in documents.iter().filter(|d| d.is_post).flat_map(|d| &d.tags) {
        let slug = slugify(name);
        if slug.is_empty() {
            tracing::warn!(tag = %name, "tag has no usable characters for a URL; ignored");
            continue;
        }
        tags.entry(slug.clone()).or_insert_with(|| {
            let address = address::address_for(&[posts_section, &slug]);
            Tag {
                name: name.clone(),
                slug,
                url: address.url,
                output_path: address.output_path,
                count: 0,
                posts: Vec::new(),
            }
        });
    }

    for post in posts {
        let mut seen = HashSet::new();
        for name in &post.tags {
            let slug = slugify(name);
            if !seen.insert(slug.clone()) {
                continue;
            }
            if let Some(tag) = tags.get_mut(&slug) {
                tag.posts.push(post.clone());
                tag.count += 1;
            }
        }
    }
    tags
}

fn build_nav(documents: &[Document], config: &BuildConfig, posts_section_present: bool) -> Vec<NavEntry> {
    let mut nav = vec![NavEntry {
        title: "Home".to_string(),
        url: "/".to_string(),
        weight: HOME_WEIGHT,
    }];

    nav.extend(
        documents
            .iter()
            .filter(|d| {
                matches!(d.kind, DocumentKind::Page | DocumentKind::ContentIndex) && d.depth == 0
            })
            .map(|d| NavEntry {
                title: d.title.clone(),
                url: d.url.clone(),
                weight: d.weight,
            }),
    );

    if posts_section_present {
        nav.push(NavEntry {
            title: config.posts_title.clone(),
            url: address::address_for(&[config.posts_section.as_str()]).url,
            weight: POSTS_WEIGHT,
        });
    }

    nav.sort_by_key(|entry| entry.weight);
    nav
}

fn check_collisions(model: &ContentModel) -> Result<(), ModelError> {
    let mut claimed: HashMap<PathBuf, String> = HashMap::new();
    let outputs = model
        .documents
        .iter()
        .map(|d| (&d.output_path, d.source_path.display().to_string()))
        .chain(
            model
                .tags
                .values()
                .map(|t| (&t.output_path, format!("tag page `{}`", t.name))),
        );

    for (path, owner) in outputs {
        if let Some(first) = claimed.get(path) {
            return Err(ModelError::OutputPathCollision {
                path: path.clone(),
                first: first.clone(),
                second: owner,
            });
        }
        claimed.insert(path.clone(), owner);
    }
    Ok(())
}
