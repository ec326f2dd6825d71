//! # Plainpress
//!
//! A static site generator for Markdown notes and blogs. Your filesystem is
//! the data source: the path of a Markdown file decides what kind of
//! document it is and where it is published, its header supplies title,
//! date, and tags, and a template per kind decides how it looks.
//!
//! # Architecture: One-Way Pipeline
//!
//! ```text
//! 1. Scan      content/   →  sources + assets   (filesystem → text)
//! 2. Model     sources    →  ContentModel       (documents, posts, tags, nav)
//! 3. Render    model      →  public/            (templates → HTML files)
//! ```
//!
//! The model stage is pure: it never touches the disk, so unit tests can
//! exercise classification, sorting, tagging, and navigation from in-memory
//! sources. All aggregation lives in the returned [`model::ContentModel`];
//! nothing survives from one build to the next.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`classify`] | Path → document kind (section index, content index, post, page), drafts, hidden files |
//! | [`metadata`] | YAML/TOML header parsing and default resolution (title, date, slug, weight) |
//! | [`markdown`] | Markdown → HTML with math protection, sized images, and highlighted code |
//! | [`address`] | Kind + location → URL, output path, and default layout |
//! | [`slug`] | URL slugs for titles and tags |
//! | [`scan`] | Deterministic walk of the content directory |
//! | [`model`] | Content model: documents, sorted posts, sections, tags, navigation |
//! | [`render`] | minijinja rendering of documents, tag pages, and the 404 page |
//! | [`assets`] | Verbatim copy of the static directory and content assets |
//! | [`pipeline`] | One full build from `site.toml` to the output directory |
//! | [`serve`] | Development server with debounced rebuilds |
//! | [`config`] | `site.toml` loading, merging over defaults, validation |
//! | [`types`] | Shared model types serialized into template contexts |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Location Decides Kind
//!
//! A document's kind comes from its path alone: `_index.md` is a section
//! landing page, `index.md` a content bundle, anything below the posts
//! directory (default `blog/`) a post, everything else a page. Headers can
//! override the layout and slug but never the kind, so moving a file is the
//! only way to turn a page into a post.
//!
//! ## Directory-Style URLs
//!
//! Every document is written as `index.html` inside a directory mirroring
//! its URL (`/blog/hello/` → `blog/hello/index.html`). The output works on
//! any static file server without rewrite rules.
//!
//! ## Math Survives Markdown
//!
//! `$…$` and `$$…$$` spans are swapped for opaque tokens before Markdown
//! conversion and restored afterwards, so the converter never sees (and
//! never mangles) backslashes, underscores, or asterisks inside formulas.
//! Rendering the math is left to client-side JavaScript.
//!
//! ## Fail Before Writing
//!
//! Configuration, address collisions, and missing templates are all
//! detected before the output directory is cleaned. A broken build leaves
//! the previous site in place.

pub mod address;
pub mod assets;
pub mod classify;
pub mod config;
pub mod markdown;
pub mod metadata;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod scan;
pub mod serve;
pub mod slug;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
