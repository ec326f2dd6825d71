//! Template rendering and output writing.
//!
//! Every page is rendered with minijinja from the project's `templates/`
//! directory. Templates see one shared base context:
//!
//! | key | value |
//! |-----|-------|
//! | `site` | the `[site]` table plus `current_year` |
//! | `config` | the whole configuration |
//! | `pages` | every document |
//! | `posts` | posts, newest first |
//! | `sections` | section name → posts |
//! | `nav` | navigation entries |
//! | `tags` | tag slug → tag |
//!
//! Document pages add `page` (and `section_posts` for section indexes).
//! Tag pages render `list.html` with a synthetic `page` flagged
//! `is_tag_page`, the tag's posts as `section_posts`, `is_filtered`, and
//! `current_tag`.
//!
//! Output is not auto-escaped: `{{ page.content }}` inserts the document's
//! HTML as is, and templates escape untrusted values with `|escape`.
//!
//! Every template the model refers to is loaded and compiled before the
//! first file is written, so a missing or broken layout fails the build with
//! the output untouched.

use crate::address::{LIST_LAYOUT, NOT_FOUND_TEMPLATE};
use crate::config::SiteConfig;
use crate::model::ContentModel;
use crate::slug::slugify;
use crate::types::{Document, Tag};
use chrono::NaiveDate;
use minijinja::{AutoEscape, Environment, ErrorKind, Value, context, path_loader};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_DATE_FORMAT: &str = "%d %b, %Y";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("template not found: {name}")]
    TemplateNotFound { name: String },
    #[error("template error: {0:#}")]
    Template(#[from] minijinja::Error),
    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// What [`render_site`] wrote.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenderReport {
    pub documents: usize,
    pub tag_pages: usize,
    pub not_found_page: bool,
}

/// Templates plus the base context shared by every page of one build.
pub struct Renderer {
    env: Environment<'static>,
    base: BTreeMap<String, Value>,
    posts_section: String,
}

impl Renderer {
    /// Load templates from `templates_dir` and verify that every layout the
    /// model needs exists and compiles.
    pub fn new(
        templates_dir: &Path,
        model: &ContentModel,
        config: &SiteConfig,
        current_year: i32,
    ) -> Result<Self, RenderError> {
        let env = template_env(templates_dir);

        for name in required_templates(model) {
            load_template(&env, &name)?;
        }

        let mut site = config.site_context();
        site["current_year"] = current_year.into();

        let base = BTreeMap::from([
            ("site".to_string(), Value::from_serialize(&site)),
            ("config".to_string(), Value::from_serialize(config.to_context())),
            ("pages".to_string(), Value::from_serialize(&model.documents)),
            ("posts".to_string(), Value::from_serialize(&model.posts)),
            ("sections".to_string(), Value::from_serialize(&model.sections)),
            ("nav".to_string(), Value::from_serialize(&model.nav)),
            ("tags".to_string(), Value::from_serialize(&model.tags)),
        ]);

        Ok(Self {
            env,
            base,
            posts_section: config.build.posts_section.clone(),
        })
    }

    pub fn render_document(&self, doc: &Document, model: &ContentModel) -> Result<String, RenderError> {
        let mut ctx = self.base.clone();
        ctx.insert("page".into(), Value::from_serialize(doc));
        if doc.is_index {
            if let Some(section) = &doc.section {
                let posts = model.sections.get(section).cloned().unwrap_or_default();
                ctx.insert("section_posts".into(), Value::from_serialize(posts));
            }
        }
        Ok(load_template(&self.env, &doc.layout)?.render(&ctx)?)
    }

    pub fn render_tag_page(&self, tag: &Tag) -> Result<String, RenderError> {
        let mut ctx = self.base.clone();
        ctx.insert(
            "page".into(),
            context! {
                is_index => true,
                section => &self.posts_section,
                is_tag_page => true,
                tag => &tag.name,
                tag_slug => &tag.slug,
                title => &tag.name,
                url => &tag.url,
            },
        );
        ctx.insert("section_posts".into(), Value::from_serialize(&tag.posts));
        ctx.insert("is_filtered".into(), Value::from(true));
        ctx.insert("current_tag".into(), Value::from(tag.name.as_str()));
        Ok(load_template(&self.env, LIST_LAYOUT)?.render(&ctx)?)
    }

    /// `None` when the project has no `404.html`.
    pub fn render_not_found(&self) -> Result<Option<String>, RenderError> {
        match self.env.get_template(NOT_FOUND_TEMPLATE) {
            Ok(template) => Ok(Some(template.render(&self.base)?)),
            Err(e) if e.kind() == ErrorKind::TemplateNotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Render and write every page of `model`. Parent directories are
    /// created as needed.
    pub fn write_site(&self, model: &ContentModel, output_dir: &Path) -> Result<RenderReport, RenderError> {
        let mut report = RenderReport::default();

        for doc in &model.documents {
            let html = self.render_document(doc, model)?;
            write_output(output_dir, &doc.output_path, &html)?;
            report.documents += 1;
        }

        for tag in model.tags.values() {
            let html = self.render_tag_page(tag)?;
            write_output(output_dir, &tag.output_path, &html)?;
            report.tag_pages += 1;
        }

        if let Some(html) = self.render_not_found()? {
            write_output(output_dir, Path::new(NOT_FOUND_TEMPLATE), &html)?;
            report.not_found_page = true;
        }

        Ok(report)
    }
}

/// Render every document, every tag page, and the optional not-found page
/// into `output_dir`.
pub fn render_site(
    model: &ContentModel,
    config: &SiteConfig,
    templates_dir: &Path,
    output_dir: &Path,
    current_year: i32,
) -> Result<RenderReport, RenderError> {
    Renderer::new(templates_dir, model, config, current_year)?.write_site(model, output_dir)
}

fn template_env(templates_dir: &Path) -> Environment<'static> {
    let mut env = Environment::new();
    env.set_loader(path_loader(templates_dir.to_path_buf()));
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.add_filter("slugify", |value: String| slugify(&value));
    env.add_filter("date", format_date);
    env
}

fn load_template<'env>(
    env: &'env Environment<'static>,
    name: &str,
) -> Result<minijinja::Template<'env, 'env>, RenderError> {
    env.get_template(name).map_err(|e| {
        if e.kind() == ErrorKind::TemplateNotFound {
            RenderError::TemplateNotFound {
                name: name.to_string(),
            }
        } else {
            RenderError::Template(e)
        }
    })
}

fn required_templates(model: &ContentModel) -> BTreeSet<String> {
    let mut names: BTreeSet<String> = model.documents.iter().map(|d| d.layout.clone()).collect();
    if !model.tags.is_empty() {
        names.insert(LIST_LAYOUT.to_string());
    }
    names
}

/// `{{ page.date | date("%Y") }}`; without a format, `01 Jan, 2024`.
fn format_date(value: String, format: Option<String>) -> Result<String, minijinja::Error> {
    let day = value.get(..10).unwrap_or(&value);
    let date = NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| {
        minijinja::Error::new(
            ErrorKind::InvalidOperation,
            format!("cannot format `{value}` as a date: {e}"),
        )
    })?;
    let format = format.as_deref().unwrap_or(DEFAULT_DATE_FORMAT);
    let mut out = String::new();
    write!(out, "{}", date.format(format)).map_err(|_| {
        minijinja::Error::new(
            ErrorKind::InvalidOperation,
            format!("invalid date format `{format}`"),
        )
    })?;
    Ok(out)
}

fn write_output(output_dir: &Path, rel: &Path, html: &str) -> Result<(), RenderError> {
    let path = output_dir.join(rel);
    let io_err = |source| RenderError::Io {
        path: path.clone(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(&path, html).map_err(io_err)?;
    tracing::debug!(path = %rel.display(), "wrote");
    Ok(())
}
