//! One complete build.
//!
//! ```text
//! site.toml ─► config ─► scan content/ ─► model ─► load templates
//!                                                      │
//!            public/ ◄── render pages ◄── copy assets ◄┘ (clean first)
//! ```
//!
//! Everything that can fail without touching the disk (configuration,
//! headers, address collisions, missing templates) is checked before the
//! output directory is cleaned or written.

use crate::assets::{self, AssetError};
use crate::config::{self, CONFIG_FILE, ConfigError, ProjectPaths, SiteConfig};
use crate::model::{self, ContentModel, ModelError};
use crate::render::{RenderError, Renderer};
use crate::scan::{self, ScanError};
use chrono::{Datelike, Local};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error("refusing to clean {0}: it contains the project or its content")]
    UnsafeOutputDir(PathBuf),
    #[error("IO error cleaning {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A loaded project: configuration plus resolved locations.
#[derive(Debug, Clone)]
pub struct Project {
    pub config: SiteConfig,
    pub paths: ProjectPaths,
}

impl Project {
    /// Load `site.toml` (or `config_file`, relative to `root`) and resolve
    /// all directories against `root`.
    pub fn load(root: &Path, config_file: Option<&Path>) -> Result<Self, BuildError> {
        let config_path = root.join(config_file.unwrap_or(Path::new(CONFIG_FILE)));
        let config = config::load_config(&config_path)?;
        let paths = config.paths(root, &config_path);
        Ok(Self { config, paths })
    }
}

/// Summary of a finished build.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub documents: usize,
    pub posts: usize,
    pub tags: usize,
    pub tag_pages: usize,
    pub not_found_page: bool,
    pub static_files: usize,
    pub content_assets: usize,
    pub drafts: usize,
    /// Documents skipped for malformed headers or non-UTF-8 text.
    pub skipped: Vec<PathBuf>,
    pub output_dir: PathBuf,
}

/// Scan the content and build the model without writing anything.
pub fn load_model(project: &Project) -> Result<(ContentModel, scan::ContentScan), BuildError> {
    let scan = scan::scan(&project.paths.content, &project.config.build.posts_section)?;
    let model = model::build_model(&scan, &project.config.build)?;
    Ok((model, scan))
}

/// Run a full build of `project`.
pub fn build(project: &Project) -> Result<BuildReport, BuildError> {
    build_site(project).map(|(_, report)| report)
}

/// Run a full build and keep the model for reporting.
pub fn build_site(project: &Project) -> Result<(ContentModel, BuildReport), BuildError> {
    let paths = &project.paths;
    let (model, scan) = load_model(project)?;
    let renderer = Renderer::new(
        &paths.templates,
        &model,
        &project.config,
        Local::now().year(),
    )?;

    if project.config.build.clean {
        clean_output(paths)?;
    }
    fs::create_dir_all(&paths.output).map_err(|source| BuildError::Io {
        path: paths.output.clone(),
        source,
    })?;

    let static_files = assets::copy_static(&paths.static_dir, &paths.output)?;
    let content_assets = assets::copy_content_assets(&paths.content, &scan.assets, &paths.output)?;
    let rendered = renderer.write_site(&model, &paths.output)?;

    tracing::info!(
        documents = rendered.documents,
        tag_pages = rendered.tag_pages,
        "site built"
    );

    let report = BuildReport {
        documents: rendered.documents,
        posts: model.posts.len(),
        tags: model.tags.len(),
        tag_pages: rendered.tag_pages,
        not_found_page: rendered.not_found_page,
        static_files,
        content_assets,
        drafts: model.drafts.len(),
        skipped: model.skipped.clone(),
        output_dir: paths.output.clone(),
    };
    Ok((model, report))
}

fn clean_output(paths: &ProjectPaths) -> Result<(), BuildError> {
    let output = &paths.output;
    if !output.exists() {
        return Ok(());
    }
    if paths.root.starts_with(output) || paths.content.starts_with(output) {
        return Err(BuildError::UnsafeOutputDir(output.clone()));
    }
    tracing::debug!(path = %output.display(), "cleaning output directory");
    fs::remove_dir_all(output).map_err(|source| BuildError::Io {
        path: output.clone(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::setup_fixtures;

    #[test]
    fn missing_config_is_fatal_and_writes_nothing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = Project::load(tmp.path(), None).unwrap_err();
        assert!(matches!(err, BuildError::Config(ConfigError::Missing(_))));
        assert!(!tmp.path().join("public").exists());
    }

    #[test]
    fn build_reports_counts() {
        let tmp = setup_fixtures();
        let project = Project::load(tmp.path(), None).unwrap();
        let report = build(&project).unwrap();

        assert_eq!(report.documents, 4);
        assert_eq!(report.posts, 1);
        assert_eq!(report.tag_pages, 1);
        assert!(report.not_found_page);
        assert_eq!(report.static_files, 1);
        assert_eq!(report.content_assets, 1);
        assert_eq!(report.drafts, 1);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn clean_removes_stale_output() {
        let tmp = setup_fixtures();
        let stale = tmp.path().join("public/old/index.html");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, "old").unwrap();

        let project = Project::load(tmp.path(), None).unwrap();
        build(&project).unwrap();
        assert!(!stale.exists());
    }

    #[test]
    fn clean_disabled_keeps_stale_output() {
        let tmp = setup_fixtures();
        let stale = tmp.path().join("public/keep.txt");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, "keep").unwrap();

        let mut project = Project::load(tmp.path(), None).unwrap();
        project.config.build.clean = false;
        build(&project).unwrap();
        assert!(stale.exists());
    }

    #[test]
    fn missing_template_leaves_output_untouched() {
        let tmp = setup_fixtures();
        let marker = tmp.path().join("public/marker.txt");
        fs::create_dir_all(marker.parent().unwrap()).unwrap();
        fs::write(&marker, "x").unwrap();
        fs::remove_file(tmp.path().join("templates/post.html")).unwrap();

        let project = Project::load(tmp.path(), None).unwrap();
        let err = build(&project).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Render(RenderError::TemplateNotFound { .. })
        ));
        assert!(marker.exists());
    }

    #[test]
    fn output_containing_content_is_not_cleaned() {
        let tmp = setup_fixtures();
        let mut project = Project::load(tmp.path(), None).unwrap();
        project.paths.output = tmp.path().to_path_buf();
        let err = build(&project).unwrap_err();
        assert!(matches!(err, BuildError::UnsafeOutputDir(_)));
        assert!(tmp.path().join("content").exists());
    }

    #[test]
    fn custom_config_file_name() {
        let tmp = setup_fixtures();
        fs::rename(tmp.path().join("site.toml"), tmp.path().join("other.toml")).unwrap();
        assert!(Project::load(tmp.path(), None).is_err());
        assert!(Project::load(tmp.path(), Some(Path::new("other.toml"))).is_ok());
    }
}
