//! Site configuration module.
//!
//! Handles loading, validating, and merging `site.toml`. The file is
//! required: a project without one is not a site, and building it anyway
//! would silently publish an empty tree.
//!
//! ## Configuration Options
//!
//! ```toml
//! # Free-form metadata, exposed to templates as `site`
//! [site]
//! title = "My Site"
//! author = "Jane Doe"
//!
//! [build]
//! content_dir = "content"       # Markdown sources and content assets
//! output_dir = "public"         # Generated site
//! templates_dir = "templates"   # minijinja templates
//! static_dir = "static"         # Copied verbatim to the output root
//! posts_section = "blog"        # Directory whose documents are posts
//! posts_title = "Blog"          # Navigation label of the posts section
//! clean = true                  # Empty the output directory before writing
//! # sync_source = "~/Notes/site" # Read content from here instead of content_dir
//!
//! [server]
//! host = "localhost"
//! port = 8000
//! open_browser = true
//! ```
//!
//! ## Partial Configuration
//!
//! Every section except `[site]` is optional and sparse. User values are
//! merged on top of the stock defaults, then deserialized. Unknown keys
//! outside `[site]` are rejected to catch typos early.

use crate::metadata::toml_to_json;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default configuration file name, looked up in the project root.
pub const CONFIG_FILE: &str = "site.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    Missing(PathBuf),
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `site.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Arbitrary site metadata for templates.
    pub site: toml::Table,
    /// Source and output locations plus content conventions.
    pub build: BuildConfig,
    /// Development server settings; unused by the build itself.
    pub server: ServerConfig,
}

/// `[build]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    pub content_dir: String,
    pub output_dir: String,
    pub templates_dir: String,
    pub static_dir: String,
    /// Documents below a directory with this name are posts.
    pub posts_section: String,
    /// Navigation label for the posts section.
    pub posts_title: String,
    /// Remove the previous output before writing.
    pub clean: bool,
    /// External content location (e.g. a notes vault) overriding `content_dir`.
    /// `~` is expanded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_source: Option<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            content_dir: "content".to_string(),
            output_dir: "public".to_string(),
            templates_dir: "templates".to_string(),
            static_dir: "static".to_string(),
            posts_section: "blog".to_string(),
            posts_title: "Blog".to_string(),
            clean: true,
            sync_source: None,
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Open the site in a browser once the first build is served.
    pub open_browser: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8000,
            open_browser: true,
        }
    }
}

/// Absolute (root-joined) locations every stage works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub config_file: PathBuf,
    pub content: PathBuf,
    pub output: PathBuf,
    pub templates: PathBuf,
    pub static_dir: PathBuf,
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let section = &self.build.posts_section;
        if section.trim().is_empty() {
            return Err(ConfigError::Validation(
                "build.posts_section must not be empty".into(),
            ));
        }
        if section.contains(['/', '\\']) || section.starts_with('.') {
            return Err(ConfigError::Validation(format!(
                "build.posts_section must be a single visible directory name, got `{section}`"
            )));
        }
        for (key, value) in [
            ("build.content_dir", &self.build.content_dir),
            ("build.output_dir", &self.build.output_dir),
            ("build.templates_dir", &self.build.templates_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port must be between 1 and 65535".into(),
            ));
        }
        Ok(())
    }

    /// Resolve every configured directory against the project root.
    pub fn paths(&self, root: &Path, config_file: &Path) -> ProjectPaths {
        let content = match &self.build.sync_source {
            Some(source) => root.join(shellexpand::tilde(source).into_owned()),
            None => root.join(&self.build.content_dir),
        };
        ProjectPaths {
            root: root.to_path_buf(),
            config_file: config_file.to_path_buf(),
            content,
            output: root.join(&self.build.output_dir),
            templates: root.join(&self.build.templates_dir),
            static_dir: root.join(&self.build.static_dir),
        }
    }

    /// The `[site]` table as a JSON value, for templates.
    pub fn site_context(&self) -> serde_json::Value {
        toml_to_json(toml::Value::Table(self.site.clone()))
    }

    /// The whole configuration as a JSON value, for templates.
    pub fn to_context(&self) -> serde_json::Value {
        let mut value = serde_json::json!({
            "build": &self.build,
            "server": &self.server,
        });
        value["site"] = self.site_context();
        value
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge user values onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: toml::Value) -> Result<SiteConfig, ConfigError> {
    let merged = merge_toml(stock_defaults_value(), overlay);
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load and validate the configuration file at `path`.
///
/// A missing file is [`ConfigError::Missing`]; nothing is written before
/// this succeeds.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::Missing(path.to_path_buf()));
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: toml::Value = toml::from_str(&content)?;
    resolve_config(value)
}

/// Returns a fully-commented stock `site.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# plainpress configuration
# ========================
# Place this file at the project root as `site.toml`.
# Everything outside [site] is optional; values shown are the defaults.
# Unknown keys outside [site] cause an error.

# ---------------------------------------------------------------------------
# Site metadata
# ---------------------------------------------------------------------------
# Free-form. Every key is available to templates as `site.<key>`;
# `site.current_year` is added at build time.
[site]
title = "My Site"
description = ""

# ---------------------------------------------------------------------------
# Build
# ---------------------------------------------------------------------------
[build]
# Markdown sources. Non-Markdown files are copied next to their pages.
content_dir = "content"

# Generated site.
output_dir = "public"

# minijinja templates: home.html, list.html, post.html, page.html, 404.html
templates_dir = "templates"

# Copied verbatim to the output root.
static_dir = "static"

# Documents below a directory with this name are blog posts.
posts_section = "blog"

# Navigation label for the posts section.
posts_title = "Blog"

# Empty the output directory before writing.
clean = true

# Read content from another location (e.g. a synced notes folder).
# sync_source = "~/Notes/site"

# ---------------------------------------------------------------------------
# Development server (`plainpress serve`)
# ---------------------------------------------------------------------------
[server]
host = "localhost"
port = 8000
open_browser = true
"##
}
