//! Development server with rebuild on change.
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐
//! │   Main Thread   │     │  Watcher Thread  │
//! │  (HTTP Server)  │     │ (debounce 500ms) │
//! └────────┬────────┘     └────────┬─────────┘
//!          │                       │
//!    read public/            rebuild public/
//! ```
//!
//! The watcher thread owns every rebuild, so builds never overlap: changes
//! that arrive while a build runs are collected by the debouncer and cause
//! at most one further build. Editor swap files, dotfiles, and anything
//! inside the output directory are ignored so a build cannot trigger itself.

use crate::config::ServerConfig;
use crate::pipeline::{self, BuildError, Project};
use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::new_debouncer;
use std::fs;
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, mpsc};
use std::time::Duration;
use thiserror::Error;
use tiny_http::{Header, Request, Response, Server, StatusCode};

/// Quiet period before a burst of file events triggers a rebuild.
pub const DEBOUNCE: Duration = Duration::from_millis(500);

/// Try binding to port, retry with incremented port if in use.
const MAX_PORT_RETRIES: u16 = 10;

#[derive(Error, Debug)]
pub enum ServeError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("failed to bind {host} (ports {first}-{last}): {message}")]
    Bind {
        host: String,
        first: u16,
        last: u16,
        message: String,
    },
    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),
    #[error("failed to set Ctrl+C handler: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Server Entry Point
// ============================================================================

/// Build the site, then serve it and rebuild on every source change.
///
/// Blocks until Ctrl+C.
pub fn serve(project: Project, options: &ServerConfig) -> Result<(), ServeError> {
    let report = pipeline::build(&project)?;
    tracing::info!(documents = report.documents, "initial build finished");

    let (server, port) = try_bind_port(&options.host, options.port, MAX_PORT_RETRIES)?;
    let server = Arc::new(server);

    let server_for_signal = Arc::clone(&server);
    ctrlc::set_handler(move || {
        tracing::info!("shutting down");
        server_for_signal.unblock();
    })?;

    let url = format!("http://{}:{}/", options.host, port);
    println!("Serving {} at {url}", project.paths.output.display());
    println!("Press Ctrl+C to stop");

    let watch_project = project.clone();
    std::thread::spawn(move || {
        if let Err(err) = watch_and_rebuild(watch_project) {
            tracing::error!("watcher stopped: {err}");
        }
    });

    if options.open_browser {
        open_browser(&url);
    }

    let serve_root = project.paths.output;
    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, &serve_root) {
            tracing::warn!("request error: {e}");
        }
    }
    Ok(())
}

fn try_bind_port(host: &str, base_port: u16, max_retries: u16) -> Result<(Server, u16), ServeError> {
    let mut last_error = String::new();
    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match Server::http((host, port)) {
            Ok(server) => {
                if offset > 0 {
                    tracing::warn!("port {base_port} in use, using {port} instead");
                }
                return Ok((server, port));
            }
            Err(e) => last_error = e.to_string(),
        }
    }
    Err(ServeError::Bind {
        host: host.to_string(),
        first: base_port,
        last: base_port.saturating_add(max_retries.saturating_sub(1)),
        message: last_error,
    })
}

fn open_browser(url: &str) {
    let mut command = if cfg!(target_os = "macos") {
        std::process::Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut c = std::process::Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else {
        std::process::Command::new("xdg-open")
    };
    if let Err(e) = command.arg(url).spawn() {
        tracing::warn!("could not open a browser: {e}");
    }
}

// ============================================================================
// Watching
// ============================================================================

/// Locations whose changes trigger a rebuild, canonicalized so they compare
/// equal to the paths reported by the OS.
#[derive(Debug, Clone)]
struct WatchSet {
    dirs: Vec<PathBuf>,
    config_file: PathBuf,
    output: PathBuf,
}

impl WatchSet {
    fn for_project(project: &Project) -> Self {
        let paths = &project.paths;
        Self {
            dirs: [&paths.content, &paths.templates, &paths.static_dir]
                .into_iter()
                .filter(|d| d.is_dir())
                .map(|d| canonical(d))
                .collect(),
            config_file: canonical(&paths.config_file),
            output: canonical(&paths.output),
        }
    }

    fn is_relevant(&self, path: &Path) -> bool {
        if is_temp_file(path) || path.starts_with(&self.output) {
            return false;
        }
        path == self.config_file || self.dirs.iter().any(|d| path.starts_with(d))
    }
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Editor swap/backup files and dotfiles.
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bak" | "swp" | "swo" | "tmp") || name.ends_with('~') || name.starts_with('.')
}

fn watch_and_rebuild(project: Project) -> Result<(), ServeError> {
    let watch = WatchSet::for_project(&project);
    let (tx, rx) = mpsc::channel();
    let mut debouncer = new_debouncer(DEBOUNCE, tx)?;

    for dir in &watch.dirs {
        debouncer.watcher().watch(dir, RecursiveMode::Recursive)?;
    }
    // The config file is replaced rather than rewritten by many editors, so
    // watch its directory instead of the file itself.
    if let Some(parent) = watch.config_file.parent() {
        debouncer.watcher().watch(parent, RecursiveMode::NonRecursive)?;
    }
    tracing::debug!(dirs = ?watch.dirs, "watching for changes");

    let root = project.paths.root.clone();
    let config_file = project.paths.config_file.clone();

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let changed: Vec<&Path> = events
                    .iter()
                    .map(|e| e.path.as_path())
                    .filter(|p| watch.is_relevant(p))
                    .collect();
                if changed.is_empty() {
                    continue;
                }
                tracing::info!(changes = changed.len(), first = %changed[0].display(), "rebuilding");
                rebuild(&root, &config_file);
            }
            Ok(Err(e)) => tracing::warn!("watch error: {e}"),
            Err(_) => return Ok(()),
        }
    }
}

/// Reload the configuration and build. Failures are reported, not fatal:
/// the previous output keeps being served.
fn rebuild(root: &Path, config_file: &Path) {
    let result = Project::load(root, Some(config_file)).and_then(|p| pipeline::build(&p));
    match result {
        Ok(report) => println!("Rebuilt: {} documents processed", report.documents),
        Err(e) => eprintln!("Build failed: {e}"),
    }
}

// ============================================================================
// Request Handling
// ============================================================================

/// Map a request URL onto a file below `serve_root`.
///
/// Directories resolve to their `index.html`; query strings are ignored;
/// `..` segments are refused.
fn resolve_request(serve_root: &Path, url: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(url)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();
    let path = decoded.split(['?', '#']).next().unwrap_or("");
    let relative = Path::new(path.trim_start_matches('/'));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }

    let local = serve_root.join(relative);
    if local.is_file() {
        return Some(local);
    }
    let index = local.join("index.html");
    index.is_file().then_some(index)
}

fn handle_request(request: Request, serve_root: &Path) -> Result<(), ServeError> {
    match resolve_request(serve_root, request.url()) {
        Some(path) => serve_file(request, &path),
        None => serve_not_found(request, serve_root),
    }
}

fn content_type(value: &str) -> Header {
    Header::from_bytes(&b"Content-Type"[..], value.as_bytes()).expect("content type is ASCII")
}

fn serve_file(request: Request, path: &Path) -> Result<(), ServeError> {
    let content = fs::read(path)?;
    let response = Response::from_data(content).with_header(content_type(guess_content_type(path)));
    request.respond(response)?;
    Ok(())
}

/// Serve the site's own `404.html` when it has one.
fn serve_not_found(request: Request, serve_root: &Path) -> Result<(), ServeError> {
    let (body, mime) = match fs::read(serve_root.join("404.html")) {
        Ok(page) => (page, "text/html; charset=utf-8"),
        Err(_) => (b"404 Not Found".to_vec(), "text/plain"),
    };
    let length = body.len();
    let response = Response::new(
        StatusCode(404),
        vec![content_type(mime)],
        Cursor::new(body),
        Some(length),
        None,
    );
    request.respond(response)?;
    Ok(())
}

/// Guess MIME content type from file extension.
fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("xml") => "application/xml; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
